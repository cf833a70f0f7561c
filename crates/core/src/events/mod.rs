use std::fmt;

use serde::Serialize;

use crate::{audio::AudioInfluenceSnapshot, material::Phase, physics::PhysicsStage};

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<E> = Box<dyn FnMut(&E)>;

/// Single-threaded observer list for one event type. Listeners run in
/// subscription order.
pub struct EventBus<E> {
    next_id: u64,
    listeners: Vec<(ListenerId, Listener<E>)>,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Events published by the physics coordinator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PhysicsEvent {
    MaterialChanged {
        previous: Option<String>,
        current: Option<String>,
    },
    PhysicsUpdated {
        delta_time: f32,
        audio: AudioInfluenceSnapshot,
    },
    PerformanceChanged {
        average_update_ms: f64,
        quality_level: f32,
    },
    QualityChanged {
        previous: f32,
        current: f32,
    },
    /// A stage failed; the remaining stages of the frame still ran.
    Error {
        context: &'static str,
        stage: Option<PhysicsStage>,
        message: String,
    },
}

/// Events published by the material property engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MaterialEvent {
    MaterialChanged {
        previous: Option<String>,
        current: String,
    },
    TransitionStarted {
        id: u64,
        from: Option<String>,
        to: String,
    },
    TransitionCompleted {
        id: u64,
        to: String,
    },
    PhaseChanged {
        from: Phase,
        to: Phase,
        temperature: f32,
    },
}
