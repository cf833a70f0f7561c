use serde::Serialize;

use super::{Easing, PropertySet};
use crate::{BlobVizError, Result};

/// A timed blend between two property sets.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub id: u64,
    pub start_time_ms: f64,
    pub duration_ms: f64,
    pub easing: Easing,
    pub from_material_id: Option<String>,
    pub to_material_id: String,
    pub from_properties: PropertySet,
    pub to_properties: PropertySet,
    /// Eased progress.
    pub progress: f32,
    pub is_complete: bool,
}

impl Transition {
    /// Linear progress at `now_ms`, clamped to `[0, 1]`.
    pub fn raw_progress(&self, now_ms: f64) -> f32 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        ((now_ms - self.start_time_ms) / self.duration_ms).clamp(0.0, 1.0) as f32
    }

    /// Recomputes `progress` and `is_complete` for `now_ms`.
    pub fn advance(&mut self, now_ms: f64) {
        let raw = self.raw_progress(now_ms);
        self.progress = self.easing.apply(raw);
        self.is_complete = raw >= 1.0;
    }
}

/// Parameters for a new transition, minus the id and timing bookkeeping.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub from_material_id: Option<String>,
    pub to_material_id: String,
    pub from_properties: PropertySet,
    pub to_properties: PropertySet,
    pub duration_ms: f64,
    pub easing: Easing,
}

/// Result of [`TransitionSet::advance`].
#[derive(Debug, Clone, Default)]
pub struct Advanced {
    /// Completed this call, in start order.
    pub finished: Vec<Transition>,
    /// Still running but overtaken by a newer transition that completed.
    pub superseded: Vec<Transition>,
}

/// Bounded set of in-flight transitions. Requests past the cap are
/// rejected, never queued.
#[derive(Debug, Clone)]
pub struct TransitionSet {
    limit: usize,
    next_id: u64,
    active: Vec<Transition>,
}

impl TransitionSet {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            next_id: 1,
            active: Vec::new(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Lowers or raises the cap. Transitions already running are kept even
    /// when they exceed a lowered cap; new requests are refused until the
    /// set drains below it.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.active.len() >= self.limit
    }

    pub fn active(&self) -> &[Transition] {
        &self.active
    }

    pub fn start(&mut self, request: TransitionRequest, now_ms: f64) -> Result<&Transition> {
        if self.is_full() {
            return Err(BlobVizError::TransitionLimit {
                active: self.active.len(),
                limit: self.limit,
            });
        }

        let id = self.next_id;
        self.next_id += 1;
        self.active.push(Transition {
            id,
            start_time_ms: now_ms,
            duration_ms: request.duration_ms.max(0.0),
            easing: request.easing,
            from_material_id: request.from_material_id,
            to_material_id: request.to_material_id,
            from_properties: request.from_properties,
            to_properties: request.to_properties,
            progress: 0.0,
            is_complete: false,
        });

        let index = self.active.len() - 1;
        Ok(&self.active[index])
    }

    /// Advances every transition, hands each to `blend` in start order and
    /// returns the ones that finished this call, already removed from the
    /// active set.
    ///
    /// A finished transition supersedes everything started before it: its
    /// `from_properties` already captured their blend, so older transitions
    /// still running are dropped and never blend again.
    pub fn advance(&mut self, now_ms: f64, mut blend: impl FnMut(&Transition)) -> Advanced {
        for transition in &mut self.active {
            transition.advance(now_ms);
            blend(transition);
        }

        let newest_finished = self
            .active
            .iter()
            .rposition(|transition| transition.is_complete);
        let mut advanced = Advanced::default();
        let Some(cutoff) = newest_finished else {
            return advanced;
        };

        let remaining = self.active.split_off(cutoff + 1);
        for transition in std::mem::replace(&mut self.active, remaining) {
            if transition.is_complete {
                advanced.finished.push(transition);
            } else {
                advanced.superseded.push(transition);
            }
        }
        advanced
    }

    pub fn clear(&mut self) -> usize {
        let dropped = self.active.len();
        self.active.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(to: &str, duration_ms: f64) -> TransitionRequest {
        TransitionRequest {
            from_material_id: None,
            to_material_id: to.to_string(),
            from_properties: PropertySet::default(),
            to_properties: PropertySet::default(),
            duration_ms,
            easing: Easing::Linear,
        }
    }

    #[test]
    fn rejects_requests_past_the_cap() {
        let mut set = TransitionSet::new(2);
        set.start(request("a", 100.0), 0.0).unwrap();
        set.start(request("b", 100.0), 0.0).unwrap();

        let err = set.start(request("c", 100.0), 0.0).unwrap_err();
        assert!(matches!(
            err,
            BlobVizError::TransitionLimit { active: 2, limit: 2 }
        ));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn removes_transitions_when_they_complete() {
        let mut set = TransitionSet::new(4);
        set.start(request("short", 100.0), 0.0).unwrap();
        set.start(request("long", 1000.0), 0.0).unwrap();

        let mut seen = Vec::new();
        let finished = set
            .advance(100.0, |t| seen.push((t.to_material_id.clone(), t.progress)))
            .finished;

        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].to_material_id, "short");
        assert!(finished[0].is_complete);
        assert_eq!(set.len(), 1);
        assert_eq!(seen[0], ("short".to_string(), 1.0));
        assert!((seen[1].1 - 0.1).abs() < 1e-6);
    }

    #[test]
    fn zero_duration_finishes_on_first_advance() {
        let mut set = TransitionSet::new(1);
        set.start(request("now", 0.0), 50.0).unwrap();
        assert!(set.is_full());
        let finished = set.advance(50.0, |_| {}).finished;
        assert_eq!(finished.len(), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn finished_transition_drops_older_ones_still_running() {
        let mut set = TransitionSet::new(4);
        set.start(request("slow", 5000.0), 0.0).unwrap();
        set.start(request("fast", 1000.0), 100.0).unwrap();
        set.start(request("latest", 2000.0), 200.0).unwrap();

        let advanced = set.advance(1100.0, |_| {});

        assert_eq!(advanced.finished.len(), 1);
        assert_eq!(advanced.finished[0].to_material_id, "fast");
        assert_eq!(advanced.superseded.len(), 1);
        assert_eq!(advanced.superseded[0].to_material_id, "slow");
        assert_eq!(set.len(), 1);
        assert_eq!(set.active()[0].to_material_id, "latest");
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let mut set = TransitionSet::new(3);
        let first = set.start(request("a", 10.0), 0.0).unwrap().id;
        let second = set.start(request("b", 10.0), 0.0).unwrap().id;
        assert!(second > first);
        assert_eq!(set.clear(), 2);
    }
}
