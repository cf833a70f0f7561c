use serde::Serialize;

/// Number of update durations kept for the rolling average.
pub const FRAME_HISTORY: usize = 60;

const SKIP_THRESHOLD: f64 = 1.5;
const SLOW_MARGIN: f64 = 1.2;
const FAST_MARGIN: f64 = 0.8;
const QUALITY_STEP_DOWN: f32 = 0.1;
const QUALITY_STEP_UP: f32 = 0.05;

/// Quality level change produced by [`QualityState::adjust_quality`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityChange {
    pub previous: f32,
    pub current: f32,
}

/// Frame skipping and adaptive quality bookkeeping for the coordinator.
#[derive(Debug, Clone, Serialize)]
pub struct QualityState {
    quality_level: f32,
    min_quality: f32,
    max_quality: f32,
    #[serde(skip)]
    frame_time_history: [f64; FRAME_HISTORY],
    #[serde(skip)]
    cursor: usize,
    #[serde(skip)]
    samples: usize,
    average_frame_time: f64,
    last_quality_adjustment_ms: Option<f64>,
    skip_frame_count: u32,
    max_skip_frames: u32,
    last_update_ms: Option<f64>,
}

impl QualityState {
    pub fn new(min_quality: f32, max_quality: f32, max_skip_frames: u32) -> Self {
        Self {
            quality_level: max_quality,
            min_quality,
            max_quality,
            frame_time_history: [0.0; FRAME_HISTORY],
            cursor: 0,
            samples: 0,
            average_frame_time: 0.0,
            last_quality_adjustment_ms: None,
            skip_frame_count: 0,
            max_skip_frames,
            last_update_ms: None,
        }
    }

    pub fn quality_level(&self) -> f32 {
        self.quality_level
    }

    pub fn average_frame_time(&self) -> f64 {
        self.average_frame_time
    }

    pub fn skip_frame_count(&self) -> u32 {
        self.skip_frame_count
    }

    pub fn last_quality_adjustment_ms(&self) -> Option<f64> {
        self.last_quality_adjustment_ms
    }

    /// Applies new bounds, pulling the current level inside them.
    pub fn configure(&mut self, min_quality: f32, max_quality: f32, max_skip_frames: u32) {
        self.min_quality = min_quality;
        self.max_quality = max_quality.max(min_quality);
        self.max_skip_frames = max_skip_frames;
        self.quality_level = self.quality_level.clamp(self.min_quality, self.max_quality);
    }

    /// Decides whether the frame at `now_ms` is dropped. A frame is dropped
    /// when the previous update finished more than 1.5 frame budgets ago,
    /// unless `max_skip_frames` frames in a row were already dropped.
    pub fn should_skip_frame(&mut self, now_ms: f64, target_frame_ms: f64, adaptive: bool) -> bool {
        let overran = match self.last_update_ms {
            Some(last) => now_ms - last > target_frame_ms * SKIP_THRESHOLD,
            None => false,
        };

        if adaptive && overran && self.skip_frame_count < self.max_skip_frames {
            self.skip_frame_count += 1;
            return true;
        }

        self.skip_frame_count = 0;
        false
    }

    /// Records a completed update that finished at `finished_ms` after
    /// taking `duration_ms`.
    pub fn record_update(&mut self, finished_ms: f64, duration_ms: f64) {
        self.last_update_ms = Some(finished_ms);
        self.frame_time_history[self.cursor] = duration_ms.max(0.0);
        self.cursor = (self.cursor + 1) % FRAME_HISTORY;
        self.samples = (self.samples + 1).min(FRAME_HISTORY);

        let sum: f64 = self.frame_time_history[..self.samples].iter().sum();
        self.average_frame_time = sum / self.samples as f64;
    }

    /// Steps the quality level from a reported average frame time: down by
    /// 0.1 when more than 20% over budget, up by 0.05 when more than 20%
    /// under, always within the configured bounds.
    pub fn adjust_quality(
        &mut self,
        average_frame_ms: f64,
        target_frame_ms: f64,
        now_ms: f64,
    ) -> Option<QualityChange> {
        let previous = self.quality_level;
        let next = if average_frame_ms > target_frame_ms * SLOW_MARGIN {
            previous - QUALITY_STEP_DOWN
        } else if average_frame_ms < target_frame_ms * FAST_MARGIN {
            previous + QUALITY_STEP_UP
        } else {
            previous
        };
        let next = next.clamp(self.min_quality, self.max_quality);

        if (next - previous).abs() <= f32::EPSILON {
            return None;
        }

        self.quality_level = next;
        self.last_quality_adjustment_ms = Some(now_ms);
        Some(QualityChange {
            previous,
            current: next,
        })
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.min_quality, self.max_quality, self.max_skip_frames);
    }
}
