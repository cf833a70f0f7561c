use serde::{Deserialize, Serialize};

/// Default exponential smoothing factor applied to band levels.
pub const DEFAULT_SMOOTHING: f32 = 0.1;

/// Raw, already extracted audio features for one frame. Fields missing from
/// a serialized payload default to silence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AudioFeatures {
    pub energy: f32,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub beat: bool,
    pub beat_strength: f32,
}

impl AudioFeatures {
    pub fn silence() -> Self {
        Self::default()
    }
}

/// Immutable per-frame view of the audio features shared by every coupling
/// stage. Built once per frame per engine and never patched afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioInfluenceSnapshot {
    pub energy: f32,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub beat: bool,
    pub beat_strength: f32,
    pub smoothed_energy: f32,
    pub smoothed_bass: f32,
    pub smoothed_mid: f32,
    pub smoothed_treble: f32,
}

/// Owns the smoothing state used to derive [`AudioInfluenceSnapshot`]s.
///
/// Each engine keeps its own builder, so two engines fed the same features
/// may disagree slightly on smoothed values when their factors differ.
#[derive(Debug, Clone)]
pub struct AudioInfluenceBuilder {
    smoothing: f32,
    smoothed: [f32; 4],
    latest: AudioInfluenceSnapshot,
}

impl AudioInfluenceBuilder {
    pub fn new(smoothing: f32) -> Self {
        Self {
            smoothing: clamp_unit(smoothing),
            smoothed: [0.0; 4],
            latest: AudioInfluenceSnapshot::default(),
        }
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    pub fn set_smoothing(&mut self, smoothing: f32) {
        self.smoothing = clamp_unit(smoothing);
    }

    /// Advances the smoothing state by exactly one step and returns the
    /// resulting snapshot.
    pub fn build(&mut self, raw: &AudioFeatures) -> AudioInfluenceSnapshot {
        let levels = [
            clamp_unit(raw.energy),
            clamp_unit(raw.bass),
            clamp_unit(raw.mid),
            clamp_unit(raw.treble),
        ];

        for (smoothed, level) in self.smoothed.iter_mut().zip(levels) {
            *smoothed += (level - *smoothed) * self.smoothing;
        }

        self.latest = AudioInfluenceSnapshot {
            energy: levels[0],
            bass: levels[1],
            mid: levels[2],
            treble: levels[3],
            beat: raw.beat,
            beat_strength: if raw.beat {
                clamp_unit(raw.beat_strength)
            } else {
                0.0
            },
            smoothed_energy: self.smoothed[0],
            smoothed_bass: self.smoothed[1],
            smoothed_mid: self.smoothed[2],
            smoothed_treble: self.smoothed[3],
        };
        self.latest
    }

    /// Returns the most recently built snapshot.
    pub fn latest(&self) -> &AudioInfluenceSnapshot {
        &self.latest
    }

    pub fn reset(&mut self) {
        self.smoothed = [0.0; 4];
        self.latest = AudioInfluenceSnapshot::default();
    }
}

impl Default for AudioInfluenceBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING)
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loud() -> AudioFeatures {
        AudioFeatures {
            energy: 1.0,
            bass: 0.5,
            mid: 0.25,
            treble: 2.0,
            beat: true,
            beat_strength: 0.8,
        }
    }

    #[test]
    fn smoothed_values_lag_by_one_step() {
        let mut builder = AudioInfluenceBuilder::new(0.1);
        let first = builder.build(&loud());
        assert!((first.smoothed_energy - 0.1).abs() < 1e-6);
        assert!((first.smoothed_bass - 0.05).abs() < 1e-6);

        let second = builder.build(&loud());
        assert!((second.smoothed_energy - 0.19).abs() < 1e-6);
    }

    #[test]
    fn clamps_raw_levels_and_drops_strength_without_beat() {
        let mut builder = AudioInfluenceBuilder::default();
        let snapshot = builder.build(&loud());
        assert_eq!(snapshot.treble, 1.0);

        let quiet = AudioFeatures {
            beat_strength: 0.9,
            energy: f32::NAN,
            ..AudioFeatures::default()
        };
        let snapshot = builder.build(&quiet);
        assert_eq!(snapshot.beat_strength, 0.0);
        assert_eq!(snapshot.energy, 0.0);
    }

    #[test]
    fn missing_fields_deserialize_as_silence() {
        let features: AudioFeatures = serde_json::from_str(r#"{"bass":0.4}"#).unwrap();
        assert_eq!(features.bass, 0.4);
        assert!(!features.beat);
        assert_eq!(features.energy, 0.0);

        let features: AudioFeatures =
            serde_json::from_str(r#"{"beat":true,"beatStrength":0.5}"#).unwrap();
        assert!(features.beat);
        assert_eq!(features.beat_strength, 0.5);
    }

    #[test]
    fn latest_tracks_last_build() {
        let mut builder = AudioInfluenceBuilder::default();
        let built = builder.build(&loud());
        assert_eq!(builder.latest(), &built);
        builder.reset();
        assert_eq!(builder.latest(), &AudioInfluenceSnapshot::default());
    }
}
