use serde::{Deserialize, Serialize};

use crate::{audio::AudioInfluenceSnapshot, config::PhysicsConfig};

const BASS_CEILING: f32 = 0.3;
const TREBLE_FLOOR: f32 = 0.7;

/// Frequency band a metaball responds to most strongly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FrequencyBand {
    Bass,
    Mid,
    Treble,
}

impl FrequencyBand {
    /// Band for a normalised position in `[0, 1)`.
    pub fn for_weight(weight: f32) -> Self {
        if weight < BASS_CEILING {
            FrequencyBand::Bass
        } else if weight > TREBLE_FLOOR {
            FrequencyBand::Treble
        } else {
            FrequencyBand::Mid
        }
    }

    fn level(self, audio: &AudioInfluenceSnapshot) -> f32 {
        match self {
            FrequencyBand::Bass => audio.bass,
            FrequencyBand::Mid => audio.mid,
            FrequencyBand::Treble => audio.treble,
        }
    }
}

/// Position of metaball `index` along the spectrum, `index / count`.
pub fn frequency_weight(index: usize, count: usize) -> f32 {
    if count == 0 {
        return 0.0;
    }
    index as f32 / count as f32
}

/// Response weights and reactivity used to turn audio into scale factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandResponse {
    pub audio_reactivity: f32,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
}

impl BandResponse {
    pub fn from_config(config: &PhysicsConfig) -> Self {
        Self {
            audio_reactivity: config.audio_reactivity,
            bass: config.bass_response,
            mid: config.mid_response,
            treble: config.treble_response,
        }
    }

    fn weight(&self, band: FrequencyBand) -> f32 {
        match band {
            FrequencyBand::Bass => self.bass,
            FrequencyBand::Mid => self.mid,
            FrequencyBand::Treble => self.treble,
        }
    }

    /// `base * beat * band` for one metaball.
    pub fn scale_for(&self, band: FrequencyBand, audio: &AudioInfluenceSnapshot) -> f32 {
        let base = 1.0 + audio.energy * self.audio_reactivity * 0.3;
        let beat = if audio.beat {
            1.0 + audio.beat_strength * 0.2
        } else {
            1.0
        };
        let band_multiplier = 1.0 + band.level(audio) * self.weight(band);
        base * beat * band_multiplier
    }
}

impl Default for BandResponse {
    fn default() -> Self {
        Self::from_config(&PhysicsConfig::default())
    }
}

/// Audio-driven scale for one metaball this frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetaballInfluence {
    pub index: usize,
    pub band: FrequencyBand,
    pub scale: f32,
}

/// Per-metaball scale factors, rebuilt from each frame's snapshot.
#[derive(Debug, Default, Clone)]
pub struct InfluenceMap {
    influences: Vec<MetaballInfluence>,
}

impl InfluenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.influences.clear();
    }

    pub fn influences(&self) -> &[MetaballInfluence] {
        &self.influences
    }

    pub fn len(&self) -> usize {
        self.influences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.influences.is_empty()
    }

    pub fn scale(&self, index: usize) -> Option<f32> {
        self.influences.get(index).map(|influence| influence.scale)
    }

    pub fn apply_from_snapshot(
        &mut self,
        count: usize,
        response: &BandResponse,
        audio: &AudioInfluenceSnapshot,
    ) {
        self.clear();
        self.influences.extend((0..count).map(|index| {
            let band = FrequencyBand::for_weight(frequency_weight(index, count));
            MetaballInfluence {
                index,
                band,
                scale: response.scale_for(band, audio),
            }
        }));
    }
}
