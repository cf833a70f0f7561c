use std::collections::BTreeMap;

use glam::Mat4;
use serde::Serialize;

/// Value bound to a single shader uniform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

impl UniformValue {
    pub fn as_float(&self) -> Option<f32> {
        match self {
            UniformValue::Float(value) => Some(*value),
            _ => None,
        }
    }
}

/// Destination for uniform uploads, typically a compiled shader program.
pub trait UniformSink {
    fn set_uniform(&mut self, name: &str, value: UniformValue);
}

/// In-memory uniform table. Stands in for a shader program wherever the
/// values only need to be inspected or serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UniformBlock {
    values: BTreeMap<String, UniformValue>,
}

impl UniformBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl UniformSink for UniformBlock {
    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.values.insert(name.to_string(), value);
    }
}

/// Rendering backend the physics coordinator depends on.
pub trait RenderEngine {
    /// Model-view-projection matrix for the current frame.
    fn mvp_matrix(&self) -> Mat4;

    /// Called whenever the coordinator's adaptive quality level moves.
    fn set_quality_level(&mut self, _level: f32) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_keeps_latest_value_per_name() {
        let mut block = UniformBlock::new();
        block.set_uniform("u_density", UniformValue::Float(1.0));
        block.set_uniform("u_density", UniformValue::Float(2.0));
        block.set_uniform("u_phase", UniformValue::Int(1));

        assert_eq!(block.len(), 2);
        assert_eq!(block.get("u_density").and_then(UniformValue::as_float), Some(2.0));
        assert_eq!(block.get("u_phase").and_then(UniformValue::as_float), None);
    }

    #[test]
    fn serializes_as_plain_values() {
        let mut block = UniformBlock::new();
        block.set_uniform("u_emission", UniformValue::Vec3([0.0, 0.5, 1.0]));
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["u_emission"][1], 0.5);
    }
}
