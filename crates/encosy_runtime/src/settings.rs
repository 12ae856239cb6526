//! Runtime settings

use anyhow::{Context, Result};
use encosy_core::glam::Vec3;
use encosy_core::variant::{ConverterRegistry, Variant};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::Level;

/// Runtime settings, read from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// One of `trace`, `debug`, `info`, `warn`, `error`.
    pub log_level: String,
    /// Values pushed through the registry at startup.
    pub samples: Vec<SampleValue>,
}

/// A value the runtime packs into a variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SampleValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Vec3([f32; 3]),
}

impl SampleValue {
    pub fn pack(&self, registry: &ConverterRegistry) -> Result<Variant> {
        let variant = match self {
            SampleValue::Int(value) => registry.pack(*value),
            SampleValue::Float(value) => registry.pack(*value),
            SampleValue::Bool(value) => registry.pack(*value),
            SampleValue::Text(value) => registry.pack(value.clone()),
            SampleValue::Vec3(value) => registry.pack(Vec3::from_array(*value)),
        };
        variant.with_context(|| format!("failed to pack sample {self:?}"))
    }

    /// Whether `variant` unpacks back to this sample.
    pub fn matches(&self, registry: &ConverterRegistry, variant: &Variant) -> bool {
        match self {
            SampleValue::Int(value) => registry.try_unpack::<i64>(variant) == Some(*value),
            SampleValue::Float(value) => registry.try_unpack::<f64>(variant) == Some(*value),
            SampleValue::Bool(value) => registry.try_unpack::<bool>(variant) == Some(*value),
            SampleValue::Text(value) => {
                registry.try_unpack::<String>(variant).as_ref() == Some(value)
            }
            SampleValue::Vec3(value) => {
                registry.try_unpack::<Vec3>(variant) == Some(Vec3::from_array(*value))
            }
        }
    }
}

impl RuntimeSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse settings in {}", path.display()))
    }

    pub fn level(&self) -> Result<Level> {
        self.log_level
            .parse::<Level>()
            .with_context(|| format!("unknown log level '{}'", self.log_level))
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            samples: vec![
                SampleValue::Int(42),
                SampleValue::Float(0.5),
                SampleValue::Bool(true),
                SampleValue::Text("hello".to_string()),
                SampleValue::Vec3([1.0, 2.0, 3.0]),
            ],
        }
    }
}
