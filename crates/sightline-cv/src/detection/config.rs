//! Detection configuration

use crate::Result;
use crate::engine::EngineConfig;
use crate::overlay::DEFAULT_MAX_OUTLINE_WIDTH;
use crate::source::SourceConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use sightline_core::threshold;
use sightline_core::{ClassCatalog, DecodeParams, Reaction, SpawnSpec, TriggerRule};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Overrides the confidence threshold.
pub const ENV_CONFIDENCE: &str = "SIGHTLINE_CONFIDENCE";
/// Overrides the catalog with a names file.
pub const ENV_CATALOG: &str = "SIGHTLINE_CATALOG";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("confidence threshold {0} is outside [0, 1]")]
    ThresholdOutOfRange(f32),
    #[error("model input size {width}x{height} must be non-zero")]
    EmptyInput { width: u32, height: u32 },
    #[error("model must have at least one class")]
    NoClasses,
    #[error("catalog has {catalog} names but the model outputs {num_classes} classes")]
    CatalogSizeMismatch { catalog: usize, num_classes: usize },
    #[error("trigger '{rule}' names class '{class}' which is not in the catalog")]
    UnknownTriggerClass { rule: String, class: String },
    #[error("trigger name '{0}' is used more than once")]
    DuplicateTrigger(String),
}

/// Main detection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub model: ModelConfig,
    pub confidence_threshold: f32,
    pub catalog: CatalogConfig,
    pub source: SourceConfig,
    pub engine: EngineConfig,
    pub triggers: Vec<TriggerConfig>,
    pub visualization: VisualizationConfig,
}

/// Shape of the network's input and output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub num_classes: usize,
    pub input_width: u32,
    pub input_height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogConfig {
    #[default]
    Coco,
    /// One class name per line
    File { path: PathBuf },
    Inline { names: Vec<String> },
}

/// A reaction bound to a class by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    pub name: String,
    pub class: String,
    pub reaction: Reaction,
}

/// Visualization configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    pub draw_boxes: bool,
    pub max_outline_width: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            confidence_threshold: 0.3,
            catalog: CatalogConfig::Coco,
            source: SourceConfig::Blank,
            engine: EngineConfig::default(),
            triggers: Vec::new(),
            visualization: VisualizationConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            num_classes: 80,
            input_width: 640,
            input_height: 640,
        }
    }
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            draw_boxes: true,
            max_outline_width: DEFAULT_MAX_OUTLINE_WIDTH,
        }
    }
}

impl DetectionConfig {
    /// COCO model with a label and a one-shot entity bound to `class`.
    pub fn alert_for(class: &str) -> Self {
        let title = capitalize(class);
        Self {
            triggers: vec![
                TriggerConfig {
                    name: format!("{class}_label"),
                    class: class.to_string(),
                    reaction: Reaction::Visibility {
                        message: format!("{title} Detected!"),
                    },
                },
                TriggerConfig {
                    name: format!("{class}_entity"),
                    class: class.to_string(),
                    reaction: Reaction::Spawn(SpawnSpec {
                        entity: class.to_string(),
                        ..SpawnSpec::default()
                    }),
                },
            ],
            ..Self::default()
        }
    }

    /// Read a JSON config file and apply environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let mut config: Self = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `SIGHTLINE_*` overrides looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_CONFIDENCE) {
            self.confidence_threshold = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: '{}'", ENV_CONFIDENCE, value))?;
        }
        if let Some(path) = lookup(ENV_CATALOG) {
            self.catalog = CatalogConfig::File { path: path.into() };
        }
        Ok(())
    }

    pub fn build_catalog(&self) -> Result<ClassCatalog> {
        let catalog = match &self.catalog {
            CatalogConfig::Coco => ClassCatalog::coco(),
            CatalogConfig::File { path } => ClassCatalog::load(path)?,
            CatalogConfig::Inline { names } => ClassCatalog::new(names.iter().cloned()),
        };
        Ok(catalog)
    }

    /// Check the configuration against the catalog it will run with.
    pub fn validate(&self, catalog: &ClassCatalog) -> std::result::Result<(), ConfigError> {
        threshold::validate(self.confidence_threshold)
            .map_err(|_| ConfigError::ThresholdOutOfRange(self.confidence_threshold))?;

        let ModelConfig {
            num_classes,
            input_width,
            input_height,
        } = self.model;
        if input_width == 0 || input_height == 0 {
            return Err(ConfigError::EmptyInput {
                width: input_width,
                height: input_height,
            });
        }
        if num_classes == 0 {
            return Err(ConfigError::NoClasses);
        }
        if catalog.len() != num_classes {
            return Err(ConfigError::CatalogSizeMismatch {
                catalog: catalog.len(),
                num_classes,
            });
        }

        self.trigger_rules(catalog).map(|_| ())
    }

    /// Resolve trigger class names to indices.
    pub fn trigger_rules(
        &self,
        catalog: &ClassCatalog,
    ) -> std::result::Result<Vec<TriggerRule>, ConfigError> {
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(self.triggers.len());

        for trigger in &self.triggers {
            if !seen.insert(trigger.name.as_str()) {
                return Err(ConfigError::DuplicateTrigger(trigger.name.clone()));
            }
            let class_index =
                catalog
                    .index_of(&trigger.class)
                    .ok_or_else(|| ConfigError::UnknownTriggerClass {
                        rule: trigger.name.clone(),
                        class: trigger.class.clone(),
                    })?;

            let reaction = match &trigger.reaction {
                Reaction::Visibility { message } if message.is_empty() => Reaction::Visibility {
                    message: format!("{} Detected!", capitalize(&trigger.class)),
                },
                reaction => reaction.clone(),
            };

            rules.push(TriggerRule {
                name: trigger.name.clone(),
                class_index,
                reaction,
            });
        }

        Ok(rules)
    }

    pub fn decode_params(&self, confidence_threshold: f32) -> DecodeParams {
        DecodeParams {
            num_classes: self.model.num_classes,
            confidence_threshold,
            input_width: self.model.input_width,
            input_height: self.model.input_height,
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
