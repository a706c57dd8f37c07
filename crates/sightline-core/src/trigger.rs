//! Per-frame trigger state machine
//!
//! Visibility reactions are level-triggered: recomputed from the current
//! frame alone, with no debounce. Spawn reactions are edge-triggered and move
//! `Idle -> Spawned` once; only an explicit reset returns them to `Idle`.

use crate::detection::DetectionSet;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placement and presentation of an entity created by a spawn reaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnSpec {
    pub entity: String,
    /// Distance in front of the viewer.
    pub distance: f32,
    /// Offset added after the forward placement.
    pub offset: [f32; 3],
    /// Uniform scale.
    pub scale: f32,
    /// Animation trigger fired once the entity exists.
    pub animation: Option<String>,
    pub play_sound: bool,
}

impl Default for SpawnSpec {
    fn default() -> Self {
        Self {
            entity: "marker".to_string(),
            distance: 2.0,
            offset: [0.0, 0.0, 2.0],
            scale: 3.0,
            animation: Some("StartAnimation".to_string()),
            play_sound: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reaction {
    /// Show `message` while the class is present.
    Visibility { message: String },
    /// Create an entity the first time the class is present.
    Spawn(SpawnSpec),
}

/// A reaction bound to one class index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRule {
    pub name: String,
    pub class_index: usize,
    pub reaction: Reaction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpawnState {
    #[default]
    Idle,
    Spawned,
}

/// Visibility of one rule for the current frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityUpdate {
    pub rule: String,
    pub visible: bool,
    /// Differs from the previous frame.
    pub changed: bool,
    pub message: String,
}

/// One-time request to create an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub rule: String,
    pub class_index: usize,
    pub spec: SpawnSpec,
}

/// Reactions produced by one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerOutcome {
    pub visibility: Vec<VisibilityUpdate>,
    pub spawns: Vec<SpawnRequest>,
}

/// Presence flags and spawn state across frames.
#[derive(Debug, Clone)]
pub struct FrameDetectionState {
    rules: Vec<TriggerRule>,
    presence: BTreeMap<usize, bool>,
    visible: BTreeMap<String, bool>,
    spawn: BTreeMap<String, SpawnState>,
}

impl FrameDetectionState {
    pub fn new(rules: Vec<TriggerRule>) -> Self {
        let presence = rules.iter().map(|rule| (rule.class_index, false)).collect();
        let mut visible = BTreeMap::new();
        let mut spawn = BTreeMap::new();
        for rule in &rules {
            match rule.reaction {
                Reaction::Visibility { .. } => {
                    visible.insert(rule.name.clone(), false);
                }
                Reaction::Spawn(_) => {
                    spawn.insert(rule.name.clone(), SpawnState::Idle);
                }
            }
        }

        Self {
            rules,
            presence,
            visible,
            spawn,
        }
    }

    /// Consume one frame's detections.
    pub fn update(&mut self, detections: &DetectionSet) -> TriggerOutcome {
        for (class_index, present) in self.presence.iter_mut() {
            *present = detections.contains_class(*class_index);
        }

        let mut outcome = TriggerOutcome::default();
        for rule in &self.rules {
            let present = self.presence.get(&rule.class_index).copied().unwrap_or(false);

            match &rule.reaction {
                Reaction::Visibility { message } => {
                    let previous = self.visible.insert(rule.name.clone(), present);
                    outcome.visibility.push(VisibilityUpdate {
                        rule: rule.name.clone(),
                        visible: present,
                        changed: previous != Some(present),
                        message: message.clone(),
                    });
                }
                Reaction::Spawn(spec) => {
                    let state = self.spawn.entry(rule.name.clone()).or_default();
                    if present && *state == SpawnState::Idle {
                        *state = SpawnState::Spawned;
                        info!("Spawning '{}' for rule '{}'", spec.entity, rule.name);
                        outcome.spawns.push(SpawnRequest {
                            rule: rule.name.clone(),
                            class_index: rule.class_index,
                            spec: spec.clone(),
                        });
                    }
                }
            }
        }

        outcome
    }

    pub fn rules(&self) -> &[TriggerRule] {
        &self.rules
    }

    /// Presence of a tracked class in the most recent frame.
    pub fn is_present(&self, class_index: usize) -> bool {
        self.presence.get(&class_index).copied().unwrap_or(false)
    }

    pub fn presence(&self) -> &BTreeMap<usize, bool> {
        &self.presence
    }

    pub fn is_visible(&self, rule: &str) -> bool {
        self.visible.get(rule).copied().unwrap_or(false)
    }

    pub fn spawn_state(&self, rule: &str) -> Option<SpawnState> {
        self.spawn.get(rule).copied()
    }

    /// Tear down: every spawn rule back to `Idle`, all flags cleared.
    pub fn reset(&mut self) {
        self.presence.values_mut().for_each(|present| *present = false);
        self.visible.values_mut().for_each(|visible| *visible = false);
        self.spawn
            .values_mut()
            .for_each(|state| *state = SpawnState::Idle);
    }

    /// Return a single spawn rule to `Idle`. False when no such spawn rule exists.
    pub fn reset_kind(&mut self, rule: &str) -> bool {
        match self.spawn.get_mut(rule) {
            Some(state) => {
                *state = SpawnState::Idle;
                true
            }
            None => false,
        }
    }
}
