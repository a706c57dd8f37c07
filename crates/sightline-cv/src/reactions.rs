//! Reaction sinks

use crate::traits::ReactionSink;
use log::info;
use serde::Serialize;
use sightline_core::{SpawnRequest, VisibilityUpdate};

/// Logs visibility changes and spawns.
#[derive(Debug, Default)]
pub struct LogSink;

impl ReactionSink for LogSink {
    fn set_visible(&mut self, update: &VisibilityUpdate) {
        if !update.changed {
            return;
        }
        if update.visible {
            info!("[{}] {}", update.rule, update.message);
        } else {
            info!("[{}] hidden", update.rule);
        }
    }

    fn spawn(&mut self, request: &SpawnRequest) {
        let spec = &request.spec;
        info!(
            "[{}] create '{}' at distance {} offset {:?} scale {}{}{}",
            request.rule,
            spec.entity,
            spec.distance,
            spec.offset,
            spec.scale,
            spec.animation
                .as_deref()
                .map(|trigger| format!(", animation '{}'", trigger))
                .unwrap_or_default(),
            if spec.play_sound { ", with sound" } else { "" },
        );
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ReactionEvent {
    Visibility(VisibilityUpdate),
    Spawn(SpawnRequest),
}

/// Keeps every reaction it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<ReactionEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawns(&self) -> impl Iterator<Item = &SpawnRequest> {
        self.events.iter().filter_map(|event| match event {
            ReactionEvent::Spawn(request) => Some(request),
            ReactionEvent::Visibility(_) => None,
        })
    }

    /// Most recent visibility reported for `rule`.
    pub fn last_visibility(&self, rule: &str) -> Option<bool> {
        self.events.iter().rev().find_map(|event| match event {
            ReactionEvent::Visibility(update) if update.rule == rule => Some(update.visible),
            _ => None,
        })
    }
}

impl ReactionSink for RecordingSink {
    fn set_visible(&mut self, update: &VisibilityUpdate) {
        self.events.push(ReactionEvent::Visibility(update.clone()));
    }

    fn spawn(&mut self, request: &SpawnRequest) {
        self.events.push(ReactionEvent::Spawn(request.clone()));
    }
}
