//! Step inference: derives the wizard's current step from the form snapshot.
//!
//! There is no stored "current step". Each step is gated by one field; the
//! current step is the first one whose gate is still empty. Once every gate
//! is filled the wizard sits on the terminal (review) step.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::StepError;

use super::model::{FieldName, FormSnapshot};

/// One step of the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// 1-based position.
    pub rank: u32,
    pub label: String,
    /// Field that must be non-empty to move past this step.
    pub gate: Option<FieldName>,
}

impl StepDefinition {
    pub fn new(rank: u32, label: impl Into<String>, gate: Option<FieldName>) -> Self {
        Self {
            rank,
            label: label.into(),
            gate,
        }
    }
}

/// Steps of the school setup wizard.
pub fn school_setup_steps() -> Vec<StepDefinition> {
    vec![
        StepDefinition::new(1, "Email", Some(FieldName::PhoneNumber)),
        StepDefinition::new(2, "Number", Some(FieldName::Address)),
        StepDefinition::new(3, "Address", Some(FieldName::Prefix)),
        StepDefinition::new(4, "Prefix", Some(FieldName::LogoUrl)),
        StepDefinition::new(5, "Logo", Some(FieldName::StampUrl)),
        StepDefinition::new(6, "", None),
    ]
}

/// How a step renders in the stepper indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Current,
    Upcoming,
}

/// A step together with its status for a given snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepProgress {
    pub rank: u32,
    pub label: String,
    pub status: StepStatus,
}

/// Computes the current step from an immutable step list.
#[derive(Debug, Clone)]
pub struct StepInferenceEngine {
    steps: Vec<StepDefinition>,
}

impl StepInferenceEngine {
    /// Validate and wrap a step list.
    ///
    /// Ranks must run 1..=N in order, only the last step may lack a gate, and
    /// no field may gate two steps.
    pub fn new(steps: Vec<StepDefinition>) -> Result<Self, StepError> {
        if steps.is_empty() {
            return Err(StepError::Empty);
        }

        let last = steps.len() - 1;
        let mut gates = HashSet::new();
        for (index, step) in steps.iter().enumerate() {
            let expected = index as u32 + 1;
            if step.rank != expected {
                return Err(StepError::NonContiguous {
                    expected,
                    found: step.rank,
                });
            }
            match step.gate {
                Some(field) => {
                    if !gates.insert(field) {
                        return Err(StepError::DuplicateGate {
                            field: field.to_string(),
                        });
                    }
                }
                None if index != last => {
                    return Err(StepError::MissingGate { rank: step.rank });
                }
                None => {}
            }
        }

        Ok(Self { steps })
    }

    /// Engine over the school setup steps.
    pub fn school_setup() -> Self {
        Self {
            steps: school_setup_steps(),
        }
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    /// Rank of the last step.
    pub fn terminal_rank(&self) -> u32 {
        self.steps.len() as u32
    }

    /// Rank of the step gated by `field`, if any.
    pub fn gate_rank(&self, field: FieldName) -> Option<u32> {
        self.steps
            .iter()
            .find(|s| s.gate == Some(field))
            .map(|s| s.rank)
    }

    /// Rank of the first step whose gate is empty, or the terminal rank.
    ///
    /// Recomputed from scratch every time: a later gate filled before an
    /// earlier one does not count, and clearing a gate moves the step back.
    pub fn current_step(&self, snapshot: &FormSnapshot) -> u32 {
        self.steps
            .iter()
            .find(|s| s.gate.is_some_and(|gate| !snapshot.is_filled(gate)))
            .map(|s| s.rank)
            .unwrap_or_else(|| self.terminal_rank())
    }

    /// Label of the current step.
    pub fn current_label(&self, snapshot: &FormSnapshot) -> &str {
        let rank = self.current_step(snapshot);
        self.steps
            .get(rank as usize - 1)
            .map(|s| s.label.as_str())
            .unwrap_or("")
    }

    /// Whether every gate is filled.
    pub fn is_complete(&self, snapshot: &FormSnapshot) -> bool {
        self.steps
            .iter()
            .filter_map(|s| s.gate)
            .all(|gate| snapshot.is_filled(gate))
    }

    /// Per-step status for the stepper indicator.
    pub fn progress(&self, snapshot: &FormSnapshot) -> Vec<StepProgress> {
        let current = self.current_step(snapshot);
        self.steps
            .iter()
            .map(|s| StepProgress {
                rank: s.rank,
                label: s.label.clone(),
                status: if s.rank < current {
                    StepStatus::Completed
                } else if s.rank == current {
                    StepStatus::Current
                } else {
                    StepStatus::Upcoming
                },
            })
            .collect()
    }
}

impl Default for StepInferenceEngine {
    fn default() -> Self {
        Self::school_setup()
    }
}
