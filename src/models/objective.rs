//! Linear completion-time objective.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Linear objective: `Σ weight(T) · end(T)`, minimized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    weights: BTreeMap<String, f64>,
}

impl Objective {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `weight` to the task's coefficient.
    pub fn with_term(mut self, task: impl Into<String>, weight: f64) -> Self {
        self.add_term(task, weight);
        self
    }

    pub fn add_term(&mut self, task: impl Into<String>, weight: f64) {
        *self.weights.entry(task.into()).or_insert(0.0) += weight;
    }

    /// The task's weight (0 if absent).
    pub fn weight(&self, task: &str) -> f64 {
        self.weights.get(task).copied().unwrap_or(0.0)
    }

    /// Terms in task-id order.
    pub fn terms(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(t, w)| (t.as_str(), *w))
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.weights.is_empty() {
            return f.write_str("0");
        }
        let terms: Vec<String> = self
            .weights
            .iter()
            .map(|(task, w)| format!("{w}*{task}"))
            .collect();
        f.write_str(&terms.join(" + "))
    }
}
