//! Task model.
//!
//! A task is a unit of work with an integer length, to be placed on the
//! discrete timeline and bound to resources through
//! [`ResourceRequirement`](super::ResourceRequirement)s.
//!
//! # Time Representation
//! Times are integer periods relative to the scenario epoch (t=0).
//! A task started at `t` occupies the half-open interval `[t, t + length)`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the built-in parameter that resolves to a task's length.
pub const LENGTH_PARAM: &str = "length";

/// A task to be scheduled.
///
/// Input fields (`fixed_start`, `fixed_resources`, ...) are set while the
/// scenario is built. `start` and `resources` are solution attachments,
/// written once by [`Scenario::apply_solution`](super::Scenario::apply_solution).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: String,
    /// Number of periods the task occupies (>= 0).
    pub length: i64,
    /// Pre-fixed start period. `None` = decided by the solver.
    pub fixed_start: Option<i64>,
    /// Resources the task is pinned to. Empty = any candidate.
    pub fixed_resources: Vec<String>,
    /// Named numeric parameters, aggregated by capacity slices.
    pub params: BTreeMap<String, f64>,
    /// Symmetry group. Tasks sharing a group are interchangeable instances.
    pub group: Option<String>,
    /// Linear cost per period of completion time.
    pub completion_time_cost: Option<f64>,
    /// Cost of scheduling the task at all. Tasks carrying it are optional.
    pub schedule_cost: Option<f64>,
    /// Solved start period.
    pub start: Option<i64>,
    /// Solved resource bindings.
    pub resources: Vec<String>,
}

impl Task {
    /// Creates a new task with the given ID and length.
    pub fn new(id: impl Into<String>, length: i64) -> Self {
        Self {
            id: id.into(),
            length,
            fixed_start: None,
            fixed_resources: Vec::new(),
            params: BTreeMap::new(),
            group: None,
            completion_time_cost: None,
            schedule_cost: None,
            start: None,
            resources: Vec::new(),
        }
    }

    /// Fixes the start period.
    pub fn with_fixed_start(mut self, start: i64) -> Self {
        self.fixed_start = Some(start);
        self
    }

    /// Pins the task to a resource.
    pub fn with_fixed_resource(mut self, resource: impl Into<String>) -> Self {
        self.fixed_resources.push(resource.into());
        self
    }

    /// Sets a named parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: f64) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// Places the task in a symmetry group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Sets the completion-time cost coefficient.
    pub fn with_completion_time_cost(mut self, cost: f64) -> Self {
        self.completion_time_cost = Some(cost);
        self
    }

    /// Sets the schedule cost, making the task optional.
    pub fn with_schedule_cost(mut self, cost: f64) -> Self {
        self.schedule_cost = Some(cost);
        self
    }

    /// Looks up a parameter; `length` falls back to the task length.
    pub fn param(&self, name: &str) -> Option<f64> {
        self.params
            .get(name)
            .copied()
            .or_else(|| (name == LENGTH_PARAM).then_some(self.length as f64))
    }

    /// Whether the solver may leave this task unscheduled.
    pub fn is_optional(&self) -> bool {
        self.schedule_cost.is_some()
    }

    /// Solved end period (`start + length`).
    pub fn end(&self) -> Option<i64> {
        self.start.map(|s| s + self.length)
    }

    /// Whether `resource` passes the fixed-resource restriction.
    pub fn allows_resource(&self, resource: &str) -> bool {
        self.fixed_resources.is_empty() || self.fixed_resources.iter().any(|r| r == resource)
    }
}
