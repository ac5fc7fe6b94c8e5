//! Solution model.
//!
//! A solution places every scheduled task at a concrete start period and
//! binds it to concrete resources. Its canonical form is the ordered
//! sequence of `(task, resource, start, end)` assignments sorted by
//! `(start, task, resource)`.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Where and when one task runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub start: i64,
    pub end: i64,
    /// One resource per requirement of the task, in requirement order.
    pub resources: Vec<String>,
}

/// A task-resource-time assignment.
///
/// Tasks without resource requirements appear once with `resource: None`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Assignment {
    pub start: i64,
    pub task: String,
    pub resource: Option<String>,
    pub end: i64,
}

impl Assignment {
    /// Duration (end - start).
    #[inline]
    pub fn duration(&self) -> i64 {
        self.end - self.start
    }
}

/// A constraint violation found when re-checking a solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub violation_type: ViolationType,
    /// Related entity id (task or resource).
    pub entity_id: String,
    pub message: String,
}

/// Classification of constraint violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// A mandatory task has no placement.
    Unscheduled,
    /// A placement leaves the horizon or contradicts a fixed start.
    StartOutOfRange,
    /// A lower/upper start bound is violated.
    BoundViolation,
    /// An ordering precedence is violated.
    PrecedenceViolation,
    /// A requirement is not met by exactly one shared candidate.
    ResourceMismatch,
    /// Resource capacity exceeded at some period.
    CapacityExceeded,
    /// A capacity slice aggregate violates its bound.
    SliceViolation,
    /// Total resource load outside its bounds.
    LoadViolation,
}

impl Violation {
    pub fn new(
        violation_type: ViolationType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }
}

/// A materialized schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    placements: BTreeMap<String, Placement>,
    assignments: Vec<Assignment>,
    unscheduled: Vec<String>,
}

impl Solution {
    /// Builds a solution and its canonical assignment order.
    pub fn new(placements: BTreeMap<String, Placement>, mut unscheduled: Vec<String>) -> Self {
        let mut assignments = Vec::new();
        for (task, p) in &placements {
            if p.resources.is_empty() {
                assignments.push(Assignment {
                    start: p.start,
                    task: task.clone(),
                    resource: None,
                    end: p.end,
                });
            }
            for r in &p.resources {
                assignments.push(Assignment {
                    start: p.start,
                    task: task.clone(),
                    resource: Some(r.clone()),
                    end: p.end,
                });
            }
        }
        // Field order of `Assignment` gives (start, task, resource).
        assignments.sort();
        unscheduled.sort();
        Self {
            placements,
            assignments,
            unscheduled,
        }
    }

    /// Canonical ordered assignments.
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// `(task, resource, start, end)` tuples for resource-bound assignments.
    pub fn tuples(&self) -> Vec<(&str, &str, i64, i64)> {
        self.assignments
            .iter()
            .filter_map(|a| {
                a.resource
                    .as_deref()
                    .map(|r| (a.task.as_str(), r, a.start, a.end))
            })
            .collect()
    }

    pub fn placement(&self, task: &str) -> Option<&Placement> {
        self.placements.get(task)
    }

    pub fn placements(&self) -> impl Iterator<Item = (&str, &Placement)> {
        self.placements.iter().map(|(t, p)| (t.as_str(), p))
    }

    /// Optional tasks left out of the schedule.
    pub fn unscheduled(&self) -> &[String] {
        &self.unscheduled
    }

    pub fn is_scheduled(&self, task: &str) -> bool {
        self.placements.contains_key(task)
    }

    /// Latest end across all placements.
    pub fn makespan(&self) -> i64 {
        self.placements.values().map(|p| p.end).max().unwrap_or(0)
    }

    pub fn assignments_for_resource(&self, resource: &str) -> Vec<&Assignment> {
        self.assignments
            .iter()
            .filter(|a| a.resource.as_deref() == Some(resource))
            .collect()
    }

    /// Total busy periods per resource (sum of assignment durations).
    pub fn busy_periods(&self) -> HashMap<String, i64> {
        let mut busy: HashMap<String, i64> = HashMap::new();
        for a in &self.assignments {
            if let Some(r) = &a.resource {
                *busy.entry(r.clone()).or_insert(0) += a.duration();
            }
        }
        busy
    }

    /// Resource utilization: busy periods / horizon.
    ///
    /// Returns `None` if `horizon` is not positive.
    pub fn resource_utilization(&self, resource: &str, horizon: i64) -> Option<f64> {
        if horizon <= 0 {
            return None;
        }
        let busy: i64 = self
            .assignments_for_resource(resource)
            .iter()
            .map(|a| a.duration())
            .sum();
        Some(busy as f64 / horizon as f64)
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}
