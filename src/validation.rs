//! Input validation for scheduling scenarios.
//!
//! Checks the structural integrity of a [`Scenario`] before compilation.
//! Registration already rejects unknown references and malformed
//! entities one at a time; this pass looks at the scenario as a whole and
//! reports every issue at once. Detects:
//! - Circular precedences with positive delay (DAG validation)
//! - Fixed resources that are not registered
//! - Fixed resources disjoint from a requirement's candidates
//! - Two requirements of one task competing for the same candidate
//! - Shared requirements across task groups of different sizes
//! - Negative horizons, and slice windows beyond the horizon
//!
//! Fixed starts that cannot fit the horizon are not reported here: the
//! compilers encode them and the solve answers `Infeasible`.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{HashMap, HashSet};

use crate::models::{PrecedenceKind, Scenario};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Precedences with positive delay form a cycle.
    CyclicDependency,
    /// A task pins a resource that doesn't exist.
    InvalidResourceReference,
    /// A task's fixed resources exclude every candidate of a requirement.
    EmptyCandidateSet,
    /// Two requirements of one task share a candidate.
    OverlappingRequirements,
    /// A shared requirement spans task groups of different sizes.
    GroupSizeMismatch,
    /// The horizon is negative.
    InvalidHorizon,
    /// A slice window extends past the horizon.
    OutsideHorizon,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a scenario.
///
/// Checks:
/// 1. The horizon is not negative
/// 2. Slice windows lie within the horizon
/// 3. Fixed resources are registered
/// 4. Fixed resources leave at least one candidate per requirement
/// 5. No two requirements of a task offer the same resource
/// 6. Shared requirements only span groups of equal size
/// 7. No circular precedences with positive delay
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_scenario(scenario: &Scenario) -> ValidationResult {
    let mut errors = Vec::new();

    if let Some(h) = scenario.horizon() {
        if h < 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidHorizon,
                format!("Horizon {h} is negative"),
            ));
        }
        for slice in scenario.constraints().capacities() {
            if slice.end > h {
                errors.push(ValidationError::new(
                    ValidationErrorKind::OutsideHorizon,
                    format!("Slice '{slice}' ends after horizon {h}"),
                ));
            }
        }
    }

    for task in scenario.tasks() {
        for r in &task.fixed_resources {
            if scenario.resource(r).is_none() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidResourceReference,
                    format!("Task '{}' is fixed to unknown resource '{r}'", task.id),
                ));
            }
        }

        let reqs: Vec<_> = scenario
            .constraints()
            .requirements_for_task(&task.id)
            .map(|(_, req)| req)
            .collect();
        for req in &reqs {
            if !task.fixed_resources.is_empty()
                && !req.candidate_ids().any(|c| task.allows_resource(c))
            {
                errors.push(ValidationError::new(
                    ValidationErrorKind::EmptyCandidateSet,
                    format!(
                        "Task '{}' is fixed to resources outside requirement '{req}'",
                        task.id
                    ),
                ));
            }
        }
        for (i, first) in reqs.iter().enumerate() {
            for second in &reqs[i + 1..] {
                if let Some(shared) = first.candidate_ids().find(|c| second.offers_resource(c)) {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::OverlappingRequirements,
                        format!(
                            "Task '{}' has two requirements offering resource '{shared}'",
                            task.id
                        ),
                    ));
                }
            }
        }
    }

    let mut group_sizes: HashMap<&str, usize> = HashMap::new();
    for task in scenario.tasks() {
        if let Some(g) = &task.group {
            *group_sizes.entry(g.as_str()).or_insert(0) += 1;
        }
    }
    let size_of = |task: &str| {
        scenario
            .task(task)
            .and_then(|t| t.group.as_deref())
            .and_then(|g| group_sizes.get(g).copied())
            .unwrap_or(1)
    };
    for req in scenario.constraints().requirements() {
        let sizes: HashSet<usize> = req.task_ids().map(size_of).collect();
        if sizes.len() > 1 {
            errors.push(ValidationError::new(
                ValidationErrorKind::GroupSizeMismatch,
                format!("Requirement '{req}' spans task groups of different sizes"),
            ));
        }
    }

    if let Some(cycle_err) = detect_cycles(scenario) {
        errors.push(cycle_err);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Detects cycles among Lax/Tight precedences whose delay
/// `length(left) + offset` is positive, using DFS.
///
/// Zero-delay cycles only force equal starts and are allowed.
///
/// # Algorithm
/// Topological sort via DFS. If a back-edge is found (visiting a node
/// currently in the recursion stack), a cycle exists.
///
/// # Reference
/// Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4
fn detect_cycles(scenario: &Scenario) -> Option<ValidationError> {
    // Build adjacency list: task_id → successors
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    for p in scenario.constraints().orderings() {
        if !matches!(p.kind, PrecedenceKind::Lax | PrecedenceKind::Tight) {
            continue;
        }
        let (Some(left), Some(right)) = (p.left_task(), p.right_task()) else {
            continue;
        };
        let length = scenario.task(left).map_or(0, |t| t.length);
        if length + p.offset > 0 {
            adj.entry(left).or_default().push(right);
        }
    }

    // DFS cycle detection
    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();

    for task in scenario.tasks() {
        let node = task.id.as_str();
        if !visited.contains(node) && has_cycle_dfs(node, &adj, &mut visited, &mut in_stack) {
            return Some(ValidationError::new(
                ValidationErrorKind::CyclicDependency,
                format!("Circular precedence detected involving task '{node}'"),
            ));
        }
    }

    None
}

fn has_cycle_dfs<'a>(
    node: &'a str,
    adj: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    in_stack: &mut HashSet<&'a str>,
) -> bool {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(neighbors) = adj.get(node) {
        for &next in neighbors {
            if in_stack.contains(next) {
                return true; // Back edge → cycle
            }
            if !visited.contains(next) && has_cycle_dfs(next, adj, visited, in_stack) {
                return true;
            }
        }
    }

    in_stack.remove(node);
    false
}
