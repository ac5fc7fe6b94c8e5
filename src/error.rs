//! Error types for scenario building, compilation and materialization.
//!
//! Solver outcomes that are legitimate answers (`Infeasible`, timeout
//! without incumbent) are *not* errors; they are variants of
//! [`SolveResult`](crate::solve::SolveResult).

use std::fmt;

use thiserror::Error;

use crate::compile::Formulation;
use crate::validation::ValidationError;

/// Kind of entity referenced by an [`ScheduleError::UnknownEntity`] or
/// [`ScheduleError::DuplicateEntity`] error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Task,
    Resource,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Task => f.write_str("task"),
            EntityKind::Resource => f.write_str("resource"),
        }
    }
}

/// Main error type for scheduling model operations.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// An algebraic comparison does not reduce to a single precedence or bound.
    #[error("invalid precedence shape: {0}")]
    InvalidPrecedenceShape(String),

    /// A constraint references an entity id that is not registered.
    #[error("unknown {kind} '{id}'")]
    UnknownEntity { kind: EntityKind, id: String },

    /// An entity id is already registered with different content.
    #[error("duplicate {kind} '{id}'")]
    DuplicateEntity { kind: EntityKind, id: String },

    /// An entity or constraint violates a structural invariant.
    #[error("invalid entity '{id}': {reason}")]
    InvalidEntity { id: String, reason: String },

    /// No task that can occupy the resource defines the sliced parameter.
    #[error("capacity slice on '{resource}' references unknown parameter '{parameter}'")]
    UnknownParameter { resource: String, parameter: String },

    /// The time-indexed formulation was requested without a horizon.
    #[error("time-indexed formulation requires a finite horizon")]
    MissingHorizon,

    /// Instances of a task group do not share the same shape.
    #[error("invalid task group '{group}': {reason}")]
    InvalidGroup { group: String, reason: String },

    /// The requested formulation cannot express part of the scenario.
    #[error("{formulation} formulation does not support {reason}")]
    UnsupportedConstraint {
        formulation: Formulation,
        reason: String,
    },

    /// Internal consistency error: fewer solved slots than instances to place.
    #[error("task group '{group}' resolved {slots} slots for {instances} instances")]
    UnderDeterminedGroup {
        group: String,
        slots: usize,
        instances: usize,
    },

    /// Internal consistency error: the solved assignment lacks a model variable.
    #[error("solved assignment is missing variable '{key}'")]
    UnsolvedModel { key: String },

    /// Pre-compile validation found structural problems.
    #[error("scenario failed validation with {} issue(s)", .0.len())]
    InvalidScenario(Vec<ValidationError>),

    /// The solver backend failed for a reason other than infeasibility.
    #[error("solver failure: {0}")]
    Solver(String),
}

/// Result type alias for scheduling model operations.
pub type Result<T> = std::result::Result<T, ScheduleError>;
