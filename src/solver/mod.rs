//! External solver boundary.
//!
//! A solver consumes a [`MipModel`] (flat variable declarations, rows and
//! a minimized objective) and answers with a name-keyed assignment or an
//! infeasibility/timeout signal. Search itself is out of scope: backends
//! are black boxes behind [`MipSolver`].
//!
//! # Backends
//! - [`MicroLpSolver`]: in-process pure-Rust branch-and-bound through
//!   `good_lp`'s `microlp` engine.

mod microlp;

pub use microlp::MicroLpSolver;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::mip::MipModel;

/// Default relative optimality gap.
pub const DEFAULT_RELATIVE_GAP: f64 = 1e-4;

/// Solver log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    #[default]
    Quiet,
    Verbose,
}

/// Shared cancellation flag.
///
/// Clones share the flag; [`cancel`](Self::cancel) from any thread stops
/// a running solve at its next poll.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options recognized by every solve.
///
/// # Example
/// ```
/// use u_schedule_mip::solver::{SolverParams, Verbosity};
///
/// let params = SolverParams::new()
///     .with_time_limit(10.0)
///     .with_random_seed(42)
///     .with_verbosity(Verbosity::Verbose);
/// assert_eq!(params.random_seed, Some(42));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    /// Wall-clock budget in seconds. `None` = unlimited.
    pub time_limit: Option<f64>,
    /// Seed for any randomized choice in the backend.
    pub random_seed: Option<u64>,
    /// Relative optimality gap at which the search may stop.
    pub relative_gap: f64,
    pub verbosity: Verbosity,
    /// Big-M override for the continuous formulation.
    pub big_m: Option<f64>,
    #[serde(skip)]
    pub cancel: Option<CancelFlag>,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            time_limit: None,
            random_seed: None,
            relative_gap: DEFAULT_RELATIVE_GAP,
            verbosity: Verbosity::Quiet,
            big_m: None,
            cancel: None,
        }
    }
}

impl SolverParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn with_relative_gap(mut self, gap: f64) -> Self {
        self.relative_gap = gap;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_big_m(mut self, big_m: f64) -> Self {
        self.big_m = Some(big_m);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// The time limit as a [`Duration`]; non-positive or non-finite
    /// limits mean no limit.
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_limit
            .filter(|s| s.is_finite() && *s > 0.0)
            .map(Duration::from_secs_f64)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }
}

/// What a backend answered.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverOutcome {
    /// Proven optimal assignment.
    Optimal {
        values: HashMap<String, f64>,
        objective: f64,
    },
    /// Best incumbent when the search stopped early.
    Feasible {
        values: HashMap<String, f64>,
        objective: f64,
    },
    Infeasible,
    /// Stopped by time limit or cancellation without an incumbent.
    TimedOut,
}

/// A MIP backend.
pub trait MipSolver {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Minimizes `model` under `params`.
    ///
    /// Infeasibility and timeouts are outcomes; `Err` is reserved for
    /// backend failures.
    fn solve(&self, model: &MipModel, params: &SolverParams) -> Result<SolverOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_defaults() {
        let p = SolverParams::new();
        assert_eq!(p.relative_gap, DEFAULT_RELATIVE_GAP);
        assert_eq!(p.verbosity, Verbosity::Quiet);
        assert!(p.time_budget().is_none());
        assert!(!p.is_cancelled());
    }

    #[test]
    fn test_params_serde_round_trip() {
        let p = SolverParams::new()
            .with_time_limit(2.5)
            .with_random_seed(7)
            .with_big_m(100.0)
            .with_cancel(CancelFlag::new());
        let json = serde_json::to_string(&p).unwrap();
        let back: SolverParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back.time_limit, Some(2.5));
        assert_eq!(back.random_seed, Some(7));
        assert_eq!(back.big_m, Some(100.0));
        assert!(back.cancel.is_none());

        let partial: SolverParams = serde_json::from_str(r#"{"verbosity":"Verbose"}"#).unwrap();
        assert_eq!(partial.verbosity, Verbosity::Verbose);
        assert_eq!(partial.relative_gap, DEFAULT_RELATIVE_GAP);
    }

    #[test]
    fn test_cancel_flag_shared() {
        let flag = CancelFlag::new();
        let params = SolverParams::new().with_cancel(flag.clone());
        assert!(!params.is_cancelled());
        flag.cancel();
        assert!(params.is_cancelled());
    }

    #[test]
    fn test_time_budget() {
        assert_eq!(
            SolverParams::new().with_time_limit(1.5).time_budget(),
            Some(Duration::from_millis(1500))
        );
        assert!(SolverParams::new().with_time_limit(0.0).time_budget().is_none());
    }
}
