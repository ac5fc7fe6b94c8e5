//! Scenario-to-MIP compilation.
//!
//! Two independent formulations of the same scenario:
//!
//! - [`Formulation::ContinuousBigM`]: one continuous start variable per
//!   task, binary resource choices, and pairwise ordering disjunctions
//!   deactivated by a big-M constant. Disjunctive resources only.
//! - [`Formulation::TimeIndexed`]: one integer start-count variable per
//!   task group and period. Needs a horizon; supports every constraint.
//!
//! Both produce a [`CompiledModel`] whose variables follow the naming
//! scheme below, which the materializer reads back.
//!
//! | variable | meaning |
//! |----------|---------|
//! | `start[T]` | start of task `T` (big-M) |
//! | `assign[T,r,R]` | `T` takes `R` for requirement `r` (big-M) |
//! | `order[T,U]` | `T` ends before `U` starts (big-M) |
//! | `share[T,U]` | `T` and `U` hold a common resource (big-M) |
//! | `x[G,t]` | instances of group `G` starting at `t` (time-indexed) |
//! | `xr[G,k,R,t]` | of those, instances taking `R` for requirement slot `k` |

mod bigm;
mod time_indexed;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::capacity::OccupancyIndex;
use crate::error::Result;
use crate::groups::TaskGroups;
use crate::mip::MipModel;
use crate::models::Scenario;

/// MIP formulation choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Formulation {
    /// Continuous start times with big-M ordering disjunctions.
    ContinuousBigM,
    /// Discrete per-period start indicators.
    TimeIndexed,
}

impl fmt::Display for Formulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formulation::ContinuousBigM => f.write_str("continuous big-M"),
            Formulation::TimeIndexed => f.write_str("time-indexed"),
        }
    }
}

/// Compiler knobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Big-M override. `None` = computed safe bound.
    pub big_m: Option<f64>,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_big_m(mut self, big_m: f64) -> Self {
        self.big_m = Some(big_m);
        self
    }
}

/// A compiled scenario, ready for a solver.
#[derive(Debug, Clone)]
pub struct CompiledModel {
    pub formulation: Formulation,
    pub model: MipModel,
    /// Group partition the model was built over.
    pub groups: TaskGroups,
    /// Symbolic occupancy `(group, resource, start)` (time-indexed only).
    pub occupancy: OccupancyIndex,
    /// Big-M constant in use (big-M only).
    pub big_m: Option<f64>,
}

/// Compiles a scenario with the chosen formulation.
pub fn compile(
    scenario: &Scenario,
    formulation: Formulation,
    options: &CompileOptions,
) -> Result<CompiledModel> {
    let compiled = match formulation {
        Formulation::ContinuousBigM => bigm::compile(scenario, options)?,
        Formulation::TimeIndexed => time_indexed::compile(scenario)?,
    };
    info!(
        scenario = scenario.name(),
        %formulation,
        variables = compiled.model.num_vars(),
        integral = compiled.model.num_integral(),
        rows = compiled.model.num_rows(),
        "compiled scenario"
    );
    Ok(compiled)
}

pub(crate) fn start_var(task: &str) -> String {
    format!("start[{task}]")
}

pub(crate) fn assign_var(task: &str, requirement: usize, resource: &str) -> String {
    format!("assign[{task},{requirement},{resource}]")
}

pub(crate) fn order_var(first: &str, second: &str) -> String {
    format!("order[{first},{second}]")
}

pub(crate) fn share_var(a: &str, b: &str) -> String {
    format!("share[{a},{b}]")
}

pub(crate) fn x_var(group: &str, t: i64) -> String {
    format!("x[{group},{t}]")
}

pub(crate) fn xr_var(group: &str, slot: usize, resource: &str, t: i64) -> String {
    format!("xr[{group},{slot},{resource},{t}]")
}
