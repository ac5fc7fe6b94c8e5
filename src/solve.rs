//! Compile-and-solve entry point.
//!
//! ```text
//! validate → compile → MipSolver::solve → materialize → objective value
//! ```

use tracing::info;

use crate::compile::{compile, CompileOptions, Formulation};
use crate::error::{Result, ScheduleError};
use crate::materialize::materialize;
use crate::models::{Scenario, Solution};
use crate::solver::{MicroLpSolver, MipSolver, SolverOutcome, SolverParams};
use crate::validation::validate_scenario;

/// Outcome of [`solve`].
#[derive(Debug, Clone, PartialEq)]
pub enum SolveResult {
    /// A solution and its objective value.
    Solved {
        solution: Solution,
        objective_value: f64,
    },
    Infeasible,
    /// The budget ran out before any feasible solution was found.
    TimedOutNoIncumbent,
}

impl SolveResult {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            SolveResult::Solved { solution, .. } => Some(solution),
            _ => None,
        }
    }

    pub fn objective_value(&self) -> Option<f64> {
        match self {
            SolveResult::Solved {
                objective_value, ..
            } => Some(*objective_value),
            _ => None,
        }
    }

    pub fn is_solved(&self) -> bool {
        matches!(self, SolveResult::Solved { .. })
    }
}

/// Solves a scenario with the bundled [`MicroLpSolver`].
///
/// # Errors
/// Some infeasible scenarios fail before compiling instead of returning
/// [`SolveResult::Infeasible`]: a cycle of precedences with positive
/// total delay is reported by [`validate_scenario`] as
/// [`ScheduleError::InvalidScenario`]. Infeasibility found by the solver
/// (including fixed starts beyond the horizon) is a
/// [`SolveResult::Infeasible`] outcome. Formulation limits surface as
/// [`ScheduleError::UnsupportedConstraint`], a missing horizon for the
/// time-indexed formulation as [`ScheduleError::MissingHorizon`].
///
/// # Example
/// ```
/// use u_schedule_mip::compile::Formulation;
/// use u_schedule_mip::models::{Precedence, Resource, ResourceRequirement, Scenario, Task};
/// use u_schedule_mip::solve::solve;
/// use u_schedule_mip::solver::SolverParams;
///
/// let mut s = Scenario::new("pair").with_horizon(4);
/// s.add_resource(Resource::new("R1")).unwrap();
/// s.add_task(Task::new("T1", 1)).unwrap();
/// s.add_task(Task::new("T2", 1)).unwrap();
/// s.add_requirement(ResourceRequirement::new(["T1", "T2"], ["R1"])).unwrap();
/// s.add_precedence(Precedence::lax("T1", "T2", 0)).unwrap();
///
/// let s = s.with_makespan_objective().unwrap();
/// let result = solve(&s, Formulation::TimeIndexed, &SolverParams::new()).unwrap();
/// assert_eq!(result.objective_value(), Some(2.0));
/// ```
pub fn solve(
    scenario: &Scenario,
    formulation: Formulation,
    params: &SolverParams,
) -> Result<SolveResult> {
    solve_with(&MicroLpSolver::new(), scenario, formulation, params)
}

/// Solves a scenario with any [`MipSolver`] backend.
///
/// Errors as for [`solve`].
pub fn solve_with(
    solver: &impl MipSolver,
    scenario: &Scenario,
    formulation: Formulation,
    params: &SolverParams,
) -> Result<SolveResult> {
    validate_scenario(scenario).map_err(ScheduleError::InvalidScenario)?;

    let options = CompileOptions { big_m: params.big_m };
    let compiled = compile(scenario, formulation, &options)?;

    let (values, incumbent) = match solver.solve(&compiled.model, params)? {
        SolverOutcome::Optimal { values, .. } => (values, false),
        SolverOutcome::Feasible { values, .. } => (values, true),
        SolverOutcome::Infeasible => {
            info!(scenario = scenario.name(), %formulation, "infeasible");
            return Ok(SolveResult::Infeasible);
        }
        SolverOutcome::TimedOut => {
            info!(scenario = scenario.name(), %formulation, "timed out without incumbent");
            return Ok(SolveResult::TimedOutNoIncumbent);
        }
    };

    let solution = materialize(scenario, &compiled, &values)?;
    let objective_value = scenario.objective_value(&solution);
    info!(
        scenario = scenario.name(),
        %formulation,
        solver = solver.name(),
        objective_value,
        incumbent,
        "solved"
    );
    Ok(SolveResult::Solved {
        solution,
        objective_value,
    })
}
