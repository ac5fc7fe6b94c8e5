//! In-process backend on `good_lp` + `microlp`.
//!
//! Branch-and-bound over LP relaxations, run on the calling thread. Each
//! node re-solves the relaxation with tightened variable bounds through
//! `good_lp`'s `microlp` engine. The time budget and the cancel flag are
//! checked between nodes, so a stopped search returns its best incumbent
//! (or none) and leaves nothing running.
//!
//! # Reference
//! Land & Doig (1960), "An Automatic Method of Solving Discrete
//! Programming Problems", Econometrica 28(3)

use std::collections::HashMap;
use std::time::Instant;

use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use super::{MipSolver, SolverOutcome, SolverParams, Verbosity};
use crate::error::{Result, ScheduleError};
use crate::mip::{MipModel, RowSense};

/// Feasibility tolerance for rows without variables.
const CONSTANT_ROW_TOLERANCE: f64 = 1e-9;

/// Distance from the nearest integer below which a value is integral.
const INTEGRALITY_TOLERANCE: f64 = 1e-6;

/// Absolute pruning margin.
const ABSOLUTE_GAP: f64 = 1e-6;

/// Variable bounds `(lower, upper)` of one search node.
type Bounds = Vec<(f64, f64)>;

/// Pure-Rust branch-and-bound backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicroLpSolver;

impl MicroLpSolver {
    pub fn new() -> Self {
        Self
    }
}

impl MipSolver for MicroLpSolver {
    fn name(&self) -> &str {
        "microlp"
    }

    fn solve(&self, model: &MipModel, params: &SolverParams) -> Result<SolverOutcome> {
        if params.is_cancelled() {
            info!(model = model.name(), "solve cancelled before start");
            return Ok(SolverOutcome::TimedOut);
        }

        if let Some(row) = model
            .rows()
            .iter()
            .find(|r| r.terms.is_empty() && !r.is_satisfied(&[], CONSTANT_ROW_TOLERANCE))
        {
            debug!(row = %row.name, "constant row cannot hold");
            return Ok(SolverOutcome::Infeasible);
        }

        let mut order: Vec<usize> = (0..model.num_rows())
            .filter(|&i| !model.rows()[i].terms.is_empty())
            .collect();
        if let Some(seed) = params.random_seed {
            order.shuffle(&mut StdRng::seed_from_u64(seed));
        }

        let started = Instant::now();
        let deadline = params.time_budget().map(|budget| started + budget);
        let mut search = Search::new(model, &order, params.relative_gap);
        let stopped = loop {
            if search.is_done() {
                break false;
            }
            if params.is_cancelled() {
                info!(model = model.name(), nodes = search.nodes, "solve cancelled");
                break true;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                info!(model = model.name(), nodes = search.nodes, "time limit reached");
                break true;
            }
            search.step()?;
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let nodes = search.nodes;
        let outcome = search.into_outcome(stopped);
        let status = match &outcome {
            SolverOutcome::Optimal { .. } => "optimal",
            SolverOutcome::Feasible { .. } => "feasible",
            SolverOutcome::Infeasible => "infeasible",
            SolverOutcome::TimedOut => "timed out",
        };
        if params.verbosity == Verbosity::Verbose {
            info!(model = model.name(), status, nodes, elapsed_ms, "microlp finished");
        } else {
            debug!(model = model.name(), status, nodes, elapsed_ms, "microlp finished");
        }
        Ok(outcome)
    }
}

/// Depth-first branch-and-bound state.
struct Search<'m> {
    model: &'m MipModel,
    order: &'m [usize],
    relative_gap: f64,
    open: Vec<Bounds>,
    /// Best integral assignment and its objective.
    incumbent: Option<(Vec<f64>, f64)>,
    nodes: usize,
}

impl<'m> Search<'m> {
    fn new(model: &'m MipModel, order: &'m [usize], relative_gap: f64) -> Self {
        let root = model
            .variables()
            .iter()
            .map(|v| {
                if v.kind.is_integral() {
                    (v.lower.ceil(), v.upper.floor())
                } else {
                    (v.lower, v.upper)
                }
            })
            .collect();
        Self {
            model,
            order,
            relative_gap,
            open: vec![root],
            incumbent: None,
            nodes: 0,
        }
    }

    fn is_done(&self) -> bool {
        self.open.is_empty()
    }

    /// Whether a node with relaxation value `bound` can beat the incumbent.
    fn improves(&self, bound: f64) -> bool {
        match &self.incumbent {
            None => true,
            Some((_, best)) => bound < best - ABSOLUTE_GAP.max(self.relative_gap * best.abs()),
        }
    }

    /// Most fractional integral variable, if any.
    fn branching_var(&self, x: &[f64]) -> Option<usize> {
        self.model
            .variables()
            .iter()
            .zip(x)
            .enumerate()
            .filter(|(_, (v, _))| v.kind.is_integral())
            .map(|(i, (_, &value))| (i, (value - value.round()).abs()))
            .filter(|&(_, distance)| distance > INTEGRALITY_TOLERANCE)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Processes one open node.
    fn step(&mut self) -> Result<()> {
        let Some(bounds) = self.open.pop() else {
            return Ok(());
        };
        self.nodes += 1;
        if bounds.iter().any(|&(lo, hi)| lo > hi) {
            return Ok(());
        }
        let Some(x) = relax(self.model, self.order, &bounds)? else {
            return Ok(());
        };
        let bound = self.model.objective().evaluate(&x);
        if !self.improves(bound) {
            return Ok(());
        }

        match self.branching_var(&x) {
            None => {
                let rounded: Vec<f64> = self
                    .model
                    .variables()
                    .iter()
                    .zip(x)
                    .map(|(v, value)| if v.kind.is_integral() { value.round() } else { value })
                    .collect();
                let objective = self.model.objective().evaluate(&rounded);
                debug!(objective, nodes = self.nodes, "new incumbent");
                self.incumbent = Some((rounded, objective));
            }
            Some(i) => {
                let value = x[i];
                let mut down = bounds.clone();
                down[i].1 = value.floor();
                let mut up = bounds;
                up[i].0 = value.ceil();
                // The nearer side is explored first.
                if value - value.floor() < 0.5 {
                    self.open.push(up);
                    self.open.push(down);
                } else {
                    self.open.push(down);
                    self.open.push(up);
                }
            }
        }
        Ok(())
    }

    fn into_outcome(self, stopped: bool) -> SolverOutcome {
        let Some((dense, objective)) = self.incumbent else {
            return if stopped {
                SolverOutcome::TimedOut
            } else {
                SolverOutcome::Infeasible
            };
        };
        let values: HashMap<String, f64> = self
            .model
            .variables()
            .iter()
            .zip(dense)
            .map(|(v, x)| (v.name.clone(), x))
            .collect();
        if stopped {
            SolverOutcome::Feasible { values, objective }
        } else {
            SolverOutcome::Optimal { values, objective }
        }
    }
}

/// Solves the LP relaxation under `bounds`, rows in `order`.
///
/// `None` when infeasible.
fn relax(model: &MipModel, order: &[usize], bounds: &[(f64, f64)]) -> Result<Option<Vec<f64>>> {
    let mut vars = ProblemVariables::new();
    let handles: Vec<good_lp::Variable> = model
        .variables()
        .iter()
        .zip(bounds)
        .map(|(v, &(lo, hi))| {
            let mut def = variable().name(v.name.clone());
            if lo.is_finite() {
                def = def.min(lo);
            }
            if hi.is_finite() {
                def = def.max(hi);
            }
            vars.add(def)
        })
        .collect();

    let mut objective = Expression::from(model.objective().constant);
    for &(v, c) in &model.objective().terms {
        objective.add_mul(c, handles[v.0]);
    }
    let mut problem = vars.minimise(objective).using(good_lp::microlp);

    for &i in order {
        let row = &model.rows()[i];
        // a <= b  <=>  -a >= -b
        let sign = if row.sense == RowSense::Le { -1.0 } else { 1.0 };
        let mut lhs = Expression::from(0.0);
        for &(v, c) in &row.terms {
            lhs.add_mul(sign * c, handles[v.0]);
        }
        let c = match row.sense {
            RowSense::Eq => constraint::eq(lhs, row.rhs),
            RowSense::Ge | RowSense::Le => constraint::geq(lhs, sign * row.rhs),
        };
        problem.add_constraint(c);
    }

    match problem.solve() {
        Ok(solution) => Ok(Some(handles.iter().map(|&h| solution.value(h)).collect())),
        Err(ResolutionError::Infeasible) => Ok(None),
        Err(e) => Err(ScheduleError::Solver(format!(
            "relaxation of '{}' failed: {e}",
            model.name()
        ))),
    }
}
