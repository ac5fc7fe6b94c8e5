//! Post-solve verification.
//!
//! Re-checks every constraint of a scenario against a concrete
//! [`Solution`], independently of the formulation that produced it.
//! Constraints on task groups are checked at group level, with the same
//! cumulative semantics the time-indexed compiler encodes.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::capacity::{self, SolutionOccupancy};
use crate::error::Result;
use crate::groups::{GroupOrdering, TaskGroups};
use crate::models::{PrecedenceKind, Scenario, Solution, Violation, ViolationType};

/// Checks `solution` against every constraint of `scenario`.
///
/// Returns all violations found; an empty list means the solution is
/// feasible.
pub fn verify_solution(scenario: &Scenario, solution: &Solution) -> Result<Vec<Violation>> {
    let groups = TaskGroups::partition(scenario)?;
    let mut violations = Vec::new();

    check_placements(scenario, solution, &mut violations);
    check_bounds(scenario, solution, &mut violations);
    for o in groups.orderings(scenario) {
        check_ordering(scenario, &groups, &o, solution, &mut violations);
    }
    check_requirements(scenario, &groups, solution, &mut violations);
    check_capacity(scenario, solution, &mut violations);

    let occupancy = SolutionOccupancy::new(&groups, solution);
    for slice in scenario.constraints().capacities() {
        let contributors = capacity::contributors(scenario, &groups, slice)?;
        let value = capacity::evaluate(slice, &contributors, &occupancy);
        if !slice.is_satisfied_by(value) {
            violations.push(Violation::new(
                ViolationType::SliceViolation,
                &slice.resource,
                format!("{slice}: aggregate is {value}"),
            ));
        }
    }

    debug!(violations = violations.len(), "solution verified");
    Ok(violations)
}

fn check_placements(scenario: &Scenario, solution: &Solution, out: &mut Vec<Violation>) {
    for task in scenario.tasks() {
        let Some(p) = solution.placement(&task.id) else {
            if !task.is_optional() {
                out.push(Violation::new(
                    ViolationType::Unscheduled,
                    &task.id,
                    "mandatory task is not scheduled",
                ));
            }
            continue;
        };
        if p.start < 0 || scenario.horizon().is_some_and(|h| p.end > h) {
            out.push(Violation::new(
                ViolationType::StartOutOfRange,
                &task.id,
                format!("[{}, {}) leaves the horizon", p.start, p.end),
            ));
        }
        if task.fixed_start.is_some_and(|f| f != p.start) {
            out.push(Violation::new(
                ViolationType::StartOutOfRange,
                &task.id,
                format!("starts at {} instead of its fixed start", p.start),
            ));
        }
    }
}

fn check_bounds(scenario: &Scenario, solution: &Solution, out: &mut Vec<Violation>) {
    for bound in scenario.constraints().bounds() {
        let (Some(task), Some(b)) = (bound.bounded_task(), bound.bound()) else {
            continue;
        };
        let Some(p) = solution.placement(task) else {
            continue;
        };
        let broken = match bound.kind {
            PrecedenceKind::LowerBound => p.start < b,
            PrecedenceKind::UpperBound => p.end > b,
            _ => false,
        };
        if broken {
            out.push(Violation::new(
                ViolationType::BoundViolation,
                task,
                format!("{bound} violated by [{}, {})", p.start, p.end),
            ));
        }
    }
}

/// Sorted starts of the scheduled instances of a group.
fn scheduled_starts(groups: &TaskGroups, group: usize, solution: &Solution) -> Vec<i64> {
    let mut starts: Vec<i64> = groups
        .group(group)
        .instances
        .iter()
        .filter_map(|id| solution.placement(id).map(|p| p.start))
        .collect();
    starts.sort_unstable();
    starts
}

fn check_ordering(
    scenario: &Scenario,
    groups: &TaskGroups,
    o: &GroupOrdering,
    solution: &Solution,
    out: &mut Vec<Violation>,
) {
    let (ga, gb) = (groups.group(o.left), groups.group(o.right));
    let length = groups
        .representative(scenario, o.left)
        .map_or(0, |t| t.length);
    let shift = length + o.offset;

    if o.kind == PrecedenceKind::Conditional {
        // Singletons only; any shared resource activates the ordering.
        let (Some(pa), Some(pb)) = (
            solution.placement(ga.representative()),
            solution.placement(gb.representative()),
        ) else {
            return;
        };
        let shared = pa.resources.iter().any(|r| pb.resources.contains(r));
        if shared && pa.start + shift > pb.start {
            out.push(Violation::new(
                ViolationType::PrecedenceViolation,
                gb.representative(),
                format!(
                    "'{}' shares a resource with '{}' but starts at {} (earliest {})",
                    gb.representative(),
                    ga.representative(),
                    pb.start,
                    pa.start + shift
                ),
            ));
        }
        return;
    }

    let a_starts = scheduled_starts(groups, o.left, solution);
    let b_starts = scheduled_starts(groups, o.right, solution);
    let (wa, wb) = (ga.size() as i64, gb.size() as i64);
    let started = |starts: &[i64], t: i64| starts.iter().take_while(|&&s| s <= t).count() as i64;

    let mut checkpoints: Vec<i64> = b_starts.clone();
    if o.kind == PrecedenceKind::Tight {
        checkpoints.extend(a_starts.iter().map(|s| s + shift));
    }
    for t in checkpoints {
        let lhs = wa * started(&b_starts, t);
        let rhs = wb * started(&a_starts, t - shift);
        let broken = match o.kind {
            PrecedenceKind::Tight => lhs != rhs,
            _ => lhs > rhs,
        };
        if broken {
            out.push(Violation::new(
                ViolationType::PrecedenceViolation,
                &gb.id,
                format!(
                    "'{}' must follow '{}' by {} periods (checked at {t})",
                    gb.id, ga.id, shift
                ),
            ));
            return;
        }
    }
}

fn check_requirements(
    scenario: &Scenario,
    groups: &TaskGroups,
    solution: &Solution,
    out: &mut Vec<Violation>,
) {
    // Resource count per task, then candidates and fixed resources.
    for task in scenario.tasks() {
        let Some(p) = solution.placement(&task.id) else {
            continue;
        };
        let reqs: Vec<_> = scenario.constraints().requirements_for_task(&task.id).collect();
        if reqs.len() != p.resources.len() {
            out.push(Violation::new(
                ViolationType::ResourceMismatch,
                &task.id,
                format!(
                    "{} resources bound for {} requirements",
                    p.resources.len(),
                    reqs.len()
                ),
            ));
            continue;
        }
        for ((_, req), resource) in reqs.iter().zip(&p.resources) {
            if !req.offers_resource(resource) || !task.allows_resource(resource) {
                out.push(Violation::new(
                    ViolationType::ResourceMismatch,
                    &task.id,
                    format!("'{resource}' does not satisfy {req}"),
                ));
            }
        }
    }

    // Shared requirements: per group, the resource histogram of the slot.
    for (r, req) in scenario.constraints().requirements().iter().enumerate() {
        if req.tasks.len() < 2 {
            continue;
        }
        let mut histograms: Vec<(&str, BTreeMap<&str, usize>)> = Vec::new();
        let mut seen = Vec::new();
        for task in req.task_ids() {
            let Some(g) = groups.index_of(task) else {
                continue;
            };
            if seen.contains(&g) {
                continue;
            }
            seen.push(g);
            let Some(k) = scenario
                .constraints()
                .requirements_for_task(task)
                .position(|(i, _)| i == r)
            else {
                continue;
            };
            let mut histogram = BTreeMap::new();
            for id in &groups.group(g).instances {
                if let Some(resource) = solution.placement(id).and_then(|p| p.resources.get(k)) {
                    *histogram.entry(resource.as_str()).or_insert(0) += 1;
                }
            }
            histograms.push((task, histogram));
        }
        if let Some((first, expected)) = histograms.first() {
            for (task, histogram) in &histograms[1..] {
                if histogram != expected {
                    out.push(Violation::new(
                        ViolationType::ResourceMismatch,
                        *task,
                        format!("does not share the resources of '{first}' for {req}"),
                    ));
                }
            }
        }
    }
}

fn check_capacity(scenario: &Scenario, solution: &Solution, out: &mut Vec<Violation>) {
    let mut usage: HashMap<&str, BTreeMap<i64, i64>> = HashMap::new();
    let mut busy: HashMap<&str, f64> = HashMap::new();
    for (task, p) in solution.placements() {
        let reqs = scenario.constraints().requirements_for_task(task);
        for ((_, req), resource) in reqs.zip(&p.resources) {
            let periods = usage.entry(resource.as_str()).or_default();
            for t in p.start..p.end {
                *periods.entry(t).or_insert(0) += req.units;
            }
            *busy.entry(resource.as_str()).or_insert(0.0) += (req.units * (p.end - p.start)) as f64;
        }
    }

    for resource in scenario.resources() {
        if let Some((t, used)) = usage
            .get(resource.id.as_str())
            .and_then(|periods| periods.iter().find(|&(_, &u)| u > resource.size))
        {
            out.push(Violation::new(
                ViolationType::CapacityExceeded,
                &resource.id,
                format!("{used} units in use at period {t}, capacity {}", resource.size),
            ));
        }
        let total = busy.get(resource.id.as_str()).copied().unwrap_or(0.0);
        let below = resource.load_lower.is_some_and(|lo| total < lo - capacity::TOLERANCE);
        let above = resource.load_upper.is_some_and(|hi| total > hi + capacity::TOLERANCE);
        if below || above {
            out.push(Violation::new(
                ViolationType::LoadViolation,
                &resource.id,
                format!("total load {total} outside its bounds"),
            ));
        }
    }
}
