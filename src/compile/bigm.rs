//! Continuous big-M formulation.
//!
//! # Model
//! - `start[T] ∈ [lo(T), S - len(T)]`, continuous
//! - `assign[T,r,R] ∈ {0,1}`, `Σ_R assign[T,r,R] = 1` per requirement `r`
//! - for tasks `T`, `U` with a common candidate:
//!   `order[T,U] + order[U,T] = 1`,
//!   `share[T,U] >= assign[T,·,R] + assign[U,·,R] - 1`,
//!   `start(T) + len(T) <= start(U) + M (1 - order[T,U]) + M (1 - share[T,U])`
//! - precedences as direct rows; conditional ones relaxed by `M (1 - share)`
//!
//! `S` is the horizon, or a serial-schedule bound counting every offset
//! by magnitude without one, and
//! `M = S + max(0, max offset)` so an inactive disjunct never binds.
//!
//! # Reference
//! Manne (1960), "On the Job-Shop Scheduling Problem", Operations Research 8(2)

use std::collections::HashMap;

use tracing::{debug, warn};

use super::{
    assign_var, order_var, share_var, start_var, CompileOptions, CompiledModel, Formulation,
};
use crate::capacity::OccupancyIndex;
use crate::error::{Result, ScheduleError};
use crate::groups::{GroupOrdering, TaskGroups};
use crate::mip::{LinearExpr, MipModel, VarId};
use crate::models::{PrecedenceKind, Scenario};

fn unsupported(reason: impl Into<String>) -> ScheduleError {
    ScheduleError::UnsupportedConstraint {
        formulation: Formulation::ContinuousBigM,
        reason: reason.into(),
    }
}

/// Rejects what a disjunctive big-M model cannot express.
fn check_supported(scenario: &Scenario) -> Result<()> {
    if let Some(t) = scenario.tasks().iter().find(|t| t.is_optional()) {
        return Err(unsupported(format!("optional task '{}'", t.id)));
    }
    if !scenario.constraints().capacities().is_empty() {
        return Err(unsupported("capacity slices"));
    }
    if let Some(r) = scenario.resources().iter().find(|r| r.has_load_bounds()) {
        return Err(unsupported(format!("load bounds on resource '{}'", r.id)));
    }
    for req in scenario.constraints().requirements() {
        if req.units != 1 {
            return Err(unsupported(format!("multi-unit requirement '{req}'")));
        }
        for r in req.candidate_ids() {
            if scenario.resource(r).is_some_and(|r| !r.is_unary()) {
                return Err(unsupported(format!("resource '{r}' of size > 1")));
            }
        }
    }
    Ok(())
}

fn check_orderings(
    scenario: &Scenario,
    groups: &TaskGroups,
    orderings: &[GroupOrdering],
) -> Result<()> {
    let has_fixed = |g: usize| {
        groups.group(g).instances.iter().any(|id| {
            scenario
                .task(id)
                .is_some_and(|t| t.fixed_start.is_some())
        })
    };
    for o in orderings {
        let (a, b) = (groups.group(o.left), groups.group(o.right));
        if o.kind == PrecedenceKind::Conditional && (!a.is_singleton() || !b.is_singleton()) {
            return Err(unsupported(format!(
                "conditional precedence between groups '{}' and '{}'",
                a.id, b.id
            )));
        }
        if a.size() > 1 && b.size() > 1 {
            if a.size() != b.size() {
                return Err(unsupported(format!(
                    "precedence between groups '{}' ({}) and '{}' ({}) of unequal size",
                    a.id,
                    a.size(),
                    b.id,
                    b.size()
                )));
            }
            if has_fixed(o.left) || has_fixed(o.right) {
                return Err(unsupported(format!(
                    "precedence between groups '{}' and '{}' with fixed instances",
                    a.id, b.id
                )));
            }
        }
    }
    Ok(())
}

/// Length of the time span every start variable lives in.
///
/// Without a horizon: the latest forced start, then every task in series
/// with every offset as a gap. A negative tight offset forces its left
/// task to start at least `|offset| - len` late, so offsets count by
/// magnitude.
fn span(scenario: &Scenario, groups: &TaskGroups, orderings: &[GroupOrdering]) -> i64 {
    if let Some(h) = scenario.horizon() {
        return h;
    }
    let fixed = scenario.tasks().iter().filter_map(|t| t.fixed_start);
    let lower = (0..groups.len()).map(|g| groups.window(scenario, g).earliest);
    let base = fixed.chain(lower).max().unwrap_or(0).max(0);
    let lengths: i64 = scenario.tasks().iter().map(|t| t.length).sum();
    let offsets: i64 = orderings.iter().map(|o| o.offset.abs()).sum();
    base + lengths + offsets
}

/// Instance pairs a group-level ordering expands to.
fn ordering_pairs<'g>(groups: &'g TaskGroups, o: &GroupOrdering) -> Vec<(&'g str, &'g str)> {
    let (a, b) = (groups.group(o.left), groups.group(o.right));
    if a.is_singleton() {
        b.instances
            .iter()
            .map(|bi| (a.representative(), bi.as_str()))
            .collect()
    } else if b.is_singleton() {
        a.instances
            .iter()
            .map(|ai| (ai.as_str(), b.representative()))
            .collect()
    } else {
        a.instances
            .iter()
            .zip(&b.instances)
            .map(|(ai, bi)| (ai.as_str(), bi.as_str()))
            .collect()
    }
}

pub(super) fn compile(scenario: &Scenario, options: &CompileOptions) -> Result<CompiledModel> {
    check_supported(scenario)?;
    let groups = TaskGroups::partition(scenario)?;
    let orderings = groups.orderings(scenario);
    check_orderings(scenario, &groups, &orderings)?;

    let span = span(scenario, &groups, &orderings);
    let max_offset = orderings.iter().map(|o| o.offset).max().unwrap_or(0).max(0);
    let safe_m = (span + max_offset) as f64;
    let big_m = match options.big_m {
        Some(m) if m < safe_m => {
            warn!(big_m = m, safe_bound = safe_m, "big-M override below the safe bound");
            m
        }
        Some(m) => m,
        None => safe_m,
    };
    debug!(span, big_m, "big-M sizing");

    let mut model = MipModel::new(format!("{}-bigm", scenario.name()));

    // Start variables.
    let mut starts: HashMap<&str, VarId> = HashMap::new();
    for task in scenario.tasks() {
        let window = groups
            .index_of(&task.id)
            .map(|g| groups.window(scenario, g))
            .unwrap_or_default();
        let mut lo = window.earliest.max(0);
        let mut hi = span - task.length;
        if let Some(end) = window.latest_end {
            hi = hi.min(end - task.length);
        }
        if let Some(fixed) = task.fixed_start {
            if fixed < lo || fixed > hi {
                model.ge(format!("fixed[{}]", task.id), LinearExpr::new(), 1.0);
            }
            lo = fixed;
            hi = fixed;
        } else if lo > hi {
            model.ge(format!("window[{}]", task.id), LinearExpr::new(), 1.0);
            hi = lo;
        }
        let v = model.continuous(start_var(&task.id), lo as f64, hi as f64);
        starts.insert(task.id.as_str(), v);

        let w = scenario.task_weight(&task.id);
        model.add_objective_term(v, w);
        model.add_objective_constant(w * task.length as f64);
    }

    // Resource choice.
    let mut assigned: HashMap<&str, Vec<(String, VarId)>> = HashMap::new();
    for (r, req) in scenario.constraints().requirements().iter().enumerate() {
        let candidates = scenario.requirement_candidates(req);
        let mut first: Option<&str> = None;
        for task in req.task_ids() {
            let length = scenario.task(task).map_or(0, |t| t.length);
            let mut choose = LinearExpr::new();
            for &res in &candidates {
                let a = model.binary(assign_var(task, r, res));
                choose.add_term(a, 1.0);
                assigned
                    .entry(task)
                    .or_default()
                    .push((res.to_string(), a));
                if let Some(cost) = scenario.resource(res).and_then(|x| x.cost_per_period) {
                    model.add_objective_term(a, cost * length as f64);
                }
                if let Some(lead) = first {
                    if let Some(b) = model.var(&assign_var(lead, r, res)) {
                        model.eq(
                            format!("together[{r},{task},{res}]"),
                            LinearExpr::term(a, 1.0).with_term(b, -1.0),
                            0.0,
                        );
                    }
                }
            }
            model.eq(format!("choose[{task},{r}]"), choose, 1.0);
            first.get_or_insert(task);
        }
    }

    // Pairwise disjunctions.
    let tasks = scenario.tasks();
    let mut shares: HashMap<(&str, &str), VarId> = HashMap::new();
    for (i, ti) in tasks.iter().enumerate() {
        let Some(ai) = assigned.get(ti.id.as_str()) else {
            continue;
        };
        for tj in &tasks[i + 1..] {
            let Some(aj) = assigned.get(tj.id.as_str()) else {
                continue;
            };
            let common: Vec<(VarId, VarId, &str)> = ai
                .iter()
                .flat_map(|(ri, vi)| {
                    aj.iter()
                        .filter(move |(rj, _)| rj == ri)
                        .map(move |(_, vj)| (*vi, *vj, ri.as_str()))
                })
                .collect();
            if common.is_empty() {
                continue;
            }
            let (si, sj) = (starts[ti.id.as_str()], starts[tj.id.as_str()]);
            let pij = model.binary(order_var(&ti.id, &tj.id));
            let pji = model.binary(order_var(&tj.id, &ti.id));
            model.eq(
                format!("disjoin[{},{}]", ti.id, tj.id),
                LinearExpr::term(pij, 1.0).with_term(pji, 1.0),
                1.0,
            );
            let s = model.binary(share_var(&ti.id, &tj.id));
            for (k, (vi, vj, res)) in common.iter().enumerate() {
                model.ge(
                    format!("link[{},{},{res},{k}]", ti.id, tj.id),
                    LinearExpr::term(s, 1.0)
                        .with_term(*vi, -1.0)
                        .with_term(*vj, -1.0),
                    -1.0,
                );
            }
            for (first, second, fs, ss, len, p) in [
                (&ti.id, &tj.id, si, sj, ti.length, pij),
                (&tj.id, &ti.id, sj, si, tj.length, pji),
            ] {
                // start(first) + len - start(second) + M p + M s <= 2M
                model.le(
                    format!("no_overlap[{first},{second}]"),
                    LinearExpr::term(fs, 1.0)
                        .with_term(ss, -1.0)
                        .with_term(p, big_m)
                        .with_term(s, big_m)
                        .with_constant(len as f64),
                    2.0 * big_m,
                );
            }
            shares.insert((ti.id.as_str(), tj.id.as_str()), s);
        }
    }

    // Precedences.
    for (n, o) in orderings.iter().enumerate() {
        let length = groups
            .representative(scenario, o.left)
            .map_or(0, |t| t.length);
        let shift = (length + o.offset) as f64;
        for (a, b) in ordering_pairs(&groups, o) {
            let (sa, sb) = (starts[a], starts[b]);
            let diff = LinearExpr::term(sa, 1.0).with_term(sb, -1.0);
            let name = format!("prec{n}[{a},{b}]");
            match o.kind {
                PrecedenceKind::Lax => model.le(name, diff, -shift),
                PrecedenceKind::Tight => model.eq(name, diff, -shift),
                PrecedenceKind::Conditional => {
                    let key = if shares.contains_key(&(a, b)) { (a, b) } else { (b, a) };
                    // Without a common candidate the condition never holds.
                    if let Some(&s) = shares.get(&key) {
                        model.le(name, diff.with_term(s, big_m), big_m - shift);
                    }
                }
                PrecedenceKind::LowerBound | PrecedenceKind::UpperBound => {}
            }
        }
    }

    // Symmetry breaking among interchangeable free instances.
    for (g, group) in groups.groups().iter().enumerate() {
        if group.is_singleton()
            || groups
                .requirement_slots(scenario, g)
                .iter()
                .any(|s| !s.partners.is_empty())
        {
            continue;
        }
        let free: Vec<&str> = group
            .instances
            .iter()
            .filter(|id| scenario.task(id).is_some_and(|t| t.fixed_start.is_none()))
            .map(String::as_str)
            .collect();
        for pair in free.windows(2) {
            model.le(
                format!("symmetry[{},{}]", pair[0], pair[1]),
                LinearExpr::term(starts[pair[0]], 1.0).with_term(starts[pair[1]], -1.0),
                0.0,
            );
        }
    }

    model.finalize();
    Ok(CompiledModel {
        formulation: Formulation::ContinuousBigM,
        model,
        groups,
        occupancy: OccupancyIndex::new(),
        big_m: Some(big_m),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CapacitySlice, Precedence, Resource, ResourceRequirement, SliceKind, Task};

    fn pair_scenario() -> Scenario {
        let mut s = Scenario::new("pair");
        s.add_resource(Resource::new("R1")).unwrap();
        s.add_task(Task::new("T1", 1)).unwrap();
        s.add_task(Task::new("T2", 1)).unwrap();
        s.add_requirement(ResourceRequirement::new(["T1"], ["R1"]))
            .unwrap();
        s.add_requirement(ResourceRequirement::new(["T2"], ["R1"]))
            .unwrap();
        s
    }

    /// Dense assignment from `(name, value)` pairs (others 0).
    fn values(model: &MipModel, named: &[(&str, f64)]) -> Vec<f64> {
        let mut v = vec![0.0; model.num_vars()];
        for (name, x) in named {
            v[model.var(name).unwrap().0] = *x;
        }
        v
    }

    #[test]
    fn test_span_and_big_m() {
        let mut s = pair_scenario();
        s.add_precedence(Precedence::lax("T1", "T2", 3)).unwrap();
        let c = compile(&s, &CompileOptions::new()).unwrap();
        // span = 0 + (1 + 1) + 3, M = span + 3
        assert_eq!(c.big_m, Some(8.0));
        let start = c.model.var("start[T2]").unwrap();
        assert_eq!(c.model.variable(start).upper, 4.0);

        let with_horizon = pair_scenario().with_horizon(10);
        let c = compile(&with_horizon, &CompileOptions::new()).unwrap();
        assert_eq!(c.big_m, Some(10.0));

        let c = compile(&with_horizon, &CompileOptions::new().with_big_m(3.0)).unwrap();
        assert_eq!(c.big_m, Some(3.0));
    }

    #[test]
    fn test_span_covers_negative_tight_offset() {
        // start(B) = start(A) + 1 - 5 pushes A to 4 at the earliest.
        let mut s = Scenario::new("lag");
        s.add_task(Task::new("A", 1)).unwrap();
        s.add_task(Task::new("B", 1)).unwrap();
        s.add_precedence(Precedence::tight("A", "B", -5)).unwrap();
        let c = compile(&s, &CompileOptions::new()).unwrap();
        // span = 0 + (1 + 1) + |-5|
        assert_eq!(c.big_m, Some(7.0));
        let a = c.model.var("start[A]").unwrap();
        assert_eq!(c.model.variable(a).upper, 6.0);

        let earliest = values(&c.model, &[("start[A]", 4.0), ("start[B]", 0.0)]);
        assert!(c.model.is_feasible(&earliest, 1e-6));
    }

    #[test]
    fn test_disjunction_rows() {
        let c = compile(&pair_scenario(), &CompileOptions::new()).unwrap();
        let m = &c.model;
        for name in [
            "start[T1]",
            "assign[T1,0,R1]",
            "assign[T2,1,R1]",
            "order[T1,T2]",
            "order[T2,T1]",
            "share[T1,T2]",
        ] {
            assert!(m.var(name).is_some(), "missing {name}");
        }

        let sequential = values(
            m,
            &[
                ("start[T1]", 0.0),
                ("start[T2]", 1.0),
                ("assign[T1,0,R1]", 1.0),
                ("assign[T2,1,R1]", 1.0),
                ("order[T1,T2]", 1.0),
                ("share[T1,T2]", 1.0),
            ],
        );
        assert!(m.is_feasible(&sequential, 1e-6));

        // Overlap on the shared resource is cut off whatever the order.
        for order in ["order[T1,T2]", "order[T2,T1]"] {
            let overlap = values(
                m,
                &[
                    ("start[T1]", 0.0),
                    ("start[T2]", 0.0),
                    ("assign[T1,0,R1]", 1.0),
                    ("assign[T2,1,R1]", 1.0),
                    (order, 1.0),
                    ("share[T1,T2]", 1.0),
                ],
            );
            assert!(!m.is_feasible(&overlap, 1e-6));
        }
    }

    #[test]
    fn test_conditional_precedence_rows() {
        let mut s = Scenario::new("cond");
        s.add_resource(Resource::new("R1")).unwrap();
        s.add_resource(Resource::new("R2")).unwrap();
        s.add_task(Task::new("T1", 1)).unwrap();
        s.add_task(Task::new("T2", 1)).unwrap();
        s.add_requirement(ResourceRequirement::new(["T1"], ["R1", "R2"]))
            .unwrap();
        s.add_requirement(ResourceRequirement::new(["T2"], ["R1", "R2"]))
            .unwrap();
        s.add_precedence(Precedence::conditional("T1", "T2", 2))
            .unwrap();
        let c = compile(&s, &CompileOptions::new()).unwrap();
        let m = &c.model;

        // Different resources, both at 0: allowed.
        let apart = values(
            m,
            &[
                ("assign[T1,0,R1]", 1.0),
                ("assign[T2,1,R2]", 1.0),
                ("order[T1,T2]", 1.0),
            ],
        );
        assert!(m.is_feasible(&apart, 1e-6));

        // Same resource: T2 must wait 2 periods after T1 ends.
        let close = values(
            m,
            &[
                ("start[T2]", 1.0),
                ("assign[T1,0,R1]", 1.0),
                ("assign[T2,1,R1]", 1.0),
                ("order[T1,T2]", 1.0),
                ("share[T1,T2]", 1.0),
            ],
        );
        assert!(!m.is_feasible(&close, 1e-6));
        let far = values(
            m,
            &[
                ("start[T2]", 3.0),
                ("assign[T1,0,R1]", 1.0),
                ("assign[T2,1,R1]", 1.0),
                ("order[T1,T2]", 1.0),
                ("share[T1,T2]", 1.0),
            ],
        );
        assert!(m.is_feasible(&far, 1e-6));
    }

    #[test]
    fn test_group_precedence_pairs_and_symmetry() {
        let mut s = Scenario::new("groups");
        for i in 0..2 {
            s.add_task(Task::new(format!("A{i}"), 1).with_group("A"))
                .unwrap();
            s.add_task(Task::new(format!("B{i}"), 1).with_group("B"))
                .unwrap();
        }
        s.add_precedence(Precedence::lax("A0", "B1", 0)).unwrap();
        let c = compile(&s, &CompileOptions::new()).unwrap();
        let m = &c.model;
        assert!(m.rows().iter().any(|r| r.name == "prec0[A0,B0]"));
        assert!(m.rows().iter().any(|r| r.name == "prec0[A1,B1]"));
        assert!(m.rows().iter().any(|r| r.name == "symmetry[A0,A1]"));
    }

    #[test]
    fn test_unsupported_inputs() {
        let mut s = pair_scenario();
        s.add_capacity(CapacitySlice::new("R1", "length", SliceKind::Sum))
            .unwrap();
        assert!(matches!(
            compile(&s, &CompileOptions::new()),
            Err(ScheduleError::UnsupportedConstraint { .. })
        ));

        let mut s = pair_scenario();
        s.add_task(Task::new("O", 1).with_schedule_cost(1.0)).unwrap();
        assert!(compile(&s, &CompileOptions::new()).is_err());

        let mut s = pair_scenario();
        s.add_resource(Resource::new("big").with_size(2)).unwrap();
        s.add_requirement(ResourceRequirement::new(["T1"], ["big"]))
            .unwrap();
        assert!(compile(&s, &CompileOptions::new()).is_err());

        let mut s = Scenario::new("uneven");
        for i in 0..2 {
            s.add_task(Task::new(format!("A{i}"), 1).with_group("A"))
                .unwrap();
        }
        for i in 0..3 {
            s.add_task(Task::new(format!("B{i}"), 1).with_group("B"))
                .unwrap();
        }
        s.add_precedence(Precedence::lax("A0", "B0", 0)).unwrap();
        let err = compile(&s, &CompileOptions::new()).unwrap_err();
        assert!(err.to_string().contains("unequal size"));
    }

    #[test]
    fn test_fixed_start_outside_window_is_infeasible() {
        let mut s = pair_scenario().with_horizon(3);
        s.add_task(Task::new("late", 2).with_fixed_start(2)).unwrap();
        let c = compile(&s, &CompileOptions::new()).unwrap();
        let row = c
            .model
            .rows()
            .iter()
            .find(|r| r.name == "fixed[late]")
            .unwrap();
        assert!(row.terms.is_empty());
        assert!(!row.is_satisfied(&[], 1e-6));
    }
}
