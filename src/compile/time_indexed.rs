//! Discrete time-indexed formulation.
//!
//! # Model
//! - `x[G,t] ∈ [fixed(G,t), |G|]`, integer: instances of group `G`
//!   starting at period `t`; `Σ_t x[G,t] = |G|` (`<=` when optional)
//! - `xr[G,k,R,t]`: the part of `x[G,t]` taking `R` for requirement
//!   slot `k`, when the slot has more than one candidate;
//!   `Σ_R xr[G,k,R,t] = x[G,t]`
//! - capacity: `Σ units · occ(G,k,R,s) <= size(R)` over `s ∈ [p - len(G) + 1, p]`
//! - precedence `A → B` with shift `d = len(A) + offset`, over the
//!   cumulative starts `C(t) = Σ_{s <= t} x[·,s]`:
//!   `|A| · C_B(t) <= |B| · C_A(t - d)` (`=` when tight)
//!
//! The horizon bounds every period index.
//!
//! # Reference
//! Pritsker, Watters & Wolfe (1969), "Multiproject scheduling with limited
//! resources: a zero-one programming approach", Management Science 16(1)

use tracing::{debug, warn};

use super::{x_var, xr_var, CompiledModel, Formulation};
use crate::capacity::{self, OccupancyIndex};
use crate::error::{Result, ScheduleError};
use crate::groups::{GroupOrdering, RequirementSlot, TaskGroups};
use crate::mip::{LinearExpr, MipModel, Row, RowSense, VarId};
use crate::models::{PrecedenceKind, Resource, Scenario, Task};

fn unsupported(reason: impl Into<String>) -> ScheduleError {
    ScheduleError::UnsupportedConstraint {
        formulation: Formulation::TimeIndexed,
        reason: reason.into(),
    }
}

/// Start variables in period order.
type Starts = Vec<(i64, VarId)>;

/// Variables of one requirement slot.
#[derive(Debug)]
struct SlotPlan {
    slot: RequirementSlot,
    /// Per candidate, the occupancy variables in period order.
    occupancy: Vec<(String, Starts)>,
}

impl SlotPlan {
    fn on(&self, resource: &str) -> Option<&Starts> {
        self.occupancy
            .iter()
            .find(|(r, _)| r == resource)
            .map(|(_, v)| v)
    }
}

/// Variables of one task group.
#[derive(Debug)]
struct GroupPlan<'s> {
    task: &'s Task,
    size: usize,
    /// Start domain `[lo, hi]`, empty when `lo > hi`.
    lo: i64,
    hi: i64,
    starts: Starts,
    slots: Vec<SlotPlan>,
}

impl GroupPlan<'_> {
    fn has_domain(&self) -> bool {
        self.lo <= self.hi
    }
}

/// `Σ_{s <= t} vars[s]`.
fn cumulative(starts: &[(i64, VarId)], t: i64) -> LinearExpr {
    let mut expr = LinearExpr::new();
    for &(_, v) in starts.iter().take_while(|(s, _)| *s <= t) {
        expr.add_term(v, 1.0);
    }
    expr
}

pub(super) fn compile(scenario: &Scenario) -> Result<CompiledModel> {
    let horizon = scenario.horizon().ok_or(ScheduleError::MissingHorizon)?;
    let groups = TaskGroups::partition(scenario)?;
    let orderings = groups.orderings(scenario);
    let mut model = MipModel::new(format!("{}-time-indexed", scenario.name()));

    let plans = declare_groups(scenario, &groups, horizon, &mut model)?;
    let occupancy = occupancy_index(&plans);
    debug!(
        groups = plans.len(),
        occupancy = occupancy.len(),
        horizon,
        "time-indexed variables declared"
    );

    link_together(&groups, &plans, &mut model);

    #[cfg(feature = "parallel")]
    let rows: Vec<Row> = {
        use rayon::prelude::*;
        scenario
            .resources()
            .par_iter()
            .flat_map_iter(|r| capacity_rows(r, &plans, horizon))
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let rows: Vec<Row> = scenario
        .resources()
        .iter()
        .flat_map(|r| capacity_rows(r, &plans, horizon))
        .collect();
    model.extend_rows(rows);

    for resource in scenario.resources() {
        load_rows(resource, &plans, &mut model);
    }

    for (n, o) in orderings.iter().enumerate() {
        ordering_rows(n, o, &groups, &plans, &mut model)?;
    }

    for (id, slice) in scenario.constraints().capacities().iter().enumerate() {
        let contributors = capacity::contributors(scenario, &groups, slice)?;
        capacity::encode_slice(&mut model, id, slice, &contributors, &occupancy);
    }

    model.finalize();
    Ok(CompiledModel {
        formulation: Formulation::TimeIndexed,
        model,
        groups,
        occupancy,
        big_m: None,
    })
}

/// Declares start, routing and count rows per group, plus its objective terms.
fn declare_groups<'s>(
    scenario: &'s Scenario,
    groups: &TaskGroups,
    horizon: i64,
    model: &mut MipModel,
) -> Result<Vec<GroupPlan<'s>>> {
    let mut plans = Vec::with_capacity(groups.len());
    for (g, group) in groups.groups().iter().enumerate() {
        let Some(task) = groups.representative(scenario, g) else {
            continue;
        };
        let size = group.size();
        let optional = task.is_optional();
        let window = groups.window(scenario, g);
        let mut lo = window.earliest.max(0);
        let mut hi = horizon - task.length;
        if let Some(end) = window.latest_end {
            hi = hi.min(end - task.length);
        }

        let fixed: Vec<i64> = group
            .instances
            .iter()
            .filter_map(|id| scenario.task(id).and_then(|t| t.fixed_start))
            .collect();
        if size == 1 {
            if let Some(&f) = fixed.first() {
                if (lo..=hi).contains(&f) {
                    lo = f;
                    hi = f;
                } else {
                    // Out of reach: the count row below cannot hold.
                    hi = lo - 1;
                }
            }
        } else if !fixed.is_empty() {
            if optional {
                return Err(unsupported(format!(
                    "optional group '{}' with fixed instances",
                    group.id
                )));
            }
            if let Some(f) = fixed.iter().find(|f| !(lo..=hi).contains(*f)) {
                model.ge(format!("fixed[{},{f}]", group.id), LinearExpr::new(), 1.0);
            }
        }

        let weight = scenario.task_weight(&task.id);
        let schedule_cost = task.schedule_cost.unwrap_or(0.0);
        let mut starts = Starts::new();
        let mut count = LinearExpr::new();
        for t in lo..=hi {
            let pinned = fixed.iter().filter(|&&f| f == t).count() as f64;
            let name = x_var(&group.id, t);
            let x = if size == 1 {
                model.binary(name)
            } else {
                model.integer(name, pinned, size as f64)
            };
            starts.push((t, x));
            count.add_term(x, 1.0);
            model.add_objective_term(x, weight * (t + task.length) as f64 + schedule_cost);
        }
        let count_name = format!("count[{}]", group.id);
        if optional {
            model.le(count_name, count, size as f64);
        } else {
            model.eq(count_name, count, size as f64);
        }

        let mut slots = Vec::new();
        for (k, slot) in groups.requirement_slots(scenario, g).into_iter().enumerate() {
            let occupancy = route_slot(model, &group.id, k, &slot, &starts, size);
            for (resource, vars) in &occupancy {
                if let Some(cost) = scenario.resource(resource).and_then(|r| r.cost_per_period) {
                    let per_start = cost * (slot.units * task.length) as f64;
                    for &(_, v) in vars {
                        model.add_objective_term(v, per_start);
                    }
                }
            }
            slots.push(SlotPlan { slot, occupancy });
        }

        plans.push(GroupPlan {
            task,
            size,
            lo,
            hi,
            starts,
            slots,
        });
    }
    Ok(plans)
}

/// Splits a group's starts over the candidates of one requirement slot.
fn route_slot(
    model: &mut MipModel,
    group: &str,
    k: usize,
    slot: &RequirementSlot,
    starts: &[(i64, VarId)],
    size: usize,
) -> Vec<(String, Starts)> {
    if let [only] = slot.candidates.as_slice() {
        return vec![(only.clone(), starts.to_vec())];
    }
    let mut per_resource: Vec<(String, Starts)> = slot
        .candidates
        .iter()
        .map(|r| (r.clone(), Starts::new()))
        .collect();
    for &(t, x) in starts {
        let mut route = LinearExpr::term(x, -1.0);
        for (resource, vars) in per_resource.iter_mut() {
            let name = xr_var(group, k, resource, t);
            let v = if size == 1 {
                model.binary(name)
            } else {
                model.integer(name, 0.0, size as f64)
            };
            route.add_term(v, 1.0);
            vars.push((t, v));
        }
        model.eq(format!("route[{group},{k},{t}]"), route, 0.0);
    }
    per_resource
}

fn occupancy_index(plans: &[GroupPlan<'_>]) -> OccupancyIndex {
    let mut index = OccupancyIndex::new();
    for (g, plan) in plans.iter().enumerate() {
        for slot in &plan.slots {
            for (resource, vars) in &slot.occupancy {
                for &(t, v) in vars {
                    index
                        .entry((g, resource.clone(), t))
                        .or_default()
                        .add_term(v, 1.0);
                }
            }
        }
    }
    index
}

/// Requirements shared across groups pick the same resources.
fn link_together(groups: &TaskGroups, plans: &[GroupPlan<'_>], model: &mut MipModel) {
    for (g, plan) in plans.iter().enumerate() {
        for (k, slot) in plan.slots.iter().enumerate() {
            for &other in slot.slot.partners.iter().filter(|&&o| o > g) {
                let Some(partner) = plans.get(other) else {
                    continue;
                };
                let matching = partner
                    .slots
                    .iter()
                    .position(|s| s.slot.requirement == slot.slot.requirement)
                    .or_else(|| {
                        partner.slots.iter().position(|s| {
                            s.slot.partners.contains(&g) && s.slot.candidates == slot.slot.candidates
                        })
                    });
                let Some(k2) = matching else {
                    warn!(
                        group = %groups.group(g).id,
                        partner = %groups.group(other).id,
                        "no matching requirement slot on partner group"
                    );
                    continue;
                };
                for (resource, vars) in &slot.occupancy {
                    let mut expr = LinearExpr::new();
                    for &(_, v) in vars {
                        expr.add_term(v, 1.0);
                    }
                    if let Some(theirs) = partner.slots[k2].on(resource) {
                        for &(_, v) in theirs {
                            expr.add_term(v, -1.0);
                        }
                    }
                    model.eq(
                        format!(
                            "together[{},{k},{},{k2},{resource}]",
                            groups.group(g).id,
                            groups.group(other).id
                        ),
                        expr,
                        0.0,
                    );
                }
            }
        }
    }
}

/// Per-period capacity rows of one resource.
fn capacity_rows(resource: &Resource, plans: &[GroupPlan<'_>], horizon: i64) -> Vec<Row> {
    let terms: Vec<(i64, i64, &Starts)> = plans
        .iter()
        .filter(|p| p.task.length > 0)
        .flat_map(|p| {
            p.slots.iter().filter_map(move |s| {
                s.on(&resource.id)
                    .map(|vars| (s.slot.units, p.task.length, vars))
            })
        })
        .collect();
    let peak: i64 = plans
        .iter()
        .filter(|p| p.task.length > 0)
        .flat_map(|p| {
            p.slots
                .iter()
                .filter(|s| s.on(&resource.id).is_some())
                .map(move |s| s.slot.units * p.size as i64)
        })
        .sum();
    if peak <= resource.size {
        return Vec::new();
    }

    (0..horizon)
        .filter_map(|p| {
            let mut expr = LinearExpr::new();
            for &(units, length, vars) in &terms {
                for &(_, v) in vars.iter().filter(|(s, _)| *s > p - length && *s <= p) {
                    expr.add_term(v, units as f64);
                }
            }
            (!expr.terms.is_empty()).then(|| {
                Row::new(
                    format!("capacity[{},{p}]", resource.id),
                    expr,
                    RowSense::Le,
                    resource.size as f64,
                )
            })
        })
        .collect()
}

/// Total busy unit-periods of a resource within its load bounds.
fn load_rows(resource: &Resource, plans: &[GroupPlan<'_>], model: &mut MipModel) {
    if !resource.has_load_bounds() {
        return;
    }
    let mut busy = LinearExpr::new();
    for plan in plans {
        for slot in &plan.slots {
            if let Some(vars) = slot.on(&resource.id) {
                let per_start = (slot.slot.units * plan.task.length) as f64;
                for &(_, v) in vars {
                    busy.add_term(v, per_start);
                }
            }
        }
    }
    if let Some(lower) = resource.load_lower {
        model.ge(format!("load_min[{}]", resource.id), busy.clone(), lower);
    }
    if let Some(upper) = resource.load_upper {
        model.le(format!("load_max[{}]", resource.id), busy, upper);
    }
}

fn ordering_rows(
    n: usize,
    o: &GroupOrdering,
    groups: &TaskGroups,
    plans: &[GroupPlan<'_>],
    model: &mut MipModel,
) -> Result<()> {
    let (Some(a), Some(b)) = (plans.get(o.left), plans.get(o.right)) else {
        return Ok(());
    };
    let shift = a.task.length + o.offset;
    let (ga, gb) = (&groups.group(o.left).id, &groups.group(o.right).id);

    match o.kind {
        PrecedenceKind::Lax | PrecedenceKind::Tight => {
            let periods = if o.kind == PrecedenceKind::Lax {
                // C_B is flat outside B's domain and C_A only grows.
                b.lo..=b.hi
            } else {
                let mut lo = i64::MAX;
                let mut hi = i64::MIN;
                if b.has_domain() {
                    lo = lo.min(b.lo);
                    hi = hi.max(b.hi);
                }
                if a.has_domain() {
                    lo = lo.min(a.lo + shift);
                    hi = hi.max(a.hi + shift);
                }
                lo..=hi
            };
            let (wa, wb) = (a.size as f64, b.size as f64);
            for t in periods {
                let mut expr = LinearExpr::new();
                expr.add_scaled(&cumulative(&b.starts, t), wa);
                expr.add_scaled(&cumulative(&a.starts, t - shift), -wb);
                if expr.terms.is_empty() {
                    continue;
                }
                let name = format!("prec{n}[{ga},{gb},{t}]");
                if o.kind == PrecedenceKind::Lax {
                    model.le(name, expr, 0.0);
                } else {
                    model.eq(name, expr, 0.0);
                }
            }
        }
        PrecedenceKind::Conditional => {
            if a.size > 1 || b.size > 1 {
                return Err(unsupported(format!(
                    "conditional precedence between groups '{ga}' and '{gb}'"
                )));
            }
            for (ka, sa) in a.slots.iter().enumerate() {
                for (kb, sb) in b.slots.iter().enumerate() {
                    for (resource, b_vars) in &sb.occupancy {
                        let Some(a_vars) = sa.on(resource) else {
                            continue;
                        };
                        // B on R at t excludes A on R at any s > t - shift.
                        for &(t, vb) in b_vars {
                            let mut expr = LinearExpr::term(vb, 1.0);
                            for &(_, va) in a_vars.iter().filter(|(s, _)| *s > t - shift) {
                                expr.add_term(va, 1.0);
                            }
                            if expr.terms.len() > 1 {
                                model.le(
                                    format!("cond{n}[{ga},{ka},{gb},{kb},{resource},{t}]"),
                                    expr,
                                    1.0,
                                );
                            }
                        }
                    }
                }
            }
        }
        PrecedenceKind::LowerBound | PrecedenceKind::UpperBound => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CapacitySlice, Precedence, ResourceRequirement, SliceKind};

    fn values(model: &MipModel, named: &[(&str, f64)]) -> Vec<f64> {
        let mut v = vec![0.0; model.num_vars()];
        for (name, x) in named {
            v[model.var(name).unwrap().0] = *x;
        }
        v
    }

    fn row<'m>(model: &'m MipModel, name: &str) -> Option<&'m Row> {
        model.rows().iter().find(|r| r.name == name)
    }

    fn unit_group(n: usize, horizon: i64) -> Scenario {
        let mut s = Scenario::new("group").with_horizon(horizon);
        s.add_resource(Resource::new("R1")).unwrap();
        for i in 0..n {
            let id = format!("G{i}");
            s.add_task(Task::new(id.as_str(), 1).with_group("G")).unwrap();
            s.add_requirement(ResourceRequirement::new([id.as_str()], ["R1"]))
                .unwrap();
        }
        s
    }

    #[test]
    fn test_requires_horizon() {
        let s = Scenario::new("open");
        assert!(matches!(compile(&s), Err(ScheduleError::MissingHorizon)));
    }

    #[test]
    fn test_group_variables_and_capacity() {
        let c = compile(&unit_group(3, 4)).unwrap();
        let m = &c.model;
        // One aggregate, no per-instance variables.
        assert_eq!(m.num_vars(), 4);
        let x0 = m.var("x[G,0]").unwrap();
        assert_eq!(m.variable(x0).upper, 3.0);
        assert!(row(m, "count[G]").is_some());
        assert!(row(m, "capacity[R1,3]").is_some());

        let spread = values(m, &[("x[G,0]", 1.0), ("x[G,1]", 1.0), ("x[G,2]", 1.0)]);
        assert!(m.is_feasible(&spread, 1e-6));
        let stacked = values(m, &[("x[G,0]", 3.0)]);
        assert!(!m.is_feasible(&stacked, 1e-6));
    }

    #[test]
    fn test_capacity_rows_skipped_when_never_binding() {
        let mut s = unit_group(2, 4);
        s.add_resource(Resource::new("R2").with_size(2)).unwrap();
        s.add_task(Task::new("X", 1)).unwrap();
        s.add_requirement(ResourceRequirement::new(["X"], ["R2"]))
            .unwrap();
        let c = compile(&s).unwrap();
        assert!(c.model.rows().iter().all(|r| !r.name.starts_with("capacity[R2")));
    }

    #[test]
    fn test_routing_and_occupancy_index() {
        let mut s = Scenario::new("route").with_horizon(2);
        s.add_resource(Resource::new("R1")).unwrap();
        s.add_resource(Resource::new("R2")).unwrap();
        s.add_task(Task::new("T", 1)).unwrap();
        s.add_requirement(ResourceRequirement::new(["T"], ["R1", "R2"]))
            .unwrap();
        let c = compile(&s).unwrap();
        let m = &c.model;
        assert!(m.var("xr[T,0,R2,1]").is_some());
        assert!(row(m, "route[T,0,1]").is_some());
        assert_eq!(c.occupancy.len(), 4);

        let dense = values(m, &[("x[T,1]", 1.0), ("xr[T,0,R2,1]", 1.0)]);
        assert!(m.is_feasible(&dense, 1e-6));
        let on_r2 = &c.occupancy[&(0, "R2".to_string(), 1)];
        assert_eq!(on_r2.evaluate(&dense), 1.0);
    }

    #[test]
    fn test_lax_precedence_cumulative_rows() {
        let mut s = Scenario::new("prec").with_horizon(4);
        s.add_task(Task::new("A", 2)).unwrap();
        s.add_task(Task::new("B", 1)).unwrap();
        s.add_precedence(Precedence::lax("A", "B", 0)).unwrap();
        let c = compile(&s).unwrap();
        let m = &c.model;
        let ok = values(m, &[("x[A,0]", 1.0), ("x[B,2]", 1.0)]);
        assert!(m.is_feasible(&ok, 1e-6));
        let early = values(m, &[("x[A,1]", 1.0), ("x[B,2]", 1.0)]);
        assert!(!m.is_feasible(&early, 1e-6));
    }

    #[test]
    fn test_lax_precedence_group_to_singleton() {
        let mut s = Scenario::new("tight").with_horizon(5);
        for i in 0..2 {
            s.add_task(Task::new(format!("A{i}"), 1).with_group("A"))
                .unwrap();
        }
        s.add_task(Task::new("B", 1)).unwrap();
        s.add_precedence(Precedence::lax("A1", "B", 1)).unwrap();
        let c = compile(&s).unwrap();
        let m = &c.model;
        // Every instance of A ends at least one period before B starts.
        let ok = values(m, &[("x[A,0]", 1.0), ("x[A,1]", 1.0), ("x[B,3]", 1.0)]);
        assert!(m.is_feasible(&ok, 1e-6));
        let late = values(m, &[("x[A,0]", 1.0), ("x[A,2]", 1.0), ("x[B,3]", 1.0)]);
        assert!(!m.is_feasible(&late, 1e-6));
    }

    #[test]
    fn test_conditional_rows_only_on_shared_resource() {
        let mut s = Scenario::new("cond").with_horizon(4);
        s.add_resource(Resource::new("R1")).unwrap();
        s.add_resource(Resource::new("R2")).unwrap();
        s.add_task(Task::new("A", 1)).unwrap();
        s.add_task(Task::new("B", 1)).unwrap();
        s.add_requirement(ResourceRequirement::new(["A"], ["R1", "R2"]))
            .unwrap();
        s.add_requirement(ResourceRequirement::new(["B"], ["R1", "R2"]))
            .unwrap();
        s.add_precedence(Precedence::conditional("A", "B", 1))
            .unwrap();
        let c = compile(&s).unwrap();
        let m = &c.model;

        let apart = values(
            m,
            &[
                ("x[A,1]", 1.0),
                ("xr[A,0,R1,1]", 1.0),
                ("x[B,0]", 1.0),
                ("xr[B,0,R2,0]", 1.0),
            ],
        );
        assert!(m.is_feasible(&apart, 1e-6));
        let shared_close = values(
            m,
            &[
                ("x[A,0]", 1.0),
                ("xr[A,0,R1,0]", 1.0),
                ("x[B,1]", 1.0),
                ("xr[B,0,R1,1]", 1.0),
            ],
        );
        assert!(!m.is_feasible(&shared_close, 1e-6));
        let shared_far = values(
            m,
            &[
                ("x[A,0]", 1.0),
                ("xr[A,0,R1,0]", 1.0),
                ("x[B,2]", 1.0),
                ("xr[B,0,R1,2]", 1.0),
            ],
        );
        assert!(m.is_feasible(&shared_far, 1e-6));
    }

    #[test]
    fn test_together_links_partner_slots() {
        let mut s = Scenario::new("together").with_horizon(2);
        s.add_resource(Resource::new("R1")).unwrap();
        s.add_resource(Resource::new("R2")).unwrap();
        s.add_task(Task::new("X", 1)).unwrap();
        s.add_task(Task::new("Y", 1)).unwrap();
        s.add_requirement(ResourceRequirement::new(["X", "Y"], ["R1", "R2"]))
            .unwrap();
        let c = compile(&s).unwrap();
        let m = &c.model;
        assert!(row(m, "together[X,0,Y,0,R1]").is_some());
        let split = values(
            m,
            &[
                ("x[X,0]", 1.0),
                ("xr[X,0,R1,0]", 1.0),
                ("x[Y,1]", 1.0),
                ("xr[Y,0,R2,1]", 1.0),
            ],
        );
        assert!(!m.is_feasible(&split, 1e-6));
    }

    #[test]
    fn test_load_bounds_and_costs() {
        let mut s = Scenario::new("load").with_horizon(3);
        s.add_resource(
            Resource::new("R1")
                .with_load_upper(1.0)
                .with_cost_per_period(2.0),
        )
        .unwrap();
        s.add_task(Task::new("T", 2)).unwrap();
        s.add_requirement(ResourceRequirement::new(["T"], ["R1"]))
            .unwrap();
        let c = compile(&s).unwrap();
        let m = &c.model;
        assert!(row(m, "load_max[R1]").is_some());
        // Two busy periods exceed the bound of one.
        let dense = values(m, &[("x[T,0]", 1.0)]);
        assert!(!m.is_feasible(&dense, 1e-6));
        // Two busy periods at cost 2, no completion weight.
        let x = m.var("x[T,1]").unwrap();
        let coef: f64 = m
            .objective()
            .terms
            .iter()
            .filter(|(v, _)| *v == x)
            .map(|(_, c)| c)
            .sum();
        assert_eq!(coef, 4.0);
    }

    #[test]
    fn test_fixed_start_pins_domain() {
        let mut s = Scenario::new("fixed").with_horizon(5);
        s.add_task(Task::new("T", 1).with_fixed_start(3)).unwrap();
        s.add_task(Task::new("late", 3).with_fixed_start(4)).unwrap();
        let c = compile(&s).unwrap();
        let m = &c.model;
        assert!(m.var("x[T,3]").is_some());
        assert!(m.var("x[T,2]").is_none());
        // Fixed beyond the horizon: nothing to count.
        assert!(m.var("x[late,4]").is_none());
        let count = row(m, "count[late]").unwrap();
        assert!(count.terms.is_empty());
        assert!(!count.is_satisfied(&[], 1e-6));
    }

    #[test]
    fn test_optional_group_with_fixed_instance_rejected() {
        let mut s = Scenario::new("opt").with_horizon(3);
        s.add_task(Task::new("O0", 1).with_group("O").with_schedule_cost(1.0))
            .unwrap();
        s.add_task(
            Task::new("O1", 1)
                .with_group("O")
                .with_schedule_cost(1.0)
                .with_fixed_start(0),
        )
        .unwrap();
        assert!(matches!(
            compile(&s),
            Err(ScheduleError::UnsupportedConstraint { .. })
        ));
    }

    #[test]
    fn test_slice_rows_use_occupancy() {
        let mut s = Scenario::new("slice").with_horizon(3);
        s.add_resource(Resource::new("R1")).unwrap();
        s.add_task(Task::new("T", 1).with_param("heat", 2.0)).unwrap();
        s.add_requirement(ResourceRequirement::new(["T"], ["R1"]))
            .unwrap();
        s.add_capacity(
            CapacitySlice::new("R1", "heat", SliceKind::Sum)
                .with_window(0, 2)
                .at_most(0.0),
        )
        .unwrap();
        let c = compile(&s).unwrap();
        let m = &c.model;
        // Starting inside the window breaks the slice; starting after it does not.
        let inside = values(m, &[("x[T,1]", 1.0)]);
        assert!(!m.is_feasible(&inside, 1e-6));
        let outside = values(m, &[("x[T,2]", 1.0)]);
        assert!(m.is_feasible(&outside, 1e-6));

        let mut unknown = s.clone();
        unknown
            .add_capacity(CapacitySlice::new("R1", "weight", SliceKind::Max).with_window(0, 1))
            .unwrap();
        assert!(matches!(
            compile(&unknown),
            Err(ScheduleError::UnknownParameter { .. })
        ));
    }
}
