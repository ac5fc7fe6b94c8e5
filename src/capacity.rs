//! Capacity slice aggregator.
//!
//! The load of resource `R` at period `p` for parameter `P` is
//!
//! ```text
//! load(p) = Σ_groups param(G, P) · #instances of G on R started in [p - len(G) + 1, p]
//! ```
//!
//! over the groups whose requirements offer `R` ("contributors"). A slice
//! aggregates `load` over its window `[start, end)`:
//!
//! | kind | value |
//! |------|-------|
//! | `Sum` | `Σ_p load(p)` |
//! | `Max` | `max_p load(p)` (0 on an empty window) |
//! | `DiffIncreasing` | `Σ_p max(0, load(p) - load(p-1))` |
//! | `DiffDecreasing` | `Σ_p max(0, load(p-1) - load(p))` |
//! | `Diff` | sum of both |
//!
//! with `load(-1) = 0`. The same term generator ([`load_terms`]) drives
//! both the numeric evaluation over a [`Solution`] and the symbolic rows
//! emitted by the time-indexed compiler, so the two always agree.

use std::collections::HashMap;

use crate::error::{Result, ScheduleError};
use crate::groups::TaskGroups;
use crate::mip::{LinearExpr, MipModel, RowSense};
use crate::models::{CapacitySense, CapacitySlice, Scenario, SliceKind, Solution};

/// Aggregate comparison tolerance.
pub const TOLERANCE: f64 = 1e-6;

/// A task group able to load a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Contributor {
    /// Group index.
    pub group: usize,
    /// Instances in the group.
    pub instances: usize,
    pub length: i64,
    /// Parameter value per occupied period (0 when undefined).
    pub value: f64,
}

/// Collects the contributors of a slice.
///
/// Fails with [`ScheduleError::UnknownParameter`] when there are
/// contributors but none of them defines the parameter.
pub fn contributors(
    scenario: &Scenario,
    groups: &TaskGroups,
    slice: &CapacitySlice,
) -> Result<Vec<Contributor>> {
    let mut out = Vec::new();
    let mut defined = false;
    for (idx, group) in groups.groups().iter().enumerate() {
        let offers = groups
            .requirement_slots(scenario, idx)
            .iter()
            .any(|s| s.candidates.iter().any(|c| *c == slice.resource));
        if !offers {
            continue;
        }
        let Some(task) = groups.representative(scenario, idx) else {
            continue;
        };
        let value = task.param(&slice.parameter);
        defined |= value.is_some();
        out.push(Contributor {
            group: idx,
            instances: group.size(),
            length: task.length,
            value: value.unwrap_or(0.0),
        });
    }
    if !out.is_empty() && !defined {
        return Err(ScheduleError::UnknownParameter {
            resource: slice.resource.clone(),
            parameter: slice.parameter.clone(),
        });
    }
    Ok(out)
}

/// `(contributor, start)` pairs whose occupancy counts toward `load(period)`.
pub fn load_terms(
    contributors: &[Contributor],
    period: i64,
) -> impl Iterator<Item = (&Contributor, i64)> {
    contributors.iter().flat_map(move |c| {
        let first = (period - c.length + 1).max(0);
        (first..=period).filter(move |_| c.length > 0).map(move |s| (c, s))
    })
}

/// Upper bound on `|load(p)|`.
pub fn load_bound(contributors: &[Contributor]) -> f64 {
    contributors
        .iter()
        .map(|c| c.value.abs() * c.instances as f64)
        .sum()
}

/// Source of per-start instance counts.
pub trait Occupancy {
    /// Instances of `group` bound to `resource` that start at `start`.
    fn count(&self, group: usize, resource: &str, start: i64) -> f64;
}

/// Occupancy of a concrete solution.
#[derive(Debug, Clone, Default)]
pub struct SolutionOccupancy {
    counts: HashMap<(usize, String, i64), f64>,
}

impl SolutionOccupancy {
    pub fn new(groups: &TaskGroups, solution: &Solution) -> Self {
        let mut counts = HashMap::new();
        for (task, placement) in solution.placements() {
            let Some(group) = groups.index_of(task) else {
                continue;
            };
            for resource in &placement.resources {
                *counts
                    .entry((group, resource.clone(), placement.start))
                    .or_insert(0.0) += 1.0;
            }
        }
        Self { counts }
    }
}

impl Occupancy for SolutionOccupancy {
    fn count(&self, group: usize, resource: &str, start: i64) -> f64 {
        self.counts
            .get(&(group, resource.to_string(), start))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Symbolic occupancy: `(group, resource, start)` to a linear expression
/// over the model's variables.
pub type OccupancyIndex = HashMap<(usize, String, i64), LinearExpr>;

/// Occupancy read from a solved variable vector through an [`OccupancyIndex`].
#[derive(Debug, Clone, Copy)]
pub struct SymbolicOccupancy<'a> {
    pub index: &'a OccupancyIndex,
    pub values: &'a [f64],
}

impl Occupancy for SymbolicOccupancy<'_> {
    fn count(&self, group: usize, resource: &str, start: i64) -> f64 {
        self.index
            .get(&(group, resource.to_string(), start))
            .map_or(0.0, |e| e.evaluate(self.values))
    }
}

/// Numeric `load(period)`.
pub fn load(
    contributors: &[Contributor],
    resource: &str,
    period: i64,
    occupancy: &impl Occupancy,
) -> f64 {
    if period < 0 {
        return 0.0;
    }
    load_terms(contributors, period)
        .map(|(c, s)| c.value * occupancy.count(c.group, resource, s))
        .sum()
}

/// Numeric value of a slice aggregate.
pub fn evaluate(
    slice: &CapacitySlice,
    contributors: &[Contributor],
    occupancy: &impl Occupancy,
) -> f64 {
    let loads: Vec<f64> = (slice.start..slice.end)
        .map(|p| load(contributors, &slice.resource, p, occupancy))
        .collect();
    let mut prev = load(contributors, &slice.resource, slice.start - 1, occupancy);
    let (mut up, mut down) = (0.0, 0.0);
    for &l in &loads {
        up += (l - prev).max(0.0);
        down += (prev - l).max(0.0);
        prev = l;
    }
    match slice.kind {
        SliceKind::Sum => loads.iter().sum(),
        SliceKind::Max => loads.iter().copied().fold(None, |m: Option<f64>, l| {
            Some(m.map_or(l, |m| m.max(l)))
        })
        .unwrap_or(0.0),
        SliceKind::DiffIncreasing => up,
        SliceKind::DiffDecreasing => down,
        SliceKind::Diff => up + down,
    }
}

/// Symbolic `load(period)` over an [`OccupancyIndex`].
pub fn load_expr(
    contributors: &[Contributor],
    resource: &str,
    period: i64,
    index: &OccupancyIndex,
) -> LinearExpr {
    let mut expr = LinearExpr::new();
    if period < 0 {
        return expr;
    }
    for (c, s) in load_terms(contributors, period) {
        if let Some(occ) = index.get(&(c.group, resource.to_string(), s)) {
            expr.add_scaled(occ, c.value);
        }
    }
    expr
}

/// Emits the rows (and auxiliaries) enforcing one slice.
pub(crate) fn encode_slice(
    model: &mut MipModel,
    id: usize,
    slice: &CapacitySlice,
    contributors: &[Contributor],
    index: &OccupancyIndex,
) {
    let sense = match slice.sense {
        CapacitySense::AtMost => RowSense::Le,
        CapacitySense::AtLeast => RowSense::Ge,
    };
    let b = slice.bound;
    let a = load_bound(contributors);
    let loads: Vec<(i64, LinearExpr)> = (slice.start..slice.end)
        .map(|p| (p, load_expr(contributors, &slice.resource, p, index)))
        .collect();
    let tag = format!("slice{id}");

    if loads.is_empty() {
        // Every aggregate of an empty window is 0.
        model.add_row(format!("{tag}_empty"), LinearExpr::new(), sense, b);
        return;
    }

    match slice.kind {
        SliceKind::Sum => {
            let mut total = LinearExpr::new();
            for (_, l) in &loads {
                total.add_scaled(l, 1.0);
            }
            model.add_row(format!("{tag}_sum"), total, sense, b);
        }
        SliceKind::Max => match slice.sense {
            CapacitySense::AtMost => {
                for (p, l) in loads {
                    model.le(format!("{tag}_max[{p}]"), l, b);
                }
            }
            CapacitySense::AtLeast => {
                let m = b.abs() + a;
                let mut any = LinearExpr::new();
                for (p, l) in loads {
                    let z = model.binary(format!("{tag}_argmax[{p}]"));
                    any.add_term(z, 1.0);
                    // load(p) >= b - M (1 - z)
                    model.ge(format!("{tag}_max[{p}]"), l.with_term(z, -m), b - m);
                }
                model.ge(format!("{tag}_pick"), any, 1.0);
            }
        },
        kind => {
            let mut prev = load_expr(contributors, &slice.resource, slice.start - 1, index);
            let mut total = LinearExpr::new();
            let use_up = matches!(kind, SliceKind::Diff | SliceKind::DiffIncreasing);
            let use_down = matches!(kind, SliceKind::Diff | SliceKind::DiffDecreasing);
            for (p, l) in loads {
                let mut delta = l.clone();
                delta.add_scaled(&prev, -1.0);
                if use_up {
                    let u = positive_part(model, &format!("{tag}_up[{p}]"), &delta, a, slice.sense);
                    total.add_term(u, 1.0);
                }
                if use_down {
                    let mut neg = LinearExpr::new();
                    neg.add_scaled(&delta, -1.0);
                    let v = positive_part(model, &format!("{tag}_down[{p}]"), &neg, a, slice.sense);
                    total.add_term(v, 1.0);
                }
                prev = l;
            }
            model.add_row(format!("{tag}_diff"), total, sense, b);
        }
    }
}

/// Auxiliary `u` tracking `max(0, delta)` from the side the bound needs.
///
/// Upper-bounded aggregates only need `u >= max(0, delta)`; lower-bounded
/// ones need `u <= max(0, delta)`, encoded with an indicator `β`.
fn positive_part(
    model: &mut MipModel,
    name: &str,
    delta: &LinearExpr,
    a: f64,
    sense: CapacitySense,
) -> crate::mip::VarId {
    let span = 2.0 * a;
    let u = model.continuous(name, 0.0, span.max(0.0));
    match sense {
        CapacitySense::AtMost => {
            // u - delta >= 0
            let mut row = LinearExpr::term(u, 1.0);
            row.add_scaled(delta, -1.0);
            model.ge(format!("{name}_lb"), row, 0.0);
        }
        CapacitySense::AtLeast => {
            let beta = model.binary(format!("{name}_on"));
            // u <= delta + 2A (1 - β)
            let mut row = LinearExpr::term(u, 1.0).with_term(beta, span);
            row.add_scaled(delta, -1.0);
            model.le(format!("{name}_ub"), row, span);
            // u <= 2A β
            model.le(
                format!("{name}_gate"),
                LinearExpr::term(u, 1.0).with_term(beta, -span),
                0.0,
            );
        }
    }
    u
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Placement, Resource, ResourceRequirement, Task};
    use std::collections::BTreeMap;

    /// Hand-written occupancy: `(group, start)` counts on a single resource.
    struct Fixed(HashMap<(usize, i64), f64>);

    impl Occupancy for Fixed {
        fn count(&self, group: usize, _resource: &str, start: i64) -> f64 {
            self.0.get(&(group, start)).copied().unwrap_or(0.0)
        }
    }

    fn contributor(group: usize, length: i64, value: f64) -> Contributor {
        Contributor {
            group,
            instances: 2,
            length,
            value,
        }
    }

    fn slice(kind: SliceKind, start: i64, end: i64) -> CapacitySlice {
        CapacitySlice::new("R", "p", kind)
            .with_window(start, end)
            .at_most(100.0)
    }

    #[test]
    fn test_load_terms_cover_trailing_window() {
        let cs = vec![contributor(0, 3, 1.0)];
        let starts: Vec<i64> = load_terms(&cs, 4).map(|(_, s)| s).collect();
        assert_eq!(starts, vec![2, 3, 4]);
        let early: Vec<i64> = load_terms(&cs, 1).map(|(_, s)| s).collect();
        assert_eq!(early, vec![0, 1]);
        let zero = vec![contributor(0, 0, 1.0)];
        assert_eq!(load_terms(&zero, 3).count(), 0);
    }

    #[test]
    fn test_numeric_aggregates() {
        // Group 0 (len 2, value 2) starts at 0 and 3; group 1 (len 1, value 1) at 1.
        // load: p0=2, p1=2+1=3, p2=0, p3=2, p4=2, p5=0
        let cs = vec![contributor(0, 2, 2.0), contributor(1, 1, 1.0)];
        let occ = Fixed(HashMap::from([((0, 0), 1.0), ((0, 3), 1.0), ((1, 1), 1.0)]));
        let loads: Vec<f64> = (0..6).map(|p| load(&cs, "R", p, &occ)).collect();
        assert_eq!(loads, vec![2.0, 3.0, 0.0, 2.0, 2.0, 0.0]);

        assert_eq!(evaluate(&slice(SliceKind::Sum, 0, 6), &cs, &occ), 9.0);
        assert_eq!(evaluate(&slice(SliceKind::Max, 0, 6), &cs, &occ), 3.0);
        // ups: 2 (from load(-1)=0), 1, 0, 2, 0, 0
        assert_eq!(evaluate(&slice(SliceKind::DiffIncreasing, 0, 6), &cs, &occ), 5.0);
        // downs: 0, 0, 3, 0, 0, 2
        assert_eq!(evaluate(&slice(SliceKind::DiffDecreasing, 0, 6), &cs, &occ), 5.0);
        assert_eq!(evaluate(&slice(SliceKind::Diff, 0, 6), &cs, &occ), 10.0);
        // Window [2, 4): previous period load(1)=3 counts.
        assert_eq!(evaluate(&slice(SliceKind::DiffDecreasing, 2, 4), &cs, &occ), 3.0);
        assert_eq!(evaluate(&slice(SliceKind::Max, 2, 2), &cs, &occ), 0.0);
    }

    fn slice_scenario() -> Scenario {
        let mut s = Scenario::new("slices").with_horizon(6);
        s.add_resource(Resource::new("R").with_size(2)).unwrap();
        s.add_task(Task::new("A", 2).with_param("heat", 2.0)).unwrap();
        s.add_task(Task::new("B", 1)).unwrap();
        s.add_task(Task::new("C", 1)).unwrap();
        s.add_requirement(ResourceRequirement::new(["A"], ["R"]))
            .unwrap();
        s.add_requirement(ResourceRequirement::new(["B"], ["R"]))
            .unwrap();
        s
    }

    #[test]
    fn test_contributors() {
        let s = slice_scenario();
        let groups = TaskGroups::partition(&s).unwrap();
        let heat = CapacitySlice::new("R", "heat", SliceKind::Sum);
        let cs = contributors(&s, &groups, &heat).unwrap();
        // C never uses R.
        assert_eq!(cs.len(), 2);
        assert_eq!(cs[0].value, 2.0);
        assert_eq!(cs[1].value, 0.0);
        assert_eq!(load_bound(&cs), 2.0);

        let missing = CapacitySlice::new("R", "weight", SliceKind::Sum);
        assert!(matches!(
            contributors(&s, &groups, &missing),
            Err(ScheduleError::UnknownParameter { .. })
        ));

        // The built-in length parameter is always defined.
        let length = CapacitySlice::new("R", "length", SliceKind::Sum);
        let cs = contributors(&s, &groups, &length).unwrap();
        assert_eq!(cs[1].value, 1.0);
    }

    #[test]
    fn test_solution_occupancy_matches_symbolic() {
        let s = slice_scenario();
        let groups = TaskGroups::partition(&s).unwrap();
        let heat = CapacitySlice::new("R", "heat", SliceKind::Diff).with_window(0, 6);
        let cs = contributors(&s, &groups, &heat).unwrap();

        let mut placements = BTreeMap::new();
        placements.insert(
            "A".to_string(),
            Placement {
                start: 1,
                end: 3,
                resources: vec!["R".into()],
            },
        );
        placements.insert(
            "B".to_string(),
            Placement {
                start: 2,
                end: 3,
                resources: vec!["R".into()],
            },
        );
        let solution = Solution::new(placements, Vec::new());
        let numeric = SolutionOccupancy::new(&groups, &solution);

        // Symbolic side: one indicator variable per (group, start) fixed to the same counts.
        let mut model = MipModel::new("occ");
        let mut index = OccupancyIndex::new();
        let mut values = Vec::new();
        for g in 0..2 {
            for t in 0..6 {
                let v = model.binary(format!("x[{g},{t}]"));
                index.insert((g, "R".to_string(), t), LinearExpr::term(v, 1.0));
                values.push(numeric.count(g, "R", t));
            }
        }
        let symbolic = SymbolicOccupancy {
            index: &index,
            values: &values,
        };
        for kind in [
            SliceKind::Sum,
            SliceKind::Max,
            SliceKind::Diff,
            SliceKind::DiffIncreasing,
            SliceKind::DiffDecreasing,
        ] {
            let sl = CapacitySlice::new("R", "heat", kind).with_window(1, 5);
            let n = evaluate(&sl, &cs, &numeric);
            let y = evaluate(&sl, &cs, &symbolic);
            assert!((n - y).abs() < TOLERANCE, "{kind}: {n} vs {y}");
            // The load expressions agree period by period too.
            for p in 0..6 {
                let e = load_expr(&cs, "R", p, &index).evaluate(&values);
                assert!((e - load(&cs, "R", p, &numeric)).abs() < TOLERANCE);
            }
        }
    }

    #[test]
    fn test_encode_slice_rows() {
        let cs = vec![contributor(0, 1, 1.0)];
        let mut model = MipModel::new("enc");
        let mut index = OccupancyIndex::new();
        for t in 0..3 {
            let v = model.integer(format!("x[{t}]"), 0.0, 2.0);
            index.insert((0, "R".to_string(), t), LinearExpr::term(v, 1.0));
        }
        encode_slice(&mut model, 0, &slice(SliceKind::Max, 0, 3), &cs, &index);
        assert_eq!(model.num_rows(), 3);

        let floor = CapacitySlice::new("R", "p", SliceKind::Max)
            .with_window(0, 3)
            .at_least(2.0);
        encode_slice(&mut model, 1, &floor, &cs, &index);
        // three indicator rows + pick row, three indicators
        assert_eq!(model.num_rows(), 7);
        assert_eq!(model.num_vars(), 6);

        // x = [0, 2, 0] satisfies max >= 2 with z at period 1.
        let mut values = vec![0.0, 2.0, 0.0];
        values.extend([0.0, 1.0, 0.0]);
        assert!(model.rows()[3..].iter().all(|r| r.is_satisfied(&values, 1e-9)));
        // x = [1, 1, 1] cannot reach 2.
        let bad = [1.0, 1.0, 1.0, 0.0, 1.0, 0.0];
        assert!(!model.rows()[3..].iter().all(|r| r.is_satisfied(&bad, 1e-9)));
    }

    #[test]
    fn test_encode_diff_at_least() {
        // One group, length 1, value 1: up-changes must total at least 2.
        let cs = vec![contributor(0, 1, 1.0)];
        let mut model = MipModel::new("diff");
        let mut index = OccupancyIndex::new();
        for t in 0..4 {
            let v = model.binary(format!("x[{t}]"));
            index.insert((0, "R".to_string(), t), LinearExpr::term(v, 1.0));
        }
        let sl = CapacitySlice::new("R", "p", SliceKind::DiffIncreasing)
            .with_window(0, 4)
            .at_least(2.0);
        encode_slice(&mut model, 0, &sl, &cs, &index);
        // Per period: u, β. Vars: 4 x + 4 u + 4 β.
        assert_eq!(model.num_vars(), 12);
        // 2 rows per period + total.
        assert_eq!(model.num_rows(), 9);
    }
}
