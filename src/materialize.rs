//! Solution materializer.
//!
//! Reads a solved variable assignment back through the naming scheme of
//! [`compile`](crate::compile) and turns it into a [`Solution`]: one slot
//! per solved start (with a resource per requirement), fanned out onto
//! the concrete instances of each task group.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::compile::{assign_var, start_var, x_var, xr_var, CompiledModel, Formulation};
use crate::error::{Result, ScheduleError};
use crate::groups::Slot;
use crate::models::{Placement, Scenario, Solution};

/// Solved values looked up by variable name.
struct Values<'a> {
    compiled: &'a CompiledModel,
    values: &'a HashMap<String, f64>,
}

impl Values<'_> {
    /// Value of a variable the model declares; `None` when it does not.
    ///
    /// A declared variable absent from the assignment is an
    /// [`ScheduleError::UnsolvedModel`].
    fn get(&self, name: &str) -> Result<Option<f64>> {
        if self.compiled.model.var(name).is_none() {
            return Ok(None);
        }
        match self.values.get(name) {
            Some(&v) => Ok(Some(v)),
            None => Err(ScheduleError::UnsolvedModel {
                key: name.to_string(),
            }),
        }
    }

    fn required(&self, name: &str) -> Result<f64> {
        self.get(name)?.ok_or_else(|| ScheduleError::UnsolvedModel {
            key: name.to_string(),
        })
    }

    /// Nearest integer of a declared variable (0 when undeclared).
    fn count(&self, name: &str) -> Result<i64> {
        Ok(self.get(name)?.map_or(0, |v| v.round() as i64))
    }
}

/// Builds the solution encoded by a solved assignment of `compiled`.
pub fn materialize(
    scenario: &Scenario,
    compiled: &CompiledModel,
    values: &HashMap<String, f64>,
) -> Result<Solution> {
    let values = Values { compiled, values };
    let groups = &compiled.groups;

    let mut placements = BTreeMap::new();
    let mut unscheduled = Vec::new();
    for (g, group) in groups.groups().iter().enumerate() {
        let slots = match compiled.formulation {
            Formulation::ContinuousBigM => bigm_slots(scenario, &group.instances, &values)?,
            Formulation::TimeIndexed => time_indexed_slots(scenario, compiled, g, &values)?,
        };
        let fan_out = group.fan_out(scenario, slots)?;
        for (task, slot) in fan_out.placed {
            let length = scenario.task(&task).map_or(0, |t| t.length);
            placements.insert(
                task,
                Placement {
                    start: slot.start,
                    end: slot.start + length,
                    resources: slot.resources,
                },
            );
        }
        unscheduled.extend(fan_out.unscheduled);
    }
    debug!(
        placed = placements.len(),
        unscheduled = unscheduled.len(),
        "solution materialized"
    );
    Ok(Solution::new(placements, unscheduled))
}

/// One slot per instance: its rounded start and the most-selected
/// candidate of each requirement.
fn bigm_slots(scenario: &Scenario, instances: &[String], values: &Values<'_>) -> Result<Vec<Slot>> {
    let mut slots = Vec::with_capacity(instances.len());
    for task in instances {
        let start = values.required(&start_var(task))?.round() as i64;
        let mut resources = Vec::new();
        for (r, req) in scenario.constraints().requirements_for_task(task) {
            let mut best: Option<(&str, f64)> = None;
            for candidate in scenario.requirement_candidates(req) {
                let v = values.get(&assign_var(task, r, candidate))?.unwrap_or(0.0);
                if best.map_or(true, |(_, b)| v > b) {
                    best = Some((candidate, v));
                }
            }
            if let Some((resource, _)) = best {
                resources.push(resource.to_string());
            }
        }
        slots.push(Slot::new(start, resources));
    }
    Ok(slots)
}

/// `x[G,t]` slots per period; resources dealt out from the routing counts.
fn time_indexed_slots(
    scenario: &Scenario,
    compiled: &CompiledModel,
    g: usize,
    values: &Values<'_>,
) -> Result<Vec<Slot>> {
    let groups = &compiled.groups;
    let group = groups.group(g);
    let horizon = scenario.horizon().unwrap_or(0);
    let requirement_slots = groups.requirement_slots(scenario, g);

    let mut slots = Vec::new();
    for t in 0..=horizon {
        let n = values.count(&x_var(&group.id, t))?;
        if n <= 0 {
            continue;
        }
        let mut per_slot: Vec<Vec<String>> = Vec::with_capacity(requirement_slots.len());
        for (k, slot) in requirement_slots.iter().enumerate() {
            let mut dealt = Vec::with_capacity(n as usize);
            if let [only] = slot.candidates.as_slice() {
                dealt.resize(n as usize, only.clone());
            } else {
                for resource in &slot.candidates {
                    let c = values.count(&xr_var(&group.id, k, resource, t))?;
                    for _ in 0..c.max(0) {
                        dealt.push(resource.clone());
                    }
                }
                if dealt.len() != n as usize {
                    warn!(
                        group = %group.id,
                        period = t,
                        started = n,
                        routed = dealt.len(),
                        "routing counts disagree with starts"
                    );
                    let fill = slot.candidates.first().cloned().unwrap_or_default();
                    dealt.resize(n as usize, fill);
                }
            }
            per_slot.push(dealt);
        }
        for j in 0..n as usize {
            let resources = per_slot.iter().map(|dealt| dealt[j].clone()).collect();
            slots.push(Slot::new(t, resources));
        }
    }
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{compile, CompileOptions};
    use crate::models::{Resource, ResourceRequirement, Task};

    fn scenario() -> Scenario {
        let mut s = Scenario::new("m").with_horizon(4);
        s.add_resource(Resource::new("R1")).unwrap();
        s.add_resource(Resource::new("R2")).unwrap();
        for i in 0..2 {
            let id = format!("G{i}");
            s.add_task(Task::new(id.as_str(), 2).with_group("G")).unwrap();
            s.add_requirement(ResourceRequirement::new([id.as_str()], ["R1", "R2"]))
                .unwrap();
        }
        s
    }

    fn assignment(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_time_indexed_fan_out() {
        let s = scenario();
        let c = compile(&s, Formulation::TimeIndexed, &CompileOptions::new()).unwrap();
        let mut values: HashMap<String, f64> = c
            .model
            .variables()
            .iter()
            .map(|v| (v.name.clone(), 0.0))
            .collect();
        values.insert("x[G,0]".into(), 2.0);
        values.insert("xr[G,0,R1,0]".into(), 1.0);
        values.insert("xr[G,0,R2,0]".into(), 1.0);

        let sol = materialize(&s, &c, &values).unwrap();
        assert_eq!(
            sol.tuples(),
            vec![("G0", "R1", 0, 2), ("G1", "R2", 0, 2)]
        );
    }

    #[test]
    fn test_bigm_argmax_resource() {
        let mut s = Scenario::new("b");
        s.add_resource(Resource::new("R1")).unwrap();
        s.add_resource(Resource::new("R2")).unwrap();
        s.add_task(Task::new("T", 1)).unwrap();
        s.add_requirement(ResourceRequirement::new(["T"], ["R1", "R2"]))
            .unwrap();
        let c = compile(&s, Formulation::ContinuousBigM, &CompileOptions::new()).unwrap();
        let values = assignment(&[
            ("start[T]", 0.9999997),
            ("assign[T,0,R1]", 0.0000001),
            ("assign[T,0,R2]", 0.9999999),
        ]);
        let sol = materialize(&s, &c, &values).unwrap();
        assert_eq!(sol.tuples(), vec![("T", "R2", 1, 2)]);
    }

    #[test]
    fn test_missing_variable_is_unsolved() {
        let s = scenario();
        let c = compile(&s, Formulation::TimeIndexed, &CompileOptions::new()).unwrap();
        let err = materialize(&s, &c, &HashMap::new()).unwrap_err();
        assert!(matches!(err, ScheduleError::UnsolvedModel { .. }));
    }
}
