//! Task group manager.
//!
//! Partitions a scenario's tasks into symmetry classes. Tasks sharing a
//! `group` id are interchangeable instances compiled as one aggregate;
//! every other task is a singleton group named after itself.
//!
//! Constraints naming any instance apply to the whole group, so the
//! per-group views ([`TaskGroups::orderings`], [`TaskGroups::window`],
//! [`TaskGroups::requirement_slots`]) are what the compilers consume.
//! After solving, [`TaskGroup::fan_out`] maps the aggregate's solved
//! slots back onto concrete instances.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, ScheduleError};
use crate::models::{PrecedenceKind, Scenario, Task};

/// One symmetry class of interchangeable tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskGroup {
    /// Group id (the task id for singletons).
    pub id: String,
    /// Instance task ids in insertion order.
    pub instances: Vec<String>,
}

impl TaskGroup {
    /// The first instance, standing for the whole group.
    pub fn representative(&self) -> &str {
        &self.instances[0]
    }

    pub fn size(&self) -> usize {
        self.instances.len()
    }

    pub fn is_singleton(&self) -> bool {
        self.instances.len() == 1
    }

    /// Assigns solved slots to instances.
    ///
    /// Slots are sorted by start, then resources. Instances with a fixed
    /// start claim a matching slot first; the remaining instances take the
    /// pool in order. An optional instance without a slot is left
    /// unscheduled; a mandatory one fails with
    /// [`ScheduleError::UnderDeterminedGroup`].
    pub fn fan_out(&self, scenario: &Scenario, mut slots: Vec<Slot>) -> Result<FanOut> {
        slots.sort();
        let under_determined = |slots: usize| ScheduleError::UnderDeterminedGroup {
            group: self.id.clone(),
            slots,
            instances: self.size(),
        };

        let tasks: Vec<&Task> = self
            .instances
            .iter()
            .filter_map(|id| scenario.task(id))
            .collect();
        let total_slots = slots.len();

        let mut assigned: Vec<Option<Slot>> = vec![None; tasks.len()];
        let mut settled = vec![false; tasks.len()];
        let mut unscheduled = Vec::new();
        for (i, task) in tasks.iter().enumerate() {
            let Some(fixed) = task.fixed_start else {
                continue;
            };
            settled[i] = true;
            let pos = slots.iter().position(|s| {
                s.start == fixed && s.resources.iter().all(|r| task.allows_resource(r))
            });
            match pos {
                Some(pos) => assigned[i] = Some(slots.remove(pos)),
                None if task.is_optional() => unscheduled.push(task.id.clone()),
                None => return Err(under_determined(total_slots)),
            }
        }

        let mut pool = slots.into_iter();
        for (i, task) in tasks.iter().enumerate() {
            if settled[i] {
                continue;
            }
            match pool.next() {
                Some(slot) => assigned[i] = Some(slot),
                None if task.is_optional() => unscheduled.push(task.id.clone()),
                None => return Err(under_determined(total_slots)),
            }
        }
        let leftover = pool.count();
        if leftover > 0 {
            warn!(group = %self.id, leftover, "solved slots exceed group instances");
        }

        let placed: Vec<(String, Slot)> = tasks
            .iter()
            .zip(assigned)
            .filter_map(|(task, slot)| slot.map(|s| (task.id.clone(), s)))
            .collect();
        debug!(group = %self.id, placed = placed.len(), unscheduled = unscheduled.len(), "fan-out");
        Ok(FanOut {
            placed,
            unscheduled,
        })
    }
}

/// A solved start period plus one resource per requirement slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub start: i64,
    pub resources: Vec<String>,
}

impl Slot {
    pub fn new(start: i64, resources: Vec<String>) -> Self {
        Self { start, resources }
    }
}

/// Result of [`TaskGroup::fan_out`].
#[derive(Debug, Clone, PartialEq)]
pub struct FanOut {
    /// `(instance, slot)` pairs in instance order.
    pub placed: Vec<(String, Slot)>,
    /// Optional instances left without a slot.
    pub unscheduled: Vec<String>,
}

/// Ordering precedence lifted to groups (indices into [`TaskGroups::groups`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupOrdering {
    pub left: usize,
    pub right: usize,
    pub offset: i64,
    pub kind: PrecedenceKind,
}

/// A requirement of a group's representative, with its effective candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementSlot {
    /// Index into the registry's requirements.
    pub requirement: usize,
    pub candidates: Vec<String>,
    pub units: i64,
    /// Other groups that must take the same resource (sorted, deduplicated).
    pub partners: Vec<usize>,
}

/// Start window shared by all instances of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartWindow {
    /// Earliest start (`max(0, lower bounds)`).
    pub earliest: i64,
    /// Latest end, from upper bounds.
    pub latest_end: Option<i64>,
}

/// The group partition of one scenario.
#[derive(Debug, Clone, Default)]
pub struct TaskGroups {
    groups: Vec<TaskGroup>,
    by_task: HashMap<String, usize>,
}

impl TaskGroups {
    /// Partitions the scenario's tasks and checks that instances of each
    /// group are interchangeable.
    pub fn partition(scenario: &Scenario) -> Result<Self> {
        let mut groups: Vec<TaskGroup> = Vec::new();
        let mut by_id: HashMap<String, usize> = HashMap::new();
        let mut by_task = HashMap::new();

        for task in scenario.tasks() {
            let gid = task.group.clone().unwrap_or_else(|| task.id.clone());
            let idx = *by_id.entry(gid.clone()).or_insert_with(|| {
                groups.push(TaskGroup {
                    id: gid.clone(),
                    instances: Vec::new(),
                });
                groups.len() - 1
            });
            if task.group.is_none() && !groups[idx].instances.is_empty() {
                return Err(ScheduleError::InvalidGroup {
                    group: gid,
                    reason: format!("group id collides with ungrouped task '{}'", task.id),
                });
            }
            if task.group.is_some()
                && groups[idx]
                    .instances
                    .first()
                    .and_then(|first| scenario.task(first))
                    .is_some_and(|first| first.group.is_none())
            {
                return Err(ScheduleError::InvalidGroup {
                    group: gid,
                    reason: "group id collides with an ungrouped task".to_string(),
                });
            }
            groups[idx].instances.push(task.id.clone());
            by_task.insert(task.id.clone(), idx);
        }

        let partition = Self { groups, by_task };
        partition.check_shapes(scenario)?;
        debug!(
            tasks = scenario.tasks().len(),
            groups = partition.groups.len(),
            "task groups partitioned"
        );
        Ok(partition)
    }

    pub fn groups(&self) -> &[TaskGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group(&self, idx: usize) -> &TaskGroup {
        &self.groups[idx]
    }

    /// Index of the group containing `task`.
    pub fn index_of(&self, task: &str) -> Option<usize> {
        self.by_task.get(task).copied()
    }

    pub fn group_of(&self, task: &str) -> Option<&TaskGroup> {
        self.index_of(task).map(|i| &self.groups[i])
    }

    /// Representative task of group `idx`.
    pub fn representative<'s>(&self, scenario: &'s Scenario, idx: usize) -> Option<&'s Task> {
        scenario.task(self.groups[idx].representative())
    }

    /// Lax/Tight/Conditional precedences lifted to groups, deduplicated,
    /// in registration order.
    pub fn orderings(&self, scenario: &Scenario) -> Vec<GroupOrdering> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for p in scenario.constraints().orderings() {
            let (Some(l), Some(r)) = (
                p.left_task().and_then(|t| self.index_of(t)),
                p.right_task().and_then(|t| self.index_of(t)),
            ) else {
                continue;
            };
            let ordering = GroupOrdering {
                left: l,
                right: r,
                offset: p.offset,
                kind: p.kind,
            };
            if seen.insert(ordering) {
                out.push(ordering);
            }
        }
        out
    }

    /// Start window of group `idx` from the bounds on any of its instances.
    pub fn window(&self, scenario: &Scenario, idx: usize) -> StartWindow {
        let mut window = StartWindow::default();
        for p in scenario.constraints().bounds() {
            let Some(task) = p.bounded_task() else {
                continue;
            };
            if self.index_of(task) != Some(idx) {
                continue;
            }
            match (p.kind, p.bound()) {
                (PrecedenceKind::LowerBound, Some(b)) => {
                    window.earliest = window.earliest.max(b);
                }
                (PrecedenceKind::UpperBound, Some(b)) => {
                    window.latest_end = Some(window.latest_end.map_or(b, |e| e.min(b)));
                }
                _ => {}
            }
        }
        window
    }

    /// Requirements of group `idx`, taken from its representative.
    pub fn requirement_slots(&self, scenario: &Scenario, idx: usize) -> Vec<RequirementSlot> {
        self.task_requirement_slots(scenario, self.groups[idx].representative())
    }

    fn task_requirement_slots(&self, scenario: &Scenario, task: &str) -> Vec<RequirementSlot> {
        scenario
            .constraints()
            .requirements_for_task(task)
            .map(|(i, req)| {
                let mut partners: Vec<usize> = req
                    .task_ids()
                    .filter(|t| *t != task)
                    .filter_map(|t| self.index_of(t))
                    .collect();
                partners.sort_unstable();
                partners.dedup();
                RequirementSlot {
                    requirement: i,
                    candidates: scenario
                        .requirement_candidates(req)
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    units: req.units,
                    partners,
                }
            })
            .collect()
    }

    fn check_shapes(&self, scenario: &Scenario) -> Result<()> {
        for group in self.groups.iter().filter(|g| !g.is_singleton()) {
            let Some(rep) = scenario.task(group.representative()) else {
                continue;
            };
            let rep_slots = self.shape_of(scenario, &rep.id);
            for id in &group.instances[1..] {
                let Some(task) = scenario.task(id) else {
                    continue;
                };
                let mismatch = if task.length != rep.length {
                    Some("length")
                } else if task.fixed_resources != rep.fixed_resources {
                    Some("fixed resources")
                } else if task.params != rep.params {
                    Some("parameters")
                } else if task.schedule_cost != rep.schedule_cost {
                    Some("schedule cost")
                } else if (scenario.task_weight(&task.id) - scenario.task_weight(&rep.id)).abs()
                    > 1e-9
                {
                    Some("objective weight")
                } else if self.shape_of(scenario, id) != rep_slots {
                    Some("resource requirements")
                } else {
                    None
                };
                if let Some(what) = mismatch {
                    return Err(ScheduleError::InvalidGroup {
                        group: group.id.clone(),
                        reason: format!("instance '{id}' differs from '{}' in {what}", rep.id),
                    });
                }
            }
        }
        Ok(())
    }

    /// Requirement shape without registry indices, for instance comparison.
    fn shape_of(&self, scenario: &Scenario, task: &str) -> Vec<(Vec<String>, i64, Vec<usize>)> {
        self.task_requirement_slots(scenario, task)
            .into_iter()
            .map(|s| (s.candidates, s.units, s.partners))
            .collect()
    }
}
