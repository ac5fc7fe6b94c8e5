//! Scenario: the entity store of one scheduling problem.
//!
//! A [`Scenario`] owns its tasks, resources, constraints and objective.
//! It is built through `add_*` calls, handed to a compiler as immutable
//! input, and mutated once more by [`Scenario::apply_solution`].
//!
//! # Entity references
//! Constraints may embed the tasks and resources they mention. Adding the
//! constraint registers those entities (if absent) and stores the
//! constraint with plain id references. A reference *by id* to an unknown
//! entity is rejected, never silently created.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use super::{
    CapacitySlice, Constraint, Objective, Operand, Precedence, PrecedenceKind, Resource,
    ResourceRef, ResourceRequirement, Solution, Task, TaskRef,
};
use crate::algebra::{normalize, Comparison};
use crate::error::{EntityKind, Result, ScheduleError};
use crate::registry::ConstraintRegistry;

/// Id of the synthetic task added by [`Scenario::with_makespan_objective`].
pub const MAKESPAN_TASK: &str = "makespan";

/// A scheduling scenario.
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    name: String,
    horizon: Option<i64>,
    tasks: Vec<Task>,
    task_index: HashMap<String, usize>,
    resources: Vec<Resource>,
    resource_index: HashMap<String, usize>,
    registry: ConstraintRegistry,
    objective: Objective,
}

impl Scenario {
    /// Creates an empty scenario without horizon.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the number of discrete periods.
    pub fn with_horizon(mut self, horizon: i64) -> Self {
        self.horizon = Some(horizon);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn horizon(&self) -> Option<i64> {
        self.horizon
    }

    // ======================== Entities ========================

    /// Registers a task.
    ///
    /// Re-adding an identical task is a no-op; a different task under an
    /// existing id fails with [`ScheduleError::DuplicateEntity`].
    pub fn add_task(&mut self, task: Task) -> Result<()> {
        check_task(&task)?;
        if let Some(existing) = self.task(&task.id) {
            if *existing == task {
                return Ok(());
            }
            return Err(ScheduleError::DuplicateEntity {
                kind: EntityKind::Task,
                id: task.id,
            });
        }
        self.task_index.insert(task.id.clone(), self.tasks.len());
        self.tasks.push(task);
        Ok(())
    }

    /// Registers a resource. Same duplicate rules as [`Scenario::add_task`].
    pub fn add_resource(&mut self, resource: Resource) -> Result<()> {
        check_resource(&resource)?;
        if let Some(existing) = self.resource(&resource.id) {
            if *existing == resource {
                return Ok(());
            }
            return Err(ScheduleError::DuplicateEntity {
                kind: EntityKind::Resource,
                id: resource.id,
            });
        }
        self.resource_index
            .insert(resource.id.clone(), self.resources.len());
        self.resources.push(resource);
        Ok(())
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.task_index.get(id).map(|&i| &self.tasks[i])
    }

    /// Tasks in insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resource_index.get(id).map(|&i| &self.resources[i])
    }

    /// Resources in insertion order.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    // ======================== Constraints ========================

    /// Adds any constraint.
    pub fn add(&mut self, constraint: impl Into<Constraint>) -> Result<()> {
        match constraint.into() {
            Constraint::Precedence(p) => self.add_precedence(p),
            Constraint::Requirement(r) => self.add_requirement(r),
            Constraint::Capacity(c) => self.add_capacity(c),
        }
    }

    /// Normalizes an algebraic comparison and adds the resulting precedence.
    pub fn add_comparison(&mut self, comparison: Comparison) -> Result<()> {
        let precedence = normalize(comparison)?;
        self.add_precedence(precedence)
    }

    /// Adds a canonical precedence or bound.
    pub fn add_precedence(&mut self, mut precedence: Precedence) -> Result<()> {
        if !precedence.is_well_formed() {
            return Err(ScheduleError::InvalidPrecedenceShape(format!(
                "operands of '{precedence}' do not match {:?}",
                precedence.kind
            )));
        }
        {
            let mut pending = HashMap::new();
            for op in [&precedence.left, &precedence.right] {
                if let Operand::Task(task) = op {
                    self.check_task_ref(task, &mut pending)?;
                }
            }
        }
        for task in precedence.task_refs_mut() {
            self.commit_task_ref(task);
        }
        debug!(precedence = %precedence, "precedence registered");
        self.registry.insert_precedence(precedence);
        Ok(())
    }

    /// Adds a resource requirement.
    pub fn add_requirement(&mut self, mut requirement: ResourceRequirement) -> Result<()> {
        let reason = if requirement.tasks.is_empty() {
            Some("requirement names no task")
        } else if requirement.candidates.is_empty() {
            Some("requirement has no candidate resource")
        } else if requirement.units < 1 {
            Some("requirement units must be >= 1")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(ScheduleError::InvalidEntity {
                id: requirement.to_string(),
                reason: reason.to_string(),
            });
        }

        {
            let mut pending_tasks = HashMap::new();
            for task in &requirement.tasks {
                self.check_task_ref(task, &mut pending_tasks)?;
            }
            let mut pending_resources = HashMap::new();
            for resource in &requirement.candidates {
                self.check_resource_ref(resource, &mut pending_resources)?;
            }
        }

        for task in &mut requirement.tasks {
            self.commit_task_ref(task);
        }
        for resource in &mut requirement.candidates {
            self.commit_resource_ref(resource);
        }
        debug!(requirement = %requirement, "requirement registered");
        self.registry.insert_requirement(requirement);
        Ok(())
    }

    /// Adds a capacity slice over a registered resource.
    pub fn add_capacity(&mut self, slice: CapacitySlice) -> Result<()> {
        if self.resource(&slice.resource).is_none() {
            return Err(ScheduleError::UnknownEntity {
                kind: EntityKind::Resource,
                id: slice.resource,
            });
        }
        let within_horizon = self.horizon.map_or(true, |h| slice.end <= h);
        if slice.start < 0 || slice.start > slice.end || !within_horizon {
            return Err(ScheduleError::InvalidEntity {
                id: slice.to_string(),
                reason: "slice window must satisfy 0 <= start <= end <= horizon".to_string(),
            });
        }
        self.registry.insert_capacity(slice);
        Ok(())
    }

    /// The constraint registry.
    pub fn constraints(&self) -> &ConstraintRegistry {
        &self.registry
    }

    /// Candidate resources of a requirement after applying the fixed
    /// resources of its tasks.
    ///
    /// Each task pinned to resources narrows the set to the intersection,
    /// unless that intersection is empty (reported by validation).
    pub fn requirement_candidates<'a>(&self, requirement: &'a ResourceRequirement) -> Vec<&'a str> {
        let mut candidates: Vec<&str> = requirement.candidate_ids().collect();
        for task in requirement.task_ids().filter_map(|t| self.task(t)) {
            if task.fixed_resources.is_empty() {
                continue;
            }
            let narrowed: Vec<&str> = candidates
                .iter()
                .copied()
                .filter(|r| task.allows_resource(r))
                .collect();
            if !narrowed.is_empty() {
                candidates = narrowed;
            }
        }
        candidates
    }

    // ======================== Objective ========================

    /// Replaces the objective. Every weighted task must be registered.
    pub fn set_objective(&mut self, objective: Objective) -> Result<()> {
        if let Some((task, _)) = objective.terms().find(|(t, _)| self.task(t).is_none()) {
            return Err(ScheduleError::UnknownEntity {
                kind: EntityKind::Task,
                id: task.to_string(),
            });
        }
        self.objective = objective;
        Ok(())
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Completion-time weight: objective weight plus `completion_time_cost`.
    pub fn task_weight(&self, task: &str) -> f64 {
        let cost = self
            .task(task)
            .and_then(|t| t.completion_time_cost)
            .unwrap_or(0.0);
        self.objective.weight(task) + cost
    }

    /// Returns a copy minimizing the latest end over all tasks.
    ///
    /// Adds a zero-length task [`MAKESPAN_TASK`] that every other task
    /// precedes, and makes its end the only objective term.
    pub fn with_makespan_objective(&self) -> Result<Scenario> {
        let mut scenario = self.clone();
        scenario.add_task(Task::new(MAKESPAN_TASK, 0))?;
        for task in &self.tasks {
            scenario.add_precedence(Precedence::lax(task.id.as_str(), MAKESPAN_TASK, 0))?;
        }
        scenario.objective = Objective::new().with_term(MAKESPAN_TASK, 1.0);
        Ok(scenario)
    }

    /// Returns a copy minimizing the sum of completion times.
    pub fn with_flowtime_objective(&self) -> Scenario {
        let mut scenario = self.clone();
        let mut objective = Objective::new();
        for task in &self.tasks {
            objective.add_term(task.id.as_str(), 1.0);
        }
        scenario.objective = objective;
        scenario
    }

    /// Attaches solved starts and resources to the tasks.
    pub fn apply_solution(&mut self, solution: &Solution) {
        for task in &mut self.tasks {
            match solution.placement(&task.id) {
                Some(p) => {
                    task.start = Some(p.start);
                    task.resources = p.resources.clone();
                }
                None => {
                    task.start = None;
                    task.resources.clear();
                }
            }
        }
    }

    /// Objective value of a solution.
    ///
    /// `Σ weight·end + Σ schedule_cost (scheduled tasks) + Σ cost_per_period·busy`,
    /// where a resource is busy `units·length` periods per bound task.
    pub fn objective_value(&self, solution: &Solution) -> f64 {
        let mut value = 0.0;
        for (id, placement) in solution.placements() {
            value += self.task_weight(id) * placement.end as f64;
            if let Some(cost) = self.task(id).and_then(|t| t.schedule_cost) {
                value += cost;
            }
            let length = placement.end - placement.start;
            for ((_, req), resource) in self
                .registry
                .requirements_for_task(id)
                .zip(&placement.resources)
            {
                if let Some(cost) = self.resource(resource).and_then(|r| r.cost_per_period) {
                    value += cost * (req.units * length) as f64;
                }
            }
        }
        value
    }

    // ======================== Reference resolution ========================

    fn check_task_ref<'a>(
        &self,
        task: &'a TaskRef,
        pending: &mut HashMap<&'a str, &'a Task>,
    ) -> Result<()> {
        match task {
            TaskRef::Named(id) => {
                if self.task(id).is_none() && !pending.contains_key(id.as_str()) {
                    return Err(ScheduleError::UnknownEntity {
                        kind: EntityKind::Task,
                        id: id.clone(),
                    });
                }
            }
            TaskRef::Entity(entity) => {
                check_task(entity)?;
                let known = self
                    .task(&entity.id)
                    .or_else(|| pending.get(entity.id.as_str()).copied());
                match known {
                    Some(existing) if existing != entity.as_ref() => {
                        return Err(ScheduleError::DuplicateEntity {
                            kind: EntityKind::Task,
                            id: entity.id.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        pending.insert(entity.id.as_str(), entity.as_ref());
                    }
                }
            }
        }
        Ok(())
    }

    fn check_resource_ref<'a>(
        &self,
        resource: &'a ResourceRef,
        pending: &mut HashMap<&'a str, &'a Resource>,
    ) -> Result<()> {
        match resource {
            ResourceRef::Named(id) => {
                if self.resource(id).is_none() && !pending.contains_key(id.as_str()) {
                    return Err(ScheduleError::UnknownEntity {
                        kind: EntityKind::Resource,
                        id: id.clone(),
                    });
                }
            }
            ResourceRef::Entity(entity) => {
                check_resource(entity)?;
                let known = self
                    .resource(&entity.id)
                    .or_else(|| pending.get(entity.id.as_str()).copied());
                match known {
                    Some(existing) if existing != entity => {
                        return Err(ScheduleError::DuplicateEntity {
                            kind: EntityKind::Resource,
                            id: entity.id.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        pending.insert(entity.id.as_str(), entity);
                    }
                }
            }
        }
        Ok(())
    }

    /// Registers an embedded task (already checked) and rewrites to `Named`.
    fn commit_task_ref(&mut self, task: &mut TaskRef) {
        if let TaskRef::Entity(entity) = task {
            let id = entity.id.clone();
            if self.task(&id).is_none() {
                self.task_index.insert(id.clone(), self.tasks.len());
                self.tasks.push((**entity).clone());
            }
            *task = TaskRef::Named(id);
        }
    }

    fn commit_resource_ref(&mut self, resource: &mut ResourceRef) {
        if let ResourceRef::Entity(entity) = resource {
            let id = entity.id.clone();
            if self.resource(&id).is_none() {
                self.resource_index.insert(id.clone(), self.resources.len());
                self.resources.push(entity.clone());
            }
            *resource = ResourceRef::Named(id);
        }
    }
}

fn check_task(task: &Task) -> Result<()> {
    let reason = if task.id.is_empty() {
        Some("task id must not be empty")
    } else if task.length < 0 {
        Some("length must be >= 0")
    } else if task.fixed_start.is_some_and(|s| s < 0) {
        Some("fixed start must be >= 0")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ScheduleError::InvalidEntity {
            id: task.id.clone(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

fn check_resource(resource: &Resource) -> Result<()> {
    let inverted = matches!(
        (resource.load_lower, resource.load_upper),
        (Some(lo), Some(hi)) if lo > hi
    );
    let reason = if resource.id.is_empty() {
        Some("resource id must not be empty")
    } else if resource.size < 1 {
        Some("size must be >= 1")
    } else if inverted {
        Some("load lower bound exceeds upper bound")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ScheduleError::InvalidEntity {
            id: resource.id.clone(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

impl fmt::Display for Scenario {
    /// Deterministic dump used for diffing and golden tests.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SCENARIO: {}", self.name)?;
        match self.horizon {
            Some(h) => writeln!(f, "horizon: {h}")?,
            None => writeln!(f, "horizon: none")?,
        }

        writeln!(f)?;
        writeln!(f, "OBJECTIVE")?;
        writeln!(f, "  {}", self.objective)?;

        writeln!(f)?;
        writeln!(f, "RESOURCES")?;
        for r in &self.resources {
            write!(f, "  {} size={}", r.id, r.size)?;
            if let Some(lo) = r.load_lower {
                write!(f, " load>={lo}")?;
            }
            if let Some(hi) = r.load_upper {
                write!(f, " load<={hi}")?;
            }
            if let Some(cost) = r.cost_per_period {
                write!(f, " cost={cost}")?;
            }
            writeln!(f)?;
        }

        writeln!(f)?;
        writeln!(f, "TASKS")?;
        for t in &self.tasks {
            write!(f, "  {} length={}", t.id, t.length)?;
            if let Some(group) = &t.group {
                write!(f, " group={group}")?;
            }
            if let Some(s) = t.fixed_start {
                write!(f, " fixed_start={s}")?;
            }
            if !t.fixed_resources.is_empty() {
                write!(f, " fixed=[{}]", t.fixed_resources.join(","))?;
            }
            for (name, value) in &t.params {
                write!(f, " {name}={value}")?;
            }
            if let Some(start) = t.start {
                write!(f, " start={start}")?;
                if !t.resources.is_empty() {
                    write!(f, " resources=[{}]", t.resources.join(","))?;
                }
            }
            writeln!(f)?;
        }

        let sections = [
            ("LAX PRECEDENCES", PrecedenceKind::Lax),
            ("TIGHT PRECEDENCES", PrecedenceKind::Tight),
            ("CONDITIONAL PRECEDENCES", PrecedenceKind::Conditional),
            ("LOWER BOUNDS", PrecedenceKind::LowerBound),
            ("UPPER BOUNDS", PrecedenceKind::UpperBound),
        ];
        for (title, kind) in sections {
            let mut items = self.registry.precedences_of_kind(kind).peekable();
            if items.peek().is_none() {
                continue;
            }
            writeln!(f)?;
            writeln!(f, "{title}")?;
            for p in items {
                writeln!(f, "  {p}")?;
            }
        }

        if !self.registry.requirements().is_empty() {
            writeln!(f)?;
            writeln!(f, "RESOURCE REQUIREMENTS")?;
            for r in self.registry.requirements() {
                writeln!(f, "  {r}")?;
            }
        }

        if !self.registry.capacities().is_empty() {
            writeln!(f)?;
            writeln!(f, "CAPACITY SLICES")?;
            for c in self.registry.capacities() {
                writeln!(f, "  {c}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::AffineExpr;
    use crate::models::{Placement, SliceKind};
    use std::collections::BTreeMap;

    fn two_task_scenario() -> Scenario {
        let mut s = Scenario::new("pair").with_horizon(4);
        s.add_resource(Resource::new("R1")).unwrap();
        s.add_task(Task::new("T1", 1)).unwrap();
        s.add_task(Task::new("T2", 1)).unwrap();
        s.add_precedence(Precedence::lax("T1", "T2", 0)).unwrap();
        s.add_requirement(ResourceRequirement::new(["T1"], ["R1"]))
            .unwrap();
        s.add_requirement(ResourceRequirement::new(["T2"], ["R1"]))
            .unwrap();
        s
    }

    #[test]
    fn test_add_and_lookup() {
        let s = two_task_scenario();
        assert_eq!(s.tasks().len(), 2);
        assert_eq!(s.task("T2").unwrap().length, 1);
        assert!(s.resource("R1").unwrap().is_unary());
        assert_eq!(s.constraints().len(), 3);
    }

    #[test]
    fn test_duplicate_entities() {
        let mut s = two_task_scenario();
        // Identical re-add is accepted.
        assert!(s.add_task(Task::new("T1", 1)).is_ok());
        assert!(matches!(
            s.add_task(Task::new("T1", 5)),
            Err(ScheduleError::DuplicateEntity {
                kind: EntityKind::Task,
                ..
            })
        ));
        assert!(matches!(
            s.add_resource(Resource::new("R1").with_size(2)),
            Err(ScheduleError::DuplicateEntity { .. })
        ));
    }

    #[test]
    fn test_invalid_entities() {
        let mut s = Scenario::new("bad");
        assert!(matches!(
            s.add_task(Task::new("T", -1)),
            Err(ScheduleError::InvalidEntity { .. })
        ));
        assert!(s.add_resource(Resource::new("R").with_size(0)).is_err());
        assert!(s
            .add_resource(Resource::new("R").with_load_lower(5.0).with_load_upper(1.0))
            .is_err());
    }

    #[test]
    fn test_unknown_reference_rejected() {
        let mut s = Scenario::new("unknown");
        s.add_task(Task::new("T1", 1)).unwrap();
        let err = s.add_precedence(Precedence::lax("T1", "T9", 0)).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::UnknownEntity {
                kind: EntityKind::Task,
                ..
            }
        ));
        // Nothing registered on failure.
        assert!(s.constraints().is_empty());

        let err = s
            .add_requirement(ResourceRequirement::new(["T1"], ["R9"]))
            .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::UnknownEntity {
                kind: EntityKind::Resource,
                ..
            }
        ));
    }

    #[test]
    fn test_embedded_entities_registered() {
        let mut s = Scenario::new("embedded");
        s.add_requirement(ResourceRequirement::new(
            [Task::new("T1", 2)],
            [Resource::new("R1"), Resource::new("R2")],
        ))
        .unwrap();
        assert!(s.task("T1").is_some());
        assert!(s.resource("R2").is_some());
        // Stored in named form.
        let req = &s.constraints().requirements()[0];
        assert_eq!(req.tasks[0], TaskRef::Named("T1".into()));
        assert_eq!(req.candidates[1], ResourceRef::Named("R2".into()));

        // Embedded entity and later by-name reference in the same constraint.
        s.add_precedence(Precedence::lax(Task::new("T3", 1), "T3", 0))
            .unwrap();
        assert!(s.task("T3").is_some());

        // Embedded entity conflicting with a registered one.
        let err = s
            .add_precedence(Precedence::lax(Task::new("T1", 7), "T3", 0))
            .unwrap_err();
        assert!(matches!(err, ScheduleError::DuplicateEntity { .. }));
    }

    #[test]
    fn test_add_comparison() {
        let mut s = two_task_scenario();
        s.add_comparison(Comparison::lax(AffineExpr::task("T1").plus(2), 8))
            .unwrap();
        let ub: Vec<_> = s
            .constraints()
            .precedences_of_kind(PrecedenceKind::UpperBound)
            .collect();
        assert_eq!(ub.len(), 1);
        assert_eq!(ub[0].bound(), Some(6));

        let err = s
            .add_comparison(Comparison::tight("T1", 3))
            .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidPrecedenceShape(_)));
    }

    #[test]
    fn test_malformed_precedence_rejected() {
        let mut s = two_task_scenario();
        let p = Precedence {
            left: Operand::Value(1),
            right: Operand::Value(2),
            offset: 0,
            kind: PrecedenceKind::Lax,
        };
        assert!(matches!(
            s.add_precedence(p),
            Err(ScheduleError::InvalidPrecedenceShape(_))
        ));
    }

    #[test]
    fn test_requirement_shape_checked() {
        let mut s = two_task_scenario();
        let empty: [&str; 0] = [];
        assert!(s
            .add_requirement(ResourceRequirement::new(["T1"], empty))
            .is_err());
        assert!(s
            .add_requirement(ResourceRequirement::new(["T1"], ["R1"]).with_units(0))
            .is_err());
    }

    #[test]
    fn test_capacity_window_checked() {
        let mut s = two_task_scenario();
        let ok = CapacitySlice::new("R1", "length", SliceKind::Sum)
            .with_window(0, 4)
            .at_most(2.0);
        assert!(s.add_capacity(ok).is_ok());
        let outside = CapacitySlice::new("R1", "length", SliceKind::Sum).with_window(2, 6);
        assert!(s.add_capacity(outside).is_err());
        let unknown = CapacitySlice::new("R9", "length", SliceKind::Sum);
        assert!(matches!(
            s.add_capacity(unknown),
            Err(ScheduleError::UnknownEntity { .. })
        ));
    }

    #[test]
    fn test_requirement_candidates_follow_fixed_resources() {
        let mut s = Scenario::new("fixed");
        s.add_task(Task::new("A", 1).with_fixed_resource("R2")).unwrap();
        s.add_task(Task::new("B", 1).with_fixed_resource("R9")).unwrap();
        for r in ["R1", "R2"] {
            s.add_resource(Resource::new(r)).unwrap();
        }
        s.add_requirement(ResourceRequirement::new(["A"], ["R1", "R2"]))
            .unwrap();
        s.add_requirement(ResourceRequirement::new(["B"], ["R1", "R2"]))
            .unwrap();
        let reqs = s.constraints().requirements();
        assert_eq!(s.requirement_candidates(&reqs[0]), vec!["R2"]);
        // Empty intersection leaves the candidates untouched.
        assert_eq!(s.requirement_candidates(&reqs[1]), vec!["R1", "R2"]);
    }

    #[test]
    fn test_objective_and_weights() {
        let mut s = two_task_scenario();
        assert!(s
            .set_objective(Objective::new().with_term("T9", 1.0))
            .is_err());
        s.set_objective(Objective::new().with_term("T2", 2.0)).unwrap();
        assert_eq!(s.task_weight("T2"), 2.0);
        assert_eq!(s.task_weight("T1"), 0.0);
    }

    #[test]
    fn test_makespan_objective() {
        let s = two_task_scenario();
        let m = s.with_makespan_objective().unwrap();
        assert!(m.task(MAKESPAN_TASK).is_some());
        assert_eq!(m.objective().weight(MAKESPAN_TASK), 1.0);
        assert_eq!(
            m.constraints()
                .precedences_of_kind(PrecedenceKind::Lax)
                .filter(|p| p.right_task() == Some(MAKESPAN_TASK))
                .count(),
            2
        );
        // Original scenario untouched.
        assert!(s.task(MAKESPAN_TASK).is_none());
    }

    #[test]
    fn test_flowtime_objective() {
        let f = two_task_scenario().with_flowtime_objective();
        assert_eq!(f.objective().weight("T1"), 1.0);
        assert_eq!(f.objective().weight("T2"), 1.0);
    }

    fn pair_solution() -> Solution {
        let mut placements = BTreeMap::new();
        placements.insert(
            "T1".to_string(),
            Placement {
                start: 0,
                end: 1,
                resources: vec!["R1".into()],
            },
        );
        placements.insert(
            "T2".to_string(),
            Placement {
                start: 1,
                end: 2,
                resources: vec!["R1".into()],
            },
        );
        Solution::new(placements, Vec::new())
    }

    #[test]
    fn test_apply_solution_and_objective_value() {
        let mut s = two_task_scenario().with_flowtime_objective();
        let solution = pair_solution();
        assert!((s.objective_value(&solution) - 3.0).abs() < 1e-9);

        s.apply_solution(&solution);
        assert_eq!(s.task("T2").unwrap().start, Some(1));
        assert_eq!(s.task("T2").unwrap().end(), Some(2));
        assert_eq!(s.task("T1").unwrap().resources, vec!["R1".to_string()]);
    }

    #[test]
    fn test_objective_value_with_costs() {
        let mut s = Scenario::new("costs");
        s.add_resource(Resource::new("R1").with_cost_per_period(0.5))
            .unwrap();
        s.add_task(Task::new("T1", 2).with_schedule_cost(3.0)).unwrap();
        s.add_requirement(ResourceRequirement::new(["T1"], ["R1"]))
            .unwrap();
        let mut placements = BTreeMap::new();
        placements.insert(
            "T1".to_string(),
            Placement {
                start: 1,
                end: 3,
                resources: vec!["R1".into()],
            },
        );
        let solution = Solution::new(placements, Vec::new());
        // weight 0; schedule cost 3; 0.5 * 2 busy periods.
        assert!((s.objective_value(&solution) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_scenario_dump() {
        let mut s = two_task_scenario();
        s.add_task(Task::new("T3", 2).with_param("heat", 1.5).with_group("G"))
            .unwrap();
        s.add_precedence(Precedence::conditional("T1", "T3", 2))
            .unwrap();
        s.add_precedence(Precedence::lower_bound("T3", 1)).unwrap();
        s.add_capacity(
            CapacitySlice::new("R1", "heat", SliceKind::Max)
                .with_window(0, 4)
                .at_most(2.0),
        )
        .unwrap();
        s.set_objective(Objective::new().with_term("T2", 1.0)).unwrap();
        s.apply_solution(&pair_solution());

        let expected = "\
SCENARIO: pair
horizon: 4

OBJECTIVE
  1*T2

RESOURCES
  R1 size=1

TASKS
  T1 length=1 start=0 resources=[R1]
  T2 length=1 start=1 resources=[R1]
  T3 length=2 group=G heat=1.5

LAX PRECEDENCES
  T1 < T2

CONDITIONAL PRECEDENCES
  T1 + 2 << T3

LOWER BOUNDS
  start(T3) >= 1

RESOURCE REQUIREMENTS
  T1 -> R1
  T2 -> R1

CAPACITY SLICES
  R1['heat'].max[0:4] <= 2
";
        assert_eq!(s.to_string(), expected);
    }
}
