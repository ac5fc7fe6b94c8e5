//! Constraint registry.
//!
//! Insert-only storage of a scenario's constraints with indexed views by
//! kind and by task/resource membership. Entries are stored in their
//! resolved form: every [`TaskRef`](crate::models::TaskRef) and
//! [`ResourceRef`](crate::models::ResourceRef) is `Named`.

use std::collections::HashMap;

use crate::models::{CapacitySlice, Precedence, PrecedenceKind, ResourceRequirement};

/// Indexed constraint storage for one scenario.
#[derive(Debug, Clone, Default)]
pub struct ConstraintRegistry {
    precedences: Vec<Precedence>,
    requirements: Vec<ResourceRequirement>,
    capacities: Vec<CapacitySlice>,
    requirements_by_task: HashMap<String, Vec<usize>>,
    requirements_by_resource: HashMap<String, Vec<usize>>,
    capacities_by_resource: HashMap<String, Vec<usize>>,
}

impl ConstraintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert_precedence(&mut self, precedence: Precedence) {
        self.precedences.push(precedence);
    }

    pub(crate) fn insert_requirement(&mut self, requirement: ResourceRequirement) {
        let idx = self.requirements.len();
        for task in requirement.task_ids() {
            let entry = self.requirements_by_task.entry(task.to_string()).or_default();
            if !entry.contains(&idx) {
                entry.push(idx);
            }
        }
        for resource in requirement.candidate_ids() {
            let entry = self
                .requirements_by_resource
                .entry(resource.to_string())
                .or_default();
            if !entry.contains(&idx) {
                entry.push(idx);
            }
        }
        self.requirements.push(requirement);
    }

    pub(crate) fn insert_capacity(&mut self, slice: CapacitySlice) {
        self.capacities_by_resource
            .entry(slice.resource.clone())
            .or_default()
            .push(self.capacities.len());
        self.capacities.push(slice);
    }

    /// All precedences, in insertion order.
    pub fn precedences(&self) -> &[Precedence] {
        &self.precedences
    }

    /// Lax, Tight and Conditional precedences.
    pub fn orderings(&self) -> impl Iterator<Item = &Precedence> {
        self.precedences.iter().filter(|p| p.kind.is_ordering())
    }

    /// Lower and upper start bounds.
    pub fn bounds(&self) -> impl Iterator<Item = &Precedence> {
        self.precedences.iter().filter(|p| !p.kind.is_ordering())
    }

    pub fn precedences_of_kind(&self, kind: PrecedenceKind) -> impl Iterator<Item = &Precedence> {
        self.precedences.iter().filter(move |p| p.kind == kind)
    }

    pub fn requirements(&self) -> &[ResourceRequirement] {
        &self.requirements
    }

    /// Requirements naming `task`, as `(index, requirement)` pairs.
    pub fn requirements_for_task<'a>(
        &'a self,
        task: &str,
    ) -> impl Iterator<Item = (usize, &'a ResourceRequirement)> + 'a {
        self.requirements_by_task
            .get(task)
            .into_iter()
            .flatten()
            .map(move |&i| (i, &self.requirements[i]))
    }

    /// Requirements offering `resource` as a candidate.
    pub fn requirements_for_resource<'a>(
        &'a self,
        resource: &str,
    ) -> impl Iterator<Item = &'a ResourceRequirement> + 'a {
        self.requirements_by_resource
            .get(resource)
            .into_iter()
            .flatten()
            .map(move |&i| &self.requirements[i])
    }

    pub fn capacities(&self) -> &[CapacitySlice] {
        &self.capacities
    }

    pub fn capacities_for_resource<'a>(
        &'a self,
        resource: &str,
    ) -> impl Iterator<Item = &'a CapacitySlice> + 'a {
        self.capacities_by_resource
            .get(resource)
            .into_iter()
            .flatten()
            .map(move |&i| &self.capacities[i])
    }

    /// Total number of stored constraints.
    pub fn len(&self) -> usize {
        self.precedences.len() + self.requirements.len() + self.capacities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SliceKind;

    fn sample_registry() -> ConstraintRegistry {
        let mut reg = ConstraintRegistry::new();
        reg.insert_precedence(Precedence::lax("T1", "T2", 0));
        reg.insert_precedence(Precedence::conditional("T2", "T3", 1));
        reg.insert_precedence(Precedence::lower_bound("T1", 2));
        reg.insert_requirement(ResourceRequirement::new(["T1"], ["R1", "R2"]));
        reg.insert_requirement(ResourceRequirement::new(["T2", "T3"], ["R2"]));
        reg.insert_capacity(
            CapacitySlice::new("R2", "length", SliceKind::Sum)
                .with_window(0, 4)
                .at_most(3.0),
        );
        reg
    }

    #[test]
    fn test_views_by_kind() {
        let reg = sample_registry();
        assert_eq!(reg.precedences().len(), 3);
        assert_eq!(reg.orderings().count(), 2);
        assert_eq!(reg.bounds().count(), 1);
        assert_eq!(
            reg.precedences_of_kind(PrecedenceKind::Conditional).count(),
            1
        );
        assert_eq!(reg.len(), 6);
        assert!(!reg.is_empty());
    }

    #[test]
    fn test_requirement_indexes() {
        let reg = sample_registry();
        let for_t3: Vec<usize> = reg.requirements_for_task("T3").map(|(i, _)| i).collect();
        assert_eq!(for_t3, vec![1]);
        assert_eq!(reg.requirements_for_resource("R2").count(), 2);
        assert_eq!(reg.requirements_for_resource("R1").count(), 1);
        assert_eq!(reg.requirements_for_task("T9").count(), 0);
    }

    #[test]
    fn test_capacity_index() {
        let reg = sample_registry();
        assert_eq!(reg.capacities_for_resource("R2").count(), 1);
        assert_eq!(reg.capacities_for_resource("R1").count(), 0);
    }
}
