//! Scheduling constraints.
//!
//! Defines the relationships a valid schedule must satisfy: precedences
//! and start bounds between tasks, resource requirements, and windowed
//! capacity slices over a resource's per-period parameter load.
//!
//! Constraints reference entities through [`TaskRef`] / [`ResourceRef`].
//! A reference either names an entity already in the scenario or embeds
//! a new one; registering the constraint registers embedded entities and
//! rewrites every reference to its `Named` form.
//!
//! # Reference
//! Brucker (2007), "Scheduling Algorithms", Ch. 2

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Resource, Task};

/// Reference to a task, by id or by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskRef {
    /// A task already registered under this id.
    Named(String),
    /// A task registered together with the constraint if not yet present.
    Entity(Box<Task>),
}

impl TaskRef {
    /// The referenced task id.
    pub fn id(&self) -> &str {
        match self {
            TaskRef::Named(id) => id,
            TaskRef::Entity(task) => &task.id,
        }
    }
}

impl From<&str> for TaskRef {
    fn from(id: &str) -> Self {
        TaskRef::Named(id.to_string())
    }
}

impl From<String> for TaskRef {
    fn from(id: String) -> Self {
        TaskRef::Named(id)
    }
}

impl From<Task> for TaskRef {
    fn from(task: Task) -> Self {
        TaskRef::Entity(Box::new(task))
    }
}

impl From<&Task> for TaskRef {
    fn from(task: &Task) -> Self {
        TaskRef::Entity(Box::new(task.clone()))
    }
}

/// Reference to a resource, by id or by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResourceRef {
    Named(String),
    Entity(Resource),
}

impl ResourceRef {
    /// The referenced resource id.
    pub fn id(&self) -> &str {
        match self {
            ResourceRef::Named(id) => id,
            ResourceRef::Entity(resource) => &resource.id,
        }
    }
}

impl From<&str> for ResourceRef {
    fn from(id: &str) -> Self {
        ResourceRef::Named(id.to_string())
    }
}

impl From<String> for ResourceRef {
    fn from(id: String) -> Self {
        ResourceRef::Named(id)
    }
}

impl From<Resource> for ResourceRef {
    fn from(resource: Resource) -> Self {
        ResourceRef::Entity(resource)
    }
}

impl From<&Resource> for ResourceRef {
    fn from(resource: &Resource) -> Self {
        ResourceRef::Entity(resource.clone())
    }
}

/// One side of a precedence: a task or a constant period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Task(TaskRef),
    Value(i64),
}

impl Operand {
    /// The task id, if this side is a task.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Operand::Task(t) => Some(t.id()),
            Operand::Value(_) => None,
        }
    }

    /// The constant, if this side is a value.
    pub fn value(&self) -> Option<i64> {
        match self {
            Operand::Task(_) => None,
            Operand::Value(v) => Some(*v),
        }
    }
}

/// Precedence classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrecedenceKind {
    /// `right` starts no earlier than `left` ends plus `offset` (`<`).
    Lax,
    /// `right` starts exactly when `left` ends plus `offset` (`<=`).
    Tight,
    /// Lax ordering enforced only if both tasks share a resource (`<<`).
    Conditional,
    /// `start(right) >= left` for a constant `left`.
    LowerBound,
    /// `end(left) <= right` for a constant `right`.
    UpperBound,
}

impl PrecedenceKind {
    /// Whether this kind orders two tasks (as opposed to bounding one).
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            PrecedenceKind::Lax | PrecedenceKind::Tight | PrecedenceKind::Conditional
        )
    }
}

/// Canonical precedence record.
///
/// Ordering kinds hold tasks on both sides. `LowerBound` holds
/// `Value(bound)` left and the task right; `UpperBound` holds the task
/// left and `Value(bound)` right. Bounds carry `offset == 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Precedence {
    pub left: Operand,
    pub right: Operand,
    pub offset: i64,
    pub kind: PrecedenceKind,
}

impl Precedence {
    fn ordering(
        left: impl Into<TaskRef>,
        right: impl Into<TaskRef>,
        offset: i64,
        kind: PrecedenceKind,
    ) -> Self {
        Self {
            left: Operand::Task(left.into()),
            right: Operand::Task(right.into()),
            offset,
            kind,
        }
    }

    /// `left + offset < right`.
    pub fn lax(left: impl Into<TaskRef>, right: impl Into<TaskRef>, offset: i64) -> Self {
        Self::ordering(left, right, offset, PrecedenceKind::Lax)
    }

    /// `left + offset <= right`.
    pub fn tight(left: impl Into<TaskRef>, right: impl Into<TaskRef>, offset: i64) -> Self {
        Self::ordering(left, right, offset, PrecedenceKind::Tight)
    }

    /// `left + offset << right`.
    pub fn conditional(left: impl Into<TaskRef>, right: impl Into<TaskRef>, offset: i64) -> Self {
        Self::ordering(left, right, offset, PrecedenceKind::Conditional)
    }

    /// Task starts at or after `bound`.
    pub fn lower_bound(task: impl Into<TaskRef>, bound: i64) -> Self {
        Self {
            left: Operand::Value(bound),
            right: Operand::Task(task.into()),
            offset: 0,
            kind: PrecedenceKind::LowerBound,
        }
    }

    /// Task ends at or before `bound`.
    pub fn upper_bound(task: impl Into<TaskRef>, bound: i64) -> Self {
        Self {
            left: Operand::Task(task.into()),
            right: Operand::Value(bound),
            offset: 0,
            kind: PrecedenceKind::UpperBound,
        }
    }

    pub fn left_task(&self) -> Option<&str> {
        self.left.task_id()
    }

    pub fn right_task(&self) -> Option<&str> {
        self.right.task_id()
    }

    /// The single bounded task of a `LowerBound`/`UpperBound`.
    pub fn bounded_task(&self) -> Option<&str> {
        match self.kind {
            PrecedenceKind::LowerBound => self.right_task(),
            PrecedenceKind::UpperBound => self.left_task(),
            _ => None,
        }
    }

    /// The constant of a `LowerBound`/`UpperBound`.
    pub fn bound(&self) -> Option<i64> {
        match self.kind {
            PrecedenceKind::LowerBound => self.left.value(),
            PrecedenceKind::UpperBound => self.right.value(),
            _ => None,
        }
    }

    /// Whether the operands match the kind's expected shape.
    pub fn is_well_formed(&self) -> bool {
        match self.kind {
            PrecedenceKind::Lax | PrecedenceKind::Tight | PrecedenceKind::Conditional => {
                self.left_task().is_some() && self.right_task().is_some()
            }
            PrecedenceKind::LowerBound => {
                self.left.value().is_some() && self.right_task().is_some() && self.offset == 0
            }
            PrecedenceKind::UpperBound => {
                self.left_task().is_some() && self.right.value().is_some() && self.offset == 0
            }
        }
    }

    pub(crate) fn task_refs_mut(&mut self) -> impl Iterator<Item = &mut TaskRef> {
        [&mut self.left, &mut self.right]
            .into_iter()
            .filter_map(|op| match op {
                Operand::Task(t) => Some(t),
                Operand::Value(_) => None,
            })
    }
}

impl fmt::Display for Precedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |op: &Operand| match op {
            Operand::Task(t) => t.id().to_string(),
            Operand::Value(v) => v.to_string(),
        };
        match self.kind {
            PrecedenceKind::LowerBound => {
                write!(f, "start({}) >= {}", side(&self.right), side(&self.left))
            }
            PrecedenceKind::UpperBound => {
                write!(f, "end({}) <= {}", side(&self.left), side(&self.right))
            }
            kind => {
                let op = match kind {
                    PrecedenceKind::Lax => "<",
                    PrecedenceKind::Tight => "<=",
                    _ => "<<",
                };
                write!(f, "{}", side(&self.left))?;
                match self.offset {
                    0 => {}
                    k if k > 0 => write!(f, " + {k}")?,
                    k => write!(f, " - {}", -k)?,
                }
                write!(f, " {op} {}", side(&self.right))
            }
        }
    }
}

/// Co-scheduled tasks paired with their candidate resources.
///
/// Each task takes exactly one resource from `candidates`, all tasks of
/// the requirement take the *same* one, and each occupies `units` of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequirement {
    pub tasks: Vec<TaskRef>,
    pub candidates: Vec<ResourceRef>,
    /// Concurrent units occupied on the chosen resource (>= 1).
    pub units: i64,
}

impl ResourceRequirement {
    /// Creates a requirement of one unit.
    pub fn new<T, R>(
        tasks: impl IntoIterator<Item = T>,
        candidates: impl IntoIterator<Item = R>,
    ) -> Self
    where
        T: Into<TaskRef>,
        R: Into<ResourceRef>,
    {
        Self {
            tasks: tasks.into_iter().map(Into::into).collect(),
            candidates: candidates.into_iter().map(Into::into).collect(),
            units: 1,
        }
    }

    /// Sets the number of concurrent units.
    pub fn with_units(mut self, units: i64) -> Self {
        self.units = units;
        self
    }

    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(TaskRef::id)
    }

    pub fn candidate_ids(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(ResourceRef::id)
    }

    pub fn involves_task(&self, task: &str) -> bool {
        self.task_ids().any(|t| t == task)
    }

    pub fn offers_resource(&self, resource: &str) -> bool {
        self.candidate_ids().any(|r| r == resource)
    }
}

impl fmt::Display for ResourceRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tasks: Vec<&str> = self.task_ids().collect();
        let candidates: Vec<&str> = self.candidate_ids().collect();
        write!(f, "{} -> {}", tasks.join(" + "), candidates.join("|"))?;
        if self.units != 1 {
            write!(f, " x{}", self.units)?;
        }
        Ok(())
    }
}

/// Aggregation applied to a capacity slice's per-period loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SliceKind {
    /// Sum of per-period loads over the window.
    Sum,
    /// Maximum per-period load in the window.
    Max,
    /// Total variation: summed absolute change between consecutive periods.
    Diff,
    /// Summed positive changes only.
    DiffIncreasing,
    /// Summed negative changes only (as a positive magnitude).
    DiffDecreasing,
}

impl fmt::Display for SliceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SliceKind::Sum => "sum",
            SliceKind::Max => "max",
            SliceKind::Diff => "diff",
            SliceKind::DiffIncreasing => "diff_up",
            SliceKind::DiffDecreasing => "diff_down",
        })
    }
}

/// Direction of a capacity slice bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapacitySense {
    AtMost,
    AtLeast,
}

/// Windowed aggregate bound over a resource's parameter load.
///
/// "The `kind` aggregate of parameter `parameter`, contributed by tasks
/// occupying `resource` during `[start, end)`, is `sense` `bound`."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacitySlice {
    pub resource: String,
    pub parameter: String,
    pub start: i64,
    pub end: i64,
    pub kind: SliceKind,
    pub sense: CapacitySense,
    pub bound: f64,
}

impl CapacitySlice {
    /// Creates an unbounded-window `Sum ≤ 0` slice; refine with the builders.
    pub fn new(resource: impl Into<String>, parameter: impl Into<String>, kind: SliceKind) -> Self {
        Self {
            resource: resource.into(),
            parameter: parameter.into(),
            start: 0,
            end: 0,
            kind,
            sense: CapacitySense::AtMost,
            bound: 0.0,
        }
    }

    /// Sets the half-open window `[start, end)`.
    pub fn with_window(mut self, start: i64, end: i64) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn at_most(mut self, bound: f64) -> Self {
        self.sense = CapacitySense::AtMost;
        self.bound = bound;
        self
    }

    pub fn at_least(mut self, bound: f64) -> Self {
        self.sense = CapacitySense::AtLeast;
        self.bound = bound;
        self
    }

    /// Whether an aggregate value respects the bound (1e-6 tolerance).
    pub fn is_satisfied_by(&self, value: f64) -> bool {
        match self.sense {
            CapacitySense::AtMost => value <= self.bound + 1e-6,
            CapacitySense::AtLeast => value >= self.bound - 1e-6,
        }
    }
}

impl fmt::Display for CapacitySlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.sense {
            CapacitySense::AtMost => "<=",
            CapacitySense::AtLeast => ">=",
        };
        write!(
            f,
            "{}['{}'].{}[{}:{}] {} {}",
            self.resource, self.parameter, self.kind, self.start, self.end, op, self.bound
        )
    }
}

/// Any constraint a scenario accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    Precedence(Precedence),
    Requirement(ResourceRequirement),
    Capacity(CapacitySlice),
}

impl From<Precedence> for Constraint {
    fn from(p: Precedence) -> Self {
        Constraint::Precedence(p)
    }
}

impl From<ResourceRequirement> for Constraint {
    fn from(r: ResourceRequirement) -> Self {
        Constraint::Requirement(r)
    }
}

impl From<CapacitySlice> for Constraint {
    fn from(c: CapacitySlice) -> Self {
        Constraint::Capacity(c)
    }
}
