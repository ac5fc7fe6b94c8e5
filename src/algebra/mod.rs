//! Constraint algebra.
//!
//! Two ways of stating constraints:
//!
//! - **Combinators** build canonical records directly:
//!   `precedes("A", "B", 3)` is `A + 3 < B`.
//! - **Comparisons** over [`AffineExpr`] trees go through [`normalize`],
//!   which accepts exactly the shapes that reduce to one precedence or
//!   one bound and rejects the rest.
//!
//! # Example
//! ```
//! use u_schedule_mip::algebra::{normalize, precedes, AffineExpr, Comparison};
//!
//! // A + 5 < B + 2  is  A + 3 < B
//! let cmp = Comparison::lax(AffineExpr::task("A").plus(5), AffineExpr::task("B").plus(2));
//! assert_eq!(normalize(cmp).unwrap(), precedes("A", "B", 3));
//! ```

mod expr;
mod normalize;

pub use expr::{AffineExpr, Comparator, Comparison};
pub use normalize::normalize;

use crate::models::{Precedence, ResourceRef, ResourceRequirement, TaskRef};

/// `a + offset < b`: `b` starts no earlier than `offset` after `a` ends.
pub fn precedes(a: impl Into<TaskRef>, b: impl Into<TaskRef>, offset: i64) -> Precedence {
    Precedence::lax(a, b, offset)
}

/// `a + offset <= b`: `b` starts exactly `offset` after `a` ends.
pub fn tightly_precedes(a: impl Into<TaskRef>, b: impl Into<TaskRef>, offset: i64) -> Precedence {
    Precedence::tight(a, b, offset)
}

/// `a + offset << b`: like [`precedes`], enforced only when both tasks
/// end up on a common resource.
pub fn precedes_on_shared_resource(
    a: impl Into<TaskRef>,
    b: impl Into<TaskRef>,
    offset: i64,
) -> Precedence {
    Precedence::conditional(a, b, offset)
}

/// The task starts at or after `period`.
pub fn starts_after(task: impl Into<TaskRef>, period: i64) -> Precedence {
    Precedence::lower_bound(task, period)
}

/// The task ends at or before `period`.
pub fn ends_before(task: impl Into<TaskRef>, period: i64) -> Precedence {
    Precedence::upper_bound(task, period)
}

/// The task needs one of `candidates`.
pub fn requires<R: Into<ResourceRef>>(
    task: impl Into<TaskRef>,
    candidates: impl IntoIterator<Item = R>,
) -> ResourceRequirement {
    ResourceRequirement::new([task.into()], candidates)
}

/// All `tasks` need the same one of `candidates`.
pub fn together<T, R>(
    tasks: impl IntoIterator<Item = T>,
    candidates: impl IntoIterator<Item = R>,
) -> ResourceRequirement
where
    T: Into<TaskRef>,
    R: Into<ResourceRef>,
{
    ResourceRequirement::new(tasks, candidates)
}
