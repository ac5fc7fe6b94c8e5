//! Reduction of comparisons to canonical precedence records.

use super::expr::{Comparator, Comparison};
use crate::error::{Result, ScheduleError};
use crate::models::{Precedence, PrecedenceKind, TaskRef};

/// Normalizes `lhs comparator rhs` into a [`Precedence`].
///
/// The difference `lhs - rhs` must contain at most one task with
/// coefficient `+1` and at most one with `-1`:
///
/// | positive | negative | result |
/// |----------|----------|--------|
/// | `A` | `B` | `A + offset ⋈ B` (kind from the comparator) |
/// | `A` | — | `UpperBound`: `end(A) <= -offset` (lax only) |
/// | — | `B` | `LowerBound`: `start(B) >= offset` (lax only) |
///
/// where `offset` is `lhs.constant - rhs.constant`. Every other shape
/// fails with [`ScheduleError::InvalidPrecedenceShape`].
pub fn normalize(comparison: Comparison) -> Result<Precedence> {
    let Comparison {
        lhs,
        comparator,
        rhs,
    } = comparison;
    let diff = lhs.difference(rhs).merged();
    let offset = diff.constant_term();

    let mut positive: Option<TaskRef> = None;
    let mut negative: Option<TaskRef> = None;
    for (task, coef) in diff.terms() {
        let slot = match *coef {
            1 => &mut positive,
            -1 => &mut negative,
            c => {
                return Err(ScheduleError::InvalidPrecedenceShape(format!(
                    "task '{}' has coefficient {c}; only +1/-1 are allowed",
                    task.id()
                )))
            }
        };
        if let Some(prev) = slot {
            return Err(ScheduleError::InvalidPrecedenceShape(format!(
                "tasks '{}' and '{}' share the same side",
                prev.id(),
                task.id()
            )));
        }
        *slot = Some(task.clone());
    }

    match (positive, negative) {
        (Some(left), Some(right)) => {
            let kind = match comparator {
                Comparator::Lax => PrecedenceKind::Lax,
                Comparator::Tight => PrecedenceKind::Tight,
                Comparator::Conditional => PrecedenceKind::Conditional,
            };
            let mut p = Precedence::lax(left, right, offset);
            p.kind = kind;
            Ok(p)
        }
        (Some(task), None) if comparator == Comparator::Lax => {
            Ok(Precedence::upper_bound(task, -offset))
        }
        (None, Some(task)) if comparator == Comparator::Lax => {
            Ok(Precedence::lower_bound(task, offset))
        }
        (Some(_), None) | (None, Some(_)) => Err(ScheduleError::InvalidPrecedenceShape(format!(
            "{comparator:?} comparison against a bare number"
        ))),
        (None, None) => Err(ScheduleError::InvalidPrecedenceShape(
            "comparison mentions no task".to_string(),
        )),
    }
}
