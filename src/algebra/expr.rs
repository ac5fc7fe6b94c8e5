//! Affine expression tree over tasks.

use serde::{Deserialize, Serialize};

use crate::models::{Task, TaskRef};

/// Integer affine combination of tasks: `Σ coef·task + constant`.
///
/// A task term stands for its start when it ends up on the later side of
/// a comparison and for its end on the earlier side; the normalizer
/// resolves which.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AffineExpr {
    terms: Vec<(TaskRef, i64)>,
    constant: i64,
}

impl AffineExpr {
    /// A single task with coefficient 1.
    pub fn task(task: impl Into<TaskRef>) -> Self {
        Self {
            terms: vec![(task.into(), 1)],
            constant: 0,
        }
    }

    /// A bare constant.
    pub fn constant(value: i64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// Adds a task term with the given coefficient.
    pub fn with_term(mut self, task: impl Into<TaskRef>, coefficient: i64) -> Self {
        self.terms.push((task.into(), coefficient));
        self
    }

    /// Adds a constant (lead/lag).
    pub fn plus(mut self, value: i64) -> Self {
        self.constant += value;
        self
    }

    pub fn minus(self, value: i64) -> Self {
        self.plus(-value)
    }

    /// `self + other`.
    pub fn sum(mut self, other: AffineExpr) -> Self {
        self.terms.extend(other.terms);
        self.constant += other.constant;
        self
    }

    /// `self - other`.
    pub fn difference(self, other: AffineExpr) -> Self {
        self.sum(other.scaled(-1))
    }

    /// Multiplies every coefficient and the constant by `factor`.
    pub fn scaled(mut self, factor: i64) -> Self {
        for (_, c) in &mut self.terms {
            *c *= factor;
        }
        self.constant *= factor;
        self
    }

    pub fn terms(&self) -> &[(TaskRef, i64)] {
        &self.terms
    }

    pub fn constant_term(&self) -> i64 {
        self.constant
    }

    /// Merges like terms (first reference kept) and drops zero coefficients.
    pub fn merged(self) -> Self {
        let mut merged: Vec<(TaskRef, i64)> = Vec::with_capacity(self.terms.len());
        for (task, coef) in self.terms {
            match merged.iter_mut().find(|(t, _)| t.id() == task.id()) {
                Some((existing, c)) => {
                    *c += coef;
                    if matches!(existing, TaskRef::Named(_)) && matches!(task, TaskRef::Entity(_)) {
                        *existing = task;
                    }
                }
                None => merged.push((task, coef)),
            }
        }
        merged.retain(|(_, c)| *c != 0);
        Self {
            terms: merged,
            constant: self.constant,
        }
    }
}

impl From<i64> for AffineExpr {
    fn from(value: i64) -> Self {
        AffineExpr::constant(value)
    }
}

impl From<&str> for AffineExpr {
    fn from(id: &str) -> Self {
        AffineExpr::task(id)
    }
}

impl From<String> for AffineExpr {
    fn from(id: String) -> Self {
        AffineExpr::task(id)
    }
}

impl From<TaskRef> for AffineExpr {
    fn from(task: TaskRef) -> Self {
        AffineExpr::task(task)
    }
}

impl From<Task> for AffineExpr {
    fn from(task: Task) -> Self {
        AffineExpr::task(task)
    }
}

impl From<&Task> for AffineExpr {
    fn from(task: &Task) -> Self {
        AffineExpr::task(task)
    }
}

/// Comparator between two affine expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    /// `<`: lax precedence, or a one-sided bound against a number.
    Lax,
    /// `<=`: tight precedence.
    Tight,
    /// `<<`: precedence conditional on a shared resource.
    Conditional,
}

/// `lhs comparator rhs`, the input of the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub lhs: AffineExpr,
    pub comparator: Comparator,
    pub rhs: AffineExpr,
}

impl Comparison {
    pub fn new(lhs: impl Into<AffineExpr>, comparator: Comparator, rhs: impl Into<AffineExpr>) -> Self {
        Self {
            lhs: lhs.into(),
            comparator,
            rhs: rhs.into(),
        }
    }

    pub fn lax(lhs: impl Into<AffineExpr>, rhs: impl Into<AffineExpr>) -> Self {
        Self::new(lhs, Comparator::Lax, rhs)
    }

    pub fn tight(lhs: impl Into<AffineExpr>, rhs: impl Into<AffineExpr>) -> Self {
        Self::new(lhs, Comparator::Tight, rhs)
    }

    pub fn conditional(lhs: impl Into<AffineExpr>, rhs: impl Into<AffineExpr>) -> Self {
        Self::new(lhs, Comparator::Conditional, rhs)
    }
}
