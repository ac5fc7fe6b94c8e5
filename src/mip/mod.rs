//! Mixed-integer model: the data contract handed to a solver backend.
//!
//! A [`MipModel`] is a flat list of variable declarations (bounds and
//! integrality), a flat list of linear rows (coefficients, sense,
//! right-hand side) and a linear objective, always minimized. Variables
//! are addressed by [`VarId`] while building and by unique name at the
//! solver boundary.
//!
//! # Reference
//! Wolsey (1998), "Integer Programming", Ch. 1

mod lp;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Index of a variable within its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub usize);

/// Variable domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarKind {
    Continuous,
    Integer,
    /// Integer in `[0, 1]`.
    Binary,
}

impl VarKind {
    pub fn is_integral(self) -> bool {
        !matches!(self, VarKind::Continuous)
    }
}

/// A variable declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub kind: VarKind,
}

/// `Σ coef·var + constant`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// `coef·var`.
    pub fn term(var: VarId, coef: f64) -> Self {
        Self {
            terms: vec![(var, coef)],
            constant: 0.0,
        }
    }

    pub fn with_term(mut self, var: VarId, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    pub fn with_constant(mut self, value: f64) -> Self {
        self.constant += value;
        self
    }

    pub fn add_term(&mut self, var: VarId, coef: f64) {
        self.terms.push((var, coef));
    }

    /// `self += scale·other`.
    pub fn add_scaled(&mut self, other: &LinearExpr, scale: f64) {
        self.terms
            .extend(other.terms.iter().map(|&(v, c)| (v, c * scale)));
        self.constant += other.constant * scale;
    }

    /// Merges duplicate variables, drops zero coefficients, sorts by id.
    pub fn compact(mut self) -> Self {
        self.terms.sort_by_key(|(v, _)| *v);
        let mut merged: Vec<(VarId, f64)> = Vec::with_capacity(self.terms.len());
        for (v, c) in self.terms {
            match merged.last_mut() {
                Some((last, acc)) if *last == v => *acc += c,
                _ => merged.push((v, c)),
            }
        }
        merged.retain(|(_, c)| *c != 0.0);
        self.terms = merged;
        self
    }

    /// Value under a full assignment indexed by [`VarId`].
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.constant
            + self
                .terms
                .iter()
                .map(|&(v, c)| c * values.get(v.0).copied().unwrap_or(0.0))
                .sum::<f64>()
    }

    pub fn is_constant(&self) -> bool {
        self.terms.iter().all(|(_, c)| *c == 0.0)
    }
}

/// Row comparison sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowSense {
    Le,
    Ge,
    Eq,
}

/// A linear row `Σ coef·var sense rhs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub sense: RowSense,
    pub rhs: f64,
}

impl Row {
    /// Builds `expr sense rhs`, moving the expression's constant to the rhs.
    pub fn new(name: impl Into<String>, expr: LinearExpr, sense: RowSense, rhs: f64) -> Self {
        let expr = expr.compact();
        Self {
            name: name.into(),
            terms: expr.terms,
            sense,
            rhs: rhs - expr.constant,
        }
    }

    /// Left-hand side value under an assignment indexed by [`VarId`].
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(v, c)| c * values.get(v.0).copied().unwrap_or(0.0))
            .sum()
    }

    /// Whether the row holds within `tolerance`.
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.activity(values);
        match self.sense {
            RowSense::Le => lhs <= self.rhs + tolerance,
            RowSense::Ge => lhs >= self.rhs - tolerance,
            RowSense::Eq => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

/// A minimization MIP.
#[derive(Debug, Clone, Default)]
pub struct MipModel {
    name: String,
    variables: Vec<Variable>,
    rows: Vec<Row>,
    objective: LinearExpr,
    by_name: HashMap<String, VarId>,
}

impl MipModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declares a variable. Binary bounds are clamped to `[0, 1]`.
    ///
    /// Re-declaring an existing name returns the existing id.
    pub fn add_var(&mut self, name: impl Into<String>, lower: f64, upper: f64, kind: VarKind) -> VarId {
        let name = name.into();
        if let Some(&id) = self.by_name.get(&name) {
            return id;
        }
        let (lower, upper) = match kind {
            VarKind::Binary => (lower.max(0.0), upper.min(1.0)),
            _ => (lower, upper),
        };
        let id = VarId(self.variables.len());
        self.by_name.insert(name.clone(), id);
        self.variables.push(Variable {
            name,
            lower,
            upper,
            kind,
        });
        id
    }

    pub fn continuous(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.add_var(name, lower, upper, VarKind::Continuous)
    }

    pub fn integer(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.add_var(name, lower, upper, VarKind::Integer)
    }

    pub fn binary(&mut self, name: impl Into<String>) -> VarId {
        self.add_var(name, 0.0, 1.0, VarKind::Binary)
    }

    /// Adds `expr sense rhs`; the expression's constant moves to the rhs.
    pub fn add_row(&mut self, name: impl Into<String>, expr: LinearExpr, sense: RowSense, rhs: f64) {
        self.rows.push(Row::new(name, expr, sense, rhs));
    }

    pub fn le(&mut self, name: impl Into<String>, expr: LinearExpr, rhs: f64) {
        self.add_row(name, expr, RowSense::Le, rhs);
    }

    pub fn ge(&mut self, name: impl Into<String>, expr: LinearExpr, rhs: f64) {
        self.add_row(name, expr, RowSense::Ge, rhs);
    }

    pub fn eq(&mut self, name: impl Into<String>, expr: LinearExpr, rhs: f64) {
        self.add_row(name, expr, RowSense::Eq, rhs);
    }

    /// Appends already-built rows.
    pub fn extend_rows(&mut self, rows: impl IntoIterator<Item = Row>) {
        self.rows.extend(rows);
    }

    /// Adds `expr` to the objective.
    pub fn add_objective(&mut self, expr: &LinearExpr) {
        self.objective.add_scaled(expr, 1.0);
    }

    /// Adds `coef·var` to the objective.
    pub fn add_objective_term(&mut self, var: VarId, coef: f64) {
        if coef != 0.0 {
            self.objective.add_term(var, coef);
        }
    }

    /// Adds a constant to the objective.
    pub fn add_objective_constant(&mut self, value: f64) {
        self.objective.constant += value;
    }

    /// Compacts the objective in place.
    pub fn finalize(&mut self) {
        self.objective = std::mem::take(&mut self.objective).compact();
    }

    pub fn var(&self, name: &str) -> Option<VarId> {
        self.by_name.get(name).copied()
    }

    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn num_vars(&self) -> usize {
        self.variables.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of integer and binary variables.
    pub fn num_integral(&self) -> usize {
        self.variables.iter().filter(|v| v.kind.is_integral()).count()
    }

    /// Converts a name-keyed assignment into a dense vector (missing = 0).
    pub fn dense_values(&self, values: &HashMap<String, f64>) -> Vec<f64> {
        self.variables
            .iter()
            .map(|v| values.get(&v.name).copied().unwrap_or(0.0))
            .collect()
    }

    /// Whether a dense assignment satisfies bounds, integrality and rows.
    pub fn is_feasible(&self, values: &[f64], tolerance: f64) -> bool {
        let bounds_ok = self.variables.iter().zip(values).all(|(v, &x)| {
            x >= v.lower - tolerance
                && x <= v.upper + tolerance
                && (!v.kind.is_integral() || (x - x.round()).abs() <= tolerance)
        });
        bounds_ok && self.rows.iter().all(|r| r.is_satisfied(values, tolerance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_var_and_lookup() {
        let mut m = MipModel::new("m");
        let x = m.continuous("x", 0.0, 10.0);
        let y = m.binary("y");
        let z = m.integer("z", -2.0, 5.0);
        assert_eq!(m.var("y"), Some(y));
        assert_eq!(m.var("nope"), None);
        assert_eq!(m.variable(x).upper, 10.0);
        assert_eq!(m.variable(z).kind, VarKind::Integer);
        assert_eq!(m.num_vars(), 3);
        assert_eq!(m.num_integral(), 2);
        // Redeclaration is idempotent.
        assert_eq!(m.binary("y"), y);
        assert_eq!(m.num_vars(), 3);
    }

    #[test]
    fn test_binary_bounds_clamped() {
        let mut m = MipModel::new("m");
        let b = m.add_var("b", -3.0, 7.0, VarKind::Binary);
        assert_eq!(m.variable(b).lower, 0.0);
        assert_eq!(m.variable(b).upper, 1.0);
    }

    #[test]
    fn test_compact_merges_terms() {
        let e = LinearExpr::term(VarId(2), 1.0)
            .with_term(VarId(0), 3.0)
            .with_term(VarId(2), -1.0)
            .with_term(VarId(0), 1.0)
            .compact();
        assert_eq!(e.terms, vec![(VarId(0), 4.0)]);
    }

    #[test]
    fn test_row_constant_moves_to_rhs() {
        let mut m = MipModel::new("m");
        let x = m.continuous("x", 0.0, 10.0);
        m.le("r", LinearExpr::term(x, 2.0).with_constant(3.0), 7.0);
        let row = &m.rows()[0];
        assert_eq!(row.rhs, 4.0);
        assert!(row.is_satisfied(&[2.0], 1e-9));
        assert!(!row.is_satisfied(&[2.5], 1e-9));
    }

    #[test]
    fn test_feasibility_check() {
        let mut m = MipModel::new("m");
        let x = m.integer("x", 0.0, 3.0);
        let y = m.binary("y");
        m.eq("sum", LinearExpr::term(x, 1.0).with_term(y, 1.0), 3.0);
        assert!(m.is_feasible(&[2.0, 1.0], 1e-6));
        assert!(!m.is_feasible(&[2.5, 0.5], 1e-6));
        assert!(!m.is_feasible(&[3.0, 1.0], 1e-6));
    }

    #[test]
    fn test_objective_and_dense_values() {
        let mut m = MipModel::new("m");
        let x = m.continuous("x", 0.0, 1.0);
        m.add_objective_term(x, 2.0);
        m.add_objective_term(x, 0.0);
        m.add_objective_constant(1.5);
        m.add_objective(&LinearExpr::term(x, 1.0));
        m.finalize();
        assert_eq!(m.objective().terms, vec![(x, 3.0)]);

        let mut values = HashMap::new();
        values.insert("x".to_string(), 0.5);
        let dense = m.dense_values(&values);
        assert!((m.objective().evaluate(&dense) - 3.0).abs() < 1e-12);
    }
}
