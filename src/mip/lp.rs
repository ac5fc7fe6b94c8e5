//! CPLEX-LP text rendering.

use std::fmt::Write;

use super::{LinearExpr, MipModel, RowSense, VarId, VarKind};

/// Replaces characters LP readers reject. Brackets become parentheses.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '[' => '(',
            ']' => ')',
            c if c.is_ascii_alphanumeric() => c,
            '_' | '.' | '(' | ')' | ',' | '!' | '"' | '#' | '$' | '%' | '&' | '{' | '}' | '~'
            | '\'' | ';' | '?' | '@' => c,
            _ => '_',
        })
        .collect()
}

fn format_terms(model: &MipModel, terms: &[(VarId, f64)]) -> String {
    if terms.is_empty() {
        return "0".to_string();
    }
    let mut out = String::new();
    for (i, &(v, c)) in terms.iter().enumerate() {
        let name = sanitize(&model.variable(v).name);
        let sign = if c < 0.0 { "-" } else { "+" };
        let mag = c.abs();
        if i == 0 {
            if c < 0.0 {
                out.push_str("- ");
            }
        } else {
            let _ = write!(out, " {sign} ");
        }
        if mag == 1.0 {
            out.push_str(&name);
        } else {
            let _ = write!(out, "{mag} {name}");
        }
    }
    out
}

fn format_bound(v: f64) -> String {
    if v == f64::INFINITY {
        "+inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        v.to_string()
    }
}

impl MipModel {
    /// Renders the model in CPLEX-LP format.
    ///
    /// The objective constant is emitted as a comment; it does not affect
    /// the optimal assignment.
    pub fn to_lp_string(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\\ Model: {}", self.name());
        let objective: &LinearExpr = self.objective();
        if objective.constant != 0.0 {
            let _ = writeln!(out, "\\ Objective constant: {}", objective.constant);
        }
        out.push_str("Minimize\n");
        let _ = writeln!(out, " obj: {}", format_terms(self, &objective.terms));

        out.push_str("Subject To\n");
        for row in self.rows() {
            let op = match row.sense {
                RowSense::Le => "<=",
                RowSense::Ge => ">=",
                RowSense::Eq => "=",
            };
            let _ = writeln!(
                out,
                " {}: {} {op} {}",
                sanitize(&row.name),
                format_terms(self, &row.terms),
                row.rhs
            );
        }

        out.push_str("Bounds\n");
        for v in self.variables() {
            if v.kind == VarKind::Binary {
                continue;
            }
            let name = sanitize(&v.name);
            if v.lower == f64::NEG_INFINITY && v.upper == f64::INFINITY {
                let _ = writeln!(out, " {name} free");
            } else {
                let _ = writeln!(
                    out,
                    " {} <= {name} <= {}",
                    format_bound(v.lower),
                    format_bound(v.upper)
                );
            }
        }

        let generals: Vec<String> = self
            .variables()
            .iter()
            .filter(|v| v.kind == VarKind::Integer)
            .map(|v| sanitize(&v.name))
            .collect();
        if !generals.is_empty() {
            out.push_str("General\n");
            for name in generals {
                let _ = writeln!(out, " {name}");
            }
        }

        let binaries: Vec<String> = self
            .variables()
            .iter()
            .filter(|v| v.kind == VarKind::Binary)
            .map(|v| sanitize(&v.name))
            .collect();
        if !binaries.is_empty() {
            out.push_str("Binary\n");
            for name in binaries {
                let _ = writeln!(out, " {name}");
            }
        }
        out.push_str("End\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("x[T1,3]"), "x(T1,3)");
        assert_eq!(sanitize("a b-c"), "a_b_c");
    }

    #[test]
    fn test_lp_output() {
        let mut m = MipModel::new("demo");
        let s = m.continuous("start[T1]", 0.0, 5.0);
        let y = m.binary("assign[T1,R1]");
        let n = m.integer("x[G,0]", 0.0, 3.0);
        m.le(
            "cap[R1,0]",
            LinearExpr::term(s, 1.0).with_term(y, -2.0).with_term(n, 1.0),
            4.0,
        );
        m.add_objective_term(s, 1.0);
        m.add_objective_constant(2.0);
        m.finalize();

        let lp = m.to_lp_string();
        let expected = "\
\\ Model: demo
\\ Objective constant: 2
Minimize
 obj: start(T1)
Subject To
 cap(R1,0): start(T1) - 2 assign(T1,R1) + x(G,0) <= 4
Bounds
 0 <= start(T1) <= 5
 0 <= x(G,0) <= 3
General
 x(G,0)
Binary
 assign(T1,R1)
End
";
        assert_eq!(lp, expected);
    }

    #[test]
    fn test_empty_objective_and_negative_lead() {
        let mut m = MipModel::new("neg");
        let a = m.continuous("a", f64::NEG_INFINITY, f64::INFINITY);
        m.ge("r", LinearExpr::term(a, -1.0), -3.0);
        let lp = m.to_lp_string();
        assert!(lp.contains(" obj: 0\n"));
        assert!(lp.contains(" r: - a >= -3\n"));
        assert!(lp.contains(" a free\n"));
    }
}
