use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::value::Value;

/// Comparison operators of the filter language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Operator as written in a DynamoDB condition expression.
    pub fn as_expression(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    /// Operators DynamoDB accepts on a sort key inside a key condition.
    pub fn is_key_condition_op(self) -> bool {
        !matches!(self, CompareOp::Ne)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_expression())
    }
}

/// A parameter reference: `?N` (1-based) or `:name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
    Positional(usize),
    Named(String),
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placeholder::Positional(index) => write!(f, "?{index}"),
            Placeholder::Named(name) => write!(f, ":{name}"),
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Placeholder(Placeholder),
    Literal(Value),
}

/// `field op operand`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub field: String,
    pub op: CompareOp,
    pub operand: Operand,
}

impl Comparison {
    pub fn new(field: impl Into<String>, op: CompareOp, operand: Operand) -> Self {
        Self {
            field: field.into(),
            op,
            operand,
        }
    }

    /// The literal value, once placeholders have been bound.
    pub fn literal(&self) -> Option<&Value> {
        match &self.operand {
            Operand::Literal(value) => Some(value),
            Operand::Placeholder(_) => None,
        }
    }
}

/// Parsed filter predicate.
///
/// `And`/`Or` nodes are kept flat: a child is never a node of the same kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Compare(Comparison),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Conjunction of `parts`, flattening nested `And` nodes.
    pub fn and(parts: Vec<Predicate>) -> Predicate {
        Self::join(parts, true)
    }

    /// Disjunction of `parts`, flattening nested `Or` nodes.
    pub fn or(parts: Vec<Predicate>) -> Predicate {
        Self::join(parts, false)
    }

    fn join(parts: Vec<Predicate>, conjunction: bool) -> Predicate {
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Predicate::And(children) if conjunction => flat.extend(children),
                Predicate::Or(children) if !conjunction => flat.extend(children),
                other => flat.push(other),
            }
        }

        if flat.len() == 1 {
            return flat.remove(0);
        }
        if conjunction {
            Predicate::And(flat)
        } else {
            Predicate::Or(flat)
        }
    }

    /// All comparisons in the tree, depth first.
    pub fn comparisons(&self) -> Vec<&Comparison> {
        let mut out = Vec::new();
        self.collect_comparisons(&mut out);
        out
    }

    fn collect_comparisons<'a>(&'a self, out: &mut Vec<&'a Comparison>) {
        match self {
            Predicate::Compare(comparison) => out.push(comparison),
            Predicate::And(children) | Predicate::Or(children) => {
                for child in children {
                    child.collect_comparisons(out);
                }
            }
        }
    }

    /// Placeholders referenced anywhere in the tree.
    pub fn placeholders(&self) -> BTreeSet<Placeholder> {
        self.comparisons()
            .into_iter()
            .filter_map(|c| match &c.operand {
                Operand::Placeholder(p) => Some(p.clone()),
                Operand::Literal(_) => None,
            })
            .collect()
    }

    /// Returns a copy with every operand rewritten by `f`.
    pub fn try_map_operands<E>(
        &self,
        f: &mut impl FnMut(&Operand) -> Result<Operand, E>,
    ) -> Result<Predicate, E> {
        Ok(match self {
            Predicate::Compare(c) => Predicate::Compare(Comparison {
                field: c.field.clone(),
                op: c.op,
                operand: f(&c.operand)?,
            }),
            Predicate::And(children) => Predicate::And(
                children
                    .iter()
                    .map(|child| child.try_map_operands(f))
                    .collect::<Result<_, _>>()?,
            ),
            Predicate::Or(children) => Predicate::Or(
                children
                    .iter()
                    .map(|child| child.try_map_operands(f))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare(c) => match &c.operand {
                Operand::Placeholder(p) => write!(f, "{} {} {}", c.field, c.op, p),
                Operand::Literal(v) => write!(f, "{} {} {}", c.field, c.op, v),
            },
            Predicate::And(children) | Predicate::Or(children) => {
                let sep = if matches!(self, Predicate::And(_)) {
                    " AND "
                } else {
                    " OR "
                };
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    match child {
                        Predicate::Compare(_) => write!(f, "{child}")?,
                        _ => write!(f, "({child})")?,
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(field: &str, index: usize) -> Predicate {
        Predicate::Compare(Comparison::new(
            field,
            CompareOp::Eq,
            Operand::Placeholder(Placeholder::Positional(index)),
        ))
    }

    #[test]
    fn test_and_flattens_nested_conjunctions() {
        let nested = Predicate::and(vec![eq("a", 1), Predicate::and(vec![eq("b", 2), eq("c", 3)])]);
        match nested {
            Predicate::And(children) => assert_eq!(children.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn test_single_part_collapses() {
        assert_eq!(Predicate::or(vec![eq("a", 1)]), eq("a", 1));
    }

    #[test]
    fn test_placeholders_are_collected() {
        let predicate = Predicate::or(vec![eq("a", 2), Predicate::and(vec![eq("b", 1), eq("c", 2)])]);
        let placeholders: Vec<_> = predicate.placeholders().into_iter().collect();
        assert_eq!(
            placeholders,
            vec![Placeholder::Positional(1), Placeholder::Positional(2)]
        );
    }

    #[test]
    fn test_display_parenthesises_nested_groups() {
        let predicate = Predicate::or(vec![eq("a", 1), Predicate::and(vec![eq("b", 2), eq("c", 3)])]);
        assert_eq!(predicate.to_string(), "a = ?1 OR (b = ?2 AND c = ?3)");
    }
}
