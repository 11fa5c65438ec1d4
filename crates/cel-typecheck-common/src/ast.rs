//! The id-tagged expression tree consumed by the checker.
//!
//! Every node carries an `i64` id that is unique within one tree. Annotations
//! produced by checking (types and references) are keyed by these ids.

use crate::CelValue;

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: i64,
    pub kind: ExprKind,
}

/// The variants of an expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Literal constant.
    Const(CelValue),
    /// Identifier reference, possibly dotted after rewriting.
    Ident(String),
    /// Field selection `operand.field`, or the presence test `has(operand.field)`.
    Select {
        operand: Box<Expr>,
        field: String,
        test_only: bool,
    },
    /// Function call, global when `target` is absent.
    Call {
        target: Option<Box<Expr>>,
        function: String,
        args: Vec<Expr>,
    },
    /// List literal `[e1, e2, ...]`.
    List(Vec<Expr>),
    /// Message literal `Name{field: value, ...}`.
    Struct {
        message_name: String,
        fields: Vec<StructField>,
    },
    /// Map literal `{k1: v1, ...}`.
    Map(Vec<MapEntry>),
    /// Comprehension produced by macro expansion.
    Comprehension(Box<Comprehension>),
}

/// A field initializer of a message literal.
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub id: i64,
    pub field: String,
    pub value: Expr,
}

/// An entry of a map literal.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub id: i64,
    pub key: Expr,
    pub value: Expr,
}

/// A fold over a list or map.
///
/// Evaluation binds `accu_var` to `accu_init`, then for each element of
/// `iter_range` binds `iter_var`, stops early when `loop_condition` is false,
/// and rebinds `accu_var` to `loop_step`. The value is `result`.
#[derive(Debug, Clone, PartialEq)]
pub struct Comprehension {
    pub iter_var: String,
    pub iter_range: Expr,
    pub accu_var: String,
    pub accu_init: Expr,
    pub loop_condition: Expr,
    pub loop_step: Expr,
    pub result: Expr,
}

impl Expr {
    pub fn new(id: i64, kind: ExprKind) -> Self {
        Expr { id, kind }
    }

    /// The dotted name this expression spells, if it is a chain of
    /// identifiers joined by non-test selects.
    ///
    /// `a.b.c` yields `Some("a.b.c")`. Anything with a call, a literal or a
    /// presence test in the chain yields `None`.
    pub fn qualified_name(&self) -> Option<String> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name.clone()),
            ExprKind::Select {
                operand,
                field,
                test_only: false,
            } => operand
                .qualified_name()
                .map(|prefix| format!("{}.{}", prefix, field)),
            _ => None,
        }
    }

    /// Visit this node and every descendant in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match &self.kind {
            ExprKind::Const(_) | ExprKind::Ident(_) => {}
            ExprKind::Select { operand, .. } => operand.walk(visit),
            ExprKind::Call { target, args, .. } => {
                if let Some(target) = target {
                    target.walk(visit);
                }
                for arg in args {
                    arg.walk(visit);
                }
            }
            ExprKind::List(elems) => {
                for elem in elems {
                    elem.walk(visit);
                }
            }
            ExprKind::Struct { fields, .. } => {
                for field in fields {
                    field.value.walk(visit);
                }
            }
            ExprKind::Map(entries) => {
                for entry in entries {
                    entry.key.walk(visit);
                    entry.value.walk(visit);
                }
            }
            ExprKind::Comprehension(comp) => {
                comp.iter_range.walk(visit);
                comp.accu_init.walk(visit);
                comp.loop_condition.walk(visit);
                comp.loop_step.walk(visit);
                comp.result.walk(visit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(id: i64, name: &str) -> Expr {
        Expr::new(id, ExprKind::Ident(name.to_string()))
    }

    fn select(id: i64, operand: Expr, field: &str, test_only: bool) -> Expr {
        Expr::new(
            id,
            ExprKind::Select {
                operand: Box::new(operand),
                field: field.to_string(),
                test_only,
            },
        )
    }

    #[test]
    fn qualified_name_of_select_chain() {
        let expr = select(3, select(2, ident(1, "a"), "b", false), "c", false);
        assert_eq!(expr.qualified_name().as_deref(), Some("a.b.c"));
    }

    #[test]
    fn qualified_name_stops_at_presence_test() {
        let expr = select(2, ident(1, "a"), "b", true);
        assert_eq!(expr.qualified_name(), None);
    }

    #[test]
    fn qualified_name_stops_at_call() {
        let call = Expr::new(
            1,
            ExprKind::Call {
                target: None,
                function: "f".to_string(),
                args: vec![],
            },
        );
        assert_eq!(select(2, call, "x", false).qualified_name(), None);
    }

    #[test]
    fn walk_visits_all_nodes() {
        let expr = Expr::new(
            4,
            ExprKind::List(vec![select(2, ident(1, "a"), "b", false), ident(3, "c")]),
        );
        let mut ids = Vec::new();
        expr.walk(&mut |e| ids.push(e.id));
        assert_eq!(ids, vec![4, 2, 1, 3]);
    }
}
