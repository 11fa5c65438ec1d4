//! Construction of id-tagged expression trees without a parser.
//!
//! `ExprFactory` hands out ids in creation order starting at 1, and expands
//! the standard macros into their comprehension form.

use crate::ast::{Comprehension, Expr, ExprKind, MapEntry, StructField};
use crate::CelValue;

/// Accumulator variable name used by the macro expansions.
pub const ACCUMULATOR_VAR: &str = "__result__";

/// Builder of expression nodes with unique ids.
///
/// # Example
/// ```
/// use cel_typecheck_common::{ExprFactory, ExprKind};
///
/// let mut f = ExprFactory::new();
/// let one = f.int(1);
/// let two = f.int(2);
/// let sum = f.global_call("_+_", vec![one, two]);
/// assert_eq!(sum.id, 3);
/// assert!(matches!(sum.kind, ExprKind::Call { .. }));
/// ```
#[derive(Debug)]
pub struct ExprFactory {
    next_id: i64,
}

impl Default for ExprFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ExprFactory {
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    /// The id the next created node will receive.
    pub fn peek_id(&self) -> i64 {
        self.next_id
    }

    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn expr(&mut self, kind: ExprKind) -> Expr {
        Expr::new(self.next_id(), kind)
    }

    // ==================== Literals ====================

    pub fn constant(&mut self, value: CelValue) -> Expr {
        self.expr(ExprKind::Const(value))
    }

    pub fn null(&mut self) -> Expr {
        self.constant(CelValue::Null)
    }

    pub fn bool(&mut self, value: bool) -> Expr {
        self.constant(CelValue::Bool(value))
    }

    pub fn int(&mut self, value: i64) -> Expr {
        self.constant(CelValue::Int(value))
    }

    pub fn uint(&mut self, value: u64) -> Expr {
        self.constant(CelValue::UInt(value))
    }

    pub fn double(&mut self, value: f64) -> Expr {
        self.constant(CelValue::Double(value))
    }

    pub fn string(&mut self, value: impl Into<String>) -> Expr {
        self.constant(CelValue::String(value.into()))
    }

    pub fn bytes(&mut self, value: impl Into<Vec<u8>>) -> Expr {
        self.constant(CelValue::Bytes(value.into()))
    }

    // ==================== Names ====================

    pub fn ident(&mut self, name: impl Into<String>) -> Expr {
        self.expr(ExprKind::Ident(name.into()))
    }

    pub fn select(&mut self, operand: Expr, field: impl Into<String>) -> Expr {
        self.expr(ExprKind::Select {
            operand: Box::new(operand),
            field: field.into(),
            test_only: false,
        })
    }

    /// The `has(operand.field)` macro: a presence-test select.
    pub fn presence_test(&mut self, operand: Expr, field: impl Into<String>) -> Expr {
        self.expr(ExprKind::Select {
            operand: Box::new(operand),
            field: field.into(),
            test_only: true,
        })
    }

    /// Build an identifier or select chain from a dotted name.
    pub fn qualified(&mut self, name: &str) -> Expr {
        let mut parts = name.split('.');
        let first = parts.next().unwrap_or_default();
        let root = self.ident(first);
        parts.fold(root, |operand, field| self.select(operand, field))
    }

    // ==================== Calls ====================

    pub fn global_call(&mut self, function: impl Into<String>, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call {
            target: None,
            function: function.into(),
            args,
        })
    }

    pub fn receiver_call(&mut self, function: impl Into<String>, target: Expr, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call {
            target: Some(Box::new(target)),
            function: function.into(),
            args,
        })
    }

    // ==================== Aggregates ====================

    pub fn list(&mut self, elements: Vec<Expr>) -> Expr {
        self.expr(ExprKind::List(elements))
    }

    pub fn map(&mut self, entries: Vec<(Expr, Expr)>) -> Expr {
        let entries = entries
            .into_iter()
            .map(|(key, value)| MapEntry {
                id: self.next_id(),
                key,
                value,
            })
            .collect();
        self.expr(ExprKind::Map(entries))
    }

    pub fn message<F: Into<String>>(
        &mut self,
        message_name: impl Into<String>,
        fields: Vec<(F, Expr)>,
    ) -> Expr {
        let fields = fields
            .into_iter()
            .map(|(field, value)| StructField {
                id: self.next_id(),
                field: field.into(),
                value,
            })
            .collect();
        self.expr(ExprKind::Struct {
            message_name: message_name.into(),
            fields,
        })
    }

    pub fn comprehension(&mut self, comprehension: Comprehension) -> Expr {
        self.expr(ExprKind::Comprehension(Box::new(comprehension)))
    }

    // ==================== Macros ====================

    fn accu(&mut self) -> Expr {
        self.ident(ACCUMULATOR_VAR)
    }

    fn fold(
        &mut self,
        range: Expr,
        iter_var: &str,
        accu_init: Expr,
        loop_condition: Expr,
        loop_step: Expr,
        result: Expr,
    ) -> Expr {
        self.comprehension(Comprehension {
            iter_var: iter_var.to_string(),
            iter_range: range,
            accu_var: ACCUMULATOR_VAR.to_string(),
            accu_init,
            loop_condition,
            loop_step,
            result,
        })
    }

    /// `range.all(iter_var, predicate)`
    pub fn all(&mut self, range: Expr, iter_var: &str, predicate: Expr) -> Expr {
        let init = self.bool(true);
        let accu = self.accu();
        let condition = self.global_call("@not_strictly_false", vec![accu]);
        let accu = self.accu();
        let step = self.global_call("_&&_", vec![accu, predicate]);
        let result = self.accu();
        self.fold(range, iter_var, init, condition, step, result)
    }

    /// `range.exists(iter_var, predicate)`
    pub fn exists(&mut self, range: Expr, iter_var: &str, predicate: Expr) -> Expr {
        let init = self.bool(false);
        let accu = self.accu();
        let not_accu = self.global_call("!_", vec![accu]);
        let condition = self.global_call("@not_strictly_false", vec![not_accu]);
        let accu = self.accu();
        let step = self.global_call("_||_", vec![accu, predicate]);
        let result = self.accu();
        self.fold(range, iter_var, init, condition, step, result)
    }

    /// `range.exists_one(iter_var, predicate)`
    pub fn exists_one(&mut self, range: Expr, iter_var: &str, predicate: Expr) -> Expr {
        let init = self.int(0);
        let condition = self.bool(true);
        let accu = self.accu();
        let one = self.int(1);
        let incremented = self.global_call("_+_", vec![accu, one]);
        let accu = self.accu();
        let step = self.global_call("_?_:_", vec![predicate, incremented, accu]);
        let accu = self.accu();
        let one = self.int(1);
        let result = self.global_call("_==_", vec![accu, one]);
        self.fold(range, iter_var, init, condition, step, result)
    }

    /// `range.map(iter_var, transform)`
    pub fn map_macro(&mut self, range: Expr, iter_var: &str, transform: Expr) -> Expr {
        let init = self.list(vec![]);
        let condition = self.bool(true);
        let step = self.append_step(transform);
        let result = self.accu();
        self.fold(range, iter_var, init, condition, step, result)
    }

    /// `range.map(iter_var, filter, transform)`
    pub fn map_filter_macro(&mut self, range: Expr, iter_var: &str, filter: Expr, transform: Expr) -> Expr {
        let init = self.list(vec![]);
        let condition = self.bool(true);
        let append = self.append_step(transform);
        let accu = self.accu();
        let step = self.global_call("_?_:_", vec![filter, append, accu]);
        let result = self.accu();
        self.fold(range, iter_var, init, condition, step, result)
    }

    /// `range.filter(iter_var, predicate)`
    pub fn filter(&mut self, range: Expr, iter_var: &str, predicate: Expr) -> Expr {
        let init = self.list(vec![]);
        let condition = self.bool(true);
        let element = self.ident(iter_var);
        let append = self.append_step(element);
        let accu = self.accu();
        let step = self.global_call("_?_:_", vec![predicate, append, accu]);
        let result = self.accu();
        self.fold(range, iter_var, init, condition, step, result)
    }

    /// `__result__ + [element]`
    fn append_step(&mut self, element: Expr) -> Expr {
        let accu = self.accu();
        let single = self.list(vec![element]);
        self.global_call("_+_", vec![accu, single])
    }
}
