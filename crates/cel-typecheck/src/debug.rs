//! Debug rendering of expression trees.
//!
//! Renders one node per line with nested calls and literals indented. An
//! [`Adorner`] may append metadata to each node; [`SemanticAdorner`] appends
//! the checked type and reference so a check result can be compared against
//! a golden string.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cel_typecheck::{check, to_adorned_debug_string, CheckerEnv, Container, SemanticAdorner};
//! use cel_typecheck_common::{ExprFactory, SourceInfo, StaticTypeProvider};
//!
//! let env = CheckerEnv::standard(Container::default(), Arc::new(StaticTypeProvider::new()));
//! let mut f = ExprFactory::new();
//! let (one, two) = (f.int(1), f.int(2));
//! let expr = f.global_call("_+_", vec![one, two]);
//!
//! let result = check(&expr, &SourceInfo::default(), &env);
//! let rendered = to_adorned_debug_string(&result.expr, &SemanticAdorner::new(&result));
//! assert_eq!(rendered, "_+_(\n  1~int,\n  2~int\n)~int^add_int64");
//! ```

use cel_typecheck_common::{CelValue, Comprehension, Expr, ExprKind, MapEntry, StructField};

use crate::checker::CheckResult;

/// Supplies the text appended after each rendered node.
pub trait Adorner {
    fn adorn(&self, expr: &Expr) -> String;
}

/// Appends nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyAdorner;

impl Adorner for EmptyAdorner {
    fn adorn(&self, _expr: &Expr) -> String {
        String::new()
    }
}

/// Appends `~type` and, for names, calls and selections, `^reference`.
///
/// Identifier references render their name; function references render
/// their overload ids, sorted and joined by `|`.
#[derive(Debug, Clone, Copy)]
pub struct SemanticAdorner<'a> {
    result: &'a CheckResult,
}

impl<'a> SemanticAdorner<'a> {
    pub fn new(result: &'a CheckResult) -> Self {
        Self { result }
    }
}

impl Adorner for SemanticAdorner<'_> {
    fn adorn(&self, expr: &Expr) -> String {
        let mut out = String::new();
        if let Some(t) = self.result.get_type(expr.id) {
            out.push('~');
            out.push_str(&t.display_name());
        }
        let names_reference = matches!(
            expr.kind,
            ExprKind::Ident(_) | ExprKind::Call { .. } | ExprKind::Struct { .. } | ExprKind::Select { .. }
        );
        if names_reference {
            if let Some(reference) = self.result.get_reference(expr.id) {
                out.push('^');
                if reference.overload_ids.is_empty() {
                    out.push_str(&reference.name);
                } else {
                    let mut ids = reference.overload_ids.clone();
                    ids.sort();
                    out.push_str(&ids.join("|"));
                }
            }
        }
        out
    }
}

/// Render an expression without metadata.
pub fn to_debug_string(expr: &Expr) -> String {
    to_adorned_debug_string(expr, &EmptyAdorner)
}

/// Render an expression, appending `adorner`'s text after every node.
pub fn to_adorned_debug_string(expr: &Expr, adorner: &dyn Adorner) -> String {
    let mut writer = DebugWriter::new(adorner);
    writer.buffer(expr);
    writer.out
}

struct DebugWriter<'a> {
    adorner: &'a dyn Adorner,
    out: String,
    indent: usize,
    line_start: bool,
}

impl<'a> DebugWriter<'a> {
    fn new(adorner: &'a dyn Adorner) -> Self {
        Self {
            adorner,
            out: String::new(),
            indent: 0,
            line_start: true,
        }
    }

    fn buffer(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Const(value) => {
                let literal = format_literal(value);
                self.append(&literal);
            }
            ExprKind::Ident(name) => self.append(name),
            ExprKind::Select {
                operand,
                field,
                test_only,
            } => {
                self.buffer(operand);
                self.append(".");
                self.append(field);
                if *test_only {
                    self.append("~test-only");
                }
            }
            ExprKind::Call {
                target,
                function,
                args,
            } => self.append_call(target.as_deref(), function, args),
            ExprKind::List(elements) => self.append_list(elements),
            ExprKind::Struct {
                message_name,
                fields,
            } => self.append_message(message_name, fields),
            ExprKind::Map(entries) => self.append_map(entries),
            ExprKind::Comprehension(comprehension) => self.append_comprehension(comprehension),
        }
        let adornment = self.adorner.adorn(expr);
        self.append(&adornment);
    }

    fn append_call(&mut self, target: Option<&Expr>, function: &str, args: &[Expr]) {
        if let Some(target) = target {
            self.buffer(target);
            self.append(".");
        }
        self.append(function);
        self.append("(");
        if !args.is_empty() {
            self.indent += 1;
            self.newline();
            self.append_separated(args, |w, arg| w.buffer(arg));
            self.indent -= 1;
            self.newline();
        }
        self.append(")");
    }

    fn append_list(&mut self, elements: &[Expr]) {
        self.append("[");
        if !elements.is_empty() {
            self.newline();
            self.indent += 1;
            self.append_separated(elements, |w, elem| w.buffer(elem));
            self.indent -= 1;
            self.newline();
        }
        self.append("]");
    }

    fn append_message(&mut self, message_name: &str, fields: &[StructField]) {
        self.append(message_name);
        self.append("{");
        if !fields.is_empty() {
            self.newline();
            self.indent += 1;
            self.append_separated(fields, |w, entry| {
                w.append(&entry.field);
                w.append(":");
                w.buffer(&entry.value);
            });
            self.indent -= 1;
            self.newline();
        }
        self.append("}");
    }

    fn append_map(&mut self, entries: &[MapEntry]) {
        self.append("{");
        if !entries.is_empty() {
            self.newline();
            self.indent += 1;
            self.append_separated(entries, |w, entry| {
                w.buffer(&entry.key);
                w.append(":");
                w.buffer(&entry.value);
            });
            self.indent -= 1;
            self.newline();
        }
        self.append("}");
    }

    fn append_comprehension(&mut self, comp: &Comprehension) {
        self.append("__comprehension__(");
        self.indent += 1;
        self.newline();
        self.section("Variable", |w| w.append(&comp.iter_var));
        self.section("Target", |w| w.buffer(&comp.iter_range));
        self.section("Accumulator", |w| w.append(&comp.accu_var));
        self.section("Init", |w| w.buffer(&comp.accu_init));
        self.section("LoopCondition", |w| w.buffer(&comp.loop_condition));
        self.section("LoopStep", |w| w.buffer(&comp.loop_step));
        self.append("// Result");
        self.newline();
        self.buffer(&comp.result);
        self.append(")");
        self.indent -= 1;
    }

    /// A `// title` line, the section body, then a separating comma.
    fn section(&mut self, title: &str, body: impl FnOnce(&mut Self)) {
        self.append("// ");
        self.append(title);
        self.newline();
        body(self);
        self.append(",");
        self.newline();
    }

    fn append_separated<T>(&mut self, items: &[T], mut each: impl FnMut(&mut Self, &T)) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.append(",");
                self.newline();
            }
            each(self, item);
        }
    }

    fn append(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        if self.line_start {
            self.line_start = false;
            for _ in 0..self.indent {
                self.out.push_str("  ");
            }
        }
        self.out.push_str(s);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        self.line_start = true;
    }
}

fn format_literal(value: &CelValue) -> String {
    match value {
        CelValue::Null => "null".to_string(),
        CelValue::Bool(b) => b.to_string(),
        CelValue::Int(n) => n.to_string(),
        CelValue::UInt(n) => format!("{}u", n),
        CelValue::Double(d) => d.to_string(),
        CelValue::String(s) => format!("{:?}", s),
        CelValue::Bytes(b) => format!("b\"{}\"", String::from_utf8_lossy(b)),
    }
}
