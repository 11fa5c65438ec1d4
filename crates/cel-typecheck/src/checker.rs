//! The type checker.
//!
//! Walks an expression tree once, assigning a type to every node and a
//! reference to every node that names a declaration. Type variables are
//! solved by unification as the walk proceeds; a final pass substitutes the
//! solutions into every recorded type, replacing unsolved variables with `dyn`.
//!
//! Checking never stops at the first problem. Errors are collected and the
//! offending node is typed `*error*`, which unifies with everything so one
//! mistake does not cascade.

use std::collections::BTreeMap;

use cel_typecheck_common::{
    well_known_type, CelType, CelValue, Comprehension, Expr, ExprKind, FunctionDecl, IdentDecl,
    MapEntry, SourceInfo, StructField,
};

use crate::env::{AggregateLiteralPolicy, CheckerEnv};
use crate::errors::{CheckErrorKind, Diagnostics};
use crate::mapping::Mapping;
use crate::overload::{resolve_overload, TypeVarGenerator};
use crate::types::{is_assignable, most_general, substitute};

/// What a checked node refers to.
///
/// Identifiers carry the resolved, fully qualified name and, for constants,
/// the value. Calls carry the ids of every overload that may apply.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub name: String,
    pub overload_ids: Vec<String>,
    pub value: Option<CelValue>,
}

impl Reference {
    /// A reference to an identifier.
    pub fn ident(name: impl Into<String>, value: Option<CelValue>) -> Self {
        Self {
            name: name.into(),
            overload_ids: Vec::new(),
            value,
        }
    }

    /// A reference to a single function overload.
    pub fn function(overload_id: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            overload_ids: vec![overload_id.into()],
            value: None,
        }
    }

    pub fn add_overload(&mut self, overload_id: impl Into<String>) {
        self.overload_ids.push(overload_id.into());
    }

    pub fn is_function(&self) -> bool {
        !self.overload_ids.is_empty()
    }
}

/// The outcome of checking an expression.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// The checked tree. Identifiers and selections that resolved to
    /// declarations carry the qualified name; namespaced calls lose their
    /// target.
    pub expr: Expr,
    /// Expression ID to fully substituted type.
    pub type_map: BTreeMap<i64, CelType>,
    /// Expression ID to resolved reference.
    pub reference_map: BTreeMap<i64, Reference>,
    pub errors: Diagnostics,
}

impl CheckResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get_type(&self, expr_id: i64) -> Option<&CelType> {
        self.type_map.get(&expr_id)
    }

    pub fn get_reference(&self, expr_id: i64) -> Option<&Reference> {
        self.reference_map.get(&expr_id)
    }

    /// The type of the root expression.
    pub fn result_type(&self) -> Option<&CelType> {
        self.get_type(self.expr.id)
    }
}

/// Per-node annotations. Each id is annotated at most once; re-recording an
/// equal value is allowed.
#[derive(Debug)]
struct AnnotationTable<T> {
    entries: BTreeMap<i64, T>,
}

impl<T: PartialEq + std::fmt::Debug> AnnotationTable<T> {
    fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    fn set(&mut self, id: i64, value: T) {
        if let Some(existing) = self.entries.get(&id) {
            if *existing != value {
                panic!(
                    "expression {} annotated twice: {:?} then {:?}",
                    id, existing, value
                );
            }
            return;
        }
        self.entries.insert(id, value);
    }

    fn get(&self, id: i64) -> Option<&T> {
        self.entries.get(&id)
    }
}

/// Check `expr` against `env`.
///
/// Positions in `source_info` are used only to locate errors.
#[tracing::instrument(skip_all, fields(container = env.container().name()))]
pub fn check(expr: &Expr, source_info: &SourceInfo, env: &CheckerEnv) -> CheckResult {
    Checker::new(env.clone(), source_info).check(expr)
}

/// Type checker state for a single expression.
pub struct Checker<'a> {
    env: CheckerEnv,
    source_info: &'a SourceInfo,
    mappings: Mapping,
    type_vars: TypeVarGenerator,
    types: AnnotationTable<CelType>,
    references: AnnotationTable<Reference>,
    errors: Diagnostics,
}

impl<'a> Checker<'a> {
    pub fn new(env: CheckerEnv, source_info: &'a SourceInfo) -> Self {
        Self {
            env,
            source_info,
            mappings: Mapping::new(),
            type_vars: TypeVarGenerator::default(),
            types: AnnotationTable::new(),
            references: AnnotationTable::new(),
            errors: Diagnostics::new(),
        }
    }

    /// Check an expression, consuming the checker.
    pub fn check(mut self, expr: &Expr) -> CheckResult {
        let mut checked = expr.clone();
        self.check_expr(&mut checked);

        let mappings = self.mappings;
        let type_map = self
            .types
            .entries
            .into_iter()
            .map(|(id, t)| (id, substitute(&mappings, &t, true)))
            .collect();

        tracing::debug!(errors = self.errors.len(), "check complete");

        CheckResult {
            expr: checked,
            type_map,
            reference_map: self.references.entries,
            errors: self.errors,
        }
    }

    fn check_expr(&mut self, expr: &mut Expr) {
        if matches!(expr.kind, ExprKind::Select { .. }) {
            // Selection may replace the node itself.
            self.check_select(expr);
            return;
        }
        let id = expr.id;
        match &mut expr.kind {
            ExprKind::Const(value) => {
                let t = value.cel_type();
                self.set_type(id, t);
            }
            ExprKind::Ident(name) => self.check_ident(id, name),
            ExprKind::Select { .. } => {}
            ExprKind::Call {
                target,
                function,
                args,
            } => self.check_call(id, target, function, args),
            ExprKind::List(elements) => self.check_create_list(id, elements),
            ExprKind::Map(entries) => self.check_create_map(id, entries),
            ExprKind::Struct {
                message_name,
                fields,
            } => self.check_create_message(id, message_name, fields),
            ExprKind::Comprehension(comprehension) => {
                self.check_comprehension(id, comprehension)
            }
        }
    }

    // ==================== Identifiers and selection ====================

    fn check_ident(&mut self, id: i64, name: &mut String) {
        match self.env.lookup_ident(name) {
            Some(ident) => {
                self.set_type(id, ident.cel_type.clone());
                self.set_reference(id, Reference::ident(&ident.name, ident.value.clone()));
                *name = ident.name;
            }
            None => {
                self.set_type(id, CelType::Error);
                self.report_undeclared(id, name.clone());
            }
        }
    }

    fn check_select(&mut self, expr: &mut Expr) {
        let id = expr.id;
        let ExprKind::Select {
            operand,
            field,
            test_only,
        } = &mut expr.kind
        else {
            return;
        };
        let test_only = *test_only;

        // A dotted name may itself be a declared identifier.
        if let Some(prefix) = operand.qualified_name() {
            let qualified = format!("{}.{}", prefix, field);
            if let Some(ident) = self.env.lookup_ident(&qualified) {
                if test_only {
                    self.report(id, CheckErrorKind::NotAFieldSelection);
                    self.set_type(id, CelType::Bool);
                    return;
                }
                self.set_type(id, ident.cel_type.clone());
                self.set_reference(id, Reference::ident(&ident.name, ident.value.clone()));
                expr.kind = ExprKind::Ident(ident.name);
                return;
            }
        }

        let field_type = self.check_field_selection(id, operand, field);
        let result = if test_only { CelType::Bool } else { field_type };
        let result = substitute(&self.mappings, &result, false);
        self.set_type(id, result);
    }

    fn check_field_selection(&mut self, id: i64, operand: &mut Expr, field: &str) -> CelType {
        self.check_expr(operand);
        let target = substitute(&self.mappings, &self.get_type(operand.id), false);
        match &target {
            CelType::Map(_, value) => value.as_ref().clone(),
            CelType::Message(message) => self
                .lookup_field_type(id, message, field)
                .unwrap_or(CelType::Error),
            CelType::TypeParam(_) => {
                // Selection forces an unbound variable to dyn.
                self.unify(&CelType::Dyn, &target);
                CelType::Dyn
            }
            t if t.is_dyn_or_error() => CelType::Dyn,
            t => {
                self.report(
                    id,
                    CheckErrorKind::FieldSelectionUnsupported { cel_type: t.clone() },
                );
                CelType::Error
            }
        }
    }

    fn lookup_field_type(&mut self, id: i64, message: &str, field: &str) -> Option<CelType> {
        let provider = self.env.provider();
        if provider.find_type(message).is_none() {
            let name = message.to_string();
            self.report(id, CheckErrorKind::UnexpectedFailedResolution { name });
            return None;
        }
        match provider.find_field_type(message, field) {
            Some(t) => Some(t),
            None => {
                let field = field.to_string();
                self.report(id, CheckErrorKind::UndefinedField { field });
                None
            }
        }
    }

    // ==================== Calls ====================

    fn check_call(
        &mut self,
        id: i64,
        target: &mut Option<Box<Expr>>,
        function: &mut String,
        args: &mut [Expr],
    ) {
        for arg in args.iter_mut() {
            self.check_expr(arg);
        }
        let env = self.env.clone();

        let Some(receiver) = target.as_deref_mut() else {
            match env.lookup_function(function) {
                Some(decl) => {
                    *function = decl.name.clone();
                    self.resolve_call(id, decl, None, args);
                }
                None => {
                    self.set_type(id, CelType::Error);
                    self.report_undeclared(id, function.clone());
                }
            }
            return;
        };

        // `a.b.f(x)` may name the namespaced function `a.b.f`.
        if let Some(prefix) = receiver.qualified_name() {
            let qualified = format!("{}.{}", prefix, function);
            if let Some(decl) = env.lookup_function(&qualified) {
                *function = decl.name.clone();
                *target = None;
                self.resolve_call(id, decl, None, args);
                return;
            }
        }

        self.check_expr(receiver);
        match env.lookup_function(function) {
            Some(decl) => self.resolve_call(id, decl, Some(receiver.id), args),
            None => {
                self.set_type(id, CelType::Error);
                self.report_undeclared(id, function.clone());
            }
        }
    }

    fn resolve_call(
        &mut self,
        id: i64,
        function: &FunctionDecl,
        receiver: Option<i64>,
        args: &[Expr],
    ) {
        let arg_types: Vec<CelType> = receiver
            .into_iter()
            .chain(args.iter().map(|arg| arg.id))
            .map(|arg_id| self.get_type(arg_id))
            .collect();
        let is_instance = receiver.is_some();

        let resolution = resolve_overload(
            &self.env,
            &mut self.mappings,
            &mut self.type_vars,
            function,
            &arg_types,
            is_instance,
        );

        match resolution {
            Some(resolution) => {
                let mut reference = resolution.reference;
                reference.name = function.name.clone();
                self.set_type(id, resolution.result_type);
                self.set_reference(id, reference);
            }
            None => {
                let arg_types = arg_types
                    .iter()
                    .map(|t| substitute(&self.mappings, t, true))
                    .collect();
                self.report(
                    id,
                    CheckErrorKind::NoMatchingOverload {
                        function: function.name.clone(),
                        arg_types,
                        is_instance,
                    },
                );
                self.set_type(id, CelType::Error);
            }
        }
    }

    // ==================== Literals ====================

    fn check_create_list(&mut self, id: i64, elements: &mut [Expr]) {
        let mut elem_type = None;
        for elem in elements.iter_mut() {
            self.check_expr(elem);
            let current = self.get_type(elem.id);
            elem_type = Some(self.join_types(elem.id, elem_type, current));
        }
        let elem_type = elem_type.unwrap_or_else(|| self.type_vars.fresh());
        self.set_type(id, CelType::list(elem_type));
    }

    fn check_create_map(&mut self, id: i64, entries: &mut [MapEntry]) {
        let mut key_type = None;
        let mut value_type = None;
        for entry in entries.iter_mut() {
            self.check_expr(&mut entry.key);
            let current = self.get_type(entry.key.id);
            key_type = Some(self.join_types(entry.key.id, key_type, current));

            self.check_expr(&mut entry.value);
            let current = self.get_type(entry.value.id);
            value_type = Some(self.join_types(entry.value.id, value_type, current));
        }
        let key_type = key_type.unwrap_or_else(|| self.type_vars.fresh());
        let value_type = value_type.unwrap_or_else(|| self.type_vars.fresh());
        self.set_type(id, CelType::map(key_type, value_type));
    }

    /// Join the type of an aggregate literal element with the type of the
    /// elements before it.
    fn join_types(&mut self, id: i64, previous: Option<CelType>, current: CelType) -> CelType {
        let Some(previous) = previous else {
            return current;
        };
        if self.unify(&previous, &current) {
            return most_general(&previous, &current).clone();
        }
        match self.env.options().aggregate_literal_policy {
            AggregateLiteralPolicy::Dynamic => CelType::Dyn,
            AggregateLiteralPolicy::Homogeneous => {
                self.report(
                    id,
                    CheckErrorKind::TypeMismatch {
                        expected: previous,
                        actual: current,
                    },
                );
                CelType::Error
            }
        }
    }

    fn check_create_message(
        &mut self,
        id: i64,
        message_name: &mut String,
        fields: &mut [StructField],
    ) {
        let message_type = match self.env.lookup_ident(message_name) {
            None => {
                self.report_undeclared(id, message_name.clone());
                CelType::Error
            }
            Some(decl) => {
                self.set_reference(id, Reference::ident(&decl.name, None));
                *message_name = decl.name;
                match &decl.cel_type {
                    CelType::Error => CelType::Error,
                    CelType::Type(Some(inner)) => match inner.as_ref() {
                        t @ CelType::Message(_) => t.clone(),
                        t => {
                            let cel_type = t.clone();
                            self.report(id, CheckErrorKind::NotAMessageType { cel_type });
                            CelType::Error
                        }
                    },
                    CelType::Type(None) => {
                        let cel_type = CelType::type_type();
                        self.report(id, CheckErrorKind::NotAMessageType { cel_type });
                        CelType::Error
                    }
                    t => {
                        let cel_type = t.clone();
                        self.report(id, CheckErrorKind::NotAType { cel_type });
                        CelType::Error
                    }
                }
            }
        };

        let result_type = match &message_type {
            CelType::Message(name) => well_known_type(name).unwrap_or_else(|| message_type.clone()),
            t => t.clone(),
        };
        self.set_type(id, result_type);

        for entry in fields.iter_mut() {
            self.check_expr(&mut entry.value);
            let value_type = self.get_type(entry.value.id);
            let field_type = match &message_type {
                CelType::Message(name) => self
                    .lookup_field_type(entry.id, name, &entry.field)
                    .unwrap_or(CelType::Error),
                _ => CelType::Error,
            };
            if !self.unify(&value_type, &field_type) {
                self.report(
                    entry.id,
                    CheckErrorKind::FieldTypeMismatch {
                        field: entry.field.clone(),
                        expected: field_type,
                        actual: value_type,
                    },
                );
            }
        }
    }

    // ==================== Comprehensions ====================

    fn check_comprehension(&mut self, id: i64, comp: &mut Comprehension) {
        self.check_expr(&mut comp.iter_range);
        self.check_expr(&mut comp.accu_init);
        let accu_type = self.get_type(comp.accu_init.id);
        let range_type = substitute(&self.mappings, &self.get_type(comp.iter_range.id), false);

        let var_type = match &range_type {
            CelType::List(elem) => elem.as_ref().clone(),
            CelType::Map(key, _) => key.as_ref().clone(),
            CelType::Dyn | CelType::Error | CelType::TypeParam(_) => {
                self.unify(&CelType::Dyn, &range_type);
                CelType::Dyn
            }
            t => {
                let cel_type = t.clone();
                self.report(
                    comp.iter_range.id,
                    CheckErrorKind::NotAComprehensionRange { cel_type },
                );
                CelType::Error
            }
        };

        let outer = self.env.clone();

        self.env = self.env.enter_scope();
        self.env.bind(IdentDecl::new(comp.accu_var.clone(), accu_type.clone()));
        self.env = self.env.enter_scope();
        self.env.bind(IdentDecl::new(comp.iter_var.clone(), var_type));

        self.check_expr(&mut comp.loop_condition);
        self.assert_type(&comp.loop_condition, &CelType::Bool);
        self.check_expr(&mut comp.loop_step);
        self.assert_type(&comp.loop_step, &accu_type);

        // The result sees the accumulator but not the iteration variable.
        self.env = self.env.exit_scope();
        self.check_expr(&mut comp.result);
        self.env = outer;

        let result = substitute(&self.mappings, &self.get_type(comp.result.id), false);
        self.set_type(id, result);
    }

    // ==================== Helpers ====================

    /// Unify `t1` into `t2`, keeping the bindings on success.
    fn unify(&mut self, t1: &CelType, t2: &CelType) -> bool {
        match is_assignable(&self.mappings, t1, t2) {
            Some(mappings) => {
                self.mappings = mappings;
                true
            }
            None => false,
        }
    }

    fn assert_type(&mut self, expr: &Expr, expected: &CelType) {
        let actual = self.get_type(expr.id);
        if !self.unify(&actual, expected) {
            self.report(
                expr.id,
                CheckErrorKind::TypeMismatch {
                    expected: expected.clone(),
                    actual,
                },
            );
        }
    }

    fn get_type(&self, id: i64) -> CelType {
        self.types.get(id).cloned().unwrap_or(CelType::Error)
    }

    fn set_type(&mut self, id: i64, t: CelType) {
        self.types.set(id, t);
    }

    fn set_reference(&mut self, id: i64, reference: Reference) {
        self.references.set(id, reference);
    }

    fn report(&mut self, id: i64, kind: CheckErrorKind) {
        tracing::debug!(expr_id = id, error = %kind, "check error");
        self.errors.report(self.source_info, id, kind);
    }

    fn report_undeclared(&mut self, id: i64, name: String) {
        let container = self.env.container().name().to_string();
        self.report(id, CheckErrorKind::UndeclaredReference { container, name });
    }
}
