//! Assignability, widening and substitution over `CelType`.
//!
//! `is_assignable` is the unification core. It binds type parameters in a
//! `Mapping` as a side effect of a successful check, guarded by an occurs
//! check so that no parameter is ever bound to a type containing itself.

use cel_typecheck_common::{CelType, Kind};

use crate::mapping::Mapping;

/// Check whether `t1` is assignable to `t2`.
///
/// Works on a copy of `m`; returns the extended copy on success and leaves
/// the caller's mapping untouched on failure.
pub fn is_assignable(m: &Mapping, t1: &CelType, t2: &CelType) -> Option<Mapping> {
    let mut m = m.copy();
    internal_is_assignable(&mut m, t1, t2).then_some(m)
}

/// Check whether each type of `l1` is assignable to the type at the same
/// position of `l2`. Lists of different length never match.
pub fn is_assignable_list(m: &Mapping, l1: &[CelType], l2: &[CelType]) -> Option<Mapping> {
    let mut m = m.copy();
    internal_is_assignable_list(&mut m, l1, l2).then_some(m)
}

fn internal_is_assignable_list(m: &mut Mapping, l1: &[CelType], l2: &[CelType]) -> bool {
    l1.len() == l2.len()
        && l1
            .iter()
            .zip(l2)
            .all(|(t1, t2)| internal_is_assignable(m, t1, t2))
}

fn internal_is_assignable(m: &mut Mapping, t1: &CelType, t2: &CelType) -> bool {
    tracing::trace!(from = %t1, to = %t2, "unify");

    if t1 == t2 {
        return true;
    }

    if let CelType::TypeParam(_) = t2 {
        if let Some(t2_sub) = m.find(t2).cloned() {
            if !internal_is_assignable(m, t1, &t2_sub) {
                return false;
            }
            let general = most_general(t1, &t2_sub);
            if not_referenced_in(m, t2, general) {
                m.add(t2.clone(), general.clone());
            }
            return true;
        }
        if not_referenced_in(m, t2, t1) {
            m.add(t2.clone(), t1.clone());
            return true;
        }
    }

    if let CelType::TypeParam(_) = t1 {
        if let Some(t1_sub) = m.find(t1).cloned() {
            if !internal_is_assignable(m, &t1_sub, t2) {
                return false;
            }
            let general = most_general(&t1_sub, t2);
            if not_referenced_in(m, t1, general) {
                m.add(t1.clone(), general.clone());
            }
            return true;
        }
        if not_referenced_in(m, t1, t2) {
            m.add(t1.clone(), t2.clone());
            return true;
        }
    }

    if t1.is_dyn_or_error() || t2.is_dyn_or_error() {
        return true;
    }

    match t1 {
        CelType::Null => return t2.is_nullable(),
        CelType::Wrapper(p) => return internal_is_assignable(m, &p.to_type(), t2),
        _ => {}
    }
    if let Some(p) = t1.primitive() {
        return match t2 {
            CelType::Wrapper(w) => p == *w,
            _ => t2.primitive() == Some(p),
        };
    }

    match (t1, t2) {
        (
            CelType::Abstract { name: n1, params: p1 },
            CelType::Abstract { name: n2, params: p2 },
        ) => n1 == n2 && internal_is_assignable_list(m, p1, p2),
        (CelType::Function { .. }, CelType::Function { .. }) => {
            internal_is_assignable_list(m, &flatten_function(t1), &flatten_function(t2))
        }
        (CelType::List(e1), CelType::List(e2)) => internal_is_assignable(m, e1, e2),
        (CelType::Map(k1, v1), CelType::Map(k2, v2)) => {
            internal_is_assignable(m, k1, k2) && internal_is_assignable(m, v1, v2)
        }
        (CelType::Message(n1), CelType::Message(n2)) => n1 == n2,
        (CelType::Type(_), CelType::Type(_)) => true,
        // Distinct well-known types; equal ones were caught above.
        _ => false,
    }
}

/// `[args..., result]` of a function type.
fn flatten_function(t: &CelType) -> Vec<CelType> {
    match t {
        CelType::Function { result, args } => {
            let mut flat = args.to_vec();
            flat.push(result.as_ref().clone());
            flat
        }
        _ => Vec::new(),
    }
}

/// Occurs check: true when the type parameter `t` does not appear within
/// `within`, following bindings in `m`.
pub fn not_referenced_in(m: &Mapping, t: &CelType, within: &CelType) -> bool {
    if t == within {
        return false;
    }
    match within {
        CelType::TypeParam(_) => match m.find(within) {
            Some(sub) => not_referenced_in(m, t, sub),
            None => true,
        },
        CelType::Abstract { params, .. } => params.iter().all(|p| not_referenced_in(m, t, p)),
        CelType::Function { result, args } => {
            not_referenced_in(m, t, result) && args.iter().all(|a| not_referenced_in(m, t, a))
        }
        CelType::List(elem) => not_referenced_in(m, t, elem),
        CelType::Map(key, value) => not_referenced_in(m, t, key) && not_referenced_in(m, t, value),
        CelType::Type(Some(inner)) => not_referenced_in(m, t, inner),
        CelType::Wrapper(p) => not_referenced_in(m, t, &p.to_type()),
        _ => true,
    }
}

/// Of two types already known to unify, the less specific one.
pub fn most_general<'a>(t1: &'a CelType, t2: &'a CelType) -> &'a CelType {
    if is_equal_or_less_specific(t1, t2) {
        t1
    } else {
        t2
    }
}

/// True when `t1` is equal to or less specific than `t2`.
///
/// `dyn` and type parameters are less specific than anything.
pub fn is_equal_or_less_specific(t1: &CelType, t2: &CelType) -> bool {
    if t1.is_dyn() || t1.kind() == Kind::TypeParam {
        return true;
    }
    if t2.is_dyn() || t2.kind() == Kind::TypeParam {
        return false;
    }
    match (t1, t2) {
        (
            CelType::Abstract { name: n1, params: p1 },
            CelType::Abstract { name: n2, params: p2 },
        ) => n1 == n2 && all_equal_or_less_specific(p1, p2),
        (CelType::Function { .. }, CelType::Function { .. }) => {
            all_equal_or_less_specific(&flatten_function(t1), &flatten_function(t2))
        }
        (CelType::List(e1), CelType::List(e2)) => is_equal_or_less_specific(e1, e2),
        (CelType::Map(k1, v1), CelType::Map(k2, v2)) => {
            is_equal_or_less_specific(k1, k2) && is_equal_or_less_specific(v1, v2)
        }
        _ => t1 == t2,
    }
}

fn all_equal_or_less_specific(l1: &[CelType], l2: &[CelType]) -> bool {
    l1.len() == l2.len()
        && l1
            .iter()
            .zip(l2)
            .all(|(t1, t2)| is_equal_or_less_specific(t1, t2))
}

/// Replace bound type parameters in `t` with their bindings, following
/// chains of bindings. With `type_param_to_dyn`, unbound parameters become
/// `dyn`.
pub fn substitute(m: &Mapping, t: &CelType, type_param_to_dyn: bool) -> CelType {
    if let Some(sub) = m.find(t) {
        return substitute(m, sub, type_param_to_dyn);
    }
    match t {
        CelType::TypeParam(_) if type_param_to_dyn => CelType::Dyn,
        CelType::Abstract { name, params } => CelType::Abstract {
            name: name.clone(),
            params: params
                .iter()
                .map(|p| substitute(m, p, type_param_to_dyn))
                .collect(),
        },
        CelType::Function { result, args } => CelType::function(
            substitute(m, result, type_param_to_dyn),
            args.iter().map(|a| substitute(m, a, type_param_to_dyn)),
        ),
        CelType::List(elem) => CelType::list(substitute(m, elem, type_param_to_dyn)),
        CelType::Map(key, value) => CelType::map(
            substitute(m, key, type_param_to_dyn),
            substitute(m, value, type_param_to_dyn),
        ),
        CelType::Type(Some(inner)) => CelType::type_of(substitute(m, inner, type_param_to_dyn)),
        _ => t.clone(),
    }
}
