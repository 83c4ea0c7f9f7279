//! Overload resolution for function calls.
//!
//! Candidates are filtered by call style and arity, then matched parameter by
//! parameter. Type parameters are bound per candidate, so `T` in one overload
//! never leaks into another.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{CelType, FunctionDecl, OverloadDecl};

type Substitutions = HashMap<Arc<str>, CelType>;

#[derive(Debug, Clone, PartialEq)]
pub struct OverloadResult {
    pub result_type: CelType,
    /// Every overload that matched, in declaration order.
    pub overload_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(OverloadResult),
    /// No overload in this call style takes this many arguments; carries the
    /// argument counts that would have been accepted.
    WrongArity(Vec<usize>),
    NoMatch,
    /// Several overloads match and nothing about the call is dynamic.
    Ambiguous(Vec<String>),
}

/// Resolve a call to `func`.
///
/// `target` is the receiver type for `r.f(args)` calls and `None` for free
/// calls; `args` excludes the receiver.
pub fn resolve_overload(func: &FunctionDecl, target: Option<&CelType>, args: &[CelType]) -> Resolution {
    let is_member = target.is_some();
    let same_style: Vec<&OverloadDecl> = func
        .overloads
        .iter()
        .filter(|o| o.is_member == is_member)
        .collect();
    if same_style.is_empty() {
        return Resolution::NoMatch;
    }

    let full_args: Vec<&CelType> = target.into_iter().chain(args.iter()).collect();
    let same_arity: Vec<&OverloadDecl> = same_style
        .iter()
        .copied()
        .filter(|o| o.params.len() == full_args.len())
        .collect();
    if same_arity.is_empty() {
        let mut counts: Vec<usize> = same_style.iter().map(|o| o.arg_types().len()).collect();
        counts.sort_unstable();
        counts.dedup();
        return Resolution::WrongArity(counts);
    }

    let matched: Vec<(&OverloadDecl, CelType)> = same_arity
        .into_iter()
        .filter_map(|o| try_match_overload(&full_args, o).map(|result| (o, result)))
        .collect();

    match matched.as_slice() {
        [] => Resolution::NoMatch,
        [(overload, result)] => Resolution::Resolved(OverloadResult {
            result_type: result.clone(),
            overload_ids: vec![overload.id.clone()],
        }),
        _ => {
            let overload_ids: Vec<String> = matched.iter().map(|(o, _)| o.id.clone()).collect();
            let dynamic_call = full_args.iter().any(|a| a.is_dynamic())
                || matched
                    .iter()
                    .any(|(o, _)| o.params.iter().any(CelType::is_dynamic));
            if !dynamic_call {
                return Resolution::Ambiguous(overload_ids);
            }

            let first = &matched[0].1;
            let result_type = if matched.iter().all(|(_, r)| r == first) {
                first.clone()
            } else {
                CelType::Dyn
            };
            Resolution::Resolved(OverloadResult {
                result_type,
                overload_ids,
            })
        }
    }
}

/// Returns the overload's result type with its type parameters substituted,
/// or `None` if some argument does not fit.
fn try_match_overload(args: &[&CelType], overload: &OverloadDecl) -> Option<CelType> {
    let mut substitutions = Substitutions::new();
    for (arg, param) in args.iter().zip(&overload.params) {
        if !is_assignable(arg, param, &mut substitutions) {
            return None;
        }
    }
    Some(substitute_type(&overload.result, &substitutions))
}

fn is_assignable(arg: &CelType, param: &CelType, substitutions: &mut Substitutions) -> bool {
    if let CelType::TypeParam(name) = param {
        let binding = match substitutions.get(name) {
            None => arg.clone(),
            Some(bound) if bound == arg || arg.is_dynamic() => bound.clone(),
            Some(bound) if bound.is_dynamic() => arg.clone(),
            // Conflicting uses of one parameter widen it.
            Some(_) => CelType::Dyn,
        };
        substitutions.insert(name.clone(), binding);
        return true;
    }

    match (arg, param) {
        (CelType::Dyn | CelType::Error, _) | (_, CelType::Dyn | CelType::Error) => true,
        (CelType::List(a), CelType::List(p)) => is_assignable(a, p, substitutions),
        (CelType::Map(ak, av), CelType::Map(pk, pv)) => {
            is_assignable(ak, pk, substitutions) && is_assignable(av, pv, substitutions)
        }
        _ => arg == param,
    }
}

/// Replace bound type parameters; unbound ones become `Dyn`.
fn substitute_type(ty: &CelType, substitutions: &Substitutions) -> CelType {
    match ty {
        CelType::TypeParam(name) => substitutions.get(name).cloned().unwrap_or(CelType::Dyn),
        CelType::List(elem) => CelType::list(substitute_type(elem, substitutions)),
        CelType::Map(key, value) => CelType::map(
            substitute_type(key, substitutions),
            substitute_type(value, substitutions),
        ),
        _ => ty.clone(),
    }
}
