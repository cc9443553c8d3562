//! Generic `Signature` attribute strings (JVMS §4.7.9.1).
//!
//! Descriptors carry erased types; signatures preserve type variables and
//! type arguments for reflection. Only declarations that actually mention
//! generics get one.

use crate::ast::{Param, TypeArg, TypeParam, TypeRef, WildcardBound};
use std::collections::HashSet;

/// Resolves a source class name to an internal name; supplied by the
/// generator so signatures share its import context.
pub type ResolveName<'a> = dyn FnMut(&str) -> String + 'a;

fn primitive_code(name: &str) -> &'static str {
    match name {
        "boolean" => "Z",
        "byte" => "B",
        "short" => "S",
        "char" => "C",
        "int" => "I",
        "long" => "J",
        "float" => "F",
        "double" => "D",
        _ => "V",
    }
}

pub fn type_signature(
    ty: &TypeRef,
    type_params: &HashSet<String>,
    resolve: &mut ResolveName,
) -> String {
    match ty {
        TypeRef::Primitive { name, .. } => primitive_code(name).to_string(),
        TypeRef::Void { .. } => "V".to_string(),
        TypeRef::Array { elem, dims, .. } => {
            let mut s = "[".repeat(*dims as usize);
            s.push_str(&type_signature(elem, type_params, resolve));
            s
        }
        TypeRef::Named { name, type_args, .. } => {
            if type_params.contains(name) {
                return format!("T{};", name);
            }
            let internal = resolve(name);
            if type_args.is_empty() {
                return format!("L{};", internal);
            }
            let mut s = format!("L{}<", internal);
            for arg in type_args {
                match arg {
                    TypeArg::Type(t) => s.push_str(&type_signature(t, type_params, resolve)),
                    TypeArg::Wildcard { bound: None } => s.push('*'),
                    TypeArg::Wildcard { bound: Some((WildcardBound::Extends, t)) } => {
                        s.push('+');
                        s.push_str(&type_signature(t, type_params, resolve));
                    }
                    TypeArg::Wildcard { bound: Some((WildcardBound::Super, t)) } => {
                        s.push('-');
                        s.push_str(&type_signature(t, type_params, resolve));
                    }
                }
            }
            s.push_str(">;");
            s
        }
    }
}

fn type_params_signature(
    params: &[TypeParam],
    in_scope: &HashSet<String>,
    resolve: &mut ResolveName,
) -> String {
    if params.is_empty() {
        return String::new();
    }
    let mut s = String::from("<");
    for param in params {
        s.push_str(&param.name);
        s.push(':');
        if param.bounds.is_empty() {
            s.push_str("Ljava/lang/Object;");
        } else {
            for (i, bound) in param.bounds.iter().enumerate() {
                if i > 0 {
                    s.push(':');
                }
                s.push_str(&type_signature(bound, in_scope, resolve));
            }
        }
    }
    s.push('>');
    s
}

/// Does this type mention a type variable or carry type arguments?
pub fn uses_generics(ty: &TypeRef, type_params: &HashSet<String>) -> bool {
    match ty {
        TypeRef::Primitive { .. } | TypeRef::Void { .. } => false,
        TypeRef::Array { elem, .. } => uses_generics(elem, type_params),
        TypeRef::Named { name, type_args, .. } => {
            type_params.contains(name) || !type_args.is_empty()
        }
    }
}

/// Class signature when the declaration has type parameters.
pub fn class_signature(
    type_params: &[TypeParam],
    extends: Option<&TypeRef>,
    implements: &[TypeRef],
    resolve: &mut ResolveName,
) -> Option<String> {
    if type_params.is_empty() {
        return None;
    }
    let in_scope: HashSet<String> = type_params.iter().map(|p| p.name.clone()).collect();
    let mut s = type_params_signature(type_params, &in_scope, resolve);
    match extends {
        Some(sup) => s.push_str(&type_signature(sup, &in_scope, resolve)),
        None => s.push_str("Ljava/lang/Object;"),
    }
    for iface in implements {
        s.push_str(&type_signature(iface, &in_scope, resolve));
    }
    Some(s)
}

/// Method signature when the method declares or mentions type variables or
/// parameterized types.
pub fn method_signature(
    type_params: &[TypeParam],
    params: &[Param],
    return_type: &TypeRef,
    class_type_params: &HashSet<String>,
    resolve: &mut ResolveName,
) -> Option<String> {
    let mut in_scope = class_type_params.clone();
    in_scope.extend(type_params.iter().map(|p| p.name.clone()));

    let generic = !type_params.is_empty()
        || uses_generics(return_type, &in_scope)
        || params.iter().any(|p| uses_generics(&p.ty, &in_scope));
    if !generic {
        return None;
    }

    let mut s = type_params_signature(type_params, &in_scope, resolve);
    s.push('(');
    for param in params {
        s.push_str(&type_signature(&param.ty, &in_scope, resolve));
    }
    s.push(')');
    s.push_str(&type_signature(return_type, &in_scope, resolve));
    Some(s)
}

/// Field signature when the field type mentions generics.
pub fn field_signature(
    ty: &TypeRef,
    class_type_params: &HashSet<String>,
    resolve: &mut ResolveName,
) -> Option<String> {
    if uses_generics(ty, class_type_params) {
        Some(type_signature(ty, class_type_params, resolve))
    } else {
        None
    }
}
