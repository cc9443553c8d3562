//! Name, field and method resolution.
//!
//! Turns source names into concrete class/field/method references with
//! erased descriptors, consulting the classpath (binary classes, built-ins
//! and in-process skeletons alike).

use super::class::flags;
use super::class_reader::ParsedClass;
use super::classpath::ClassPath;
use super::types::{is_widening_primitive, parse_method_descriptor, JType, PrimitiveKind};
use crate::common::{Error, Result};
use crate::parser::span::Span;
use std::collections::HashMap;
use std::rc::Rc;

/// Per-compilation-unit naming context: package, imports, and the types the
/// unit itself declares.
#[derive(Debug, Clone, Default)]
pub struct UnitScope {
    /// Package path with `/` separators, empty for the default package
    pub package: String,
    /// simple name -> internal name
    pub single_imports: HashMap<String, String>,
    /// package paths with `/` separators
    pub wildcard_imports: Vec<String>,
    /// simple name -> internal name for types declared in this unit
    /// (including nested ones under their `Outer$Inner` binary names)
    pub unit_types: HashMap<String, String>,
}

impl UnitScope {
    /// Binary name for a top-level type declared in this unit's package.
    pub fn binary_name(&self, simple: &str) -> String {
        if self.package.is_empty() {
            simple.to_string()
        } else {
            format!("{}/{}", self.package, simple)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedField {
    /// The declaring class, for the emitted field-ref
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub ty: JType,
    pub is_static: bool,
}

#[derive(Debug, Clone)]
pub struct ResolvedMethod {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub is_static: bool,
    pub is_interface: bool,
    pub is_varargs: bool,
    pub is_private: bool,
    pub params: Vec<JType>,
    pub ret: JType,
}

/// Resolve a source type name to an internal name.
///
/// Lookup order: qualified names first, then single-type imports, the
/// unit's own types, same package, nested types of the enclosing class,
/// wildcard imports, and finally `java.lang`.
pub fn resolve_class_name(
    classpath: &mut ClassPath,
    scope: &UnitScope,
    enclosing: Option<&str>,
    name: &str,
    span: Span,
) -> Result<String> {
    if name.contains('/') {
        return Ok(name.to_string());
    }
    if let Some(dot) = name.find('.') {
        // leading component resolves on its own; the rest are nested names
        let head = &name[..dot];
        if let Ok(base) = resolve_class_name(classpath, scope, enclosing, head, span) {
            let nested = format!("{}${}", base, name[dot + 1..].replace('.', "$"));
            if classpath.contains(&nested) {
                return Ok(nested);
            }
        }
        // otherwise treat the dotted name as fully qualified
        return Ok(name.replace('.', "/"));
    }

    if let Some(internal) = scope.single_imports.get(name) {
        return Ok(internal.clone());
    }
    if let Some(internal) = scope.unit_types.get(name) {
        return Ok(internal.clone());
    }
    let same_package = scope.binary_name(name);
    if classpath.contains(&same_package) {
        return Ok(same_package);
    }
    if let Some(outer) = enclosing {
        let nested = format!("{}${}", outer, name);
        if classpath.contains(&nested) {
            return Ok(nested);
        }
    }
    for pkg in &scope.wildcard_imports {
        let candidate = format!("{}/{}", pkg, name);
        if classpath.contains(&candidate) {
            return Ok(candidate);
        }
    }
    let lang = format!("java/lang/{}", name);
    if classpath.contains(&lang) {
        return Ok(lang);
    }

    let mut tried = vec![same_package];
    tried.extend(scope.wildcard_imports.iter().map(|p| format!("{}/{}", p, name)));
    tried.push(lang);
    Err(Error::unresolved_with(span, "class", name, format!("tried {}", tried.join(", "))))
}

fn lookup(classpath: &mut ClassPath, name: &str) -> Option<Rc<ParsedClass>> {
    classpath.find(name)
}

/// Is `sub` the same as or a subtype of `sup`, walking superclasses and
/// interfaces through the classpath.
pub fn is_subtype_of(classpath: &mut ClassPath, sub: &str, sup: &str) -> bool {
    if sub == sup || sup == "java/lang/Object" {
        return true;
    }
    let mut pending = vec![sub.to_string()];
    let mut seen = Vec::new();
    while let Some(current) = pending.pop() {
        if current == sup {
            return true;
        }
        if seen.contains(&current) {
            continue;
        }
        seen.push(current.clone());
        if let Some(cls) = lookup(classpath, &current) {
            if let Some(super_class) = &cls.super_class {
                pending.push(super_class.clone());
            }
            pending.extend(cls.interfaces.iter().cloned());
        }
    }
    false
}

/// Assignment compatibility used by overload applicability: identity,
/// widening primitive conversion, boxing/unboxing, reference widening, and
/// null to any reference.
pub fn is_assignable(classpath: &mut ClassPath, from: &JType, to: &JType) -> bool {
    if from == to {
        return true;
    }
    if is_widening_primitive(from, to) {
        return true;
    }
    match (from, to) {
        (JType::Null, t) => t.is_reference(),
        // boxing, then reference widening of the wrapper
        (JType::Primitive(kind), JType::Reference(target)) => {
            is_subtype_of(classpath, kind.wrapper_class(), target)
        }
        // unboxing, then widening
        (JType::Reference(source), JType::Primitive(_)) => {
            match PrimitiveKind::from_wrapper(source) {
                Some(kind) => {
                    let unboxed = JType::Primitive(kind);
                    unboxed == *to || is_widening_primitive(&unboxed, to)
                }
                None => false,
            }
        }
        (JType::Reference(sub), JType::Reference(sup)) => is_subtype_of(classpath, sub, sup),
        (JType::Array { .. }, JType::Reference(sup)) => sup == "java/lang/Object",
        (JType::Array { elem: fe, dims: fd }, JType::Array { elem: te, dims: td }) => {
            fd == td
                && match (fe.as_ref(), te.as_ref()) {
                    (JType::Reference(a), JType::Reference(b)) => is_subtype_of(classpath, a, b),
                    (a, b) => a == b,
                }
        }
        _ => false,
    }
}

/// Resolve a field on `class_name`, walking superclasses then interfaces.
pub fn find_field(
    classpath: &mut ClassPath,
    class_name: &str,
    field_name: &str,
) -> Option<ResolvedField> {
    let mut current = Some(class_name.to_string());
    let mut interfaces = Vec::new();
    while let Some(name) = current {
        let cls = lookup(classpath, &name)?;
        for field in &cls.fields {
            if field.name == field_name {
                let ty = JType::from_descriptor(&field.descriptor).ok()?;
                return Some(ResolvedField {
                    owner: cls.name.clone(),
                    name: field.name.clone(),
                    descriptor: field.descriptor.clone(),
                    ty,
                    is_static: field.access_flags & flags::ACC_STATIC != 0,
                });
            }
        }
        interfaces.extend(cls.interfaces.iter().cloned());
        current = cls.super_class.clone();
    }
    for iface in interfaces {
        if let Some(found) = find_field(classpath, &iface, field_name) {
            return Some(found);
        }
    }
    None
}

struct Candidate {
    method: ResolvedMethod,
    /// true when this applies only through the varargs form
    via_varargs: bool,
}

fn gather_candidates(
    classpath: &mut ClassPath,
    class_name: &str,
    method_name: &str,
    args: &[JType],
    is_ctor: bool,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    let mut seen: Vec<(String, String)> = Vec::new();
    let mut pending = vec![class_name.to_string()];
    let mut visited = Vec::new();
    while let Some(current) = pending.pop() {
        if visited.contains(&current) {
            continue;
        }
        visited.push(current.clone());
        let Some(cls) = lookup(classpath, &current) else {
            continue;
        };
        let is_interface = cls.access_flags & flags::ACC_INTERFACE != 0;
        for method in &cls.methods {
            if method.name != method_name {
                continue;
            }
            let key = (method.name.clone(), method.descriptor.clone());
            // a redeclaration lower in the hierarchy wins
            if seen.contains(&key) {
                continue;
            }
            let Ok((params, ret)) = parse_method_descriptor(&method.descriptor) else {
                continue;
            };
            let is_varargs = method.access_flags & flags::ACC_VARARGS != 0;
            let fixed_ok = params.len() == args.len()
                && args.iter().zip(&params).all(|(a, p)| is_assignable(classpath, a, p));
            let varargs_ok = !fixed_ok && is_varargs && !params.is_empty() && {
                let fixed = params.len() - 1;
                args.len() >= fixed
                    && args[..fixed]
                        .iter()
                        .zip(&params[..fixed])
                        .all(|(a, p)| is_assignable(classpath, a, p))
                    && match params[fixed].element() {
                        Some(elem) => {
                            args[fixed..].iter().all(|a| is_assignable(classpath, a, &elem))
                        }
                        None => false,
                    }
            };
            if !fixed_ok && !varargs_ok {
                continue;
            }
            seen.push(key);
            candidates.push(Candidate {
                method: ResolvedMethod {
                    owner: cls.name.clone(),
                    name: method.name.clone(),
                    descriptor: method.descriptor.clone(),
                    is_static: method.access_flags & flags::ACC_STATIC != 0,
                    is_interface,
                    is_varargs,
                    is_private: method.access_flags & flags::ACC_PRIVATE != 0,
                    params,
                    ret,
                },
                via_varargs: varargs_ok,
            });
        }
        // constructors are not inherited
        if is_ctor {
            break;
        }
        if let Some(super_class) = &cls.super_class {
            pending.push(super_class.clone());
        }
        pending.extend(cls.interfaces.iter().cloned());
    }
    candidates
}

/// `a` is at least as specific as `b` when every formal of `a` is
/// assignable to the corresponding formal of `b`.
fn at_least_as_specific(classpath: &mut ClassPath, a: &ResolvedMethod, b: &ResolvedMethod) -> bool {
    a.params.len() == b.params.len()
        && a.params.iter().zip(&b.params).all(|(pa, pb)| is_assignable(classpath, pa, pb))
}

/// Resolve an overloaded call. Applicable candidates are ranked by
/// specificity; a unique most-specific candidate wins, with non-varargs
/// preferred over varargs on ties. No applicable candidate, or two
/// incomparable ones, is a type error.
pub fn resolve_method(
    classpath: &mut ClassPath,
    class_name: &str,
    method_name: &str,
    args: &[JType],
    span: Span,
) -> Result<ResolvedMethod> {
    let is_ctor = method_name == "<init>";
    let mut candidates = gather_candidates(classpath, class_name, method_name, args, is_ctor);
    if candidates.is_empty() {
        if lookup(classpath, class_name).is_none() {
            // unknown owner (e.g. --no-rt with a platform type): synthesize
            // a raw descriptor instead of guessing at conversions
            return Ok(raw_fallback(class_name, method_name, args));
        }
        let shown: Vec<String> = args.iter().map(|a| a.descriptor()).collect();
        return Err(Error::type_error(
            span,
            format!(
                "no applicable method `{}` on {} for arguments ({})",
                method_name,
                class_name,
                shown.join(", ")
            ),
        ));
    }

    // fixed-arity applicability beats varargs applicability outright
    if candidates.iter().any(|c| !c.via_varargs) {
        candidates.retain(|c| !c.via_varargs);
    }
    if candidates.len() == 1 {
        return Ok(candidates.remove(0).method);
    }

    let mut maximal: Vec<usize> = Vec::new();
    'outer: for i in 0..candidates.len() {
        for j in 0..candidates.len() {
            if i == j {
                continue;
            }
            let strictly_less = at_least_as_specific(
                classpath,
                &candidates[j].method,
                &candidates[i].method,
            ) && !at_least_as_specific(
                classpath,
                &candidates[i].method,
                &candidates[j].method,
            );
            if strictly_less {
                continue 'outer;
            }
        }
        maximal.push(i);
    }

    if maximal.len() > 1 {
        // identical erased signatures collapse; otherwise it is ambiguous
        let first = &candidates[maximal[0]].method;
        if maximal.iter().all(|&i| candidates[i].method.descriptor == first.descriptor) {
            return Ok(candidates.swap_remove(maximal[0]).method);
        }
        return Err(Error::type_error(
            span,
            format!("ambiguous call to `{}` on {}", method_name, class_name),
        ));
    }
    match maximal.first() {
        Some(&i) => Ok(candidates.swap_remove(i).method),
        None => Err(Error::type_error(
            span,
            format!("ambiguous call to `{}` on {}", method_name, class_name),
        )),
    }
}

/// Descriptor synthesized when the owner class is unknown: reference and
/// array arguments erase to `java/lang/Object`, primitives stay, and the
/// result is `Object`.
fn raw_fallback(class_name: &str, method_name: &str, args: &[JType]) -> ResolvedMethod {
    let params: Vec<JType> = args
        .iter()
        .map(|a| if a.is_reference() { JType::object() } else { a.clone() })
        .collect();
    let ret = if method_name == "<init>" { JType::Void } else { JType::object() };
    let descriptor = super::types::method_descriptor(&params, &ret);
    ResolvedMethod {
        owner: class_name.to_string(),
        name: method_name.to_string(),
        descriptor,
        is_static: false,
        is_interface: false,
        is_varargs: false,
        is_private: false,
        params,
        ret,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::span::Span;

    fn classpath() -> ClassPath {
        ClassPath::new()
    }

    #[test]
    fn most_specific_println_overload() {
        let mut cp = classpath();
        let resolved = resolve_method(
            &mut cp,
            "java/io/PrintStream",
            "println",
            &[JType::int()],
            Span::synthetic(),
        )
        .unwrap();
        assert_eq!(resolved.descriptor, "(I)V");
    }

    #[test]
    fn boxing_applicability() {
        let mut cp = classpath();
        // println(char) exists, so char picks it; println(Object) would
        // need boxing and is less specific
        let resolved = resolve_method(
            &mut cp,
            "java/io/PrintStream",
            "println",
            &[JType::char()],
            Span::synthetic(),
        )
        .unwrap();
        assert_eq!(resolved.descriptor, "(C)V");
    }

    #[test]
    fn no_applicable_candidate_is_a_type_error() {
        let mut cp = classpath();
        let err = resolve_method(
            &mut cp,
            "java/lang/Math",
            "sqrt",
            &[JType::object()],
            Span::synthetic(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Type { .. }));
    }

    #[test]
    fn inherited_methods_are_found() {
        let mut cp = classpath();
        let resolved = resolve_method(
            &mut cp,
            "java/lang/Integer",
            "toString",
            &[],
            Span::synthetic(),
        )
        .unwrap();
        assert_eq!(resolved.descriptor, "()Ljava/lang/String;");
        assert_eq!(resolved.owner, "java/lang/Integer");
    }

    #[test]
    fn field_resolution_records_declaring_owner() {
        let mut cp = classpath();
        let field = find_field(&mut cp, "java/lang/System", "out").unwrap();
        assert_eq!(field.owner, "java/lang/System");
        assert_eq!(field.descriptor, "Ljava/io/PrintStream;");
        assert!(field.is_static);
    }

    #[test]
    fn subtype_walks_hierarchy() {
        let mut cp = classpath();
        assert!(is_subtype_of(&mut cp, "java/lang/Integer", "java/lang/Number"));
        assert!(is_subtype_of(
            &mut cp,
            "java/lang/ArithmeticException",
            "java/lang/Exception"
        ));
        assert!(!is_subtype_of(&mut cp, "java/lang/Number", "java/lang/Integer"));
    }
}
