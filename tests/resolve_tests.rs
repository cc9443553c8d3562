//! Overload-resolution laws: most-specific selection, applicability
//! failures, ambiguity, and varargs tie-breaking.

use jopac::codegen::classpath::ClassPath;
use jopac::codegen::gen;
use jopac::codegen::resolve::{self, ResolvedMethod};
use jopac::codegen::types::JType;
use jopac::parser::parse_java;
use jopac::parser::span::Span;
use jopac::Error;

/// Register a source's type signatures and return the classpath.
fn classpath_with(source: &str) -> ClassPath {
    let unit = parse_java(source, "Test.java").expect("test source should parse");
    let mut classpath = ClassPath::new();
    gen::register_names(&mut classpath, &unit);
    gen::register_unit(&mut classpath, &unit).expect("signatures should register");
    classpath
}

fn resolve(
    classpath: &mut ClassPath,
    owner: &str,
    name: &str,
    args: &[JType],
) -> Result<ResolvedMethod, Error> {
    resolve::resolve_method(classpath, owner, name, args, Span::synthetic())
}

#[test]
fn unique_most_specific_candidate_wins() {
    let mut cp = classpath_with(
        r#"
class Overloads {
    void m(int x) {}
    void m(long x) {}
    void m(Object x) {}
}
"#,
    );
    let picked = resolve(&mut cp, "Overloads", "m", &[JType::int()]).unwrap();
    assert_eq!(picked.descriptor, "(I)V");

    let picked = resolve(&mut cp, "Overloads", "m", &[JType::long()]).unwrap();
    assert_eq!(picked.descriptor, "(J)V");

    let picked = resolve(&mut cp, "Overloads", "m", &[JType::string()]).unwrap();
    assert_eq!(picked.descriptor, "(Ljava/lang/Object;)V");
}

#[test]
fn no_applicable_candidate_is_a_type_error() {
    let mut cp = classpath_with(
        r#"
class Narrow {
    void m(int x) {}
}
"#,
    );
    let err = resolve(&mut cp, "Narrow", "m", &[JType::string()]).unwrap_err();
    assert!(matches!(err, Error::Type { .. }), "got {:?}", err);

    let err = resolve(&mut cp, "Narrow", "missing", &[]).unwrap_err();
    assert!(matches!(err, Error::Type { .. }));
}

#[test]
fn incomparable_candidates_are_ambiguous() {
    let mut cp = classpath_with(
        r#"
class Ambiguous {
    void m(int a, long b) {}
    void m(long a, int b) {}
}
"#,
    );
    let err =
        resolve(&mut cp, "Ambiguous", "m", &[JType::int(), JType::int()]).unwrap_err();
    assert!(matches!(err, Error::Type { .. }), "got {:?}", err);
}

#[test]
fn fixed_arity_beats_varargs() {
    let mut cp = classpath_with(
        r#"
class Mixed {
    void m(int x) {}
    void m(int... xs) {}
}
"#,
    );
    let picked = resolve(&mut cp, "Mixed", "m", &[JType::int()]).unwrap();
    assert_eq!(picked.descriptor, "(I)V");
    assert!(!picked.is_varargs);

    // two arguments only fit the varargs form
    let picked = resolve(&mut cp, "Mixed", "m", &[JType::int(), JType::int()]).unwrap();
    assert_eq!(picked.descriptor, "([I)V");
    assert!(picked.is_varargs);
}

#[test]
fn inherited_candidates_come_from_superclasses() {
    let mut cp = classpath_with(
        r#"
class Base {
    void greet(String s) {}
}

class Derived extends Base {
}
"#,
    );
    let picked = resolve(&mut cp, "Derived", "greet", &[JType::string()]).unwrap();
    assert_eq!(picked.owner, "Base");
}

#[test]
fn override_shadows_inherited_declaration() {
    let mut cp = classpath_with(
        r#"
class Base {
    void greet(String s) {}
}

class Derived extends Base {
    void greet(String s) {}
}
"#,
    );
    let picked = resolve(&mut cp, "Derived", "greet", &[JType::string()]).unwrap();
    assert_eq!(picked.owner, "Derived");
}

#[test]
fn boxing_makes_wrapper_parameters_applicable() {
    let mut cp = classpath_with(
        r#"
class Boxy {
    void m(Integer x) {}
}
"#,
    );
    let picked = resolve(&mut cp, "Boxy", "m", &[JType::int()]).unwrap();
    assert_eq!(picked.descriptor, "(Ljava/lang/Integer;)V");
}

#[test]
fn class_name_lookup_order() {
    let source = r#"
package app;

import java.util.function.Function;
import java.util.*;

class Thing {
    static class Nested {}
}
"#;
    let unit = parse_java(source, "Thing.java").unwrap();
    let mut classpath = ClassPath::new();
    gen::register_names(&mut classpath, &unit);
    gen::register_unit(&mut classpath, &unit).unwrap();
    let scope = gen::unit_scope(&unit);

    // single-type import
    let resolved = resolve::resolve_class_name(
        &mut classpath,
        &scope,
        None,
        "Function",
        Span::synthetic(),
    )
    .unwrap();
    assert_eq!(resolved, "java/util/function/Function");

    // same package
    let resolved =
        resolve::resolve_class_name(&mut classpath, &scope, None, "Thing", Span::synthetic())
            .unwrap();
    assert_eq!(resolved, "app/Thing");

    // nested class of the enclosing type
    let resolved = resolve::resolve_class_name(
        &mut classpath,
        &scope,
        Some("app/Thing"),
        "Nested",
        Span::synthetic(),
    )
    .unwrap();
    assert_eq!(resolved, "app/Thing$Nested");

    // wildcard import
    let resolved = resolve::resolve_class_name(
        &mut classpath,
        &scope,
        None,
        "Iterator",
        Span::synthetic(),
    )
    .unwrap();
    assert_eq!(resolved, "java/util/Iterator");

    // implicit java.lang
    let resolved =
        resolve::resolve_class_name(&mut classpath, &scope, None, "String", Span::synthetic())
            .unwrap();
    assert_eq!(resolved, "java/lang/String");

    // a miss reports the attempted candidates
    let err =
        resolve::resolve_class_name(&mut classpath, &scope, None, "Nowhere", Span::synthetic())
            .unwrap_err();
    assert!(matches!(err, Error::NameResolution { .. }));
    assert!(err.to_string().contains("app/Nowhere"));
}

#[test]
fn field_resolution_walks_supers_and_records_owner() {
    let source = r#"
class Top {
    protected int shared;
}

class Bottom extends Top {
}
"#;
    let unit = parse_java(source, "Test.java").unwrap();
    let mut classpath = ClassPath::new();
    gen::register_names(&mut classpath, &unit);
    gen::register_unit(&mut classpath, &unit).unwrap();

    let field = resolve::find_field(&mut classpath, "Bottom", "shared").unwrap();
    assert_eq!(field.owner, "Top");
    assert_eq!(field.descriptor, "I");
}
