//! Parser coverage: declaration shapes, statement forms, disambiguation
//! corners, and rejection of the explicitly unsupported constructs.

use jopac::ast::{printer, ClassMember, ExprKind, Stmt, StmtKind, TypeDecl};
use jopac::parser::parse_java;
use jopac::Error;

fn parse(source: &str) -> jopac::ast::CompilationUnit {
    parse_java(source, "Test.java").expect("source should parse")
}

#[test]
fn switch_with_cases_and_default() {
    let unit = parse(
        r#"
package p;

class A {
    void m(int x) {
        switch (x) {
            case 1:
            case 2:
                return;
            default:
                return;
        }
    }
}
"#,
    );
    let TypeDecl::Class(class) = &unit.types[0] else {
        panic!("expected a class");
    };
    let method = class
        .body
        .iter()
        .find_map(|m| match m {
            ClassMember::Method(m) if m.name == "m" => Some(m),
            _ => None,
        })
        .expect("method m not found");
    let body = method.body.as_ref().expect("method body missing");
    let Some(Stmt { kind: StmtKind::Switch { cases, .. }, .. }) = body.statements.first() else {
        panic!("expected a switch statement");
    };
    assert_eq!(cases.len(), 2);
    assert_eq!(cases[0].labels.len(), 2);
    assert!(cases[1].labels[0].is_none(), "second group is the default");
}

#[test]
fn imports_and_package() {
    let unit = parse(
        r#"
package com.example.app;

import java.util.List;
import java.util.*;
import static java.lang.Math.max;

class Empty {}
"#,
    );
    assert_eq!(unit.package.as_ref().unwrap().name, "com.example.app");
    assert_eq!(unit.imports.len(), 3);
    assert!(unit.imports[1].is_wildcard);
    assert!(unit.imports[2].is_static);
}

#[test]
fn generic_declarations_parse() {
    let unit = parse(
        r#"
class Pair<K, V extends Comparable<V>> {
    K key;
    V value;

    <T> T identity(T x) {
        return x;
    }

    java.util.Map<K, java.util.List<V>> grouped() {
        return null;
    }
}
"#,
    );
    let TypeDecl::Class(class) = &unit.types[0] else {
        panic!()
    };
    assert_eq!(class.type_params.len(), 2);
    assert_eq!(class.type_params[1].bounds.len(), 1);
}

#[test]
fn nested_generic_close_splits_shift_tokens() {
    // the `>>` at the end must close two type argument lists
    parse("class G { java.util.List<java.util.List<String>> xs; }");
    parse("class H { java.util.Map<String, java.util.Map<String, Integer>> m; }");
}

#[test]
fn cast_versus_parenthesized_expression() {
    let unit = parse(
        r#"
class Casts {
    int a(Object o) {
        return (int) (Integer) o;
    }

    int b(int x) {
        return (x) + 1;
    }

    int c(int x, int y) {
        return (x) - y;
    }
}
"#,
    );
    let TypeDecl::Class(class) = &unit.types[0] else {
        panic!()
    };
    // method c: (x) - y must parse as subtraction, not a cast of -y
    let method = class
        .body
        .iter()
        .find_map(|m| match m {
            ClassMember::Method(m) if m.name == "c" => Some(m),
            _ => None,
        })
        .unwrap();
    let body = method.body.as_ref().unwrap();
    let Some(Stmt { kind: StmtKind::Return { value: Some(expr) }, .. }) = body.statements.first()
    else {
        panic!("expected return");
    };
    assert!(matches!(expr.kind, ExprKind::Binary { .. }));
}

#[test]
fn lambda_forms() {
    parse(
        r#"
class Lambdas {
    void all() {
        Runnable a = () -> System.out.println("x");
        java.util.function.Function<Integer, Integer> b = v -> v + 1;
        java.util.function.BiFunction<Integer, Integer, Integer> c = (p, q) -> p * q;
        java.util.function.Function<String, Integer> d = (String s) -> s.length();
        Runnable e = () -> {
            int t = 0;
            t++;
        };
    }
}
"#,
    );
}

#[test]
fn local_declaration_versus_expression_statement() {
    let unit = parse(
        r#"
class Mixed {
    int f;

    void m() {
        int x = 1;
        x = 2;
        f = x;
        this.f = x;
        m();
    }
}
"#,
    );
    let TypeDecl::Class(class) = &unit.types[0] else {
        panic!()
    };
    let method = class
        .body
        .iter()
        .find_map(|m| match m {
            ClassMember::Method(m) if m.name == "m" => Some(m),
            _ => None,
        })
        .unwrap();
    let statements = &method.body.as_ref().unwrap().statements;
    assert!(matches!(statements[0].kind, StmtKind::LocalVar { .. }));
    for stmt in &statements[1..] {
        assert!(matches!(stmt.kind, StmtKind::Expr(_)), "got {:?}", stmt.kind);
    }
}

#[test]
fn enum_with_constructor_arguments() {
    let unit = parse(
        r#"
enum Planet {
    MERCURY(3.3), VENUS(4.9);

    final double mass;

    Planet(double mass) {
        this.mass = mass;
    }
}
"#,
    );
    let TypeDecl::Enum(decl) = &unit.types[0] else {
        panic!("expected an enum")
    };
    assert_eq!(decl.constants.len(), 2);
    assert_eq!(decl.constants[0].args.len(), 1);
    assert_eq!(decl.body.len(), 2); // field + constructor
}

#[test]
fn parse_errors_carry_positions() {
    let err = parse_java("class A {", "A.java").unwrap_err();
    let Error::Parse { span, .. } = err else {
        panic!("expected a parse error, got {:?}", err);
    };
    assert_eq!(span.start.line, 1);
}

#[test]
fn unsupported_constructs_are_rejected_by_kind() {
    let err = parse_java(
        "class A { void m() { try (X x = open()) { } } }",
        "A.java",
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnsupportedFeature { .. }), "got {:?}", err);

    let err = parse_java(
        "class A { Runnable m() { return new Runnable() { public void run() {} }; } }",
        "A.java",
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnsupportedFeature { .. }), "got {:?}", err);
}

#[test]
fn json_dump_shape() {
    let unit = parse(
        r#"
package app;

class Point {
    int x;
    int y;

    int norm() {
        return x * x + y * y;
    }
}
"#,
    );
    let json = printer::to_json(&unit);
    assert!(json.contains("\"kind\": \"CompilationUnit\""));
    assert!(json.contains("\"package\": \"app\""));
    assert!(json.contains("\"kind\": \"Class\""));
    assert!(json.contains("\"name\": \"Point\""));
    assert!(json.contains("\"kind\": \"Field\""));
    assert!(json.contains("\"returns\": \"int\""));
}

#[test]
fn character_and_string_escapes() {
    let unit = parse(
        r#"
class Esc {
    char nl = '\n';
    char uni = 'A';
    String s = "a\tb\\c\"d";
}
"#,
    );
    let TypeDecl::Class(class) = &unit.types[0] else {
        panic!()
    };
    let field_inits: Vec<_> = class
        .body
        .iter()
        .filter_map(|m| match m {
            ClassMember::Field(f) => f.declarators[0].init.as_ref(),
            _ => None,
        })
        .collect();
    use jopac::ast::Literal;
    assert!(matches!(field_inits[0].kind, ExprKind::Literal(Literal::Char(10))));
    assert!(matches!(field_inits[1].kind, ExprKind::Literal(Literal::Char(65))));
    assert!(
        matches!(&field_inits[2].kind, ExprKind::Literal(Literal::Str(s)) if s == "a\tb\\c\"d")
    );
}
