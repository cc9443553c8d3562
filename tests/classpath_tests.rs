//! Classpath lookup: directories, archives, in-process registration, and
//! the built-in platform descriptions.

mod common;

use common::*;
use jopac::codegen::classpath::ClassPath;
use jopac::{Config, SourceFile};
use std::fs;
use tempfile::TempDir;

#[test]
fn directory_entries_are_looked_up_by_internal_name() {
    let temp = TempDir::new().unwrap();
    let classes = compile_source("package lib; public class Helper { public int id() { return 4; } }");
    let lib_dir = temp.path().join("lib");
    fs::create_dir_all(&lib_dir).unwrap();
    fs::write(lib_dir.join("Helper.class"), &classes["lib/Helper"]).unwrap();

    let mut classpath = ClassPath::new();
    classpath.add_directory(temp.path());
    let found = classpath.find("lib/Helper").expect("class should be found on disk");
    assert_eq!(found.name, "lib/Helper");
    assert!(found.methods.iter().any(|m| m.name == "id"));
    assert!(!classpath.contains("lib/Absent"));
}

#[test]
fn in_process_registration_shadows_disk() {
    let temp = TempDir::new().unwrap();
    let classes = compile_source("public class Twice { public int v() { return 1; } }");
    fs::write(temp.path().join("Twice.class"), &classes["Twice"]).unwrap();

    let mut classpath = ClassPath::new();
    classpath.add_directory(temp.path());

    let newer = compile_source("public class Twice { public int v() { return 2; } public int w() { return 3; } }");
    let parsed = jopac::codegen::class_reader::parse_class(&newer["Twice"]).unwrap();
    classpath.register(parsed);

    let found = classpath.find("Twice").unwrap();
    assert!(found.methods.iter().any(|m| m.name == "w"), "in-process copy should win");
}

#[test]
fn builtins_answer_when_nothing_else_does() {
    let mut classpath = ClassPath::new();
    let object = classpath.find("java/lang/Object").unwrap();
    assert!(object.super_class.is_none());
    let system = classpath.find("java/lang/System").unwrap();
    assert!(system.fields.iter().any(|f| f.name == "out"));
    assert!(classpath.find("java/lang/NoSuchThing").is_none());
}

#[test]
fn cross_unit_references_compile_in_either_order() {
    // B references A, but B is listed first: skeleton registration absorbs
    // the forward reference
    let sources = [
        SourceFile {
            name: "B.java".to_string(),
            text: r#"
class B {
    int twice() {
        return new A().value() * 2;
    }
}
"#
            .to_string(),
        },
        SourceFile {
            name: "A.java".to_string(),
            text: r#"
class A {
    int value() {
        return 21;
    }
}
"#
            .to_string(),
        },
    ];
    let config = Config::default().without_runtime();
    let outcome = jopac::compile_sources(&sources, &config).unwrap();
    assert!(outcome.is_success(), "errors: {:?}", outcome.errors);
    assert!(outcome.classes.contains_key("A"));
    assert!(outcome.classes.contains_key("B"));
}

#[test]
fn mutually_recursive_units_compile() {
    let sources = [
        SourceFile {
            name: "Ping.java".to_string(),
            text: "class Ping { Pong other; int tag() { return 1; } }".to_string(),
        },
        SourceFile {
            name: "Pong.java".to_string(),
            text: "class Pong { Ping other; int tag() { return 2; } }".to_string(),
        },
    ];
    let config = Config::default().without_runtime();
    let outcome = jopac::compile_sources(&sources, &config).unwrap();
    assert!(outcome.is_success(), "errors: {:?}", outcome.errors);
}

#[test]
fn failing_unit_does_not_block_siblings() {
    let sources = [
        SourceFile {
            name: "Good.java".to_string(),
            text: "class Good { int ok() { return 1; } }".to_string(),
        },
        SourceFile {
            name: "Bad.java".to_string(),
            text: "class Bad { int broken() { return undefinedName; } }".to_string(),
        },
    ];
    let config = Config::default().without_runtime();
    let outcome = jopac::compile_sources(&sources, &config).unwrap();
    assert!(outcome.classes.contains_key("Good"));
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].0, "Bad.java");
}
