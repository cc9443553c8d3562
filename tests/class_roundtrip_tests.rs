//! Class-file roundtrip: everything the compiler declares must come back
//! out of an independent parse of the bytes it wrote.

mod common;

use common::*;
use jopac::codegen::class::flags;

#[test]
fn roundtrip_recovers_fields_methods_and_supers() {
    let classes = compile_source(
        r#"
public class Animal {
    protected String name;
    private static int count;

    public Animal(String name) {
        this.name = name;
    }

    public String getName() {
        return name;
    }

    static int getCount() {
        return count;
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Animal");

    assert_eq!(parsed.name, "Animal");
    assert_eq!(parsed.super_class.as_deref(), Some("java/lang/Object"));
    assert_eq!(parsed.access_flags & flags::ACC_PUBLIC, flags::ACC_PUBLIC);
    assert_eq!(parsed.version.0, 50);

    let name_field = parsed.fields.iter().find(|f| f.name == "name").unwrap();
    assert_eq!(name_field.descriptor, "Ljava/lang/String;");
    assert_eq!(name_field.access_flags & flags::ACC_PROTECTED, flags::ACC_PROTECTED);

    let count_field = parsed.fields.iter().find(|f| f.name == "count").unwrap();
    assert_eq!(count_field.descriptor, "I");
    assert!(count_field.access_flags & flags::ACC_STATIC != 0);

    let ctor = find_method(&parsed, "<init>");
    assert_eq!(ctor.descriptor, "(Ljava/lang/String;)V");

    let getter = find_method(&parsed, "getName");
    assert_eq!(getter.descriptor, "()Ljava/lang/String;");
    assert!(getter.access_flags & flags::ACC_STATIC == 0);

    let counter = find_method(&parsed, "getCount");
    assert!(counter.access_flags & flags::ACC_STATIC != 0);
}

#[test]
fn roundtrip_recovers_interfaces() {
    let classes = compile_source(
        r#"
interface Shape {
    double area();
}

class Circle implements Shape {
    double radius;

    public double area() {
        return radius * radius * 3.141592653589793;
    }
}
"#,
    );
    let shape = parse_single(&classes, "Shape");
    assert!(shape.access_flags & flags::ACC_INTERFACE != 0);
    assert!(shape.access_flags & flags::ACC_ABSTRACT != 0);
    let area = find_method(&shape, "area");
    assert!(area.access_flags & flags::ACC_ABSTRACT != 0);
    assert!(area.code.is_none());

    let circle = parse_single(&classes, "Circle");
    assert_eq!(circle.interfaces, vec!["Shape".to_string()]);
    assert!(find_method(&circle, "area").code.is_some());
}

#[test]
fn magic_and_default_version() {
    let classes = compile_source("class A {}");
    let bytes = &classes["A"];
    assert_eq!(&bytes[0..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
    assert_eq!(&bytes[4..8], &[0, 0, 0, 50]); // minor 0, major 50
}

#[test]
fn package_becomes_directory_component() {
    let classes = compile_source(
        r#"
package com.example;

public class Thing {}
"#,
    );
    assert!(classes.contains_key("com/example/Thing"));
    let parsed = parse_single(&classes, "com/example/Thing");
    assert_eq!(parsed.name, "com/example/Thing");
}

#[test]
fn default_constructor_is_generated() {
    let classes = compile_source("class Bare {}");
    let parsed = parse_single(&classes, "Bare");
    let ctor = find_method(&parsed, "<init>");
    assert_eq!(ctor.descriptor, "()V");
    let code = ctor.code.as_ref().unwrap();
    // aload_0; invokespecial Object.<init>; return
    assert_eq!(code.code[0], 0x2A);
    assert_eq!(code.code[1], 0xB7);
    assert_eq!(*code.code.last().unwrap(), 0xB1);
}

#[test]
fn static_final_literal_gets_constant_value() {
    let classes = compile_source(
        r#"
class Constants {
    static final int ANSWER = 42;
    static final String GREETING = "hello";
    static final long BIG = 1L;
}
"#,
    );
    let bytes = &classes["Constants"];
    assert!(bytes_contain(bytes, "ConstantValue"));
    // nothing to run at class initialization: all initializers are constant
    let parsed = parse_single(&classes, "Constants");
    assert!(parsed.methods.iter().all(|m| m.name != "<clinit>"));
}

#[test]
fn source_file_attribute_is_written() {
    let classes = compile_source("class WithSource {}");
    assert!(bytes_contain(&classes["WithSource"], "SourceFile"));
}

#[test]
fn generic_class_carries_signature() {
    let classes = compile_source(
        r#"
class Box<T> {
    T value;

    void set(T value) {
        this.value = value;
    }

    T get() {
        return value;
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Box");
    // erasure: T becomes Object in descriptors
    assert_eq!(find_method(&parsed, "set").descriptor, "(Ljava/lang/Object;)V");
    assert_eq!(find_method(&parsed, "get").descriptor, "()Ljava/lang/Object;");
    // the generic shape survives in Signature attributes
    assert_eq!(find_method(&parsed, "get").signature.as_deref(), Some("()TT;"));
    let field = parsed.fields.iter().find(|f| f.name == "value").unwrap();
    assert_eq!(field.signature.as_deref(), Some("TT;"));
    assert!(bytes_contain(&classes["Box"], "<T:Ljava/lang/Object;>"));
}

#[test]
fn subclassing_erased_generics_compiles_against_object_descriptors() {
    let classes = compile_source(
        r#"
class Box<T> {
    T v;
    void set(T v) { this.v = v; }
    T get() { return v; }
}

class StringBox extends Box {
    void set(String v) { super.set(v); }
    String get() { return (String) super.get(); }
}
"#,
    );
    let sub = parse_single(&classes, "StringBox");
    assert_eq!(find_method(&sub, "set").descriptor, "(Ljava/lang/String;)V");
    assert_eq!(find_method(&sub, "get").descriptor, "()Ljava/lang/String;");
    // the specialized getter downcasts the erased Object result
    let code = method_code(&sub, "get");
    assert!(code.code.contains(&0xC0), "expected a checkcast in StringBox.get");
}
