//! Higher-level lowerings: varargs, inheritance, enums, nested classes,
//! lambdas, annotations, package-info.

mod common;

use common::*;
use jopac::codegen::class::flags;

#[test]
fn varargs_call_packs_trailing_arguments() {
    let classes = compile_source(
        r#"
class Sums {
    int sum(int... xs) {
        int total = 0;
        for (int x : xs) {
            total += x;
        }
        return total;
    }

    int six() {
        return sum(1, 2, 3);
    }

    int thirty() {
        return sum(10, 20);
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Sums");
    let sum = find_method(&parsed, "sum");
    assert!(sum.access_flags & flags::ACC_VARARGS != 0);
    assert_eq!(sum.descriptor, "([I)I");

    for name in ["six", "thirty"] {
        let code = method_code(&parsed, name);
        assert!(code.code.contains(&0xBC), "{} should allocate an int[]", name);
        assert!(code.code.contains(&0x4F), "{} should iastore each vararg", name);
    }
}

#[test]
fn explicit_array_bypasses_packing() {
    let classes = compile_source(
        r#"
class Pass {
    int sum(int... xs) {
        return xs.length;
    }

    int forward(int[] xs) {
        return sum(xs);
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Pass");
    let code = method_code(&parsed, "forward");
    assert!(!code.code.contains(&0xBC), "existing array should be passed through");
}

#[test]
fn super_constructor_call_is_forwarded() {
    let classes = compile_source(
        r#"
class Animal {
    String n;

    Animal(String n) {
        this.n = n;
    }
}

class Dog extends Animal {
    Dog(String n) {
        super(n);
    }
}
"#,
    );
    let dog = parse_single(&classes, "Dog");
    assert_eq!(dog.super_class.as_deref(), Some("Animal"));
    let ctor = method_code(&dog, "<init>");
    // aload_0; aload_1; invokespecial Animal.<init>(String)V
    assert_eq!(ctor.code[0], 0x2A);
    assert_eq!(ctor.code[1], 0x2B);
    assert_eq!(ctor.code[2], 0xB7);
    assert!(bytes_contain(&classes["Dog"], "(Ljava/lang/String;)V"));
}

#[test]
fn field_initializers_run_after_super_call() {
    let classes = compile_source(
        r#"
class Defaults {
    int x = 7;
    String s = "hi";
}
"#,
    );
    let parsed = parse_single(&classes, "Defaults");
    let ctor = method_code(&parsed, "<init>");
    // super call first, then two putfields
    assert_eq!(ctor.code[0], 0x2A);
    assert_eq!(ctor.code[1], 0xB7);
    let putfields = ctor.code.iter().filter(|&&b| b == 0xB5).count();
    assert_eq!(putfields, 2);
}

#[test]
fn enum_lowering_shape() {
    let classes = compile_source(
        r#"
enum Size {
    SMALL(1), MEDIUM(2), LARGE(3);

    int v;

    Size(int v) {
        this.v = v;
    }

    int get() {
        return v;
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Size");
    assert_eq!(parsed.super_class.as_deref(), Some("java/lang/Enum"));
    assert!(parsed.access_flags & flags::ACC_ENUM != 0);

    // constants in declaration order, then the user field, then $VALUES
    let enum_fields: Vec<&str> = parsed
        .fields
        .iter()
        .filter(|f| f.access_flags & flags::ACC_ENUM != 0)
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(enum_fields, vec!["SMALL", "MEDIUM", "LARGE"]);
    let values_field = parsed.fields.iter().find(|f| f.name == "$VALUES").unwrap();
    assert_eq!(values_field.descriptor, "[LSize;");
    assert!(values_field.access_flags & flags::ACC_SYNTHETIC != 0);

    // the constructor takes the (name, ordinal) prefix and is private
    let ctor = find_method(&parsed, "<init>");
    assert_eq!(ctor.descriptor, "(Ljava/lang/String;II)V");
    assert!(ctor.access_flags & flags::ACC_PRIVATE != 0);

    // synthetic accessors
    assert_eq!(find_method(&parsed, "values").descriptor, "()[LSize;");
    assert_eq!(find_method(&parsed, "valueOf").descriptor, "(Ljava/lang/String;)LSize;");
    assert_eq!(find_method(&parsed, "get").descriptor, "()I");

    // <clinit> creates the constants, then assembles $VALUES
    let clinit = method_code(&parsed, "<clinit>");
    let new_count = clinit.code.iter().filter(|&&b| b == 0xBB).count();
    assert_eq!(new_count, 3);
    assert!(clinit.code.contains(&0xBD), "anewarray for $VALUES");
    let putstatics = clinit.code.iter().filter(|&&b| b == 0xB3).count();
    assert_eq!(putstatics, 4); // three constants + $VALUES
}

#[test]
fn static_nested_class_emits_separate_file_and_inner_classes_attr() {
    let classes = compile_source(
        r#"
class Outer {
    static int shared;

    static class Inner {
        int f() {
            return shared;
        }
    }
}
"#,
    );
    assert!(classes.contains_key("Outer"));
    assert!(classes.contains_key("Outer$Inner"));
    assert!(bytes_contain(&classes["Outer"], "InnerClasses"));
    assert!(bytes_contain(&classes["Outer$Inner"], "InnerClasses"));
    let inner = parse_single(&classes, "Outer$Inner");
    assert_eq!(inner.name, "Outer$Inner");
}

#[test]
fn lambda_emits_invokedynamic_and_java8_version() {
    let classes = compile_source(
        r#"
import java.util.function.Function;

class Doubler {
    int apply(int x) {
        Function<Integer, Integer> f = n -> n * 2;
        return f.apply(x);
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Doubler");
    // invokedynamic forces the Java 8 class-file version
    assert_eq!(parsed.version.0, 52);
    let code = method_code(&parsed, "apply");
    assert!(code.code.contains(&0xBA), "expected invokedynamic");

    // a synthetic static body method carries the lambda
    let synthetic = parsed
        .methods
        .iter()
        .find(|m| m.name.starts_with("lambda$"))
        .expect("synthetic lambda method");
    assert!(synthetic.access_flags & flags::ACC_SYNTHETIC != 0);
    assert!(synthetic.access_flags & flags::ACC_STATIC != 0);
    assert_eq!(synthetic.descriptor, "(Ljava/lang/Integer;)Ljava/lang/Integer;");

    let bytes = &classes["Doubler"];
    assert!(bytes_contain(bytes, "BootstrapMethods"));
    assert!(bytes_contain(bytes, "java/lang/invoke/LambdaMetafactory"));
    assert!(bytes_contain(bytes, "metafactory"));
}

#[test]
fn lambda_captures_become_leading_arguments() {
    let classes = compile_source(
        r#"
import java.util.function.Supplier;

class Capture {
    Supplier<String> make(String prefix) {
        String suffix = "!";
        Supplier<String> s = () -> prefix + suffix;
        return s;
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Capture");
    let synthetic = parsed
        .methods
        .iter()
        .find(|m| m.name.starts_with("lambda$"))
        .expect("synthetic lambda method");
    // both captured strings lead the synthetic signature
    assert_eq!(
        synthetic.descriptor,
        "(Ljava/lang/String;Ljava/lang/String;)Ljava/lang/String;"
    );
}

#[test]
fn runnable_lambda_targets_declared_interface() {
    let classes = compile_source(
        r#"
class Tasks {
    Runnable task() {
        Runnable r = () -> System.out.println("go");
        return r;
    }
}
"#,
    );
    let bytes = &classes["Tasks"];
    assert!(bytes_contain(bytes, "run"));
    assert!(bytes_contain(bytes, "()Ljava/lang/Runnable;"));
}

#[test]
fn override_annotation_is_recorded() {
    let classes = compile_source(
        r#"
class Base {
    String describe() {
        return "base";
    }
}

class Derived extends Base {
    @Override
    String describe() {
        return "derived";
    }
}
"#,
    );
    let bytes = &classes["Derived"];
    assert!(bytes_contain(bytes, "RuntimeVisibleAnnotations"));
    assert!(bytes_contain(bytes, "Ljava/lang/Override;"));
}

#[test]
fn package_info_compiles_to_synthetic_interface() {
    let classes = compile_source(
        r#"
@Deprecated
package com.example.util;
"#,
    );
    let parsed = parse_single(&classes, "com/example/util/package-info");
    assert!(parsed.access_flags & flags::ACC_INTERFACE != 0);
    assert!(parsed.access_flags & flags::ACC_SYNTHETIC != 0);
    assert!(bytes_contain(
        &classes["com/example/util/package-info"],
        "Ljava/lang/Deprecated;"
    ));
}

#[test]
fn throws_clause_becomes_exceptions_attribute() {
    let classes = compile_source(
        r#"
class Risky {
    void danger() throws RuntimeException, IllegalStateException {
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Risky");
    let method = find_method(&parsed, "danger");
    assert_eq!(
        method.exceptions,
        vec![
            "java/lang/RuntimeException".to_string(),
            "java/lang/IllegalStateException".to_string()
        ]
    );
}

#[test]
fn method_parameters_attribute_carries_names() {
    let classes = compile_source(
        r#"
class Named {
    int add(int left, int right) {
        return left + right;
    }
}
"#,
    );
    let bytes = &classes["Named"];
    assert!(bytes_contain(bytes, "MethodParameters"));
    assert!(bytes_contain(bytes, "left"));
    assert!(bytes_contain(bytes, "right"));
}

#[test]
fn interface_constants_and_default_methods() {
    let classes = compile_source(
        r#"
interface Config {
    int LIMIT = 10;

    int limit();

    default int doubled() {
        return limit() * 2;
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Config");
    let constant = parsed.fields.iter().find(|f| f.name == "LIMIT").unwrap();
    assert!(constant.access_flags & flags::ACC_STATIC != 0);
    assert!(constant.access_flags & flags::ACC_FINAL != 0);
    // the default method keeps its body, the abstract one has none
    assert!(find_method(&parsed, "doubled").code.is_some());
    assert!(find_method(&parsed, "limit").code.is_none());
}
