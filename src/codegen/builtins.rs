//! Built-in platform class descriptions.
//!
//! A small table of the `java.lang`/`java.io`/`java.util.function` surface
//! the generated code leans on. The classpath consults it only after every
//! real entry missed, so a genuine runtime archive always wins; without one
//! (`--no-rt`, or no `JAVA_HOME`) these keep resolution of the printing,
//! wrapper, enum and functional-interface machinery working.

use super::class::flags;
use super::class_reader::{ParsedClass, ParsedField, ParsedMethod};

const PUB: u16 = flags::ACC_PUBLIC;
const PUB_STATIC: u16 = flags::ACC_PUBLIC | flags::ACC_STATIC;
const PUB_ABSTRACT: u16 = flags::ACC_PUBLIC | flags::ACC_ABSTRACT;
const IFACE: u16 = flags::ACC_PUBLIC | flags::ACC_INTERFACE | flags::ACC_ABSTRACT;

fn method(access_flags: u16, name: &str, descriptor: &str) -> ParsedMethod {
    ParsedMethod {
        access_flags,
        name: name.to_string(),
        descriptor: descriptor.to_string(),
        signature: None,
        exceptions: Vec::new(),
        code: None,
    }
}

fn varargs(access_flags: u16, name: &str, descriptor: &str) -> ParsedMethod {
    method(access_flags | flags::ACC_VARARGS, name, descriptor)
}

fn field(access_flags: u16, name: &str, descriptor: &str) -> ParsedField {
    ParsedField {
        access_flags,
        name: name.to_string(),
        descriptor: descriptor.to_string(),
        signature: None,
    }
}

fn class(
    access_flags: u16,
    name: &str,
    super_class: Option<&str>,
    interfaces: &[&str],
    fields: Vec<ParsedField>,
    methods: Vec<ParsedMethod>,
) -> ParsedClass {
    ParsedClass {
        version: (50, 0),
        access_flags,
        name: name.to_string(),
        super_class: super_class.map(str::to_string),
        interfaces: interfaces.iter().map(|s| s.to_string()).collect(),
        fields,
        methods,
    }
}

fn wrapper(name: &str, prim: char, value_method: &str) -> ParsedClass {
    let internal = format!("java/lang/{}", name);
    let value_of = format!("({})L{};", prim, internal);
    class(
        PUB | flags::ACC_FINAL,
        &internal,
        Some(if matches!(prim, 'Z' | 'C') { "java/lang/Object" } else { "java/lang/Number" }),
        &["java/lang/Comparable"],
        vec![
            field(PUB_STATIC | flags::ACC_FINAL, "MAX_VALUE", &prim.to_string()),
            field(PUB_STATIC | flags::ACC_FINAL, "MIN_VALUE", &prim.to_string()),
        ],
        vec![
            method(PUB_STATIC, "valueOf", &value_of),
            method(PUB, value_method, &format!("(){}", prim)),
            method(PUB, "toString", "()Ljava/lang/String;"),
            method(PUB, "equals", "(Ljava/lang/Object;)Z"),
            method(PUB, "hashCode", "()I"),
        ],
    )
}

fn exception(name: &str, super_class: &str) -> ParsedClass {
    class(
        PUB,
        name,
        Some(super_class),
        &[],
        vec![],
        vec![
            method(PUB, "<init>", "()V"),
            method(PUB, "<init>", "(Ljava/lang/String;)V"),
            method(PUB, "getMessage", "()Ljava/lang/String;"),
        ],
    )
}

fn functional(name: &str, sam: &str, descriptor: &str) -> ParsedClass {
    class(IFACE, name, Some("java/lang/Object"), &[], vec![], vec![method(
        PUB_ABSTRACT,
        sam,
        descriptor,
    )])
}

fn annotation(name: &str) -> ParsedClass {
    class(
        IFACE | flags::ACC_ANNOTATION,
        name,
        Some("java/lang/Object"),
        &["java/lang/annotation/Annotation"],
        vec![],
        vec![],
    )
}

/// Look up a built-in description by internal name.
pub fn builtin_class(internal_name: &str) -> Option<ParsedClass> {
    let cls = match internal_name {
        "java/lang/Object" => class(
            PUB,
            "java/lang/Object",
            None,
            &[],
            vec![],
            vec![
                method(PUB, "<init>", "()V"),
                method(PUB, "equals", "(Ljava/lang/Object;)Z"),
                method(PUB, "hashCode", "()I"),
                method(PUB, "toString", "()Ljava/lang/String;"),
                method(PUB | flags::ACC_FINAL, "getClass", "()Ljava/lang/Class;"),
            ],
        ),
        "java/lang/String" => class(
            PUB | flags::ACC_FINAL,
            "java/lang/String",
            Some("java/lang/Object"),
            &["java/lang/Comparable", "java/lang/CharSequence"],
            vec![],
            vec![
                method(PUB, "<init>", "()V"),
                method(PUB, "equals", "(Ljava/lang/Object;)Z"),
                method(PUB, "hashCode", "()I"),
                method(PUB, "length", "()I"),
                method(PUB, "isEmpty", "()Z"),
                method(PUB, "charAt", "(I)C"),
                method(PUB, "indexOf", "(Ljava/lang/String;)I"),
                method(PUB, "substring", "(I)Ljava/lang/String;"),
                method(PUB, "substring", "(II)Ljava/lang/String;"),
                method(PUB, "concat", "(Ljava/lang/String;)Ljava/lang/String;"),
                method(PUB, "toUpperCase", "()Ljava/lang/String;"),
                method(PUB, "toLowerCase", "()Ljava/lang/String;"),
                method(PUB, "trim", "()Ljava/lang/String;"),
                method(PUB, "compareTo", "(Ljava/lang/String;)I"),
                method(PUB, "toString", "()Ljava/lang/String;"),
                method(PUB_STATIC, "valueOf", "(I)Ljava/lang/String;"),
                method(PUB_STATIC, "valueOf", "(J)Ljava/lang/String;"),
                method(PUB_STATIC, "valueOf", "(D)Ljava/lang/String;"),
                method(PUB_STATIC, "valueOf", "(Ljava/lang/Object;)Ljava/lang/String;"),
                varargs(
                    PUB_STATIC,
                    "format",
                    "(Ljava/lang/String;[Ljava/lang/Object;)Ljava/lang/String;",
                ),
            ],
        ),
        "java/lang/StringBuilder" => class(
            PUB | flags::ACC_FINAL,
            "java/lang/StringBuilder",
            Some("java/lang/Object"),
            &[],
            vec![],
            vec![
                method(PUB, "<init>", "()V"),
                method(PUB, "<init>", "(Ljava/lang/String;)V"),
                method(PUB, "append", "(Ljava/lang/String;)Ljava/lang/StringBuilder;"),
                method(PUB, "append", "(I)Ljava/lang/StringBuilder;"),
                method(PUB, "append", "(J)Ljava/lang/StringBuilder;"),
                method(PUB, "append", "(F)Ljava/lang/StringBuilder;"),
                method(PUB, "append", "(D)Ljava/lang/StringBuilder;"),
                method(PUB, "append", "(Z)Ljava/lang/StringBuilder;"),
                method(PUB, "append", "(C)Ljava/lang/StringBuilder;"),
                method(PUB, "append", "(Ljava/lang/Object;)Ljava/lang/StringBuilder;"),
                method(PUB, "toString", "()Ljava/lang/String;"),
            ],
        ),
        "java/lang/System" => class(
            PUB | flags::ACC_FINAL,
            "java/lang/System",
            Some("java/lang/Object"),
            &[],
            vec![
                field(PUB_STATIC | flags::ACC_FINAL, "out", "Ljava/io/PrintStream;"),
                field(PUB_STATIC | flags::ACC_FINAL, "err", "Ljava/io/PrintStream;"),
            ],
            vec![
                method(PUB_STATIC, "currentTimeMillis", "()J"),
                method(PUB_STATIC, "exit", "(I)V"),
            ],
        ),
        "java/io/PrintStream" => {
            let mut methods = vec![method(PUB, "println", "()V")];
            for desc in ["I", "J", "F", "D", "Z", "C", "Ljava/lang/String;", "Ljava/lang/Object;"]
            {
                methods.push(method(PUB, "println", &format!("({})V", desc)));
                methods.push(method(PUB, "print", &format!("({})V", desc)));
            }
            methods.push(varargs(
                PUB,
                "printf",
                "(Ljava/lang/String;[Ljava/lang/Object;)Ljava/io/PrintStream;",
            ));
            class(PUB, "java/io/PrintStream", Some("java/lang/Object"), &[], vec![], methods)
        }
        "java/lang/Math" => {
            let mut methods = Vec::new();
            for d in ['I', 'J', 'F', 'D'] {
                methods.push(method(PUB_STATIC, "abs", &format!("({}){}", d, d)));
                methods.push(method(PUB_STATIC, "max", &format!("({}{}){}", d, d, d)));
                methods.push(method(PUB_STATIC, "min", &format!("({}{}){}", d, d, d)));
            }
            methods.push(method(PUB_STATIC, "sqrt", "(D)D"));
            methods.push(method(PUB_STATIC, "pow", "(DD)D"));
            methods.push(method(PUB_STATIC, "floor", "(D)D"));
            methods.push(method(PUB_STATIC, "ceil", "(D)D"));
            class(
                PUB | flags::ACC_FINAL,
                "java/lang/Math",
                Some("java/lang/Object"),
                &[],
                vec![],
                methods,
            )
        }
        "java/lang/Number" => class(
            PUB_ABSTRACT,
            "java/lang/Number",
            Some("java/lang/Object"),
            &[],
            vec![],
            vec![
                method(PUB_ABSTRACT, "intValue", "()I"),
                method(PUB_ABSTRACT, "longValue", "()J"),
                method(PUB_ABSTRACT, "floatValue", "()F"),
                method(PUB_ABSTRACT, "doubleValue", "()D"),
            ],
        ),
        "java/lang/Integer" => {
            let mut cls = wrapper("Integer", 'I', "intValue");
            cls.methods.push(method(PUB_STATIC, "parseInt", "(Ljava/lang/String;)I"));
            cls
        }
        "java/lang/Long" => {
            let mut cls = wrapper("Long", 'J', "longValue");
            cls.methods.push(method(PUB_STATIC, "parseLong", "(Ljava/lang/String;)J"));
            cls
        }
        "java/lang/Float" => wrapper("Float", 'F', "floatValue"),
        "java/lang/Double" => {
            let mut cls = wrapper("Double", 'D', "doubleValue");
            cls.methods.push(method(PUB_STATIC, "parseDouble", "(Ljava/lang/String;)D"));
            cls
        }
        "java/lang/Byte" => wrapper("Byte", 'B', "byteValue"),
        "java/lang/Short" => wrapper("Short", 'S', "shortValue"),
        "java/lang/Character" => wrapper("Character", 'C', "charValue"),
        "java/lang/Boolean" => wrapper("Boolean", 'Z', "booleanValue"),
        "java/lang/Enum" => class(
            PUB_ABSTRACT,
            "java/lang/Enum",
            Some("java/lang/Object"),
            &["java/lang/Comparable"],
            vec![],
            vec![
                method(flags::ACC_PROTECTED, "<init>", "(Ljava/lang/String;I)V"),
                method(PUB | flags::ACC_FINAL, "name", "()Ljava/lang/String;"),
                method(PUB | flags::ACC_FINAL, "ordinal", "()I"),
                method(PUB, "toString", "()Ljava/lang/String;"),
                method(
                    PUB_STATIC,
                    "valueOf",
                    "(Ljava/lang/Class;Ljava/lang/String;)Ljava/lang/Enum;",
                ),
            ],
        ),
        "java/lang/Class" => class(
            PUB | flags::ACC_FINAL,
            "java/lang/Class",
            Some("java/lang/Object"),
            &[],
            vec![],
            vec![
                method(PUB, "getName", "()Ljava/lang/String;"),
                method(PUB, "getSimpleName", "()Ljava/lang/String;"),
            ],
        ),
        "java/lang/Iterable" => {
            functional("java/lang/Iterable", "iterator", "()Ljava/util/Iterator;")
        }
        "java/util/Iterator" => class(
            IFACE,
            "java/util/Iterator",
            Some("java/lang/Object"),
            &[],
            vec![],
            vec![
                method(PUB_ABSTRACT, "hasNext", "()Z"),
                method(PUB_ABSTRACT, "next", "()Ljava/lang/Object;"),
            ],
        ),
        "java/lang/Comparable" => {
            functional("java/lang/Comparable", "compareTo", "(Ljava/lang/Object;)I")
        }
        "java/lang/CharSequence" => class(
            IFACE,
            "java/lang/CharSequence",
            Some("java/lang/Object"),
            &[],
            vec![],
            vec![
                method(PUB_ABSTRACT, "length", "()I"),
                method(PUB_ABSTRACT, "charAt", "(I)C"),
            ],
        ),
        "java/lang/Runnable" => functional("java/lang/Runnable", "run", "()V"),
        "java/util/function/Function" => functional(
            "java/util/function/Function",
            "apply",
            "(Ljava/lang/Object;)Ljava/lang/Object;",
        ),
        "java/util/function/Consumer" => {
            functional("java/util/function/Consumer", "accept", "(Ljava/lang/Object;)V")
        }
        "java/util/function/Supplier" => {
            functional("java/util/function/Supplier", "get", "()Ljava/lang/Object;")
        }
        "java/util/function/Predicate" => {
            functional("java/util/function/Predicate", "test", "(Ljava/lang/Object;)Z")
        }
        "java/util/function/BiFunction" => functional(
            "java/util/function/BiFunction",
            "apply",
            "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;",
        ),
        "java/util/Comparator" => functional(
            "java/util/Comparator",
            "compare",
            "(Ljava/lang/Object;Ljava/lang/Object;)I",
        ),
        "java/lang/Throwable" => class(
            PUB,
            "java/lang/Throwable",
            Some("java/lang/Object"),
            &[],
            vec![],
            vec![
                method(PUB, "<init>", "()V"),
                method(PUB, "<init>", "(Ljava/lang/String;)V"),
                method(PUB, "getMessage", "()Ljava/lang/String;"),
                method(PUB, "printStackTrace", "()V"),
                method(PUB, "toString", "()Ljava/lang/String;"),
            ],
        ),
        "java/lang/Exception" => exception("java/lang/Exception", "java/lang/Throwable"),
        "java/lang/Error" => exception("java/lang/Error", "java/lang/Throwable"),
        "java/lang/RuntimeException" => {
            exception("java/lang/RuntimeException", "java/lang/Exception")
        }
        "java/lang/ArithmeticException" => {
            exception("java/lang/ArithmeticException", "java/lang/RuntimeException")
        }
        "java/lang/IllegalArgumentException" => {
            exception("java/lang/IllegalArgumentException", "java/lang/RuntimeException")
        }
        "java/lang/IllegalStateException" => {
            exception("java/lang/IllegalStateException", "java/lang/RuntimeException")
        }
        "java/lang/NullPointerException" => {
            exception("java/lang/NullPointerException", "java/lang/RuntimeException")
        }
        "java/lang/ClassCastException" => {
            exception("java/lang/ClassCastException", "java/lang/RuntimeException")
        }
        "java/lang/IndexOutOfBoundsException" => {
            exception("java/lang/IndexOutOfBoundsException", "java/lang/RuntimeException")
        }
        "java/lang/ArrayIndexOutOfBoundsException" => exception(
            "java/lang/ArrayIndexOutOfBoundsException",
            "java/lang/IndexOutOfBoundsException",
        ),
        "java/lang/NumberFormatException" => {
            exception("java/lang/NumberFormatException", "java/lang/IllegalArgumentException")
        }
        "java/lang/UnsupportedOperationException" => {
            exception("java/lang/UnsupportedOperationException", "java/lang/RuntimeException")
        }
        "java/lang/annotation/Annotation" => class(
            IFACE,
            "java/lang/annotation/Annotation",
            Some("java/lang/Object"),
            &[],
            vec![],
            vec![],
        ),
        "java/lang/Override" => annotation("java/lang/Override"),
        "java/lang/Deprecated" => annotation("java/lang/Deprecated"),
        "java/lang/SuppressWarnings" => annotation("java/lang/SuppressWarnings"),
        "java/lang/SafeVarargs" => annotation("java/lang/SafeVarargs"),
        "java/lang/FunctionalInterface" => annotation("java/lang/FunctionalInterface"),
        _ => return None,
    };
    Some(cls)
}
