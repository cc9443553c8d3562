//! Expression lowering: instruction selection, conversions, string
//! concatenation, boxing, and short-circuit evaluation.

mod common;

use common::*;

#[test]
fn bitwise_operators_use_int_opcodes() {
    let classes = compile_source(
        r#"
public class Bits {
    public static void main(String[] args) {
        System.out.println(12 & 10);
        System.out.println(12 | 10);
        System.out.println(12 ^ 10);
        System.out.println(~12);
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Bits");
    let code = method_code(&parsed, "main");
    assert!(code.code.contains(&0x7E), "expected iand");
    assert!(code.code.contains(&0x80), "expected ior");
    assert!(code.code.contains(&0x82), "expected ixor for 12 ^ 10 and ~12");
    // ~12 lowers to iconst_m1; ixor
    assert!(code.code.contains(&0x02), "expected iconst_m1");
}

#[test]
fn long_arithmetic_uses_category_two_opcodes() {
    let classes = compile_source(
        r#"
class Longs {
    long mix(long a, int b) {
        return a + b * 2L;
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Longs");
    let code = method_code(&parsed, "mix");
    assert!(code.code.contains(&0x85), "expected i2l widening of b");
    assert!(code.code.contains(&0x69), "expected lmul");
    assert!(code.code.contains(&0x61), "expected ladd");
    assert_eq!(*code.code.last().unwrap(), 0xAD); // lreturn
}

#[test]
fn string_concat_lowered_to_string_builder() {
    let classes = compile_source(
        r#"
class Concat {
    String describe(String name, int age, boolean tall) {
        return name + " is " + age + ", tall: " + tall;
    }
}
"#,
    );
    let bytes = &classes["Concat"];
    assert!(bytes_contain(bytes, "java/lang/StringBuilder"));
    assert!(bytes_contain(bytes, "append"));
    // primitive overloads, not boxed ones
    assert!(bytes_contain(bytes, "(I)Ljava/lang/StringBuilder;"));
    assert!(bytes_contain(bytes, "(Z)Ljava/lang/StringBuilder;"));
    assert!(bytes_contain(bytes, "toString"));
    // one builder per concatenation spine
    let parsed = parse_single(&classes, "Concat");
    let code = method_code(&parsed, "describe");
    let new_count = code.code.iter().filter(|&&b| b == 0xBB).count();
    assert_eq!(new_count, 1);
}

#[test]
fn boxing_uses_value_of_and_unboxing_the_value_methods() {
    let classes = compile_source(
        r#"
class Boxing {
    int roundTrip(int x) {
        Integer boxed = x;
        int back = boxed;
        return back;
    }
}
"#,
    );
    let bytes = &classes["Boxing"];
    assert!(bytes_contain(bytes, "valueOf"));
    assert!(bytes_contain(bytes, "intValue"));
    assert!(bytes_contain(bytes, "(I)Ljava/lang/Integer;"));
}

#[test]
fn short_circuit_and_skips_the_right_operand() {
    let classes = compile_source(
        r#"
class Circuit {
    boolean a() { return false; }
    boolean b() { return true; }

    boolean both() {
        return a() && b();
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Circuit");
    let code = method_code(&parsed, "both");
    // two virtual calls with a conditional branch between them: when a()
    // is false the branch jumps past the b() invocation
    let invokes: Vec<usize> = code
        .code
        .iter()
        .enumerate()
        .filter(|(_, &b)| b == 0xB6)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(invokes.len(), 2);
    let between = &code.code[invokes[0]..invokes[1]];
    assert!(
        between.contains(&0x99) || between.contains(&0x9A),
        "expected a conditional branch between a() and b()"
    );
}

#[test]
fn narrowing_casts_emit_conversion_chains() {
    let classes = compile_source(
        r#"
class Casts {
    byte crush(double d) {
        return (byte) d;
    }

    char letter(long l) {
        return (char) l;
    }

    int chop(double d) {
        return (int) d;
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Casts");
    let crush = method_code(&parsed, "crush");
    assert!(crush.code.contains(&0x8E), "expected d2i");
    assert!(crush.code.contains(&0x91), "expected i2b after d2i");
    let letter = method_code(&parsed, "letter");
    assert!(letter.code.contains(&0x88), "expected l2i");
    assert!(letter.code.contains(&0x92), "expected i2c after l2i");
    let chop = method_code(&parsed, "chop");
    assert!(chop.code.contains(&0x8E));
    assert!(!chop.code.contains(&0x91));
}

#[test]
fn instanceof_and_reference_cast() {
    let classes = compile_source(
        r#"
class Types {
    boolean isString(Object o) {
        return o instanceof String;
    }

    String asString(Object o) {
        return (String) o;
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Types");
    assert!(method_code(&parsed, "isString").code.contains(&0xC1));
    assert!(method_code(&parsed, "asString").code.contains(&0xC0));
}

#[test]
fn array_creation_selects_the_right_instruction() {
    let classes = compile_source(
        r#"
class Arrays {
    int[] prims() {
        return new int[4];
    }

    String[] refs() {
        return new String[2];
    }

    int[][] grid() {
        return new int[2][3];
    }

    int[] literal() {
        return new int[] {1, 2, 3};
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Arrays");
    assert!(method_code(&parsed, "prims").code.contains(&0xBC), "newarray");
    assert!(method_code(&parsed, "refs").code.contains(&0xBD), "anewarray");
    assert!(method_code(&parsed, "grid").code.contains(&0xC5), "multianewarray");
    let lit = method_code(&parsed, "literal");
    assert!(lit.code.contains(&0xBC));
    assert!(lit.code.contains(&0x4F), "iastore for each element");
}

#[test]
fn ternary_produces_single_value() {
    let classes = compile_source(
        r#"
class Pick {
    int max(int a, int b) {
        return a > b ? a : b;
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Pick");
    let code = method_code(&parsed, "max");
    assert!(code.max_stack >= 2);
    assert_eq!(*code.code.last().unwrap(), 0xAC); // ireturn
}

#[test]
fn field_increment_duplicates_receiver_not_value() {
    let classes = compile_source(
        r#"
class Counter {
    int count;

    void bump() {
        count++;
    }

    int bumpAndGet() {
        return ++count;
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Counter");
    let bump = method_code(&parsed, "bump");
    assert!(bump.code.contains(&0xB4), "getfield");
    assert!(bump.code.contains(&0xB5), "putfield");
    let bump_get = method_code(&parsed, "bumpAndGet");
    assert!(bump_get.code.contains(&0x5A), "dup_x1 to keep the new value");
}

#[test]
fn assignment_as_statement_leaves_nothing_behind() {
    let classes = compile_source(
        r#"
class Assigns {
    int f() {
        int a = 1;
        a = 2;
        a += 3;
        return a;
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Assigns");
    let code = method_code(&parsed, "f");
    // plain local assignment in statement position needs no dup or pop
    assert!(!code.code.contains(&0x59), "no dup expected");
    assert!(!code.code.contains(&0x57), "no pop expected");
}

#[test]
fn comparisons_of_wide_types_use_cmp_then_branch() {
    let classes = compile_source(
        r#"
class Compare {
    boolean lessLong(long a, long b) {
        return a < b;
    }

    boolean lessDouble(double a, double b) {
        return a < b;
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Compare");
    assert!(method_code(&parsed, "lessLong").code.contains(&0x94), "lcmp");
    assert!(method_code(&parsed, "lessDouble").code.contains(&0x98), "dcmpg");
}
