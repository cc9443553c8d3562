//! Control-flow compilation: branch shapes, switch strategies, exception
//! tables, and the bytecode-legality bounds.

mod common;

use common::*;

const TABLESWITCH: u8 = 0xAA;
const LOOKUPSWITCH: u8 = 0xAB;

#[test]
fn if_else_branches_and_bounds() {
    let classes = compile_source(
        r#"
class Cond {
    int pick(int x) {
        if (x > 0) {
            return 1;
        } else {
            return -1;
        }
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Cond");
    let code = method_code(&parsed, "pick");
    assert!(code.max_stack >= 2);
    assert!(code.max_locals >= 2); // this + x
    assert_branch_targets_in_range(&code.code);
}

#[test]
fn while_loop_compiles_to_backward_goto() {
    let classes = compile_source(
        r#"
class Loop {
    int sum(int n) {
        int total = 0;
        int i = 0;
        while (i < n) {
            total = total + i;
            i++;
        }
        return total;
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Loop");
    let code = method_code(&parsed, "sum");
    assert!(code.code.contains(&0x84), "expected iinc for i++");
    assert_branch_targets_in_range(&code.code);
}

#[test]
fn dense_switch_uses_tableswitch() {
    let classes = compile_source(
        r#"
class Dense {
    int pick(int x) {
        switch (x) {
            case 1: return 10;
            case 2: return 20;
            case 3: return 30;
            default: return 0;
        }
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Dense");
    let code = method_code(&parsed, "pick");
    assert!(code.code.contains(&TABLESWITCH));
    assert!(!code.code.contains(&LOOKUPSWITCH));
}

#[test]
fn sparse_switch_uses_lookupswitch() {
    let classes = compile_source(
        r#"
class Sparse {
    int pick(int x) {
        switch (x) {
            case 1: return 1;
            case 1000: return 2;
            case 100000: return 3;
            default: return 0;
        }
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Sparse");
    let code = method_code(&parsed, "pick");
    assert!(code.code.contains(&LOOKUPSWITCH));
}

#[test]
fn string_switch_dispatches_on_hash_code() {
    let classes = compile_source(
        r#"
class Strings {
    int pick(String s) {
        switch (s) {
            case "a": return 1;
            case "b": return 2;
            default: return 0;
        }
    }
}
"#,
    );
    let bytes = &classes["Strings"];
    assert!(bytes_contain(bytes, "hashCode"));
    assert!(bytes_contain(bytes, "equals"));
    let parsed = parse_single(&classes, "Strings");
    let code = method_code(&parsed, "pick");
    assert!(code.code.contains(&LOOKUPSWITCH));
}

#[test]
fn enum_switch_dispatches_on_ordinal() {
    let classes = compile_source(
        r#"
enum Size {
    SMALL, MEDIUM, LARGE;
}

class UseSize {
    int weight(Size s) {
        switch (s) {
            case SMALL: return 1;
            case LARGE: return 3;
            default: return 2;
        }
    }
}
"#,
    );
    assert!(bytes_contain(&classes["UseSize"], "ordinal"));
}

#[test]
fn try_catch_exception_table_ordering() {
    let classes = compile_source(
        r#"
class Catcher {
    int safe(int a, int b) {
        try {
            return a / b;
        } catch (ArithmeticException e) {
            return 0;
        }
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Catcher");
    let code = method_code(&parsed, "safe");
    assert_eq!(code.exception_table.len(), 1);
    let (start, end, handler, catch_type) = code.exception_table[0];
    assert!(start < end);
    assert!(end <= handler);
    assert!((handler as usize) < code.code.len());
    assert!(catch_type != 0);
}

#[test]
fn finally_is_inlined_on_every_exit() {
    let classes = compile_source(
        r#"
class Cleanup {
    static int flag;

    int work(int x) {
        try {
            if (x > 0) {
                return 1;
            }
            return 2;
        } finally {
            flag = 9;
        }
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Cleanup");
    let code = method_code(&parsed, "work");
    // the finally body (putstatic flag) appears once per return path plus
    // the catch-all handler; no jsr is ever emitted
    let putstatic_count = code.code.iter().filter(|&&b| b == 0xB3).count();
    assert!(putstatic_count >= 3, "finally should be inlined on each path");
    assert!(!code.code.contains(&0xA8), "jsr must not be used");
    // the catch-all handler rethrows
    let (_, _, _, catch_type) = *code.exception_table.last().unwrap();
    assert_eq!(catch_type, 0);
    assert!(code.code.contains(&0xBF), "expected athrow in the catch-all handler");
}

#[test]
fn labeled_break_exits_outer_loop() {
    let classes = compile_source(
        r#"
class Labels {
    int find(int[][] grid, int needle) {
        int hits = 0;
        outer:
        for (int i = 0; i < grid.length; i++) {
            for (int j = 0; j < grid[i].length; j++) {
                if (grid[i][j] == needle) {
                    hits++;
                    break outer;
                }
                if (grid[i][j] < 0) {
                    continue outer;
                }
            }
        }
        return hits;
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Labels");
    assert_branch_targets_in_range(&method_code(&parsed, "find").code);
}

#[test]
fn enhanced_for_over_array_desugars_to_index_loop() {
    let classes = compile_source(
        r#"
class Each {
    int sum(int[] xs) {
        int total = 0;
        for (int x : xs) {
            total += x;
        }
        return total;
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Each");
    let code = method_code(&parsed, "sum");
    assert!(code.code.contains(&0xBE), "expected arraylength");
    assert!(code.code.contains(&0x2E), "expected iaload");
    // long/double free method: slots are this, xs, total, $arr, $len, $i, x
    assert!(code.max_locals >= 7);
}

#[test]
fn enhanced_for_over_iterable_uses_iterator_protocol() {
    let classes = compile_source(
        r#"
class EachRef {
    void dump(Iterable items) {
        for (Object item : items) {
            System.out.println(item);
        }
    }
}
"#,
    );
    let bytes = &classes["EachRef"];
    assert!(bytes_contain(bytes, "iterator"));
    assert!(bytes_contain(bytes, "hasNext"));
    assert!(bytes_contain(bytes, "next"));
}

#[test]
fn do_while_tests_condition_after_body() {
    let classes = compile_source(
        r#"
class DoLoop {
    int countDown(int n) {
        int steps = 0;
        do {
            n--;
            steps++;
        } while (n > 0);
        return steps;
    }
}
"#,
    );
    let parsed = parse_single(&classes, "DoLoop");
    assert_branch_targets_in_range(&method_code(&parsed, "countDown").code);
}

#[test]
fn long_parameters_take_two_slots() {
    let classes = compile_source(
        r#"
class Wide {
    static long add(long a, long b) {
        return a + b;
    }

    double scale(double d) {
        return d * 2.0;
    }
}
"#,
    );
    let parsed = parse_single(&classes, "Wide");
    let add = method_code(&parsed, "add");
    assert!(add.max_locals >= 4); // two longs
    assert!(add.max_stack >= 4); // two longs on the stack for ladd
    let scale = method_code(&parsed, "scale");
    assert!(scale.max_locals >= 3); // this + double
}

/// Walk the instruction stream and check that every 16-bit branch lands
/// inside the method.
fn assert_branch_targets_in_range(code: &[u8]) {
    let mut pc = 0usize;
    while pc < code.len() {
        let opcode = code[pc];
        match opcode {
            // if<cond>, if_icmp<cond>, if_acmp<cond>, goto, ifnull, ifnonnull
            0x99..=0xA7 | 0xC6 | 0xC7 => {
                let offset = i16::from_be_bytes([code[pc + 1], code[pc + 2]]) as i64;
                let target = pc as i64 + offset;
                assert!(
                    target >= 0 && (target as usize) < code.len(),
                    "branch at {} targets {} outside [0, {})",
                    pc,
                    target,
                    code.len()
                );
                pc += 3;
            }
            0xAA => {
                // tableswitch: skip padding, default, low, high, entries
                let base = pc;
                let mut cursor = pc + 1;
                while cursor % 4 != 0 {
                    cursor += 1;
                }
                let read_i32 = |at: usize| {
                    i32::from_be_bytes([code[at], code[at + 1], code[at + 2], code[at + 3]])
                };
                let default = read_i32(cursor);
                let low = read_i32(cursor + 4);
                let high = read_i32(cursor + 8);
                let entries = (high - low + 1) as usize;
                for i in 0..=entries {
                    let offset = if i == 0 { default } else { read_i32(cursor + 8 + 4 * i) };
                    let target = base as i64 + offset as i64;
                    assert!(target >= 0 && (target as usize) < code.len());
                }
                pc = cursor + 12 + 4 * entries;
            }
            0xAB => {
                let base = pc;
                let mut cursor = pc + 1;
                while cursor % 4 != 0 {
                    cursor += 1;
                }
                let read_i32 = |at: usize| {
                    i32::from_be_bytes([code[at], code[at + 1], code[at + 2], code[at + 3]])
                };
                let default = read_i32(cursor);
                let target = base as i64 + default as i64;
                assert!(target >= 0 && (target as usize) < code.len());
                let npairs = read_i32(cursor + 4) as usize;
                for i in 0..npairs {
                    let offset = read_i32(cursor + 8 + 8 * i + 4);
                    let target = base as i64 + offset as i64;
                    assert!(target >= 0 && (target as usize) < code.len());
                }
                pc = cursor + 8 + 8 * npairs;
            }
            _ => pc += instruction_width(code, pc),
        }
    }
}

/// Width of a non-branch instruction at `pc`, operands included.
fn instruction_width(code: &[u8], pc: usize) -> usize {
    match code[pc] {
        0x10 | 0x12 | 0x15..=0x19 | 0x36..=0x3A | 0xBC => 2,
        0x11 | 0x13 | 0x14 | 0x84 | 0xB2..=0xB8 | 0xBB | 0xBD | 0xC0 | 0xC1 => 3,
        0xC5 => 4,
        0xB9 | 0xBA => 5,
        0xC4 => {
            // wide
            if code[pc + 1] == 0x84 {
                6
            } else {
                4
            }
        }
        _ => 1,
    }
}
