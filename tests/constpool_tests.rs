use jopac::codegen::constpool::{Constant, ConstantPool};

#[test]
fn utf8_added_twice_returns_same_index() {
    let mut cp = ConstantPool::new();
    assert_eq!(cp.add_utf8("X"), cp.add_utf8("X"));
    assert_eq!(cp.count(), 2); // one entry, count = last index + 1
}

#[test]
fn category_two_entries_skip_an_index() {
    let mut cp = ConstantPool::new();
    let k = cp.add_long(42);
    assert_eq!(cp.add_utf8("next"), k + 2);

    let d = cp.add_double(1.25);
    assert_eq!(cp.add_integer(9), d + 2);

    // the phantom slot is unusable
    assert!(cp.get(k + 1).is_none());
}

#[test]
fn composite_entries_deduplicate_at_every_level() {
    let mut cp = ConstantPool::new();
    let a = cp.add_field_ref("A", "x", "I");
    let b = cp.add_field_ref("A", "x", "I");
    assert_eq!(a, b);

    // the same name-and-type feeds a method ref without new sub-entries
    let before = cp.count();
    cp.add_name_and_type("x", "I");
    assert_eq!(cp.count(), before);
}

#[test]
fn method_handles_and_dynamic_entries_deduplicate() {
    let mut cp = ConstantPool::new();
    let mref = cp.add_method_ref("A", "m", "()V");
    let h1 = cp.add_method_handle(6, mref);
    let h2 = cp.add_method_handle(6, mref);
    assert_eq!(h1, h2);

    let t1 = cp.add_method_type("()V");
    let t2 = cp.add_method_type("()V");
    assert_eq!(t1, t2);

    let d1 = cp.add_invoke_dynamic(0, "apply", "()Ljava/lang/Object;");
    let d2 = cp.add_invoke_dynamic(0, "apply", "()Ljava/lang/Object;");
    assert_eq!(d1, d2);
}

#[test]
fn serialized_pool_lists_entries_in_index_order() {
    let mut cp = ConstantPool::new();
    let s = cp.add_string("hi");
    let c = cp.add_class("java/lang/Object");
    let mut out = Vec::new();
    cp.serialize(&mut out).unwrap();

    let count = u16::from_be_bytes([out[0], out[1]]);
    assert_eq!(count, cp.count());
    // "hi" utf8 precedes its String entry, the class name its Class entry
    assert!(matches!(cp.get(s), Some(Constant::String(u)) if cp.get(*u).is_some()));
    assert!(matches!(cp.get(c), Some(Constant::Class(u)) if cp.get(*u).is_some()));
}

#[test]
fn every_referenced_index_is_bound() {
    let mut cp = ConstantPool::new();
    cp.add_method_ref("java/io/PrintStream", "println", "(I)V");
    cp.add_interface_method_ref("java/util/Iterator", "hasNext", "()Z");
    cp.add_string("text");
    cp.add_long(7);
    cp.add_method_type("(I)I");
    let mut out = Vec::new();
    // serialization validates all internal references
    cp.serialize(&mut out).unwrap();
}
