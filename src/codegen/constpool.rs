//! Class-file constant pool.
//!
//! Entries are appended once and deduplicated by structural equality; indices
//! are 1-based and stable. `Long` and `Double` occupy two consecutive
//! indices, the second of which is unusable (JVMS §4.4.5).

use crate::common::{Error, Result};
use std::collections::HashMap;

/// A resolved constant pool entry. Composite entries hold the indices of the
/// entries they reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
    NameAndType(u16, u16),
    MethodHandle(u8, u16),
    MethodType(u16),
    InvokeDynamic(u16, u16),
}

pub mod tags {
    pub const UTF8: u8 = 1;
    pub const INTEGER: u8 = 3;
    pub const FLOAT: u8 = 4;
    pub const LONG: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const CLASS: u8 = 7;
    pub const STRING: u8 = 8;
    pub const FIELDREF: u8 = 9;
    pub const METHODREF: u8 = 10;
    pub const INTERFACE_METHODREF: u8 = 11;
    pub const NAME_AND_TYPE: u8 = 12;
    pub const METHOD_HANDLE: u8 = 15;
    pub const METHOD_TYPE: u8 = 16;
    pub const INVOKE_DYNAMIC: u8 = 18;
}

/// Encode a string as JVM modified UTF-8: NUL becomes the two-byte form and
/// supplementary characters are written as surrogate pairs (CESU-8).
fn encode_modified_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for ch in s.chars() {
        let cp = ch as u32;
        match cp {
            0x0000 => out.extend_from_slice(&[0xC0, 0x80]),
            0x0001..=0x007F => out.push(cp as u8),
            0x0080..=0x07FF => {
                out.push(0xC0 | (cp >> 6) as u8);
                out.push(0x80 | (cp & 0x3F) as u8);
            }
            0x0800..=0xFFFF => {
                out.push(0xE0 | (cp >> 12) as u8);
                out.push(0x80 | ((cp >> 6) & 0x3F) as u8);
                out.push(0x80 | (cp & 0x3F) as u8);
            }
            _ => {
                let v = cp - 0x10000;
                let hi = 0xD800 + (v >> 10);
                let lo = 0xDC00 + (v & 0x3FF);
                for sur in [hi, lo] {
                    out.push(0xE0 | (sur >> 12) as u8);
                    out.push(0x80 | ((sur >> 6) & 0x3F) as u8);
                    out.push(0x80 | (sur & 0x3F) as u8);
                }
            }
        }
    }
    out
}

#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    /// Slot i holds the entry at index i + 1; `None` marks the phantom slot
    /// after a long or double.
    entries: Vec<Option<Constant>>,
    utf8_map: HashMap<String, u16>,
    class_map: HashMap<u16, u16>,
    string_map: HashMap<u16, u16>,
    integer_map: HashMap<i32, u16>,
    float_map: HashMap<u32, u16>,
    long_map: HashMap<i64, u16>,
    double_map: HashMap<u64, u16>,
    name_and_type_map: HashMap<(u16, u16), u16>,
    member_ref_map: HashMap<(u8, u16, u16), u16>,
    method_handle_map: HashMap<(u8, u16), u16>,
    method_type_map: HashMap<u16, u16>,
    invoke_dynamic_map: HashMap<(u16, u16), u16>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots written to the `constant_pool_count` field.
    pub fn count(&self) -> u16 {
        self.entries.len() as u16 + 1
    }

    pub fn get(&self, idx: u16) -> Option<&Constant> {
        if idx == 0 {
            return None;
        }
        self.entries.get(idx as usize - 1).and_then(|e| e.as_ref())
    }

    fn push(&mut self, c: Constant) -> u16 {
        let wide = matches!(c, Constant::Long(_) | Constant::Double(_));
        self.entries.push(Some(c));
        let idx = self.entries.len() as u16;
        if wide {
            self.entries.push(None);
        }
        idx
    }

    pub fn add_utf8(&mut self, value: &str) -> u16 {
        if let Some(&idx) = self.utf8_map.get(value) {
            return idx;
        }
        let idx = self.push(Constant::Utf8(value.to_string()));
        self.utf8_map.insert(value.to_string(), idx);
        idx
    }

    pub fn add_integer(&mut self, value: i32) -> u16 {
        if let Some(&idx) = self.integer_map.get(&value) {
            return idx;
        }
        let idx = self.push(Constant::Integer(value));
        self.integer_map.insert(value, idx);
        idx
    }

    pub fn add_float(&mut self, value: f32) -> u16 {
        let bits = value.to_bits();
        if let Some(&idx) = self.float_map.get(&bits) {
            return idx;
        }
        let idx = self.push(Constant::Float(value));
        self.float_map.insert(bits, idx);
        idx
    }

    pub fn add_long(&mut self, value: i64) -> u16 {
        if let Some(&idx) = self.long_map.get(&value) {
            return idx;
        }
        let idx = self.push(Constant::Long(value));
        self.long_map.insert(value, idx);
        idx
    }

    pub fn add_double(&mut self, value: f64) -> u16 {
        let bits = value.to_bits();
        if let Some(&idx) = self.double_map.get(&bits) {
            return idx;
        }
        let idx = self.push(Constant::Double(value));
        self.double_map.insert(bits, idx);
        idx
    }

    pub fn add_class(&mut self, internal_name: &str) -> u16 {
        let name_idx = self.add_utf8(internal_name);
        if let Some(&idx) = self.class_map.get(&name_idx) {
            return idx;
        }
        let idx = self.push(Constant::Class(name_idx));
        self.class_map.insert(name_idx, idx);
        idx
    }

    pub fn add_string(&mut self, value: &str) -> u16 {
        let utf8_idx = self.add_utf8(value);
        if let Some(&idx) = self.string_map.get(&utf8_idx) {
            return idx;
        }
        let idx = self.push(Constant::String(utf8_idx));
        self.string_map.insert(utf8_idx, idx);
        idx
    }

    pub fn add_name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_idx = self.add_utf8(name);
        let desc_idx = self.add_utf8(descriptor);
        if let Some(&idx) = self.name_and_type_map.get(&(name_idx, desc_idx)) {
            return idx;
        }
        let idx = self.push(Constant::NameAndType(name_idx, desc_idx));
        self.name_and_type_map.insert((name_idx, desc_idx), idx);
        idx
    }

    fn add_member_ref(&mut self, tag: u8, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_idx = self.add_class(class);
        let nat_idx = self.add_name_and_type(name, descriptor);
        if let Some(&idx) = self.member_ref_map.get(&(tag, class_idx, nat_idx)) {
            return idx;
        }
        let entry = match tag {
            tags::FIELDREF => Constant::FieldRef(class_idx, nat_idx),
            tags::METHODREF => Constant::MethodRef(class_idx, nat_idx),
            _ => Constant::InterfaceMethodRef(class_idx, nat_idx),
        };
        let idx = self.push(entry);
        self.member_ref_map.insert((tag, class_idx, nat_idx), idx);
        idx
    }

    pub fn add_field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.add_member_ref(tags::FIELDREF, class, name, descriptor)
    }

    pub fn add_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.add_member_ref(tags::METHODREF, class, name, descriptor)
    }

    pub fn add_interface_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.add_member_ref(tags::INTERFACE_METHODREF, class, name, descriptor)
    }

    pub fn add_method_handle(&mut self, kind: u8, reference_idx: u16) -> u16 {
        if let Some(&idx) = self.method_handle_map.get(&(kind, reference_idx)) {
            return idx;
        }
        let idx = self.push(Constant::MethodHandle(kind, reference_idx));
        self.method_handle_map.insert((kind, reference_idx), idx);
        idx
    }

    pub fn add_method_type(&mut self, descriptor: &str) -> u16 {
        let desc_idx = self.add_utf8(descriptor);
        if let Some(&idx) = self.method_type_map.get(&desc_idx) {
            return idx;
        }
        let idx = self.push(Constant::MethodType(desc_idx));
        self.method_type_map.insert(desc_idx, idx);
        idx
    }

    pub fn add_invoke_dynamic(&mut self, bootstrap_idx: u16, name: &str, descriptor: &str) -> u16 {
        let nat_idx = self.add_name_and_type(name, descriptor);
        if let Some(&idx) = self.invoke_dynamic_map.get(&(bootstrap_idx, nat_idx)) {
            return idx;
        }
        let idx = self.push(Constant::InvokeDynamic(bootstrap_idx, nat_idx));
        self.invoke_dynamic_map.insert((bootstrap_idx, nat_idx), idx);
        idx
    }

    fn check_bound(&self, idx: u16) -> Result<()> {
        if self.get(idx).is_none() {
            return Err(Error::invariant(
                "constant pool",
                format!("reference to unbound constant pool index {}", idx),
            ));
        }
        Ok(())
    }

    /// Serialize `constant_pool_count` followed by the entries in index
    /// order. Fails if any composite entry references an unbound index.
    pub fn serialize(&self, out: &mut Vec<u8>) -> Result<()> {
        if self.entries.len() >= u16::MAX as usize {
            return Err(Error::invariant("constant pool", "constant pool overflow"));
        }
        out.extend_from_slice(&self.count().to_be_bytes());
        for entry in self.entries.iter().flatten() {
            match entry {
                Constant::Utf8(s) => {
                    let data = encode_modified_utf8(s);
                    out.push(tags::UTF8);
                    out.extend_from_slice(&(data.len() as u16).to_be_bytes());
                    out.extend_from_slice(&data);
                }
                Constant::Integer(v) => {
                    out.push(tags::INTEGER);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                Constant::Float(v) => {
                    out.push(tags::FLOAT);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                Constant::Long(v) => {
                    out.push(tags::LONG);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                Constant::Double(v) => {
                    out.push(tags::DOUBLE);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                Constant::Class(name) => {
                    self.check_bound(*name)?;
                    out.push(tags::CLASS);
                    out.extend_from_slice(&name.to_be_bytes());
                }
                Constant::String(utf8) => {
                    self.check_bound(*utf8)?;
                    out.push(tags::STRING);
                    out.extend_from_slice(&utf8.to_be_bytes());
                }
                Constant::FieldRef(class, nat) => {
                    self.check_bound(*class)?;
                    self.check_bound(*nat)?;
                    out.push(tags::FIELDREF);
                    out.extend_from_slice(&class.to_be_bytes());
                    out.extend_from_slice(&nat.to_be_bytes());
                }
                Constant::MethodRef(class, nat) => {
                    self.check_bound(*class)?;
                    self.check_bound(*nat)?;
                    out.push(tags::METHODREF);
                    out.extend_from_slice(&class.to_be_bytes());
                    out.extend_from_slice(&nat.to_be_bytes());
                }
                Constant::InterfaceMethodRef(class, nat) => {
                    self.check_bound(*class)?;
                    self.check_bound(*nat)?;
                    out.push(tags::INTERFACE_METHODREF);
                    out.extend_from_slice(&class.to_be_bytes());
                    out.extend_from_slice(&nat.to_be_bytes());
                }
                Constant::NameAndType(name, desc) => {
                    self.check_bound(*name)?;
                    self.check_bound(*desc)?;
                    out.push(tags::NAME_AND_TYPE);
                    out.extend_from_slice(&name.to_be_bytes());
                    out.extend_from_slice(&desc.to_be_bytes());
                }
                Constant::MethodHandle(kind, reference) => {
                    self.check_bound(*reference)?;
                    out.push(tags::METHOD_HANDLE);
                    out.push(*kind);
                    out.extend_from_slice(&reference.to_be_bytes());
                }
                Constant::MethodType(desc) => {
                    self.check_bound(*desc)?;
                    out.push(tags::METHOD_TYPE);
                    out.extend_from_slice(&desc.to_be_bytes());
                }
                Constant::InvokeDynamic(bootstrap, nat) => {
                    // the bootstrap index points into the BootstrapMethods
                    // attribute, not the pool
                    self.check_bound(*nat)?;
                    out.push(tags::INVOKE_DYNAMIC);
                    out.extend_from_slice(&bootstrap.to_be_bytes());
                    out.extend_from_slice(&nat.to_be_bytes());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_deduplicates() {
        let mut cp = ConstantPool::new();
        let a = cp.add_utf8("X");
        let b = cp.add_utf8("X");
        assert_eq!(a, b);
        assert_eq!(a, 1);
    }

    #[test]
    fn long_and_double_take_two_slots() {
        let mut cp = ConstantPool::new();
        let k = cp.add_long(1234567890123);
        let next = cp.add_utf8("after");
        assert_eq!(next, k + 2);
        let d = cp.add_double(2.5);
        let after = cp.add_integer(7);
        assert_eq!(after, d + 2);
    }

    #[test]
    fn composite_entries_share_structure() {
        let mut cp = ConstantPool::new();
        let a = cp.add_method_ref("java/lang/Object", "<init>", "()V");
        let b = cp.add_method_ref("java/lang/Object", "<init>", "()V");
        assert_eq!(a, b);
        // the class and name-and-type below it also deduplicate
        let class_idx = cp.add_class("java/lang/Object");
        assert!(matches!(cp.get(a), Some(Constant::MethodRef(c, _)) if *c == class_idx));
    }

    #[test]
    fn serialization_count_is_last_index_plus_one() {
        let mut cp = ConstantPool::new();
        cp.add_utf8("A");
        cp.add_long(9);
        let mut out = Vec::new();
        cp.serialize(&mut out).unwrap();
        let count = u16::from_be_bytes([out[0], out[1]]);
        assert_eq!(count, 4); // Utf8 at 1, Long at 2..3, count = 4
    }

    #[test]
    fn modified_utf8_encodes_nul_and_supplementary() {
        assert_eq!(encode_modified_utf8("\0"), vec![0xC0, 0x80]);
        // U+10400 encodes as a CESU-8 surrogate pair, six bytes
        assert_eq!(encode_modified_utf8("\u{10400}").len(), 6);
        assert_eq!(encode_modified_utf8("abc"), b"abc".to_vec());
    }
}
