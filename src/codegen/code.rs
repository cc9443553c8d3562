//! Bytecode builder.
//!
//! One builder per method body. It owns the bytes of the `Code` attribute,
//! tracks the operand-stack depth in slots (long/double count as two) and
//! the maximum reached, allocates labels, patches forward branches, and
//! collects the exception table. Every emit adjusts the running depth by the
//! instruction's statically known (pop, push) pair, so `max_stack` always
//! bounds the depth the verifier will compute on the fall-through path.

use super::class::{CodeAttribute, ExceptionTableEntry};
use super::constpool::ConstantPool;
use super::opcodes as op;
use super::types::{parse_method_descriptor, JType, PrimitiveKind};
use crate::common::{Error, Result};

/// An opaque branch target; bind it with [`BytecodeBuilder::mark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(u32);

#[derive(Debug, Clone)]
struct Patch {
    label: Label,
    /// Offset of the placeholder operand
    at: usize,
    /// Offset the branch is relative to (the opcode byte)
    base: usize,
    /// 4-byte operand (switches) instead of 2-byte
    wide: bool,
}

#[derive(Debug, Clone)]
struct HandlerRecord {
    start: Label,
    end: Label,
    handler: Label,
    catch_type: u16,
}

/// Stack effect (pops, pushes) in slots for operand-less instructions.
fn stack_effect(opcode: u8) -> (u16, u16) {
    match opcode {
        op::NOP => (0, 0),
        op::ACONST_NULL | op::ICONST_M1..=op::ICONST_5 | op::FCONST_0..=op::FCONST_2 => (0, 1),
        op::LCONST_0 | op::LCONST_1 | op::DCONST_0 | op::DCONST_1 => (0, 2),
        op::IALOAD | op::FALOAD | op::AALOAD | op::BALOAD | op::CALOAD | op::SALOAD => (2, 1),
        op::LALOAD | op::DALOAD => (2, 2),
        op::IASTORE | op::FASTORE | op::AASTORE | op::BASTORE | op::CASTORE | op::SASTORE => (3, 0),
        op::LASTORE | op::DASTORE => (4, 0),
        op::POP => (1, 0),
        op::POP2 => (2, 0),
        op::DUP => (1, 2),
        op::DUP_X1 => (2, 3),
        op::DUP_X2 => (3, 4),
        op::DUP2 => (2, 4),
        op::DUP2_X1 => (3, 5),
        op::DUP2_X2 => (4, 6),
        op::SWAP => (2, 2),
        op::IADD | op::ISUB | op::IMUL | op::IDIV | op::IREM | op::IAND | op::IOR | op::IXOR
        | op::ISHL | op::ISHR | op::IUSHR | op::FADD | op::FSUB | op::FMUL | op::FDIV
        | op::FREM => (2, 1),
        op::LADD | op::LSUB | op::LMUL | op::LDIV | op::LREM | op::LAND | op::LOR | op::LXOR
        | op::DADD | op::DSUB | op::DMUL | op::DDIV | op::DREM => (4, 2),
        // shift amount for long shifts is an int
        op::LSHL | op::LSHR | op::LUSHR => (3, 2),
        op::INEG | op::FNEG => (1, 1),
        op::LNEG | op::DNEG => (2, 2),
        op::I2L | op::I2D | op::F2L | op::F2D => (1, 2),
        op::I2F | op::I2B | op::I2C | op::I2S | op::F2I => (1, 1),
        op::L2I | op::L2F | op::D2I | op::D2F => (2, 1),
        op::L2D | op::D2L => (2, 2),
        op::LCMP | op::DCMPL | op::DCMPG => (4, 1),
        op::FCMPL | op::FCMPG => (2, 1),
        op::IRETURN | op::FRETURN | op::ARETURN | op::ATHROW => (1, 0),
        op::LRETURN | op::DRETURN => (2, 0),
        op::RETURN => (0, 0),
        op::ARRAYLENGTH => (1, 1),
        _ => (0, 0),
    }
}

#[derive(Debug)]
pub struct BytecodeBuilder {
    code: Vec<u8>,
    stack: u16,
    max_stack: u16,
    pub max_locals: u16,
    labels: Vec<Option<u16>>,
    patches: Vec<Patch>,
    handlers: Vec<HandlerRecord>,
    underflow: bool,
    /// Method name, used only in invariant diagnostics
    method: String,
}

impl BytecodeBuilder {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            code: Vec::with_capacity(64),
            stack: 0,
            max_stack: 0,
            max_locals: 0,
            labels: Vec::new(),
            patches: Vec::new(),
            handlers: Vec::new(),
            underflow: false,
            method: method.into(),
        }
    }

    pub fn position(&self) -> usize {
        self.code.len()
    }

    pub fn stack_depth(&self) -> u16 {
        self.stack
    }

    /// Restore a previously observed depth. Used around diamond control
    /// flow, where only one of the merging paths is on the fall-through
    /// count.
    pub fn set_stack_depth(&mut self, depth: u16) {
        self.stack = depth;
    }

    fn push(&mut self, n: u16) {
        self.stack += n;
        self.max_stack = self.max_stack.max(self.stack);
    }

    fn pop(&mut self, n: u16) {
        if self.stack < n {
            self.underflow = true;
            self.stack = 0;
        } else {
            self.stack -= n;
        }
    }

    fn u1(&mut self, v: u8) {
        self.code.push(v);
    }

    fn u2(&mut self, v: u16) {
        self.code.extend_from_slice(&v.to_be_bytes());
    }

    fn i4(&mut self, v: i32) {
        self.code.extend_from_slice(&v.to_be_bytes());
    }

    /// Emit an operand-less instruction; its stack effect comes from the
    /// static table.
    pub fn emit(&mut self, opcode: u8) {
        let (pops, pushes) = stack_effect(opcode);
        self.pop(pops);
        self.u1(opcode);
        self.push(pushes);
    }

    // ----- constants -----

    fn ldc(&mut self, idx: u16) {
        if idx <= 0xFF {
            self.u1(op::LDC);
            self.u1(idx as u8);
        } else {
            self.u1(op::LDC_W);
            self.u2(idx);
        }
    }

    pub fn push_int(&mut self, cp: &mut ConstantPool, value: i32) {
        match value {
            -1 => self.u1(op::ICONST_M1),
            0..=5 => self.u1(op::ICONST_0 + value as u8),
            -128..=127 => {
                self.u1(op::BIPUSH);
                self.u1(value as i8 as u8);
            }
            -32768..=32767 => {
                self.u1(op::SIPUSH);
                self.u2(value as i16 as u16);
            }
            _ => {
                let idx = cp.add_integer(value);
                self.ldc(idx);
            }
        }
        self.push(1);
    }

    pub fn push_long(&mut self, cp: &mut ConstantPool, value: i64) {
        match value {
            0 => self.u1(op::LCONST_0),
            1 => self.u1(op::LCONST_1),
            _ => {
                let idx = cp.add_long(value);
                self.u1(op::LDC2_W);
                self.u2(idx);
            }
        }
        self.push(2);
    }

    pub fn push_float(&mut self, cp: &mut ConstantPool, value: f32) {
        if value.to_bits() == 0.0f32.to_bits() {
            self.u1(op::FCONST_0);
        } else if value == 1.0 {
            self.u1(op::FCONST_1);
        } else if value == 2.0 {
            self.u1(op::FCONST_2);
        } else {
            let idx = cp.add_float(value);
            self.ldc(idx);
        }
        self.push(1);
    }

    pub fn push_double(&mut self, cp: &mut ConstantPool, value: f64) {
        if value.to_bits() == 0.0f64.to_bits() {
            self.u1(op::DCONST_0);
        } else if value == 1.0 {
            self.u1(op::DCONST_1);
        } else {
            let idx = cp.add_double(value);
            self.u1(op::LDC2_W);
            self.u2(idx);
        }
        self.push(2);
    }

    pub fn push_string(&mut self, cp: &mut ConstantPool, value: &str) {
        let idx = cp.add_string(value);
        self.ldc(idx);
        self.push(1);
    }

    pub fn push_class(&mut self, cp: &mut ConstantPool, internal_name: &str) {
        let idx = cp.add_class(internal_name);
        self.ldc(idx);
        self.push(1);
    }

    pub fn push_null(&mut self) {
        self.emit(op::ACONST_NULL);
    }

    // ----- locals -----

    fn note_local(&mut self, slot: u16, category: u16) {
        self.max_locals = self.max_locals.max(slot + category);
    }

    fn load_store(&mut self, base: u8, short_base: u8, slot: u16) {
        if slot <= 3 {
            self.u1(short_base + slot as u8);
        } else if slot <= 0xFF {
            self.u1(base);
            self.u1(slot as u8);
        } else {
            self.u1(op::WIDE);
            self.u1(base);
            self.u2(slot);
        }
    }

    pub fn load(&mut self, t: &JType, slot: u16) {
        let (base, short_base) = match t {
            JType::Primitive(PrimitiveKind::Long) => (op::LLOAD, op::LLOAD_0),
            JType::Primitive(PrimitiveKind::Float) => (op::FLOAD, op::FLOAD_0),
            JType::Primitive(PrimitiveKind::Double) => (op::DLOAD, op::DLOAD_0),
            t if t.is_reference() => (op::ALOAD, op::ALOAD_0),
            _ => (op::ILOAD, op::ILOAD_0),
        };
        self.load_store(base, short_base, slot);
        self.note_local(slot, t.category());
        self.push(t.category());
    }

    pub fn store(&mut self, t: &JType, slot: u16) {
        let (base, short_base) = match t {
            JType::Primitive(PrimitiveKind::Long) => (op::LSTORE, op::LSTORE_0),
            JType::Primitive(PrimitiveKind::Float) => (op::FSTORE, op::FSTORE_0),
            JType::Primitive(PrimitiveKind::Double) => (op::DSTORE, op::DSTORE_0),
            t if t.is_reference() => (op::ASTORE, op::ASTORE_0),
            _ => (op::ISTORE, op::ISTORE_0),
        };
        self.pop(t.category());
        self.load_store(base, short_base, slot);
        self.note_local(slot, t.category());
    }

    pub fn iinc(&mut self, slot: u16, delta: i16) {
        if slot <= 0xFF && (-128..=127).contains(&delta) {
            self.u1(op::IINC);
            self.u1(slot as u8);
            self.u1(delta as i8 as u8);
        } else {
            self.u1(op::WIDE);
            self.u1(op::IINC);
            self.u2(slot);
            self.u2(delta as u16);
        }
        self.note_local(slot, 1);
    }

    // ----- labels and branches -----

    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() as u32 - 1)
    }

    pub fn mark(&mut self, label: Label) {
        self.labels[label.0 as usize] = Some(self.code.len() as u16);
    }

    pub fn is_marked(&self, label: Label) -> bool {
        self.labels[label.0 as usize].is_some()
    }

    /// Emit a branch instruction with a 16-bit offset to `label`.
    pub fn branch(&mut self, opcode: u8, label: Label) {
        let pops = match opcode {
            op::IF_ICMPEQ..=op::IF_ACMPNE => 2,
            op::IFEQ..=op::IFLE | op::IFNULL | op::IFNONNULL => 1,
            _ => 0,
        };
        self.pop(pops);
        let base = self.code.len();
        self.u1(opcode);
        self.patches.push(Patch { label, at: self.code.len(), base, wide: false });
        self.u2(0);
    }

    pub fn goto(&mut self, label: Label) {
        self.branch(op::GOTO, label);
    }

    // ----- switches -----

    fn align4(&mut self) {
        while self.code.len() % 4 != 0 {
            self.u1(0);
        }
    }

    fn switch_target(&mut self, base: usize, label: Label) {
        self.patches.push(Patch { label, at: self.code.len(), base, wide: true });
        self.i4(0);
    }

    /// Emit `tableswitch` over the dense range `low..=high`; `targets` has
    /// one label per key in order.
    pub fn tableswitch(&mut self, default: Label, low: i32, high: i32, targets: &[Label]) {
        self.pop(1);
        let base = self.code.len();
        self.u1(op::TABLESWITCH);
        self.align4();
        self.switch_target(base, default);
        self.i4(low);
        self.i4(high);
        for &target in targets {
            self.switch_target(base, target);
        }
    }

    /// Emit `lookupswitch`; pairs must be sorted by key ascending.
    pub fn lookupswitch(&mut self, default: Label, pairs: &[(i32, Label)]) {
        self.pop(1);
        let base = self.code.len();
        self.u1(op::LOOKUPSWITCH);
        self.align4();
        self.switch_target(base, default);
        self.i4(pairs.len() as i32);
        for &(key, target) in pairs {
            self.i4(key);
            self.switch_target(base, target);
        }
    }

    // ----- fields and methods -----

    pub fn field_op(
        &mut self,
        cp: &mut ConstantPool,
        opcode: u8,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<()> {
        let t = JType::from_descriptor(descriptor)?;
        let slots = t.category();
        match opcode {
            op::GETSTATIC => self.push(slots),
            op::PUTSTATIC => self.pop(slots),
            op::GETFIELD => {
                self.pop(1);
                self.push(slots);
            }
            op::PUTFIELD => self.pop(1 + slots),
            _ => return Err(Error::invariant(&self.method, "field_op with non-field opcode")),
        }
        let idx = cp.add_field_ref(class, name, descriptor);
        self.u1(opcode);
        self.u2(idx);
        Ok(())
    }

    pub fn invoke(
        &mut self,
        cp: &mut ConstantPool,
        opcode: u8,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<()> {
        let (params, ret) = parse_method_descriptor(descriptor)?;
        let arg_slots: u16 = params.iter().map(|p| p.category()).sum();
        let receiver = u16::from(opcode != op::INVOKESTATIC);
        self.pop(arg_slots + receiver);
        match opcode {
            op::INVOKEINTERFACE => {
                let idx = cp.add_interface_method_ref(class, name, descriptor);
                self.u1(opcode);
                self.u2(idx);
                self.u1((arg_slots + 1) as u8);
                self.u1(0);
            }
            op::INVOKEVIRTUAL | op::INVOKESPECIAL | op::INVOKESTATIC => {
                let idx = cp.add_method_ref(class, name, descriptor);
                self.u1(opcode);
                self.u2(idx);
            }
            _ => return Err(Error::invariant(&self.method, "invoke with non-invoke opcode")),
        }
        self.push(ret.slots());
        Ok(())
    }

    pub fn invoke_dynamic(
        &mut self,
        cp: &mut ConstantPool,
        bootstrap_idx: u16,
        name: &str,
        descriptor: &str,
    ) -> Result<()> {
        let (params, ret) = parse_method_descriptor(descriptor)?;
        let arg_slots: u16 = params.iter().map(|p| p.category()).sum();
        self.pop(arg_slots);
        let idx = cp.add_invoke_dynamic(bootstrap_idx, name, descriptor);
        self.u1(op::INVOKEDYNAMIC);
        self.u2(idx);
        self.u2(0);
        self.push(ret.slots());
        Ok(())
    }

    // ----- objects and arrays -----

    pub fn new_object(&mut self, cp: &mut ConstantPool, class: &str) {
        let idx = cp.add_class(class);
        self.u1(op::NEW);
        self.u2(idx);
        self.push(1);
    }

    pub fn checkcast(&mut self, cp: &mut ConstantPool, name: &str) {
        let idx = cp.add_class(name);
        self.u1(op::CHECKCAST);
        self.u2(idx);
    }

    pub fn instance_of(&mut self, cp: &mut ConstantPool, name: &str) {
        let idx = cp.add_class(name);
        self.pop(1);
        self.u1(op::INSTANCEOF);
        self.u2(idx);
        self.push(1);
    }

    pub fn newarray(&mut self, atype: u8) {
        self.pop(1);
        self.u1(op::NEWARRAY);
        self.u1(atype);
        self.push(1);
    }

    pub fn anewarray(&mut self, cp: &mut ConstantPool, name: &str) {
        let idx = cp.add_class(name);
        self.pop(1);
        self.u1(op::ANEWARRAY);
        self.u2(idx);
        self.push(1);
    }

    pub fn multianewarray(&mut self, cp: &mut ConstantPool, descriptor: &str, dims: u8) {
        let idx = cp.add_class(descriptor);
        self.pop(dims as u16);
        self.u1(op::MULTIANEWARRAY);
        self.u2(idx);
        self.u1(dims);
        self.push(1);
    }

    /// Emit the return instruction for a value of type `t`.
    pub fn ret(&mut self, t: &JType) {
        let opcode = match t {
            JType::Void => op::RETURN,
            JType::Primitive(PrimitiveKind::Long) => op::LRETURN,
            JType::Primitive(PrimitiveKind::Float) => op::FRETURN,
            JType::Primitive(PrimitiveKind::Double) => op::DRETURN,
            t if t.is_reference() => op::ARETURN,
            _ => op::IRETURN,
        };
        self.emit(opcode);
    }

    // ----- exception table -----

    pub fn add_exception_handler(
        &mut self,
        start: Label,
        end: Label,
        handler: Label,
        catch_type: u16,
    ) {
        self.handlers.push(HandlerRecord { start, end, handler, catch_type });
    }

    /// The JVM pushes the thrown reference when control enters a handler;
    /// account for it before compiling the handler body.
    pub fn enter_handler(&mut self) {
        self.set_stack_depth(0);
        self.push(1);
    }

    // ----- finish -----

    fn offset_of(&self, label: Label) -> Result<u16> {
        self.labels[label.0 as usize]
            .ok_or_else(|| Error::invariant(&self.method, format!("unbound label L{}", label.0)))
    }

    /// Resolve all patches and produce the `Code` attribute body.
    pub fn finish(mut self) -> Result<CodeAttribute> {
        if self.underflow {
            return Err(Error::invariant(&self.method, "operand stack underflow"));
        }
        for patch in std::mem::take(&mut self.patches) {
            let target = self.offset_of(patch.label)? as i64;
            let rel = target - patch.base as i64;
            if patch.wide {
                self.code[patch.at..patch.at + 4].copy_from_slice(&(rel as i32).to_be_bytes());
            } else {
                let rel16 = i16::try_from(rel).map_err(|_| {
                    Error::invariant(&self.method, format!("branch offset {} out of range", rel))
                })?;
                self.code[patch.at..patch.at + 2].copy_from_slice(&rel16.to_be_bytes());
            }
        }
        let mut exception_table = Vec::with_capacity(self.handlers.len());
        for h in &self.handlers {
            exception_table.push(ExceptionTableEntry {
                start_pc: self.offset_of(h.start)?,
                end_pc: self.offset_of(h.end)?,
                handler_pc: self.offset_of(h.handler)?,
                catch_type: h.catch_type,
            });
        }
        Ok(CodeAttribute {
            max_stack: self.max_stack,
            max_locals: self.max_locals,
            code: self.code,
            exception_table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_constant_selection() {
        let mut cp = ConstantPool::new();
        let mut b = BytecodeBuilder::new("t");
        b.push_int(&mut cp, 3); // iconst_3
        b.push_int(&mut cp, 100); // bipush 100
        b.push_int(&mut cp, 1000); // sipush 1000
        b.push_int(&mut cp, 100_000); // ldc
        let code = b.finish().unwrap();
        assert_eq!(code.code[0], op::ICONST_3);
        assert_eq!(code.code[1], op::BIPUSH);
        assert_eq!(code.code[3], op::SIPUSH);
        assert_eq!(code.code[6], op::LDC);
        assert_eq!(code.max_stack, 4);
    }

    #[test]
    fn category_two_tracking() {
        let mut cp = ConstantPool::new();
        let mut b = BytecodeBuilder::new("t");
        b.push_long(&mut cp, 7);
        b.push_long(&mut cp, 8);
        b.emit(op::LADD);
        b.emit(op::LRETURN);
        let code = b.finish().unwrap();
        assert_eq!(code.max_stack, 4);
    }

    #[test]
    fn forward_branch_is_patched() {
        let mut cp = ConstantPool::new();
        let mut b = BytecodeBuilder::new("t");
        let end = b.new_label();
        b.push_int(&mut cp, 0);
        b.branch(op::IFEQ, end);
        b.push_int(&mut cp, 1);
        b.emit(op::POP);
        b.mark(end);
        b.emit(op::RETURN);
        let code = b.finish().unwrap();
        // ifeq at offset 1, target at 6 -> relative 5
        assert_eq!(&code.code[2..4], &5i16.to_be_bytes());
    }

    #[test]
    fn unbound_label_is_fatal() {
        let mut b = BytecodeBuilder::new("m");
        let l = b.new_label();
        b.goto(l);
        let err = b.finish().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn wide_load_for_high_slots() {
        let mut b = BytecodeBuilder::new("t");
        b.load(&JType::int(), 300);
        assert_eq!(b.code[0], op::WIDE);
        assert_eq!(b.code[1], op::ILOAD);
        assert_eq!(b.max_locals, 301);
    }

    #[test]
    fn short_form_loads() {
        let mut b = BytecodeBuilder::new("t");
        b.load(&JType::int(), 0);
        b.load(&JType::object(), 1);
        b.load(&JType::long(), 4);
        assert_eq!(b.code[0], op::ILOAD_0);
        assert_eq!(b.code[1], op::ALOAD_0 + 1);
        assert_eq!(b.code[2], op::LLOAD);
        assert_eq!(b.max_locals, 6);
    }
}
