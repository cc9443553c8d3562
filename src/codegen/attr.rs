//! Attribute serialization.
//!
//! Every attribute is written as `name_index u2, length u4, body`; the
//! length is computed from the body each writer just produced. The writers
//! intern whatever pool entries they need on the way.

use super::class::{
    AnnotationInfo, AnnotationValue, BootstrapMethod, CodeAttribute, ConstValue, InnerClassInfo,
};
use super::constpool::ConstantPool;

fn write_attribute(cp: &mut ConstantPool, out: &mut Vec<u8>, name: &str, body: &[u8]) {
    let name_idx = cp.add_utf8(name);
    out.extend_from_slice(&name_idx.to_be_bytes());
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(body);
}

pub fn write_code(cp: &mut ConstantPool, out: &mut Vec<u8>, code: &CodeAttribute) {
    let mut body = Vec::with_capacity(code.code.len() + 16);
    body.extend_from_slice(&code.max_stack.to_be_bytes());
    body.extend_from_slice(&code.max_locals.to_be_bytes());
    body.extend_from_slice(&(code.code.len() as u32).to_be_bytes());
    body.extend_from_slice(&code.code);
    body.extend_from_slice(&(code.exception_table.len() as u16).to_be_bytes());
    for entry in &code.exception_table {
        body.extend_from_slice(&entry.start_pc.to_be_bytes());
        body.extend_from_slice(&entry.end_pc.to_be_bytes());
        body.extend_from_slice(&entry.handler_pc.to_be_bytes());
        body.extend_from_slice(&entry.catch_type.to_be_bytes());
    }
    // no sub-attributes: we emit neither LineNumberTable nor StackMapTable
    body.extend_from_slice(&0u16.to_be_bytes());
    write_attribute(cp, out, "Code", &body);
}

pub fn write_signature(cp: &mut ConstantPool, out: &mut Vec<u8>, signature: &str) {
    let sig_idx = cp.add_utf8(signature);
    write_attribute(cp, out, "Signature", &sig_idx.to_be_bytes());
}

pub fn write_source_file(cp: &mut ConstantPool, out: &mut Vec<u8>, file_name: &str) {
    let idx = cp.add_utf8(file_name);
    write_attribute(cp, out, "SourceFile", &idx.to_be_bytes());
}

pub fn write_exceptions(cp: &mut ConstantPool, out: &mut Vec<u8>, exceptions: &[String]) {
    let mut body = Vec::new();
    body.extend_from_slice(&(exceptions.len() as u16).to_be_bytes());
    for exc in exceptions {
        let idx = cp.add_class(exc);
        body.extend_from_slice(&idx.to_be_bytes());
    }
    write_attribute(cp, out, "Exceptions", &body);
}

pub fn write_constant_value(cp: &mut ConstantPool, out: &mut Vec<u8>, value: &ConstValue) {
    let idx = match value {
        ConstValue::Integer(v) => cp.add_integer(*v),
        ConstValue::Long(v) => cp.add_long(*v),
        ConstValue::Float(v) => cp.add_float(*v),
        ConstValue::Double(v) => cp.add_double(*v),
        ConstValue::Str(v) => cp.add_string(v),
    };
    write_attribute(cp, out, "ConstantValue", &idx.to_be_bytes());
}

fn write_element_value(cp: &mut ConstantPool, body: &mut Vec<u8>, value: &AnnotationValue) {
    match value {
        AnnotationValue::Int { tag, value } => {
            body.push(*tag);
            let idx = cp.add_integer(*value);
            body.extend_from_slice(&idx.to_be_bytes());
        }
        AnnotationValue::Long(v) => {
            body.push(b'J');
            let idx = cp.add_long(*v);
            body.extend_from_slice(&idx.to_be_bytes());
        }
        AnnotationValue::Float(v) => {
            body.push(b'F');
            let idx = cp.add_float(*v);
            body.extend_from_slice(&idx.to_be_bytes());
        }
        AnnotationValue::Double(v) => {
            body.push(b'D');
            let idx = cp.add_double(*v);
            body.extend_from_slice(&idx.to_be_bytes());
        }
        AnnotationValue::Str(s) => {
            body.push(b's');
            let idx = cp.add_utf8(s);
            body.extend_from_slice(&idx.to_be_bytes());
        }
        AnnotationValue::EnumConst { type_descriptor, const_name } => {
            body.push(b'e');
            let t = cp.add_utf8(type_descriptor);
            let n = cp.add_utf8(const_name);
            body.extend_from_slice(&t.to_be_bytes());
            body.extend_from_slice(&n.to_be_bytes());
        }
        AnnotationValue::Class(descriptor) => {
            body.push(b'c');
            let idx = cp.add_utf8(descriptor);
            body.extend_from_slice(&idx.to_be_bytes());
        }
        AnnotationValue::Nested(ann) => {
            body.push(b'@');
            write_annotation(cp, body, ann);
        }
        AnnotationValue::Array(values) => {
            body.push(b'[');
            body.extend_from_slice(&(values.len() as u16).to_be_bytes());
            for v in values {
                write_element_value(cp, body, v);
            }
        }
    }
}

fn write_annotation(cp: &mut ConstantPool, body: &mut Vec<u8>, ann: &AnnotationInfo) {
    let type_idx = cp.add_utf8(&ann.type_descriptor);
    body.extend_from_slice(&type_idx.to_be_bytes());
    body.extend_from_slice(&(ann.elements.len() as u16).to_be_bytes());
    for (name, value) in &ann.elements {
        let name_idx = cp.add_utf8(name);
        body.extend_from_slice(&name_idx.to_be_bytes());
        write_element_value(cp, body, value);
    }
}

pub fn write_annotations(cp: &mut ConstantPool, out: &mut Vec<u8>, annotations: &[AnnotationInfo]) {
    let mut body = Vec::new();
    body.extend_from_slice(&(annotations.len() as u16).to_be_bytes());
    for ann in annotations {
        write_annotation(cp, &mut body, ann);
    }
    write_attribute(cp, out, "RuntimeVisibleAnnotations", &body);
}

pub fn write_parameter_annotations(
    cp: &mut ConstantPool,
    out: &mut Vec<u8>,
    param_annotations: &[Vec<AnnotationInfo>],
) {
    let mut body = Vec::new();
    body.push(param_annotations.len() as u8);
    for anns in param_annotations {
        body.extend_from_slice(&(anns.len() as u16).to_be_bytes());
        for ann in anns {
            write_annotation(cp, &mut body, ann);
        }
    }
    write_attribute(cp, out, "RuntimeVisibleParameterAnnotations", &body);
}

pub fn write_method_parameters(cp: &mut ConstantPool, out: &mut Vec<u8>, names: &[String]) {
    let mut body = Vec::new();
    body.push(names.len() as u8);
    for name in names {
        let name_idx = if name.is_empty() { 0 } else { cp.add_utf8(name) };
        body.extend_from_slice(&name_idx.to_be_bytes());
        body.extend_from_slice(&0u16.to_be_bytes()); // access flags
    }
    write_attribute(cp, out, "MethodParameters", &body);
}

pub fn write_inner_classes(cp: &mut ConstantPool, out: &mut Vec<u8>, inner: &[InnerClassInfo]) {
    let mut body = Vec::new();
    body.extend_from_slice(&(inner.len() as u16).to_be_bytes());
    for ic in inner {
        let inner_idx = cp.add_class(&ic.inner_class);
        let outer_idx = ic.outer_class.as_deref().map_or(0, |o| cp.add_class(o));
        let name_idx = ic.inner_name.as_deref().map_or(0, |n| cp.add_utf8(n));
        body.extend_from_slice(&inner_idx.to_be_bytes());
        body.extend_from_slice(&outer_idx.to_be_bytes());
        body.extend_from_slice(&name_idx.to_be_bytes());
        body.extend_from_slice(&ic.access_flags.to_be_bytes());
    }
    write_attribute(cp, out, "InnerClasses", &body);
}

pub fn write_bootstrap_methods(
    cp: &mut ConstantPool,
    out: &mut Vec<u8>,
    methods: &[BootstrapMethod],
) {
    let mut body = Vec::new();
    body.extend_from_slice(&(methods.len() as u16).to_be_bytes());
    for bsm in methods {
        body.extend_from_slice(&bsm.method_handle.to_be_bytes());
        body.extend_from_slice(&(bsm.arguments.len() as u16).to_be_bytes());
        for arg in &bsm.arguments {
            body.extend_from_slice(&arg.to_be_bytes());
        }
    }
    write_attribute(cp, out, "BootstrapMethods", &body);
}
