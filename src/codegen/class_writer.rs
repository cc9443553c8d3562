//! Class-file serialization (JVMS §4.1).
//!
//! The field, method and attribute tables are rendered into side buffers
//! first; that pass interns every pool entry the tables reference, so the
//! pool written afterwards is complete. Writing is all-or-nothing: any
//! unbound pool reference fails the whole class.

use super::attr;
use super::class::{ClassFile, FieldInfo, MethodInfo, MAGIC};
use super::constpool::ConstantPool;
use crate::common::Result;

fn write_field(cp: &mut ConstantPool, out: &mut Vec<u8>, field: &FieldInfo) {
    let name_idx = cp.add_utf8(&field.name);
    let desc_idx = cp.add_utf8(&field.descriptor);
    out.extend_from_slice(&field.access_flags.to_be_bytes());
    out.extend_from_slice(&name_idx.to_be_bytes());
    out.extend_from_slice(&desc_idx.to_be_bytes());

    let mut attr_count: u16 = 0;
    let mut attrs = Vec::new();
    if let Some(sig) = &field.signature {
        attr::write_signature(cp, &mut attrs, sig);
        attr_count += 1;
    }
    if !field.annotations.is_empty() {
        attr::write_annotations(cp, &mut attrs, &field.annotations);
        attr_count += 1;
    }
    if let Some(value) = &field.constant_value {
        attr::write_constant_value(cp, &mut attrs, value);
        attr_count += 1;
    }
    out.extend_from_slice(&attr_count.to_be_bytes());
    out.extend_from_slice(&attrs);
}

fn write_method(cp: &mut ConstantPool, out: &mut Vec<u8>, method: &MethodInfo) {
    let name_idx = cp.add_utf8(&method.name);
    let desc_idx = cp.add_utf8(&method.descriptor);
    out.extend_from_slice(&method.access_flags.to_be_bytes());
    out.extend_from_slice(&name_idx.to_be_bytes());
    out.extend_from_slice(&desc_idx.to_be_bytes());

    let has_param_annotations = method.parameter_annotations.iter().any(|a| !a.is_empty());
    let mut attr_count: u16 = 0;
    let mut attrs = Vec::new();
    if let Some(code) = &method.code {
        attr::write_code(cp, &mut attrs, code);
        attr_count += 1;
    }
    if let Some(sig) = &method.signature {
        attr::write_signature(cp, &mut attrs, sig);
        attr_count += 1;
    }
    if !method.annotations.is_empty() {
        attr::write_annotations(cp, &mut attrs, &method.annotations);
        attr_count += 1;
    }
    if !method.exceptions.is_empty() {
        attr::write_exceptions(cp, &mut attrs, &method.exceptions);
        attr_count += 1;
    }
    if !method.parameter_names.is_empty() {
        attr::write_method_parameters(cp, &mut attrs, &method.parameter_names);
        attr_count += 1;
    }
    if has_param_annotations {
        attr::write_parameter_annotations(cp, &mut attrs, &method.parameter_annotations);
        attr_count += 1;
    }
    out.extend_from_slice(&attr_count.to_be_bytes());
    out.extend_from_slice(&attrs);
}

/// Serialize the class to its on-disk byte layout.
pub fn to_bytes(class: &mut ClassFile) -> Result<Vec<u8>> {
    let ClassFile {
        version,
        access_flags,
        name,
        super_class,
        interfaces,
        fields,
        methods,
        cp,
        source_file,
        signature,
        annotations,
        inner_classes,
        bootstrap_methods,
        ..
    } = class;

    let this_idx = cp.add_class(name);
    let super_idx = super_class.as_deref().map_or(0, |s| cp.add_class(s));
    let interface_idxs: Vec<u16> = interfaces.iter().map(|i| cp.add_class(i)).collect();

    let mut fields_buf = Vec::new();
    for field in fields.iter() {
        write_field(cp, &mut fields_buf, field);
    }

    let mut methods_buf = Vec::new();
    for method in methods.iter() {
        write_method(cp, &mut methods_buf, method);
    }

    let mut class_attrs = Vec::new();
    let mut class_attr_count: u16 = 0;
    if let Some(sig) = signature {
        attr::write_signature(cp, &mut class_attrs, sig);
        class_attr_count += 1;
    }
    if !annotations.is_empty() {
        attr::write_annotations(cp, &mut class_attrs, annotations);
        class_attr_count += 1;
    }
    if !inner_classes.is_empty() {
        attr::write_inner_classes(cp, &mut class_attrs, inner_classes);
        class_attr_count += 1;
    }
    if !bootstrap_methods.is_empty() {
        attr::write_bootstrap_methods(cp, &mut class_attrs, bootstrap_methods);
        class_attr_count += 1;
    }
    if let Some(file) = source_file {
        attr::write_source_file(cp, &mut class_attrs, file);
        class_attr_count += 1;
    }

    let mut out = Vec::with_capacity(512 + fields_buf.len() + methods_buf.len());
    out.extend_from_slice(&MAGIC.to_be_bytes());
    out.extend_from_slice(&version.1.to_be_bytes()); // minor
    out.extend_from_slice(&version.0.to_be_bytes()); // major
    cp.serialize(&mut out)?;
    out.extend_from_slice(&access_flags.to_be_bytes());
    out.extend_from_slice(&this_idx.to_be_bytes());
    out.extend_from_slice(&super_idx.to_be_bytes());
    out.extend_from_slice(&(interface_idxs.len() as u16).to_be_bytes());
    for idx in interface_idxs {
        out.extend_from_slice(&idx.to_be_bytes());
    }
    out.extend_from_slice(&(fields.len() as u16).to_be_bytes());
    out.extend_from_slice(&fields_buf);
    out.extend_from_slice(&(methods.len() as u16).to_be_bytes());
    out.extend_from_slice(&methods_buf);
    out.extend_from_slice(&class_attr_count.to_be_bytes());
    out.extend_from_slice(&class_attrs);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::super::class::{flags, ClassFile, FieldInfo, MethodInfo};
    use super::*;

    #[test]
    fn minimal_class_layout() {
        let mut class = ClassFile::new("A", "java/lang/Object");
        class.source_file = Some("A.java".to_string());
        let bytes = to_bytes(&mut class).unwrap();
        assert_eq!(&bytes[0..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
        // minor 0, major 50
        assert_eq!(&bytes[4..8], &[0, 0, 0, 50]);
    }

    #[test]
    fn members_and_attributes_serialize() {
        let mut class = ClassFile::new("B", "java/lang/Object");
        class.add_field(FieldInfo::new(flags::ACC_PRIVATE, "x", "I"));
        let mut m = MethodInfo::new(flags::ACC_PUBLIC | flags::ACC_ABSTRACT, "f", "()I");
        m.exceptions.push("java/io/IOException".to_string());
        class.add_method(m);
        let bytes = to_bytes(&mut class).unwrap();
        assert!(bytes.len() > 40);
    }
}
