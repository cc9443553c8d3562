//! In-memory model of one output class file.
//!
//! The model owns its constant pool; serialization happens in
//! [`super::class_writer`]. Mutable counters for synthetic members (lambda
//! ids) live here so they are per-class, not process-global.

use super::constpool::ConstantPool;

pub const MAGIC: u32 = 0xCAFE_BABE;

/// Class-file versions the generator emits: Java 6 by default, Java 8 as
/// soon as the class uses `invokedynamic`.
pub const VERSION_JAVA_6: (u16, u16) = (50, 0);
pub const VERSION_JAVA_8: (u16, u16) = (52, 0);

pub mod flags {
    pub const ACC_PUBLIC: u16 = 0x0001;
    pub const ACC_PRIVATE: u16 = 0x0002;
    pub const ACC_PROTECTED: u16 = 0x0004;
    pub const ACC_STATIC: u16 = 0x0008;
    pub const ACC_FINAL: u16 = 0x0010;
    /// ACC_SUPER on classes
    pub const ACC_SUPER: u16 = 0x0020;
    pub const ACC_VOLATILE: u16 = 0x0040;
    pub const ACC_TRANSIENT: u16 = 0x0080;
    pub const ACC_VARARGS: u16 = 0x0080;
    pub const ACC_NATIVE: u16 = 0x0100;
    pub const ACC_INTERFACE: u16 = 0x0200;
    pub const ACC_ABSTRACT: u16 = 0x0400;
    pub const ACC_SYNTHETIC: u16 = 0x1000;
    pub const ACC_ANNOTATION: u16 = 0x2000;
    pub const ACC_ENUM: u16 = 0x4000;
}

/// One entry of a method's exception table. `catch_type` is a constant pool
/// `Class` index, or 0 for a catch-all handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

/// The body of a `Code` attribute.
#[derive(Debug, Clone, Default)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
}

/// A compile-time constant for the `ConstantValue` attribute of a
/// `static final` field.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
}

/// An annotation element value (JVMS §4.7.16.1).
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    /// B, C, I, S or Z constants all live in an Integer pool entry
    Int { tag: u8, value: i32 },
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    EnumConst { type_descriptor: String, const_name: String },
    Class(String),
    Nested(AnnotationInfo),
    Array(Vec<AnnotationValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationInfo {
    /// e.g. `Ljava/lang/Override;`
    pub type_descriptor: String,
    pub elements: Vec<(String, AnnotationValue)>,
}

/// One entry of the `InnerClasses` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClassInfo {
    pub inner_class: String,
    pub outer_class: Option<String>,
    pub inner_name: Option<String>,
    pub access_flags: u16,
}

/// One entry of the `BootstrapMethods` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapMethod {
    pub method_handle: u16,
    pub arguments: Vec<u16>,
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub annotations: Vec<AnnotationInfo>,
    pub constant_value: Option<ConstValue>,
}

impl FieldInfo {
    pub fn new(access_flags: u16, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access_flags,
            name: name.into(),
            descriptor: descriptor.into(),
            signature: None,
            annotations: Vec::new(),
            constant_value: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub code: Option<CodeAttribute>,
    pub signature: Option<String>,
    pub annotations: Vec<AnnotationInfo>,
    /// Internal names of declared thrown exception classes
    pub exceptions: Vec<String>,
    /// Parameter names for the MethodParameters attribute; empty to omit
    pub parameter_names: Vec<String>,
    pub parameter_annotations: Vec<Vec<AnnotationInfo>>,
}

impl MethodInfo {
    pub fn new(access_flags: u16, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access_flags,
            name: name.into(),
            descriptor: descriptor.into(),
            code: None,
            signature: None,
            annotations: Vec::new(),
            exceptions: Vec::new(),
            parameter_names: Vec::new(),
            parameter_annotations: Vec::new(),
        }
    }
}

/// One class file being built.
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub version: (u16, u16),
    pub access_flags: u16,
    /// Internal name, e.g. `com/example/Outer$Inner`
    pub name: String,
    /// Internal name of the super class; `None` only for `java/lang/Object`
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub cp: ConstantPool,
    pub source_file: Option<String>,
    pub signature: Option<String>,
    pub annotations: Vec<AnnotationInfo>,
    pub inner_classes: Vec<InnerClassInfo>,
    pub bootstrap_methods: Vec<BootstrapMethod>,
    /// Counter backing `lambda$...$N` naming within this class
    pub lambda_counter: u32,
}

impl ClassFile {
    pub fn new(name: impl Into<String>, super_class: impl Into<String>) -> Self {
        Self {
            version: VERSION_JAVA_6,
            access_flags: flags::ACC_PUBLIC | flags::ACC_SUPER,
            name: name.into(),
            super_class: Some(super_class.into()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            cp: ConstantPool::new(),
            source_file: None,
            signature: None,
            annotations: Vec::new(),
            inner_classes: Vec::new(),
            bootstrap_methods: Vec::new(),
            lambda_counter: 0,
        }
    }

    pub fn add_field(&mut self, field: FieldInfo) {
        self.fields.push(field);
    }

    pub fn add_method(&mut self, method: MethodInfo) {
        self.methods.push(method);
    }

    /// Register a bootstrap method and return its index in the
    /// `BootstrapMethods` table. A class with any bootstrap method needs the
    /// Java 8 class-file version.
    pub fn add_bootstrap_method(&mut self, method_handle: u16, arguments: Vec<u16>) -> u16 {
        let entry = BootstrapMethod { method_handle, arguments };
        if let Some(pos) = self.bootstrap_methods.iter().position(|b| *b == entry) {
            return pos as u16;
        }
        self.bootstrap_methods.push(entry);
        self.version = VERSION_JAVA_8;
        (self.bootstrap_methods.len() - 1) as u16
    }

    pub fn next_lambda_id(&mut self) -> u32 {
        let id = self.lambda_counter;
        self.lambda_counter += 1;
        id
    }
}
