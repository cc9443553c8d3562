//! Code generation driver.
//!
//! Compilation is two-phase. Phase 1 walks every type declaration and
//! registers a resolution skeleton (name, super, interfaces, field and
//! method signatures) with the classpath, so bodies compiled later can
//! reference any class of the invocation regardless of order. Phase 2
//! compiles bodies and serializes class files.

use super::class::{
    flags, AnnotationInfo, AnnotationValue, ClassFile, ConstValue, FieldInfo, InnerClassInfo,
    MethodInfo,
};
use super::class_reader::{ParsedClass, ParsedField, ParsedMethod};
use super::class_writer;
use super::classpath::ClassPath;
use super::method_context::MethodContext;
use super::resolve::{self, UnitScope};
use super::signature;
use super::types::{method_descriptor, JType, PrimitiveKind};
use crate::ast::*;
use crate::common::{Config, Error, Result};
use crate::parser::span::Span;
use std::collections::{BTreeMap, HashSet};

/// Name of the synthetic array backing `values()` on an enum.
const ENUM_VALUES_FIELD: &str = "$VALUES";

pub struct Gen<'a> {
    pub classpath: &'a mut ClassPath,
    pub config: &'a Config,
    pub scope: UnitScope,
    source_file: String,
    /// Finished class files of this unit, binary name order
    outputs: Vec<ClassFile>,
    /// Non-fatal errors collected at the unit boundary
    pub errors: Vec<Error>,
    /// Resolved type arguments of a declared functional-interface type,
    /// handed from a declaration site to the lambda it initializes
    pub lambda_type_args: Option<Vec<JType>>,
}

/// Per-class compilation state. Nested classes get their own.
pub struct ClassCtx {
    pub class_file: ClassFile,
    pub name: String,
    pub super_name: String,
    pub is_interface: bool,
    pub type_params: HashSet<String>,
    /// Instance field initializers, run in every non-delegating constructor
    pub field_inits: Vec<(String, JType, Expr)>,
    /// Static field initializers and static blocks, in declaration order
    pub static_inits: Vec<StaticInit>,
}

pub enum StaticInit {
    Field(String, JType, Expr),
    Block(Block),
}

/// Build the naming scope of one unit.
pub fn unit_scope(unit: &CompilationUnit) -> UnitScope {
    let mut scope = UnitScope {
        package: unit
            .package
            .as_ref()
            .map(|p| p.name.replace('.', "/"))
            .unwrap_or_default(),
        ..UnitScope::default()
    };
    for import in &unit.imports {
        if import.is_static {
            continue;
        }
        if import.is_wildcard {
            scope.wildcard_imports.push(import.name.replace('.', "/"));
        } else if let Some(simple) = import.name.rsplit('.').next() {
            scope.single_imports.insert(simple.to_string(), import.name.replace('.', "/"));
        }
    }
    fn collect(scope: &mut UnitScope, decl: &TypeDecl, enclosing: Option<&str>) {
        let binary = match enclosing {
            Some(outer) => format!("{}${}", outer, decl.name()),
            None => scope.binary_name(decl.name()),
        };
        scope.unit_types.insert(decl.name().to_string(), binary.clone());
        let body = match decl {
            TypeDecl::Class(c) => &c.body,
            TypeDecl::Interface(i) => &i.body,
            TypeDecl::Enum(e) => &e.body,
        };
        for member in body {
            if let ClassMember::Type(nested) = member {
                collect(scope, nested, Some(&binary));
            }
        }
    }
    for decl in &unit.types {
        collect(&mut scope, decl, None);
    }
    scope
}

fn modifier_flags(modifiers: &[Modifier]) -> u16 {
    let mut out = 0;
    for m in modifiers {
        out |= match m {
            Modifier::Public => flags::ACC_PUBLIC,
            Modifier::Private => flags::ACC_PRIVATE,
            Modifier::Protected => flags::ACC_PROTECTED,
            Modifier::Static => flags::ACC_STATIC,
            Modifier::Final => flags::ACC_FINAL,
            Modifier::Abstract => flags::ACC_ABSTRACT,
            Modifier::Native => flags::ACC_NATIVE,
            Modifier::Transient => flags::ACC_TRANSIENT,
            Modifier::Volatile => flags::ACC_VOLATILE,
            Modifier::Strictfp | Modifier::Default => 0,
        };
    }
    out
}

/// Resolve a source type reference to a JVM type, erasing type variables to
/// their first bound (or `Object`).
pub fn resolve_type_ref(
    classpath: &mut ClassPath,
    scope: &UnitScope,
    enclosing: Option<&str>,
    type_params: &HashSet<String>,
    ty: &TypeRef,
) -> Result<JType> {
    match ty {
        TypeRef::Void { .. } => Ok(JType::Void),
        TypeRef::Primitive { name, span } => PrimitiveKind::from_source_name(name)
            .map(JType::Primitive)
            .ok_or_else(|| Error::unresolved(*span, "class", name.clone())),
        TypeRef::Array { elem, dims, .. } => {
            let elem_ty = resolve_type_ref(classpath, scope, enclosing, type_params, elem)?;
            match elem_ty {
                JType::Array { elem, dims: inner } => {
                    Ok(JType::Array { elem, dims: inner + dims })
                }
                other => Ok(JType::array(other, *dims)),
            }
        }
        TypeRef::Named { name, span, .. } => {
            if type_params.contains(name) {
                return Ok(JType::object());
            }
            resolve::resolve_class_name(classpath, scope, enclosing, name, *span)
                .map(JType::Reference)
        }
    }
}

// ----- phase 1: skeleton registration -----

/// Register bare class names so phase 1 can resolve cross-unit references.
pub fn register_names(classpath: &mut ClassPath, unit: &CompilationUnit) {
    let scope = unit_scope(unit);
    for internal in scope.unit_types.values() {
        classpath.register(ParsedClass {
            version: (50, 0),
            access_flags: flags::ACC_PUBLIC,
            name: internal.clone(),
            super_class: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        });
    }
}

/// Register full signatures for every type of the unit.
pub fn register_unit(classpath: &mut ClassPath, unit: &CompilationUnit) -> Result<()> {
    let scope = unit_scope(unit);
    for decl in &unit.types {
        register_type(classpath, &scope, decl, None)?;
    }
    Ok(())
}

fn register_type(
    classpath: &mut ClassPath,
    scope: &UnitScope,
    decl: &TypeDecl,
    enclosing: Option<&str>,
) -> Result<()> {
    let binary = match enclosing {
        Some(outer) => format!("{}${}", outer, decl.name()),
        None => scope.binary_name(decl.name()),
    };
    let skeleton = match decl {
        TypeDecl::Class(c) => class_skeleton(classpath, scope, c, &binary, enclosing)?,
        TypeDecl::Interface(i) => interface_skeleton(classpath, scope, i, &binary, enclosing)?,
        TypeDecl::Enum(e) => enum_skeleton(classpath, scope, e, &binary, enclosing)?,
    };
    classpath.register(skeleton);
    let body = match decl {
        TypeDecl::Class(c) => &c.body,
        TypeDecl::Interface(i) => &i.body,
        TypeDecl::Enum(e) => &e.body,
    };
    for member in body {
        if let ClassMember::Type(nested) = member {
            register_type(classpath, scope, nested, Some(&binary))?;
        }
    }
    Ok(())
}

fn member_signatures(
    classpath: &mut ClassPath,
    scope: &UnitScope,
    enclosing: Option<&str>,
    type_params: &HashSet<String>,
    body: &[ClassMember],
    default_field_flags: u16,
    default_method_flags: u16,
) -> Result<(Vec<ParsedField>, Vec<ParsedMethod>)> {
    let mut fields = Vec::new();
    let mut methods = Vec::new();
    for member in body {
        match member {
            ClassMember::Field(f) => {
                let ty = resolve_type_ref(classpath, scope, enclosing, type_params, &f.ty)?;
                for declarator in &f.declarators {
                    let ty = with_extra_dims(&ty, declarator.extra_dims);
                    fields.push(ParsedField {
                        access_flags: modifier_flags(&f.modifiers) | default_field_flags,
                        name: declarator.name.clone(),
                        descriptor: ty.descriptor(),
                        signature: None,
                    });
                }
            }
            ClassMember::Method(m) => {
                let mut method_params = type_params.clone();
                method_params.extend(m.type_params.iter().map(|p| p.name.clone()));
                let mut params = Vec::new();
                for p in &m.params {
                    let ty = resolve_type_ref(classpath, scope, enclosing, &method_params, &p.ty)?;
                    params.push(if p.varargs { JType::array(ty, 1) } else { ty });
                }
                let ret =
                    resolve_type_ref(classpath, scope, enclosing, &method_params, &m.return_type)?;
                let mut access = modifier_flags(&m.modifiers) | default_method_flags;
                if m.params.last().is_some_and(|p| p.varargs) {
                    access |= flags::ACC_VARARGS;
                }
                if m.body.is_none() && access & flags::ACC_NATIVE == 0 {
                    access |= flags::ACC_ABSTRACT;
                }
                methods.push(ParsedMethod {
                    access_flags: access,
                    name: m.name.clone(),
                    descriptor: method_descriptor(&params, &ret),
                    signature: None,
                    exceptions: Vec::new(),
                    code: None,
                });
            }
            ClassMember::Constructor(c) => {
                let mut params = Vec::new();
                for p in &c.params {
                    let ty = resolve_type_ref(classpath, scope, enclosing, type_params, &p.ty)?;
                    params.push(if p.varargs { JType::array(ty, 1) } else { ty });
                }
                let mut access = modifier_flags(&c.modifiers);
                if c.params.last().is_some_and(|p| p.varargs) {
                    access |= flags::ACC_VARARGS;
                }
                methods.push(ParsedMethod {
                    access_flags: access,
                    name: "<init>".to_string(),
                    descriptor: method_descriptor(&params, &JType::Void),
                    signature: None,
                    exceptions: Vec::new(),
                    code: None,
                });
            }
            ClassMember::Type(_) | ClassMember::Initializer { .. } => {}
        }
    }
    Ok((fields, methods))
}

fn class_skeleton(
    classpath: &mut ClassPath,
    scope: &UnitScope,
    c: &ClassDecl,
    binary: &str,
    enclosing: Option<&str>,
) -> Result<ParsedClass> {
    let type_params: HashSet<String> = c.type_params.iter().map(|p| p.name.clone()).collect();
    let super_class = match &c.extends {
        Some(t) => match resolve_type_ref(classpath, scope, enclosing, &type_params, t)? {
            JType::Reference(name) => name,
            other => {
                return Err(Error::type_error(t.span(), format!("cannot extend {}", other)))
            }
        },
        None => "java/lang/Object".to_string(),
    };
    let mut interfaces = Vec::new();
    for iface in &c.implements {
        if let JType::Reference(name) =
            resolve_type_ref(classpath, scope, enclosing, &type_params, iface)?
        {
            interfaces.push(name);
        }
    }
    let (fields, mut methods) =
        member_signatures(classpath, scope, enclosing, &type_params, &c.body, 0, 0)?;
    if !methods.iter().any(|m| m.name == "<init>") {
        methods.push(ParsedMethod {
            access_flags: flags::ACC_PUBLIC,
            name: "<init>".to_string(),
            descriptor: "()V".to_string(),
            signature: None,
            exceptions: Vec::new(),
            code: None,
        });
    }
    Ok(ParsedClass {
        version: (50, 0),
        access_flags: modifier_flags(&c.modifiers) | flags::ACC_SUPER,
        name: binary.to_string(),
        super_class: Some(super_class),
        interfaces,
        fields,
        methods,
    })
}

fn interface_skeleton(
    classpath: &mut ClassPath,
    scope: &UnitScope,
    i: &InterfaceDecl,
    binary: &str,
    enclosing: Option<&str>,
) -> Result<ParsedClass> {
    let type_params: HashSet<String> = i.type_params.iter().map(|p| p.name.clone()).collect();
    let mut interfaces = Vec::new();
    for iface in &i.extends {
        if let JType::Reference(name) =
            resolve_type_ref(classpath, scope, enclosing, &type_params, iface)?
        {
            interfaces.push(name);
        }
    }
    let (fields, methods) = member_signatures(
        classpath,
        scope,
        enclosing,
        &type_params,
        &i.body,
        flags::ACC_PUBLIC | flags::ACC_STATIC | flags::ACC_FINAL,
        flags::ACC_PUBLIC,
    )?;
    Ok(ParsedClass {
        version: (50, 0),
        access_flags: modifier_flags(&i.modifiers)
            | flags::ACC_INTERFACE
            | flags::ACC_ABSTRACT,
        name: binary.to_string(),
        super_class: Some("java/lang/Object".to_string()),
        interfaces,
        fields,
        methods,
    })
}

fn enum_skeleton(
    classpath: &mut ClassPath,
    scope: &UnitScope,
    e: &EnumDecl,
    binary: &str,
    enclosing: Option<&str>,
) -> Result<ParsedClass> {
    let type_params = HashSet::new();
    let mut interfaces = Vec::new();
    for iface in &e.implements {
        if let JType::Reference(name) =
            resolve_type_ref(classpath, scope, enclosing, &type_params, iface)?
        {
            interfaces.push(name);
        }
    }
    let self_desc = format!("L{};", binary);
    let array_desc = format!("[{}", self_desc);
    // constants first, in declaration order: ordinals and switch lowering
    // depend on it
    let mut fields: Vec<ParsedField> = e
        .constants
        .iter()
        .map(|c| ParsedField {
            access_flags: flags::ACC_PUBLIC
                | flags::ACC_STATIC
                | flags::ACC_FINAL
                | flags::ACC_ENUM,
            name: c.name.clone(),
            descriptor: self_desc.clone(),
            signature: None,
        })
        .collect();
    let (user_fields, mut methods) =
        member_signatures(classpath, scope, enclosing, &type_params, &e.body, 0, 0)?;
    fields.extend(user_fields);
    fields.push(ParsedField {
        access_flags: flags::ACC_PRIVATE
            | flags::ACC_STATIC
            | flags::ACC_FINAL
            | flags::ACC_SYNTHETIC,
        name: ENUM_VALUES_FIELD.to_string(),
        descriptor: array_desc.clone(),
        signature: None,
    });
    // the (String, int) prefix of every enum constructor
    for m in methods.iter_mut().filter(|m| m.name == "<init>") {
        m.access_flags = (m.access_flags & !(flags::ACC_PUBLIC | flags::ACC_PROTECTED))
            | flags::ACC_PRIVATE;
        m.descriptor = format!("(Ljava/lang/String;I{}", &m.descriptor[1..]);
    }
    if !methods.iter().any(|m| m.name == "<init>") {
        methods.push(ParsedMethod {
            access_flags: flags::ACC_PRIVATE,
            name: "<init>".to_string(),
            descriptor: "(Ljava/lang/String;I)V".to_string(),
            signature: None,
            exceptions: Vec::new(),
            code: None,
        });
    }
    methods.push(ParsedMethod {
        access_flags: flags::ACC_PUBLIC | flags::ACC_STATIC,
        name: "values".to_string(),
        descriptor: format!("(){}", array_desc),
        signature: None,
        exceptions: Vec::new(),
        code: None,
    });
    methods.push(ParsedMethod {
        access_flags: flags::ACC_PUBLIC | flags::ACC_STATIC,
        name: "valueOf".to_string(),
        descriptor: format!("(Ljava/lang/String;){}", self_desc),
        signature: None,
        exceptions: Vec::new(),
        code: None,
    });
    Ok(ParsedClass {
        version: (50, 0),
        access_flags: modifier_flags(&e.modifiers)
            | flags::ACC_SUPER
            | flags::ACC_FINAL
            | flags::ACC_ENUM,
        name: binary.to_string(),
        super_class: Some("java/lang/Enum".to_string()),
        interfaces,
        fields,
        methods,
    })
}

fn with_extra_dims(ty: &JType, extra: u8) -> JType {
    if extra == 0 {
        return ty.clone();
    }
    match ty.clone() {
        JType::Array { elem, dims } => JType::Array { elem, dims: dims + extra },
        other => JType::array(other, extra),
    }
}

// ----- phase 2: compilation -----

impl<'a> Gen<'a> {
    pub fn new(classpath: &'a mut ClassPath, config: &'a Config, unit: &CompilationUnit) -> Self {
        Self {
            classpath,
            config,
            scope: unit_scope(unit),
            source_file: unit.source_file.clone(),
            outputs: Vec::new(),
            errors: Vec::new(),
            lambda_type_args: None,
        }
    }

    /// Compile one unit to a map from binary name to class-file bytes. A
    /// failing unit produces no classes; all errors collected across its
    /// members are reported together.
    pub fn compile_unit(
        mut self,
        unit: &CompilationUnit,
    ) -> std::result::Result<BTreeMap<String, Vec<u8>>, Vec<Error>> {
        let mut run = || -> Result<()> {
            if unit.types.is_empty() {
                if let Some(pkg) = &unit.package {
                    if !pkg.annotations.is_empty() {
                        self.compile_package_info(pkg)?;
                    }
                }
            }
            for decl in &unit.types {
                self.compile_type(decl, None)?;
            }
            Ok(())
        };
        if let Err(fatal) = run() {
            self.errors.push(fatal);
        }
        if !self.errors.is_empty() {
            return Err(self.errors);
        }
        let mut result = BTreeMap::new();
        for mut class_file in self.outputs {
            let name = class_file.name.clone();
            let bytes = class_writer::to_bytes(&mut class_file).map_err(|e| vec![e])?;
            result.insert(name, bytes);
        }
        Ok(result)
    }

    fn compile_package_info(&mut self, pkg: &PackageDecl) -> Result<()> {
        let name = format!("{}/package-info", pkg.name.replace('.', "/"));
        let mut class_file = ClassFile::new(name, "java/lang/Object");
        class_file.access_flags =
            flags::ACC_INTERFACE | flags::ACC_ABSTRACT | flags::ACC_SYNTHETIC;
        class_file.source_file = Some(self.source_file.clone());
        class_file.annotations = self.convert_annotations(&pkg.annotations, None)?;
        self.outputs.push(class_file);
        Ok(())
    }

    pub fn binary_name(&self, simple: &str, enclosing: Option<&str>) -> String {
        match enclosing {
            Some(outer) => format!("{}${}", outer, simple),
            None => self.scope.binary_name(simple),
        }
    }

    pub fn resolve_class(&mut self, name: &str, enclosing: Option<&str>, span: Span) -> Result<String> {
        resolve::resolve_class_name(self.classpath, &self.scope, enclosing, name, span)
    }

    pub fn resolve_type(
        &mut self,
        type_params: &HashSet<String>,
        enclosing: Option<&str>,
        ty: &TypeRef,
    ) -> Result<JType> {
        resolve_type_ref(self.classpath, &self.scope, enclosing, type_params, ty)
    }

    fn compile_type(&mut self, decl: &TypeDecl, enclosing: Option<&str>) -> Result<()> {
        match decl {
            TypeDecl::Class(c) => self.compile_class(c, enclosing),
            TypeDecl::Interface(i) => self.compile_interface(i, enclosing),
            TypeDecl::Enum(e) => self.compile_enum(e, enclosing),
        }
    }

    fn record_nested(&mut self, outer: &mut ClassFile, inner_binary: &str, simple: &str, access: u16) {
        let info = InnerClassInfo {
            inner_class: inner_binary.to_string(),
            outer_class: Some(outer.name.clone()),
            inner_name: Some(simple.to_string()),
            access_flags: access,
        };
        outer.inner_classes.push(info);
    }

    fn compile_nested_members(
        &mut self,
        cls: &mut ClassCtx,
        body: &[ClassMember],
    ) -> Result<()> {
        for member in body {
            if let ClassMember::Type(nested) = member {
                let inner_binary = format!("{}${}", cls.name, nested.name());
                let access = match nested {
                    TypeDecl::Class(c) => {
                        modifier_flags(&c.modifiers) & !flags::ACC_SUPER
                    }
                    TypeDecl::Interface(i) => {
                        modifier_flags(&i.modifiers)
                            | flags::ACC_INTERFACE
                            | flags::ACC_ABSTRACT
                    }
                    TypeDecl::Enum(e) => {
                        modifier_flags(&e.modifiers) | flags::ACC_ENUM | flags::ACC_STATIC
                    }
                };
                self.record_nested(&mut cls.class_file, &inner_binary, nested.name(), access);
                let outer_name = cls.name.clone();
                self.compile_type(nested, Some(&outer_name))?;
                // mirror the entry on the nested class itself
                if let Some(inner_file) =
                    self.outputs.iter_mut().find(|c| c.name == inner_binary)
                {
                    inner_file.inner_classes.push(InnerClassInfo {
                        inner_class: inner_binary.clone(),
                        outer_class: Some(outer_name),
                        inner_name: Some(nested.name().to_string()),
                        access_flags: access,
                    });
                }
            }
        }
        Ok(())
    }

    fn compile_class(&mut self, decl: &ClassDecl, enclosing: Option<&str>) -> Result<()> {
        let binary = self.binary_name(&decl.name, enclosing);
        let type_params: HashSet<String> =
            decl.type_params.iter().map(|p| p.name.clone()).collect();

        let super_name = match &decl.extends {
            Some(t) => match self.resolve_type(&type_params, enclosing, t)? {
                JType::Reference(name) => name,
                other => {
                    return Err(Error::type_error(t.span(), format!("cannot extend {}", other)))
                }
            },
            None => "java/lang/Object".to_string(),
        };

        let mut class_file = ClassFile::new(binary.clone(), super_name.clone());
        class_file.access_flags = modifier_flags(&decl.modifiers) | flags::ACC_SUPER;
        class_file.source_file = Some(self.source_file.clone());
        for iface in &decl.implements {
            if let JType::Reference(name) = self.resolve_type(&type_params, enclosing, iface)? {
                class_file.interfaces.push(name);
            }
        }
        class_file.annotations = self.convert_annotations(&decl.annotations, enclosing)?;
        class_file.signature = self.class_signature_of(decl, enclosing);

        let mut cls = ClassCtx {
            class_file,
            name: binary,
            super_name,
            is_interface: false,
            type_params,
            field_inits: Vec::new(),
            static_inits: Vec::new(),
        };

        self.compile_fields(&mut cls, &decl.body, enclosing, false)?;
        self.collect_initializer_blocks(&mut cls, &decl.body);

        let mut has_ctor = false;
        for member in &decl.body {
            let result = match member {
                ClassMember::Method(m) => self.compile_method(&mut cls, m, enclosing),
                ClassMember::Constructor(c) => {
                    has_ctor = true;
                    self.compile_constructor(&mut cls, c, enclosing, false)
                }
                _ => Ok(()),
            };
            self.collect_member_error(result)?;
        }
        if !has_ctor {
            self.generate_default_constructor(&mut cls)?;
        }
        self.compile_clinit(&mut cls, None)?;
        self.compile_nested_members(&mut cls, &decl.body)?;
        self.outputs.push(cls.class_file);
        Ok(())
    }

    /// A failed member aborts only that member; the error is reported at
    /// the unit boundary. Invariant violations still abort immediately.
    fn collect_member_error(&mut self, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                self.errors.push(err);
                Ok(())
            }
        }
    }

    fn compile_interface(&mut self, decl: &InterfaceDecl, enclosing: Option<&str>) -> Result<()> {
        let binary = self.binary_name(&decl.name, enclosing);
        let type_params: HashSet<String> =
            decl.type_params.iter().map(|p| p.name.clone()).collect();

        let mut class_file = ClassFile::new(binary.clone(), "java/lang/Object");
        class_file.access_flags =
            modifier_flags(&decl.modifiers) | flags::ACC_INTERFACE | flags::ACC_ABSTRACT;
        class_file.source_file = Some(self.source_file.clone());
        for iface in &decl.extends {
            if let JType::Reference(name) = self.resolve_type(&type_params, enclosing, iface)? {
                class_file.interfaces.push(name);
            }
        }
        class_file.annotations = self.convert_annotations(&decl.annotations, enclosing)?;

        let mut cls = ClassCtx {
            class_file,
            name: binary,
            super_name: "java/lang/Object".to_string(),
            is_interface: true,
            type_params,
            field_inits: Vec::new(),
            static_inits: Vec::new(),
        };

        self.compile_fields(&mut cls, &decl.body, enclosing, true)?;
        for member in &decl.body {
            if let ClassMember::Method(m) = member {
                let result = self.compile_method(&mut cls, m, enclosing);
                self.collect_member_error(result)?;
            }
        }
        self.compile_clinit(&mut cls, None)?;
        self.compile_nested_members(&mut cls, &decl.body)?;
        self.outputs.push(cls.class_file);
        Ok(())
    }

    fn compile_enum(&mut self, decl: &EnumDecl, enclosing: Option<&str>) -> Result<()> {
        let binary = self.binary_name(&decl.name, enclosing);
        let self_ty = JType::reference(binary.clone());
        let self_desc = self_ty.descriptor();
        let array_desc = format!("[{}", self_desc);

        let mut class_file = ClassFile::new(binary.clone(), "java/lang/Enum");
        class_file.access_flags = modifier_flags(&decl.modifiers)
            | flags::ACC_SUPER
            | flags::ACC_FINAL
            | flags::ACC_ENUM;
        class_file.source_file = Some(self.source_file.clone());
        for iface in &decl.implements {
            if let JType::Reference(name) =
                self.resolve_type(&HashSet::new(), enclosing, iface)?
            {
                class_file.interfaces.push(name);
            }
        }
        class_file.annotations = self.convert_annotations(&decl.annotations, enclosing)?;

        for constant in &decl.constants {
            class_file.add_field(FieldInfo {
                access_flags: flags::ACC_PUBLIC
                    | flags::ACC_STATIC
                    | flags::ACC_FINAL
                    | flags::ACC_ENUM,
                name: constant.name.clone(),
                descriptor: self_desc.clone(),
                signature: None,
                annotations: Vec::new(),
                constant_value: None,
            });
        }

        let mut cls = ClassCtx {
            class_file,
            name: binary.clone(),
            super_name: "java/lang/Enum".to_string(),
            is_interface: false,
            type_params: HashSet::new(),
            field_inits: Vec::new(),
            static_inits: Vec::new(),
        };

        self.compile_fields(&mut cls, &decl.body, enclosing, false)?;
        self.collect_initializer_blocks(&mut cls, &decl.body);

        cls.class_file.add_field(FieldInfo {
            access_flags: flags::ACC_PRIVATE
                | flags::ACC_STATIC
                | flags::ACC_FINAL
                | flags::ACC_SYNTHETIC,
            name: ENUM_VALUES_FIELD.to_string(),
            descriptor: array_desc.clone(),
            signature: None,
            annotations: Vec::new(),
            constant_value: None,
        });

        let mut has_ctor = false;
        for member in &decl.body {
            let result = match member {
                ClassMember::Method(m) => self.compile_method(&mut cls, m, enclosing),
                ClassMember::Constructor(c) => {
                    has_ctor = true;
                    self.compile_constructor(&mut cls, c, enclosing, true)
                }
                _ => Ok(()),
            };
            self.collect_member_error(result)?;
        }
        if !has_ctor {
            self.generate_enum_default_constructor(&mut cls)?;
        }

        self.generate_enum_values(&mut cls, &array_desc)?;
        self.generate_enum_value_of(&mut cls, &self_desc)?;
        self.compile_clinit(&mut cls, Some(decl))?;
        self.compile_nested_members(&mut cls, &decl.body)?;
        self.outputs.push(cls.class_file);
        Ok(())
    }

    /// Add field infos; record initializer expressions for the constructors
    /// or `<clinit>`. `static final` fields with literal initializers get a
    /// `ConstantValue` attribute instead of code.
    fn compile_fields(
        &mut self,
        cls: &mut ClassCtx,
        body: &[ClassMember],
        enclosing: Option<&str>,
        interface_defaults: bool,
    ) -> Result<()> {
        for member in body {
            let ClassMember::Field(f) = member else {
                continue;
            };
            let mut access = modifier_flags(&f.modifiers);
            if interface_defaults {
                access |= flags::ACC_PUBLIC | flags::ACC_STATIC | flags::ACC_FINAL;
            }
            let is_static = access & flags::ACC_STATIC != 0;
            let is_final = access & flags::ACC_FINAL != 0;
            let base_ty = self.resolve_type(&cls.type_params, enclosing, &f.ty)?;
            let annotations = self.convert_annotations(&f.annotations, enclosing)?;
            for declarator in &f.declarators {
                let ty = with_extra_dims(&base_ty, declarator.extra_dims);
                let mut info = FieldInfo {
                    access_flags: access,
                    name: declarator.name.clone(),
                    descriptor: ty.descriptor(),
                    signature: signature::field_signature(&f.ty, &cls.type_params, &mut |n| {
                        self.resolve_class(n, enclosing, f.span).unwrap_or_else(|_| n.replace('.', "/"))
                    }),
                    annotations: annotations.clone(),
                    constant_value: None,
                };
                if let Some(init) = &declarator.init {
                    let const_value = if is_static && is_final {
                        literal_const_value(init, &ty)
                    } else {
                        None
                    };
                    if let Some(value) = const_value {
                        info.constant_value = Some(value);
                    } else if is_static {
                        cls.static_inits.push(StaticInit::Field(
                            declarator.name.clone(),
                            ty.clone(),
                            init.clone(),
                        ));
                    } else {
                        cls.field_inits.push((
                            declarator.name.clone(),
                            ty.clone(),
                            init.clone(),
                        ));
                    }
                }
                cls.class_file.add_field(info);
            }
        }
        Ok(())
    }

    fn collect_initializer_blocks(&mut self, cls: &mut ClassCtx, body: &[ClassMember]) {
        for member in body {
            if let ClassMember::Initializer { is_static: true, body } = member {
                cls.static_inits.push(StaticInit::Block(body.clone()));
            }
        }
    }

    fn class_signature_of(&mut self, decl: &ClassDecl, enclosing: Option<&str>) -> Option<String> {
        let span = decl.span;
        let scope = self.scope.clone();
        let classpath = &mut *self.classpath;
        let mut resolve = |name: &str| -> String {
            resolve::resolve_class_name(classpath, &scope, enclosing, name, span)
                .unwrap_or_else(|_| name.replace('.', "/"))
        };
        signature::class_signature(
            &decl.type_params,
            decl.extends.as_ref(),
            &decl.implements,
            &mut resolve,
        )
    }

    // ----- members -----

    pub fn compile_method(
        &mut self,
        cls: &mut ClassCtx,
        decl: &MethodDecl,
        enclosing: Option<&str>,
    ) -> Result<()> {
        let mut type_params = cls.type_params.clone();
        type_params.extend(decl.type_params.iter().map(|p| p.name.clone()));

        let mut access = modifier_flags(&decl.modifiers);
        if cls.is_interface {
            access |= flags::ACC_PUBLIC;
        }
        let is_default = decl.modifiers.contains(&Modifier::Default);
        if decl.body.is_none() && access & flags::ACC_NATIVE == 0 {
            access |= flags::ACC_ABSTRACT;
        }
        if decl.params.last().is_some_and(|p| p.varargs) {
            access |= flags::ACC_VARARGS;
        }
        let is_static = access & flags::ACC_STATIC != 0;

        let mut param_types = Vec::new();
        for p in &decl.params {
            let ty = self.resolve_type(&type_params, enclosing, &p.ty)?;
            param_types.push(if p.varargs { JType::array(ty, 1) } else { ty });
        }
        let return_type = self.resolve_type(&type_params, enclosing, &decl.return_type)?;
        let descriptor = method_descriptor(&param_types, &return_type);

        let mut info = MethodInfo::new(access, decl.name.clone(), descriptor);
        info.annotations = self.convert_annotations(&decl.annotations, enclosing)?;
        info.parameter_annotations = decl
            .params
            .iter()
            .map(|p| self.convert_annotations(&p.annotations, enclosing))
            .collect::<Result<_>>()?;
        for t in &decl.throws {
            if let JType::Reference(name) = self.resolve_type(&type_params, enclosing, t)? {
                info.exceptions.push(name);
            }
        }
        if !decl.params.is_empty() {
            info.parameter_names = decl.params.iter().map(|p| p.name.clone()).collect();
        }
        {
            let span = decl.span;
            let scope = self.scope.clone();
            let classpath = &mut *self.classpath;
            let mut resolve = |name: &str| -> String {
                resolve::resolve_class_name(classpath, &scope, enclosing, name, span)
                    .unwrap_or_else(|_| name.replace('.', "/"))
            };
            info.signature = signature::method_signature(
                &decl.type_params,
                &decl.params,
                &decl.return_type,
                &cls.type_params,
                &mut resolve,
            );
        }

        let Some(body) = &decl.body else {
            if cls.is_interface && is_default {
                return Err(Error::type_error(decl.span, "default method needs a body"));
            }
            cls.class_file.add_method(info);
            return Ok(());
        };
        if cls.is_interface {
            // default and static interface methods need the Java 8 format
            cls.class_file.version = super::class::VERSION_JAVA_8;
        }

        let mut ctx =
            MethodContext::new(&cls.name, &decl.name, return_type.clone(), is_static);
        if !is_static {
            ctx.declare("this", JType::reference(cls.name.clone()));
        }
        for (p, ty) in decl.params.iter().zip(&param_types) {
            ctx.declare(&p.name, ty.clone());
        }

        self.compile_block(cls, &mut ctx, body)?;
        if return_type == JType::Void {
            ctx.code.ret(&JType::Void);
        }
        info.code = Some(ctx.code.finish()?);
        cls.class_file.add_method(info);
        Ok(())
    }

    fn compile_constructor(
        &mut self,
        cls: &mut ClassCtx,
        decl: &ConstructorDecl,
        enclosing: Option<&str>,
        is_enum: bool,
    ) -> Result<()> {
        let mut access = modifier_flags(&decl.modifiers);
        if is_enum {
            access = (access & !(flags::ACC_PUBLIC | flags::ACC_PROTECTED)) | flags::ACC_PRIVATE;
        }
        if decl.params.last().is_some_and(|p| p.varargs) {
            access |= flags::ACC_VARARGS;
        }

        let mut param_types = Vec::new();
        for p in &decl.params {
            let ty = self.resolve_type(&cls.type_params, enclosing, &p.ty)?;
            param_types.push(if p.varargs { JType::array(ty, 1) } else { ty });
        }
        let descriptor = if is_enum {
            let user = method_descriptor(&param_types, &JType::Void);
            format!("(Ljava/lang/String;I{}", &user[1..])
        } else {
            method_descriptor(&param_types, &JType::Void)
        };

        let mut ctx = MethodContext::new(&cls.name, "<init>", JType::Void, false);
        ctx.declare("this", JType::reference(cls.name.clone()));
        if is_enum {
            ctx.declare("$name", JType::string());
            ctx.declare("$ordinal", JType::int());
        }
        for (p, ty) in decl.params.iter().zip(&param_types) {
            ctx.declare(&p.name, ty.clone());
        }

        // explicit this(...)/super(...) call, if present, must come first
        let explicit = decl.body.statements.first().and_then(|s| match &s.kind {
            StmtKind::ExplicitCtorCall { is_super, args } => Some((*is_super, args.clone(), s.span)),
            _ => None,
        });

        let delegates_to_this = matches!(explicit, Some((false, _, _)));
        match (&explicit, is_enum) {
            (_, true) => {
                // forward the (name, ordinal) prefix to Enum
                ctx.code.load(&JType::reference(cls.name.clone()), 0);
                ctx.code.load(&JType::string(), 1);
                ctx.code.load(&JType::int(), 2);
                ctx.code.invoke(
                    &mut cls.class_file.cp,
                    super::opcodes::INVOKESPECIAL,
                    "java/lang/Enum",
                    "<init>",
                    "(Ljava/lang/String;I)V",
                )?;
            }
            (Some((is_super, args, span)), false) => {
                let owner =
                    if *is_super { cls.super_name.clone() } else { cls.name.clone() };
                self.compile_ctor_call(cls, &mut ctx, &owner, args, *span)?;
            }
            (None, false) => {
                ctx.code.load(&JType::reference(cls.name.clone()), 0);
                ctx.code.invoke(
                    &mut cls.class_file.cp,
                    super::opcodes::INVOKESPECIAL,
                    &cls.super_name,
                    "<init>",
                    "()V",
                )?;
            }
        }

        // field initializers only in constructors that do not delegate
        if !delegates_to_this {
            let inits = cls.field_inits.clone();
            for (name, ty, init) in &inits {
                ctx.code.load(&JType::reference(cls.name.clone()), 0);
                let value_ty = self.compile_expr_expecting(cls, &mut ctx, init, Some(ty))?;
                self.coerce(cls, &mut ctx, &value_ty, ty, init.span)?;
                ctx.code.field_op(
                    &mut cls.class_file.cp,
                    super::opcodes::PUTFIELD,
                    &cls.name.clone(),
                    name,
                    &ty.descriptor(),
                )?;
            }
        }

        let skip_first = explicit.is_some();
        for stmt in decl.body.statements.iter().skip(usize::from(skip_first)) {
            self.compile_stmt(cls, &mut ctx, stmt)?;
        }
        ctx.code.ret(&JType::Void);

        let mut info = MethodInfo::new(access, "<init>", descriptor);
        if !decl.params.is_empty() {
            info.parameter_names = decl.params.iter().map(|p| p.name.clone()).collect();
            info.parameter_annotations = decl
                .params
                .iter()
                .map(|p| self.convert_annotations(&p.annotations, enclosing))
                .collect::<Result<_>>()?;
        }
        info.annotations = self.convert_annotations(&decl.annotations, enclosing)?;
        info.code = Some(ctx.code.finish()?);
        cls.class_file.add_method(info);
        Ok(())
    }

    fn generate_default_constructor(&mut self, cls: &mut ClassCtx) -> Result<()> {
        let mut ctx = MethodContext::new(&cls.name, "<init>", JType::Void, false);
        ctx.declare("this", JType::reference(cls.name.clone()));
        ctx.code.load(&JType::reference(cls.name.clone()), 0);
        ctx.code.invoke(
            &mut cls.class_file.cp,
            super::opcodes::INVOKESPECIAL,
            &cls.super_name,
            "<init>",
            "()V",
        )?;
        let inits = cls.field_inits.clone();
        for (name, ty, init) in &inits {
            ctx.code.load(&JType::reference(cls.name.clone()), 0);
            let value_ty = self.compile_expr_expecting(cls, &mut ctx, init, Some(ty))?;
            self.coerce(cls, &mut ctx, &value_ty, ty, init.span)?;
            ctx.code.field_op(
                &mut cls.class_file.cp,
                super::opcodes::PUTFIELD,
                &cls.name.clone(),
                name,
                &ty.descriptor(),
            )?;
        }
        ctx.code.ret(&JType::Void);
        let mut info = MethodInfo::new(flags::ACC_PUBLIC, "<init>", "()V");
        info.code = Some(ctx.code.finish()?);
        cls.class_file.add_method(info);
        Ok(())
    }

    fn generate_enum_default_constructor(&mut self, cls: &mut ClassCtx) -> Result<()> {
        let mut ctx = MethodContext::new(&cls.name, "<init>", JType::Void, false);
        ctx.declare("this", JType::reference(cls.name.clone()));
        ctx.declare("$name", JType::string());
        ctx.declare("$ordinal", JType::int());
        ctx.code.load(&JType::reference(cls.name.clone()), 0);
        ctx.code.load(&JType::string(), 1);
        ctx.code.load(&JType::int(), 2);
        ctx.code.invoke(
            &mut cls.class_file.cp,
            super::opcodes::INVOKESPECIAL,
            "java/lang/Enum",
            "<init>",
            "(Ljava/lang/String;I)V",
        )?;
        let inits = cls.field_inits.clone();
        for (name, ty, init) in &inits {
            ctx.code.load(&JType::reference(cls.name.clone()), 0);
            let value_ty = self.compile_expr_expecting(cls, &mut ctx, init, Some(ty))?;
            self.coerce(cls, &mut ctx, &value_ty, ty, init.span)?;
            ctx.code.field_op(
                &mut cls.class_file.cp,
                super::opcodes::PUTFIELD,
                &cls.name.clone(),
                name,
                &ty.descriptor(),
            )?;
        }
        ctx.code.ret(&JType::Void);
        let mut info = MethodInfo::new(flags::ACC_PRIVATE, "<init>", "(Ljava/lang/String;I)V");
        info.code = Some(ctx.code.finish()?);
        cls.class_file.add_method(info);
        Ok(())
    }

    fn generate_enum_values(&mut self, cls: &mut ClassCtx, array_desc: &str) -> Result<()> {
        let array_ty = JType::from_descriptor(array_desc)?;
        let mut ctx = MethodContext::new(&cls.name, "values", array_ty.clone(), true);
        ctx.code.field_op(
            &mut cls.class_file.cp,
            super::opcodes::GETSTATIC,
            &cls.name.clone(),
            ENUM_VALUES_FIELD,
            array_desc,
        )?;
        ctx.code.invoke(
            &mut cls.class_file.cp,
            super::opcodes::INVOKEVIRTUAL,
            array_desc,
            "clone",
            "()Ljava/lang/Object;",
        )?;
        ctx.code.checkcast(&mut cls.class_file.cp, array_desc);
        ctx.code.ret(&array_ty);
        let mut info = MethodInfo::new(
            flags::ACC_PUBLIC | flags::ACC_STATIC,
            "values",
            format!("(){}", array_desc),
        );
        info.code = Some(ctx.code.finish()?);
        cls.class_file.add_method(info);
        Ok(())
    }

    fn generate_enum_value_of(&mut self, cls: &mut ClassCtx, self_desc: &str) -> Result<()> {
        let self_ty = JType::reference(cls.name.clone());
        let mut ctx = MethodContext::new(&cls.name, "valueOf", self_ty.clone(), true);
        ctx.declare("name", JType::string());
        ctx.code.push_class(&mut cls.class_file.cp, &cls.name.clone());
        ctx.code.load(&JType::string(), 0);
        ctx.code.invoke(
            &mut cls.class_file.cp,
            super::opcodes::INVOKESTATIC,
            "java/lang/Enum",
            "valueOf",
            "(Ljava/lang/Class;Ljava/lang/String;)Ljava/lang/Enum;",
        )?;
        ctx.code.checkcast(&mut cls.class_file.cp, &cls.name.clone());
        ctx.code.ret(&self_ty);
        let mut info = MethodInfo::new(
            flags::ACC_PUBLIC | flags::ACC_STATIC,
            "valueOf",
            format!("(Ljava/lang/String;){}", self_desc),
        );
        info.code = Some(ctx.code.finish()?);
        cls.class_file.add_method(info);
        Ok(())
    }

    /// Emit `<clinit>` when there is anything to initialize: enum constants
    /// and `$VALUES` first, then static field initializers and static
    /// blocks in declaration order.
    fn compile_clinit(
        &mut self,
        cls: &mut ClassCtx,
        enum_decl: Option<&EnumDecl>,
    ) -> Result<()> {
        let has_enum = enum_decl.is_some_and(|e| !e.constants.is_empty());
        if !has_enum && cls.static_inits.is_empty() {
            return Ok(());
        }
        let mut ctx = MethodContext::new(&cls.name, "<clinit>", JType::Void, true);

        if let Some(decl) = enum_decl {
            let self_desc = format!("L{};", cls.name);
            let array_desc = format!("[{}", self_desc);
            // create every constant, then assemble $VALUES from the
            // initialized fields
            for (ordinal, constant) in decl.constants.iter().enumerate() {
                ctx.code.new_object(&mut cls.class_file.cp, &cls.name.clone());
                ctx.code.emit(super::opcodes::DUP);
                ctx.code.push_string(&mut cls.class_file.cp, &constant.name);
                ctx.code.push_int(&mut cls.class_file.cp, ordinal as i32);
                let arg_types = constant
                    .args
                    .iter()
                    .map(|arg| self.compile_expr(cls, &mut ctx, arg))
                    .collect::<Result<Vec<_>>>()?;
                let mut full_args = vec![JType::string(), JType::int()];
                full_args.extend(arg_types);
                let ctor = resolve::resolve_method(
                    self.classpath,
                    &cls.name,
                    "<init>",
                    &full_args,
                    constant.span,
                )?;
                ctx.code.invoke(
                    &mut cls.class_file.cp,
                    super::opcodes::INVOKESPECIAL,
                    &cls.name.clone(),
                    "<init>",
                    &ctor.descriptor,
                )?;
                ctx.code.field_op(
                    &mut cls.class_file.cp,
                    super::opcodes::PUTSTATIC,
                    &cls.name.clone(),
                    &constant.name,
                    &self_desc,
                )?;
            }
            ctx.code.push_int(&mut cls.class_file.cp, decl.constants.len() as i32);
            ctx.code.anewarray(&mut cls.class_file.cp, &cls.name.clone());
            for (ordinal, constant) in decl.constants.iter().enumerate() {
                ctx.code.emit(super::opcodes::DUP);
                ctx.code.push_int(&mut cls.class_file.cp, ordinal as i32);
                ctx.code.field_op(
                    &mut cls.class_file.cp,
                    super::opcodes::GETSTATIC,
                    &cls.name.clone(),
                    &constant.name,
                    &self_desc,
                )?;
                ctx.code.emit(super::opcodes::AASTORE);
            }
            ctx.code.field_op(
                &mut cls.class_file.cp,
                super::opcodes::PUTSTATIC,
                &cls.name.clone(),
                ENUM_VALUES_FIELD,
                &array_desc,
            )?;
        }

        let inits = std::mem::take(&mut cls.static_inits);
        for init in &inits {
            match init {
                StaticInit::Field(name, ty, expr) => {
                    let value_ty = self.compile_expr_expecting(cls, &mut ctx, expr, Some(ty))?;
                    self.coerce(cls, &mut ctx, &value_ty, ty, expr.span)?;
                    ctx.code.field_op(
                        &mut cls.class_file.cp,
                        super::opcodes::PUTSTATIC,
                        &cls.name.clone(),
                        name,
                        &ty.descriptor(),
                    )?;
                }
                StaticInit::Block(block) => {
                    self.compile_block(cls, &mut ctx, block)?;
                }
            }
        }

        ctx.code.ret(&JType::Void);
        let mut info = MethodInfo::new(flags::ACC_STATIC, "<clinit>", "()V");
        info.code = Some(ctx.code.finish()?);
        cls.class_file.add_method(info);
        Ok(())
    }

    // ----- annotations -----

    pub fn convert_annotations(
        &mut self,
        annotations: &[Annotation],
        enclosing: Option<&str>,
    ) -> Result<Vec<AnnotationInfo>> {
        annotations
            .iter()
            .map(|ann| self.convert_annotation(ann, enclosing))
            .collect()
    }

    fn convert_annotation(
        &mut self,
        ann: &Annotation,
        enclosing: Option<&str>,
    ) -> Result<AnnotationInfo> {
        let internal = self.resolve_class(&ann.name, enclosing, ann.span)?;
        let mut elements = Vec::new();
        for arg in &ann.args {
            let name = arg.name.clone().unwrap_or_else(|| "value".to_string());
            let value = self.convert_annotation_value(&arg.value, enclosing)?;
            elements.push((name, value));
        }
        Ok(AnnotationInfo { type_descriptor: format!("L{};", internal), elements })
    }

    fn convert_annotation_value(
        &mut self,
        expr: &Expr,
        enclosing: Option<&str>,
    ) -> Result<AnnotationValue> {
        match &expr.kind {
            ExprKind::Literal(Literal::Int(v)) => {
                Ok(AnnotationValue::Int { tag: b'I', value: *v as i32 })
            }
            ExprKind::Literal(Literal::Long(v)) => Ok(AnnotationValue::Long(*v)),
            ExprKind::Literal(Literal::Float(v)) => Ok(AnnotationValue::Float(*v)),
            ExprKind::Literal(Literal::Double(v)) => Ok(AnnotationValue::Double(*v)),
            ExprKind::Literal(Literal::Bool(v)) => {
                Ok(AnnotationValue::Int { tag: b'Z', value: i32::from(*v) })
            }
            ExprKind::Literal(Literal::Char(v)) => {
                Ok(AnnotationValue::Int { tag: b'C', value: *v as i32 })
            }
            ExprKind::Literal(Literal::Str(v)) => Ok(AnnotationValue::Str(v.clone())),
            ExprKind::ArrayInit(elements) => {
                let values = elements
                    .iter()
                    .map(|e| self.convert_annotation_value(e, enclosing))
                    .collect::<Result<_>>()?;
                Ok(AnnotationValue::Array(values))
            }
            ExprKind::ClassLiteral { ty } => {
                let jt = self.resolve_type(&HashSet::new(), enclosing, ty)?;
                Ok(AnnotationValue::Class(jt.descriptor()))
            }
            ExprKind::FieldAccess { target, name } => {
                // an enum constant: EnumType.CONST
                let type_name = field_access_type_name(target)
                    .ok_or_else(|| Error::type_error(expr.span, "invalid annotation value"))?;
                let internal = self.resolve_class(&type_name, enclosing, expr.span)?;
                Ok(AnnotationValue::EnumConst {
                    type_descriptor: format!("L{};", internal),
                    const_name: name.clone(),
                })
            }
            _ => Err(Error::type_error(expr.span, "unsupported annotation value")),
        }
    }
}

fn field_access_type_name(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Name(name) => Some(name.clone()),
        ExprKind::FieldAccess { target, name } => {
            field_access_type_name(target).map(|base| format!("{}.{}", base, name))
        }
        _ => None,
    }
}

/// The `ConstantValue` payload for a `static final` field initialized with
/// a literal, coerced to the field's declared type.
fn literal_const_value(init: &Expr, ty: &JType) -> Option<ConstValue> {
    let ExprKind::Literal(lit) = &init.kind else {
        return None;
    };
    Some(match (lit, ty) {
        (Literal::Int(v), JType::Primitive(PrimitiveKind::Long)) => ConstValue::Long(*v),
        (Literal::Int(v), JType::Primitive(PrimitiveKind::Float)) => {
            ConstValue::Float(*v as f32)
        }
        (Literal::Int(v), JType::Primitive(PrimitiveKind::Double)) => {
            ConstValue::Double(*v as f64)
        }
        (Literal::Int(v), JType::Primitive(_)) => ConstValue::Integer(*v as i32),
        (Literal::Long(v), JType::Primitive(PrimitiveKind::Long)) => ConstValue::Long(*v),
        (Literal::Float(v), JType::Primitive(PrimitiveKind::Float)) => ConstValue::Float(*v),
        (Literal::Float(v), JType::Primitive(PrimitiveKind::Double)) => {
            ConstValue::Double(*v as f64)
        }
        (Literal::Double(v), JType::Primitive(PrimitiveKind::Double)) => ConstValue::Double(*v),
        (Literal::Bool(v), JType::Primitive(PrimitiveKind::Boolean)) => {
            ConstValue::Integer(i32::from(*v))
        }
        (Literal::Char(v), JType::Primitive(PrimitiveKind::Char)) => {
            ConstValue::Integer(*v as i32)
        }
        (Literal::Str(v), JType::Reference(name)) if name == "java/lang/String" => {
            ConstValue::Str(v.clone())
        }
        _ => return None,
    })
}
