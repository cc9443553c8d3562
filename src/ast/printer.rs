//! JSON dump of the AST for the `parse` subcommand.
//!
//! The output is a plain JSON object tree with a `kind` discriminator on
//! every node. It is meant for inspection and test tooling, not as a stable
//! interchange format.

use super::nodes::*;

pub struct JsonPrinter {
    out: String,
    indent: usize,
}

/// Render a compilation unit as pretty-printed JSON.
pub fn to_json(unit: &CompilationUnit) -> String {
    let mut printer = JsonPrinter { out: String::new(), indent: 0 };
    printer.unit(unit);
    printer.out
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

impl JsonPrinter {
    fn line(&mut self, s: &str) {
        for _ in 0..self.indent {
            self.out.push(' ');
        }
        self.out.push_str(s);
        self.out.push('\n');
    }

    fn open(&mut self, prefix: &str) {
        self.line(&format!("{}{{", prefix));
        self.indent += 2;
    }

    fn close(&mut self, suffix: &str) {
        self.indent -= 2;
        self.line(&format!("}}{}", suffix));
    }

    fn open_list(&mut self, key: &str) {
        self.line(&format!("\"{}\": [", key));
        self.indent += 2;
    }

    fn close_list(&mut self, trailing_comma: bool) {
        self.indent -= 2;
        self.line(if trailing_comma { "]," } else { "]" });
    }

    fn field_str(&mut self, key: &str, value: &str, comma: bool) {
        self.line(&format!("\"{}\": \"{}\"{}", key, escape(value), if comma { "," } else { "" }));
    }

    fn field_raw(&mut self, key: &str, value: &str, comma: bool) {
        self.line(&format!("\"{}\": {}{}", key, value, if comma { "," } else { "" }));
    }

    fn unit(&mut self, unit: &CompilationUnit) {
        self.open("");
        self.field_str("kind", "CompilationUnit", true);
        self.field_str("sourceFile", &unit.source_file, true);
        match &unit.package {
            Some(pkg) => self.field_str("package", &pkg.name, true),
            None => self.field_raw("package", "null", true),
        }
        self.open_list("imports");
        for (i, imp) in unit.imports.iter().enumerate() {
            let comma = i + 1 < unit.imports.len();
            self.open("");
            self.field_str("name", &imp.name, true);
            self.field_raw("static", if imp.is_static { "true" } else { "false" }, true);
            self.field_raw("wildcard", if imp.is_wildcard { "true" } else { "false" }, false);
            self.close(if comma { "," } else { "" });
        }
        self.close_list(true);
        self.open_list("types");
        for (i, decl) in unit.types.iter().enumerate() {
            self.type_decl(decl, i + 1 < unit.types.len());
        }
        self.close_list(false);
        self.close("");
    }

    fn type_decl(&mut self, decl: &TypeDecl, comma: bool) {
        let suffix = if comma { "," } else { "" };
        match decl {
            TypeDecl::Class(c) => {
                self.open("");
                self.field_str("kind", "Class", true);
                self.field_str("name", &c.name, true);
                self.modifiers(&c.modifiers, true);
                match &c.extends {
                    Some(t) => self.field_str("extends", &type_name(t), true),
                    None => self.field_raw("extends", "null", true),
                }
                let implements: Vec<String> = c.implements.iter().map(type_name).collect();
                self.string_list("implements", &implements, true);
                self.members(&c.body);
                self.close(suffix);
            }
            TypeDecl::Interface(i) => {
                self.open("");
                self.field_str("kind", "Interface", true);
                self.field_str("name", &i.name, true);
                self.modifiers(&i.modifiers, true);
                let extends: Vec<String> = i.extends.iter().map(type_name).collect();
                self.string_list("extends", &extends, true);
                self.members(&i.body);
                self.close(suffix);
            }
            TypeDecl::Enum(e) => {
                self.open("");
                self.field_str("kind", "Enum", true);
                self.field_str("name", &e.name, true);
                self.modifiers(&e.modifiers, true);
                let constants: Vec<String> =
                    e.constants.iter().map(|c| c.name.clone()).collect();
                self.string_list("constants", &constants, true);
                self.members(&e.body);
                self.close(suffix);
            }
        }
    }

    fn string_list(&mut self, key: &str, values: &[String], comma: bool) {
        let rendered: Vec<String> = values.iter().map(|v| format!("\"{}\"", escape(v))).collect();
        self.field_raw(key, &format!("[{}]", rendered.join(", ")), comma);
    }

    fn modifiers(&mut self, modifiers: &[Modifier], comma: bool) {
        let names: Vec<String> =
            modifiers.iter().map(|m| format!("{:?}", m).to_lowercase()).collect();
        self.string_list("modifiers", &names, comma);
    }

    fn members(&mut self, members: &[ClassMember]) {
        self.open_list("members");
        for (i, member) in members.iter().enumerate() {
            let comma = i + 1 < members.len();
            let suffix = if comma { "," } else { "" };
            match member {
                ClassMember::Field(f) => {
                    self.open("");
                    self.field_str("kind", "Field", true);
                    self.field_str("type", &type_name(&f.ty), true);
                    self.modifiers(&f.modifiers, true);
                    let names: Vec<String> =
                        f.declarators.iter().map(|d| d.name.clone()).collect();
                    self.string_list("names", &names, false);
                    self.close(suffix);
                }
                ClassMember::Method(m) => {
                    self.open("");
                    self.field_str("kind", "Method", true);
                    self.field_str("name", &m.name, true);
                    self.modifiers(&m.modifiers, true);
                    self.field_str("returns", &type_name(&m.return_type), true);
                    let params: Vec<String> = m
                        .params
                        .iter()
                        .map(|p| format!("{} {}", type_name(&p.ty), p.name))
                        .collect();
                    self.string_list("params", &params, true);
                    self.field_raw(
                        "abstract",
                        if m.body.is_none() { "true" } else { "false" },
                        false,
                    );
                    self.close(suffix);
                }
                ClassMember::Constructor(c) => {
                    self.open("");
                    self.field_str("kind", "Constructor", true);
                    self.field_str("name", &c.name, true);
                    let params: Vec<String> = c
                        .params
                        .iter()
                        .map(|p| format!("{} {}", type_name(&p.ty), p.name))
                        .collect();
                    self.string_list("params", &params, false);
                    self.close(suffix);
                }
                ClassMember::Type(t) => {
                    self.type_decl(t, comma);
                }
                ClassMember::Initializer { is_static, .. } => {
                    self.open("");
                    self.field_str("kind", "Initializer", true);
                    self.field_raw("static", if *is_static { "true" } else { "false" }, false);
                    self.close(suffix);
                }
            }
        }
        self.close_list(false);
    }
}

fn type_name(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Primitive { name, .. } => name.clone(),
        TypeRef::Named { name, .. } => name.clone(),
        TypeRef::Array { elem, dims, .. } => {
            format!("{}{}", type_name(elem), "[]".repeat(*dims as usize))
        }
        TypeRef::Void { .. } => "void".to_string(),
    }
}
