//! jopac — a Java 8 compiler that emits JVM class files.
//!
//! ## Architecture
//!
//! - **parser**: lexing and parsing of Java source into the AST
//! - **ast**: the syntax tree plus its JSON dump
//! - **codegen**: resolution and bytecode generation to `.class` bytes
//! - **bin**: the command-line driver
//!
//! ## Compilation flow
//!
//! ```text
//! Java source -> parser -> AST -> signature registration -> code generation -> .class bytes
//! ```
//!
//! Compilation is two-phase across units: every unit's class signatures are
//! registered with the classpath before any method body compiles, so units
//! may reference each other in either direction.

pub mod ast;
pub mod codegen;
pub mod common;
pub mod parser;

pub use common::{Config, Error, Result};

use ast::{CompilationUnit, TypeDecl};
use codegen::classpath::ClassPath;
use codegen::gen::{self, Gen};
use std::collections::BTreeMap;

/// One source file handed to the compiler.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File name, kept for diagnostics and the SourceFile attribute
    pub name: String,
    pub text: String,
}

/// Result of compiling a batch of sources: every class that compiled, plus
/// the per-unit failures. Successful classes are kept even when sibling
/// units fail.
#[derive(Debug, Default)]
pub struct CompileOutcome {
    /// binary class name -> class-file bytes
    pub classes: BTreeMap<String, Vec<u8>>,
    /// file name -> error, one entry per failed unit
    pub errors: Vec<(String, Error)>,
}

impl CompileOutcome {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Compile a single source to class files, in memory.
pub fn compile(source: &str, config: &Config) -> Result<BTreeMap<String, Vec<u8>>> {
    let sources =
        [SourceFile { name: "<memory>.java".to_string(), text: source.to_string() }];
    let mut outcome = compile_sources(&sources, config)?;
    match outcome.errors.pop() {
        Some((_, err)) => Err(err),
        None => Ok(outcome.classes),
    }
}

/// Compile a batch of sources against a fresh classpath built from the
/// configuration.
pub fn compile_sources(sources: &[SourceFile], config: &Config) -> Result<CompileOutcome> {
    let mut classpath = ClassPath::new();
    if config.use_runtime {
        let found = classpath.add_runtime_archive()?;
        if config.verbose && !found {
            eprintln!("jopac: no runtime archive found, using built-in class descriptions");
        }
    }
    for entry in &config.classpath {
        classpath.add_path(entry)?;
    }
    compile_with_classpath(sources, config, &mut classpath)
}

/// Compile a batch of sources against a caller-provided classpath.
pub fn compile_with_classpath(
    sources: &[SourceFile],
    config: &Config,
    classpath: &mut ClassPath,
) -> Result<CompileOutcome> {
    let mut outcome = CompileOutcome::default();
    let mut units: Vec<(usize, CompilationUnit)> = Vec::new();
    for (index, source) in sources.iter().enumerate() {
        match parser::parse_java(&source.text, &source.name) {
            Ok(unit) => units.push((index, unit)),
            Err(err) => outcome.errors.push((source.name.clone(), err)),
        }
    }

    let order = dependency_order(sources, &units);

    // phase 0: names, so phase 1 can resolve cross-unit references
    for &(_, ref unit) in &units {
        gen::register_names(classpath, unit);
    }
    // phase 1: full signatures
    for &(index, ref unit) in &units {
        if let Err(err) = gen::register_unit(classpath, unit) {
            outcome.errors.push((sources[index].name.clone(), err));
        }
    }
    // phase 2: bodies, in dependency order
    for &position in &order {
        let (index, unit) = &units[position];
        if config.verbose {
            eprintln!("jopac: compiling {}", sources[*index].name);
        }
        match Gen::new(classpath, config, unit).compile_unit(unit) {
            Ok(classes) => {
                // freshly compiled classes shadow their skeletons
                for bytes in classes.values() {
                    if let Ok(parsed) = codegen::class_reader::parse_class(bytes) {
                        classpath.register(parsed);
                    }
                }
                outcome.classes.extend(classes);
            }
            Err(errors) => {
                for err in errors {
                    outcome.errors.push((sources[*index].name.clone(), err));
                }
            }
        }
    }
    Ok(outcome)
}

/// Order units by their source-level references: single-type imports,
/// extends/implements, and same-package simple-name occurrence. Falls back
/// to the input order when the graph has a cycle; skeleton registration
/// absorbs the forward references either way.
fn dependency_order(sources: &[SourceFile], units: &[(usize, CompilationUnit)]) -> Vec<usize> {
    let input_order: Vec<usize> = (0..units.len()).collect();
    if units.len() <= 1 {
        return input_order;
    }

    // declared qualified name -> unit position
    let mut declares: Vec<(String, usize)> = Vec::new();
    for (position, (_, unit)) in units.iter().enumerate() {
        let package = unit.package.as_ref().map(|p| p.name.clone()).unwrap_or_default();
        for decl in &unit.types {
            let qualified = if package.is_empty() {
                decl.name().to_string()
            } else {
                format!("{}.{}", package, decl.name())
            };
            declares.push((qualified, position));
        }
    }

    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); units.len()];
    let mut in_degree = vec![0usize; units.len()];
    let mut add_edge = |edges: &mut Vec<Vec<usize>>, in_degree: &mut Vec<usize>, from: usize, to: usize| {
        if from != to && !edges[from].contains(&to) {
            edges[from].push(to);
            in_degree[to] += 1;
        }
    };

    for (position, (index, unit)) in units.iter().enumerate() {
        let package = unit.package.as_ref().map(|p| p.name.clone()).unwrap_or_default();
        for import in &unit.imports {
            if import.is_wildcard || import.is_static {
                continue;
            }
            if let Some((_, dep)) = declares.iter().find(|(name, _)| *name == import.name) {
                add_edge(&mut edges, &mut in_degree, *dep, position);
            }
        }
        for decl in &unit.types {
            for super_name in supertype_names(decl) {
                let qualified = if package.is_empty() {
                    super_name.clone()
                } else {
                    format!("{}.{}", package, super_name)
                };
                for (name, dep) in &declares {
                    if *name == qualified || *name == super_name {
                        add_edge(&mut edges, &mut in_degree, *dep, position);
                    }
                }
            }
        }
        // same-package usage by simple-name occurrence in the source text
        let text = &sources[*index].text;
        for (name, dep) in &declares {
            if *dep == position {
                continue;
            }
            let dep_package = name.rsplit_once('.').map(|(p, _)| p).unwrap_or("");
            if dep_package != package {
                continue;
            }
            let simple = name.rsplit('.').next().unwrap_or(name);
            if text.contains(simple) {
                add_edge(&mut edges, &mut in_degree, *dep, position);
            }
        }
    }

    // Kahn's algorithm, stable on the input order
    let mut queue: Vec<usize> = input_order
        .iter()
        .copied()
        .filter(|&p| in_degree[p] == 0)
        .collect();
    let mut result = Vec::with_capacity(units.len());
    let mut cursor = 0;
    while cursor < queue.len() {
        let current = queue[cursor];
        cursor += 1;
        result.push(current);
        for &next in &edges[current] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push(next);
            }
        }
    }
    if result.len() == units.len() {
        result
    } else {
        input_order
    }
}

fn supertype_names(decl: &TypeDecl) -> Vec<String> {
    fn name_of(ty: &ast::TypeRef) -> Option<String> {
        match ty {
            ast::TypeRef::Named { name, .. } => Some(name.clone()),
            _ => None,
        }
    }
    match decl {
        TypeDecl::Class(c) => c
            .extends
            .iter()
            .chain(c.implements.iter())
            .filter_map(name_of)
            .collect(),
        TypeDecl::Interface(i) => i.extends.iter().filter_map(name_of).collect(),
        TypeDecl::Enum(e) => e.implements.iter().filter_map(name_of).collect(),
    }
}
