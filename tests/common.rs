// Common test utilities

#![allow(dead_code)]

use jopac::codegen::class_reader::{parse_class, ParsedClass, ParsedCode, ParsedMethod};
use jopac::Config;
use std::collections::BTreeMap;

/// Compile one source against the built-in platform descriptions only, so
/// tests do not depend on a JDK being installed.
pub fn compile_source(source: &str) -> BTreeMap<String, Vec<u8>> {
    let config = Config::default().without_runtime();
    match jopac::compile(source, &config) {
        Ok(classes) => classes,
        Err(err) => panic!("compilation failed: {}", err),
    }
}

pub fn compile_error(source: &str) -> jopac::Error {
    let config = Config::default().without_runtime();
    match jopac::compile(source, &config) {
        Ok(_) => panic!("compilation unexpectedly succeeded"),
        Err(err) => err,
    }
}

pub fn parse_single(classes: &BTreeMap<String, Vec<u8>>, name: &str) -> ParsedClass {
    let bytes = classes.get(name).unwrap_or_else(|| panic!("no class named {}", name));
    parse_class(bytes).expect("generated class file should parse")
}

pub fn find_method<'a>(class: &'a ParsedClass, name: &str) -> &'a ParsedMethod {
    class
        .methods
        .iter()
        .find(|m| m.name == name)
        .unwrap_or_else(|| panic!("no method named {}", name))
}

pub fn method_code<'a>(class: &'a ParsedClass, name: &str) -> &'a ParsedCode {
    find_method(class, name).code.as_ref().expect("method should have code")
}

/// Whether the raw constant pool region contains a modified-UTF-8 string;
/// used to probe for attribute names and member references.
pub fn bytes_contain(haystack: &[u8], needle: &str) -> bool {
    let needle = needle.as_bytes();
    haystack.windows(needle.len()).any(|w| w == needle)
}
