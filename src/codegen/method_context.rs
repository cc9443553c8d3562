//! Per-method state during compilation.
//!
//! Owns the bytecode builder for the method body plus everything the
//! statement and expression compilers need to share: the name-to-slot map,
//! the break/continue target stack, and the enclosing `finally` blocks that
//! must be inlined on early exits.

use super::code::{BytecodeBuilder, Label};
use super::types::JType;
use crate::ast::Block;
use crate::common::{Error, Result};
use crate::parser::span::Span;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct LocalVar {
    pub name: String,
    pub ty: JType,
    pub slot: u16,
}

/// A break/continue target. Loops carry a continue label; switches do not.
#[derive(Debug, Clone)]
pub struct TargetFrame {
    pub break_label: Label,
    pub continue_label: Option<Label>,
    /// Source label when the statement is labeled
    pub name: Option<String>,
    /// Length of the finally stack when this frame was pushed; exits that
    /// cross frames inline the finally blocks above this depth
    pub finally_depth: usize,
}

pub struct MethodContext {
    pub class_name: String,
    pub method_name: String,
    pub return_type: JType,
    pub code: BytecodeBuilder,
    /// Lexical scopes; lookup walks from the innermost outwards
    scopes: Vec<HashMap<String, LocalVar>>,
    next_slot: u16,
    pub targets: Vec<TargetFrame>,
    /// Enclosing finally blocks, innermost last
    pub finally_stack: Vec<Block>,
    pub is_static: bool,
}

impl MethodContext {
    pub fn new(class_name: &str, method_name: &str, return_type: JType, is_static: bool) -> Self {
        Self {
            class_name: class_name.to_string(),
            method_name: method_name.to_string(),
            return_type,
            code: BytecodeBuilder::new(format!("{}.{}", class_name, method_name)),
            scopes: vec![HashMap::new()],
            next_slot: 0,
            targets: Vec::new(),
            finally_stack: Vec::new(),
            is_static,
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Leaving a scope drops its names; slots are not reused.
    pub fn exit_scope(&mut self) {
        self.scopes.pop();
    }

    /// Allocate the next slot(s) for a named variable.
    pub fn declare(&mut self, name: &str, ty: JType) -> LocalVar {
        let var = LocalVar { name: name.to_string(), ty: ty.clone(), slot: self.next_slot };
        self.next_slot += ty.category();
        self.code.max_locals = self.code.max_locals.max(self.next_slot);
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), var.clone());
        }
        var
    }

    /// Allocate an unnamed compiler temporary.
    pub fn declare_temp(&mut self, ty: &JType) -> u16 {
        let slot = self.next_slot;
        self.next_slot += ty.category();
        self.code.max_locals = self.code.max_locals.max(self.next_slot);
        slot
    }

    pub fn lookup(&self, name: &str) -> Option<&LocalVar> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn push_loop(&mut self, break_label: Label, continue_label: Label, name: Option<String>) {
        self.targets.push(TargetFrame {
            break_label,
            continue_label: Some(continue_label),
            name,
            finally_depth: self.finally_stack.len(),
        });
    }

    pub fn push_switch(&mut self, break_label: Label, name: Option<String>) {
        self.targets.push(TargetFrame {
            break_label,
            continue_label: None,
            name,
            finally_depth: self.finally_stack.len(),
        });
    }

    pub fn pop_target(&mut self) {
        self.targets.pop();
    }

    /// Find the frame a `break` exits. An unlabeled break targets the
    /// innermost breakable; a labeled one searches by name.
    pub fn break_target(&self, label: Option<&str>, span: Span) -> Result<&TargetFrame> {
        match label {
            None => self
                .targets
                .last()
                .ok_or_else(|| Error::type_error(span, "break outside of loop or switch")),
            Some(name) => self
                .targets
                .iter()
                .rev()
                .find(|f| f.name.as_deref() == Some(name))
                .ok_or_else(|| Error::type_error(span, format!("undefined label `{}`", name))),
        }
    }

    pub fn continue_target(&self, label: Option<&str>, span: Span) -> Result<&TargetFrame> {
        let frame = match label {
            None => self
                .targets
                .iter()
                .rev()
                .find(|f| f.continue_label.is_some())
                .ok_or_else(|| Error::type_error(span, "continue outside of loop"))?,
            Some(name) => self
                .targets
                .iter()
                .rev()
                .find(|f| f.name.as_deref() == Some(name))
                .ok_or_else(|| Error::type_error(span, format!("undefined label `{}`", name)))?,
        };
        if frame.continue_label.is_none() {
            return Err(Error::type_error(span, "cannot continue to a non-loop label"));
        }
        Ok(frame)
    }
}
