//! Lambda desugaring.
//!
//! A lambda becomes a synthetic `private static` method carrying its body,
//! plus an `invokedynamic` against `LambdaMetafactory.metafactory`. The
//! bootstrap arguments are the erased SAM method type, a handle to the
//! synthetic method, and the instantiated (specialized) method type.
//! Captured effectively-final locals become leading parameters of the
//! synthetic method and leading stack arguments at the call site. Emitting
//! any of this moves the class to the Java 8 class-file version.

use super::class::{flags, MethodInfo};
use super::class_reader::ParsedClass;
use super::gen::{ClassCtx, Gen};
use super::method_context::MethodContext;
use super::opcodes as op;
use super::types::{method_descriptor, parse_method_descriptor, JType};
use crate::ast::*;
use crate::common::{Error, Result};
use crate::parser::span::Span;

const METAFACTORY_OWNER: &str = "java/lang/invoke/LambdaMetafactory";
const METAFACTORY_DESC: &str = "(Ljava/lang/invoke/MethodHandles$Lookup;\
Ljava/lang/String;\
Ljava/lang/invoke/MethodType;\
Ljava/lang/invoke/MethodType;\
Ljava/lang/invoke/MethodHandle;\
Ljava/lang/invoke/MethodType;)\
Ljava/lang/invoke/CallSite;";

struct SamInfo {
    interface: String,
    name: String,
    descriptor: String,
}

impl<'a> Gen<'a> {
    pub fn compile_lambda(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        params: &[LambdaParam],
        body: &LambdaBody,
        expected: Option<&JType>,
        span: Span,
    ) -> Result<JType> {
        let type_args = self.lambda_type_args.take();
        let sam = self.target_sam(params, expected, span)?;
        let (sam_params, sam_ret) = parse_method_descriptor(&sam.descriptor)?;
        if sam_params.len() != params.len() {
            return Err(Error::type_error(
                span,
                format!(
                    "lambda has {} parameters but {}.{} takes {}",
                    params.len(),
                    sam.interface,
                    sam.name,
                    sam_params.len()
                ),
            ));
        }

        let (mut inst_params, inst_ret) = specialize(&sam_params, &sam_ret, type_args.as_deref());
        // explicit parameter types win over the instantiated guess
        for (slot, param) in inst_params.iter_mut().zip(params) {
            if let Some(ty) = &param.ty {
                *slot = self.resolve_type(&cls.type_params, Some(&cls.name.clone()), ty)?;
            }
        }

        let captured = captured_locals(params, body, ctx);

        // synthetic body method: (captures..., params...) -> inst_ret
        let base = match ctx.method_name.as_str() {
            "<init>" => "new",
            "<clinit>" => "static",
            other => other,
        };
        let lambda_name = format!("lambda${}${}", base, cls.class_file.next_lambda_id());
        let mut impl_params: Vec<JType> = captured.iter().map(|c| c.ty.clone()).collect();
        impl_params.extend(inst_params.iter().cloned());
        let impl_desc = method_descriptor(&impl_params, &inst_ret);

        self.compile_lambda_body(cls, &lambda_name, &impl_params, &inst_ret, params, body, &captured)?;

        // leading stack arguments for the captures
        for capture in &captured {
            ctx.code.load(&capture.ty, capture.slot);
        }

        let cp = &mut cls.class_file.cp;
        let metafactory_ref = cp.add_method_ref(METAFACTORY_OWNER, "metafactory", METAFACTORY_DESC);
        let metafactory_handle = cp.add_method_handle(op::REF_INVOKE_STATIC, metafactory_ref);
        let sam_method_type = cp.add_method_type(&sam.descriptor);
        let impl_ref = cp.add_method_ref(&cls.name, &lambda_name, &impl_desc);
        let impl_handle = cp.add_method_handle(op::REF_INVOKE_STATIC, impl_ref);
        let instantiated_type = cp.add_method_type(&method_descriptor(&inst_params, &inst_ret));

        let bootstrap_idx = cls.class_file.add_bootstrap_method(
            metafactory_handle,
            vec![sam_method_type, impl_handle, instantiated_type],
        );

        let capture_types: Vec<JType> = captured.iter().map(|c| c.ty.clone()).collect();
        let iface_ty = JType::reference(sam.interface.clone());
        let indy_desc = method_descriptor(&capture_types, &iface_ty);
        ctx.code.invoke_dynamic(&mut cls.class_file.cp, bootstrap_idx, &sam.name, &indy_desc)?;
        Ok(iface_ty)
    }

    /// The functional interface a lambda targets: the expected type when it
    /// is an interface with a unique abstract method, otherwise an
    /// arity-based guess over `java.util.function`.
    fn target_sam(
        &mut self,
        params: &[LambdaParam],
        expected: Option<&JType>,
        span: Span,
    ) -> Result<SamInfo> {
        if let Some(JType::Reference(name)) = expected {
            if let Some(info) = self.classpath.find(name) {
                if info.access_flags & flags::ACC_INTERFACE != 0 {
                    if let Some((sam_name, sam_desc)) = find_abstract_method(&info) {
                        return Ok(SamInfo {
                            interface: name.clone(),
                            name: sam_name,
                            descriptor: sam_desc,
                        });
                    }
                }
            }
        }
        let (interface, name, descriptor) = match params.len() {
            0 => ("java/lang/Runnable", "run", "()V"),
            1 => ("java/util/function/Function", "apply", "(Ljava/lang/Object;)Ljava/lang/Object;"),
            2 => (
                "java/util/function/BiFunction",
                "apply",
                "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;",
            ),
            n => {
                return Err(Error::type_error(
                    span,
                    format!("cannot infer a functional interface for a {}-parameter lambda", n),
                ))
            }
        };
        Ok(SamInfo {
            interface: interface.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn compile_lambda_body(
        &mut self,
        cls: &mut ClassCtx,
        lambda_name: &str,
        impl_params: &[JType],
        ret: &JType,
        params: &[LambdaParam],
        body: &LambdaBody,
        captured: &[Capture],
    ) -> Result<()> {
        let mut lctx = MethodContext::new(&cls.name, lambda_name, ret.clone(), true);
        for capture in captured {
            lctx.declare(&capture.name, capture.ty.clone());
        }
        for (param, ty) in params.iter().zip(&impl_params[captured.len()..]) {
            lctx.declare(&param.name, ty.clone());
        }

        match body {
            LambdaBody::Expr(expr) => {
                let ty = self.compile_expr_expecting(cls, &mut lctx, expr, Some(ret))?;
                if *ret == JType::Void {
                    match ty.slots() {
                        0 => {}
                        2 => lctx.code.emit(op::POP2),
                        _ => lctx.code.emit(op::POP),
                    }
                    lctx.code.ret(&JType::Void);
                } else {
                    self.coerce(cls, &mut lctx, &ty, ret, expr.span)?;
                    lctx.code.ret(ret);
                }
            }
            LambdaBody::Block(block) => {
                self.compile_block(cls, &mut lctx, block)?;
                if *ret == JType::Void {
                    lctx.code.ret(&JType::Void);
                }
            }
        }

        let mut info = MethodInfo::new(
            flags::ACC_PRIVATE | flags::ACC_STATIC | flags::ACC_SYNTHETIC,
            lambda_name,
            method_descriptor(impl_params, ret),
        );
        info.code = Some(lctx.code.finish()?);
        cls.class_file.add_method(info);
        Ok(())
    }
}

/// Specialize the erased SAM type with declared type arguments. When the
/// number of `Object` slots matches the argument count they are assigned
/// positionally (parameters first, then the return); a single argument
/// substitutes every `Object` slot, which covers the `Comparator` shape.
fn specialize(
    sam_params: &[JType],
    sam_ret: &JType,
    type_args: Option<&[JType]>,
) -> (Vec<JType>, JType) {
    let Some(args) = type_args else {
        return (sam_params.to_vec(), sam_ret.clone());
    };
    let object = JType::object();
    let object_slots = sam_params.iter().filter(|p| **p == object).count()
        + usize::from(*sam_ret == object);
    let mut params = sam_params.to_vec();
    let mut ret = sam_ret.clone();
    if object_slots == args.len() {
        let mut next = args.iter();
        for param in params.iter_mut() {
            if *param == object {
                if let Some(arg) = next.next() {
                    *param = arg.clone();
                }
            }
        }
        if ret == object {
            if let Some(arg) = next.next() {
                ret = arg.clone();
            }
        }
    } else if args.len() == 1 {
        for param in params.iter_mut() {
            if *param == object {
                *param = args[0].clone();
            }
        }
        if ret == object {
            ret = args[0].clone();
        }
    }
    (params, ret)
}

/// The unique abstract method of a functional interface, if any.
fn find_abstract_method(info: &ParsedClass) -> Option<(String, String)> {
    let mut found = None;
    for method in &info.methods {
        if method.access_flags & flags::ACC_ABSTRACT == 0 {
            continue;
        }
        // Object's public methods do not count towards the SAM
        if matches!(method.name.as_str(), "equals" | "hashCode" | "toString") {
            continue;
        }
        if found.is_some() {
            return None;
        }
        found = Some((method.name.clone(), method.descriptor.clone()));
    }
    found
}

#[derive(Debug, Clone)]
struct Capture {
    name: String,
    ty: JType,
    slot: u16,
}

/// Free variables of the lambda body that name locals of the enclosing
/// method, in first-use order.
fn captured_locals(params: &[LambdaParam], body: &LambdaBody, ctx: &MethodContext) -> Vec<Capture> {
    let mut shadowed: Vec<String> = params.iter().map(|p| p.name.clone()).collect();
    match body {
        LambdaBody::Block(block) => collect_declared(block, &mut shadowed),
        LambdaBody::Expr(_) => {}
    }
    let mut used = Vec::new();
    match body {
        LambdaBody::Expr(expr) => collect_names_expr(expr, &mut used),
        LambdaBody::Block(block) => {
            for stmt in &block.statements {
                collect_names_stmt(stmt, &mut used);
            }
        }
    }
    let mut captures: Vec<Capture> = Vec::new();
    for name in used {
        if name == "this" || shadowed.contains(&name) {
            continue;
        }
        if captures.iter().any(|c| c.name == name) {
            continue;
        }
        if let Some(var) = ctx.lookup(&name) {
            captures.push(Capture { name, ty: var.ty.clone(), slot: var.slot });
        }
    }
    captures
}

fn collect_declared(block: &Block, out: &mut Vec<String>) {
    for stmt in &block.statements {
        collect_declared_stmt(stmt, out);
    }
}

fn collect_declared_stmt(stmt: &Stmt, out: &mut Vec<String>) {
    match &stmt.kind {
        StmtKind::LocalVar { declarators, .. } => {
            out.extend(declarators.iter().map(|d| d.name.clone()));
        }
        StmtKind::Block(block) => collect_declared(block, out),
        StmtKind::If { then_branch, else_branch, .. } => {
            collect_declared_stmt(then_branch, out);
            if let Some(else_branch) = else_branch {
                collect_declared_stmt(else_branch, out);
            }
        }
        StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => {
            collect_declared_stmt(body, out);
        }
        StmtKind::For { init, body, .. } => {
            if let ForInit::Decl { declarators, .. } = init {
                out.extend(declarators.iter().map(|d| d.name.clone()));
            }
            collect_declared_stmt(body, out);
        }
        StmtKind::ForEach { name, body, .. } => {
            out.push(name.clone());
            collect_declared_stmt(body, out);
        }
        StmtKind::Switch { cases, .. } => {
            for case in cases {
                for stmt in &case.statements {
                    collect_declared_stmt(stmt, out);
                }
            }
        }
        StmtKind::Try { body, catches, finally } => {
            collect_declared(body, out);
            for catch in catches {
                out.push(catch.name.clone());
                collect_declared(&catch.body, out);
            }
            if let Some(finally) = finally {
                collect_declared(finally, out);
            }
        }
        StmtKind::Labeled { body, .. } => collect_declared_stmt(body, out),
        _ => {}
    }
}

fn collect_names_stmt(stmt: &Stmt, out: &mut Vec<String>) {
    match &stmt.kind {
        StmtKind::Block(block) => {
            for stmt in &block.statements {
                collect_names_stmt(stmt, out);
            }
        }
        StmtKind::LocalVar { declarators, .. } => {
            for declarator in declarators {
                if let Some(init) = &declarator.init {
                    collect_names_expr(init, out);
                }
            }
        }
        StmtKind::Expr(expr) | StmtKind::Throw { value: expr } => collect_names_expr(expr, out),
        StmtKind::If { cond, then_branch, else_branch } => {
            collect_names_expr(cond, out);
            collect_names_stmt(then_branch, out);
            if let Some(else_branch) = else_branch {
                collect_names_stmt(else_branch, out);
            }
        }
        StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
            collect_names_expr(cond, out);
            collect_names_stmt(body, out);
        }
        StmtKind::For { init, cond, update, body } => {
            match init {
                ForInit::Decl { declarators, .. } => {
                    for declarator in declarators {
                        if let Some(init) = &declarator.init {
                            collect_names_expr(init, out);
                        }
                    }
                }
                ForInit::Exprs(exprs) => exprs.iter().for_each(|e| collect_names_expr(e, out)),
                ForInit::None => {}
            }
            if let Some(cond) = cond {
                collect_names_expr(cond, out);
            }
            update.iter().for_each(|e| collect_names_expr(e, out));
            collect_names_stmt(body, out);
        }
        StmtKind::ForEach { iterable, body, .. } => {
            collect_names_expr(iterable, out);
            collect_names_stmt(body, out);
        }
        StmtKind::Switch { selector, cases } => {
            collect_names_expr(selector, out);
            for case in cases {
                for stmt in &case.statements {
                    collect_names_stmt(stmt, out);
                }
            }
        }
        StmtKind::Return { value } => {
            if let Some(value) = value {
                collect_names_expr(value, out);
            }
        }
        StmtKind::Try { body, catches, finally } => {
            for stmt in &body.statements {
                collect_names_stmt(stmt, out);
            }
            for catch in catches {
                for stmt in &catch.body.statements {
                    collect_names_stmt(stmt, out);
                }
            }
            if let Some(finally) = finally {
                for stmt in &finally.statements {
                    collect_names_stmt(stmt, out);
                }
            }
        }
        StmtKind::Labeled { body, .. } => collect_names_stmt(body, out),
        StmtKind::ExplicitCtorCall { args, .. } => {
            args.iter().for_each(|e| collect_names_expr(e, out));
        }
        StmtKind::Break { .. } | StmtKind::Continue { .. } | StmtKind::Empty => {}
    }
}

fn collect_names_expr(expr: &Expr, out: &mut Vec<String>) {
    match &expr.kind {
        ExprKind::Name(name) => out.push(name.clone()),
        ExprKind::FieldAccess { target, .. } => collect_names_expr(target, out),
        ExprKind::MethodCall { target, args, .. } => {
            if let Some(target) = target {
                collect_names_expr(target, out);
            }
            args.iter().for_each(|e| collect_names_expr(e, out));
        }
        ExprKind::New { args, .. } => args.iter().for_each(|e| collect_names_expr(e, out)),
        ExprKind::NewArray { dims, init, .. } => {
            dims.iter().flatten().for_each(|e| collect_names_expr(e, out));
            if let Some(init) = init {
                init.iter().for_each(|e| collect_names_expr(e, out));
            }
        }
        ExprKind::ArrayInit(elements) => {
            elements.iter().for_each(|e| collect_names_expr(e, out));
        }
        ExprKind::ArrayAccess { array, index } => {
            collect_names_expr(array, out);
            collect_names_expr(index, out);
        }
        ExprKind::Unary { operand, .. } => collect_names_expr(operand, out),
        ExprKind::Binary { left, right, .. } => {
            collect_names_expr(left, out);
            collect_names_expr(right, out);
        }
        ExprKind::Assign { target, value, .. } => {
            collect_names_expr(target, out);
            collect_names_expr(value, out);
        }
        ExprKind::Ternary { cond, then_expr, else_expr } => {
            collect_names_expr(cond, out);
            collect_names_expr(then_expr, out);
            collect_names_expr(else_expr, out);
        }
        ExprKind::Cast { expr, .. } | ExprKind::InstanceOf { expr, .. } => {
            collect_names_expr(expr, out);
        }
        ExprKind::Lambda { body, .. } => match body {
            LambdaBody::Expr(expr) => collect_names_expr(expr, out),
            LambdaBody::Block(block) => {
                for stmt in &block.statements {
                    collect_names_stmt(stmt, out);
                }
            }
        },
        ExprKind::Literal(_)
        | ExprKind::This
        | ExprKind::Super
        | ExprKind::ClassLiteral { .. } => {}
    }
}
