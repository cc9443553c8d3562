//! Expression compilation.
//!
//! Every `compile_*` here leaves a value of the returned type on the
//! operand stack (nothing for `Void`). Method and field references are
//! resolved through the classpath; argument and assignment boundaries
//! insert boxing, unboxing and widening conversions as needed.

use super::class::flags;
use super::gen::{ClassCtx, Gen};
use super::method_context::MethodContext;
use super::opcodes as op;
use super::resolve::{self, ResolvedMethod};
use super::types::{binary_numeric_promotion, unary_numeric_promotion, JType, PrimitiveKind};
use crate::ast::*;
use crate::common::{Error, Result};
use crate::parser::span::Span;

impl<'a> Gen<'a> {
    pub fn compile_expr(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        expr: &Expr,
    ) -> Result<JType> {
        self.compile_expr_expecting(cls, ctx, expr, None)
    }

    pub fn compile_expr_expecting(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        expr: &Expr,
        expected: Option<&JType>,
    ) -> Result<JType> {
        match &expr.kind {
            ExprKind::Literal(lit) => Ok(self.compile_literal(cls, ctx, lit)),
            ExprKind::Name(name) => self.compile_name(cls, ctx, name, expr.span),
            ExprKind::This => {
                if ctx.is_static {
                    return Err(Error::type_error(expr.span, "`this` in a static context"));
                }
                ctx.code.load(&JType::reference(cls.name.clone()), 0);
                Ok(JType::reference(cls.name.clone()))
            }
            ExprKind::Super => {
                if ctx.is_static {
                    return Err(Error::type_error(expr.span, "`super` in a static context"));
                }
                ctx.code.load(&JType::reference(cls.name.clone()), 0);
                Ok(JType::reference(cls.super_name.clone()))
            }
            ExprKind::FieldAccess { target, name } => {
                self.compile_field_access(cls, ctx, target, name, expr.span)
            }
            ExprKind::MethodCall { target, name, args } => {
                self.compile_call(cls, ctx, target.as_deref(), name, args, expr.span)
            }
            ExprKind::New { ty, args } => self.compile_new(cls, ctx, ty, args, expr.span),
            ExprKind::NewArray { elem, dims, init } => {
                self.compile_new_array(cls, ctx, elem, dims, init.as_deref(), expr.span)
            }
            ExprKind::ArrayInit(elements) => {
                let Some(array_ty @ JType::Array { .. }) = expected else {
                    return Err(Error::type_error(
                        expr.span,
                        "array initializer outside of a declaration",
                    ));
                };
                let array_ty = array_ty.clone();
                self.compile_array_literal(cls, ctx, &array_ty, elements, expr.span)?;
                Ok(array_ty)
            }
            ExprKind::ArrayAccess { array, index } => {
                self.compile_array_access(cls, ctx, array, index, expr.span)
            }
            ExprKind::Unary { op, operand, prefix } => {
                self.compile_unary(cls, ctx, *op, operand, *prefix, true, expr.span)
            }
            ExprKind::Binary { op, left, right } => {
                self.compile_binary(cls, ctx, *op, left, right, expr.span)
            }
            ExprKind::Assign { target, op, value } => {
                self.compile_assign(cls, ctx, target, *op, value, true, expr.span)
            }
            ExprKind::Ternary { cond, then_expr, else_expr } => {
                self.compile_ternary(cls, ctx, cond, then_expr, else_expr, expected)
            }
            ExprKind::Cast { ty, expr: inner } => self.compile_cast(cls, ctx, ty, inner),
            ExprKind::InstanceOf { expr: inner, ty } => {
                let inner_ty = self.compile_expr(cls, ctx, inner)?;
                if !inner_ty.is_reference() {
                    return Err(Error::type_error(
                        expr.span,
                        "instanceof needs a reference operand",
                    ));
                }
                let target = self.resolve_type(&cls.type_params, Some(&cls.name.clone()), ty)?;
                let name = target
                    .internal_or_descriptor()
                    .map_err(|_| Error::type_error(ty.span(), "invalid instanceof type"))?;
                ctx.code.instance_of(&mut cls.class_file.cp, &name);
                Ok(JType::boolean())
            }
            ExprKind::Lambda { params, body } => {
                self.compile_lambda(cls, ctx, params, body, expected, expr.span)
            }
            ExprKind::ClassLiteral { ty } => {
                let target = self.resolve_type(&cls.type_params, Some(&cls.name.clone()), ty)?;
                let name = target
                    .internal_or_descriptor()
                    .map_err(|_| Error::type_error(ty.span(), "invalid class literal"))?;
                ctx.code.push_class(&mut cls.class_file.cp, &name);
                Ok(JType::reference("java/lang/Class"))
            }
        }
    }

    fn compile_literal(&mut self, cls: &mut ClassCtx, ctx: &mut MethodContext, lit: &Literal) -> JType {
        let cp = &mut cls.class_file.cp;
        match lit {
            Literal::Int(v) => {
                ctx.code.push_int(cp, *v as i32);
                JType::int()
            }
            Literal::Long(v) => {
                ctx.code.push_long(cp, *v);
                JType::long()
            }
            Literal::Float(v) => {
                ctx.code.push_float(cp, *v);
                JType::float()
            }
            Literal::Double(v) => {
                ctx.code.push_double(cp, *v);
                JType::double()
            }
            Literal::Bool(v) => {
                ctx.code.push_int(cp, i32::from(*v));
                JType::boolean()
            }
            Literal::Char(v) => {
                ctx.code.push_int(cp, *v as i32);
                JType::char()
            }
            Literal::Str(s) => {
                ctx.code.push_string(cp, s);
                JType::string()
            }
            Literal::Null => {
                ctx.code.push_null();
                JType::Null
            }
        }
    }

    /// An unqualified call resolves against this class first, then against
    /// the static methods of enclosing classes.
    fn resolve_method_in_scope(
        &mut self,
        cls: &ClassCtx,
        name: &str,
        args: &[JType],
        span: Span,
    ) -> Result<ResolvedMethod> {
        let mut first_error = None;
        for (depth, owner) in enclosing_chain(&cls.name).enumerate() {
            match resolve::resolve_method(self.classpath, &owner, name, args, span) {
                Ok(m) if depth == 0 || m.is_static => return Ok(m),
                Ok(_) => {}
                Err(err) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
        Err(first_error
            .unwrap_or_else(|| Error::unresolved(span, "method", name)))
    }

    /// A field visible from this class: its own hierarchy first, then the
    /// static fields of enclosing classes (for static nested types).
    fn field_in_scope(&mut self, cls: &ClassCtx, name: &str) -> Option<resolve::ResolvedField> {
        for (depth, owner) in enclosing_chain(&cls.name).enumerate() {
            if let Some(field) = resolve::find_field(self.classpath, &owner, name) {
                if depth == 0 || field.is_static {
                    return Some(field);
                }
            }
        }
        None
    }

    fn compile_name(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        name: &str,
        span: Span,
    ) -> Result<JType> {
        if let Some(var) = ctx.lookup(name).cloned() {
            ctx.code.load(&var.ty, var.slot);
            return Ok(var.ty);
        }
        if let Some(field) = self.field_in_scope(cls, name) {
            if field.is_static {
                ctx.code.field_op(
                    &mut cls.class_file.cp,
                    op::GETSTATIC,
                    &field.owner,
                    &field.name,
                    &field.descriptor,
                )?;
            } else {
                if ctx.is_static {
                    return Err(Error::type_error(
                        span,
                        format!("instance field `{}` referenced from a static context", name),
                    ));
                }
                ctx.code.load(&JType::reference(cls.name.clone()), 0);
                ctx.code.field_op(
                    &mut cls.class_file.cp,
                    op::GETFIELD,
                    &field.owner,
                    &field.name,
                    &field.descriptor,
                )?;
            }
            return Ok(field.ty);
        }
        Err(Error::unresolved(span, "field", name))
    }

    /// When `expr` is a bare or dotted name that denotes a class rather
    /// than a value, return the internal name.
    fn class_target(&mut self, cls: &ClassCtx, ctx: &MethodContext, expr: &Expr) -> Option<String> {
        fn dotted(expr: &Expr) -> Option<String> {
            match &expr.kind {
                ExprKind::Name(n) => Some(n.clone()),
                ExprKind::FieldAccess { target, name } => {
                    dotted(target).map(|base| format!("{}.{}", base, name))
                }
                _ => None,
            }
        }
        if let ExprKind::Name(n) = &expr.kind {
            if ctx.lookup(n).is_some()
                || self.field_in_scope(cls, n).is_some()
            {
                return None;
            }
        }
        let name = dotted(expr)?;
        // the first component shadows: a local or field wins over a class
        if let Some(first) = name.split('.').next() {
            if ctx.lookup(first).is_some()
                || self.field_in_scope(cls, first).is_some()
            {
                return None;
            }
        }
        let resolved = self
            .resolve_class(&name, Some(&cls.name), expr.span)
            .ok()?;
        if self.classpath.contains(&resolved) {
            Some(resolved)
        } else {
            None
        }
    }

    fn compile_field_access(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        target: &Expr,
        name: &str,
        span: Span,
    ) -> Result<JType> {
        // Class.staticField, possibly dotted
        if let Some(class_name) = self.class_target(cls, ctx, target) {
            let field = resolve::find_field(self.classpath, &class_name, name)
                .ok_or_else(|| Error::unresolved(span, "field", name))?;
            if !field.is_static {
                return Err(Error::type_error(
                    span,
                    format!("field `{}` on {} is not static", name, class_name),
                ));
            }
            ctx.code.field_op(
                &mut cls.class_file.cp,
                op::GETSTATIC,
                &field.owner,
                &field.name,
                &field.descriptor,
            )?;
            return Ok(field.ty);
        }

        let target_ty = self.compile_expr(cls, ctx, target)?;
        if let JType::Array { .. } = target_ty {
            if name == "length" {
                ctx.code.emit(op::ARRAYLENGTH);
                return Ok(JType::int());
            }
            return Err(Error::unresolved(span, "field", name));
        }
        let JType::Reference(owner) = &target_ty else {
            return Err(Error::type_error(
                span,
                format!("cannot access field `{}` on {}", name, target_ty),
            ));
        };
        let field = resolve::find_field(self.classpath, owner, name)
            .ok_or_else(|| Error::unresolved(span, "field", format!("{}.{}", owner, name)))?;
        if field.is_static {
            // value is discarded; the access stays an ordinary getstatic
            ctx.code.emit(op::POP);
            ctx.code.field_op(
                &mut cls.class_file.cp,
                op::GETSTATIC,
                &field.owner,
                &field.name,
                &field.descriptor,
            )?;
        } else {
            ctx.code.field_op(
                &mut cls.class_file.cp,
                op::GETFIELD,
                &field.owner,
                &field.name,
                &field.descriptor,
            )?;
        }
        Ok(field.ty)
    }

    // ----- invocation -----

    pub fn compile_call(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        target: Option<&Expr>,
        name: &str,
        args: &[Expr],
        span: Span,
    ) -> Result<JType> {
        let mut is_super_call = false;
        let mut receiver_loaded = false;
        let mut needs_this = false;

        let owner_ty: JType = match target {
            None => {
                needs_this = true;
                JType::reference(cls.name.clone())
            }
            Some(t) if matches!(t.kind, ExprKind::Super) => {
                is_super_call = true;
                ctx.code.load(&JType::reference(cls.name.clone()), 0);
                receiver_loaded = true;
                JType::reference(cls.super_name.clone())
            }
            Some(t) => {
                if let Some(class_name) = self.class_target(cls, ctx, t) {
                    JType::reference(class_name)
                } else {
                    let ty = self.compile_expr(cls, ctx, t)?;
                    receiver_loaded = true;
                    ty
                }
            }
        };

        // arrays understand clone(); everything else on them is an error
        if let JType::Array { .. } = &owner_ty {
            if name == "clone" && args.is_empty() {
                let descriptor = owner_ty.descriptor();
                ctx.code.invoke(
                    &mut cls.class_file.cp,
                    op::INVOKEVIRTUAL,
                    &descriptor,
                    "clone",
                    "()Ljava/lang/Object;",
                )?;
                ctx.code.checkcast(&mut cls.class_file.cp, &descriptor);
                return Ok(owner_ty);
            }
            return Err(Error::unresolved(span, "method", name));
        }
        let JType::Reference(owner) = owner_ty.clone() else {
            return Err(Error::type_error(
                span,
                format!("cannot call `{}` on {}", name, owner_ty),
            ));
        };

        let arg_estimates = args
            .iter()
            .map(|a| self.estimate_type(cls, ctx, a))
            .collect::<Vec<_>>();
        let resolved = if needs_this {
            self.resolve_method_in_scope(cls, name, &arg_estimates, span)?
        } else {
            resolve::resolve_method(self.classpath, &owner, name, &arg_estimates, span)?
        };

        if needs_this && !resolved.is_static {
            if ctx.is_static {
                return Err(Error::type_error(
                    span,
                    format!("instance method `{}` called from a static context", name),
                ));
            }
            ctx.code.load(&JType::reference(cls.name.clone()), 0);
            receiver_loaded = true;
        }
        if receiver_loaded && resolved.is_static {
            // legal in source: instance.staticMethod(); drop the receiver
            ctx.code.emit(op::POP);
        }

        self.compile_arguments(cls, ctx, args, &resolved)?;
        self.emit_invoke(cls, ctx, &resolved, is_super_call)?;
        Ok(resolved.ret)
    }

    /// Compile arguments with coercions, packing trailing varargs into a
    /// fresh array when the call is in its variable-arity form.
    pub fn compile_arguments(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        args: &[Expr],
        resolved: &ResolvedMethod,
    ) -> Result<()> {
        let params = &resolved.params;
        let fixed_arity_call = args.len() == params.len() && {
            !resolved.is_varargs
                || match (args.last(), params.last()) {
                    (Some(arg), Some(param)) => {
                        let est = self.estimate_type(cls, ctx, arg);
                        resolve::is_assignable(self.classpath, &est, param)
                    }
                    _ => true,
                }
        };
        if fixed_arity_call {
            for (arg, param) in args.iter().zip(params) {
                let ty = self.compile_expr_expecting(cls, ctx, arg, Some(param))?;
                self.coerce(cls, ctx, &ty, param, arg.span)?;
            }
            return Ok(());
        }

        let fixed = params.len() - 1;
        for (arg, param) in args.iter().take(fixed).zip(params) {
            let ty = self.compile_expr_expecting(cls, ctx, arg, Some(param))?;
            self.coerce(cls, ctx, &ty, param, arg.span)?;
        }
        let elem = params[fixed]
            .element()
            .ok_or_else(|| Error::invariant("varargs", "non-array varargs parameter"))?;
        let trailing = &args[fixed..];
        ctx.code.push_int(&mut cls.class_file.cp, trailing.len() as i32);
        self.emit_new_array(cls, ctx, &elem)?;
        for (i, arg) in trailing.iter().enumerate() {
            ctx.code.emit(op::DUP);
            ctx.code.push_int(&mut cls.class_file.cp, i as i32);
            let ty = self.compile_expr_expecting(cls, ctx, arg, Some(&elem))?;
            self.coerce(cls, ctx, &ty, &elem, arg.span)?;
            self.emit_array_store(cls, ctx, &elem);
        }
        Ok(())
    }

    pub fn emit_invoke(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        resolved: &ResolvedMethod,
        is_super_call: bool,
    ) -> Result<()> {
        let opcode = if resolved.is_static {
            op::INVOKESTATIC
        } else if resolved.name == "<init>" || is_super_call || resolved.is_private {
            op::INVOKESPECIAL
        } else if resolved.is_interface {
            op::INVOKEINTERFACE
        } else {
            op::INVOKEVIRTUAL
        };
        ctx.code.invoke(
            &mut cls.class_file.cp,
            opcode,
            &resolved.owner,
            &resolved.name,
            &resolved.descriptor,
        )
    }

    /// `super(...)` / `this(...)` at the head of a constructor.
    pub fn compile_ctor_call(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        owner: &str,
        args: &[Expr],
        span: Span,
    ) -> Result<()> {
        ctx.code.load(&JType::reference(cls.name.clone()), 0);
        let arg_estimates = args
            .iter()
            .map(|a| self.estimate_type(cls, ctx, a))
            .collect::<Vec<_>>();
        let resolved =
            resolve::resolve_method(self.classpath, owner, "<init>", &arg_estimates, span)?;
        self.compile_arguments(cls, ctx, args, &resolved)?;
        ctx.code.invoke(
            &mut cls.class_file.cp,
            op::INVOKESPECIAL,
            owner,
            "<init>",
            &resolved.descriptor,
        )
    }

    fn compile_new(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        ty: &TypeRef,
        args: &[Expr],
        span: Span,
    ) -> Result<JType> {
        let target = self.resolve_type(&cls.type_params, Some(&cls.name.clone()), ty)?;
        let JType::Reference(class_name) = &target else {
            return Err(Error::type_error(span, format!("cannot instantiate {}", target)));
        };
        if let Some(info) = self.classpath.find(class_name) {
            if info.access_flags & flags::ACC_INTERFACE != 0 {
                return Err(Error::type_error(
                    span,
                    format!("cannot instantiate interface {}", class_name),
                ));
            }
            if info.access_flags & flags::ACC_ABSTRACT != 0 {
                return Err(Error::type_error(
                    span,
                    format!("cannot instantiate abstract class {}", class_name),
                ));
            }
        }
        ctx.code.new_object(&mut cls.class_file.cp, class_name);
        ctx.code.emit(op::DUP);
        let arg_estimates = args
            .iter()
            .map(|a| self.estimate_type(cls, ctx, a))
            .collect::<Vec<_>>();
        let resolved =
            resolve::resolve_method(self.classpath, class_name, "<init>", &arg_estimates, span)?;
        self.compile_arguments(cls, ctx, args, &resolved)?;
        ctx.code.invoke(
            &mut cls.class_file.cp,
            op::INVOKESPECIAL,
            class_name,
            "<init>",
            &resolved.descriptor,
        )?;
        Ok(target)
    }

    // ----- arrays -----

    pub fn emit_new_array(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        elem: &JType,
    ) -> Result<()> {
        match elem {
            JType::Primitive(kind) => ctx.code.newarray(kind.newarray_code()),
            JType::Reference(name) => ctx.code.anewarray(&mut cls.class_file.cp, name),
            JType::Array { .. } => {
                ctx.code.anewarray(&mut cls.class_file.cp, &elem.descriptor())
            }
            other => {
                return Err(Error::invariant(
                    &ctx.method_name,
                    format!("array of {}", other),
                ))
            }
        }
        Ok(())
    }

    pub fn emit_array_load(&mut self, _cls: &mut ClassCtx, ctx: &mut MethodContext, elem: &JType) {
        let opcode = match elem {
            JType::Primitive(PrimitiveKind::Int) => op::IALOAD,
            JType::Primitive(PrimitiveKind::Long) => op::LALOAD,
            JType::Primitive(PrimitiveKind::Float) => op::FALOAD,
            JType::Primitive(PrimitiveKind::Double) => op::DALOAD,
            JType::Primitive(PrimitiveKind::Byte | PrimitiveKind::Boolean) => op::BALOAD,
            JType::Primitive(PrimitiveKind::Char) => op::CALOAD,
            JType::Primitive(PrimitiveKind::Short) => op::SALOAD,
            _ => op::AALOAD,
        };
        ctx.code.emit(opcode);
    }

    pub fn emit_array_store(&mut self, _cls: &mut ClassCtx, ctx: &mut MethodContext, elem: &JType) {
        let opcode = match elem {
            JType::Primitive(PrimitiveKind::Int) => op::IASTORE,
            JType::Primitive(PrimitiveKind::Long) => op::LASTORE,
            JType::Primitive(PrimitiveKind::Float) => op::FASTORE,
            JType::Primitive(PrimitiveKind::Double) => op::DASTORE,
            JType::Primitive(PrimitiveKind::Byte | PrimitiveKind::Boolean) => op::BASTORE,
            JType::Primitive(PrimitiveKind::Char) => op::CASTORE,
            JType::Primitive(PrimitiveKind::Short) => op::SASTORE,
            _ => op::AASTORE,
        };
        ctx.code.emit(opcode);
    }

    /// Allocate and fill an array from a `{...}` literal.
    pub fn compile_array_literal(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        array_ty: &JType,
        elements: &[Expr],
        span: Span,
    ) -> Result<()> {
        let elem = array_ty
            .element()
            .ok_or_else(|| Error::type_error(span, "array initializer for a non-array type"))?;
        ctx.code.push_int(&mut cls.class_file.cp, elements.len() as i32);
        self.emit_new_array(cls, ctx, &elem)?;
        for (i, element) in elements.iter().enumerate() {
            ctx.code.emit(op::DUP);
            ctx.code.push_int(&mut cls.class_file.cp, i as i32);
            if let ExprKind::ArrayInit(nested) = &element.kind {
                self.compile_array_literal(cls, ctx, &elem, nested, element.span)?;
            } else {
                let ty = self.compile_expr_expecting(cls, ctx, element, Some(&elem))?;
                self.coerce(cls, ctx, &ty, &elem, element.span)?;
            }
            self.emit_array_store(cls, ctx, &elem);
        }
        Ok(())
    }

    fn compile_new_array(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        elem: &TypeRef,
        dims: &[Option<Expr>],
        init: Option<&[Expr]>,
        span: Span,
    ) -> Result<JType> {
        let base = self.resolve_type(&cls.type_params, Some(&cls.name.clone()), elem)?;
        let total_dims = dims.len().max(1) as u8;
        let array_ty = match base.clone() {
            JType::Array { elem, dims: inner } => {
                JType::Array { elem, dims: inner + total_dims }
            }
            other => JType::array(other, total_dims),
        };

        if let Some(elements) = init {
            self.compile_array_literal(cls, ctx, &array_ty, elements, span)?;
            return Ok(array_ty);
        }

        let sized: Vec<&Expr> = dims.iter().map_while(|d| d.as_ref()).collect();
        if sized.is_empty() {
            return Err(Error::type_error(span, "array creation needs a size"));
        }
        for size in &sized {
            let ty = self.compile_expr(cls, ctx, size)?;
            self.coerce(cls, ctx, &ty, &JType::int(), size.span)?;
        }
        if total_dims == 1 {
            let elem_ty = array_ty.element().expect("one-dimensional array");
            self.emit_new_array(cls, ctx, &elem_ty)?;
        } else {
            ctx.code.multianewarray(
                &mut cls.class_file.cp,
                &array_ty.descriptor(),
                sized.len() as u8,
            );
        }
        Ok(array_ty)
    }

    fn compile_array_access(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        array: &Expr,
        index: &Expr,
        span: Span,
    ) -> Result<JType> {
        let array_ty = self.compile_expr(cls, ctx, array)?;
        let elem = array_ty
            .element()
            .ok_or_else(|| Error::type_error(span, format!("cannot index {}", array_ty)))?;
        let idx_ty = self.compile_expr(cls, ctx, index)?;
        self.coerce(cls, ctx, &idx_ty, &JType::int(), index.span)?;
        self.emit_array_load(cls, ctx, &elem);
        Ok(elem)
    }

    // ----- assignment -----

    pub fn compile_assign(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        target: &Expr,
        compound: Option<BinaryOp>,
        value: &Expr,
        want_value: bool,
        span: Span,
    ) -> Result<JType> {
        // `s += x` on a String is concatenation, not arithmetic
        if compound == Some(BinaryOp::Add) {
            let target_ty = self.estimate_type(cls, ctx, target);
            if target_ty == JType::string() {
                let concat = Expr {
                    kind: ExprKind::Binary {
                        op: BinaryOp::Add,
                        left: Box::new(target.clone()),
                        right: Box::new(value.clone()),
                    },
                    span,
                };
                return self.compile_assign(cls, ctx, target, None, &concat, want_value, span);
            }
        }

        match &target.kind {
            ExprKind::Name(name) => {
                if let Some(var) = ctx.lookup(name).cloned() {
                    self.compile_assign_rhs(cls, ctx, compound, value, &var.ty, |_gen, _cls, ctx| {
                        ctx.code.load(&var.ty, var.slot);
                        Ok(())
                    })?;
                    if want_value {
                        ctx.code.emit(if var.ty.category() == 2 { op::DUP2 } else { op::DUP });
                    }
                    ctx.code.store(&var.ty, var.slot);
                    return Ok(if want_value { var.ty } else { JType::Void });
                }
                let field = self
                    .field_in_scope(cls, name)
                    .ok_or_else(|| Error::unresolved(span, "field", name))?;
                self.compile_field_assign(cls, ctx, &field, false, compound, value, want_value, span)
            }
            ExprKind::FieldAccess { target: object, name } => {
                if let Some(class_name) = self.class_target(cls, ctx, object) {
                    let field = resolve::find_field(self.classpath, &class_name, name)
                        .ok_or_else(|| Error::unresolved(span, "field", name))?;
                    if !field.is_static {
                        return Err(Error::type_error(
                            span,
                            format!("field `{}` on {} is not static", name, class_name),
                        ));
                    }
                    return self.compile_field_assign(
                        cls, ctx, &field, false, compound, value, want_value, span,
                    );
                }
                let object_ty = self.compile_expr(cls, ctx, object)?;
                let JType::Reference(owner) = &object_ty else {
                    return Err(Error::type_error(
                        span,
                        format!("cannot assign field on {}", object_ty),
                    ));
                };
                let field = resolve::find_field(self.classpath, owner, name)
                    .ok_or_else(|| Error::unresolved(span, "field", name))?;
                self.compile_field_assign(
                    cls, ctx, &field, true, compound, value, want_value, span,
                )
            }
            ExprKind::ArrayAccess { array, index } => {
                let array_ty = self.compile_expr(cls, ctx, array)?;
                let elem = array_ty.element().ok_or_else(|| {
                    Error::type_error(span, format!("cannot index {}", array_ty))
                })?;
                let idx_ty = self.compile_expr(cls, ctx, index)?;
                self.coerce(cls, ctx, &idx_ty, &JType::int(), index.span)?;
                if let Some(op_kind) = compound {
                    ctx.code.emit(op::DUP2);
                    self.emit_array_load(cls, ctx, &elem);
                    self.apply_compound(cls, ctx, op_kind, &elem, value, span)?;
                } else {
                    let ty = self.compile_expr_expecting(cls, ctx, value, Some(&elem))?;
                    self.coerce(cls, ctx, &ty, &elem, value.span)?;
                }
                if want_value {
                    ctx.code
                        .emit(if elem.category() == 2 { op::DUP2_X2 } else { op::DUP_X2 });
                }
                self.emit_array_store(cls, ctx, &elem);
                Ok(if want_value { elem } else { JType::Void })
            }
            _ => Err(Error::type_error(span, "invalid assignment target")),
        }
    }

    /// Leave the (possibly compound-combined) value on the stack, coerced
    /// to `target_ty`. `load_current` pushes the current value for the
    /// compound case.
    fn compile_assign_rhs(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        compound: Option<BinaryOp>,
        value: &Expr,
        target_ty: &JType,
        load_current: impl FnOnce(&mut Self, &mut ClassCtx, &mut MethodContext) -> Result<()>,
    ) -> Result<()> {
        match compound {
            Some(op_kind) => {
                load_current(self, cls, ctx)?;
                self.apply_compound(cls, ctx, op_kind, target_ty, value, value.span)
            }
            None => {
                let ty = self.compile_expr_expecting(cls, ctx, value, Some(target_ty))?;
                self.coerce(cls, ctx, &ty, target_ty, value.span)
            }
        }
    }

    /// With the current value on the stack, compute `current <op> value`
    /// and narrow back to the target type.
    fn apply_compound(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        op_kind: BinaryOp,
        target_ty: &JType,
        value: &Expr,
        span: Span,
    ) -> Result<()> {
        let current = self.unbox_if_wrapper(cls, ctx, target_ty.clone())?;
        let rhs_est = self.estimate_type(cls, ctx, value);
        let rhs_unboxed = unboxed_estimate(&rhs_est);
        let promoted = match op_kind {
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => unary_numeric_promotion(&current),
            _ => binary_numeric_promotion(&current, &rhs_unboxed),
        };
        self.convert_primitive(ctx, &current, &promoted)?;
        let rhs = self.compile_expr(cls, ctx, value)?;
        let rhs = self.unbox_if_wrapper(cls, ctx, rhs)?;
        let rhs_target = match op_kind {
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => JType::int(),
            _ => promoted.clone(),
        };
        self.convert_primitive(ctx, &rhs, &rhs_target)?;
        self.emit_arith(ctx, op_kind, &promoted, span)?;
        // the implicit narrowing cast of compound assignment
        self.convert_primitive(ctx, &promoted, target_ty)?;
        if target_ty.is_reference() {
            // boxed target: re-box the primitive result
            if let JType::Reference(name) = target_ty {
                if let Some(kind) = PrimitiveKind::from_wrapper(name) {
                    self.box_primitive(cls, ctx, kind)?;
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn compile_field_assign(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        field: &resolve::ResolvedField,
        receiver_on_stack: bool,
        compound: Option<BinaryOp>,
        value: &Expr,
        want_value: bool,
        span: Span,
    ) -> Result<JType> {
        let field = field.clone();
        if field.is_static {
            if receiver_on_stack {
                ctx.code.emit(op::POP);
            }
            match compound {
                Some(op_kind) => {
                    ctx.code.field_op(
                        &mut cls.class_file.cp,
                        op::GETSTATIC,
                        &field.owner,
                        &field.name,
                        &field.descriptor,
                    )?;
                    self.apply_compound(cls, ctx, op_kind, &field.ty, value, span)?;
                }
                None => {
                    let ty = self.compile_expr_expecting(cls, ctx, value, Some(&field.ty))?;
                    self.coerce(cls, ctx, &ty, &field.ty, value.span)?;
                }
            }
            if want_value {
                ctx.code.emit(if field.ty.category() == 2 { op::DUP2 } else { op::DUP });
            }
            ctx.code.field_op(
                &mut cls.class_file.cp,
                op::PUTSTATIC,
                &field.owner,
                &field.name,
                &field.descriptor,
            )?;
            return Ok(if want_value { field.ty } else { JType::Void });
        }

        if !receiver_on_stack {
            if ctx.is_static {
                return Err(Error::type_error(
                    span,
                    format!("instance field `{}` assigned from a static context", field.name),
                ));
            }
            ctx.code.load(&JType::reference(cls.name.clone()), 0);
        }
        match compound {
            Some(op_kind) => {
                ctx.code.emit(op::DUP);
                ctx.code.field_op(
                    &mut cls.class_file.cp,
                    op::GETFIELD,
                    &field.owner,
                    &field.name,
                    &field.descriptor,
                )?;
                self.apply_compound(cls, ctx, op_kind, &field.ty, value, span)?;
            }
            None => {
                let ty = self.compile_expr_expecting(cls, ctx, value, Some(&field.ty))?;
                self.coerce(cls, ctx, &ty, &field.ty, value.span)?;
            }
        }
        if want_value {
            ctx.code.emit(if field.ty.category() == 2 { op::DUP2_X1 } else { op::DUP_X1 });
        }
        ctx.code.field_op(
            &mut cls.class_file.cp,
            op::PUTFIELD,
            &field.owner,
            &field.name,
            &field.descriptor,
        )?;
        Ok(if want_value { field.ty } else { JType::Void })
    }

    // ----- unary -----

    #[allow(clippy::too_many_arguments)]
    pub fn compile_unary(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        op_kind: UnaryOp,
        operand: &Expr,
        prefix: bool,
        want_value: bool,
        span: Span,
    ) -> Result<JType> {
        match op_kind {
            UnaryOp::Plus => self.compile_expr(cls, ctx, operand),
            UnaryOp::Neg => {
                // fold the sign into the literal, so Integer.MIN_VALUE works
                if let ExprKind::Literal(lit) = &operand.kind {
                    match lit {
                        Literal::Int(v) => {
                            ctx.code.push_int(&mut cls.class_file.cp, (-v) as i32);
                            return Ok(JType::int());
                        }
                        Literal::Long(v) => {
                            ctx.code.push_long(&mut cls.class_file.cp, v.wrapping_neg());
                            return Ok(JType::long());
                        }
                        Literal::Float(v) => {
                            ctx.code.push_float(&mut cls.class_file.cp, -v);
                            return Ok(JType::float());
                        }
                        Literal::Double(v) => {
                            ctx.code.push_double(&mut cls.class_file.cp, -v);
                            return Ok(JType::double());
                        }
                        _ => {}
                    }
                }
                let ty = self.compile_expr(cls, ctx, operand)?;
                let ty = self.unbox_if_wrapper(cls, ctx, ty)?;
                let promoted = unary_numeric_promotion(&ty);
                self.convert_primitive(ctx, &ty, &promoted)?;
                let opcode = match promoted {
                    JType::Primitive(PrimitiveKind::Long) => op::LNEG,
                    JType::Primitive(PrimitiveKind::Float) => op::FNEG,
                    JType::Primitive(PrimitiveKind::Double) => op::DNEG,
                    _ => op::INEG,
                };
                ctx.code.emit(opcode);
                Ok(promoted)
            }
            UnaryOp::BitNot => {
                let ty = self.compile_expr(cls, ctx, operand)?;
                let ty = self.unbox_if_wrapper(cls, ctx, ty)?;
                let promoted = unary_numeric_promotion(&ty);
                self.convert_primitive(ctx, &ty, &promoted)?;
                if promoted == JType::long() {
                    ctx.code.push_long(&mut cls.class_file.cp, -1);
                    ctx.code.emit(op::LXOR);
                } else {
                    ctx.code.push_int(&mut cls.class_file.cp, -1);
                    ctx.code.emit(op::IXOR);
                }
                Ok(promoted)
            }
            UnaryOp::Not => {
                let depth = ctx.code.stack_depth();
                let true_label = ctx.code.new_label();
                let end = ctx.code.new_label();
                self.compile_condition(cls, ctx, operand, true_label, false)?;
                ctx.code.push_int(&mut cls.class_file.cp, 0);
                ctx.code.goto(end);
                ctx.code.mark(true_label);
                ctx.code.set_stack_depth(depth);
                ctx.code.push_int(&mut cls.class_file.cp, 1);
                ctx.code.mark(end);
                Ok(JType::boolean())
            }
            UnaryOp::Inc | UnaryOp::Dec => {
                self.compile_incdec(cls, ctx, op_kind, operand, prefix, want_value, span)
            }
        }
    }

    fn compile_incdec(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        op_kind: UnaryOp,
        operand: &Expr,
        prefix: bool,
        want_value: bool,
        span: Span,
    ) -> Result<JType> {
        let delta: i16 = if op_kind == UnaryOp::Inc { 1 } else { -1 };

        // int local: iinc, with the load placed by pre/post form
        if let ExprKind::Name(name) = &operand.kind {
            if let Some(var) = ctx.lookup(name).cloned() {
                if var.ty == JType::int() {
                    if !want_value {
                        ctx.code.iinc(var.slot, delta);
                        return Ok(JType::Void);
                    }
                    if prefix {
                        ctx.code.iinc(var.slot, delta);
                        ctx.code.load(&var.ty, var.slot);
                    } else {
                        ctx.code.load(&var.ty, var.slot);
                        ctx.code.iinc(var.slot, delta);
                    }
                    return Ok(JType::int());
                }
                // other numeric locals: load, adjust, store
                let one = Expr {
                    kind: ExprKind::Literal(Literal::Int(1)),
                    span,
                };
                let bin_op =
                    if op_kind == UnaryOp::Inc { BinaryOp::Add } else { BinaryOp::Sub };
                if !want_value {
                    self.compile_assign(cls, ctx, operand, Some(bin_op), &one, false, span)?;
                    return Ok(JType::Void);
                }
                if prefix {
                    return self
                        .compile_assign(cls, ctx, operand, Some(bin_op), &one, true, span);
                }
                // post-form: the old value is the result
                ctx.code.load(&var.ty, var.slot);
                self.compile_assign(cls, ctx, operand, Some(bin_op), &one, false, span)?;
                return Ok(var.ty);
            }
        }

        // fields and array elements go through the compound-assign path
        let one = Expr { kind: ExprKind::Literal(Literal::Int(1)), span };
        let bin_op = if op_kind == UnaryOp::Inc { BinaryOp::Add } else { BinaryOp::Sub };
        if !want_value || prefix {
            return self.compile_assign(cls, ctx, operand, Some(bin_op), &one, want_value, span);
        }
        // post-form on a field: old value, then update
        let ty = self.compile_expr(cls, ctx, operand)?;
        self.compile_assign(cls, ctx, operand, Some(bin_op), &one, false, span)?;
        Ok(ty)
    }

    // ----- binary -----

    fn compile_binary(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        op_kind: BinaryOp,
        left: &Expr,
        right: &Expr,
        span: Span,
    ) -> Result<JType> {
        if op_kind == BinaryOp::Add && self.is_string_concat(cls, ctx, left, right) {
            return self.compile_string_concat(cls, ctx, left, right, span);
        }

        if op_kind.is_comparison()
            || op_kind == BinaryOp::AndAnd
            || op_kind == BinaryOp::OrOr
        {
            return self.materialize_condition(cls, ctx, op_kind, left, right, span);
        }

        // & | ^ over booleans are the non-short-circuit logical forms
        let left_est = unboxed_estimate(&self.estimate_type(cls, ctx, left));
        let right_est = unboxed_estimate(&self.estimate_type(cls, ctx, right));
        if matches!(op_kind, BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor)
            && left_est == JType::boolean()
            && right_est == JType::boolean()
        {
            let lt = self.compile_expr(cls, ctx, left)?;
            self.unbox_if_wrapper(cls, ctx, lt)?;
            let rt = self.compile_expr(cls, ctx, right)?;
            self.unbox_if_wrapper(cls, ctx, rt)?;
            let opcode = match op_kind {
                BinaryOp::BitAnd => op::IAND,
                BinaryOp::BitOr => op::IOR,
                _ => op::IXOR,
            };
            ctx.code.emit(opcode);
            return Ok(JType::boolean());
        }

        let shift = matches!(op_kind, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr);
        let promoted = if shift {
            unary_numeric_promotion(&left_est)
        } else {
            binary_numeric_promotion(&left_est, &right_est)
        };

        let lt = self.compile_expr(cls, ctx, left)?;
        let lt = self.unbox_if_wrapper(cls, ctx, lt)?;
        self.convert_primitive(ctx, &lt, &promoted)?;
        let rt = self.compile_expr(cls, ctx, right)?;
        let rt = self.unbox_if_wrapper(cls, ctx, rt)?;
        let shift_int_ty = JType::int();
        self.convert_primitive(ctx, &rt, if shift { &shift_int_ty } else { &promoted })?;

        self.emit_arith(ctx, op_kind, &promoted, span)?;
        Ok(promoted)
    }

    fn emit_arith(
        &mut self,
        ctx: &mut MethodContext,
        op_kind: BinaryOp,
        ty: &JType,
        span: Span,
    ) -> Result<()> {
        use PrimitiveKind::*;
        let kind = match ty {
            JType::Primitive(Long) => 1,
            JType::Primitive(Float) => 2,
            JType::Primitive(Double) => 3,
            _ => 0,
        };
        let table: [u8; 4] = match op_kind {
            BinaryOp::Add => [op::IADD, op::LADD, op::FADD, op::DADD],
            BinaryOp::Sub => [op::ISUB, op::LSUB, op::FSUB, op::DSUB],
            BinaryOp::Mul => [op::IMUL, op::LMUL, op::FMUL, op::DMUL],
            BinaryOp::Div => [op::IDIV, op::LDIV, op::FDIV, op::DDIV],
            BinaryOp::Rem => [op::IREM, op::LREM, op::FREM, op::DREM],
            BinaryOp::Shl => [op::ISHL, op::LSHL, 0, 0],
            BinaryOp::Shr => [op::ISHR, op::LSHR, 0, 0],
            BinaryOp::UShr => [op::IUSHR, op::LUSHR, 0, 0],
            BinaryOp::BitAnd => [op::IAND, op::LAND, 0, 0],
            BinaryOp::BitOr => [op::IOR, op::LOR, 0, 0],
            BinaryOp::BitXor => [op::IXOR, op::LXOR, 0, 0],
            other => {
                return Err(Error::type_error(
                    span,
                    format!("`{}` is not an arithmetic operator", other.symbol()),
                ))
            }
        };
        let opcode = table[kind];
        if opcode == 0 {
            return Err(Error::type_error(
                span,
                format!("`{}` does not apply to {}", op_kind.symbol(), ty),
            ));
        }
        ctx.code.emit(opcode);
        Ok(())
    }

    /// Comparison or logical expression in value position: branch, then
    /// push 0 or 1.
    fn materialize_condition(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        op_kind: BinaryOp,
        left: &Expr,
        right: &Expr,
        span: Span,
    ) -> Result<JType> {
        let whole = Expr {
            kind: ExprKind::Binary {
                op: op_kind,
                left: Box::new(left.clone()),
                right: Box::new(right.clone()),
            },
            span,
        };
        let depth = ctx.code.stack_depth();
        let true_label = ctx.code.new_label();
        let end = ctx.code.new_label();
        self.compile_condition(cls, ctx, &whole, true_label, true)?;
        ctx.code.push_int(&mut cls.class_file.cp, 0);
        ctx.code.goto(end);
        ctx.code.mark(true_label);
        ctx.code.set_stack_depth(depth);
        ctx.code.push_int(&mut cls.class_file.cp, 1);
        ctx.code.mark(end);
        Ok(JType::boolean())
    }

    // ----- string concatenation -----

    fn is_string_concat(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        left: &Expr,
        right: &Expr,
    ) -> bool {
        self.estimate_type(cls, ctx, left) == JType::string()
            || self.estimate_type(cls, ctx, right) == JType::string()
    }

    fn collect_concat_parts<'e>(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        expr: &'e Expr,
        parts: &mut Vec<&'e Expr>,
    ) {
        if let ExprKind::Binary { op: BinaryOp::Add, left, right } = &expr.kind {
            if self.is_string_concat(cls, ctx, left, right) {
                self.collect_concat_parts(cls, ctx, left, parts);
                self.collect_concat_parts(cls, ctx, right, parts);
                return;
            }
        }
        parts.push(expr);
    }

    /// Fold the whole `+` spine into one StringBuilder chain with
    /// type-specific `append` overloads.
    fn compile_string_concat(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        left: &Expr,
        right: &Expr,
        span: Span,
    ) -> Result<JType> {
        let whole = Expr {
            kind: ExprKind::Binary {
                op: BinaryOp::Add,
                left: Box::new(left.clone()),
                right: Box::new(right.clone()),
            },
            span,
        };
        let mut parts = Vec::new();
        self.collect_concat_parts(cls, ctx, &whole, &mut parts);
        let parts: Vec<Expr> = parts.into_iter().cloned().collect();

        const SB: &str = "java/lang/StringBuilder";
        ctx.code.new_object(&mut cls.class_file.cp, SB);
        ctx.code.emit(op::DUP);
        ctx.code.invoke(&mut cls.class_file.cp, op::INVOKESPECIAL, SB, "<init>", "()V")?;

        for part in &parts {
            let ty = self.compile_expr(cls, ctx, part)?;
            // primitive overloads avoid boxing; byte and short widen to int
            let append_desc = match &ty {
                JType::Primitive(PrimitiveKind::Boolean) => "(Z)Ljava/lang/StringBuilder;",
                JType::Primitive(PrimitiveKind::Char) => "(C)Ljava/lang/StringBuilder;",
                JType::Primitive(PrimitiveKind::Long) => "(J)Ljava/lang/StringBuilder;",
                JType::Primitive(PrimitiveKind::Float) => "(F)Ljava/lang/StringBuilder;",
                JType::Primitive(PrimitiveKind::Double) => "(D)Ljava/lang/StringBuilder;",
                JType::Primitive(_) => "(I)Ljava/lang/StringBuilder;",
                t if *t == JType::string() => "(Ljava/lang/String;)Ljava/lang/StringBuilder;",
                _ => "(Ljava/lang/Object;)Ljava/lang/StringBuilder;",
            };
            ctx.code.invoke(&mut cls.class_file.cp, op::INVOKEVIRTUAL, SB, "append", append_desc)?;
        }
        ctx.code.invoke(
            &mut cls.class_file.cp,
            op::INVOKEVIRTUAL,
            SB,
            "toString",
            "()Ljava/lang/String;",
        )?;
        Ok(JType::string())
    }

    // ----- ternary -----

    fn compile_ternary(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        cond: &Expr,
        then_expr: &Expr,
        else_expr: &Expr,
        expected: Option<&JType>,
    ) -> Result<JType> {
        let then_est = unboxed_estimate(&self.estimate_type(cls, ctx, then_expr));
        let else_est = unboxed_estimate(&self.estimate_type(cls, ctx, else_expr));
        let result = if let Some(expected) = expected {
            expected.clone()
        } else if then_est.is_numeric() && else_est.is_numeric() {
            binary_numeric_promotion(&then_est, &else_est)
        } else if then_est == JType::Null {
            else_est
        } else {
            then_est
        };

        let depth = ctx.code.stack_depth();
        let else_label = ctx.code.new_label();
        let end = ctx.code.new_label();
        self.compile_condition(cls, ctx, cond, else_label, false)?;
        let then_ty = self.compile_expr_expecting(cls, ctx, then_expr, Some(&result))?;
        self.coerce(cls, ctx, &then_ty, &result, then_expr.span)?;
        ctx.code.goto(end);
        ctx.code.mark(else_label);
        ctx.code.set_stack_depth(depth);
        let else_ty = self.compile_expr_expecting(cls, ctx, else_expr, Some(&result))?;
        self.coerce(cls, ctx, &else_ty, &result, else_expr.span)?;
        ctx.code.mark(end);
        Ok(result)
    }

    // ----- casts and conversions -----

    fn compile_cast(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        ty: &TypeRef,
        inner: &Expr,
    ) -> Result<JType> {
        let target = self.resolve_type(&cls.type_params, Some(&cls.name.clone()), ty)?;
        let source = self.compile_expr_expecting(cls, ctx, inner, Some(&target))?;
        match (&source, &target) {
            (JType::Primitive(_), JType::Primitive(_)) => {
                self.convert_primitive(ctx, &source, &target)?;
            }
            // boxing cast: (Integer) 5
            (JType::Primitive(kind), JType::Reference(_)) => {
                self.box_primitive(cls, ctx, *kind)?;
            }
            // unboxing cast: (int) integerRef, with numeric follow-up;
            // non-wrapper sources get the checkcast-then-unbox treatment
            (JType::Reference(_), JType::Primitive(_)) => {
                self.coerce(cls, ctx, &source, &target, inner.span)?;
            }
            (_, JType::Reference(name)) => {
                if source != target {
                    ctx.code.checkcast(&mut cls.class_file.cp, name);
                }
            }
            (_, JType::Array { .. }) => {
                if source != target {
                    ctx.code.checkcast(&mut cls.class_file.cp, &target.descriptor());
                }
            }
            _ => {}
        }
        Ok(target)
    }

    /// Primitive conversion, widening or narrowing, possibly a two-step
    /// sequence (`d2i` then `i2b`). Boolean converts to nothing.
    pub fn convert_primitive(
        &mut self,
        ctx: &mut MethodContext,
        from: &JType,
        to: &JType,
    ) -> Result<()> {
        use PrimitiveKind::*;
        let (JType::Primitive(f), JType::Primitive(t)) = (from, to) else {
            return Ok(());
        };
        if f == t || *f == Boolean || *t == Boolean {
            return Ok(());
        }
        // computational bases: int-like collapse to int
        let base = |k: PrimitiveKind| match k {
            Long => Long,
            Float => Float,
            Double => Double,
            _ => Int,
        };
        match (base(*f), base(*t)) {
            (Int, Long) => ctx.code.emit(op::I2L),
            (Int, Float) => ctx.code.emit(op::I2F),
            (Int, Double) => ctx.code.emit(op::I2D),
            (Long, Int) => ctx.code.emit(op::L2I),
            (Long, Float) => ctx.code.emit(op::L2F),
            (Long, Double) => ctx.code.emit(op::L2D),
            (Float, Int) => ctx.code.emit(op::F2I),
            (Float, Long) => ctx.code.emit(op::F2L),
            (Float, Double) => ctx.code.emit(op::F2D),
            (Double, Int) => ctx.code.emit(op::D2I),
            (Double, Long) => ctx.code.emit(op::D2L),
            (Double, Float) => ctx.code.emit(op::D2F),
            _ => {}
        }
        // final narrowing within the int category
        match t {
            Byte if base(*f) != Int || matches!(f, Int | Short | Char) => {
                ctx.code.emit(op::I2B)
            }
            Char if base(*f) != Int || matches!(f, Int | Short | Byte) => {
                ctx.code.emit(op::I2C)
            }
            Short if base(*f) != Int || matches!(f, Int | Char) => ctx.code.emit(op::I2S),
            _ => {}
        }
        Ok(())
    }

    pub fn box_primitive(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        kind: PrimitiveKind,
    ) -> Result<JType> {
        let wrapper = kind.wrapper_class();
        let descriptor = format!("({})L{};", kind.descriptor_char(), wrapper);
        ctx.code.invoke(&mut cls.class_file.cp, op::INVOKESTATIC, wrapper, "valueOf", &descriptor)?;
        Ok(JType::reference(wrapper))
    }

    /// If the type on top of the stack is a wrapper, unbox it.
    pub fn unbox_if_wrapper(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        ty: JType,
    ) -> Result<JType> {
        let JType::Reference(name) = &ty else {
            return Ok(ty);
        };
        let Some(kind) = PrimitiveKind::from_wrapper(name) else {
            return Ok(ty);
        };
        let descriptor = format!("(){}", kind.descriptor_char());
        ctx.code.invoke(
            &mut cls.class_file.cp,
            op::INVOKEVIRTUAL,
            name,
            kind.unbox_method(),
            &descriptor,
        )?;
        Ok(JType::Primitive(kind))
    }

    /// Adapt the value on top of the stack from `from` to `to`: widening,
    /// boxing, unboxing, and the erasure `checkcast` for reference
    /// downcasts.
    pub fn coerce(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        from: &JType,
        to: &JType,
        span: Span,
    ) -> Result<()> {
        if from == to || *to == JType::Void {
            return Ok(());
        }
        match (from, to) {
            (JType::Primitive(_), JType::Primitive(_)) => self.convert_primitive(ctx, from, to),
            (JType::Primitive(kind), JType::Reference(_)) => {
                // widen to the wrapper's primitive first when needed
                let target_kind = match to {
                    JType::Reference(name) => PrimitiveKind::from_wrapper(name),
                    _ => None,
                };
                match target_kind {
                    Some(target) if target != *kind => {
                        self.convert_primitive(ctx, from, &JType::Primitive(target))?;
                        self.box_primitive(cls, ctx, target)?;
                    }
                    Some(target) => {
                        self.box_primitive(cls, ctx, target)?;
                    }
                    // boxing to Object or a supertype: box as the natural
                    // wrapper
                    None => {
                        self.box_primitive(cls, ctx, *kind)?;
                    }
                }
                Ok(())
            }
            (JType::Reference(from_name), JType::Primitive(kind)) => {
                let wrapper = match PrimitiveKind::from_wrapper(from_name) {
                    Some(_) => from_name.clone(),
                    None => {
                        // an erased generic value: cast down to the target's
                        // wrapper before unboxing
                        let wrapper = kind.wrapper_class().to_string();
                        ctx.code.checkcast(&mut cls.class_file.cp, &wrapper);
                        wrapper
                    }
                };
                let unboxed = self.unbox_if_wrapper(cls, ctx, JType::Reference(wrapper))?;
                if unboxed.is_reference() {
                    return Err(Error::type_error(
                        span,
                        format!("cannot convert {} to {}", from, to),
                    ));
                }
                self.convert_primitive(ctx, &unboxed, to)
            }
            (JType::Null, _) => Ok(()),
            (JType::Reference(from_name), JType::Reference(to_name)) => {
                if to_name != "java/lang/Object"
                    && !resolve::is_subtype_of(self.classpath, from_name, to_name)
                {
                    // erased generic returns land here
                    ctx.code.checkcast(&mut cls.class_file.cp, to_name);
                }
                Ok(())
            }
            (JType::Reference(_), JType::Array { .. }) => {
                ctx.code.checkcast(&mut cls.class_file.cp, &to.descriptor());
                Ok(())
            }
            _ => Ok(()),
        }
    }

    // ----- conditions -----

    /// Compile `expr` as a branch: jump to `target` when the value matches
    /// `jump_if_true`, fall through otherwise.
    pub fn compile_condition(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        expr: &Expr,
        target: super::code::Label,
        jump_if_true: bool,
    ) -> Result<()> {
        match &expr.kind {
            ExprKind::Literal(Literal::Bool(value)) => {
                if *value == jump_if_true {
                    ctx.code.goto(target);
                }
                Ok(())
            }
            ExprKind::Unary { op: UnaryOp::Not, operand, prefix: true } => {
                self.compile_condition(cls, ctx, operand, target, !jump_if_true)
            }
            ExprKind::Binary { op: BinaryOp::AndAnd, left, right } => {
                if jump_if_true {
                    let fall = ctx.code.new_label();
                    self.compile_condition(cls, ctx, left, fall, false)?;
                    self.compile_condition(cls, ctx, right, target, true)?;
                    ctx.code.mark(fall);
                } else {
                    self.compile_condition(cls, ctx, left, target, false)?;
                    self.compile_condition(cls, ctx, right, target, false)?;
                }
                Ok(())
            }
            ExprKind::Binary { op: BinaryOp::OrOr, left, right } => {
                if jump_if_true {
                    self.compile_condition(cls, ctx, left, target, true)?;
                    self.compile_condition(cls, ctx, right, target, true)?;
                } else {
                    let fall = ctx.code.new_label();
                    self.compile_condition(cls, ctx, left, fall, true)?;
                    self.compile_condition(cls, ctx, right, target, false)?;
                    ctx.code.mark(fall);
                }
                Ok(())
            }
            ExprKind::Binary { op: op_kind, left, right } if op_kind.is_comparison() => {
                self.compile_comparison(cls, ctx, *op_kind, left, right, target, jump_if_true)
            }
            _ => {
                let ty = self.compile_expr(cls, ctx, expr)?;
                self.unbox_if_wrapper(cls, ctx, ty)?;
                ctx.code.branch(if jump_if_true { op::IFNE } else { op::IFEQ }, target);
                Ok(())
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn compile_comparison(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        op_kind: BinaryOp,
        left: &Expr,
        right: &Expr,
        target: super::code::Label,
        jump_if_true: bool,
    ) -> Result<()> {
        let is_null = |e: &Expr| matches!(e.kind, ExprKind::Literal(Literal::Null));

        // `x == null` / `x != null` use the dedicated null branches
        if matches!(op_kind, BinaryOp::Eq | BinaryOp::Ne) && (is_null(left) || is_null(right)) {
            let value = if is_null(left) { right } else { left };
            self.compile_expr(cls, ctx, value)?;
            let eq = op_kind == BinaryOp::Eq;
            let opcode = match (eq, jump_if_true) {
                (true, true) | (false, false) => op::IFNULL,
                _ => op::IFNONNULL,
            };
            ctx.code.branch(opcode, target);
            return Ok(());
        }

        let left_est = unboxed_estimate(&self.estimate_type(cls, ctx, left));
        let right_est = unboxed_estimate(&self.estimate_type(cls, ctx, right));

        // reference identity
        if left_est.is_reference() && right_est.is_reference() {
            if !matches!(op_kind, BinaryOp::Eq | BinaryOp::Ne) {
                return Err(Error::type_error(
                    left.span,
                    "ordering comparison on reference types",
                ));
            }
            self.compile_expr(cls, ctx, left)?;
            self.compile_expr(cls, ctx, right)?;
            let eq = op_kind == BinaryOp::Eq;
            let opcode = match (eq, jump_if_true) {
                (true, true) | (false, false) => op::IF_ACMPEQ,
                _ => op::IF_ACMPNE,
            };
            ctx.code.branch(opcode, target);
            return Ok(());
        }

        let promoted = binary_numeric_promotion(&left_est, &right_est);
        let lt = self.compile_expr(cls, ctx, left)?;
        let lt = self.unbox_if_wrapper(cls, ctx, lt)?;
        self.convert_primitive(ctx, &lt, &promoted)?;
        let rt = self.compile_expr(cls, ctx, right)?;
        let rt = self.unbox_if_wrapper(cls, ctx, rt)?;
        self.convert_primitive(ctx, &rt, &promoted)?;

        // comparisons jump on the (possibly inverted) relation
        let relation = if jump_if_true { op_kind } else { invert(op_kind) };
        match promoted {
            JType::Primitive(PrimitiveKind::Long) => {
                ctx.code.emit(op::LCMP);
                ctx.code.branch(zero_branch(relation), target);
            }
            JType::Primitive(PrimitiveKind::Float) => {
                ctx.code.emit(op::FCMPG);
                ctx.code.branch(zero_branch(relation), target);
            }
            JType::Primitive(PrimitiveKind::Double) => {
                ctx.code.emit(op::DCMPG);
                ctx.code.branch(zero_branch(relation), target);
            }
            _ => {
                let opcode = match relation {
                    BinaryOp::Eq => op::IF_ICMPEQ,
                    BinaryOp::Ne => op::IF_ICMPNE,
                    BinaryOp::Lt => op::IF_ICMPLT,
                    BinaryOp::Ge => op::IF_ICMPGE,
                    BinaryOp::Gt => op::IF_ICMPGT,
                    _ => op::IF_ICMPLE,
                };
                ctx.code.branch(opcode, target);
            }
        }
        Ok(())
    }

    // ----- type estimation -----

    /// Estimate an expression's type without emitting code; used for
    /// overload resolution and operand promotion before compilation.
    pub fn estimate_type(&mut self, cls: &mut ClassCtx, ctx: &MethodContext, expr: &Expr) -> JType {
        match &expr.kind {
            ExprKind::Literal(Literal::Int(_)) => JType::int(),
            ExprKind::Literal(Literal::Long(_)) => JType::long(),
            ExprKind::Literal(Literal::Float(_)) => JType::float(),
            ExprKind::Literal(Literal::Double(_)) => JType::double(),
            ExprKind::Literal(Literal::Bool(_)) => JType::boolean(),
            ExprKind::Literal(Literal::Char(_)) => JType::char(),
            ExprKind::Literal(Literal::Str(_)) => JType::string(),
            ExprKind::Literal(Literal::Null) => JType::Null,
            ExprKind::Name(name) => {
                if let Some(var) = ctx.lookup(name) {
                    return var.ty.clone();
                }
                if let Some(field) = self.field_in_scope(cls, name) {
                    return field.ty;
                }
                JType::object()
            }
            ExprKind::This => JType::reference(cls.name.clone()),
            ExprKind::Super => JType::reference(cls.super_name.clone()),
            ExprKind::FieldAccess { target, name } => {
                if let Some(class_name) = self.class_target(cls, ctx, target) {
                    if let Some(field) =
                        resolve::find_field(self.classpath, &class_name, name)
                    {
                        return field.ty;
                    }
                    return JType::object();
                }
                let target_ty = self.estimate_type(cls, ctx, target);
                match &target_ty {
                    JType::Array { .. } if name == "length" => JType::int(),
                    JType::Reference(owner) => {
                        match resolve::find_field(self.classpath, owner, name) {
                            Some(field) => field.ty,
                            None => JType::object(),
                        }
                    }
                    _ => JType::object(),
                }
            }
            ExprKind::MethodCall { target, name, args } => {
                let owner = match target.as_deref() {
                    None => Some(cls.name.clone()),
                    Some(t) if matches!(t.kind, ExprKind::Super) => {
                        Some(cls.super_name.clone())
                    }
                    Some(t) => {
                        if let Some(class_name) = self.class_target(cls, ctx, t) {
                            Some(class_name)
                        } else {
                            match self.estimate_type(cls, ctx, t) {
                                JType::Reference(n) => Some(n),
                                JType::Array { .. } if name == "clone" => {
                                    return self.estimate_type(cls, ctx, t)
                                }
                                _ => None,
                            }
                        }
                    }
                };
                let Some(owner) = owner else {
                    return JType::object();
                };
                let ests: Vec<JType> =
                    args.iter().map(|a| self.estimate_type(cls, ctx, a)).collect();
                match resolve::resolve_method(
                    self.classpath,
                    &owner,
                    name,
                    &ests,
                    expr.span,
                ) {
                    Ok(m) => m.ret,
                    Err(_) => JType::object(),
                }
            }
            ExprKind::New { ty, .. } => self
                .resolve_type(&cls.type_params, Some(&cls.name.clone()), ty)
                .unwrap_or_else(|_| JType::object()),
            ExprKind::NewArray { elem, dims, .. } => {
                let base = self
                    .resolve_type(&cls.type_params, Some(&cls.name.clone()), elem)
                    .unwrap_or_else(|_| JType::object());
                let total = dims.len().max(1) as u8;
                match base {
                    JType::Array { elem, dims: inner } => {
                        JType::Array { elem, dims: inner + total }
                    }
                    other => JType::array(other, total),
                }
            }
            ExprKind::ArrayInit(_) => JType::object(),
            ExprKind::ArrayAccess { array, .. } => self
                .estimate_type(cls, ctx, array)
                .element()
                .unwrap_or_else(JType::object),
            ExprKind::Unary { op: UnaryOp::Not, .. } => JType::boolean(),
            ExprKind::Unary { op: UnaryOp::Neg | UnaryOp::Plus | UnaryOp::BitNot, operand, .. } => {
                unary_numeric_promotion(&unboxed_estimate(&self.estimate_type(cls, ctx, operand)))
            }
            ExprKind::Unary { operand, .. } => self.estimate_type(cls, ctx, operand),
            ExprKind::Binary { op: op_kind, left, right } => {
                if op_kind.is_comparison()
                    || matches!(op_kind, BinaryOp::AndAnd | BinaryOp::OrOr)
                {
                    return JType::boolean();
                }
                let lt = unboxed_estimate(&self.estimate_type(cls, ctx, left));
                let rt = unboxed_estimate(&self.estimate_type(cls, ctx, right));
                if *op_kind == BinaryOp::Add
                    && (self.estimate_type(cls, ctx, left) == JType::string()
                        || self.estimate_type(cls, ctx, right) == JType::string())
                {
                    return JType::string();
                }
                if matches!(op_kind, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr) {
                    return unary_numeric_promotion(&lt);
                }
                if lt == JType::boolean() && rt == JType::boolean() {
                    return JType::boolean();
                }
                binary_numeric_promotion(&lt, &rt)
            }
            ExprKind::Assign { target, .. } => self.estimate_type(cls, ctx, target),
            ExprKind::Ternary { then_expr, else_expr, .. } => {
                let t = self.estimate_type(cls, ctx, then_expr);
                if t == JType::Null {
                    self.estimate_type(cls, ctx, else_expr)
                } else {
                    t
                }
            }
            ExprKind::Cast { ty, .. } => self
                .resolve_type(&cls.type_params, Some(&cls.name.clone()), ty)
                .unwrap_or_else(|_| JType::object()),
            ExprKind::InstanceOf { .. } => JType::boolean(),
            ExprKind::Lambda { .. } => JType::object(),
            ExprKind::ClassLiteral { .. } => JType::reference("java/lang/Class"),
        }
    }
}

/// The class itself, then each enclosing class from innermost outwards.
fn enclosing_chain(name: &str) -> impl Iterator<Item = String> + '_ {
    let mut current = Some(name.to_string());
    std::iter::from_fn(move || {
        let this = current.take()?;
        current = this.rfind('$').map(|pos| this[..pos].to_string());
        Some(this)
    })
}

/// Invert a comparison operator (for jump-if-false polarity).
fn invert(op_kind: BinaryOp) -> BinaryOp {
    match op_kind {
        BinaryOp::Eq => BinaryOp::Ne,
        BinaryOp::Ne => BinaryOp::Eq,
        BinaryOp::Lt => BinaryOp::Ge,
        BinaryOp::Ge => BinaryOp::Lt,
        BinaryOp::Gt => BinaryOp::Le,
        BinaryOp::Le => BinaryOp::Gt,
        other => other,
    }
}

/// The `if<cond>` opcode testing a cmp result against zero.
fn zero_branch(relation: BinaryOp) -> u8 {
    match relation {
        BinaryOp::Eq => op::IFEQ,
        BinaryOp::Ne => op::IFNE,
        BinaryOp::Lt => op::IFLT,
        BinaryOp::Ge => op::IFGE,
        BinaryOp::Gt => op::IFGT,
        _ => op::IFLE,
    }
}

/// The primitive a wrapper estimate would unbox to, for promotion decisions.
fn unboxed_estimate(ty: &JType) -> JType {
    if let JType::Reference(name) = ty {
        if let Some(kind) = PrimitiveKind::from_wrapper(name) {
            return JType::Primitive(kind);
        }
    }
    ty.clone()
}
