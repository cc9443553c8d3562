//! Statement compilation.
//!
//! Statements leave nothing on the operand stack. Loops and switches push
//! break/continue frames on the method context; `finally` blocks are
//! inlined along every exit path (normal completion, `return`, `break`,
//! `continue`, and a catch-all rethrow handler), never compiled as
//! subroutines.

use super::class::flags;
use super::code::Label;
use super::gen::{ClassCtx, Gen};
use super::method_context::MethodContext;
use super::opcodes as op;
use super::resolve;
use super::types::{JType, PrimitiveKind};
use crate::ast::*;
use crate::common::{Error, Result};
use crate::parser::span::Span;

impl<'a> Gen<'a> {
    pub fn compile_block(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        block: &Block,
    ) -> Result<()> {
        ctx.enter_scope();
        let result = block
            .statements
            .iter()
            .try_for_each(|stmt| self.compile_stmt(cls, ctx, stmt));
        ctx.exit_scope();
        result
    }

    pub fn compile_stmt(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        stmt: &Stmt,
    ) -> Result<()> {
        match &stmt.kind {
            StmtKind::Empty => Ok(()),
            StmtKind::Block(block) => self.compile_block(cls, ctx, block),
            StmtKind::LocalVar { ty, declarators, .. } => {
                self.compile_local_var(cls, ctx, ty, declarators)
            }
            StmtKind::Expr(expr) => self.compile_expr_stmt(cls, ctx, expr),
            StmtKind::If { cond, then_branch, else_branch } => {
                let else_label = ctx.code.new_label();
                self.compile_condition(cls, ctx, cond, else_label, false)?;
                self.compile_stmt(cls, ctx, then_branch)?;
                match else_branch {
                    Some(else_stmt) => {
                        let end = ctx.code.new_label();
                        ctx.code.goto(end);
                        ctx.code.mark(else_label);
                        self.compile_stmt(cls, ctx, else_stmt)?;
                        ctx.code.mark(end);
                    }
                    None => ctx.code.mark(else_label),
                }
                Ok(())
            }
            StmtKind::While { cond, body } => self.compile_while(cls, ctx, cond, body, None),
            StmtKind::DoWhile { body, cond } => self.compile_do_while(cls, ctx, body, cond, None),
            StmtKind::For { init, cond, update, body } => {
                self.compile_for(cls, ctx, init, cond.as_ref(), update, body, None)
            }
            StmtKind::ForEach { ty, name, iterable, body } => {
                self.compile_for_each(cls, ctx, ty, name, iterable, body, None)
            }
            StmtKind::Switch { selector, cases } => {
                self.compile_switch(cls, ctx, selector, cases, None, stmt.span)
            }
            StmtKind::Break { label } => self.compile_break(cls, ctx, label.as_deref(), stmt.span),
            StmtKind::Continue { label } => {
                self.compile_continue(cls, ctx, label.as_deref(), stmt.span)
            }
            StmtKind::Return { value } => {
                self.compile_return(cls, ctx, value.as_ref(), stmt.span)
            }
            StmtKind::Throw { value } => {
                let ty = self.compile_expr(cls, ctx, value)?;
                if !ty.is_reference() {
                    return Err(Error::type_error(stmt.span, "throw needs a reference value"));
                }
                ctx.code.emit(op::ATHROW);
                Ok(())
            }
            StmtKind::Try { body, catches, finally } => {
                self.compile_try(cls, ctx, body, catches, finally.as_ref(), stmt.span)
            }
            StmtKind::Labeled { label, body } => {
                self.compile_labeled(cls, ctx, label, body)
            }
            StmtKind::ExplicitCtorCall { .. } => Err(Error::type_error(
                stmt.span,
                "constructor call is only allowed as the first statement of a constructor",
            )),
        }
    }

    /// Expression in statement position: assignments and increments skip
    /// materializing their value, everything else pops what it produced.
    fn compile_expr_stmt(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        expr: &Expr,
    ) -> Result<()> {
        match &expr.kind {
            ExprKind::Assign { target, op: compound, value } => {
                self.compile_assign(cls, ctx, target, *compound, value, false, expr.span)?;
                Ok(())
            }
            ExprKind::Unary { op: op_kind @ (UnaryOp::Inc | UnaryOp::Dec), operand, prefix } => {
                self.compile_unary(cls, ctx, *op_kind, operand, *prefix, false, expr.span)?;
                Ok(())
            }
            _ => {
                let ty = self.compile_expr(cls, ctx, expr)?;
                match ty.slots() {
                    0 => {}
                    2 => ctx.code.emit(op::POP2),
                    _ => ctx.code.emit(op::POP),
                }
                Ok(())
            }
        }
    }

    fn compile_local_var(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        ty: &TypeRef,
        declarators: &[VarDeclarator],
    ) -> Result<()> {
        let base_ty = self.resolve_type(&cls.type_params, Some(&cls.name.clone()), ty)?;
        for declarator in declarators {
            let var_ty = add_dims(&base_ty, declarator.extra_dims);
            let var = ctx.declare(&declarator.name, var_ty.clone());
            if let Some(init) = &declarator.init {
                if let TypeRef::Named { type_args, .. } = ty {
                    self.stash_lambda_type_args(cls, type_args, init);
                }
                let value_ty = match &init.kind {
                    ExprKind::ArrayInit(elements) => {
                        self.compile_array_literal(cls, ctx, &var_ty, elements, init.span)?;
                        var_ty.clone()
                    }
                    _ => self.compile_expr_expecting(cls, ctx, init, Some(&var_ty))?,
                };
                self.coerce(cls, ctx, &value_ty, &var_ty, init.span)?;
                ctx.code.store(&var.ty, var.slot);
            }
        }
        Ok(())
    }

    /// Record resolved type arguments of a declared functional-interface
    /// type, so a lambda initializer can specialize its instantiated
    /// method type.
    fn stash_lambda_type_args(&mut self, cls: &mut ClassCtx, type_args: &[TypeArg], init: &Expr) {
        if !matches!(init.kind, ExprKind::Lambda { .. }) || type_args.is_empty() {
            return;
        }
        let resolved: Vec<JType> = type_args
            .iter()
            .filter_map(|arg| match arg {
                TypeArg::Type(t) => {
                    self.resolve_type(&cls.type_params, Some(&cls.name.clone()), t).ok()
                }
                TypeArg::Wildcard { .. } => Some(JType::object()),
            })
            .collect();
        self.lambda_type_args = Some(resolved);
    }

    // ----- loops -----

    fn compile_while(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        cond: &Expr,
        body: &Stmt,
        label: Option<String>,
    ) -> Result<()> {
        let loop_start = ctx.code.new_label();
        let end = ctx.code.new_label();
        ctx.code.mark(loop_start);
        self.compile_condition(cls, ctx, cond, end, false)?;
        ctx.push_loop(end, loop_start, label);
        self.compile_stmt(cls, ctx, body)?;
        ctx.pop_target();
        ctx.code.goto(loop_start);
        ctx.code.mark(end);
        Ok(())
    }

    fn compile_do_while(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        body: &Stmt,
        cond: &Expr,
        label: Option<String>,
    ) -> Result<()> {
        let loop_start = ctx.code.new_label();
        let cond_label = ctx.code.new_label();
        let end = ctx.code.new_label();
        ctx.code.mark(loop_start);
        ctx.push_loop(end, cond_label, label);
        self.compile_stmt(cls, ctx, body)?;
        ctx.pop_target();
        ctx.code.mark(cond_label);
        self.compile_condition(cls, ctx, cond, loop_start, true)?;
        ctx.code.mark(end);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn compile_for(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        init: &ForInit,
        cond: Option<&Expr>,
        update: &[Expr],
        body: &Stmt,
        label: Option<String>,
    ) -> Result<()> {
        ctx.enter_scope();
        match init {
            ForInit::None => {}
            ForInit::Decl { ty, declarators, .. } => {
                self.compile_local_var(cls, ctx, ty, declarators)?;
            }
            ForInit::Exprs(exprs) => {
                for expr in exprs {
                    self.compile_expr_stmt(cls, ctx, expr)?;
                }
            }
        }
        let loop_start = ctx.code.new_label();
        let update_label = ctx.code.new_label();
        let end = ctx.code.new_label();
        ctx.code.mark(loop_start);
        if let Some(cond) = cond {
            self.compile_condition(cls, ctx, cond, end, false)?;
        }
        ctx.push_loop(end, update_label, label);
        self.compile_stmt(cls, ctx, body)?;
        ctx.pop_target();
        ctx.code.mark(update_label);
        for expr in update {
            self.compile_expr_stmt(cls, ctx, expr)?;
        }
        ctx.code.goto(loop_start);
        ctx.code.mark(end);
        ctx.exit_scope();
        Ok(())
    }

    /// Enhanced for: arrays desugar to an indexed loop, everything else to
    /// the iterator protocol.
    #[allow(clippy::too_many_arguments)]
    fn compile_for_each(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        ty: &TypeRef,
        name: &str,
        iterable: &Expr,
        body: &Stmt,
        label: Option<String>,
    ) -> Result<()> {
        ctx.enter_scope();
        let var_ty = self.resolve_type(&cls.type_params, Some(&cls.name.clone()), ty)?;
        let iterable_ty = self.compile_expr(cls, ctx, iterable)?;

        let loop_start = ctx.code.new_label();
        let update_label = ctx.code.new_label();
        let end = ctx.code.new_label();

        if let Some(elem) = iterable_ty.element() {
            // T[] arr = <expr>; for (int i = 0; i < arr.length; i++) ...
            let arr_slot = ctx.declare_temp(&iterable_ty);
            ctx.code.store(&iterable_ty, arr_slot);
            ctx.code.load(&iterable_ty, arr_slot);
            ctx.code.emit(op::ARRAYLENGTH);
            let len_slot = ctx.declare_temp(&JType::int());
            ctx.code.store(&JType::int(), len_slot);
            ctx.code.push_int(&mut cls.class_file.cp, 0);
            let idx_slot = ctx.declare_temp(&JType::int());
            ctx.code.store(&JType::int(), idx_slot);

            ctx.code.mark(loop_start);
            ctx.code.load(&JType::int(), idx_slot);
            ctx.code.load(&JType::int(), len_slot);
            ctx.code.branch(op::IF_ICMPGE, end);

            let var = ctx.declare(name, var_ty.clone());
            ctx.code.load(&iterable_ty, arr_slot);
            ctx.code.load(&JType::int(), idx_slot);
            self.emit_array_load(cls, ctx, &elem);
            self.coerce(cls, ctx, &elem, &var_ty, iterable.span)?;
            ctx.code.store(&var.ty, var.slot);

            ctx.push_loop(end, update_label, label);
            self.compile_stmt(cls, ctx, body)?;
            ctx.pop_target();

            ctx.code.mark(update_label);
            ctx.code.iinc(idx_slot, 1);
            ctx.code.goto(loop_start);
            ctx.code.mark(end);
        } else {
            // Iterator<T> it = <expr>.iterator(); while (it.hasNext()) ...
            let JType::Reference(owner) = &iterable_ty else {
                return Err(Error::type_error(
                    iterable.span,
                    format!("cannot iterate over {}", iterable_ty),
                ));
            };
            let iterator_method =
                resolve::resolve_method(self.classpath, owner, "iterator", &[], iterable.span)?;
            self.emit_invoke(cls, ctx, &iterator_method, false)?;
            let it_ty = JType::reference("java/util/Iterator");
            let it_slot = ctx.declare_temp(&it_ty);
            ctx.code.store(&it_ty, it_slot);

            ctx.code.mark(loop_start);
            ctx.code.load(&it_ty, it_slot);
            ctx.code.invoke(
                &mut cls.class_file.cp,
                op::INVOKEINTERFACE,
                "java/util/Iterator",
                "hasNext",
                "()Z",
            )?;
            ctx.code.branch(op::IFEQ, end);

            let var = ctx.declare(name, var_ty.clone());
            ctx.code.load(&it_ty, it_slot);
            ctx.code.invoke(
                &mut cls.class_file.cp,
                op::INVOKEINTERFACE,
                "java/util/Iterator",
                "next",
                "()Ljava/lang/Object;",
            )?;
            self.coerce(cls, ctx, &JType::object(), &var_ty, iterable.span)?;
            ctx.code.store(&var.ty, var.slot);

            ctx.push_loop(end, update_label, label);
            self.compile_stmt(cls, ctx, body)?;
            ctx.pop_target();

            ctx.code.mark(update_label);
            ctx.code.goto(loop_start);
            ctx.code.mark(end);
        }
        ctx.exit_scope();
        Ok(())
    }

    fn compile_labeled(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        label: &str,
        body: &Stmt,
    ) -> Result<()> {
        let name = Some(label.to_string());
        match &body.kind {
            StmtKind::While { cond, body } => self.compile_while(cls, ctx, cond, body, name),
            StmtKind::DoWhile { body, cond } => self.compile_do_while(cls, ctx, body, cond, name),
            StmtKind::For { init, cond, update, body } => {
                self.compile_for(cls, ctx, init, cond.as_ref(), update, body, name)
            }
            StmtKind::ForEach { ty, name: var, iterable, body } => {
                self.compile_for_each(cls, ctx, ty, var, iterable, body, name)
            }
            StmtKind::Switch { selector, cases } => {
                self.compile_switch(cls, ctx, selector, cases, name, body.span)
            }
            _ => {
                // a non-loop labeled statement supports break only
                let end = ctx.code.new_label();
                ctx.push_switch(end, name);
                self.compile_stmt(cls, ctx, body)?;
                ctx.pop_target();
                ctx.code.mark(end);
                Ok(())
            }
        }
    }

    // ----- break / continue / return, with finally inlining -----

    /// Inline the finally blocks above `depth`, innermost first. Each block
    /// compiles with the stack truncated below itself so its own exits do
    /// not re-run it.
    fn inline_finallies(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        depth: usize,
    ) -> Result<()> {
        let blocks = ctx.finally_stack.clone();
        for index in (depth..blocks.len()).rev() {
            ctx.finally_stack.truncate(index);
            self.compile_block(cls, ctx, &blocks[index])?;
        }
        ctx.finally_stack = blocks;
        Ok(())
    }

    fn compile_break(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        label: Option<&str>,
        span: Span,
    ) -> Result<()> {
        let frame = ctx.break_target(label, span)?;
        let (target, depth) = (frame.break_label, frame.finally_depth);
        self.inline_finallies(cls, ctx, depth)?;
        ctx.code.goto(target);
        Ok(())
    }

    fn compile_continue(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        label: Option<&str>,
        span: Span,
    ) -> Result<()> {
        let frame = ctx.continue_target(label, span)?;
        let target = frame.continue_label.expect("checked by continue_target");
        let depth = frame.finally_depth;
        self.inline_finallies(cls, ctx, depth)?;
        ctx.code.goto(target);
        Ok(())
    }

    fn compile_return(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        value: Option<&Expr>,
        span: Span,
    ) -> Result<()> {
        let return_type = ctx.return_type.clone();
        match value {
            None => {
                if return_type != JType::Void {
                    return Err(Error::type_error(span, "missing return value"));
                }
                self.inline_finallies(cls, ctx, 0)?;
                ctx.code.ret(&JType::Void);
            }
            Some(expr) => {
                if return_type == JType::Void {
                    return Err(Error::type_error(span, "void method returns a value"));
                }
                let ty = self.compile_expr_expecting(cls, ctx, expr, Some(&return_type))?;
                self.coerce(cls, ctx, &ty, &return_type, expr.span)?;
                if ctx.finally_stack.is_empty() {
                    ctx.code.ret(&return_type);
                } else {
                    // park the value while the finally blocks run
                    let slot = ctx.declare_temp(&return_type);
                    ctx.code.store(&return_type, slot);
                    self.inline_finallies(cls, ctx, 0)?;
                    ctx.code.load(&return_type, slot);
                    ctx.code.ret(&return_type);
                }
            }
        }
        Ok(())
    }

    // ----- try / catch / finally -----

    fn compile_try(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        body: &Block,
        catches: &[CatchClause],
        finally: Option<&Block>,
        span: Span,
    ) -> Result<()> {
        let try_start = ctx.code.new_label();
        let try_end = ctx.code.new_label();
        let end = ctx.code.new_label();

        if let Some(finally_block) = finally {
            ctx.finally_stack.push(finally_block.clone());
        }

        ctx.code.mark(try_start);
        self.compile_block(cls, ctx, body)?;
        ctx.code.mark(try_end);
        if let Some(finally_block) = finally {
            // normal completion runs the finally outside the protected
            // region
            ctx.finally_stack.pop();
            self.compile_block(cls, ctx, finally_block)?;
            ctx.finally_stack.push(finally_block.clone());
        }
        ctx.code.goto(end);

        let mut catch_regions: Vec<(Label, Label)> = Vec::new();
        for catch in catches {
            let handler = ctx.code.new_label();
            let catch_end = ctx.code.new_label();
            ctx.code.mark(handler);
            ctx.code.enter_handler();

            let exc_ty = self.resolve_type(&cls.type_params, Some(&cls.name.clone()), &catch.ty)?;
            let JType::Reference(exc_name) = &exc_ty else {
                return Err(Error::type_error(catch.ty.span(), "invalid catch type"));
            };
            let catch_type_idx = cls.class_file.cp.add_class(exc_name);
            ctx.code.add_exception_handler(try_start, try_end, handler, catch_type_idx);

            ctx.enter_scope();
            let var = ctx.declare(&catch.name, exc_ty.clone());
            ctx.code.store(&var.ty, var.slot);
            self.compile_block(cls, ctx, &catch.body)?;
            ctx.exit_scope();
            ctx.code.mark(catch_end);
            catch_regions.push((handler, catch_end));

            if let Some(finally_block) = finally {
                ctx.finally_stack.pop();
                self.compile_block(cls, ctx, finally_block)?;
                ctx.finally_stack.push(finally_block.clone());
            }
            ctx.code.goto(end);
        }

        if let Some(finally_block) = finally {
            ctx.finally_stack.pop();

            // catch-all handler: run the finally, rethrow
            let handler = ctx.code.new_label();
            ctx.code.mark(handler);
            ctx.code.enter_handler();
            let throwable = JType::reference("java/lang/Throwable");
            let slot = ctx.declare_temp(&throwable);
            ctx.code.store(&throwable, slot);
            self.compile_block(cls, ctx, finally_block)?;
            ctx.code.load(&throwable, slot);
            ctx.code.emit(op::ATHROW);

            ctx.code.add_exception_handler(try_start, try_end, handler, 0);
            for (catch_start, catch_end) in &catch_regions {
                ctx.code.add_exception_handler(*catch_start, *catch_end, handler, 0);
            }
        } else if catches.is_empty() {
            return Err(Error::type_error(span, "try without catch or finally"));
        }

        ctx.code.mark(end);
        Ok(())
    }

    // ----- switch -----

    fn compile_switch(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        selector: &Expr,
        cases: &[SwitchCase],
        label: Option<String>,
        span: Span,
    ) -> Result<()> {
        let selector_est = self.estimate_type(cls, ctx, selector);

        if selector_est == JType::string() {
            return self.compile_string_switch(cls, ctx, selector, cases, label, span);
        }
        if let JType::Reference(name) = &selector_est {
            if self.is_enum_class(name) {
                let enum_name = name.clone();
                return self.compile_enum_switch(cls, ctx, &enum_name, selector, cases, label, span);
            }
        }

        let ty = self.compile_expr(cls, ctx, selector)?;
        let ty = self.unbox_if_wrapper(cls, ctx, ty)?;
        if !ty.is_int_like() {
            return Err(Error::type_error(
                span,
                format!("cannot switch on {}", ty),
            ));
        }

        let mut keyed: Vec<(i32, usize)> = Vec::new();
        let mut default_case = None;
        for (index, case) in cases.iter().enumerate() {
            for case_label in &case.labels {
                match case_label {
                    None => default_case = Some(index),
                    Some(expr) => {
                        let value = const_int_value(expr).ok_or_else(|| {
                            Error::type_error(
                                expr.span,
                                "case label must be a constant integer expression",
                            )
                        })?;
                        keyed.push((value, index));
                    }
                }
            }
        }

        self.emit_int_switch(cls, ctx, &keyed, default_case, cases, label)
    }

    /// Dispatch an integer selector already on the stack, then compile the
    /// case bodies with fall-through.
    fn emit_int_switch(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        keyed: &[(i32, usize)],
        default_case: Option<usize>,
        cases: &[SwitchCase],
        label: Option<String>,
    ) -> Result<()> {
        let depth = ctx.code.stack_depth().saturating_sub(1);
        let end = ctx.code.new_label();
        let case_labels: Vec<Label> = cases.iter().map(|_| ctx.code.new_label()).collect();
        let default_label = default_case.map_or(end, |i| case_labels[i]);

        let mut pairs: Vec<(i32, Label)> =
            keyed.iter().map(|&(value, index)| (value, case_labels[index])).collect();
        pairs.sort_by_key(|&(value, _)| value);

        if pairs.is_empty() {
            ctx.code.emit(op::POP);
            ctx.code.goto(default_label);
        } else {
            let lo = pairs[0].0;
            let hi = pairs[pairs.len() - 1].0;
            let range = hi as i64 - lo as i64 + 1;
            // tableswitch when at least half the range is populated
            if range <= 2 * pairs.len() as i64 {
                let mut targets = vec![default_label; range as usize];
                for &(value, target) in &pairs {
                    targets[(value - lo) as usize] = target;
                }
                ctx.code.tableswitch(default_label, lo, hi, &targets);
            } else {
                ctx.code.lookupswitch(default_label, &pairs);
            }
        }

        ctx.push_switch(end, label);
        for (index, case) in cases.iter().enumerate() {
            ctx.code.mark(case_labels[index]);
            ctx.code.set_stack_depth(depth);
            for stmt in &case.statements {
                self.compile_stmt(cls, ctx, stmt)?;
            }
        }
        ctx.pop_target();
        ctx.code.mark(end);
        ctx.code.set_stack_depth(depth);
        Ok(())
    }

    fn is_enum_class(&mut self, name: &str) -> bool {
        match self.classpath.find(name) {
            Some(cls) => {
                cls.access_flags & flags::ACC_ENUM != 0
                    || cls.super_class.as_deref() == Some("java/lang/Enum")
            }
            None => false,
        }
    }

    /// Enum switch: dispatch on `ordinal()`.
    #[allow(clippy::too_many_arguments)]
    fn compile_enum_switch(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        enum_name: &str,
        selector: &Expr,
        cases: &[SwitchCase],
        label: Option<String>,
        span: Span,
    ) -> Result<()> {
        // constant name -> ordinal, from field declaration order
        let enum_class = self
            .classpath
            .find(enum_name)
            .ok_or_else(|| Error::unresolved(span, "class", enum_name))?;
        let ordinals: Vec<String> = enum_class
            .fields
            .iter()
            .filter(|f| f.access_flags & flags::ACC_ENUM != 0)
            .map(|f| f.name.clone())
            .collect();

        self.compile_expr(cls, ctx, selector)?;
        ctx.code.invoke(
            &mut cls.class_file.cp,
            op::INVOKEVIRTUAL,
            enum_name,
            "ordinal",
            "()I",
        )?;

        let mut keyed: Vec<(i32, usize)> = Vec::new();
        let mut default_case = None;
        for (index, case) in cases.iter().enumerate() {
            for case_label in &case.labels {
                match case_label {
                    None => default_case = Some(index),
                    Some(expr) => {
                        let constant = match &expr.kind {
                            ExprKind::Name(n) => n.clone(),
                            ExprKind::FieldAccess { name, .. } => name.clone(),
                            _ => {
                                return Err(Error::type_error(
                                    expr.span,
                                    "enum case label must be a constant name",
                                ))
                            }
                        };
                        let ordinal = ordinals
                            .iter()
                            .position(|n| *n == constant)
                            .ok_or_else(|| {
                                Error::unresolved(expr.span, "field", constant.clone())
                            })?;
                        keyed.push((ordinal as i32, index));
                    }
                }
            }
        }
        self.emit_int_switch(cls, ctx, &keyed, default_case, cases, label)
    }

    /// String switch: dispatch on `hashCode()` with a `lookupswitch`, then
    /// confirm each bucket with `equals`.
    #[allow(clippy::too_many_arguments)]
    fn compile_string_switch(
        &mut self,
        cls: &mut ClassCtx,
        ctx: &mut MethodContext,
        selector: &Expr,
        cases: &[SwitchCase],
        label: Option<String>,
        span: Span,
    ) -> Result<()> {
        let string_ty = JType::string();
        let ty = self.compile_expr(cls, ctx, selector)?;
        self.coerce(cls, ctx, &ty, &string_ty, span)?;
        let temp = ctx.declare_temp(&string_ty);
        ctx.code.store(&string_ty, temp);

        let depth = ctx.code.stack_depth();
        let end = ctx.code.new_label();
        let case_labels: Vec<Label> = cases.iter().map(|_| ctx.code.new_label()).collect();

        // literal -> (hash, case index)
        let mut default_case = None;
        let mut literals: Vec<(String, i32, usize)> = Vec::new();
        for (index, case) in cases.iter().enumerate() {
            for case_label in &case.labels {
                match case_label {
                    None => default_case = Some(index),
                    Some(expr) => {
                        let ExprKind::Literal(Literal::Str(value)) = &expr.kind else {
                            return Err(Error::type_error(
                                expr.span,
                                "string case label must be a literal",
                            ));
                        };
                        literals.push((value.clone(), java_string_hash(value), index));
                    }
                }
            }
        }
        let default_label = default_case.map_or(end, |i| case_labels[i]);

        // buckets by hash, ascending for the lookupswitch
        let mut hashes: Vec<i32> = literals.iter().map(|(_, h, _)| *h).collect();
        hashes.sort_unstable();
        hashes.dedup();
        let bucket_labels: Vec<Label> = hashes.iter().map(|_| ctx.code.new_label()).collect();

        ctx.code.load(&string_ty, temp);
        ctx.code.invoke(
            &mut cls.class_file.cp,
            op::INVOKEVIRTUAL,
            "java/lang/String",
            "hashCode",
            "()I",
        )?;
        let pairs: Vec<(i32, Label)> =
            hashes.iter().zip(&bucket_labels).map(|(&h, &l)| (h, l)).collect();
        ctx.code.lookupswitch(default_label, &pairs);

        for (&hash, &bucket) in hashes.iter().zip(&bucket_labels) {
            ctx.code.mark(bucket);
            ctx.code.set_stack_depth(depth);
            for (value, _, index) in literals.iter().filter(|(_, h, _)| *h == hash) {
                ctx.code.load(&string_ty, temp);
                ctx.code.push_string(&mut cls.class_file.cp, value);
                ctx.code.invoke(
                    &mut cls.class_file.cp,
                    op::INVOKEVIRTUAL,
                    "java/lang/String",
                    "equals",
                    "(Ljava/lang/Object;)Z",
                )?;
                ctx.code.branch(op::IFNE, case_labels[*index]);
            }
            ctx.code.goto(default_label);
        }

        ctx.push_switch(end, label);
        for (index, case) in cases.iter().enumerate() {
            ctx.code.mark(case_labels[index]);
            ctx.code.set_stack_depth(depth);
            for stmt in &case.statements {
                self.compile_stmt(cls, ctx, stmt)?;
            }
        }
        ctx.pop_target();
        ctx.code.mark(end);
        ctx.code.set_stack_depth(depth);
        Ok(())
    }
}

fn add_dims(base: &JType, extra: u8) -> JType {
    if extra == 0 {
        return base.clone();
    }
    match base.clone() {
        JType::Array { elem, dims } => JType::Array { elem, dims: dims + extra },
        other => JType::array(other, extra),
    }
}

/// Constant integer value of a case-label expression.
fn const_int_value(expr: &Expr) -> Option<i32> {
    match &expr.kind {
        ExprKind::Literal(Literal::Int(v)) => Some(*v as i32),
        ExprKind::Literal(Literal::Char(v)) => Some(*v as i32),
        ExprKind::Unary { op: UnaryOp::Neg, operand, prefix: true } => {
            const_int_value(operand).map(i32::wrapping_neg)
        }
        _ => None,
    }
}

/// `String.hashCode` as the JVM computes it: `s[0]*31^(n-1) + ... + s[n-1]`
/// over UTF-16 code units.
fn java_string_hash(s: &str) -> i32 {
    let mut hash: i32 = 0;
    for unit in s.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(unit as i32);
    }
    hash
}
