//! Recursive-descent parser for the Java 8 subset the compiler accepts.
//!
//! The parser is a plain token-index machine over the lexer's output.
//! Disambiguation points that Java makes context-sensitive (casts vs
//! parenthesized expressions, local declarations vs expression statements,
//! lambdas) are handled by bounded backtracking: save the position, try the
//! more specific parse, restore on failure.

use super::lexer::{tokenize, SpannedToken, Token};
use super::span::Span;
use crate::ast::*;
use crate::common::{Error, Result};

pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    source_file: String,
}

/// Parse a whole source file into a compilation unit.
pub fn parse_java(source: &str, source_file: &str) -> Result<CompilationUnit> {
    let tokens = tokenize(source)?;
    Parser { tokens, pos: 0, source_file: source_file.to_string() }.compilation_unit()
}

impl Parser {
    // ----- token machinery -----

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_at(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|(t, _)| t)
    }

    fn cur_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, s)| *s)
            .unwrap_or_default()
    }

    fn prev_span(&self) -> Span {
        self.tokens.get(self.pos.wrapping_sub(1)).map(|(_, s)| *s).unwrap_or_default()
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn accept(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<Span> {
        if self.check(token) {
            let span = self.cur_span();
            self.pos += 1;
            Ok(span)
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        let found = match self.peek() {
            Some(t) => format!("{:?}", t),
            None => "end of file".to_string(),
        };
        Error::parse(self.cur_span(), format!("{}, found {}", message.into(), found))
    }

    fn ident(&mut self) -> Result<String> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error("expected identifier")),
        }
    }

    /// Consume one `>` of a type-argument list, splitting `>>`/`>>>` tokens
    /// in place so nested generic closes keep working.
    fn expect_type_close(&mut self) -> Result<()> {
        match self.peek() {
            Some(Token::Gt) => {
                self.pos += 1;
                Ok(())
            }
            Some(Token::Shr) => {
                self.tokens[self.pos].0 = Token::Gt;
                Ok(())
            }
            Some(Token::UShr) => {
                self.tokens[self.pos].0 = Token::Shr;
                Ok(())
            }
            _ => Err(self.error("expected `>`")),
        }
    }

    // ----- compilation unit -----

    fn compilation_unit(&mut self) -> Result<CompilationUnit> {
        let leading_annotations = self.annotations()?;

        let mut pending_annotations = Vec::new();
        let package = if self.check(&Token::Package) {
            let span = self.cur_span();
            self.pos += 1;
            let name = self.qualified_name()?;
            self.expect(&Token::Semi, "`;` after package declaration")?;
            Some(PackageDecl { name, annotations: leading_annotations, span })
        } else {
            // annotations before a type declaration, not a package
            pending_annotations = leading_annotations;
            None
        };

        let mut imports = Vec::new();
        while self.check(&Token::Import) {
            imports.push(self.import_decl()?);
        }

        let mut types = Vec::new();
        while self.peek().is_some() {
            if self.accept(&Token::Semi) {
                continue;
            }
            let mut decl = self.type_decl()?;
            if !pending_annotations.is_empty() {
                let annotations = match &mut decl {
                    TypeDecl::Class(c) => &mut c.annotations,
                    TypeDecl::Interface(i) => &mut i.annotations,
                    TypeDecl::Enum(e) => &mut e.annotations,
                };
                annotations.splice(0..0, pending_annotations.drain(..));
            }
            types.push(decl);
        }

        Ok(CompilationUnit { package, imports, types, source_file: self.source_file.clone() })
    }

    fn import_decl(&mut self) -> Result<ImportDecl> {
        let span = self.cur_span();
        self.expect(&Token::Import, "`import`")?;
        let is_static = self.accept(&Token::Static);
        let mut name = self.ident()?;
        let mut is_wildcard = false;
        while self.accept(&Token::Dot) {
            if self.accept(&Token::Star) {
                is_wildcard = true;
                break;
            }
            name.push('.');
            name.push_str(&self.ident()?);
        }
        self.expect(&Token::Semi, "`;` after import")?;
        Ok(ImportDecl { name, is_static, is_wildcard, span })
    }

    fn qualified_name(&mut self) -> Result<String> {
        let mut name = self.ident()?;
        while self.check(&Token::Dot) && matches!(self.peek_at(1), Some(Token::Ident(_))) {
            self.pos += 1;
            name.push('.');
            name.push_str(&self.ident()?);
        }
        Ok(name)
    }

    // ----- modifiers and annotations -----

    fn annotations(&mut self) -> Result<Vec<Annotation>> {
        let mut annotations = Vec::new();
        while self.check(&Token::At) {
            let span = self.cur_span();
            self.pos += 1;
            let name = self.qualified_name()?;
            let mut args = Vec::new();
            if self.accept(&Token::LParen) {
                if !self.check(&Token::RParen) {
                    loop {
                        // name=value or a bare value expression
                        let named = matches!(self.peek(), Some(Token::Ident(_)))
                            && self.peek_at(1) == Some(&Token::Assign);
                        if named {
                            let element = self.ident()?;
                            self.expect(&Token::Assign, "`=`")?;
                            let value = self.annotation_value()?;
                            args.push(AnnotationArg { name: Some(element), value });
                        } else {
                            let value = self.annotation_value()?;
                            args.push(AnnotationArg { name: None, value });
                        }
                        if !self.accept(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&Token::RParen, "`)` after annotation arguments")?;
            }
            annotations.push(Annotation { name, args, span });
        }
        Ok(annotations)
    }

    fn annotation_value(&mut self) -> Result<Expr> {
        if self.check(&Token::LBrace) {
            let span = self.cur_span();
            self.pos += 1;
            let mut values = Vec::new();
            while !self.check(&Token::RBrace) {
                values.push(self.annotation_value()?);
                if !self.accept(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RBrace, "`}`")?;
            return Ok(Expr { kind: ExprKind::ArrayInit(values), span });
        }
        self.conditional_expr()
    }

    fn modifiers(&mut self) -> Result<(Vec<Modifier>, Vec<Annotation>)> {
        let mut modifiers = Vec::new();
        let mut annotations = Vec::new();
        loop {
            let modifier = match self.peek() {
                Some(Token::Public) => Modifier::Public,
                Some(Token::Private) => Modifier::Private,
                Some(Token::Protected) => Modifier::Protected,
                Some(Token::Static) => Modifier::Static,
                Some(Token::Final) => Modifier::Final,
                Some(Token::Abstract) => Modifier::Abstract,
                Some(Token::Native) => Modifier::Native,
                Some(Token::Transient) => Modifier::Transient,
                Some(Token::Volatile) => Modifier::Volatile,
                Some(Token::Strictfp) => Modifier::Strictfp,
                // `default` on an interface method
                Some(Token::Default) => Modifier::Default,
                Some(Token::At)
                    if !matches!(self.peek_at(1), Some(Token::Interface)) =>
                {
                    annotations.extend(self.annotations()?);
                    continue;
                }
                _ => break,
            };
            modifiers.push(modifier);
            self.pos += 1;
        }
        Ok((modifiers, annotations))
    }

    // ----- type declarations -----

    fn type_decl(&mut self) -> Result<TypeDecl> {
        let (modifiers, annotations) = self.modifiers()?;
        match self.peek() {
            Some(Token::Class) => self.class_decl(modifiers, annotations).map(TypeDecl::Class),
            Some(Token::Interface) => {
                self.interface_decl(modifiers, annotations).map(TypeDecl::Interface)
            }
            Some(Token::Enum) => self.enum_decl(modifiers, annotations).map(TypeDecl::Enum),
            _ => Err(self.error("expected class, interface or enum declaration")),
        }
    }

    fn type_params(&mut self) -> Result<Vec<TypeParam>> {
        let mut params = Vec::new();
        if !self.accept(&Token::Lt) {
            return Ok(params);
        }
        loop {
            let name = self.ident()?;
            let mut bounds = Vec::new();
            if self.accept(&Token::Extends) {
                bounds.push(self.parse_type()?);
                while self.accept(&Token::Amp) {
                    bounds.push(self.parse_type()?);
                }
            }
            params.push(TypeParam { name, bounds });
            if !self.accept(&Token::Comma) {
                break;
            }
        }
        self.expect_type_close()?;
        Ok(params)
    }

    fn class_decl(
        &mut self,
        modifiers: Vec<Modifier>,
        annotations: Vec<Annotation>,
    ) -> Result<ClassDecl> {
        let span = self.cur_span();
        self.expect(&Token::Class, "`class`")?;
        let name = self.ident()?;
        let type_params = self.type_params()?;
        let extends = if self.accept(&Token::Extends) { Some(self.parse_type()?) } else { None };
        let mut implements = Vec::new();
        if self.accept(&Token::Implements) {
            implements.push(self.parse_type()?);
            while self.accept(&Token::Comma) {
                implements.push(self.parse_type()?);
            }
        }
        let body = self.class_body(&name)?;
        Ok(ClassDecl { modifiers, annotations, name, type_params, extends, implements, body, span })
    }

    fn interface_decl(
        &mut self,
        modifiers: Vec<Modifier>,
        annotations: Vec<Annotation>,
    ) -> Result<InterfaceDecl> {
        let span = self.cur_span();
        self.expect(&Token::Interface, "`interface`")?;
        let name = self.ident()?;
        let type_params = self.type_params()?;
        let mut extends = Vec::new();
        if self.accept(&Token::Extends) {
            extends.push(self.parse_type()?);
            while self.accept(&Token::Comma) {
                extends.push(self.parse_type()?);
            }
        }
        let body = self.class_body(&name)?;
        Ok(InterfaceDecl { modifiers, annotations, name, type_params, extends, body, span })
    }

    fn enum_decl(
        &mut self,
        modifiers: Vec<Modifier>,
        annotations: Vec<Annotation>,
    ) -> Result<EnumDecl> {
        let span = self.cur_span();
        self.expect(&Token::Enum, "`enum`")?;
        let name = self.ident()?;
        let mut implements = Vec::new();
        if self.accept(&Token::Implements) {
            implements.push(self.parse_type()?);
            while self.accept(&Token::Comma) {
                implements.push(self.parse_type()?);
            }
        }
        self.expect(&Token::LBrace, "`{`")?;

        let mut constants = Vec::new();
        while let Some(Token::Ident(_)) = self.peek() {
            let const_span = self.cur_span();
            let const_name = self.ident()?;
            let mut args = Vec::new();
            if self.accept(&Token::LParen) {
                args = self.argument_list()?;
            }
            if self.check(&Token::LBrace) {
                return Err(Error::unsupported(self.cur_span(), "enum constant class bodies"));
            }
            constants.push(EnumConstant { name: const_name, args, span: const_span });
            if !self.accept(&Token::Comma) {
                break;
            }
        }

        let mut body = Vec::new();
        if self.accept(&Token::Semi) {
            while !self.check(&Token::RBrace) {
                if self.accept(&Token::Semi) {
                    continue;
                }
                body.push(self.class_member(&name)?);
            }
        }
        self.expect(&Token::RBrace, "`}` at end of enum body")?;
        Ok(EnumDecl { modifiers, annotations, name, implements, constants, body, span })
    }

    fn class_body(&mut self, class_name: &str) -> Result<Vec<ClassMember>> {
        self.expect(&Token::LBrace, "`{`")?;
        let mut members = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.accept(&Token::Semi) {
                continue;
            }
            members.push(self.class_member(class_name)?);
        }
        self.expect(&Token::RBrace, "`}` at end of class body")?;
        Ok(members)
    }

    fn class_member(&mut self, class_name: &str) -> Result<ClassMember> {
        // instance/static initializer blocks
        if self.check(&Token::LBrace) {
            let body = self.block()?;
            return Ok(ClassMember::Initializer { is_static: false, body });
        }
        if self.check(&Token::Static) && self.peek_at(1) == Some(&Token::LBrace) {
            self.pos += 1;
            let body = self.block()?;
            return Ok(ClassMember::Initializer { is_static: true, body });
        }

        let (modifiers, annotations) = self.modifiers()?;
        match self.peek() {
            Some(Token::Class) => {
                return self.class_decl(modifiers, annotations).map(|c| {
                    ClassMember::Type(TypeDecl::Class(c))
                })
            }
            Some(Token::Interface) => {
                return self
                    .interface_decl(modifiers, annotations)
                    .map(|i| ClassMember::Type(TypeDecl::Interface(i)))
            }
            Some(Token::Enum) => {
                return self.enum_decl(modifiers, annotations).map(|e| {
                    ClassMember::Type(TypeDecl::Enum(e))
                })
            }
            _ => {}
        }

        // constructor: the class name followed by `(`
        if let Some(Token::Ident(name)) = self.peek() {
            if name == class_name && self.peek_at(1) == Some(&Token::LParen) {
                return self.constructor_decl(modifiers, annotations);
            }
        }

        let type_params = if self.check(&Token::Lt) { self.type_params()? } else { Vec::new() };

        let span = self.cur_span();
        let return_type = if self.check(&Token::Void) {
            let s = self.cur_span();
            self.pos += 1;
            TypeRef::Void { span: s }
        } else {
            self.parse_type()?
        };

        let name = self.ident()?;
        if self.check(&Token::LParen) {
            self.method_decl(modifiers, annotations, type_params, return_type, name, span)
        } else {
            if !type_params.is_empty() {
                return Err(self.error("type parameters are only valid on methods"));
            }
            self.field_decl(modifiers, annotations, return_type, name, span)
        }
    }

    fn params(&mut self) -> Result<Vec<Param>> {
        self.expect(&Token::LParen, "`(`")?;
        let mut params = Vec::new();
        while !self.check(&Token::RParen) {
            let span = self.cur_span();
            let annotations = self.annotations()?;
            let _ = self.accept(&Token::Final);
            let mut ty = self.parse_type()?;
            let varargs = self.accept(&Token::Ellipsis);
            let name = self.ident()?;
            // trailing `[]` on the parameter name
            let mut extra = 0u8;
            while self.accept(&Token::LBracket) {
                self.expect(&Token::RBracket, "`]`")?;
                extra += 1;
            }
            if extra > 0 {
                ty = add_array_dims(ty, extra);
            }
            params.push(Param { annotations, ty, name, varargs, span });
            if !self.accept(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen, "`)` after parameters")?;
        Ok(params)
    }

    fn throws_clause(&mut self) -> Result<Vec<TypeRef>> {
        let mut throws = Vec::new();
        if self.accept(&Token::Throws) {
            throws.push(self.parse_type()?);
            while self.accept(&Token::Comma) {
                throws.push(self.parse_type()?);
            }
        }
        Ok(throws)
    }

    fn constructor_decl(
        &mut self,
        modifiers: Vec<Modifier>,
        annotations: Vec<Annotation>,
    ) -> Result<ClassMember> {
        let span = self.cur_span();
        let name = self.ident()?;
        let params = self.params()?;
        let throws = self.throws_clause()?;
        let body = self.block()?;
        Ok(ClassMember::Constructor(ConstructorDecl {
            modifiers,
            annotations,
            name,
            params,
            throws,
            body,
            span,
        }))
    }

    fn method_decl(
        &mut self,
        modifiers: Vec<Modifier>,
        annotations: Vec<Annotation>,
        type_params: Vec<TypeParam>,
        return_type: TypeRef,
        name: String,
        span: Span,
    ) -> Result<ClassMember> {
        let params = self.params()?;
        let throws = self.throws_clause()?;
        let body = if self.accept(&Token::Semi) { None } else { Some(self.block()?) };
        Ok(ClassMember::Method(MethodDecl {
            modifiers,
            annotations,
            type_params,
            return_type,
            name,
            params,
            throws,
            body,
            span,
        }))
    }

    fn field_decl(
        &mut self,
        modifiers: Vec<Modifier>,
        annotations: Vec<Annotation>,
        ty: TypeRef,
        first_name: String,
        span: Span,
    ) -> Result<ClassMember> {
        let declarators = self.var_declarators(first_name)?;
        self.expect(&Token::Semi, "`;` after field declaration")?;
        Ok(ClassMember::Field(FieldDecl { modifiers, annotations, ty, declarators, span }))
    }

    fn var_declarators(&mut self, first_name: String) -> Result<Vec<VarDeclarator>> {
        let mut declarators = Vec::new();
        let mut name = first_name;
        loop {
            let span = self.prev_span();
            let mut extra_dims = 0u8;
            while self.accept(&Token::LBracket) {
                self.expect(&Token::RBracket, "`]`")?;
                extra_dims += 1;
            }
            let init = if self.accept(&Token::Assign) {
                Some(self.variable_initializer()?)
            } else {
                None
            };
            declarators.push(VarDeclarator { name, extra_dims, init, span });
            if !self.accept(&Token::Comma) {
                break;
            }
            name = self.ident()?;
        }
        Ok(declarators)
    }

    fn variable_initializer(&mut self) -> Result<Expr> {
        if self.check(&Token::LBrace) {
            let span = self.cur_span();
            self.pos += 1;
            let mut elements = Vec::new();
            while !self.check(&Token::RBrace) {
                elements.push(self.variable_initializer()?);
                if !self.accept(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RBrace, "`}` after array initializer")?;
            return Ok(Expr { kind: ExprKind::ArrayInit(elements), span });
        }
        self.expression()
    }

    // ----- types -----

    fn parse_type(&mut self) -> Result<TypeRef> {
        let span = self.cur_span();
        let base = match self.peek() {
            Some(Token::Boolean) => self.primitive("boolean", span),
            Some(Token::Byte) => self.primitive("byte", span),
            Some(Token::Short) => self.primitive("short", span),
            Some(Token::Char) => self.primitive("char", span),
            Some(Token::Int) => self.primitive("int", span),
            Some(Token::Long) => self.primitive("long", span),
            Some(Token::Float) => self.primitive("float", span),
            Some(Token::Double) => self.primitive("double", span),
            Some(Token::Ident(_)) => {
                let mut name = self.ident()?;
                let mut type_args = self.opt_type_args()?;
                while self.check(&Token::Dot) && matches!(self.peek_at(1), Some(Token::Ident(_))) {
                    self.pos += 1;
                    name.push('.');
                    name.push_str(&self.ident()?);
                    type_args = self.opt_type_args()?;
                }
                TypeRef::Named { name, type_args, span }
            }
            _ => return Err(self.error("expected type")),
        };
        let mut dims = 0u8;
        while self.check(&Token::LBracket) && self.peek_at(1) == Some(&Token::RBracket) {
            self.pos += 2;
            dims += 1;
        }
        Ok(if dims > 0 { add_array_dims(base, dims) } else { base })
    }

    fn primitive(&mut self, name: &str, span: Span) -> TypeRef {
        self.pos += 1;
        TypeRef::Primitive { name: name.to_string(), span }
    }

    fn opt_type_args(&mut self) -> Result<Vec<TypeArg>> {
        if !self.check(&Token::Lt) {
            return Ok(Vec::new());
        }
        self.pos += 1;
        let mut args = Vec::new();
        if self.check(&Token::Gt) {
            // diamond
            self.pos += 1;
            return Ok(args);
        }
        loop {
            if self.accept(&Token::Question) {
                let bound = if self.accept(&Token::Extends) {
                    Some((WildcardBound::Extends, self.parse_type()?))
                } else if self.accept(&Token::Super) {
                    Some((WildcardBound::Super, self.parse_type()?))
                } else {
                    None
                };
                args.push(TypeArg::Wildcard { bound });
            } else {
                args.push(TypeArg::Type(self.parse_type()?));
            }
            if !self.accept(&Token::Comma) {
                break;
            }
        }
        self.expect_type_close()?;
        Ok(args)
    }

    // ----- statements -----

    fn block(&mut self) -> Result<Block> {
        let span = self.cur_span();
        self.expect(&Token::LBrace, "`{`")?;
        let mut statements = Vec::new();
        while !self.check(&Token::RBrace) {
            statements.push(self.statement()?);
        }
        self.expect(&Token::RBrace, "`}`")?;
        Ok(Block { statements, span })
    }

    fn statement(&mut self) -> Result<Stmt> {
        let span = self.cur_span();
        let kind = match self.peek() {
            Some(Token::LBrace) => StmtKind::Block(self.block()?),
            Some(Token::Semi) => {
                self.pos += 1;
                StmtKind::Empty
            }
            Some(Token::If) => {
                self.pos += 1;
                self.expect(&Token::LParen, "`(` after if")?;
                let cond = self.expression()?;
                self.expect(&Token::RParen, "`)`")?;
                let then_branch = Box::new(self.statement()?);
                let else_branch = if self.accept(&Token::Else) {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                StmtKind::If { cond, then_branch, else_branch }
            }
            Some(Token::While) => {
                self.pos += 1;
                self.expect(&Token::LParen, "`(` after while")?;
                let cond = self.expression()?;
                self.expect(&Token::RParen, "`)`")?;
                let body = Box::new(self.statement()?);
                StmtKind::While { cond, body }
            }
            Some(Token::Do) => {
                self.pos += 1;
                let body = Box::new(self.statement()?);
                self.expect(&Token::While, "`while` after do body")?;
                self.expect(&Token::LParen, "`(`")?;
                let cond = self.expression()?;
                self.expect(&Token::RParen, "`)`")?;
                self.expect(&Token::Semi, "`;`")?;
                StmtKind::DoWhile { body, cond }
            }
            Some(Token::For) => return self.for_statement(span),
            Some(Token::Switch) => return self.switch_statement(span),
            Some(Token::Break) => {
                self.pos += 1;
                let label = match self.peek() {
                    Some(Token::Ident(_)) => Some(self.ident()?),
                    _ => None,
                };
                self.expect(&Token::Semi, "`;` after break")?;
                StmtKind::Break { label }
            }
            Some(Token::Continue) => {
                self.pos += 1;
                let label = match self.peek() {
                    Some(Token::Ident(_)) => Some(self.ident()?),
                    _ => None,
                };
                self.expect(&Token::Semi, "`;` after continue")?;
                StmtKind::Continue { label }
            }
            Some(Token::Return) => {
                self.pos += 1;
                let value =
                    if self.check(&Token::Semi) { None } else { Some(self.expression()?) };
                self.expect(&Token::Semi, "`;` after return")?;
                StmtKind::Return { value }
            }
            Some(Token::Throw) => {
                self.pos += 1;
                let value = self.expression()?;
                self.expect(&Token::Semi, "`;` after throw")?;
                StmtKind::Throw { value }
            }
            Some(Token::Try) => return self.try_statement(span),
            // super(...) / this(...) constructor calls
            Some(Token::Super) if self.peek_at(1) == Some(&Token::LParen) => {
                self.pos += 2;
                let args = self.argument_list()?;
                self.expect(&Token::Semi, "`;`")?;
                StmtKind::ExplicitCtorCall { is_super: true, args }
            }
            Some(Token::This) if self.peek_at(1) == Some(&Token::LParen) => {
                self.pos += 2;
                let args = self.argument_list()?;
                self.expect(&Token::Semi, "`;`")?;
                StmtKind::ExplicitCtorCall { is_super: false, args }
            }
            // a label: Ident ':'
            Some(Token::Ident(_)) if self.peek_at(1) == Some(&Token::Colon) => {
                let label = self.ident()?;
                self.pos += 1; // colon
                let body = Box::new(self.statement()?);
                StmtKind::Labeled { label, body }
            }
            _ => {
                if let Some(decl) = self.try_local_var_decl()? {
                    decl
                } else {
                    let expr = self.expression()?;
                    self.expect(&Token::Semi, "`;` after expression statement")?;
                    StmtKind::Expr(expr)
                }
            }
        };
        Ok(Stmt { kind, span })
    }

    /// Attempt `[final] Type name [= init][, ...];` with backtracking.
    fn try_local_var_decl(&mut self) -> Result<Option<StmtKind>> {
        let start = self.pos;
        let is_final = self.accept(&Token::Final);
        let looks_like_type = matches!(
            self.peek(),
            Some(
                Token::Boolean
                    | Token::Byte
                    | Token::Short
                    | Token::Char
                    | Token::Int
                    | Token::Long
                    | Token::Float
                    | Token::Double
                    | Token::Ident(_)
            )
        );
        if !looks_like_type {
            self.pos = start;
            return Ok(None);
        }
        let ty = match self.parse_type() {
            Ok(t) => t,
            Err(_) => {
                self.pos = start;
                return Ok(None);
            }
        };
        let name = match self.peek() {
            Some(Token::Ident(_)) => match self.ident() {
                Ok(n) => n,
                Err(_) => {
                    self.pos = start;
                    return Ok(None);
                }
            },
            _ => {
                self.pos = start;
                return Ok(None);
            }
        };
        // a declarator continues with one of `= , ; [`
        if !matches!(
            self.peek(),
            Some(Token::Assign | Token::Comma | Token::Semi | Token::LBracket)
        ) {
            self.pos = start;
            return Ok(None);
        }
        let declarators = self.var_declarators(name)?;
        self.expect(&Token::Semi, "`;` after local variable declaration")?;
        Ok(Some(StmtKind::LocalVar { is_final, ty, declarators }))
    }

    fn for_statement(&mut self, span: Span) -> Result<Stmt> {
        self.expect(&Token::For, "`for`")?;
        self.expect(&Token::LParen, "`(`")?;

        // enhanced for: [final] Type name : expr
        let start = self.pos;
        let _ = self.accept(&Token::Final);
        if let Ok(ty) = self.parse_type() {
            if let Some(Token::Ident(_)) = self.peek() {
                let name = self.ident()?;
                if self.accept(&Token::Colon) {
                    let iterable = self.expression()?;
                    self.expect(&Token::RParen, "`)`")?;
                    let body = Box::new(self.statement()?);
                    return Ok(Stmt { kind: StmtKind::ForEach { ty, name, iterable, body }, span });
                }
            }
        }
        self.pos = start;

        let init = if self.accept(&Token::Semi) {
            ForInit::None
        } else if let Some(StmtKind::LocalVar { is_final, ty, declarators }) =
            self.try_local_var_decl()?
        {
            ForInit::Decl { is_final, ty, declarators }
        } else {
            let mut exprs = vec![self.expression()?];
            while self.accept(&Token::Comma) {
                exprs.push(self.expression()?);
            }
            self.expect(&Token::Semi, "`;` in for header")?;
            ForInit::Exprs(exprs)
        };

        let cond = if self.check(&Token::Semi) { None } else { Some(self.expression()?) };
        self.expect(&Token::Semi, "`;` in for header")?;

        let mut update = Vec::new();
        if !self.check(&Token::RParen) {
            update.push(self.expression()?);
            while self.accept(&Token::Comma) {
                update.push(self.expression()?);
            }
        }
        self.expect(&Token::RParen, "`)`")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt { kind: StmtKind::For { init, cond, update, body }, span })
    }

    fn switch_statement(&mut self, span: Span) -> Result<Stmt> {
        self.expect(&Token::Switch, "`switch`")?;
        self.expect(&Token::LParen, "`(`")?;
        let selector = self.expression()?;
        self.expect(&Token::RParen, "`)`")?;
        self.expect(&Token::LBrace, "`{`")?;

        let mut cases: Vec<SwitchCase> = Vec::new();
        while !self.check(&Token::RBrace) {
            let mut labels = Vec::new();
            loop {
                if self.accept(&Token::Case) {
                    labels.push(Some(self.expression()?));
                    self.expect(&Token::Colon, "`:` after case label")?;
                } else if self.accept(&Token::Default) {
                    labels.push(None);
                    self.expect(&Token::Colon, "`:` after default")?;
                } else {
                    break;
                }
            }
            if labels.is_empty() {
                return Err(self.error("expected `case` or `default` in switch body"));
            }
            let mut statements = Vec::new();
            while !matches!(self.peek(), Some(Token::Case | Token::Default | Token::RBrace)) {
                statements.push(self.statement()?);
            }
            cases.push(SwitchCase { labels, statements });
        }
        self.expect(&Token::RBrace, "`}`")?;
        Ok(Stmt { kind: StmtKind::Switch { selector, cases }, span })
    }

    fn try_statement(&mut self, span: Span) -> Result<Stmt> {
        self.expect(&Token::Try, "`try`")?;
        if self.check(&Token::LParen) {
            return Err(Error::unsupported(span, "try-with-resources"));
        }
        let body = self.block()?;
        let mut catches = Vec::new();
        while self.accept(&Token::Catch) {
            self.expect(&Token::LParen, "`(`")?;
            let ty = self.parse_type()?;
            if self.check(&Token::Pipe) {
                return Err(Error::unsupported(span, "multi-catch"));
            }
            let name = self.ident()?;
            self.expect(&Token::RParen, "`)`")?;
            let catch_body = self.block()?;
            catches.push(CatchClause { ty, name, body: catch_body });
        }
        let finally = if self.accept(&Token::Finally) { Some(self.block()?) } else { None };
        if catches.is_empty() && finally.is_none() {
            return Err(self.error("try statement needs a catch or finally clause"));
        }
        Ok(Stmt { kind: StmtKind::Try { body, catches, finally }, span })
    }

    // ----- expressions -----

    pub fn expression(&mut self) -> Result<Expr> {
        self.assignment_expr()
    }

    fn assignment_expr(&mut self) -> Result<Expr> {
        // lambdas sit at assignment-expression level
        if let Some(lambda) = self.try_lambda()? {
            return Ok(lambda);
        }
        let span = self.cur_span();
        let target = self.conditional_expr()?;
        let op = match self.peek() {
            Some(Token::Assign) => None,
            Some(Token::AddAssign) => Some(BinaryOp::Add),
            Some(Token::SubAssign) => Some(BinaryOp::Sub),
            Some(Token::MulAssign) => Some(BinaryOp::Mul),
            Some(Token::DivAssign) => Some(BinaryOp::Div),
            Some(Token::RemAssign) => Some(BinaryOp::Rem),
            Some(Token::AndAssign) => Some(BinaryOp::BitAnd),
            Some(Token::OrAssign) => Some(BinaryOp::BitOr),
            Some(Token::XorAssign) => Some(BinaryOp::BitXor),
            Some(Token::ShlAssign) => Some(BinaryOp::Shl),
            Some(Token::ShrAssign) => Some(BinaryOp::Shr),
            Some(Token::UShrAssign) => Some(BinaryOp::UShr),
            _ => return Ok(target),
        };
        self.pos += 1;
        let value = self.assignment_expr()?;
        Ok(Expr {
            kind: ExprKind::Assign { target: Box::new(target), op, value: Box::new(value) },
            span,
        })
    }

    fn try_lambda(&mut self) -> Result<Option<Expr>> {
        let span = self.cur_span();
        // single bare parameter
        if let Some(Token::Ident(_)) = self.peek() {
            if self.peek_at(1) == Some(&Token::Arrow) {
                let name = self.ident()?;
                self.pos += 1; // arrow
                let body = self.lambda_body()?;
                return Ok(Some(Expr {
                    kind: ExprKind::Lambda { params: vec![LambdaParam { name, ty: None }], body },
                    span,
                }));
            }
        }
        // parenthesized parameter list: scan to the matching `)` and check
        // for `->` before committing
        if self.check(&Token::LParen) {
            let mut depth = 0usize;
            let mut idx = self.pos;
            loop {
                match self.tokens.get(idx).map(|(t, _)| t) {
                    Some(Token::LParen) => depth += 1,
                    Some(Token::RParen) => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    None => return Ok(None),
                    _ => {}
                }
                idx += 1;
            }
            if self.tokens.get(idx + 1).map(|(t, _)| t) != Some(&Token::Arrow) {
                return Ok(None);
            }
            self.pos += 1; // `(`
            let mut params = Vec::new();
            while !self.check(&Token::RParen) {
                // `x` or `Type x`
                let typed = !matches!(
                    (self.peek(), self.peek_at(1)),
                    (Some(Token::Ident(_)), Some(Token::Comma | Token::RParen))
                );
                let ty = if typed { Some(self.parse_type()?) } else { None };
                let name = self.ident()?;
                params.push(LambdaParam { name, ty });
                if !self.accept(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RParen, "`)` after lambda parameters")?;
            self.expect(&Token::Arrow, "`->`")?;
            let body = self.lambda_body()?;
            return Ok(Some(Expr { kind: ExprKind::Lambda { params, body }, span }));
        }
        Ok(None)
    }

    fn lambda_body(&mut self) -> Result<LambdaBody> {
        if self.check(&Token::LBrace) {
            Ok(LambdaBody::Block(self.block()?))
        } else {
            Ok(LambdaBody::Expr(Box::new(self.expression()?)))
        }
    }

    fn conditional_expr(&mut self) -> Result<Expr> {
        let span = self.cur_span();
        let cond = self.or_expr()?;
        if !self.accept(&Token::Question) {
            return Ok(cond);
        }
        let then_expr = self.expression()?;
        self.expect(&Token::Colon, "`:` in conditional expression")?;
        let else_expr = self.conditional_expr()?;
        Ok(Expr {
            kind: ExprKind::Ternary {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        })
    }

    fn binary_level(
        &mut self,
        ops: &[(Token, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let span = self.cur_span();
        let mut left = next(self)?;
        'outer: loop {
            for (token, op) in ops {
                if self.check(token) {
                    self.pos += 1;
                    let right = next(self)?;
                    left = Expr {
                        kind: ExprKind::Binary {
                            op: *op,
                            left: Box::new(left),
                            right: Box::new(right),
                        },
                        span,
                    };
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn or_expr(&mut self) -> Result<Expr> {
        self.binary_level(&[(Token::OrOr, BinaryOp::OrOr)], Self::and_expr)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        self.binary_level(&[(Token::AndAnd, BinaryOp::AndAnd)], Self::bitor_expr)
    }

    fn bitor_expr(&mut self) -> Result<Expr> {
        self.binary_level(&[(Token::Pipe, BinaryOp::BitOr)], Self::bitxor_expr)
    }

    fn bitxor_expr(&mut self) -> Result<Expr> {
        self.binary_level(&[(Token::Caret, BinaryOp::BitXor)], Self::bitand_expr)
    }

    fn bitand_expr(&mut self) -> Result<Expr> {
        self.binary_level(&[(Token::Amp, BinaryOp::BitAnd)], Self::equality_expr)
    }

    fn equality_expr(&mut self) -> Result<Expr> {
        self.binary_level(
            &[(Token::EqEq, BinaryOp::Eq), (Token::NotEq, BinaryOp::Ne)],
            Self::relational_expr,
        )
    }

    fn relational_expr(&mut self) -> Result<Expr> {
        let span = self.cur_span();
        let mut left = self.shift_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                Some(Token::InstanceOf) => {
                    self.pos += 1;
                    let ty = self.parse_type()?;
                    left = Expr { kind: ExprKind::InstanceOf { expr: Box::new(left), ty }, span };
                    continue;
                }
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.shift_expr()?;
            left = Expr {
                kind: ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) },
                span,
            };
        }
    }

    fn shift_expr(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (Token::Shl, BinaryOp::Shl),
                (Token::Shr, BinaryOp::Shr),
                (Token::UShr, BinaryOp::UShr),
            ],
            Self::additive_expr,
        )
    }

    fn additive_expr(&mut self) -> Result<Expr> {
        self.binary_level(
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
            Self::multiplicative_expr,
        )
    }

    fn multiplicative_expr(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (Token::Star, BinaryOp::Mul),
                (Token::Slash, BinaryOp::Div),
                (Token::Percent, BinaryOp::Rem),
            ],
            Self::unary_expr,
        )
    }

    fn unary_expr(&mut self) -> Result<Expr> {
        let span = self.cur_span();
        let (op, prefix) = match self.peek() {
            Some(Token::Minus) => (UnaryOp::Neg, true),
            Some(Token::Plus) => (UnaryOp::Plus, true),
            Some(Token::Not) => (UnaryOp::Not, true),
            Some(Token::Tilde) => (UnaryOp::BitNot, true),
            Some(Token::Inc) => (UnaryOp::Inc, true),
            Some(Token::Dec) => (UnaryOp::Dec, true),
            _ => {
                if let Some(cast) = self.try_cast()? {
                    return Ok(cast);
                }
                return self.postfix_expr();
            }
        };
        self.pos += 1;
        let operand = self.unary_expr()?;
        Ok(Expr { kind: ExprKind::Unary { op, operand: Box::new(operand), prefix }, span })
    }

    /// Attempt `(Type) unary` with backtracking.
    fn try_cast(&mut self) -> Result<Option<Expr>> {
        if !self.check(&Token::LParen) {
            return Ok(None);
        }
        let start = self.pos;
        let span = self.cur_span();
        self.pos += 1;
        let is_primitive = matches!(
            self.peek(),
            Some(
                Token::Boolean
                    | Token::Byte
                    | Token::Short
                    | Token::Char
                    | Token::Int
                    | Token::Long
                    | Token::Float
                    | Token::Double
            )
        );
        let ty = match self.parse_type() {
            Ok(t) => t,
            Err(_) => {
                self.pos = start;
                return Ok(None);
            }
        };
        if !self.accept(&Token::RParen) {
            self.pos = start;
            return Ok(None);
        }
        // a cast must be followed by the start of a unary expression; for
        // reference casts, `-`/`+` would instead mean arithmetic on a
        // parenthesized value
        let follows = match self.peek() {
            Some(
                Token::Ident(_)
                | Token::IntLit(_)
                | Token::FloatLit(_)
                | Token::StringLit(_)
                | Token::CharLit(_)
                | Token::True
                | Token::False
                | Token::Null
                | Token::This
                | Token::Super
                | Token::New
                | Token::LParen
                | Token::Not
                | Token::Tilde,
            ) => true,
            Some(Token::Minus | Token::Plus) => is_primitive,
            _ => false,
        };
        if !follows {
            self.pos = start;
            return Ok(None);
        }
        let expr = self.unary_expr()?;
        Ok(Some(Expr { kind: ExprKind::Cast { ty, expr: Box::new(expr) }, span }))
    }

    fn postfix_expr(&mut self) -> Result<Expr> {
        let mut expr = self.primary_expr()?;
        loop {
            let span = self.cur_span();
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    if self.accept(&Token::Class) {
                        // Type.class — rebuild the target as a type name
                        let ty = expr_to_type(&expr)
                            .ok_or_else(|| self.error("`.class` needs a type name"))?;
                        expr = Expr { kind: ExprKind::ClassLiteral { ty }, span };
                        continue;
                    }
                    if self.accept(&Token::This) {
                        return Err(Error::unsupported(span, "qualified this"));
                    }
                    let name = self.ident()?;
                    if self.check(&Token::LParen) {
                        self.pos += 1;
                        let args = self.argument_list()?;
                        expr = Expr {
                            kind: ExprKind::MethodCall {
                                target: Some(Box::new(expr)),
                                name,
                                args,
                            },
                            span,
                        };
                    } else {
                        expr = Expr {
                            kind: ExprKind::FieldAccess { target: Box::new(expr), name },
                            span,
                        };
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let index = self.expression()?;
                    self.expect(&Token::RBracket, "`]`")?;
                    expr = Expr {
                        kind: ExprKind::ArrayAccess {
                            array: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    };
                }
                Some(Token::Inc) => {
                    self.pos += 1;
                    expr = Expr {
                        kind: ExprKind::Unary {
                            op: UnaryOp::Inc,
                            operand: Box::new(expr),
                            prefix: false,
                        },
                        span,
                    };
                }
                Some(Token::Dec) => {
                    self.pos += 1;
                    expr = Expr {
                        kind: ExprKind::Unary {
                            op: UnaryOp::Dec,
                            operand: Box::new(expr),
                            prefix: false,
                        },
                        span,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn primary_expr(&mut self) -> Result<Expr> {
        let span = self.cur_span();
        match self.peek().cloned() {
            Some(Token::IntLit(text)) => {
                self.pos += 1;
                let lit = parse_int_literal(&text, span)?;
                Ok(Expr { kind: ExprKind::Literal(lit), span })
            }
            Some(Token::FloatLit(text)) => {
                self.pos += 1;
                let lit = parse_float_literal(&text, span)?;
                Ok(Expr { kind: ExprKind::Literal(lit), span })
            }
            Some(Token::StringLit(text)) => {
                self.pos += 1;
                let value = parse_string_literal(&text, span)?;
                Ok(Expr { kind: ExprKind::Literal(Literal::Str(value)), span })
            }
            Some(Token::CharLit(text)) => {
                self.pos += 1;
                let value = parse_char_literal(&text, span)?;
                Ok(Expr { kind: ExprKind::Literal(Literal::Char(value)), span })
            }
            Some(Token::True) => {
                self.pos += 1;
                Ok(Expr { kind: ExprKind::Literal(Literal::Bool(true)), span })
            }
            Some(Token::False) => {
                self.pos += 1;
                Ok(Expr { kind: ExprKind::Literal(Literal::Bool(false)), span })
            }
            Some(Token::Null) => {
                self.pos += 1;
                Ok(Expr { kind: ExprKind::Literal(Literal::Null), span })
            }
            Some(Token::This) => {
                self.pos += 1;
                Ok(Expr { kind: ExprKind::This, span })
            }
            Some(Token::Super) => {
                self.pos += 1;
                Ok(Expr { kind: ExprKind::Super, span })
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let expr = self.expression()?;
                self.expect(&Token::RParen, "`)`")?;
                Ok(expr)
            }
            Some(Token::New) => self.new_expr(span),
            Some(Token::Ident(name)) => {
                self.pos += 1;
                if self.check(&Token::LParen) {
                    self.pos += 1;
                    let args = self.argument_list()?;
                    Ok(Expr { kind: ExprKind::MethodCall { target: None, name, args }, span })
                } else {
                    Ok(Expr { kind: ExprKind::Name(name), span })
                }
            }
            // primitive class literals: int.class
            Some(
                Token::Boolean
                | Token::Byte
                | Token::Short
                | Token::Char
                | Token::Int
                | Token::Long
                | Token::Float
                | Token::Double
                | Token::Void,
            ) => {
                let ty = if self.check(&Token::Void) {
                    self.pos += 1;
                    TypeRef::Void { span }
                } else {
                    self.parse_type()?
                };
                self.expect(&Token::Dot, "`.` after primitive type")?;
                self.expect(&Token::Class, "`class`")?;
                Ok(Expr { kind: ExprKind::ClassLiteral { ty }, span })
            }
            _ => Err(self.error("expected expression")),
        }
    }

    fn new_expr(&mut self, span: Span) -> Result<Expr> {
        self.expect(&Token::New, "`new`")?;
        let base = self.parse_type_no_array()?;

        if self.check(&Token::LBracket) {
            // array creation
            let mut dims: Vec<Option<Expr>> = Vec::new();
            while self.accept(&Token::LBracket) {
                if self.accept(&Token::RBracket) {
                    dims.push(None);
                } else {
                    let size = self.expression()?;
                    self.expect(&Token::RBracket, "`]`")?;
                    dims.push(Some(size));
                }
            }
            let init = if self.check(&Token::LBrace) {
                let Expr { kind: ExprKind::ArrayInit(elements), .. } =
                    self.variable_initializer()?
                else {
                    return Err(self.error("expected array initializer"));
                };
                Some(elements)
            } else {
                None
            };
            if init.is_none() && dims.iter().all(|d| d.is_none()) {
                return Err(self.error("array creation needs a size or an initializer"));
            }
            return Ok(Expr { kind: ExprKind::NewArray { elem: base, dims, init }, span });
        }

        self.expect(&Token::LParen, "`(` after class name in new")?;
        let args = self.argument_list()?;
        if self.check(&Token::LBrace) {
            return Err(Error::unsupported(span, "anonymous classes"));
        }
        Ok(Expr { kind: ExprKind::New { ty: base, args }, span })
    }

    /// A type without trailing `[]` pairs, for `new T[...]`.
    fn parse_type_no_array(&mut self) -> Result<TypeRef> {
        let span = self.cur_span();
        match self.peek() {
            Some(Token::Boolean) => Ok(self.primitive("boolean", span)),
            Some(Token::Byte) => Ok(self.primitive("byte", span)),
            Some(Token::Short) => Ok(self.primitive("short", span)),
            Some(Token::Char) => Ok(self.primitive("char", span)),
            Some(Token::Int) => Ok(self.primitive("int", span)),
            Some(Token::Long) => Ok(self.primitive("long", span)),
            Some(Token::Float) => Ok(self.primitive("float", span)),
            Some(Token::Double) => Ok(self.primitive("double", span)),
            Some(Token::Ident(_)) => {
                let mut name = self.ident()?;
                let mut type_args = self.opt_type_args()?;
                while self.check(&Token::Dot) && matches!(self.peek_at(1), Some(Token::Ident(_))) {
                    self.pos += 1;
                    name.push('.');
                    name.push_str(&self.ident()?);
                    type_args = self.opt_type_args()?;
                }
                Ok(TypeRef::Named { name, type_args, span })
            }
            _ => Err(self.error("expected type after `new`")),
        }
    }

    fn argument_list(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.check(&Token::RParen) {
            args.push(self.expression()?);
            if !self.accept(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen, "`)` after arguments")?;
        Ok(args)
    }
}

fn add_array_dims(base: TypeRef, extra: u8) -> TypeRef {
    let span = base.span();
    match base {
        TypeRef::Array { elem, dims, span } => TypeRef::Array { elem, dims: dims + extra, span },
        other => TypeRef::Array { elem: Box::new(other), dims: extra, span },
    }
}

/// Rebuild a dotted field-access chain as a type reference, for `.class`.
fn expr_to_type(expr: &Expr) -> Option<TypeRef> {
    fn collect(expr: &Expr, out: &mut String) -> bool {
        match &expr.kind {
            ExprKind::Name(name) => {
                out.push_str(name);
                true
            }
            ExprKind::FieldAccess { target, name } => {
                if !collect(target, out) {
                    return false;
                }
                out.push('.');
                out.push_str(name);
                true
            }
            _ => false,
        }
    }
    let mut name = String::new();
    if collect(expr, &mut name) {
        Some(TypeRef::Named { name, type_args: Vec::new(), span: expr.span })
    } else {
        None
    }
}

// ----- literal decoding -----

pub fn parse_int_literal(text: &str, span: Span) -> Result<Literal> {
    let cleaned = text.replace('_', "");
    let (digits, is_long) = match cleaned.strip_suffix(['l', 'L']) {
        Some(rest) => (rest, true),
        None => (cleaned.as_str(), false),
    };
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).map(|v| v as i64)
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        u64::from_str_radix(bin, 2).map(|v| v as i64)
    } else if digits.len() > 1 && digits.starts_with('0') {
        u64::from_str_radix(&digits[1..], 8).map(|v| v as i64)
    } else {
        // decimal; 9223372036854775808 only appears under unary minus
        digits.parse::<u64>().map(|v| v as i64)
    };
    let value =
        value.map_err(|_| Error::parse(span, format!("invalid integer literal `{}`", text)))?;
    Ok(if is_long { Literal::Long(value) } else { Literal::Int(value) })
}

pub fn parse_float_literal(text: &str, span: Span) -> Result<Literal> {
    let cleaned = text.replace('_', "");
    if let Some(rest) = cleaned.strip_suffix(['f', 'F']) {
        let value = rest
            .parse::<f32>()
            .map_err(|_| Error::parse(span, format!("invalid float literal `{}`", text)))?;
        Ok(Literal::Float(value))
    } else {
        let digits = cleaned.strip_suffix(['d', 'D']).unwrap_or(&cleaned);
        let value = digits
            .parse::<f64>()
            .map_err(|_| Error::parse(span, format!("invalid double literal `{}`", text)))?;
        Ok(Literal::Double(value))
    }
}

fn decode_escape(chars: &mut std::iter::Peekable<std::str::Chars>, span: Span) -> Result<char> {
    let esc = chars.next().ok_or_else(|| Error::parse(span, "truncated escape sequence"))?;
    Ok(match esc {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'b' => '\u{8}',
        'f' => '\u{c}',
        '\\' => '\\',
        '\'' => '\'',
        '"' => '"',
        '0'..='7' => {
            let mut value = esc as u32 - '0' as u32;
            for _ in 0..2 {
                match chars.peek() {
                    Some(c @ '0'..='7') => {
                        value = value * 8 + (*c as u32 - '0' as u32);
                        chars.next();
                    }
                    _ => break,
                }
            }
            char::from_u32(value).ok_or_else(|| Error::parse(span, "invalid octal escape"))?
        }
        'u' => {
            let mut value = 0u32;
            for _ in 0..4 {
                let d = chars
                    .next()
                    .and_then(|c| c.to_digit(16))
                    .ok_or_else(|| Error::parse(span, "invalid unicode escape"))?;
                value = value * 16 + d;
            }
            char::from_u32(value).ok_or_else(|| Error::parse(span, "invalid unicode escape"))?
        }
        other => other,
    })
}

pub fn parse_string_literal(text: &str, span: Span) -> Result<String> {
    let inner = &text[1..text.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            out.push(decode_escape(&mut chars, span)?);
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

pub fn parse_char_literal(text: &str, span: Span) -> Result<u16> {
    let inner = &text[1..text.len() - 1];
    let mut chars = inner.chars().peekable();
    let c = match chars.next() {
        Some('\\') => decode_escape(&mut chars, span)?,
        Some(c) => c,
        None => return Err(Error::parse(span, "empty character literal")),
    };
    Ok(c as u32 as u16)
}
