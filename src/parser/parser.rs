//! Recursive descent parser
//!
//! Units and members are parsed into owned nodes. Every method body is built
//! into its own arena: statements are linked into chains, breakables get
//! their `outer` links and labels while parsing, and each body is closed by
//! a missing-return sentinel.

use super::error::ParseError;
use super::lexer::{Lexer, LexicalToken, Token};
use super::span::{Location, Span};
use crate::ast::*;
use crate::common::error::Result;

/// Arenas of the method body currently being parsed
#[derive(Default)]
struct BodyBuilder {
    stmts: Vec<Stmt>,
    breakables: Vec<Breakable>,
    locals: Vec<LocalVar>,
    outer: Option<BreakableId>,
    loop_depth: usize,
}

impl BodyBuilder {
    fn reserve(&mut self, span: Span) -> StmtId {
        self.stmts.push(Stmt::new(StmtKind::Empty, span));
        StmtId(self.stmts.len() - 1)
    }

    fn push(&mut self, kind: StmtKind, span: Span) -> StmtId {
        let id = self.reserve(span);
        self.stmts[id.0].kind = kind;
        id
    }

    fn breakable(&mut self, kind: BreakableKind, stmt: StmtId, labels: Vec<String>) -> BreakableId {
        let mut b = Breakable::new(kind, self.outer, stmt);
        b.labels = labels;
        self.breakables.push(b);
        BreakableId(self.breakables.len() - 1)
    }

    fn local(&mut self, name: String, type_ref: TypeRef, span: Span) -> LocalId {
        self.locals.push(LocalVar::new(name, type_ref, span));
        LocalId(self.locals.len() - 1)
    }

    /// Link statements into a chain and return its head
    fn link(&mut self, ids: &[StmtId]) -> Option<StmtId> {
        for pair in ids.windows(2) {
            self.stmts[pair[0].0].next = Some(pair[1]);
        }
        ids.first().copied()
    }

    /// Innermost enclosing breakable; the root block always exists inside a body
    fn outer(&self) -> BreakableId {
        self.outer.unwrap_or(BreakableId(0))
    }
}

/// Parser over one source file
pub struct Parser {
    tokens: Vec<LexicalToken>,
    current: usize,
    end: Location,
    body: BodyBuilder,
    unit_name: String,
}

impl Parser {
    /// Create a new parser from source code
    pub fn new(source: &str) -> Result<Self> {
        let lexer = Lexer::new(source);
        let end = lexer.end_location();
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            current: 0,
            end,
            body: BodyBuilder::default(),
            unit_name: String::new(),
        })
    }

    /// Parse the whole file
    pub fn parse(mut self) -> Result<Program> {
        let mut program = Program::default();
        while !self.is_at_end() {
            program.units.push(self.parse_unit()?);
        }
        log::debug!("parsed {} units", program.units.len());
        Ok(program)
    }

    // Helper methods
    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    fn peek(&self) -> Option<&LexicalToken> {
        self.tokens.get(self.current)
    }

    fn peek_token(&self) -> Option<Token> {
        self.peek().map(|t| t.token)
    }

    fn peek_token_at(&self, ahead: usize) -> Option<Token> {
        self.tokens.get(self.current + ahead).map(|t| t.token)
    }

    fn check(&self, token: Token) -> bool {
        self.peek_token() == Some(token)
    }

    fn match_token(&mut self, token: Token) -> bool {
        if self.check(token) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn advance(&mut self) -> Option<LexicalToken> {
        let tok = self.tokens.get(self.current).cloned();
        if tok.is_some() {
            self.current += 1;
        }
        tok
    }

    fn location(&self) -> Location {
        self.peek().map(|t| t.location).unwrap_or(self.end)
    }

    /// Location just past the previous token
    fn previous_end(&self) -> Location {
        match self.current.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(t) => {
                let mut loc = t.location;
                loc.offset += t.lexeme.len();
                loc.column += t.lexeme.chars().count();
                loc
            }
            None => Location::start(),
        }
    }

    fn span_from(&self, start: Location) -> Span {
        Span::new(start, self.previous_end())
    }

    fn error_here(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(t) => ParseError::unexpected_token(expected, &format!("'{}'", t.lexeme), t.location),
            None => ParseError::unexpected_end_of_input(expected, self.end),
        }
    }

    fn consume(&mut self, token: Token, expected: &str) -> Result<LexicalToken> {
        if self.check(token) {
            if let Some(t) = self.advance() {
                return Ok(t);
            }
        }
        Err(self.error_here(expected).into())
    }

    fn parse_identifier(&mut self) -> Result<(String, Span)> {
        let t = self.consume(Token::Identifier, "identifier")?;
        let span = self.span_from(t.location);
        Ok((t.lexeme, span))
    }

    // Units and members

    fn parse_annotations(&mut self) -> Result<Vec<Annotation>> {
        let mut out = Vec::new();
        while self.check(Token::At) {
            let start = self.location();
            self.current += 1;
            let (name, _) = self.parse_identifier()?;
            out.push(Annotation { name, span: self.span_from(start) });
        }
        Ok(out)
    }

    fn parse_modifiers(&mut self) -> Modifiers {
        let mut m = Modifiers::default();
        while let Some(tok) = self.peek_token().filter(|t| t.is_modifier()) {
            match tok {
                Token::Public => m.is_public = true,
                Token::Protected => m.is_protected = true,
                Token::Private => m.is_private = true,
                Token::Static => m.is_static = true,
                Token::Final => m.is_final = true,
                Token::Abstract => m.is_abstract = true,
                Token::Native => m.is_native = true,
                _ => {}
            }
            self.current += 1;
        }
        m
    }

    fn parse_unit(&mut self) -> Result<Unit> {
        let start = self.location();
        let annotations = self.parse_annotations()?;
        let modifiers = self.parse_modifiers();
        let is_interface = if self.match_token(Token::Class) {
            false
        } else if self.match_token(Token::Interface) {
            true
        } else {
            return Err(self.error_here("'class' or 'interface'").into());
        };
        let (name, _) = self.parse_identifier()?;
        self.unit_name = name.clone();

        let mut superclass = None;
        let mut interfaces = Vec::new();
        if self.match_token(Token::Extends) {
            if is_interface {
                interfaces = self.parse_type_list()?;
            } else {
                superclass = Some(self.parse_type_ref()?);
            }
        }
        if self.match_token(Token::Implements) {
            if is_interface {
                return Err(ParseError::invalid_syntax("an interface cannot implement", self.location()).into());
            }
            interfaces = self.parse_type_list()?;
        }

        self.consume(Token::LBrace, "'{'")?;
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.check(Token::RBrace) {
            if self.is_at_end() {
                return Err(self.error_here("'}'").into());
            }
            self.parse_member(is_interface, &mut fields, &mut methods)?;
        }
        self.consume(Token::RBrace, "'}'")?;

        Ok(Unit {
            name,
            is_interface,
            modifiers,
            annotations,
            superclass,
            interfaces,
            fields,
            methods,
            span: self.span_from(start),
        })
    }

    fn parse_type_list(&mut self) -> Result<Vec<TypeRef>> {
        let mut list = vec![self.parse_type_ref()?];
        while self.match_token(Token::Comma) {
            list.push(self.parse_type_ref()?);
        }
        Ok(list)
    }

    fn parse_type_ref(&mut self) -> Result<TypeRef> {
        let start = self.location();
        match self.peek_token() {
            Some(t) if t.is_primitive_type() || t == Token::Void || t == Token::Identifier => {
                let lexeme = self.advance().map(|t| t.lexeme).unwrap_or_default();
                Ok(TypeRef::new(lexeme, self.span_from(start)))
            }
            _ => Err(self.error_here("type").into()),
        }
    }

    fn parse_member(&mut self, in_interface: bool, fields: &mut Vec<Field>, methods: &mut Vec<Method>) -> Result<()> {
        let start = self.location();
        let annotations = self.parse_annotations()?;
        let modifiers = self.parse_modifiers();

        let is_ctor = self.check(Token::Identifier)
            && self.peek().map(|t| t.lexeme == self.unit_name).unwrap_or(false)
            && self.peek_token_at(1) == Some(Token::LParen);
        if is_ctor {
            if in_interface {
                return Err(ParseError::invalid_syntax("interfaces cannot declare constructors", start).into());
            }
            let (name, span) = self.parse_identifier()?;
            let ret = TypeRef::new("void", span);
            let method = self.parse_method_rest(name, ret, modifiers, annotations, true, false, start)?;
            methods.push(method);
            return Ok(());
        }

        let type_ref = self.parse_type_ref()?;
        let (name, name_span) = self.parse_identifier()?;
        if self.check(Token::LParen) {
            let method = self.parse_method_rest(name, type_ref, modifiers, annotations, false, in_interface, start)?;
            methods.push(method);
            return Ok(());
        }

        if in_interface {
            return Err(ParseError::invalid_syntax("interfaces cannot declare fields", start).into());
        }
        let mut names = vec![(name, name_span)];
        loop {
            if self.check(Token::Assign) {
                return Err(ParseError::invalid_syntax("field initializers are not supported", self.location()).into());
            }
            if !self.match_token(Token::Comma) {
                break;
            }
            names.push(self.parse_identifier()?);
        }
        self.consume(Token::Semicolon, "';'")?;
        for (name, span) in names {
            fields.push(Field { name, type_ref: type_ref.clone(), modifiers: modifiers.clone(), span });
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_method_rest(
        &mut self,
        name: String,
        ret: TypeRef,
        modifiers: Modifiers,
        annotations: Vec<Annotation>,
        is_ctor: bool,
        in_interface: bool,
        start: Location,
    ) -> Result<Method> {
        let params = self.parse_parameter_list()?;
        let throws = if self.match_token(Token::Throws) {
            self.parse_type_list()?
        } else {
            Vec::new()
        };

        let bodyless = in_interface || modifiers.is_abstract || modifiers.is_native;
        let body = if self.match_token(Token::Semicolon) {
            if !bodyless {
                return Err(ParseError::invalid_syntax(format!("method '{}' is missing a body", name), start).into());
            }
            None
        } else {
            if bodyless {
                return Err(ParseError::invalid_syntax(format!("method '{}' cannot have a body", name), start).into());
            }
            Some(self.parse_method_body()?)
        };

        Ok(Method {
            name,
            modifiers,
            annotations,
            is_ctor,
            ret,
            params,
            throws,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_parameter_list(&mut self) -> Result<Vec<Param>> {
        self.consume(Token::LParen, "'('")?;
        let mut params = Vec::new();
        if !self.check(Token::RParen) {
            loop {
                let start = self.location();
                self.match_token(Token::Final);
                let type_ref = self.parse_type_ref()?;
                let (name, _) = self.parse_identifier()?;
                params.push(Param { name, type_ref, span: self.span_from(start) });
                if !self.match_token(Token::Comma) {
                    break;
                }
            }
        }
        self.consume(Token::RParen, "')'")?;
        Ok(params)
    }

    // Statements

    fn parse_method_body(&mut self) -> Result<MethodBody> {
        self.body = BodyBuilder::default();
        let start = self.location();
        self.consume(Token::LBrace, "'{'")?;
        let root = self.body.reserve(Span::single(start));
        let brk = self.body.breakable(BreakableKind::Block, root, Vec::new());
        self.body.outer = Some(brk);

        let mut ids = self.parse_statements_until(&[Token::RBrace])?;
        let close = self.location();
        self.consume(Token::RBrace, "'}'")?;
        ids.push(self.body.push(StmtKind::MissingReturn, Span::single(close)));
        let first = self.body.link(&ids);

        let body = std::mem::take(&mut self.body);
        let mut stmts = body.stmts;
        stmts[root.0].kind = StmtKind::Block(BlockStmt { brk, first });
        stmts[root.0].span = Span::new(start, self.previous_end());
        Ok(MethodBody {
            stmts,
            breakables: body.breakables,
            locals: body.locals,
            root,
            frame_size: 0,
        })
    }

    fn parse_statements_until(&mut self, stop: &[Token]) -> Result<Vec<StmtId>> {
        let mut ids = Vec::new();
        loop {
            match self.peek_token() {
                None => return Err(self.error_here("'}'").into()),
                Some(t) if stop.contains(&t) => return Ok(ids),
                Some(_) => ids.push(self.parse_statement(Vec::new())?),
            }
        }
    }

    fn parse_block(&mut self, labels: Vec<String>) -> Result<StmtId> {
        let start = self.location();
        self.consume(Token::LBrace, "'{'")?;
        let id = self.body.reserve(Span::single(start));
        let brk = self.body.breakable(BreakableKind::Block, id, labels);
        let saved = self.body.outer.replace(brk);
        let ids = self.parse_statements_until(&[Token::RBrace])?;
        self.consume(Token::RBrace, "'}'")?;
        self.body.outer = saved;
        let first = self.body.link(&ids);
        let span = self.span_from(start);
        let stmt = &mut self.body.stmts[id.0];
        stmt.kind = StmtKind::Block(BlockStmt { brk, first });
        stmt.span = span;
        Ok(id)
    }

    fn parse_statement(&mut self, mut labels: Vec<String>) -> Result<StmtId> {
        if self.check(Token::Identifier) && self.peek_token_at(1) == Some(Token::Colon) {
            let (label, _) = self.parse_identifier()?;
            self.consume(Token::Colon, "':'")?;
            labels.push(label);
            return self.parse_statement(labels);
        }

        match self.peek_token() {
            Some(Token::LBrace) => return self.parse_block(labels),
            Some(Token::While) => return self.parse_while_stmt(labels),
            Some(Token::Do) => return self.parse_do_while_stmt(labels),
            Some(Token::Switch) => return self.parse_switch_stmt(labels),
            _ => {}
        }

        if labels.is_empty() {
            return self.parse_simple_statement();
        }

        // Any other labeled statement is wrapped in a labeled block so that
        // `break label` has a breakable to stop at.
        let start = self.location();
        let id = self.body.reserve(Span::single(start));
        let brk = self.body.breakable(BreakableKind::Block, id, labels);
        let saved = self.body.outer.replace(brk);
        let inner = self.parse_simple_statement()?;
        self.body.outer = saved;
        let span = self.span_from(start);
        let stmt = &mut self.body.stmts[id.0];
        stmt.kind = StmtKind::Block(BlockStmt { brk, first: Some(inner) });
        stmt.span = span;
        Ok(id)
    }

    fn parse_simple_statement(&mut self) -> Result<StmtId> {
        let start = self.location();
        let kind = match self.peek_token() {
            Some(Token::LBrace) => return self.parse_block(Vec::new()),
            Some(Token::Semicolon) => {
                self.current += 1;
                StmtKind::Empty
            }
            Some(Token::If) => return self.parse_if_stmt(),
            Some(Token::Try) => return self.parse_try_stmt(),
            Some(Token::While) => return self.parse_while_stmt(Vec::new()),
            Some(Token::Do) => return self.parse_do_while_stmt(Vec::new()),
            Some(Token::Switch) => return self.parse_switch_stmt(Vec::new()),
            Some(Token::For) => {
                return Err(ParseError::invalid_syntax("for loops are not supported", start).into());
            }
            Some(Token::Return) => {
                self.current += 1;
                let value = if self.check(Token::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.consume(Token::Semicolon, "';'")?;
                StmtKind::Return(ReturnStmt { outer: self.body.outer(), value })
            }
            Some(Token::Throw) => {
                self.current += 1;
                let value = self.parse_expression()?;
                self.consume(Token::Semicolon, "';'")?;
                StmtKind::Throw(ThrowStmt { value })
            }
            Some(tok @ (Token::Break | Token::Continue)) => {
                self.current += 1;
                let label = if self.check(Token::Identifier) {
                    Some(self.parse_identifier()?.0)
                } else {
                    None
                };
                self.consume(Token::Semicolon, "';'")?;
                StmtKind::EndLoop(EndLoopStmt {
                    outer: self.body.outer(),
                    label,
                    wants_continue: tok == Token::Continue,
                    target: None,
                })
            }
            Some(Token::Assert) => {
                self.current += 1;
                let cond = self.parse_expression()?;
                let message = if self.match_token(Token::Colon) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                self.consume(Token::Semicolon, "';'")?;
                StmtKind::Assert(AssertStmt { cond, message, encode: false })
            }
            _ if self.is_variable_declaration_start() => self.parse_variable_declaration()?,
            _ => {
                let expr = self.parse_expression()?;
                self.consume(Token::Semicolon, "';'")?;
                StmtKind::Expr(expr)
            }
        };
        let span = self.span_from(start);
        Ok(self.body.push(kind, span))
    }

    fn is_variable_declaration_start(&self) -> bool {
        match self.peek_token() {
            Some(Token::Final | Token::Void) => true,
            Some(t) if t.is_primitive_type() => true,
            Some(Token::Identifier) => self.peek_token_at(1) == Some(Token::Identifier),
            _ => false,
        }
    }

    fn parse_variable_declaration(&mut self) -> Result<StmtKind> {
        self.match_token(Token::Final);
        let type_ref = self.parse_type_ref()?;
        let mut vars = Vec::new();
        loop {
            let (name, span) = self.parse_identifier()?;
            let init = if self.match_token(Token::Assign) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            let local = self.body.local(name, type_ref.clone(), span);
            vars.push(Declarator { local, init });
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        self.consume(Token::Semicolon, "';'")?;
        Ok(StmtKind::VarDecl(VarDeclStmt {
            vars,
            splice: None,
            force_reinit: self.body.loop_depth > 0,
        }))
    }

    fn parse_paren_expression(&mut self) -> Result<Expr> {
        self.consume(Token::LParen, "'('")?;
        let e = self.parse_expression()?;
        self.consume(Token::RParen, "')'")?;
        Ok(e)
    }

    fn parse_if_stmt(&mut self) -> Result<StmtId> {
        let start = self.location();
        self.consume(Token::If, "'if'")?;
        let cond = self.parse_paren_expression()?;
        let then_branch = self.parse_statement(Vec::new())?;
        let else_branch = if self.match_token(Token::Else) {
            Some(self.parse_statement(Vec::new())?)
        } else {
            None
        };
        let span = self.span_from(start);
        Ok(self.body.push(StmtKind::If(IfStmt { cond, then_branch, else_branch }), span))
    }

    /// Parse a loop body inside a fresh loop breakable
    fn parse_loop_body(&mut self, id: StmtId, labels: Vec<String>) -> Result<(BreakableId, StmtId)> {
        let brk = self.body.breakable(BreakableKind::Loop, id, labels);
        let saved = self.body.outer.replace(brk);
        self.body.loop_depth += 1;
        let body = self.parse_statement(Vec::new())?;
        self.body.loop_depth -= 1;
        self.body.outer = saved;
        if let StmtKind::Block(b) = &self.body.stmts[body.0].kind {
            let inner = b.brk;
            self.body.breakables[brk.0].inner_block = Some(inner);
        }
        Ok((brk, body))
    }

    fn parse_while_stmt(&mut self, labels: Vec<String>) -> Result<StmtId> {
        let start = self.location();
        self.consume(Token::While, "'while'")?;
        let cond = self.parse_paren_expression()?;
        let id = self.body.reserve(Span::single(start));
        let (brk, body) = self.parse_loop_body(id, labels)?;
        let span = self.span_from(start);
        let stmt = &mut self.body.stmts[id.0];
        stmt.kind = StmtKind::While(WhileStmt { brk, cond, body, inclusive: false });
        stmt.span = span;
        Ok(id)
    }

    fn parse_do_while_stmt(&mut self, labels: Vec<String>) -> Result<StmtId> {
        let start = self.location();
        self.consume(Token::Do, "'do'")?;
        let id = self.body.reserve(Span::single(start));
        let (brk, body) = self.parse_loop_body(id, labels)?;
        self.consume(Token::While, "'while'")?;
        let cond = self.parse_paren_expression()?;
        self.consume(Token::Semicolon, "';'")?;
        let span = self.span_from(start);
        let stmt = &mut self.body.stmts[id.0];
        stmt.kind = StmtKind::While(WhileStmt { brk, cond, body, inclusive: true });
        stmt.span = span;
        Ok(id)
    }

    fn parse_switch_stmt(&mut self, labels: Vec<String>) -> Result<StmtId> {
        let start = self.location();
        self.consume(Token::Switch, "'switch'")?;
        let selector = self.parse_paren_expression()?;
        let id = self.body.reserve(Span::single(start));
        let brk = self.body.breakable(BreakableKind::Switch, id, labels);
        let saved = self.body.outer.replace(brk);

        self.consume(Token::LBrace, "'{'")?;
        let mut cases = Vec::new();
        while !self.match_token(Token::RBrace) {
            let case_start = self.location();
            let value = if self.match_token(Token::Case) {
                Some(self.parse_expression()?)
            } else if self.match_token(Token::Default) {
                None
            } else {
                return Err(self.error_here("'case', 'default' or '}'").into());
            };
            self.consume(Token::Colon, "':'")?;
            let span = self.span_from(case_start);
            let ids = self.parse_statements_until(&[Token::Case, Token::Default, Token::RBrace])?;
            let first = self.body.link(&ids);
            cases.push(SwitchCase { value, first, span });
        }
        self.body.outer = saved;

        let span = self.span_from(start);
        let stmt = &mut self.body.stmts[id.0];
        stmt.kind = StmtKind::Switch(SwitchStmt { brk, selector, cases });
        stmt.span = span;
        Ok(id)
    }

    fn parse_try_stmt(&mut self) -> Result<StmtId> {
        let start = self.location();
        self.consume(Token::Try, "'try'")?;
        let id = self.body.reserve(Span::single(start));
        let brk = self.body.breakable(BreakableKind::Try, id, Vec::new());
        let saved = self.body.outer.replace(brk);
        let body = self.parse_block(Vec::new())?;
        self.body.outer = saved;

        let mut catches = Vec::new();
        while self.check(Token::Catch) {
            let catch_start = self.location();
            self.current += 1;
            self.consume(Token::LParen, "'('")?;
            let class = self.parse_type_ref()?;
            let (name, name_span) = self.parse_identifier()?;
            self.consume(Token::RParen, "')'")?;
            let local = self.body.local(name, class.clone(), name_span);
            let catch_body = self.parse_block(Vec::new())?;
            catches.push(CatchClause { class, local, body: catch_body, span: self.span_from(catch_start) });
        }
        if self.check(Token::Finally) {
            return Err(ParseError::invalid_syntax("finally blocks are not supported", self.location()).into());
        }
        if catches.is_empty() {
            return Err(self.error_here("'catch'").into());
        }

        let span = self.span_from(start);
        let stmt = &mut self.body.stmts[id.0];
        stmt.kind = StmtKind::Try(TryStmt { brk, body, catches });
        stmt.span = span;
        Ok(id)
    }

    // Expressions

    fn parse_expression(&mut self) -> Result<Expr> {
        self.parse_assignment_expr()
    }

    fn parse_assignment_expr(&mut self) -> Result<Expr> {
        let start = self.location();
        let target = self.parse_binary_expr(0)?;
        if self.match_token(Token::Assign) {
            let value = self.parse_assignment_expr()?;
            let kind = ExprKind::Assign { target: Box::new(target), value: Box::new(value) };
            return Ok(Expr::new(kind, self.span_from(start)));
        }
        Ok(target)
    }

    /// Binary operators by precedence level, loosest first
    const LEVELS: &'static [&'static [(Token, BinaryOp)]] = &[
        &[(Token::PipePipe, BinaryOp::OrOr)],
        &[(Token::AndAnd, BinaryOp::AndAnd)],
        &[(Token::Pipe, BinaryOp::BitOr)],
        &[(Token::Caret, BinaryOp::BitXor)],
        &[(Token::Amp, BinaryOp::BitAnd)],
        &[(Token::Eq, BinaryOp::Eq), (Token::Ne, BinaryOp::Ne)],
        &[
            (Token::Lt, BinaryOp::Lt),
            (Token::Le, BinaryOp::Le),
            (Token::Gt, BinaryOp::Gt),
            (Token::Ge, BinaryOp::Ge),
        ],
        &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
        &[(Token::Star, BinaryOp::Mul), (Token::Slash, BinaryOp::Div), (Token::Percent, BinaryOp::Rem)],
    ];

    fn parse_binary_expr(&mut self, level: usize) -> Result<Expr> {
        if level >= Self::LEVELS.len() {
            return self.parse_unary_expr();
        }
        let start = self.location();
        let mut lhs = self.parse_binary_expr(level + 1)?;
        loop {
            let op = match self.peek_token() {
                Some(t) => Self::LEVELS[level].iter().find(|(tok, _)| *tok == t).map(|(_, op)| *op),
                None => None,
            };
            let Some(op) = op else { break };
            self.current += 1;
            let rhs = self.parse_binary_expr(level + 1)?;
            let kind = ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
            lhs = Expr::new(kind, self.span_from(start));
        }
        Ok(lhs)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr> {
        let start = self.location();
        let op = match self.peek_token() {
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Tilde) => UnaryOp::BitNot,
            _ => return self.parse_primary_expr(),
        };
        self.current += 1;
        // fold the sign into integer literals so `-2147483648` is representable
        if op == UnaryOp::Neg && self.check(Token::DecimalInteger) {
            let tok = self.advance().ok_or_else(|| self.error_here("literal"))?;
            let value: i64 = tok
                .lexeme
                .parse()
                .map_err(|_| ParseError::invalid_syntax("integer literal out of range", tok.location))?;
            if value > 1 << 31 {
                return Err(ParseError::invalid_syntax("integer literal out of range", tok.location).into());
            }
            return Ok(Expr::literal(Literal::Int(-value), self.span_from(start)));
        }
        let operand = self.parse_unary_expr()?;
        Ok(Expr::new(ExprKind::Unary { op, operand: Box::new(operand) }, self.span_from(start)))
    }

    fn parse_argument_list(&mut self) -> Result<Vec<Expr>> {
        self.consume(Token::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.check(Token::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.match_token(Token::Comma) {
                    break;
                }
            }
        }
        self.consume(Token::RParen, "')'")?;
        Ok(args)
    }

    fn parse_primary_expr(&mut self) -> Result<Expr> {
        let start = self.location();
        let Some(tok) = self.advance() else {
            return Err(self.error_here("expression").into());
        };
        let kind = match tok.token {
            Token::DecimalInteger => {
                let value: i64 = tok
                    .lexeme
                    .parse()
                    .map_err(|_| ParseError::invalid_syntax("integer literal out of range", tok.location))?;
                if value > i32::MAX as i64 {
                    return Err(ParseError::invalid_syntax("integer literal out of range", tok.location).into());
                }
                ExprKind::Literal(Literal::Int(value))
            }
            Token::HexInteger => {
                let value = u32::from_str_radix(&tok.lexeme[2..], 16)
                    .map_err(|_| ParseError::invalid_syntax("integer literal out of range", tok.location))?;
                ExprKind::Literal(Literal::Int(value as i32 as i64))
            }
            Token::LongLiteral => {
                let digits = &tok.lexeme[..tok.lexeme.len() - 1];
                let value: i64 = digits
                    .parse()
                    .map_err(|_| ParseError::invalid_syntax("long literal out of range", tok.location))?;
                ExprKind::Literal(Literal::Long(value))
            }
            Token::CharLiteral => {
                let text = unescape(&tok.lexeme[1..tok.lexeme.len() - 1], tok.location)?;
                let unit = text.encode_utf16().next().unwrap_or(0);
                ExprKind::Literal(Literal::Char(unit))
            }
            Token::StringLiteral => {
                let text = unescape(&tok.lexeme[1..tok.lexeme.len() - 1], tok.location)?;
                ExprKind::Literal(Literal::Str(text))
            }
            Token::True => ExprKind::Literal(Literal::Bool(true)),
            Token::False => ExprKind::Literal(Literal::Bool(false)),
            Token::Null => ExprKind::Literal(Literal::Null),
            Token::This => {
                if self.match_token(Token::Dot) {
                    let (name, _) = self.parse_identifier()?;
                    if self.check(Token::LParen) {
                        let args = self.parse_argument_list()?;
                        ExprKind::Call { name, args, symbol: None, is_static: false }
                    } else {
                        ExprKind::Field { name, offset: None }
                    }
                } else {
                    ExprKind::This
                }
            }
            Token::Identifier => {
                if self.check(Token::LParen) {
                    let args = self.parse_argument_list()?;
                    ExprKind::Call { name: tok.lexeme, args, symbol: None, is_static: false }
                } else {
                    ExprKind::Name(tok.lexeme)
                }
            }
            Token::New => {
                let (class, _) = self.parse_identifier()?;
                self.consume(Token::LParen, "'('")?;
                if !self.check(Token::RParen) {
                    return Err(ParseError::invalid_syntax("constructor arguments are not supported", self.location()).into());
                }
                self.consume(Token::RParen, "')'")?;
                ExprKind::New { class }
            }
            Token::LParen => {
                let inner = self.parse_expression()?;
                self.consume(Token::RParen, "')'")?;
                return Ok(Expr { span: self.span_from(start), ..inner });
            }
            _ => {
                return Err(ParseError::unexpected_token("expression", &format!("'{}'", tok.lexeme), tok.location).into());
            }
        };
        Ok(Expr::new(kind, self.span_from(start)))
    }
}

/// Resolve escape sequences of a string or character literal body
fn unescape(body: &str, location: Location) -> std::result::Result<String, ParseError> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('0') => '\0',
            Some('\\') => '\\',
            Some('\'') => '\'',
            Some('"') => '"',
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| ParseError::invalid_syntax(format!("invalid unicode escape '\\u{}'", hex), location))?
            }
            other => {
                let shown = other.map(String::from).unwrap_or_default();
                return Err(ParseError::invalid_syntax(format!("invalid escape sequence '\\{}'", shown), location));
            }
        };
        out.push(escaped);
    }
    Ok(out)
}

/// Parse one source file
pub fn parse(source: &str) -> Result<Program> {
    Parser::new(source)?.parse()
}
