//! Recursive-descent parser over a [`Token`] stream,
//! producing the shared [`fr_syntax::Term`] AST plus [`fr_ext::Program`]'s
//! extra top-level structure (function declarations). Each `Block` mints a
//! fresh [`Lifetime`] into the [`LifetimeArena`] the parser owns, nested
//! inside the lifetime of its enclosing block — the same arena the checker
//! and the reducer are later handed, so lifetimes compare equal across all
//! three without any re-numbering step.

use std::collections::HashMap;

use fr_ext::{FnDecl, Program, TypeAnnotation};
use fr_syntax::{
    AccessKind, CompareOp, ExtTerm, LVal, Lifetime, LifetimeArena, Span, Term, TermKind,
};

use crate::error::{ParseError, Result};
use crate::lexer::{lex, Spanned, Token};

pub struct Parser<'t> {
    tokens: &'t [Spanned],
    pos: usize,
    arena: LifetimeArena,
    scopes: Vec<Lifetime>,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Spanned]) -> Self {
        let arena = LifetimeArena::new();
        let root = arena.root();
        Parser {
            tokens,
            pos: 0,
            arena,
            scopes: vec![root],
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    fn peek_is(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn current_span(&self) -> Span {
        self.tokens.get(self.pos).map(|s| s.span).unwrap_or(Span::DUMMY)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<Span> {
        match self.advance() {
            Some(spanned) if spanned.token == token => Ok(spanned.span),
            Some(spanned) => Err(ParseError::UnexpectedToken {
                span: spanned.span,
                found: spanned.token,
                expected,
            }),
            None => Err(ParseError::UnexpectedEof { expected }),
        }
    }

    fn expect_ident(&mut self, expected: &'static str) -> Result<String> {
        match self.advance() {
            Some(Spanned { token: Token::Ident(name), .. }) => Ok(name),
            Some(spanned) => Err(ParseError::UnexpectedToken {
                span: spanned.span,
                found: spanned.token,
                expected,
            }),
            None => Err(ParseError::UnexpectedEof { expected }),
        }
    }

    fn expect_lifetime(&mut self) -> Result<String> {
        match self.advance() {
            Some(Spanned { token: Token::Lifetime(name), .. }) => Ok(name),
            Some(spanned) => Err(ParseError::UnexpectedToken {
                span: spanned.span,
                found: spanned.token,
                expected: "a lifetime",
            }),
            None => Err(ParseError::UnexpectedEof { expected: "a lifetime" }),
        }
    }

    fn expect_int(&mut self, expected: &'static str) -> Result<i64> {
        match self.advance() {
            Some(Spanned { token: Token::Int(n), .. }) => Ok(n),
            Some(spanned) => Err(ParseError::UnexpectedToken {
                span: spanned.span,
                found: spanned.token,
                expected,
            }),
            None => Err(ParseError::UnexpectedEof { expected }),
        }
    }

    fn expect_eof(&self) -> Result<()> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                span: self.current_span(),
                found: self.peek().cloned().unwrap(),
                expected: "end of input",
            })
        }
    }

    /// `LVal ::= '*' LVal | '*(' LVal ')' | Ident ('.' Int)*`. Parentheses
    /// around a dereferenced l-value are accepted but not load-bearing: the
    /// grammar's only atomic form already binds field projections tighter
    /// than a leading `*`, so `*x.0` and `*(x.0)` parse identically.
    fn parse_lval(&mut self) -> Result<LVal> {
        if self.peek_is(&Token::Star) {
            self.advance();
            let parens = self.peek_is(&Token::LParen);
            if parens {
                self.advance();
            }
            let inner = self.parse_lval()?;
            if parens {
                self.expect(Token::RParen, "`)`")?;
            }
            Ok(inner.deref())
        } else {
            let name = self.expect_ident("an l-value")?;
            let mut lval = LVal::var(name);
            while self.peek_is(&Token::Dot) {
                self.advance();
                let index = self.expect_int("a tuple field index")?;
                lval = lval.field(index as usize);
            }
            Ok(lval)
        }
    }

    fn parse_block(&mut self) -> Result<Term> {
        let start = self.expect(Token::LBrace, "`{`")?;
        let parent = *self.scopes.last().expect("root scope always present");
        let lifetime = self.arena.fresh_within(parent);
        log::trace!("parsing block at {lifetime} (parent {parent})");
        self.scopes.push(lifetime);

        let result = (|| {
            let mut body = vec![self.parse_term()?];
            while self.peek_is(&Token::Semi) {
                self.advance();
                if self.peek_is(&Token::RBrace) {
                    break;
                }
                body.push(self.parse_term()?);
            }
            Ok(body)
        })();

        self.scopes.pop();
        let body = result?;
        let end = self.expect(Token::RBrace, "`}`")?;
        Ok(Term::new(start.to(end), TermKind::Block { lifetime, body }))
    }

    fn parse_let(&mut self) -> Result<Term> {
        let start = self.expect(Token::Let, "`let`")?;
        self.expect(Token::Mut, "`mut`")?;
        let name = self.expect_ident("a variable name")?;
        self.expect(Token::Eq, "`=`")?;
        let init = self.parse_term()?;
        Ok(Term::new(start.to(init.span), TermKind::Let { name, init: Box::new(init) }))
    }

    fn parse_borrow(&mut self) -> Result<Term> {
        let start = self.expect(Token::Amp, "`&`")?;
        let mutable = if self.peek_is(&Token::Mut) {
            self.advance();
            true
        } else {
            false
        };
        let lval = self.parse_lval()?;
        Ok(Term::new(start, TermKind::Borrow { mutable, lval }))
    }

    fn parse_if(&mut self) -> Result<Term> {
        let start = self.expect(Token::If, "`if`")?;
        let lhs = self.parse_lval()?;
        let op = match self.advance() {
            Some(Spanned { token: Token::EqEq, .. }) => CompareOp::Eq,
            Some(Spanned { token: Token::Ne, .. }) => CompareOp::Ne,
            Some(spanned) => {
                return Err(ParseError::UnexpectedToken {
                    span: spanned.span,
                    found: spanned.token,
                    expected: "`==` or `!=`",
                })
            }
            None => return Err(ParseError::UnexpectedEof { expected: "`==` or `!=`" }),
        };
        let rhs = self.parse_lval()?;
        let then_branch = self.parse_block()?;
        self.expect(Token::Else, "`else`")?;
        let else_branch = self.parse_block()?;
        let end = else_branch.span;
        Ok(Term::new(
            start.to(end),
            TermKind::Ext(ExtTerm::If {
                lhs,
                op,
                rhs,
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            }),
        ))
    }

    /// `( Term (',' Term)+ )`: at least one comma, distinguishing a tuple
    /// constructor from what would otherwise be an (unsupported) bare
    /// parenthesized term.
    fn parse_tuple(&mut self) -> Result<Term> {
        let start = self.expect(Token::LParen, "`(`")?;
        let mut elems = vec![self.parse_term()?];
        self.expect(Token::Comma, "`,` (tuples need at least two elements)")?;
        elems.push(self.parse_term()?);
        while self.peek_is(&Token::Comma) {
            self.advance();
            elems.push(self.parse_term()?);
        }
        let end = self.expect(Token::RParen, "`)`")?;
        Ok(Term::new(start.to(end), TermKind::Ext(ExtTerm::Tuple(elems))))
    }

    fn parse_call(&mut self) -> Result<Term> {
        let start = self.current_span();
        let name = self.expect_ident("a function name")?;
        let mut lifetime_args = 0usize;
        if self.peek_is(&Token::ColonColon) {
            self.advance();
            self.expect(Token::Lt, "`<`")?;
            self.expect_lifetime()?;
            lifetime_args += 1;
            while self.peek_is(&Token::Comma) {
                self.advance();
                self.expect_lifetime()?;
                lifetime_args += 1;
            }
            self.expect(Token::Gt, "`>`")?;
        }
        self.expect(Token::LParen, "`(`")?;
        let mut args = Vec::new();
        if !self.peek_is(&Token::RParen) {
            args.push(self.parse_term()?);
            while self.peek_is(&Token::Comma) {
                self.advance();
                args.push(self.parse_term()?);
            }
        }
        let end = self.expect(Token::RParen, "`)`")?;
        Ok(Term::new(start.to(end), TermKind::Ext(ExtTerm::Call { name, lifetime_args, args })))
    }

    /// An `Ident`-or-`*`-led term: a call, an assignment, or a bare move
    /// access, disambiguated by one token of lookahead past the l-value.
    fn parse_lval_led_term(&mut self) -> Result<Term> {
        if let Some(Token::Ident(_)) = self.peek() {
            if matches!(self.peek_at(1), Some(Token::LParen) | Some(Token::ColonColon)) {
                return self.parse_call();
            }
        }
        let start = self.current_span();
        let lval = self.parse_lval()?;
        if self.peek_is(&Token::Eq) {
            self.advance();
            let value = self.parse_term()?;
            Ok(Term::new(start.to(value.span), TermKind::Assign { target: lval, value: Box::new(value) }))
        } else {
            Ok(Term::new(start, TermKind::Access { kind: AccessKind::Move, lval }))
        }
    }

    fn parse_term(&mut self) -> Result<Term> {
        match self.peek() {
            Some(Token::Let) => self.parse_let(),
            Some(Token::Box) => {
                let start = self.expect(Token::Box, "`box`")?;
                let inner = self.parse_term()?;
                Ok(Term::new(start.to(inner.span), TermKind::Box(Box::new(inner))))
            }
            Some(Token::Amp) => self.parse_borrow(),
            Some(Token::Bang) => {
                let start = self.expect(Token::Bang, "`!`")?;
                let lval = self.parse_lval()?;
                Ok(Term::new(start, TermKind::Access { kind: AccessKind::Copy, lval }))
            }
            Some(Token::Question) => {
                let start = self.expect(Token::Question, "`?`")?;
                let lval = self.parse_lval()?;
                Ok(Term::new(start, TermKind::Access { kind: AccessKind::Unspecified, lval }))
            }
            Some(Token::LBrace) => self.parse_block(),
            Some(Token::Int(n)) => {
                let n = *n;
                let span = self.current_span();
                self.advance();
                Ok(Term::new(span, TermKind::IntLit(n)))
            }
            Some(Token::If) => self.parse_if(),
            Some(Token::LParen) => self.parse_tuple(),
            Some(Token::Ident(_)) | Some(Token::Star) => self.parse_lval_led_term(),
            Some(_) => {
                let spanned = self.advance().expect("peek just confirmed a token");
                Err(ParseError::UnexpectedToken {
                    span: spanned.span,
                    found: spanned.token,
                    expected: "the start of a term",
                })
            }
            None => Err(ParseError::UnexpectedEof { expected: "the start of a term" }),
        }
    }

    /// `Type ::= 'int' | '()' | 'box' Type | '&' Lifetime 'mut'? Type | '(' Type (',' Type)+ ')'`.
    /// `lifetimes` maps a signature's declared lifetime names to their
    /// positional index, so `&'a mut T` resolves to `TypeAnnotation::Ref {
    /// lifetime: <index of 'a>, .. }`.
    fn parse_type(&mut self, lifetimes: &HashMap<String, usize>) -> Result<TypeAnnotation> {
        match self.peek() {
            Some(Token::Box) => {
                self.advance();
                Ok(TypeAnnotation::Box(Box::new(self.parse_type(lifetimes)?)))
            }
            Some(Token::Amp) => {
                self.advance();
                let span = self.current_span();
                let lt_name = self.expect_lifetime()?;
                let lifetime = *lifetimes.get(&lt_name).ok_or_else(|| ParseError::InvalidType {
                    span,
                    message: format!("lifetime '{lt_name} is not declared on this function"),
                })?;
                let mutable = if self.peek_is(&Token::Mut) {
                    self.advance();
                    true
                } else {
                    false
                };
                let pointee = self.parse_type(lifetimes)?;
                Ok(TypeAnnotation::Ref { mutable, lifetime, pointee: Box::new(pointee) })
            }
            Some(Token::LParen) => {
                self.advance();
                if self.peek_is(&Token::RParen) {
                    self.advance();
                    return Ok(TypeAnnotation::Unit);
                }
                let mut elems = vec![self.parse_type(lifetimes)?];
                self.expect(Token::Comma, "`,` (tuple types need at least two elements)")?;
                elems.push(self.parse_type(lifetimes)?);
                while self.peek_is(&Token::Comma) {
                    self.advance();
                    elems.push(self.parse_type(lifetimes)?);
                }
                self.expect(Token::RParen, "`)`")?;
                Ok(TypeAnnotation::Tuple(elems))
            }
            Some(Token::Ident(name)) if name == "int" => {
                self.advance();
                Ok(TypeAnnotation::Int)
            }
            Some(_) => {
                let spanned = self.advance().expect("peek just confirmed a token");
                Err(ParseError::UnexpectedToken {
                    span: spanned.span,
                    found: spanned.token,
                    expected: "a type (`int`, `()`, `box T`, `&'a T` or a tuple type)",
                })
            }
            None => Err(ParseError::UnexpectedEof { expected: "a type" }),
        }
    }

    fn parse_fn_decl(&mut self) -> Result<FnDecl> {
        let start = self.expect(Token::Fn, "`fn`")?;
        let name = self.expect_ident("a function name")?;

        let mut lifetime_params = Vec::new();
        let mut lifetime_index = HashMap::new();
        if self.peek_is(&Token::Lt) {
            self.advance();
            loop {
                let lt_name = self.expect_lifetime()?;
                lifetime_index.insert(lt_name.clone(), lifetime_params.len());
                lifetime_params.push(lt_name);
                if self.peek_is(&Token::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
            self.expect(Token::Gt, "`>`")?;
        }

        self.expect(Token::LParen, "`(`")?;
        let mut params = Vec::new();
        if !self.peek_is(&Token::RParen) {
            loop {
                let pname = self.expect_ident("a parameter name")?;
                self.expect(Token::Colon, "`:`")?;
                let ty = self.parse_type(&lifetime_index)?;
                params.push((pname, ty));
                if self.peek_is(&Token::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect(Token::RParen, "`)`")?;
        self.expect(Token::Arrow, "`->`")?;
        let ret = self.parse_type(&lifetime_index)?;
        let body = self.parse_block()?;
        let end = body.span;
        Ok(FnDecl { name, lifetime_params, params, ret, body, span: start.to(end) })
    }
}

/// Parse a single core block, returning the lifetime arena the block's nested scopes
/// were minted into alongside the parsed term.
pub fn parse(src: &str) -> Result<(LifetimeArena, Term)> {
    let tokens = lex(src)?;
    let mut parser = Parser::new(&tokens);
    let term = parser.parse_block()?;
    parser.expect_eof()?;
    Ok((parser.arena, term))
}

/// Parse a whole program: zero or more function declarations followed by a
/// main block.
pub fn parse_program(src: &str) -> Result<(LifetimeArena, Program)> {
    let tokens = lex(src)?;
    let mut parser = Parser::new(&tokens);
    let mut fns = Vec::new();
    while parser.peek_is(&Token::Fn) {
        fns.push(parser.parse_fn_decl()?);
    }
    let body = parser.parse_block()?;
    parser.expect_eof()?;
    let span = body.span;
    Ok((parser.arena, Program { fns, body, span }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fr_syntax::Value;

    #[test]
    fn seed_1_literal_block_parses_and_runs() {
        let (arena, term) = parse("{ let mut x = 123; x }").unwrap();
        let ty = fr_borrowck::check(&arena, &term).unwrap();
        assert_eq!(ty, fr_types::Type::Int);
        let (_, value) = fr_semantics::execute(&arena, term).unwrap();
        assert_eq!(value, Value::Int(123));
    }

    #[test]
    fn parses_nested_derefs_and_parenthesized_form_identically() {
        let (_, a) = parse("{ **x }").unwrap();
        let (_, b) = parse("{ *(*x) }").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parses_field_then_deref() {
        let (_, term) = parse("{ *x.0 }").unwrap();
        let TermKind::Block { body, .. } = term.kind else { panic!("expected a block") };
        let TermKind::Access { lval, .. } = &body[0].kind else { panic!("expected an access") };
        assert_eq!(lval.to_string(), "*x.0");
    }

    #[test]
    fn parses_if_else_and_tuple_extensions() {
        let (_, term) = parse("{ let mut x = 1; let mut y = 1; if x == y { (1, 2) } else { (3, 4) } }").unwrap();
        let TermKind::Block { body, .. } = term.kind else { panic!("expected a block") };
        assert!(matches!(body[2].kind, TermKind::Ext(ExtTerm::If { .. })));
    }

    #[test]
    fn parses_a_function_declaration_and_call() {
        let src = "\
            fn identity(x: int) -> int { x }\n\
            { let mut y = identity(1) }\
        ";
        let (arena, program) = parse_program(src).unwrap();
        assert_eq!(program.fns.len(), 1);
        assert_eq!(program.fns[0].name, "identity");
        let ty = fr_ext::check_program(&arena, &program).unwrap();
        assert_eq!(ty, fr_types::Type::Int);
    }

    #[test]
    fn rejects_a_call_to_an_undeclared_function() {
        let (arena, program) = parse_program("{ let mut y = identity(1) }").unwrap();
        assert!(fr_ext::check_program(&arena, &program).is_err());
    }

    #[test]
    fn rejects_unmatched_brace() {
        let err = parse("{ let mut x = 1;").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn round_trips_through_display() {
        let (_, term) = parse("{ let mut x = 1; let mut y = &mut x; *y = 2; !y }").unwrap();
        let printed = term.to_string();
        let (_, reparsed) = parse(&printed).unwrap();
        assert_eq!(term, reparsed);
    }
}
