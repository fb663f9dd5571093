// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Hand-written recursive descent parser for setup scripts.
//!
//! Tokens are collected up front (indentation is already resolved into
//! Indent/Dedent by the lexer), then each grammar level gets its own
//! method, lowest precedence first.

use crate::ast::{
    Alias, BinaryOp, BoolOp, CmpOp, CompFor, CompKind, ExceptHandler, Expr, Keyword, Loc, Param,
    ParamKind, Stmt, UnaryOp, WithItem,
};
use crate::common::{ErrorCode, SyntaxError, SyntaxResult};
use crate::token::{Lexer, Spanned, Token, unquote};

#[cfg(test)]
mod tests;

struct Parser<'input> {
    tokens: Vec<Spanned<Token<'input>>>,
    pos: usize,
}

fn is_layout(tok: &Token) -> bool {
    matches!(tok, Token::Newline | Token::Indent | Token::Dedent)
}

impl<'input> Parser<'input> {
    /// Create a new parser from a lexer, collecting all tokens up front.
    /// Returns the first lexing error, if any.
    fn new(lexer: Lexer<'input>) -> SyntaxResult<Self> {
        let tokens = lexer.collect::<SyntaxResult<Vec<_>>>()?;
        Ok(Parser { tokens, pos: 0 })
    }

    fn peek(&self) -> Option<&Spanned<Token<'input>>> {
        self.tokens.get(self.pos)
    }

    fn peek_tok(&self) -> Option<Token<'input>> {
        self.peek().map(|(_, tok, _)| *tok)
    }

    fn peek_nth(&self, n: usize) -> Option<Token<'input>> {
        self.tokens.get(self.pos + n).map(|(_, tok, _)| *tok)
    }

    fn check(&self, tok: Token<'input>) -> bool {
        self.peek_tok() == Some(tok)
    }

    fn advance(&mut self) -> Option<Spanned<Token<'input>>> {
        let tok = self.tokens.get(self.pos).copied();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Consume the current token, returning where it started.
    fn advance_start(&mut self) -> usize {
        let start = self.start_pos();
        self.advance();
        start
    }

    fn eat(&mut self, tok: Token<'input>) -> Option<Spanned<Token<'input>>> {
        if self.check(tok) { self.advance() } else { None }
    }

    fn expect(
        &mut self,
        tok: Token<'input>,
        code: ErrorCode,
    ) -> SyntaxResult<Spanned<Token<'input>>> {
        match self.eat(tok) {
            Some(spanned) => Ok(spanned),
            None => Err(self.error_here(code)),
        }
    }

    fn expect_ident(&mut self) -> SyntaxResult<(String, Loc)> {
        match self.peek().copied() {
            Some((start, Token::Ident(name), end)) => {
                self.pos += 1;
                Ok((name.to_owned(), Loc::new(start, end)))
            }
            _ => Err(self.error_here(ErrorCode::ExpectedIdent)),
        }
    }

    /// Get the position for EOF errors
    fn eof_position(&self) -> usize {
        if let Some((_, _, end)) = self.tokens.last() {
            *end
        } else {
            0
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn error_here(&self, code: ErrorCode) -> SyntaxError {
        match self.peek() {
            Some((start, _, end)) => SyntaxError::new(code, *start, (*end).max(*start + 1)),
            None => {
                let pos = self.eof_position();
                SyntaxError::new(ErrorCode::UnrecognizedEof, pos, pos + 1)
            }
        }
    }

    fn start_pos(&self) -> usize {
        match self.peek() {
            Some((start, _, _)) => *start,
            None => self.eof_position(),
        }
    }

    /// End of the last consumed token that isn't layout.
    fn prev_end(&self) -> usize {
        self.tokens[..self.pos]
            .iter()
            .rev()
            .find(|(_, tok, _)| !is_layout(tok))
            .map(|(_, _, end)| *end)
            .unwrap_or(0)
    }

    fn loc_from(&self, start: usize) -> Loc {
        Loc::new(start, self.prev_end().max(start))
    }

    fn starts_expression(&self) -> bool {
        matches!(
            self.peek_tok(),
            Some(
                Token::Ident(_)
                    | Token::Num(_)
                    | Token::Str(_)
                    | Token::LParen
                    | Token::LBracket
                    | Token::LBrace
                    | Token::Plus
                    | Token::Minus
                    | Token::Tilde
                    | Token::Not
                    | Token::Lambda
                    | Token::Await
                    | Token::NoneLit
                    | Token::True
                    | Token::False
                    | Token::Ellipsis
                    | Token::Question
                    | Token::Star
            )
        )
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek_tok(),
            None | Some(Token::Newline) | Some(Token::Semicolon)
        )
    }

    fn parse_file(&mut self) -> SyntaxResult<Vec<Stmt>> {
        let mut body = vec![];
        while !self.is_at_end() {
            if self.eat(Token::Newline).is_some() {
                continue;
            }
            body.extend(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_statement(&mut self) -> SyntaxResult<Vec<Stmt>> {
        let start = self.start_pos();
        let stmt = match self.peek_tok() {
            Some(Token::If) => self.parse_if()?,
            Some(Token::While) => self.parse_while()?,
            Some(Token::For) => self.parse_for(start, false)?,
            Some(Token::Try) => self.parse_try()?,
            Some(Token::With) => self.parse_with(start, false)?,
            Some(Token::Def) => self.parse_funcdef(start, vec![], false)?,
            Some(Token::Class) => self.parse_classdef(start, vec![])?,
            Some(Token::At) => self.parse_decorated()?,
            Some(Token::Async) => self.parse_async(start, vec![])?,
            Some(Token::Indent) => return Err(self.error_here(ErrorCode::UnexpectedIndent)),
            _ => return self.parse_simple_statements(),
        };
        Ok(vec![stmt])
    }

    /// The body after a compound statement header, colon included.
    fn parse_block(&mut self) -> SyntaxResult<Vec<Stmt>> {
        self.expect(Token::Colon, ErrorCode::ExpectedBlock)?;
        if self.eat(Token::Newline).is_none() {
            return self.parse_simple_statements();
        }
        self.expect(Token::Indent, ErrorCode::ExpectedBlock)?;
        let mut body = vec![];
        while self.eat(Token::Dedent).is_none() && !self.is_at_end() {
            body.extend(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_simple_statements(&mut self) -> SyntaxResult<Vec<Stmt>> {
        let mut stmts = vec![self.parse_small_statement()?];
        while self.eat(Token::Semicolon).is_some() {
            if self.at_statement_end() {
                break;
            }
            stmts.push(self.parse_small_statement()?);
        }
        if !self.is_at_end() {
            self.expect(Token::Newline, ErrorCode::ExpectedNewline)?;
        }
        Ok(stmts)
    }

    fn parse_small_statement(&mut self) -> SyntaxResult<Stmt> {
        let start = self.start_pos();
        match self.peek_tok() {
            Some(Token::Pass) => {
                self.advance();
                Ok(Stmt::Pass(self.loc_from(start)))
            }
            Some(Token::Break) => {
                self.advance();
                Ok(Stmt::Break(self.loc_from(start)))
            }
            Some(Token::Continue) => {
                self.advance();
                Ok(Stmt::Continue(self.loc_from(start)))
            }
            Some(Token::Return) => {
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_testlist_star_expr()?)
                };
                Ok(Stmt::Return(value, self.loc_from(start)))
            }
            Some(Token::Raise) => {
                self.advance();
                let mut exc = None;
                let mut cause = None;
                if !self.at_statement_end() {
                    exc = Some(self.parse_test()?);
                    if self.eat(Token::From).is_some() {
                        cause = Some(self.parse_test()?);
                    }
                }
                Ok(Stmt::Raise(exc, cause, self.loc_from(start)))
            }
            Some(tok @ (Token::Global | Token::Nonlocal)) => {
                self.advance();
                let mut names = vec![self.expect_ident()?.0];
                while self.eat(Token::Comma).is_some() {
                    names.push(self.expect_ident()?.0);
                }
                let loc = self.loc_from(start);
                if tok == Token::Global {
                    Ok(Stmt::Global(names, loc))
                } else {
                    Ok(Stmt::Nonlocal(names, loc))
                }
            }
            Some(Token::Del) => {
                self.advance();
                let targets = match self.parse_target_list()? {
                    Expr::Tuple(items, _) => items,
                    other => vec![other],
                };
                Ok(Stmt::Del(targets, self.loc_from(start)))
            }
            Some(Token::Assert) => {
                self.advance();
                let test = self.parse_test()?;
                let msg = if self.eat(Token::Comma).is_some() {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                Ok(Stmt::Assert(test, msg, self.loc_from(start)))
            }
            Some(Token::Import) => self.parse_import(),
            Some(Token::From) => self.parse_import_from(),
            _ => self.parse_expr_statement(),
        }
    }

    fn parse_expr_statement(&mut self) -> SyntaxResult<Stmt> {
        let start = self.start_pos();
        let first = self.parse_testlist_or_yield()?;
        match self.peek_tok() {
            Some(Token::Colon) => {
                check_target(&first)?;
                self.advance();
                let annotation = self.parse_test()?;
                let value = if self.eat(Token::Assign).is_some() {
                    Some(self.parse_testlist_or_yield()?)
                } else {
                    None
                };
                Ok(Stmt::AnnAssign(first, annotation, value, self.loc_from(start)))
            }
            Some(Token::AugAssign(op)) => {
                check_target(&first)?;
                let op = match BinaryOp::from_augmented(op) {
                    Some(op) => op,
                    None => return Err(self.error_here(ErrorCode::UnrecognizedToken)),
                };
                self.advance();
                let value = self.parse_testlist_or_yield()?;
                Ok(Stmt::AugAssign(first, op, value, self.loc_from(start)))
            }
            Some(Token::Assign) => {
                self.advance();
                let mut targets = vec![first];
                let mut value = self.parse_testlist_or_yield()?;
                while self.eat(Token::Assign).is_some() {
                    targets.push(value);
                    value = self.parse_testlist_or_yield()?;
                }
                for target in targets.iter() {
                    check_target(target)?;
                }
                Ok(Stmt::Assign(targets, value, self.loc_from(start)))
            }
            _ => Ok(Stmt::Expr(first, self.loc_from(start))),
        }
    }

    fn parse_dotted_name(&mut self) -> SyntaxResult<String> {
        let mut name = self.expect_ident()?.0;
        while self.eat(Token::Dot).is_some() {
            name.push('.');
            name.push_str(&self.expect_ident()?.0);
        }
        Ok(name)
    }

    fn parse_alias(&mut self, dotted: bool) -> SyntaxResult<Alias> {
        let name = if dotted {
            self.parse_dotted_name()?
        } else {
            self.expect_ident()?.0
        };
        let asname = if self.eat(Token::As).is_some() {
            Some(self.expect_ident()?.0)
        } else {
            None
        };
        Ok(Alias { name, asname })
    }

    fn parse_import(&mut self) -> SyntaxResult<Stmt> {
        let start = self.advance_start();
        let mut names = vec![self.parse_alias(true)?];
        while self.eat(Token::Comma).is_some() {
            names.push(self.parse_alias(true)?);
        }
        Ok(Stmt::Import(names, self.loc_from(start)))
    }

    fn parse_import_from(&mut self) -> SyntaxResult<Stmt> {
        let start = self.advance_start();
        let mut module = String::new();
        loop {
            match self.peek_tok() {
                Some(Token::Dot) => module.push('.'),
                Some(Token::Ellipsis) => module.push_str("..."),
                _ => break,
            }
            self.advance();
        }
        if !self.check(Token::Import) {
            module.push_str(&self.parse_dotted_name()?);
        }
        self.expect(Token::Import, ErrorCode::ExpectedIdent)?;

        let mut names = vec![];
        if self.eat(Token::Star).is_some() {
            names.push(Alias {
                name: "*".to_owned(),
                asname: None,
            });
        } else {
            let parenthesized = self.eat(Token::LParen).is_some();
            names.push(self.parse_alias(false)?);
            while self.eat(Token::Comma).is_some() {
                if parenthesized && self.check(Token::RParen) {
                    break;
                }
                names.push(self.parse_alias(false)?);
            }
            if parenthesized {
                self.expect(Token::RParen, ErrorCode::UnclosedParen)?;
            }
        }
        Ok(Stmt::ImportFrom(module, names, self.loc_from(start)))
    }

    fn parse_if(&mut self) -> SyntaxResult<Stmt> {
        // also entered on `elif`, which nests as the else branch
        let start = self.advance_start();
        let test = self.parse_named_test()?;
        let body = self.parse_block()?;
        let orelse = match self.peek_tok() {
            Some(Token::Elif) => vec![self.parse_if()?],
            Some(Token::Else) => {
                self.advance();
                self.parse_block()?
            }
            _ => vec![],
        };
        Ok(Stmt::If {
            test,
            body,
            orelse,
            loc: self.loc_from(start),
        })
    }

    fn parse_else_block(&mut self) -> SyntaxResult<Vec<Stmt>> {
        if self.eat(Token::Else).is_some() {
            self.parse_block()
        } else {
            Ok(vec![])
        }
    }

    fn parse_while(&mut self) -> SyntaxResult<Stmt> {
        let start = self.advance_start();
        let test = self.parse_named_test()?;
        let body = self.parse_block()?;
        let orelse = self.parse_else_block()?;
        Ok(Stmt::While {
            test,
            body,
            orelse,
            loc: self.loc_from(start),
        })
    }

    fn parse_for(&mut self, start: usize, is_async: bool) -> SyntaxResult<Stmt> {
        self.expect(Token::For, ErrorCode::UnrecognizedToken)?;
        let target = self.parse_target_list()?;
        check_target(&target)?;
        self.expect(Token::In, ErrorCode::ExpectedExpression)?;
        let iter = self.parse_testlist_star_expr()?;
        let body = self.parse_block()?;
        let orelse = self.parse_else_block()?;
        Ok(Stmt::For {
            target,
            iter,
            body,
            orelse,
            is_async,
            loc: self.loc_from(start),
        })
    }

    fn parse_try(&mut self) -> SyntaxResult<Stmt> {
        let start = self.advance_start();
        let body = self.parse_block()?;
        let mut handlers = vec![];
        while self.eat(Token::Except).is_some() {
            let mut kind = None;
            let mut name = None;
            if !self.check(Token::Colon) {
                kind = Some(self.parse_test()?);
                if self.eat(Token::As).is_some() {
                    name = Some(self.expect_ident()?.0);
                }
            }
            let body = self.parse_block()?;
            handlers.push(ExceptHandler { kind, name, body });
        }
        let orelse = self.parse_else_block()?;
        let finalbody = if self.eat(Token::Finally).is_some() {
            self.parse_block()?
        } else {
            vec![]
        };
        if handlers.is_empty() && finalbody.is_empty() {
            return Err(self.error_here(ErrorCode::ExpectedBlock));
        }
        Ok(Stmt::Try {
            body,
            handlers,
            orelse,
            finalbody,
            loc: self.loc_from(start),
        })
    }

    fn parse_with(&mut self, start: usize, is_async: bool) -> SyntaxResult<Stmt> {
        self.expect(Token::With, ErrorCode::UnrecognizedToken)?;
        let mut items = vec![];
        loop {
            let context = self.parse_test()?;
            let target = if self.eat(Token::As).is_some() {
                let target = self.parse_star_or_bitor()?;
                check_target(&target)?;
                Some(target)
            } else {
                None
            };
            items.push(WithItem { context, target });
            if self.eat(Token::Comma).is_none() {
                break;
            }
        }
        let body = self.parse_block()?;
        Ok(Stmt::With {
            items,
            body,
            is_async,
            loc: self.loc_from(start),
        })
    }

    fn parse_funcdef(
        &mut self,
        start: usize,
        decorators: Vec<Expr>,
        is_async: bool,
    ) -> SyntaxResult<Stmt> {
        self.expect(Token::Def, ErrorCode::UnrecognizedToken)?;
        let (name, _) = self.expect_ident()?;
        self.expect(Token::LParen, ErrorCode::UnrecognizedToken)?;
        let params = self.parse_params(Token::RParen, true)?;
        self.expect(Token::RParen, ErrorCode::UnclosedParen)?;
        let returns = if self.eat(Token::Arrow).is_some() {
            Some(self.parse_test()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        Ok(Stmt::FunctionDef {
            name,
            params,
            returns,
            body,
            decorators,
            is_async,
            loc: self.loc_from(start),
        })
    }

    fn parse_classdef(&mut self, start: usize, decorators: Vec<Expr>) -> SyntaxResult<Stmt> {
        self.expect(Token::Class, ErrorCode::UnrecognizedToken)?;
        let (name, _) = self.expect_ident()?;
        let (bases, keywords) = if self.eat(Token::LParen).is_some() {
            let args = self.parse_arglist()?;
            self.expect(Token::RParen, ErrorCode::UnclosedParen)?;
            args
        } else {
            (vec![], vec![])
        };
        let body = self.parse_block()?;
        Ok(Stmt::ClassDef {
            name,
            bases,
            keywords,
            body,
            decorators,
            loc: self.loc_from(start),
        })
    }

    fn parse_decorated(&mut self) -> SyntaxResult<Stmt> {
        let start = self.start_pos();
        let mut decorators = vec![];
        while self.eat(Token::At).is_some() {
            decorators.push(self.parse_named_test()?);
            self.expect(Token::Newline, ErrorCode::ExpectedNewline)?;
        }
        match self.peek_tok() {
            Some(Token::Def) => self.parse_funcdef(start, decorators, false),
            Some(Token::Class) => self.parse_classdef(start, decorators),
            Some(Token::Async) => self.parse_async(start, decorators),
            _ => Err(self.error_here(ErrorCode::UnrecognizedToken)),
        }
    }

    fn parse_async(&mut self, start: usize, decorators: Vec<Expr>) -> SyntaxResult<Stmt> {
        self.expect(Token::Async, ErrorCode::UnrecognizedToken)?;
        match self.peek_tok() {
            Some(Token::Def) => self.parse_funcdef(start, decorators, true),
            Some(Token::For) if decorators.is_empty() => self.parse_for(start, true),
            Some(Token::With) if decorators.is_empty() => self.parse_with(start, true),
            _ => Err(self.error_here(ErrorCode::UnrecognizedToken)),
        }
    }

    /// Parameters up to (not including) `close`.  Lambdas don't allow
    /// annotations since their parameter list ends at a colon.
    fn parse_params(&mut self, close: Token<'input>, annotations: bool) -> SyntaxResult<Vec<Param>> {
        let mut params = vec![];
        while !self.check(close) {
            let param = match self.peek_tok() {
                Some(Token::Slash) => {
                    self.advance();
                    marker_param("/")
                }
                Some(Token::Star) => {
                    self.advance();
                    if let Some(Token::Ident(_)) = self.peek_tok() {
                        self.parse_param(ParamKind::VarArgs, annotations)?
                    } else {
                        marker_param("*")
                    }
                }
                Some(Token::DoubleStar) => {
                    self.advance();
                    self.parse_param(ParamKind::KwArgs, annotations)?
                }
                _ => self.parse_param(ParamKind::Normal, annotations)?,
            };
            params.push(param);
            if self.eat(Token::Comma).is_none() {
                break;
            }
        }
        Ok(params)
    }

    fn parse_param(&mut self, kind: ParamKind, annotations: bool) -> SyntaxResult<Param> {
        let (name, _) = self.expect_ident()?;
        let annotation = if annotations && self.eat(Token::Colon).is_some() {
            Some(self.parse_test()?)
        } else {
            None
        };
        let default = if kind == ParamKind::Normal && self.eat(Token::Assign).is_some() {
            Some(self.parse_test()?)
        } else {
            None
        };
        Ok(Param {
            name,
            kind,
            annotation,
            default,
        })
    }

    fn parse_testlist_or_yield(&mut self) -> SyntaxResult<Expr> {
        if self.check(Token::Yield) {
            self.parse_yield()
        } else {
            self.parse_testlist_star_expr()
        }
    }

    fn parse_yield(&mut self) -> SyntaxResult<Expr> {
        let start = self.advance_start();
        let value = if self.eat(Token::From).is_some() {
            Some(Box::new(self.parse_test()?))
        } else if self.starts_expression() {
            Some(Box::new(self.parse_testlist_star_expr()?))
        } else {
            None
        };
        Ok(Expr::Yield(value, self.loc_from(start)))
    }

    /// Comma separated expressions; more than one (or a trailing comma)
    /// makes an unparenthesized tuple.
    fn parse_testlist_star_expr(&mut self) -> SyntaxResult<Expr> {
        let start = self.start_pos();
        let first = self.parse_test_or_star()?;
        if !self.check(Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(Token::Comma).is_some() {
            if !self.starts_expression() {
                break;
            }
            items.push(self.parse_test_or_star()?);
        }
        Ok(Expr::Tuple(items, self.loc_from(start)))
    }

    /// Assignment targets of `for` and `del`: stops before `in`.
    fn parse_target_list(&mut self) -> SyntaxResult<Expr> {
        let start = self.start_pos();
        let first = self.parse_star_or_bitor()?;
        if !self.check(Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(Token::Comma).is_some() {
            if !self.starts_expression() {
                break;
            }
            items.push(self.parse_star_or_bitor()?);
        }
        Ok(Expr::Tuple(items, self.loc_from(start)))
    }

    fn parse_star_or_bitor(&mut self) -> SyntaxResult<Expr> {
        if self.check(Token::Star) {
            let start = self.advance_start();
            let value = self.parse_bitor()?;
            return Ok(Expr::Starred(Box::new(value), self.loc_from(start)));
        }
        self.parse_bitor()
    }

    fn parse_test_or_star(&mut self) -> SyntaxResult<Expr> {
        if self.check(Token::Star) {
            return self.parse_star_or_bitor();
        }
        self.parse_named_test()
    }

    fn parse_named_test(&mut self) -> SyntaxResult<Expr> {
        if let (Some(Token::Ident(name)), Some(Token::Walrus)) = (self.peek_tok(), self.peek_nth(1)) {
            let start = self.start_pos();
            self.pos += 2;
            let value = self.parse_test()?;
            return Ok(Expr::Walrus(
                name.to_owned(),
                Box::new(value),
                self.loc_from(start),
            ));
        }
        self.parse_test()
    }

    /// Parse a full expression: lambdas and conditional expressions
    fn parse_test(&mut self) -> SyntaxResult<Expr> {
        if self.check(Token::Lambda) {
            return self.parse_lambda();
        }
        let body = self.parse_or_test()?;
        if self.eat(Token::If).is_none() {
            return Ok(body);
        }
        let test = self.parse_or_test()?;
        self.expect(Token::Else, ErrorCode::ExpectedExpression)?;
        let orelse = self.parse_test()?;
        let loc = Loc::merge(body.get_loc(), orelse.get_loc());
        Ok(Expr::If(
            Box::new(test),
            Box::new(body),
            Box::new(orelse),
            loc,
        ))
    }

    fn parse_lambda(&mut self) -> SyntaxResult<Expr> {
        let start = self.advance_start();
        let params = self.parse_params(Token::Colon, false)?;
        self.expect(Token::Colon, ErrorCode::ExpectedExpression)?;
        let body = self.parse_test()?;
        Ok(Expr::Lambda(params, Box::new(body), self.loc_from(start)))
    }

    fn parse_or_test(&mut self) -> SyntaxResult<Expr> {
        let mut left = self.parse_and_test()?;
        while self.eat(Token::Or).is_some() {
            let right = self.parse_and_test()?;
            let loc = Loc::merge(left.get_loc(), right.get_loc());
            left = Expr::Logical(BoolOp::Or, Box::new(left), Box::new(right), loc);
        }
        Ok(left)
    }

    fn parse_and_test(&mut self) -> SyntaxResult<Expr> {
        let mut left = self.parse_not_test()?;
        while self.eat(Token::And).is_some() {
            let right = self.parse_not_test()?;
            let loc = Loc::merge(left.get_loc(), right.get_loc());
            left = Expr::Logical(BoolOp::And, Box::new(left), Box::new(right), loc);
        }
        Ok(left)
    }

    fn parse_not_test(&mut self) -> SyntaxResult<Expr> {
        if self.check(Token::Not) {
            let start = self.advance_start();
            let operand = self.parse_not_test()?;
            return Ok(Expr::Op1(
                UnaryOp::Not,
                Box::new(operand),
                self.loc_from(start),
            ));
        }
        self.parse_comparison()
    }

    /// Comparison chains such as `a < b <= c` stay a single node.
    fn parse_comparison(&mut self) -> SyntaxResult<Expr> {
        let left = self.parse_bitor()?;
        let mut rest = vec![];
        loop {
            let op = match self.peek_tok() {
                Some(Token::Lt) => CmpOp::Lt,
                Some(Token::Lte) => CmpOp::Lte,
                Some(Token::Gt) => CmpOp::Gt,
                Some(Token::Gte) => CmpOp::Gte,
                Some(Token::EqEq) => CmpOp::Eq,
                Some(Token::Neq) => CmpOp::NotEq,
                Some(Token::In) => CmpOp::In,
                Some(Token::Not) if self.peek_nth(1) == Some(Token::In) => {
                    self.advance();
                    CmpOp::NotIn
                }
                Some(Token::Is) => {
                    if self.peek_nth(1) == Some(Token::Not) {
                        self.advance();
                        CmpOp::IsNot
                    } else {
                        CmpOp::Is
                    }
                }
                _ => break,
            };
            self.advance();
            rest.push((op, self.parse_bitor()?));
        }

        let end = match rest.last() {
            Some((_, right)) => right.get_loc(),
            None => return Ok(left),
        };
        let loc = Loc::merge(left.get_loc(), end);
        Ok(Expr::Compare(Box::new(left), rest, loc))
    }

    /// Left associative binary operators at one precedence level.
    fn parse_binary(
        &mut self,
        op_for: fn(Token<'_>) -> Option<BinaryOp>,
        next: fn(&mut Self) -> SyntaxResult<Expr>,
    ) -> SyntaxResult<Expr> {
        let mut left = next(self)?;
        while let Some(op) = self.peek_tok().and_then(op_for) {
            self.advance();
            let right = next(self)?;
            let loc = Loc::merge(left.get_loc(), right.get_loc());
            left = Expr::Op2(op, Box::new(left), Box::new(right), loc);
        }
        Ok(left)
    }

    fn parse_bitor(&mut self) -> SyntaxResult<Expr> {
        self.parse_binary(
            |tok| match tok {
                Token::Pipe => Some(BinaryOp::BitOr),
                _ => None,
            },
            Self::parse_bitxor,
        )
    }

    fn parse_bitxor(&mut self) -> SyntaxResult<Expr> {
        self.parse_binary(
            |tok| match tok {
                Token::Caret => Some(BinaryOp::BitXor),
                _ => None,
            },
            Self::parse_bitand,
        )
    }

    fn parse_bitand(&mut self) -> SyntaxResult<Expr> {
        self.parse_binary(
            |tok| match tok {
                Token::Amp => Some(BinaryOp::BitAnd),
                _ => None,
            },
            Self::parse_shift,
        )
    }

    fn parse_shift(&mut self) -> SyntaxResult<Expr> {
        self.parse_binary(
            |tok| match tok {
                Token::LShift => Some(BinaryOp::LShift),
                Token::RShift => Some(BinaryOp::RShift),
                _ => None,
            },
            Self::parse_arith,
        )
    }

    fn parse_arith(&mut self) -> SyntaxResult<Expr> {
        self.parse_binary(
            |tok| match tok {
                Token::Plus => Some(BinaryOp::Add),
                Token::Minus => Some(BinaryOp::Sub),
                _ => None,
            },
            Self::parse_term,
        )
    }

    fn parse_term(&mut self) -> SyntaxResult<Expr> {
        self.parse_binary(
            |tok| match tok {
                Token::Star => Some(BinaryOp::Mul),
                Token::At => Some(BinaryOp::MatMul),
                Token::Slash => Some(BinaryOp::Div),
                Token::DoubleSlash => Some(BinaryOp::FloorDiv),
                Token::Percent => Some(BinaryOp::Mod),
                _ => None,
            },
            Self::parse_factor,
        )
    }

    /// Parse unary operators (+, -, ~)
    fn parse_factor(&mut self) -> SyntaxResult<Expr> {
        let op = match self.peek_tok() {
            Some(Token::Plus) => UnaryOp::Positive,
            Some(Token::Minus) => UnaryOp::Negative,
            Some(Token::Tilde) => UnaryOp::Invert,
            _ => return self.parse_power(),
        };
        let start = self.advance_start();
        let operand = self.parse_factor()?;
        Ok(Expr::Op1(op, Box::new(operand), self.loc_from(start)))
    }

    /// `**` binds tighter than unary minus on its left, looser on its right.
    fn parse_power(&mut self) -> SyntaxResult<Expr> {
        let base = self.parse_await()?;
        if self.eat(Token::DoubleStar).is_none() {
            return Ok(base);
        }
        let exponent = self.parse_factor()?;
        let loc = Loc::merge(base.get_loc(), exponent.get_loc());
        Ok(Expr::Op2(
            BinaryOp::Pow,
            Box::new(base),
            Box::new(exponent),
            loc,
        ))
    }

    fn parse_await(&mut self) -> SyntaxResult<Expr> {
        if self.check(Token::Await) {
            let start = self.advance_start();
            let value = self.parse_primary()?;
            return Ok(Expr::Await(Box::new(value), self.loc_from(start)));
        }
        self.parse_primary()
    }

    /// An atom followed by any number of calls, subscripts and
    /// attribute accesses.
    fn parse_primary(&mut self) -> SyntaxResult<Expr> {
        let start = self.start_pos();
        let mut expr = self.parse_atom()?;
        loop {
            match self.peek_tok() {
                Some(Token::LParen) => {
                    self.advance();
                    let (args, keywords) = self.parse_arglist()?;
                    self.expect(Token::RParen, ErrorCode::UnclosedParen)?;
                    expr = Expr::Call(Box::new(expr), args, keywords, self.loc_from(start));
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index = self.parse_subscript_list()?;
                    self.expect(Token::RBracket, ErrorCode::UnclosedParen)?;
                    expr = Expr::Subscript(Box::new(expr), Box::new(index), self.loc_from(start));
                }
                Some(Token::Dot) => {
                    self.advance();
                    let (attr, _) = self.expect_ident()?;
                    expr = Expr::Attribute(Box::new(expr), attr, self.loc_from(start));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Call arguments up to (not including) the closing paren.
    fn parse_arglist(&mut self) -> SyntaxResult<(Vec<Expr>, Vec<Keyword>)> {
        let mut args = vec![];
        let mut keywords = vec![];
        while !self.check(Token::RParen) {
            match (self.peek_tok(), self.peek_nth(1)) {
                (Some(Token::DoubleStar), _) => {
                    self.advance();
                    let value = self.parse_test()?;
                    keywords.push(Keyword { name: None, value });
                }
                (Some(Token::Star), _) => {
                    let start = self.advance_start();
                    let value = self.parse_test()?;
                    args.push(Expr::Starred(Box::new(value), self.loc_from(start)));
                }
                (Some(Token::Ident(name)), Some(Token::Assign)) => {
                    self.pos += 2;
                    let value = self.parse_test()?;
                    keywords.push(Keyword {
                        name: Some(name.to_owned()),
                        value,
                    });
                }
                _ => {
                    let start = self.start_pos();
                    let arg = self.parse_named_test()?;
                    if self.check(Token::For) || self.check(Token::Async) {
                        let generators = self.parse_comp_for()?;
                        args.push(Expr::Comprehension(
                            CompKind::Generator,
                            Box::new(arg),
                            None,
                            generators,
                            self.loc_from(start),
                        ));
                    } else {
                        args.push(arg);
                    }
                }
            }
            if self.eat(Token::Comma).is_none() {
                break;
            }
        }
        Ok((args, keywords))
    }

    fn parse_subscript_list(&mut self) -> SyntaxResult<Expr> {
        let start = self.start_pos();
        let first = self.parse_subscript()?;
        if !self.check(Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(Token::Comma).is_some() {
            if self.check(Token::RBracket) {
                break;
            }
            items.push(self.parse_subscript()?);
        }
        Ok(Expr::Tuple(items, self.loc_from(start)))
    }

    fn parse_slice_part(&mut self) -> SyntaxResult<Option<Box<Expr>>> {
        if matches!(
            self.peek_tok(),
            Some(Token::Colon | Token::Comma | Token::RBracket)
        ) {
            Ok(None)
        } else {
            Ok(Some(Box::new(self.parse_test()?)))
        }
    }

    fn parse_subscript(&mut self) -> SyntaxResult<Expr> {
        let start = self.start_pos();
        let lower = if self.check(Token::Colon) {
            None
        } else {
            let index = self.parse_test_or_star()?;
            if !self.check(Token::Colon) {
                return Ok(index);
            }
            Some(Box::new(index))
        };
        self.expect(Token::Colon, ErrorCode::ExpectedExpression)?;
        let upper = self.parse_slice_part()?;
        let step = if self.eat(Token::Colon).is_some() {
            self.parse_slice_part()?
        } else {
            None
        };
        Ok(Expr::Slice(lower, upper, step, self.loc_from(start)))
    }

    fn parse_comp_for(&mut self) -> SyntaxResult<Vec<CompFor>> {
        let mut generators = vec![];
        while self.check(Token::For) || self.check(Token::Async) {
            let is_async = self.eat(Token::Async).is_some();
            self.expect(Token::For, ErrorCode::ExpectedExpression)?;
            let target = self.parse_target_list()?;
            check_target(&target)?;
            self.expect(Token::In, ErrorCode::ExpectedExpression)?;
            let iter = self.parse_or_test()?;
            let mut ifs = vec![];
            while self.eat(Token::If).is_some() {
                ifs.push(self.parse_or_test()?);
            }
            generators.push(CompFor {
                target,
                iter,
                ifs,
                is_async,
            });
        }
        Ok(generators)
    }

    fn parse_atom(&mut self) -> SyntaxResult<Expr> {
        let (start, tok, end) = match self.peek().copied() {
            Some(spanned) => spanned,
            None => return Err(self.error_here(ErrorCode::ExpectedExpression)),
        };
        match tok {
            Token::Str(_) => return Ok(self.parse_strings()),
            Token::LParen => return self.parse_paren(),
            Token::LBracket => return self.parse_list(),
            Token::LBrace => return self.parse_brace(),
            _ => {}
        }

        let loc = Loc::new(start, end);
        let expr = match tok {
            Token::Ident(name) => Expr::Name(name.to_owned(), loc),
            Token::Num(n) => Expr::Num(n.to_owned(), loc),
            Token::True => Expr::Bool(true, loc),
            Token::False => Expr::Bool(false, loc),
            Token::NoneLit => Expr::NoneLit(loc),
            Token::Ellipsis => Expr::Ellipsis(loc),
            Token::Question => Expr::Placeholder(loc),
            _ => return Err(self.error_here(ErrorCode::ExpectedExpression)),
        };
        self.advance();
        Ok(expr)
    }

    /// Adjacent string literals concatenate into one.
    fn parse_strings(&mut self) -> Expr {
        let start = self.start_pos();
        let mut value = String::new();
        while let Some((_, Token::Str(raw), _)) = self.peek().copied() {
            value.push_str(&unquote(raw));
            self.advance();
        }
        Expr::Str(value, self.loc_from(start))
    }

    fn parse_paren(&mut self) -> SyntaxResult<Expr> {
        let start = self.advance_start();
        if let Some((_, _, end)) = self.eat(Token::RParen) {
            return Ok(Expr::Tuple(vec![], Loc::new(start, end)));
        }
        if self.check(Token::Yield) {
            let value = self.parse_yield()?;
            self.expect(Token::RParen, ErrorCode::UnclosedParen)?;
            return Ok(value);
        }

        let first = self.parse_test_or_star()?;
        if self.check(Token::For) || self.check(Token::Async) {
            let generators = self.parse_comp_for()?;
            let (_, _, end) = self.expect(Token::RParen, ErrorCode::UnclosedParen)?;
            return Ok(Expr::Comprehension(
                CompKind::Generator,
                Box::new(first),
                None,
                generators,
                Loc::new(start, end),
            ));
        }
        if self.eat(Token::RParen).is_some() {
            return Ok(first);
        }

        let mut items = vec![first];
        while self.eat(Token::Comma).is_some() {
            if self.check(Token::RParen) {
                break;
            }
            items.push(self.parse_test_or_star()?);
        }
        let (_, _, end) = self.expect(Token::RParen, ErrorCode::UnclosedParen)?;
        Ok(Expr::Tuple(items, Loc::new(start, end)))
    }

    fn parse_list(&mut self) -> SyntaxResult<Expr> {
        let start = self.advance_start();
        if let Some((_, _, end)) = self.eat(Token::RBracket) {
            return Ok(Expr::List(vec![], Loc::new(start, end)));
        }

        let first = self.parse_test_or_star()?;
        if self.check(Token::For) || self.check(Token::Async) {
            let generators = self.parse_comp_for()?;
            let (_, _, end) = self.expect(Token::RBracket, ErrorCode::UnclosedParen)?;
            return Ok(Expr::Comprehension(
                CompKind::List,
                Box::new(first),
                None,
                generators,
                Loc::new(start, end),
            ));
        }

        let mut items = vec![first];
        while self.eat(Token::Comma).is_some() {
            if self.check(Token::RBracket) {
                break;
            }
            items.push(self.parse_test_or_star()?);
        }
        let (_, _, end) = self.expect(Token::RBracket, ErrorCode::UnclosedParen)?;
        Ok(Expr::List(items, Loc::new(start, end)))
    }

    /// `{...}` is a dict, a set, or a comprehension of either.
    fn parse_brace(&mut self) -> SyntaxResult<Expr> {
        let start = self.advance_start();
        if let Some((_, _, end)) = self.eat(Token::RBrace) {
            return Ok(Expr::Dict(vec![], Loc::new(start, end)));
        }

        if self.eat(Token::DoubleStar).is_some() {
            let spread = self.parse_bitor()?;
            return self.parse_dict_rest(start, vec![(None, spread)]);
        }

        let first = self.parse_test_or_star()?;
        if self.eat(Token::Colon).is_some() {
            let value = self.parse_test()?;
            if self.check(Token::For) || self.check(Token::Async) {
                let generators = self.parse_comp_for()?;
                let (_, _, end) = self.expect(Token::RBrace, ErrorCode::UnclosedParen)?;
                return Ok(Expr::Comprehension(
                    CompKind::Dict,
                    Box::new(first),
                    Some(Box::new(value)),
                    generators,
                    Loc::new(start, end),
                ));
            }
            return self.parse_dict_rest(start, vec![(Some(first), value)]);
        }

        if self.check(Token::For) || self.check(Token::Async) {
            let generators = self.parse_comp_for()?;
            let (_, _, end) = self.expect(Token::RBrace, ErrorCode::UnclosedParen)?;
            return Ok(Expr::Comprehension(
                CompKind::Set,
                Box::new(first),
                None,
                generators,
                Loc::new(start, end),
            ));
        }

        let mut items = vec![first];
        while self.eat(Token::Comma).is_some() {
            if self.check(Token::RBrace) {
                break;
            }
            items.push(self.parse_test_or_star()?);
        }
        let (_, _, end) = self.expect(Token::RBrace, ErrorCode::UnclosedParen)?;
        Ok(Expr::Set(items, Loc::new(start, end)))
    }

    fn parse_dict_rest(
        &mut self,
        start: usize,
        mut entries: Vec<(Option<Expr>, Expr)>,
    ) -> SyntaxResult<Expr> {
        while self.eat(Token::Comma).is_some() {
            if self.check(Token::RBrace) {
                break;
            }
            if self.eat(Token::DoubleStar).is_some() {
                entries.push((None, self.parse_bitor()?));
            } else {
                let key = self.parse_test()?;
                self.expect(Token::Colon, ErrorCode::ExpectedExpression)?;
                let value = self.parse_test()?;
                entries.push((Some(key), value));
            }
        }
        let (_, _, end) = self.expect(Token::RBrace, ErrorCode::UnclosedParen)?;
        Ok(Expr::Dict(entries, Loc::new(start, end)))
    }
}

fn marker_param(name: &str) -> Param {
    Param {
        name: name.to_owned(),
        kind: ParamKind::Marker,
        annotation: None,
        default: None,
    }
}

/// Only names, attributes, subscripts and (nested) unpacking of those
/// can be assigned to.
fn check_target(expr: &Expr) -> SyntaxResult<()> {
    match expr {
        Expr::Name(..) | Expr::Attribute(..) | Expr::Subscript(..) => Ok(()),
        Expr::Starred(inner, _) => check_target(inner),
        Expr::Tuple(items, _) | Expr::List(items, _) => items.iter().try_for_each(check_target),
        _ => {
            let loc = expr.get_loc();
            Err(SyntaxError::new(
                ErrorCode::InvalidAssignmentTarget,
                loc.start as usize,
                loc.end as usize,
            ))
        }
    }
}

/// Parse a whole setup script into statements.
pub fn parse(input: &str) -> SyntaxResult<Vec<Stmt>> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer)?;
    parser.parse_file()
}
