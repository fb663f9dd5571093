// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

// Tokenizer for simulation setup scripts.  Structured the same way as
// the equation lexer (lookahead char + bump), with the indentation
// bookkeeping needed for block structured source layered on top.

use std::collections::VecDeque;
use std::str::CharIndices;

use lazy_static::lazy_static;
use unicode_xid::UnicodeXID;

use crate::common::ErrorCode::*;
use crate::common::{ErrorCode, SyntaxError};


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token<'input> {
    Newline,
    Indent,
    Dedent,

    False,
    NoneLit,
    True,
    And,
    As,
    Assert,
    Async,
    Await,
    Break,
    Class,
    Continue,
    Def,
    Del,
    Elif,
    Else,
    Except,
    Finally,
    For,
    From,
    Global,
    If,
    Import,
    In,
    Is,
    Lambda,
    Nonlocal,
    Not,
    Or,
    Pass,
    Raise,
    Return,
    Try,
    While,
    With,
    Yield,

    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    At,
    Amp,
    Pipe,
    Caret,
    Tilde,
    LShift,
    RShift,
    Lt,
    Gt,
    Lte,
    Gte,
    EqEq,
    Neq,
    Assign,
    Walrus,
    Arrow,
    AugAssign(&'input str),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Ellipsis,
    Question,

    Ident(&'input str),
    Num(&'input str),
    /// Full source text of a string literal, prefix and quotes included.
    Str(&'input str),
}

impl Token<'_> {
    fn is_layout(&self) -> bool {
        matches!(self, Token::Newline | Token::Indent | Token::Dedent)
    }
}

fn error<T>(code: ErrorCode, start: usize, end: usize) -> Result<T, SyntaxError> {
    Err(SyntaxError::new(code, start, end))
}

pub type Spanned<T> = (usize, T, usize);

const KEYWORDS: &[(&str, Token<'static>)] = &[
    ("False", Token::False),
    ("None", Token::NoneLit),
    ("True", Token::True),
    ("and", Token::And),
    ("as", Token::As),
    ("assert", Token::Assert),
    ("async", Token::Async),
    ("await", Token::Await),
    ("break", Token::Break),
    ("class", Token::Class),
    ("continue", Token::Continue),
    ("def", Token::Def),
    ("del", Token::Del),
    ("elif", Token::Elif),
    ("else", Token::Else),
    ("except", Token::Except),
    ("finally", Token::Finally),
    ("for", Token::For),
    ("from", Token::From),
    ("global", Token::Global),
    ("if", Token::If),
    ("import", Token::Import),
    ("in", Token::In),
    ("is", Token::Is),
    ("lambda", Token::Lambda),
    ("nonlocal", Token::Nonlocal),
    ("not", Token::Not),
    ("or", Token::Or),
    ("pass", Token::Pass),
    ("raise", Token::Raise),
    ("return", Token::Return),
    ("try", Token::Try),
    ("while", Token::While),
    ("with", Token::With),
    ("yield", Token::Yield),
];

// longest first, so a prefix never shadows a longer operator
const OPERATORS: &[(&str, Token<'static>)] = &[
    ("**=", Token::AugAssign("**=")),
    ("//=", Token::AugAssign("//=")),
    (">>=", Token::AugAssign(">>=")),
    ("<<=", Token::AugAssign("<<=")),
    ("...", Token::Ellipsis),
    ("**", Token::DoubleStar),
    ("//", Token::DoubleSlash),
    ("<<", Token::LShift),
    (">>", Token::RShift),
    ("<=", Token::Lte),
    (">=", Token::Gte),
    ("==", Token::EqEq),
    ("!=", Token::Neq),
    ("->", Token::Arrow),
    (":=", Token::Walrus),
    ("+=", Token::AugAssign("+=")),
    ("-=", Token::AugAssign("-=")),
    ("*=", Token::AugAssign("*=")),
    ("/=", Token::AugAssign("/=")),
    ("%=", Token::AugAssign("%=")),
    ("&=", Token::AugAssign("&=")),
    ("|=", Token::AugAssign("|=")),
    ("^=", Token::AugAssign("^=")),
    ("@=", Token::AugAssign("@=")),
    ("+", Token::Plus),
    ("-", Token::Minus),
    ("*", Token::Star),
    ("/", Token::Slash),
    ("%", Token::Percent),
    ("@", Token::At),
    ("&", Token::Amp),
    ("|", Token::Pipe),
    ("^", Token::Caret),
    ("~", Token::Tilde),
    ("<", Token::Lt),
    (">", Token::Gt),
    ("=", Token::Assign),
    ("(", Token::LParen),
    (")", Token::RParen),
    ("[", Token::LBracket),
    ("]", Token::RBracket),
    ("{", Token::LBrace),
    ("}", Token::RBrace),
    (",", Token::Comma),
    (":", Token::Colon),
    (";", Token::Semicolon),
    (".", Token::Dot),
    ("?", Token::Question),
];

const STRING_PREFIXES: &[&str] = &["r", "u", "b", "f", "br", "rb", "fr", "rf"];

const TAB_SIZE: usize = 8;

pub struct Lexer<'input> {
    text: &'input str,
    chars: CharIndices<'input>,
    lookahead: Option<(usize, char)>,
    /// offsets of currently open brackets; newlines inside them are
    /// insignificant
    brackets: Vec<usize>,
    indents: Vec<usize>,
    pending: VecDeque<Spanned<Token<'input>>>,
    at_line_start: bool,
    line_has_tokens: bool,
    finished: bool,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        let mut t = Lexer {
            text: input,
            chars: input.char_indices(),
            lookahead: None,
            brackets: vec![],
            indents: vec![0],
            pending: VecDeque::new(),
            at_line_start: true,
            line_has_tokens: false,
            finished: false,
        };
        t.bump();
        t
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        self.bump_n(1)
    }

    fn bump_n(&mut self, n: usize) -> Option<(usize, char)> {
        assert!(n > 0);
        self.lookahead = self.chars.nth(n - 1);
        self.lookahead
    }

    fn pos(&self) -> usize {
        match self.lookahead {
            Some((i, _)) => i,
            None => self.text.len(),
        }
    }

    fn take_while<F>(&mut self, mut keep_going: F) -> Option<usize>
    where
        F: FnMut(char) -> bool,
    {
        self.take_until(|c| !keep_going(c))
    }

    fn take_until<F>(&mut self, mut terminate: F) -> Option<usize>
    where
        F: FnMut(char) -> bool,
    {
        loop {
            match self.lookahead {
                None => {
                    return None;
                }
                Some((idx1, c)) => {
                    if terminate(c) {
                        return Some(idx1);
                    } else {
                        self.bump();
                    }
                }
            }
        }
    }

    /// Measure the indentation of the next non-blank line and queue the
    /// matching Indent/Dedent tokens.  Blank and comment-only lines are
    /// skipped entirely.
    fn indentation(&mut self) -> Result<(), SyntaxError> {
        loop {
            let mut col = 0;
            loop {
                match self.lookahead {
                    Some((_, ' ')) => col += 1,
                    Some((_, '\t')) => col = (col / TAB_SIZE + 1) * TAB_SIZE,
                    Some((_, '\x0c')) => col = 0,
                    Some((_, '\r')) => {}
                    _ => break,
                }
                self.bump();
            }

            match self.lookahead {
                None => return Ok(()),
                Some((_, '#')) => {
                    self.take_until(|c| c == '\n');
                    self.bump();
                }
                Some((_, '\n')) => {
                    self.bump();
                }
                Some((i, _)) => {
                    self.at_line_start = false;
                    return self.indent_to(col, i);
                }
            }
        }
    }

    fn indent_to(&mut self, col: usize, i: usize) -> Result<(), SyntaxError> {
        let top = self.indents.last().copied().unwrap_or(0);
        if col > top {
            self.indents.push(col);
            self.pending.push_back((i, Token::Indent, i));
            return Ok(());
        }
        while col < self.indents.last().copied().unwrap_or(0) {
            self.indents.pop();
            self.pending.push_back((i, Token::Dedent, i));
        }
        if self.indents.last().copied().unwrap_or(0) != col {
            return error(InconsistentDedent, i, i + 1);
        }
        Ok(())
    }

    fn end_of_input(&mut self) -> Option<Result<Spanned<Token<'input>>, SyntaxError>> {
        self.finished = true;
        let len = self.text.len();
        if let Some(&open) = self.brackets.last() {
            return Some(error(UnclosedParen, open, open + 1));
        }
        if self.line_has_tokens {
            self.line_has_tokens = false;
            self.pending.push_back((len, Token::Newline, len));
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.pending.push_back((len, Token::Dedent, len));
        }
        self.pending.pop_front().map(Ok)
    }

    fn word(&mut self, idx0: usize) -> Spanned<&'input str> {
        match self.take_while(is_identifier_continue) {
            Some(end) => (idx0, &self.text[idx0..end], end),
            None => (idx0, &self.text[idx0..], self.text.len()),
        }
    }

    fn identifierish(&mut self, idx0: usize) -> Result<Spanned<Token<'input>>, SyntaxError> {
        let (start, word, end) = self.word(idx0);

        if let Some((_, '"' | '\'')) = self.lookahead {
            let prefix = word.to_ascii_lowercase();
            if STRING_PREFIXES.contains(&prefix.as_str()) {
                return self.string(idx0);
            }
        }

        let tok = KEYWORDS
            .iter()
            .filter(|&&(w, _)| w == word)
            .map(|(_, t)| *t)
            .next()
            .unwrap_or(Token::Ident(word));

        Ok((start, tok, end))
    }

    fn number(&mut self, idx0: usize) -> Spanned<Token<'input>> {
        use regex::Regex;

        lazy_static! {
            static ref NUMBER_RE: Regex = Regex::new(
                r"^(?:0[xX][0-9a-fA-F_]+|0[oO][0-7_]+|0[bB][01_]+|(?:\d[\d_]*(?:\.[\d_]*)?|\.\d[\d_]*)(?:[eE][-+]?\d[\d_]*)?[jJ]?)"
            )
            .unwrap();
        }

        let len = NUMBER_RE
            .find(&self.text[idx0..])
            .map(|m| m.end())
            .unwrap_or(1);

        self.bump_n(len);

        let end = idx0 + len;
        (idx0, Token::Num(&self.text[idx0..end]), end)
    }

    /// Scan a string literal whose opening quote is the current
    /// lookahead.  `idx0` is the start of any prefix letters.
    fn string(&mut self, idx0: usize) -> Result<Spanned<Token<'input>>, SyntaxError> {
        let (qi, quote) = match self.lookahead {
            Some(la) => la,
            None => return error(UnclosedString, idx0, self.text.len()),
        };
        let delim = if quote == '"' { "\"\"\"" } else { "'''" };
        let triple = self.text[qi..].starts_with(delim);
        self.bump_n(if triple { 3 } else { 1 });

        loop {
            match self.lookahead {
                None => return error(UnclosedString, idx0, self.text.len()),
                Some((_, '\\')) => {
                    // the escaped char never terminates the literal
                    self.bump();
                    self.bump();
                }
                Some((i, '\n')) if !triple => return error(UnclosedString, idx0, i),
                Some((i, c)) if c == quote => {
                    if !triple {
                        self.bump();
                        return Ok((idx0, Token::Str(&self.text[idx0..i + 1]), i + 1));
                    }
                    if self.text[i..].starts_with(delim) {
                        self.bump_n(3);
                        return Ok((idx0, Token::Str(&self.text[idx0..i + 3]), i + 3));
                    }
                    self.bump();
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn operator(&mut self, i: usize) -> Option<Result<Spanned<Token<'input>>, SyntaxError>> {
        let rest = &self.text[i..];
        let (op, tok) = OPERATORS.iter().find(|(op, _)| rest.starts_with(op))?;
        let len = op.len();
        match tok {
            Token::LParen | Token::LBracket | Token::LBrace => self.brackets.push(i),
            Token::RParen | Token::RBracket | Token::RBrace => {
                if self.brackets.pop().is_none() {
                    self.bump_n(len);
                    return Some(error(UnrecognizedToken, i, i + len));
                }
            }
            _ => {}
        }
        self.bump_n(len);
        Some(Ok((i, *tok, i + len)))
    }

    fn next_token(&mut self) -> Option<Result<Spanned<Token<'input>>, SyntaxError>> {
        loop {
            if let Some(tok) = self.pending.pop_front() {
                return Some(Ok(tok));
            }
            if self.at_line_start && self.brackets.is_empty() {
                if let Err(err) = self.indentation() {
                    return Some(Err(err));
                }
                if let Some(tok) = self.pending.pop_front() {
                    return Some(Ok(tok));
                }
            }

            return match self.lookahead {
                None => self.end_of_input(),
                Some((_, ' ' | '\t' | '\x0c' | '\r')) => {
                    self.bump();
                    continue;
                }
                Some((_, '#')) => {
                    self.take_until(|c| c == '\n');
                    continue;
                }
                Some((i, '\\')) => {
                    self.bump();
                    if let Some((_, '\r')) = self.lookahead {
                        self.bump();
                    }
                    match self.lookahead {
                        Some((_, '\n')) => {
                            self.bump();
                            continue;
                        }
                        _ => Some(error(UnrecognizedToken, i, i + 1)),
                    }
                }
                Some((i, '\n')) => {
                    self.bump();
                    if !self.brackets.is_empty() {
                        continue;
                    }
                    self.at_line_start = true;
                    if !self.line_has_tokens {
                        continue;
                    }
                    self.line_has_tokens = false;
                    Some(Ok((i, Token::Newline, i + 1)))
                }
                Some((i, '"' | '\'')) => Some(self.string(i)),
                Some((i, c)) if is_identifier_start(c) => Some(self.identifierish(i)),
                Some((i, c)) if is_number_start(c, &self.text[i..]) => Some(Ok(self.number(i))),
                Some((i, _)) => match self.operator(i) {
                    Some(result) => Some(result),
                    None => {
                        self.bump(); // eat whatever is killing us
                        Some(error(UnrecognizedToken, i, self.pos()))
                    }
                },
            };
        }
    }
}

impl<'input> Iterator for Lexer<'input> {
    type Item = Result<Spanned<Token<'input>>, SyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished && self.pending.is_empty() {
            return None;
        }
        let result = self.next_token();
        match result {
            Some(Ok((_, ref tok, _))) if !tok.is_layout() => self.line_has_tokens = true,
            Some(Err(_)) => {
                self.finished = true;
                self.pending.clear();
            }
            _ => {}
        }
        result
    }
}

fn is_number_start(c: char, rest: &str) -> bool {
    c.is_ascii_digit()
        || (c == '.'
            && rest
                .as_bytes()
                .get(1)
                .map(|b| b.is_ascii_digit())
                .unwrap_or(false))
}

fn is_identifier_start(c: char) -> bool {
    UnicodeXID::is_xid_start(c) || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    UnicodeXID::is_xid_continue(c)
}

/// Decoded value of a string literal token: prefix and quotes are
/// removed and escapes processed (except for raw strings).
pub fn unquote(raw: &str) -> String {
    let body_start = raw.find(['\'', '"']).unwrap_or(0);
    let prefix = raw[..body_start].to_ascii_lowercase();
    let rest = &raw[body_start..];
    let quote_len = if rest.starts_with("\"\"\"") || rest.starts_with("'''") {
        3
    } else {
        1
    };
    if rest.len() < 2 * quote_len {
        return String::new();
    }
    let body = &rest[quote_len..rest.len() - quote_len];
    if prefix.contains('r') {
        body.to_owned()
    } else {
        unescape(body)
    }
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some(e @ ('x' | 'u' | 'U')) => {
                let width = match e {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = (0..width)
                    .filter_map(|_| chars.next_if(|d| d.is_ascii_hexdigit()))
                    .collect();
                match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if digits.len() == width => out.push(decoded),
                    _ => {
                        out.push('\\');
                        out.push(e);
                        out.push_str(&digits);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
