// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Syntax tree for setup scripts.
//!
//! The tree is deliberately close to the surface syntax: the importer
//! only cares about the shape of calls and about recovering the source
//! text of arguments, so every node carries the byte span it came from.

use crate::literal::format_float;

#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct Loc {
    pub start: u32,
    pub end: u32,
}

impl Loc {
    pub fn new(start: usize, end: usize) -> Self {
        Loc {
            start: start as u32,
            end: end as u32,
        }
    }

    pub fn merge(a: Loc, b: Loc) -> Self {
        Loc {
            start: a.start.min(b.start),
            end: a.end.max(b.end),
        }
    }

    /// The text this span covers, or an empty string if the span doesn't
    /// belong to `source`.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source
            .get(self.start as usize..self.end as usize)
            .unwrap_or("")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Positive,
    Negative,
    Not,
    Invert,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    MatMul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitAnd,
    BitOr,
    BitXor,
}

impl BinaryOp {
    /// Operator for an augmented assignment token such as `+=`.
    pub fn from_augmented(op: &str) -> Option<Self> {
        let op = op.strip_suffix('=')?;
        let op = match op {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "@" => BinaryOp::MatMul,
            "/" => BinaryOp::Div,
            "//" => BinaryOp::FloorDiv,
            "%" => BinaryOp::Mod,
            "**" => BinaryOp::Pow,
            "<<" => BinaryOp::LShift,
            ">>" => BinaryOp::RShift,
            "&" => BinaryOp::BitAnd,
            "|" => BinaryOp::BitOr,
            "^" => BinaryOp::BitXor,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    Is,
    IsNot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompKind {
    List,
    Set,
    Dict,
    Generator,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompFor {
    pub target: Expr,
    pub iter: Expr,
    pub ifs: Vec<Expr>,
    pub is_async: bool,
}

/// A keyword argument; `name` is None for `**mapping`.
#[derive(Clone, Debug, PartialEq)]
pub struct Keyword {
    pub name: Option<String>,
    pub value: Expr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Normal,
    VarArgs,
    KwArgs,
    /// bare `*` or `/` markers in a parameter list
    Marker,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
    pub annotation: Option<Expr>,
    pub default: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Name(String, Loc),
    /// numeric literal, as written
    Num(String, Loc),
    /// string literal (adjacent literals already concatenated), decoded
    Str(String, Loc),
    Bool(bool, Loc),
    NoneLit(Loc),
    Ellipsis(Loc),
    /// the `?` marker left in generated scripts for unknown values
    Placeholder(Loc),
    Attribute(Box<Expr>, String, Loc),
    Subscript(Box<Expr>, Box<Expr>, Loc),
    Slice(Option<Box<Expr>>, Option<Box<Expr>>, Option<Box<Expr>>, Loc),
    Call(Box<Expr>, Vec<Expr>, Vec<Keyword>, Loc),
    Starred(Box<Expr>, Loc),
    Op1(UnaryOp, Box<Expr>, Loc),
    Op2(BinaryOp, Box<Expr>, Box<Expr>, Loc),
    Logical(BoolOp, Box<Expr>, Box<Expr>, Loc),
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>, Loc),
    /// `body if test else orelse`, stored as (test, body, orelse)
    If(Box<Expr>, Box<Expr>, Box<Expr>, Loc),
    Lambda(Vec<Param>, Box<Expr>, Loc),
    Walrus(String, Box<Expr>, Loc),
    Await(Box<Expr>, Loc),
    Yield(Option<Box<Expr>>, Loc),
    List(Vec<Expr>, Loc),
    Tuple(Vec<Expr>, Loc),
    Set(Vec<Expr>, Loc),
    /// entries with a None key are `**mapping` spreads
    Dict(Vec<(Option<Expr>, Expr)>, Loc),
    /// element (key for dicts), dict value, generators
    Comprehension(CompKind, Box<Expr>, Option<Box<Expr>>, Vec<CompFor>, Loc),
}

impl Expr {
    pub fn get_loc(&self) -> Loc {
        match self {
            Expr::Name(_, loc) => *loc,
            Expr::Num(_, loc) => *loc,
            Expr::Str(_, loc) => *loc,
            Expr::Bool(_, loc) => *loc,
            Expr::NoneLit(loc) => *loc,
            Expr::Ellipsis(loc) => *loc,
            Expr::Placeholder(loc) => *loc,
            Expr::Attribute(_, _, loc) => *loc,
            Expr::Subscript(_, _, loc) => *loc,
            Expr::Slice(_, _, _, loc) => *loc,
            Expr::Call(_, _, _, loc) => *loc,
            Expr::Starred(_, loc) => *loc,
            Expr::Op1(_, _, loc) => *loc,
            Expr::Op2(_, _, _, loc) => *loc,
            Expr::Logical(_, _, _, loc) => *loc,
            Expr::Compare(_, _, loc) => *loc,
            Expr::If(_, _, _, loc) => *loc,
            Expr::Lambda(_, _, loc) => *loc,
            Expr::Walrus(_, _, loc) => *loc,
            Expr::Await(_, loc) => *loc,
            Expr::Yield(_, loc) => *loc,
            Expr::List(_, loc) => *loc,
            Expr::Tuple(_, loc) => *loc,
            Expr::Set(_, loc) => *loc,
            Expr::Dict(_, loc) => *loc,
            Expr::Comprehension(_, _, _, _, loc) => *loc,
        }
    }

    /// Name of the method for a call of the form `receiver.method(...)`,
    /// along with the receiver expression.
    pub fn method_call(&self) -> Option<(&Expr, &str, &[Expr])> {
        match self {
            Expr::Call(func, args, _, _) => match func.as_ref() {
                Expr::Attribute(receiver, method, _) => {
                    Some((receiver.as_ref(), method.as_str(), args.as_slice()))
                }
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Expr::Name(name, _) => Some(name),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expr::Str(s, _) => Some(s),
            _ => None,
        }
    }

    pub fn is_list_literal(&self) -> bool {
        matches!(self, Expr::List(..) | Expr::Tuple(..))
    }

    /// Evaluate an expression built only from literals: numbers,
    /// strings, booleans, None, signed numbers and lists/tuples of those.
    pub fn literal_value(&self) -> Option<Value> {
        match self {
            Expr::Num(text, _) => parse_number(text),
            Expr::Str(s, _) => Some(Value::Str(s.clone())),
            Expr::Bool(b, _) => Some(Value::Bool(*b)),
            Expr::NoneLit(_) => Some(Value::None),
            Expr::Op1(op @ (UnaryOp::Positive | UnaryOp::Negative), operand, _) => {
                let negate = *op == UnaryOp::Negative;
                match operand.literal_value()? {
                    Value::Int(n) if negate => Some(n.checked_neg().map_or(Value::Float(-(n as f64)), Value::Int)),
                    Value::Float(n) if negate => Some(Value::Float(-n)),
                    Value::Bool(b) if negate => Some(Value::Int(-(b as i64))),
                    Value::Bool(b) => Some(Value::Int(b as i64)),
                    v @ (Value::Int(_) | Value::Float(_)) => Some(v),
                    _ => None,
                }
            }
            Expr::List(items, _) | Expr::Tuple(items, _) => items
                .iter()
                .map(Expr::literal_value)
                .collect::<Option<Vec<_>>>()
                .map(Value::List),
            _ => None,
        }
    }
}

/// The value of a literal expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn to_source(&self) -> String {
        match self {
            Value::None => "None".to_owned(),
            Value::Bool(true) => "True".to_owned(),
            Value::Bool(false) => "False".to_owned(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => format_float(*n),
            Value::Str(s) => format!("{s:?}"),
            Value::List(items) => {
                let items: Vec<String> = items.iter().map(Value::to_source).collect();
                format!("[{}]", items.join(", "))
            }
        }
    }
}

/// Numeric literal text to a value.  Imaginary literals aren't values
/// we can represent and yield None.
pub fn parse_number(text: &str) -> Option<Value> {
    let clean: String = text.chars().filter(|&c| c != '_').collect();
    let lower = clean.to_ascii_lowercase();
    if lower.ends_with('j') {
        return None;
    }
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if let Some(digits) = lower.strip_prefix(prefix) {
            return i64::from_str_radix(digits, radix).ok().map(Value::Int);
        }
    }
    if lower.contains(['.', 'e']) {
        return lower.parse::<f64>().ok().map(Value::Float);
    }
    match lower.parse::<i64>() {
        Ok(n) => Some(Value::Int(n)),
        Err(_) => lower.parse::<f64>().ok().map(Value::Float),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Alias {
    pub name: String,
    pub asname: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExceptHandler {
    pub kind: Option<Expr>,
    pub name: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WithItem {
    pub context: Expr,
    pub target: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Expr(Expr, Loc),
    /// `a = b = value` keeps every target, left to right
    Assign(Vec<Expr>, Expr, Loc),
    AugAssign(Expr, BinaryOp, Expr, Loc),
    AnnAssign(Expr, Expr, Option<Expr>, Loc),
    Pass(Loc),
    Break(Loc),
    Continue(Loc),
    Return(Option<Expr>, Loc),
    Raise(Option<Expr>, Option<Expr>, Loc),
    Global(Vec<String>, Loc),
    Nonlocal(Vec<String>, Loc),
    Del(Vec<Expr>, Loc),
    Assert(Expr, Option<Expr>, Loc),
    Import(Vec<Alias>, Loc),
    /// module path keeps any leading dots of a relative import
    ImportFrom(String, Vec<Alias>, Loc),
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
        loc: Loc,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
        is_async: bool,
        loc: Loc,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
        loc: Loc,
    },
    Try {
        body: Vec<Stmt>,
        handlers: Vec<ExceptHandler>,
        orelse: Vec<Stmt>,
        finalbody: Vec<Stmt>,
        loc: Loc,
    },
    With {
        items: Vec<WithItem>,
        body: Vec<Stmt>,
        is_async: bool,
        loc: Loc,
    },
    FunctionDef {
        name: String,
        params: Vec<Param>,
        returns: Option<Expr>,
        body: Vec<Stmt>,
        decorators: Vec<Expr>,
        is_async: bool,
        loc: Loc,
    },
    ClassDef {
        name: String,
        bases: Vec<Expr>,
        keywords: Vec<Keyword>,
        body: Vec<Stmt>,
        decorators: Vec<Expr>,
        loc: Loc,
    },
}

impl Stmt {
    pub fn get_loc(&self) -> Loc {
        match self {
            Stmt::Expr(_, loc)
            | Stmt::Assign(_, _, loc)
            | Stmt::AugAssign(_, _, _, loc)
            | Stmt::AnnAssign(_, _, _, loc)
            | Stmt::Pass(loc)
            | Stmt::Break(loc)
            | Stmt::Continue(loc)
            | Stmt::Return(_, loc)
            | Stmt::Raise(_, _, loc)
            | Stmt::Global(_, loc)
            | Stmt::Nonlocal(_, loc)
            | Stmt::Del(_, loc)
            | Stmt::Assert(_, _, loc)
            | Stmt::Import(_, loc)
            | Stmt::ImportFrom(_, _, loc) => *loc,
            Stmt::If { loc, .. }
            | Stmt::For { loc, .. }
            | Stmt::While { loc, .. }
            | Stmt::Try { loc, .. }
            | Stmt::With { loc, .. }
            | Stmt::FunctionDef { loc, .. }
            | Stmt::ClassDef { loc, .. } => *loc,
        }
    }
}

/// Pre-order traversal over statements and expressions.  Implementors
/// override the hooks they care about and call the matching `walk_*`
/// function to keep descending.
pub trait Visitor {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

fn visit_all<V: Visitor + ?Sized>(v: &mut V, stmts: &[Stmt]) {
    for stmt in stmts {
        v.visit_stmt(stmt);
    }
}

fn visit_params<V: Visitor + ?Sized>(v: &mut V, params: &[Param]) {
    for param in params {
        if let Some(annotation) = &param.annotation {
            v.visit_expr(annotation);
        }
        if let Some(default) = &param.default {
            v.visit_expr(default);
        }
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::Expr(e, _) => v.visit_expr(e),
        Stmt::Assign(targets, value, _) => {
            for target in targets {
                v.visit_expr(target);
            }
            v.visit_expr(value);
        }
        Stmt::AugAssign(target, _, value, _) => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        Stmt::AnnAssign(target, annotation, value, _) => {
            v.visit_expr(target);
            v.visit_expr(annotation);
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
        Stmt::Pass(_)
        | Stmt::Break(_)
        | Stmt::Continue(_)
        | Stmt::Global(_, _)
        | Stmt::Nonlocal(_, _)
        | Stmt::Import(_, _)
        | Stmt::ImportFrom(_, _, _) => {}
        Stmt::Return(value, _) => {
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
        Stmt::Raise(exc, cause, _) => {
            for e in [exc, cause].into_iter().flatten() {
                v.visit_expr(e);
            }
        }
        Stmt::Del(targets, _) => {
            for target in targets {
                v.visit_expr(target);
            }
        }
        Stmt::Assert(test, msg, _) => {
            v.visit_expr(test);
            if let Some(msg) = msg {
                v.visit_expr(msg);
            }
        }
        Stmt::If {
            test, body, orelse, ..
        }
        | Stmt::While {
            test, body, orelse, ..
        } => {
            v.visit_expr(test);
            visit_all(v, body);
            visit_all(v, orelse);
        }
        Stmt::For {
            target,
            iter,
            body,
            orelse,
            ..
        } => {
            v.visit_expr(target);
            v.visit_expr(iter);
            visit_all(v, body);
            visit_all(v, orelse);
        }
        Stmt::Try {
            body,
            handlers,
            orelse,
            finalbody,
            ..
        } => {
            visit_all(v, body);
            for handler in handlers {
                if let Some(kind) = &handler.kind {
                    v.visit_expr(kind);
                }
                visit_all(v, &handler.body);
            }
            visit_all(v, orelse);
            visit_all(v, finalbody);
        }
        Stmt::With { items, body, .. } => {
            for item in items {
                v.visit_expr(&item.context);
                if let Some(target) = &item.target {
                    v.visit_expr(target);
                }
            }
            visit_all(v, body);
        }
        Stmt::FunctionDef {
            params,
            returns,
            body,
            decorators,
            ..
        } => {
            for d in decorators {
                v.visit_expr(d);
            }
            visit_params(v, params);
            if let Some(returns) = returns {
                v.visit_expr(returns);
            }
            visit_all(v, body);
        }
        Stmt::ClassDef {
            bases,
            keywords,
            body,
            decorators,
            ..
        } => {
            for d in decorators {
                v.visit_expr(d);
            }
            for base in bases {
                v.visit_expr(base);
            }
            for kw in keywords {
                v.visit_expr(&kw.value);
            }
            visit_all(v, body);
        }
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) {
    match expr {
        Expr::Name(..)
        | Expr::Num(..)
        | Expr::Str(..)
        | Expr::Bool(..)
        | Expr::NoneLit(_)
        | Expr::Ellipsis(_)
        | Expr::Placeholder(_) => {}
        Expr::Attribute(value, _, _) => v.visit_expr(value),
        Expr::Subscript(value, index, _) => {
            v.visit_expr(value);
            v.visit_expr(index);
        }
        Expr::Slice(lower, upper, step, _) => {
            for e in [lower, upper, step].into_iter().flatten() {
                v.visit_expr(e);
            }
        }
        Expr::Call(func, args, keywords, _) => {
            v.visit_expr(func);
            for arg in args {
                v.visit_expr(arg);
            }
            for kw in keywords {
                v.visit_expr(&kw.value);
            }
        }
        Expr::Starred(e, _) | Expr::Op1(_, e, _) | Expr::Walrus(_, e, _) | Expr::Await(e, _) => {
            v.visit_expr(e)
        }
        Expr::Op2(_, l, r, _) | Expr::Logical(_, l, r, _) => {
            v.visit_expr(l);
            v.visit_expr(r);
        }
        Expr::Compare(left, rest, _) => {
            v.visit_expr(left);
            for (_, e) in rest {
                v.visit_expr(e);
            }
        }
        Expr::If(test, body, orelse, _) => {
            v.visit_expr(test);
            v.visit_expr(body);
            v.visit_expr(orelse);
        }
        Expr::Lambda(params, body, _) => {
            visit_params(v, params);
            v.visit_expr(body);
        }
        Expr::Yield(value, _) => {
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
        Expr::List(items, _) | Expr::Tuple(items, _) | Expr::Set(items, _) => {
            for item in items {
                v.visit_expr(item);
            }
        }
        Expr::Dict(entries, _) => {
            for (key, value) in entries {
                if let Some(key) = key {
                    v.visit_expr(key);
                }
                v.visit_expr(value);
            }
        }
        Expr::Comprehension(_, elt, value, generators, _) => {
            for generator in generators {
                v.visit_expr(&generator.iter);
                v.visit_expr(&generator.target);
                for cond in &generator.ifs {
                    v.visit_expr(cond);
                }
            }
            v.visit_expr(elt);
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
    }
}

#[test]
fn test_loc_basics() {
    let a = Loc::new(3, 7);
    let b = Loc::new(5, 12);
    assert_eq!(Loc::new(3, 12), Loc::merge(a, b));
    assert_eq!("lo w", Loc::new(3, 7).text("hello world"));
    assert_eq!("", Loc::new(30, 40).text("short"));
}

#[test]
fn test_parse_number() {
    assert_eq!(Some(Value::Int(42)), parse_number("42"));
    assert_eq!(Some(Value::Int(1000)), parse_number("1_000"));
    assert_eq!(Some(Value::Int(255)), parse_number("0xFF"));
    assert_eq!(Some(Value::Int(5)), parse_number("0b101"));
    assert_eq!(Some(Value::Float(0.5)), parse_number(".5"));
    assert_eq!(Some(Value::Float(1e3)), parse_number("1E3"));
    assert_eq!(None, parse_number("3j"));
    // too large for i64 degrades to a float
    assert_eq!(
        Some(Value::Float(1e20)),
        parse_number("100000000000000000000")
    );
}

#[test]
fn test_literal_value() {
    let loc = Loc::default();
    let neg = Expr::Op1(
        UnaryOp::Negative,
        Box::new(Expr::Num("9.8".to_owned(), loc)),
        loc,
    );
    assert_eq!(Some(Value::Float(-9.8)), neg.literal_value());

    let list = Expr::List(
        vec![
            Expr::Num("1".to_owned(), loc),
            Expr::Op1(UnaryOp::Negative, Box::new(Expr::Num("2".to_owned(), loc)), loc),
        ],
        loc,
    );
    assert_eq!(
        Some(Value::List(vec![Value::Int(1), Value::Int(-2)])),
        list.literal_value()
    );
    assert_eq!("[1, -2]", list.literal_value().unwrap().to_source());

    let not_literal = Expr::List(vec![Expr::Name("X".to_owned(), loc)], loc);
    assert_eq!(None, not_literal.literal_value());
    assert_eq!(
        None,
        Expr::Op1(UnaryOp::Negative, Box::new(Expr::Str("a".to_owned(), loc)), loc).literal_value()
    );
}
