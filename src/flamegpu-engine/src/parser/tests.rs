// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use super::parse;
use crate::ast::{BinaryOp, BoolOp, CmpOp, CompKind, Expr, ParamKind, Stmt, UnaryOp, Value};
use crate::common::{ErrorCode, SyntaxError};

fn parse_ok(input: &str) -> Vec<Stmt> {
    match parse(input) {
        Ok(body) => body,
        Err(err) => panic!("failed to parse {input:?}: {err:?}"),
    }
}

/// Parse a single expression statement and return its expression.
fn expr(input: &str) -> Expr {
    let mut body = parse_ok(input);
    assert_eq!(1, body.len(), "expected a single statement in {input:?}");
    match body.remove(0) {
        Stmt::Expr(e, _) => e,
        other => panic!("expected an expression statement, got {other:?}"),
    }
}

fn parse_err(input: &str) -> SyntaxError {
    match parse(input) {
        Ok(body) => panic!("expected {input:?} to fail, got {body:?}"),
        Err(err) => err,
    }
}

fn assert_err(input: &str, code: ErrorCode, span: &str) {
    let err = parse_err(input);
    let start = span.find('~').unwrap();
    let end = span.rfind('~').unwrap() + 1;
    assert_eq!(SyntaxError::new(code, start, end), err, "input: {input:?}");
}

#[test]
fn test_empty() {
    assert!(parse_ok("").is_empty());
    assert!(parse_ok("\n\n# just a comment\n").is_empty());
}

#[test]
fn test_assignment() {
    let src = "x = 1.5\n";
    let body = parse_ok(src);
    match &body[..] {
        [Stmt::Assign(targets, value, loc)] => {
            assert_eq!(1, targets.len());
            assert_eq!(Some("x"), targets[0].as_name());
            assert_eq!(Some(Value::Float(1.5)), value.literal_value());
            assert_eq!("x = 1.5", loc.text(src));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_chained_and_tuple_assignment() {
    let body = parse_ok("a = b = 3\nx, y = 1, 2\n");
    match &body[..] {
        [Stmt::Assign(chain, three, _), Stmt::Assign(unpack, pair, _)] => {
            assert_eq!(2, chain.len());
            assert_eq!(Some(Value::Int(3)), three.literal_value());
            assert!(matches!(&unpack[0], Expr::Tuple(items, _) if items.len() == 2));
            assert!(matches!(pair, Expr::Tuple(items, _) if items.len() == 2));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_aug_and_annotated_assignment() {
    let body = parse_ok("n += 1\nspeed: float = 2.0\nlabel: str\n");
    assert!(matches!(&body[0], Stmt::AugAssign(_, BinaryOp::Add, _, _)));
    assert!(matches!(&body[1], Stmt::AnnAssign(_, _, Some(_), _)));
    assert!(matches!(&body[2], Stmt::AnnAssign(_, _, None, _)));
}

#[test]
fn test_method_call() {
    let src = "env.newPropertyFloat(\"GRAVITY\", -9.8)\n";
    let e = expr(src);
    let (receiver, method, args) = e.method_call().unwrap();
    assert_eq!(Some("env"), receiver.as_name());
    assert_eq!("newPropertyFloat", method);
    assert_eq!(2, args.len());
    assert_eq!(Some("GRAVITY"), args[0].as_str());
    assert_eq!(Some(Value::Float(-9.8)), args[1].literal_value());
    assert_eq!("-9.8", args[1].get_loc().text(src));
    assert_eq!(
        "env.newPropertyFloat(\"GRAVITY\", -9.8)",
        e.get_loc().text(src)
    );
}

#[test]
fn test_chained_calls() {
    let src = "model.newLayer(\"l1\").addAgentFunction(\"Boid\", \"move\")\n";
    let e = expr(src);
    let (receiver, method, args) = e.method_call().unwrap();
    assert_eq!("addAgentFunction", method);
    assert_eq!(2, args.len());
    let (inner, inner_method, inner_args) = receiver.method_call().unwrap();
    assert_eq!("newLayer", inner_method);
    assert_eq!(Some("model"), inner.as_name());
    assert_eq!(Some("l1"), inner_args[0].as_str());
}

#[test]
fn test_keyword_arguments() {
    match expr("f(1, *rest, key=2, **opts)\n") {
        Expr::Call(_, args, keywords, _) => {
            assert_eq!(2, args.len());
            assert!(matches!(args[1], Expr::Starred(..)));
            assert_eq!(2, keywords.len());
            assert_eq!(Some("key".to_owned()), keywords[0].name);
            assert_eq!(None, keywords[1].name);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_precedence() {
    // 1 + 2 * 3 ** -x
    match expr("1 + 2 * 3 ** -x\n") {
        Expr::Op2(BinaryOp::Add, _, rhs, _) => match *rhs {
            Expr::Op2(BinaryOp::Mul, _, pow, _) => match *pow {
                Expr::Op2(BinaryOp::Pow, _, exp, _) => {
                    assert!(matches!(*exp, Expr::Op1(UnaryOp::Negative, _, _)));
                }
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        },
        other => panic!("unexpected {other:?}"),
    }

    // unary minus binds looser than power
    assert!(matches!(
        expr("-2 ** 2\n"),
        Expr::Op1(UnaryOp::Negative, _, _)
    ));

    // subtraction is left associative
    match expr("a - b - c\n") {
        Expr::Op2(BinaryOp::Sub, lhs, _, _) => {
            assert!(matches!(*lhs, Expr::Op2(BinaryOp::Sub, _, _, _)));
        }
        other => panic!("unexpected {other:?}"),
    }

    assert!(matches!(
        expr("a | b & c\n"),
        Expr::Op2(BinaryOp::BitOr, _, _, _)
    ));
}

#[test]
fn test_logical_and_comparison() {
    match expr("not a and b or c\n") {
        Expr::Logical(BoolOp::Or, lhs, _, _) => match *lhs {
            Expr::Logical(BoolOp::And, not_a, _, _) => {
                assert!(matches!(*not_a, Expr::Op1(UnaryOp::Not, _, _)));
            }
            other => panic!("unexpected {other:?}"),
        },
        other => panic!("unexpected {other:?}"),
    }

    match expr("0 <= x < 10\n") {
        Expr::Compare(_, rest, _) => {
            let ops: Vec<CmpOp> = rest.iter().map(|(op, _)| *op).collect();
            assert_eq!(vec![CmpOp::Lte, CmpOp::Lt], ops);
        }
        other => panic!("unexpected {other:?}"),
    }

    match expr("a not in b is not c\n") {
        Expr::Compare(_, rest, _) => {
            let ops: Vec<CmpOp> = rest.iter().map(|(op, _)| *op).collect();
            assert_eq!(vec![CmpOp::NotIn, CmpOp::IsNot], ops);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_conditional_and_lambda() {
    assert!(matches!(expr("a if c else b\n"), Expr::If(..)));
    match expr("lambda x, y=1, *args, **kw: x\n") {
        Expr::Lambda(params, _, _) => {
            let kinds: Vec<ParamKind> = params.iter().map(|p| p.kind).collect();
            assert_eq!(
                vec![
                    ParamKind::Normal,
                    ParamKind::Normal,
                    ParamKind::VarArgs,
                    ParamKind::KwArgs
                ],
                kinds
            );
            assert!(params[1].default.is_some());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_collections() {
    assert!(matches!(expr("[]\n"), Expr::List(items, _) if items.is_empty()));
    assert!(matches!(expr("()\n"), Expr::Tuple(items, _) if items.is_empty()));
    assert!(matches!(expr("(1,)\n"), Expr::Tuple(items, _) if items.len() == 1));
    assert!(matches!(expr("(1)\n"), Expr::Num(..)));
    assert!(matches!(expr("[1, 2, 3,]\n"), Expr::List(items, _) if items.len() == 3));
    assert!(matches!(expr("{}\n"), Expr::Dict(entries, _) if entries.is_empty()));
    assert!(matches!(expr("{1, 2}\n"), Expr::Set(items, _) if items.len() == 2));
    assert!(
        matches!(expr("{'a': 1, **rest}\n"), Expr::Dict(entries, _) if entries.len() == 2 && entries[1].0.is_none())
    );
}

#[test]
fn test_comprehensions() {
    assert!(matches!(
        expr("[x * 2 for x in range(10) if x % 2]\n"),
        Expr::Comprehension(CompKind::List, _, None, ref gens, _) if gens.len() == 1 && gens[0].ifs.len() == 1
    ));
    assert!(matches!(
        expr("{k: v for k, v in items}\n"),
        Expr::Comprehension(CompKind::Dict, _, Some(_), _, _)
    ));
    assert!(matches!(
        expr("{x for x in xs}\n"),
        Expr::Comprehension(CompKind::Set, ..)
    ));
    match expr("sum(x for x in xs)\n") {
        Expr::Call(_, args, _, _) => {
            assert!(matches!(
                args[0],
                Expr::Comprehension(CompKind::Generator, ..)
            ));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        expr("[a for row in grid for a in row]\n"),
        Expr::Comprehension(CompKind::List, _, _, ref gens, _) if gens.len() == 2
    ));
}

#[test]
fn test_subscripts_and_slices() {
    assert!(matches!(expr("a[0]\n"), Expr::Subscript(..)));
    match expr("a[1:2, ::3]\n") {
        Expr::Subscript(_, index, _) => match *index {
            Expr::Tuple(items, _) => {
                assert!(matches!(items[0], Expr::Slice(Some(_), Some(_), None, _)));
                assert!(matches!(items[1], Expr::Slice(None, None, Some(_), _)));
            }
            other => panic!("unexpected {other:?}"),
        },
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_strings_concatenate() {
    let e = expr("'abc' \"def\"\n");
    assert_eq!(Some("abcdef"), e.as_str());
    assert_eq!(Some("a\nb"), expr("'a\\nb'\n").as_str());
}

#[test]
fn test_placeholder() {
    let body = parse_ok("X_MAX = ?\nbounds = [?, ?]\n");
    match &body[..] {
        [Stmt::Assign(_, first, _), Stmt::Assign(_, second, _)] => {
            assert!(matches!(first, Expr::Placeholder(_)));
            assert!(matches!(second, Expr::List(items, _) if items.len() == 2));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_if_elif_else() {
    let src = "if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n";
    match &parse_ok(src)[..] {
        [Stmt::If { body, orelse, .. }] => {
            assert_eq!(1, body.len());
            match &orelse[..] {
                [Stmt::If { orelse, .. }] => assert_eq!(1, orelse.len()),
                other => panic!("unexpected {other:?}"),
            }
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_loops() {
    let src = "for i, agent in enumerate(agents):\n    if i > 2:\n        break\nelse:\n    pass\nwhile n:\n    n -= 1\n";
    match &parse_ok(src)[..] {
        [Stmt::For { target, orelse, .. }, Stmt::While { body, .. }] => {
            assert!(matches!(target, Expr::Tuple(items, _) if items.len() == 2));
            assert_eq!(1, orelse.len());
            assert_eq!(1, body.len());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_function_and_class() {
    let src = concat!(
        "@decorator\n",
        "class init(pyflamegpu.HostFunction):\n",
        "    def run(self, FLAMEGPU, *, scale: float = 1.0) -> None:\n",
        "        \"\"\"Doc.\"\"\"\n",
        "        return\n",
        "\n",
        "async def fetch():\n",
        "    await thing()\n",
    );
    match &parse_ok(src)[..] {
        [Stmt::ClassDef { name, bases, body, decorators, .. }, Stmt::FunctionDef { name: fetch, is_async, .. }] => {
            assert_eq!("init", name.as_str());
            assert_eq!(1, bases.len());
            assert_eq!(1, decorators.len());
            match &body[..] {
                [Stmt::FunctionDef { params, returns, body, .. }] => {
                    assert_eq!(4, params.len());
                    assert_eq!(ParamKind::Marker, params[2].kind);
                    assert!(params[3].annotation.is_some());
                    assert!(returns.is_some());
                    assert_eq!(2, body.len());
                }
                other => panic!("unexpected {other:?}"),
            }
            assert_eq!("fetch", fetch.as_str());
            assert!(*is_async);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_try_and_with() {
    let src = concat!(
        "try:\n",
        "    import pyflamegpu\n",
        "except ImportError as e:\n",
        "    raise SystemExit(1) from e\n",
        "finally:\n",
        "    pass\n",
        "with open(path) as f, lock:\n",
        "    data = f.read()\n",
    );
    match &parse_ok(src)[..] {
        [Stmt::Try { handlers, finalbody, .. }, Stmt::With { items, .. }] => {
            assert_eq!(1, handlers.len());
            assert_eq!(Some("e".to_owned()), handlers[0].name);
            assert_eq!(1, finalbody.len());
            assert_eq!(2, items.len());
            assert!(items[0].target.is_some());
            assert!(items[1].target.is_none());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_imports() {
    let src = "import sys, os.path as osp\nfrom . import a\nfrom ..pkg.mod import (b as c, d,)\nfrom x import *\n";
    match &parse_ok(src)[..] {
        [Stmt::Import(names, _), Stmt::ImportFrom(rel, _, _), Stmt::ImportFrom(module, aliases, _), Stmt::ImportFrom(_, star, _)] =>
        {
            assert_eq!("os.path", names[1].name);
            assert_eq!(Some("osp".to_owned()), names[1].asname);
            assert_eq!(".", rel.as_str());
            assert_eq!("..pkg.mod", module.as_str());
            assert_eq!(2, aliases.len());
            assert_eq!("*", star[0].name);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_simple_statement_suites() {
    let body = parse_ok("a = 1; b = 2;\nif x: y = 1; z = 2\n");
    assert_eq!(3, body.len());
    assert!(matches!(&body[2], Stmt::If { body, .. } if body.len() == 2));
}

#[test]
fn test_misc_statements() {
    let body = parse_ok(
        "global A, B\ndel x[0], y\nassert ok, 'msg'\nif (n := 10) > 5:\n    pass\ndef gen():\n    yield from xs\n",
    );
    assert!(matches!(&body[0], Stmt::Global(names, _) if names.len() == 2));
    assert!(matches!(&body[1], Stmt::Del(targets, _) if targets.len() == 2));
    assert!(matches!(&body[2], Stmt::Assert(_, Some(_), _)));
    match &body[3] {
        Stmt::If { test: Expr::Compare(lhs, _, _), .. } => {
            assert!(matches!(**lhs, Expr::Walrus(..)));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_no_trailing_newline() {
    let body = parse_ok("x = 1");
    assert_eq!(1, body.len());
    let body = parse_ok("def f():\n    return 1");
    assert_eq!(1, body.len());
}

#[test]
fn test_errors() {
    assert_err("x = \n", ErrorCode::ExpectedExpression, "    ~");
    assert_err("1 = x\n", ErrorCode::InvalidAssignmentTarget, "~");
    assert_err("f() = x\n", ErrorCode::InvalidAssignmentTarget, "~~~");
    assert_err("  x = 1\n", ErrorCode::UnexpectedIndent, "  ~");
    assert_err("if x:\npass\n", ErrorCode::ExpectedBlock, "      ~~~~");
    assert_err("x = 1 2\n", ErrorCode::ExpectedNewline, "      ~");
    assert_err("def (x):\n    pass\n", ErrorCode::ExpectedIdent, "    ~");
    assert_err("a.(b)\n", ErrorCode::ExpectedIdent, "  ~");
    // lexer errors surface unchanged
    assert_err("x = 'abc\n", ErrorCode::UnclosedString, "    ~~~~");
}

#[test]
fn test_eof_error() {
    let err = parse_err("x = (1 +");
    // unclosed bracket is found by the lexer before the parser runs
    assert_eq!(ErrorCode::UnclosedParen, err.code);

    let err = parse_err("x = 1 +");
    assert_eq!(ErrorCode::ExpectedExpression, err.code);
}
