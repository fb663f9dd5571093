// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;
use std::{error, io, result};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoError, // will never be produced
    Io,
    JsonDeserialization,
    JsonSerialization,
    // lexing
    UnrecognizedToken,
    UnclosedString,
    UnclosedParen,
    InconsistentDedent,
    UnexpectedIndent,
    // parsing
    UnrecognizedEof,
    ExpectedExpression,
    ExpectedIdent,
    ExpectedBlock,
    ExpectedNewline,
    InvalidAssignmentTarget,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            NoError => "no_error",
            Io => "io",
            JsonDeserialization => "json_deserialization",
            JsonSerialization => "json_serialization",
            UnrecognizedToken => "unrecognized_token",
            UnclosedString => "unclosed_string",
            UnclosedParen => "unclosed_paren",
            InconsistentDedent => "inconsistent_dedent",
            UnexpectedIndent => "unexpected_indent",
            UnrecognizedEof => "unrecognized_eof",
            ExpectedExpression => "expected_expression",
            ExpectedIdent => "expected_ident",
            ExpectedBlock => "expected_block",
            ExpectedNewline => "expected_newline",
            InvalidAssignmentTarget => "invalid_assignment_target",
        };

        write!(f, "{name}")
    }
}

/// A problem found while tokenizing or parsing host source, located by
/// byte offsets into the input text.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SyntaxError {
    pub start: usize,
    pub end: usize,
    pub code: ErrorCode,
}

impl SyntaxError {
    pub fn new(code: ErrorCode, start: usize, end: usize) -> Self {
        SyntaxError { start, end, code }
    }

    /// Attach a human readable `line:column` position, computed
    /// against the text the offsets refer to.
    pub fn into_error(self, source: &str) -> Error {
        let (line, col) = line_col(source, self.start);
        Error::new(
            ErrorKind::Import,
            self.code,
            Some(format!("line {line}, column {col}")),
        )
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.start, self.end, self.code)
    }
}

impl From<SyntaxError> for Error {
    fn from(err: SyntaxError) -> Self {
        Error::new(
            ErrorKind::Import,
            err.code,
            Some(format!("bytes {}..{}", err.start, err.end)),
        )
    }
}

/// 1-based line and column for a byte offset.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let prefix = &source.as_bytes()[..offset];
    let line = prefix.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = prefix
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    (line, offset - line_start + 1)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Import,
    Export,
    Model,
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub details: Option<String>,
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            code: ErrorCode::Io,
            details: Some(err.to_string()),
        }
    }
}

impl Error {
    pub fn new(kind: ErrorKind, code: ErrorCode, details: Option<String>) -> Self {
        Error {
            kind,
            code,
            details,
        }
    }

    pub fn get_details(&self) -> Option<String> {
        self.details.clone()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Import => "ImportError",
            ErrorKind::Export => "ExportError",
            ErrorKind::Model => "ModelError",
            ErrorKind::Io => "IoError",
        };
        match self.details {
            Some(ref details) => write!(f, "{}{{{}: {}}}", kind, self.code, details),
            None => write!(f, "{}{{{}}}", kind, self.code),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;
pub type SyntaxResult<T> = result::Result<T, SyntaxError>;

#[test]
fn test_line_col() {
    let src = "a = 1\nbb = 2\n  c";
    assert_eq!((1, 1), line_col(src, 0));
    assert_eq!((1, 5), line_col(src, 4));
    assert_eq!((2, 1), line_col(src, 6));
    assert_eq!((3, 3), line_col(src, 15));
    // offsets past the end clamp to the last position
    assert_eq!((3, 4), line_col(src, 500));
}

#[test]
fn test_error_display() {
    let err = Error::new(
        ErrorKind::Import,
        ErrorCode::UnclosedString,
        Some("line 3, column 7".to_owned()),
    );
    assert_eq!("ImportError{unclosed_string: line 3, column 7}", err.to_string());

    let err = Error::new(ErrorKind::Export, ErrorCode::JsonSerialization, None);
    assert_eq!("ExportError{json_serialization}", err.to_string());
}

#[test]
fn test_syntax_error_location() {
    let src = "x = 1\ny = (\n";
    let err = SyntaxError::new(ErrorCode::UnclosedParen, 10, 11).into_error(src);
    assert_eq!(ErrorKind::Import, err.kind);
    assert_eq!(ErrorCode::UnclosedParen, err.code);
    assert_eq!(Some("line 2, column 5".to_owned()), err.details);
}

#[test]
fn test_io_error_conversion() {
    let io_err = io::Error::new(io::ErrorKind::NotFound, "template missing");
    let err: Error = io_err.into();
    assert_eq!(ErrorKind::Io, err.kind);
    assert_eq!(ErrorCode::Io, err.code);
    assert!(err.to_string().contains("template missing"));
}
