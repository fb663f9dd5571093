// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

pub mod ast;
pub mod datamodel;
pub mod json;
pub mod literal;
pub mod parser;
pub mod scheme;
pub mod token;

pub use flamegpu_core::common;
pub use flamegpu_core::{Error, ErrorCode, ErrorKind, Result, SyntaxError, SyntaxResult};
