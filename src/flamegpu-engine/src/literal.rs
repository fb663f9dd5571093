// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Formatting of model literal text into host source literals.
//!
//! Values in the datamodel are free text typed by a user.  Everything
//! here is total: text that doesn't parse degrades to zero (scalars) or
//! is dropped (array elements), it never errors.

use crate::datamodel::VariableType;

/// Marker left in generated text for values the model doesn't know.
pub const UNRESOLVED: &str = "?";

pub fn parse_int(raw: &str) -> i64 {
    raw.trim().parse::<i64>().unwrap_or(0)
}

pub fn parse_uint8(raw: &str) -> u8 {
    parse_int(raw).clamp(0, 255) as u8
}

pub fn parse_float(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(0.0)
}

/// Shortest text that reads back as the same f64, always carrying a
/// decimal point or exponent so it stays a float literal.
pub fn format_float(n: f64) -> String {
    if n.is_nan() {
        return "float('nan')".to_owned();
    }
    if n.is_infinite() {
        return if n > 0.0 {
            "float('inf')".to_owned()
        } else {
            "float('-inf')".to_owned()
        };
    }
    format!("{n:?}")
}

/// Strip one pair of enclosing square brackets, if present.
pub fn strip_brackets(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('[') && trimmed.ends_with(']') {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

fn array_parts(raw: &str) -> impl Iterator<Item = &str> {
    strip_brackets(raw)
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
}

pub fn parse_float_array(raw: &str) -> Vec<f64> {
    array_parts(raw)
        .filter_map(|part| part.parse::<f64>().ok())
        .collect()
}

pub fn parse_int_array(raw: &str) -> Vec<i64> {
    array_parts(raw)
        .filter_map(|part| part.parse::<i64>().ok())
        .collect()
}

/// Number of elements an array literal declares.  Elements that don't
/// parse as the array's element type are not counted.
pub fn array_len(var_type: VariableType, raw: &str) -> usize {
    match var_type {
        VariableType::ArrayFloat => parse_float_array(raw).len(),
        VariableType::ArrayInt | VariableType::ArrayUInt => parse_int_array(raw).len(),
        _ => 0,
    }
}

/// Array length as a literal, or the unresolved marker when the default
/// value doesn't declare any elements.
pub fn array_len_literal(var_type: VariableType, raw: &str) -> String {
    match array_len(var_type, raw) {
        0 => UNRESOLVED.to_owned(),
        n => n.to_string(),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ShapeDim {
    Size(f64),
    Unresolved,
    Symbol(String),
}

pub fn parse_shape(raw: &str) -> Vec<ShapeDim> {
    array_parts(raw)
        .map(|part| {
            if part == UNRESOLVED {
                ShapeDim::Unresolved
            } else if let Ok(n) = part.parse::<f64>() {
                ShapeDim::Size(n)
            } else {
                ShapeDim::Symbol(part.to_owned())
            }
        })
        .collect()
}

fn format_shape_dim(dim: &ShapeDim) -> String {
    match dim {
        ShapeDim::Size(n) => {
            let rounded = n.round();
            if (n - rounded).abs() < 1e-9 && rounded.abs() < 1e15 {
                format!("{}", rounded as i64)
            } else {
                format_float(*n)
            }
        }
        ShapeDim::Unresolved => UNRESOLVED.to_owned(),
        ShapeDim::Symbol(s) => s.clone(),
    }
}

pub fn format_shape(raw: &str) -> String {
    let dims = parse_shape(raw);
    if dims.is_empty() {
        return UNRESOLVED.to_owned();
    }
    dims.iter()
        .map(format_shape_dim)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render `raw` as a host literal of the given category.
pub fn format_literal(var_type: VariableType, raw: &str) -> String {
    match var_type {
        VariableType::Shape => format_shape(raw),
        VariableType::ArrayFloat => {
            let items: Vec<String> = parse_float_array(raw)
                .into_iter()
                .map(format_float)
                .collect();
            format!("[{}]", items.join(", "))
        }
        VariableType::ArrayInt | VariableType::ArrayUInt => {
            let items: Vec<String> = parse_int_array(raw)
                .into_iter()
                .map(|n| n.to_string())
                .collect();
            format!("[{}]", items.join(", "))
        }
        VariableType::Int => parse_int(raw).to_string(),
        VariableType::UInt8 => parse_uint8(raw).to_string(),
        VariableType::Float => format_float(parse_float(raw)),
    }
}

/// A numeric setting rendered as a float literal, or `fallback` when the
/// text is empty or not a number.
pub fn numeric_literal_or(raw: &str, fallback: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return fallback.to_owned();
    }
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => format_float(n),
        _ => fallback.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    #[test]
    fn scalars() {
        assert_eq!("-9.8", format_literal(VariableType::Float, "-9.8"));
        assert_eq!("0.0", format_literal(VariableType::Float, ""));
        assert_eq!("0.0", format_literal(VariableType::Float, "fast"));
        assert_eq!("1.0", format_literal(VariableType::Float, " 1 "));
        assert_eq!("42", format_literal(VariableType::Int, "42"));
        assert_eq!("0", format_literal(VariableType::Int, "4.2"));
        assert_eq!("-3", format_literal(VariableType::Int, "-3"));
        assert_eq!("255", format_literal(VariableType::UInt8, "1000"));
        assert_eq!("0", format_literal(VariableType::UInt8, "-5"));
        assert_eq!("7", format_literal(VariableType::UInt8, "7"));
    }

    #[test]
    fn arrays() {
        assert_eq!(
            "[1.0, 2.5, -3.0]",
            format_literal(VariableType::ArrayFloat, "1, 2.5, -3")
        );
        assert_eq!(
            "[1.0, 2.0]",
            format_literal(VariableType::ArrayFloat, "[1.0, 2.0]")
        );
        assert_eq!("[1, 3]", format_literal(VariableType::ArrayInt, "1, x, 3"));
        assert_eq!("[]", format_literal(VariableType::ArrayUInt, ""));
        assert_eq!(3, array_len(VariableType::ArrayFloat, "[0.0, 0.0, 0.0]"));
        assert_eq!(0, array_len(VariableType::Float, "1, 2"));
        assert_eq!("4", array_len_literal(VariableType::ArrayInt, "1,2,3,4"));
        assert_eq!("?", array_len_literal(VariableType::ArrayInt, ""));
    }

    #[test]
    fn float_array_parsing() {
        let parsed = parse_float_array("[1e-3, 2.5E2, junk, .5]");
        assert_eq!(3, parsed.len());
        assert!(approx_eq!(f64, 0.001, parsed[0], ulps = 2));
        assert!(approx_eq!(f64, 250.0, parsed[1], ulps = 2));
        assert!(approx_eq!(f64, 0.5, parsed[2], ulps = 2));
    }

    #[test]
    fn shapes() {
        assert_eq!("10, 20, ?", format_literal(VariableType::Shape, "10, 20.0, ?"));
        assert_eq!("2.5, N_CELLS", format_literal(VariableType::Shape, "[2.5, N_CELLS]"));
        assert_eq!("?", format_literal(VariableType::Shape, ""));
        assert_eq!(
            vec![ShapeDim::Size(3.0), ShapeDim::Unresolved],
            parse_shape("3, ?")
        );
    }

    #[test]
    fn numeric_settings() {
        assert_eq!("?", numeric_literal_or("", "?"));
        assert_eq!("?", numeric_literal_or("wide", "?"));
        assert_eq!("100.0", numeric_literal_or("100", "?"));
        assert_eq!("0.5", numeric_literal_or(" 0.5 ", "?"));
    }

    #[test]
    fn special_floats() {
        assert_eq!("float('inf')", format_float(f64::INFINITY));
        assert_eq!("float('nan')", format_float(f64::NAN));
        assert_eq!("-0.0", format_float(-0.0));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn int_literal_roundtrips(n in any::<i64>()) {
            let text = format_literal(VariableType::Int, &n.to_string());
            prop_assert_eq!(n, parse_int(&text));
        }

        #[test]
        fn uint8_literal_clamps(n in -1000i64..1000) {
            let text = format_literal(VariableType::UInt8, &n.to_string());
            let expected = n.clamp(0, 255) as u8;
            prop_assert_eq!(expected, parse_uint8(&text));
            prop_assert_eq!(expected.to_string(), text);
        }

        #[test]
        fn float_literal_roundtrips(n in any::<f64>().prop_filter("finite", |n| n.is_finite())) {
            let text = format_literal(VariableType::Float, &format_float(n));
            prop_assert_eq!(n.to_bits(), parse_float(&text).to_bits());
        }

        #[test]
        fn float_array_len_matches(items in prop::collection::vec(-1e6f64..1e6, 0..8)) {
            let raw = items.iter().map(|n| format_float(*n)).collect::<Vec<_>>().join(", ");
            prop_assert_eq!(items.len(), array_len(VariableType::ArrayFloat, &raw));
            prop_assert_eq!(items, parse_float_array(&format_literal(VariableType::ArrayFloat, &raw)));
        }
    }
}
