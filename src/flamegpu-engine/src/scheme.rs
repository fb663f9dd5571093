// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Host API method names for each model category.
//!
//! The code generator reads these rows forwards and the importer reads
//! them backwards; both sides go through this module so that a script
//! we write is a script we can read.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::datamodel::{LoggingMode, MessageType, VariableType};

/// Receiver name of the environment description in setup scripts.
pub const ENV_HANDLE: &str = "env";
/// Receiver name of the step logging configuration.
pub const LOGGING_CONFIG_HANDLE: &str = "logging_config";

pub const NEW_AGENT: &str = "newAgent";
pub const NEW_FUNCTION_FILE: &str = "newRTCFunctionFile";
pub const SET_MESSAGE_OUTPUT: &str = "setMessageOutput";
pub const SET_MESSAGE_INPUT: &str = "setMessageInput";
pub const NEW_LAYER: &str = "newLayer";
pub const GET_LAYER: &str = "Layer";
pub const ADD_AGENT_FUNCTION: &str = "addAgentFunction";
pub const LOG_AGENT: &str = "agent";
pub const LOG_COUNT: &str = "logCount";
pub const MACRO_PROPERTY_PREFIX: &str = "newMacroProperty";

/// Name of the reserved array field carried by bucket messages.
pub const BUCKET_LINKED_NODES: &str = "linked_nodes";

/// Agent and message variable declarations.  Shape has no variable
/// form and declares as Float.
const VARIABLE_METHODS: &[(VariableType, &str)] = &[
    (VariableType::Float, "newVariableFloat"),
    (VariableType::Int, "newVariableInt"),
    (VariableType::UInt8, "newVariableUInt8"),
    (VariableType::ArrayFloat, "newVariableArrayFloat"),
    (VariableType::ArrayInt, "newVariableArrayInt"),
    (VariableType::ArrayUInt, "newVariableArrayUInt"),
];

const ENV_PROPERTY_METHODS: &[(VariableType, &str)] = &[
    (VariableType::Float, "newPropertyFloat"),
    (VariableType::Int, "newPropertyInt"),
    (VariableType::UInt8, "newPropertyUInt"),
    (VariableType::ArrayFloat, "newPropertyArrayFloat"),
    (VariableType::ArrayInt, "newPropertyArrayInt"),
    (VariableType::ArrayUInt, "newPropertyArrayUInt"),
];

/// Macro properties only come in float and int flavours; the first row
/// for a method name is the category it reads back as.
const MACRO_PROPERTY_METHODS: &[(VariableType, &str)] = &[
    (VariableType::Float, "newMacroPropertyFloat"),
    (VariableType::Int, "newMacroPropertyInt"),
    (VariableType::UInt8, "newMacroPropertyInt"),
    (VariableType::ArrayFloat, "newMacroPropertyFloat"),
    (VariableType::ArrayInt, "newMacroPropertyInt"),
    (VariableType::ArrayUInt, "newMacroPropertyInt"),
    (VariableType::Shape, "newMacroPropertyFloat"),
];

const MACRO_PROPERTY_ACCESSORS: &[(VariableType, &str)] = &[
    (VariableType::Float, "getMacroPropertyFloat"),
    (VariableType::Int, "getMacroPropertyInt"),
    (VariableType::UInt8, "getMacroPropertyInt"),
    (VariableType::ArrayFloat, "getMacroPropertyFloat"),
    (VariableType::ArrayInt, "getMacroPropertyInt"),
    (VariableType::ArrayUInt, "getMacroPropertyInt"),
    (VariableType::Shape, "getMacroPropertyFloat"),
];

/// (category, constructor, name key used in generated message names)
const MESSAGE_CONSTRUCTORS: &[(MessageType, &str, &str)] = &[
    (MessageType::Spatial3D, "newMessageSpatial3D", "spatial"),
    (MessageType::Array3D, "newMessageArray3D", "grid"),
    (MessageType::Bucket, "newMessageBucket", "bucket"),
];

/// (mode, logging registration, per-step snapshot accessor)
const LOGGING_METHODS: &[(LoggingMode, &str, &str)] = &[
    (LoggingMode::Mean, "logMean", "getMean"),
    (LoggingMode::Min, "logMin", "getMinFloat"),
    (LoggingMode::Max, "logMax", "getMaxFloat"),
    (LoggingMode::Sum, "logSum", "getSumFloat"),
    (LoggingMode::Std, "logStandardDev", "getStandardDev"),
];

fn lookup(table: &[(VariableType, &'static str)], var_type: VariableType) -> Option<&'static str> {
    table
        .iter()
        .find(|(t, _)| *t == var_type)
        .map(|(_, method)| *method)
}

fn invert(table: &[(VariableType, &'static str)]) -> HashMap<&'static str, VariableType> {
    let mut inverse = HashMap::new();
    for (var_type, method) in table.iter() {
        inverse.entry(*method).or_insert(*var_type);
    }
    inverse
}

lazy_static! {
    static ref VARIABLE_TYPE_BY_METHOD: HashMap<&'static str, VariableType> =
        invert(VARIABLE_METHODS);
    static ref ENV_TYPE_BY_METHOD: HashMap<&'static str, VariableType> =
        invert(ENV_PROPERTY_METHODS);
    static ref MACRO_TYPE_BY_METHOD: HashMap<&'static str, VariableType> =
        invert(MACRO_PROPERTY_METHODS);
}

pub fn variable_method(var_type: VariableType) -> &'static str {
    lookup(VARIABLE_METHODS, var_type).unwrap_or("newVariableFloat")
}

/// Message fields are declared with the same methods as agent variables.
pub fn message_variable_method(var_type: VariableType) -> &'static str {
    variable_method(var_type)
}

pub fn env_property_method(var_type: VariableType) -> &'static str {
    lookup(ENV_PROPERTY_METHODS, var_type).unwrap_or("newPropertyFloat")
}

pub fn macro_property_method(var_type: VariableType) -> &'static str {
    lookup(MACRO_PROPERTY_METHODS, var_type).unwrap_or("newMacroPropertyFloat")
}

pub fn macro_property_accessor(var_type: VariableType) -> &'static str {
    lookup(MACRO_PROPERTY_ACCESSORS, var_type).unwrap_or("getMacroPropertyFloat")
}

pub fn message_constructor(message: MessageType) -> Option<&'static str> {
    MESSAGE_CONSTRUCTORS
        .iter()
        .find(|(m, _, _)| *m == message)
        .map(|(_, ctor, _)| *ctor)
}

pub fn message_key(message: MessageType) -> Option<&'static str> {
    MESSAGE_CONSTRUCTORS
        .iter()
        .find(|(m, _, _)| *m == message)
        .map(|(_, _, key)| *key)
}

/// Name of the message produced by `agent` for the given category, or
/// None for `MessageNone`.
pub fn message_name(agent: &str, message: MessageType) -> Option<String> {
    message_key(message).map(|key| format!("{agent}_{key}_location_message"))
}

pub fn logging_method(mode: LoggingMode) -> Option<&'static str> {
    LOGGING_METHODS
        .iter()
        .find(|(m, _, _)| *m == mode)
        .map(|(_, method, _)| *method)
}

pub fn step_log_accessor(mode: LoggingMode) -> Option<&'static str> {
    LOGGING_METHODS
        .iter()
        .find(|(m, _, _)| *m == mode)
        .map(|(_, _, accessor)| *accessor)
}

pub fn variable_type_for_method(method: &str) -> Option<VariableType> {
    VARIABLE_TYPE_BY_METHOD.get(method).copied()
}

pub fn env_type_for_method(method: &str) -> Option<VariableType> {
    ENV_TYPE_BY_METHOD.get(method).copied()
}

pub fn macro_type_for_method(method: &str) -> Option<VariableType> {
    MACRO_TYPE_BY_METHOD.get(method).copied()
}

pub fn message_type_for_constructor(constructor: &str) -> Option<MessageType> {
    MESSAGE_CONSTRUCTORS
        .iter()
        .find(|(_, ctor, _)| *ctor == constructor)
        .map(|(m, _, _)| *m)
}

pub fn logging_mode_for_method(method: &str) -> Option<LoggingMode> {
    LOGGING_METHODS
        .iter()
        .find(|(_, m, _)| *m == method)
        .map(|(mode, _, _)| *mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_methods_invert() {
        for var_type in VariableType::ALL.iter().filter(|t| **t != VariableType::Shape) {
            let method = variable_method(*var_type);
            assert_eq!(Some(*var_type), variable_type_for_method(method));
            let method = env_property_method(*var_type);
            assert_eq!(Some(*var_type), env_type_for_method(method));
        }
        assert_eq!("newVariableFloat", variable_method(VariableType::Shape));
        assert_eq!(None, variable_type_for_method("newVariableDouble"));
    }

    #[test]
    fn macro_methods_invert_to_scalars() {
        assert_eq!(
            Some(VariableType::Float),
            macro_type_for_method(macro_property_method(VariableType::ArrayFloat))
        );
        assert_eq!(
            Some(VariableType::Int),
            macro_type_for_method(macro_property_method(VariableType::UInt8))
        );
        assert_eq!(
            "getMacroPropertyFloat",
            macro_property_accessor(VariableType::Shape)
        );
    }

    #[test]
    fn message_tables() {
        assert_eq!(None, message_constructor(MessageType::None));
        assert_eq!(None, message_name("Cell", MessageType::None));
        assert_eq!(
            Some("Cell_spatial_location_message".to_owned()),
            message_name("Cell", MessageType::Spatial3D)
        );
        assert_eq!(
            Some("Grass_grid_location_message".to_owned()),
            message_name("Grass", MessageType::Array3D)
        );
        for message in MessageType::ALL.iter().filter(|m| !m.is_none()) {
            let ctor = message_constructor(*message).unwrap();
            assert_eq!(Some(*message), message_type_for_constructor(ctor));
        }
    }

    #[test]
    fn logging_tables() {
        assert_eq!(None, logging_method(LoggingMode::NoLog));
        assert_eq!(None, step_log_accessor(LoggingMode::NoLog));
        assert_eq!(Some("logStandardDev"), logging_method(LoggingMode::Std));
        for mode in LoggingMode::ALL.iter().filter(|m| m.is_enabled()) {
            let method = logging_method(*mode).unwrap();
            assert_eq!(Some(*mode), logging_mode_for_method(method));
        }
    }
}
