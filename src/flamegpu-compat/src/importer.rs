// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Recovery of a model from a host simulation script.
//!
//! The script is never executed.  A single pass over the syntax tree
//! recognises the call shapes the code generator writes (agent
//! creation, variable and property declarations, function registration,
//! message wiring, logging and layers) wherever they appear, and ignores
//! everything else.  Local names bound to those calls are tracked as
//! handles so that later calls through them resolve.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, trace};

use flamegpu_engine::ast::{Expr, Stmt, Value, Visitor, walk_expr, walk_stmt};
use flamegpu_engine::datamodel::{
    Agent, AgentFunction, AgentVariable, Connection, GlobalVariable, Layer, LoggingMode,
    MessageType, Project, VariableType, function_ref,
};
use flamegpu_engine::literal::{UNRESOLVED, strip_brackets};
use flamegpu_engine::{Result, parser, scheme};

/// Colors handed out to agents in the order they are discovered.
pub const DEFAULT_PALETTE: [&str; 10] = [
    "#e6194B", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6",
    "#bcf60c", "#fabebe",
];

type FunctionKey = (String, String);

/// The right hand side of a simple `name = value` assignment.
#[derive(Clone, Debug)]
struct Assigned {
    text: String,
    value: Option<Value>,
    /// Call results are host objects, never model constants.
    is_call: bool,
}

/// Source text of a value as the model stores it: numbers and numeric
/// lists in canonical form, anything else verbatim.
fn literal_text(expr: &Expr, source: &str) -> String {
    match expr.literal_value() {
        Some(Value::Bool(b)) => (b as i64).to_string(),
        Some(v @ (Value::Int(_) | Value::Float(_) | Value::List(_))) => v.to_source(),
        _ => expr.get_loc().text(source).trim().to_owned(),
    }
}

/// Text made only of unresolved markers, like `?` or `[?, ?, ?]`.
fn is_unresolved(text: &str) -> bool {
    strip_brackets(text)
        .split(',')
        .all(|part| part.trim() == UNRESOLVED)
}

fn starts_uppercase(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

fn array_of(var_type: VariableType) -> VariableType {
    match var_type {
        VariableType::Int | VariableType::ArrayInt => VariableType::ArrayInt,
        VariableType::UInt8 | VariableType::ArrayUInt => VariableType::ArrayUInt,
        _ => VariableType::ArrayFloat,
    }
}

/// Category of a plain module constant, from the shape of its value.
fn infer_global_type(value: Option<&Value>) -> VariableType {
    match value {
        Some(Value::Bool(_) | Value::Int(_)) => VariableType::Int,
        Some(Value::Float(_)) => VariableType::Float,
        Some(Value::List(items)) if !items.is_empty() && items.iter().all(Value::is_int) => {
            VariableType::ArrayInt
        }
        Some(Value::List(items)) if items.iter().all(Value::is_number) => VariableType::ArrayFloat,
        _ => VariableType::default(),
    }
}

/// Best effort category for a message we never saw constructed.  This
/// goes by naming convention only and is easily fooled.
fn guess_message_type(message: &str) -> MessageType {
    let message = message.to_lowercase();
    if message.contains("spatial") {
        MessageType::Spatial3D
    } else if message.contains("grid") || message.contains("array") {
        MessageType::Array3D
    } else if message.contains("bucket") {
        MessageType::Bucket
    } else {
        MessageType::None
    }
}

struct Importer<'a> {
    source: &'a str,

    assignments: HashMap<String, Assigned>,
    assignment_order: Vec<String>,
    /// Names whose value was used as something other than a constant.
    consumed: HashSet<String>,

    agent_handles: HashMap<String, String>,
    function_handles: HashMap<String, FunctionKey>,
    /// Keyed by both message name and local handle name.
    message_types: HashMap<String, MessageType>,
    layer_handles: HashMap<String, String>,
    log_handles: HashMap<String, String>,

    agents: Vec<Agent>,
    layers: Vec<Layer>,
    env_properties: Vec<GlobalVariable>,
    logging: HashMap<(String, String), LoggingMode>,
    /// First function seen producing each message.
    producers: HashMap<String, FunctionKey>,
    /// Message each consuming function reads, in first-seen order.
    consumers: Vec<(FunctionKey, String)>,
}

impl<'a> Importer<'a> {
    fn new(source: &'a str) -> Self {
        Importer {
            source,
            assignments: HashMap::new(),
            assignment_order: vec![],
            consumed: HashSet::new(),
            agent_handles: HashMap::new(),
            function_handles: HashMap::new(),
            message_types: HashMap::new(),
            layer_handles: HashMap::new(),
            log_handles: HashMap::new(),
            agents: vec![],
            layers: vec![],
            env_properties: vec![],
            logging: HashMap::new(),
            producers: HashMap::new(),
            consumers: vec![],
        }
    }

    fn agent_mut(&mut self, name: &str) -> &mut Agent {
        let i = match self.agents.iter().position(|a| a.name == name) {
            Some(i) => i,
            None => {
                let color = DEFAULT_PALETTE[self.agents.len() % DEFAULT_PALETTE.len()];
                debug!(agent = name, color, "found agent");
                self.agents.push(Agent::new(name, color));
                self.agents.len() - 1
            }
        };
        &mut self.agents[i]
    }

    fn function_mut(&mut self, agent: &str, function: &str) -> &mut AgentFunction {
        let agent = self.agent_mut(agent);
        let i = match agent.functions.iter().position(|f| f.name == function) {
            Some(i) => i,
            None => {
                debug!(agent = %agent.name, function, "found agent function");
                agent.functions.push(AgentFunction::new(
                    function,
                    MessageType::None,
                    MessageType::None,
                ));
                agent.functions.len() - 1
            }
        };
        &mut agent.functions[i]
    }

    fn layer_mut(&mut self, name: &str) -> &mut Layer {
        let i = match self.layers.iter().position(|l| l.name == name) {
            Some(i) => i,
            None => {
                debug!(layer = name, "found layer");
                self.layers.push(Layer::new(name, &[]));
                self.layers.len() - 1
            }
        };
        &mut self.layers[i]
    }

    /// The text a call argument stands for, looking through one name.
    fn value_text(&self, expr: &Expr) -> String {
        if let Some(assigned) = expr.as_name().and_then(|name| self.assignments.get(name)) {
            return assigned.text.clone();
        }
        literal_text(expr, self.source)
    }

    fn resolve_string(&self, expr: &Expr) -> Option<String> {
        match expr {
            Expr::Str(s, _) => Some(s.clone()),
            Expr::Name(name, _) => match self.assignments.get(name)?.value.as_ref()? {
                Value::Str(s) => Some(s.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    fn message_type(&self, message: &str) -> MessageType {
        match self.message_types.get(message) {
            Some(message_type) => *message_type,
            None => guess_message_type(message),
        }
    }

    fn resolve_agent(&mut self, expr: &Expr) -> Option<String> {
        if let Some(name) = expr.as_name() {
            return self.agent_handles.get(name).cloned();
        }
        let (_, method, args) = expr.method_call()?;
        if method != scheme::NEW_AGENT {
            return None;
        }
        let agent = self.resolve_string(args.first()?)?;
        self.agent_mut(&agent);
        Some(agent)
    }

    fn register_function(&mut self, receiver: &Expr, args: &[Expr]) -> Option<FunctionKey> {
        let agent = self.resolve_agent(receiver)?;
        let function = self.resolve_string(args.first()?)?;
        if let Some(file) = args.get(1).and_then(Expr::as_name) {
            self.consumed.insert(file.to_owned());
        }
        self.function_mut(&agent, &function);
        Some((agent, function))
    }

    /// Functions are reached through a handle, their registration call,
    /// or a wiring call chained onto either.
    fn resolve_function(&mut self, expr: &Expr) -> Option<FunctionKey> {
        if let Some(name) = expr.as_name() {
            return self.function_handles.get(name).cloned();
        }
        let (receiver, method, args) = expr.method_call()?;
        match method {
            scheme::NEW_FUNCTION_FILE => self.register_function(receiver, args),
            scheme::SET_MESSAGE_OUTPUT | scheme::SET_MESSAGE_INPUT => {
                self.resolve_function(receiver)
            }
            _ => None,
        }
    }

    fn resolve_layer(&mut self, expr: &Expr) -> Option<String> {
        if let Some(name) = expr.as_name() {
            return self.layer_handles.get(name).cloned();
        }
        let (_, method, args) = expr.method_call()?;
        if method != scheme::NEW_LAYER && method != scheme::GET_LAYER {
            return None;
        }
        let layer = self.resolve_string(args.first()?)?;
        self.layer_mut(&layer);
        Some(layer)
    }

    fn resolve_log(&self, expr: &Expr) -> Option<String> {
        if let Some(name) = expr.as_name() {
            return self.log_handles.get(name).cloned();
        }
        let (receiver, method, args) = expr.method_call()?;
        if method != scheme::LOG_AGENT || receiver.as_name() != Some(scheme::LOGGING_CONFIG_HANDLE) {
            return None;
        }
        self.resolve_string(args.first()?)
    }

    fn register_message(&mut self, method: &str, args: &[Expr]) -> Option<MessageType> {
        let message_type = scheme::message_type_for_constructor(method)?;
        let message = self.resolve_string(args.first()?)?;
        debug!(%message, %message_type, "found message");
        self.message_types.insert(message, message_type);
        Some(message_type)
    }

    fn resolve_message(&mut self, expr: &Expr) -> Option<MessageType> {
        if let Some(name) = expr.as_name() {
            return self.message_types.get(name).copied();
        }
        let (_, method, args) = expr.method_call()?;
        self.register_message(method, args)
    }

    fn record_assignment(&mut self, name: &str, value: &Expr) {
        let assigned = match value.as_name().and_then(|other| self.assignments.get(other)) {
            Some(other) => other.clone(),
            None => Assigned {
                text: literal_text(value, self.source),
                value: value.literal_value(),
                is_call: matches!(value, Expr::Call(..)),
            },
        };
        if self.assignments.insert(name.to_owned(), assigned).is_none() {
            self.assignment_order.push(name.to_owned());
        }

        let name = name.to_owned();
        if let Some(agent) = self.resolve_agent(value) {
            self.agent_handles.insert(name, agent);
        } else if let Some(function) = self.resolve_function(value) {
            self.function_handles.insert(name, function);
        } else if let Some(layer) = self.resolve_layer(value) {
            self.layer_handles.insert(name, layer);
        } else if let Some(agent) = self.resolve_log(value) {
            self.log_handles.insert(name, agent);
        } else if let Some(message_type) = self.resolve_message(value) {
            self.message_types.insert(name, message_type);
        }
    }

    fn is_handle(&self, name: &str) -> bool {
        self.agent_handles.contains_key(name)
            || self.function_handles.contains_key(name)
            || self.message_types.contains_key(name)
            || self.layer_handles.contains_key(name)
            || self.log_handles.contains_key(name)
    }

    fn set_env_property(&mut self, global: GlobalVariable) {
        debug!(
            global = %global.name,
            var_type = %global.var_type,
            is_macro = global.is_macro,
            "found environment property"
        );
        match self.env_properties.iter_mut().find(|g| g.name == global.name) {
            Some(existing) => *existing = global,
            None => self.env_properties.push(global),
        }
    }

    fn env_property(&mut self, var_type: VariableType, args: &[Expr]) -> Option<()> {
        let name = self.resolve_string(args.first()?)?;
        let mut value = args.get(1).map(|arg| self.value_text(arg)).unwrap_or_default();
        if var_type.is_array() {
            value = strip_brackets(&value).to_owned();
        }
        self.set_env_property(GlobalVariable::new(&name, &value, var_type, false));
        Some(())
    }

    fn macro_property(&mut self, method: &str, args: &[Expr]) -> Option<()> {
        let name = self.resolve_string(args.first()?)?;
        let dims = args.get(1..).unwrap_or_default();
        let (var_type, value) = if dims.len() > 1 {
            let value = dims
                .iter()
                .map(|dim| self.value_text(dim))
                .collect::<Vec<_>>()
                .join(", ");
            (VariableType::Shape, value)
        } else {
            let var_type = scheme::macro_type_for_method(method).unwrap_or_default();
            match dims.first() {
                Some(dim) => {
                    let text = self.value_text(dim);
                    let is_list = dim.is_list_literal()
                        || matches!(
                            dim.as_name().and_then(|n| self.assignments.get(n)),
                            Some(Assigned { value: Some(Value::List(_)), .. })
                        );
                    if is_list {
                        (array_of(var_type), strip_brackets(&text).to_owned())
                    } else {
                        (var_type, text)
                    }
                }
                None => (var_type, String::new()),
            }
        };
        self.set_env_property(GlobalVariable::new(&name, &value, var_type, true));
        Some(())
    }

    fn agent_variable(&mut self, agent: &str, var_type: VariableType, args: &[Expr]) -> Option<()> {
        let name = self.resolve_string(args.first()?)?;
        // array contents are set on populations, not declarations
        let default = if var_type.is_array() {
            String::new()
        } else {
            args.get(1).map(|arg| self.value_text(arg)).unwrap_or_default()
        };
        debug!(agent, variable = %name, %var_type, "found agent variable");
        let agent = self.agent_mut(agent);
        if agent.variable(&name).is_none() {
            agent
                .variables
                .push(AgentVariable::new(&name, &default, var_type));
        }
        Some(())
    }

    fn wire_message(&mut self, method: &str, receiver: &Expr, args: &[Expr]) -> Option<()> {
        let key = self.resolve_function(receiver)?;
        let message = self.resolve_string(args.first()?)?;
        let message_type = self.message_type(&message);
        debug!(
            agent = %key.0,
            function = %key.1,
            %message,
            %message_type,
            method,
            "found message wiring"
        );
        let function = self.function_mut(&key.0, &key.1);
        if method == scheme::SET_MESSAGE_OUTPUT {
            function.output = message_type;
            self.producers.entry(message).or_insert(key);
        } else {
            function.input = message_type;
            match self.consumers.iter_mut().find(|(k, _)| *k == key) {
                Some(consumer) => consumer.1 = message,
                None => self.consumers.push((key, message)),
            }
        }
        Some(())
    }

    fn add_layer_function(&mut self, receiver: &Expr, args: &[Expr]) -> Option<()> {
        let layer = self.resolve_layer(receiver)?;
        let agent = self.resolve_string(args.first()?)?;
        let function = self.resolve_string(args.get(1)?)?;
        debug!(%layer, %agent, %function, "found layer function");
        self.layer_mut(&layer)
            .functions
            .push(function_ref(&agent, &function));
        Some(())
    }

    fn log_variable(&mut self, mode: LoggingMode, receiver: &Expr, args: &[Expr]) -> Option<()> {
        let agent = self.resolve_log(receiver)?;
        let variable = self.resolve_string(args.first()?)?;
        debug!(%agent, %variable, mode = mode.as_str(), "found logged variable");
        self.logging.insert((agent, variable), mode);
        Some(())
    }

    /// React to `receiver.method(args)`.  None means the call isn't one
    /// the model cares about.
    fn visit_call(&mut self, receiver: &Expr, method: &str, args: &[Expr]) -> Option<()> {
        if receiver.as_name() == Some(scheme::ENV_HANDLE) {
            if let Some(var_type) = scheme::env_type_for_method(method) {
                return self.env_property(var_type, args);
            }
            if method.starts_with(scheme::MACRO_PROPERTY_PREFIX) {
                return self.macro_property(method, args);
            }
        }

        if let Some(var_type) = scheme::variable_type_for_method(method) {
            let agent = self.resolve_agent(receiver)?;
            return self.agent_variable(&agent, var_type, args);
        }

        if let Some(mode) = scheme::logging_mode_for_method(method) {
            return self.log_variable(mode, receiver, args);
        }

        if scheme::message_type_for_constructor(method).is_some() {
            return self.register_message(method, args).map(|_| ());
        }

        match method {
            scheme::NEW_AGENT => {
                let agent = self.resolve_string(args.first()?)?;
                self.agent_mut(&agent);
                Some(())
            }
            scheme::NEW_FUNCTION_FILE => self.register_function(receiver, args).map(|_| ()),
            scheme::SET_MESSAGE_OUTPUT | scheme::SET_MESSAGE_INPUT => {
                self.wire_message(method, receiver, args)
            }
            scheme::NEW_LAYER | scheme::GET_LAYER => {
                let layer = self.resolve_string(args.first()?)?;
                self.layer_mut(&layer);
                Some(())
            }
            scheme::ADD_AGENT_FUNCTION => self.add_layer_function(receiver, args),
            _ => None,
        }
    }

    fn globals(&mut self) -> Vec<GlobalVariable> {
        let mut env_properties = std::mem::take(&mut self.env_properties);
        let mut globals = vec![];

        for name in self.assignment_order.iter() {
            if !starts_uppercase(name) || self.is_handle(name) || self.consumed.contains(name) {
                continue;
            }
            let Some(assigned) = self.assignments.get(name) else {
                continue;
            };
            if assigned.is_call {
                continue;
            }
            let var_type = infer_global_type(assigned.value.as_ref());
            let text = if var_type.is_array() {
                strip_brackets(&assigned.text).to_owned()
            } else {
                assigned.text.clone()
            };

            match env_properties.iter().position(|g| g.name == *name) {
                Some(i) => {
                    let mut global = env_properties.remove(i);
                    if global.value.is_empty() {
                        global.value = text;
                    }
                    globals.push(global);
                }
                None if is_unresolved(&assigned.text) => {
                    trace!(global = %name, "skipping unresolved constant");
                }
                None => globals.push(GlobalVariable::new(name, &text, var_type, false)),
            }
        }

        globals.extend(env_properties);
        globals
    }

    fn finish(mut self) -> Project {
        for agent in self.agents.iter_mut() {
            for var in agent.variables.iter_mut() {
                let key = (agent.name.clone(), var.name.clone());
                if let Some(mode) = self.logging.get(&key) {
                    var.logging = *mode;
                }
            }
        }

        let mut connections = vec![];
        for ((agent, function), message) in self.consumers.iter() {
            let Some((src_agent, src_function)) = self.producers.get(message) else {
                debug!(%agent, %function, %message, "no producer for message input");
                continue;
            };
            connections.push(Connection::new(
                &function_ref(src_agent, src_function),
                &function_ref(agent, function),
                self.message_type(message),
            ));
        }

        let globals = self.globals();

        info!(
            agents = self.agents.len(),
            layers = self.layers.len(),
            globals = globals.len(),
            connections = connections.len(),
            "recovered model from script"
        );

        Project {
            agents: self.agents,
            layers: self.layers,
            globals,
            connections,
            visualization: None,
        }
    }
}

impl Visitor for Importer<'_> {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::FunctionDef { name, .. } | Stmt::ClassDef { name, .. } => {
                trace!(definition = %name, "not walking definition body");
            }
            Stmt::Assign(targets, value, _) => {
                if let [target] = targets.as_slice() {
                    if let Some(name) = target.as_name() {
                        self.record_assignment(name, value);
                    }
                }
                walk_stmt(self, stmt);
            }
            _ => walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        if let Some((receiver, method, args)) = expr.method_call() {
            if self.visit_call(receiver, method, args).is_none() {
                trace!(method, "ignoring call");
            }
        }
        walk_expr(self, expr);
    }
}

/// Recover a model from script text.  Fails only when the text isn't
/// valid host source.
pub fn import_source(source: &str) -> Result<Project> {
    let program = parser::parse(source).map_err(|err| err.into_error(source))?;
    let mut importer = Importer::new(source);
    for stmt in program.iter() {
        importer.visit_stmt(stmt);
    }
    Ok(importer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_guesses() {
        assert_eq!(MessageType::Spatial3D, guess_message_type("Boid_SPATIAL_msg"));
        assert_eq!(MessageType::Array3D, guess_message_type("cell_grid"));
        assert_eq!(MessageType::Array3D, guess_message_type("array_msg"));
        assert_eq!(MessageType::Bucket, guess_message_type("edges_bucket"));
        assert_eq!(MessageType::None, guess_message_type("location"));
        // first match wins
        assert_eq!(MessageType::Spatial3D, guess_message_type("spatial_grid"));
    }

    #[test]
    fn global_inference() {
        let infer = |v: Value| infer_global_type(Some(&v));
        assert_eq!(VariableType::Int, infer(Value::Bool(true)));
        assert_eq!(VariableType::Int, infer(Value::Int(3)));
        assert_eq!(VariableType::Float, infer(Value::Float(0.5)));
        assert_eq!(
            VariableType::ArrayInt,
            infer(Value::List(vec![Value::Int(1), Value::Int(2)]))
        );
        assert_eq!(
            VariableType::ArrayFloat,
            infer(Value::List(vec![Value::Int(1), Value::Float(2.0)]))
        );
        assert_eq!(VariableType::ArrayFloat, infer(Value::List(vec![])));
        assert_eq!(VariableType::Float, infer(Value::Str("a".to_owned())));
        assert_eq!(VariableType::Float, infer_global_type(None));
    }

    #[test]
    fn unresolved_text() {
        assert!(is_unresolved("?"));
        assert!(is_unresolved("[?, ?, ?]"));
        assert!(!is_unresolved("[?, 1]"));
        assert!(!is_unresolved(""));
    }

    #[test]
    fn palette_cycles() {
        let mut importer = Importer::new("");
        for i in 0..12 {
            importer.agent_mut(&format!("A{i}"));
        }
        assert_eq!("#e6194B", importer.agents[0].color);
        assert_eq!("#fabebe", importer.agents[9].color);
        assert_eq!("#e6194B", importer.agents[10].color);
        // existing agents keep their color
        importer.agent_mut("A1");
        assert_eq!(12, importer.agents.len());
    }

    #[test]
    fn literal_texts() {
        let text = |src: &str| {
            let program = parser::parse(src).unwrap();
            match &program[0] {
                Stmt::Expr(e, _) => literal_text(e, src),
                other => panic!("unexpected {other:?}"),
            }
        };
        assert_eq!("-9.8", text("-9.8\n"));
        assert_eq!("1000", text("1_000\n"));
        assert_eq!("1", text("True\n"));
        assert_eq!("[1, 2.5]", text("[1, 2.5]\n"));
        assert_eq!("[10, 20]", text("10, 20\n"));
        assert_eq!("\"move.cpp\"", text("\"move.cpp\"\n"));
        assert_eq!("N * 2", text("N * 2\n"));
        assert_eq!("?", text("?\n"));
    }
}
