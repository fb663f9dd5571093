// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Device code scaffolds, one per agent function.  Variable access is
//! written out in full; behaviour and array sizes are left to the
//! modeller.

use tracing::debug;

use flamegpu_engine::datamodel::{
    Agent, AgentFunction, AgentVariable, MessageType, Project, VariableType,
};

use super::agents::stub_file_name;
use super::{ANY_STUB_TEMPLATE, Inputs, LOCATION_STUB_TEMPLATE, Stub};

const FUNCTION_NAME: &str = "[PLACEHOLDER_FUNCTION_NAME]";
const INPUT_MESSAGE: &str = "[PLACEHOLDER_INPUT_MESSAGE]";
const OUTPUT_MESSAGE: &str = "[PLACEHOLDER_OUTPUT_MESSAGE]";
const GET_AGENT_VARS: &str = "[PLACEHOLDER_GET_AGENT_VARS]";
const SET_AGENT_VARS: &str = "[PLACEHOLDER_SET_AGENT_VARS]";
const MESSAGE_OUTPUT: &str = "[PLACEHOLDER_MESSAGE_OUTPUT]";
const GET_MESSAGE_VARS: &str = "[PLACEHOLDER_GET_MESSAGE_VARS]";

const ARRAY_SIZE_WARNING: &str =
    "// WARNING: must be hard coded to the length declared in the model script";
const UNWIRED_WARNING: &str = "// WARNING: this function is not currently wired to any message source";

fn cpp_type(var_type: VariableType) -> &'static str {
    match var_type {
        VariableType::Int => "int",
        VariableType::UInt8 => "uint8_t",
        VariableType::ArrayFloat => "float",
        VariableType::ArrayInt | VariableType::ArrayUInt => "int",
        VariableType::Float | VariableType::Shape => "float",
    }
}

fn zero(ty: &str) -> &'static str {
    if ty == "float" { "0.0" } else { "0" }
}

fn indent(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("  {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn array_size(name: &str) -> String {
    format!("const uint8_t {name}_ARRAY_SIZE = ?; {ARRAY_SIZE_WARNING}")
}

fn agent_getters(agent: &Agent) -> Vec<String> {
    let mut lines = vec![];
    for AgentVariable { name, var_type, .. } in agent.variables.iter() {
        let ty = cpp_type(*var_type);
        if var_type.is_array() {
            lines.push(array_size(name));
            lines.push(format!("{ty} {name}[{name}_ARRAY_SIZE] = {{}};"));
            lines.push(format!("for (int i = 0; i < {name}_ARRAY_SIZE; i++) {{"));
            lines.push(format!(
                "  {name}[i] = FLAMEGPU->getVariable<{ty}, {name}_ARRAY_SIZE>(\"{name}\", i);"
            ));
            lines.push("}".to_owned());
        } else {
            lines.push(format!(
                "{ty} agent_{name} = FLAMEGPU->getVariable<{ty}>(\"{name}\");"
            ));
        }
    }
    lines
}

fn agent_setters(agent: &Agent) -> Vec<String> {
    let mut lines = vec![];
    for AgentVariable { name, var_type, .. } in agent.variables.iter() {
        let ty = cpp_type(*var_type);
        if var_type.is_array() {
            lines.push(format!("for (int i = 0; i < {name}_ARRAY_SIZE; i++) {{"));
            lines.push(format!(
                "  FLAMEGPU->setVariable<{ty}, {name}_ARRAY_SIZE>(\"{name}\", i, {name}[i]);"
            ));
            lines.push("}".to_owned());
        } else {
            lines.push(format!(
                "FLAMEGPU->setVariable<{ty}>(\"{name}\", agent_{name});"
            ));
        }
    }
    lines
}

fn message_output(agent: &Agent, output: MessageType) -> Vec<String> {
    if output.is_none() {
        return vec![];
    }
    let mut lines = vec![];
    for AgentVariable { name, var_type, .. } in agent.variables.iter() {
        let ty = cpp_type(*var_type);
        if var_type.is_array() {
            lines.push(format!("for (int i = 0; i < {name}_ARRAY_SIZE; i++) {{"));
            lines.push(format!(
                "  FLAMEGPU->message_out.setVariable<{ty}, {name}_ARRAY_SIZE>(\"{name}\", i, {name}[i]);"
            ));
            lines.push("}".to_owned());
        } else {
            lines.push(format!(
                "FLAMEGPU->message_out.setVariable<{ty}>(\"{name}\", agent_{name});"
            ));
        }
    }
    lines
}

fn iteration_header(input: MessageType) -> &'static str {
    match input {
        MessageType::Spatial3D => {
            "for (const auto &message : FLAMEGPU->message_in(agent_x, agent_y, agent_z)) {"
        }
        MessageType::Array3D => {
            "for (const auto &message : FLAMEGPU->message_in(/* TODO: provide grid coordinates */)) {"
        }
        MessageType::Bucket => {
            "for (const auto &message : FLAMEGPU->message_in(/* TODO: provide bucket index */)) {"
        }
        MessageType::None => "for (const auto &message : FLAMEGPU->message_in()) {",
    }
}

/// Locals for every field of the incoming message, filled in by a loop
/// over the messages.  Fields are those of the producing agent.
fn message_getters(source: Option<&Agent>, input: MessageType) -> Vec<String> {
    if input.is_none() {
        return vec![];
    }

    let variables: &[AgentVariable] = source
        .map(|agent| agent.variables.as_slice())
        .unwrap_or_default();
    let mut lines = vec!["//Define message variables (agent sending the input message)".to_owned()];
    let mut body = vec![];

    for AgentVariable { name, var_type, .. } in variables.iter() {
        let ty = cpp_type(*var_type);
        let local = format!("message_{name}");
        if var_type.is_array() {
            lines.push(array_size(&local));
            lines.push(format!("{ty} {local}[{local}_ARRAY_SIZE] = {{}};"));
            body.push(format!("  for (int i = 0; i < {local}_ARRAY_SIZE; i++) {{"));
            body.push(format!(
                "    {local}[i] = message.getVariable<{ty}, {local}_ARRAY_SIZE>(\"{name}\", i);"
            ));
            body.push("  }".to_owned());
        } else {
            lines.push(format!("{ty} {local} = {};", zero(ty)));
            body.push(format!("  {local} = message.getVariable<{ty}>(\"{name}\");"));
        }
    }

    if variables.is_empty() {
        if source.is_none() {
            lines.push(UNWIRED_WARNING.to_owned());
            body.push(format!("  {UNWIRED_WARNING}"));
        }
        lines.push("// TODO: initialise message variables as needed".to_owned());
        body.push("  // TODO: process incoming message data".to_owned());
    }

    lines.push(String::new());
    lines.push("//Loop through all agents sending input messages".to_owned());
    lines.push(iteration_header(input).to_owned());
    lines.extend(body);
    lines.push("}".to_owned());
    lines
}

fn render_stub(agent: &Agent, function: &AgentFunction, source: Option<&Agent>) -> String {
    let template = if function.output.is_none() {
        ANY_STUB_TEMPLATE
    } else {
        LOCATION_STUB_TEMPLATE
    };

    let slots = [
        (FUNCTION_NAME, function.name.clone()),
        (INPUT_MESSAGE, function.input.as_str().to_owned()),
        (OUTPUT_MESSAGE, function.output.as_str().to_owned()),
        (GET_AGENT_VARS, indent(&agent_getters(agent))),
        (SET_AGENT_VARS, indent(&agent_setters(agent))),
        (MESSAGE_OUTPUT, indent(&message_output(agent, function.output))),
        (GET_MESSAGE_VARS, indent(&message_getters(source, function.input))),
    ];

    let mut text = template.to_owned();
    for (token, block) in slots.iter() {
        text = text.replace(token, block);
    }
    text
}

pub(super) fn render_stubs(project: &Project, inputs: &Inputs) -> Vec<Stub> {
    let mut stubs = vec![];
    for agent in project.agents.iter() {
        for function in agent.functions.iter() {
            let source = inputs
                .source_agent(&agent.name, function)
                .and_then(|name| project.agent(name));
            debug!(
                agent = %agent.name,
                function = %function.name,
                source = source.map(|a| a.name.as_str()),
                "rendering function stub"
            );
            stubs.push(Stub {
                file_name: stub_file_name(&function.name),
                contents: render_stub(agent, function, source),
            });
        }
    }
    stubs
}
