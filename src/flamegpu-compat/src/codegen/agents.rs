// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use tracing::{debug, warn};

use flamegpu_engine::datamodel::{Agent, AgentFunction};
use flamegpu_engine::literal::{array_len_literal, format_literal};
use flamegpu_engine::scheme;

use super::{Inputs, UNWIRED_INPUT_MARKER};

pub(super) fn agent_handle(agent: &str) -> String {
    format!("{agent}_agent")
}

pub(super) fn function_file_handle(function: &str) -> String {
    format!("{function}_file")
}

pub(super) fn stub_file_name(function: &str) -> String {
    format!("{function}.cpp")
}

fn docstring_header(title: &str) -> String {
    format!("\"\"\"\n  {title}\n\"\"\"")
}

/// The stub file each function loads its device code from.
pub(super) fn render_function_files(agents: &[Agent]) -> String {
    let blocks: Vec<String> = agents
        .iter()
        .filter(|agent| !agent.functions.is_empty())
        .map(|agent| {
            let mut lines = vec![docstring_header(&agent.name)];
            lines.extend(agent.functions.iter().map(|f| {
                format!(
                    "{} = \"{}\"",
                    function_file_handle(&f.name),
                    stub_file_name(&f.name)
                )
            }));
            lines.join("\n")
        })
        .collect();

    if blocks.is_empty() {
        "# No agent function files declared".to_owned()
    } else {
        blocks.join("\n\n")
    }
}

fn function_line(agent: &Agent, function: &AgentFunction, inputs: &Inputs) -> Vec<String> {
    let handle = agent_handle(&agent.name);
    let mut lines = vec![];
    let mut call = format!(
        "{handle}.{}(\"{}\", {})",
        scheme::NEW_FUNCTION_FILE,
        function.name,
        function_file_handle(&function.name)
    );

    if let Some(message) = scheme::message_name(&agent.name, function.output) {
        call.push_str(&format!(".{}(\"{message}\")", scheme::SET_MESSAGE_OUTPUT));
    }

    if !function.input.is_none() {
        let source = inputs
            .source_agent(&agent.name, function)
            .and_then(|src| scheme::message_name(src, function.input));
        match source {
            Some(message) => {
                call.push_str(&format!(".{}(\"{message}\")", scheme::SET_MESSAGE_INPUT));
            }
            None => {
                warn!(
                    agent = %agent.name,
                    function = %function.name,
                    input = %function.input,
                    "no connection provides the message input"
                );
                lines.push(format!(
                    "{UNWIRED_INPUT_MARKER} for {}::{} ({} has no producer)",
                    agent.name, function.name, function.input
                ));
            }
        }
    }

    lines.push(call);
    lines
}

fn render_agent(agent: &Agent, inputs: &Inputs) -> String {
    let handle = agent_handle(&agent.name);
    let mut lines = vec![
        docstring_header(&format!("{} agent", agent.name)),
        format!("{handle} = model.{}(\"{}\")", scheme::NEW_AGENT, agent.name),
    ];

    for var in agent.variables.iter() {
        let method = scheme::variable_method(var.var_type);
        if var.var_type.is_array() {
            lines.push(format!(
                "{handle}.{method}(\"{}\", {})",
                var.name,
                array_len_literal(var.var_type, &var.default)
            ));
            lines.push(
                "# TODO: default array values must be explicitly defined when initializing agent populations"
                    .to_owned(),
            );
        } else {
            lines.push(format!(
                "{handle}.{method}(\"{}\", {})",
                var.name,
                format_literal(var.var_type, &var.default)
            ));
        }
    }

    for function in agent.functions.iter() {
        lines.extend(function_line(agent, function, inputs));
    }

    lines.join("\n")
}

pub(super) fn render_agents(agents: &[Agent], inputs: &Inputs) -> String {
    if agents.is_empty() {
        return "# No agents available".to_owned();
    }
    agents
        .iter()
        .map(|agent| {
            debug!(agent = %agent.name, "rendering agent");
            render_agent(agent, inputs)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
