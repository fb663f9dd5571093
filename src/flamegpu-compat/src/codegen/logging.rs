// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use tracing::debug;

use flamegpu_engine::datamodel::Agent;
use flamegpu_engine::scheme;

/// Step log lines sit inside the template's `print_step_logs` loop.
const STEP_LOG_INDENT: &str = "            ";

/// Step logging registrations: a count for every agent plus one
/// aggregate per logged variable.
pub(super) fn render_logging(agents: &[Agent]) -> String {
    if agents.is_empty() {
        return "# No agents available for logging configuration".to_owned();
    }

    let blocks: Vec<String> = agents
        .iter()
        .map(|agent| {
            debug!(agent = %agent.name, "rendering logging");
            let handle = format!("{}_agent_log", agent.name);
            let mut lines = vec![
                format!(
                    "{handle} = {}.{}(\"{}\")",
                    scheme::LOGGING_CONFIG_HANDLE,
                    scheme::LOG_AGENT,
                    agent.name
                ),
                format!("{handle}.{}()", scheme::LOG_COUNT),
            ];
            for var in agent.variables.iter() {
                if let Some(method) = scheme::logging_method(var.logging) {
                    lines.push(format!("{handle}.{method}(\"{}\")", var.name));
                }
            }
            lines.join("\n")
        })
        .collect();

    blocks.join("\n")
}

/// Reads back, per step, what `render_logging` registered.
pub(super) fn render_agent_logs(agents: &[Agent]) -> String {
    if agents.is_empty() {
        return format!("{STEP_LOG_INDENT}# No agent logs configured");
    }

    let mut lines = vec![];
    for agent in agents.iter() {
        let name = &agent.name;
        let handle = format!("{name}_agents");
        lines.push(format!("{handle} = step.getAgent(\"{name}\")"));
        lines.push(format!(
            "print(\"{name} count:\", {handle}.getCount())"
        ));
        for var in agent.variables.iter() {
            let Some(accessor) = scheme::step_log_accessor(var.logging) else {
                continue;
            };
            let local = format!("{name}_{}", var.name);
            lines.push(format!("{local} = {handle}.{accessor}(\"{}\")", var.name));
            lines.push(format!(
                "print(\"{name} {} {}:\", {local})",
                var.name,
                var.logging.as_str().to_lowercase()
            ));
        }
    }

    lines
        .iter()
        .map(|line| format!("{STEP_LOG_INDENT}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
