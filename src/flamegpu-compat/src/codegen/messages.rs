// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use flamegpu_engine::datamodel::{Agent, MessageType, VariableType};
use flamegpu_engine::literal::{UNRESOLVED, array_len_literal};
use flamegpu_engine::scheme;

/// Spatial messages locate their sender through these variables, which
/// the message type already carries.
const POSITION_VARIABLES: [&str; 3] = ["x", "y", "z"];

pub(super) struct Messages {
    pub text: String,
    /// Agents that produce a spatial message and so need a search radius.
    pub spatial_agents: BTreeSet<String>,
}

fn field_line(message: &str, name: &str, var_type: VariableType, default: &str) -> String {
    let method = scheme::message_variable_method(var_type);
    if var_type.is_array() {
        let len = array_len_literal(var_type, default);
        format!("{message}.{method}(\"{name}\", {len})")
    } else {
        format!("{message}.{method}(\"{name}\")")
    }
}

fn render_message(agent: &Agent, message_type: MessageType, message: &str) -> Vec<String> {
    let name = &agent.name;
    let mut lines = vec![];
    let mut seen: HashSet<&str> = HashSet::new();

    match message_type {
        MessageType::Bucket => {
            lines.push(format!(
                "{name}_MAX_CONNECTIVITY = {UNRESOLVED} # maximum links of a single {name}"
            ));
            lines.push(format!(
                "{name}_N_NODES = {UNRESOLVED} # number of {name} nodes to index"
            ));
            lines.push(format!("{message} = model.newMessageBucket(\"{message}\")"));
            lines.push("# Set the range and bounds.".to_owned());
            lines.push(format!("{message}.setBounds(0,{name}_N_NODES)"));
            seen.insert(scheme::BUCKET_LINKED_NODES);
        }
        _ => {
            // only called for categories with a constructor
            let ctor = scheme::message_constructor(message_type).unwrap_or("newMessageSpatial3D");
            lines.push(format!("{message} = model.{ctor}(\"{message}\")"));
        }
    }

    match message_type {
        MessageType::Spatial3D => {
            lines.push(format!("{message}.setRadius(MAX_SEARCH_RADIUS_{name})"));
            lines.push(format!(
                "{message}.setMin(MIN_EXPECTED_BOUNDARY_POS, MIN_EXPECTED_BOUNDARY_POS, MIN_EXPECTED_BOUNDARY_POS)"
            ));
            lines.push(format!(
                "{message}.setMax(MAX_EXPECTED_BOUNDARY_POS, MAX_EXPECTED_BOUNDARY_POS, MAX_EXPECTED_BOUNDARY_POS)"
            ));
            seen.extend(POSITION_VARIABLES);
        }
        MessageType::Array3D => {
            lines.push(format!(
                "{name}_AGENTS_PER_DIR = [{UNRESOLVED}, {UNRESOLVED}, {UNRESOLVED}]"
            ));
            lines.push(format!(
                "{message}.setDimensions({name}_AGENTS_PER_DIR[0], {name}_AGENTS_PER_DIR[1], {name}_AGENTS_PER_DIR[2])"
            ));
        }
        _ => {}
    }

    for var in agent.variables.iter() {
        if !seen.insert(var.name.as_str()) {
            continue;
        }
        lines.push(field_line(message, &var.name, var.var_type, &var.default));
    }

    if message_type == MessageType::Bucket {
        lines.push(format!(
            "{message}.newVariableArrayUInt(\"{}\", {name}_MAX_CONNECTIVITY)",
            scheme::BUCKET_LINKED_NODES
        ));
    }

    lines.push(format!(
        "# TODO: remove fields {name} does not need to publish in {message}"
    ));
    lines
}

/// One declaration per (agent, output category) pair, in the order the
/// pairs are first seen.
pub(super) fn render_messages(agents: &[Agent]) -> Messages {
    let mut emitted: HashSet<(&str, MessageType)> = HashSet::new();
    let mut spatial_agents = BTreeSet::new();
    let mut blocks = vec![];

    for agent in agents.iter() {
        for function in agent.functions.iter() {
            let message_type = function.output;
            let Some(message) = scheme::message_name(&agent.name, message_type) else {
                continue;
            };
            if !emitted.insert((agent.name.as_str(), message_type)) {
                continue;
            }
            if message_type == MessageType::Spatial3D {
                spatial_agents.insert(agent.name.clone());
            }
            debug!(agent = %agent.name, %message, "rendering message");
            blocks.push(render_message(agent, message_type, &message).join("\n"));
        }
    }

    let text = if blocks.is_empty() {
        "# No location messages defined".to_owned()
    } else {
        blocks.join("\n\n")
    };

    Messages {
        text,
        spatial_agents,
    }
}

pub(super) fn render_search_radius(spatial_agents: &BTreeSet<String>) -> String {
    if spatial_agents.is_empty() {
        return "# MAX_SEARCH_RADIUS constants are declared per agent when spatial messages are in use"
            .to_owned();
    }
    spatial_agents
        .iter()
        .map(|agent| format!("MAX_SEARCH_RADIUS_{agent} = {UNRESOLVED}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use flamegpu_engine::datamodel::{AgentFunction, AgentVariable};

    fn agent(name: &str, vars: &[(&str, VariableType, &str)], outputs: &[MessageType]) -> Agent {
        let mut agent = Agent::new(name, "#ffffff");
        for (var, var_type, default) in vars {
            agent
                .variables
                .push(AgentVariable::new(var, default, *var_type));
        }
        for (i, output) in outputs.iter().enumerate() {
            agent.functions.push(AgentFunction::new(
                &format!("f{i}"),
                MessageType::None,
                *output,
            ));
        }
        agent
    }

    #[test]
    fn no_messages() {
        let agents = vec![agent("Cell", &[], &[MessageType::None])];
        let messages = render_messages(&agents);
        assert_eq!("# No location messages defined", messages.text);
        assert!(messages.spatial_agents.is_empty());
        assert!(render_search_radius(&messages.spatial_agents).starts_with('#'));
    }

    #[test]
    fn spatial_skips_position() {
        let agents = vec![agent(
            "Cell",
            &[
                ("x", VariableType::Float, "0.0"),
                ("energy", VariableType::Float, "1.0"),
                ("energy", VariableType::Int, "1"),
                ("trail", VariableType::ArrayFloat, "0.0, 0.0"),
            ],
            &[MessageType::Spatial3D, MessageType::Spatial3D],
        )];
        let messages = render_messages(&agents);
        let text = &messages.text;
        assert_eq!(
            1,
            text.matches("model.newMessageSpatial3D(\"Cell_spatial_location_message\")")
                .count()
        );
        assert!(!text.contains("(\"x\")"));
        assert_eq!(1, text.matches("newVariableFloat(\"energy\")").count());
        assert!(!text.contains("newVariableInt(\"energy\")"));
        assert!(text.contains("newVariableArrayFloat(\"trail\", 2)"));
        assert!(text.contains("setRadius(MAX_SEARCH_RADIUS_Cell)"));
        assert_eq!(
            "MAX_SEARCH_RADIUS_Cell = ?",
            render_search_radius(&messages.spatial_agents)
        );
    }

    #[test]
    fn grid_and_bucket() {
        let agents = vec![
            agent("Grass", &[("height", VariableType::Float, "")], &[MessageType::Array3D]),
            agent(
                "Node",
                &[
                    ("linked_nodes", VariableType::ArrayUInt, ""),
                    ("weight", VariableType::ArrayInt, ""),
                ],
                &[MessageType::Bucket],
            ),
        ];
        let text = render_messages(&agents).text;
        assert!(text.contains("Grass_AGENTS_PER_DIR = [?, ?, ?]"));
        assert!(text.contains("Grass_grid_location_message.newVariableFloat(\"height\")"));
        assert!(text.contains("Node_bucket_location_message.setBounds(0,Node_N_NODES)"));
        assert!(text.contains("newVariableArrayInt(\"weight\", ?)"));
        assert_eq!(1, text.matches("\"linked_nodes\"").count());
        assert!(text.contains(
            "Node_bucket_location_message.newVariableArrayUInt(\"linked_nodes\", Node_MAX_CONNECTIVITY)"
        ));
    }

    #[test]
    fn search_radius_is_sorted() {
        let agents = vec![
            agent("Zebra", &[], &[MessageType::Spatial3D]),
            agent("Ant", &[], &[MessageType::Spatial3D]),
        ];
        let messages = render_messages(&agents);
        assert_eq!(
            "MAX_SEARCH_RADIUS_Ant = ?\nMAX_SEARCH_RADIUS_Zebra = ?",
            render_search_radius(&messages.spatial_agents)
        );
        // declarations keep model order
        let ant = messages.text.find("Ant_spatial").unwrap();
        let zebra = messages.text.find("Zebra_spatial").unwrap();
        assert!(zebra < ant);
    }
}
