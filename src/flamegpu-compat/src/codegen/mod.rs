// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Model to host script generation.
//!
//! A template carries named placeholder tokens; each token is replaced
//! wholesale by one rendered block.  Rendering never fails: anything the
//! model doesn't know shows up in the output as the `?` marker or as an
//! explanatory comment.  Only writing the results can fail.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use flamegpu_engine::datamodel::{
    AgentFunction, Connection, FunctionRef, MessageType, Project, function_ref,
};

mod agents;
mod globals;
mod layers;
mod logging;
mod messages;
mod stubs;
mod visualization;

/// The model script template shipped with the crate.
pub const MODEL_TEMPLATE: &str = include_str!("../../templates/model_template.py");
const LOCATION_STUB_TEMPLATE: &str = include_str!("../../templates/func_location_template.cpp");
const ANY_STUB_TEMPLATE: &str = include_str!("../../templates/func_any_template.cpp");

pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y - %H:%M:%S";

pub const MODEL_NAME: &str = "[PLACEHOLDER_MODEL_NAME]";
pub const DATE: &str = "[PLACEHOLDER_DATE]";
pub const ALL_GLOBALS: &str = "[PLACEHOLDER_ALL_GLOBALS]";
// the token has always been spelled this way; templates in the wild use it
pub const MODEL_GLOBALS: &str = "[PLACEHODER_MODEL_GLOBALS]";
pub const FUNCTION_FILES: &str = "[PLACEHOLDER_FUNCTION_FILES]";
pub const MESSAGES: &str = "[PLACEHOLDER_MESSAGES]";
pub const AGENTS: &str = "[PLACEHOLDER_AGENTS]";
pub const LAYERS: &str = "[PLACEHOLDER_LAYERS]";
pub const LOGGING: &str = "[PLACEHOLDER_LOGGING]";
pub const VISUALIZATION_1: &str = "[PLACEHOLDER_VISUALIZATION_1]";
pub const VISUALIZATION_2: &str = "[PLACEHOLDER_VISUALIZATION_2]";
pub const AGENT_LOGS: &str = "[PLACEHOLDER_AGENT_LOGS]";
pub const INIT_MACRO_PROPERTIES: &str = "[PLACEHOLDER_INIT_MACRO_PROPERTIES]";
pub const MAX_SEARCH_RADIUS: &str = "[PLACEHOLDER_MAX_SEARCH_RADIUS_AGENT_i_NAME]";

/// Comment emitted in place of a `setMessageInput` call when no
/// connection provides the function's input.
pub const UNWIRED_INPUT_MARKER: &str = "# WARNING: unwired message input";

/// A generated per-function source file.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Stub {
    pub file_name: String,
    pub contents: String,
}

/// Everything one generation produces, before anything is written.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Rendered {
    pub script: String,
    pub stubs: Vec<Stub>,
}

/// Producers of each function's message input, from the connection list.
/// A later connection to the same destination and category replaces an
/// earlier one.
pub(crate) struct Inputs<'a> {
    sources: HashMap<(String, MessageType), &'a str>,
}

impl<'a> Inputs<'a> {
    pub(crate) fn new(connections: &'a [Connection]) -> Self {
        let sources = connections
            .iter()
            .map(|conn| ((conn.dst.clone(), conn.message), conn.src.as_str()))
            .collect();
        Inputs { sources }
    }

    /// Name of the agent producing `function`'s input message, if any
    /// connection records one.
    pub(crate) fn source_agent(&self, agent: &str, function: &AgentFunction) -> Option<&'a str> {
        if function.input.is_none() {
            return None;
        }
        let key = (function_ref(agent, &function.name), function.input);
        let src = *self.sources.get(&key)?;
        Some(FunctionRef::parse(src).map_or(src, |r| r.agent))
    }
}

fn report_inconsistent_connections(project: &Project) {
    for conn in project.inconsistent_connections() {
        warn!(
            src = %conn.src,
            dst = %conn.dst,
            message = %conn.message,
            "connection category disagrees with its endpoint functions"
        );
    }
}

/// Render the model script and function stubs for `project`.
pub fn render(
    model_name: &str,
    template: &str,
    project: &Project,
    timestamp: NaiveDateTime,
) -> Rendered {
    report_inconsistent_connections(project);

    let inputs = Inputs::new(&project.connections);
    let messages = messages::render_messages(&project.agents);
    let (vis_activation, vis_join) =
        visualization::render_visualization(&project.agents, project.visualization.as_ref());

    let blocks: [(&str, String); 14] = [
        (MODEL_NAME, model_name.to_owned()),
        (DATE, timestamp.format(TIMESTAMP_FORMAT).to_string()),
        (ALL_GLOBALS, globals::render_all_globals(&project.globals)),
        (MODEL_GLOBALS, globals::render_model_globals(&project.globals)),
        (
            INIT_MACRO_PROPERTIES,
            globals::render_macro_initialization(&project.globals),
        ),
        (FUNCTION_FILES, agents::render_function_files(&project.agents)),
        (
            MAX_SEARCH_RADIUS,
            messages::render_search_radius(&messages.spatial_agents),
        ),
        (MESSAGES, messages.text),
        (AGENTS, agents::render_agents(&project.agents, &inputs)),
        (LAYERS, layers::render_layers(project)),
        (LOGGING, logging::render_logging(&project.agents)),
        (AGENT_LOGS, logging::render_agent_logs(&project.agents)),
        (VISUALIZATION_1, vis_activation),
        (VISUALIZATION_2, vis_join),
    ];

    let mut script = template.to_owned();
    for (token, block) in blocks.iter() {
        if !script.contains(token) {
            debug!(token, "template has no slot for block");
            continue;
        }
        script = script.replace(token, block);
    }

    let stubs = stubs::render_stubs(project, &inputs);

    Rendered { script, stubs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flamegpu_engine::datamodel::Agent;

    #[test]
    fn input_sources() {
        let connections = vec![
            Connection::new("Prey::flee", "Predator::hunt", MessageType::Spatial3D),
            Connection::new("Grass::grow", "Prey::graze", MessageType::Array3D),
            Connection::new("Plant::seed", "Prey::graze", MessageType::Array3D),
        ];
        let inputs = Inputs::new(&connections);

        let hunt = AgentFunction::new("hunt", MessageType::Spatial3D, MessageType::None);
        assert_eq!(Some("Prey"), inputs.source_agent("Predator", &hunt));

        // the last connection into a destination wins
        let graze = AgentFunction::new("graze", MessageType::Array3D, MessageType::None);
        assert_eq!(Some("Plant"), inputs.source_agent("Prey", &graze));

        // category must match the function's input
        let graze = AgentFunction::new("graze", MessageType::Bucket, MessageType::None);
        assert_eq!(None, inputs.source_agent("Prey", &graze));

        let idle = AgentFunction::new("hunt", MessageType::None, MessageType::None);
        assert_eq!(None, inputs.source_agent("Predator", &idle));
    }

    #[test]
    fn every_slot_is_filled() {
        let project = Project {
            agents: vec![Agent::new("Cell", "#ffffff")],
            ..Default::default()
        };
        let timestamp = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(9, 5, 7))
            .unwrap();
        let rendered = render("cells", MODEL_TEMPLATE, &project, timestamp);
        assert!(!rendered.script.contains("[PLACEHOLDER_"));
        assert!(!rendered.script.contains("[PLACEHODER_"));
        assert!(rendered.script.contains("# Generated on 01/03/2024 - 09:05:07"));
        assert!(rendered.script.contains("pyflamegpu.ModelDescription(\"cells\")"));
        assert!(rendered.stubs.is_empty());
    }
}
