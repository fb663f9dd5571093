// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use tracing::{debug, warn};

use flamegpu_engine::datamodel::{FunctionRef, Layer, Project};
use flamegpu_engine::scheme;

fn render_layer(project: &Project, layer: &Layer) -> Vec<String> {
    let mut lines = vec![format!("# {}", layer.name), "layer_count += 1".to_owned()];
    let mut created = false;

    for entry in layer.functions.iter() {
        let Some(FunctionRef { agent, function }) = FunctionRef::parse(entry) else {
            warn!(layer = %layer.name, entry = %entry, "skipping layer entry without an agent");
            continue;
        };
        if project.resolve_function(entry).is_none() {
            warn!(layer = %layer.name, entry = %entry, "skipping unknown agent function");
            continue;
        }
        let method = if created {
            scheme::GET_LAYER
        } else {
            scheme::NEW_LAYER
        };
        created = true;
        lines.push(format!(
            "model.{method}(\"{}\").{}(\"{agent}\", \"{function}\")",
            layer.name,
            scheme::ADD_AGENT_FUNCTION
        ));
    }

    lines
}

/// Execution layers in model order.  The first function placed in a
/// layer creates it; the rest are appended.
pub(super) fn render_layers(project: &Project) -> String {
    let mut lines = vec!["layer_count = 0".to_owned()];
    if project.layers.is_empty() {
        lines.push("# No layers defined".to_owned());
    }
    for layer in project.layers.iter() {
        debug!(layer = %layer.name, "rendering layer");
        lines.extend(render_layer(project, layer));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use flamegpu_engine::datamodel::{Agent, AgentFunction, MessageType};

    fn project(layers: Vec<Layer>) -> Project {
        let mut cell = Agent::new("Cell", "#ffffff");
        for name in ["move", "eat", "die"] {
            cell.functions
                .push(AgentFunction::new(name, MessageType::None, MessageType::None));
        }
        Project {
            agents: vec![cell],
            layers,
            ..Default::default()
        }
    }

    #[test]
    fn no_layers() {
        assert_eq!("layer_count = 0\n# No layers defined", render_layers(&project(vec![])));
    }

    #[test]
    fn first_entry_creates_the_layer() {
        let project = project(vec![
            Layer::new("main", &["Cell::move", "Cell::eat"]),
            Layer::new("cleanup", &["Cell::die"]),
        ]);
        assert_eq!(
            "layer_count = 0\n\
             # main\n\
             layer_count += 1\n\
             model.newLayer(\"main\").addAgentFunction(\"Cell\", \"move\")\n\
             model.Layer(\"main\").addAgentFunction(\"Cell\", \"eat\")\n\
             # cleanup\n\
             layer_count += 1\n\
             model.newLayer(\"cleanup\").addAgentFunction(\"Cell\", \"die\")",
            render_layers(&project)
        );
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let project = project(vec![Layer::new(
            "main",
            &["move", "Ghost::walk", "Cell::eat"],
        )]);
        let text = render_layers(&project);
        assert!(!text.contains("\"move\""));
        assert!(!text.contains("Ghost"));
        // the first entry that survives still creates the layer
        assert!(text.ends_with("model.newLayer(\"main\").addAgentFunction(\"Cell\", \"eat\")"));
    }
}
