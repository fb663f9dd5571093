// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use tracing::{debug, warn};

use flamegpu_engine::datamodel::{
    Agent, ColorMode, VisualizationAgentConfig, VisualizationSettings,
};
use flamegpu_engine::literal::{UNRESOLVED, format_float, numeric_literal_or};

const DEFAULT_COLOR: &str = "#ffffff";

fn interpolated_color(config: &VisualizationAgentConfig, agent: &Agent) -> String {
    let resolved = config
        .interpolation
        .as_ref()
        .filter(|interp| agent.variable(&interp.variable).is_some());

    let (variable, min, max) = match resolved {
        Some(interp) => (interp.variable.as_str(), interp.min, interp.max),
        None => {
            let fallback = agent
                .variables
                .first()
                .map_or(UNRESOLVED, |v| v.name.as_str());
            warn!(
                agent = %agent.name,
                fallback,
                "interpolation variable unresolved, using the first agent variable"
            );
            (fallback, 0.0, 1.0)
        }
    };

    format!(
        "pyflamegpu.HSVInterpolation.GREENRED(\"{variable}\", {}, {})",
        format_float(min),
        format_float(max)
    )
}

fn render_agent(config: &VisualizationAgentConfig, agent: &Agent) -> Vec<String> {
    let handle = format!("{}_vis_agent", agent.name);
    let color = match config.color_mode {
        ColorMode::Interpolated => interpolated_color(config, agent),
        ColorMode::Solid => {
            let color = if agent.color.is_empty() {
                DEFAULT_COLOR
            } else {
                agent.color.as_str()
            };
            format!("pyflamegpu.Color(\"{color}\")")
        }
    };

    vec![
        String::new(),
        format!("    {handle} = vis.addAgent(\"{}\")", agent.name),
        "    # Position vars are named x, y, z so they are used by default".to_owned(),
        format!("    {handle}.setModel(pyflamegpu.{})", config.shape.as_str()),
        format!(
            "    {handle}.setModelScale({UNRESOLVED} * domain_width) # values <<1 (e.g. 0.03) work fine"
        ),
        format!("    {handle}.setColor({color})"),
    ]
}

/// The edges of the domain's bounding box, drawn as line pairs.
fn boundary_wireframe() -> Vec<String> {
    let vertex = |x: usize, y: usize, z: usize| {
        format!("    pen.addVertex(coord_boundary[{x}], coord_boundary[{y}], coord_boundary[{z}])")
    };

    let mut lines = vec![
        String::new(),
        "    coord_boundary = list(env.getPropertyArrayFloat(\"BOUNDARY_COORDS\"))".to_owned(),
        "    pen = vis.newLineSketch(1, 1, 1, 0.8)".to_owned(),
    ];
    // edges along z, then y, then x
    for x in 0..2 {
        for y in 2..4 {
            for z in 4..6 {
                lines.push(vertex(x, y, z));
            }
        }
    }
    lines.push(String::new());
    for x in 0..2 {
        for z in 4..6 {
            for y in 2..4 {
                lines.push(vertex(x, y, z));
            }
        }
    }
    lines.push(String::new());
    for z in 4..6 {
        for y in 2..4 {
            for x in 0..2 {
                lines.push(vertex(x, y, z));
            }
        }
    }
    lines
}

/// The visualisation setup block and the block joining the
/// visualisation thread once the simulation finishes.
pub(super) fn render_visualization(
    agents: &[Agent],
    settings: Option<&VisualizationSettings>,
) -> (String, String) {
    let Some(settings) = settings.filter(|s| s.activated) else {
        return (
            "# Visualisation disabled in configuration".to_owned(),
            "# Visualisation join disabled".to_owned(),
        );
    };

    let begin_paused = if settings.begin_paused { "True" } else { "False" };
    let mut lines = vec![
        "\"\"\"".to_owned(),
        "  Create Visualisation".to_owned(),
        "\"\"\"".to_owned(),
        "if pyflamegpu.VISUALISATION and VISUALISATION:".to_owned(),
        "    vis = simulation.getVisualisation()".to_owned(),
        "    # Configure vis".to_owned(),
        format!(
            "    domain_width = {}",
            numeric_literal_or(&settings.domain_width, UNRESOLVED)
        ),
        format!(
            "    init_cam = {UNRESOLVED} # the domain position at the end of the simulation, times 5, looks nice"
        ),
        "    vis.setInitialCameraLocation(0.0, 0.0, init_cam)".to_owned(),
        format!("    vis.setCameraSpeed({UNRESOLVED} * domain_width) # values <<1 (e.g. 0.002) work fine"),
        "    if DEBUG_PRINTING:".to_owned(),
        "        vis.setSimulationSpeed(1)".to_owned(),
        format!("    vis.setBeginPaused({begin_paused})"),
    ];

    for config in settings.agents.iter().filter(|c| c.include) {
        let Some(agent) = agents.iter().find(|a| a.name == config.agent_name) else {
            debug!(agent = %config.agent_name, "visualised agent not in model");
            continue;
        };
        lines.extend(render_agent(config, agent));
    }

    if settings.show_domain_boundaries {
        lines.extend(boundary_wireframe());
    }

    lines.push(String::new());
    lines.push("    vis.activate()".to_owned());

    let join = [
        "if pyflamegpu.VISUALISATION and VISUALISATION and not ENSEMBLE:",
        "    vis.join() # keep the window open after the simulation finishes",
    ]
    .join("\n");

    (lines.join("\n"), join)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flamegpu_engine::datamodel::{
        AgentVariable, Interpolation, VariableType, VisualizationShape,
    };

    fn agents() -> Vec<Agent> {
        let mut cell = Agent::new("Cell", "#3cb44b");
        cell.variables
            .push(AgentVariable::new("energy", "1.0", VariableType::Float));
        cell.variables
            .push(AgentVariable::new("age", "0", VariableType::Int));
        vec![cell, Agent::new("Blank", "")]
    }

    fn settings(agents: Vec<VisualizationAgentConfig>) -> VisualizationSettings {
        VisualizationSettings {
            activated: true,
            domain_width: "100".to_owned(),
            begin_paused: true,
            show_domain_boundaries: false,
            agents,
        }
    }

    #[test]
    fn disabled() {
        let (a, b) = render_visualization(&agents(), None);
        assert_eq!("# Visualisation disabled in configuration", a);
        assert_eq!("# Visualisation join disabled", b);

        let mut off = settings(vec![]);
        off.activated = false;
        let (a, _) = render_visualization(&agents(), Some(&off));
        assert_eq!("# Visualisation disabled in configuration", a);
    }

    #[test]
    fn solid_agents() {
        let mut excluded = VisualizationAgentConfig::new("Cell");
        excluded.include = false;
        let mut cube = VisualizationAgentConfig::new("Blank");
        cube.shape = VisualizationShape::Cube;
        let vis = settings(vec![
            excluded,
            cube,
            VisualizationAgentConfig::new("Ghost"),
        ]);

        let (text, join) = render_visualization(&agents(), Some(&vis));
        assert!(text.contains("    domain_width = 100.0"));
        assert!(text.contains("    vis.setBeginPaused(True)"));
        assert!(!text.contains("Cell_vis_agent"));
        assert!(!text.contains("Ghost"));
        assert!(text.contains("    Blank_vis_agent.setModel(pyflamegpu.CUBE)"));
        assert!(text.contains("    Blank_vis_agent.setColor(pyflamegpu.Color(\"#ffffff\"))"));
        assert!(!text.contains("pen.addVertex"));
        assert!(text.ends_with("    vis.activate()"));
        assert!(join.starts_with("if pyflamegpu.VISUALISATION and VISUALISATION and not ENSEMBLE:"));
    }

    #[test]
    fn interpolated_colors() {
        let mut resolved = VisualizationAgentConfig::new("Cell");
        resolved.color_mode = ColorMode::Interpolated;
        resolved.interpolation = Some(Interpolation {
            variable: "age".to_owned(),
            min: 0.0,
            max: 80.0,
        });
        let vis = settings(vec![resolved]);
        let (text, _) = render_visualization(&agents(), Some(&vis));
        assert!(text.contains("GREENRED(\"age\", 0.0, 80.0)"));

        let mut unknown = VisualizationAgentConfig::new("Cell");
        unknown.color_mode = ColorMode::Interpolated;
        unknown.interpolation = Some(Interpolation {
            variable: "mass".to_owned(),
            min: 5.0,
            max: 6.0,
        });
        let mut empty = VisualizationAgentConfig::new("Blank");
        empty.color_mode = ColorMode::Interpolated;
        let vis = settings(vec![unknown, empty]);
        let (text, _) = render_visualization(&agents(), Some(&vis));
        assert!(text.contains("Cell_vis_agent.setColor(pyflamegpu.HSVInterpolation.GREENRED(\"energy\", 0.0, 1.0))"));
        assert!(text.contains("Blank_vis_agent.setColor(pyflamegpu.HSVInterpolation.GREENRED(\"?\", 0.0, 1.0))"));
    }

    #[test]
    fn boundaries_and_unknown_width() {
        let mut vis = settings(vec![]);
        vis.show_domain_boundaries = true;
        vis.domain_width = "wide".to_owned();
        let (text, _) = render_visualization(&agents(), Some(&vis));
        assert!(text.contains("    domain_width = ?"));
        assert_eq!(24, text.matches("pen.addVertex(").count());
        assert!(text.contains(
            "    pen.addVertex(coord_boundary[0], coord_boundary[2], coord_boundary[4])\n    pen.addVertex(coord_boundary[0], coord_boundary[2], coord_boundary[5])"
        ));
    }
}
