// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! JSON document format for projects.
//!
//! This mirrors `datamodel` with serde derives.  Category fields are
//! plain strings so documents written by other tools (or older
//! versions) still load; unknown names degrade to each category's
//! default rather than failing.
//!
//! # Example
//! ```no_run
//! use flamegpu_engine::json;
//!
//! let json_str = r#"{"agents": [{"name": "Cell"}]}"#;
//! let project = json::from_str(json_str)?;
//! assert_eq!("Cell", project.agents[0].name);
//! # Ok::<(), flamegpu_engine::Error>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::common::{Error, ErrorCode, ErrorKind, Result};
use crate::datamodel;

// Helper functions for serde skip_serializing_if

fn is_false(val: &bool) -> bool {
    !*val
}

fn is_true(val: &bool) -> bool {
    *val
}

fn default_true() -> bool {
    true
}

fn is_empty_string(val: &str) -> bool {
    val.is_empty()
}

fn is_empty_vec<T>(val: &[T]) -> bool {
    val.is_empty()
}

fn deserialize_null_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    T: Default + serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    let opt = Option::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentVariable {
    pub name: String,
    #[serde(skip_serializing_if = "is_empty_string", default)]
    pub default: String,
    #[serde(rename = "type", skip_serializing_if = "is_empty_string", default)]
    pub var_type: String,
    #[serde(skip_serializing_if = "is_empty_string", default)]
    pub logging: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentFunction {
    pub name: String,
    #[serde(skip_serializing_if = "is_empty_string", default)]
    pub description: String,
    #[serde(skip_serializing_if = "is_empty_string", default)]
    pub input: String,
    #[serde(skip_serializing_if = "is_empty_string", default)]
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub name: String,
    #[serde(skip_serializing_if = "is_empty_string", default)]
    pub color: String,
    #[serde(
        skip_serializing_if = "is_empty_vec",
        default,
        deserialize_with = "deserialize_null_default"
    )]
    pub variables: Vec<AgentVariable>,
    #[serde(
        skip_serializing_if = "is_empty_vec",
        default,
        deserialize_with = "deserialize_null_default"
    )]
    pub functions: Vec<AgentFunction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    #[serde(
        skip_serializing_if = "is_empty_vec",
        default,
        deserialize_with = "deserialize_null_default"
    )]
    pub functions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub height: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalVariable {
    pub name: String,
    #[serde(skip_serializing_if = "is_empty_string", default)]
    pub value: String,
    #[serde(rename = "type", skip_serializing_if = "is_empty_string", default)]
    pub var_type: String,
    #[serde(skip_serializing_if = "is_false", default)]
    pub is_macro: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub src: String,
    pub dst: String,
    #[serde(skip_serializing_if = "is_empty_string", default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpolation {
    pub variable: String,
    #[serde(default)]
    pub min: f64,
    #[serde(default)]
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationAgentConfig {
    pub agent_name: String,
    #[serde(skip_serializing_if = "is_true", default = "default_true")]
    pub include: bool,
    #[serde(skip_serializing_if = "is_empty_string", default)]
    pub shape: String,
    #[serde(skip_serializing_if = "is_empty_string", default)]
    pub color_mode: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub interpolation: Option<Interpolation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationSettings {
    #[serde(skip_serializing_if = "is_false", default)]
    pub activated: bool,
    #[serde(skip_serializing_if = "is_empty_string", default)]
    pub domain_width: String,
    #[serde(skip_serializing_if = "is_false", default)]
    pub begin_paused: bool,
    #[serde(skip_serializing_if = "is_false", default)]
    pub show_domain_boundaries: bool,
    #[serde(
        skip_serializing_if = "is_empty_vec",
        default,
        deserialize_with = "deserialize_null_default"
    )]
    pub agents: Vec<VisualizationAgentConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub agents: Vec<Agent>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub layers: Vec<Layer>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub globals: Vec<GlobalVariable>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub connections: Vec<Connection>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub visualization: Option<VisualizationSettings>,
}

// Conversions from JSON types to datamodel types

fn variable_type_from_string(s: &str) -> datamodel::VariableType {
    datamodel::VariableType::from_name(s).unwrap_or_default()
}

fn message_type_from_string(s: &str) -> datamodel::MessageType {
    datamodel::MessageType::from_name(s).unwrap_or_default()
}

fn logging_mode_from_string(s: &str) -> datamodel::LoggingMode {
    datamodel::LoggingMode::from_name(s).unwrap_or_default()
}

impl From<AgentVariable> for datamodel::AgentVariable {
    fn from(var: AgentVariable) -> Self {
        datamodel::AgentVariable {
            name: var.name,
            default: var.default,
            var_type: variable_type_from_string(&var.var_type),
            logging: logging_mode_from_string(&var.logging),
        }
    }
}

impl From<AgentFunction> for datamodel::AgentFunction {
    fn from(func: AgentFunction) -> Self {
        datamodel::AgentFunction {
            name: func.name,
            description: func.description,
            input: message_type_from_string(&func.input),
            output: message_type_from_string(&func.output),
        }
    }
}

impl From<Agent> for datamodel::Agent {
    fn from(agent: Agent) -> Self {
        datamodel::Agent {
            name: agent.name,
            color: agent.color,
            variables: agent.variables.into_iter().map(|v| v.into()).collect(),
            functions: agent.functions.into_iter().map(|f| f.into()).collect(),
        }
    }
}

impl From<Layer> for datamodel::Layer {
    fn from(layer: Layer) -> Self {
        datamodel::Layer {
            name: layer.name,
            functions: layer.functions,
            height: layer.height,
        }
    }
}

impl From<GlobalVariable> for datamodel::GlobalVariable {
    fn from(global: GlobalVariable) -> Self {
        datamodel::GlobalVariable {
            name: global.name,
            value: global.value,
            var_type: variable_type_from_string(&global.var_type),
            is_macro: global.is_macro,
        }
    }
}

impl From<Connection> for datamodel::Connection {
    fn from(conn: Connection) -> Self {
        datamodel::Connection {
            src: conn.src,
            dst: conn.dst,
            message: message_type_from_string(&conn.message),
        }
    }
}

impl From<Interpolation> for datamodel::Interpolation {
    fn from(interp: Interpolation) -> Self {
        datamodel::Interpolation {
            variable: interp.variable,
            min: interp.min,
            max: interp.max,
        }
    }
}

impl From<VisualizationAgentConfig> for datamodel::VisualizationAgentConfig {
    fn from(config: VisualizationAgentConfig) -> Self {
        datamodel::VisualizationAgentConfig {
            agent_name: config.agent_name,
            include: config.include,
            shape: datamodel::VisualizationShape::from_name(&config.shape),
            color_mode: datamodel::ColorMode::from_name(&config.color_mode),
            interpolation: config.interpolation.map(|i| i.into()),
        }
    }
}

impl From<VisualizationSettings> for datamodel::VisualizationSettings {
    fn from(settings: VisualizationSettings) -> Self {
        datamodel::VisualizationSettings {
            activated: settings.activated,
            domain_width: settings.domain_width,
            begin_paused: settings.begin_paused,
            show_domain_boundaries: settings.show_domain_boundaries,
            agents: settings.agents.into_iter().map(|a| a.into()).collect(),
        }
    }
}

impl From<Project> for datamodel::Project {
    fn from(project: Project) -> Self {
        datamodel::Project {
            agents: project.agents.into_iter().map(|a| a.into()).collect(),
            layers: project.layers.into_iter().map(|l| l.into()).collect(),
            globals: project.globals.into_iter().map(|g| g.into()).collect(),
            connections: project.connections.into_iter().map(|c| c.into()).collect(),
            visualization: project.visualization.map(|v| v.into()),
        }
    }
}

// Conversions from datamodel types to JSON types

impl From<datamodel::AgentVariable> for AgentVariable {
    fn from(var: datamodel::AgentVariable) -> Self {
        AgentVariable {
            name: var.name,
            default: var.default,
            var_type: var.var_type.as_str().to_owned(),
            logging: if var.logging.is_enabled() {
                var.logging.as_str().to_owned()
            } else {
                String::new()
            },
        }
    }
}

impl From<datamodel::AgentFunction> for AgentFunction {
    fn from(func: datamodel::AgentFunction) -> Self {
        AgentFunction {
            name: func.name,
            description: func.description,
            input: func.input.as_str().to_owned(),
            output: func.output.as_str().to_owned(),
        }
    }
}

impl From<datamodel::Agent> for Agent {
    fn from(agent: datamodel::Agent) -> Self {
        Agent {
            name: agent.name,
            color: agent.color,
            variables: agent.variables.into_iter().map(|v| v.into()).collect(),
            functions: agent.functions.into_iter().map(|f| f.into()).collect(),
        }
    }
}

impl From<datamodel::Layer> for Layer {
    fn from(layer: datamodel::Layer) -> Self {
        Layer {
            name: layer.name,
            functions: layer.functions,
            height: layer.height,
        }
    }
}

impl From<datamodel::GlobalVariable> for GlobalVariable {
    fn from(global: datamodel::GlobalVariable) -> Self {
        GlobalVariable {
            name: global.name,
            value: global.value,
            var_type: global.var_type.as_str().to_owned(),
            is_macro: global.is_macro,
        }
    }
}

impl From<datamodel::Connection> for Connection {
    fn from(conn: datamodel::Connection) -> Self {
        Connection {
            src: conn.src,
            dst: conn.dst,
            message: conn.message.as_str().to_owned(),
        }
    }
}

impl From<datamodel::Interpolation> for Interpolation {
    fn from(interp: datamodel::Interpolation) -> Self {
        Interpolation {
            variable: interp.variable,
            min: interp.min,
            max: interp.max,
        }
    }
}

impl From<datamodel::VisualizationAgentConfig> for VisualizationAgentConfig {
    fn from(config: datamodel::VisualizationAgentConfig) -> Self {
        VisualizationAgentConfig {
            agent_name: config.agent_name,
            include: config.include,
            shape: config.shape.as_str().to_owned(),
            color_mode: config.color_mode.as_str().to_owned(),
            interpolation: config.interpolation.map(|i| i.into()),
        }
    }
}

impl From<datamodel::VisualizationSettings> for VisualizationSettings {
    fn from(settings: datamodel::VisualizationSettings) -> Self {
        VisualizationSettings {
            activated: settings.activated,
            domain_width: settings.domain_width,
            begin_paused: settings.begin_paused,
            show_domain_boundaries: settings.show_domain_boundaries,
            agents: settings.agents.into_iter().map(|a| a.into()).collect(),
        }
    }
}

impl From<datamodel::Project> for Project {
    fn from(project: datamodel::Project) -> Self {
        Project {
            agents: project.agents.into_iter().map(|a| a.into()).collect(),
            layers: project.layers.into_iter().map(|l| l.into()).collect(),
            globals: project.globals.into_iter().map(|g| g.into()).collect(),
            connections: project.connections.into_iter().map(|c| c.into()).collect(),
            visualization: project.visualization.map(|v| v.into()),
        }
    }
}

/// Read a project document.
pub fn from_str(contents: &str) -> Result<datamodel::Project> {
    let project: Project = serde_json::from_str(contents).map_err(|err| {
        Error::new(
            ErrorKind::Model,
            ErrorCode::JsonDeserialization,
            Some(err.to_string()),
        )
    })?;
    Ok(project.into())
}

/// Write a project document, pretty printed.
pub fn to_string(project: &datamodel::Project) -> Result<String> {
    let project: Project = project.clone().into();
    serde_json::to_string_pretty(&project).map_err(|err| {
        Error::new(
            ErrorKind::Model,
            ErrorCode::JsonSerialization,
            Some(err.to_string()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::{
        ColorMode, LoggingMode, MessageType, VariableType, VisualizationShape,
    };

    #[test]
    fn test_missing_fields_take_defaults() {
        let project = from_str(
            r#"{
                "agents": [{
                    "name": "Cell",
                    "variables": [{"name": "x"}],
                    "functions": [{"name": "move", "output": "MessageSpatial3D"}]
                }],
                "layers": null,
                "visualization": {"agents": [{"agent_name": "Cell"}]}
            }"#,
        )
        .unwrap();

        let cell = &project.agents[0];
        assert_eq!("", cell.color);
        let x = cell.variable("x").unwrap();
        assert_eq!(VariableType::Float, x.var_type);
        assert_eq!(LoggingMode::NoLog, x.logging);
        assert_eq!("", x.default);
        let f = cell.function("move").unwrap();
        assert_eq!(MessageType::None, f.input);
        assert_eq!(MessageType::Spatial3D, f.output);

        assert!(project.layers.is_empty());
        assert!(project.globals.is_empty());

        let vis = project.visualization.unwrap();
        assert!(!vis.activated);
        assert!(vis.agents[0].include);
        assert_eq!(VisualizationShape::Icosphere, vis.agents[0].shape);
    }

    #[test]
    fn test_unknown_categories_degrade() {
        let project = from_str(
            r#"{
                "agents": [{
                    "name": "A",
                    "variables": [{"name": "v", "type": "Double", "logging": "Median"}],
                    "functions": [{"name": "f", "input": "MessageGraph"}]
                }],
                "visualization": {
                    "activated": true,
                    "agents": [{"agent_name": "A", "shape": "blob", "color_mode": "Rainbow"}]
                }
            }"#,
        )
        .unwrap();
        let agent = &project.agents[0];
        assert_eq!(VariableType::Float, agent.variables[0].var_type);
        assert_eq!(LoggingMode::NoLog, agent.variables[0].logging);
        assert_eq!(MessageType::None, agent.functions[0].input);
        let config = &project.visualization.unwrap().agents[0];
        assert_eq!(VisualizationShape::Icosphere, config.shape);
        assert_eq!(ColorMode::Solid, config.color_mode);
    }

    #[test]
    fn test_document_roundtrip() {
        let mut cell = datamodel::Agent::new("Cell", "#e6194B");
        cell.variables.push(
            datamodel::AgentVariable::new("energy", "1.5", VariableType::Float)
                .with_logging(LoggingMode::Mean),
        );
        cell.variables.push(datamodel::AgentVariable::new(
            "signal",
            "0, 0, 0",
            VariableType::ArrayInt,
        ));
        cell.functions.push(datamodel::AgentFunction::new(
            "move",
            MessageType::Bucket,
            MessageType::Spatial3D,
        ));
        let mut config = datamodel::VisualizationAgentConfig::new("Cell");
        config.include = false;
        config.shape = VisualizationShape::Cube;
        config.color_mode = ColorMode::Interpolated;
        config.interpolation = Some(datamodel::Interpolation {
            variable: "energy".to_owned(),
            min: 0.0,
            max: 10.0,
        });

        let project = datamodel::Project {
            agents: vec![cell],
            layers: vec![datamodel::Layer {
                height: Some(120.0),
                ..datamodel::Layer::new("layer_1", &["Cell::move"])
            }],
            globals: vec![datamodel::GlobalVariable::new(
                "GRID",
                "10, 10",
                VariableType::Shape,
                true,
            )],
            connections: vec![datamodel::Connection::new(
                "Cell::move",
                "Cell::move",
                MessageType::Spatial3D,
            )],
            visualization: Some(datamodel::VisualizationSettings {
                activated: true,
                domain_width: "100".to_owned(),
                begin_paused: true,
                show_domain_boundaries: false,
                agents: vec![config],
            }),
        };

        let text = to_string(&project).unwrap();
        assert_eq!(project, from_str(&text).unwrap());
        // defaults are left out of the document
        assert!(!text.contains("NoLog"));
        assert!(!text.contains("show_domain_boundaries"));
    }

    #[test]
    fn test_malformed_document() {
        let err = from_str("{\"agents\": 3}").unwrap_err();
        assert_eq!(ErrorKind::Model, err.kind);
        assert_eq!(ErrorCode::JsonDeserialization, err.code);
    }
}
