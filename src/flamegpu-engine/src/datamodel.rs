// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The structured agent-based model: agents with their variables and
//! functions, execution layers, model globals, message connections and
//! visualisation settings.  These are plain records; the code generator
//! reads them and the importer rebuilds them.

use std::fmt;

/// Separator between an agent name and a function name in a layer entry
/// or connection endpoint.
pub const FUNCTION_REF_SEPARATOR: &str = "::";

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum VariableType {
    #[default]
    Float,
    Int,
    UInt8,
    ArrayFloat,
    ArrayInt,
    ArrayUInt,
    /// Dimension list of a macro property; only meaningful for globals.
    Shape,
}

impl VariableType {
    pub const ALL: [VariableType; 7] = [
        VariableType::Float,
        VariableType::Int,
        VariableType::UInt8,
        VariableType::ArrayFloat,
        VariableType::ArrayInt,
        VariableType::ArrayUInt,
        VariableType::Shape,
    ];

    pub fn is_array(self) -> bool {
        matches!(
            self,
            VariableType::ArrayFloat | VariableType::ArrayInt | VariableType::ArrayUInt
        )
    }

    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            VariableType::Float | VariableType::Int | VariableType::UInt8
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VariableType::Float => "Float",
            VariableType::Int => "Int",
            VariableType::UInt8 => "UInt8",
            VariableType::ArrayFloat => "ArrayFloat",
            VariableType::ArrayInt => "ArrayInt",
            VariableType::ArrayUInt => "ArrayUInt",
            VariableType::Shape => "Shape",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum MessageType {
    #[default]
    None,
    Spatial3D,
    Array3D,
    Bucket,
}

impl MessageType {
    pub const ALL: [MessageType; 4] = [
        MessageType::None,
        MessageType::Spatial3D,
        MessageType::Array3D,
        MessageType::Bucket,
    ];

    pub fn is_none(self) -> bool {
        self == MessageType::None
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::None => "MessageNone",
            MessageType::Spatial3D => "MessageSpatial3D",
            MessageType::Array3D => "MessageArray3D",
            MessageType::Bucket => "MessageBucket",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum LoggingMode {
    #[default]
    NoLog,
    Mean,
    Min,
    Max,
    Sum,
    Std,
}

impl LoggingMode {
    pub const ALL: [LoggingMode; 6] = [
        LoggingMode::NoLog,
        LoggingMode::Mean,
        LoggingMode::Min,
        LoggingMode::Max,
        LoggingMode::Sum,
        LoggingMode::Std,
    ];

    pub fn is_enabled(self) -> bool {
        self != LoggingMode::NoLog
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LoggingMode::NoLog => "NoLog",
            LoggingMode::Mean => "Mean",
            LoggingMode::Min => "Min",
            LoggingMode::Max => "Max",
            LoggingMode::Sum => "Sum",
            LoggingMode::Std => "Std",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.as_str() == name)
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct AgentVariable {
    pub name: String,
    /// Literal text; arrays hold a comma separated element list.
    pub default: String,
    pub var_type: VariableType,
    pub logging: LoggingMode,
}

impl AgentVariable {
    pub fn new(name: &str, default: &str, var_type: VariableType) -> Self {
        AgentVariable {
            name: name.to_owned(),
            default: default.to_owned(),
            var_type,
            logging: LoggingMode::NoLog,
        }
    }

    pub fn with_logging(mut self, logging: LoggingMode) -> Self {
        self.logging = logging;
        self
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct AgentFunction {
    pub name: String,
    pub description: String,
    pub input: MessageType,
    pub output: MessageType,
}

impl AgentFunction {
    pub fn new(name: &str, input: MessageType, output: MessageType) -> Self {
        AgentFunction {
            name: name.to_owned(),
            description: String::new(),
            input,
            output,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Agent {
    pub name: String,
    pub color: String,
    pub variables: Vec<AgentVariable>,
    pub functions: Vec<AgentFunction>,
}

impl Agent {
    pub fn new(name: &str, color: &str) -> Self {
        Agent {
            name: name.to_owned(),
            color: color.to_owned(),
            variables: vec![],
            functions: vec![],
        }
    }

    pub fn variable(&self, name: &str) -> Option<&AgentVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn function(&self, name: &str) -> Option<&AgentFunction> {
        self.functions.iter().find(|f| f.name == name)
    }
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct Layer {
    pub name: String,
    /// Entries of the form `Agent::Function`, in execution order.
    pub functions: Vec<String>,
    pub height: Option<f64>,
}

impl Layer {
    pub fn new(name: &str, functions: &[&str]) -> Self {
        Layer {
            name: name.to_owned(),
            functions: functions.iter().map(|f| (*f).to_owned()).collect(),
            height: None,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct GlobalVariable {
    pub name: String,
    pub value: String,
    pub var_type: VariableType,
    /// Macro properties are device-side arrays accessed through a handle.
    pub is_macro: bool,
}

impl GlobalVariable {
    pub fn new(name: &str, value: &str, var_type: VariableType, is_macro: bool) -> Self {
        GlobalVariable {
            name: name.to_owned(),
            value: value.to_owned(),
            var_type,
            is_macro,
        }
    }
}

/// A reference to one agent function, written `Agent::Function`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FunctionRef<'a> {
    pub agent: &'a str,
    pub function: &'a str,
}

impl<'a> FunctionRef<'a> {
    pub fn parse(reference: &'a str) -> Option<Self> {
        let (agent, function) = reference.split_once(FUNCTION_REF_SEPARATOR)?;
        Some(FunctionRef { agent, function })
    }
}

impl fmt::Display for FunctionRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}{}", self.agent, FUNCTION_REF_SEPARATOR, self.function)
    }
}

pub fn function_ref(agent: &str, function: &str) -> String {
    FunctionRef { agent, function }.to_string()
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Connection {
    pub src: String,
    pub dst: String,
    pub message: MessageType,
}

impl Connection {
    pub fn new(src: &str, dst: &str, message: MessageType) -> Self {
        Connection {
            src: src.to_owned(),
            dst: dst.to_owned(),
            message,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum VisualizationShape {
    #[default]
    Icosphere,
    Sphere,
    Cube,
    Pyramid,
    Arrowhead,
    Teapot,
    Stuntplane,
}

impl VisualizationShape {
    pub const ALL: [VisualizationShape; 7] = [
        VisualizationShape::Icosphere,
        VisualizationShape::Sphere,
        VisualizationShape::Cube,
        VisualizationShape::Pyramid,
        VisualizationShape::Arrowhead,
        VisualizationShape::Teapot,
        VisualizationShape::Stuntplane,
    ];

    /// Name of the stock model constant in the host API.
    pub fn as_str(self) -> &'static str {
        match self {
            VisualizationShape::Icosphere => "ICOSPHERE",
            VisualizationShape::Sphere => "SPHERE",
            VisualizationShape::Cube => "CUBE",
            VisualizationShape::Pyramid => "PYRAMID",
            VisualizationShape::Arrowhead => "ARROWHEAD",
            VisualizationShape::Teapot => "TEAPOT",
            VisualizationShape::Stuntplane => "STUNTPLANE",
        }
    }

    /// Unknown names fall back to the first shape.
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.as_str() == name)
            .unwrap_or_default()
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum ColorMode {
    #[default]
    Solid,
    Interpolated,
}

impl ColorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorMode::Solid => "Solid",
            ColorMode::Interpolated => "Interpolated",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "Interpolated" => ColorMode::Interpolated,
            _ => ColorMode::Solid,
        }
    }
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct Interpolation {
    pub variable: String,
    pub min: f64,
    pub max: f64,
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct VisualizationAgentConfig {
    pub agent_name: String,
    pub include: bool,
    pub shape: VisualizationShape,
    pub color_mode: ColorMode,
    pub interpolation: Option<Interpolation>,
}

impl VisualizationAgentConfig {
    pub fn new(agent_name: &str) -> Self {
        VisualizationAgentConfig {
            agent_name: agent_name.to_owned(),
            include: true,
            ..Default::default()
        }
    }
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct VisualizationSettings {
    pub activated: bool,
    /// Literal text as typed by the user; non numeric text renders as `?`.
    pub domain_width: String,
    pub begin_paused: bool,
    pub show_domain_boundaries: bool,
    pub agents: Vec<VisualizationAgentConfig>,
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct Project {
    pub agents: Vec<Agent>,
    pub layers: Vec<Layer>,
    pub globals: Vec<GlobalVariable>,
    pub connections: Vec<Connection>,
    pub visualization: Option<VisualizationSettings>,
}

impl Project {
    pub fn agent(&self, name: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.name == name)
    }

    pub fn global(&self, name: &str) -> Option<&GlobalVariable> {
        self.globals.iter().find(|g| g.name == name)
    }

    pub fn resolve_function(&self, reference: &str) -> Option<(&Agent, &AgentFunction)> {
        let FunctionRef { agent, function } = FunctionRef::parse(reference)?;
        let agent = self.agent(agent)?;
        let function = agent.function(function)?;
        Some((agent, function))
    }

    /// Connections whose message category disagrees with the output of
    /// their source or the input of their destination.  Endpoints that
    /// don't resolve are not reported here.
    pub fn inconsistent_connections(&self) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|conn| {
                let src = self.resolve_function(&conn.src);
                let dst = self.resolve_function(&conn.dst);
                match (src, dst) {
                    (Some((_, src)), Some((_, dst))) => {
                        src.output != conn.message || dst.input != conn.message
                    }
                    _ => false,
                }
            })
            .collect()
    }
}

#[test]
fn test_function_ref() {
    let r = FunctionRef::parse("Cell::move").unwrap();
    assert_eq!("Cell", r.agent);
    assert_eq!("move", r.function);
    assert_eq!("Cell::move", r.to_string());

    // only the first separator splits
    let r = FunctionRef::parse("A::b::c").unwrap();
    assert_eq!("A", r.agent);
    assert_eq!("b::c", r.function);

    assert!(FunctionRef::parse("no_separator").is_none());
    assert_eq!("A::f", function_ref("A", "f"));
}

#[test]
fn test_category_names() {
    for t in VariableType::ALL {
        assert_eq!(Some(t), VariableType::from_name(t.as_str()));
    }
    for m in MessageType::ALL {
        assert_eq!(Some(m), MessageType::from_name(m.as_str()));
    }
    for l in LoggingMode::ALL {
        assert_eq!(Some(l), LoggingMode::from_name(l.as_str()));
    }
    assert_eq!(None, VariableType::from_name("Double"));
    assert_eq!(VisualizationShape::Icosphere, VisualizationShape::from_name("blob"));
    assert_eq!(VisualizationShape::Cube, VisualizationShape::from_name("CUBE"));
    assert_eq!(ColorMode::Solid, ColorMode::from_name("Rainbow"));
}

#[test]
fn test_inconsistent_connections() {
    let mut prey = Agent::new("Prey", "#fff");
    prey.functions
        .push(AgentFunction::new("out", MessageType::None, MessageType::Spatial3D));
    let mut predator = Agent::new("Predator", "#000");
    predator
        .functions
        .push(AgentFunction::new("hunt", MessageType::Spatial3D, MessageType::None));
    predator
        .functions
        .push(AgentFunction::new("graze", MessageType::Bucket, MessageType::None));

    let project = Project {
        agents: vec![prey, predator],
        connections: vec![
            Connection::new("Prey::out", "Predator::hunt", MessageType::Spatial3D),
            Connection::new("Prey::out", "Predator::graze", MessageType::Spatial3D),
            Connection::new("Ghost::out", "Predator::hunt", MessageType::Spatial3D),
        ],
        ..Default::default()
    };

    let bad = project.inconsistent_connections();
    assert_eq!(1, bad.len());
    assert_eq!("Predator::graze", bad[0].dst);
}
