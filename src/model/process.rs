use super::{Action, ActionType, DataType};
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An input or output declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub data_type: DataType,
}

impl Parameter {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: None,
            name: name.into(),
            data_type,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// What an invocation calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Callable {
    Action(Arc<Action>),
    Process(Arc<Process>),
}

impl Callable {
    pub fn inputs(&self) -> &[Parameter] {
        match self {
            Callable::Action(action) => &action.inputs,
            Callable::Process(process) => &process.inputs,
        }
    }

    pub fn outputs(&self) -> &[Parameter] {
        match self {
            Callable::Action(action) => &action.outputs,
            Callable::Process(process) => &process.outputs,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Callable::Action(action) => &action.name,
            Callable::Process(process) => &process.name,
        }
    }

    pub fn action_type(&self) -> Option<ActionType> {
        match self {
            Callable::Action(action) => Some(action.action_type),
            Callable::Process(_) => None,
        }
    }
}

impl From<Action> for Callable {
    fn from(action: Action) -> Self {
        Callable::Action(Arc::new(action))
    }
}

impl From<Process> for Callable {
    fn from(process: Process) -> Self {
        Callable::Process(Arc::new(process))
    }
}

/// One node of a process graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invocation {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub callable: Callable,
    /// Literal attributes. Most carry a single value; branch lists carry several.
    #[serde(default)]
    pub attributes: AHashMap<String, Vec<String>>,
    /// Narrowed output types inferred by the validator.
    #[serde(default)]
    pub actual_output_types: AHashMap<String, DataType>,
    /// Names of every invocation on some path from a root to this one, itself included.
    #[serde(default)]
    pub traversed: AHashSet<String>,
}

impl Invocation {
    pub fn new(name: impl Into<String>, callable: impl Into<Callable>) -> Self {
        Self {
            id: None,
            name: name.into(),
            callable: callable.into(),
            attributes: AHashMap::new(),
            actual_output_types: AHashMap::new(),
            traversed: AHashSet::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Appends a literal attribute value.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// First value of an attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn attribute_values(&self, name: &str) -> &[String] {
        self.attributes.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn inputs(&self) -> &[Parameter] {
        self.callable.inputs()
    }

    pub fn outputs(&self) -> &[Parameter] {
        self.callable.outputs()
    }

    pub fn input(&self, name: &str) -> Option<&Parameter> {
        self.inputs().iter().find(|p| p.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&Parameter> {
        self.outputs().iter().find(|p| p.name == name)
    }

    /// Narrowed output type when one was inferred, otherwise the declared one.
    pub fn output_type(&self, name: &str) -> Option<DataType> {
        self.actual_output_types
            .get(name)
            .cloned()
            .or_else(|| self.output(name).map(|p| p.data_type.clone()))
    }

    pub fn action_type(&self) -> Option<ActionType> {
        self.callable.action_type()
    }

    pub fn is_conditional(&self) -> bool {
        self.action_type() == Some(ActionType::Conditional)
    }
}

/// A by-value reference to an invocation, resolved by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRef {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

impl From<&str> for InvocationRef {
    fn from(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
        }
    }
}

/// A by-value reference to a parameter, resolved by id when present, else by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamRef {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

impl ParamRef {
    pub fn matches(&self, parameter: &Parameter) -> bool {
        match (&self.id, &parameter.id) {
            (Some(id), Some(other)) => id == other,
            _ => self.name == parameter.name,
        }
    }
}

impl From<&str> for ParamRef {
    fn from(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
        }
    }
}

/// A control-flow edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    #[serde(default)]
    pub id: Option<String>,
    pub previous: InvocationRef,
    pub next: InvocationRef,
}

impl Transition {
    pub fn new(previous: &str, next: &str) -> Self {
        Self {
            id: None,
            previous: previous.into(),
            next: next.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueSource {
    Output {
        invocation: InvocationRef,
        output: ParamRef,
    },
    ProcessInput(ParamRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueTarget {
    Input {
        invocation: InvocationRef,
        input: ParamRef,
    },
    ProcessOutput(ParamRef),
}

/// A data-flow edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamAssignment {
    #[serde(default)]
    pub id: Option<String>,
    pub source: ValueSource,
    pub target: ValueTarget,
}

impl ParamAssignment {
    pub fn new(source: ValueSource, target: ValueTarget) -> Self {
        Self {
            id: None,
            source,
            target,
        }
    }

    /// `source.output` feeds `target.input`.
    pub fn link(source: &str, output: &str, target: &str, input: &str) -> Self {
        Self::new(
            ValueSource::Output {
                invocation: source.into(),
                output: output.into(),
            },
            ValueTarget::Input {
                invocation: target.into(),
                input: input.into(),
            },
        )
    }

    /// A process input feeds `target.input`.
    pub fn from_process_input(process_input: &str, target: &str, input: &str) -> Self {
        Self::new(
            ValueSource::ProcessInput(process_input.into()),
            ValueTarget::Input {
                invocation: target.into(),
                input: input.into(),
            },
        )
    }

    /// `source.output` feeds a process output.
    pub fn to_process_output(source: &str, output: &str, process_output: &str) -> Self {
        Self::new(
            ValueSource::Output {
                invocation: source.into(),
                output: output.into(),
            },
            ValueTarget::ProcessOutput(process_output.into()),
        )
    }

    pub fn source_invocation(&self) -> Option<&str> {
        match &self.source {
            ValueSource::Output { invocation, .. } => Some(&invocation.name),
            ValueSource::ProcessInput(_) => None,
        }
    }

    pub fn target_invocation(&self) -> Option<&str> {
        match &self.target {
            ValueTarget::Input { invocation, .. } => Some(&invocation.name),
            ValueTarget::ProcessOutput(_) => None,
        }
    }

    /// Whether this assignment feeds `input` of the invocation named `invocation`.
    pub fn targets_input(&self, invocation: &str, input: &str) -> bool {
        matches!(&self.target, ValueTarget::Input { invocation: inv, input: param }
            if inv.name == invocation && param.name == input)
    }
}

/// A business process graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    pub id: String,
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_callable: bool,
    #[serde(default)]
    pub is_triggerable: bool,
    /// Snapshot marker; a prepared executor is bound to one value.
    #[serde(default)]
    pub last_modified: u64,
    #[serde(default)]
    pub invocations: Vec<Invocation>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    #[serde(default)]
    pub inputs: Vec<Parameter>,
    #[serde(default)]
    pub outputs: Vec<Parameter>,
    #[serde(default)]
    pub param_assignments: Vec<ParamAssignment>,
}

impl Process {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            label: name.clone(),
            name,
            is_draft: false,
            is_active: false,
            is_callable: false,
            is_triggerable: false,
            last_modified: 0,
            invocations: Vec::new(),
            transitions: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            param_assignments: Vec::new(),
        }
    }

    pub fn draft(mut self) -> Self {
        self.is_draft = true;
        self
    }

    pub fn callable(mut self) -> Self {
        self.is_callable = true;
        self
    }

    pub fn triggerable(mut self) -> Self {
        self.is_triggerable = true;
        self
    }

    pub fn active(mut self) -> Self {
        self.is_active = true;
        self
    }

    pub fn with_invocation(mut self, invocation: Invocation) -> Self {
        self.invocations.push(invocation);
        self
    }

    pub fn with_transition(mut self, previous: &str, next: &str) -> Self {
        self.transitions.push(Transition::new(previous, next));
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.inputs.push(Parameter::new(name, data_type));
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.outputs.push(Parameter::new(name, data_type));
        self
    }

    pub fn with_assignment(mut self, assignment: ParamAssignment) -> Self {
        self.param_assignments.push(assignment);
        self
    }

    pub fn find_invocation(&self, name: &str) -> Option<&Invocation> {
        self.invocations.iter().find(|inv| inv.name == name)
    }

    pub fn input(&self, name: &str) -> Option<&Parameter> {
        self.inputs.iter().find(|p| p.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&Parameter> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Processes invoked by this one, directly.
    pub fn sub_processes(&self) -> impl Iterator<Item = &Arc<Process>> {
        self.invocations.iter().filter_map(|inv| match &inv.callable {
            Callable::Process(process) => Some(process),
            Callable::Action(_) => None,
        })
    }
}
