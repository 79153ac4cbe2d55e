use crate::model::DataType;
use itertools::Itertools;
use std::fmt;
use thiserror::Error;

/// Problems in a submitted process graph, accumulated at save time.
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeclarationError {
    #[error("Duplicate process input '{0}'")]
    DuplicateProcessInput(String),

    #[error("Duplicate process output '{0}'")]
    DuplicateProcessOutput(String),

    #[error("Invocation name '{0}' is not unique across the process")]
    DuplicateInvocationName(String),

    #[error("Process name '{0}' is empty or not a valid identifier")]
    InvalidProcessName(String),

    #[error("Process label is empty")]
    MissingLabel,

    #[error("Processes in draft state cannot be set as active")]
    ActiveDraft,

    #[error("{context} references unknown invocation '{name}'")]
    UnknownInvocation { name: String, context: String },

    #[error("{context} references unknown parameter '{parameter}' of '{owner}'")]
    UnknownParameter {
        owner: String,
        parameter: String,
        context: String,
    },

    #[error("Process contains no starting action")]
    NoStartingAction,

    #[error("Process contains no entry point")]
    NoEntryPoint,

    #[error("Process contains more than one entry point: {}", .0.join(", "))]
    MultipleEntryPoints(Vec<String>),

    #[error("Entry point '{invocation}' must receive its '{input}' input from a process input")]
    InvalidEntryPointAssignment { invocation: String, input: String },

    #[error("Transitions form a cycle through invocation '{0}'")]
    CyclicTransitions(String),

    #[error("No parameter assignment for input '{input}' of invocation '{invocation}'")]
    UnassignedInput { invocation: String, input: String },

    #[error("More than one assignment of input '{input}' of invocation '{invocation}'")]
    MultipleAssignments { invocation: String, input: String },

    #[error(
        "Ambiguous parameter assignment for input '{input}' of invocation '{invocation}': '{first}' and '{second}' may both execute"
    )]
    AmbiguousAssignment {
        invocation: String,
        input: String,
        first: String,
        second: String,
    },

    #[error("Invalid parameter assignment from {source_name} ({source_type}) to {target_name} ({target_type})")]
    IncompatibleTypes {
        source_name: String,
        source_type: DataType,
        target_name: String,
        target_type: DataType,
    },

    #[error("Conditional invocation '{0}' has no condition assigned")]
    MissingCondition(String),

    #[error("Conditional invocation '{0}' has no branch target")]
    MissingBranchTarget(String),

    #[error("Conditional invocation '{invocation}' branches to '{target}', which is not one of its successors")]
    UnknownBranchTarget { invocation: String, target: String },

    #[error("Invalid condition on '{invocation}': {message}")]
    InvalidCondition { invocation: String, message: String },

    #[error("Field-read invocation '{invocation}' must name exactly one field, found {count}")]
    FieldReadAttributes { invocation: String, count: usize },

    #[error("Field-read invocation '{0}' has no record input of a known record type")]
    UntypedFieldRead(String),

    #[error("Type {data_type} does not contain field '{field}'")]
    UnknownField { data_type: DataType, field: String },

    #[error("Field-update invocation '{invocation}' assigns '{value}' to field '{field}' of type {expected}")]
    InvalidFieldLiteral {
        invocation: String,
        field: String,
        value: String,
        expected: DataType,
    },

    #[error("No assignment for process output '{0}'")]
    UnassignedOutput(String),

    #[error("More than one assignment of process output '{0}'")]
    MultipleOutputAssignments(String),

    #[error("Process input cannot be passed to output '{0}' without processing")]
    InputPassedToOutput(String),

    #[error("Invocation '{invocation}' calls process '{process}', which is not callable")]
    NotCallable { invocation: String, process: String },

    #[error("Triggerable process should have exactly one input value, but has {0}")]
    TriggerableInputCount(usize),

    #[error("Input '{input}' of a triggerable process must be a generic record, found {data_type}")]
    TriggerableInputType { input: String, data_type: DataType },

    #[error("Process '{process}' is used by other processes and its signature changed: {change}")]
    UsedCallableChanged { process: String, change: String },
}

/// Problems parsing or evaluating a condition expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConditionError {
    #[error("Unexpected character '{found}' at position {position}")]
    UnexpectedCharacter { found: char, position: usize },

    #[error("Unterminated {0} starting at position {1}")]
    Unterminated(&'static str, usize),

    #[error("Expected {expected} at position {position}, found '{found}'")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        position: usize,
    },

    #[error("Unexpected end of condition, expected {0}")]
    UnexpectedEnd(&'static str),

    #[error("Reference '{0}' must name an invocation and one of its outputs")]
    InvalidReference(String),

    #[error("Reference '{0}' could not be resolved")]
    Unresolved(String),

    #[error("Operator '{operator}' cannot compare {left} with {right}")]
    TypeMismatch {
        operator: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("Condition must evaluate to a boolean, found {0}")]
    NotBoolean(&'static str),
}

/// Failures raised by action implementations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("Action '{action}' has no input named '{input}'")]
    UnknownInput { action: String, input: String },

    #[error("Action '{action}' has no output named '{output}'")]
    UnknownOutput { action: String, output: String },

    #[error("Input '{input}' expected {expected}, found {found}")]
    InvalidInput {
        input: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0}")]
    Failed(String),
}

/// Failures of the record persistence service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("Record '{id}' of type '{type_name}' not found")]
    NotFound { type_name: String, id: String },

    #[error("Record of type '{0}' has no id")]
    MissingId(String),

    #[error("Record storage failure: {0}")]
    Storage(String),

    #[error("Type '{type_name}' does not contain field '{field}'")]
    UnknownField { type_name: String, field: String },

    #[error("Error assigning value '{value}' to field '{field}' of type {expected}")]
    InvalidFieldValue {
        field: String,
        value: String,
        expected: DataType,
    },
}

/// Failures of the process repository.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("Process '{0}' not found")]
    NotFound(String),

    #[error("Process storage failure: {0}")]
    Storage(String),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Failures reading or writing a binary archive.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArtifactError {
    #[error("Serialization failed: {0}")]
    Encode(String),

    #[error("Deserialization failed: {0}")]
    Decode(String),

    #[error("Could not access file '{path}': {message}")]
    Io { path: String, message: String },
}

/// One input of a blocked invocation and the producers it still waits for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwaitedInput {
    pub input: String,
    pub producers: Vec<String>,
}

/// A blocked invocation reported by a deadlock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedInvocation {
    pub invocation: String,
    pub awaiting: Vec<AwaitedInput>,
}

impl BlockedInvocation {
    /// Every producer this invocation waits for, deduplicated and sorted.
    pub fn producers(&self) -> Vec<&str> {
        self.awaiting
            .iter()
            .flat_map(|a| a.producers.iter().map(String::as_str))
            .sorted()
            .dedup()
            .collect()
    }
}

impl fmt::Display for BlockedInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (waiting for {{{}}})",
            self.invocation,
            self.producers().join(", ")
        )
    }
}

/// Errors that abort a process run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Process '{0}' has no invocations")]
    EmptyProcess(String),

    #[error("Process '{0}' contains no entry point")]
    NoEntryPoint(String),

    #[error("Process '{process}' contains more than one entry point: {}", .names.join(", "))]
    MultipleEntryPoints { process: String, names: Vec<String> },

    #[error("Executor has not been prepared")]
    NotPrepared,

    #[error(
        "Executor was prepared for version {prepared} of process '{process}', but called with version {requested}"
    )]
    StaleProcess {
        process: String,
        prepared: u64,
        requested: u64,
    },

    #[error("Entry point '{invocation}' is not a record trigger action")]
    UnsupportedEntryPoint { invocation: String },

    #[error("Entry point '{invocation}' must receive its record from a process input")]
    InvalidEntryPointAssignment { invocation: String },

    #[error("Entry point '{invocation}' received {found} instead of a record")]
    EntryPointNotRecord { invocation: String, found: &'static str },

    #[error("Input parameter '{0}' not passed to process")]
    MissingProcessInput(String),

    #[error("Input '{input}' of invocation '{invocation}' is not assigned")]
    UnassignedInput { invocation: String, input: String },

    #[error("Input '{input}' of invocation '{invocation}' expected a record, found {found}")]
    NotARecord {
        invocation: String,
        input: String,
        found: &'static str,
    },

    #[error("Invocation '{0}' is blocked waiting for itself")]
    SelfBlocked(String),

    #[error("Process is blocked at the following invocations: {}", .blocked.iter().join(", "))]
    Deadlock { blocked: Vec<BlockedInvocation> },

    #[error("No implementation registered for action '{action}' of invocation '{invocation}'")]
    UnknownAction { invocation: String, action: String },

    #[error("Conditional invocation '{0}' has no compiled condition")]
    MissingCondition(String),

    #[error("Action of invocation '{invocation}' failed: {source}")]
    Action {
        invocation: String,
        #[source]
        source: ActionError,
    },

    #[error("Record access of invocation '{invocation}' failed: {source}")]
    Record {
        invocation: String,
        #[source]
        source: RecordError,
    },

    #[error("Condition of invocation '{invocation}' failed: {source}")]
    Condition {
        invocation: String,
        #[source]
        source: ConditionError,
    },

    #[error("Sub-process of invocation '{invocation}' failed: {source}")]
    SubProcess {
        invocation: String,
        #[source]
        source: Box<ExecutionError>,
    },

    #[error("Sub-process nesting exceeds {limit} levels at invocation '{invocation}'")]
    SubProcessDepth { invocation: String, limit: usize },

    #[error("Output value for process output '{0}' not found")]
    UnboundOutput(String),

    #[error("Cannot pass input value to output '{0}' without processing")]
    InputPassedToOutput(String),
}

/// Failures loading engine configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Could not read configuration file '{path}': {message}")]
    Io { path: String, message: String },
}

/// Failures of the process service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("Process '{0}' is a draft and cannot be executed")]
    DraftProcess(String),
}
