use super::{DataType, Parameter};
use serde::{Deserialize, Serialize};

/// Input and output of the record actions, and the entry point's trigger slot.
pub const RECORD_PARAM: &str = "record";
/// Field name input of a field-read action.
pub const FIELD_PARAM: &str = "field";
/// Output of a field-read action.
pub const VALUE_PARAM: &str = "value";
/// Comma-separated list of record type names a record action accepts.
pub const ACCEPTED_TYPES_ATTR: &str = "acceptedTypes";
pub const CONDITION_ATTR: &str = "condition";
pub const IF_TRUE_ATTR: &str = "ifTrue";
pub const IF_FALSE_ATTR: &str = "ifFalse";

/// Type tag of an action, deciding how the executor runs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    Conditional,
    FieldUpdate,
    FieldRead,
    RecordCreate,
    RecordUpdate,
    RecordSave,
    Generic,
}

impl ActionType {
    /// Record lifecycle actions may receive a process trigger.
    pub fn is_trigger(self) -> bool {
        matches!(
            self,
            ActionType::RecordCreate | ActionType::RecordUpdate | ActionType::RecordSave
        )
    }
}

/// A leaf capability descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: String,
    pub name: String,
    pub action_type: ActionType,
    #[serde(default)]
    pub inputs: Vec<Parameter>,
    #[serde(default)]
    pub outputs: Vec<Parameter>,
}

impl Action {
    pub fn new(name: impl Into<String>, action_type: ActionType) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            action_type,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.inputs.push(Parameter::new(name, data_type));
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.outputs.push(Parameter::new(name, data_type));
        self
    }

    pub fn record_create() -> Self {
        Self::record_action("RecordCreate", ActionType::RecordCreate)
    }

    pub fn record_update() -> Self {
        Self::record_action("RecordUpdate", ActionType::RecordUpdate)
    }

    pub fn record_save() -> Self {
        Self::record_action("RecordSave", ActionType::RecordSave)
    }

    fn record_action(name: &str, action_type: ActionType) -> Self {
        Self::new(name, action_type)
            .with_input(RECORD_PARAM, DataType::AnyRecord)
            .with_output(RECORD_PARAM, DataType::AnyRecord)
    }

    pub fn field_update() -> Self {
        Self::new("FieldUpdate", ActionType::FieldUpdate).with_input(RECORD_PARAM, DataType::AnyRecord)
    }

    /// The declared output type is a placeholder; validation narrows it to the field's type.
    pub fn field_read() -> Self {
        Self::new("FieldRead", ActionType::FieldRead)
            .with_input(RECORD_PARAM, DataType::AnyRecord)
            .with_input(FIELD_PARAM, DataType::Text)
            .with_output(VALUE_PARAM, DataType::Text)
    }

    pub fn conditional() -> Self {
        Self::new("If", ActionType::Conditional)
    }
}
