use crate::error::DeclarationError;
use crate::model::{
    ACCEPTED_TYPES_ATTR, ActionType, DataType, FIELD_PARAM, GraphIndex, Invocation, Process,
    RECORD_PARAM, TypeCatalog, VALUE_PARAM, Value, ValueSource,
};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;

/// Narrows the output types of a custom action from its attributes and inputs.
pub trait OutputNarrower: Send + Sync {
    /// Name of the action this narrower applies to.
    fn action_name(&self) -> &str;

    fn narrow(
        &self,
        invocation: &Invocation,
        inputs: &mut InputTypes<'_, '_>,
    ) -> Result<Vec<(String, DataType)>, DeclarationError>;
}

/// Resolves the actual types flowing into one invocation's inputs.
pub struct InputTypes<'s, 'p> {
    inference: &'s mut TypeInference<'p>,
    invocation: usize,
}

impl InputTypes<'_, '_> {
    /// Actual type of the value assigned to `input`, if any assignment feeds it.
    pub fn actual(&mut self, input: &str) -> Option<DataType> {
        let process = self.inference.process;
        let name = &process.invocations[self.invocation].name;
        let source = process
            .param_assignments
            .iter()
            .find(|a| a.targets_input(name, input))
            .map(|a| a.source.clone())?;
        self.inference.source_type(&source)
    }

    pub fn catalog(&self) -> &TypeCatalog {
        self.inference.catalog
    }
}

/// Memoized inference of actual output types across the graph.
pub(crate) struct TypeInference<'p> {
    process: &'p Process,
    graph: &'p GraphIndex,
    catalog: &'p TypeCatalog,
    narrowers: &'p AHashMap<String, Box<dyn OutputNarrower>>,
    memo: AHashMap<usize, AHashMap<String, DataType>>,
    in_progress: AHashSet<usize>,
    errors: Vec<DeclarationError>,
}

impl<'p> TypeInference<'p> {
    pub(crate) fn new(
        process: &'p Process,
        graph: &'p GraphIndex,
        catalog: &'p TypeCatalog,
        narrowers: &'p AHashMap<String, Box<dyn OutputNarrower>>,
    ) -> Self {
        Self {
            process,
            graph,
            catalog,
            narrowers,
            memo: AHashMap::new(),
            in_progress: AHashSet::new(),
            errors: Vec::new(),
        }
    }

    /// Infers every invocation and returns the narrowed types per invocation index.
    pub(crate) fn run(mut self) -> (Vec<AHashMap<String, DataType>>, Vec<DeclarationError>) {
        for idx in 0..self.process.invocations.len() {
            self.output_types(idx);
        }
        let narrowed = (0..self.process.invocations.len())
            .map(|idx| self.memo.remove(&idx).unwrap_or_default())
            .collect();
        (narrowed, self.errors)
    }

    /// Type carried by an assignment source, using narrowed output types.
    pub(crate) fn source_type(&mut self, source: &ValueSource) -> Option<DataType> {
        match source {
            ValueSource::ProcessInput(param) => self
                .process
                .inputs
                .iter()
                .find(|p| param.matches(p))
                .map(|p| p.data_type.clone()),
            ValueSource::Output { invocation, output } => {
                let idx = self.graph.index_of(&invocation.name)?;
                let narrowed = self.output_types(idx);
                narrowed.get(&output.name).cloned().or_else(|| {
                    self.process.invocations[idx]
                        .output(&output.name)
                        .map(|p| p.data_type.clone())
                })
            }
        }
    }

    fn output_types(&mut self, idx: usize) -> AHashMap<String, DataType> {
        if let Some(types) = self.memo.get(&idx) {
            return types.clone();
        }
        // A data-dependency cycle; fall back to the declared types.
        if !self.in_progress.insert(idx) {
            return AHashMap::new();
        }

        let process = self.process;
        let invocation = &process.invocations[idx];
        let narrowed = match self.narrow(idx, invocation) {
            Ok(types) => types.into_iter().collect(),
            Err(error) => {
                self.errors.push(error);
                AHashMap::new()
            }
        };

        self.in_progress.remove(&idx);
        self.memo.insert(idx, narrowed.clone());
        narrowed
    }

    fn narrow(
        &mut self,
        idx: usize,
        invocation: &Invocation,
    ) -> Result<Vec<(String, DataType)>, DeclarationError> {
        let narrowers = self.narrowers;
        if let Some(narrower) = narrowers.get(invocation.callable.name()) {
            let mut inputs = InputTypes {
                inference: self,
                invocation: idx,
            };
            return narrower.narrow(invocation, &mut inputs);
        }

        match invocation.action_type() {
            Some(ActionType::FieldRead) => {
                let mut inputs = InputTypes {
                    inference: self,
                    invocation: idx,
                };
                narrow_field_read(invocation, &mut inputs)
            }
            Some(ActionType::FieldUpdate) => {
                let mut inputs = InputTypes {
                    inference: self,
                    invocation: idx,
                };
                check_field_update(invocation, &mut inputs).map(|()| Vec::new())
            }
            Some(t) if t.is_trigger() => Ok(narrow_record_action(invocation)),
            _ => Ok(Vec::new()),
        }
    }
}

/// A field-read publishes the declared type of the field it reads.
fn narrow_field_read(
    invocation: &Invocation,
    inputs: &mut InputTypes<'_, '_>,
) -> Result<Vec<(String, DataType)>, DeclarationError> {
    let fields = invocation.attribute_values(FIELD_PARAM);
    if fields.len() != 1 {
        return Err(DeclarationError::FieldReadAttributes {
            invocation: invocation.name.clone(),
            count: fields.len(),
        });
    }
    let field = fields[0].trim();

    let record_type = match inputs.actual(RECORD_PARAM) {
        Some(t) if t.is_record() => t,
        _ => return Err(DeclarationError::UntypedFieldRead(invocation.name.clone())),
    };
    let field_type = inputs
        .catalog()
        .field_type(&record_type, field)
        .ok_or_else(|| DeclarationError::UnknownField {
            data_type: record_type.clone(),
            field: field.to_string(),
        })?;
    Ok(vec![(VALUE_PARAM.to_string(), field_type)])
}

/// Every attribute of a field-update on a declared record type must name a
/// field of that type and carry a literal of the field's type.
fn check_field_update(
    invocation: &Invocation,
    inputs: &mut InputTypes<'_, '_>,
) -> Result<(), DeclarationError> {
    let Some(record_type) = inputs.actual(RECORD_PARAM) else {
        return Ok(());
    };
    let DataType::Record(type_name) = &record_type else {
        return Ok(());
    };
    if !inputs.catalog().contains(type_name) {
        return Ok(());
    }

    for (field, values) in invocation.attributes.iter().sorted_by_key(|(field, _)| *field) {
        let Some(raw) = values.first() else { continue };
        let field_type = inputs
            .catalog()
            .field_type(&record_type, field)
            .ok_or_else(|| DeclarationError::UnknownField {
                data_type: record_type.clone(),
                field: field.clone(),
            })?;
        if Value::parse_literal(raw, &field_type).is_none() {
            return Err(DeclarationError::InvalidFieldLiteral {
                invocation: invocation.name.clone(),
                field: field.clone(),
                value: raw.clone(),
                expected: field_type,
            });
        }
    }
    Ok(())
}

/// A record action restricted to a single type publishes that concrete type.
fn narrow_record_action(invocation: &Invocation) -> Vec<(String, DataType)> {
    let accepted = accepted_types(invocation);
    let record_type = match accepted.as_slice() {
        [single] => DataType::Record(single.clone()),
        _ => DataType::AnyRecord,
    };
    invocation
        .outputs()
        .iter()
        .filter(|p| p.name == RECORD_PARAM)
        .map(|p| (p.name.clone(), record_type.clone()))
        .collect()
}

/// Type names listed in the `acceptedTypes` attribute.
pub fn accepted_types(invocation: &Invocation) -> Vec<String> {
    invocation
        .attribute_values(ACCEPTED_TYPES_ATTR)
        .iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
