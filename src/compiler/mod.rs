//! Save-time validation of process graphs.
//!
//! [`ProcessValidator::validate`] standardizes a submitted process, checks its
//! naming invariants and, for non-draft processes, the full set of structural
//! and type rules. Errors accumulate; the caller decides whether to persist.

mod assignments;
mod conditions;
pub mod standardizer;
mod traversal;
pub mod types;

pub use standardizer::Standardizer;
pub use traversal::mutually_exclusive;
pub use types::{InputTypes, OutputNarrower, accepted_types};

use crate::error::DeclarationError;
use crate::model::{
    ActionType, Callable, DataType, GraphIndex, Process, RECORD_PARAM, TypeCatalog, ValueSource,
};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use tracing::debug;
use types::TypeInference;

/// Outcome of validating one process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    pub errors: Vec<DeclarationError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

pub struct ProcessValidator<'c> {
    catalog: &'c TypeCatalog,
    narrowers: AHashMap<String, Box<dyn OutputNarrower>>,
}

pub struct ValidatorBuilder<'c> {
    catalog: &'c TypeCatalog,
    narrowers: AHashMap<String, Box<dyn OutputNarrower>>,
}

impl<'c> ValidatorBuilder<'c> {
    pub fn new(catalog: &'c TypeCatalog) -> Self {
        Self {
            catalog,
            narrowers: AHashMap::new(),
        }
    }

    /// Registers output narrowing for a custom action, keyed by action name.
    pub fn with_output_narrower(mut self, narrower: Box<dyn OutputNarrower>) -> Self {
        self.narrowers
            .insert(narrower.action_name().to_string(), narrower);
        self
    }

    pub fn build(self) -> ProcessValidator<'c> {
        ProcessValidator {
            catalog: self.catalog,
            narrowers: self.narrowers,
        }
    }
}

impl<'c> ProcessValidator<'c> {
    pub fn builder(catalog: &'c TypeCatalog) -> ValidatorBuilder<'c> {
        ValidatorBuilder::new(catalog)
    }

    pub fn new(catalog: &'c TypeCatalog) -> Self {
        Self::builder(catalog).build()
    }

    /// Validates `process`, standardizing its references in place.
    ///
    /// For non-draft processes the inferred output types and traversed-node
    /// sets are written back onto the invocations.
    pub fn validate(&self, process: &mut Process) -> ValidationResult {
        let mut errors = Vec::new();

        check_unique_names(process, &mut errors);
        errors.extend(Standardizer::standardize(process));
        check_header(process, &mut errors);

        if !process.is_draft {
            self.validate_non_draft(process, &mut errors);
        }

        // Stable across invocation ordering.
        let errors: Vec<DeclarationError> = errors
            .into_iter()
            .unique()
            .sorted_by_cached_key(ToString::to_string)
            .collect();

        debug!(
            process = %process.name,
            draft = process.is_draft,
            errors = errors.len(),
            "validated process"
        );
        ValidationResult { errors }
    }

    fn validate_non_draft(&self, process: &mut Process, errors: &mut Vec<DeclarationError>) {
        let graph = GraphIndex::build(process);

        let (traversed, cycle) = traversal::traversed_sets(process, &graph);
        errors.extend(cycle);
        for (invocation, set) in process.invocations.iter_mut().zip(traversed) {
            invocation.traversed = set;
        }

        let narrowed = {
            let snapshot: &Process = process;
            let mut inference = TypeInference::new(snapshot, &graph, self.catalog, &self.narrowers);
            check_entry_point(snapshot, &graph, errors);
            assignments::check_input_producers(snapshot, &graph, errors);
            assignments::check_process_outputs(snapshot, errors);
            assignments::check_types(snapshot, &mut inference, errors);
            for idx in 0..snapshot.invocations.len() {
                if snapshot.invocations[idx].is_conditional() {
                    conditions::check_conditional(
                        snapshot,
                        &graph,
                        idx,
                        self.catalog,
                        &mut inference,
                        errors,
                    );
                }
            }
            check_sub_processes(snapshot, errors);
            if snapshot.is_triggerable {
                check_triggerable(snapshot, errors);
            }

            let (narrowed, inference_errors) = inference.run();
            errors.extend(inference_errors);
            narrowed
        };

        for (invocation, types) in process.invocations.iter_mut().zip(narrowed) {
            invocation.actual_output_types = types;
        }
    }
}

fn check_unique_names(process: &Process, errors: &mut Vec<DeclarationError>) {
    let mut seen = AHashSet::new();
    for input in &process.inputs {
        if !seen.insert(input.name.as_str()) {
            errors.push(DeclarationError::DuplicateProcessInput(input.name.clone()));
        }
    }
    let mut seen = AHashSet::new();
    for output in &process.outputs {
        if !seen.insert(output.name.as_str()) {
            errors.push(DeclarationError::DuplicateProcessOutput(output.name.clone()));
        }
    }
    let mut seen = AHashSet::new();
    for invocation in &process.invocations {
        if !seen.insert(invocation.name.as_str()) {
            errors.push(DeclarationError::DuplicateInvocationName(
                invocation.name.clone(),
            ));
        }
    }
}

fn check_header(process: &Process, errors: &mut Vec<DeclarationError>) {
    if !is_identifier(&process.name) {
        errors.push(DeclarationError::InvalidProcessName(process.name.clone()));
    }
    if process.label.trim().is_empty() {
        errors.push(DeclarationError::MissingLabel);
    }
    if process.is_draft && process.is_active {
        errors.push(DeclarationError::ActiveDraft);
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Exactly one starting action must be a trigger-capable entry point, and it
/// receives its record from a process input.
fn check_entry_point(process: &Process, graph: &GraphIndex, errors: &mut Vec<DeclarationError>) {
    let starting = graph.starting_points();
    if starting.is_empty() {
        errors.push(DeclarationError::NoStartingAction);
        return;
    }

    let candidates: Vec<usize> = starting
        .into_iter()
        .filter(|&idx| {
            process.invocations[idx]
                .action_type()
                .is_some_and(ActionType::is_trigger)
        })
        .collect();

    let entry = match candidates.as_slice() {
        [] => {
            errors.push(DeclarationError::NoEntryPoint);
            return;
        }
        [single] => &process.invocations[*single],
        many => {
            let names = many
                .iter()
                .map(|&idx| process.invocations[idx].name.clone())
                .sorted()
                .collect();
            errors.push(DeclarationError::MultipleEntryPoints(names));
            return;
        }
    };

    for assignment in &process.param_assignments {
        if assignment.target_invocation() != Some(entry.name.as_str()) {
            continue;
        }
        let valid = assignment.targets_input(&entry.name, RECORD_PARAM)
            && matches!(assignment.source, ValueSource::ProcessInput(_));
        if !valid {
            errors.push(DeclarationError::InvalidEntryPointAssignment {
                invocation: entry.name.clone(),
                input: RECORD_PARAM.to_string(),
            });
        }
    }
}

fn check_sub_processes(process: &Process, errors: &mut Vec<DeclarationError>) {
    for invocation in &process.invocations {
        if let Callable::Process(sub) = &invocation.callable {
            if !sub.is_callable {
                errors.push(DeclarationError::NotCallable {
                    invocation: invocation.name.clone(),
                    process: sub.name.clone(),
                });
            }
        }
    }
}

fn check_triggerable(process: &Process, errors: &mut Vec<DeclarationError>) {
    match process.inputs.as_slice() {
        [input] => {
            if input.data_type != DataType::AnyRecord {
                errors.push(DeclarationError::TriggerableInputType {
                    input: input.name.clone(),
                    data_type: input.data_type.clone(),
                });
            }
        }
        inputs => errors.push(DeclarationError::TriggerableInputCount(inputs.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(is_identifier("Invoice_Flow2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("with space"));
    }
}
