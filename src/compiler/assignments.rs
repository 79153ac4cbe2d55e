use super::traversal::mutually_exclusive;
use super::types::TypeInference;
use crate::error::DeclarationError;
use crate::model::{DataType, GraphIndex, Process, ValueSource, ValueTarget};

/// Every declared input has exactly one non-ambiguous producer: a literal
/// attribute, a process input, or the outputs of mutually exclusive invocations.
pub(crate) fn check_input_producers(
    process: &Process,
    graph: &GraphIndex,
    errors: &mut Vec<DeclarationError>,
) {
    for invocation in &process.invocations {
        for input in invocation.inputs() {
            let sources: Vec<&ValueSource> = process
                .param_assignments
                .iter()
                .filter(|a| a.targets_input(&invocation.name, &input.name))
                .map(|a| &a.source)
                .collect();

            if sources.is_empty() {
                if invocation.attribute(&input.name).is_none() {
                    errors.push(DeclarationError::UnassignedInput {
                        invocation: invocation.name.clone(),
                        input: input.name.clone(),
                    });
                }
                continue;
            }

            let from_process = sources
                .iter()
                .any(|s| matches!(s, ValueSource::ProcessInput(_)));
            if from_process && sources.len() > 1 {
                errors.push(DeclarationError::MultipleAssignments {
                    invocation: invocation.name.clone(),
                    input: input.name.clone(),
                });
                continue;
            }

            let producers: Vec<&str> = sources
                .iter()
                .filter_map(|s| match s {
                    ValueSource::Output { invocation, .. } => Some(invocation.name.as_str()),
                    ValueSource::ProcessInput(_) => None,
                })
                .collect();
            if let Some(error) = first_conflict(process, graph, &invocation.name, &input.name, &producers) {
                errors.push(error);
            }
        }
    }
}

fn first_conflict(
    process: &Process,
    graph: &GraphIndex,
    target: &str,
    input: &str,
    producers: &[&str],
) -> Option<DeclarationError> {
    for (i, first) in producers.iter().enumerate() {
        for second in &producers[i + 1..] {
            if first == second {
                return Some(DeclarationError::MultipleAssignments {
                    invocation: target.to_string(),
                    input: input.to_string(),
                });
            }
            let (Some(a), Some(b)) = (graph.index_of(first), graph.index_of(second)) else {
                continue;
            };
            if !mutually_exclusive(&process.invocations[a], &process.invocations[b]) {
                let (first, second) = if first <= second {
                    (first, second)
                } else {
                    (second, first)
                };
                return Some(DeclarationError::AmbiguousAssignment {
                    invocation: target.to_string(),
                    input: input.to_string(),
                    first: first.to_string(),
                    second: second.to_string(),
                });
            }
        }
    }
    None
}

/// Source types must equal target types, or narrow a concrete record into a generic one.
pub(crate) fn check_types(
    process: &Process,
    inference: &mut TypeInference<'_>,
    errors: &mut Vec<DeclarationError>,
) {
    for assignment in &process.param_assignments {
        let Some(source_type) = inference.source_type(&assignment.source) else {
            continue;
        };
        let Some(target_type) = target_type(process, &assignment.target) else {
            continue;
        };
        if !source_type.can_cast_to(&target_type) {
            errors.push(DeclarationError::IncompatibleTypes {
                source_name: describe_source(&assignment.source),
                source_type,
                target_name: describe_target(&assignment.target),
                target_type,
            });
        }
    }
}

fn target_type(process: &Process, target: &ValueTarget) -> Option<DataType> {
    match target {
        ValueTarget::Input { invocation, input } => process
            .find_invocation(&invocation.name)
            .and_then(|inv| inv.input(&input.name))
            .map(|p| p.data_type.clone()),
        ValueTarget::ProcessOutput(param) => process
            .outputs
            .iter()
            .find(|p| param.matches(p))
            .map(|p| p.data_type.clone()),
    }
}

fn describe_source(source: &ValueSource) -> String {
    match source {
        ValueSource::Output { invocation, output } => {
            format!("{{{}}}.{}", invocation.name, output.name)
        }
        ValueSource::ProcessInput(param) => format!("process input '{}'", param.name),
    }
}

fn describe_target(target: &ValueTarget) -> String {
    match target {
        ValueTarget::Input { invocation, input } => {
            format!("{{{}}}.{}", invocation.name, input.name)
        }
        ValueTarget::ProcessOutput(param) => format!("process output '{}'", param.name),
    }
}

/// Every process output is bound to exactly one invocation output.
pub(crate) fn check_process_outputs(process: &Process, errors: &mut Vec<DeclarationError>) {
    for output in &process.outputs {
        let sources: Vec<&ValueSource> = process
            .param_assignments
            .iter()
            .filter(|a| matches!(&a.target, ValueTarget::ProcessOutput(p) if p.matches(output)))
            .map(|a| &a.source)
            .collect();

        match sources.as_slice() {
            [] => errors.push(DeclarationError::UnassignedOutput(output.name.clone())),
            [ValueSource::ProcessInput(_)] => {
                errors.push(DeclarationError::InputPassedToOutput(output.name.clone()))
            }
            [_] => {}
            _ => errors.push(DeclarationError::MultipleOutputAssignments(
                output.name.clone(),
            )),
        }
    }
}
