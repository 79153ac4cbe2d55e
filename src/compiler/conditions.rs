use super::types::TypeInference;
use crate::condition::CompiledCondition;
use crate::error::DeclarationError;
use crate::model::{
    CONDITION_ATTR, DataType, GraphIndex, IF_FALSE_ATTR, IF_TRUE_ATTR, Invocation, InvocationRef,
    ParamRef, Process, TypeCatalog, ValueSource,
};

/// Structural checks of a conditional invocation: a condition, branch targets
/// that are actual successors, and references that resolve against the graph.
pub(crate) fn check_conditional(
    process: &Process,
    graph: &GraphIndex,
    idx: usize,
    catalog: &TypeCatalog,
    inference: &mut TypeInference<'_>,
    errors: &mut Vec<DeclarationError>,
) {
    let invocation = &process.invocations[idx];

    let targets: Vec<&String> = invocation
        .attribute_values(IF_TRUE_ATTR)
        .iter()
        .chain(invocation.attribute_values(IF_FALSE_ATTR))
        .collect();
    if targets.is_empty() {
        errors.push(DeclarationError::MissingBranchTarget(invocation.name.clone()));
    }
    for target in targets {
        let is_successor = graph
            .index_of(target)
            .is_some_and(|t| graph.successors(idx).contains(&t));
        if !is_successor {
            errors.push(DeclarationError::UnknownBranchTarget {
                invocation: invocation.name.clone(),
                target: target.clone(),
            });
        }
    }

    let source = match invocation.attribute(CONDITION_ATTR).map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => {
            errors.push(DeclarationError::MissingCondition(invocation.name.clone()));
            return;
        }
    };

    match CompiledCondition::compile(source) {
        Ok(condition) => {
            for reference in condition.references() {
                if let Err(message) = check_reference(process, graph, catalog, inference, reference)
                {
                    errors.push(invalid(invocation, message));
                }
            }
        }
        Err(error) => errors.push(invalid(invocation, error.to_string())),
    }
}

fn invalid(invocation: &Invocation, message: String) -> DeclarationError {
    DeclarationError::InvalidCondition {
        invocation: invocation.name.clone(),
        message,
    }
}

fn check_reference(
    process: &Process,
    graph: &GraphIndex,
    catalog: &TypeCatalog,
    inference: &mut TypeInference<'_>,
    reference: &crate::condition::PathRef,
) -> Result<(), String> {
    let Some(source_idx) = graph.index_of(&reference.invocation) else {
        return Err(format!("unknown invocation '{}'", reference.invocation));
    };
    let source = &process.invocations[source_idx];
    if source.output(&reference.output).is_none() {
        return Err(format!(
            "invocation '{}' has no output '{}'",
            reference.invocation, reference.output
        ));
    }

    let output_source = ValueSource::Output {
        invocation: InvocationRef::from(reference.invocation.as_str()),
        output: ParamRef::from(reference.output.as_str()),
    };
    let Some(mut current) = inference.source_type(&output_source) else {
        return Ok(());
    };

    if reference.fields.is_empty() {
        if current.is_record() {
            return Err(format!(
                "'{}' is a record; reference one of its fields",
                reference
            ));
        }
        return Ok(());
    }

    for field in &reference.fields {
        if !current.is_record() {
            return Err(format!("'{}' walks into non-record type {}", reference, current));
        }
        current = match catalog.field_type(&current, field) {
            Some(t) => t,
            None => return Err(unknown_field(&current, field)),
        };
    }
    Ok(())
}

fn unknown_field(data_type: &DataType, field: &str) -> String {
    format!("type {} does not contain field '{}'", data_type, field)
}
