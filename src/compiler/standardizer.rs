use crate::error::DeclarationError;
use crate::model::{InvocationRef, ParamRef, Parameter, Process, ValueSource, ValueTarget};
use ahash::AHashMap;

/// Canonical identity of one invocation and its declarations.
struct CanonicalInvocation {
    id: Option<String>,
    name: String,
    inputs: Vec<Parameter>,
    outputs: Vec<Parameter>,
}

/// Rewrites the cross-references of a submitted graph so every transition and
/// parameter assignment points at the canonical invocation and parameter found
/// in the process's own collections.
///
/// Invocations are matched by name, falling back to id. Parameters are matched
/// by id when both sides carry one, otherwise by name. References that match
/// nothing are reported and left untouched.
pub struct Standardizer {
    invocations: Vec<CanonicalInvocation>,
    by_name: AHashMap<String, usize>,
    by_id: AHashMap<String, usize>,
    process_inputs: Vec<Parameter>,
    process_outputs: Vec<Parameter>,
    errors: Vec<DeclarationError>,
}

impl Standardizer {
    pub fn new(process: &Process) -> Self {
        let mut by_name = AHashMap::new();
        let mut by_id = AHashMap::new();
        let invocations = process
            .invocations
            .iter()
            .enumerate()
            .map(|(idx, inv)| {
                // First occurrence wins; duplicates are the validator's concern.
                by_name.entry(inv.name.clone()).or_insert(idx);
                if let Some(id) = &inv.id {
                    by_id.entry(id.clone()).or_insert(idx);
                }
                CanonicalInvocation {
                    id: inv.id.clone(),
                    name: inv.name.clone(),
                    inputs: inv.inputs().to_vec(),
                    outputs: inv.outputs().to_vec(),
                }
            })
            .collect();

        Self {
            invocations,
            by_name,
            by_id,
            process_inputs: process.inputs.clone(),
            process_outputs: process.outputs.clone(),
            errors: Vec::new(),
        }
    }

    /// Standardizes `process` in place and returns the unresolved references.
    pub fn standardize(process: &mut Process) -> Vec<DeclarationError> {
        let mut standardizer = Self::new(process);

        for transition in &mut process.transitions {
            standardizer.resolve_invocation(&mut transition.previous, "Transition");
            standardizer.resolve_invocation(&mut transition.next, "Transition");
        }

        for assignment in &mut process.param_assignments {
            match &mut assignment.source {
                ValueSource::Output { invocation, output } => {
                    if let Some(idx) =
                        standardizer.resolve_invocation(invocation, "Parameter assignment")
                    {
                        standardizer.resolve_output(idx, output);
                    }
                }
                ValueSource::ProcessInput(param) => {
                    standardizer.resolve_process_param(param, true);
                }
            }
            match &mut assignment.target {
                ValueTarget::Input { invocation, input } => {
                    if let Some(idx) =
                        standardizer.resolve_invocation(invocation, "Parameter assignment")
                    {
                        standardizer.resolve_input(idx, input);
                    }
                }
                ValueTarget::ProcessOutput(param) => {
                    standardizer.resolve_process_param(param, false);
                }
            }
        }

        standardizer.errors
    }

    fn resolve_invocation(&mut self, reference: &mut InvocationRef, context: &str) -> Option<usize> {
        let idx = self.by_name.get(&reference.name).copied().or_else(|| {
            reference
                .id
                .as_ref()
                .and_then(|id| self.by_id.get(id).copied())
        });
        match idx {
            Some(idx) => {
                let canonical = &self.invocations[idx];
                reference.id = canonical.id.clone();
                reference.name = canonical.name.clone();
                Some(idx)
            }
            None => {
                self.errors.push(DeclarationError::UnknownInvocation {
                    name: reference.name.clone(),
                    context: context.to_string(),
                });
                None
            }
        }
    }

    fn resolve_output(&mut self, idx: usize, reference: &mut ParamRef) {
        let canonical = &self.invocations[idx];
        let found = canonical.outputs.iter().find(|p| reference.matches(p)).cloned();
        let owner = canonical.name.clone();
        self.apply(found, reference, owner, "Output reference");
    }

    fn resolve_input(&mut self, idx: usize, reference: &mut ParamRef) {
        let canonical = &self.invocations[idx];
        let found = canonical.inputs.iter().find(|p| reference.matches(p)).cloned();
        let owner = canonical.name.clone();
        self.apply(found, reference, owner, "Input reference");
    }

    fn resolve_process_param(&mut self, reference: &mut ParamRef, is_input: bool) {
        let (params, context) = if is_input {
            (&self.process_inputs, "Process input reference")
        } else {
            (&self.process_outputs, "Process output reference")
        };
        let found = params.iter().find(|p| reference.matches(p)).cloned();
        self.apply(found, reference, "process".to_string(), context);
    }

    fn apply(
        &mut self,
        found: Option<Parameter>,
        reference: &mut ParamRef,
        owner: String,
        context: &str,
    ) {
        match found {
            Some(parameter) => {
                reference.id = parameter.id;
                reference.name = parameter.name;
            }
            None => self.errors.push(DeclarationError::UnknownParameter {
                owner,
                parameter: reference.name.clone(),
                context: context.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, DataType, Invocation, ParamAssignment, Transition};

    #[test]
    fn rewrites_duplicate_copies_to_canonical_identity() {
        let mut process = Process::new("p1", "Sample")
            .with_input("trigger", DataType::AnyRecord)
            .with_invocation(Invocation::new("Start", Action::record_create()).with_id("inv-1"));
        process.inputs[0].id = Some("in-1".into());

        // A stale copy: right id, outdated name.
        process.transitions.push(Transition {
            id: None,
            previous: InvocationRef {
                id: Some("inv-1".into()),
                name: "Old Start".into(),
            },
            next: "Start".into(),
        });
        let mut assignment = ParamAssignment::from_process_input("ignored", "Start", "record");
        assignment.source = ValueSource::ProcessInput(ParamRef {
            id: Some("in-1".into()),
            name: "renamed".into(),
        });
        process.param_assignments.push(assignment);

        let errors = Standardizer::standardize(&mut process);
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(process.transitions[0].previous.name, "Start");
        assert_eq!(process.transitions[0].next.id.as_deref(), Some("inv-1"));
        assert_eq!(
            process.param_assignments[0].source,
            ValueSource::ProcessInput(ParamRef {
                id: Some("in-1".into()),
                name: "trigger".into()
            })
        );
    }

    #[test]
    fn reports_unresolved_references() {
        let mut process = Process::new("p1", "Sample")
            .with_invocation(Invocation::new("Start", Action::record_create()))
            .with_transition("Start", "Ghost")
            .with_assignment(ParamAssignment::link("Start", "nothing", "Start", "record"));

        let errors = Standardizer::standardize(&mut process);
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&DeclarationError::UnknownInvocation {
            name: "Ghost".into(),
            context: "Transition".into()
        }));
        assert!(errors.contains(&DeclarationError::UnknownParameter {
            owner: "Start".into(),
            parameter: "nothing".into(),
            context: "Output reference".into()
        }));
    }
}
