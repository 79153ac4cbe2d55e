mod common;
use common::*;
use tejun::compiler::InputTypes;
use tejun::model::{ValueSource, ValueTarget};
use tejun::prelude::*;

fn chained_producers() -> Process {
    triggered_process("p-chain", "Chained", None)
        .with_invocation(echo("A", Some("1")))
        .with_invocation(echo("B", Some("2")))
        .with_invocation(echo("C", None))
        .with_transition("Created", "A")
        .with_transition("A", "B")
        .with_transition("B", "C")
        .with_assignment(ParamAssignment::link("A", "value", "C", "value"))
        .with_assignment(ParamAssignment::link("B", "value", "C", "value"))
}

fn opposite_branches() -> Process {
    triggered_process("p-branches", "Opposite_Branches", Some("Invoice"))
        .with_invocation(conditional(
            "Check",
            "{Created}.record.amount > 100",
            &["Approve"],
            &["Reject"],
        ))
        .with_invocation(echo("Approve", Some("1")))
        .with_invocation(echo("Reject", Some("2")))
        .with_invocation(echo("Merge", None))
        .with_transition("Created", "Check")
        .with_transition("Check", "Approve")
        .with_transition("Check", "Reject")
        .with_transition("Approve", "Merge")
        .with_transition("Reject", "Merge")
        .with_assignment(ParamAssignment::link("Approve", "value", "Merge", "value"))
        .with_assignment(ParamAssignment::link("Reject", "value", "Merge", "value"))
}

/// A conditional `Check` between a typed entry point and `Approve`.
fn with_condition(condition: &str) -> Process {
    triggered_process("p-cond", "Conditional", Some("Invoice"))
        .with_invocation(conditional("Check", condition, &["Approve"], &[]))
        .with_invocation(echo("Approve", Some("1")))
        .with_transition("Created", "Check")
        .with_transition("Check", "Approve")
}

fn condition_messages(condition: &str) -> Vec<String> {
    validation_errors(with_condition(condition))
        .into_iter()
        .filter_map(|e| match e {
            DeclarationError::InvalidCondition { message, .. } => Some(message),
            _ => None,
        })
        .collect()
}

#[test]
fn test_valid_processes_pass() {
    validated(stamp_process());
    validated(routing_process(true));
    validated(routing_process(false));
    validated(join_process(false, false));
    validated(summarize_process(validated(summary_sub_process())));
}

#[test]
fn test_unassigned_starting_input_fails() {
    let errors = validation_errors(unassigned_input_process());
    assert_eq!(
        errors,
        vec![DeclarationError::UnassignedInput {
            invocation: "Tax".to_string(),
            input: "value".to_string(),
        }]
    );
    assert!(errors[0].to_string().contains("'Tax'"));
    assert!(errors[0].to_string().contains("'value'"));
}

#[test]
fn test_literal_attribute_satisfies_input() {
    let process = triggered_process("p-tax", "Tax_Invoice", None).with_invocation(echo("Tax", Some("3")));
    validated(process);
}

#[test]
fn test_chained_producers_are_ambiguous() {
    let errors = validation_errors(chained_producers());
    assert_eq!(
        errors,
        vec![DeclarationError::AmbiguousAssignment {
            invocation: "C".to_string(),
            input: "value".to_string(),
            first: "A".to_string(),
            second: "B".to_string(),
        }]
    );
}

#[test]
fn test_opposite_branches_may_share_a_target() {
    let process = validated(opposite_branches());

    let merge = process.find_invocation("Merge").unwrap();
    for name in ["Created", "Check", "Approve", "Reject", "Merge"] {
        assert!(merge.traversed.contains(name), "missing {}", name);
    }
    let approve = process.find_invocation("Approve").unwrap();
    assert!(!approve.traversed.contains("Reject"));
}

#[test]
fn test_same_producer_twice_is_rejected() {
    let process = triggered_process("p-twice", "Twice", None)
        .with_invocation(echo("A", Some("1")))
        .with_invocation(echo("C", None))
        .with_transition("Created", "A")
        .with_transition("A", "C")
        .with_assignment(ParamAssignment::link("A", "value", "C", "value"))
        .with_assignment(ParamAssignment::link("A", "value", "C", "value"));

    assert!(
        validation_errors(process).contains(&DeclarationError::MultipleAssignments {
            invocation: "C".to_string(),
            input: "value".to_string(),
        })
    );
}

#[test]
fn test_process_input_and_output_on_same_input() {
    let process = triggered_process("p-mixed", "Mixed", None)
        .with_input("base", DataType::Number)
        .with_invocation(echo("A", Some("1")))
        .with_invocation(echo("C", None))
        .with_transition("Created", "A")
        .with_transition("A", "C")
        .with_assignment(ParamAssignment::from_process_input("base", "C", "value"))
        .with_assignment(ParamAssignment::link("A", "value", "C", "value"));

    assert_eq!(
        validation_errors(process),
        vec![DeclarationError::MultipleAssignments {
            invocation: "C".to_string(),
            input: "value".to_string(),
        }]
    );
}

#[test]
fn test_revalidation_is_order_independent() {
    let broken = chained_producers()
        .with_input("note", DataType::Text)
        .with_invocation(echo("Orphan", None))
        .with_assignment(ParamAssignment::from_process_input("note", "A", "value"));

    let first = validation_errors(broken.clone());
    assert!(first.len() >= 3, "{:?}", first);
    assert_eq!(validation_errors(broken.clone()), first);

    let mut reordered = broken;
    reordered.invocations.reverse();
    reordered.param_assignments.reverse();
    reordered.transitions.reverse();
    assert_eq!(validation_errors(reordered), first);
}

#[test]
fn test_text_cannot_feed_number() {
    let process = triggered_process("p-types", "Types", None)
        .with_input("note", DataType::Text)
        .with_invocation(echo("Tax", None))
        .with_assignment(ParamAssignment::from_process_input("note", "Tax", "value"));

    assert_eq!(
        validation_errors(process),
        vec![DeclarationError::IncompatibleTypes {
            source_name: "process input 'note'".to_string(),
            source_type: DataType::Text,
            target_name: "{Tax}.value".to_string(),
            target_type: DataType::Number,
        }]
    );
}

#[test]
fn test_generic_record_does_not_narrow_implicitly() {
    let notify = Action::new("Notify", ActionType::Generic).with_input("record", invoice_type());
    let build = |accepted: Option<&str>| {
        triggered_process("p-notify", "Notify_Invoice", accepted)
            .with_invocation(Invocation::new("Notify", notify.clone()))
            .with_transition("Created", "Notify")
            .with_assignment(ParamAssignment::link("Created", "record", "Notify", "record"))
    };

    assert_eq!(
        validation_errors(build(None)),
        vec![DeclarationError::IncompatibleTypes {
            source_name: "{Created}.record".to_string(),
            source_type: DataType::AnyRecord,
            target_name: "{Notify}.record".to_string(),
            target_type: invoice_type(),
        }]
    );
    // A single accepted type narrows the entry point's output.
    let process = validated(build(Some("Invoice")));
    let created = process.find_invocation("Created").unwrap();
    assert_eq!(created.actual_output_types.get("record"), Some(&invoice_type()));

    // Several accepted types keep the generic shape.
    assert!(!validation_errors(build(Some("Invoice, Customer"))).is_empty());
}

#[test]
fn test_entry_point_rules() {
    let no_trigger = Process::new("p-none", "No_Trigger").with_invocation(echo("Tax", Some("1")));
    assert_eq!(validation_errors(no_trigger), vec![DeclarationError::NoEntryPoint]);

    let two_triggers = triggered_process("p-two", "Two_Triggers", None)
        .with_invocation(Invocation::new("Updated", Action::record_update()))
        .with_assignment(ParamAssignment::from_process_input("trigger", "Updated", "record"));
    assert!(
        validation_errors(two_triggers).contains(&DeclarationError::MultipleEntryPoints(vec![
            "Created".to_string(),
            "Updated".to_string(),
        ]))
    );

    let fed_by_output = Process::new("p-fed", "Fed_By_Output")
        .with_invocation(created(None))
        .with_invocation(echo("Tax", Some("1")))
        .with_assignment(ParamAssignment::link("Tax", "value", "Created", "record"));
    assert!(
        validation_errors(fed_by_output).contains(&DeclarationError::InvalidEntryPointAssignment {
            invocation: "Created".to_string(),
            input: "record".to_string(),
        })
    );
}

#[test]
fn test_cyclic_transitions() {
    let process = triggered_process("p-cycle", "Cycle", None)
        .with_invocation(echo("A", Some("1")))
        .with_invocation(echo("B", Some("2")))
        .with_transition("Created", "A")
        .with_transition("A", "B")
        .with_transition("B", "A");

    assert!(
        validation_errors(process).contains(&DeclarationError::CyclicTransitions("A".to_string()))
    );
}

#[test]
fn test_condition_references_are_checked() {
    assert!(condition_messages("{Created}.record.amount > 100").is_empty());
    assert!(condition_messages("{Nope}.value > 1")[0].contains("unknown invocation 'Nope'"));
    assert!(condition_messages("{Created}.missing > 1")[0].contains("has no output 'missing'"));
    assert!(condition_messages("{Created}.record = 'x'")[0].contains("is a record"));
    assert!(condition_messages("{Created}.record.discount > 1")[0].contains("'discount'"));
    assert!(condition_messages("{Created}.record.amount.value > 1")[0].contains("non-record"));
    assert_eq!(condition_messages("{Created}.record.amount >").len(), 1);
}

#[test]
fn test_conditional_structure() {
    assert!(
        validation_errors(with_condition("  "))
            .contains(&DeclarationError::MissingCondition("Check".to_string()))
    );

    let stray_target = triggered_process("p-stray", "Stray_Target", Some("Invoice"))
        .with_invocation(conditional(
            "Check",
            "{Created}.record.amount > 1",
            &["Approve"],
            &["Elsewhere"],
        ))
        .with_invocation(echo("Approve", Some("1")))
        .with_invocation(echo("Elsewhere", Some("2")))
        .with_transition("Created", "Check")
        .with_transition("Check", "Approve")
        .with_transition("Created", "Elsewhere");
    assert!(
        validation_errors(stray_target).contains(&DeclarationError::UnknownBranchTarget {
            invocation: "Check".to_string(),
            target: "Elsewhere".to_string(),
        })
    );

    let no_branches = triggered_process("p-nob", "No_Branches", Some("Invoice"))
        .with_invocation(conditional("Check", "{Created}.record.amount > 1", &[], &[]))
        .with_transition("Created", "Check");
    assert!(
        validation_errors(no_branches)
            .contains(&DeclarationError::MissingBranchTarget("Check".to_string()))
    );
}

#[test]
fn test_field_read_narrows_to_field_type() {
    let read = |field: Option<&str>, accepted: Option<&str>| {
        let mut invocation = Invocation::new("Read", Action::field_read());
        if let Some(field) = field {
            invocation = invocation.with_attribute("field", field);
        }
        triggered_process("p-read", "Read_Field", accepted)
            .with_invocation(invocation)
            .with_transition("Created", "Read")
            .with_assignment(ParamAssignment::link("Created", "record", "Read", "record"))
    };

    let process = validated(read(Some("amount"), Some("Invoice")));
    let actual = &process.find_invocation("Read").unwrap().actual_output_types;
    assert_eq!(actual.get("value"), Some(&DataType::Number));

    let process = validated(read(Some("customer"), Some("Invoice")));
    let actual = &process.find_invocation("Read").unwrap().actual_output_types;
    assert_eq!(actual.get("value"), Some(&DataType::Record("Customer".to_string())));

    assert!(
        validation_errors(read(Some("discount"), Some("Invoice"))).contains(
            &DeclarationError::UnknownField {
                data_type: invoice_type(),
                field: "discount".to_string(),
            }
        )
    );
    assert!(
        validation_errors(read(None, Some("Invoice"))).contains(
            &DeclarationError::FieldReadAttributes {
                invocation: "Read".to_string(),
                count: 0,
            }
        )
    );
    // The generic record only exposes system fields.
    assert!(validation_errors(read(Some("createdDate"), None)).is_empty());
    assert!(!validation_errors(read(Some("amount"), None)).is_empty());
}

#[test]
fn test_field_update_attributes_match_declared_fields() {
    let update = |field: &str, literal: &str, accepted: Option<&str>| {
        triggered_process("p-update", "Update_Field", accepted)
            .with_invocation(Invocation::new("Stamp", Action::field_update()).with_attribute(field, literal))
            .with_transition("Created", "Stamp")
            .with_assignment(ParamAssignment::link("Created", "record", "Stamp", "record"))
    };

    validated(update("amount", "12.5", Some("Invoice")));
    validated(update("status", "anything", Some("Invoice")));

    assert_eq!(
        validation_errors(update("stauts", "stamped", Some("Invoice"))),
        vec![DeclarationError::UnknownField {
            data_type: invoice_type(),
            field: "stauts".to_string(),
        }]
    );
    assert_eq!(
        validation_errors(update("amount", "not-a-number", Some("Invoice"))),
        vec![DeclarationError::InvalidFieldLiteral {
            invocation: "Stamp".to_string(),
            field: "amount".to_string(),
            value: "not-a-number".to_string(),
            expected: DataType::Number,
        }]
    );
    // A generic record is only checked when the run knows its type.
    validated(update("stauts", "stamped", None));
}

#[test]
fn test_process_outputs() {
    let unassigned = stamp_process().with_output("result", DataType::Text);
    assert_eq!(
        validation_errors(unassigned),
        vec![DeclarationError::UnassignedOutput("result".to_string())]
    );

    let passthrough = stamp_process()
        .with_output("echo", invoice_type())
        .with_assignment(ParamAssignment::new(
            ValueSource::ProcessInput("trigger".into()),
            ValueTarget::ProcessOutput("echo".into()),
        ));
    assert!(
        validation_errors(passthrough)
            .contains(&DeclarationError::InputPassedToOutput("echo".to_string()))
    );
}

#[test]
fn test_header_and_naming_rules() {
    let process = stamp_process()
        .with_invocation(echo("Stamp", Some("1")))
        .with_input("trigger", DataType::Text);
    let errors = validation_errors(process);
    assert!(errors.contains(&DeclarationError::DuplicateInvocationName("Stamp".to_string())));
    assert!(errors.contains(&DeclarationError::DuplicateProcessInput("trigger".to_string())));

    let mut bad_name = stamp_process();
    bad_name.name = "2 stamps".to_string();
    assert!(
        validation_errors(bad_name)
            .contains(&DeclarationError::InvalidProcessName("2 stamps".to_string()))
    );

    let active_draft = Process::new("p-draft", "Draft").draft().active();
    assert_eq!(validation_errors(active_draft), vec![DeclarationError::ActiveDraft]);
}

#[test]
fn test_drafts_skip_structural_checks() {
    let mut draft = unassigned_input_process();
    draft.is_draft = true;
    assert!(validation_errors(draft).is_empty());
}

#[test]
fn test_unknown_references_are_reported() {
    let process = stamp_process().with_transition("Stamp", "Ghost");
    assert!(
        validation_errors(process).contains(&DeclarationError::UnknownInvocation {
            name: "Ghost".to_string(),
            context: "Transition".to_string(),
        })
    );
}

#[test]
fn test_sub_process_must_be_callable() {
    let mut sub = validated(summary_sub_process());
    sub.is_callable = false;
    assert!(
        validation_errors(summarize_process(sub)).contains(&DeclarationError::NotCallable {
            invocation: "Summary".to_string(),
            process: "Invoice_Summary".to_string(),
        })
    );
}

#[test]
fn test_triggerable_processes_take_one_generic_record() {
    let mut process = stamp_process().triggerable();
    assert_eq!(
        validation_errors(process.clone()),
        vec![DeclarationError::TriggerableInputType {
            input: "trigger".to_string(),
            data_type: invoice_type(),
        }]
    );
    process.inputs[0].data_type = DataType::AnyRecord;
    validated(process);
}

/// Narrows `Load` to the record type named by its `type` attribute.
struct LoadNarrower;

impl OutputNarrower for LoadNarrower {
    fn action_name(&self) -> &str {
        "Load"
    }

    fn narrow(
        &self,
        invocation: &Invocation,
        _inputs: &mut InputTypes<'_, '_>,
    ) -> std::result::Result<Vec<(String, DataType)>, DeclarationError> {
        let type_name = invocation.attribute("type").unwrap_or_default();
        Ok(vec![(
            "record".to_string(),
            DataType::Record(type_name.to_string()),
        )])
    }
}

#[test]
fn test_custom_output_narrower() {
    let load = Action::new("Load", ActionType::Generic).with_output("record", DataType::AnyRecord);
    let process = triggered_process("p-load", "Load_Customer", None)
        .with_invocation(Invocation::new("Load", load).with_attribute("type", "Customer"))
        .with_invocation(Invocation::new("Read", Action::field_read()).with_attribute("field", "name"))
        .with_transition("Created", "Load")
        .with_transition("Load", "Read")
        .with_assignment(ParamAssignment::link("Load", "record", "Read", "record"));

    let catalog = invoice_catalog();
    assert!(!ProcessValidator::new(&catalog).validate(&mut process.clone()).is_valid());

    let validator = ProcessValidator::builder(&catalog)
        .with_output_narrower(Box::new(LoadNarrower))
        .build();
    let mut process = process;
    let result = validator.validate(&mut process);
    assert!(result.is_valid(), "{:?}", result.messages());
    let read = process.find_invocation("Read").unwrap();
    assert_eq!(read.actual_output_types.get("value"), Some(&DataType::Text));
}
