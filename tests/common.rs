//! Common test utilities for building processes, actions and records.
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tejun::model::{ACCEPTED_TYPES_ATTR, CONDITION_ATTR, IF_FALSE_ATTR, IF_TRUE_ATTR};
use tejun::prelude::*;

#[allow(dead_code)]
pub fn invoice_type() -> DataType {
    DataType::Record("Invoice".to_string())
}

/// `Invoice { amount, status, customer -> Customer }` and `Customer { name }`.
#[allow(dead_code)]
pub fn invoice_catalog() -> TypeCatalog {
    TypeCatalog::from_types([
        RecordType::new("Invoice")
            .field("amount", DataType::Number)
            .field("status", DataType::Text)
            .field("customer", DataType::Record("Customer".to_string())),
        RecordType::new("Customer").field("name", DataType::Text),
    ])
}

/// Passes its `value` input through unchanged.
#[allow(dead_code)]
pub fn echo_action() -> Action {
    Action::new("Echo", ActionType::Generic)
        .with_input("value", DataType::Number)
        .with_output("value", DataType::Number)
}

#[allow(dead_code)]
pub fn sum_action() -> Action {
    Action::new("Sum", ActionType::Generic)
        .with_input("a", DataType::Number)
        .with_input("b", DataType::Number)
        .with_output("total", DataType::Number)
}

/// Publishes the `amount` field of its record.
#[allow(dead_code)]
pub fn extract_amount_action() -> Action {
    Action::new("ExtractAmount", ActionType::Generic)
        .with_input("record", DataType::AnyRecord)
        .with_output("amount", DataType::Number)
}

#[derive(Default)]
struct EchoState {
    value: Value,
}

#[derive(Default)]
struct SumState {
    a: f64,
    b: f64,
    total: f64,
}

#[derive(Default)]
struct AmountState {
    amount: f64,
}

#[allow(dead_code)]
pub fn echo_impl() -> Arc<dyn ActionImplementation> {
    Arc::new(
        FnAction::new("Echo", |_: &mut EchoState, _| Ok(()))
            .input("value", |s, v| {
                s.value = v;
                Ok(())
            })
            .output("value", |s| s.value.clone()),
    )
}

#[allow(dead_code)]
pub fn sum_impl() -> Arc<dyn ActionImplementation> {
    Arc::new(
        FnAction::new("Sum", |s: &mut SumState, _| {
            s.total = s.a + s.b;
            Ok(())
        })
        .input("a", |s, v| {
            s.a = v.as_f64().unwrap_or_default();
            Ok(())
        })
        .input("b", |s, v| {
            s.b = v.as_f64().unwrap_or_default();
            Ok(())
        })
        .output("total", |s| Value::Number(s.total)),
    )
}

#[allow(dead_code)]
pub fn extract_amount_impl() -> Arc<dyn ActionImplementation> {
    Arc::new(
        FnAction::new("ExtractAmount", |_: &mut AmountState, _| Ok(()))
            .input("record", |s, v| match v {
                Value::Record(record) => {
                    s.amount = record
                        .field("amount")
                        .and_then(|a| a.as_f64())
                        .unwrap_or_default();
                    Ok(())
                }
                other => Err(ActionError::InvalidInput {
                    input: "record".to_string(),
                    expected: "record",
                    found: other.kind(),
                }),
            })
            .output("amount", |s| Value::Number(s.amount)),
    )
}

/// An `Echo` implementation that counts how often it was instantiated.
#[allow(dead_code)]
pub fn counting_echo(counter: Arc<AtomicUsize>) -> Arc<dyn ActionImplementation> {
    Arc::new(
        FnAction::new("Echo", move |_: &mut EchoState, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .input("value", |s, v| {
            s.value = v;
            Ok(())
        })
        .output("value", |s| s.value.clone()),
    )
}

/// An `Echo` implementation that always publishes `value`.
#[allow(dead_code)]
pub fn constant_echo(value: f64) -> Arc<dyn ActionImplementation> {
    Arc::new(
        FnAction::new("Echo", |_: &mut EchoState, _| Ok(()))
            .input("value", |_, _| Ok(()))
            .output("value", move |_| Value::Number(value)),
    )
}

/// A registry with every test action.
#[allow(dead_code)]
pub fn test_registry() -> ActionRegistry {
    let registry = ActionRegistry::new();
    registry.register(echo_impl());
    registry.register(sum_impl());
    registry.register(extract_amount_impl());
    registry
}

/// The `Created` entry point, optionally restricted to record types.
#[allow(dead_code)]
pub fn created(accepted: Option<&str>) -> Invocation {
    let invocation = Invocation::new("Created", Action::record_create());
    match accepted {
        Some(types) => invocation.with_attribute(ACCEPTED_TYPES_ATTR, types),
        None => invocation,
    }
}

#[allow(dead_code)]
pub fn echo(name: &str, literal: Option<&str>) -> Invocation {
    let invocation = Invocation::new(name, echo_action());
    match literal {
        Some(value) => invocation.with_attribute("value", value),
        None => invocation,
    }
}

#[allow(dead_code)]
pub fn conditional(name: &str, condition: &str, if_true: &[&str], if_false: &[&str]) -> Invocation {
    let mut invocation = Invocation::new(name, Action::conditional()).with_attribute(CONDITION_ATTR, condition);
    for target in if_true {
        invocation = invocation.with_attribute(IF_TRUE_ATTR, *target);
    }
    for target in if_false {
        invocation = invocation.with_attribute(IF_FALSE_ATTR, *target);
    }
    invocation
}

/// A process whose `Created` entry point receives the `trigger` input.
#[allow(dead_code)]
pub fn triggered_process(id: &str, name: &str, accepted: Option<&str>) -> Process {
    Process::new(id, name)
        .with_input("trigger", invoice_type())
        .with_invocation(created(accepted))
        .with_assignment(ParamAssignment::from_process_input("trigger", "Created", "record"))
}

/// The entry point feeds a field-update that stamps the record.
#[allow(dead_code)]
pub fn stamp_process() -> Process {
    triggered_process("p-stamp", "Stamp_Invoice", None)
        .with_invocation(
            Invocation::new("Stamp", Action::field_update()).with_attribute("status", "stamped"),
        )
        .with_transition("Created", "Stamp")
        .with_assignment(ParamAssignment::link("Created", "record", "Stamp", "record"))
}

/// `{Step1}.amount > 100` routes to `Approve`, otherwise to `Reject`
/// when `with_false_branch` is set.
#[allow(dead_code)]
pub fn routing_process(with_false_branch: bool) -> Process {
    let if_false: &[&str] = if with_false_branch { &["Reject"] } else { &[] };
    let mut process = triggered_process("p-route", "Route_Invoice", None)
        .with_invocation(Invocation::new("Step1", extract_amount_action()))
        .with_invocation(conditional("Check", "{Step1}.amount > 100", &["Approve"], if_false))
        .with_invocation(
            Invocation::new("Approve", Action::field_update()).with_attribute("status", "approved"),
        )
        .with_transition("Created", "Step1")
        .with_transition("Step1", "Check")
        .with_transition("Check", "Approve")
        .with_assignment(ParamAssignment::link("Created", "record", "Step1", "record"))
        .with_assignment(ParamAssignment::link("Created", "record", "Approve", "record"));

    if with_false_branch {
        process = process
            .with_invocation(
                Invocation::new("Reject", Action::field_update()).with_attribute("status", "rejected"),
            )
            .with_transition("Check", "Reject")
            .with_assignment(ParamAssignment::link("Created", "record", "Reject", "record"));
    }
    process
}

/// `Left` and `Right` feed distinct inputs of `Join`.
///
/// `right_first` declares the right branch first; `detached` drops the
/// `Right -> Join` transition so `Join` is only reachable through `Left`.
#[allow(dead_code)]
pub fn join_process(right_first: bool, detached: bool) -> Process {
    let mut process = triggered_process("p-join", "Join_Branches", None)
        .with_output("total", DataType::Number)
        .with_invocation(echo("Left", Some("2")))
        .with_invocation(echo("Right", Some("3")))
        .with_invocation(Invocation::new("Join", sum_action()));

    let branches = if right_first {
        ["Right", "Left"]
    } else {
        ["Left", "Right"]
    };
    for branch in branches {
        process = process.with_transition("Created", branch);
    }
    for branch in branches {
        if detached && branch == "Right" {
            continue;
        }
        process = process.with_transition(branch, "Join");
    }

    process
        .with_assignment(ParamAssignment::link("Left", "value", "Join", "a"))
        .with_assignment(ParamAssignment::link("Right", "value", "Join", "b"))
        .with_assignment(ParamAssignment::to_process_output("Join", "total", "total"))
}

/// A callable process publishing the `amount` and `status` of an invoice.
#[allow(dead_code)]
pub fn summary_sub_process() -> Process {
    Process::new("p-summary", "Invoice_Summary")
        .callable()
        .with_input("record", DataType::AnyRecord)
        .with_output("amount", DataType::Number)
        .with_output("status", DataType::Text)
        .with_invocation(
            Invocation::new("Start", Action::record_update()).with_attribute(ACCEPTED_TYPES_ATTR, "Invoice"),
        )
        .with_invocation(Invocation::new("ReadAmount", Action::field_read()).with_attribute("field", "amount"))
        .with_invocation(Invocation::new("ReadStatus", Action::field_read()).with_attribute("field", "status"))
        .with_transition("Start", "ReadAmount")
        .with_transition("Start", "ReadStatus")
        .with_assignment(ParamAssignment::from_process_input("record", "Start", "record"))
        .with_assignment(ParamAssignment::link("Start", "record", "ReadAmount", "record"))
        .with_assignment(ParamAssignment::link("Start", "record", "ReadStatus", "record"))
        .with_assignment(ParamAssignment::to_process_output("ReadAmount", "value", "amount"))
        .with_assignment(ParamAssignment::to_process_output("ReadStatus", "value", "status"))
}

/// A parent process invoking `sub` and republishing its outputs.
#[allow(dead_code)]
pub fn summarize_process(sub: Process) -> Process {
    triggered_process("p-summarize", "Summarize_Invoice", None)
        .with_output("amount", DataType::Number)
        .with_output("status", DataType::Text)
        .with_invocation(Invocation::new("Summary", sub))
        .with_transition("Created", "Summary")
        .with_assignment(ParamAssignment::link("Created", "record", "Summary", "record"))
        .with_assignment(ParamAssignment::to_process_output("Summary", "amount", "amount"))
        .with_assignment(ParamAssignment::to_process_output("Summary", "status", "status"))
}

/// `Tax` is a starting invocation whose `value` input has no producer.
#[allow(dead_code)]
pub fn unassigned_input_process() -> Process {
    triggered_process("p-tax", "Tax_Invoice", None)
        .with_invocation(echo("Tax", None))
}

/// Validates against the invoice catalog, panicking with every message on failure.
#[allow(dead_code)]
pub fn validated(mut process: Process) -> Process {
    let catalog = invoice_catalog();
    let validation = ProcessValidator::new(&catalog).validate(&mut process);
    assert!(
        validation.is_valid(),
        "expected '{}' to be valid: {:?}",
        process.name,
        validation.messages()
    );
    process
}

#[allow(dead_code)]
pub fn validation_errors(mut process: Process) -> Vec<DeclarationError> {
    let catalog = invoice_catalog();
    ProcessValidator::new(&catalog).validate(&mut process).errors
}

/// A record store holding a single invoice, and that invoice's id.
#[allow(dead_code)]
pub fn store_with_invoice(amount: f64) -> (Arc<MemoryRecordStore>, String) {
    let records = Arc::new(MemoryRecordStore::new());
    let id = records
        .insert(
            Record::new("Invoice")
                .with_field("amount", Value::Number(amount))
                .with_field("status", Value::from("new")),
        )
        .expect("Failed to insert invoice");
    (records, id)
}

/// Process inputs passing a bare reference to the invoice as `trigger`.
#[allow(dead_code)]
pub fn trigger_inputs(id: &str) -> AHashMap<String, Value> {
    let mut inputs = AHashMap::new();
    inputs.insert(
        "trigger".to_string(),
        Value::Record(Record::reference("Invoice", id)),
    );
    inputs
}

#[allow(dead_code)]
pub fn build_executor(records: Arc<MemoryRecordStore>, actions: ActionRegistry) -> ProcessExecutor {
    ProcessExecutor::builder(records, actions)
        .with_catalog(Arc::new(invoice_catalog()))
        .build()
}

#[allow(dead_code)]
pub fn invoice_status(records: &MemoryRecordStore, id: &str) -> Option<Value> {
    records.get("Invoice", id).and_then(|r| r.field("status"))
}
