use super::ServiceHandles;
use crate::error::{ExecutionError, RecordError};
use crate::model::{
    DataType, FIELD_PARAM, Invocation, RECORD_PARAM, Record, VALUE_PARAM, Value,
};
use crate::store::fetch_one;
use ahash::AHashMap;
use tracing::debug;

fn take_record(
    invocation: &Invocation,
    values: &mut AHashMap<String, Value>,
) -> Result<Record, ExecutionError> {
    match values.remove(RECORD_PARAM) {
        Some(Value::Record(record)) => Ok(record),
        other => Err(ExecutionError::NotARecord {
            invocation: invocation.name.clone(),
            input: RECORD_PARAM.to_string(),
            found: other.as_ref().map(Value::kind).unwrap_or("nothing"),
        }),
    }
}

fn record_error(invocation: &Invocation) -> impl Fn(RecordError) -> ExecutionError + '_ {
    move |source| ExecutionError::Record {
        invocation: invocation.name.clone(),
        source,
    }
}

/// Assigns every attribute as a literal field value and persists the record.
pub(crate) fn field_update(
    services: &ServiceHandles,
    invocation: &Invocation,
    mut values: AHashMap<String, Value>,
) -> Result<AHashMap<String, Value>, ExecutionError> {
    let mut record = take_record(invocation, &mut values)?;
    let record_type = DataType::Record(record.type_name.clone());

    // Undeclared record types accept any field as text.
    let declared = services.catalog.contains(&record.type_name);
    for (field, raw) in &invocation.attributes {
        let Some(raw) = raw.first() else { continue };
        let value = match services.catalog.field_type(&record_type, field) {
            Some(field_type) => Value::parse_literal(raw, &field_type).ok_or_else(|| {
                RecordError::InvalidFieldValue {
                    field: field.clone(),
                    value: raw.clone(),
                    expected: field_type.clone(),
                }
            }),
            None if declared => Err(RecordError::UnknownField {
                type_name: record.type_name.clone(),
                field: field.clone(),
            }),
            None => Ok(Value::Text(raw.clone())),
        }
        .map_err(record_error(invocation))?;
        record.set_field(field.clone(), value);
    }

    services
        .records
        .save(&mut record)
        .map_err(record_error(invocation))?;
    debug!(invocation = %invocation.name, record = ?record.id, "updated record fields");
    Ok(AHashMap::new())
}

/// Reads one field, loading it from storage when the record does not carry it.
pub(crate) fn field_read(
    services: &ServiceHandles,
    invocation: &Invocation,
    mut values: AHashMap<String, Value>,
) -> Result<AHashMap<String, Value>, ExecutionError> {
    let record = take_record(invocation, &mut values)?;
    let field = match values.remove(FIELD_PARAM) {
        Some(Value::Text(field)) => field.trim().to_string(),
        Some(other) => other.to_string(),
        None => {
            return Err(ExecutionError::UnassignedInput {
                invocation: invocation.name.clone(),
                input: FIELD_PARAM.to_string(),
            });
        }
    };

    let value = read_field(services, &record, &field).map_err(record_error(invocation))?;
    let mut outputs = AHashMap::new();
    outputs.insert(VALUE_PARAM.to_string(), value);
    Ok(outputs)
}

/// Field value of `record`, fetching the record when the field is not loaded.
/// Reference fields come back in the generic record shape.
pub(crate) fn read_field(
    services: &ServiceHandles,
    record: &Record,
    field: &str,
) -> Result<Value, RecordError> {
    let value = if record.is_loaded(field) {
        record.field(field).unwrap_or_default()
    } else if let Some(id) = &record.id {
        debug!(record = %record.type_name, field, "fetching unloaded field");
        fetch_one(
            services.records.as_ref(),
            &record.type_name,
            id,
            &[field.to_string()],
        )?
        .field(field)
        .unwrap_or_default()
    } else {
        Value::Null
    };

    let field_type = services
        .catalog
        .field_type(&DataType::Record(record.type_name.clone()), field);
    Ok(match (field_type, value) {
        (Some(DataType::Record(target)), Value::Text(id)) => {
            Value::Record(Record::reference(target, id))
        }
        (_, value) => value,
    })
}

/// Loads every field of a bare record reference.
pub(crate) fn hydrate(
    services: &ServiceHandles,
    invocation: &Invocation,
    record: Record,
) -> Result<Record, ExecutionError> {
    match &record.id {
        Some(id) if record.fields.is_empty() => {
            fetch_one(services.records.as_ref(), &record.type_name, id, &[])
                .map_err(record_error(invocation))
        }
        _ => Ok(record),
    }
}
