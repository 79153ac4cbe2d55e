use super::ast::{Expression, PathRef};
use crate::error::ConditionError;
use crate::model::Value;
use std::cmp::Ordering;

/// Evaluates an expression tree against a reference lookup.
///
/// `lookup` returns `None` when a reference cannot be resolved at all; a
/// resolved but unset field should be reported as `Value::Null`.
pub fn evaluate<F>(expression: &Expression, lookup: &F) -> Result<bool, ConditionError>
where
    F: Fn(&PathRef) -> Option<Value>,
{
    match eval_value(expression, lookup)? {
        Value::Bool(b) => Ok(b),
        other => Err(ConditionError::NotBoolean(other.kind())),
    }
}

fn eval_value<F>(expression: &Expression, lookup: &F) -> Result<Value, ConditionError>
where
    F: Fn(&PathRef) -> Option<Value>,
{
    match expression {
        Expression::Literal(v) => Ok(v.clone()),
        Expression::Reference(path) => {
            lookup(path).ok_or_else(|| ConditionError::Unresolved(path.to_string()))
        }
        Expression::Not(inner) => Ok(Value::Bool(!eval_bool(inner, lookup)?)),
        Expression::And(l, r) => {
            // Short-circuit
            if !eval_bool(l, lookup)? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(eval_bool(r, lookup)?))
        }
        Expression::Or(l, r) => {
            if eval_bool(l, lookup)? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(eval_bool(r, lookup)?))
        }
        Expression::Equal(l, r) => {
            let (l, r) = (eval_value(l, lookup)?, eval_value(r, lookup)?);
            Ok(Value::Bool(values_equal(&l, &r)))
        }
        Expression::NotEqual(l, r) => {
            let (l, r) = (eval_value(l, lookup)?, eval_value(r, lookup)?);
            Ok(Value::Bool(!values_equal(&l, &r)))
        }
        Expression::GreaterThan(l, r) => compare(l, r, ">", lookup, |o| o == Ordering::Greater),
        Expression::GreaterThanOrEqual(l, r) => {
            compare(l, r, ">=", lookup, |o| o != Ordering::Less)
        }
        Expression::SmallerThan(l, r) => compare(l, r, "<", lookup, |o| o == Ordering::Less),
        Expression::SmallerThanOrEqual(l, r) => {
            compare(l, r, "<=", lookup, |o| o != Ordering::Greater)
        }
    }
}

fn eval_bool<F>(expression: &Expression, lookup: &F) -> Result<bool, ConditionError>
where
    F: Fn(&PathRef) -> Option<Value>,
{
    match eval_value(expression, lookup)? {
        Value::Bool(b) => Ok(b),
        other => Err(ConditionError::NotBoolean(other.kind())),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Value::Record(a), Value::Record(b)) => match (&a.id, &b.id) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        // A record compares to text by its id.
        (Value::Record(rec), Value::Text(id)) | (Value::Text(id), Value::Record(rec)) => {
            rec.id.as_deref() == Some(id.as_str())
        }
        _ => left == right,
    }
}

fn compare<F>(
    left: &Expression,
    right: &Expression,
    operator: &'static str,
    lookup: &F,
    accept: impl Fn(Ordering) -> bool,
) -> Result<Value, ConditionError>
where
    F: Fn(&PathRef) -> Option<Value>,
{
    let (l, r) = (eval_value(left, lookup)?, eval_value(right, lookup)?);
    let ordering = match (&l, &r) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        // Comparisons against an unset value are false rather than errors.
        (Value::Null, _) | (_, Value::Null) => return Ok(Value::Bool(false)),
        _ => None,
    };
    match ordering {
        Some(o) => Ok(Value::Bool(accept(o))),
        None => Err(ConditionError::TypeMismatch {
            operator,
            left: l.kind(),
            right: r.kind(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::parse;
    use crate::model::Record;

    fn lookup(path: &PathRef) -> Option<Value> {
        match (path.invocation.as_str(), path.output.as_str()) {
            ("Step1", "amount") => Some(Value::Number(150.0)),
            ("Step1", "status") => Some(Value::Text("open".into())),
            ("Load", "record") => {
                let customer = Record::reference("Customer", "c-1")
                    .with_field("name", Value::Text("ACME".into()));
                let record = Record::reference("Invoice", "i-1")
                    .with_field("customer", Value::Record(customer));
                let mut value = Value::Record(record);
                for field in &path.fields {
                    value = value
                        .as_record()
                        .and_then(|r| r.field(field))
                        .unwrap_or(Value::Null);
                }
                Some(value)
            }
            _ => None,
        }
    }

    fn eval(source: &str) -> Result<bool, ConditionError> {
        evaluate(&parse(source)?, &lookup)
    }

    #[test]
    fn numeric_comparisons() {
        assert!(eval("{Step1}.amount > 100").unwrap());
        assert!(!eval("{Step1}.amount < 100").unwrap());
        assert!(eval("{Step1}.amount = 150").unwrap());
        assert!(eval("{Step1}.amount >= 150 and {Step1}.amount <= 150").unwrap());
    }

    #[test]
    fn text_and_logic() {
        assert!(eval("{Step1}.status = 'open' or {Step1}.amount > 1000").unwrap());
        assert!(eval("not ({Step1}.status <> 'open')").unwrap());
    }

    #[test]
    fn walks_record_field_paths() {
        assert!(eval("{Load}.record.customer.name = 'ACME'").unwrap());
        assert!(eval("{Load}.record.customer = 'c-1'").unwrap());
        assert!(!eval("{Load}.record.missing > 3").unwrap());
    }

    #[test]
    fn reports_unresolved_and_mistyped_operands() {
        assert!(matches!(
            eval("{Nope}.x = 1"),
            Err(ConditionError::Unresolved(_))
        ));
        assert!(matches!(
            eval("{Step1}.status > 1"),
            Err(ConditionError::TypeMismatch { operator: ">", .. })
        ));
        assert!(matches!(
            eval("{Step1}.amount"),
            Err(ConditionError::NotBoolean("number"))
        ));
    }
}
