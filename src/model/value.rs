use super::DataType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A runtime value flowing along parameter assignments.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Record(Record),
}

/// A platform record: a typed bag of fields with an optional persistent id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub type_name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
            fields: BTreeMap::new(),
        }
    }

    /// A record known only by type and id, with nothing loaded yet.
    pub fn reference(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(type_name).with_id(id)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Reads a field, treating `id` as a field backed by the record id.
    pub fn field(&self, name: &str) -> Option<Value> {
        if name == "id" {
            return self.id.clone().map(Value::Text);
        }
        self.fields.get(name).cloned()
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        (name == "id" && self.id.is_some()) || self.fields.contains_key(name)
    }
}

impl Value {
    /// Converts a literal attribute string into a value of the declared type.
    /// Strings that do not parse as the declared type stay text.
    pub fn from_literal(raw: &str, data_type: &DataType) -> Value {
        Self::parse_literal(raw, data_type).unwrap_or_else(|| Value::Text(raw.to_string()))
    }

    /// Strict form of [`Value::from_literal`]: `None` when `raw` does not parse as `data_type`.
    pub fn parse_literal(raw: &str, data_type: &DataType) -> Option<Value> {
        match data_type {
            DataType::Number => raw.trim().parse::<f64>().ok().map(Value::Number),
            DataType::Boolean => match raw.trim() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            DataType::Record(type_name) => Some(Value::Record(Record::reference(type_name, raw))),
            DataType::Text | DataType::AnyRecord => Some(Value::Text(raw.to_string())),
        }
    }

    /// Converts JSON into a value. Objects carrying a `$type` key become records.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Object(mut map) => match map.remove("$type") {
                Some(serde_json::Value::String(type_name)) => {
                    let id = match map.remove("id") {
                        Some(serde_json::Value::String(id)) => Some(id),
                        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
                        _ => None,
                    };
                    let fields = map
                        .into_iter()
                        .map(|(k, v)| (k, Value::from_json(v)))
                        .collect();
                    Value::Record(Record {
                        type_name,
                        id,
                        fields,
                    })
                }
                _ => Value::Text(serde_json::Value::Object(map).to_string()),
            },
            other @ serde_json::Value::Array(_) => Value::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Record(record) => {
                let mut map = serde_json::Map::new();
                map.insert("$type".into(), record.type_name.clone().into());
                if let Some(id) = &record.id {
                    map.insert("id".into(), id.clone().into());
                }
                for (name, value) in &record.fields {
                    map.insert(name.clone(), value.to_json());
                }
                serde_json::Value::Object(map)
            }
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Record(_) => "record",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Text(s) => write!(f, "'{}'", s),
            Value::Record(r) => match &r.id {
                Some(id) => write!(f, "{}#{}", r.type_name, id),
                None => write!(f, "{}#<new>", r.type_name),
            },
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}
