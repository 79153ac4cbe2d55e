use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared or inferred type of a parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataType {
    Text,
    Number,
    Boolean,
    /// The generic record shape, accepting a record of any type.
    AnyRecord,
    /// A concrete record type, by type name.
    Record(String),
}

impl DataType {
    pub fn is_record(&self) -> bool {
        matches!(self, DataType::AnyRecord | DataType::Record(_))
    }

    /// Whether a value of `self` may be assigned to a target of type `target`.
    ///
    /// Equal types are always compatible. A concrete record narrows into the
    /// generic record, never the other way around.
    pub fn can_cast_to(&self, target: &DataType) -> bool {
        self == target || matches!((self, target), (DataType::Record(_), DataType::AnyRecord))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Text => write!(f, "Text"),
            DataType::Number => write!(f, "Number"),
            DataType::Boolean => write!(f, "Boolean"),
            DataType::AnyRecord => write!(f, "Record"),
            DataType::Record(name) => write!(f, "Record<{}>", name),
        }
    }
}

/// Fields every record carries, including the generic record.
pub const SYSTEM_FIELDS: &[(&str, DataType)] = &[
    ("id", DataType::Text),
    ("createdDate", DataType::Text),
    ("lastModifiedDate", DataType::Text),
    ("createdBy", DataType::AnyRecord),
    ("lastModifiedBy", DataType::AnyRecord),
];

pub fn system_field_type(name: &str) -> Option<DataType> {
    SYSTEM_FIELDS
        .iter()
        .find(|(field, _)| *field == name)
        .map(|(_, data_type)| data_type.clone())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    pub name: String,
    pub data_type: DataType,
}

impl FieldDef {
    /// A reference field points at another record type.
    pub fn referenced_type(&self) -> Option<&str> {
        match &self.data_type {
            DataType::Record(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordType {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl RecordType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            data_type,
        });
        self
    }
}

/// The record types known to the platform, used for type narrowing.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    types: AHashMap<String, RecordType>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_types(types: impl IntoIterator<Item = RecordType>) -> Self {
        let mut catalog = Self::new();
        for record_type in types {
            catalog.register(record_type);
        }
        catalog
    }

    pub fn register(&mut self, record_type: RecordType) {
        self.types.insert(record_type.name.clone(), record_type);
    }

    pub fn get(&self, type_name: &str) -> Option<&RecordType> {
        self.types.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Type of a field on a record of `record_type`.
    ///
    /// A generic record only exposes the system fields.
    pub fn field_type(&self, record_type: &DataType, field: &str) -> Option<DataType> {
        match record_type {
            DataType::Record(type_name) => self
                .get(type_name)
                .and_then(|t| t.fields.iter().find(|f| f.name == field))
                .map(|f| f.data_type.clone())
                .or_else(|| system_field_type(field)),
            DataType::AnyRecord => system_field_type(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concrete_record_narrows_into_generic_record() {
        let invoice = DataType::Record("Invoice".into());
        assert!(invoice.can_cast_to(&DataType::AnyRecord));
        assert!(!DataType::AnyRecord.can_cast_to(&invoice));
        assert!(invoice.can_cast_to(&invoice));
        assert!(!invoice.can_cast_to(&DataType::Record("Order".into())));
        assert!(!DataType::Number.can_cast_to(&DataType::Text));
    }

    #[test]
    fn generic_record_exposes_only_system_fields() {
        let catalog = TypeCatalog::from_types([RecordType::new("Invoice")
            .field("amount", DataType::Number)
            .field("customer", DataType::Record("Customer".into()))]);

        let invoice = DataType::Record("Invoice".into());
        assert_eq!(catalog.field_type(&invoice, "amount"), Some(DataType::Number));
        assert_eq!(catalog.field_type(&invoice, "id"), Some(DataType::Text));
        assert_eq!(catalog.field_type(&DataType::AnyRecord, "amount"), None);
        assert_eq!(
            catalog.field_type(&DataType::AnyRecord, "createdBy"),
            Some(DataType::AnyRecord)
        );
    }
}
