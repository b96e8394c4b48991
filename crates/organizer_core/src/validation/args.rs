//! Loosely-typed mutation argument bags and typed field readers.
//!
//! # Responsibility
//! - Give command factories one lookup capability over dictionary-shaped and
//!   structured inputs.
//! - Report missing/mistyped required fields as contract defects.
//!
//! # Invariants
//! - Dictionary lookup tries the exact key first, then a case- and
//!   separator-insensitive key.
//! - Non-dictionary inputs are read by structural field access only.
//! - JSON `null` is treated as absent.

use crate::model::entity::EntityId;
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Structural field access for inputs that are not dictionaries.
pub trait FieldAccess {
    fn field(&self, name: &str) -> Option<Value>;
}

impl FieldAccess for Value {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// Field snapshot of any serializable input object.
#[derive(Debug, Clone, Default)]
pub struct SerializedFields {
    fields: Map<String, Value>,
}

impl SerializedFields {
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let fields = match serde_json::to_value(value)? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        Ok(Self { fields })
    }
}

impl FieldAccess for SerializedFields {
    fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }
}

/// Raw argument input of one mutation.
#[derive(Clone, Copy)]
pub enum ArgumentBag<'a> {
    Dictionary(&'a Map<String, Value>),
    Structured(&'a dyn FieldAccess),
}

impl<'a> ArgumentBag<'a> {
    /// Classifies a JSON input: objects are dictionaries, everything else is
    /// read structurally.
    pub fn from_json(value: &'a Value) -> Self {
        match value {
            Value::Object(map) => Self::Dictionary(map),
            other => Self::Structured(other),
        }
    }

    pub fn is_dictionary(&self) -> bool {
        matches!(self, Self::Dictionary(_))
    }
}

impl std::fmt::Debug for ArgumentBag<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dictionary(map) => f
                .debug_tuple("Dictionary")
                .field(&map.keys().collect::<Vec<_>>())
                .finish(),
            Self::Structured(_) => f.write_str("Structured(..)"),
        }
    }
}

/// Contract defect raised while reconstructing a typed command.
///
/// Distinct from validation failures: it signals a schema/registry mismatch,
/// not bad user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandBuildError {
    MissingField {
        mutation: String,
        field: &'static str,
    },
    InvalidField {
        mutation: String,
        field: &'static str,
        expected: &'static str,
    },
    /// The factory panicked; the panic was contained.
    FactoryPanicked {
        mutation: String,
        message: String,
    },
}

impl Display for CommandBuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { mutation, field } => {
                write!(f, "mutation `{mutation}` is missing required field `{field}`")
            }
            Self::InvalidField {
                mutation,
                field,
                expected,
            } => write!(
                f,
                "mutation `{mutation}` field `{field}` is not a valid {expected}"
            ),
            Self::FactoryPanicked { mutation, message } => {
                write!(f, "command factory for `{mutation}` panicked: {message}")
            }
        }
    }
}

impl Error for CommandBuildError {}

/// Normalized key view used by command factories.
#[derive(Debug, Clone, Copy)]
pub struct MutationArgs<'a> {
    mutation: &'a str,
    bag: ArgumentBag<'a>,
}

impl<'a> MutationArgs<'a> {
    pub fn new(mutation: &'a str, bag: ArgumentBag<'a>) -> Self {
        Self { mutation, bag }
    }

    pub fn mutation(&self) -> &'a str {
        self.mutation
    }

    /// Resolves one field by exact key, normalized key, then structural access.
    pub fn lookup(&self, key: &str) -> Option<Value> {
        let found = match self.bag {
            ArgumentBag::Dictionary(map) => map.get(key).cloned().or_else(|| {
                let wanted = normalize_key(key);
                map.iter()
                    .find(|(candidate, _)| normalize_key(candidate) == wanted)
                    .map(|(_, value)| value.clone())
            }),
            ArgumentBag::Structured(source) => source.field(key),
        };
        found.filter(|value| !value.is_null())
    }

    pub fn required_str(&self, field: &'static str) -> Result<String, CommandBuildError> {
        self.optional_str(field)?.ok_or_else(|| self.missing(field))
    }

    pub fn optional_str(&self, field: &'static str) -> Result<Option<String>, CommandBuildError> {
        match self.lookup(field) {
            None => Ok(None),
            Some(Value::String(value)) => Ok(Some(value)),
            Some(_) => Err(self.invalid(field, "string")),
        }
    }

    pub fn optional_i64(&self, field: &'static str) -> Result<Option<i64>, CommandBuildError> {
        match self.lookup(field) {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.invalid(field, "integer")),
        }
    }

    pub fn optional_bool(&self, field: &'static str) -> Result<Option<bool>, CommandBuildError> {
        match self.lookup(field) {
            None => Ok(None),
            Some(Value::Bool(value)) => Ok(Some(value)),
            Some(_) => Err(self.invalid(field, "boolean")),
        }
    }

    pub fn required_id(&self, field: &'static str) -> Result<EntityId, CommandBuildError> {
        let value = self.required_str(field)?;
        Uuid::parse_str(value.trim()).map_err(|_| self.invalid(field, "uuid"))
    }

    fn missing(&self, field: &'static str) -> CommandBuildError {
        CommandBuildError::MissingField {
            mutation: self.mutation.to_string(),
            field,
        }
    }

    fn invalid(&self, field: &'static str, expected: &'static str) -> CommandBuildError {
        CommandBuildError::InvalidField {
            mutation: self.mutation.to_string(),
            field,
            expected,
        }
    }
}

/// Case- and separator-insensitive form of an argument key.
///
/// `spaceId`, `SpaceId`, `space_id` and `SPACE-ID` all normalize to `spaceid`.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|ch| !matches!(ch, '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}
