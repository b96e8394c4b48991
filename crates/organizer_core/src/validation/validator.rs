//! Command validators keyed by command type.
//!
//! # Invariants
//! - At most one validator per command type.
//! - Validators collect every violation; they never stop at the first.

use crate::validation::command::{Command, RegistryError};
use serde::Serialize;
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};

/// Field → messages map of rule violations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Records `message` for `field` unless `holds`.
    pub fn ensure(&mut self, holds: bool, field: &str, message: impl Into<String>) {
        if !holds {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields with at least one violation.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Rule set for one command type.
pub trait Validator<C: Command>: Send + Sync {
    fn validate(&self, command: &C, errors: &mut ValidationErrors);
}

type ErasedValidator = Box<dyn Fn(&dyn Any) -> ValidationErrors + Send + Sync>;

/// Immutable command type → validator map.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: HashMap<TypeId, ErasedValidator>,
}

impl ValidatorRegistry {
    pub fn builder() -> ValidatorRegistryBuilder {
        ValidatorRegistryBuilder::default()
    }

    pub fn has_validator(&self, command: &dyn Command) -> bool {
        self.validators.contains_key(&command.as_any().type_id())
    }

    /// Runs the validator registered for this command's type.
    ///
    /// Returns `None` when no validator is registered.
    pub fn validate(&self, command: &dyn Command) -> Option<ValidationErrors> {
        let any = command.as_any();
        self.validators
            .get(&any.type_id())
            .map(|validator| validator(any))
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

/// Startup-time builder for `ValidatorRegistry`.
#[derive(Default)]
pub struct ValidatorRegistryBuilder {
    validators: HashMap<TypeId, ErasedValidator>,
}

impl ValidatorRegistryBuilder {
    pub fn register<C, V>(&mut self, validator: V) -> Result<&mut Self, RegistryError>
    where
        C: Command,
        V: Validator<C> + 'static,
    {
        let key = TypeId::of::<C>();
        if self.validators.contains_key(&key) {
            return Err(RegistryError::DuplicateValidator(std::any::type_name::<C>()));
        }

        self.validators.insert(
            key,
            Box::new(move |command: &dyn Any| {
                let mut errors = ValidationErrors::new();
                if let Some(command) = command.downcast_ref::<C>() {
                    validator.validate(command, &mut errors);
                }
                errors
            }),
        );
        Ok(self)
    }

    pub fn build(self) -> ValidatorRegistry {
        ValidatorRegistry {
            validators: self.validators,
        }
    }
}
