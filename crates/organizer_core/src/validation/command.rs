//! Typed commands and the mutation-name → factory registry.

use crate::validation::args::{CommandBuildError, MutationArgs};
use std::any::Any;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Typed, validatable representation of one mutation's input.
pub trait Command: Debug + Send + Sync + 'static {
    /// Stable command name used in logs.
    fn name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
}

/// Pure constructor of a command from normalized arguments.
pub type CommandFactory = fn(&MutationArgs<'_>) -> Result<Box<dyn Command>, CommandBuildError>;

/// Registry build errors. Raised at startup only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateMutation(String),
    DuplicateValidator(&'static str),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateMutation(name) => {
                write!(f, "command factory already registered for mutation `{name}`")
            }
            Self::DuplicateValidator(command) => {
                write!(f, "validator already registered for command `{command}`")
            }
        }
    }
}

impl Error for RegistryError {}

/// Immutable mutation-name → command factory map.
#[derive(Debug, Default, Clone)]
pub struct CommandFactoryRegistry {
    factories: HashMap<String, CommandFactory>,
}

impl CommandFactoryRegistry {
    pub fn builder() -> CommandFactoryRegistryBuilder {
        CommandFactoryRegistryBuilder::default()
    }

    pub fn get(&self, mutation: &str) -> Option<CommandFactory> {
        self.factories.get(mutation).copied()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Returns sorted registered mutation names.
    pub fn mutations(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Startup-time builder; the built registry has no mutation path.
#[derive(Debug, Default)]
pub struct CommandFactoryRegistryBuilder {
    factories: HashMap<String, CommandFactory>,
}

impl CommandFactoryRegistryBuilder {
    pub fn register(
        &mut self,
        mutation: &str,
        factory: CommandFactory,
    ) -> Result<&mut Self, RegistryError> {
        let mutation = mutation.trim().to_string();
        if self.factories.contains_key(&mutation) {
            return Err(RegistryError::DuplicateMutation(mutation));
        }
        self.factories.insert(mutation, factory);
        Ok(self)
    }

    pub fn build(self) -> CommandFactoryRegistry {
        CommandFactoryRegistry {
            factories: self.factories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Command, CommandFactoryRegistry, RegistryError};
    use crate::validation::args::{CommandBuildError, MutationArgs};
    use std::any::Any;

    #[derive(Debug)]
    struct Ping;

    impl Command for Ping {
        fn name(&self) -> &'static str {
            "ping"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn build_ping(_: &MutationArgs<'_>) -> Result<Box<dyn Command>, CommandBuildError> {
        Ok(Box::new(Ping))
    }

    #[test]
    fn duplicate_mutation_is_rejected() {
        let mut builder = CommandFactoryRegistry::builder();
        builder.register("ping", build_ping).unwrap();
        let err = builder.register(" ping ", build_ping).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateMutation("ping".to_string()));
    }

    #[test]
    fn built_registry_resolves_by_name() {
        let mut builder = CommandFactoryRegistry::builder();
        builder.register("ping", build_ping).unwrap();
        let registry = builder.build();
        assert!(registry.get("ping").is_some());
        assert!(registry.get("pong").is_none());
        assert_eq!(registry.mutations(), vec!["ping"]);
    }
}
