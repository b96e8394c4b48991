//! Mutation validation dispatcher.
//!
//! # Responsibility
//! - Rebuild a typed command from a mutation name and its argument bag.
//! - Run the registered validator and block the mutation on rule violations.
//!
//! # Invariants
//! - A rejected mutation never reaches its handler.
//! - Mutations without a factory, or commands without a validator, proceed.
//! - Contract defects while building the command, including factory panics,
//!   are logged and the mutation proceeds unvalidated (fail-open); rule
//!   violations fail closed.
//! - The dispatcher holds no mutable state.

use crate::validation::args::{ArgumentBag, CommandBuildError, MutationArgs};
use crate::validation::command::CommandFactoryRegistry;
use crate::validation::validator::{ValidationErrors, ValidatorRegistry};
use log::{debug, info, warn};
use std::any::Any;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{self, AssertUnwindSafe};

/// Rule violations that blocked one mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub mutation: String,
    pub command: &'static str,
    pub errors: ValidationErrors,
}

impl Display for ValidationFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.errors.fields().collect();
        write!(
            f,
            "mutation `{}` failed validation on: {}",
            self.mutation,
            fields.join(", ")
        )
    }
}

impl Error for ValidationFailure {}

/// How a mutation passed the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No command factory for this mutation name.
    NoCommand,
    /// Command built, but its type has no validator.
    Unvalidated { command: &'static str },
    /// Command built and every rule held.
    Validated { command: &'static str },
    /// Command could not be built; logged and allowed through.
    ContractDefect(CommandBuildError),
}

impl DispatchOutcome {
    pub fn is_validated(&self) -> bool {
        matches!(self, Self::Validated { .. })
    }
}

/// Error from `MutationDispatcher::execute`.
#[derive(Debug)]
pub enum DispatchError<E> {
    Validation(ValidationFailure),
    Handler(E),
}

impl<E: Display> Display for DispatchError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(failure) => write!(f, "{failure}"),
            Self::Handler(err) => write!(f, "{err}"),
        }
    }
}

impl<E: Error + 'static> Error for DispatchError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(failure) => Some(failure),
            Self::Handler(err) => Some(err),
        }
    }
}

/// Validates inbound mutations before their handlers run.
pub struct MutationDispatcher {
    factories: CommandFactoryRegistry,
    validators: ValidatorRegistry,
}

impl MutationDispatcher {
    pub fn new(factories: CommandFactoryRegistry, validators: ValidatorRegistry) -> Self {
        Self {
            factories,
            validators,
        }
    }

    pub fn factories(&self) -> &CommandFactoryRegistry {
        &self.factories
    }

    pub fn validators(&self) -> &ValidatorRegistry {
        &self.validators
    }

    /// Decides whether a mutation may proceed.
    ///
    /// # Errors
    /// - `ValidationFailure` with every violated field when rules fail.
    pub fn check(
        &self,
        mutation: &str,
        bag: ArgumentBag<'_>,
    ) -> Result<DispatchOutcome, ValidationFailure> {
        let Some(factory) = self.factories.get(mutation) else {
            debug!("event=mutation_validate module=validation status=skipped reason=no_command mutation={mutation}");
            return Ok(DispatchOutcome::NoCommand);
        };

        let args = MutationArgs::new(mutation, bag);
        let built = panic::catch_unwind(AssertUnwindSafe(|| factory(&args))).unwrap_or_else(
            |payload| {
                Err(CommandBuildError::FactoryPanicked {
                    mutation: mutation.to_string(),
                    message: panic_message(&*payload),
                })
            },
        );
        let command = match built {
            Ok(command) => command,
            Err(err) => {
                warn!(
                    "event=mutation_validate module=validation status=defect mutation={} dictionary={} error={}",
                    mutation,
                    bag.is_dictionary(),
                    err
                );
                return Ok(DispatchOutcome::ContractDefect(err));
            }
        };

        let Some(errors) = self.validators.validate(command.as_ref()) else {
            debug!(
                "event=mutation_validate module=validation status=skipped reason=no_validator mutation={} command={}",
                mutation,
                command.name()
            );
            return Ok(DispatchOutcome::Unvalidated {
                command: command.name(),
            });
        };

        if errors.is_empty() {
            debug!(
                "event=mutation_validate module=validation status=ok mutation={} command={}",
                mutation,
                command.name()
            );
            return Ok(DispatchOutcome::Validated {
                command: command.name(),
            });
        }

        info!(
            "event=mutation_validate module=validation status=rejected mutation={} command={} fields={}",
            mutation,
            command.name(),
            errors.field_count()
        );
        Err(ValidationFailure {
            mutation: mutation.to_string(),
            command: command.name(),
            errors,
        })
    }

    /// Checks the mutation and runs `handler` only when it may proceed.
    pub fn execute<T, E>(
        &self,
        mutation: &str,
        bag: ArgumentBag<'_>,
        handler: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, DispatchError<E>> {
        self.check(mutation, bag).map_err(DispatchError::Validation)?;
        handler().map_err(DispatchError::Handler)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::{DispatchOutcome, MutationDispatcher};
    use crate::validation::args::{ArgumentBag, CommandBuildError, MutationArgs};
    use crate::validation::command::{Command, CommandFactoryRegistry};
    use crate::validation::validator::ValidatorRegistry;
    use serde_json::json;
    use std::cell::Cell;
    use std::convert::Infallible;

    fn exploding_factory(_args: &MutationArgs<'_>) -> Result<Box<dyn Command>, CommandBuildError> {
        panic!("factory bug");
    }

    fn dispatcher_with_exploding_factory() -> MutationDispatcher {
        let mut factories = CommandFactoryRegistry::builder();
        factories
            .register("archiveSpace", exploding_factory)
            .unwrap();
        MutationDispatcher::new(factories.build(), ValidatorRegistry::builder().build())
    }

    #[test]
    fn panicking_factory_is_a_contract_defect() {
        let input = json!({ "id": "space-1" });
        let outcome = dispatcher_with_exploding_factory()
            .check("archiveSpace", ArgumentBag::from_json(&input))
            .unwrap();

        assert_eq!(
            outcome,
            DispatchOutcome::ContractDefect(CommandBuildError::FactoryPanicked {
                mutation: "archiveSpace".to_string(),
                message: "factory bug".to_string(),
            })
        );
    }

    #[test]
    fn panicking_factory_does_not_block_the_handler() {
        let input = json!({ "id": "space-1" });
        let ran = Cell::new(false);

        dispatcher_with_exploding_factory()
            .execute("archiveSpace", ArgumentBag::from_json(&input), || {
                ran.set(true);
                Ok::<(), Infallible>(())
            })
            .unwrap();
        assert!(ran.get());
    }
}
