//! Organizer mutation use-cases.
//!
//! # Responsibility
//! - Run each organizer mutation through the validation dispatcher before
//!   its repository write.
//! - Decode typed transport payloads and translate them into entity changes.
//!
//! # Invariants
//! - A mutation rejected by validation performs no read or write.
//! - Handlers decode their own payload, so a command contract defect the
//!   dispatcher fails open on does not block the write.
//! - New records are owned by the caller's resolved tenant.

use crate::model::entity::TenantId;
use crate::model::planner::{Contact, ShoppingList, Task};
use crate::persistence::data_context::DataContext;
use crate::repo::entity_repo::{RepoError, Repository};
use crate::service::inputs::{
    CreateContactInput, CreateShoppingListInput, CreateTaskInput, DeleteTaskInput,
    UpdateTaskInput,
};
use crate::validation::args::ArgumentBag;
use crate::validation::dispatcher::{DispatchError, MutationDispatcher, ValidationFailure};
use crate::validation::organizer::{
    organizer_dispatcher, CREATE_CONTACT, CREATE_SHOPPING_LIST, CREATE_TASK, UPDATE_TASK,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Mutation name of task soft deletion. It has no command factory.
pub const DELETE_TASK: &str = "deleteTask";

/// Service error for organizer mutations.
#[derive(Debug)]
pub enum MutationError {
    /// Input violated command rules; the handler did not run.
    Validation(ValidationFailure),
    /// The payload does not decode into the mutation's input type.
    InvalidInput {
        mutation: &'static str,
        source: serde_json::Error,
    },
    /// The caller has no tenant to own the new record.
    MissingTenant { mutation: &'static str },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for MutationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(failure) => write!(f, "{failure}"),
            Self::InvalidInput { mutation, source } => {
                write!(f, "mutation `{mutation}` has an undecodable payload: {source}")
            }
            Self::MissingTenant { mutation } => {
                write!(f, "mutation `{mutation}` requires a resolved tenant")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MutationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(failure) => Some(failure),
            Self::InvalidInput { source, .. } => Some(source),
            Self::Repo(err) => Some(err),
            Self::MissingTenant { .. } => None,
        }
    }
}

impl From<RepoError> for MutationError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<DispatchError<MutationError>> for MutationError {
    fn from(value: DispatchError<MutationError>) -> Self {
        match value {
            DispatchError::Validation(failure) => Self::Validation(failure),
            DispatchError::Handler(err) => err,
        }
    }
}

pub type MutationResult<T> = Result<T, MutationError>;

/// Validated write entry points over one data context.
pub struct MutationService<'ctx, 'conn> {
    ctx: &'ctx DataContext<'conn>,
    dispatcher: &'ctx MutationDispatcher,
}

impl<'ctx, 'conn> MutationService<'ctx, 'conn> {
    /// Creates a service using the process-wide organizer dispatcher.
    pub fn new(ctx: &'ctx DataContext<'conn>) -> Self {
        Self::with_dispatcher(ctx, organizer_dispatcher())
    }

    pub fn with_dispatcher(
        ctx: &'ctx DataContext<'conn>,
        dispatcher: &'ctx MutationDispatcher,
    ) -> Self {
        Self { ctx, dispatcher }
    }

    /// Creates a task in the caller's tenant.
    ///
    /// Payload: `CreateTaskInput`.
    pub fn create_task(&self, input: &Value) -> MutationResult<Task> {
        self.run(CREATE_TASK, input, |input: CreateTaskInput| {
            let mut task = Task::new(self.owner(CREATE_TASK)?, input.space_id, input.title.trim());
            task.notes = input.notes;
            task.due_at = input.due_at;
            task.priority = input.priority;
            Ok(Repository::<Task>::new(self.ctx).create(task)?)
        })
    }

    /// Renames and/or completes a visible task.
    ///
    /// Payload: `UpdateTaskInput`.
    ///
    /// # Errors
    /// - `MutationError::Repo(RepoError::NotFound)` when the task is not
    ///   visible to the caller.
    pub fn update_task(&self, input: &Value) -> MutationResult<Task> {
        self.run(UPDATE_TASK, input, |input: UpdateTaskInput| {
            let repo = Repository::<Task>::new(self.ctx);
            let mut task = repo.get(input.id)?.ok_or(RepoError::NotFound(input.id))?;
            if let Some(title) = input.title {
                task.title = title.trim().to_string();
            }
            if let Some(completed) = input.completed {
                task.completed = completed;
            }
            Ok(repo.update(&task)?)
        })
    }

    /// Soft-deletes a visible task. Returns `false` when nothing was visible.
    pub fn delete_task(&self, input: &Value) -> MutationResult<bool> {
        self.run(DELETE_TASK, input, |input: DeleteTaskInput| {
            Ok(Repository::<Task>::new(self.ctx).soft_delete(input.id)?)
        })
    }

    /// Creates a contact in the caller's tenant.
    ///
    /// Payload: `CreateContactInput`.
    pub fn create_contact(&self, input: &Value) -> MutationResult<Contact> {
        self.run(CREATE_CONTACT, input, |input: CreateContactInput| {
            let mut contact = Contact::new(self.owner(CREATE_CONTACT)?);
            contact.first_name = trimmed(input.first_name);
            contact.last_name = trimmed(input.last_name);
            contact.email = trimmed(input.email);
            contact.phone = trimmed(input.phone);
            Ok(Repository::<Contact>::new(self.ctx).create(contact)?)
        })
    }

    /// Creates a shopping list in the caller's tenant.
    ///
    /// Payload: `CreateShoppingListInput`.
    pub fn create_shopping_list(&self, input: &Value) -> MutationResult<ShoppingList> {
        self.run(CREATE_SHOPPING_LIST, input, |input: CreateShoppingListInput| {
            let list = ShoppingList::new(
                self.owner(CREATE_SHOPPING_LIST)?,
                input.space_id,
                input.name.trim(),
            );
            Ok(Repository::<ShoppingList>::new(self.ctx).create(list)?)
        })
    }

    fn run<I, T>(
        &self,
        mutation: &'static str,
        input: &Value,
        handler: impl FnOnce(I) -> MutationResult<T>,
    ) -> MutationResult<T>
    where
        I: DeserializeOwned,
    {
        self.dispatcher
            .execute(mutation, ArgumentBag::from_json(input), || {
                let decoded = I::deserialize(input)
                    .map_err(|source| MutationError::InvalidInput { mutation, source })?;
                handler(decoded)
            })
            .map_err(MutationError::from)
    }

    fn owner(&self, mutation: &'static str) -> MutationResult<TenantId> {
        self.ctx
            .caller_tenant()
            .ok_or(MutationError::MissingTenant { mutation })
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
