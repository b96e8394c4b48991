//! Organizer mutation commands, their factories and validators.
//!
//! # Responsibility
//! - Map organizer mutation names to typed commands.
//! - Hold the field rules checked before organizer writes.
//!
//! # Invariants
//! - The default dispatcher is built once and never mutated.
//! - `updateTask` has a command but no validator and always proceeds.

use crate::model::entity::EntityId;
use crate::validation::args::{CommandBuildError, MutationArgs};
use crate::validation::command::{Command, CommandFactoryRegistry, RegistryError};
use crate::validation::dispatcher::MutationDispatcher;
use crate::validation::validator::{ValidationErrors, Validator, ValidatorRegistry};
use log::error;
use once_cell::sync::Lazy;
use regex::Regex;
use std::any::Any;

pub const CREATE_SPACE: &str = "createSpace";
pub const CREATE_CALENDAR: &str = "createCalendar";
pub const CREATE_TASK: &str = "createTask";
pub const UPDATE_TASK: &str = "updateTask";
pub const CREATE_CONTACT: &str = "createContact";
pub const CREATE_SHOPPING_LIST: &str = "createShoppingList";

const MIN_PRIORITY: i64 = 1;
const MAX_PRIORITY: i64 = 5;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern must compile")
});
static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9 ()-]{3,20}$").expect("phone pattern must compile"));
static COLOR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("color pattern must compile"));

static ORGANIZER_DISPATCHER: Lazy<MutationDispatcher> = Lazy::new(|| {
    build_organizer_dispatcher().unwrap_or_else(|err| {
        error!("event=registry_build module=validation status=error error={err}");
        MutationDispatcher::new(
            CommandFactoryRegistry::default(),
            ValidatorRegistry::default(),
        )
    })
});

/// Process-wide dispatcher for organizer mutations.
pub fn organizer_dispatcher() -> &'static MutationDispatcher {
    &ORGANIZER_DISPATCHER
}

/// Builds a fresh organizer dispatcher.
///
/// # Errors
/// - `RegistryError` when a mutation or command is registered twice.
pub fn build_organizer_dispatcher() -> Result<MutationDispatcher, RegistryError> {
    let mut factories = CommandFactoryRegistry::builder();
    factories
        .register(CREATE_SPACE, build_create_space)?
        .register(CREATE_CALENDAR, build_create_calendar)?
        .register(CREATE_TASK, build_create_task)?
        .register(UPDATE_TASK, build_update_task)?
        .register(CREATE_CONTACT, build_create_contact)?
        .register(CREATE_SHOPPING_LIST, build_create_shopping_list)?;

    let mut validators = ValidatorRegistry::builder();
    validators
        .register::<CreateSpaceCommand, _>(CreateSpaceRules)?
        .register::<CreateCalendarCommand, _>(CreateCalendarRules)?
        .register::<CreateTaskCommand, _>(CreateTaskRules)?
        .register::<CreateContactCommand, _>(CreateContactRules)?
        .register::<CreateShoppingListCommand, _>(CreateShoppingListRules)?;

    Ok(MutationDispatcher::new(factories.build(), validators.build()))
}

macro_rules! command_name {
    ($command:ty, $name:literal) => {
        impl Command for $command {
            fn name(&self) -> &'static str {
                $name
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSpaceCommand {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCalendarCommand {
    pub space_id: EntityId,
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskCommand {
    pub space_id: EntityId,
    pub title: String,
    pub notes: Option<String>,
    pub due_at: Option<i64>,
    pub priority: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTaskCommand {
    pub id: EntityId,
    pub title: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateContactCommand {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateShoppingListCommand {
    pub space_id: EntityId,
    pub name: String,
}

command_name!(CreateSpaceCommand, "create_space");
command_name!(CreateCalendarCommand, "create_calendar");
command_name!(CreateTaskCommand, "create_task");
command_name!(UpdateTaskCommand, "update_task");
command_name!(CreateContactCommand, "create_contact");
command_name!(CreateShoppingListCommand, "create_shopping_list");

fn build_create_space(args: &MutationArgs<'_>) -> Result<Box<dyn Command>, CommandBuildError> {
    Ok(Box::new(CreateSpaceCommand {
        name: args.required_str("name")?,
    }))
}

fn build_create_calendar(args: &MutationArgs<'_>) -> Result<Box<dyn Command>, CommandBuildError> {
    Ok(Box::new(CreateCalendarCommand {
        space_id: args.required_id("spaceId")?,
        name: args.required_str("name")?,
        color: args.optional_str("color")?,
    }))
}

fn build_create_task(args: &MutationArgs<'_>) -> Result<Box<dyn Command>, CommandBuildError> {
    Ok(Box::new(CreateTaskCommand {
        space_id: args.required_id("spaceId")?,
        title: args.required_str("title")?,
        notes: args.optional_str("notes")?,
        due_at: args.optional_i64("dueAt")?,
        priority: args.optional_i64("priority")?,
    }))
}

fn build_update_task(args: &MutationArgs<'_>) -> Result<Box<dyn Command>, CommandBuildError> {
    Ok(Box::new(UpdateTaskCommand {
        id: args.required_id("id")?,
        title: args.optional_str("title")?,
        completed: args.optional_bool("completed")?,
    }))
}

fn build_create_contact(args: &MutationArgs<'_>) -> Result<Box<dyn Command>, CommandBuildError> {
    Ok(Box::new(CreateContactCommand {
        first_name: args.optional_str("firstName")?,
        last_name: args.optional_str("lastName")?,
        email: args.optional_str("email")?,
        phone: args.optional_str("phone")?,
    }))
}

fn build_create_shopping_list(
    args: &MutationArgs<'_>,
) -> Result<Box<dyn Command>, CommandBuildError> {
    Ok(Box::new(CreateShoppingListCommand {
        space_id: args.required_id("spaceId")?,
        name: args.required_str("name")?,
    }))
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|value| !is_blank(value))
}

fn check_space(errors: &mut ValidationErrors, space_id: EntityId) {
    errors.ensure(!space_id.is_nil(), "spaceId", "space is required");
}

struct CreateSpaceRules;

impl Validator<CreateSpaceCommand> for CreateSpaceRules {
    fn validate(&self, command: &CreateSpaceCommand, errors: &mut ValidationErrors) {
        errors.ensure(!is_blank(&command.name), "name", "name must not be blank");
    }
}

struct CreateCalendarRules;

impl Validator<CreateCalendarCommand> for CreateCalendarRules {
    fn validate(&self, command: &CreateCalendarCommand, errors: &mut ValidationErrors) {
        check_space(errors, command.space_id);
        errors.ensure(!is_blank(&command.name), "name", "name must not be blank");
        if let Some(color) = command.color.as_deref() {
            errors.ensure(
                COLOR_PATTERN.is_match(color),
                "color",
                "color must look like #rrggbb",
            );
        }
    }
}

struct CreateTaskRules;

impl Validator<CreateTaskCommand> for CreateTaskRules {
    fn validate(&self, command: &CreateTaskCommand, errors: &mut ValidationErrors) {
        check_space(errors, command.space_id);
        errors.ensure(!is_blank(&command.title), "title", "title must not be blank");
        if let Some(due_at) = command.due_at {
            errors.ensure(due_at >= 0, "dueAt", "due date must not be before 1970");
        }
        if let Some(priority) = command.priority {
            errors.ensure(
                (MIN_PRIORITY..=MAX_PRIORITY).contains(&priority),
                "priority",
                format!("priority must be between {MIN_PRIORITY} and {MAX_PRIORITY}"),
            );
        }
    }
}

struct CreateContactRules;

impl Validator<CreateContactCommand> for CreateContactRules {
    fn validate(&self, command: &CreateContactCommand, errors: &mut ValidationErrors) {
        let named =
            has_text(command.first_name.as_deref()) || has_text(command.last_name.as_deref());
        errors.ensure(named, "firstName", "first or last name is required");
        errors.ensure(named, "lastName", "first or last name is required");

        if let Some(email) = command.email.as_deref() {
            errors.ensure(
                EMAIL_PATTERN.is_match(email.trim()),
                "email",
                "email address is malformed",
            );
        }
        if let Some(phone) = command.phone.as_deref() {
            errors.ensure(
                PHONE_PATTERN.is_match(phone.trim()),
                "phone",
                "phone number is malformed",
            );
        }
    }
}

struct CreateShoppingListRules;

impl Validator<CreateShoppingListCommand> for CreateShoppingListRules {
    fn validate(&self, command: &CreateShoppingListCommand, errors: &mut ValidationErrors) {
        check_space(errors, command.space_id);
        errors.ensure(!is_blank(&command.name), "name", "name must not be blank");
    }
}
