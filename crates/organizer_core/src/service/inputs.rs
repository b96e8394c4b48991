//! Transport payloads of organizer mutations.
//!
//! Handlers decode these with serde, independently of the command factories
//! the validation dispatcher uses. Keys are camelCase.

use crate::model::entity::EntityId;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskInput {
    pub space_id: EntityId,
    pub title: String,
    pub notes: Option<String>,
    pub due_at: Option<i64>,
    pub priority: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskInput {
    pub id: EntityId,
    pub title: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeleteTaskInput {
    pub id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Older clients send the list name as `title`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShoppingListInput {
    pub space_id: EntityId,
    #[serde(alias = "title")]
    pub name: String,
}
