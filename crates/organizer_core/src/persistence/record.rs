//! Object-safe view of tracked records and the generic SQLite row mapping.
//!
//! # Responsibility
//! - Erase typed `Entity` implementations into `Record` trait objects the
//!   unit of work can hold side by side.
//! - Build INSERT/UPDATE/DELETE/SELECT statements from table metadata.
//!
//! # Invariants
//! - Updates never write `created_at` or `tenant_id`.
//! - Updates only match rows whose stored `tenant_id` equals the record's.
//! - Updates never clear `deleted_at` (`COALESCE` keeps the first tombstone).

use crate::model::change_log::ChangeLogEntry;
use crate::model::entity::{AuditFields, Entity, EntityId, EntityKind, ScopeCapability, TenantId};
use crate::persistence::scope::ScopeFilter;
use crate::persistence::unit_of_work::EntryState;
use crate::repo::entity_repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::fmt::Debug;
use uuid::Uuid;

/// Record tracked by a unit of work.
pub trait Record: Debug + Send {
    fn kind(&self) -> EntityKind;
    fn scope(&self) -> ScopeCapability;
    fn entity_id(&self) -> EntityId;
    fn audit_fields(&self) -> &AuditFields;
    fn audit_fields_mut(&mut self) -> &mut AuditFields;
    fn owner_tenant(&self) -> Option<TenantId>;
    fn space_reference(&self) -> Option<EntityId>;
    /// Reads the stored `deleted_at`; `None` when the row does not exist.
    fn stored_deleted_at(&self, conn: &Connection) -> RepoResult<Option<Option<i64>>>;
    /// Writes this record for the given tracked state.
    fn persist(&self, conn: &Connection, state: EntryState) -> RepoResult<()>;
}

impl<E: Entity> Record for E {
    fn kind(&self) -> EntityKind {
        E::KIND
    }

    fn scope(&self) -> ScopeCapability {
        E::SCOPE
    }

    fn entity_id(&self) -> EntityId {
        self.audit().id
    }

    fn audit_fields(&self) -> &AuditFields {
        self.audit()
    }

    fn audit_fields_mut(&mut self) -> &mut AuditFields {
        self.audit_mut()
    }

    fn owner_tenant(&self) -> Option<TenantId> {
        self.tenant_id()
    }

    fn space_reference(&self) -> Option<EntityId> {
        self.space_ref()
    }

    fn stored_deleted_at(&self, conn: &Connection) -> RepoResult<Option<Option<i64>>> {
        let stored = conn
            .query_row(
                &format!("SELECT deleted_at FROM {} WHERE id = ?1;", E::TABLE),
                [self.audit().id.to_string()],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?;
        Ok(stored)
    }

    fn persist(&self, conn: &Connection, state: EntryState) -> RepoResult<()> {
        match state {
            EntryState::Added => insert_entity(conn, self),
            EntryState::Modified => update_entity(conn, self),
            EntryState::Removed => delete_entity(conn, self),
            EntryState::Unchanged => Ok(()),
        }
    }
}

fn shared_columns<E: Entity>() -> Vec<&'static str> {
    let mut columns = vec!["id"];
    if E::SCOPE.has_tenant_column() {
        columns.push("tenant_id");
    }
    columns.extend(["created_at", "updated_at", "deleted_at"]);
    columns
}

fn select_sql<E: Entity>() -> String {
    let mut columns = shared_columns::<E>();
    columns.extend_from_slice(E::COLUMNS);
    format!("SELECT {} FROM {}", columns.join(", "), E::TABLE)
}

fn insert_entity<E: Entity>(conn: &Connection, entity: &E) -> RepoResult<()> {
    let audit = entity.audit();
    let mut columns = shared_columns::<E>();
    columns.extend_from_slice(E::COLUMNS);

    let mut values = vec![uuid_value(audit.id)];
    if E::SCOPE.has_tenant_column() {
        values.push(opt_uuid_value(entity.tenant_id()));
    }
    values.push(Value::Integer(audit.created_at));
    values.push(Value::Integer(audit.updated_at));
    values.push(opt_int(audit.deleted_at));
    values.extend(entity.column_values());

    let placeholders = vec!["?"; columns.len()].join(", ");
    conn.execute(
        &format!(
            "INSERT INTO {} ({}) VALUES ({placeholders});",
            E::TABLE,
            columns.join(", ")
        ),
        params_from_iter(values),
    )?;
    Ok(())
}

fn update_entity<E: Entity>(conn: &Connection, entity: &E) -> RepoResult<()> {
    let audit = entity.audit();
    let mut assignments = Vec::new();
    let mut values = Vec::new();

    assignments.push("updated_at = ?".to_string());
    values.push(Value::Integer(audit.updated_at));
    assignments.push("deleted_at = COALESCE(deleted_at, ?)".to_string());
    values.push(opt_int(audit.deleted_at));

    for (column, value) in E::COLUMNS.iter().zip(entity.column_values()) {
        assignments.push(format!("{column} = ?"));
        values.push(value);
    }
    values.push(uuid_value(audit.id));
    let predicate = if E::SCOPE.has_tenant_column() {
        values.push(opt_uuid_value(entity.tenant_id()));
        "id = ? AND tenant_id IS ?"
    } else {
        "id = ?"
    };

    let changed = conn.execute(
        &format!(
            "UPDATE {} SET {} WHERE {predicate};",
            E::TABLE,
            assignments.join(", ")
        ),
        params_from_iter(values),
    )?;

    if changed == 0 {
        return Err(RepoError::NotFound(audit.id));
    }
    Ok(())
}

fn delete_entity<E: Entity>(conn: &Connection, entity: &E) -> RepoResult<()> {
    let changed = conn.execute(
        &format!("DELETE FROM {} WHERE id = ?1;", E::TABLE),
        [entity.audit().id.to_string()],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound(entity.audit().id));
    }
    Ok(())
}

/// Loads one row by id under the given scope filter.
pub(crate) fn select_one<E: Entity>(
    conn: &Connection,
    filter: &ScopeFilter,
    id: EntityId,
) -> RepoResult<Option<E>> {
    let (predicate, mut bind_values) = filter.to_sql();
    bind_values.push(uuid_value(id));
    let sql = format!("{} WHERE {predicate} AND id = ?;", select_sql::<E>());

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_entity_row(row)?));
    }
    Ok(None)
}

/// Loads all rows under the given scope filter.
pub(crate) fn select_all<E: Entity>(conn: &Connection, filter: &ScopeFilter) -> RepoResult<Vec<E>> {
    let (predicate, bind_values) = filter.to_sql();
    let sql = format!("{} WHERE {predicate};", select_sql::<E>());

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut entities = Vec::new();
    while let Some(row) = rows.next()? {
        entities.push(parse_entity_row(row)?);
    }
    Ok(entities)
}

fn parse_entity_row<E: Entity>(row: &Row<'_>) -> RepoResult<E> {
    let audit = AuditFields {
        id: read_uuid(row, E::TABLE, "id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    };
    let tenant_id = if E::SCOPE.has_tenant_column() {
        read_opt_uuid(row, E::TABLE, "tenant_id")?
    } else {
        None
    };
    E::from_row(audit, tenant_id, row)
}

/// Appends one ledger row. Ledger rows are never updated or deleted.
pub(crate) fn insert_change_log(conn: &Connection, entry: &ChangeLogEntry) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO change_log (
            id,
            entity_kind,
            entity_id,
            operation,
            tenant_id,
            space_id,
            timestamp
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            entry.id.to_string(),
            entry.change_type.as_str(),
            entry.entity_id.to_string(),
            entry.operation.as_str(),
            entry.tenant_id.map(|id| id.to_string()),
            entry.space_id.map(|id| id.to_string()),
            entry.timestamp,
        ],
    )?;
    Ok(())
}

pub(crate) fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

pub(crate) fn opt_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, text)
}

pub(crate) fn opt_int(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

pub(crate) fn uuid_value(value: Uuid) -> Value {
    Value::Text(value.to_string())
}

pub(crate) fn opt_uuid_value(value: Option<Uuid>) -> Value {
    value.map_or(Value::Null, uuid_value)
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, table: &str, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {table}.{column}"
        ))),
    }
}

pub(crate) fn read_uuid(row: &Row<'_>, table: &str, column: &str) -> RepoResult<Uuid> {
    let value: String = row.get(column)?;
    parse_uuid(&value, table, column)
}

pub(crate) fn read_opt_uuid(row: &Row<'_>, table: &str, column: &str) -> RepoResult<Option<Uuid>> {
    match row.get::<_, Option<String>>(column)? {
        Some(value) => Ok(Some(parse_uuid(&value, table, column)?)),
        None => Ok(None),
    }
}

fn parse_uuid(value: &str, table: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{value}` in {table}.{column}"))
    })
}
