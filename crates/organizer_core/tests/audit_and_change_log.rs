use organizer_core::context::clock::ManualClock;
use organizer_core::context::tenant::FixedTenantResolver;
use organizer_core::db::open_db_in_memory;
use organizer_core::model::change_log::ChangeOperation;
use organizer_core::model::planner::{Calendar, Contact, Task};
use organizer_core::model::reference::Holiday;
use organizer_core::model::tenancy::{Space, Tenant};
use organizer_core::persistence::data_context::DataContext;
use organizer_core::persistence::interceptor::{
    CommitContext, InterceptorChain, InterceptorError, SaveInterceptor,
};
use organizer_core::persistence::registry::ChangeType;
use organizer_core::repo::entity_repo::{RepoError, Repository};
use rusqlite::Connection;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, PartialEq, Eq)]
struct LedgerRow {
    entity_kind: String,
    entity_id: String,
    operation: ChangeOperation,
    tenant_id: Option<String>,
    space_id: Option<String>,
    timestamp: i64,
}

fn ledger_rows(conn: &Connection) -> Vec<LedgerRow> {
    let mut stmt = conn
        .prepare(
            "SELECT entity_kind, entity_id, operation, tenant_id, space_id, timestamp
             FROM change_log
             ORDER BY seq ASC;",
        )
        .unwrap();
    stmt.query_map([], |row| {
        Ok(LedgerRow {
            entity_kind: row.get(0)?,
            entity_id: row.get(1)?,
            operation: ChangeOperation::parse(&row.get::<_, String>(2)?)
                .expect("known ledger operation"),
            tenant_id: row.get(3)?,
            space_id: row.get(4)?,
            timestamp: row.get(5)?,
        })
    })
    .unwrap()
    .collect::<Result<Vec<_>, _>>()
    .unwrap()
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))
        .unwrap()
}

#[test]
fn create_and_update_stamp_audit_fields_from_the_clock() {
    let conn = open_db_in_memory().unwrap();
    let tenant = Uuid::new_v4();
    let clock = Arc::new(ManualClock::new(1_000));
    let ctx = DataContext::new(
        &conn,
        clock.clone(),
        Arc::new(FixedTenantResolver::tenant(tenant)),
    );
    let tasks = Repository::<Task>::new(&ctx);

    let created = tasks.create(Task::new(tenant, Uuid::new_v4(), "Draft")).unwrap();
    assert_eq!(created.audit.created_at, 1_000);
    assert_eq!(created.audit.updated_at, 1_000);
    assert_eq!(created.audit.deleted_at, None);

    clock.set(2_500);
    let mut edited = created.clone();
    edited.title = "Final".to_string();
    edited.audit.created_at = 42;
    let updated = tasks.update(&edited).unwrap();

    assert_eq!(updated.title, "Final");
    assert_eq!(updated.audit.created_at, 1_000);
    assert_eq!(updated.audit.updated_at, 2_500);
}

#[test]
fn multi_entity_commit_shares_one_timestamp() {
    let conn = open_db_in_memory().unwrap();
    let tenant = Uuid::new_v4();
    let ctx = DataContext::new(
        &conn,
        Arc::new(ManualClock::new(7_000)),
        Arc::new(FixedTenantResolver::tenant(tenant)),
    );

    let space = Space::new(tenant, "Family");
    let calendar = Calendar::new(tenant, space.audit.id, "Birthdays");
    let task = Task::new(tenant, space.audit.id, "Buy cake");

    let mut uow = ctx.begin();
    uow.add(space.clone()).unwrap();
    uow.add(calendar.clone()).unwrap();
    uow.add(task.clone()).unwrap();
    let receipt = ctx.commit(uow).unwrap();

    assert_eq!(receipt.committed_at, 7_000);
    assert_eq!(receipt.written, 3);
    assert_eq!(receipt.ledger.len(), 3);
    assert!(receipt
        .ledger
        .iter()
        .all(|entry| entry.timestamp == receipt.committed_at
            && entry.operation == ChangeOperation::Created));
    assert_eq!(
        receipt
            .ledger
            .iter()
            .map(|entry| entry.change_type)
            .collect::<Vec<_>>(),
        vec![ChangeType::Space, ChangeType::Calendar, ChangeType::Task]
    );

    let stored = Repository::<Calendar>::new(&ctx)
        .get(calendar.audit.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.audit.created_at, receipt.committed_at);

    let rows = ledger_rows(&conn);
    let space_id = space.audit.id.to_string();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|row| row.timestamp == 7_000));
    assert!(rows.iter().all(|row| row.space_id.as_deref() == Some(space_id.as_str())));
    assert!(rows
        .iter()
        .all(|row| row.tenant_id == Some(tenant.to_string())));
    assert_eq!(rows[0].entity_id, space_id);
}

#[test]
fn soft_delete_is_logged_as_deleted() {
    let conn = open_db_in_memory().unwrap();
    let tenant = Uuid::new_v4();
    let clock = Arc::new(ManualClock::new(1_000));
    let ctx = DataContext::new(
        &conn,
        clock.clone(),
        Arc::new(FixedTenantResolver::tenant(tenant)),
    );
    let tasks = Repository::<Task>::new(&ctx);
    let task = tasks.create(Task::new(tenant, Uuid::new_v4(), "Laundry")).unwrap();

    clock.set(3_000);
    let receipt = tasks
        .soft_delete_with_receipt(task.audit.id)
        .unwrap()
        .unwrap();
    assert_eq!(receipt.ledger.len(), 1);
    assert_eq!(receipt.ledger[0].operation, ChangeOperation::Deleted);

    let deleted = tasks.unfiltered().get(task.audit.id).unwrap().unwrap();
    assert_eq!(deleted.audit.deleted_at, Some(3_000));
    assert_eq!(deleted.audit.updated_at, 3_000);

    let operations: Vec<ChangeOperation> = ledger_rows(&conn)
        .into_iter()
        .map(|row| row.operation)
        .collect();
    assert_eq!(
        operations,
        vec![ChangeOperation::Created, ChangeOperation::Deleted]
    );
}

#[test]
fn editing_an_already_deleted_record_is_an_update_and_keeps_deleted_at() {
    let conn = open_db_in_memory().unwrap();
    let tenant = Uuid::new_v4();
    let clock = Arc::new(ManualClock::new(1_000));
    let ctx = DataContext::new(
        &conn,
        clock.clone(),
        Arc::new(FixedTenantResolver::tenant(tenant)),
    );
    let tasks = Repository::<Task>::new(&ctx);
    let task = tasks.create(Task::new(tenant, Uuid::new_v4(), "Old")).unwrap();
    tasks.soft_delete(task.audit.id).unwrap();

    clock.set(9_000);
    let original = tasks.unfiltered().get(task.audit.id).unwrap().unwrap();
    let mut changed = original.clone();
    changed.title = "Renamed in recovery".to_string();
    changed.audit.deleted_at = Some(9_000);

    let mut uow = ctx.begin();
    uow.modify(&original, changed).unwrap();
    let receipt = ctx.commit(uow).unwrap();
    assert_eq!(receipt.ledger[0].operation, ChangeOperation::Updated);

    let stored = tasks.unfiltered().get(task.audit.id).unwrap().unwrap();
    assert_eq!(stored.title, "Renamed in recovery");
    assert_eq!(stored.audit.deleted_at, Some(1_000));
}

#[test]
fn stale_snapshot_cannot_log_a_second_deletion() {
    let conn = open_db_in_memory().unwrap();
    let tenant = Uuid::new_v4();
    let clock = Arc::new(ManualClock::new(1_000));
    let ctx = DataContext::new(
        &conn,
        clock.clone(),
        Arc::new(FixedTenantResolver::tenant(tenant)),
    );
    let tasks = Repository::<Task>::new(&ctx);
    let task = tasks.create(Task::new(tenant, Uuid::new_v4(), "Twice")).unwrap();
    let stale = tasks.get(task.audit.id).unwrap().unwrap();

    clock.set(2_000);
    assert!(tasks.soft_delete(task.audit.id).unwrap());

    clock.set(3_000);
    let mut tombstoned = stale.clone();
    tombstoned.audit.deleted_at = Some(3_000);
    let mut uow = ctx.begin();
    uow.modify(&stale, tombstoned).unwrap();
    let receipt = ctx.commit(uow).unwrap();

    assert_eq!(receipt.ledger.len(), 1);
    assert_eq!(receipt.ledger[0].operation, ChangeOperation::Updated);
    let deletions = ledger_rows(&conn)
        .iter()
        .filter(|row| row.operation == ChangeOperation::Deleted)
        .count();
    assert_eq!(deletions, 1);
    let stored = tasks.unfiltered().get(task.audit.id).unwrap().unwrap();
    assert_eq!(stored.audit.deleted_at, Some(2_000));
}

#[test]
fn ledger_never_logs_itself() {
    let conn = open_db_in_memory().unwrap();
    let tenant = Uuid::new_v4();
    let ctx = DataContext::new(
        &conn,
        Arc::new(ManualClock::new(1_000)),
        Arc::new(FixedTenantResolver::tenant(tenant)),
    );
    let tasks = Repository::<Task>::new(&ctx);
    let task = tasks.create(Task::new(tenant, Uuid::new_v4(), "One")).unwrap();
    tasks.update(&task).unwrap();
    tasks.soft_delete(task.audit.id).unwrap();

    assert_eq!(count(&conn, "change_log"), 3);
    let self_rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM change_log WHERE entity_kind = 'change_log';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(self_rows, 0);
}

#[test]
fn ledger_tenant_and_space_follow_each_kind() {
    let conn = open_db_in_memory().unwrap();
    let caller = Uuid::new_v4();
    let ctx = DataContext::new(
        &conn,
        Arc::new(ManualClock::new(1_000)),
        Arc::new(FixedTenantResolver::tenant(caller)),
    );

    let tenant = Repository::<Tenant>::new(&ctx).create(Tenant::new("Acme")).unwrap();
    let space = Repository::<Space>::new(&ctx)
        .create(Space::new(caller, "Home"))
        .unwrap();
    Repository::<Contact>::new(&ctx)
        .create(Contact::new(caller))
        .unwrap();
    Repository::<Holiday>::new(&ctx)
        .create(Holiday::new("Midsummer", 0))
        .unwrap();

    let rows = ledger_rows(&conn);
    let caller = Some(caller.to_string());
    assert_eq!(rows[0].entity_kind, "tenant");
    assert_eq!(rows[0].tenant_id, Some(tenant.audit.id.to_string()));
    assert_eq!(rows[0].space_id, None);

    assert_eq!(rows[1].entity_kind, "space");
    assert_eq!(rows[1].tenant_id, caller);
    assert_eq!(rows[1].space_id, Some(space.audit.id.to_string()));

    assert_eq!(rows[2].entity_kind, "contact");
    assert_eq!(rows[2].space_id, None);

    assert_eq!(rows[3].entity_kind, "holiday");
    assert_eq!(rows[3].tenant_id, caller);
}

#[test]
fn attached_records_are_neither_stamped_nor_logged() {
    let conn = open_db_in_memory().unwrap();
    let tenant = Uuid::new_v4();
    let clock = Arc::new(ManualClock::new(1_000));
    let ctx = DataContext::new(
        &conn,
        clock.clone(),
        Arc::new(FixedTenantResolver::tenant(tenant)),
    );
    let spaces = Repository::<Space>::new(&ctx);
    let space = spaces.create(Space::new(tenant, "Home")).unwrap();

    clock.set(5_000);
    let mut uow = ctx.begin();
    uow.attach(space.clone()).unwrap();
    uow.add(Task::new(tenant, space.audit.id, "Sweep")).unwrap();
    let receipt = ctx.commit(uow).unwrap();

    assert_eq!(receipt.written, 1);
    assert_eq!(receipt.ledger.len(), 1);
    assert_eq!(receipt.ledger[0].change_type, ChangeType::Task);
    assert_eq!(spaces.get(space.audit.id).unwrap().unwrap().audit.updated_at, 1_000);
}

#[test]
fn storage_removal_is_logged_as_deleted() {
    let conn = open_db_in_memory().unwrap();
    let tenant = Uuid::new_v4();
    let ctx = DataContext::new(
        &conn,
        Arc::new(ManualClock::new(1_000)),
        Arc::new(FixedTenantResolver::tenant(tenant)),
    );
    let tasks = Repository::<Task>::new(&ctx);
    let task = tasks.create(Task::new(tenant, Uuid::new_v4(), "Purge")).unwrap();

    let mut uow = ctx.begin();
    uow.remove(task.clone()).unwrap();
    let receipt = ctx.commit(uow).unwrap();

    assert_eq!(receipt.ledger[0].operation, ChangeOperation::Deleted);
    assert!(tasks.unfiltered().get(task.audit.id).unwrap().is_none());
}

struct RejectEverything;

impl SaveInterceptor for RejectEverything {
    fn name(&self) -> &'static str {
        "reject_everything"
    }

    fn before_commit(&self, ctx: &mut CommitContext<'_>) -> Result<(), InterceptorError> {
        assert_eq!(ctx.ledger.len(), ctx.changes.len());
        Err(InterceptorError::Rejected {
            interceptor: self.name(),
            reason: "maintenance window".to_string(),
        })
    }
}

#[test]
fn failing_interceptor_aborts_the_whole_commit() {
    let conn = open_db_in_memory().unwrap();
    let tenant = Uuid::new_v4();
    let ctx = DataContext::new(
        &conn,
        Arc::new(ManualClock::new(1_000)),
        Arc::new(FixedTenantResolver::tenant(tenant)),
    )
    .with_interceptors(InterceptorChain::standard().then(Box::new(RejectEverything)));

    let space = Space::new(tenant, "Home");
    let mut uow = ctx.begin();
    uow.add(space.clone()).unwrap();
    uow.add(Task::new(tenant, space.audit.id, "Never stored")).unwrap();

    let err = ctx.commit(uow).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Commit(InterceptorError::Rejected {
            interceptor: "reject_everything",
            ..
        })
    ));
    assert_eq!(count(&conn, "spaces"), 0);
    assert_eq!(count(&conn, "tasks"), 0);
    assert_eq!(count(&conn, "change_log"), 0);
}

#[test]
fn failed_write_rolls_back_earlier_rows_of_the_same_commit() {
    let conn = open_db_in_memory().unwrap();
    let tenant = Uuid::new_v4();
    let ctx = DataContext::new(
        &conn,
        Arc::new(ManualClock::new(1_000)),
        Arc::new(FixedTenantResolver::tenant(tenant)),
    );
    let tasks = Repository::<Task>::new(&ctx);
    let existing = tasks.create(Task::new(tenant, Uuid::new_v4(), "Existing")).unwrap();

    let mut uow = ctx.begin();
    uow.add(Task::new(tenant, Uuid::new_v4(), "Fresh")).unwrap();
    let mut ghost = existing.clone();
    ghost.audit.id = Uuid::new_v4();
    uow.modify(&ghost, ghost.clone()).unwrap();

    let err = ctx.commit(uow).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));
    assert_eq!(count(&conn, "tasks"), 1);
    assert_eq!(count(&conn, "change_log"), 1);
}

#[test]
fn change_log_rows_are_append_only() {
    let conn = open_db_in_memory().unwrap();
    let tenant = Uuid::new_v4();
    let ctx = DataContext::new(
        &conn,
        Arc::new(ManualClock::new(1_000)),
        Arc::new(FixedTenantResolver::tenant(tenant)),
    );
    Repository::<Task>::new(&ctx)
        .create(Task::new(tenant, Uuid::new_v4(), "Audit me"))
        .unwrap();

    assert!(conn
        .execute("UPDATE change_log SET operation = 'updated';", [])
        .is_err());
    assert!(conn.execute("DELETE FROM change_log;", []).is_err());
    assert_eq!(count(&conn, "change_log"), 1);
}
