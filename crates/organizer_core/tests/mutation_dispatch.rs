use organizer_core::context::clock::ManualClock;
use organizer_core::context::tenant::FixedTenantResolver;
use organizer_core::db::open_db_in_memory;
use organizer_core::model::planner::Task;
use organizer_core::persistence::data_context::DataContext;
use organizer_core::repo::entity_repo::{RepoError, Repository};
use organizer_core::service::mutation_service::{MutationError, MutationService};
use organizer_core::service::public_error::PublicError;
use organizer_core::validation::args::{ArgumentBag, CommandBuildError, SerializedFields};
use organizer_core::validation::dispatcher::{DispatchError, DispatchOutcome};
use organizer_core::validation::organizer::organizer_dispatcher;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use std::cell::Cell;
use std::convert::Infallible;
use std::sync::Arc;
use uuid::Uuid;

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))
        .unwrap()
}

#[test]
fn rejected_mutation_never_runs_its_handler() {
    let ran = Cell::new(false);
    let input = json!({ "spaceId": Uuid::new_v4().to_string(), "title": "", "priority": 0 });

    let err = organizer_dispatcher()
        .execute("createTask", ArgumentBag::from_json(&input), || {
            ran.set(true);
            Ok::<(), Infallible>(())
        })
        .unwrap_err();

    assert!(!ran.get());
    let DispatchError::Validation(failure) = err else {
        panic!("expected validation failure");
    };
    assert_eq!(failure.mutation, "createTask");
    assert_eq!(failure.errors.fields().collect::<Vec<_>>(), vec!["priority", "title"]);
}

#[test]
fn mutation_without_factory_always_proceeds() {
    let ran = Cell::new(false);
    let input = json!({ "anything": "goes" });

    organizer_dispatcher()
        .execute("archiveEverything", ArgumentBag::from_json(&input), || {
            ran.set(true);
            Ok::<(), Infallible>(())
        })
        .unwrap();
    assert!(ran.get());
    assert_eq!(
        organizer_dispatcher()
            .check("archiveEverything", ArgumentBag::from_json(&input))
            .unwrap(),
        DispatchOutcome::NoCommand
    );
}

#[test]
fn command_without_validator_always_proceeds() {
    let ran = Cell::new(false);
    let input = json!({ "id": Uuid::new_v4().to_string(), "title": "" });

    organizer_dispatcher()
        .execute("updateTask", ArgumentBag::from_json(&input), || {
            ran.set(true);
            Ok::<(), Infallible>(())
        })
        .unwrap();
    assert!(ran.get());
}

#[test]
fn missing_required_field_in_dictionary_fails_open() {
    let input = json!({ "spaceId": Uuid::new_v4().to_string(), "priority": 42 });
    let outcome = organizer_dispatcher()
        .check("createTask", ArgumentBag::from_json(&input))
        .unwrap();

    assert_eq!(
        outcome,
        DispatchOutcome::ContractDefect(CommandBuildError::MissingField {
            mutation: "createTask".to_string(),
            field: "title",
        })
    );
}

#[test]
fn missing_required_field_in_structured_input_fails_open() {
    #[derive(Serialize)]
    struct CreateTaskInput {
        title: String,
    }

    let fields = SerializedFields::from_serialize(&CreateTaskInput {
        title: "No space".to_string(),
    })
    .unwrap();
    let ran = Cell::new(false);

    organizer_dispatcher()
        .execute("createTask", ArgumentBag::Structured(&fields), || {
            ran.set(true);
            Ok::<(), Infallible>(())
        })
        .unwrap();
    assert!(ran.get());
}

#[test]
fn service_writes_validated_task_with_ledger_row() {
    let conn = open_db_in_memory().unwrap();
    let tenant = Uuid::new_v4();
    let ctx = DataContext::new(
        &conn,
        Arc::new(ManualClock::new(4_000)),
        Arc::new(FixedTenantResolver::tenant(tenant)),
    );
    let service = MutationService::new(&ctx);
    let space_id = Uuid::new_v4();

    let task = service
        .create_task(&json!({
            "spaceId": space_id.to_string(),
            "title": "  Pay rent ",
            "dueAt": 5_000,
            "priority": 3,
        }))
        .unwrap();

    assert_eq!(task.tenant_id, tenant);
    assert_eq!(task.space_id, space_id);
    assert_eq!(task.title, "Pay rent");
    assert_eq!(task.due_at, Some(5_000));
    assert_eq!(task.audit.created_at, 4_000);
    assert_eq!(count(&conn, "change_log"), 1);
}

#[test]
fn service_rejection_writes_nothing_and_surfaces_every_field() {
    let conn = open_db_in_memory().unwrap();
    let ctx = DataContext::new(
        &conn,
        Arc::new(ManualClock::new(4_000)),
        Arc::new(FixedTenantResolver::tenant(Uuid::new_v4())),
    );
    let service = MutationService::new(&ctx);

    let err = service
        .create_contact(&json!({ "email": "nobody", "phone": "??" }))
        .unwrap_err();
    assert!(matches!(err, MutationError::Validation(_)));
    assert_eq!(count(&conn, "contacts"), 0);
    assert_eq!(count(&conn, "change_log"), 0);

    let PublicError::ValidationFailed { errors, .. } = PublicError::from(err) else {
        panic!("expected validation_failed");
    };
    assert_eq!(
        errors.fields().collect::<Vec<_>>(),
        vec!["email", "firstName", "lastName", "phone"]
    );
}

#[test]
fn contract_defect_does_not_block_the_write() {
    let conn = open_db_in_memory().unwrap();
    let ctx = DataContext::new(
        &conn,
        Arc::new(ManualClock::new(4_000)),
        Arc::new(FixedTenantResolver::tenant(Uuid::new_v4())),
    );
    let input = json!({ "spaceId": Uuid::new_v4().to_string(), "title": "  Groceries " });

    assert_eq!(
        organizer_dispatcher()
            .check("createShoppingList", ArgumentBag::from_json(&input))
            .unwrap(),
        DispatchOutcome::ContractDefect(CommandBuildError::MissingField {
            mutation: "createShoppingList".to_string(),
            field: "name",
        })
    );

    let list = MutationService::new(&ctx)
        .create_shopping_list(&input)
        .unwrap();
    assert_eq!(list.name, "Groceries");
    assert_eq!(count(&conn, "shopping_lists"), 1);
    assert_eq!(count(&conn, "change_log"), 1);
}

#[test]
fn undecodable_payload_surfaces_as_internal() {
    let conn = open_db_in_memory().unwrap();
    let ctx = DataContext::new(
        &conn,
        Arc::new(ManualClock::new(4_000)),
        Arc::new(FixedTenantResolver::tenant(Uuid::new_v4())),
    );
    let service = MutationService::new(&ctx);

    let err = service
        .create_shopping_list(&json!({ "name": "Groceries" }))
        .unwrap_err();
    assert!(matches!(
        err,
        MutationError::InvalidInput {
            mutation: "createShoppingList",
            ..
        }
    ));
    assert_eq!(PublicError::from(err), PublicError::Internal);
    assert_eq!(count(&conn, "shopping_lists"), 0);
}

#[test]
fn delete_task_has_no_command_and_is_scoped() {
    let conn = open_db_in_memory().unwrap();
    let tenant = Uuid::new_v4();
    let ctx = DataContext::new(
        &conn,
        Arc::new(ManualClock::new(4_000)),
        Arc::new(FixedTenantResolver::tenant(tenant)),
    );
    let task = Repository::<Task>::new(&ctx)
        .create(Task::new(tenant, Uuid::new_v4(), "Dishes"))
        .unwrap();
    let service = MutationService::new(&ctx);
    let input = json!({ "id": task.audit.id.to_string() });

    assert!(service.delete_task(&input).unwrap());
    assert!(!service.delete_task(&input).unwrap());

    let other_ctx = DataContext::new(
        &conn,
        Arc::new(ManualClock::new(4_000)),
        Arc::new(FixedTenantResolver::tenant(Uuid::new_v4())),
    );
    let err = MutationService::new(&other_ctx)
        .update_task(&json!({ "id": task.audit.id.to_string(), "completed": true }))
        .unwrap_err();
    assert!(matches!(err, MutationError::Repo(RepoError::NotFound(_))));
    assert_eq!(PublicError::from(err), PublicError::NotFound);
}

#[test]
fn update_task_applies_partial_changes() {
    let conn = open_db_in_memory().unwrap();
    let tenant = Uuid::new_v4();
    let clock = Arc::new(ManualClock::new(1_000));
    let ctx = DataContext::new(
        &conn,
        clock.clone(),
        Arc::new(FixedTenantResolver::tenant(tenant)),
    );
    let task = Repository::<Task>::new(&ctx)
        .create(Task::new(tenant, Uuid::new_v4(), "Call plumber"))
        .unwrap();

    clock.advance(500);
    let updated = MutationService::new(&ctx)
        .update_task(&json!({ "id": task.audit.id.to_string(), "completed": true }))
        .unwrap();

    assert!(updated.completed);
    assert_eq!(updated.title, "Call plumber");
    assert_eq!(updated.audit.created_at, 1_000);
    assert_eq!(updated.audit.updated_at, 1_500);
}

#[test]
fn caller_without_tenant_cannot_own_new_records() {
    let conn = open_db_in_memory().unwrap();
    let ctx = DataContext::new(
        &conn,
        Arc::new(ManualClock::new(4_000)),
        Arc::new(FixedTenantResolver::none()),
    );

    let err = MutationService::new(&ctx)
        .create_contact(&json!({ "firstName": "Grace" }))
        .unwrap_err();
    assert!(matches!(err, MutationError::MissingTenant { mutation: "createContact" }));
    assert_eq!(count(&conn, "contacts"), 0);
}
