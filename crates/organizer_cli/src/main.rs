//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `organizer_core` linkage (`ping`, `version`).
//! - Run a scripted demo of the pipeline against an in-memory store.
//!
//! Usage: `organizer_cli [ping|version|demo] [--log-dir <absolute path>]`

use log::info;
use organizer_core::{
    default_log_level, init_logging, open_db_in_memory, DataContext, FixedTenantResolver,
    MutationService, PublicError, Repository, Space, SystemClock, Task,
};
use serde_json::json;
use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use uuid::Uuid;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("demo");

    if let Some(position) = args.iter().position(|arg| arg == "--log-dir") {
        let Some(dir) = args.get(position + 1) else {
            eprintln!("--log-dir requires a value");
            return ExitCode::FAILURE;
        };
        if let Err(err) = init_logging(default_log_level(), dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    match command {
        "ping" => println!("organizer_core ping={}", organizer_core::ping()),
        "version" => println!("organizer_core version={}", organizer_core::core_version()),
        "demo" | "--log-dir" => {
            if let Err(err) = run_demo() {
                eprintln!("demo failed: {err}");
                return ExitCode::FAILURE;
            }
        }
        other => {
            eprintln!("unknown command `{other}`; expected ping|version|demo");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

fn run_demo() -> Result<(), Box<dyn Error>> {
    let conn = open_db_in_memory()?;
    let tenant_id = Uuid::new_v4();
    let ctx = DataContext::new(
        &conn,
        Arc::new(SystemClock),
        Arc::new(FixedTenantResolver::tenant(tenant_id)),
    );
    info!("event=cli_demo module=cli status=start");

    let space = Repository::<Space>::new(&ctx).create(Space::new(tenant_id, "Home"))?;
    println!("space created id={}", space.audit.id);

    let service = MutationService::new(&ctx);
    let task = service.create_task(&json!({
        "spaceId": space.audit.id.to_string(),
        "title": "Water the plants",
        "priority": 2,
    }))?;
    println!(
        "task created id={} created_at={} updated_at={}",
        task.audit.id, task.audit.created_at, task.audit.updated_at
    );

    let rejected = service.create_task(&json!({
        "spaceId": Uuid::nil().to_string(),
        "title": "",
        "priority": 9,
    }));
    if let Err(err) = rejected {
        println!("task rejected: {}", serde_json::to_string(&PublicError::from(err))?);
    }

    let deleted = service.delete_task(&json!({ "id": task.audit.id.to_string() }))?;
    let visible = Repository::<Task>::new(&ctx).list()?.len();
    println!("task deleted={deleted} visible_tasks={visible}");

    let ledger_rows: i64 = conn.query_row("SELECT COUNT(*) FROM change_log;", [], |row| row.get(0))?;
    println!("change_log rows={ledger_rows}");

    info!("event=cli_demo module=cli status=ok");
    Ok(())
}
