//! Commit entry point binding a connection to the pipeline collaborators.
//!
//! # Responsibility
//! - Hand out units of work stamped with one captured "now".
//! - Run the interceptor chain and write data + ledger rows in one SQLite
//!   transaction.
//!
//! # Invariants
//! - Data rows and ledger rows commit together or not at all.
//! - Nothing is written when the interceptor chain fails.
//! - A modification is classified against the row as stored inside the
//!   commit transaction, not against the caller's snapshot.
//!
//! # See also
//! - `persistence::interceptor` for the stamping/logging passes.

use crate::context::clock::Clock;
use crate::context::tenant::TenantResolver;
use crate::model::change_log::ChangeLogEntry;
use crate::model::entity::TenantId;
use crate::persistence::interceptor::{CommitContext, InterceptorChain};
use crate::persistence::record::insert_change_log;
use crate::persistence::unit_of_work::{EntryState, UnitOfWork};
use crate::repo::entity_repo::{RepoError, RepoResult};
use log::{debug, error, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::Arc;
use std::time::Instant;

/// Outcome of one successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Shared audit/ledger instant of this commit.
    pub committed_at: i64,
    /// Number of data rows written.
    pub written: usize,
    /// Ledger rows appended, in emission order.
    pub ledger: Vec<ChangeLogEntry>,
}

/// Connection plus clock, tenant resolver and interceptor chain.
pub struct DataContext<'conn> {
    conn: &'conn Connection,
    clock: Arc<dyn Clock>,
    tenant_resolver: Arc<dyn TenantResolver>,
    interceptors: InterceptorChain,
}

impl<'conn> DataContext<'conn> {
    /// Creates a context using the standard interceptor chain.
    pub fn new(
        conn: &'conn Connection,
        clock: Arc<dyn Clock>,
        tenant_resolver: Arc<dyn TenantResolver>,
    ) -> Self {
        Self {
            conn,
            clock,
            tenant_resolver,
            interceptors: InterceptorChain::standard(),
        }
    }

    /// Replaces the interceptor chain.
    pub fn with_interceptors(mut self, interceptors: InterceptorChain) -> Self {
        self.interceptors = interceptors;
        self
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    pub fn caller_tenant(&self) -> Option<TenantId> {
        self.tenant_resolver.current_tenant()
    }

    /// Starts a unit of work, capturing "now" once.
    pub fn begin(&self) -> UnitOfWork {
        UnitOfWork::new(self.clock.now_ms())
    }

    /// Runs the interceptor chain and commits all tracked changes atomically.
    ///
    /// The write lock is taken before the chain runs, so soft-delete
    /// detection compares against the `deleted_at` stored at commit time.
    ///
    /// # Errors
    /// - `RepoError::Commit` when an interceptor fails (nothing written).
    /// - `RepoError::NotFound` when a tracked update/remove hits no row.
    /// - `RepoError::Db` for SQLite failures; the transaction is rolled back.
    pub fn commit(&self, mut uow: UnitOfWork) -> RepoResult<CommitReceipt> {
        let started_at = Instant::now();
        let now = uow.now();

        match self.commit_in_transaction(&mut uow) {
            Ok((written, ledger)) => {
                info!(
                    "event=uow_commit module=persistence status=ok changes={} ledger_rows={} duration_ms={}",
                    written,
                    ledger.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(CommitReceipt {
                    committed_at: now,
                    written,
                    ledger,
                })
            }
            Err((stage, err)) => {
                error!(
                    "event=uow_commit module=persistence status=error stage={} duration_ms={} error={}",
                    stage,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn commit_in_transaction(
        &self,
        uow: &mut UnitOfWork,
    ) -> Result<(usize, Vec<ChangeLogEntry>), (&'static str, RepoError)> {
        // Dropping `tx` on any early return rolls back data and ledger together.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(|err| ("begin", RepoError::from(err)))?;
        refresh_originals(&tx, uow).map_err(|err| ("refresh", err))?;

        let ledger = {
            let mut ctx = CommitContext {
                now: uow.now(),
                caller_tenant: self.caller_tenant(),
                changes: uow.changes_mut(),
                ledger: Vec::new(),
            };
            self.interceptors
                .run(&mut ctx)
                .map_err(|err| ("interceptors", RepoError::Commit(err)))?;
            ctx.ledger
        };

        let written = write(&tx, uow, &ledger).map_err(|err| ("write", err))?;
        tx.commit().map_err(|err| ("write", RepoError::from(err)))?;
        Ok((written, ledger))
    }
}

/// Replaces each modification's `original_deleted_at` with the stored value.
fn refresh_originals(conn: &Connection, uow: &mut UnitOfWork) -> RepoResult<()> {
    for change in uow.changes_mut().iter_mut() {
        if change.state != EntryState::Modified {
            continue;
        }
        if let Some(stored) = change.record.stored_deleted_at(conn)? {
            change.original_deleted_at = stored;
        }
    }
    Ok(())
}

fn write(conn: &Connection, uow: &UnitOfWork, ledger: &[ChangeLogEntry]) -> RepoResult<usize> {
    let mut written = 0;
    for change in uow.changes() {
        change.record.persist(conn, change.state)?;
        if change.state != EntryState::Unchanged {
            written += 1;
        }
    }
    for entry in ledger {
        insert_change_log(conn, entry)?;
    }
    debug!(
        "event=uow_write module=persistence status=ok rows={} ledger_rows={}",
        written,
        ledger.len()
    );
    Ok(written)
}
