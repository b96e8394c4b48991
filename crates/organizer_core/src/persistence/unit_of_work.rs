//! Pending-change snapshot for one unit of work.
//!
//! # Responsibility
//! - Track which records are added, modified, removed or merely attached.
//! - Carry the single "now" captured when the unit of work began.
//!
//! # Invariants
//! - Each record is tracked at most once per unit of work.
//! - `now` never changes after `begin`.

use crate::model::entity::{Entity, EntityId, EntityKind};
use crate::persistence::record::Record;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage-level state of a tracked record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Added,
    Modified,
    Removed,
    /// Attached for reference only; never written, stamped or logged.
    Unchanged,
}

/// One tracked record plus the original values the pipeline compares against.
#[derive(Debug)]
pub struct TrackedChange {
    pub state: EntryState,
    pub record: Box<dyn Record>,
    /// `deleted_at` as last loaded from storage (`None` for new records).
    ///
    /// For modifications, `DataContext::commit` re-reads it inside the
    /// commit transaction.
    pub original_deleted_at: Option<i64>,
}

impl TrackedChange {
    pub fn kind(&self) -> EntityKind {
        self.record.kind()
    }

    pub fn entity_id(&self) -> EntityId {
        self.record.entity_id()
    }

    /// True when this modification sets `deleted_at` for the first time.
    pub fn is_soft_delete(&self) -> bool {
        self.state == EntryState::Modified
            && self.original_deleted_at.is_none()
            && self.record.audit_fields().deleted_at.is_some()
    }
}

/// Error raised when the same record is tracked twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlreadyTracked {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl Display for AlreadyTracked {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} is already tracked in this unit of work",
            self.kind.as_str(),
            self.id
        )
    }
}

impl Error for AlreadyTracked {}

/// Set of record changes committed atomically by `DataContext::commit`.
#[derive(Debug)]
pub struct UnitOfWork {
    now: i64,
    changes: Vec<TrackedChange>,
}

impl UnitOfWork {
    pub(crate) fn new(now: i64) -> Self {
        Self {
            now,
            changes: Vec::new(),
        }
    }

    /// Commit instant shared by every stamp and ledger row of this unit.
    pub fn now(&self) -> i64 {
        self.now
    }

    pub fn changes(&self) -> &[TrackedChange] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Tracks a new record for insertion.
    pub fn add<E: Entity>(&mut self, entity: E) -> Result<(), AlreadyTracked> {
        self.track(EntryState::Added, Box::new(entity), None)
    }

    /// Tracks a modification of a record previously loaded as `original`.
    ///
    /// `original` only seeds the soft-delete comparison; the stored row wins
    /// at commit time.
    pub fn modify<E: Entity>(&mut self, original: &E, current: E) -> Result<(), AlreadyTracked> {
        let original_deleted_at = original.audit().deleted_at;
        self.track(EntryState::Modified, Box::new(current), original_deleted_at)
    }

    /// Tracks a storage-level removal. Application code soft-deletes instead;
    /// this exists for maintenance paths.
    pub fn remove<E: Entity>(&mut self, entity: E) -> Result<(), AlreadyTracked> {
        let original_deleted_at = entity.audit().deleted_at;
        self.track(EntryState::Removed, Box::new(entity), original_deleted_at)
    }

    /// Attaches a record without changing it.
    pub fn attach<E: Entity>(&mut self, entity: E) -> Result<(), AlreadyTracked> {
        let original_deleted_at = entity.audit().deleted_at;
        self.track(EntryState::Unchanged, Box::new(entity), original_deleted_at)
    }

    pub(crate) fn changes_mut(&mut self) -> &mut Vec<TrackedChange> {
        &mut self.changes
    }

    fn track(
        &mut self,
        state: EntryState,
        record: Box<dyn Record>,
        original_deleted_at: Option<i64>,
    ) -> Result<(), AlreadyTracked> {
        let kind = record.kind();
        let id = record.entity_id();
        // A nil id is assigned later and cannot collide yet.
        let duplicate = !id.is_nil()
            && self
                .changes
                .iter()
                .any(|change| change.kind() == kind && change.entity_id() == id);
        if duplicate {
            return Err(AlreadyTracked { kind, id });
        }

        self.changes.push(TrackedChange {
            state,
            record,
            original_deleted_at,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{EntryState, UnitOfWork};
    use crate::model::planner::Task;
    use uuid::Uuid;

    #[test]
    fn tracking_the_same_record_twice_is_rejected() {
        let mut uow = UnitOfWork::new(10);
        let task = Task::new(Uuid::new_v4(), Uuid::new_v4(), "a");
        uow.add(task.clone()).unwrap();
        let err = uow.attach(task).unwrap_err();
        assert_eq!(err.id, uow.changes()[0].entity_id());
    }

    #[test]
    fn soft_delete_is_detected_only_on_first_tombstone() {
        let mut uow = UnitOfWork::new(10);
        let original = Task::new(Uuid::new_v4(), Uuid::new_v4(), "a");
        let mut current = original.clone();
        current.audit.deleted_at = Some(10);
        uow.modify(&original, current).unwrap();
        assert!(uow.changes()[0].is_soft_delete());

        let mut uow = UnitOfWork::new(20);
        let mut already_deleted = Task::new(Uuid::new_v4(), Uuid::new_v4(), "b");
        already_deleted.audit.deleted_at = Some(5);
        uow.modify(&already_deleted, already_deleted.clone()).unwrap();
        assert!(!uow.changes()[0].is_soft_delete());
        assert_eq!(uow.changes()[0].state, EntryState::Modified);
    }
}
