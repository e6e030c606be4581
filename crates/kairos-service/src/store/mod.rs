//! Collaborator interfaces the engine reads series data through.

mod memory;

pub use memory::{BulkModification, MemoryStore};

use kairos_core::types::ObjectId;

use crate::model::{BulkModificationLink, Exception, RecurringEntity};

/// ## Summary
/// Read access to recurring objects, their exceptions, and their bulk links.
///
/// Implementations are expected to be tenant-scoped already: an id that is
/// not visible to the caller is simply absent.
pub trait SeriesStore {
    type Entity: RecurringEntity;

    fn entity(&self, id: ObjectId) -> Option<Self::Entity>;

    /// Every exception recorded against `parent_id`.
    fn exceptions(&self, parent_id: ObjectId) -> Vec<Exception>;

    /// The live link splitting `root_id`, if any.
    fn bulk_link(&self, root_id: ObjectId) -> Option<BulkModificationLink>;
}
