//! In-memory series store with the editing operations of the series tooling.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use kairos_core::error::CoreError;
use kairos_core::types::ObjectId;
use kairos_rfc::RecurrenceRule;

use super::SeriesStore;
use crate::error::{ServiceError, ServiceResult};
use crate::model::{
    BulkModificationLink, Exception, ExceptionMap, RecurringEntity, normalize_occurrence_date,
};
use crate::recurrence::split_rule_at;

/// "This and following" edit of a series.
#[derive(Debug, Clone)]
pub struct BulkModification<E> {
    /// Occurrence the edit starts at. Must be a raw candidate of the root.
    pub split_date: DateTime<Utc>,
    /// New object carrying the series forward, or `None` to cancel every
    /// occurrence from `split_date` onward.
    pub continuation: Option<E>,
    /// RRULE text for the continuation, overriding the entity's own rule.
    pub continuation_rule: Option<String>,
}

impl<E> BulkModification<E> {
    #[must_use]
    pub fn cancel_from(split_date: DateTime<Utc>) -> Self {
        Self {
            split_date,
            continuation: None,
            continuation_rule: None,
        }
    }

    #[must_use]
    pub fn continue_with(split_date: DateTime<Utc>, continuation: E) -> Self {
        Self {
            split_date,
            continuation: Some(continuation),
            continuation_rule: None,
        }
    }

    #[must_use]
    pub fn with_rule_text(mut self, rule: impl Into<String>) -> Self {
        self.continuation_rule = Some(rule.into());
        self
    }
}

/// ## Summary
/// Series storage held in process memory.
#[derive(Debug, Clone)]
pub struct MemoryStore<E> {
    entities: HashMap<ObjectId, E>,
    exceptions: HashMap<ObjectId, ExceptionMap>,
    links: HashMap<ObjectId, BulkModificationLink>,
}

impl<E> Default for MemoryStore<E> {
    fn default() -> Self {
        Self {
            entities: HashMap::new(),
            exceptions: HashMap::new(),
            links: HashMap::new(),
        }
    }
}

impl<E: RecurringEntity> MemoryStore<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an entity, returning its id.
    pub fn insert(&mut self, entity: E) -> ObjectId {
        let id = entity.id();
        self.entities.insert(id, entity);
        id
    }

    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&E> {
        self.entities.get(&id)
    }

    /// Records a link as-is, without the checks of [`Self::apply_bulk_modification`].
    pub fn insert_link(&mut self, link: BulkModificationLink) {
        self.links.insert(link.root_id, link);
    }

    /// ## Summary
    /// Creates or replaces the exception for `(parent_id, occurrence_date)`.
    ///
    /// Returns the exception it replaced, if any.
    ///
    /// ## Errors
    /// Returns `ServiceError::NotFound` if the parent does not exist and
    /// `ServiceError::NotRecurring` if it has no rule.
    pub fn upsert_exception(&mut self, exception: Exception) -> ServiceResult<Option<Exception>> {
        let parent = self.entities.get(&exception.parent_id).ok_or_else(|| {
            ServiceError::NotFound(format!("Object {}", exception.parent_id))
        })?;
        if !parent.is_recurring() {
            return Err(ServiceError::NotRecurring(exception.parent_id));
        }

        let key = normalize_occurrence_date(exception.occurrence_date);
        let previous = self
            .exceptions
            .entry(exception.parent_id)
            .or_default()
            .insert(key, exception);
        tracing::trace!(
            parent_id = %exception.parent_id,
            occurrence_date = %key,
            replaced = previous.is_some(),
            "Upserted exception"
        );
        Ok(previous)
    }

    pub fn remove_exception(
        &mut self,
        parent_id: ObjectId,
        occurrence_date: DateTime<Utc>,
    ) -> Option<Exception> {
        self.exceptions
            .get_mut(&parent_id)?
            .remove(&normalize_occurrence_date(occurrence_date))
    }

    /// Ids of `root_id` and every continuation reachable from it, in chain order.
    #[must_use]
    pub fn chain_ids(&self, root_id: ObjectId) -> Vec<ObjectId> {
        let mut ids = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(root_id);
        while let Some(id) = current {
            if !self.entities.contains_key(&id) || !seen.insert(id) {
                break;
            }
            ids.push(id);
            current = self.links.get(&id).and_then(|link| link.continuation_id);
        }
        ids
    }

    /// Removes a whole chain with its exceptions and links. Returns the number
    /// of objects removed.
    pub fn delete_chain(&mut self, root_id: ObjectId) -> usize {
        let ids = self.chain_ids(root_id);
        for id in &ids {
            self.entities.remove(id);
            self.exceptions.remove(id);
            self.links.remove(id);
        }
        tracing::debug!(root_id = %root_id, removed = ids.len(), "Deleted series chain");
        ids.len()
    }

    /// ## Summary
    /// Splits the series `root_id` at `modification.split_date`.
    ///
    /// The root's rule is truncated to end before the split and a link to the
    /// continuation is recorded. A continuation without a rule of its own
    /// inherits the split-generated continuation rule.
    ///
    /// ## Errors
    /// - `ServiceError::NotFound` if the root does not exist.
    /// - `ServiceError::NotRecurring` if the root has no rule.
    /// - `ServiceError::InvalidSplitDate` if the split date is not an occurrence.
    /// - `ServiceError::Conflict` if the root already has a live continuation
    ///   or the continuation id is taken.
    /// - `ServiceError::RfcError` if the continuation rule text is malformed.
    /// - `CoreError::InvariantViolation` if the continuation is already part of
    ///   the chain.
    pub fn apply_bulk_modification(
        &mut self,
        root_id: ObjectId,
        modification: BulkModification<E>,
    ) -> ServiceResult<BulkModificationLink> {
        let root = self
            .entities
            .get(&root_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Object {root_id}")))?;
        let rule = root
            .recurrence_rule()
            .cloned()
            .ok_or(ServiceError::NotRecurring(root_id))?;

        if let Some(existing) = self.links.get(&root_id)
            && let Some(continuation_id) = existing.continuation_id
            && self.entities.contains_key(&continuation_id)
        {
            return Err(ServiceError::Conflict(format!(
                "Object {root_id} already continues as {continuation_id}"
            )));
        }

        let split_date = modification.split_date;
        let split = split_rule_at(&rule, root.start_time(), split_date)?;

        let continuation = match modification.continuation {
            Some(mut entity) => {
                let id = entity.id();
                if self.chain_ids(root_id).contains(&id) {
                    return Err(CoreError::InvariantViolation(
                        "bulk modification continuation would close a cycle",
                    )
                    .into());
                }
                if self.entities.contains_key(&id) {
                    return Err(ServiceError::Conflict(format!("Object {id} already exists")));
                }

                let continuation_rule = match modification.continuation_rule {
                    Some(text) => Some(text.parse::<RecurrenceRule>()?),
                    None => entity
                        .recurrence_rule()
                        .cloned()
                        .or_else(|| split.continuation.clone()),
                };
                entity.set_recurrence_rule(continuation_rule);
                if entity.start_time() < split_date {
                    tracing::warn!(
                        continuation_id = %id,
                        split_date = %split_date,
                        "Continuation starts before the split date"
                    );
                }
                Some(entity)
            }
            None => None,
        };

        // A split at the first occurrence keeps the root's rule; the link's
        // boundary leaves the root segment empty.
        if let Some(truncated) = split.truncated
            && let Some(root) = self.entities.get_mut(&root_id)
        {
            root.set_recurrence_rule(Some(truncated));
        }

        let link = BulkModificationLink {
            root_id,
            continuation_id: continuation.as_ref().map(RecurringEntity::id),
            split_date,
        };
        if let Some(entity) = continuation {
            self.insert(entity);
        }
        self.links.insert(root_id, link);

        tracing::debug!(
            root_id = %root_id,
            split_date = %split_date,
            continuation_id = ?link.continuation_id,
            "Applied bulk modification"
        );
        Ok(link)
    }
}

impl<E: RecurringEntity> SeriesStore for MemoryStore<E> {
    type Entity = E;

    fn entity(&self, id: ObjectId) -> Option<E> {
        self.entities.get(&id).cloned()
    }

    fn exceptions(&self, parent_id: ObjectId) -> Vec<Exception> {
        self.exceptions
            .get(&parent_id)
            .map_or_else(Vec::new, |map| map.values().copied().collect())
    }

    fn bulk_link(&self, root_id: ObjectId) -> Option<BulkModificationLink> {
        self.links.get(&root_id).copied()
    }
}
