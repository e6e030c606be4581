//! Recurring entity kinds.

use chrono::{DateTime, TimeDelta, Utc};
use kairos_core::types::ObjectId;
use kairos_rfc::RecurrenceRule;
use serde::{Deserialize, Serialize};

/// ## Summary
/// Capability shared by every object the engine can expand.
///
/// The engine is written once against this trait; the concrete kinds only
/// expose their timing and rule.
pub trait RecurringEntity: Clone {
    fn id(&self) -> ObjectId;

    fn start_time(&self) -> DateTime<Utc>;

    fn end_time(&self) -> DateTime<Utc>;

    fn recurrence_rule(&self) -> Option<&RecurrenceRule>;

    /// Replaces the rule. Used when a bulk split truncates a segment.
    fn set_recurrence_rule(&mut self, rule: Option<RecurrenceRule>);

    /// Length of every unmodified occurrence.
    fn duration(&self) -> TimeDelta {
        self.end_time() - self.start_time()
    }

    fn is_recurring(&self) -> bool {
        self.recurrence_rule().is_some()
    }
}

macro_rules! impl_recurring_entity {
    ($($kind:ty),+ $(,)?) => {
        $(
            impl RecurringEntity for $kind {
                fn id(&self) -> ObjectId {
                    self.id
                }

                fn start_time(&self) -> DateTime<Utc> {
                    self.start_time
                }

                fn end_time(&self) -> DateTime<Utc> {
                    self.end_time
                }

                fn recurrence_rule(&self) -> Option<&RecurrenceRule> {
                    self.recurrence_rule.as_ref()
                }

                fn set_recurrence_rule(&mut self, rule: Option<RecurrenceRule>) {
                    self.recurrence_rule = rule;
                }
            }
        )+
    };
}

impl_recurring_entity!(CalendarEvent, BlockedTime, AvailableTime);

/// A calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: ObjectId,
    /// Tenant scope. Opaque to the engine.
    pub organization_id: ObjectId,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub recurrence_rule: Option<RecurrenceRule>,
}

impl CalendarEvent {
    #[must_use]
    pub fn new(
        organization_id: ObjectId,
        title: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ObjectId::now_v7(),
            organization_id,
            title: title.into(),
            description: None,
            start_time,
            end_time,
            recurrence_rule: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: ObjectId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_recurrence_rule(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence_rule = Some(rule);
        self
    }
}

/// A span during which a provider is unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedTime {
    pub id: ObjectId,
    pub organization_id: ObjectId,
    pub reason: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub recurrence_rule: Option<RecurrenceRule>,
}

impl BlockedTime {
    #[must_use]
    pub fn new(organization_id: ObjectId, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            id: ObjectId::now_v7(),
            organization_id,
            reason: None,
            start_time,
            end_time,
            recurrence_rule: None,
        }
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn with_recurrence_rule(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence_rule = Some(rule);
        self
    }
}

/// A span during which a provider accepts bookings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableTime {
    pub id: ObjectId,
    pub organization_id: ObjectId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub recurrence_rule: Option<RecurrenceRule>,
}

impl AvailableTime {
    #[must_use]
    pub fn new(organization_id: ObjectId, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            id: ObjectId::now_v7(),
            organization_id,
            start_time,
            end_time,
            recurrence_rule: None,
        }
    }

    #[must_use]
    pub fn with_recurrence_rule(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence_rule = Some(rule);
        self
    }
}
