//! Event types, per-type status sets, and the rules for creating events and
//! applying status updates.
//!
//! Legal statuses are fixed per event type:
//!
//! | Type          | Statuses                                               |
//! |---------------|--------------------------------------------------------|
//! | `incident`    | `investigating`, `identified`, `monitoring`, `resolved` |
//! | `maintenance` | `scheduled`, `in_progress`, `completed`                |
//!
//! Any legal status may follow any other; there is no sequencing beyond
//! membership in the set, and a resolved event may be moved back to an
//! earlier status. `resolved_at` is stamped the first time an event enters
//! `resolved`/`completed` and is never cleared or overwritten afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::templates::TemplateError;
use crate::types::{ParseEnumError, Timestamp};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event not found")]
    EventNotFound,

    #[error("template not found")]
    TemplateNotFound,

    #[error("invalid status for event type")]
    InvalidStatus,

    #[error("severity is required for incidents and must be one of minor, major, critical")]
    InvalidSeverity,

    #[error("event type must be one of incident, maintenance")]
    InvalidEventType,

    #[error("invalid template: {0}")]
    InvalidTemplate(#[from] TemplateError),

    #[error("template slug already exists: {0}")]
    TemplateSlugExists(String),

    #[error("internal error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// EventType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Incident,
    Maintenance,
}

impl EventType {
    pub const ALL: [EventType; 2] = [EventType::Incident, EventType::Maintenance];

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Incident => "incident",
            EventType::Maintenance => "maintenance",
        }
    }

    /// The closed set of statuses an event of this type may hold.
    pub fn legal_statuses(self) -> &'static [EventStatus] {
        match self {
            EventType::Incident => &[
                EventStatus::Investigating,
                EventStatus::Identified,
                EventStatus::Monitoring,
                EventStatus::Resolved,
            ],
            EventType::Maintenance => &[
                EventStatus::Scheduled,
                EventStatus::InProgress,
                EventStatus::Completed,
            ],
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incident" => Ok(EventType::Incident),
            "maintenance" => Ok(EventType::Maintenance),
            other => Err(ParseEnumError::new("event type", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// EventStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Investigating,
    Identified,
    Monitoring,
    Resolved,
    Scheduled,
    InProgress,
    Completed,
}

impl EventStatus {
    pub const ALL: [EventStatus; 7] = [
        EventStatus::Investigating,
        EventStatus::Identified,
        EventStatus::Monitoring,
        EventStatus::Resolved,
        EventStatus::Scheduled,
        EventStatus::InProgress,
        EventStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Investigating => "investigating",
            EventStatus::Identified => "identified",
            EventStatus::Monitoring => "monitoring",
            EventStatus::Resolved => "resolved",
            EventStatus::Scheduled => "scheduled",
            EventStatus::InProgress => "in_progress",
            EventStatus::Completed => "completed",
        }
    }

    pub fn is_valid_for(self, event_type: EventType) -> bool {
        event_type.legal_statuses().contains(&self)
    }

    /// `resolved` for incidents, `completed` for maintenance.
    pub fn is_resolved(self) -> bool {
        matches!(self, EventStatus::Resolved | EventStatus::Completed)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("event status", s))
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Major,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Minor, Severity::Major, Severity::Critical];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Major => "major",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minor" => Ok(Severity::Minor),
            "major" => Ok(Severity::Major),
            "critical" => Ok(Severity::Critical),
            other => Err(ParseEnumError::new("severity", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Creation and update rules
// ---------------------------------------------------------------------------

/// Type, status and severity of a new event after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedEvent {
    pub event_type: EventType,
    pub status: EventStatus,
    /// Always `Some` for incidents, always `None` for maintenance.
    pub severity: Option<Severity>,
}

/// Validate the raw type/status/severity of an event about to be created.
///
/// Checks run in a fixed order so the reported error is deterministic:
/// unknown type, status outside the type's set, missing incident severity,
/// unknown incident severity. A severity sent with a maintenance event is
/// dropped.
pub fn validate_new_event(
    event_type: &str,
    status: &str,
    severity: Option<&str>,
) -> Result<ValidatedEvent, EventError> {
    let event_type: EventType = event_type
        .parse()
        .map_err(|_| EventError::InvalidEventType)?;

    let status = parse_status_for(event_type, status)?;

    let severity = match event_type {
        EventType::Incident => {
            let raw = severity.ok_or(EventError::InvalidSeverity)?;
            Some(raw.parse().map_err(|_| EventError::InvalidSeverity)?)
        }
        EventType::Maintenance => None,
    };

    Ok(ValidatedEvent {
        event_type,
        status,
        severity,
    })
}

/// A validated status change for an existing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub status: EventStatus,
    /// Whether the new status is a resolved/completed state. The store stamps
    /// `resolved_at` when this is set and the event has none yet.
    pub resolves: bool,
}

/// Validate a new status against the event's fixed type.
pub fn plan_status_update(event_type: EventType, status: &str) -> Result<StatusChange, EventError> {
    let status = parse_status_for(event_type, status)?;
    Ok(StatusChange {
        status,
        resolves: status.is_resolved(),
    })
}

/// The `resolved_at` value after applying `change` at `now`.
///
/// Mirrors `COALESCE(resolved_at, now)`: an existing stamp always wins, and
/// moving to a non-resolved status leaves the stamp untouched.
pub fn next_resolved_at(
    current: Option<Timestamp>,
    change: &StatusChange,
    now: Timestamp,
) -> Option<Timestamp> {
    match current {
        Some(stamp) => Some(stamp),
        None if change.resolves => Some(now),
        None => None,
    }
}

fn parse_status_for(event_type: EventType, raw: &str) -> Result<EventStatus, EventError> {
    let status: EventStatus = raw.parse().map_err(|_| EventError::InvalidStatus)?;
    if !status.is_valid_for(event_type) {
        return Err(EventError::InvalidStatus);
    }
    Ok(status)
}
