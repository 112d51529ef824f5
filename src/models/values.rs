use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// The single error kind produced by value parsing.
///
/// Carries a human-readable message describing what was wrong with the raw input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InputValidationError(pub String);

impl InputValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Implements `Display`, `FromStr` and string-backed serde for a value type
/// that already has `from_raw` and `as_raw`.
macro_rules! string_backed_value {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.as_raw())
            }
        }

        impl FromStr for $ty {
            type Err = InputValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_raw(s)
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.as_raw())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Self::from_raw(&raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

// ============================================================
// Identity
// ============================================================

/// Opaque, monotonically assigned entity identity.
///
/// The store hands out ids on first save. Before that an entity carries
/// [`EntityId::NEW`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(i64);

impl EntityId {
    pub const NEW: EntityId = EntityId(0);

    pub fn from_i64(value: i64) -> Self {
        Self(value)
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }

    pub fn is_new(self) -> bool {
        self == Self::NEW
    }

    pub fn from_raw(raw: &str) -> Result<Self, InputValidationError> {
        let value: i64 = raw
            .trim()
            .parse()
            .map_err(|_| InputValidationError::new(format!("invalid entity id `{raw}`")))?;
        if value <= 0 {
            return Err(InputValidationError::new(format!(
                "entity id must be positive, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn as_raw(&self) -> String {
        self.0.to_string()
    }
}

string_backed_value!(EntityId);

// ============================================================
// Names and keys
// ============================================================

const NAME_MAX_LEN: usize = 100;
const KEY_MAX_LEN: usize = 32;

/// A bounded, printable, trimmed name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityName(String);

impl EntityName {
    pub fn from_raw(raw: &str) -> Result<Self, InputValidationError> {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            return Err(InputValidationError::new("expected a non-empty name"));
        }
        if collapsed.chars().count() > NAME_MAX_LEN {
            return Err(InputValidationError::new(format!(
                "name is longer than {NAME_MAX_LEN} characters"
            )));
        }
        if collapsed.chars().any(char::is_control) {
            return Err(InputValidationError::new("name contains control characters"));
        }
        Ok(Self(collapsed))
    }

    /// For names composed from other validated values.
    pub(crate) fn from_generated(raw: String) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> String {
        self.0.clone()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

string_backed_value!(EntityName);

/// Slug-like human readable identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey(String);

impl EntityKey {
    pub fn from_raw(raw: &str) -> Result<Self, InputValidationError> {
        let key = raw.trim().to_lowercase();
        if key.is_empty() || key.len() > KEY_MAX_LEN {
            return Err(InputValidationError::new(format!(
                "key must be between 1 and {KEY_MAX_LEN} characters"
            )));
        }
        if !key.starts_with(|c: char| c.is_ascii_lowercase()) {
            return Err(InputValidationError::new(format!(
                "key `{key}` must start with a letter"
            )));
        }
        if !key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(InputValidationError::new(format!(
                "key `{key}` may only contain letters, digits and dashes"
            )));
        }
        Ok(Self(key))
    }

    pub fn as_raw(&self) -> String {
        self.0.clone()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

string_backed_value!(EntityKey);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn from_raw(raw: &str) -> Result<Self, InputValidationError> {
        let email = raw.trim().to_lowercase();
        let mut parts = email.split('@');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(local), Some(domain), None)
                if !local.is_empty()
                    && domain.contains('.')
                    && domain.split('.').all(|label| !label.is_empty()) =>
            {
                Ok(Self(email))
            }
            _ => Err(InputValidationError::new(format!(
                "invalid email address `{}`",
                raw.trim()
            ))),
        }
    }

    pub fn as_raw(&self) -> String {
        self.0.clone()
    }
}

string_backed_value!(EmailAddress);

/// Key identifying one instance of a recurring period, e.g. `2024-W10`.
///
/// Only the shape is validated here; [`super::RecurringTaskPeriod::timeline`]
/// is the canonical producer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timeline(String);

impl Timeline {
    pub fn from_raw(raw: &str) -> Result<Self, InputValidationError> {
        let timeline = raw.trim();
        if timeline.is_empty()
            || !timeline
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(InputValidationError::new(format!(
                "invalid timeline `{timeline}`"
            )));
        }
        Ok(Self(timeline.to_uppercase()))
    }

    /// For keys built by period arithmetic, which are well formed by construction.
    pub(crate) fn from_generated(raw: String) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> String {
        self.0.clone()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

string_backed_value!(Timeline);

// ============================================================
// Time
// ============================================================

/// An instant in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Truncates to microseconds so the canonical text form round-trips.
    pub fn from_datetime(value: DateTime<Utc>) -> Self {
        let micros = value.timestamp_micros();
        Self(DateTime::from_timestamp_micros(micros).unwrap_or(value))
    }

    pub fn date(&self) -> ADate {
        ADate(self.0.date_naive())
    }

    pub fn plus(&self, duration: Duration) -> Self {
        Self::from_datetime(self.0 + duration)
    }

    pub fn from_raw(raw: &str) -> Result<Self, InputValidationError> {
        DateTime::parse_from_rfc3339(raw.trim())
            .map(|dt| Self::from_datetime(dt.with_timezone(&Utc)))
            .map_err(|e| InputValidationError::new(format!("invalid timestamp `{raw}`: {e}")))
    }

    /// Fixed-width text, so lexicographic order equals chronological order.
    pub fn as_raw(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

string_backed_value!(Timestamp);

/// A calendar date without a time component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ADate(NaiveDate);

impl ADate {
    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Fails only past the representable calendar range.
    pub fn add_days(&self, days: i64) -> Result<Self, InputValidationError> {
        Duration::try_days(days)
            .and_then(|delta| self.0.checked_add_signed(delta))
            .map(Self)
            .ok_or_else(|| InputValidationError::new(format!("{self} plus {days} days is out of range")))
    }

    /// Number of days from `self` to `other`, both ends inclusive.
    pub fn days_until_inclusive(&self, other: ADate) -> i64 {
        (other.0 - self.0).num_days() + 1
    }

    pub fn from_raw(raw: &str) -> Result<Self, InputValidationError> {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|_| InputValidationError::new(format!("invalid date `{raw}`, expected YYYY-MM-DD")))
    }

    pub fn as_raw(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }
}

string_backed_value!(ADate);

/// Optional actionable and due dates attached to actionable entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SuggestedDate {
    pub actionable_date: Option<ADate>,
    pub due_date: Option<ADate>,
}

impl SuggestedDate {
    pub fn new(
        actionable_date: Option<ADate>,
        due_date: Option<ADate>,
    ) -> Result<Self, InputValidationError> {
        if let (Some(actionable), Some(due)) = (actionable_date, due_date) {
            if due < actionable {
                return Err(InputValidationError::new(format!(
                    "due date {due} is before actionable date {actionable}"
                )));
            }
        }
        Ok(Self {
            actionable_date,
            due_date,
        })
    }

    /// Raw form is `actionable..due`, either side may be empty.
    pub fn from_raw(raw: &str) -> Result<Self, InputValidationError> {
        let (actionable, due) = raw.trim().split_once("..").ok_or_else(|| {
            InputValidationError::new(format!("invalid suggested date `{raw}`, expected `from..to`"))
        })?;
        let parse = |part: &str| -> Result<Option<ADate>, InputValidationError> {
            if part.trim().is_empty() {
                Ok(None)
            } else {
                ADate::from_raw(part).map(Some)
            }
        };
        Self::new(parse(actionable)?, parse(due)?)
    }

    pub fn to_raw(&self) -> String {
        format!(
            "{}..{}",
            self.actionable_date.map(|d| d.as_raw()).unwrap_or_default(),
            self.due_date.map(|d| d.as_raw()).unwrap_or_default()
        )
    }
}
