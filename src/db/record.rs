//! Mapping between entities and rows.

use std::str::FromStr;

use rusqlite::types::Value as SqlValue;
use rusqlite::Row;

use super::{StoreError, StoreResult};
use crate::models::{
    ArchivalReason, Entity, EntityCore, EntityId, EntityKind, InputValidationError, ParentLink,
    Timestamp,
};

/// Lifecycle columns every entity table has, after `ref_id`.
pub(crate) const CORE_COLUMNS: &[&str] = &[
    "created_time",
    "last_modified_time",
    "archived",
    "archived_time",
    "archival_reason",
];

/// An entity that can be stored as a row of `Self::KIND.table()`.
pub trait SqliteRecord: Entity + Sized {
    /// Entity-specific columns, in the order [`SqliteRecord::column_values`] yields them.
    const COLUMNS: &'static [&'static str];

    /// Column matched by `key_in` filters, when the entity has a key.
    const KEY_COLUMN: Option<&'static str> = None;

    fn column_values(&self) -> Vec<SqlValue>;

    fn from_row(row: &RowReader<'_, '_>) -> StoreResult<Self>;

    /// The error reported when a save trips a unique index.
    fn conflict(&self) -> StoreError {
        StoreError::EntityAlreadyExists {
            kind: Self::KIND,
            detail: format!("{} {} clashes with a unique index", Self::KIND, self.ref_id()),
        }
    }
}

/// Typed column access for [`SqliteRecord::from_row`].
pub struct RowReader<'r, 's> {
    kind: EntityKind,
    row: &'r Row<'s>,
}

impl<'r, 's> RowReader<'r, 's> {
    pub(crate) fn new(kind: EntityKind, row: &'r Row<'s>) -> Self {
        Self { kind, row }
    }

    fn corrupt(&self, column: &str, message: impl ToString) -> StoreError {
        StoreError::Corrupt {
            kind: self.kind,
            column: column.to_string(),
            message: message.to_string(),
        }
    }

    fn raw<T: rusqlite::types::FromSql>(&self, column: &str) -> StoreResult<T> {
        self.row
            .get::<_, T>(column)
            .map_err(|e| self.corrupt(column, e))
    }

    pub fn string(&self, column: &str) -> StoreResult<String> {
        self.raw(column)
    }

    pub fn opt_string(&self, column: &str) -> StoreResult<Option<String>> {
        self.raw(column)
    }

    pub fn flag(&self, column: &str) -> StoreResult<bool> {
        Ok(self.raw::<i64>(column)? != 0)
    }

    pub fn u32(&self, column: &str) -> StoreResult<u32> {
        let value: i64 = self.raw(column)?;
        u32::try_from(value).map_err(|e| self.corrupt(column, e))
    }

    pub fn opt_u32(&self, column: &str) -> StoreResult<Option<u32>> {
        self.raw::<Option<i64>>(column)?
            .map(|value| u32::try_from(value).map_err(|e| self.corrupt(column, e)))
            .transpose()
    }

    pub fn entity_id(&self, column: &str) -> StoreResult<EntityId> {
        Ok(EntityId::from_i64(self.raw(column)?))
    }

    pub fn opt_entity_id(&self, column: &str) -> StoreResult<Option<EntityId>> {
        Ok(self.raw::<Option<i64>>(column)?.map(EntityId::from_i64))
    }

    /// Parses a text column through the value's own validation.
    pub fn value<V>(&self, column: &str) -> StoreResult<V>
    where
        V: FromStr<Err = InputValidationError>,
    {
        self.parse_with(column, V::from_str)
    }

    pub fn opt_value<V>(&self, column: &str) -> StoreResult<Option<V>>
    where
        V: FromStr<Err = InputValidationError>,
    {
        self.opt_string(column)?
            .map(|raw| V::from_str(&raw).map_err(|e| self.corrupt(column, e)))
            .transpose()
    }

    /// Parses a text column with a custom loader, e.g. one that accepts legacy spellings.
    pub fn parse_with<V>(
        &self,
        column: &str,
        parse: impl FnOnce(&str) -> Result<V, InputValidationError>,
    ) -> StoreResult<V> {
        let raw = self.string(column)?;
        parse(&raw).map_err(|e| self.corrupt(column, e))
    }

    /// Deserializes a JSON text column.
    pub fn json<V: serde::de::DeserializeOwned>(&self, column: &str) -> StoreResult<V> {
        let raw = self.string(column)?;
        serde_json::from_str(&raw).map_err(|e| self.corrupt(column, e))
    }

    /// The parent link, read from `<parent_table>_ref_id`.
    pub fn parent(&self) -> StoreResult<ParentLink> {
        let parent_kind = self
            .kind
            .parent_kind()
            .ok_or_else(|| self.corrupt("ref_id", "root entities have no parent"))?;
        let ref_id = self.entity_id(&parent_kind.ref_column())?;
        Ok(ParentLink::new(parent_kind, ref_id))
    }

    pub fn core(&self) -> StoreResult<EntityCore> {
        let core = EntityCore::restore(
            self.entity_id("ref_id")?,
            self.value::<Timestamp>("created_time")?,
            self.value::<Timestamp>("last_modified_time")?,
            self.flag("archived")?,
            self.opt_value::<Timestamp>("archived_time")?,
            self.opt_value::<ArchivalReason>("archival_reason")?,
        )
        .map_err(|e| self.corrupt("archived", e))?;
        Ok(core)
    }
}

pub(crate) fn text(value: impl ToString) -> SqlValue {
    SqlValue::Text(value.to_string())
}

pub(crate) fn opt_text<V: ToString>(value: Option<V>) -> SqlValue {
    value.map_or(SqlValue::Null, |v| SqlValue::Text(v.to_string()))
}

pub(crate) fn int(value: impl Into<i64>) -> SqlValue {
    SqlValue::Integer(value.into())
}

pub(crate) fn opt_int<V: Into<i64>>(value: Option<V>) -> SqlValue {
    value.map_or(SqlValue::Null, |v| SqlValue::Integer(v.into()))
}

pub(crate) fn id(value: EntityId) -> SqlValue {
    SqlValue::Integer(value.as_i64())
}

pub(crate) fn opt_id(value: Option<EntityId>) -> SqlValue {
    value.map_or(SqlValue::Null, |v| SqlValue::Integer(v.as_i64()))
}

pub(crate) fn flag(value: bool) -> SqlValue {
    SqlValue::Integer(i64::from(value))
}

pub(crate) fn json_text<V: serde::Serialize>(value: &V) -> SqlValue {
    SqlValue::Text(serde_json::to_string(value).unwrap_or_else(|_| "null".to_string()))
}

/// Values for [`CORE_COLUMNS`].
pub(crate) fn core_values(core: &EntityCore) -> Vec<SqlValue> {
    vec![
        text(core.created_time()),
        text(core.last_modified_time()),
        flag(core.archived()),
        opt_text(core.archived_time()),
        opt_text(core.archival_reason()),
    ]
}

/// Whether `err` is a UNIQUE (or PRIMARY KEY) constraint violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}
