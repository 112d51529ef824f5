//! Repository contracts per entity shape, and their SQLite implementation.

use std::marker::PhantomData;

use rusqlite::types::Value as SqlValue;
use rusqlite::OptionalExtension;

use super::record::*;
use super::{StoreError, StoreResult};
use crate::models::*;

/// Narrows a `find_all_with_filters` query.
#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
    pub include_archived: bool,
    pub key_in: Option<Vec<EntityKey>>,
    pub ref_id_in: Option<Vec<EntityId>>,
}

impl EntityFilter {
    pub fn live() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            include_archived: true,
            ..Self::default()
        }
    }

    pub fn with_keys(mut self, keys: Vec<EntityKey>) -> Self {
        self.key_in = Some(keys);
        self
    }

    pub fn with_ref_ids(mut self, ref_ids: Vec<EntityId>) -> Self {
        self.ref_id_in = Some(ref_ids);
        self
    }
}

pub trait RootEntityRepository<T: RootEntity> {
    fn create(&self, entity: T) -> StoreResult<T>;
    fn load_by_id(&self, ref_id: EntityId, allow_archived: bool) -> StoreResult<T>;
    fn save(&self, entity: T) -> StoreResult<T>;
    fn find_all(&self, include_archived: bool) -> StoreResult<Vec<T>>;
}

/// Singleton-per-tenant entities, loaded through their owner.
pub trait StubEntityRepository<T: StubEntity> {
    fn create(&self, entity: T) -> StoreResult<T>;
    fn load_by_owner(&self, owner_ref_id: EntityId) -> StoreResult<T>;
    fn save(&self, entity: T) -> StoreResult<T>;
}

pub trait TrunkEntityRepository<T: TrunkEntity> {
    fn create(&self, entity: T) -> StoreResult<T>;
    /// The single live trunk of the given root.
    fn load_by_parent(&self, parent_ref_id: EntityId) -> StoreResult<T>;
    fn save(&self, entity: T) -> StoreResult<T>;
}

pub trait BranchEntityRepository<T: BranchEntity> {
    fn create(&self, entity: T) -> StoreResult<T>;
    fn load_by_id(&self, ref_id: EntityId, allow_archived: bool) -> StoreResult<T>;
    fn save(&self, entity: T) -> StoreResult<T>;
    fn find_all_with_filters(
        &self,
        parent_ref_id: EntityId,
        filter: &EntityFilter,
    ) -> StoreResult<Vec<T>>;
}

pub trait LeafEntityRepository<T: LeafEntity> {
    fn create(&self, entity: T) -> StoreResult<T>;
    fn load_by_id(&self, ref_id: EntityId, allow_archived: bool) -> StoreResult<T>;
    fn save(&self, entity: T) -> StoreResult<T>;
    fn find_all_with_filters(
        &self,
        parent_ref_id: EntityId,
        filter: &EntityFilter,
    ) -> StoreResult<Vec<T>>;
    /// Physical delete. Reserved for administration and tests.
    fn remove(&self, ref_id: EntityId) -> StoreResult<T>;
}

/// A view of one entity table over a borrowed connection.
pub struct SqliteEntityRepository<'c, T> {
    conn: &'c rusqlite::Connection,
    _entity: PhantomData<T>,
}

impl<'c, T: SqliteRecord> SqliteEntityRepository<'c, T> {
    pub(crate) fn new(conn: &'c rusqlite::Connection) -> Self {
        Self {
            conn,
            _entity: PhantomData,
        }
    }

    fn table() -> &'static str {
        T::KIND.table()
    }

    fn parent_column() -> Option<String> {
        T::KIND.parent_kind().map(|kind| kind.ref_column())
    }

    fn columns() -> Vec<String> {
        CORE_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(Self::parent_column())
            .chain(T::COLUMNS.iter().map(|c| c.to_string()))
            .collect()
    }

    fn values(entity: &T) -> StoreResult<Vec<SqlValue>> {
        let mut values = core_values(entity.core());
        if let Some(expected) = T::KIND.parent_kind() {
            let parent = entity.parent().ok_or_else(|| StoreError::Corrupt {
                kind: T::KIND,
                column: expected.ref_column(),
                message: "missing parent link".to_string(),
            })?;
            parent.expect_kind(expected)?;
            values.push(id(parent.ref_id()));
        }
        values.extend(entity.column_values());
        Ok(values)
    }

    fn map_write_error(entity: &T, err: rusqlite::Error) -> StoreError {
        if is_unique_violation(&err) {
            entity.conflict()
        } else {
            StoreError::Sqlite(err)
        }
    }

    /// A new entity's parent must exist and be live.
    fn check_parent_live(&self, parent: ParentLink) -> StoreResult<()> {
        let archived: Option<bool> = self
            .conn
            .query_row(
                &format!("SELECT archived FROM {} WHERE ref_id = ?1", parent.kind().table()),
                [parent.ref_id().as_i64()],
                |row| row.get(0),
            )
            .optional()?;
        match archived {
            None => Err(StoreError::ParentNotFound {
                kind: T::KIND,
                parent,
            }),
            Some(true) => Err(StoreError::ParentArchived {
                kind: T::KIND,
                parent,
            }),
            Some(false) => Ok(()),
        }
    }

    fn record_events(&self, entity: &mut T) -> StoreResult<()> {
        let ref_id = entity.ref_id();
        let events = entity.core_mut().take_pending_events();
        if events.is_empty() {
            return Ok(());
        }
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO entity_event (entity_kind, entity_ref_id, name, kind, source, timestamp, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for event in events {
            stmt.execute((
                T::KIND.as_str(),
                ref_id.as_i64(),
                &event.name,
                event.kind.as_str(),
                event.source.as_str(),
                event.timestamp.as_raw(),
                event.data.to_string(),
            ))?;
        }
        Ok(())
    }

    pub(crate) fn insert(&self, mut entity: T) -> StoreResult<T> {
        if !entity.ref_id().is_new() {
            return Err(StoreError::AlreadyCreated {
                kind: T::KIND,
                ref_id: entity.ref_id(),
            });
        }
        if let Some(parent) = entity.parent() {
            self.check_parent_live(parent)?;
        }

        let columns = Self::columns();
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            Self::table(),
            columns.join(", "),
            placeholders
        );
        let values = Self::values(&entity)?;
        self.conn
            .execute(&sql, rusqlite::params_from_iter(values))
            .map_err(|e| Self::map_write_error(&entity, e))?;

        let ref_id = EntityId::from_i64(self.conn.last_insert_rowid());
        entity.core_mut().assign_ref_id(ref_id);
        self.record_events(&mut entity)?;
        tracing::debug!(kind = %T::KIND, %ref_id, "Created entity");
        Ok(entity)
    }

    pub(crate) fn update(&self, mut entity: T) -> StoreResult<T> {
        let ref_id = entity.ref_id();
        if ref_id.is_new() {
            return Err(DomainError::EntityNotSaved {
                kind: T::KIND,
                ref_id,
            }
            .into());
        }

        let columns = Self::columns();
        let assignments = columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{c} = ?{}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE ref_id = ?{}",
            Self::table(),
            assignments,
            columns.len() + 1
        );
        let mut values = Self::values(&entity)?;
        values.push(id(ref_id));
        let changed = self
            .conn
            .execute(&sql, rusqlite::params_from_iter(values))
            .map_err(|e| Self::map_write_error(&entity, e))?;
        if changed == 0 {
            return Err(StoreError::EntityNotFound {
                kind: T::KIND,
                ref_id,
            });
        }
        self.record_events(&mut entity)?;
        Ok(entity)
    }

    /// Rows matching `condition`, mapped through [`SqliteRecord::from_row`].
    pub(crate) fn select(
        &self,
        condition: &str,
        params: Vec<SqlValue>,
        suffix: &str,
    ) -> StoreResult<Vec<T>> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} {}",
            Self::table(),
            condition,
            suffix
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(params))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(T::from_row(&RowReader::new(T::KIND, row))?);
        }
        Ok(entities)
    }

    pub(crate) fn load_row(&self, ref_id: EntityId, allow_archived: bool) -> StoreResult<T> {
        let condition = if allow_archived {
            "ref_id = ?1"
        } else {
            "ref_id = ?1 AND archived = 0"
        };
        self.select(condition, vec![id(ref_id)], "")?
            .pop()
            .ok_or(StoreError::EntityNotFound {
                kind: T::KIND,
                ref_id,
            })
    }

    /// Every row pointing at `ref_id` through `column`, oldest first.
    pub(crate) fn find_by_link(
        &self,
        column: &str,
        ref_id: EntityId,
        include_archived: bool,
    ) -> StoreResult<Vec<T>> {
        let archived = if include_archived { "" } else { " AND archived = 0" };
        self.select(
            &format!("{column} = ?1{archived}"),
            vec![id(ref_id)],
            "ORDER BY ref_id",
        )
    }

    pub(crate) fn find_all_rows(&self, include_archived: bool) -> StoreResult<Vec<T>> {
        let condition = if include_archived { "1 = 1" } else { "archived = 0" };
        self.select(condition, Vec::new(), "ORDER BY ref_id")
    }

    pub(crate) fn filtered(
        &self,
        parent_ref_id: EntityId,
        filter: &EntityFilter,
    ) -> StoreResult<Vec<T>> {
        let Some(parent_column) = Self::parent_column() else {
            return self.find_all_rows(filter.include_archived);
        };
        let mut conditions = vec![format!("{parent_column} = ?1")];
        let mut params = vec![id(parent_ref_id)];
        if !filter.include_archived {
            conditions.push("archived = 0".to_string());
        }
        if let Some(ref_ids) = &filter.ref_id_in {
            conditions.push(in_list("ref_id", params.len(), ref_ids.len()));
            params.extend(ref_ids.iter().map(|r| id(*r)));
        }
        if let Some(keys) = &filter.key_in {
            match T::KEY_COLUMN {
                Some(key_column) => {
                    conditions.push(in_list(key_column, params.len(), keys.len()));
                    params.extend(keys.iter().map(text));
                }
                None => {
                    return Err(StoreError::NotFoundBy {
                        kind: T::KIND,
                        detail: format!("{} has no key to filter on", T::KIND),
                    })
                }
            }
        }
        self.select(&conditions.join(" AND "), params, "ORDER BY ref_id")
    }

    pub(crate) fn load_single_by_parent(&self, parent_ref_id: EntityId) -> StoreResult<T> {
        let parent_kind = T::KIND.parent_kind().unwrap_or(EntityKind::Workspace);
        self.filtered(parent_ref_id, &EntityFilter::live())?
            .pop()
            .ok_or(StoreError::TrunkNotFound {
                kind: T::KIND,
                parent: ParentLink::new(parent_kind, parent_ref_id),
            })
    }

    pub(crate) fn delete_row(&self, ref_id: EntityId) -> StoreResult<T> {
        let entity = self.load_row(ref_id, true)?;
        self.conn.execute(
            &format!("DELETE FROM {} WHERE ref_id = ?1", Self::table()),
            [ref_id.as_i64()],
        )?;
        tracing::info!(kind = %T::KIND, %ref_id, "Removed entity");
        Ok(entity)
    }
}

/// `column IN (?n, ...)` for `count` parameters after the first `offset`.
/// An empty list matches nothing.
fn in_list(column: &str, offset: usize, count: usize) -> String {
    if count == 0 {
        return "0 = 1".to_string();
    }
    let placeholders = (offset + 1..=offset + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{column} IN ({placeholders})")
}

macro_rules! root_repository {
    ($($ty:ty),+) => {$(
        impl RootEntityRepository<$ty> for SqliteEntityRepository<'_, $ty> {
            fn create(&self, entity: $ty) -> StoreResult<$ty> {
                self.insert(entity)
            }

            fn load_by_id(&self, ref_id: EntityId, allow_archived: bool) -> StoreResult<$ty> {
                self.load_row(ref_id, allow_archived)
            }

            fn save(&self, entity: $ty) -> StoreResult<$ty> {
                self.update(entity)
            }

            fn find_all(&self, include_archived: bool) -> StoreResult<Vec<$ty>> {
                self.find_all_rows(include_archived)
            }
        }
    )+};
}

macro_rules! stub_repository {
    ($($ty:ty),+) => {$(
        impl StubEntityRepository<$ty> for SqliteEntityRepository<'_, $ty> {
            fn create(&self, entity: $ty) -> StoreResult<$ty> {
                self.insert(entity)
            }

            fn load_by_owner(&self, owner_ref_id: EntityId) -> StoreResult<$ty> {
                self.load_single_by_parent(owner_ref_id)
            }

            fn save(&self, entity: $ty) -> StoreResult<$ty> {
                self.update(entity)
            }
        }
    )+};
}

macro_rules! trunk_repository {
    ($($ty:ty),+) => {$(
        impl TrunkEntityRepository<$ty> for SqliteEntityRepository<'_, $ty> {
            fn create(&self, entity: $ty) -> StoreResult<$ty> {
                self.insert(entity)
            }

            fn load_by_parent(&self, parent_ref_id: EntityId) -> StoreResult<$ty> {
                self.load_single_by_parent(parent_ref_id)
            }

            fn save(&self, entity: $ty) -> StoreResult<$ty> {
                self.update(entity)
            }
        }
    )+};
}

macro_rules! branch_repository {
    ($($ty:ty),+) => {$(
        impl BranchEntityRepository<$ty> for SqliteEntityRepository<'_, $ty> {
            fn create(&self, entity: $ty) -> StoreResult<$ty> {
                self.insert(entity)
            }

            fn load_by_id(&self, ref_id: EntityId, allow_archived: bool) -> StoreResult<$ty> {
                self.load_row(ref_id, allow_archived)
            }

            fn save(&self, entity: $ty) -> StoreResult<$ty> {
                self.update(entity)
            }

            fn find_all_with_filters(
                &self,
                parent_ref_id: EntityId,
                filter: &EntityFilter,
            ) -> StoreResult<Vec<$ty>> {
                self.filtered(parent_ref_id, filter)
            }
        }
    )+};
}

macro_rules! leaf_repository {
    ($($ty:ty),+) => {$(
        impl LeafEntityRepository<$ty> for SqliteEntityRepository<'_, $ty> {
            fn create(&self, entity: $ty) -> StoreResult<$ty> {
                self.insert(entity)
            }

            fn load_by_id(&self, ref_id: EntityId, allow_archived: bool) -> StoreResult<$ty> {
                self.load_row(ref_id, allow_archived)
            }

            fn save(&self, entity: $ty) -> StoreResult<$ty> {
                self.update(entity)
            }

            fn find_all_with_filters(
                &self,
                parent_ref_id: EntityId,
                filter: &EntityFilter,
            ) -> StoreResult<Vec<$ty>> {
                self.filtered(parent_ref_id, filter)
            }

            fn remove(&self, ref_id: EntityId) -> StoreResult<$ty> {
                self.delete_row(ref_id)
            }
        }
    )+};
}

root_repository!(User, Workspace);
stub_repository!(Auth);
trunk_repository!(
    ProjectCollection,
    HabitCollection,
    InboxTaskCollection,
    BigPlanCollection,
    JournalCollection,
    NoteCollection,
    SmartListCollection,
    TimePlanDomain,
    ScheduleDomain,
    GcLog
);
branch_repository!(SmartList, TimePlan, ScheduleStream);
leaf_repository!(
    Project,
    Habit,
    InboxTask,
    BigPlan,
    Journal,
    Note,
    SmartListItem,
    TimePlanActivity,
    ScheduleEvent,
    GcLogEntry
);

pub trait GcLogEntryRepository {
    /// The `limit` most recent entries, newest first.
    fn find_last(&self, gc_log_ref_id: EntityId, limit: u32) -> StoreResult<Vec<GcLogEntry>>;
}

impl GcLogEntryRepository for SqliteEntityRepository<'_, GcLogEntry> {
    fn find_last(&self, gc_log_ref_id: EntityId, limit: u32) -> StoreResult<Vec<GcLogEntry>> {
        self.select(
            "gc_log_ref_id = ?1",
            vec![id(gc_log_ref_id), int(limit)],
            "ORDER BY created_time DESC, ref_id DESC LIMIT ?2",
        )
    }
}

pub trait JournalRepository {
    fn load_by_period_and_timeline(
        &self,
        journal_collection_ref_id: EntityId,
        period: RecurringTaskPeriod,
        timeline: &Timeline,
    ) -> StoreResult<Option<Journal>>;
}

impl JournalRepository for SqliteEntityRepository<'_, Journal> {
    fn load_by_period_and_timeline(
        &self,
        journal_collection_ref_id: EntityId,
        period: RecurringTaskPeriod,
        timeline: &Timeline,
    ) -> StoreResult<Option<Journal>> {
        Ok(self
            .select(
                "journal_collection_ref_id = ?1 AND period = ?2 AND timeline = ?3 AND archived = 0",
                vec![id(journal_collection_ref_id), text(period), text(timeline)],
                "",
            )?
            .pop())
    }
}

pub trait TimePlanRepository {
    fn load_by_period_and_timeline(
        &self,
        time_plan_domain_ref_id: EntityId,
        period: RecurringTaskPeriod,
        timeline: &Timeline,
    ) -> StoreResult<Option<TimePlan>>;
}

impl TimePlanRepository for SqliteEntityRepository<'_, TimePlan> {
    fn load_by_period_and_timeline(
        &self,
        time_plan_domain_ref_id: EntityId,
        period: RecurringTaskPeriod,
        timeline: &Timeline,
    ) -> StoreResult<Option<TimePlan>> {
        Ok(self
            .select(
                "time_plan_domain_ref_id = ?1 AND period = ?2 AND timeline = ?3 AND archived = 0",
                vec![id(time_plan_domain_ref_id), text(period), text(timeline)],
                "",
            )?
            .pop())
    }
}

/// A page of inbox tasks, ordered by creation.
#[derive(Debug, Clone)]
pub struct InboxTaskPage {
    pub sources: Option<Vec<InboxTaskSource>>,
    pub include_archived: bool,
    /// Resume after this `(created_time, ref_id)` cursor.
    pub after: Option<(Timestamp, EntityId)>,
    pub limit: u32,
}

pub trait InboxTaskRepository {
    fn find_for_habit(&self, habit_ref_id: EntityId, include_archived: bool)
        -> StoreResult<Vec<InboxTask>>;

    fn find_for_big_plan(
        &self,
        big_plan_ref_id: EntityId,
        include_archived: bool,
    ) -> StoreResult<Vec<InboxTask>>;

    fn find_for_project(
        &self,
        project_ref_id: EntityId,
        include_archived: bool,
    ) -> StoreResult<Vec<InboxTask>>;

    /// The live task generated for one habit repeat, if any.
    fn load_for_recurring_slot(
        &self,
        habit_ref_id: EntityId,
        timeline: &Timeline,
        repeat_index: u32,
    ) -> StoreResult<Option<InboxTask>>;

    fn find_page(
        &self,
        inbox_task_collection_ref_id: EntityId,
        page: &InboxTaskPage,
    ) -> StoreResult<Vec<InboxTask>>;
}

impl InboxTaskRepository for SqliteEntityRepository<'_, InboxTask> {
    fn find_for_habit(
        &self,
        habit_ref_id: EntityId,
        include_archived: bool,
    ) -> StoreResult<Vec<InboxTask>> {
        self.find_by_link("habit_ref_id", habit_ref_id, include_archived)
    }

    fn find_for_big_plan(
        &self,
        big_plan_ref_id: EntityId,
        include_archived: bool,
    ) -> StoreResult<Vec<InboxTask>> {
        self.find_by_link("big_plan_ref_id", big_plan_ref_id, include_archived)
    }

    fn find_for_project(
        &self,
        project_ref_id: EntityId,
        include_archived: bool,
    ) -> StoreResult<Vec<InboxTask>> {
        self.find_by_link("project_ref_id", project_ref_id, include_archived)
    }

    fn load_for_recurring_slot(
        &self,
        habit_ref_id: EntityId,
        timeline: &Timeline,
        repeat_index: u32,
    ) -> StoreResult<Option<InboxTask>> {
        Ok(self
            .select(
                "source = 'habit' AND habit_ref_id = ?1 AND recurring_timeline = ?2
                 AND recurring_repeat_index = ?3 AND archived = 0",
                vec![id(habit_ref_id), text(timeline), int(repeat_index)],
                "",
            )?
            .pop())
    }

    fn find_page(
        &self,
        inbox_task_collection_ref_id: EntityId,
        page: &InboxTaskPage,
    ) -> StoreResult<Vec<InboxTask>> {
        let mut conditions = vec!["inbox_task_collection_ref_id = ?1".to_string()];
        let mut params = vec![id(inbox_task_collection_ref_id)];
        if !page.include_archived {
            conditions.push("archived = 0".to_string());
        }
        if let Some(sources) = &page.sources {
            conditions.push(in_list("source", params.len(), sources.len()));
            params.extend(sources.iter().map(|s| text(s)));
        }
        if let Some((created_time, ref_id)) = page.after {
            let n = params.len();
            conditions.push(format!(
                "(created_time > ?{} OR (created_time = ?{} AND ref_id > ?{}))",
                n + 1,
                n + 1,
                n + 2
            ));
            params.push(text(created_time));
            params.push(id(ref_id));
        }
        let limit_param = params.len() + 1;
        params.push(int(page.limit));
        self.select(
            &conditions.join(" AND "),
            params,
            &format!("ORDER BY created_time, ref_id LIMIT ?{limit_param}"),
        )
    }
}

pub trait NoteRepository {
    /// The note owned by a non-user source entity, archived or not.
    fn load_for_source(
        &self,
        source: NoteSource,
        source_entity_ref_id: EntityId,
    ) -> StoreResult<Option<Note>>;

    /// Every note attached to an entity of `domain`, whatever its source.
    fn find_attached_to(
        &self,
        domain: NoteDomain,
        source_entity_ref_id: EntityId,
        include_archived: bool,
    ) -> StoreResult<Vec<Note>>;
}

impl NoteRepository for SqliteEntityRepository<'_, Note> {
    fn load_for_source(
        &self,
        source: NoteSource,
        source_entity_ref_id: EntityId,
    ) -> StoreResult<Option<Note>> {
        Ok(self
            .select(
                "source = ?1 AND source_entity_ref_id = ?2",
                vec![text(source), id(source_entity_ref_id)],
                "ORDER BY ref_id",
            )?
            .pop())
    }

    fn find_attached_to(
        &self,
        domain: NoteDomain,
        source_entity_ref_id: EntityId,
        include_archived: bool,
    ) -> StoreResult<Vec<Note>> {
        let archived = if include_archived { "" } else { " AND archived = 0" };
        self.select(
            &format!("domain = ?1 AND source_entity_ref_id = ?2{archived}"),
            vec![text(domain), id(source_entity_ref_id)],
            "ORDER BY ref_id",
        )
    }
}

pub trait TimePlanActivityRepository {
    fn find_for_target(
        &self,
        target: TimePlanActivityTarget,
        target_ref_id: EntityId,
        include_archived: bool,
    ) -> StoreResult<Vec<TimePlanActivity>>;
}

impl TimePlanActivityRepository for SqliteEntityRepository<'_, TimePlanActivity> {
    fn find_for_target(
        &self,
        target: TimePlanActivityTarget,
        target_ref_id: EntityId,
        include_archived: bool,
    ) -> StoreResult<Vec<TimePlanActivity>> {
        let archived = if include_archived { "" } else { " AND archived = 0" };
        self.select(
            &format!("target = ?1 AND target_ref_id = ?2{archived}"),
            vec![text(target), id(target_ref_id)],
            "ORDER BY ref_id",
        )
    }
}

pub trait ScheduleEventRepository {
    fn load_by_external_uid(
        &self,
        schedule_stream_ref_id: EntityId,
        external_uid: &str,
    ) -> StoreResult<Option<ScheduleEvent>>;
}

impl ScheduleEventRepository for SqliteEntityRepository<'_, ScheduleEvent> {
    fn load_by_external_uid(
        &self,
        schedule_stream_ref_id: EntityId,
        external_uid: &str,
    ) -> StoreResult<Option<ScheduleEvent>> {
        Ok(self
            .select(
                "schedule_stream_ref_id = ?1 AND external_uid = ?2 AND archived = 0",
                vec![id(schedule_stream_ref_id), text(external_uid)],
                "",
            )?
            .pop())
    }
}

pub trait UserRepository {
    fn load_by_email_address(&self, email_address: &EmailAddress) -> StoreResult<Option<User>>;
}

impl UserRepository for SqliteEntityRepository<'_, User> {
    fn load_by_email_address(&self, email_address: &EmailAddress) -> StoreResult<Option<User>> {
        Ok(self
            .select(
                "email_address = ?1 AND archived = 0",
                vec![text(email_address)],
                "",
            )?
            .pop())
    }
}
