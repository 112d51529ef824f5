//! Row mappings for every entity kind.

use std::collections::{BTreeMap, BTreeSet};

use rusqlite::types::Value as SqlValue;

use super::record::*;
use super::{StoreError, StoreResult};
use crate::models::*;

impl SqliteRecord for User {
    const COLUMNS: &'static [&'static str] = &["email_address", "name"];

    fn column_values(&self) -> Vec<SqlValue> {
        vec![text(&self.email_address), text(&self.name)]
    }

    fn from_row(row: &RowReader<'_, '_>) -> StoreResult<Self> {
        Ok(Self {
            core: row.core()?,
            email_address: row.value("email_address")?,
            name: row.value("name")?,
        })
    }

    fn conflict(&self) -> StoreError {
        StoreError::EntityAlreadyExists {
            kind: Self::KIND,
            detail: format!("a user with email {} already exists", self.email_address),
        }
    }
}

impl SqliteRecord for Workspace {
    const COLUMNS: &'static [&'static str] = &["name", "owner_user_ref_id", "feature_flags"];

    fn column_values(&self) -> Vec<SqlValue> {
        vec![
            text(&self.name),
            id(self.owner_user_ref_id),
            text(self.feature_flags.to_json()),
        ]
    }

    fn from_row(row: &RowReader<'_, '_>) -> StoreResult<Self> {
        Ok(Self {
            core: row.core()?,
            name: row.value("name")?,
            owner_user_ref_id: row.entity_id("owner_user_ref_id")?,
            feature_flags: row.parse_with("feature_flags", FeatureFlags::from_json)?,
        })
    }
}

impl SqliteRecord for Auth {
    const COLUMNS: &'static [&'static str] = &["password_hash"];

    fn column_values(&self) -> Vec<SqlValue> {
        vec![text(self.password_hash.as_raw())]
    }

    fn from_row(row: &RowReader<'_, '_>) -> StoreResult<Self> {
        Ok(Self {
            core: row.core()?,
            user: row.parent()?,
            password_hash: row.parse_with("password_hash", PasswordHash::from_raw)?,
        })
    }

    fn conflict(&self) -> StoreError {
        StoreError::EntityAlreadyExists {
            kind: Self::KIND,
            detail: format!("{} already has credentials", self.user),
        }
    }
}

/// Row mapping for trunks whose only column is the workspace link.
macro_rules! plain_trunk_record {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl SqliteRecord for $ty {
                const COLUMNS: &'static [&'static str] = &[];

                fn column_values(&self) -> Vec<SqlValue> {
                    Vec::new()
                }

                fn from_row(row: &RowReader<'_, '_>) -> StoreResult<Self> {
                    Ok(Self {
                        core: row.core()?,
                        workspace: row.parent()?,
                    })
                }

                fn conflict(&self) -> StoreError {
                    trunk_conflict(Self::KIND, self.workspace)
                }
            }
        )+
    };
}

fn trunk_conflict(kind: EntityKind, workspace: ParentLink) -> StoreError {
    StoreError::EntityAlreadyExists {
        kind,
        detail: format!("{workspace} already has a live {kind}"),
    }
}

plain_trunk_record!(
    ProjectCollection,
    HabitCollection,
    InboxTaskCollection,
    BigPlanCollection,
    NoteCollection,
    SmartListCollection,
    ScheduleDomain,
    GcLog,
);

impl SqliteRecord for JournalCollection {
    const COLUMNS: &'static [&'static str] = &["periods"];

    fn column_values(&self) -> Vec<SqlValue> {
        vec![json_text(&self.periods)]
    }

    fn from_row(row: &RowReader<'_, '_>) -> StoreResult<Self> {
        Ok(Self {
            core: row.core()?,
            workspace: row.parent()?,
            periods: row.json::<BTreeSet<RecurringTaskPeriod>>("periods")?,
        })
    }

    fn conflict(&self) -> StoreError {
        trunk_conflict(Self::KIND, self.workspace)
    }
}

impl SqliteRecord for TimePlanDomain {
    const COLUMNS: &'static [&'static str] = &["periods"];

    fn column_values(&self) -> Vec<SqlValue> {
        vec![json_text(&self.periods)]
    }

    fn from_row(row: &RowReader<'_, '_>) -> StoreResult<Self> {
        Ok(Self {
            core: row.core()?,
            workspace: row.parent()?,
            periods: row.json::<BTreeSet<RecurringTaskPeriod>>("periods")?,
        })
    }

    fn conflict(&self) -> StoreError {
        trunk_conflict(Self::KIND, self.workspace)
    }
}

impl SqliteRecord for SmartList {
    const COLUMNS: &'static [&'static str] = &["key", "name"];
    const KEY_COLUMN: Option<&'static str> = Some("key");

    fn column_values(&self) -> Vec<SqlValue> {
        vec![text(&self.key), text(&self.name)]
    }

    fn from_row(row: &RowReader<'_, '_>) -> StoreResult<Self> {
        Ok(Self {
            core: row.core()?,
            smart_list_collection: row.parent()?,
            key: row.value("key")?,
            name: row.value("name")?,
        })
    }

    fn conflict(&self) -> StoreError {
        StoreError::EntityAlreadyExists {
            kind: Self::KIND,
            detail: format!("a smart list with key `{}` already exists", self.key),
        }
    }
}

impl SqliteRecord for TimePlan {
    const COLUMNS: &'static [&'static str] =
        &["source", "name", "period", "timeline", "right_now"];

    fn column_values(&self) -> Vec<SqlValue> {
        vec![
            text(self.source),
            text(&self.name),
            text(self.period),
            text(&self.timeline),
            text(self.right_now),
        ]
    }

    fn from_row(row: &RowReader<'_, '_>) -> StoreResult<Self> {
        Ok(Self {
            core: row.core()?,
            time_plan_domain: row.parent()?,
            source: row.parse_with("source", TimePlanSource::from_stored)?,
            name: row.value("name")?,
            period: row.value("period")?,
            timeline: row.value("timeline")?,
            right_now: row.value("right_now")?,
        })
    }

    fn conflict(&self) -> StoreError {
        StoreError::EntityAlreadyExists {
            kind: Self::KIND,
            detail: format!("a {} time plan for {} already exists", self.period, self.timeline),
        }
    }
}

impl SqliteRecord for ScheduleStream {
    const COLUMNS: &'static [&'static str] = &["source", "name", "source_ical_url"];

    fn column_values(&self) -> Vec<SqlValue> {
        vec![
            text(self.source),
            text(&self.name),
            opt_text(self.source_ical_url.as_deref()),
        ]
    }

    fn from_row(row: &RowReader<'_, '_>) -> StoreResult<Self> {
        Ok(Self {
            core: row.core()?,
            schedule_domain: row.parent()?,
            source: row.value("source")?,
            name: row.value("name")?,
            source_ical_url: row.opt_string("source_ical_url")?,
        })
    }
}

impl SqliteRecord for Project {
    const COLUMNS: &'static [&'static str] = &["key", "name"];
    const KEY_COLUMN: Option<&'static str> = Some("key");

    fn column_values(&self) -> Vec<SqlValue> {
        vec![text(&self.key), text(&self.name)]
    }

    fn from_row(row: &RowReader<'_, '_>) -> StoreResult<Self> {
        Ok(Self {
            core: row.core()?,
            project_collection: row.parent()?,
            key: row.value("key")?,
            name: row.value("name")?,
        })
    }

    fn conflict(&self) -> StoreError {
        StoreError::EntityAlreadyExists {
            kind: Self::KIND,
            detail: format!("a project with key `{}` already exists", self.key),
        }
    }
}

impl SqliteRecord for Habit {
    const COLUMNS: &'static [&'static str] = &[
        "project_ref_id",
        "name",
        "period",
        "repeats_strategy",
        "repeats_in_period_count",
        "suspended",
    ];

    fn column_values(&self) -> Vec<SqlValue> {
        vec![
            id(self.project_ref_id),
            text(&self.name),
            text(self.schedule.period),
            text(self.schedule.repeats_strategy),
            int(self.schedule.repeats_in_period_count),
            flag(self.suspended),
        ]
    }

    fn from_row(row: &RowReader<'_, '_>) -> StoreResult<Self> {
        Ok(Self {
            core: row.core()?,
            habit_collection: row.parent()?,
            project_ref_id: row.entity_id("project_ref_id")?,
            name: row.value("name")?,
            schedule: HabitSchedule {
                period: row.value("period")?,
                repeats_strategy: row.value("repeats_strategy")?,
                repeats_in_period_count: row.u32("repeats_in_period_count")?,
            },
            suspended: row.flag("suspended")?,
        })
    }
}

impl SqliteRecord for BigPlan {
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "status",
        "project_ref_id",
        "actionable_date",
        "due_date",
        "accepted_time",
        "working_time",
        "completed_time",
    ];

    fn column_values(&self) -> Vec<SqlValue> {
        vec![
            text(&self.name),
            text(self.status),
            id(self.project_ref_id),
            opt_text(self.suggested_date.actionable_date),
            opt_text(self.suggested_date.due_date),
            opt_text(self.accepted_time),
            opt_text(self.working_time),
            opt_text(self.completed_time),
        ]
    }

    fn from_row(row: &RowReader<'_, '_>) -> StoreResult<Self> {
        Ok(Self {
            core: row.core()?,
            big_plan_collection: row.parent()?,
            name: row.value("name")?,
            status: row.parse_with("status", BigPlanStatus::from_stored)?,
            project_ref_id: row.entity_id("project_ref_id")?,
            suggested_date: SuggestedDate {
                actionable_date: row.opt_value("actionable_date")?,
                due_date: row.opt_value("due_date")?,
            },
            accepted_time: row.opt_value("accepted_time")?,
            working_time: row.opt_value("working_time")?,
            completed_time: row.opt_value("completed_time")?,
        })
    }
}

impl SqliteRecord for InboxTask {
    const COLUMNS: &'static [&'static str] = &[
        "source",
        "name",
        "status",
        "project_ref_id",
        "big_plan_ref_id",
        "habit_ref_id",
        "recurring_timeline",
        "recurring_repeat_index",
        "actionable_date",
        "due_date",
        "accepted_time",
        "working_time",
        "completed_time",
    ];

    fn column_values(&self) -> Vec<SqlValue> {
        let slot = self.recurring.as_ref();
        vec![
            text(self.source),
            text(&self.name),
            text(self.status),
            id(self.project_ref_id),
            opt_id(self.big_plan_ref_id),
            opt_id(slot.map(|s| s.habit_ref_id)),
            opt_text(slot.map(|s| &s.timeline)),
            opt_int(slot.map(|s| s.repeat_index)),
            opt_text(self.suggested_date.actionable_date),
            opt_text(self.suggested_date.due_date),
            opt_text(self.accepted_time),
            opt_text(self.working_time),
            opt_text(self.completed_time),
        ]
    }

    fn from_row(row: &RowReader<'_, '_>) -> StoreResult<Self> {
        let source: InboxTaskSource = row.value("source")?;
        let recurring = match row.opt_entity_id("habit_ref_id")? {
            Some(habit_ref_id) => Some(RecurringSlot {
                habit_ref_id,
                timeline: row.value("recurring_timeline")?,
                repeat_index: row.opt_u32("recurring_repeat_index")?.unwrap_or(0),
            }),
            None => None,
        };
        Ok(Self {
            core: row.core()?,
            inbox_task_collection: row.parent()?,
            source,
            name: row.value("name")?,
            status: row.parse_with("status", InboxTaskStatus::from_stored)?,
            project_ref_id: row.entity_id("project_ref_id")?,
            big_plan_ref_id: row.opt_entity_id("big_plan_ref_id")?,
            recurring,
            suggested_date: SuggestedDate {
                actionable_date: row.opt_value("actionable_date")?,
                due_date: row.opt_value("due_date")?,
            },
            accepted_time: row.opt_value("accepted_time")?,
            working_time: row.opt_value("working_time")?,
            completed_time: row.opt_value("completed_time")?,
        })
    }

    fn conflict(&self) -> StoreError {
        match &self.recurring {
            Some(slot) => StoreError::EntityAlreadyExists {
                kind: Self::KIND,
                detail: format!(
                    "habit {} already has task #{} for {}",
                    slot.habit_ref_id, slot.repeat_index, slot.timeline
                ),
            },
            None => StoreError::EntityAlreadyExists {
                kind: Self::KIND,
                detail: format!("inbox task {} clashes with a unique index", self.ref_id()),
            },
        }
    }
}

impl SqliteRecord for Journal {
    const COLUMNS: &'static [&'static str] =
        &["source", "name", "period", "timeline", "right_now"];

    fn column_values(&self) -> Vec<SqlValue> {
        vec![
            text(self.source),
            text(&self.name),
            text(self.period),
            text(&self.timeline),
            text(self.right_now),
        ]
    }

    fn from_row(row: &RowReader<'_, '_>) -> StoreResult<Self> {
        Ok(Self {
            core: row.core()?,
            journal_collection: row.parent()?,
            source: row.parse_with("source", JournalSource::from_stored)?,
            name: row.value("name")?,
            period: row.value("period")?,
            timeline: row.value("timeline")?,
            right_now: row.value("right_now")?,
        })
    }

    fn conflict(&self) -> StoreError {
        StoreError::JournalExistsForPeriodAndDate {
            period: self.period,
            timeline: self.timeline.clone(),
        }
    }
}

impl SqliteRecord for Note {
    const COLUMNS: &'static [&'static str] =
        &["domain", "source", "source_entity_ref_id", "name", "content"];

    fn column_values(&self) -> Vec<SqlValue> {
        vec![
            text(self.domain),
            text(self.source),
            opt_id(self.source_entity_ref_id),
            text(&self.name),
            text(&self.content),
        ]
    }

    fn from_row(row: &RowReader<'_, '_>) -> StoreResult<Self> {
        Ok(Self {
            core: row.core()?,
            note_collection: row.parent()?,
            domain: row.value("domain")?,
            source: row.value("source")?,
            source_entity_ref_id: row.opt_entity_id("source_entity_ref_id")?,
            name: row.value("name")?,
            content: row.string("content")?,
        })
    }

    fn conflict(&self) -> StoreError {
        StoreError::EntityAlreadyExists {
            kind: Self::KIND,
            detail: format!(
                "a `{}` note for entity {} already exists",
                self.source,
                self.source_entity_ref_id
                    .map(|id| id.to_string())
                    .unwrap_or_default()
            ),
        }
    }
}

impl SqliteRecord for SmartListItem {
    const COLUMNS: &'static [&'static str] = &["name", "is_done"];

    fn column_values(&self) -> Vec<SqlValue> {
        vec![text(&self.name), flag(self.is_done)]
    }

    fn from_row(row: &RowReader<'_, '_>) -> StoreResult<Self> {
        Ok(Self {
            core: row.core()?,
            smart_list: row.parent()?,
            name: row.value("name")?,
            is_done: row.flag("is_done")?,
        })
    }
}

impl SqliteRecord for TimePlanActivity {
    const COLUMNS: &'static [&'static str] = &["target", "target_ref_id", "feasability", "doneness"];

    fn column_values(&self) -> Vec<SqlValue> {
        vec![
            text(self.target),
            id(self.target_ref_id),
            text(self.feasability),
            text(self.doneness),
        ]
    }

    fn from_row(row: &RowReader<'_, '_>) -> StoreResult<Self> {
        Ok(Self {
            core: row.core()?,
            time_plan: row.parent()?,
            target: row.value("target")?,
            target_ref_id: row.entity_id("target_ref_id")?,
            feasability: row.value("feasability")?,
            doneness: row.value("doneness")?,
        })
    }
}

impl SqliteRecord for ScheduleEvent {
    const COLUMNS: &'static [&'static str] =
        &["source", "name", "start_date", "end_date", "external_uid"];

    fn column_values(&self) -> Vec<SqlValue> {
        vec![
            text(self.source),
            text(&self.name),
            text(self.start_date),
            text(self.end_date),
            opt_text(self.external_uid.as_deref()),
        ]
    }

    fn from_row(row: &RowReader<'_, '_>) -> StoreResult<Self> {
        Ok(Self {
            core: row.core()?,
            schedule_stream: row.parent()?,
            source: row.value("source")?,
            name: row.value("name")?,
            start_date: row.value("start_date")?,
            end_date: row.value("end_date")?,
            external_uid: row.opt_string("external_uid")?,
        })
    }

    fn conflict(&self) -> StoreError {
        StoreError::EntityAlreadyExists {
            kind: Self::KIND,
            detail: format!(
                "{} already has an event with uid `{}`",
                self.schedule_stream,
                self.external_uid.as_deref().unwrap_or_default()
            ),
        }
    }
}

impl SqliteRecord for GcLogEntry {
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "source",
        "gc_reason",
        "started_time",
        "finished_time",
        "entity_counts",
    ];

    fn column_values(&self) -> Vec<SqlValue> {
        vec![
            text(&self.name),
            text(self.source),
            text(self.archival_reason),
            text(self.started_time),
            text(self.finished_time),
            json_text(&self.entity_counts),
        ]
    }

    fn from_row(row: &RowReader<'_, '_>) -> StoreResult<Self> {
        Ok(Self {
            core: row.core()?,
            gc_log: row.parent()?,
            name: row.value("name")?,
            source: row.value("source")?,
            archival_reason: row.value("gc_reason")?,
            started_time: row.value("started_time")?,
            finished_time: row.value("finished_time")?,
            entity_counts: row.json::<BTreeMap<EntityKind, u32>>("entity_counts")?,
        })
    }
}
