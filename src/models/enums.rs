//! Enumerations with semantics.
//!
//! Every enum has a single canonical wire string (hyphenated lowercase) that is
//! used for storage, serde and the CLI. `from_raw` accepts exactly those strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::values::InputValidationError;

/// Declares an enum together with its wire strings.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $wire ),+
                }
            }

            pub fn from_raw(raw: &str) -> Result<Self, InputValidationError> {
                match raw {
                    $( $wire => Ok(Self::$variant), )+
                    other => Err(InputValidationError::new(format!(
                        "unknown {} `{}`, expected one of: {}",
                        stringify!($name),
                        other,
                        [$($wire),+].join(", ")
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = InputValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_raw(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Self::from_raw(&raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// A source discriminator decides whether users may edit what it produced.
pub trait SourceDiscriminator: Copy + fmt::Display {
    fn allow_user_changes(self) -> bool;
}

wire_enum! {
    /// Every persisted entity type. The wire string doubles as the kind tag in
    /// event rows and GC counters.
    pub enum EntityKind {
        User => "user",
        Workspace => "workspace",
        Auth => "auth",
        ProjectCollection => "project-collection",
        HabitCollection => "habit-collection",
        InboxTaskCollection => "inbox-task-collection",
        BigPlanCollection => "big-plan-collection",
        JournalCollection => "journal-collection",
        NoteCollection => "note-collection",
        SmartListCollection => "smart-list-collection",
        TimePlanDomain => "time-plan-domain",
        ScheduleDomain => "schedule-domain",
        GcLog => "gc-log",
        SmartList => "smart-list",
        TimePlan => "time-plan",
        ScheduleStream => "schedule-stream",
        Project => "project",
        Habit => "habit",
        InboxTask => "inbox-task",
        BigPlan => "big-plan",
        Journal => "journal",
        Note => "note",
        SmartListItem => "smart-list-item",
        TimePlanActivity => "time-plan-activity",
        ScheduleEvent => "schedule-event",
        GcLogEntry => "gc-log-entry",
    }
}

/// Structural role of an entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityShape {
    /// No parent.
    Root,
    /// Singleton per tenant, addressed through its owner.
    Stub,
    /// Exactly one live instance per parent root.
    Trunk,
    /// Has a trunk parent and owns leaves.
    Branch,
    /// Has a trunk or branch parent.
    Leaf,
}

impl EntityKind {
    /// SQL table holding rows of this kind.
    pub fn table(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Workspace => "workspace",
            Self::Auth => "auth",
            Self::ProjectCollection => "project_collection",
            Self::HabitCollection => "habit_collection",
            Self::InboxTaskCollection => "inbox_task_collection",
            Self::BigPlanCollection => "big_plan_collection",
            Self::JournalCollection => "journal_collection",
            Self::NoteCollection => "note_collection",
            Self::SmartListCollection => "smart_list_collection",
            Self::TimePlanDomain => "time_plan_domain",
            Self::ScheduleDomain => "schedule_domain",
            Self::GcLog => "gc_log",
            Self::SmartList => "smart_list",
            Self::TimePlan => "time_plan",
            Self::ScheduleStream => "schedule_stream",
            Self::Project => "project",
            Self::Habit => "habit",
            Self::InboxTask => "inbox_task",
            Self::BigPlan => "big_plan",
            Self::Journal => "journal",
            Self::Note => "note",
            Self::SmartListItem => "smart_list_item",
            Self::TimePlanActivity => "time_plan_activity",
            Self::ScheduleEvent => "schedule_event",
            Self::GcLogEntry => "gc_log_entry",
        }
    }

    /// Column a child uses to point at a parent of this kind.
    pub fn ref_column(&self) -> String {
        format!("{}_ref_id", self.table())
    }

    pub fn shape(&self) -> EntityShape {
        match self {
            Self::User | Self::Workspace => EntityShape::Root,
            Self::Auth => EntityShape::Stub,
            Self::ProjectCollection
            | Self::HabitCollection
            | Self::InboxTaskCollection
            | Self::BigPlanCollection
            | Self::JournalCollection
            | Self::NoteCollection
            | Self::SmartListCollection
            | Self::TimePlanDomain
            | Self::ScheduleDomain
            | Self::GcLog => EntityShape::Trunk,
            Self::SmartList | Self::TimePlan | Self::ScheduleStream => EntityShape::Branch,
            Self::Project
            | Self::Habit
            | Self::InboxTask
            | Self::BigPlan
            | Self::Journal
            | Self::Note
            | Self::SmartListItem
            | Self::TimePlanActivity
            | Self::ScheduleEvent
            | Self::GcLogEntry => EntityShape::Leaf,
        }
    }

    /// Kind of the owning parent, `None` for roots.
    pub fn parent_kind(&self) -> Option<EntityKind> {
        match self {
            Self::User | Self::Workspace => None,
            Self::Auth => Some(Self::User),
            Self::ProjectCollection
            | Self::HabitCollection
            | Self::InboxTaskCollection
            | Self::BigPlanCollection
            | Self::JournalCollection
            | Self::NoteCollection
            | Self::SmartListCollection
            | Self::TimePlanDomain
            | Self::ScheduleDomain
            | Self::GcLog => Some(Self::Workspace),
            Self::SmartList => Some(Self::SmartListCollection),
            Self::TimePlan => Some(Self::TimePlanDomain),
            Self::ScheduleStream => Some(Self::ScheduleDomain),
            Self::Project => Some(Self::ProjectCollection),
            Self::Habit => Some(Self::HabitCollection),
            Self::InboxTask => Some(Self::InboxTaskCollection),
            Self::BigPlan => Some(Self::BigPlanCollection),
            Self::Journal => Some(Self::JournalCollection),
            Self::Note => Some(Self::NoteCollection),
            Self::SmartListItem => Some(Self::SmartList),
            Self::TimePlanActivity => Some(Self::TimePlan),
            Self::ScheduleEvent => Some(Self::ScheduleStream),
            Self::GcLogEntry => Some(Self::GcLog),
        }
    }

    /// Trunk kinds every workspace owns exactly one live instance of.
    pub fn workspace_trunks() -> impl Iterator<Item = EntityKind> {
        Self::ALL
            .iter()
            .copied()
            .filter(|kind| kind.shape() == EntityShape::Trunk)
    }
}

wire_enum! {
    /// Why an entity became archived.
    pub enum ArchivalReason {
        User => "user",
        Gc => "gc",
        Sync => "sync",
    }
}

wire_enum! {
    /// Where a domain mutation originated.
    pub enum EventSource {
        Cli => "cli",
        Web => "web",
        Gc => "gc",
        Gen => "gen",
        Sync => "sync",
    }
}

wire_enum! {
    pub enum JournalSource {
        User => "user",
        Generated => "generated",
    }
}

impl JournalSource {
    /// Accepts the historical `recurring` spelling of `generated`.
    pub fn from_stored(raw: &str) -> Result<Self, InputValidationError> {
        match raw {
            "recurring" => Ok(Self::Generated),
            other => Self::from_raw(other),
        }
    }
}

impl SourceDiscriminator for JournalSource {
    fn allow_user_changes(self) -> bool {
        matches!(self, Self::User)
    }
}

wire_enum! {
    pub enum TimePlanSource {
        User => "user",
        Generated => "generated",
    }
}

impl TimePlanSource {
    pub fn from_stored(raw: &str) -> Result<Self, InputValidationError> {
        match raw {
            "recurring" => Ok(Self::Generated),
            other => Self::from_raw(other),
        }
    }
}

impl SourceDiscriminator for TimePlanSource {
    fn allow_user_changes(self) -> bool {
        matches!(self, Self::User)
    }
}

wire_enum! {
    pub enum CalendarEventSource {
        User => "user",
        PersonBirthday => "person-birthday",
        Vacation => "vacation",
    }
}

impl SourceDiscriminator for CalendarEventSource {
    fn allow_user_changes(self) -> bool {
        matches!(self, Self::User)
    }
}

wire_enum! {
    pub enum ScheduleStreamSource {
        User => "user",
        ExternalIcal => "external-ical",
    }
}

impl SourceDiscriminator for ScheduleStreamSource {
    fn allow_user_changes(self) -> bool {
        matches!(self, Self::User)
    }
}

wire_enum! {
    pub enum CalendarStreamSource {
        User => "user",
        ExternalIcal => "external-ical",
    }
}

impl SourceDiscriminator for CalendarStreamSource {
    fn allow_user_changes(self) -> bool {
        matches!(self, Self::User)
    }
}

wire_enum! {
    /// Where an inbox task came from. Generated tasks keep their definition
    /// in sync with the generator, so users may only move them through statuses.
    pub enum InboxTaskSource {
        User => "user",
        Habit => "habit",
        BigPlan => "big-plan",
    }
}

impl SourceDiscriminator for InboxTaskSource {
    fn allow_user_changes(self) -> bool {
        matches!(self, Self::User | Self::BigPlan)
    }
}

wire_enum! {
    pub enum InboxTaskStatus {
        Accepted => "accepted",
        Recurring => "recurring",
        InProgress => "in-progress",
        Blocked => "blocked",
        NotDone => "not-done",
        Done => "done",
    }
}

impl InboxTaskStatus {
    /// Storage loader: rows written before the rename still say `not-started`.
    pub fn from_stored(raw: &str) -> Result<Self, InputValidationError> {
        match raw {
            "not-started" => Ok(Self::Accepted),
            other => Self::from_raw(other),
        }
    }

    pub fn is_completed(self) -> bool {
        matches!(self, Self::Done | Self::NotDone)
    }

    pub fn is_working(self) -> bool {
        matches!(self, Self::InProgress | Self::Blocked)
    }
}

wire_enum! {
    pub enum BigPlanStatus {
        Accepted => "accepted",
        InProgress => "in-progress",
        Blocked => "blocked",
        NotDone => "not-done",
        Done => "done",
    }
}

impl BigPlanStatus {
    pub fn from_stored(raw: &str) -> Result<Self, InputValidationError> {
        match raw {
            "not-started" => Ok(Self::Accepted),
            other => Self::from_raw(other),
        }
    }

    pub fn is_completed(self) -> bool {
        matches!(self, Self::Done | Self::NotDone)
    }

    pub fn is_working(self) -> bool {
        matches!(self, Self::InProgress | Self::Blocked)
    }
}

wire_enum! {
    /// The unit habits repeat in and journals/time plans cover.
    pub enum RecurringTaskPeriod {
        Daily => "daily",
        Weekly => "weekly",
        Monthly => "monthly",
        Quarterly => "quarterly",
        Yearly => "yearly",
    }
}

wire_enum! {
    /// Recurring generation policy for habits.
    pub enum HabitRepeatsStrategy {
        AllSame => "all-same",
        SpreadOutNoOverlap => "spread-out-no-overlap",
    }
}

wire_enum! {
    /// Polymorphic attachment tag for notes.
    pub enum NoteDomain {
        Doc => "doc",
        InboxTask => "inbox-task",
        MetricEntry => "metric-entry",
        Person => "person",
        Log => "log",
    }
}

wire_enum! {
    /// Who owns a note. Non-user sources attach exactly one note per source entity.
    pub enum NoteSource {
        User => "user",
        Doc => "doc",
        InboxTask => "inbox-task",
        MetricEntry => "metric-entry",
        Person => "person",
        Log => "log",
    }
}

impl NoteSource {
    /// The domain a non-user note is bound to.
    pub fn domain(self) -> Option<NoteDomain> {
        match self {
            Self::User => None,
            Self::Doc => Some(NoteDomain::Doc),
            Self::InboxTask => Some(NoteDomain::InboxTask),
            Self::MetricEntry => Some(NoteDomain::MetricEntry),
            Self::Person => Some(NoteDomain::Person),
            Self::Log => Some(NoteDomain::Log),
        }
    }
}

wire_enum! {
    pub enum TimePlanActivityTarget {
        InboxTask => "inbox-task",
        BigPlan => "big-plan",
    }
}

wire_enum! {
    pub enum TimePlanActivityDoneness {
        Done => "done",
        NotDone => "not-done",
        Working => "working",
    }
}

wire_enum! {
    pub enum TimePlanActivityFeasability {
        MustDo => "must-do",
        NiceToHave => "nice-to-have",
        Stretch => "stretch",
    }
}

wire_enum! {
    /// Aggregation axis for reports.
    pub enum ReportBreakdown {
        Global => "global",
        Periods => "periods",
        Projects => "projects",
        Habits => "habits",
        Chores => "chores",
        BigPlans => "big-plans",
    }
}

wire_enum! {
    /// Deployment mode.
    pub enum Hosting {
        HostedGlobal => "hosted-global",
        SelfHosted => "self-hosted",
        Local => "local",
    }
}

wire_enum! {
    /// Runtime environment.
    pub enum Env {
        Production => "production",
        Staging => "staging",
        Local => "local",
    }
}

wire_enum! {
    /// Toggleable workspace features, persisted as a JSON object on the workspace.
    pub enum WorkspaceFeature {
        InboxTasks => "inbox-tasks",
        Habits => "habits",
        BigPlans => "big-plans",
        Journals => "journals",
        Notes => "notes",
        WorkingMem => "working-mem",
        SmartLists => "smart-lists",
        TimePlans => "time-plans",
        Schedule => "schedule",
    }
}
