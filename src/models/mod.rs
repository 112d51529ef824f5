//! Domain models for lifeplan.
//!
//! # Core Concepts
//!
//! ## Shapes
//!
//! Every persisted object is an [`Entity`] of one fixed shape:
//!
//! - Roots: [`User`], [`Workspace`].
//! - Stub: [`Auth`], one per user.
//! - Trunks: the workspace collections ([`ProjectCollection`], [`JournalCollection`], ...),
//!   exactly one live per workspace.
//! - Branches: [`SmartList`], [`TimePlan`], [`ScheduleStream`].
//! - Leaves: [`Project`], [`Habit`], [`InboxTask`], [`BigPlan`], [`Journal`], [`Note`],
//!   [`SmartListItem`], [`TimePlanActivity`], [`ScheduleEvent`], [`GcLogEntry`].
//!
//! ## Sources
//!
//! Entities that can be produced by a generator or an import carry a source
//! enum implementing [`SourceDiscriminator`]. Fields owned by the generator
//! reject user edits with [`DomainError::ImmutableSource`].

mod big_plan;
mod collections;
mod entity;
mod enums;
mod gc_log;
mod habit;
mod inbox_task;
mod journal;
mod note;
mod period;
mod project;
mod schedule;
mod smart_list;
mod time_plan;
mod values;
mod workspace;

pub use big_plan::*;
pub use collections::*;
pub use entity::*;
pub use enums::*;
pub use gc_log::*;
pub use habit::*;
pub use inbox_task::*;
pub use journal::*;
pub use note::*;
pub use project::*;
pub use schedule::*;
pub use smart_list::*;
pub use time_plan::*;
pub use values::*;
pub use workspace::*;
