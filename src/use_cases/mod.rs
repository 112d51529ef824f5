//! Use cases: the operations callers run against a workspace.
//!
//! Each use case is a unit struct implementing [`UseCase`] plus exactly one
//! execution flavour ([`MutationUseCase`], [`ReadonlyUseCase`],
//! [`LoggedInMutationUseCase`], [`LoggedInReadonlyUseCase`] or
//! [`LoggedInBatchUseCase`]). [`UseCaseEnv`] runs them, owning the unit of
//! work, the session check and the post-commit side effects.

mod big_plans;
mod contract;
mod error;
mod gc;
mod habits;
mod inbox_tasks;
mod journals;
mod notes;
mod periodic;
mod projects;
mod schedule;
mod smart_lists;
mod time_plans;
mod workspace;

pub use big_plans::*;
pub use contract::*;
pub use error::{UseCaseError, UseCaseResult};
pub use gc::*;
pub use habits::*;
pub use inbox_tasks::*;
pub use journals::*;
pub use notes::*;
pub use periodic::*;
pub use projects::*;
pub use schedule::*;
pub use smart_lists::*;
pub use time_plans::*;
pub use workspace::*;
