//! Reconciles an imported feed into an external-iCal schedule stream.
//!
//! Fetching and parsing the feed happens elsewhere; this works on the
//! already-parsed events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::archive::ArchiveService;
use crate::db::{
    EntityFilter, LeafEntityRepository, Repositories, ScheduleEventRepository, StoreResult,
};
use crate::models::*;

/// One event as the external feed lists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEvent {
    pub uid: String,
    pub name: EntityName,
    pub start_date: ADate,
    pub end_date: ADate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub created: u32,
    pub updated: u32,
    pub unchanged: u32,
    pub archived: u32,
}

pub struct ScheduleSyncService<'r, R> {
    repos: &'r R,
    ctx: DomainContext,
}

impl<'r, R: Repositories> ScheduleSyncService<'r, R> {
    pub fn new(repos: &'r R, ctx: DomainContext) -> Self {
        Self { repos, ctx }
    }

    /// Upserts every listed event by uid and archives, with reason `sync`,
    /// the live events the feed no longer lists. A uid listed twice keeps
    /// its last occurrence.
    pub fn sync(&self, stream: &ScheduleStream, feed: Vec<FeedEvent>) -> StoreResult<SyncSummary> {
        if stream.source() != ScheduleStreamSource::ExternalIcal {
            return Err(DomainError::InvalidState(format!(
                "schedule stream {} is not imported from a feed",
                stream.ref_id()
            ))
            .into());
        }
        stream.ensure_live()?;

        let listed: BTreeMap<String, FeedEvent> =
            feed.into_iter().map(|e| (e.uid.clone(), e)).collect();
        let repository = self.repos.repository::<ScheduleEvent>();
        let mut summary = SyncSummary::default();

        for event in listed.values() {
            match repository.load_by_external_uid(stream.ref_id(), &event.uid)? {
                Some(mut existing) => {
                    if existing.refresh_from_feed(
                        &self.ctx,
                        event.name.clone(),
                        event.start_date,
                        event.end_date,
                    )? {
                        repository.save(existing)?;
                        summary.updated += 1;
                    } else {
                        summary.unchanged += 1;
                    }
                }
                None => {
                    let created = ScheduleEvent::new_schedule_event(
                        &self.ctx,
                        stream,
                        event.name.clone(),
                        event.start_date,
                        event.end_date,
                        Some(event.uid.clone()),
                    )?;
                    repository.create(created)?;
                    summary.created += 1;
                }
            }
        }

        let mut archiver = ArchiveService::new(self.repos, self.ctx, ArchivalReason::Sync);
        let live = repository.find_all_with_filters(stream.ref_id(), &EntityFilter::live())?;
        for event in live {
            let listed_again = matches!(event.external_uid(), Some(uid) if listed.contains_key(uid));
            if !listed_again {
                archiver.archive_entity(event)?;
                summary.archived += 1;
            }
        }

        tracing::info!(
            stream = %stream.ref_id(),
            created = summary.created,
            updated = summary.updated,
            archived = summary.archived,
            "Schedule stream synced"
        );
        Ok(summary)
    }
}
