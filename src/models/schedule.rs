use serde::Serialize;
use serde_json::json;

use super::entity::*;
use super::enums::{EntityKind, ScheduleStreamSource};
use super::values::{ADate, EntityName, InputValidationError};

/// A calendar-like stream of events, either kept by hand or imported from
/// an external iCal feed.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleStream {
    pub(crate) core: EntityCore,
    pub(crate) schedule_domain: ParentLink,
    pub(crate) source: ScheduleStreamSource,
    pub(crate) name: EntityName,
    pub(crate) source_ical_url: Option<String>,
}

impl ScheduleStream {
    pub fn new_schedule_stream_for_user(
        ctx: &DomainContext,
        schedule_domain: ParentLink,
        name: EntityName,
    ) -> DomainResult<Self> {
        Self::build(ctx, schedule_domain, ScheduleStreamSource::User, name, None)
    }

    pub fn new_schedule_stream_from_ical(
        ctx: &DomainContext,
        schedule_domain: ParentLink,
        name: EntityName,
        source_ical_url: String,
    ) -> DomainResult<Self> {
        if !source_ical_url.starts_with("http://") && !source_ical_url.starts_with("https://") {
            return Err(InputValidationError::new(format!(
                "invalid iCal url `{source_ical_url}`"
            ))
            .into());
        }
        Self::build(
            ctx,
            schedule_domain,
            ScheduleStreamSource::ExternalIcal,
            name,
            Some(source_ical_url),
        )
    }

    fn build(
        ctx: &DomainContext,
        schedule_domain: ParentLink,
        source: ScheduleStreamSource,
        name: EntityName,
        source_ical_url: Option<String>,
    ) -> DomainResult<Self> {
        let schedule_domain = schedule_domain.expect_kind(EntityKind::ScheduleDomain)?;
        let core = EntityCore::new_live(
            ctx,
            "new_schedule_stream",
            json!({ "source": source, "name": name, "source_ical_url": source_ical_url }),
        );
        Ok(Self {
            core,
            schedule_domain,
            source,
            name,
            source_ical_url,
        })
    }

    pub fn source(&self) -> ScheduleStreamSource {
        self.source
    }

    pub fn name(&self) -> &EntityName {
        &self.name
    }

    pub fn source_ical_url(&self) -> Option<&str> {
        self.source_ical_url.as_deref()
    }

    pub fn update_name(&mut self, ctx: &DomainContext, name: EntityName) -> DomainResult<()> {
        self.ensure_live()?;
        ensure_user_changes(Self::KIND, self.ref_id(), self.source, "name")?;
        self.core.touch(ctx, "update_name", json!({ "name": name }));
        self.name = name;
        Ok(())
    }
}

impl Entity for ScheduleStream {
    const KIND: EntityKind = EntityKind::ScheduleStream;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn parent(&self) -> Option<ParentLink> {
        Some(self.schedule_domain)
    }
}

impl BranchEntity for ScheduleStream {
    fn parent_link(&self) -> ParentLink {
        self.schedule_domain
    }
}

/// A dated event. Imported events carry the feed's `external_uid`, which
/// is unique within their stream.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleEvent {
    pub(crate) core: EntityCore,
    pub(crate) schedule_stream: ParentLink,
    pub(crate) source: ScheduleStreamSource,
    pub(crate) name: EntityName,
    pub(crate) start_date: ADate,
    pub(crate) end_date: ADate,
    pub(crate) external_uid: Option<String>,
}

fn check_dates(start_date: ADate, end_date: ADate) -> Result<(), InputValidationError> {
    if end_date < start_date {
        return Err(InputValidationError::new(format!(
            "event ends on {end_date}, before it starts on {start_date}"
        )));
    }
    Ok(())
}

impl ScheduleEvent {
    pub fn new_schedule_event(
        ctx: &DomainContext,
        stream: &ScheduleStream,
        name: EntityName,
        start_date: ADate,
        end_date: ADate,
        external_uid: Option<String>,
    ) -> DomainResult<Self> {
        let schedule_stream = stream.live_link()?;
        check_dates(start_date, end_date)?;
        if stream.source() == ScheduleStreamSource::ExternalIcal && external_uid.is_none() {
            return Err(InputValidationError::new("imported events need an external uid").into());
        }
        let core = EntityCore::new_live(
            ctx,
            "new_schedule_event",
            json!({
                "name": name,
                "start_date": start_date,
                "end_date": end_date,
                "external_uid": external_uid,
            }),
        );
        Ok(Self {
            core,
            schedule_stream,
            source: stream.source(),
            name,
            start_date,
            end_date,
            external_uid,
        })
    }

    pub fn source(&self) -> ScheduleStreamSource {
        self.source
    }

    pub fn name(&self) -> &EntityName {
        &self.name
    }

    pub fn start_date(&self) -> ADate {
        self.start_date
    }

    pub fn end_date(&self) -> ADate {
        self.end_date
    }

    pub fn external_uid(&self) -> Option<&str> {
        self.external_uid.as_deref()
    }

    pub fn update(
        &mut self,
        ctx: &DomainContext,
        name: EntityName,
        start_date: ADate,
        end_date: ADate,
    ) -> DomainResult<()> {
        self.ensure_live()?;
        ensure_user_changes(Self::KIND, self.ref_id(), self.source, "name")?;
        check_dates(start_date, end_date)?;
        self.core.touch(
            ctx,
            "update",
            json!({ "name": name, "start_date": start_date, "end_date": end_date }),
        );
        self.name = name;
        self.start_date = start_date;
        self.end_date = end_date;
        Ok(())
    }

    /// Sync path: applies the feed's current view of the event.
    pub(crate) fn refresh_from_feed(
        &mut self,
        ctx: &DomainContext,
        name: EntityName,
        start_date: ADate,
        end_date: ADate,
    ) -> DomainResult<bool> {
        self.ensure_live()?;
        check_dates(start_date, end_date)?;
        if self.name == name && self.start_date == start_date && self.end_date == end_date {
            return Ok(false);
        }
        self.core.touch(
            ctx,
            "refresh_from_feed",
            json!({ "name": name, "start_date": start_date, "end_date": end_date }),
        );
        self.name = name;
        self.start_date = start_date;
        self.end_date = end_date;
        Ok(true)
    }
}

impl Entity for ScheduleEvent {
    const KIND: EntityKind = EntityKind::ScheduleEvent;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn parent(&self) -> Option<ParentLink> {
        Some(self.schedule_stream)
    }
}

impl LeafEntity for ScheduleEvent {
    fn parent_link(&self) -> ParentLink {
        self.schedule_stream
    }

    fn parent_link_mut(&mut self) -> &mut ParentLink {
        &mut self.schedule_stream
    }
}
