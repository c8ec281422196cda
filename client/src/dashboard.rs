//! Role-scoped dashboard summary.
//!
//! Built from the event list the server returns, so the view always reflects
//! live data. Members see upcoming approved events; core members also see
//! their own proposals grouped by status; admins also see the pending queue.

use models::{Event, EventStatus, Role, User};
use serde::Serialize;
use time::OffsetDateTime;

/// The signed-in user's own events, split by lifecycle status.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProposalSummary {
    pub pending: Vec<Event>,
    pub approved: Vec<Event>,
    pub archived: Vec<Event>,
}

impl ProposalSummary {
    #[must_use]
    pub fn total(&self) -> usize {
        self.pending.len() + self.approved.len() + self.archived.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub user: User,
    /// Approved events that have not started yet, soonest first.
    pub upcoming: Vec<Event>,
    /// Present for core members and admins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_proposals: Option<ProposalSummary>,
    /// Present for admins: every pending event, oldest submission first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_queue: Option<Vec<Event>>,
}

impl Dashboard {
    #[must_use]
    pub fn build(user: User, events: &[Event], now: OffsetDateTime) -> Self {
        let mut upcoming: Vec<Event> = events
            .iter()
            .filter(|e| e.status == EventStatus::Approved && e.start_time >= now)
            .cloned()
            .collect();
        upcoming.sort_by_key(|e| (e.start_time, e.id));

        let my_proposals = user.role.is_core().then(|| proposals_of(&user, events));

        let approval_queue = user.role.is_admin().then(|| {
            let mut queue: Vec<Event> = events.iter().filter(|e| e.is_proposal()).cloned().collect();
            queue.sort_by_key(|e| (e.created_at, e.id));
            queue
        });

        Self { user, upcoming, my_proposals, approval_queue }
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.user.role
    }
}

fn proposals_of(user: &User, events: &[Event]) -> ProposalSummary {
    let mut summary = ProposalSummary::default();
    let mut mine: Vec<&Event> = events.iter().filter(|e| e.organizer_id == user.id).collect();
    mine.sort_by_key(|e| (e.start_time, e.id));
    for event in mine {
        let bucket = match event.status {
            EventStatus::Pending => &mut summary.pending,
            EventStatus::Approved => &mut summary.approved,
            EventStatus::Archived => &mut summary.archived,
        };
        bucket.push(event.clone());
    }
    summary
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
