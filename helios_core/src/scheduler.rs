//! Timezone-aware recurring sync scheduler.
//!
//! A single timer drives ticks on wall-clock minute boundaries. Each tick,
//! every organization with auto-sync enabled whose interval boundary matches
//! the current minute is evaluated against the restricted window in the
//! configured reference timezone; eligible organizations are handed to the
//! orchestrator. Manual triggers never pass through here and are therefore
//! never gated by the window.

use crate::models::{OrgId, SyncSummary, SyncTrigger};
use crate::store::SyncSettingsStore;
use crate::sync::SyncOrchestrator;
use crate::{Error, Result};
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, NaiveTime, Timelike, Utc};
use futures::future::join_all;
use std::sync::Arc;

/// A time-of-day range during which automatic sync is suppressed.
///
/// When `start > end` the window spans midnight.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RestrictedWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Default for RestrictedWindow {
    fn default() -> Self {
        // 19:00-06:00 local: overnight quiet hours.
        Self {
            start: NaiveTime::from_hms_opt(19, 0, 0).expect("valid time"),
            end: NaiveTime::from_hms_opt(6, 0, 0).expect("valid time"),
        }
    }
}

impl RestrictedWindow {
    /// Membership test: start is inclusive, end is exclusive.
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.start > self.end {
            t >= self.start || t < self.end
        } else {
            t >= self.start && t < self.end
        }
    }

    /// The next instant at or after `now` that falls outside the window.
    pub fn next_end_after(&self, now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        if !self.contains(now.time()) {
            return now;
        }
        let today_end = now.date_naive().and_time(self.end);
        let candidate = match today_end.and_local_timezone(*now.offset()) {
            chrono::LocalResult::Single(t) => t,
            _ => now,
        };
        if candidate > now {
            candidate
        } else {
            candidate + ChronoDuration::days(1)
        }
    }
}

/// Whether the interval boundary matches this minute (e.g. interval 15
/// fires at minutes 0/15/30/45 of each hour).
pub fn interval_boundary_matches(now: DateTime<FixedOffset>, interval_minutes: u32) -> bool {
    if interval_minutes == 0 {
        return false;
    }
    let minute_of_day = now.hour() * 60 + now.minute();
    minute_of_day % interval_minutes == 0
}

/// The next interval boundary strictly after `now`.
pub fn next_interval_boundary(
    now: DateTime<FixedOffset>,
    interval_minutes: u32,
) -> DateTime<FixedOffset> {
    let interval = interval_minutes.max(1);
    let minute_of_day = now.hour() * 60 + now.minute();
    let next = ((minute_of_day / interval) + 1) * interval;
    let midnight = now
        .with_hour(0)
        .and_then(|t| t.with_minute(0))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    midnight + ChronoDuration::minutes(i64::from(next))
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Global kill switch for automatic sync.
    pub enabled: bool,
    pub window: RestrictedWindow,
    /// Fixed reference timezone the window is evaluated in.
    pub timezone: FixedOffset,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: RestrictedWindow::default(),
            timezone: FixedOffset::east_opt(0).expect("utc offset"),
        }
    }
}

/// What the scheduler decided for one organization on one tick.
#[derive(Debug)]
pub enum TickAction {
    /// Interval boundary matched and the window allowed it.
    Ran(SyncSummary),
    /// Interval boundary matched but the restricted window suppressed it.
    Restricted { next_eligible: DateTime<FixedOffset> },
    /// Not on an interval boundary this minute.
    NotDue,
    /// The orchestrator run itself failed.
    Failed(Error),
}

#[derive(Debug)]
pub struct TickOutcome {
    pub org_id: OrgId,
    pub action: TickAction,
}

pub struct SyncScheduler {
    settings: Arc<dyn SyncSettingsStore>,
    orchestrator: Arc<SyncOrchestrator>,
    config: SchedulerConfig,
}

impl SyncScheduler {
    pub fn new(
        settings: Arc<dyn SyncSettingsStore>,
        orchestrator: Arc<SyncOrchestrator>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            settings,
            orchestrator,
            config,
        }
    }

    /// Evaluate one clock tick at `now` for every organization.
    ///
    /// There is no cross-tick mutual exclusion here; the orchestrator's
    /// per-vendor single-flight guard is what prevents overlapping runs
    /// against the same vendor.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<Vec<TickOutcome>> {
        if !self.config.enabled {
            return Ok(Vec::new());
        }
        let local = now.with_timezone(&self.config.timezone);

        let mut outcomes = Vec::new();
        let mut due = Vec::new();
        for settings in self.settings.list_settings().await? {
            if !settings.auto_sync_enabled {
                continue;
            }
            if !interval_boundary_matches(local, settings.interval_minutes) {
                outcomes.push(TickOutcome {
                    org_id: settings.org_id,
                    action: TickAction::NotDue,
                });
                continue;
            }

            if self.config.window.contains(local.time()) {
                let next_eligible = self.config.window.next_end_after(local);
                tracing::info!(
                    org_id = %settings.org_id,
                    next_eligible = %next_eligible.format("%Y-%m-%d %H:%M %:z"),
                    "inside restricted window, automatic sync skipped"
                );
                outcomes.push(TickOutcome {
                    org_id: settings.org_id,
                    action: TickAction::Restricted { next_eligible },
                });
                continue;
            }

            due.push(settings.org_id);
        }

        // Due organizations fan out concurrently; overlap against the same
        // vendor is handled by the orchestrator's single-flight guard.
        let ran = join_all(due.into_iter().map(|org_id| async move {
            let action = match self
                .orchestrator
                .sync_org(org_id, SyncTrigger::Scheduled)
                .await
            {
                Ok(summary) => TickAction::Ran(summary),
                Err(e) => {
                    tracing::warn!(org_id = %org_id, error = %e, "scheduled sync failed");
                    TickAction::Failed(e)
                }
            };
            TickOutcome { org_id, action }
        }))
        .await;
        outcomes.extend(ran);
        Ok(outcomes)
    }

    /// Human-readable next eligible sync time for an organization, for the
    /// status surface: the window end when currently restricted, otherwise
    /// the next interval boundary.
    pub fn next_eligible_at(
        &self,
        now: DateTime<Utc>,
        interval_minutes: u32,
    ) -> DateTime<FixedOffset> {
        let local = now.with_timezone(&self.config.timezone);
        if self.config.window.contains(local.time()) {
            self.config.window.next_end_after(local)
        } else {
            next_interval_boundary(local, interval_minutes)
        }
    }

    /// Fire ticks on wall-clock minute boundaries until the task is
    /// cancelled. Tick errors are logged and do not stop scheduling.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn run_loop(&self) {
        loop {
            let now = Utc::now();
            let next_minute = (now + ChronoDuration::minutes(1))
                .with_second(0)
                .and_then(|t| t.with_nanosecond(0))
                .unwrap_or(now + ChronoDuration::minutes(1));
            let sleep_for = (next_minute - now)
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(60));
            tokio::time::sleep(sleep_for).await;

            if let Err(e) = self.tick(Utc::now()).await {
                tracing::warn!(error = %e, "scheduler tick failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn local(h: u32, m: u32) -> DateTime<FixedOffset> {
        let tz = FixedOffset::east_opt(0).unwrap();
        chrono::NaiveDate::from_ymd_opt(2024, 6, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
            .and_local_timezone(tz)
            .single()
            .unwrap()
    }

    #[test]
    fn window_start_inclusive_end_exclusive() {
        let w = RestrictedWindow::default(); // 19:00-06:00
        assert!(w.contains(t(19, 0)));
        assert!(!w.contains(t(6, 0)));
    }

    #[test]
    fn midnight_spanning_window_membership() {
        let w = RestrictedWindow::default();
        assert!(w.contains(t(23, 30)));
        assert!(w.contains(t(2, 0)));
        assert!(!w.contains(t(9, 0)));
        assert!(!w.contains(t(18, 59)));
    }

    #[test]
    fn same_day_window_membership() {
        let w = RestrictedWindow {
            start: t(12, 0),
            end: t(14, 0),
        };
        assert!(w.contains(t(12, 0)));
        assert!(w.contains(t(13, 59)));
        assert!(!w.contains(t(14, 0)));
        assert!(!w.contains(t(11, 59)));
    }

    #[test]
    fn interval_15_fires_on_quarter_hours() {
        for minute in [0, 15, 30, 45] {
            assert!(interval_boundary_matches(local(10, minute), 15));
        }
        assert!(!interval_boundary_matches(local(10, 7), 15));
    }

    #[test]
    fn interval_uses_minute_of_day() {
        // 90-minute interval: 00:00, 01:30, 03:00, ...
        assert!(interval_boundary_matches(local(1, 30), 90));
        assert!(interval_boundary_matches(local(3, 0), 90));
        assert!(!interval_boundary_matches(local(1, 0), 90));
    }

    #[test]
    fn next_boundary_is_strictly_in_the_future() {
        let next = next_interval_boundary(local(10, 15), 15);
        assert_eq!(next, local(10, 30));
        let next = next_interval_boundary(local(10, 16), 15);
        assert_eq!(next, local(10, 30));
    }

    #[test]
    fn next_end_crosses_midnight_when_needed() {
        let w = RestrictedWindow::default();
        // 23:30 is restricted; the window ends at 06:00 the next day.
        let next = w.next_end_after(local(23, 30));
        assert_eq!(next.time(), t(6, 0));
        assert_eq!(next.date_naive(), local(23, 30).date_naive() + ChronoDuration::days(1));
        // 02:00 is restricted; the window ends at 06:00 the same day.
        let next = w.next_end_after(local(2, 0));
        assert_eq!(next.time(), t(6, 0));
        assert_eq!(next.date_naive(), local(2, 0).date_naive());
        // Already eligible: unchanged.
        assert_eq!(w.next_end_after(local(9, 0)), local(9, 0));
    }
}
