//! The one range controller behind both the calendar and the picker widget.

use std::fmt;

use anyhow::Context;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tracing::{debug, info, instrument, warn};

use crate::calendar::{roll_month, shift_month};
use crate::codec::{decode, encode};
use crate::error::RangeError;
use crate::filter::{FieldDescriptor, IntervalFilter, filter_action, find_date_field};
use crate::grid::{MonthGrid, build_grid};
use crate::host::{FilterHost, SharedStore};
use crate::range::{RangeToken, ResolvedRange, resolve, resolve_custom};
use crate::tracker::{FilterState, RangeChangeTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Calendar,
    DatePicker,
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Calendar => f.write_str("calendar"),
            Self::DatePicker => f.write_str("date-picker"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub shared_key: String,
    pub date_role: String,
    pub default_token: RangeToken,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            shared_key: "sharedDateRange.dateString".to_string(),
            date_role: crate::filter::DEFAULT_DATE_ROLE.to_string(),
            default_token: RangeToken::ThisYear,
        }
    }
}

/// Which end of a custom range a clicked day replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomBound {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing persisted under the shared key.
    Empty,
    /// Text matches what this controller last wrote or read.
    Unchanged,
    /// Text could not be decoded; the current range was kept.
    Ignored(RangeError),
    Applied(ResolvedRange),
}

#[derive(Debug, Clone)]
pub struct RangeController {
    kind: WidgetKind,
    settings: ControllerSettings,
    anchor_year: i32,
    anchor_month0: u32,
    tracker: RangeChangeTracker,
    last_shared_text: Option<String>,
    date_field: Option<FieldDescriptor>,
}

impl RangeController {
    pub fn new(kind: WidgetKind, settings: ControllerSettings, today: NaiveDate) -> Self {
        let (anchor_year, anchor_month0) = roll_month(today.year(), today.month0() as i32);
        Self {
            kind,
            settings,
            anchor_year,
            anchor_month0,
            tracker: RangeChangeTracker::new(),
            last_shared_text: None,
            date_field: None,
        }
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn current(&self) -> Option<&ResolvedRange> {
        self.tracker.current()
    }

    pub fn filter_state(&self) -> FilterState {
        self.tracker.state()
    }

    pub fn anchor(&self) -> (i32, u32) {
        (self.anchor_year, self.anchor_month0)
    }

    pub fn date_field(&self) -> Option<&FieldDescriptor> {
        self.date_field.as_ref()
    }

    pub fn last_shared_text(&self) -> Option<&str> {
        self.last_shared_text.as_deref()
    }

    /// Binds the first column carrying the configured temporal role.
    #[instrument(skip(self, columns), fields(widget = %self.kind))]
    pub fn bind_fields(&mut self, columns: &[FieldDescriptor]) -> Result<&FieldDescriptor, RangeError> {
        let field = find_date_field(columns, &self.settings.date_role)?.clone();
        debug!(query_name = %field.query_name, "bound date field");
        Ok(self.date_field.insert(field))
    }

    /// Resolves `token` and publishes the result. On error nothing changes.
    #[instrument(skip(self, token, now, store, host), fields(widget = %self.kind, token = %token))]
    pub fn apply_token(
        &mut self,
        token: &RangeToken,
        now: NaiveDateTime,
        store: &mut dyn SharedStore,
        host: &mut dyn FilterHost,
    ) -> anyhow::Result<ResolvedRange> {
        let range = resolve(token, now, self.current())?;
        self.commit(range.clone(), !token.is_custom(), store, host)?;
        Ok(range)
    }

    /// Custom bounds keep the displayed month where the user left it.
    #[instrument(skip(self, store, host), fields(widget = %self.kind))]
    pub fn apply_custom(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        store: &mut dyn SharedStore,
        host: &mut dyn FilterHost,
    ) -> anyhow::Result<ResolvedRange> {
        let range = resolve_custom(start, end)?;
        self.commit(range.clone(), false, store, host)?;
        Ok(range)
    }

    /// Replaces one end of the current range with a clicked day. If that
    /// would invert the range, the other end collapses onto the same day.
    pub fn pick_day(
        &mut self,
        date: NaiveDate,
        bound: CustomBound,
        store: &mut dyn SharedStore,
        host: &mut dyn FilterHost,
    ) -> anyhow::Result<ResolvedRange> {
        let (start, end) = match (self.current(), bound) {
            (Some(cur), CustomBound::Start) if date <= cur.end_day() => (date, cur.end_day()),
            (Some(cur), CustomBound::End) if date >= cur.start_day() => (cur.start_day(), date),
            _ => (date, date),
        };
        self.apply_custom(start, end, store, host)
    }

    pub fn navigate(&mut self, step: i32) {
        let (year, month0) = shift_month(self.anchor_year, self.anchor_month0, step);
        self.anchor_year = year;
        self.anchor_month0 = month0;
        debug!(widget = %self.kind, year, month0, "navigated");
    }

    pub fn go_to(&mut self, year: i32, month0: i32) {
        let (year, month0) = roll_month(year, month0);
        self.anchor_year = year;
        self.anchor_month0 = month0;
    }

    pub fn grid(&self, today: NaiveDate) -> MonthGrid {
        build_grid(
            self.anchor_year,
            self.anchor_month0 as i32,
            self.current(),
            today,
        )
    }

    /// Adopts whatever another instance persisted, unless it is the text
    /// this controller already knows about.
    #[instrument(skip(self, store, host), fields(widget = %self.kind))]
    pub fn sync_from_shared(
        &mut self,
        store: &mut dyn SharedStore,
        host: &mut dyn FilterHost,
    ) -> anyhow::Result<SyncOutcome> {
        let Some(text) = store
            .read(&self.settings.shared_key)
            .context("failed reading shared state")?
        else {
            return Ok(SyncOutcome::Empty);
        };

        if self.last_shared_text.as_deref() == Some(text.as_str()) {
            debug!("shared state unchanged");
            return Ok(SyncOutcome::Unchanged);
        }

        let range = match decode(&text) {
            Ok(range) => range,
            Err(err) => {
                warn!(error = %err, "ignoring malformed shared state");
                self.last_shared_text = Some(text);
                return Ok(SyncOutcome::Ignored(err));
            }
        };

        info!(shared = %text, "adopting shared range");
        self.last_shared_text = Some(text);
        self.anchor_year = range.anchor_year();
        self.anchor_month0 = range.anchor_month0();
        self.tracker.record(range.clone());
        self.dispatch(host)?;
        Ok(SyncOutcome::Applied(range))
    }

    /// One host update cycle.
    ///
    /// The first cycle adopts an already persisted range if there is a
    /// valid one and falls back to the configured default token otherwise.
    /// Later cycles only pick up shared-state changes and retry a filter
    /// that could not be dispatched earlier.
    #[instrument(skip_all, fields(widget = %self.kind))]
    pub fn update(
        &mut self,
        columns: &[FieldDescriptor],
        now: NaiveDateTime,
        store: &mut dyn SharedStore,
        host: &mut dyn FilterHost,
    ) -> anyhow::Result<()> {
        if columns.is_empty() {
            debug!("no columns in update; skipping");
            return Ok(());
        }

        if self.date_field.is_none() {
            self.bind_fields(columns)?;
        }

        if self.tracker.state() == FilterState::Uninitialized {
            if let SyncOutcome::Applied(range) = self.sync_from_shared(store, host)? {
                debug!(start = %range.start_date(), "initialized from shared state");
                return Ok(());
            }
            let token = self.settings.default_token;
            self.apply_token(&token, now, store, host)?;
            return Ok(());
        }

        self.sync_from_shared(store, host)?;

        if self.tracker.state() == FilterState::AwaitingFilter {
            self.dispatch(host)?;
        }
        Ok(())
    }

    fn commit(
        &mut self,
        range: ResolvedRange,
        adopt_anchor: bool,
        store: &mut dyn SharedStore,
        host: &mut dyn FilterHost,
    ) -> anyhow::Result<()> {
        if adopt_anchor {
            self.anchor_year = range.anchor_year();
            self.anchor_month0 = range.anchor_month0();
        }

        let text = encode(&range);
        store
            .write(&self.settings.shared_key, &text)
            .context("failed writing shared state")?;
        debug!(shared = %text, "published shared state");
        self.last_shared_text = Some(text);

        self.tracker.record(range);
        self.dispatch(host)?;
        Ok(())
    }

    /// Issues the filter when the tracker asks for one. Without a bound
    /// date field the tracker stays in `AwaitingFilter`.
    fn dispatch(&mut self, host: &mut dyn FilterHost) -> anyhow::Result<bool> {
        if !self.tracker.poll() {
            debug!("range unchanged since last filter");
            return Ok(false);
        }

        let (Some(field), Some(range)) = (self.date_field.as_ref(), self.tracker.current()) else {
            warn!(widget = %self.kind, "no date field bound; filter deferred");
            return Ok(false);
        };

        let filter = IntervalFilter::for_range(field, range);
        let action = filter_action(Some(range.start_date()), Some(range.end_date()));
        host.apply_filter(&filter, action)
            .context("host rejected interval filter")?;
        info!(
            widget = %self.kind,
            start = %range.start_date(),
            end = %range.end_date(),
            "interval filter applied"
        );
        self.tracker.confirm_filtered();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::host::{MemoryStore, RecordingHost};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn now() -> NaiveDateTime {
        day(2025, 9, 17).and_hms_opt(10, 0, 0).expect("valid time")
    }

    fn columns() -> Vec<FieldDescriptor> {
        vec![FieldDescriptor::new("Calendar.Date", &["Time"])]
    }

    fn controller(kind: WidgetKind) -> RangeController {
        let mut ctl = RangeController::new(kind, ControllerSettings::default(), now().date());
        ctl.bind_fields(&columns()).expect("bind");
        ctl
    }

    #[test]
    fn applying_a_token_publishes_and_filters() {
        let mut store = MemoryStore::new();
        let mut host = RecordingHost::new();
        let mut ctl = controller(WidgetKind::DatePicker);

        let range = ctl
            .apply_token(&RangeToken::LastMonth, now(), &mut store, &mut host)
            .expect("apply");

        assert_eq!(range.start_day(), day(2025, 8, 1));
        assert_eq!(ctl.anchor(), (2025, 7));
        assert_eq!(
            store.read("sharedDateRange.dateString").expect("read").as_deref(),
            Some("2025-08-01 to 2025-08-31")
        );
        assert_eq!(host.applied.len(), 1);
        assert_eq!(ctl.filter_state(), FilterState::Filtered);

        // same interval again: no second filter
        ctl.apply_token(&RangeToken::LastMonth, now(), &mut store, &mut host)
            .expect("apply");
        assert_eq!(host.applied.len(), 1);
    }

    #[test]
    fn zero_quantity_fails_to_parse_and_leaves_controller_untouched() {
        let mut store = MemoryStore::new();
        let mut host = RecordingHost::new();
        let mut ctl = controller(WidgetKind::DatePicker);
        let before = ctl
            .apply_token(&RangeToken::ThisWeek, now(), &mut store, &mut host)
            .expect("apply");

        let err = "last 0 days".parse::<RangeToken>().expect_err("zero quantity");
        assert!(matches!(err, RangeError::InvalidQuantity(_)));
        assert_eq!(ctl.current(), Some(&before));
        assert_eq!(host.applied.len(), 1);
    }

    #[test]
    fn inverted_custom_range_is_rejected_without_side_effects() {
        let mut store = MemoryStore::new();
        let mut host = RecordingHost::new();
        let mut ctl = controller(WidgetKind::DatePicker);

        let err = ctl
            .apply_custom(day(2025, 3, 2), day(2025, 3, 1), &mut store, &mut host)
            .expect_err("inverted");
        assert!(matches!(
            err.downcast_ref::<RangeError>(),
            Some(RangeError::InvalidCustomRange { .. })
        ));
        assert!(ctl.current().is_none());
        assert!(host.applied.is_empty());
        assert_eq!(store.read("sharedDateRange.dateString").expect("read"), None);
    }

    #[test]
    fn custom_keeps_navigated_anchor() {
        let mut store = MemoryStore::new();
        let mut host = RecordingHost::new();
        let mut ctl = controller(WidgetKind::Calendar);

        ctl.navigate(-3);
        assert_eq!(ctl.anchor(), (2025, 5));
        ctl.apply_custom(day(2025, 1, 5), day(2025, 1, 10), &mut store, &mut host)
            .expect("custom");
        assert_eq!(ctl.anchor(), (2025, 5));

        ctl.apply_token(&RangeToken::Custom, now(), &mut store, &mut host)
            .expect("custom token");
        assert_eq!(ctl.anchor(), (2025, 5));
        assert_eq!(ctl.current().map(|r| r.start_day()), Some(day(2025, 1, 5)));
    }

    #[test]
    fn navigation_wraps_years() {
        let mut ctl = controller(WidgetKind::Calendar);
        ctl.go_to(2025, 11);
        ctl.navigate(1);
        assert_eq!(ctl.anchor(), (2026, 0));
        ctl.navigate(-2);
        assert_eq!(ctl.anchor(), (2025, 10));
        ctl.go_to(2025, -1);
        assert_eq!(ctl.anchor(), (2024, 11));
    }

    #[test]
    fn picking_days_builds_a_custom_range() {
        let mut store = MemoryStore::new();
        let mut host = RecordingHost::new();
        let mut ctl = controller(WidgetKind::DatePicker);

        ctl.pick_day(day(2025, 9, 10), CustomBound::Start, &mut store, &mut host)
            .expect("start");
        let range = ctl
            .pick_day(day(2025, 9, 20), CustomBound::End, &mut store, &mut host)
            .expect("end");
        assert_eq!(range.start_day(), day(2025, 9, 10));
        assert_eq!(range.end_day(), day(2025, 9, 20));

        let collapsed = ctl
            .pick_day(day(2025, 9, 25), CustomBound::Start, &mut store, &mut host)
            .expect("start after end");
        assert_eq!(collapsed.start_day(), day(2025, 9, 25));
        assert_eq!(collapsed.end_day(), day(2025, 9, 25));
    }

    #[test]
    fn malformed_shared_state_is_ignored() {
        let mut store = MemoryStore::new();
        let mut host = RecordingHost::new();
        let mut ctl = controller(WidgetKind::Calendar);
        let good = ctl
            .apply_token(&RangeToken::ThisMonth, now(), &mut store, &mut host)
            .expect("apply");

        store
            .write("sharedDateRange.dateString", "garbage")
            .expect("write");
        let outcome = ctl.sync_from_shared(&mut store, &mut host).expect("sync");
        assert!(matches!(
            outcome,
            SyncOutcome::Ignored(RangeError::MalformedSharedState(_))
        ));
        assert_eq!(ctl.current(), Some(&good));
        assert_eq!(host.applied.len(), 1);
    }

    #[test]
    fn filter_waits_for_a_date_field() {
        let mut store = MemoryStore::new();
        let mut host = RecordingHost::new();
        let mut ctl =
            RangeController::new(WidgetKind::DatePicker, ControllerSettings::default(), now().date());

        ctl.apply_token(&RangeToken::Today, now(), &mut store, &mut host)
            .expect("apply");
        assert!(host.applied.is_empty());
        assert_eq!(ctl.filter_state(), FilterState::AwaitingFilter);

        ctl.update(&columns(), now(), &mut store, &mut host)
            .expect("update");
        assert_eq!(host.applied.len(), 1);
        assert_eq!(ctl.filter_state(), FilterState::Filtered);
    }

    #[test]
    fn missing_date_role_is_surfaced() {
        let mut store = MemoryStore::new();
        let mut host = RecordingHost::new();
        let mut ctl =
            RangeController::new(WidgetKind::DatePicker, ControllerSettings::default(), now().date());
        let cols = vec![FieldDescriptor::new("Sales.Amount", &["Values"])];

        let err = ctl
            .update(&cols, now(), &mut store, &mut host)
            .expect_err("no time column");
        assert!(matches!(
            err.downcast_ref::<RangeError>(),
            Some(RangeError::EmptyOrMissingDateField(_))
        ));
        assert!(ctl.current().is_none());
    }

    #[test]
    fn first_update_uses_default_token() {
        let mut store = MemoryStore::new();
        let mut host = RecordingHost::new();
        let mut ctl =
            RangeController::new(WidgetKind::DatePicker, ControllerSettings::default(), now().date());

        ctl.update(&columns(), now(), &mut store, &mut host)
            .expect("update");
        let range = ctl.current().expect("resolved");
        assert_eq!(range.start_day(), day(2025, 1, 1));
        assert_eq!(range.end_day(), day(2025, 12, 31));
        assert_eq!(host.applied.len(), 1);

        // a quiet second cycle changes nothing
        ctl.update(&columns(), now(), &mut store, &mut host)
            .expect("update");
        assert_eq!(host.applied.len(), 1);
    }
}
