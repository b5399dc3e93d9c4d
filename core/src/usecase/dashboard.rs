use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::holiday::HolidayCalendar;
use crate::model::identity::Identity;
use crate::model::report::Report;
use crate::model::stats::{PeriodSummary, SubjectTotal};
use crate::repository::{AuthProvider, RowStore};
use crate::service::aggregate::{aggregate_by_date, aggregate_by_subject, summarize};
use crate::service::presentation::{chart_series, daily_rows, summary_cards, ChartPoint, DailyRow, SummaryCard};
use crate::service::report_service::ReportService;
use crate::service::session_service::SessionService;
use crate::time::{DateRange, RangeSelector};
use crate::usecase::fetch::{FetchSequencer, FetchTicket};

/// Everything the dashboard shows for one window.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub range: DateRange,
    pub summary: PeriodSummary,
    pub cards: Vec<SummaryCard>,
    pub rows: Vec<DailyRow>,
    pub chart: Vec<ChartPoint>,
    /// Per-person totals; a single entry unless the viewer sees everyone.
    pub subjects: Vec<SubjectTotal>,
}

pub fn build_view(range: DateRange, reports: &[Report], calendar: &dyn HolidayCalendar) -> DashboardView {
    let totals = aggregate_by_date(reports);
    let summary = summarize(reports);
    DashboardView {
        cards: summary_cards(&summary),
        rows: daily_rows(&totals, calendar),
        chart: chart_series(&totals),
        subjects: aggregate_by_subject(reports),
        summary,
        range,
    }
}

/// State held by a mounted dashboard: who is looking, and which window.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    pub identity: Identity,
    pub selector: RangeSelector,
}

impl DashboardState {
    /// Resolves the session once; every later load reuses the identity.
    pub async fn mount<A: AuthProvider, S: RowStore>(sessions: &SessionService<A, S>, selector: RangeSelector) -> Result<Self> {
        let identity = sessions.resolve().await?;
        Ok(Self { identity, selector })
    }
}

pub struct DashboardUseCase<S: RowStore, C: HolidayCalendar> {
    reports: ReportService<S>,
    calendar: C,
    sequencer: FetchSequencer,
}

impl<S: RowStore, C: HolidayCalendar> DashboardUseCase<S, C> {
    pub fn new(store: S, calendar: C) -> Self {
        Self {
            reports: ReportService::new(store),
            calendar,
            sequencer: FetchSequencer::new(),
        }
    }

    /// Starts a fetch, superseding any still in flight.
    pub fn begin(&self) -> FetchTicket {
        self.sequencer.issue()
    }

    /// Loads the window for `ticket`. `Ok(None)` means a newer fetch was
    /// started meanwhile and this result was dropped.
    pub async fn load_with(
        &self,
        ticket: FetchTicket,
        state: &DashboardState,
        today: NaiveDate,
    ) -> Result<Option<DashboardView>> {
        let range = state.selector.resolve(today)?;
        let mut reports = self
            .reports
            .fetch_window(&state.identity, Some(range.window()))
            .await?;
        if self.sequencer.accept(ticket, ()).is_none() {
            return Ok(None);
        }
        let fetched = reports.len();
        reports.retain(|r| range.contains(r.report_date));
        if reports.len() < fetched {
            debug!("Dropped {} reports outside {}", fetched - reports.len(), range.label);
        }
        info!(
            "Dashboard {} for {}: {} reports",
            range.label,
            state.identity.user_id,
            reports.len()
        );
        Ok(Some(build_view(range, &reports, &self.calendar)))
    }

    pub async fn load(&self, state: &DashboardState, today: NaiveDate) -> Result<Option<DashboardView>> {
        let ticket = self.begin();
        self.load_with(ticket, state, today).await
    }
}
