//! Ticket analytics over an actor's scope.
//!
//! Counts by status and category, average time to first resolution,
//! creation trends and an optional advisory summary.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classifier::TicketSummarizer;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::services::scope::{DrillDown, ScopeBuilder, ScopeResource};
use crate::services::ticket::{Ticket, TicketFilter, TicketService};
use crate::services::user::Actor;
use crate::types::TicketStatus;

const DEFAULT_TREND_LIMIT: u32 = 30;

/// Trend bucket width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendPeriod {
    #[default]
    Daily,
    /// Weeks start on Sunday.
    Weekly,
    Monthly,
}

impl TrendPeriod {
    /// First day of the bucket containing `date`.
    #[must_use]
    pub fn bucket_start(self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Daily => date,
            Self::Weekly => date
                .checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_sunday())))
                .unwrap_or(date),
            Self::Monthly => date.with_day(1).unwrap_or(date),
        }
    }

    /// Display key of a bucket: `YYYY-MM-DD`, or `YYYY-MM` for months.
    #[must_use]
    pub fn label(self, start: NaiveDate) -> String {
        match self {
            Self::Daily | Self::Weekly => start.format("%Y-%m-%d").to_string(),
            Self::Monthly => start.format("%Y-%m").to_string(),
        }
    }

    /// Earliest creation time covered by `limit` periods ending at `now`.
    #[must_use]
    pub fn window_start(self, now: DateTime<Utc>, limit: u32) -> DateTime<Utc> {
        let start = match self {
            Self::Daily => {
                Duration::try_days(i64::from(limit)).and_then(|d| now.checked_sub_signed(d))
            }
            Self::Weekly => {
                Duration::try_weeks(i64::from(limit)).and_then(|d| now.checked_sub_signed(d))
            }
            Self::Monthly => now.checked_sub_months(Months::new(limit)),
        };
        // Windows reaching past the representable range cover everything.
        start.unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Analytics request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AnalyticsQuery {
    pub drill: DrillDown,
    pub period: TrendPeriod,
    /// Number of periods the trend looks back.
    pub limit: u32,
}

impl Default for AnalyticsQuery {
    fn default() -> Self {
        Self {
            drill: DrillDown::default(),
            period: TrendPeriod::default(),
            limit: DEFAULT_TREND_LIMIT,
        }
    }
}

/// Tickets created in one trend bucket, by current status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendBucket {
    pub period_start: NaiveDate,
    pub label: String,
    pub total: usize,
    pub open: usize,
    pub in_review: usize,
    pub resolved: usize,
    pub rejected: usize,
}

impl TrendBucket {
    fn new(period: TrendPeriod, start: NaiveDate) -> Self {
        Self {
            period_start: start,
            label: period.label(start),
            total: 0,
            open: 0,
            in_review: 0,
            resolved: 0,
            rejected: 0,
        }
    }

    fn record(&mut self, status: TicketStatus) {
        self.total += 1;
        match status {
            TicketStatus::Open => self.open += 1,
            TicketStatus::InReview => self.in_review += 1,
            TicketStatus::Resolved => self.resolved += 1,
            TicketStatus::Rejected => self.rejected += 1,
        }
    }
}

/// Aggregates over the scoped ticket set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketAnalytics {
    pub total: usize,
    /// Every status appears, zero included.
    pub by_status: BTreeMap<TicketStatus, usize>,
    /// Only categorized tickets are counted.
    pub by_category: BTreeMap<String, usize>,
    /// Mean hours from creation to the first RESOLVED entry.
    pub average_resolution_hours: Option<f64>,
    pub trends: Vec<TrendBucket>,
    /// Advisory narrative; `None` when unavailable.
    pub summary: Option<String>,
}

/// Service computing ticket analytics.
pub struct AnalyticsService {
    tickets: Arc<TicketService>,
    scopes: Arc<ScopeBuilder>,
    summarizer: Arc<dyn TicketSummarizer>,
    config: EngineConfig,
}

impl AnalyticsService {
    pub fn new(
        tickets: Arc<TicketService>,
        scopes: Arc<ScopeBuilder>,
        summarizer: Arc<dyn TicketSummarizer>,
        config: EngineConfig,
    ) -> Self {
        Self {
            tickets,
            scopes,
            summarizer,
            config,
        }
    }

    /// Analytics as of now.
    pub async fn analytics(&self, actor: &Actor, query: AnalyticsQuery) -> Result<TicketAnalytics> {
        self.analytics_at(actor, query, Utc::now()).await
    }

    /// Analytics with trends ending at `now`.
    pub async fn analytics_at(
        &self,
        actor: &Actor,
        query: AnalyticsQuery,
        now: DateTime<Utc>,
    ) -> Result<TicketAnalytics> {
        let predicate = self
            .scopes
            .build(actor, ScopeResource::Analytics, &query.drill)
            .await?;
        let tickets = self
            .tickets
            .tickets_in_scope(&predicate, TicketFilter::default())
            .await?;

        let mut by_status: BTreeMap<TicketStatus, usize> =
            TicketStatus::ALL.iter().map(|s| (*s, 0)).collect();
        let mut by_category: BTreeMap<String, usize> = BTreeMap::new();
        for ticket in &tickets {
            *by_status.entry(ticket.status).or_default() += 1;
            if let Some(category) = &ticket.category {
                *by_category.entry(category.clone()).or_default() += 1;
            }
        }

        let average_resolution_hours = self.average_resolution_hours(&tickets).await?;
        let trends = Self::trends(&tickets, query.period, query.limit, now);
        let summary = self.summarize(&tickets).await;

        debug!(
            target: "jurisdiction",
            actor_id = %actor.id,
            total = tickets.len(),
            "Analytics computed"
        );

        Ok(TicketAnalytics {
            total: tickets.len(),
            by_status,
            by_category,
            average_resolution_hours,
            trends,
            summary,
        })
    }

    async fn average_resolution_hours(&self, tickets: &[Ticket]) -> Result<Option<f64>> {
        let mut total_hours = 0.0;
        let mut resolved = 0usize;

        for ticket in tickets {
            let history = self.tickets.raw_history(ticket.id).await?;
            if let Some(entry) = history.iter().find(|e| e.status == TicketStatus::Resolved) {
                let elapsed = entry.timestamp - ticket.created_at;
                total_hours += elapsed.num_milliseconds() as f64 / 3_600_000.0;
                resolved += 1;
            }
        }

        Ok((resolved > 0).then(|| total_hours / resolved as f64))
    }

    fn trends(
        tickets: &[Ticket],
        period: TrendPeriod,
        limit: u32,
        now: DateTime<Utc>,
    ) -> Vec<TrendBucket> {
        let since = period.window_start(now, limit);
        let mut buckets: BTreeMap<NaiveDate, TrendBucket> = BTreeMap::new();

        for ticket in tickets
            .iter()
            .filter(|t| t.created_at >= since && t.created_at <= now)
        {
            let start = period.bucket_start(ticket.created_at.date_naive());
            buckets
                .entry(start)
                .or_insert_with(|| TrendBucket::new(period, start))
                .record(ticket.status);
        }

        buckets.into_values().collect()
    }

    async fn summarize(&self, tickets: &[Ticket]) -> Option<String> {
        if tickets.is_empty() {
            return None;
        }
        let descriptions: Vec<String> = tickets.iter().map(|t| t.description.clone()).collect();

        match tokio::time::timeout(
            self.config.classifier_timeout,
            self.summarizer.summarize(&descriptions),
        )
        .await
        {
            Ok(Ok(text)) => Some(text),
            Ok(Err(e)) => {
                warn!(target: "jurisdiction", error = %e, "Ticket summary unavailable");
                None
            }
            Err(_) => {
                warn!(target: "jurisdiction", "Ticket summary timed out");
                None
            }
        }
    }
}
