use crate::core::formatter::ResultFormatter;
use crate::domain::model::{
    AthleteEvent, AthleteProfile, DisplayField, EntityId, PLACEHOLDER_AVATAR,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt::Write as _;

pub const DEFAULT_DATE_FORMAT: &str = "%-m/%-d/%Y";
pub const FEED_RESULTS_PENDING: &str = "Detailed results pending...";
pub const PROFILE_RESULTS_MISSING: &str = "No detailed results available.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "fields", rename_all = "snake_case")]
pub enum CardResults {
    Fields(Vec<DisplayField>),
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultCard {
    pub event_id: EntityId,
    pub title: String,
    pub date: String,
    pub results: CardResults,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedCard {
    pub athlete_id: Option<EntityId>,
    pub athlete_name: String,
    pub avatar_url: String,
    #[serde(flatten)]
    pub card: ResultCard,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
    pub id: EntityId,
    pub name: String,
    pub category: String,
    pub avatar_url: String,
    pub results: Vec<ResultCard>,
}

/// Builds cards for both the feed and the profile screen from one shared
/// formatter.
#[derive(Debug, Clone)]
pub struct CardBuilder {
    formatter: ResultFormatter,
    date_format: String,
}

impl Default for CardBuilder {
    fn default() -> Self {
        Self::new(ResultFormatter::default(), DEFAULT_DATE_FORMAT)
    }
}

impl CardBuilder {
    pub fn new(formatter: ResultFormatter, date_format: &str) -> Self {
        Self {
            formatter,
            date_format: date_format.to_string(),
        }
    }

    pub fn formatter(&self) -> &ResultFormatter {
        &self.formatter
    }

    pub fn result_card(&self, event: &AthleteEvent) -> ResultCard {
        let results = match event.result_record() {
            Some(record) => CardResults::Fields(self.formatter.order_fields(Some(&record))),
            None => CardResults::Missing,
        };

        ResultCard {
            event_id: event.id.clone(),
            title: event.title.clone(),
            date: event
                .start_time
                .as_deref()
                .map(|raw| format_date(raw, &self.date_format))
                .unwrap_or_default(),
            results,
        }
    }

    pub fn feed_card(&self, event: &AthleteEvent) -> FeedCard {
        let athlete = event.athlete.as_ref();
        FeedCard {
            athlete_id: event
                .entity_id
                .clone()
                .or_else(|| athlete.and_then(|a| a.id.clone())),
            athlete_name: athlete
                .and_then(|a| a.name.clone())
                .unwrap_or_default(),
            avatar_url: athlete
                .and_then(|a| a.image_url.clone())
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| PLACEHOLDER_AVATAR.to_string()),
            card: self.result_card(event),
        }
    }

    pub fn feed(&self, events: &[AthleteEvent]) -> Vec<FeedCard> {
        events.iter().map(|event| self.feed_card(event)).collect()
    }

    pub fn profile(&self, profile: &AthleteProfile) -> ProfileView {
        ProfileView {
            id: profile.athlete.id.clone(),
            name: profile.athlete.name.clone(),
            category: profile.athlete.display_category("Athlete").to_string(),
            avatar_url: profile.athlete.avatar_url().to_string(),
            results: profile.events.iter().map(|e| self.result_card(e)).collect(),
        }
    }
}

/// Renders a backend timestamp as a calendar date; unknown shapes pass through.
pub fn format_date(raw: &str, format: &str) -> String {
    let raw = raw.trim();
    let date = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| {
            // Postgres 有時回傳 +00 這種短時區
            DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z")
                .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%#z"))
                .map(|dt| dt.date_naive())
                .ok()
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
                .map(|dt| dt.date())
                .ok()
        })
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok());

    date.and_then(|date| render_date(date, format))
        .unwrap_or_else(|| raw.to_string())
}

/// Whether `format` can render a calendar date. Time fields like `%H` and
/// unknown specifiers fail.
pub fn is_valid_date_format(format: &str) -> bool {
    NaiveDate::from_ymd_opt(2009, 8, 16)
        .and_then(|date| render_date(date, format))
        .is_some()
}

// chrono 在格式不合法時回傳 fmt::Error，不能直接 to_string()
fn render_date(date: NaiveDate, format: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", date.format(format)).ok()?;
    Some(out)
}
