use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use serde_with::skip_serializing_none;
use strum_macros::{AsRefStr, Display, EnumString};

use super::Identified;
use crate::normalize::{
    decimal_from, first_non_empty, first_present, int_from, opt_string, string_list, upper,
};

/// Places kept when deriving cost per tap.
const CPT_SCALE: u32 = 6;

#[non_exhaustive]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, Serialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Granularity {
    #[default]
    Daily,
    Weekly,
}

/// Upstream lifecycle state of a custom report.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ReportState {
    Queued,
    Pending,
    Running,
    Completed,
    Failed,
    /// Anything the upstream reports that is not listed above; treated as in progress.
    #[strum(default)]
    Other(String),
}

impl ReportState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportState::Completed | ReportState::Failed)
    }
}

#[non_exhaustive]
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomReport {
    pub id: i64,
    pub name: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub granularity: String,
    pub download_uri: Option<String>,
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
    pub state: String,
    pub creation_time: Option<String>,
    pub modification_time: Option<String>,
    pub date_range: Option<String>,
}

impl CustomReport {
    /// Parses a report row. Unlike list entities this never fails: a missing
    /// id is kept as 0 so callers can decide how to treat it.
    #[must_use]
    pub fn from_json(row: &Value) -> Self {
        let id = int_from(&row["id"]);
        let granularity = upper(&row["granularity"]);
        Self {
            id,
            name: first_non_empty([&row["name"]]).unwrap_or_else(|| format!("Custom Report {id}")),
            start_time: opt_string(&row["startTime"]),
            end_time: opt_string(&row["endTime"]),
            granularity: if granularity.is_empty() {
                Granularity::Daily.to_string()
            } else {
                granularity
            },
            download_uri: opt_string(&row["downloadUri"]),
            dimensions: string_list(&row["dimensions"]),
            metrics: string_list(&row["metrics"]),
            state: upper(&row["state"]),
            creation_time: opt_string(&row["creationTime"]),
            modification_time: opt_string(&row["modificationTime"]),
            date_range: opt_string(&row["dateRange"]),
        }
    }

    /// Positive-id variant used by list fetches.
    #[must_use]
    pub fn from_list_row(row: &Value) -> Option<Self> {
        let report = Self::from_json(row);
        (report.id > 0).then_some(report)
    }

    #[must_use]
    pub fn report_state(&self) -> ReportState {
        self.state
            .parse()
            .unwrap_or_else(|_| ReportState::Other(self.state.clone()))
    }
}

impl Identified for CustomReport {
    type Id = i64;

    fn identity(&self) -> i64 {
        self.id
    }
}

/// Metrics shared by every daily report row.
#[non_exhaustive]
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyMetrics {
    pub impressions: i64,
    pub taps: i64,
    /// `None` when the row carries no install counter at all.
    pub installs: Option<i64>,
    pub spend: Decimal,
    pub cpt: Decimal,
    pub currency_code: Option<String>,
}

impl DailyMetrics {
    #[must_use]
    pub fn from_json(source: &Value) -> Self {
        let taps = int_from(&source["taps"]);
        let spend = decimal_from(&source["localSpend"]["amount"]);
        let cpt = if taps > 0 {
            spend
                .checked_div(Decimal::from(taps))
                .map(|cpt| cpt.round_dp(CPT_SCALE))
                .unwrap_or_default()
        } else {
            Decimal::ZERO
        };
        Self {
            impressions: int_from(&source["impressions"]),
            taps,
            installs: first_present(source, &["totalInstalls", "tapInstalls", "installs"])
                .map(int_from),
            spend,
            cpt,
            currency_code: first_non_empty([
                &source["localSpend"]["currency"],
                &source["localSpend"]["currencyCode"],
            ]),
        }
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdGroupDailyMetrics {
    pub date: String,
    pub campaign_id: i64,
    pub ad_group_id: i64,
    pub ad_group_name: String,
    #[serde(flatten)]
    pub metrics: DailyMetrics,
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordDailyMetrics {
    pub date: String,
    pub campaign_id: i64,
    pub ad_group_id: i64,
    pub keyword_id: i64,
    pub keyword_text: String,
    pub match_type: String,
    pub status: String,
    #[serde(flatten)]
    pub metrics: DailyMetrics,
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTermDailyMetrics {
    pub date: String,
    pub campaign_id: i64,
    pub ad_group_id: i64,
    pub search_term_text: String,
    #[serde(flatten)]
    pub metrics: DailyMetrics,
}
