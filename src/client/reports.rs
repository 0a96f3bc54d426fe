//! Synchronous reporting endpoints and custom (impression-share) reports.

use std::cmp::Reverse;

use bon::Builder;
use chrono::{Days, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{Value, json};

use super::{Client, sorted_by};
use crate::Result;
use crate::normalize::{
    date_key, extract_data_object, extract_report_items, first_non_empty, int_from, text, upper,
};
use crate::report::validate_download_uri;
use crate::transport::ApiRequest;
use crate::types::{
    AdGroupDailyMetrics, CustomReport, DailyMetrics, Granularity, KeywordDailyMetrics,
    SearchTermDailyMetrics,
};

const REPORT_ROW_LIMIT: usize = 1000;
const MAX_REPORT_NAME: usize = 50;
const DEFAULT_REPORT_NAME: &str = "impression_share_report";
const DEFAULT_WEEKLY_RANGE: &str = "LAST_2_WEEKS";
/// Days covered by a daily report without explicit bounds, ending yesterday.
const DEFAULT_DAILY_SPAN: u64 = 14;

/// Parameters of an impression-share custom report.
///
/// Weekly reports are bounded by `date_range`; daily reports by
/// `start_date`/`end_date`, or the two weeks ending yesterday when either is
/// missing.
#[non_exhaustive]
#[derive(Builder, Clone, Debug, Default, PartialEq, Eq)]
pub struct ImpressionShareRequest {
    #[builder(into)]
    pub name: Option<String>,
    #[builder(default)]
    pub granularity: Granularity,
    /// e.g. `LAST_4_WEEKS`; ignored for daily reports.
    #[builder(into)]
    pub date_range: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[builder(default)]
    pub countries: Vec<String>,
    #[builder(default)]
    pub adam_ids: Vec<String>,
    #[builder(default)]
    pub search_terms: Vec<String>,
}

impl ImpressionShareRequest {
    /// Request body, with `today` anchoring the default daily window.
    pub(crate) fn payload(&self, today: NaiveDate) -> Value {
        let mut conditions = Vec::new();
        let countries = non_empty(&self.countries, true);
        if !countries.is_empty() {
            conditions.push(in_condition("countryOrRegion", countries));
        }
        let adam_ids = non_empty(&self.adam_ids, false);
        if !adam_ids.is_empty() {
            conditions.push(in_condition("adamId", adam_ids));
        }
        let terms = non_empty(&self.search_terms, false);
        if !terms.is_empty() {
            conditions.push(in_condition("searchTerm", terms));
        }

        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_REPORT_NAME);
        let name: String = name.chars().take(MAX_REPORT_NAME).collect();

        let mut payload = json!({
            "name": name,
            "granularity": self.granularity,
            "selector": {"conditions": conditions},
        });

        match self.granularity {
            Granularity::Weekly => {
                let range = self
                    .date_range
                    .as_deref()
                    .map(|r| r.trim().to_uppercase())
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| DEFAULT_WEEKLY_RANGE.to_owned());
                payload["dateRange"] = json!(range);
            }
            Granularity::Daily => {
                let (start, end) = match (self.start_date, self.end_date) {
                    (Some(start), Some(end)) => (start, end),
                    _ => default_daily_window(today),
                };
                payload["startTime"] = json!(iso_date(start));
                payload["endTime"] = json!(iso_date(end));
            }
        }
        payload
    }
}

fn default_daily_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let end = today.checked_sub_days(Days::new(1)).unwrap_or(today);
    let start = end
        .checked_sub_days(Days::new(DEFAULT_DAILY_SPAN - 1))
        .unwrap_or(end);
    (start, end)
}

fn non_empty(values: &[String], uppercase: bool) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| if uppercase { v.to_uppercase() } else { v.to_owned() })
        .collect()
}

fn in_condition(field: &str, values: Vec<String>) -> Value {
    json!({"field": field, "operator": "IN", "values": values})
}

fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Body of a synchronous daily report.
fn daily_body(start: &str, end: &str, conditions: Option<Value>, search_terms: bool) -> Value {
    let mut selector = json!({
        "orderBy": [{"field": "impressions", "sortOrder": "DESCENDING"}],
        "pagination": {"offset": 0, "limit": REPORT_ROW_LIMIT},
    });
    if let Some(conditions) = conditions {
        selector["conditions"] = conditions;
    }
    json!({
        "startTime": start,
        "endTime": end,
        "granularity": Granularity::Daily,
        "selector": selector,
        "timeZone": if search_terms { "ORTZ" } else { "UTC" },
        "returnRecordsWithNoMetrics": !search_terms,
        "returnRowTotals": !search_terms,
        "returnGrandTotals": false,
    })
}

fn report_rows(payload: &Value) -> &[Value] {
    payload["data"]["reportingDataResponse"]["row"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// `(date, metrics)` per day of a row: one per `granularity` entry, or a
/// single entry from `total` when the row is not broken down.
fn daily_entries(row: &Value, start: &str) -> Vec<(String, DailyMetrics)> {
    if let Some(entries) = row["granularity"].as_array().filter(|e| !e.is_empty()) {
        return entries
            .iter()
            .map(|entry| {
                let date = first_non_empty([&entry["date"]]).unwrap_or_else(|| start.to_owned());
                (date_key(&date), DailyMetrics::from_json(entry))
            })
            .collect();
    }

    let date = first_non_empty([&row["metadata"]["date"], &row["date"]])
        .unwrap_or_else(|| start.to_owned());
    vec![(date_key(&date), DailyMetrics::from_json(&row["total"]))]
}

impl Client {
    /// Daily metrics of one ad group, sorted by date.
    pub async fn ad_group_daily_metrics(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        campaign_id: i64,
        ad_group_id: i64,
    ) -> Result<Vec<AdGroupDailyMetrics>> {
        let (start, end) = (iso_date(start), iso_date(end));
        let conditions = json!([{
            "field": "adGroupId",
            "operator": "EQUALS",
            "values": [ad_group_id.to_string()],
        }]);
        let payload = self
            .post(
                &format!("reports/campaigns/{campaign_id}/adgroups"),
                daily_body(&start, &end, Some(conditions), false),
            )
            .await?;

        let mut results = Vec::new();
        for row in report_rows(&payload) {
            let meta = &row["metadata"];
            let row_ad_group = int_from(&meta["adGroupId"]);
            let row_campaign = int_from(&meta["campaignId"]);
            if (row_ad_group != 0 && row_ad_group != ad_group_id)
                || (row_campaign != 0 && row_campaign != campaign_id)
            {
                continue;
            }
            let ad_group_name = text(&meta["adGroupName"]);
            for (date, metrics) in daily_entries(row, &start) {
                results.push(AdGroupDailyMetrics {
                    date,
                    campaign_id,
                    ad_group_id,
                    ad_group_name: ad_group_name.clone(),
                    metrics,
                });
            }
        }
        Ok(sorted_by(results, |r| r.date.clone()))
    }

    /// Daily metrics per keyword of an ad group, sorted by date.
    pub async fn keyword_daily_metrics(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        campaign_id: i64,
        ad_group_id: i64,
    ) -> Result<Vec<KeywordDailyMetrics>> {
        let (start, end) = (iso_date(start), iso_date(end));
        let payload = self
            .post(
                &format!("reports/campaigns/{campaign_id}/adgroups/{ad_group_id}/keywords"),
                daily_body(&start, &end, None, false),
            )
            .await?;

        let mut results = Vec::new();
        for row in report_rows(&payload) {
            let meta = &row["metadata"];
            let Some(keyword_id) = ["keywordId", "targetingKeywordId", "id"]
                .iter()
                .map(|key| int_from(&meta[*key]))
                .find(|id| *id > 0)
            else {
                continue;
            };
            let keyword_text =
                first_non_empty([&meta["keywordText"], &meta["text"], &meta["keyword"]])
                    .unwrap_or_else(|| format!("Keyword {keyword_id}"));
            let match_type = Some(upper(&meta["matchType"]))
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "BROAD".to_owned());
            let status = Some(upper(&meta["status"]))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "ENABLED".to_owned());

            for (date, metrics) in daily_entries(row, &start) {
                results.push(KeywordDailyMetrics {
                    date,
                    campaign_id,
                    ad_group_id,
                    keyword_id,
                    keyword_text: keyword_text.clone(),
                    match_type: match_type.clone(),
                    status: status.clone(),
                    metrics,
                });
            }
        }
        Ok(sorted_by(results, |r| r.date.clone()))
    }

    /// Daily metrics per search term of an ad group, sorted by date. Rows
    /// without a term are dropped.
    pub async fn search_term_daily_metrics(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        campaign_id: i64,
        ad_group_id: i64,
    ) -> Result<Vec<SearchTermDailyMetrics>> {
        let (start, end) = (iso_date(start), iso_date(end));
        let payload = self
            .post(
                &format!("reports/campaigns/{campaign_id}/adgroups/{ad_group_id}/searchterms"),
                daily_body(&start, &end, None, true),
            )
            .await?;

        let mut results = Vec::new();
        for row in report_rows(&payload) {
            let meta = &row["metadata"];
            let Some(term) =
                first_non_empty([&meta["searchTermText"], &meta["searchTerm"], &meta["term"]])
            else {
                continue;
            };
            for (date, metrics) in daily_entries(row, &start) {
                results.push(SearchTermDailyMetrics {
                    date,
                    campaign_id,
                    ad_group_id,
                    search_term_text: term.clone(),
                    metrics,
                });
            }
        }
        Ok(sorted_by(results, |r| r.date.clone()))
    }

    pub async fn create_impression_share_report(
        &self,
        request: &ImpressionShareRequest,
    ) -> Result<CustomReport> {
        let body = request.payload(Utc::now().date_naive());
        let payload = self.post("custom-reports", body).await?;
        Ok(CustomReport::from_json(extract_data_object(&payload)))
    }

    pub async fn custom_report(&self, report_id: i64) -> Result<CustomReport> {
        let payload = self.get(&format!("custom-reports/{report_id}")).await?;
        Ok(CustomReport::from_json(extract_data_object(&payload)))
    }

    /// Every custom report of the organization, newest first.
    pub async fn custom_reports(&self) -> Result<Vec<CustomReport>> {
        let reports = self
            .fetcher()
            .fetch_all_with("custom-reports", extract_report_items, CustomReport::from_list_row)
            .await?;
        Ok(sorted_by(reports, |r| Reverse(r.id)))
    }

    /// Downloads a finished report after checking that `download_uri` is an
    /// https link on the trusted domain.
    pub async fn download_report(&self, download_uri: &str) -> Result<Vec<u8>> {
        let endpoints = self.endpoints();
        let url = validate_download_uri(download_uri, &endpoints.api_base, &endpoints.trusted_root)?;
        let path = url.path().to_owned();

        let response = self
            .send_bearer_only(ApiRequest::new(Method::GET, url))
            .await?;
        if !response.is_success() {
            return Err(response.to_error(&Method::GET, &path));
        }
        Ok(response.body)
    }
}
