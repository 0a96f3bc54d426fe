//! Share-of-voice rows and the keyword opportunity table built from them.

use std::collections::HashMap;

use phf::phf_map;
use rust_decimal::Decimal;
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString};

use super::csv::parse_records;

const AUCTION_POPULARITY: f64 = 60.0;
const SHARE_THRESHOLD: f64 = 0.2;

/// Accepted header spellings per normalized field, in priority order.
static HEADER_ALIASES: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "week" => &["week", "Week", "date", "Date"],
    "appName" => &["appName", "App Name"],
    "appId" => &["adamId", "App ID", "appId"],
    "countryOrRegion" => &["countryOrRegion", "Country or Region", "country"],
    "keyword" => &["searchTerm", "Search Term", "search_term"],
    "popularity" => &["searchPopularity", "Search Popularity", "popularity"],
    "impressionShare" => &["impressionShare", "Impression Share"],
    "rank" => &["rank", "Rank"],
    "impressions" => &["impressions", "Impressions"],
    "taps" => &["taps", "Taps"],
    "installs" => &["installs", "Installs", "tapThroughInstalls"],
    "spend" => &["spend", "Spend"],
};

/// One normalized row of an impression-share report.
#[non_exhaustive]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SovRow {
    pub week: String,
    pub app_name: String,
    pub app_id: String,
    pub country_or_region: String,
    pub keyword: String,
    pub popularity: f64,
    pub impression_share: f64,
    pub rank: f64,
    pub impressions: i64,
    pub taps: i64,
    pub installs: i64,
    pub spend: Decimal,
}

#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    AuctionLimited,
    ConversionLimited,
    VolumeLimited,
}

#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    IncreaseBidOrBudget,
    ImproveAsaCvrSurface,
    ExpandKeywordCoverage,
}

impl Bucket {
    #[must_use]
    pub fn action(self) -> Action {
        match self {
            Bucket::AuctionLimited => Action::IncreaseBidOrBudget,
            Bucket::ConversionLimited => Action::ImproveAsaCvrSurface,
            Bucket::VolumeLimited => Action::ExpandKeywordCoverage,
        }
    }

    #[must_use]
    pub fn reason(self) -> &'static str {
        match self {
            Bucket::AuctionLimited => "High popularity with low share",
            Bucket::ConversionLimited => "Receiving share but no installs",
            Bucket::VolumeLimited => "Low popularity and/or constrained volume",
        }
    }
}

/// Auction-limited wins over conversion-limited; everything else is
/// volume-limited.
#[must_use]
pub fn classify(popularity: f64, share: f64, installs: i64) -> Bucket {
    if popularity >= AUCTION_POPULARITY && share < SHARE_THRESHOLD {
        Bucket::AuctionLimited
    } else if share >= SHARE_THRESHOLD && installs == 0 {
        Bucket::ConversionLimited
    } else {
        Bucket::VolumeLimited
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionEntry {
    pub keyword: String,
    pub popularity: f64,
    pub share: f64,
    pub rank: f64,
    pub bucket: Bucket,
    pub action: Action,
    pub reason: String,
}

impl From<&SovRow> for DecisionEntry {
    fn from(row: &SovRow) -> Self {
        let bucket = classify(row.popularity, row.impression_share, row.installs);
        Self {
            keyword: row.keyword.clone(),
            popularity: row.popularity,
            share: row.impression_share,
            rank: row.rank,
            bucket,
            action: bucket.action(),
            reason: bucket.reason().to_owned(),
        }
    }
}

/// Parses report CSV into rows. The first record is the header.
#[must_use]
pub fn normalize_rows(csv: &str) -> Vec<SovRow> {
    let mut records = parse_records(csv).into_iter();
    let Some(headers) = records.next() else {
        return Vec::new();
    };

    records
        .map(|values| {
            let cells: HashMap<&str, &str> = headers
                .iter()
                .map(|h| h.trim())
                .zip(values.iter().map(String::as_str))
                .collect();
            SovRow {
                week: pick(&cells, "week").to_owned(),
                app_name: pick(&cells, "appName").to_owned(),
                app_id: pick(&cells, "appId").to_owned(),
                country_or_region: pick(&cells, "countryOrRegion").to_owned(),
                keyword: pick(&cells, "keyword").to_owned(),
                popularity: number(pick(&cells, "popularity")),
                impression_share: number(pick(&cells, "impressionShare")),
                rank: number(pick(&cells, "rank")),
                impressions: whole(pick(&cells, "impressions")),
                taps: whole(pick(&cells, "taps")),
                installs: whole(pick(&cells, "installs")),
                spend: numeric_prefix(&cleaned(pick(&cells, "spend")))
                    .parse()
                    .unwrap_or_default(),
            }
        })
        .collect()
}

/// First non-blank cell among the aliases of `field`.
fn pick<'cell>(cells: &HashMap<&str, &'cell str>, field: &str) -> &'cell str {
    HEADER_ALIASES
        .get(field)
        .into_iter()
        .flat_map(|aliases| aliases.iter())
        .filter_map(|alias| cells.get(alias))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

/// Drops percent signs and thousands separators.
fn cleaned(raw: &str) -> String {
    raw.trim().replace(['%', ','], "")
}

/// Longest leading run of `text` that reads as a decimal number, so that
/// `"72 (est)"` yields `"72"`. Empty when there is no leading digit.
fn numeric_prefix(text: &str) -> &str {
    let bytes = text.as_bytes();
    let digits = |from: usize| {
        from + bytes
            .iter()
            .skip(from)
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let sign = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let mut end = digits(sign);
    let mut has_digits = end > sign;
    if bytes.get(end) == Some(&b'.') {
        let fraction_end = digits(end + 1);
        if has_digits || fraction_end > end + 1 {
            has_digits = true;
            end = fraction_end;
        }
    }
    if !has_digits {
        return "";
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let exponent_start = end + 1 + usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exponent_end = digits(exponent_start);
        if exponent_end > exponent_start {
            end = exponent_end;
        }
    }
    text.get(..end).unwrap_or_default()
}

fn number(raw: &str) -> f64 {
    numeric_prefix(&cleaned(raw)).parse().unwrap_or_default()
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "counters in reports are far below i64::MAX and fractions are dropped on purpose"
)]
fn whole(raw: &str) -> i64 {
    number(raw) as i64
}
