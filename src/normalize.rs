//! Field extraction over loosely shaped JSON.
//!
//! Upstream payloads disagree on envelope shape and on whether numbers arrive
//! as numbers or strings. Every helper here is total: a missing or mistyped
//! field yields the type's zero value instead of an error, and callers decide
//! what a zero means for them.

use std::str::FromStr as _;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive as _;
use serde_json::Value;

/// Integer view of a number, numeric string or JSON literal. Fractions truncate.
#[must_use]
pub fn int_from(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
            .or_else(|| n.as_f64().map(truncate))
            .unwrap_or_default(),
        Value::String(s) => s.trim().parse::<i64>().unwrap_or_default(),
        _ => 0,
    }
}

#[expect(clippy::cast_possible_truncation, reason = "truncation is the intended coercion")]
fn truncate(f: f64) -> i64 {
    if f.is_finite() { f.trunc() as i64 } else { 0 }
}

#[must_use]
pub fn float_from(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or_default(),
        _ => 0.0,
    }
}

/// Exact decimal view of a number or numeric string.
#[must_use]
pub fn decimal_from(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64))
            .unwrap_or_default(),
        Value::String(s) => Decimal::from_str(s.trim()).unwrap_or_default(),
        _ => Decimal::ZERO,
    }
}

/// String view of a string or number. Integral floats render without a fraction.
#[must_use]
pub fn string_from(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.is_finite() && f.fract().abs() < f64::EPSILON => truncate(f).to_string(),
            _ => n.to_string(),
        },
        _ => String::new(),
    }
}

/// Trimmed string view.
#[must_use]
pub fn text(value: &Value) -> String {
    string_from(value).trim().to_owned()
}

/// Trimmed, upper-cased string view. Empty when absent.
#[must_use]
pub fn upper(value: &Value) -> String {
    text(value).to_uppercase()
}

#[must_use]
pub fn bool_from(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes"
        ),
        _ => false,
    }
}

/// Trimmed non-empty strings of an array; anything else is empty.
#[must_use]
pub fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(text)
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// `Some` only for a non-blank string or number.
#[must_use]
pub fn opt_string(value: &Value) -> Option<String> {
    let s = text(value);
    (!s.is_empty()).then_some(s)
}

/// First candidate with a non-blank string view.
#[must_use]
pub fn first_non_empty<'value, I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = &'value Value>,
{
    values.into_iter().find_map(opt_string)
}

/// First key that is present on `object`, whatever its value.
#[must_use]
pub fn first_present<'value>(object: &'value Value, keys: &[&str]) -> Option<&'value Value> {
    let map = object.as_object()?;
    keys.iter().find_map(|k| map.get(*k))
}

/// Result rows of a list or single-entity response.
///
/// Accepted shapes, in order: `data` is an array; `data` is an object holding
/// `data` or `items`; `data` is a single entity with an `id`; the payload is
/// itself a single entity with an `id`.
#[must_use]
pub fn extract_data_items(payload: &Value) -> Vec<&Value> {
    let data = &payload["data"];
    if let Some(list) = data.as_array() {
        return list.iter().collect();
    }
    if data.is_object() {
        for key in ["data", "items"] {
            if let Some(list) = data[key].as_array() {
                return list.iter().collect();
            }
        }
        if data.get("id").is_some() {
            return vec![data];
        }
    }
    if payload.get("id").is_some() {
        return vec![payload];
    }
    match payload.as_array() {
        Some(list) => list.iter().collect(),
        None => Vec::new(),
    }
}

/// `data` when it is a non-empty object, otherwise the payload itself.
#[must_use]
pub fn extract_data_object(payload: &Value) -> &Value {
    match payload["data"].as_object() {
        Some(map) if !map.is_empty() => &payload["data"],
        _ => payload,
    }
}

/// Like [`extract_data_items`], additionally accepting `data.reports`.
#[must_use]
pub fn extract_report_items(payload: &Value) -> Vec<&Value> {
    let items = extract_data_items(payload);
    if !items.is_empty() {
        return items;
    }
    payload["data"]["reports"]
        .as_array()
        .map(|list| list.iter().collect())
        .unwrap_or_default()
}

/// Declared `pagination.totalResults`, or 0 when the response omits it.
#[must_use]
pub fn total_results(payload: &Value) -> usize {
    usize::try_from(int_from(&payload["pagination"]["totalResults"])).unwrap_or_default()
}

/// First `(amount, currency)` candidate with a positive amount.
///
/// Currency comes from `currency`, falling back to `currencyCode`.
#[must_use]
pub fn parse_money<'value, I>(candidates: I) -> Option<(Decimal, Option<String>)>
where
    I: IntoIterator<Item = &'value Value>,
{
    candidates.into_iter().find_map(|candidate| {
        if !candidate.is_object() {
            return None;
        }
        let amount = decimal_from(&candidate["amount"]);
        if amount <= Decimal::ZERO {
            return None;
        }
        let currency = first_non_empty([&candidate["currency"], &candidate["currencyCode"]]);
        Some((amount, currency))
    })
}

/// Leading `YYYY-MM-DD` of a timestamp-ish string.
#[must_use]
pub fn date_key(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.get(..10).unwrap_or(trimmed).to_owned()
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    #[test]
    fn numbers_coerce_from_any_numeric_shape() {
        assert_eq!(int_from(&json!(42)), 42);
        assert_eq!(int_from(&json!(42.9)), 42);
        assert_eq!(int_from(&json!(" 17 ")), 17);
        assert_eq!(int_from(&json!("abc")), 0);
        assert_eq!(int_from(&json!(null)), 0);

        assert!(float_from(&json!("0.25")).total_cmp(&0.25).is_eq(), "string fraction");
        assert!(float_from(&json!(3)).total_cmp(&3.0).is_eq(), "integer number");
        assert_eq!(decimal_from(&json!("1.50")), dec!(1.50));
        assert_eq!(decimal_from(&json!(0.1)), dec!(0.1));
    }

    #[test]
    fn strings_render_integral_numbers_without_fraction() {
        assert_eq!(string_from(&json!(123_456_789)), "123456789");
        assert_eq!(string_from(&json!(5.0)), "5");
        assert_eq!(string_from(&json!(true)), "");
        assert_eq!(upper(&json!(" paused ")), "PAUSED");
        assert_eq!(opt_string(&json!("   ")), None);
        assert_eq!(
            first_non_empty([&json!(""), &json!(null), &json!("x")]),
            Some("x".to_owned())
        );
    }

    #[test]
    fn bools_accept_common_spellings() {
        assert!(bool_from(&json!(true)));
        assert!(bool_from(&json!("Yes")));
        assert!(bool_from(&json!(1)));
        assert!(!bool_from(&json!("no")));
        assert!(!bool_from(&json!(null)));
    }

    #[test]
    fn data_items_accept_every_envelope() {
        let array = json!({"data": [{"id": 1}, {"id": 2}]});
        assert_eq!(extract_data_items(&array).len(), 2);

        let nested = json!({"data": {"data": [{"id": 1}]}});
        assert_eq!(extract_data_items(&nested).len(), 1);

        let items = json!({"data": {"items": [{"id": 1}, {"id": 2}, {"id": 3}]}});
        assert_eq!(extract_data_items(&items).len(), 3);

        let single = json!({"data": {"id": 7, "name": "x"}});
        assert_eq!(extract_data_items(&single), vec![&single["data"]]);

        let bare = json!({"id": 9});
        assert_eq!(extract_data_items(&bare), vec![&bare]);

        assert!(extract_data_items(&json!({"data": {"name": "no id"}})).is_empty());
    }

    #[test]
    fn report_items_also_accept_reports_key() {
        let payload = json!({"data": {"reports": [{"id": 5}]}});
        assert_eq!(extract_report_items(&payload).len(), 1);
    }

    #[test]
    fn data_object_falls_back_to_payload() {
        let wrapped = json!({"data": {"id": 1}});
        assert_eq!(extract_data_object(&wrapped), &json!({"id": 1}));
        let bare = json!({"id": 2});
        assert_eq!(extract_data_object(&bare), &bare);
    }

    #[test]
    fn money_takes_first_positive_candidate() {
        let zero = json!({"amount": "0", "currency": "USD"});
        let bid = json!({"amount": "1.25", "currencyCode": "EUR"});
        assert_eq!(
            parse_money([&zero, &json!(null), &bid]),
            Some((dec!(1.25), Some("EUR".to_owned())))
        );
        assert_eq!(parse_money([&zero]), None);
    }

    #[test]
    fn totals_and_dates() {
        assert_eq!(total_results(&json!({"pagination": {"totalResults": "450"}})), 450);
        assert_eq!(total_results(&json!({"data": []})), 0);
        assert_eq!(date_key("2024-03-01T00:00:00.000"), "2024-03-01");
        assert_eq!(date_key("2024"), "2024");
    }
}
