//! Text normalization for values scraped off result cards.

use crate::domain::model::{Price, TripDuration};
use chrono::NaiveTime;
use regex::Regex;
use std::sync::OnceLock;

fn price_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // 數字開頭，中間允許千分位分隔符（空白、NBSP、窄 NBSP、撇號、點、逗號）
    RE.get_or_init(|| Regex::new(r"\d[\d\s\u{a0}\u{202f}'.,]*").unwrap())
}

fn clock_time() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(\d{1,2}):(\d{2})\s*(am|pm)?").unwrap())
}

fn hours_minutes() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*h\s*(\d{1,2})?").unwrap())
}

fn minutes_only() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*m").unwrap())
}

fn first_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").unwrap())
}

fn detect_currency(text: &str) -> Option<&'static str> {
    let upper = text.to_uppercase();
    if text.contains('€') || upper.contains("EUR") {
        Some("EUR")
    } else if text.contains('£') || upper.contains("GBP") {
        Some("GBP")
    } else if text.contains('$') || upper.contains("USD") {
        Some("USD")
    } else {
        None
    }
}

/// Parses a displayed price such as `1 234 €`, `€1,234.56` or `1.234,56 EUR`.
///
/// Returns `None` when the text holds no number or the separators are inconsistent.
pub fn parse_price(text: &str, default_currency: &str) -> Option<Price> {
    let token = price_token().find(text)?.as_str();
    let compact: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let compact = compact.trim_end_matches(&['.', ','][..]);

    let amount = normalize_separators(compact)?.parse::<f64>().ok()?;
    if !amount.is_finite() || amount < 0.0 {
        return None;
    }

    let currency = detect_currency(text).unwrap_or(default_currency);
    Some(Price {
        amount,
        currency: currency.to_string(),
    })
}

fn normalize_separators(compact: &str) -> Option<String> {
    let has_dot = compact.contains('.');
    let has_comma = compact.contains(',');

    match (has_dot, has_comma) {
        (false, false) => Some(compact.to_string()),
        (true, true) => {
            // 最後出現的符號是小數點
            let last_dot = compact.rfind('.')?;
            let last_comma = compact.rfind(',')?;
            let (decimal, thousands) = if last_dot > last_comma {
                ('.', ',')
            } else {
                (',', '.')
            };
            if compact.matches(decimal).count() != 1 {
                return None;
            }
            Some(compact.replace(thousands, "").replace(decimal, "."))
        }
        _ => {
            let sep = if has_dot { '.' } else { ',' };
            let groups: Vec<&str> = compact.split(sep).collect();
            let last = groups.last()?;

            if groups.len() == 2 && (1..=2).contains(&last.len()) {
                Some(compact.replace(sep, "."))
            } else if groups[1..].iter().all(|g| g.len() == 3) && !groups[0].is_empty() {
                Some(compact.replace(sep, ""))
            } else {
                None
            }
        }
    }
}

/// `direct` / `nonstop` / `sans escale` → 0, otherwise the first number found.
pub fn parse_stops(text: &str) -> Option<u32> {
    let lower = text.to_lowercase();
    if ["direct", "nonstop", "non-stop", "sans escale", "sin escalas"]
        .iter()
        .any(|marker| lower.contains(marker))
    {
        return Some(0);
    }
    first_number().find(&lower)?.as_str().parse().ok()
}

/// Accepts `2h 05m`, `2 h 05`, `1h`, `45min`.
pub fn parse_duration(text: &str) -> Option<TripDuration> {
    if let Some(caps) = hours_minutes().captures(text) {
        let hours: u32 = caps[1].parse().ok()?;
        let minutes: u32 = caps
            .get(2)
            .map(|m| m.as_str().parse().unwrap_or(0))
            .unwrap_or(0);
        let total = hours.checked_mul(60)?.checked_add(minutes)?;
        return Some(TripDuration::from_minutes(total));
    }

    let caps = minutes_only().captures(text)?;
    let minutes: u32 = caps[1].parse().ok()?;
    Some(TripDuration::from_minutes(minutes))
}

/// Every clock time in `text`, in reading order. 12-hour times with am/pm are
/// converted to 24-hour.
pub fn parse_clock_times(text: &str) -> Vec<NaiveTime> {
    clock_time()
        .captures_iter(text)
        .filter_map(|caps| {
            let mut hour: u32 = caps[1].parse().ok()?;
            let minute: u32 = caps[2].parse().ok()?;
            match caps.get(3).map(|m| m.as_str().to_lowercase()) {
                Some(ref suffix) if suffix == "pm" && hour < 12 => hour += 12,
                Some(ref suffix) if suffix == "am" && hour == 12 => hour = 0,
                _ => {}
            }
            NaiveTime::from_hms_opt(hour, minute, 0)
        })
        .collect()
}

/// 合併多餘空白
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_formats() {
        assert_eq!(parse_price("45 €", "EUR").unwrap().amount, 45.0);
        assert_eq!(parse_price("1\u{202f}234 €", "EUR").unwrap().amount, 1234.0);
        assert_eq!(parse_price("€1,234.56", "EUR").unwrap().amount, 1234.56);
        assert_eq!(parse_price("1.234,56 EUR", "EUR").unwrap().amount, 1234.56);
        assert_eq!(parse_price("89,99 €", "EUR").unwrap().amount, 89.99);
        assert_eq!(parse_price("1,234", "EUR").unwrap().amount, 1234.0);
    }

    #[test]
    fn test_parse_price_currency() {
        assert_eq!(parse_price("£80", "EUR").unwrap().currency, "GBP");
        assert_eq!(parse_price("$120", "EUR").unwrap().currency, "USD");
        assert_eq!(parse_price("120", "EUR").unwrap().currency, "EUR");
    }

    #[test]
    fn test_parse_price_malformed() {
        assert!(parse_price("Prix indisponible", "EUR").is_none());
        assert!(parse_price("", "EUR").is_none());
        assert!(parse_price("1.2.3 €", "EUR").is_none());
    }

    #[test]
    fn test_parse_stops() {
        assert_eq!(parse_stops("direct"), Some(0));
        assert_eq!(parse_stops("Nonstop"), Some(0));
        assert_eq!(parse_stops("1 escale"), Some(1));
        assert_eq!(parse_stops("2 stops"), Some(2));
        assert_eq!(parse_stops("—"), None);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("2h 05m").unwrap().minutes(), 125);
        assert_eq!(parse_duration("2 h 05").unwrap().minutes(), 125);
        assert_eq!(parse_duration("1h").unwrap().minutes(), 60);
        assert_eq!(parse_duration("45min").unwrap().minutes(), 45);
        assert!(parse_duration("n/a").is_none());
    }

    #[test]
    fn test_parse_duration_rejects_huge_hours() {
        assert!(parse_duration("99999999h").is_none());
        assert!(parse_duration("71582788h 59m").is_none());
        assert_eq!(parse_duration("71582788h").unwrap().minutes(), 4_294_967_280);
    }

    #[test]
    fn test_parse_clock_times() {
        let times = parse_clock_times("10:35 – 12:40");
        assert_eq!(times.len(), 2);
        assert_eq!(times[0], NaiveTime::from_hms_opt(10, 35, 0).unwrap());
        assert_eq!(times[1], NaiveTime::from_hms_opt(12, 40, 0).unwrap());

        let times = parse_clock_times("7:05 pm - 12:15 am");
        assert_eq!(times[0], NaiveTime::from_hms_opt(19, 5, 0).unwrap());
        assert_eq!(times[1], NaiveTime::from_hms_opt(0, 15, 0).unwrap());
    }
}
