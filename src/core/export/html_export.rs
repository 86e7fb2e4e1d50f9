use crate::core::export::ExportBatch;
use crate::core::extract::DEFAULT_CURRENCY;
use crate::core::summary::PriceStats;
use crate::domain::model::FlightRecord;
use chrono::NaiveTime;

const STYLE: &str = r#"
    body { font-family: Arial, sans-serif; margin: 20px; color: #2c3e50; }
    h1 { border-bottom: 2px solid #3498db; padding-bottom: 5px; }
    .stats td { padding: 6px 12px; border: 1px solid #ddd; }
    .stats td:first-child { font-weight: bold; background-color: #f8f9fa; }
    table.offers { border-collapse: collapse; margin-top: 20px; }
    table.offers th, table.offers td { padding: 6px 10px; border: 1px solid #ddd; text-align: left; }
    table.offers th { background-color: #3498db; color: #fff; }
    .empty { font-style: italic; color: #7f8c8d; }
"#;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn clock(time: Option<NaiveTime>) -> String {
    time.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "–".to_string())
}

fn leg_cell(
    departure: Option<NaiveTime>,
    arrival: Option<NaiveTime>,
    stops: u32,
    duration: Option<String>,
) -> String {
    let stops = match stops {
        0 => "direct".to_string(),
        1 => "1 stop".to_string(),
        n => format!("{} stops", n),
    };
    format!(
        "{} → {}<br><small>{} · {}</small>",
        clock(departure),
        clock(arrival),
        duration.unwrap_or_else(|| "–".to_string()),
        stops
    )
}

fn offer_row(record: &FlightRecord) -> String {
    let outbound = leg_cell(
        record.outbound_departure,
        record.outbound_arrival,
        record.outbound_stops,
        record.outbound_duration.map(|d| d.to_string()),
    );
    let inbound = if record.is_one_way() {
        "–".to_string()
    } else {
        leg_cell(
            record.return_departure,
            record.return_arrival,
            record.return_stops,
            record.return_duration.map(|d| d.to_string()),
        )
    };
    let link = if record.booking_url.is_empty() {
        "–".to_string()
    } else {
        format!(
            r#"<a href="{}" target="_blank" rel="noopener">Book</a>"#,
            escape(&record.booking_url)
        )
    };

    format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
        record.rank,
        escape(&record.price.to_string()),
        escape(&record.airline),
        outbound,
        inbound,
        link
    )
}

/// Self-contained report. An empty batch renders an empty-state paragraph
/// instead of the stats and table.
pub fn render_html(batch: &ExportBatch<'_>) -> String {
    let query = batch.query;
    let title = escape(&format!("Flight offers from {} to {}", query.origin, query.destination));

    let mut body = Vec::new();
    body.push(format!("<h1>{}</h1>", title));
    body.push(format!(
        "<p>Generated {} · {} adult(s), {} child(ren){}</p>",
        batch.generated_at.format("%Y-%m-%d %H:%M UTC"),
        query.passengers.adults,
        query.passengers.children,
        query
            .date_range
            .map(|r| format!(" · {} → {}", r.start, r.end))
            .unwrap_or_default()
    ));

    match PriceStats::from_records(batch.records) {
        None => {
            body.push(r#"<p class="empty">No flights found for this search.</p>"#.to_string());
        }
        Some(stats) => {
            let currency = DEFAULT_CURRENCY;
            body.push(format!(
                r#"<table class="stats">
<tr><td>Offers</td><td>{}</td></tr>
<tr><td>Minimum</td><td>{:.2} {}</td></tr>
<tr><td>Maximum</td><td>{:.2} {}</td></tr>
<tr><td>Average</td><td>{:.2} {}</td></tr>
</table>"#,
                stats.count,
                stats.min,
                escape(currency),
                stats.max,
                escape(currency),
                stats.average,
                escape(currency)
            ));

            let rows: Vec<String> = batch.records.iter().map(offer_row).collect();
            body.push(format!(
                r#"<table class="offers">
<thead><tr><th>#</th><th>Price</th><th>Airline</th><th>Outbound</th><th>Return</th><th>Link</th></tr></thead>
<tbody>
{}
</tbody>
</table>"#,
                rows.join("\n")
            ));
        }
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{}</title>
<style>{}</style>
</head>
<body>
{}
</body>
</html>
"#,
        title,
        STYLE,
        body.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rank::rank;
    use crate::domain::model::{Price, SearchQuery};
    use chrono::Utc;
    use scraper::{Html, Selector};

    #[test]
    fn test_empty_state_document() {
        let query = SearchQuery::new("Madrid", "Paris");
        let html = render_html(&ExportBatch {
            query: &query,
            generated_at: Utc::now(),
            records: &[],
        });

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("No flights found for this search."));
        assert!(!html.contains("<table"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_report_lists_ranked_offers_with_stats() {
        let query = SearchQuery::new("Madrid", "Paris");
        let records = rank(
            vec![
                FlightRecord::new(Price::eur(200.0), "Air France"),
                FlightRecord::new(Price::eur(45.0), "Transavia"),
                FlightRecord::new(Price::eur(80.0), "Vueling"),
            ],
            5,
        );

        let html = render_html(&ExportBatch {
            query: &query,
            generated_at: Utc::now(),
            records: &records,
        });

        let doc = Html::parse_document(&html);
        let rows = Selector::parse("table.offers tbody tr").unwrap();
        let airlines: Vec<String> = doc
            .select(&rows)
            .map(|row| row.text().collect::<Vec<_>>().join(" "))
            .collect();

        assert_eq!(airlines.len(), 3);
        assert!(airlines[0].contains("Transavia"));
        assert!(html.contains("<td>Minimum</td><td>45.00 EUR</td>"));
        assert!(html.contains("<td>Maximum</td><td>200.00 EUR</td>"));
        assert!(html.contains("<td>Average</td><td>108.33 EUR</td>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let query = SearchQuery::new("<script>", "Paris");
        let records = rank(vec![FlightRecord::new(Price::eur(10.0), "A & B")], 5);
        let html = render_html(&ExportBatch {
            query: &query,
            generated_at: Utc::now(),
            records: &records,
        });

        assert!(!html.contains("<script>"));
        assert!(html.contains("A &amp; B"));
    }
}
