use crate::core::layout::{compile, LayoutSelectors};
use crate::core::normalize::{
    collapse_whitespace, parse_clock_times, parse_duration, parse_price, parse_stops,
};
use crate::domain::model::{FlightRecord, TripDuration};
use crate::utils::error::{Result, ScrapeError};
use chrono::NaiveTime;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Prices without a currency marker are assumed to be euros.
pub const DEFAULT_CURRENCY: &str = "EUR";

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub records: Vec<FlightRecord>,
    pub skipped: usize,
}

struct CompiledLayout {
    result_item: Selector,
    price: Selector,
    airline: Selector,
    leg: Selector,
    times: Selector,
    stops: Selector,
    duration: Selector,
    booking_link: Selector,
}

impl CompiledLayout {
    fn new(selectors: &LayoutSelectors) -> Result<Self> {
        Ok(Self {
            result_item: compile(selectors.result_item)?,
            price: compile(selectors.price)?,
            airline: compile(selectors.airline)?,
            leg: compile(selectors.leg)?,
            times: compile(selectors.times)?,
            stops: compile(selectors.stops)?,
            duration: compile(selectors.duration)?,
            booking_link: compile(selectors.booking_link)?,
        })
    }
}

#[derive(Debug, Default)]
struct Leg {
    departure: Option<NaiveTime>,
    arrival: Option<NaiveTime>,
    stops: u32,
    duration: Option<TripDuration>,
}

fn text_of(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .map(text_of)
        .find(|text| !text.is_empty())
}

fn extract_leg(leg: ElementRef<'_>, layout: &CompiledLayout) -> Leg {
    let times_text = leg
        .select(&layout.times)
        .map(text_of)
        .collect::<Vec<_>>()
        .join(" ");
    let times = parse_clock_times(&times_text);

    Leg {
        departure: times.first().copied(),
        arrival: times.get(1).copied(),
        stops: first_text(leg, &layout.stops)
            .and_then(|t| parse_stops(&t))
            .unwrap_or(0),
        duration: first_text(leg, &layout.duration).and_then(|t| parse_duration(&t)),
    }
}

fn resolve_link(href: &str, base_url: Option<&Url>) -> String {
    match base_url {
        Some(base) => base
            .join(href)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| href.to_string()),
        None => href.to_string(),
    }
}

fn extract_one(
    index: usize,
    item: ElementRef<'_>,
    layout: &CompiledLayout,
    base_url: Option<&Url>,
) -> Result<FlightRecord> {
    let price_text =
        first_text(item, &layout.price).ok_or_else(|| ScrapeError::RecordExtractionError {
            index,
            reason: "missing price".to_string(),
        })?;
    let price = parse_price(&price_text, DEFAULT_CURRENCY).ok_or_else(|| {
        ScrapeError::RecordExtractionError {
            index,
            reason: format!("malformed price '{}'", price_text),
        }
    })?;
    // 排名與警示門檻都以歐元計
    if price.currency != DEFAULT_CURRENCY {
        return Err(ScrapeError::RecordExtractionError {
            index,
            reason: format!("unsupported currency {} in '{}'", price.currency, price_text),
        });
    }

    let airline =
        first_text(item, &layout.airline).ok_or_else(|| ScrapeError::RecordExtractionError {
            index,
            reason: "missing airline".to_string(),
        })?;

    // 第一段是去程，第二段是回程；沒有分段時整張卡片當成單程
    let legs: Vec<ElementRef<'_>> = item.select(&layout.leg).collect();
    let outbound = extract_leg(legs.first().copied().unwrap_or(item), layout);
    let inbound = legs.get(1).map(|leg| extract_leg(*leg, layout)).unwrap_or_default();

    let booking_url = item
        .select(&layout.booking_link)
        .find_map(|a| a.value().attr("href"))
        .map(|href| resolve_link(href.trim(), base_url))
        .unwrap_or_default();

    let mut record = FlightRecord::new(price, airline);
    record.outbound_departure = outbound.departure;
    record.outbound_arrival = outbound.arrival;
    record.outbound_stops = outbound.stops;
    record.outbound_duration = outbound.duration;
    record.return_departure = inbound.departure;
    record.return_arrival = inbound.arrival;
    record.return_stops = inbound.stops;
    record.return_duration = inbound.duration;
    record.booking_url = booking_url;
    Ok(record)
}

/// Walks every result item of `selectors.layout`. Items missing a price or an
/// airline are skipped and counted; they never fail the batch.
pub fn extract_records(
    document: &Html,
    selectors: &LayoutSelectors,
    base_url: Option<&Url>,
) -> Result<Extraction> {
    let layout = CompiledLayout::new(selectors)?;
    let mut extraction = Extraction::default();

    for (index, item) in document.select(&layout.result_item).enumerate() {
        match extract_one(index, item, &layout, base_url) {
            Ok(record) => extraction.records.push(record),
            Err(e) => {
                tracing::warn!("⚠️ {}", e);
                extraction.skipped += 1;
            }
        }
    }

    tracing::info!(
        "📊 Extracted {} offers from {} layout ({} skipped)",
        extraction.records.len(),
        selectors.layout,
        extraction.skipped
    );
    Ok(extraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layout::{GRID_LAYOUT, LIST_LAYOUT};

    fn grid_card(price: &str, airline: &str) -> String {
        format!(
            r#"<div class="nrc6">
                 <ol>
                   <li class="hJSA-item">
                     <div class="vmXl-mod-variant-large"><span>07:10</span> – <span>09:05</span></div>
                     <span class="JWEO-stops-text">direct</span>
                     <div class="xdW8"><div class="vmXl-mod-variant-default">1 h 55</div></div>
                   </li>
                   <li class="hJSA-item">
                     <div class="vmXl-mod-variant-large"><span>18:30</span> – <span>22:45</span></div>
                     <span class="JWEO-stops-text">1 escale</span>
                     <div class="xdW8"><div class="vmXl-mod-variant-default">4 h 15</div></div>
                   </li>
                 </ol>
                 <div class="J0g6-operator-text">{}</div>
                 <div class="f8F1-price-text">{}</div>
                 <a class="oVHK-fclink" href="/book/flight?code=abc">Voir</a>
               </div>"#,
            airline, price
        )
    }

    fn grid_page(cards: &[String]) -> Html {
        Html::parse_document(&format!(
            r#"<html><body><div data-layout="grid"><div class="Fxw9-result-list">{}</div></div></body></html>"#,
            cards.join("\n")
        ))
    }

    #[test]
    fn test_extract_grid_card() {
        let doc = grid_page(&[grid_card("89 €", "Iberia")]);
        let base = Url::parse("https://www.kayak.fr/flights/MAD-PAR").unwrap();

        let extraction = extract_records(&doc, &GRID_LAYOUT, Some(&base)).unwrap();

        assert_eq!(extraction.skipped, 0);
        let record = &extraction.records[0];
        assert_eq!(record.price.amount, 89.0);
        assert_eq!(record.price.currency, "EUR");
        assert_eq!(record.airline, "Iberia");
        assert_eq!(record.outbound_departure, NaiveTime::from_hms_opt(7, 10, 0));
        assert_eq!(record.outbound_arrival, NaiveTime::from_hms_opt(9, 5, 0));
        assert_eq!(record.outbound_stops, 0);
        assert_eq!(record.outbound_duration.unwrap().minutes(), 115);
        assert_eq!(record.return_departure, NaiveTime::from_hms_opt(18, 30, 0));
        assert_eq!(record.return_stops, 1);
        assert_eq!(record.return_duration.unwrap().minutes(), 255);
        assert_eq!(
            record.booking_url,
            "https://www.kayak.fr/book/flight?code=abc"
        );
    }

    #[test]
    fn test_missing_required_fields_are_skipped() {
        let doc = grid_page(&[
            grid_card("89 €", "Iberia"),
            grid_card("Prix indisponible", "Vueling"),
            grid_card("120 €", ""),
        ]);

        let extraction = extract_records(&doc, &GRID_LAYOUT, None).unwrap();

        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.skipped, 2);
    }

    #[test]
    fn test_non_euro_offers_are_skipped() {
        let doc = grid_page(&[
            grid_card("$1,024", "United"),
            grid_card("£95", "British Airways"),
            grid_card("89 €", "Iberia"),
        ]);

        let extraction = extract_records(&doc, &GRID_LAYOUT, None).unwrap();

        assert_eq!(extraction.skipped, 2);
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].airline, "Iberia");
    }

    #[test]
    fn test_optional_fields_default_to_sentinels() {
        let doc = grid_page(&[r#"<div class="nrc6">
                <div class="J0g6-operator-text">Transavia</div>
                <div class="f8F1-price-text">45 €</div>
            </div>"#
            .to_string()]);

        let extraction = extract_records(&doc, &GRID_LAYOUT, None).unwrap();
        let record = &extraction.records[0];

        assert_eq!(record.outbound_stops, 0);
        assert!(record.outbound_duration.is_none());
        assert!(record.outbound_departure.is_none());
        assert!(record.booking_url.is_empty());
        assert!(record.is_one_way());
    }

    #[test]
    fn test_empty_results_page_yields_nothing() {
        let doc = grid_page(&[]);
        let extraction = extract_records(&doc, &GRID_LAYOUT, None).unwrap();
        assert!(extraction.records.is_empty());
        assert_eq!(extraction.skipped, 0);
    }

    #[test]
    fn test_extract_list_layout() {
        let doc = Html::parse_document(
            r#"<html><body><div id="searchResultsList"><ol class="resultsContainer">
                 <li class="resultWrapper">
                   <div class="flight-leg">
                     <span class="depart-time">6:15 am</span><span class="arrival-time">8:20 am</span>
                     <span class="stops-text">nonstop</span>
                     <div class="section duration"><div class="top">2h 05m</div></div>
                   </div>
                   <div class="codeshares-airline-names">Air Europa</div>
                   <span class="price-text">1.024 €</span>
                   <a class="booking-link" href="https://example.com/book/1">Book</a>
                 </li>
               </ol></div></body></html>"#,
        );

        let extraction = extract_records(&doc, &LIST_LAYOUT, None).unwrap();
        let record = &extraction.records[0];

        assert_eq!(record.price.amount, 1024.0);
        assert_eq!(record.price.currency, "EUR");
        assert_eq!(record.airline, "Air Europa");
        assert_eq!(record.outbound_departure, NaiveTime::from_hms_opt(6, 15, 0));
        assert_eq!(record.outbound_duration.unwrap().minutes(), 125);
        assert_eq!(record.booking_url, "https://example.com/book/1");
    }
}
