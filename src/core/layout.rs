//! Results-page layouts and their selector tables.
//!
//! The search site serves more than one markup for the same results. Each
//! variant is a [`Layout`] tag plus a [`LayoutSelectors`] table; detection only
//! checks which marker selectors are present.

use crate::utils::error::{Result, ScrapeError};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// 卡片式結果（較新的版面）
    Grid,
    /// 清單式結果
    List,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Grid => write!(f, "grid"),
            Layout::List => write!(f, "list"),
        }
    }
}

/// CSS selectors for one layout. Field selectors are evaluated inside a result
/// item (`price`, `airline`, `leg`, `booking_link`) or inside a leg (`times`,
/// `stops`, `duration`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutSelectors {
    pub layout: Layout,
    pub markers: &'static [&'static str],
    pub result_item: &'static str,
    pub price: &'static str,
    pub airline: &'static str,
    pub leg: &'static str,
    pub times: &'static str,
    pub stops: &'static str,
    pub duration: &'static str,
    pub booking_link: &'static str,
}

pub const GRID_LAYOUT: LayoutSelectors = LayoutSelectors {
    layout: Layout::Grid,
    markers: &["div[data-layout='grid']", "div.Fxw9-result-list"],
    result_item: "div.nrc6",
    price: "div.f8F1-price-text",
    airline: "div.J0g6-operator-text",
    leg: "li.hJSA-item",
    times: "div.vmXl-mod-variant-large span",
    stops: "span.JWEO-stops-text",
    duration: "div.xdW8 div.vmXl-mod-variant-default",
    booking_link: "a.oVHK-fclink",
};

pub const LIST_LAYOUT: LayoutSelectors = LayoutSelectors {
    layout: Layout::List,
    markers: &["div#searchResultsList", "ol.resultsContainer"],
    result_item: "li.resultWrapper",
    price: "span.price-text",
    airline: "div.codeshares-airline-names",
    leg: "div.flight-leg",
    times: "span.depart-time, span.arrival-time",
    stops: "span.stops-text",
    duration: "div.section.duration div.top",
    booking_link: "a.booking-link",
};

static BUILTIN_LAYOUTS: [LayoutSelectors; 2] = [GRID_LAYOUT, LIST_LAYOUT];

pub fn builtin_layouts() -> &'static [LayoutSelectors] {
    &BUILTIN_LAYOUTS
}

pub fn selectors_for(layout: Layout) -> &'static LayoutSelectors {
    match layout {
        Layout::Grid => &BUILTIN_LAYOUTS[0],
        Layout::List => &BUILTIN_LAYOUTS[1],
    }
}

pub(crate) fn compile(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::LayoutDetectionError {
        reason: format!("invalid selector '{}': {:?}", css, e),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerMatch {
    None,
    Partial,
    Full,
}

fn match_markers(document: &Html, selectors: &LayoutSelectors) -> Result<MarkerMatch> {
    let mut present = 0;
    for css in selectors.markers {
        if document.select(&compile(css)?).next().is_some() {
            present += 1;
        }
    }

    Ok(match present {
        0 => MarkerMatch::None,
        n if n == selectors.markers.len() => MarkerMatch::Full,
        _ => MarkerMatch::Partial,
    })
}

/// Classifies the page. Exactly one layout must match all of its markers while
/// no other layout matches any; everything else is a detection failure.
pub fn detect_layout(document: &Html, layouts: &[LayoutSelectors]) -> Result<Layout> {
    let mut candidates = Vec::new();
    for selectors in layouts {
        let matched = match_markers(document, selectors)?;
        if matched != MarkerMatch::None {
            candidates.push((selectors.layout, matched));
        }
    }

    match candidates.as_slice() {
        [] => Err(ScrapeError::LayoutDetectionError {
            reason: "no known layout marker found on the page".to_string(),
        }),
        [(layout, MarkerMatch::Full)] => {
            tracing::debug!("Detected {} layout", layout);
            Ok(*layout)
        }
        [(layout, _)] => Err(ScrapeError::LayoutDetectionError {
            reason: format!("{} layout only partially matched", layout),
        }),
        many => Err(ScrapeError::LayoutDetectionError {
            reason: format!(
                "ambiguous page, markers of several layouts present: {}",
                many.iter()
                    .map(|(layout, _)| layout.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> Html {
        Html::parse_document(&format!("<html><body>{}</body></html>", body))
    }

    #[test]
    fn test_detect_grid_layout() {
        let doc = page(r#"<div data-layout="grid"><div class="Fxw9-result-list"></div></div>"#);
        assert_eq!(detect_layout(&doc, builtin_layouts()).unwrap(), Layout::Grid);
    }

    #[test]
    fn test_detect_list_layout() {
        let doc = page(r#"<div id="searchResultsList"><ol class="resultsContainer"></ol></div>"#);
        assert_eq!(detect_layout(&doc, builtin_layouts()).unwrap(), Layout::List);
    }

    #[test]
    fn test_unknown_layout() {
        let doc = page("<p>Nothing to see here</p>");
        let err = detect_layout(&doc, builtin_layouts()).unwrap_err();
        assert!(matches!(err, ScrapeError::LayoutDetectionError { .. }));
    }

    #[test]
    fn test_partial_match_is_failure() {
        let doc = page(r#"<div data-layout="grid"></div>"#);
        assert!(detect_layout(&doc, builtin_layouts()).is_err());
    }

    #[test]
    fn test_both_layouts_partially_present_is_ambiguous() {
        let doc = page(r#"<div data-layout="grid"></div><div id="searchResultsList"></div>"#);
        let err = detect_layout(&doc, builtin_layouts()).unwrap_err();
        assert!(err.to_string().contains("ambiguous"));
    }

    #[test]
    fn test_full_match_with_other_partial_is_ambiguous() {
        let doc = page(
            r#"<div data-layout="grid"><div class="Fxw9-result-list"></div></div>
               <ol class="resultsContainer"></ol>"#,
        );
        assert!(detect_layout(&doc, builtin_layouts()).is_err());
    }

    #[test]
    fn test_builtin_selectors_compile() {
        for table in builtin_layouts() {
            for css in table.markers.iter().chain(
                [
                    &table.result_item,
                    &table.price,
                    &table.airline,
                    &table.leg,
                    &table.times,
                    &table.stops,
                    &table.duration,
                    &table.booking_link,
                ]
                .into_iter(),
            ) {
                assert!(compile(css).is_ok(), "selector {} should compile", css);
            }
        }
    }
}
