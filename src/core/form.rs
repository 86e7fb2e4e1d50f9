//! Search form population on the travel site's home page.
//!
//! The form is expressed as a list of [`FormAction`]s. Stepper clicks are not
//! idempotent, so a failed action is retried on its own instead of replaying
//! the whole form.

use crate::domain::model::SearchQuery;
use crate::domain::ports::BrowserSession;
use crate::utils::error::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Selectors for the search form. `calendar_day` is a template where `{date}`
/// is replaced by the ISO date to pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSelectors {
    pub origin_clear: String,
    pub origin_input: String,
    pub destination_input: String,
    /// 每個城市欄位各自有一個自動完成清單
    pub suggestion_list: String,
    pub suggestion_item: String,
    pub dates_field: String,
    pub calendar_day: String,
    pub passengers_toggle: String,
    pub adults_increment: String,
    pub children_increment: String,
    pub search_button: String,
}

impl Default for FormSelectors {
    fn default() -> Self {
        Self {
            origin_clear: "div[class*='vvTc-item-close']".to_string(),
            origin_input: "input[placeholder='De ?']".to_string(),
            destination_input: "input[placeholder='À ?']".to_string(),
            suggestion_list: "ul[role='listbox']".to_string(),
            suggestion_item: "li".to_string(),
            dates_field: "[data-placeholder='Aller']".to_string(),
            calendar_day: "div[role='button'][data-date='{date}']".to_string(),
            passengers_toggle: "div[class*='travelers'] div[role='button']".to_string(),
            adults_increment: "div[aria-label*='Adultes'] button[aria-label*='Augmenter']"
                .to_string(),
            children_increment: "div[aria-label*='Enfants'] button[aria-label*='Augmenter']"
                .to_string(),
            search_button: "button[aria-label='Lancer la recherche']".to_string(),
        }
    }
}

impl FormSelectors {
    pub fn day(&self, date: NaiveDate) -> String {
        self.calendar_day
            .replace("{date}", &date.format("%Y-%m-%d").to_string())
    }
}

/// One browser interaction of the search form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormAction {
    /// 有出現才點（例如預設帶入的出發地）
    ClickIfPresent(String),
    Click(String),
    Fill { selector: String, text: String },
    /// First `item` inside the `index`-th `container`
    ClickWithin {
        container: String,
        index: usize,
        item: String,
    },
    /// Lets autocomplete lists and popovers render.
    Settle,
}

impl fmt::Display for FormAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormAction::ClickIfPresent(selector) => write!(f, "click {} if present", selector),
            FormAction::Click(selector) => write!(f, "click {}", selector),
            FormAction::Fill { selector, text } => write!(f, "type '{}' into {}", text, selector),
            FormAction::ClickWithin {
                container,
                index,
                item,
            } => write!(f, "click {} in {} #{}", item, container, index),
            FormAction::Settle => write!(f, "wait"),
        }
    }
}

/// Actions filling origin, destination, optional dates and passengers, then
/// submitting.
pub fn form_actions(form: &FormSelectors, query: &SearchQuery) -> Vec<FormAction> {
    let mut actions = vec![FormAction::ClickIfPresent(form.origin_clear.clone())];

    let cities = [
        (&form.origin_input, &query.origin),
        (&form.destination_input, &query.destination),
    ];
    for (index, (input, city)) in cities.into_iter().enumerate() {
        actions.push(FormAction::Fill {
            selector: input.clone(),
            text: city.clone(),
        });
        actions.push(FormAction::Settle);
        actions.push(FormAction::ClickWithin {
            container: form.suggestion_list.clone(),
            index,
            item: form.suggestion_item.clone(),
        });
    }

    if let Some(range) = &query.date_range {
        actions.push(FormAction::Click(form.dates_field.clone()));
        actions.push(FormAction::Settle);
        actions.push(FormAction::Click(form.day(range.start)));
        actions.push(FormAction::Click(form.day(range.end)));
    }

    let passengers = query.passengers;
    if passengers.adults > 1 || passengers.children > 0 {
        actions.push(FormAction::Click(form.passengers_toggle.clone()));
        actions.push(FormAction::Settle);
        // 表單預設就有一位成人
        for _ in 1..passengers.adults {
            actions.push(FormAction::Click(form.adults_increment.clone()));
        }
        for _ in 0..passengers.children {
            actions.push(FormAction::Click(form.children_increment.clone()));
        }
    }

    actions.push(FormAction::Click(form.search_button.clone()));
    actions
}

pub async fn perform<B: BrowserSession + ?Sized>(
    browser: &mut B,
    action: &FormAction,
    settle: Duration,
) -> Result<()> {
    match action {
        FormAction::ClickIfPresent(selector) => {
            if browser.is_present(selector).await? {
                browser.click(selector).await?;
            }
            Ok(())
        }
        FormAction::Click(selector) => browser.click(selector).await,
        FormAction::Fill { selector, text } => browser.fill(selector, text).await,
        FormAction::ClickWithin {
            container,
            index,
            item,
        } => browser.click_within(container, *index, item).await,
        FormAction::Settle => {
            tokio::time::sleep(settle).await;
            Ok(())
        }
    }
}
