//! Pulls the email value out of a rendered carrier registration page.
//!
//! The page lists registration details as `<li><label>Email:</label>
//! <span class="dat">...</span></li>` pairs, but the markup has drifted
//! over time. Two passes run in order:
//!
//! 1. a strict scan of `ul > li` pairs whose label reads exactly "Email";
//! 2. a loose scan of any `<label>` mentioning "email" (or "e-mail"), reading the value
//!    from its parent's `.dat` element or from the label's next sibling.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailExtraction {
    Found(String),
    /// An email label exists but no email-shaped value sits next to it.
    EmptyValue,
    NoLabel,
}

pub struct Extractor {
    email_regex: Regex,
    list_item: Selector,
    item_value: Selector,
    any_label: Selector,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    pub fn new() -> Self {
        Extractor {
            email_regex: Regex::new(r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}")
                .expect("email regex"),
            list_item: Selector::parse("ul > li").expect("list item selector"),
            item_value: Selector::parse(".dat").expect("value selector"),
            any_label: Selector::parse("label").expect("label selector"),
        }
    }

    pub fn extract_email(&self, html: &str) -> EmailExtraction {
        let document = Html::parse_document(html);

        let strict = self.strict_scan(&document);
        if let EmailExtraction::Found(_) = strict {
            return strict;
        }
        match self.loose_scan(&document) {
            EmailExtraction::NoLabel => strict,
            loose @ EmailExtraction::Found(_) => loose,
            EmailExtraction::EmptyValue => EmailExtraction::EmptyValue,
        }
    }

    fn strict_scan(&self, document: &Html) -> EmailExtraction {
        let mut saw_label = false;
        for item in document.select(&self.list_item) {
            let Some(label) = item
                .children()
                .filter_map(ElementRef::wrap)
                .find(|child| child.value().name() == "label")
            else {
                continue;
            };
            if normalize_label(&element_text(label)) != "email" {
                continue;
            }
            saw_label = true;
            let value = item.select(&self.item_value).next().map(element_text);
            if let Some(email) = value.and_then(|v| self.email_in(&v)) {
                return EmailExtraction::Found(email);
            }
        }
        if saw_label {
            EmailExtraction::EmptyValue
        } else {
            EmailExtraction::NoLabel
        }
    }

    fn loose_scan(&self, document: &Html) -> EmailExtraction {
        let mut saw_label = false;
        for label in document.select(&self.any_label) {
            if !mentions_email(&element_text(label)) {
                continue;
            }
            saw_label = true;
            if let Some(email) = self.value_near(label) {
                return EmailExtraction::Found(email);
            }
        }
        if saw_label {
            EmailExtraction::EmptyValue
        } else {
            EmailExtraction::NoLabel
        }
    }

    fn value_near(&self, label: ElementRef<'_>) -> Option<String> {
        let from_parent = label
            .parent()
            .and_then(ElementRef::wrap)
            .and_then(|parent| parent.select(&self.item_value).next())
            .map(element_text)
            .and_then(|text| self.email_in(&text));
        if from_parent.is_some() {
            return from_parent;
        }

        label
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .next()
            .map(element_text)
            .and_then(|text| self.email_in(&text))
    }

    fn email_in(&self, text: &str) -> Option<String> {
        self.email_regex
            .find(text)
            .map(|m| m.as_str().trim().to_string())
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// "Email", "E-mail" and "E-MAIL ADDRESS" all count.
fn mentions_email(text: &str) -> bool {
    text.to_lowercase().replace('-', "").contains("email")
}

fn normalize_label(text: &str) -> String {
    text.trim().trim_end_matches(':').trim().to_lowercase()
}
