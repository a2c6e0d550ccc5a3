use scraper::ElementRef;

use crate::link::{is_absolute_http, resolve_link};
use crate::price::{UNPARSEABLE_PRICE, try_parse_price};
use crate::strategy::{FieldRule, FieldRules};

/// Mandatory field a card lacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Title,
    Price,
    Link,
}

impl std::fmt::Display for MissingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingField::Title => write!(f, "title"),
            MissingField::Price => write!(f, "price"),
            MissingField::Link => write!(f, "link"),
        }
    }
}

/// Fields read from one card, before filtering and conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingFields {
    pub title: String,
    pub price_text: String,
    pub price_base: f64,
    pub price_known: bool,
    pub link: String,
    pub image_url: Option<String>,
}

/// Reads listing fields from candidate elements.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    base_origin: String,
}

impl FieldExtractor {
    pub fn new(base_origin: impl Into<String>) -> Self {
        Self {
            base_origin: base_origin.into(),
        }
    }

    /// Extract a card's fields, or name the first mandatory field missing.
    ///
    /// Price text that is present but contains no number is not missing:
    /// it yields [`UNPARSEABLE_PRICE`] with `price_known = false`.
    pub fn extract(
        &self,
        card: ElementRef<'_>,
        rules: &FieldRules,
    ) -> Result<ListingFields, MissingField> {
        let title = first_match(card, &rules.title).ok_or(MissingField::Title)?;
        let price_text = first_match(card, &rules.price).ok_or(MissingField::Price)?;
        let link = self.first_url(card, &rules.link).ok_or(MissingField::Link)?;
        let image_url = self.first_url(card, &rules.image);

        let (price_base, price_known) = match try_parse_price(&price_text) {
            Some(price) => (price, true),
            None => (UNPARSEABLE_PRICE, false),
        };

        Ok(ListingFields {
            title,
            price_text,
            price_base,
            price_known,
            link,
            image_url,
        })
    }

    /// First rule value that resolves to an absolute http(s) URL.
    fn first_url(&self, card: ElementRef<'_>, rules: &[FieldRule]) -> Option<String> {
        rules
            .iter()
            .flat_map(|rule| rule.values(card))
            .filter(|href| !is_placeholder_href(href))
            .map(|href| resolve_link(&href, &self.base_origin))
            .find(|url| is_absolute_http(url))
    }
}

fn first_match(card: ElementRef<'_>, rules: &[FieldRule]) -> Option<String> {
    rules.iter().find_map(|rule| rule.apply(card))
}

fn is_placeholder_href(href: &str) -> bool {
    href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:")
}
