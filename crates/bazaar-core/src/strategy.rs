//! Selector strategies: declarative hypotheses about listing markup.
//!
//! A [`SelectorStrategy`] names a container selector (what a product card
//! looks like) and, per field, an ordered list of [`FieldRule`]s. Both levels
//! are evaluated first-match-wins. Adding support for a new page layout means
//! adding a strategy, not editing the extraction code.
//!
//! Strategies can also be loaded from JSON:
//!
//! ```json
//! [{
//!   "name": "tile",
//!   "container": "div.tile",
//!   "title": [{"selector": ".tile-name"}],
//!   "price": [{"selector": ".tile-price"}],
//!   "link": [{"selector": "a", "attr": "href"}],
//!   "image": [{"selector": "img", "attr": "src"}]
//! }]
//! ```

use scraper::{ElementRef, Selector};
use serde::Deserialize;

use crate::error::AppError;

/// Where a rule reads its value from once the element is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    /// Concatenated, whitespace-collapsed text content.
    Text,
    /// The value of the named attribute.
    Attr(String),
}

/// One way of finding one field inside a candidate element.
#[derive(Debug, Clone)]
pub struct FieldRule {
    /// `None` reads from the candidate element itself.
    selector: Option<Selector>,
    source: FieldSource,
}

impl FieldRule {
    /// Text of the first descendant matching `css`.
    pub fn text(css: &str) -> Result<Self, AppError> {
        Ok(Self {
            selector: Some(compile(css)?),
            source: FieldSource::Text,
        })
    }

    /// Attribute `attr` of the first descendant matching `css` that has it.
    pub fn attr(css: &str, attr: &str) -> Result<Self, AppError> {
        Ok(Self {
            selector: Some(compile(css)?),
            source: FieldSource::Attr(attr.to_string()),
        })
    }

    /// Attribute `attr` of the candidate element itself.
    pub fn own_attr(attr: &str) -> Self {
        Self {
            selector: None,
            source: FieldSource::Attr(attr.to_string()),
        }
    }

    /// Text of the candidate element itself.
    pub fn own_text() -> Self {
        Self {
            selector: None,
            source: FieldSource::Text,
        }
    }

    /// Apply the rule to `element`, returning a non-empty trimmed value.
    pub fn apply(&self, element: ElementRef<'_>) -> Option<String> {
        match &self.selector {
            None => read(element, &self.source),
            Some(selector) => element
                .select(selector)
                .find_map(|found| read(found, &self.source)),
        }
    }

    /// Every non-empty value the rule yields, in document order.
    pub fn values(&self, element: ElementRef<'_>) -> Vec<String> {
        match &self.selector {
            None => read(element, &self.source).into_iter().collect(),
            Some(selector) => element
                .select(selector)
                .filter_map(|found| read(found, &self.source))
                .collect(),
        }
    }
}

fn read(element: ElementRef<'_>, source: &FieldSource) -> Option<String> {
    let value = match source {
        FieldSource::Text => collapse_whitespace(&element.text().collect::<String>()),
        FieldSource::Attr(name) => element.value().attr(name)?.trim().to_string(),
    };
    Some(value).filter(|v| !v.is_empty())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Ordered fallback rules for each field of a card.
#[derive(Debug, Clone)]
pub struct FieldRules {
    pub title: Vec<FieldRule>,
    pub price: Vec<FieldRule>,
    pub link: Vec<FieldRule>,
    pub image: Vec<FieldRule>,
}

/// A named hypothesis for locating product cards and reading their fields.
#[derive(Debug, Clone)]
pub struct SelectorStrategy {
    pub name: String,
    pub container: Selector,
    pub fields: FieldRules,
}

impl SelectorStrategy {
    pub fn new(name: &str, container_css: &str, fields: FieldRules) -> Result<Self, AppError> {
        Ok(Self {
            name: name.to_string(),
            container: compile(container_css)?,
            fields,
        })
    }
}

/// Built-in strategies, most specific first.
pub fn default_strategies() -> Result<Vec<SelectorStrategy>, AppError> {
    let image = || -> Result<Vec<FieldRule>, AppError> {
        Ok(vec![
            FieldRule::attr("img[data-src]", "data-src")?,
            FieldRule::attr("img[src]", "src")?,
        ])
    };

    Ok(vec![
        SelectorStrategy::new(
            "product-card",
            "div.product-card",
            FieldRules {
                title: vec![FieldRule::text("h3")?, FieldRule::attr("a[title]", "title")?],
                price: vec![FieldRule::text("span.price")?, FieldRule::text(".price")?],
                link: vec![FieldRule::attr("a[href]", "href")?],
                image: image()?,
            },
        )?,
        SelectorStrategy::new(
            "product-item",
            ".product-item, li.product",
            FieldRules {
                title: vec![
                    FieldRule::text(".product-title, .product-name")?,
                    FieldRule::text(".title, h2, h3, h4")?,
                    FieldRule::attr("img[alt]", "alt")?,
                ],
                price: vec![
                    FieldRule::text(".price-current, .sale-price")?,
                    FieldRule::text("[class*='price']")?,
                ],
                link: vec![
                    FieldRule::attr("a.product-link[href]", "href")?,
                    FieldRule::attr("a[href]", "href")?,
                ],
                image: image()?,
            },
        )?,
        SelectorStrategy::new(
            "goods-card",
            "[data-product-id], .goods-item",
            FieldRules {
                title: vec![
                    FieldRule::text(".goods-title, .goods-name")?,
                    FieldRule::attr("[title]", "title")?,
                ],
                price: vec![
                    FieldRule::attr("[data-price]", "data-price")?,
                    FieldRule::text(".goods-price, [class*='price']")?,
                ],
                link: vec![
                    FieldRule::own_attr("data-href"),
                    FieldRule::attr("a[href]", "href")?,
                ],
                image: image()?,
            },
        )?,
        SelectorStrategy::new(
            "product-anchor",
            "a[href*='/product']",
            FieldRules {
                title: vec![
                    FieldRule::own_attr("title"),
                    FieldRule::attr("img[alt]", "alt")?,
                    FieldRule::own_text(),
                ],
                price: vec![FieldRule::text("[class*='price']")?],
                link: vec![FieldRule::own_attr("href")],
                image: image()?,
            },
        )?,
    ])
}

/// JSON form of a [`SelectorStrategy`].
#[derive(Debug, Clone, Deserialize)]
pub struct StrategySpec {
    pub name: String,
    pub container: String,
    pub title: Vec<RuleSpec>,
    pub price: Vec<RuleSpec>,
    pub link: Vec<RuleSpec>,
    #[serde(default)]
    pub image: Vec<RuleSpec>,
}

/// JSON form of a [`FieldRule`]. Missing `selector` reads the card itself;
/// missing `attr` reads text.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSpec {
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub attr: Option<String>,
}

impl RuleSpec {
    fn compile(&self) -> Result<FieldRule, AppError> {
        match (&self.selector, &self.attr) {
            (Some(css), Some(attr)) => FieldRule::attr(css, attr),
            (Some(css), None) => FieldRule::text(css),
            (None, Some(attr)) => Ok(FieldRule::own_attr(attr)),
            (None, None) => Ok(FieldRule::own_text()),
        }
    }
}

impl StrategySpec {
    pub fn compile(&self) -> Result<SelectorStrategy, AppError> {
        let rules = |specs: &[RuleSpec]| -> Result<Vec<FieldRule>, AppError> {
            specs.iter().map(RuleSpec::compile).collect()
        };
        SelectorStrategy::new(
            &self.name,
            &self.container,
            FieldRules {
                title: rules(&self.title)?,
                price: rules(&self.price)?,
                link: rules(&self.link)?,
                image: rules(&self.image)?,
            },
        )
    }
}

/// Parse and compile a JSON array of strategies, keeping file order.
pub fn strategies_from_json(json: &str) -> Result<Vec<SelectorStrategy>, AppError> {
    let specs: Vec<StrategySpec> = serde_json::from_str(json)?;
    if specs.is_empty() {
        return Err(AppError::SelectorError(
            "strategy file contains no strategies".into(),
        ));
    }
    specs.iter().map(StrategySpec::compile).collect()
}

fn compile(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css).map_err(|e| AppError::SelectorError(format!("'{css}': {e}")))
}
