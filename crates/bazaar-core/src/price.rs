use std::sync::LazyLock;

use regex::Regex;

/// Price assigned when a card's price text contains no usable number.
///
/// Large enough to fail any realistic price ceiling, so unparseable listings
/// drop out of budget-filtered searches but still show up when no ceiling is
/// set. Records built from it carry `price_known = false`.
pub const UNPARSEABLE_PRICE: f64 = 99_999.0;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("number pattern is valid"));

/// Group separators removed before matching.
const GROUP_SEPARATORS: [char; 2] = [',', '，'];

/// Extract the first number from free-form price text.
///
/// `"¥1,234.56"` gives `Some(1234.56)`; `"N/A"` gives `None`.
pub fn try_parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !GROUP_SEPARATORS.contains(c))
        .collect();
    NUMBER
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|p| p.is_finite())
}

/// Like [`try_parse_price`], falling back to [`UNPARSEABLE_PRICE`].
pub fn parse_price(text: &str) -> f64 {
    try_parse_price(text).unwrap_or(UNPARSEABLE_PRICE)
}
