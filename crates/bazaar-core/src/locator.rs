use scraper::{ElementRef, Html};

use crate::error::AppError;
use crate::strategy::{SelectorStrategy, default_strategies};

/// Cards found by the first strategy that matched anything.
pub struct LocatedCards<'a> {
    pub strategy: &'a SelectorStrategy,
    pub cards: Vec<ElementRef<'a>>,
}

/// Finds product cards by trying strategies in priority order.
#[derive(Debug, Clone)]
pub struct ProductCardLocator {
    strategies: Vec<SelectorStrategy>,
}

impl ProductCardLocator {
    pub fn new(strategies: Vec<SelectorStrategy>) -> Self {
        Self { strategies }
    }

    /// Locator over the built-in strategies.
    pub fn with_defaults() -> Result<Self, AppError> {
        Ok(Self::new(default_strategies()?))
    }

    pub fn strategies(&self) -> &[SelectorStrategy] {
        &self.strategies
    }

    /// Return the cards of the first strategy with a non-empty match.
    ///
    /// Results from different strategies are never merged. `None` means no
    /// strategy matched, which is a normal outcome when the markup changes.
    pub fn locate<'a>(&'a self, document: &'a Html) -> Option<LocatedCards<'a>> {
        for strategy in &self.strategies {
            let cards: Vec<ElementRef<'a>> = document.select(&strategy.container).collect();
            if cards.is_empty() {
                tracing::debug!(strategy = %strategy.name, "Strategy matched no cards");
                continue;
            }
            tracing::debug!(strategy = %strategy.name, count = cards.len(), "Strategy matched");
            return Some(LocatedCards { strategy, cards });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{FieldRule, FieldRules};

    fn strategy(name: &str, container: &str) -> SelectorStrategy {
        SelectorStrategy::new(
            name,
            container,
            FieldRules {
                title: vec![FieldRule::own_text()],
                price: vec![FieldRule::own_text()],
                link: vec![FieldRule::own_attr("href")],
                image: vec![],
            },
        )
        .unwrap()
    }

    fn three_strategies() -> ProductCardLocator {
        ProductCardLocator::new(vec![
            strategy("first", "div.alpha"),
            strategy("second", "div.beta"),
            strategy("third", "div"),
        ])
    }

    #[test]
    fn second_strategy_wins_without_merging() {
        let doc = Html::parse_document(
            r#"<div class="beta">1</div><div class="beta">2</div><div class="gamma">3</div>"#,
        );
        let locator = three_strategies();
        let located = locator.locate(&doc).unwrap();
        assert_eq!(located.strategy.name, "second");
        assert_eq!(located.cards.len(), 2);
    }

    #[test]
    fn first_strategy_takes_priority() {
        let doc = Html::parse_document(r#"<div class="alpha">1</div><div class="beta">2</div>"#);
        let locator = three_strategies();
        let located = locator.locate(&doc).unwrap();
        assert_eq!(located.strategy.name, "first");
        assert_eq!(located.cards.len(), 1);
    }

    #[test]
    fn no_match_is_none() {
        let doc = Html::parse_document("<p>nothing here</p>");
        let locator = ProductCardLocator::new(vec![strategy("only", "div.card")]);
        assert!(locator.locate(&doc).is_none());
    }

    #[test]
    fn defaults_find_product_cards() {
        let doc = Html::parse_document(
            r#"<div class="product-card"><h3>A</h3><span class="price">¥1</span><a href="/p/1">a</a></div>"#,
        );
        let locator = ProductCardLocator::with_defaults().unwrap();
        let located = locator.locate(&doc).unwrap();
        assert_eq!(located.strategy.name, "product-card");
    }
}
