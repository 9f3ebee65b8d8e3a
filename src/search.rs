//! Keyword search over the live catalog, ranked by price.

use crate::db::{self, OfferHit, Pool};
use anyhow::Result;

/// One search hit with everything needed to render an inline result.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub hit: OfferHit,
}

impl SearchResult {
    /// Inline result title: shop kind glyph, shop name, shop mana.
    pub fn title(&self) -> String {
        format!(
            "{}{} {}💧",
            self.hit.shop_kind, self.hit.shop_name, self.hit.shop_mana
        )
    }

    /// Inline result description: the offer line, then the owner line.
    pub fn description(&self) -> String {
        format!(
            "{} - {}💧 {}💰\n{}{}",
            self.hit.item, self.hit.mana, self.hit.price, self.hit.owner_castle, self.hit.owner_name
        )
    }

    /// Deep-link command a client sends to open the shop.
    pub fn message_text(&self) -> String {
        format!("/ws_{}", self.hit.shop_link)
    }
}

/// Split a free-text query into keywords. Whitespace-only queries produce an
/// empty set, which matches every offer.
pub fn keywords(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_string).collect()
}

/// Search the live catalog. Every keyword must appear in the offer's item
/// name (case-insensitive substring); results come cheapest first, capped at
/// `limit`.
pub async fn search(pool: &Pool, query: &str, limit: u32) -> Result<Vec<SearchResult>> {
    let keywords = keywords(query);
    let hits = db::search_offers(pool, &keywords, limit).await?;
    Ok(hits.into_iter().map(|hit| SearchResult { hit }).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_split_on_whitespace() {
        assert_eq!(keywords("sword iron"), vec!["sword", "iron"]);
        assert_eq!(keywords("  sword \t iron  "), vec!["sword", "iron"]);
        assert!(keywords("").is_empty());
        assert!(keywords("   \t ").is_empty());
    }

    fn sample_hit() -> OfferHit {
        OfferHit {
            item: "Iron Sword".into(),
            price: 20,
            mana: 5,
            shop_link: "a1".into(),
            shop_name: "Forge".into(),
            shop_kind: "⚒".into(),
            shop_mana: 100,
            owner_name: "Bob".into(),
            owner_castle: "North".into(),
        }
    }

    #[test]
    fn renders_title_description_and_deep_link() {
        let result = SearchResult { hit: sample_hit() };
        assert_eq!(result.title(), "⚒Forge 100💧");
        assert_eq!(result.description(), "Iron Sword - 5💧 20💰\nNorthBob");
        assert_eq!(result.message_text(), "/ws_a1");
    }
}
