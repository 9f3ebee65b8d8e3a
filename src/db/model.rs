//! Database entity and view models used by repositories.
//!
//! Keep these structs focused on the data returned by queries. Rendering and
//! business logic live in higher layers.

/// Profile of a Telegram user as observed on an update. Upserted whole;
/// the external id is the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub tg_user_id: i64,
    pub first_name: String,
    pub is_bot: bool,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

/// One shop of the live catalog generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shop {
    pub id: i64,
    pub link: String,
    pub name: String,
    pub owner_name: String,
    pub owner_castle: String,
    pub kind: String,
    pub mana: i64,
}

/// One offer joined with its owning shop, denormalized so a search result
/// can be rendered without a further lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferHit {
    pub item: String,
    pub price: i64,
    pub mana: i64,
    pub shop_link: String,
    pub shop_name: String,
    pub shop_kind: String,
    pub shop_mana: i64,
    pub owner_name: String,
    pub owner_castle: String,
}

/// Outcome of one successful catalog replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshStats {
    pub generation: i64,
    pub shops: usize,
    pub offers: usize,
}
