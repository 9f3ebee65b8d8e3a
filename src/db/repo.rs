use super::model::{OfferHit, RefreshStats, Shop, UserProfile};
use crate::feed::ShopRecord;
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let opts = SqliteConnectOptions::from_str(&normalized)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full)
        .busy_timeout(Duration::from_secs(5));
    let pool = SqlitePool::connect_with(opts).await?;
    Ok(pool)
}

/// For file-backed SQLite URLs, ensure the parent directory exists so the
/// first connect can create the database file. In-memory URLs and non-sqlite
/// schemes pass through untouched.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }
    let path = rest.trim_start_matches("//");
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
    url.to_string()
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Insert or update a user profile keyed by the external Telegram id.
/// Last writer wins; safe to call concurrently for the same id.
#[instrument(skip_all)]
pub async fn upsert_user(pool: &Pool, user: &UserProfile) -> Result<()> {
    sqlx::query(
        "INSERT INTO users (tg_user_id, first_name, is_bot, last_name, username, language_code) \
         VALUES (?, ?, ?, ?, ?, ?) \
         ON CONFLICT (tg_user_id) DO UPDATE SET \
             first_name = excluded.first_name, \
             is_bot = excluded.is_bot, \
             last_name = excluded.last_name, \
             username = excluded.username, \
             language_code = excluded.language_code, \
             updated_at = CURRENT_TIMESTAMP",
    )
    .bind(user.tg_user_id)
    .bind(&user.first_name)
    .bind(user.is_bot)
    .bind(&user.last_name)
    .bind(&user.username)
    .bind(&user.language_code)
    .execute(pool)
    .await?;
    Ok(())
}

/// Replace the whole catalog in one transaction: write the incoming shops and
/// offers under a fresh generation, flip the generation pointer, then drop
/// every older generation. Readers keep seeing the previous generation until
/// the commit, and the previous generation survives intact if anything fails.
#[instrument(skip_all, fields(shops = shops.len()))]
pub async fn replace_catalog(pool: &Pool, shops: &[ShopRecord]) -> Result<RefreshStats> {
    let mut tx = pool.begin().await?;

    let current: i64 = sqlx::query_scalar("SELECT generation FROM catalog_meta WHERE id = 1")
        .fetch_one(&mut *tx)
        .await?;
    let generation = current + 1;

    let mut offers = 0usize;
    for shop in shops {
        let shop_id: i64 = sqlx::query(
            "INSERT INTO shops (generation, link, name, owner_name, owner_castle, kind, mana) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(generation)
        .bind(&shop.link)
        .bind(&shop.name)
        .bind(&shop.owner_name)
        .bind(&shop.owner_castle)
        .bind(&shop.kind)
        .bind(shop.mana)
        .fetch_one(&mut *tx)
        .await?
        .get("id");

        for offer in &shop.offers {
            sqlx::query(
                "INSERT INTO offers (shop_id, generation, item, item_norm, price, mana) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(shop_id)
            .bind(generation)
            .bind(&offer.item)
            .bind(offer.item.to_lowercase())
            .bind(offer.price)
            .bind(offer.mana)
            .execute(&mut *tx)
            .await?;
            offers += 1;
        }
    }

    sqlx::query("UPDATE catalog_meta SET generation = ?, refreshed_at = ? WHERE id = 1")
        .bind(generation)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM offers WHERE generation < ?")
        .bind(generation)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM shops WHERE generation < ?")
        .bind(generation)
        .execute(&mut *tx)
        .await?;

    tx.commit()
        .await
        .context("failed to commit catalog generation swap")?;

    Ok(RefreshStats {
        generation,
        shops: shops.len(),
        offers,
    })
}

/// All shops of the live generation, ordered by kind (insertion order within
/// a kind).
#[instrument(skip_all)]
pub async fn list_shops(pool: &Pool) -> Result<Vec<Shop>> {
    let rows = sqlx::query(
        "SELECT id, link, name, owner_name, owner_castle, kind, mana FROM shops \
         WHERE generation = (SELECT generation FROM catalog_meta WHERE id = 1) \
         ORDER BY kind, id",
    )
    .fetch_all(pool)
    .await?;

    let shops = rows
        .into_iter()
        .map(|row| Shop {
            id: row.get("id"),
            link: row.get("link"),
            name: row.get("name"),
            owner_name: row.get("owner_name"),
            owner_castle: row.get("owner_castle"),
            kind: row.get("kind"),
            mana: row.get("mana"),
        })
        .collect();
    Ok(shops)
}

/// Offers of the live generation whose item name contains every keyword
/// (case-insensitive substring, AND semantics), joined with their shop,
/// cheapest first. An empty keyword slice matches everything.
#[instrument(skip_all, fields(keywords = keywords.len()))]
pub async fn search_offers(pool: &Pool, keywords: &[String], limit: u32) -> Result<Vec<OfferHit>> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT o.item, o.price, o.mana, \
                s.link AS shop_link, s.name AS shop_name, s.kind AS shop_kind, \
                s.mana AS shop_mana, s.owner_name, s.owner_castle \
         FROM offers o JOIN shops s ON s.id = o.shop_id \
         WHERE o.generation = (SELECT generation FROM catalog_meta WHERE id = 1)",
    );
    for keyword in keywords {
        qb.push(" AND instr(o.item_norm, ");
        qb.push_bind(keyword.to_lowercase());
        qb.push(") > 0");
    }
    qb.push(" ORDER BY o.price ASC, o.id ASC LIMIT ");
    qb.push_bind(i64::from(limit));

    let rows = qb.build().fetch_all(pool).await?;
    let hits = rows
        .into_iter()
        .map(|row| OfferHit {
            item: row.get("item"),
            price: row.get("price"),
            mana: row.get("mana"),
            shop_link: row.get("shop_link"),
            shop_name: row.get("shop_name"),
            shop_kind: row.get("shop_kind"),
            shop_mana: row.get("shop_mana"),
            owner_name: row.get("owner_name"),
            owner_castle: row.get("owner_castle"),
        })
        .collect();
    Ok(hits)
}
