use crate::config::Config;
use crate::db::{self, Pool, UserProfile};
use crate::search;
use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{
    ForwardedFrom, InlineKeyboardButton, InlineKeyboardMarkup, InlineQuery, InlineQueryResult,
    InlineQueryResultArticle, InputMessageContent, InputMessageContentText, ParseMode, User,
};
use teloxide::utils::html;
use tracing::{instrument, warn};
use uuid::Uuid;

const WELCOME_TEXT: &str =
    "Welcome to Chat Wars Shops Bot.\nCheck out /help for more information!";

const HELP_TEXT: &str = "This bot was created to help you with your \
<a href='http://t.me/chtwrsbot'>Chat Wars</a>, <b>⚒ Blacksmith</b> and \
<b>⚗️ Alchemist</b> window shopping needs. Please use it in Inline Mode.\
\n\nClick button below and select <i>Chat Wars Bot</i>";

fn profile_of(user: &User) -> UserProfile {
    UserProfile {
        tg_user_id: user.id.0 as i64,
        first_name: user.first_name.clone(),
        is_bot: user.is_bot,
        last_name: user.last_name.clone(),
        username: user.username.clone(),
        language_code: user.language_code.clone(),
    }
}

/// Record every user visible on a message: the sender, a forward origin, and
/// chat members joining or leaving. Failures are logged per user and never
/// block the rest of the update.
async fn record_users(pool: &Pool, msg: &Message) {
    let mut users: Vec<&User> = Vec::new();
    if let Some(user) = msg.from() {
        users.push(user);
    }
    if let Some(ForwardedFrom::User(user)) = msg.forward_from() {
        users.push(user);
    }
    if let Some(user) = msg.left_chat_member() {
        users.push(user);
    }
    if let Some(members) = msg.new_chat_members() {
        users.extend(members.iter());
    }

    for user in users {
        if let Err(err) = db::upsert_user(pool, &profile_of(user)).await {
            warn!(?err, user_id = user.id.0, "failed to upsert user");
        }
    }
}

#[instrument(skip_all)]
pub async fn handle_message(bot: &Bot, pool: &Pool, msg: &Message) -> Result<()> {
    record_users(pool, msg).await;

    let Some(text) = msg.text() else {
        return Ok(());
    };
    // Accept both bare commands and the /cmd@BotName form used in groups.
    let command = text.trim().split('@').next().unwrap_or_default();
    match command {
        "/start" => {
            bot.send_message(msg.chat.id, WELCOME_TEXT).await?;
        }
        "/help" => {
            let keyboard = InlineKeyboardMarkup::new([[InlineKeyboardButton::switch_inline_query(
                "Search", "",
            )]]);
            bot.send_message(msg.chat.id, HELP_TEXT)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard)
                .disable_web_page_preview(true)
                .await?;
        }
        "/list" | "/shops" => {
            send_shop_list(bot, pool, msg.chat.id).await?;
        }
        _ => {}
    }
    Ok(())
}

async fn send_shop_list(bot: &Bot, pool: &Pool, chat_id: ChatId) -> Result<()> {
    let shops = match db::list_shops(pool).await {
        Ok(shops) => shops,
        Err(err) => {
            warn!(?err, "failed to list shops");
            let _ = bot
                .send_message(chat_id, "Something went wrong, please try again later.")
                .await;
            return Ok(());
        }
    };

    if shops.is_empty() {
        bot.send_message(chat_id, "No shops known yet. Try again in a few minutes.")
            .await?;
        return Ok(());
    }

    let mut response = String::new();
    for shop in &shops {
        response.push_str(&format!(
            "<a href=\"https://t.me/share/url?url=/ws_{}\">{}{}</a> <i>{}💧</i> by <b>{}{}</b>\n\n",
            shop.link,
            shop.kind,
            html::escape(&shop.name),
            shop.mana,
            shop.owner_castle,
            html::escape(&shop.owner_name),
        ));
    }
    bot.send_message(chat_id, response)
        .parse_mode(ParseMode::Html)
        .disable_web_page_preview(true)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn handle_inline_query(
    bot: &Bot,
    pool: &Pool,
    cfg: &Config,
    query: &InlineQuery,
) -> Result<()> {
    if let Err(err) = db::upsert_user(pool, &profile_of(&query.from)).await {
        warn!(?err, "failed to upsert inline query sender");
    }

    // A failed search degrades to an empty answer; the query itself succeeds.
    let results = match search::search(pool, &query.query, cfg.app.search_limit).await {
        Ok(results) => results,
        Err(err) => {
            warn!(?err, "search failed; answering with no results");
            Vec::new()
        }
    };

    let articles: Vec<InlineQueryResult> = results
        .iter()
        .map(|result| {
            InlineQueryResult::Article(
                InlineQueryResultArticle::new(
                    Uuid::new_v4().to_string(),
                    result.title(),
                    InputMessageContent::Text(InputMessageContentText::new(result.message_text())),
                )
                .description(result.description()),
            )
        })
        .collect();

    bot.answer_inline_query(query.id.clone(), articles).await?;
    Ok(())
}
