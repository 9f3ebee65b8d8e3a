use anyhow::{anyhow, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::types::InlineQuery;
use teloxide::update_listeners::webhooks;
use tracing::{error, info};

use cw_shops_bot::config::{self, Config, Mode};
use cw_shops_bot::{db, feed, handlers, refresher};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| cfg.database.url.clone());
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    // Spawn the catalog refresher; the first refresh runs right away.
    let source = feed::FeedClient::from_config(&cfg)?;
    tokio::spawn(refresher::run(
        pool.clone(),
        source,
        cfg.refresh_interval(),
    ));

    let bot = Bot::new(cfg.telegram.bot_token.clone());
    let cfg = Arc::new(cfg);

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(
            |bot: Bot, pool: db::Pool, msg: Message| async move {
                if let Err(err) = handlers::handle_message(&bot, &pool, &msg).await {
                    error!(?err, "failed to handle message");
                }
                respond(())
            },
        ))
        .branch(Update::filter_inline_query().endpoint(
            |bot: Bot, pool: db::Pool, cfg: Arc<Config>, query: InlineQuery| async move {
                if let Err(err) = handlers::handle_inline_query(&bot, &pool, &cfg, &query).await {
                    error!(?err, "failed to handle inline query");
                }
                respond(())
            },
        ));

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![pool, cfg.clone()])
        .enable_ctrlc_handler()
        .build();

    info!("starting telegram bot");
    match cfg.telegram.mode {
        Mode::Poll => dispatcher.dispatch().await,
        Mode::Webhook => {
            let webhook = cfg
                .telegram
                .webhook
                .as_ref()
                .ok_or_else(|| anyhow!("webhook mode requires telegram.webhook"))?;
            let addr: SocketAddr =
                format!("{}:{}", webhook.listen_addr, webhook.port).parse()?;
            let url = reqwest::Url::parse(&webhook.public_url)?
                .join(&cfg.telegram.bot_token)?;
            let listener = webhooks::axum(bot, webhooks::Options::new(addr, url)).await?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("an error from the update listener"),
                )
                .await;
        }
    }

    Ok(())
}
