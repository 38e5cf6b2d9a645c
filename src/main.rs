// This is the entry point of the RSC bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (HTTP clients, settings store)
// - `discord/` = Discord-specific adapters (commands, room gateway)
// - `webhook/` = Inbound HTTP surface for the combines service
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Spawn the webhook server and the teardown worker

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;
#[path = "webhook/webhook_server.rs"]
mod webhook;

use crate::core::combines::CombinesService;
use crate::core::league::LeagueService;
use crate::discord::rooms::SerenityRoomGateway;
use crate::discord::Data;
use crate::infra::combines::HttpCombinesApi;
use crate::infra::league::LeagueClient;
use crate::infra::settings::SqliteSettingsStore;
use poise::serenity_prelude as serenity;
use std::net::SocketAddr;
use std::sync::Arc;

/// How often the background worker drains the teardown queue.
const TEARDOWN_POLL_SECS: u64 = 5;

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let token = std::env::var("DISCORD_TOKEN").expect(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    );
    let league_url =
        std::env::var("RSC_API_URL").expect("Missing RSC_API_URL environment variable!");
    let league_key = std::env::var("RSC_API_KEY").ok();
    let webhook_addr: SocketAddr = std::env::var("WEBHOOK_BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8008".to_string())
        .parse()
        .expect("WEBHOOK_BIND_ADDR is not a valid socket address");

    // Keep runtime databases in a dedicated folder so the repo root stays tidy.
    let settings_db_path =
        std::env::var("DATABASE_PATH").unwrap_or_else(|_| "data/settings.db".to_string());
    if let Some(parent) = std::path::Path::new(&settings_db_path).parent() {
        std::fs::create_dir_all(parent).expect("Failed to create the data directory");
    }

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let settings_store = SqliteSettingsStore::new(&settings_db_path)
        .await
        .expect("Failed to initialize the settings store");

    let league_client =
        LeagueClient::new(league_url, league_key).expect("Failed to create the league API client");
    let league_service = Arc::new(LeagueService::new(league_client));

    let combines_api = Arc::new(HttpCombinesApi::new());

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILDS;

    let command_settings = settings_store.clone();
    let lifecycle_settings = settings_store;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                discord::commands::combines::combines(),
                discord::commands::combines_admin::combinesadmin(),
                discord::commands::franchise::franchise(),
                discord::commands::tiers::tiers(),
                discord::commands::matches::matches(),
            ],
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!(user = %ready.user.name, "Bot is ready");

                // The room gateway needs the live serenity handles, so the
                // lifecycle service is wired up here rather than before the
                // client exists.
                let gateway = SerenityRoomGateway::new(ctx.http.clone(), ctx.cache.clone());
                let combines = Arc::new(CombinesService::new(gateway, lifecycle_settings));

                let webhook_service = Arc::clone(&combines);
                tokio::spawn(async move {
                    if let Err(e) = webhook::serve(webhook_addr, webhook_service).await {
                        tracing::error!(error = %e, "Webhook server exited");
                    }
                });

                // Durable teardowns: rows written before a restart are
                // drained by this loop as soon as they come due.
                let teardown_service = Arc::clone(&combines);
                tokio::spawn(async move {
                    let mut interval =
                        tokio::time::interval(std::time::Duration::from_secs(TEARDOWN_POLL_SECS));
                    loop {
                        interval.tick().await;
                        if let Err(e) =
                            teardown_service.run_due_teardowns(chrono::Utc::now()).await
                        {
                            tracing::warn!(error = %e, "Teardown pass failed");
                        }
                    }
                });

                Ok(Data {
                    combines,
                    combines_api,
                    league: league_service,
                    settings: command_settings,
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .expect("Failed to create the Discord client");

    client
        .start()
        .await
        .expect("The Discord client exited with an error");
}
