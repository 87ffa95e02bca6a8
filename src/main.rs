use ::serenity::all::ClientBuilder;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use songbird::SerenityInit;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cloudy::commands::music::{
    audio_sources::spotify::{SpotifyApi, SpotifyCredentials},
    audio_sources::ytdlp::YtDlpSearch,
    mute::*,
    pause::*,
    play::*,
    queue::*,
    resolver::{Resolver, scorer::SEARCH_RESULT_CAP},
    resume::*,
    skip::*,
    stop::*,
    utils::music_manager::MusicManager,
    volume::*,
};
use cloudy::commands::settings::theme::*;
use cloudy::utils::{config::BotConfig, theme_store::ThemeStore};
use cloudy::{CommandResult, Context, Data, Error};

#[poise::command(slash_command, prefix_command, category = "General")]
async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> CommandResult {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            show_context_menu_commands: true,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| e.into())
}

#[poise::command(prefix_command, hide_in_help)]
async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx)
        .await
        .map_err(|e| e.into())
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            warn!("Command '{}' failed: {}", ctx.command().name, error);
            let reply = cloudy::commands::music::utils::embedded_messages::error_reply(error.to_string());
            if let Err(e) = ctx.send(reply).await {
                warn!("Failed to report command error: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                warn!("Error while handling error: {}", e);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cloudy=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let config = BotConfig::from_env()?;
    info!("Loaded configuration: {:?}", config);

    let http = reqwest::Client::new();

    let spotify_credentials = match (&config.spotify_client_id, &config.spotify_client_secret) {
        (Some(client_id), Some(client_secret)) => Some(SpotifyCredentials {
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
        }),
        _ => {
            warn!("Spotify credentials not set, Spotify links will fall back to link text");
            None
        }
    };

    let search = YtDlpSearch::new(
        config.ytdlp_path.clone(),
        SpotifyApi::new(http.clone(), spotify_credentials),
        SEARCH_RESULT_CAP,
        config.max_playlist_tracks,
    );
    let resolver = Resolver::new(Arc::new(search), config.max_playlist_tracks);
    // Songbird wants the streaming program for the life of the process.
    let ytdlp: &'static str = Box::leak(config.ytdlp_path.clone().into_boxed_str());
    let players = Arc::new(MusicManager::new(http, ytdlp));
    let themes = ThemeStore::open(config.theme_store_path.clone());

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let commands = vec![
        // Default commands
        register(),
        help(),
        // Music commands
        play(),
        pause(),
        resume(),
        skip(),
        stop(),
        volume(),
        mute(),
        queue(),
        // Settings
        theme(),
    ];

    let token = config.discord_token.clone();
    let prefix = config.prefix.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(prefix),
                ..Default::default()
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let songbird = MusicManager::get_songbird(ctx).await?;
                players
                    .clone()
                    .spawn_idle_sweeper(songbird, config.sweep_interval, config.idle_timeout);

                Ok(Data {
                    config,
                    players,
                    resolver,
                    themes,
                })
            })
        });

    let mut client = ClientBuilder::new(token, intents)
        .framework(framework.build())
        .register_songbird()
        .await?;

    client.start().await.map_err(Into::into)
}
