//! A Discord music bot that streams SoundCloud matches for text searches,
//! YouTube links and Spotify links, with per-guild embed themes.

pub mod commands;
pub mod utils;

use std::sync::Arc;

use commands::music::resolver::Resolver;
use commands::music::utils::music_manager::MusicManager;
use utils::config::BotConfig;
use utils::theme_store::ThemeStore;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

/// State shared by every command invocation.
pub struct Data {
    pub config: BotConfig,
    pub players: Arc<MusicManager>,
    pub resolver: Resolver,
    pub themes: ThemeStore,
}
