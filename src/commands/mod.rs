//! This module aggregates all the command modules for the bot.

/// Commands related to music playback.
pub mod music;
/// Per-guild bot settings such as the embed theme.
pub mod settings;
