use poise::{CreateReply, serenity_prelude as serenity};
use serenity::all::{CreateEmbed, CreateEmbedFooter};
use std::time::Duration;

use crate::commands::music::audio_sources::Track;
use crate::utils::theme_store::Theme;

use super::format_duration;
use super::guild_player::PlayerSnapshot;

pub const ERROR_COLOR: u32 = 0xff0000;
/// Upcoming tracks listed by the queue embed.
const QUEUE_PREVIEW_LEN: usize = 10;

/// Colors the embed and adds the guild's footer, if it has one.
pub fn themed(theme: &Theme, embed: CreateEmbed) -> CreateEmbed {
    let embed = embed.color(theme.color);
    match &theme.footer {
        Some(footer) => embed.footer(CreateEmbedFooter::new(footer)),
        None => embed,
    }
}

/// Create a progress bar for the current track
fn format_progress_bar(position: Duration, total: Duration) -> String {
    const BAR_LENGTH: usize = 15;
    let progress = if total.is_zero() {
        0.0
    } else {
        (position.as_secs_f64() / total.as_secs_f64()).min(1.0)
    };

    let filled = (progress * BAR_LENGTH as f64).round() as usize;
    let empty = BAR_LENGTH - filled;

    format!("▬{}🔘{}▬", "▬".repeat(filled), "▬".repeat(empty))
}

fn link(track: &Track) -> String {
    if track.uri.is_empty() {
        track.title.clone()
    } else {
        format!("[{}]({})", track.title, track.uri)
    }
}

fn duration_label(track: &Track) -> String {
    track
        .duration
        .map(format_duration)
        .unwrap_or_else(|| "Unknown duration".to_string())
}

fn with_track_details(embed: CreateEmbed, track: &Track) -> CreateEmbed {
    let mut embed = embed.field("Duration", format!("`{}`", duration_label(track)), true);
    if !track.author.is_empty() {
        embed = embed.field("Artist", &track.author, true);
    }
    if let Some(requester) = &track.requested_by {
        embed = embed.field("Requested by", requester, true);
    }
    if let Some(artwork) = &track.artwork_url {
        embed = embed.thumbnail(artwork);
    }
    embed
}

/// Create an embed for when a song starts playing right away
pub fn now_playing(theme: &Theme, track: &Track) -> CreateEmbed {
    let embed = CreateEmbed::new()
        .title("🎵 Now Playing")
        .description(link(track));
    themed(theme, with_track_details(embed, track))
}

/// Create an embed for when a song is added behind other tracks
pub fn added_to_queue(theme: &Theme, track: &Track, position: usize) -> CreateEmbed {
    let embed = CreateEmbed::new()
        .title("🎵 Added to Queue")
        .description(link(track));
    let embed = with_track_details(embed, track).field("Position", format!("`#{}`", position), true);
    themed(theme, embed)
}

/// Create an embed for a playlist that was matched and queued
pub fn playlist_added(theme: &Theme, name: &str, tracks: &[Track], added: usize) -> CreateEmbed {
    let total: Duration = tracks.iter().filter_map(|t| t.duration).sum();

    let mut description = format!("Queued **{}** tracks from **{}**", added, name);
    if let Some(first) = tracks.first() {
        description.push_str(&format!("\nStarting with {}", link(first)));
    }

    let mut embed = CreateEmbed::new()
        .title("📋 Playlist Added")
        .description(description);
    if !total.is_zero() {
        embed = embed.field("Total Length", format!("`{}`", format_duration(total)), true);
    }
    themed(theme, embed)
}

/// Create an embed for the music queue
pub fn music_queue(theme: &Theme, snapshot: &PlayerSnapshot) -> CreateEmbed {
    let mut description = String::new();

    match &snapshot.current {
        Some(track) => {
            let heading = if snapshot.paused { "⏸️ Paused" } else { "🎵 Now Playing" };
            description.push_str(&format!("**{}**\n**{}**\n", heading, link(track)));

            if let (Some(duration), Some(position)) = (track.duration, snapshot.position) {
                description.push_str(&format!(
                    "{} `{}/{}`\n",
                    format_progress_bar(position, duration),
                    format_duration(position),
                    format_duration(duration)
                ));
            }
            description.push('\n');
        }
        None => description.push_str("**🔇 Nothing playing**\n\n"),
    }

    if snapshot.upcoming.is_empty() {
        description.push_str("**📭 Queue is empty**");
    } else {
        description.push_str(&format!("**📋 Up Next - {} tracks**\n", snapshot.upcoming.len()));
        for (index, track) in snapshot.upcoming.iter().take(QUEUE_PREVIEW_LEN).enumerate() {
            description.push_str(&format!("`{}.` {}", index + 1, link(track)));
            if let Some(duration) = track.duration {
                description.push_str(&format!(" `{}`", format_duration(duration)));
            }
            description.push('\n');
        }

        let hidden = snapshot.upcoming.len().saturating_sub(QUEUE_PREVIEW_LEN);
        if hidden > 0 {
            description.push_str(&format!("*…and {} more*\n", hidden));
        }

        let total: Duration = snapshot.upcoming.iter().filter_map(|t| t.duration).sum();
        if !total.is_zero() {
            description.push_str(&format!("\n**⏱️ Total Duration:** `{}`", format_duration(total)));
        }
    }

    let volume = if snapshot.muted {
        "🔇 Muted".to_string()
    } else {
        format!("🔊 {}%", snapshot.volume)
    };

    themed(
        theme,
        CreateEmbed::new()
            .title("🎵 Music Queue")
            .description(description)
            .field("Volume", volume, true),
    )
}

/// Create an embed for when a track is paused
pub fn paused(theme: &Theme, track: &Track) -> CreateEmbed {
    themed(
        theme,
        CreateEmbed::new()
            .title("⏸️ Paused")
            .description(format!("Paused {}", link(track))),
    )
}

/// Create an embed for when a track is resumed
pub fn resumed(theme: &Theme, track: &Track) -> CreateEmbed {
    themed(
        theme,
        CreateEmbed::new()
            .title("▶️ Resumed")
            .description(format!("Resumed {}", link(track))),
    )
}

/// Create an embed for when a track is skipped
pub fn skipped(theme: &Theme, track: &Track, remaining: usize) -> CreateEmbed {
    let next = match remaining {
        0 => "The queue is now empty".to_string(),
        1 => "1 track left in the queue".to_string(),
        n => format!("{} tracks left in the queue", n),
    };
    themed(
        theme,
        CreateEmbed::new()
            .title("⏭️ Skipped")
            .description(format!("Skipped {}\n{}", link(track), next)),
    )
}

/// Create an embed for when the bot stops playing music
pub fn stopped(theme: &Theme, cleared: usize) -> CreateEmbed {
    themed(
        theme,
        CreateEmbed::new()
            .title("⏹️ Stopped")
            .description(format!(
                "Playback stopped, {} queued track(s) cleared and voice channel left",
                cleared
            )),
    )
}

pub fn volume_changed(theme: &Theme, volume: u16, muted: bool) -> CreateEmbed {
    let mut description = format!("Volume set to **{}%**", volume);
    if muted {
        description.push_str("\nThe player is muted, unmute to hear the change");
    }
    themed(theme, CreateEmbed::new().title("🔊 Volume").description(description))
}

pub fn mute_toggled(theme: &Theme, muted: bool, volume: u16) -> CreateEmbed {
    let (title, description) = if muted {
        ("🔇 Muted", "Playback is muted".to_string())
    } else {
        ("🔊 Unmuted", format!("Volume restored to **{}%**", volume))
    };
    themed(theme, CreateEmbed::new().title(title).description(description))
}

/// Create an embed for when a query finds nothing on SoundCloud
pub fn no_results(theme: &Theme, query: &str) -> CreateEmbed {
    themed(
        theme,
        CreateEmbed::new()
            .title("🔍 No Results")
            .description(format!("Couldn't find a SoundCloud match for `{}`", query)),
    )
}

pub fn theme_preview(theme: &Theme) -> CreateEmbed {
    let footer = theme.footer.as_deref().unwrap_or("None");
    themed(
        theme,
        CreateEmbed::new()
            .title("🎨 Theme")
            .field("Color", format!("`{}`", theme.color_hex()), true)
            .field("Footer", footer, true),
    )
}

/// Error embeds are always red, whatever the guild's theme says.
pub fn error(message: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new()
        .title("❌ Error")
        .description(message)
        .color(ERROR_COLOR)
}

pub fn error_reply(message: impl Into<String>) -> CreateReply {
    CreateReply::default().embed(error(message)).ephemeral(true)
}
