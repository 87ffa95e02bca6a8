use poise::CreateReply;
use tracing::{error, info};

use super::reply;
use super::resolver::Resolution;
use super::utils::embedded_messages;
use super::utils::music_manager::{MusicError, MusicManager};
use crate::commands::music::audio_sources::Player;
use crate::{CommandResult, Context};

/// Play a SoundCloud match for a search, or a SoundCloud, YouTube or Spotify link
#[poise::command(slash_command, prefix_command, guild_only, category = "Music")]
pub async fn play(
    ctx: Context<'_>,
    #[description = "Search text or a SoundCloud, YouTube or Spotify link"]
    #[rest]
    query: String,
) -> CommandResult {
    info!("Received play command with query: {}", query);
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    let channel_id =
        match MusicManager::get_user_voice_channel(ctx.serenity_context(), guild_id, ctx.author().id) {
            Ok(channel_id) => channel_id,
            Err(err) => {
                ctx.send(embedded_messages::error_reply(format!(
                    "You need to be in a voice channel: {}",
                    err
                )))
                .await?;
                return Ok(());
            }
        };

    // Resolution can take several searches.
    ctx.defer().await?;

    let data = ctx.data();
    let player = match data
        .players
        .get_or_join(ctx.serenity_context(), guild_id, channel_id)
        .await
    {
        Ok(player) => player,
        Err(err) => {
            ctx.send(CreateReply::default().embed(embedded_messages::error(err.to_string())))
                .await?;
            return Ok(());
        }
    };

    let requester = ctx.author().name.clone();
    let resolution = match data.resolver.resolve(&query, &requester).await {
        Ok(resolution) => resolution,
        Err(err) => {
            error!("Resolving '{}' failed: {}", query, err);
            ctx.send(CreateReply::default().embed(embedded_messages::error(format!(
                "Search failed: {}",
                err
            ))))
            .await?;
            return Ok(());
        }
    };

    let theme = data.themes.get(guild_id);
    if resolution == Resolution::NoMatch {
        return reply(ctx, embedded_messages::no_results(&theme, &query)).await;
    }

    let was_playing = player.is_playing().await;
    let queued_before = player.queue_len().await;

    let added = match data.resolver.load(&*player, &resolution).await {
        Ok(added) => added,
        Err(err) => {
            error!("Queueing tracks for guild {} failed: {}", guild_id, err);
            ctx.send(CreateReply::default().embed(embedded_messages::error(format!(
                "Failed to add to the queue: {}",
                err
            ))))
            .await?;
            return Ok(());
        }
    };
    info!("Queued {} track(s) in guild {}", added, guild_id);

    let embed = match &resolution {
        Resolution::Track(track) if !was_playing => embedded_messages::now_playing(&theme, track),
        Resolution::Track(track) => embedded_messages::added_to_queue(&theme, track, queued_before + 1),
        Resolution::Playlist { name, tracks } => {
            embedded_messages::playlist_added(&theme, name, tracks, added)
        }
        Resolution::NoMatch => embedded_messages::no_results(&theme, &query),
    };

    reply(ctx, embed).await
}
