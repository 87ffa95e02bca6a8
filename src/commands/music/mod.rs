pub mod mute;
pub mod pause;
pub mod play;
pub mod queue;
pub mod resume;
pub mod skip;
pub mod stop;
pub mod volume;

pub mod audio_sources;
pub mod resolver;
pub mod utils;

use poise::CreateReply;
use std::sync::Arc;

use crate::utils::theme_store::Theme;
use crate::{Context, Error};
use utils::embedded_messages;
use utils::guild_player::GuildPlayer;
use utils::music_manager::{MusicError, PlayerKey};

/// The player bound to the invoking guild. Replies with an error embed and
/// returns `None` when the bot is not connected there.
pub(crate) async fn connected_player(
    ctx: Context<'_>,
) -> Result<Option<(PlayerKey, Arc<GuildPlayer>, Theme)>, Error> {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    match ctx.data().players.find_by_guild(guild_id) {
        Some((key, player)) => Ok(Some((key, player, ctx.data().themes.get(guild_id)))),
        None => {
            ctx.send(embedded_messages::error_reply(MusicError::NotConnected.to_string()))
                .await?;
            Ok(None)
        }
    }
}

/// Sends a themed embed as a plain (non-ephemeral) reply.
pub(crate) async fn reply(ctx: Context<'_>, embed: poise::serenity_prelude::CreateEmbed) -> Result<(), Error> {
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}
