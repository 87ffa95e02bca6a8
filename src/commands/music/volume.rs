use super::utils::embedded_messages;
use super::utils::guild_player::MAX_VOLUME;
use super::{connected_player, reply};
use crate::{CommandResult, Context};

/// Set the playback volume in percent
#[poise::command(slash_command, prefix_command, guild_only, category = "Music")]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Volume from 0 to 200"]
    #[min = 0]
    #[max = 200]
    level: u16,
) -> CommandResult {
    if level > MAX_VOLUME {
        ctx.send(embedded_messages::error_reply(format!(
            "Volume must be between 0 and {}",
            MAX_VOLUME
        )))
        .await?;
        return Ok(());
    }

    let Some((_, player, theme)) = connected_player(ctx).await? else {
        return Ok(());
    };

    match player.set_volume(level).await {
        Ok(volume) => {
            let muted = player.snapshot().await.muted;
            reply(ctx, embedded_messages::volume_changed(&theme, volume, muted)).await
        }
        Err(err) => {
            ctx.send(embedded_messages::error_reply(err.to_string())).await?;
            Ok(())
        }
    }
}
