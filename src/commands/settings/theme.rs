use poise::CreateReply;
use tracing::{info, warn};

use crate::commands::music::utils::embedded_messages;
use crate::commands::music::utils::music_manager::MusicError;
use crate::{CommandResult, Context};

/// Show or change how the bot's embeds look in this server
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Settings",
    subcommands("show", "color", "footer", "reset"),
    subcommand_required
)]
pub async fn theme(_ctx: Context<'_>) -> CommandResult {
    Ok(())
}

/// Show the current theme
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn show(ctx: Context<'_>) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;
    let theme = ctx.data().themes.get(guild_id);
    ctx.send(CreateReply::default().embed(embedded_messages::theme_preview(&theme)))
        .await?;
    Ok(())
}

/// Set the embed color
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn color(
    ctx: Context<'_>,
    #[description = "Hex color such as #1db954"] value: String,
) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    match ctx.data().themes.set_color(guild_id, &value) {
        Ok(theme) => {
            info!("Guild {} theme color set to {}", guild_id, theme.color_hex());
            ctx.send(CreateReply::default().embed(embedded_messages::theme_preview(&theme)))
                .await?;
        }
        Err(err) => {
            warn!("Rejected theme color '{}' for guild {}: {}", value, guild_id, err);
            ctx.send(embedded_messages::error_reply(err.to_string())).await?;
        }
    }
    Ok(())
}

/// Set the embed footer, or clear it when no text is given
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn footer(
    ctx: Context<'_>,
    #[description = "Footer text"]
    #[rest]
    text: Option<String>,
) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    match ctx.data().themes.set_footer(guild_id, text.as_deref()) {
        Ok(theme) => {
            ctx.send(CreateReply::default().embed(embedded_messages::theme_preview(&theme)))
                .await?;
        }
        Err(err) => {
            ctx.send(embedded_messages::error_reply(err.to_string())).await?;
        }
    }
    Ok(())
}

/// Go back to the default theme
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn reset(ctx: Context<'_>) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    match ctx.data().themes.reset(guild_id) {
        Ok(_) => {
            let theme = ctx.data().themes.get(guild_id);
            ctx.send(CreateReply::default().embed(embedded_messages::theme_preview(&theme)))
                .await?;
        }
        Err(err) => {
            ctx.send(embedded_messages::error_reply(err.to_string())).await?;
        }
    }
    Ok(())
}
