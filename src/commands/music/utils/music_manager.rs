use dashmap::DashMap;
use futures::future::join_all;
use poise::serenity_prelude as serenity;
use serenity::client::Context;
use serenity::model::id::{ChannelId, GuildId};
use songbird::Songbird;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::guild_player::{GuildPlayer, PlayerLease};

/// Errors that can occur during music operations
#[derive(Error, Debug)]
pub enum MusicError {
    #[error("Not in a guild")]
    NotInGuild,

    #[error("Failed to join voice channel: {0}")]
    JoinError(String),

    #[error("Not connected to a voice channel")]
    NotConnected,

    #[error("Failed to get voice manager")]
    NoVoiceManager,

    #[error("User is not in a voice channel")]
    UserNotInVoiceChannel,

    #[error("Already playing in <#{0}>")]
    BusyInOtherChannel(ChannelId),

    #[error("Nothing is playing")]
    NothingPlaying,

    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("Player error: {0}")]
    PlayerError(String),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

/// Identifies a player: one per voice channel the bot is connected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerKey {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
}

impl PlayerKey {
    pub fn new(guild_id: GuildId, channel_id: ChannelId) -> Self {
        Self {
            guild_id,
            channel_id,
        }
    }
}

impl fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.guild_id, self.channel_id)
    }
}

/// Whether a player should be reclaimed by the idle sweep.
pub fn is_idle(playing: bool, last_active: Instant, now: Instant, timeout: Duration) -> bool {
    !playing && now.saturating_duration_since(last_active) >= timeout
}

/// Owns every live [`GuildPlayer`] and the voice connections behind them.
pub struct MusicManager {
    players: DashMap<PlayerKey, Arc<GuildPlayer>>,
    http: reqwest::Client,
    ytdlp: &'static str,
}

impl MusicManager {
    /// `ytdlp` is the program every player streams tracks through.
    pub fn new(http: reqwest::Client, ytdlp: &'static str) -> Self {
        Self {
            players: DashMap::new(),
            http,
            ytdlp,
        }
    }

    /// Get the Songbird voice client from the context
    pub async fn get_songbird(ctx: &Context) -> MusicResult<Arc<Songbird>> {
        songbird::get(ctx).await.ok_or(MusicError::NoVoiceManager)
    }

    /// Get the voice channel ID that the user is currently in
    pub fn get_user_voice_channel(
        ctx: &Context,
        guild_id: GuildId,
        user_id: serenity::UserId,
    ) -> MusicResult<ChannelId> {
        let guild = ctx.cache.guild(guild_id).ok_or(MusicError::NotInGuild)?;

        let voice_state = guild
            .voice_states
            .get(&user_id)
            .ok_or(MusicError::UserNotInVoiceChannel)?;

        voice_state
            .channel_id
            .ok_or(MusicError::UserNotInVoiceChannel)
    }

    /// The player bound to any voice channel of this guild.
    pub fn find_by_guild(&self, guild_id: GuildId) -> Option<(PlayerKey, Arc<GuildPlayer>)> {
        self.players
            .iter()
            .find(|entry| entry.key().guild_id == guild_id)
            .map(|entry| (*entry.key(), entry.value().clone()))
    }

    /// Leases the player for `key`. The lease is taken while the map entry is
    /// held, so the idle sweep either removed the player before or sees the lease.
    pub fn lease_existing(&self, key: &PlayerKey) -> Option<PlayerLease> {
        self.players.get(key).map(|entry| entry.value().lease())
    }

    fn new_player(&self, key: PlayerKey, call: Arc<tokio::sync::Mutex<songbird::Call>>) -> Arc<GuildPlayer> {
        GuildPlayer::new(key.guild_id, key.channel_id, call, self.http.clone(), self.ytdlp)
    }

    /// Returns a lease on the player for `channel_id`, joining the channel
    /// first when the guild has no player yet. A guild can only be connected
    /// to one channel.
    pub async fn get_or_join(
        &self,
        ctx: &Context,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> MusicResult<PlayerLease> {
        let key = PlayerKey::new(guild_id, channel_id);
        if let Some(lease) = self.lease_existing(&key) {
            return Ok(lease);
        }

        if let Some((existing, _)) = self.find_by_guild(guild_id) {
            return Err(MusicError::BusyInOtherChannel(existing.channel_id));
        }

        let songbird = Self::get_songbird(ctx).await?;
        let call = songbird.join(guild_id, channel_id).await.map_err(|e| {
            error!(
                "Failed to join voice channel {} for guild {}: {}",
                channel_id, guild_id, e
            );
            MusicError::JoinError(e.to_string())
        })?;

        info!("Created player {}", key);
        let lease = self
            .players
            .entry(key)
            .or_insert_with(|| self.new_player(key, call))
            .value()
            .lease();

        Ok(lease)
    }

    /// Stops the player for `key` and leaves its voice channel.
    pub async fn remove(&self, songbird: &Songbird, key: &PlayerKey) -> MusicResult<()> {
        let Some((_, player)) = self.players.remove(key) else {
            return Err(MusicError::NotConnected);
        };
        self.tear_down(songbird, key, &player).await
    }

    /// Stops a player already taken out of the map and leaves its channel,
    /// unless a new player for the guild has joined in the meantime.
    async fn tear_down(&self, songbird: &Songbird, key: &PlayerKey, player: &GuildPlayer) -> MusicResult<()> {
        player.stop().await;

        if self.find_by_guild(key.guild_id).is_none() && songbird.get(key.guild_id).is_some() {
            songbird
                .remove(key.guild_id)
                .await
                .map_err(|e| MusicError::JoinError(format!("Failed to leave voice channel: {}", e)))?;
        }

        info!("Removed player {}", key);
        Ok(())
    }

    /// Removes every unleased player that is not playing and has been
    /// inactive for at least `timeout`. Returns the keys that were removed.
    ///
    /// Each player is checked and taken out of the map in one step, so a
    /// command that leases it first keeps it alive.
    pub async fn sweep_idle(&self, songbird: &Songbird, timeout: Duration) -> Vec<PlayerKey> {
        let now = Instant::now();

        let keys: Vec<PlayerKey> = self.players.iter().map(|entry| *entry.key()).collect();
        let idle: Vec<(PlayerKey, Arc<GuildPlayer>)> = keys
            .iter()
            .filter_map(|key| {
                self.players
                    .remove_if(key, |_, player| player.is_reclaimable(now, timeout))
            })
            .collect();

        let teardowns = idle.iter().map(|(key, player)| async move {
            debug!("Player {} idle, cleaning up", key);
            (*key, self.tear_down(songbird, key, player).await)
        });

        let mut removed = Vec::new();
        for (key, result) in join_all(teardowns).await {
            if let Err(e) = result {
                warn!("Failed to leave the channel of idle player {}: {}", key, e);
            }
            removed.push(key);
        }

        if !removed.is_empty() {
            info!("Idle sweep removed {} player(s)", removed.len());
        }
        removed
    }

    /// Runs [`Self::sweep_idle`] every `interval` for the lifetime of the process.
    pub fn spawn_idle_sweeper(
        self: Arc<Self>,
        songbird: Arc<Songbird>,
        interval: Duration,
        timeout: Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.sweep_idle(&songbird, timeout).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ::serenity::model::id::UserId;
    use songbird::Call;

    #[test]
    fn player_key_renders_guild_and_channel() {
        let key = PlayerKey::new(GuildId::new(42), ChannelId::new(7));
        assert_eq!(key.to_string(), "42:7");
    }

    #[test]
    fn player_keys_differ_per_channel() {
        let a = PlayerKey::new(GuildId::new(1), ChannelId::new(10));
        let b = PlayerKey::new(GuildId::new(1), ChannelId::new(11));
        assert_ne!(a, b);
    }

    #[test]
    fn idle_only_when_stopped_long_enough() {
        let start = Instant::now();
        let timeout = Duration::from_secs(300);
        let later = start + Duration::from_secs(301);

        assert!(is_idle(false, start, later, timeout));
        assert!(!is_idle(true, start, later, timeout));
        assert!(!is_idle(false, start, start + Duration::from_secs(10), timeout));
        // Exactly at the timeout counts as idle.
        assert!(is_idle(false, start, start + timeout, timeout));
    }

    #[test]
    fn new_manager_is_empty() {
        let manager = MusicManager::new(reqwest::Client::new(), "yt-dlp");
        assert!(manager.find_by_guild(GuildId::new(1)).is_none());
    }

    fn manager_with_player(key: PlayerKey) -> MusicManager {
        let manager = MusicManager::new(reqwest::Client::new(), "/usr/local/bin/yt-dlp");
        let call = Arc::new(tokio::sync::Mutex::new(Call::standalone(key.guild_id, UserId::new(1))));
        let player = manager.new_player(key, call);
        manager.players.insert(key, player);
        manager
    }

    fn key() -> PlayerKey {
        PlayerKey::new(GuildId::new(42), ChannelId::new(7))
    }

    #[tokio::test]
    async fn players_stream_with_the_configured_program() {
        let manager = manager_with_player(key());
        let player = manager.lease_existing(&key()).unwrap();
        assert_eq!(player.ytdlp_program(), "/usr/local/bin/yt-dlp");
    }

    #[tokio::test]
    async fn leased_player_survives_the_sweep() {
        let songbird = Songbird::serenity();
        let manager = manager_with_player(key());

        let lease = manager.lease_existing(&key()).unwrap();
        assert!(manager.sweep_idle(&songbird, Duration::ZERO).await.is_empty());
        assert!(manager.find_by_guild(key().guild_id).is_some());

        drop(lease);
        assert_eq!(manager.sweep_idle(&songbird, Duration::ZERO).await, vec![key()]);
        assert!(manager.find_by_guild(key().guild_id).is_none());
        assert!(manager.lease_existing(&key()).is_none());
    }

    #[tokio::test]
    async fn reused_player_is_not_swept_before_the_timeout() {
        let songbird = Songbird::serenity();
        let manager = manager_with_player(key());

        drop(manager.lease_existing(&key()));

        assert!(manager.sweep_idle(&songbird, Duration::from_secs(3600)).await.is_empty());
        assert!(manager.find_by_guild(key().guild_id).is_some());
    }

    #[tokio::test]
    async fn sweep_only_takes_idle_players() {
        let songbird = Songbird::serenity();
        let busy = key();
        let idle = PlayerKey::new(GuildId::new(43), ChannelId::new(8));
        let manager = manager_with_player(busy);
        let call = Arc::new(tokio::sync::Mutex::new(Call::standalone(idle.guild_id, UserId::new(1))));
        manager.players.insert(idle, manager.new_player(idle, call));

        let _lease = manager.lease_existing(&busy).unwrap();
        assert_eq!(manager.sweep_idle(&songbird, Duration::ZERO).await, vec![idle]);
        assert!(manager.find_by_guild(busy.guild_id).is_some());
    }
}
