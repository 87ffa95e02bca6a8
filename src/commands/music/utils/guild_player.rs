use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::input::{Input, YoutubeDl};
use songbird::tracks::{PlayMode, TrackHandle};
use songbird::{Call, Event, TrackEvent};
use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::commands::music::audio_sources::{AudioSourceResult, Player, Track};

use super::event_handlers::TrackEndNotifier;
use super::music_manager::{MusicError, MusicResult, is_idle};

/// Highest volume accepted by [`GuildPlayer::set_volume`], in percent.
pub const MAX_VOLUME: u16 = 200;
pub const DEFAULT_VOLUME: u16 = 100;

/// The track currently handed to songbird.
struct NowPlaying {
    handle: TrackHandle,
    track: Track,
    generation: u64,
}

struct PlayerState {
    queue: VecDeque<Track>,
    current: Option<NowPlaying>,
    volume: u16,
    muted: bool,
    generation: u64,
}

/// Read-only view of a player used by the queue command.
#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub current: Option<Track>,
    /// How far into `current` playback is, when songbird reports it.
    pub position: Option<Duration>,
    pub paused: bool,
    pub upcoming: Vec<Track>,
    pub volume: u16,
    pub muted: bool,
}

/// A guild's playback queue bound to one voice channel connection.
///
/// Tracks are streamed through songbird's `YoutubeDl` input; the queue itself is
/// kept here so that enqueueing never starts playback on its own.
pub struct GuildPlayer {
    guild_id: GuildId,
    channel_id: ChannelId,
    call: Arc<Mutex<Call>>,
    http: reqwest::Client,
    /// Program songbird spawns to stream each track.
    ytdlp: &'static str,
    state: Mutex<PlayerState>,
    last_active: std::sync::Mutex<Instant>,
    leases: AtomicUsize,
    this: Weak<GuildPlayer>,
}

impl GuildPlayer {
    pub fn new(
        guild_id: GuildId,
        channel_id: ChannelId,
        call: Arc<Mutex<Call>>,
        http: reqwest::Client,
        ytdlp: &'static str,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            guild_id,
            channel_id,
            call,
            http,
            ytdlp,
            state: Mutex::new(PlayerState {
                queue: VecDeque::new(),
                current: None,
                volume: DEFAULT_VOLUME,
                muted: false,
                generation: 0,
            }),
            last_active: std::sync::Mutex::new(Instant::now()),
            leases: AtomicUsize::new(0),
            this: this.clone(),
        })
    }

    /// Takes a lease that keeps this player out of the idle sweep.
    pub fn lease(self: &Arc<Self>) -> PlayerLease {
        PlayerLease::new(self.clone())
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    pub fn ytdlp_program(&self) -> &'static str {
        self.ytdlp
    }

    pub fn last_active(&self) -> Instant {
        *self.last_active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn touch(&self) {
        *self.last_active.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    pub fn lease_count(&self) -> usize {
        self.leases.load(Ordering::SeqCst)
    }

    /// Whether the idle sweep may tear this player down at `now`.
    ///
    /// Leased players and players whose state is locked are never reclaimable.
    pub fn is_reclaimable(&self, now: Instant, timeout: Duration) -> bool {
        if self.lease_count() > 0 {
            return false;
        }
        let Ok(state) = self.state.try_lock() else {
            return false;
        };
        is_idle(state.current.is_some(), self.last_active(), now, timeout)
    }

    pub async fn queue_len(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    /// Hands the next queued track to songbird. Caller holds the state lock.
    async fn start_next(&self, state: &mut PlayerState) -> Option<Track> {
        let track = state.queue.pop_front()?;
        state.generation += 1;
        let generation = state.generation;

        info!(
            "Starting '{}' ({}) in guild {}",
            track.title, track.uri, self.guild_id
        );

        let input: Input =
            YoutubeDl::new_ytdl_like(self.ytdlp_program(), self.http.clone(), track.uri.clone()).into();
        let handle = self.call.lock().await.play_input(input);

        if let Err(e) = handle.set_volume(effective_volume(state.volume, state.muted)) {
            warn!("Failed to apply volume in guild {}: {}", self.guild_id, e);
        }

        for event in [TrackEvent::End, TrackEvent::Error] {
            let notifier = TrackEndNotifier {
                player: self.this.clone(),
                generation,
            };
            if let Err(e) = handle.add_event(Event::Track(event), notifier) {
                error!(
                    "Failed to register track event for guild {}: {}",
                    self.guild_id, e
                );
            }
        }

        state.current = Some(NowPlaying {
            handle,
            track: track.clone(),
            generation,
        });
        self.touch();
        Some(track)
    }

    /// Called when the track started as `generation` ends or fails. Stale
    /// notifications (the player already moved on) are ignored.
    pub async fn advance(&self, generation: u64) {
        let mut state = self.state.lock().await;

        match &state.current {
            Some(now) if now.generation == generation => {}
            _ => {
                debug!(
                    "Ignoring stale track end (generation {}) in guild {}",
                    generation, self.guild_id
                );
                return;
            }
        }

        state.current = None;
        self.touch();

        if self.start_next(&mut state).await.is_none() {
            info!("Queue finished in guild {}", self.guild_id);
        }
    }

    pub async fn pause(&self) -> MusicResult<Track> {
        let mut state = self.state.lock().await;
        self.touch();
        let now = state.current.as_ref().ok_or(MusicError::NothingPlaying)?;
        now.handle
            .pause()
            .map_err(|e| MusicError::PlayerError(e.to_string()))?;
        Ok(now.track.clone())
    }

    pub async fn resume(&self) -> MusicResult<Track> {
        let mut state = self.state.lock().await;
        self.touch();
        let now = state.current.as_ref().ok_or(MusicError::NothingPlaying)?;
        now.handle
            .play()
            .map_err(|e| MusicError::PlayerError(e.to_string()))?;
        Ok(now.track.clone())
    }

    /// Stops the current track and starts the next one. The stopped track's
    /// end event arrives later and is ignored as stale.
    pub async fn skip(&self) -> MusicResult<Track> {
        let mut state = self.state.lock().await;
        self.touch();
        let now = state.current.take().ok_or(MusicError::NothingPlaying)?;
        if let Err(e) = now.handle.stop() {
            warn!("Failed to stop skipped track in guild {}: {}", self.guild_id, e);
        }

        if self.start_next(&mut state).await.is_none() {
            info!("Skipped the last track in guild {}", self.guild_id);
        }
        Ok(now.track)
    }

    /// Clears the queue and stops the current track.
    pub async fn stop(&self) -> usize {
        let mut state = self.state.lock().await;
        let cleared = state.queue.len();
        state.queue.clear();
        self.touch();

        if let Some(now) = state.current.take() {
            if let Err(e) = now.handle.stop() {
                warn!("Failed to stop track in guild {}: {}", self.guild_id, e);
            }
        }
        cleared
    }

    /// Sets the volume in percent, clamped to [`MAX_VOLUME`]. A muted player
    /// stays silent and picks the new volume up when unmuted.
    pub async fn set_volume(&self, percent: u16) -> MusicResult<u16> {
        let mut state = self.state.lock().await;
        state.volume = percent.min(MAX_VOLUME);
        self.touch();
        apply_volume(&state)?;
        Ok(state.volume)
    }

    /// Flips the mute flag and returns the new value.
    pub async fn toggle_mute(&self) -> MusicResult<bool> {
        let mut state = self.state.lock().await;
        state.muted = !state.muted;
        self.touch();
        apply_volume(&state)?;
        Ok(state.muted)
    }

    pub async fn snapshot(&self) -> PlayerSnapshot {
        let state = self.state.lock().await;

        let info = match &state.current {
            Some(now) => now.handle.get_info().await.ok(),
            None => None,
        };

        PlayerSnapshot {
            current: state.current.as_ref().map(|now| now.track.clone()),
            position: info.as_ref().map(|info| info.position),
            paused: info.is_some_and(|info| matches!(info.playing, PlayMode::Pause)),
            upcoming: state.queue.iter().cloned().collect(),
            volume: state.volume,
            muted: state.muted,
        }
    }
}

/// A player in use by a command. The idle sweep skips players with a live
/// lease, and dropping the lease counts as activity.
pub struct PlayerLease {
    player: Arc<GuildPlayer>,
}

impl PlayerLease {
    fn new(player: Arc<GuildPlayer>) -> Self {
        player.leases.fetch_add(1, Ordering::SeqCst);
        player.touch();
        Self { player }
    }
}

impl Deref for PlayerLease {
    type Target = GuildPlayer;

    fn deref(&self) -> &GuildPlayer {
        &self.player
    }
}

impl Drop for PlayerLease {
    fn drop(&mut self) {
        self.player.touch();
        self.player.leases.fetch_sub(1, Ordering::SeqCst);
    }
}

fn apply_volume(state: &PlayerState) -> MusicResult<()> {
    if let Some(now) = &state.current {
        now.handle
            .set_volume(effective_volume(state.volume, state.muted))
            .map_err(|e| MusicError::PlayerError(e.to_string()))?;
    }
    Ok(())
}

/// Songbird volume where `1.0` is unchanged loudness.
pub(crate) fn effective_volume(percent: u16, muted: bool) -> f32 {
    if muted {
        0.0
    } else {
        f32::from(percent.min(MAX_VOLUME)) / 100.0
    }
}

#[async_trait]
impl Player for GuildPlayer {
    async fn enqueue(&self, track: Track) -> AudioSourceResult<()> {
        let mut state = self.state.lock().await;
        debug!("Queueing '{}' in guild {}", track.title, self.guild_id);
        state.queue.push_back(track);
        self.touch();
        Ok(())
    }

    async fn play(&self) -> AudioSourceResult<()> {
        let mut state = self.state.lock().await;
        if state.current.is_some() {
            return Ok(());
        }
        if self.start_next(&mut state).await.is_none() {
            debug!("play() with an empty queue in guild {}", self.guild_id);
        }
        Ok(())
    }

    async fn is_playing(&self) -> bool {
        self.state.lock().await.current.is_some()
    }
}
