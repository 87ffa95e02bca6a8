//! Runtime settings read from the environment (after `.env` is loaded).

use humantime_serde::re::humantime;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PREFIX: &str = "!";
const DEFAULT_THEME_STORE: &str = "themes.json";
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_MAX_PLAYLIST_TRACKS: usize = 100;
const DEFAULT_YTDLP: &str = "yt-dlp";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Clone)]
pub struct BotConfig {
    pub discord_token: String,
    pub prefix: String,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub theme_store_path: PathBuf,
    pub idle_timeout: Duration,
    pub sweep_interval: Duration,
    pub max_playlist_tracks: usize,
    pub ytdlp_path: String,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("discord_token", &"<redacted>")
            .field("prefix", &self.prefix)
            .field("spotify_client_id", &self.spotify_client_id)
            .field("spotify_client_secret", &self.spotify_client_secret.as_ref().map(|_| "<redacted>"))
            .field("theme_store_path", &self.theme_store_path)
            .field("idle_timeout", &self.idle_timeout)
            .field("sweep_interval", &self.sweep_interval)
            .field("max_playlist_tracks", &self.max_playlist_tracks)
            .field("ytdlp_path", &self.ytdlp_path)
            .finish()
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let discord_token = get("DISCORD_TOKEN").ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        let idle_timeout = match get("PLAYER_IDLE_TIMEOUT") {
            Some(raw) => parse_duration("PLAYER_IDLE_TIMEOUT", &raw)?,
            None => DEFAULT_IDLE_TIMEOUT,
        };
        let sweep_interval = match get("PLAYER_SWEEP_INTERVAL") {
            Some(raw) => parse_duration("PLAYER_SWEEP_INTERVAL", &raw)?,
            None => DEFAULT_SWEEP_INTERVAL,
        };

        let max_playlist_tracks = match get("MAX_PLAYLIST_TRACKS") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(0) => {
                    return Err(ConfigError::Invalid {
                        key: "MAX_PLAYLIST_TRACKS",
                        message: "must be at least 1".to_string(),
                    });
                }
                Ok(n) => n,
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        key: "MAX_PLAYLIST_TRACKS",
                        message: e.to_string(),
                    });
                }
            },
            None => DEFAULT_MAX_PLAYLIST_TRACKS,
        };

        Ok(Self {
            discord_token,
            prefix: get("COMMAND_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            spotify_client_id: get("SPOTIFY_CLIENT_ID"),
            spotify_client_secret: get("SPOTIFY_CLIENT_SECRET"),
            theme_store_path: get("THEME_STORE_PATH")
                .unwrap_or_else(|| DEFAULT_THEME_STORE.to_string())
                .into(),
            idle_timeout,
            sweep_interval,
            max_playlist_tracks,
            ytdlp_path: get("YTDLP_PATH").unwrap_or_else(|| DEFAULT_YTDLP.to_string()),
        })
    }
}

fn parse_duration(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let duration = humantime::parse_duration(raw).map_err(|e| ConfigError::Invalid {
        key,
        message: e.to_string(),
    })?;
    if duration.is_zero() {
        return Err(ConfigError::Invalid {
            key,
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_token_is_set() {
        let config = config(&[("DISCORD_TOKEN", "secret")]).unwrap();
        assert_eq!(config.prefix, "!");
        assert_eq!(config.theme_store_path, PathBuf::from("themes.json"));
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.max_playlist_tracks, 100);
        assert_eq!(config.ytdlp_path, "yt-dlp");
        assert!(config.spotify_client_id.is_none());
    }

    #[test]
    fn token_is_required() {
        assert_eq!(config(&[]).unwrap_err(), ConfigError::Missing("DISCORD_TOKEN"));
        assert_eq!(
            config(&[("DISCORD_TOKEN", "  ")]).unwrap_err(),
            ConfigError::Missing("DISCORD_TOKEN")
        );
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("DISCORD_TOKEN", "secret"),
            ("COMMAND_PREFIX", "?"),
            ("PLAYER_IDLE_TIMEOUT", "10m 30s"),
            ("PLAYER_SWEEP_INTERVAL", "15s"),
            ("MAX_PLAYLIST_TRACKS", "25"),
            ("SPOTIFY_CLIENT_ID", "id"),
            ("SPOTIFY_CLIENT_SECRET", "shh"),
        ])
        .unwrap();

        assert_eq!(config.prefix, "?");
        assert_eq!(config.idle_timeout, Duration::from_secs(630));
        assert_eq!(config.sweep_interval, Duration::from_secs(15));
        assert_eq!(config.max_playlist_tracks, 25);
        assert_eq!(config.spotify_client_secret.as_deref(), Some("shh"));
    }

    #[test]
    fn rejects_bad_values() {
        assert_matches!(
            config(&[("DISCORD_TOKEN", "x"), ("PLAYER_IDLE_TIMEOUT", "soon")]),
            Err(ConfigError::Invalid { key: "PLAYER_IDLE_TIMEOUT", .. })
        );
        assert_matches!(
            config(&[("DISCORD_TOKEN", "x"), ("PLAYER_SWEEP_INTERVAL", "0s")]),
            Err(ConfigError::Invalid { key: "PLAYER_SWEEP_INTERVAL", .. })
        );
        assert_matches!(
            config(&[("DISCORD_TOKEN", "x"), ("MAX_PLAYLIST_TRACKS", "0")]),
            Err(ConfigError::Invalid { key: "MAX_PLAYLIST_TRACKS", .. })
        );
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = config(&[("DISCORD_TOKEN", "very-secret"), ("SPOTIFY_CLIENT_SECRET", "hush")]).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("hush"));
    }
}
