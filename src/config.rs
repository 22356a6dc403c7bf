use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::cli::Cli;

pub const DEFAULT_API_URL: &str = "http://api.wisey.app/api/v1/core";
pub const DEFAULT_AUTH_URL: &str = "http://api.wisey.app/api/v1/auth/anonymous";
pub const DEFAULT_PLATFORM: &str = "subscriptions";
pub const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub auth_url: String,
    pub platform: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: &str, auth_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_url: auth_url.to_string(),
            platform: DEFAULT_PLATFORM.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    pub bin: PathBuf,
    pub pip_enabled: bool,
    pub autoplay: bool,
    pub min_rate: f64,
    pub max_rate: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            bin: PathBuf::from("mpv"),
            pip_enabled: true,
            autoplay: false,
            min_rate: 0.25,
            max_rate: 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api: ApiConfig,
    pub page_size: usize,
    pub player: PlayerConfig,
    pub ephemeral: bool,
}

impl Config {
    pub fn from_env(cli: &Cli) -> Self {
        Self::from_lookup(cli, |key| env::var_os(key))
    }

    pub(crate) fn from_lookup<F>(cli: &Cli, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let text = |key: &str| {
            lookup(key)
                .and_then(|value| value.into_string().ok())
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let base_url = cli
            .api_url
            .clone()
            .or_else(|| text("LESSONVIEW_API_URL"))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let auth_url = cli
            .auth_url
            .clone()
            .or_else(|| text("LESSONVIEW_AUTH_URL"))
            .unwrap_or_else(|| DEFAULT_AUTH_URL.to_string());

        let mut api = ApiConfig::new(&base_url, &auth_url);
        if let Some(platform) = text("LESSONVIEW_PLATFORM") {
            api.platform = platform;
        }
        let timeout_secs = parse_positive(
            "LESSONVIEW_HTTP_TIMEOUT_SECS",
            text("LESSONVIEW_HTTP_TIMEOUT_SECS"),
        );
        if let Some(secs) = timeout_secs {
            api.connect_timeout = Duration::from_secs(secs as u64);
            api.read_timeout = Duration::from_secs(secs as u64);
        }

        let page_size = cli
            .page_size
            .or_else(|| parse_positive("LESSONVIEW_PAGE_SIZE", text("LESSONVIEW_PAGE_SIZE")))
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let player = PlayerConfig {
            bin: resolve_player_bin_from_env(lookup("LESSONVIEW_PLAYER")),
            pip_enabled: !flag_set(text("LESSONVIEW_NO_PIP")),
            autoplay: flag_set(text("LESSONVIEW_AUTOPLAY")),
            ..PlayerConfig::default()
        };

        Self {
            api,
            page_size,
            player,
            ephemeral: cli.ephemeral,
        }
    }
}

pub(crate) fn resolve_player_bin_from_env(env_value: Option<OsString>) -> PathBuf {
    match env_value {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from("mpv"),
    }
}

fn parse_positive(key: &str, raw: Option<String>) -> Option<usize> {
    let raw = raw?;
    match raw.parse::<usize>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            warn!(key, value = %raw, "ignoring invalid numeric setting");
            None
        }
    }
}

fn flag_set(raw: Option<String>) -> bool {
    matches!(
        raw.as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}
