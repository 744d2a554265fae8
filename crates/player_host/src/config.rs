//! Configuration management for the player host.
//!
//! The TOML file describes the options handed to every host, which built-in
//! plugins to register, the media control timings and a script of events to
//! replay against the hosts.

use anyhow::Result;
use player_events::{options, Options};
use player_plugins::builtin::media_control::{LONG_HIDE_DELAY_KEY, SHORT_HIDE_DELAY_KEY};
use player_plugins::builtin::BUILTIN_PLUGINS;
use player_plugins::HostKind;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::info;

/// Application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Options shared by the core, container and playback
    #[serde(default)]
    pub player: Map<String, Value>,
    #[serde(default)]
    pub plugins: PluginSettings,
    #[serde(default)]
    pub media_control: MediaControlSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Events replayed after the plugins have rendered
    #[serde(default)]
    pub script: Vec<ScriptStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginSettings {
    /// Built-in plugins to register, by name
    pub enabled: Vec<String>,
    /// Plugins rendered first, in this order
    #[serde(default)]
    pub order: Vec<String>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            enabled: BUILTIN_PLUGINS.iter().map(|name| name.to_string()).collect(),
            order: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaControlSettings {
    #[serde(default = "default_short_hide_delay_ms")]
    pub short_hide_delay_ms: u64,
    #[serde(default = "default_long_hide_delay_ms")]
    pub long_hide_delay_ms: u64,
    #[serde(default)]
    pub always_visible: bool,
}

fn default_short_hide_delay_ms() -> u64 {
    400
}

fn default_long_hide_delay_ms() -> u64 {
    4000
}

impl Default for MediaControlSettings {
    fn default() -> Self {
        Self {
            short_hide_delay_ms: default_short_hide_delay_ms(),
            long_hide_delay_ms: default_long_hide_delay_ms(),
            always_visible: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// One scripted trigger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScriptStep {
    /// `core`, `container` or `playback`
    pub target: String,
    pub event: String,
    /// Delay before the trigger, relative to the previous step
    #[serde(default)]
    pub after_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<Map<String, Value>>,
}

impl ScriptStep {
    pub fn new(target: &str, event: impl AsRef<str>, after_ms: u64) -> Self {
        Self {
            target: target.to_string(),
            event: event.as_ref().to_string(),
            after_ms,
            user_info: None,
        }
    }

    pub fn host_kind(&self) -> Option<HostKind> {
        match self.target.as_str() {
            "core" => Some(HostKind::Core),
            "container" => Some(HostKind::Container),
            "playback" => Some(HostKind::Playback),
            _ => None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut player = Map::new();
        player.insert(
            options::SOURCE_URL.to_string(),
            json!("https://example.com/live/master.m3u8"),
        );
        player.insert(options::MIME_TYPE.to_string(), json!("application/x-mpegURL"));
        player.insert(options::START_AT.to_string(), json!(0.0));

        Self {
            player,
            plugins: PluginSettings::default(),
            media_control: MediaControlSettings::default(),
            logging: LoggingSettings::default(),
            script: vec![
                ScriptStep::new("container", "enableMediaControl", 0),
                ScriptStep::new("playback", "ready", 100),
                ScriptStep::new("playback", "playing", 100),
                ScriptStep::new("core", "didTappedCore", 500),
                ScriptStep::new("playback", "didPause", 1000),
                ScriptStep::new("playback", "playing", 2000),
                ScriptStep::new("playback", "didComplete", 5000),
            ],
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration to `path`
    /// and returns it.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    ///
    /// The parsed `AppConfig`, or an error if the file cannot be read, parsed
    /// or (when missing) created.
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Options handed to each host.
    ///
    /// The plugin ordering hint and the `[media_control]` settings form the
    /// base, and the `[player]` table is layered on top, so a key set under
    /// `[player]` always wins.
    ///
    /// # Returns
    ///
    /// An `Options` map ready to pass to [`Host::new`](player_plugins::Host::new).
    pub fn host_options(&self) -> Options {
        let mut base = Options::new()
            .with(
                SHORT_HIDE_DELAY_KEY,
                self.media_control.short_hide_delay_ms as f64 / 1000.0,
            )
            .with(
                LONG_HIDE_DELAY_KEY,
                self.media_control.long_hide_delay_ms as f64 / 1000.0,
            )
            .with(
                options::MEDIA_CONTROL_ALWAYS_VISIBLE,
                self.media_control.always_visible,
            );
        if !self.plugins.order.is_empty() {
            base = base.with(options::MEDIA_CONTROL_PLUGINS_ORDER, json!(self.plugins.order));
        }
        base.merging(&Options::from_map(self.player.clone()))
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// Checks the log level, the enabled plugin names and every script
    /// target.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is usable, or a message naming the first
    /// offending value.
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        for name in &self.plugins.enabled {
            if !BUILTIN_PLUGINS.contains(&name.as_str()) {
                return Err(format!(
                    "Unknown plugin: {name}. Must be one of: {BUILTIN_PLUGINS:?}"
                ));
            }
        }

        for (index, step) in self.script.iter().enumerate() {
            if step.host_kind().is_none() {
                return Err(format!(
                    "Script step {index} has unknown target: {}. Must be one of: core, container, playback",
                    step.target
                ));
            }
        }

        Ok(())
    }
}
