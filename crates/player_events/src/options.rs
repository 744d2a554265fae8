//! Loosely-typed player options.
//!
//! Options are read-only for plugins. Values keep whatever JSON shape the
//! application supplied and are coerced on read.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const SOURCE_URL: &str = "sourceUrl";
pub const POSTER_URL: &str = "posterUrl";
pub const MEDIA_CONTROL: &str = "mediaControl";
pub const FULLSCREEN: &str = "fullscreen";
pub const FULLSCREEN_DISABLED: &str = "fullscreenDisabled";
pub const FULLSCREEN_BY_APP: &str = "fullscreenByApp";
pub const START_AT: &str = "startAt";
pub const MIME_TYPE: &str = "mimeType";
pub const DEFAULT_SUBTITLE: &str = "defaultSubtitle";
pub const DEFAULT_AUDIO_SOURCE: &str = "defaultAudioSource";
pub const MIN_DVR_SIZE: &str = "minDvrSize";
pub const MEDIA_CONTROL_ALWAYS_VISIBLE: &str = "mediaControlAlwaysVisible";
pub const MEDIA_CONTROL_PLUGINS: &str = "mediaControlPlugins";
pub const MEDIA_CONTROL_PLUGINS_ORDER: &str = "mediaControlPluginsOrder";
pub const LOOP: &str = "loop";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options {
    inner: Map<String, Value>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(inner: Map<String, Value>) -> Self {
        Self { inner }
    }

    /// Builder-style insert, for constructing options in code.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inner.insert(key.into(), value.into());
        self
    }

    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Typed read. `None` when the key is absent or the value has another shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.inner
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.inner.get(key).and_then(Value::as_str)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.inner.get(key).and_then(Value::as_bool)
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.bool(key).unwrap_or(default)
    }

    /// Numeric read accepting integers, floats and numeric strings.
    pub fn f64(&self, key: &str) -> Option<f64> {
        match self.inner.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// List of strings. Non-string elements make the whole value unreadable.
    pub fn string_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key)
    }

    /// New options with `other` layered on top. `self` is left untouched.
    pub fn merging(&self, other: &Options) -> Options {
        let mut inner = self.inner.clone();
        for (k, v) in &other.inner {
            inner.insert(k.clone(), v.clone());
        }
        Options { inner }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
