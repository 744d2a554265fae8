//! Identity types shared by buses, hosts and plugins.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of an object that can own subscriptions (a host or a plugin).
///
/// Owners are referred to by identity only. Holding an `ObjectId` never keeps
/// the object it names alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_str(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle for a single registration on one bus.
///
/// Ids increase monotonically per bus and are never reused, so removing a
/// stale id can never hit a newer subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Untyped payload carried by a trigger.
pub type UserInfo = serde_json::Map<String, serde_json::Value>;

/// Builds a [`UserInfo`] from key/value pairs.
pub fn user_info<K, V, I>(pairs: I) -> UserInfo
where
    K: Into<String>,
    V: Into<serde_json::Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_ids_are_unique() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn object_id_round_trips_through_display() {
        let id = ObjectId::new();
        let parsed = ObjectId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn user_info_builder_collects_pairs() {
        let info = user_info([("position", 12.5), ("duration", 90.0)]);
        assert_eq!(info.len(), 2);
        assert_eq!(info["position"], serde_json::json!(12.5));
    }
}
