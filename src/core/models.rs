use super::types::DeviceId;

/// The streaming service a track reference belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    /// URI scheme, as in `spotify:track:<id>`.
    pub scheme: String,
    /// Domain token searched for in web URLs and redirect wrappers.
    pub domain: String,
}

impl Provider {
    pub fn spotify() -> Self {
        Self {
            scheme: "spotify".to_string(),
            domain: "spotify.com".to_string(),
        }
    }

    pub fn track_uri_prefix(&self) -> String {
        format!("{}:track:", self.scheme)
    }

    pub fn track_path_marker(&self) -> &'static str {
        "/track/"
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::spotify()
    }
}

/// A normalized `{provider}:track:{id}` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackRef {
    scheme: String,
    id: String,
}

impl TrackRef {
    /// Returns `None` unless `id` is a non-empty ASCII alphanumeric string.
    pub fn new(provider: &Provider, id: &str) -> Option<Self> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(Self {
            scheme: provider.scheme.clone(),
            id: id.to_string(),
        })
    }

    pub fn uri(&self) -> String {
        format!("{}:track:{}", self.scheme, self.id)
    }
}

impl std::fmt::Display for TrackRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:track:{}", self.scheme, self.id)
    }
}

impl serde::Serialize for TrackRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.uri())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackDevice {
    pub device_id: Option<DeviceId>,
    pub ready: bool,
}

impl PlaybackDevice {
    pub fn ready_id(&self) -> Option<&DeviceId> {
        match &self.device_id {
            Some(id) if self.ready && !id.0.is_empty() => Some(id),
            _ => None,
        }
    }
}
