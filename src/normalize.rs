//! Turns raw QR payloads into canonical track references.
//!
//! Three payload shapes show up in practice: bare provider URIs
//! (`spotify:track:<id>`), provider web links (`https://open.spotify.com/track/<id>?si=...`)
//! and links wrapped by a scanner app's own redirect service. Matching is done
//! with substring search instead of prefix checks because wrappers rewrite the
//! scheme and host while keeping the provider's domain somewhere in the string.
//! This accepts some false positives in exchange for not missing wrapped codes.

use crate::core::models::{Provider, TrackRef};

use tracing::{event, Level};

const ID_TERMINATORS: &[char] = &['?', '#', '&', '/'];

/// Normalizes against the built-in provider.
pub fn normalize(payload: &str) -> Option<TrackRef> {
    Normalizer::default().normalize(payload)
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    provider: Provider,
}

impl Normalizer {
    pub fn with_provider(provider: Provider) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn normalize(&self, payload: &str) -> Option<TrackRef> {
        let payload = payload.trim();
        if payload.is_empty() {
            return None;
        }

        let track = self
            .match_raw(payload)
            .or_else(|| self.match_wrapped_query(payload));

        event!(Level::DEBUG, payload, track = ?track.as_ref().map(TrackRef::uri), "Normalized payload");
        track
    }

    fn match_raw(&self, s: &str) -> Option<TrackRef> {
        self.match_uri(s).or_else(|| self.match_web_url(s))
    }

    fn match_uri(&self, s: &str) -> Option<TrackRef> {
        let prefix = self.provider.track_uri_prefix();
        let at = s.find(&prefix)?;
        self.take_id(&s[at + prefix.len()..])
    }

    fn match_web_url(&self, s: &str) -> Option<TrackRef> {
        let domain = &self.provider.domain;
        let at = s.find(domain.as_str())?;
        let rest = &s[at + domain.len()..];

        let marker = self.provider.track_path_marker();
        let at = rest.find(marker)?;
        self.take_id(&rest[at + marker.len()..])
    }

    // Wrappers that percent-encode their target hide the marker from a raw
    // search, so look inside each decoded query value once.
    fn match_wrapped_query(&self, s: &str) -> Option<TrackRef> {
        let url = url::Url::parse(s).ok()?;
        let found = url
            .query_pairs()
            .find_map(|(_, value)| self.match_raw(&value));
        found
    }

    fn take_id(&self, rest: &str) -> Option<TrackRef> {
        let id = match rest.find(ID_TERMINATORS) {
            Some(end) => &rest[..end],
            None => rest,
        };
        TrackRef::new(&self.provider, id)
    }
}
