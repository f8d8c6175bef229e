pub mod devices;
pub mod error;

use crate::auth::access_token::{AccessTokenResponse, TokenRequest};
use crate::core::models::TrackRef;
use crate::core::types::{AccessToken, DeviceId};

pub use error::Error;

use async_trait::async_trait;
use tracing::{event, Level};
use url::Url;

/// The provider's HTTP surface used by the auth flow and playback session.
#[async_trait]
pub trait ProviderApi: Send + Sync {
    async fn exchange_code(&self, req: &TokenRequest) -> Result<AccessTokenResponse, Error>;
    async fn play(&self, token: &AccessToken, device: &DeviceId, track: &TrackRef) -> Result<(), Error>;
    async fn devices(&self, token: &AccessToken) -> Result<Vec<Device>, Error>;
}

#[derive(Debug, serde::Serialize)]
pub struct PlayRequest {
    pub uris: Vec<String>,
}

impl PlayRequest {
    pub fn single(track: &TrackRef) -> Self {
        Self {
            uris: vec![track.uri()],
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Device {
    pub id: Option<DeviceId>,
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_restricted: bool,
}

#[derive(Debug, serde::Deserialize)]
struct DeviceList {
    devices: Vec<Device>,
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub authorize: Url,
    pub token: Url,
    pub api: Url,
}

impl Endpoints {
    pub const SPOTIFY_AUTHORIZE: &'static str = "https://accounts.spotify.com/authorize";
    pub const SPOTIFY_TOKEN: &'static str = "https://accounts.spotify.com/api/token";
    pub const SPOTIFY_API: &'static str = "https://api.spotify.com/v1";

    pub fn spotify() -> Result<Self, url::ParseError> {
        Ok(Self {
            authorize: Url::parse(Self::SPOTIFY_AUTHORIZE)?,
            token: Url::parse(Self::SPOTIFY_TOKEN)?,
            api: Url::parse(Self::SPOTIFY_API)?,
        })
    }

    fn api_path(&self, path: &str) -> Result<Url, url::ParseError> {
        let base = self.api.as_str().trim_end_matches('/');
        Url::parse(&format!("{}/{}", base, path))
    }
}

#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl ProviderClient {
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoints,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        event!(Level::WARN, status = status.as_u16(), url = %response.url(), "Provider rejected request");
        Err(Error::Status(status.as_u16()))
    }
}

#[async_trait]
impl ProviderApi for ProviderClient {
    #[tracing::instrument(skip_all, fields(client_id = %req.client_id.0))]
    async fn exchange_code(&self, req: &TokenRequest) -> Result<AccessTokenResponse, Error> {
        event!(Level::DEBUG, "Exchanging authorization code");
        let response = self
            .http
            .post(self.endpoints.token.clone())
            .form(req)
            .send()
            .await?;
        let token = check_status(response)?.json::<AccessTokenResponse>().await?;
        Ok(token)
    }

    #[tracing::instrument(skip(self, token), fields(track = %track))]
    async fn play(&self, token: &AccessToken, device: &DeviceId, track: &TrackRef) -> Result<(), Error> {
        let mut url = self.endpoints.api_path("me/player/play")?;
        url.query_pairs_mut().append_pair("device_id", &device.0);

        event!(Level::DEBUG, "Sending play command");
        let response = self
            .http
            .put(url)
            .header(reqwest::header::AUTHORIZATION, token.bearer())
            .json(&PlayRequest::single(track))
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn devices(&self, token: &AccessToken) -> Result<Vec<Device>, Error> {
        let url = self.endpoints.api_path("me/player/devices")?;
        let response = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, token.bearer())
            .send()
            .await?;
        let list = check_status(response)?.json::<DeviceList>().await?;
        Ok(list.devices)
    }
}
