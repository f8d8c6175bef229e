use std::path::PathBuf;

use clap::Parser;
use url::Url;

use crate::core::models::Provider;
use crate::core::types::{ClientId, RedirectUri, Scope};
use crate::playback::PlayerSettings;
use crate::provider::Endpoints;

pub const DEFAULT_SCOPE: &str =
    "streaming user-read-email user-read-private user-modify-playback-state user-read-playback-state";

/// How recognized tracks are played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ArgEnum)]
pub enum AuthMode {
    /// Hand the track URI to the provider's native app.
    DeepLink,
    /// Log in with PKCE and start playback through the web API.
    Authenticated,
}

#[derive(Debug, Clone, Parser)]
pub struct ConfigArgs {
    #[clap(long, env = "SCANTUNE_CLIENT_ID")]
    pub client_id: Option<String>,
    #[clap(long, env = "SCANTUNE_REDIRECT_URI", default_value = "http://127.0.0.1:8888/callback")]
    pub redirect_uri: String,
    #[clap(long, env = "SCANTUNE_SCOPE", default_value = DEFAULT_SCOPE)]
    pub scope: String,
    #[clap(long, env = "SCANTUNE_AUTHORIZE_URL", default_value = Endpoints::SPOTIFY_AUTHORIZE)]
    pub authorize_url: String,
    #[clap(long, env = "SCANTUNE_TOKEN_URL", default_value = Endpoints::SPOTIFY_TOKEN)]
    pub token_url: String,
    #[clap(long, env = "SCANTUNE_API_URL", default_value = Endpoints::SPOTIFY_API)]
    pub api_url: String,
    #[clap(long, env = "SCANTUNE_MODE", arg_enum, default_value = "deep-link")]
    pub mode: AuthMode,
    #[clap(long, env = "SCANTUNE_PLAYER_NAME", default_value = "scantune")]
    pub player_name: String,
    #[clap(long, env = "SCANTUNE_VOLUME", default_value = "0.5")]
    pub volume: f32,
    #[clap(long, env = "SCANTUNE_STATE_DIR")]
    pub state_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub enum Error {
    MissingClientId,
    InvalidUrl(&'static str, url::ParseError),
    InvalidVolume(f32),
    NoStateDir,
    Args(clap::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingClientId => write!(f, "authenticated mode needs SCANTUNE_CLIENT_ID"),
            Self::InvalidUrl(name, e) => write!(f, "invalid {}: {}", name, e),
            Self::InvalidVolume(v) => write!(f, "volume must be between 0.0 and 1.0, got {}", v),
            Self::NoStateDir => write!(f, "no data directory found; set SCANTUNE_STATE_DIR"),
            Self::Args(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<clap::Error> for Error {
    fn from(e: clap::Error) -> Self {
        Self::Args(e)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: AuthMode,
    pub client_id: Option<ClientId>,
    pub redirect_uri: RedirectUri,
    pub scope: Scope,
    pub endpoints: Endpoints,
    pub player: PlayerSettings,
    pub state_dir: PathBuf,
    pub provider: Provider,
}

fn parse_url(name: &'static str, s: &str) -> Result<Url, Error> {
    Url::parse(s).map_err(|e| Error::InvalidUrl(name, e))
}

impl Config {
    /// Reads `SCANTUNE_*` variables, after loading a `.env` file if present.
    pub fn from_env() -> Result<Self, Error> {
        dotenv::dotenv().ok();
        let args = ConfigArgs::try_parse_from([env!("CARGO_PKG_NAME")])?;
        Self::from_args(args)
    }

    pub fn from_args(args: ConfigArgs) -> Result<Self, Error> {
        let redirect_uri = parse_url("redirect URI", &args.redirect_uri)?;
        let endpoints = Endpoints {
            authorize: parse_url("authorize URL", &args.authorize_url)?,
            token: parse_url("token URL", &args.token_url)?,
            api: parse_url("API URL", &args.api_url)?,
        };

        if !(0.0..=1.0).contains(&args.volume) {
            return Err(Error::InvalidVolume(args.volume));
        }

        let client_id = args.client_id.filter(|id| !id.is_empty()).map(ClientId);
        if args.mode == AuthMode::Authenticated && client_id.is_none() {
            return Err(Error::MissingClientId);
        }

        let state_dir = match args.state_dir {
            Some(dir) => dir,
            None => dirs::data_local_dir()
                .map(|d| d.join(env!("CARGO_PKG_NAME")))
                .ok_or(Error::NoStateDir)?,
        };

        Ok(Self {
            mode: args.mode,
            client_id,
            redirect_uri: RedirectUri(redirect_uri.to_string()),
            scope: Scope::from_delimited_parts(&args.scope),
            endpoints,
            player: PlayerSettings {
                name: args.player_name,
                volume: args.volume,
            },
            state_dir,
            provider: Provider::spotify(),
        })
    }
}
