use std::sync::Arc;

use clap::Parser;
use tracing::{event, Level};

use crate::app::{AppSession, Collaborators, LoadOutcome};
use crate::auth::{AuthFlow, AuthSettings, FileVerifierStore};
use crate::config::{AuthMode, Config, ConfigArgs};
use crate::http::server::CallbackServer;
use crate::launcher::{Launcher, FALLBACK_DELAY};
use crate::navigation::SystemNavigator;
use crate::normalize::Normalizer;
use crate::provider::{devices::RemoteDeviceSdk, ProviderClient};
use crate::scan::{ConsoleFeedback, LineCamera, ScannerState};

pub type CliError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[clap(
    name = "scantune",
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION")
)]
pub struct Options {
    #[clap(flatten)]
    config: ConfigArgs,
    #[clap(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand)]
enum SubCommand {
    /// Print the canonical track URI for a QR payload.
    Normalize(Normalize),
    /// Open a QR payload in the native app, falling back to the browser.
    Open(Open),
    /// Print a fresh authorization URL.
    AuthorizeUrl(AuthorizeUrl),
    /// Read payloads from stdin, one per line, and play them.
    Scan(Scan),
}

#[derive(Parser)]
struct Normalize {
    payload: String,
}

#[derive(Parser)]
struct Open {
    payload: String,
}

#[derive(Parser)]
struct AuthorizeUrl;

#[derive(Parser)]
struct Scan;

fn not_a_track(payload: &str) -> CliError {
    format!("not a track code: {}", payload).into()
}

fn normalize(c: &Normalize, config: &Config) -> Result<(), CliError> {
    let normalizer = Normalizer::with_provider(config.provider.clone());
    let track = normalizer.normalize(&c.payload).ok_or_else(|| not_a_track(&c.payload))?;
    println!("{}", track);
    Ok(())
}

async fn open(c: &Open, config: &Config) -> Result<(), CliError> {
    let normalizer = Normalizer::with_provider(config.provider.clone());
    let track = normalizer.normalize(&c.payload).ok_or_else(|| not_a_track(&c.payload))?;

    let launcher = Launcher::new(Arc::new(SystemNavigator::default()));
    launcher.launch(&track, &c.payload).await?;
    Ok(())
}

fn authorize_url(_c: &AuthorizeUrl, config: &Config) -> Result<(), CliError> {
    let client_id = config
        .client_id
        .clone()
        .ok_or(crate::config::Error::MissingClientId)?;
    let settings = AuthSettings {
        client_id,
        redirect_uri: config.redirect_uri.clone(),
        scope: config.scope.clone(),
        authorize_endpoint: config.endpoints.authorize.clone(),
    };
    let flow = AuthFlow::new(
        settings,
        Arc::new(ProviderClient::new(config.endpoints.clone())),
        Arc::new(FileVerifierStore::in_dir(&config.state_dir)),
        Arc::new(SystemNavigator::default()),
    );
    println!("{}", flow.authorization_url()?);
    Ok(())
}

async fn login(app: &AppSession, config: &Config) -> Result<(), CliError> {
    let redirect = config.redirect_uri.as_url()?;
    let server = CallbackServer::bind(&redirect).await?;

    let outcome = match app.load(&redirect).await? {
        LoadOutcome::AwaitingLogin(url) => {
            eprintln!("If no browser opened, log in at:\n{}", url);
            let location = server.wait().await?;
            app.load(&location).await?
        }
        other => other,
    };

    match outcome {
        LoadOutcome::Connected(device_id) => {
            event!(Level::INFO, %device_id, "Playing on device");
            Ok(())
        }
        other => Err(format!("login did not complete: {:?}", other).into()),
    }
}

async fn scan(_c: &Scan, config: &Config) -> Result<(), CliError> {
    let api = Arc::new(ProviderClient::new(config.endpoints.clone()));
    let camera = Arc::new(LineCamera::stdin());
    let parts = Collaborators {
        camera: camera.clone(),
        navigator: Arc::new(SystemNavigator::default()),
        api: api.clone(),
        sdk: Arc::new(RemoteDeviceSdk::new(api)),
        store: Arc::new(FileVerifierStore::in_dir(&config.state_dir)),
        feedback: Arc::new(ConsoleFeedback::default()),
    };
    let app = AppSession::init(config, parts);

    if app.mode() == AuthMode::Authenticated {
        if let Err(e) = login(&app, config).await {
            app.dispose().await;
            return Err(e);
        }
    }

    let scanner = app.scanner();
    let mut state = scanner.subscribe();
    let result = loop {
        if camera.is_exhausted() {
            break Ok(());
        }
        match scanner.toggle().await {
            Ok(ScannerState::Active) => {}
            Ok(_) => break Ok(()),
            Err(e) => break Err(e),
        }
        tokio::select! {
            _ = state.wait_for(|s| *s == ScannerState::Idle) => {}
            _ = camera.exhausted() => {
                scanner.dispose();
                break Ok(());
            }
        }
    };

    if app.mode() == AuthMode::DeepLink {
        // let the last web fallback fire before exiting
        tokio::time::sleep(FALLBACK_DELAY).await;
    }
    app.dispose().await;
    result.map_err(Into::into)
}

pub async fn run_cli_action(opts: Options) -> Result<(), CliError> {
    let config = Config::from_args(opts.config)?;

    match &opts.command {
        SubCommand::Normalize(c) => normalize(c, &config),
        SubCommand::Open(c) => open(c, &config).await,
        SubCommand::AuthorizeUrl(c) => authorize_url(c, &config),
        SubCommand::Scan(c) => scan(c, &config).await,
    }
}
