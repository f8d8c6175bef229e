//! A one-shot local server that receives the authorization redirect, for
//! hosts where there is no page to reload with the code in its URL.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tracing::{event, Level};
use url::Url;
use warp::Filter;

const DONE_PAGE: &str = "<!doctype html><title>scantune</title><p>Login finished, you can close this tab.</p>";
const NOT_FOUND_PAGE: &str = "<!doctype html><title>scantune</title><p>Not found.</p>";

#[derive(Debug)]
pub enum Error {
    Bind(String),
    Url(url::ParseError),
    /// The server went away before a callback arrived.
    Closed,
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::Url(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bind(reason) => write!(f, "could not listen for the login callback: {}", reason),
            Self::Url(e) => write!(f, "bad redirect URI: {}", e),
            Self::Closed => write!(f, "login callback server stopped"),
        }
    }
}

impl std::error::Error for Error {}

#[derive(Debug)]
pub struct CallbackServer {
    addr: SocketAddr,
    callback: oneshot::Receiver<Url>,
    shutdown: oneshot::Sender<()>,
}

impl CallbackServer {
    /// Listens on the host and port of `redirect_uri`. The first GET to its
    /// path is turned back into a full location (redirect URI plus the query
    /// the provider appended).
    pub async fn bind(redirect_uri: &Url) -> Result<Self, Error> {
        let addr = redirect_uri
            .socket_addrs(|| None)
            .map_err(|e| Error::Bind(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Bind("redirect URI has no address".to_string()))?;

        let (callback_tx, callback) = oneshot::channel();
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let sender = Arc::new(Mutex::new(Some(callback_tx)));
        let expected_path = redirect_uri.path().to_string();
        let base = redirect_uri.clone();

        let route = warp::get()
            .and(warp::path::full())
            .and(warp::query::raw().or(warp::any().map(String::new)).unify())
            .map(move |path: warp::path::FullPath, query: String| {
                if path.as_str() != expected_path {
                    return warp::reply::with_status(
                        warp::reply::html(NOT_FOUND_PAGE),
                        warp::http::StatusCode::NOT_FOUND,
                    );
                }

                let mut location = base.clone();
                location.set_query(if query.is_empty() { None } else { Some(&query) });

                let tx = sender.lock().ok().and_then(|mut slot| slot.take());
                if let Some(tx) = tx {
                    let _ = tx.send(location);
                }
                warp::reply::with_status(warp::reply::html(DONE_PAGE), warp::http::StatusCode::OK)
            })
            .with(warp::log("scantune::callback"));

        let (addr, server) = warp::serve(route)
            .try_bind_with_graceful_shutdown(addr, async move {
                let _ = shutdown_rx.await;
            })
            .map_err(|e| Error::Bind(e.to_string()))?;
        tokio::spawn(server);

        event!(Level::DEBUG, %addr, "Waiting for login callback");
        Ok(Self {
            addr,
            callback,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Resolves with the callback location and stops the server.
    pub async fn wait(self) -> Result<Url, Error> {
        let location = self.callback.await.map_err(|_| Error::Closed);
        let _ = self.shutdown.send(());
        location
    }
}
