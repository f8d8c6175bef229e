use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use url::Url;
use warp::http::StatusCode;
use warp::Filter;

use scantune::auth::pkce::Verifier;
use scantune::auth::TokenRequest;
use scantune::core::models::{Provider, TrackRef};
use scantune::core::types::{AccessToken, AuthCode, ClientId, DeviceId, RedirectUri};
use scantune::http::server::CallbackServer;
use scantune::playback::{Error as PlaybackError, PlaybackSession, PlayerSettings};
use scantune::provider::devices::RemoteDeviceSdk;
use scantune::provider::{Endpoints, ProviderApi, ProviderClient};

#[derive(Debug, Clone)]
struct Seen {
    method: &'static str,
    query: HashMap<String, String>,
    authorization: Option<String>,
    form: HashMap<String, String>,
    json: serde_json::Value,
}

type Log = Arc<Mutex<Vec<Seen>>>;

/// A stand-in provider: token endpoint under `/api/token`, web API under `/v1`.
/// Code `bad` is rejected, as is any bearer other than `good`, and device
/// `restricted` refuses playback.
async fn fake_provider() -> (Endpoints, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let token_log = log.clone();
    let token = warp::post()
        .and(warp::path!("api" / "token"))
        .and(warp::body::form::<HashMap<String, String>>())
        .map(move |form: HashMap<String, String>| {
            let rejected = form.get("code").map(String::as_str) == Some("bad");
            token_log.lock().unwrap().push(Seen {
                method: "POST",
                query: HashMap::new(),
                authorization: None,
                form,
                json: serde_json::Value::Null,
            });
            if rejected {
                warp::reply::with_status(
                    warp::reply::json(&serde_json::json!({ "error": "invalid_grant" })),
                    StatusCode::BAD_REQUEST,
                )
            } else {
                warp::reply::with_status(
                    warp::reply::json(&serde_json::json!({
                        "access_token": "good",
                        "token_type": "Bearer",
                        "expires_in": 3600,
                        "scope": "streaming user-modify-playback-state",
                    })),
                    StatusCode::OK,
                )
            }
        });

    let play_log = log.clone();
    let play = warp::put()
        .and(warp::path!("v1" / "me" / "player" / "play"))
        .and(warp::query::<HashMap<String, String>>())
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::body::json::<serde_json::Value>())
        .map(move |query: HashMap<String, String>, authorization: Option<String>, json: serde_json::Value| {
            let status = if query.get("device_id").map(String::as_str) == Some("restricted") {
                StatusCode::FORBIDDEN
            } else {
                StatusCode::NO_CONTENT
            };
            play_log.lock().unwrap().push(Seen {
                method: "PUT",
                query,
                authorization,
                form: HashMap::new(),
                json,
            });
            warp::reply::with_status(warp::reply(), status)
        });

    let devices = warp::get()
        .and(warp::path!("v1" / "me" / "player" / "devices"))
        .and(warp::header::optional::<String>("authorization"))
        .map(|authorization: Option<String>| {
            if authorization.as_deref() != Some("Bearer good") {
                return warp::reply::with_status(
                    warp::reply::json(&serde_json::json!({ "error": { "status": 401 } })),
                    StatusCode::UNAUTHORIZED,
                );
            }
            warp::reply::with_status(
                warp::reply::json(&serde_json::json!({
                    "devices": [
                        { "id": "phone-1", "name": "Phone", "is_active": true, "is_restricted": false },
                        { "id": "kitchen-1", "name": "Kitchen", "is_active": false, "is_restricted": false },
                        { "id": null, "name": "Ghost", "is_active": false, "is_restricted": false }
                    ]
                })),
                StatusCode::OK,
            )
        });

    let (addr, server) = warp::serve(token.or(play).or(devices)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    (endpoints(addr), log)
}

fn endpoints(addr: SocketAddr) -> Endpoints {
    Endpoints {
        authorize: Url::parse(&format!("http://{}/authorize", addr)).unwrap(),
        token: Url::parse(&format!("http://{}/api/token", addr)).unwrap(),
        api: Url::parse(&format!("http://{}/v1", addr)).unwrap(),
    }
}

fn token_request(code: &str) -> TokenRequest {
    TokenRequest::authorization_code(
        AuthCode(code.to_string()),
        RedirectUri("http://127.0.0.1:8888/callback".to_string()),
        ClientId("client-1".to_string()),
        Verifier::from_persisted("v123".to_string()),
    )
}

fn track(id: &str) -> TrackRef {
    TrackRef::new(&Provider::spotify(), id).unwrap()
}

#[tokio::test]
async fn exchanges_code_as_a_form_post() {
    let (endpoints, log) = fake_provider().await;
    let client = ProviderClient::new(endpoints);

    let response = client.exchange_code(&token_request("abc")).await.unwrap();

    assert_eq!(response.access_token, AccessToken("good".to_string()));
    assert_eq!(response.expires_in, Some(3600));
    assert!(response.scope.unwrap().contains("streaming"));

    let seen = log.lock().unwrap()[0].clone();
    assert_eq!(seen.form["grant_type"], "authorization_code");
    assert_eq!(seen.form["code"], "abc");
    assert_eq!(seen.form["redirect_uri"], "http://127.0.0.1:8888/callback");
    assert_eq!(seen.form["client_id"], "client-1");
    assert_eq!(seen.form["code_verifier"], "v123");
}

#[tokio::test]
async fn rejected_exchange_reports_the_status() {
    let (endpoints, _log) = fake_provider().await;
    let client = ProviderClient::new(endpoints);

    let err = client.exchange_code(&token_request("bad")).await.unwrap_err();

    assert_eq!(err.status(), Some(400));
    let auth_err = scantune::auth::Error::from(err);
    assert_eq!(auth_err.exchange_status(), Some(400));
}

#[tokio::test]
async fn play_puts_the_track_uri_with_a_bearer_token() {
    let (endpoints, log) = fake_provider().await;
    let client = ProviderClient::new(endpoints);

    client
        .play(&AccessToken("good".to_string()), &DeviceId("kitchen-1".to_string()), &track("xyz"))
        .await
        .unwrap();

    let seen = log.lock().unwrap()[0].clone();
    assert_eq!(seen.method, "PUT");
    assert_eq!(seen.query["device_id"], "kitchen-1");
    assert_eq!(seen.authorization.as_deref(), Some("Bearer good"));
    assert_eq!(seen.json, serde_json::json!({ "uris": ["spotify:track:xyz"] }));
}

#[tokio::test]
async fn forbidden_play_is_an_error() {
    let (endpoints, _log) = fake_provider().await;
    let client = ProviderClient::new(endpoints);

    let err = client
        .play(&AccessToken("good".to_string()), &DeviceId("restricted".to_string()), &track("xyz"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(403));
}

#[tokio::test]
async fn lists_devices() {
    let (endpoints, _log) = fake_provider().await;
    let client = ProviderClient::new(endpoints);

    let devices = client.devices(&AccessToken("good".to_string())).await.unwrap();

    assert_eq!(devices.len(), 3);
    assert_eq!(devices[0].id, Some(DeviceId("phone-1".to_string())));
    assert!(devices[0].is_active);
    assert_eq!(devices[2].id, None);
}

#[tokio::test]
async fn remote_device_player_connects_and_plays() {
    let (endpoints, log) = fake_provider().await;
    let client = Arc::new(ProviderClient::new(endpoints));
    let playback = PlaybackSession::new(
        Arc::new(RemoteDeviceSdk::new(client.clone())),
        client,
        PlayerSettings {
            name: "kitchen".to_string(),
            volume: 0.5,
        },
    );

    let device = playback.connect(AccessToken("good".to_string())).await.unwrap();
    assert_eq!(device, DeviceId("kitchen-1".to_string()));

    playback.play(&track("abc")).await.unwrap();

    let seen = log.lock().unwrap().last().cloned().unwrap();
    assert_eq!(seen.query["device_id"], "kitchen-1");
    assert_eq!(seen.json["uris"][0], "spotify:track:abc");
}

#[tokio::test]
async fn remote_device_player_rejects_a_bad_token() {
    let (endpoints, _log) = fake_provider().await;
    let client = Arc::new(ProviderClient::new(endpoints));
    let playback = PlaybackSession::new(
        Arc::new(RemoteDeviceSdk::new(client.clone())),
        client,
        PlayerSettings::default(),
    );

    let err = playback.connect(AccessToken("stale".to_string())).await.unwrap_err();

    assert!(matches!(err, PlaybackError::Initialization(ref reason) if reason.contains("authentication")));
}

#[tokio::test]
async fn callback_server_hands_back_the_location() {
    let redirect = Url::parse("http://127.0.0.1:0/callback").unwrap();
    let server = CallbackServer::bind(&redirect).await.unwrap();
    let addr = server.local_addr();
    assert_ne!(addr.port(), 0);

    let http = reqwest::Client::new();
    let stray = http.get(format!("http://{}/favicon.ico", addr)).send().await.unwrap();
    assert_eq!(stray.status().as_u16(), 404);

    let hit = http
        .get(format!("http://{}/callback?code=abc&state=xyz", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(hit.status().as_u16(), 200);

    let location = server.wait().await.unwrap();
    assert_eq!(location.path(), "/callback");
    assert_eq!(location.query(), Some("code=abc&state=xyz"));
}
