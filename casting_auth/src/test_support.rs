use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use once_cell::sync::Lazy;

use crate::{
    clock::UnixTime,
    jwa::Algorithm,
    jwk::{Jwk, Jwks, PrivateKey},
    jwt::{Headers, Jwt},
};

pub(crate) const NOW: UnixTime = UnixTime(1_700_000_000);
pub(crate) const ISSUER: &str = "https://provider/";
pub(crate) const AUDIENCE: &str = "aud1";

pub(crate) static K1: Lazy<PrivateKey> =
    Lazy::new(|| PrivateKey::generate().expect("RSA key generation"));
pub(crate) static K2: Lazy<PrivateKey> =
    Lazy::new(|| PrivateKey::generate().expect("RSA key generation"));

pub(crate) fn jwks_with(keys: &[(&str, &PrivateKey)]) -> Jwks {
    keys.iter()
        .map(|(kid, key)| Jwk::from_public_key(*kid, key.public_key()))
        .collect()
}

pub(crate) fn sign(kid: &str, key: &PrivateKey, payload: serde_json::Value) -> Jwt {
    Jwt::try_from_parts_with_signature(
        &Headers::new(Algorithm::RS256).with_key_id(kid),
        &payload,
        key,
    )
    .expect("token signing")
}

pub(crate) fn valid_payload() -> serde_json::Value {
    serde_json::json!({
        "sub": "auth0|casting-director",
        "aud": AUDIENCE,
        "iss": ISSUER,
        "iat": NOW.0,
        "exp": NOW.0 + 3600,
        "permissions": ["get:movies"],
    })
}

#[derive(Debug)]
pub(crate) struct JwksServer {
    pub(crate) addr: SocketAddr,
    state: Arc<ServerState>,
}

#[derive(Debug)]
struct ServerState {
    hits: AtomicUsize,
    failures_remaining: AtomicUsize,
    body: String,
}

const ETAG: &str = "\"v1\"";

impl JwksServer {
    pub(crate) async fn start(jwks: &Jwks) -> Self {
        Self::start_raw(serde_json::to_string(jwks).expect("serializable key set"), 0).await
    }

    pub(crate) async fn start_raw(body: String, failures: usize) -> Self {
        let state = Arc::new(ServerState {
            hits: AtomicUsize::new(0),
            failures_remaining: AtomicUsize::new(failures),
            body,
        });

        let app = Router::new()
            .route("/.well-known/jwks.json", get(serve_jwks))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local address");
        tokio::spawn(async move { axum::serve(listener, app).await });

        Self { addr, state }
    }

    pub(crate) fn url(&self) -> String {
        format!("http://{}/.well-known/jwks.json", self.addr)
    }

    pub(crate) fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }
}

async fn serve_jwks(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let failing = state
        .failures_remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    if headers.get(header::IF_NONE_MATCH) == Some(&HeaderValue::from_static(ETAG)) {
        return StatusCode::NOT_MODIFIED.into_response();
    }

    let body: serde_json::Value = match serde_json::from_str(&state.body) {
        Ok(body) => body,
        Err(_) => return (StatusCode::OK, state.body.clone()).into_response(),
    };

    ([(header::ETAG, ETAG)], Json(body)).into_response()
}
