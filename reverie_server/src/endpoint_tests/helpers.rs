use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test,
    test::TestRequest,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use reverie_common::Secret;
use reverie_engine::{
    db_types::Role,
    events::EventProducers,
    test_utils::prepare_env::fresh_database,
    EngineConfig,
    PseudonymScheme,
    SqliteDatabase,
};
use serde_json::Value;

use crate::{
    auth::{JwtClaims, TokenVerifier},
    config::AuthConfig,
    server::AppState,
};

const TEST_SECRET: &str = "endpoint test secret. DO NOT re-use this anywhere";

pub fn auth_config() -> AuthConfig {
    AuthConfig { jwt_secret: Secret::new(TEST_SECRET.to_string()), jwt_issuer: "reverie".into() }
}

pub fn issue_token(email: &str, role: Role) -> String {
    issue_token_with_secret(email, role, TEST_SECRET)
}

pub fn issue_token_with_secret(email: &str, role: Role, secret: &str) -> String {
    let name = email.split('@').next().unwrap_or(email).to_string();
    let claims = JwtClaims {
        sub: email.to_string(),
        name,
        role,
        exp: (Utc::now() + Duration::hours(1)).timestamp(),
        iss: "reverie".into(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).expect("Failed to sign token")
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

/// App state over a fresh database, with no event hooks attached.
pub async fn test_state() -> AppState<SqliteDatabase> {
    let db = fresh_database().await;
    state_for(db, EventProducers::default())
}

pub fn state_for(db: SqliteDatabase, producers: EventProducers) -> AppState<SqliteDatabase> {
    AppState {
        db,
        pseudonyms: PseudonymScheme::new([42u8; 32], [7u8; 12]),
        producers,
        engine: EngineConfig::default(),
        verifier: TokenVerifier::new(&auth_config()),
    }
}

/// Sends `req` with the given caller's token and returns the status and body.
pub async fn call_as<S, B>(app: &S, req: TestRequest, email: &str, role: Role) -> (StatusCode, String)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    send(app, req.insert_header(bearer(&issue_token(email, role)))).await
}

pub async fn send<S, B>(app: &S, req: TestRequest) -> (StatusCode, String)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let res = test::call_service(app, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}

pub fn json_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response was not JSON ({e}): {body}"))
}
