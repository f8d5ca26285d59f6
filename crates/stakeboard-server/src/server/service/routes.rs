//! HTTP routes.
//!
//! | Route | Response |
//! |---|---|
//! | `GET /{customer_id}/session` | the session token |
//! | `POST /{offer_id}/stake?sessionkey=TOKEN`, body = stake | empty |
//! | `GET /{offer_id}/highstakes` | `text/csv`, `customer=stake,...` |
//!
//! Ids are path segments made of digits; any other segment answers `404` like
//! an unknown path. A known path with the wrong method answers `405`.

use super::handler::StakeHandler;
use crate::server::{
    error::{ApiError, Result},
    telemetry::{increment_request_errors, increment_requests, record_request_duration},
};
use axum::{
    Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use stakeboard::{CustomerId, OfferId, Stake};
use std::time::Instant;
use tower_http::trace::TraceLayer;

pub fn router(handler: StakeHandler) -> Router {
    // Every route captures the same segment name; the router rejects
    // differently named captures at one position.
    Router::new()
        .route("/{id}/session", get(session))
        .route("/{id}/stake", post(stake))
        .route("/{id}/highstakes", get(high_stakes))
        .layer(TraceLayer::new_for_http())
        .with_state(handler)
}

#[derive(Debug, Deserialize)]
struct StakeQuery {
    sessionkey: Option<String>,
}

/// Accepts the id segment only if it is all digits.
fn path_id(raw: &str) -> Result<&str> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::NotFound);
    }
    Ok(raw)
}

/// Parses a digit-only segment; fails only on overflow.
fn parse_id(digits: &str, reason: &'static str) -> Result<u32> {
    digits.parse().map_err(|_| ApiError::BadRequest { reason })
}

/// Parses the first line of the body as a positive stake.
fn parse_stake(body: &str) -> Result<Stake> {
    let line = body.lines().next().unwrap_or_default();
    match line.parse::<Stake>() {
        Ok(stake) if stake > 0 => Ok(stake),
        Ok(_) => Err(ApiError::BadRequest {
            reason: "stake must be positive",
        }),
        Err(_) => Err(ApiError::BadRequest {
            reason: "stake not integer",
        }),
    }
}

fn observe<T>(route: &'static str, start: Instant, result: &Result<T>) {
    increment_requests(route);
    if result.is_err() {
        increment_request_errors(route);
    }
    record_request_duration(route, start.elapsed().as_secs_f64() * 1_000.0);
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip(handler)))]
async fn session(State(handler): State<StakeHandler>, Path(id): Path<String>) -> Result<String> {
    let start = Instant::now();
    let result = async {
        let customer_id: CustomerId = parse_id(path_id(&id)?, "customerId not integer")?;
        let token = handler.session(customer_id).await?;
        Ok::<_, ApiError>(token.to_string())
    }
    .await;
    observe("session", start, &result);
    result
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip(handler, query, body)))]
async fn stake(
    State(handler): State<StakeHandler>,
    Path(id): Path<String>,
    Query(query): Query<StakeQuery>,
    body: String,
) -> Result<StatusCode> {
    let start = Instant::now();
    let result = async {
        let digits = path_id(&id)?;
        // The session is checked before the body is looked at.
        let token = query.sessionkey.ok_or(ApiError::Unauthorized)?;
        let customer_id = handler.authenticate(token).await?;
        let stake = parse_stake(&body)?;
        let offer_id: OfferId = parse_id(digits, "betOfferId not integer")?;
        let _changed = handler.stake(offer_id, customer_id, stake).await?;

        #[cfg(feature = "tracing")]
        tracing::debug!(offer_id, customer_id, stake, changed = _changed, "stake accepted");

        Ok::<_, ApiError>(StatusCode::OK)
    }
    .await;
    observe("stake", start, &result);
    result
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip(handler)))]
async fn high_stakes(
    State(handler): State<StakeHandler>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let start = Instant::now();
    let result = async {
        let offer_id: OfferId = parse_id(path_id(&id)?, "betOfferId not integer")?;
        handler.high_stakes(offer_id).await
    }
    .await;
    observe("highstakes", start, &result);
    result.map(|csv| ([(header::CONTENT_TYPE, "text/csv")], csv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::config::{CliArgs, ServerConfig};
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request},
    };
    use clap::Parser;
    use stakeboard::BettingService;
    use tower::ServiceExt;

    fn app() -> (Router, BettingService) {
        let args = CliArgs::parse_from(["stakeboard-server", "--num-workers", "2"]);
        let config = ServerConfig::try_from(args).unwrap();
        let service = BettingService::default();
        let handler = StakeHandler::new(service.clone(), &config);
        (router(handler), service)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body.to_owned()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn login(app: &Router, customer_id: u32) -> String {
        let (status, token) = send(app, Method::GET, &format!("/{customer_id}/session"), "").await;
        assert_eq!(status, StatusCode::OK);
        token
    }

    #[tokio::test]
    async fn session_is_stable_for_a_customer() {
        let (app, service) = app();
        let first = login(&app, 1234).await;
        let second = login(&app, 1234).await;

        assert_eq!(first.len(), 8);
        assert_eq!(first, second);
        assert_eq!(service.validate_session(&first), Some(1234));
    }

    #[tokio::test]
    async fn stake_then_high_stakes() {
        let (app, _service) = app();
        let alice = login(&app, 1).await;
        let bob = login(&app, 2).await;

        for (token, stake) in [(&alice, "500"), (&bob, "900"), (&alice, "300")] {
            let uri = format!("/888/stake?sessionkey={token}");
            let (status, body) = send(&app, Method::POST, &uri, stake).await;
            assert_eq!(status, StatusCode::OK);
            assert!(body.is_empty());
        }

        let request = Request::builder()
            .uri("/888/highstakes")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"2=900,1=500");
    }

    #[tokio::test]
    async fn unknown_offer_has_empty_high_stakes() {
        let (app, _service) = app();
        let (status, body) = send(&app, Method::GET, "/404/highstakes", "").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn stake_without_a_valid_session_is_unauthorized() {
        let (app, service) = app();
        let (status, _) = send(&app, Method::POST, "/1/stake", "100").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, Method::POST, "/1/stake?sessionkey=22222222", "100").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, Method::POST, "/1/stake?sessionkey=bogus", "100").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        assert!(service.top_stakes(1).is_empty());
    }

    #[tokio::test]
    async fn session_is_checked_before_the_stake_body() {
        let (app, _service) = app();
        let (status, _) = send(&app, Method::POST, "/1/stake?sessionkey=bogus", "lots").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, Method::POST, "/1/stake", "-5").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_numbers_are_bad_requests() {
        let (app, _service) = app();
        let token = login(&app, 7).await;

        let (status, body) = send(&app, Method::GET, "/99999999999/session", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "customerId not integer");

        let uri = format!("/1/stake?sessionkey={token}");
        let (status, body) = send(&app, Method::POST, &uri, "lots").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "stake not integer");

        let (status, _) = send(&app, Method::POST, &uri, "-5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = format!("/99999999999/stake?sessionkey={token}");
        let (status, body) = send(&app, Method::POST, &uri, "10").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "betOfferId not integer");

        let (status, _) = send(&app, Method::GET, "/99999999999/highstakes", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_numeric_ids_are_not_found() {
        let (app, _service) = app();
        let token = login(&app, 7).await;

        let (status, _) = send(&app, Method::GET, "/abc/session", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let uri = format!("/offer/stake?sessionkey={token}");
        let (status, _) = send(&app, Method::POST, &uri, "10").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::GET, "/-1/highstakes", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_paths_and_methods() {
        let (app, _service) = app();
        let (status, _) = send(&app, Method::GET, "/1/unknown", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::GET, "/1/stake", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn shutdown_refuses_new_requests() {
        let args = CliArgs::parse_from(["stakeboard-server", "--num-workers", "1"]);
        let config = ServerConfig::try_from(args).unwrap();
        let handler = StakeHandler::new(BettingService::default(), &config);
        let app = router(handler.clone());

        handler.shutdown().await;
        let (status, _) = send(&app, Method::GET, "/1/session", "").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
