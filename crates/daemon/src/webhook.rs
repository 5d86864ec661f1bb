// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signed webhook intake, one endpoint per dialect.
//!
//! Both endpoints read the full body before anything else, verify the
//! delivery against the configured secret in constant time, then hand
//! the payload to the normalizer and the router. Status mapping: bad
//! signature 401, malformed or unhandled payload 400, full queue 503,
//! other pipeline failures 500.

use crate::normalize::{normalize_github, normalize_gitlab, NormalizeError};
use crate::server::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use constant_time_eq::constant_time_eq;
use familiar_core::Event;
use familiar_engine::{EnqueueError, HandleError, RouteError, RouteOutcome};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// `X-Hub-Signature-256: sha256=<hex>` must be the HMAC-SHA256 of the
/// body under the shared secret. Comparison is constant time.
pub fn verify_github_signature(secret: &str, header: Option<&str>, body: &[u8]) -> bool {
    let Some(header) = header else {
        return false;
    };
    let Some(hex_digest) = header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(provided) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let expected = mac.finalize().into_bytes();
    constant_time_eq(&expected, &provided)
}

/// `X-Gitlab-Token` must equal the configured secret, compared in
/// constant time.
pub fn verify_gitlab_token(secret: &str, header: Option<&str>) -> bool {
    match header {
        Some(token) => constant_time_eq(token.as_bytes(), secret.as_bytes()),
        None => false,
    }
}

pub async fn github_webhook(
    State(state): State<std::sync::Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.metrics.webhook_received();

    let Some(provider_cfg) = &state.config.providers.github else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let signature = header_str(&headers, "X-Hub-Signature-256");
    if !verify_github_signature(&provider_cfg.webhook_secret, signature, &body) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let event_type = header_str(&headers, "X-GitHub-Event").unwrap_or_default();
    let event = match normalize_github(event_type, &body, &state.config.agents.bot_username) {
        Ok(event) => event,
        Err(err) => return normalize_rejection(err),
    };
    dispatch(&state, event).await
}

pub async fn gitlab_webhook(
    State(state): State<std::sync::Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.metrics.webhook_received();

    let Some(provider_cfg) = &state.config.providers.gitlab else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let token = header_str(&headers, "X-Gitlab-Token");
    if !verify_gitlab_token(&provider_cfg.webhook_secret, token) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let event = match normalize_gitlab(&body, &state.config.agents.bot_username) {
        Ok(event) => event,
        Err(err) => return normalize_rejection(err),
    };
    dispatch(&state, event).await
}

async fn dispatch(state: &AppState, event: Event) -> Response {
    match state.router.route(&event).await {
        Ok(outcome) => {
            state.metrics.webhook_processed();
            if outcome != RouteOutcome::Dispatched {
                tracing::debug!(?outcome, key = %event.dedupe_key(), "event filtered");
            }
            StatusCode::OK.into_response()
        }
        Err(RouteError::Handler(HandleError::Enqueue(EnqueueError::QueueFull))) => {
            // the sender redelivers; admission pressure is transient
            tracing::warn!(key = %event.dedupe_key(), "spawn queue full, asking sender to retry");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, key = %event.dedupe_key(), "event pipeline failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn normalize_rejection(err: NormalizeError) -> Response {
    let body = match &err {
        NormalizeError::NotHandled(_) => format!("not handled: {}", err),
        NormalizeError::Malformed(_) => err.to_string(),
    };
    tracing::debug!(error = %err, "webhook payload rejected");
    (StatusCode::BAD_REQUEST, body).into_response()
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod tests;
