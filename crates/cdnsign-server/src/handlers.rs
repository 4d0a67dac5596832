use crate::cookies;
use crate::error::ServerError;
use crate::state::AppState;
use anyhow::Context;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use cdnsign_core::{DeliveryPayload, RawSigningRequest};
use serde_json::json;

pub async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "service": "cdnsign-server" }))
}

/// `POST /sign`: issue a signed URL or a signed cookie set.
pub async fn sign(
    State(state): State<AppState>,
    payload: Result<Json<RawSigningRequest>, JsonRejection>,
) -> Result<Response, ServerError> {
    let Json(raw) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;

    let payload = state.engine.handle(&raw)?;
    let mode = payload.mode();

    match payload {
        DeliveryPayload::Query(query) => Ok(Json(json!({
            "status": "success",
            "mode": mode,
            "data": { "signed_url": query.signed_url() },
        }))
        .into_response()),
        DeliveryPayload::Cookies(cookie_set) => {
            let mut headers = HeaderMap::new();
            for cookie in cookies::set_cookie_headers(&cookie_set, state.cookie_domain.as_deref()) {
                let value = HeaderValue::from_str(&cookie)
                    .context("signed cookie is not a valid header value")?;
                headers.append(SET_COOKIE, value);
            }

            Ok((
                headers,
                Json(json!({
                    "status": "success",
                    "mode": mode,
                    "message": "Cookies set successfully",
                })),
            )
                .into_response())
        }
    }
}
