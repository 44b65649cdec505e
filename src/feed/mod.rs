//! Course feed: query result → validators → `200`/`304` response.

pub mod atom;
pub mod conditional;
pub mod http_date;

use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, LAST_MODIFIED};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};

use crate::config;
use crate::error::RequestError;
use crate::model::FeedRow;
use conditional::{Outcome, Preconditions};

/// Maximum entries per feed document.
pub const FEED_LIMIT: u32 = 50;

pub const ATOM_CONTENT_TYPE: &str = "application/atom+xml";

/// Turn query rows into the HTTP response for the given request validators.
pub fn respond(
    feed: &config::Feed,
    pre: &Preconditions,
    rows: &[FeedRow],
    now: DateTime<Utc>,
) -> Result<Response, RequestError> {
    let cache_control = format!("max-age={}", feed.cache_max_age_secs);

    let response = match conditional::decide(pre, rows, now) {
        Outcome::NotModifiedSince { last_modified } => (
            StatusCode::NOT_MODIFIED,
            [(LAST_MODIFIED, last_modified), (CACHE_CONTROL, cache_control)],
        )
            .into_response(),
        Outcome::NotModified(validators) => (
            StatusCode::NOT_MODIFIED,
            [
                (ETAG, validators.etag_header()),
                (LAST_MODIFIED, validators.last_modified_header()),
                (CACHE_CONTROL, cache_control),
            ],
        )
            .into_response(),
        Outcome::Full(validators) => {
            let body = atom::render(feed, rows, validators.last_modified)?;
            (
                StatusCode::OK,
                [
                    (CONTENT_TYPE, ATOM_CONTENT_TYPE.to_string()),
                    (ETAG, validators.etag_header()),
                    (LAST_MODIFIED, validators.last_modified_header()),
                    (CACHE_CONTROL, cache_control),
                ],
                body,
            )
                .into_response()
        }
    };
    Ok(response)
}
