//! Conditional GET for the course feed.
//!
//! Validators are derived from the query result: the ETag hashes the course
//! ids in feed order and `Last-Modified` is the newest publication time.
use axum::http::header::{IF_MODIFIED_SINCE, IF_NONE_MATCH};
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::http_date;
use crate::model::FeedRow;

/// A parsed `If-Modified-Since` together with the value the client sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifiedSince {
    pub raw: String,
    pub at: DateTime<Utc>,
}

/// Request validators. A malformed `If-Modified-Since` is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preconditions {
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<ModifiedSince>,
}

impl Preconditions {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let if_none_match = headers
            .get(IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let if_modified_since = headers
            .get(IF_MODIFIED_SINCE)
            .and_then(|v| v.to_str().ok())
            .and_then(|raw| match http_date::parse(raw) {
                Some(at) => Some(ModifiedSince {
                    raw: raw.to_string(),
                    at,
                }),
                None => {
                    debug!(value = raw, "ignoring malformed If-Modified-Since");
                    None
                }
            });

        Self {
            if_none_match,
            if_modified_since,
        }
    }

    /// Freshness cutoff for the feed query.
    pub fn cutoff(&self) -> Option<DateTime<Utc>> {
        self.if_modified_since.as_ref().map(|ims| ims.at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validators {
    /// Bare hex digest; quoted when written to a header.
    pub etag: String,
    pub last_modified: DateTime<Utc>,
}

impl Validators {
    pub fn etag_header(&self) -> String {
        format!("\"{}\"", self.etag)
    }

    pub fn last_modified_header(&self) -> String {
        http_date::format(self.last_modified)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing newer than `If-Modified-Since`; echo the client's value.
    NotModifiedSince { last_modified: String },
    /// The ETag matched `If-None-Match`.
    NotModified(Validators),
    /// Serve the full document.
    Full(Validators),
}

/// Hash ids in order and take `Last-Modified` from the first (newest) row,
/// falling back to `now` for an empty feed.
pub fn compute_validators(rows: &[FeedRow], now: DateTime<Utc>) -> Validators {
    let mut hasher = md5::Context::new();
    let mut last_modified = None;
    for row in rows {
        hasher.consume(row.id.as_bytes());
        if last_modified.is_none() {
            last_modified = Some(row.published_at);
        }
    }
    Validators {
        etag: format!("{:x}", hasher.compute()),
        last_modified: last_modified.unwrap_or(now),
    }
}

/// Weak comparison of an `If-None-Match` value against the current ETag.
/// Accepts quoted or bare tags, `W/` prefixes, lists and `*`.
pub fn etag_matches(if_none_match: &str, etag: &str, has_entries: bool) -> bool {
    if_none_match.split(',').map(str::trim).any(|candidate| {
        if candidate == "*" {
            return has_entries;
        }
        let candidate = candidate.strip_prefix("W/").unwrap_or(candidate);
        candidate.trim_matches('"') == etag
    })
}

pub fn decide(pre: &Preconditions, rows: &[FeedRow], now: DateTime<Utc>) -> Outcome {
    if let Some(ims) = &pre.if_modified_since {
        if rows.is_empty() {
            debug!(since = %ims.raw, "no courses newer than If-Modified-Since");
            return Outcome::NotModifiedSince {
                last_modified: ims.raw.clone(),
            };
        }
    }

    let validators = compute_validators(rows, now);
    match pre.if_none_match.as_deref() {
        Some(inm) if etag_matches(inm, &validators.etag, !rows.is_empty()) => {
            debug!(etag = %validators.etag, "If-None-Match matched");
            Outcome::NotModified(validators)
        }
        _ => Outcome::Full(validators),
    }
}
