//! Page-by-page catalog synchronization.
//!
//! Each page is committed in its own transaction, so a failed run leaves every
//! earlier page durable. All writes are insert-if-absent, which makes rerunning
//! from the first page safe.
use chrono::Utc;
use std::collections::HashSet;
use tracing::{info, instrument, warn};

use crate::config::{Config, ConfigError};
use crate::db::{self, PageCounts, Pool};
use crate::error::SyncError;
use crate::linkedin::model::{CatalogPage, LearningAsset};
use crate::linkedin::{self, CatalogSource, LearningClient, TokenProvider, PAGE_SIZE};
use crate::model::{Course, PageBatch, Relation, Subject};
use crate::slug::slugify;

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub pages: usize,
    pub elements: usize,
    pub inserted: PageCounts,
    /// True when a full page arrived without a `next` link.
    pub truncated: bool,
}

/// Drop the query string (tracking parameters) from a public course URL.
pub fn strip_tracking(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

fn course_from(asset: &LearningAsset) -> Course {
    let details = &asset.details;
    Course {
        id: asset.urn.clone(),
        title: asset.title.value.clone(),
        description: details.description.value.clone(),
        url: strip_tracking(&details.urls.web_launch).to_string(),
        thumbnail: details.images.primary.clone(),
        language: details.available_locales.first().map(|l| l.language.clone()),
        published_at: details.published_at,
    }
}

fn subject(id: &str, name: &str) -> Subject {
    Subject {
        id: id.to_string(),
        name: name.to_string(),
        slug: slugify(name),
    }
}

/// Shape one upstream page into store rows. Entities and relations appear at
/// most once per page.
pub fn transform_page(page: &CatalogPage) -> PageBatch {
    let mut batch = PageBatch::default();
    let mut seen_courses = HashSet::new();
    let mut seen_authors = HashSet::new();
    let mut seen_skills = HashSet::new();
    let mut seen_course_authors = HashSet::new();
    let mut seen_course_skills = HashSet::new();

    for asset in &page.elements {
        if !seen_courses.insert(asset.urn.as_str()) {
            continue;
        }
        batch.courses.push(course_from(asset));

        for author in asset.details.contributors.iter().filter(|c| c.is_author()) {
            if seen_authors.insert(author.urn.as_str()) {
                batch.authors.push(subject(&author.urn, &author.name.value));
            }
            let rel = Relation {
                course_id: asset.urn.clone(),
                subject_id: author.urn.clone(),
            };
            if seen_course_authors.insert(rel.clone()) {
                batch.course_authors.push(rel);
            }
        }

        for skill in asset
            .details
            .classifications
            .iter()
            .map(|c| &c.associated_classification)
            .filter(|c| c.is_skill())
        {
            if seen_skills.insert(skill.urn.as_str()) {
                batch.skills.push(subject(&skill.urn, &skill.name.value));
            }
            let rel = Relation {
                course_id: asset.urn.clone(),
                subject_id: skill.urn.clone(),
            };
            if seen_course_skills.insert(rel.clone()) {
                batch.course_skills.push(rel);
            }
        }
    }
    batch
}

/// Walk the whole collection, committing after every page, then record the
/// high-water mark. Any error aborts the run; the mark is only written on a
/// clean finish.
#[instrument(skip_all)]
pub async fn run_sync(pool: &Pool, source: &dyn CatalogSource) -> Result<SyncReport, SyncError> {
    let mut report = SyncReport::default();
    let mut url = source.first_page_url();

    loop {
        info!(%url, "getting course data");
        let page = source.fetch_page(&url).await?;
        let batch = transform_page(&page);
        let counts = db::persist_page(pool, &batch).await?;

        report.pages += 1;
        report.elements += page.elements.len();
        report.inserted += counts;
        info!(
            page = report.pages,
            elements = page.elements.len(),
            new_courses = counts.courses,
            new_authors = counts.authors,
            new_skills = counts.skills,
            "page committed"
        );

        if page.elements.len() < PAGE_SIZE {
            break;
        }
        match page.next_href() {
            Some(href) => url = source.resolve_next(href)?,
            None => {
                warn!(page = report.pages, "full page without a next link; stopping");
                report.truncated = true;
                break;
            }
        }
    }

    db::record_sync(pool, Utc::now()).await?;
    Ok(report)
}

/// One complete loader run against the configured upstream and store.
///
/// Configuration problems surface before any network call, and the store is
/// only opened once a token has been granted.
#[instrument(skip_all)]
pub async fn load(cfg: &Config) -> Result<SyncReport, SyncError> {
    let db_path = cfg
        .db_path()
        .ok_or(ConfigError::Invalid("DB_PATH must be set"))?
        .to_string();
    let api_base = cfg.api_base()?;
    let token_url = cfg.token_url()?;

    let http = linkedin::http_client()
        .map_err(|err| SyncError::Upstream(format!("failed to build HTTP client: {err}")))?;
    let token = TokenProvider::new(http.clone(), token_url)
        .acquire(&cfg.linkedin.client_id, &cfg.linkedin.client_secret)
        .await?;

    let pool = db::init_writer(&db_path).await?;
    db::run_migrations(&pool).await?;
    match db::last_sync_time(&pool).await? {
        Some(at) => info!(%at, "previous sync"),
        None => info!("no previous sync recorded"),
    }

    let client = LearningClient::new(http, api_base, token);
    let report = run_sync(&pool, &client).await?;

    let totals = db::table_counts(&pool).await?;
    info!(
        pages = report.pages,
        elements = report.elements,
        new_courses = report.inserted.courses,
        truncated = report.truncated,
        courses = totals.courses,
        authors = totals.authors,
        skills = totals.skills,
        "catalog sync finished"
    );
    pool.close().await;
    Ok(report)
}
