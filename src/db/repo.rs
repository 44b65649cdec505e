use super::model::{PageCounts, TableCounts};
use crate::error::RequestError;
use crate::model::{Course, FeedRow, PageBatch, Relation, Subject};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions,
    SqliteSynchronous,
};
use sqlx::{ConnectOptions, Executor, Row, Sqlite, SqlitePool, Transaction};
use std::path::PathBuf;
use std::time::Duration;
use tracing::instrument;

pub type Pool = SqlitePool;

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const INSERT_COURSE: &str = "INSERT OR IGNORE INTO course \
    (id, title, description, url, thumbnail, language, published_at) VALUES (?, ?, ?, ?, ?, ?, ?)";
const INSERT_AUTHOR: &str = "INSERT OR IGNORE INTO author (id, name, slug) VALUES (?, ?, ?)";
const INSERT_SKILL: &str = "INSERT OR IGNORE INTO skill (id, name, slug) VALUES (?, ?, ?)";
const INSERT_COURSE_AUTHOR: &str =
    "INSERT OR IGNORE INTO course_author (course_id, author_id) VALUES (?, ?)";
const INSERT_COURSE_SKILL: &str =
    "INSERT OR IGNORE INTO course_skill (course_id, skill_id) VALUES (?, ?)";

/// Newest courses that have at least one author, one output row per
/// (course, author) pair. Authors come back in relation insertion order.
const RECENT_COURSES: &str = r#"
SELECT c.id, c.title, c.description, c.url, c.thumbnail, c.published_at, a.name AS author_name
FROM (
    SELECT id, title, description, url, thumbnail, published_at
    FROM course
    WHERE published_at > ?
      AND EXISTS (
          SELECT 1 FROM course_author ca
          JOIN author a ON a.id = ca.author_id
          WHERE ca.course_id = course.id
      )
    ORDER BY published_at DESC, id ASC
    LIMIT ?
) AS c
JOIN course_author ca ON ca.course_id = c.id
JOIN author a ON a.id = ca.author_id
ORDER BY c.published_at DESC, c.id ASC, ca.rowid ASC
"#;

/// Open the single-connection writer pool used by an ingestion run.
pub async fn init_writer(db_path: &str) -> Result<Pool, sqlx::Error> {
    let path = prepare_db_path(db_path);
    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full)
        .busy_timeout(BUSY_TIMEOUT);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
}

/// Open a read-only connection for a single feed request.
pub async fn open_reader(db_path: &str) -> Result<SqliteConnection, sqlx::Error> {
    SqliteConnectOptions::new()
        .filename(expand_home(db_path))
        .read_only(true)
        .busy_timeout(BUSY_TIMEOUT)
        .connect()
        .await
}

/// Expand a leading `~/` against `$HOME`.
fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => match std::env::var("HOME") {
            Ok(home) => PathBuf::from(format!("{}/{}", home.trim_end_matches('/'), rest)),
            Err(_) => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}

/// Expand the path and ensure its parent directory exists.
fn prepare_db_path(path: &str) -> PathBuf {
    let expanded = expand_home(path);
    if let Some(parent) = expanded.parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
    expanded
}

pub async fn run_migrations(pool: &Pool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|err| sqlx::Error::Migrate(Box::new(err)))
}

/// Persist one page in a single transaction. Any failure rolls back the whole
/// page.
#[instrument(skip_all, fields(courses = batch.courses.len()))]
pub async fn persist_page(pool: &Pool, batch: &PageBatch) -> Result<PageCounts, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut counts = PageCounts::default();

    for course in &batch.courses {
        counts.courses += insert_course_tx(&mut tx, course).await?;
    }
    counts.authors = insert_subjects_tx(&mut tx, INSERT_AUTHOR, &batch.authors).await?;
    counts.course_authors =
        insert_relations_tx(&mut tx, INSERT_COURSE_AUTHOR, &batch.course_authors).await?;
    counts.skills = insert_subjects_tx(&mut tx, INSERT_SKILL, &batch.skills).await?;
    counts.course_skills =
        insert_relations_tx(&mut tx, INSERT_COURSE_SKILL, &batch.course_skills).await?;

    tx.commit().await?;
    Ok(counts)
}

async fn insert_course_tx(
    tx: &mut Transaction<'_, Sqlite>,
    course: &Course,
) -> Result<u64, sqlx::Error> {
    let res = sqlx::query(INSERT_COURSE)
        .bind(&course.id)
        .bind(&course.title)
        .bind(&course.description)
        .bind(&course.url)
        .bind(&course.thumbnail)
        .bind(&course.language)
        .bind(course.published_at)
        .execute(&mut **tx)
        .await?;
    Ok(res.rows_affected())
}

async fn insert_subjects_tx(
    tx: &mut Transaction<'_, Sqlite>,
    sql: &'static str,
    subjects: &[Subject],
) -> Result<u64, sqlx::Error> {
    let mut inserted = 0;
    for subject in subjects {
        inserted += sqlx::query(sql)
            .bind(&subject.id)
            .bind(&subject.name)
            .bind(&subject.slug)
            .execute(&mut **tx)
            .await?
            .rows_affected();
    }
    Ok(inserted)
}

async fn insert_relations_tx(
    tx: &mut Transaction<'_, Sqlite>,
    sql: &'static str,
    relations: &[Relation],
) -> Result<u64, sqlx::Error> {
    let mut inserted = 0;
    for rel in relations {
        inserted += sqlx::query(sql)
            .bind(&rel.course_id)
            .bind(&rel.subject_id)
            .execute(&mut **tx)
            .await?
            .rows_affected();
    }
    Ok(inserted)
}

/// Append a high-water mark for a completed run.
#[instrument(skip_all)]
pub async fn record_sync(pool: &Pool, at: DateTime<Utc>) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("INSERT INTO meta (last_sync_time) VALUES (?)")
        .bind(at.timestamp_millis())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// Latest recorded sync, if any run has completed.
#[instrument(skip_all)]
pub async fn last_sync_time<'c, E>(executor: E) -> Result<Option<DateTime<Utc>>, sqlx::Error>
where
    E: Executor<'c, Database = Sqlite>,
{
    let ms: Option<i64> = sqlx::query_scalar("SELECT MAX(last_sync_time) FROM meta")
        .fetch_one(executor)
        .await?;
    Ok(ms.and_then(DateTime::from_timestamp_millis))
}

/// Up to `limit` courses published after `cutoff`, newest first, each with its
/// ordered author names. Courses without authors are skipped.
///
/// `cutoff` has HTTP-date resolution: a course published anywhere inside the
/// cutoff second counts as not newer.
#[instrument(skip(executor))]
pub async fn recent_courses<'c, E>(
    executor: E,
    cutoff: Option<DateTime<Utc>>,
    limit: u32,
) -> Result<Vec<FeedRow>, RequestError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let cutoff_ms = cutoff
        .map(|c| c.timestamp().saturating_mul(1000).saturating_add(999))
        .unwrap_or(i64::MIN);

    let mut stream = sqlx::query(RECENT_COURSES)
        .bind(cutoff_ms)
        .bind(i64::from(limit))
        .fetch(executor);

    let mut rows: Vec<FeedRow> = Vec::new();
    while let Some(row) = stream.try_next().await? {
        let id: String = row.try_get("id")?;
        let author: String = row.try_get("author_name")?;
        if let Some(last) = rows.last_mut().filter(|last| last.id == id) {
            last.authors.push(author);
            continue;
        }
        let published_ms: i64 = row.try_get("published_at")?;
        let published_at = DateTime::from_timestamp_millis(published_ms).ok_or_else(|| {
            RequestError::MalformedRow(format!("{id}: published_at {published_ms} out of range"))
        })?;
        rows.push(FeedRow {
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            url: row.try_get("url")?,
            thumbnail: row.try_get("thumbnail")?,
            published_at,
            authors: vec![author],
            id,
        });
    }
    Ok(rows)
}

#[instrument(skip_all)]
pub async fn table_counts<'c, E>(executor: E) -> Result<TableCounts, sqlx::Error>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as::<_, TableCounts>(
        "SELECT (SELECT COUNT(*) FROM course) AS courses,
                (SELECT COUNT(*) FROM author) AS authors,
                (SELECT COUNT(*) FROM skill) AS skills,
                (SELECT COUNT(*) FROM course_author) AS course_authors,
                (SELECT COUNT(*) FROM course_skill) AS course_skills,
                (SELECT COUNT(*) FROM meta) AS syncs",
    )
    .fetch_one(executor)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup_pool() -> (TempDir, Pool) {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("nested/learning.db");
        let pool = init_writer(path.to_str().unwrap()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        (td, pool)
    }

    fn course(id: &str, published_at: i64) -> Course {
        Course {
            id: id.into(),
            title: format!("Course {id}"),
            description: "About things".into(),
            url: format!("https://www.linkedin.com/learning/{id}"),
            thumbnail: Some("https://media/thumb.jpg".into()),
            language: Some("en".into()),
            published_at,
        }
    }

    fn subject(id: &str, name: &str) -> Subject {
        Subject {
            id: id.into(),
            name: name.into(),
            slug: crate::slug::slugify(name),
        }
    }

    fn rel(course_id: &str, subject_id: &str) -> Relation {
        Relation {
            course_id: course_id.into(),
            subject_id: subject_id.into(),
        }
    }

    fn sample_batch() -> PageBatch {
        PageBatch {
            courses: vec![course("c1", 1_700_000_000_000), course("c2", 1_700_000_500_000)],
            authors: vec![subject("a1", "Ada Lovelace"), subject("a2", "Grace Hopper")],
            skills: vec![subject("s1", "Rust")],
            course_authors: vec![rel("c1", "a1"), rel("c2", "a2"), rel("c2", "a1")],
            course_skills: vec![rel("c1", "s1")],
        }
    }

    #[tokio::test]
    async fn persist_page_is_insert_if_absent() {
        let (_td, pool) = setup_pool().await;
        let first = persist_page(&pool, &sample_batch()).await.unwrap();
        assert_eq!(first.courses, 2);
        assert_eq!(first.course_authors, 3);

        let mut changed = sample_batch();
        changed.courses[0].title = "Renamed".into();
        let second = persist_page(&pool, &changed).await.unwrap();
        assert_eq!(second, PageCounts::default());

        let title: String = sqlx::query_scalar("SELECT title FROM course WHERE id = 'c1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(title, "Course c1");

        let counts = table_counts(&pool).await.unwrap();
        assert_eq!(counts.courses, 2);
        assert_eq!(counts.authors, 2);
        assert_eq!(counts.skills, 1);
        assert_eq!(counts.course_authors, 3);
        assert_eq!(counts.course_skills, 1);
    }

    #[tokio::test]
    async fn recent_courses_groups_authors_and_orders() {
        let (_td, pool) = setup_pool().await;
        let mut batch = sample_batch();
        // no authors: excluded from the feed
        batch.courses.push(course("c3", 1_800_000_000_000));
        persist_page(&pool, &batch).await.unwrap();

        let rows = recent_courses(&pool, None, 50).await.unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c2", "c1"]);
        assert_eq!(rows[0].authors, vec!["Grace Hopper", "Ada Lovelace"]);
        assert_eq!(rows[1].authors, vec!["Ada Lovelace"]);
        assert_eq!(rows[0].published_at.timestamp_millis(), 1_700_000_500_000);
    }

    #[tokio::test]
    async fn recent_courses_respects_cutoff_and_limit() {
        let (_td, pool) = setup_pool().await;
        persist_page(&pool, &sample_batch()).await.unwrap();

        let limited = recent_courses(&pool, None, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, "c2");

        // c2 was published exactly at this second: not newer
        let cutoff = DateTime::from_timestamp(1_700_000_500, 0).unwrap();
        assert!(recent_courses(&pool, Some(cutoff), 50).await.unwrap().is_empty());

        let cutoff = DateTime::from_timestamp(1_700_000_499, 0).unwrap();
        let rows = recent_courses(&pool, Some(cutoff), 50).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "c2");
    }

    #[tokio::test]
    async fn record_and_read_sync_time() {
        let (_td, pool) = setup_pool().await;
        assert!(last_sync_time(&pool).await.unwrap().is_none());
        let t1 = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let t2 = DateTime::from_timestamp_millis(1_700_000_100_456).unwrap();
        record_sync(&pool, t1).await.unwrap();
        record_sync(&pool, t2).await.unwrap();
        assert_eq!(last_sync_time(&pool).await.unwrap(), Some(t2));
        assert_eq!(table_counts(&pool).await.unwrap().syncs, 2);
    }

    #[tokio::test]
    async fn reader_connection_cannot_write() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("learning.db");
        let path = path.to_str().unwrap();
        let pool = init_writer(path).await.unwrap();
        run_migrations(&pool).await.unwrap();
        persist_page(&pool, &sample_batch()).await.unwrap();

        let mut reader = open_reader(path).await.unwrap();
        assert_eq!(recent_courses(&mut reader, None, 50).await.unwrap().len(), 2);
        let write = sqlx::query("DELETE FROM course").execute(&mut reader).await;
        assert!(write.is_err());
    }

    #[tokio::test]
    async fn failed_insert_rolls_back_whole_page() {
        let (_td, pool) = setup_pool().await;
        sqlx::query(
            "CREATE TRIGGER reject_course_skill BEFORE INSERT ON course_skill \
             BEGIN SELECT RAISE(ABORT, 'rejected'); END",
        )
        .execute(&pool)
        .await
        .unwrap();

        let err = persist_page(&pool, &sample_batch()).await.unwrap_err();
        assert!(err.to_string().contains("rejected"));

        let counts = table_counts(&pool).await.unwrap();
        assert_eq!(counts.courses, 0);
        assert_eq!(counts.authors, 0);
        assert_eq!(counts.skills, 0);
        assert_eq!(counts.course_authors, 0);
        assert_eq!(counts.course_skills, 0);
    }

    #[tokio::test]
    async fn reader_sees_committed_rows_during_open_write() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("learning.db");
        let path = path.to_str().unwrap();
        let pool = init_writer(path).await.unwrap();
        run_migrations(&pool).await.unwrap();
        persist_page(&pool, &sample_batch()).await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        insert_course_tx(&mut tx, &course("c9", 1_900_000_000_000)).await.unwrap();
        sqlx::query("INSERT INTO course_author (course_id, author_id) VALUES ('c9', 'a1')")
            .execute(&mut *tx)
            .await
            .unwrap();

        let mut reader = open_reader(path).await.unwrap();
        let read = tokio::time::timeout(
            Duration::from_secs(2),
            recent_courses(&mut reader, None, 50),
        )
        .await
        .expect("reader blocked by open write transaction")
        .unwrap();
        let ids: Vec<&str> = read.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c2", "c1"]);

        tx.commit().await.unwrap();
        let after = recent_courses(&mut reader, None, 50).await.unwrap();
        assert_eq!(after[0].id, "c9");
    }

    #[tokio::test]
    async fn reader_does_not_create_missing_directories() {
        let td = tempfile::tempdir().unwrap();
        let missing = td.path().join("absent/learning.db");
        assert!(open_reader(missing.to_str().unwrap()).await.is_err());
        assert!(!td.path().join("absent").exists());
    }
}
