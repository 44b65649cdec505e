use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A course as persisted in the catalog store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Public URL with tracking parameters removed.
    pub url: String,
    pub thumbnail: Option<String>,
    pub language: Option<String>,
    /// Millisecond epoch timestamp.
    pub published_at: i64,
}

/// Authors and skills share this shape but live in separate tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub slug: String,
}

pub type Author = Subject;
pub type Skill = Subject;

/// A `(course_id, subject_id)` relation row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    pub course_id: String,
    pub subject_id: String,
}

/// Everything extracted from one upstream page, persisted in one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageBatch {
    pub courses: Vec<Course>,
    pub authors: Vec<Author>,
    pub skills: Vec<Skill>,
    pub course_authors: Vec<Relation>,
    pub course_skills: Vec<Relation>,
}

/// One feed entry: a course joined with its ordered author names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub published_at: DateTime<Utc>,
    pub authors: Vec<String>,
}
