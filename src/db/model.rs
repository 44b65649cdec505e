//! Counters returned by store writes and audits.

/// Rows actually inserted while persisting one page. Ignored duplicates are not
/// counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageCounts {
    pub courses: u64,
    pub authors: u64,
    pub skills: u64,
    pub course_authors: u64,
    pub course_skills: u64,
}

impl std::ops::AddAssign for PageCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.courses += rhs.courses;
        self.authors += rhs.authors;
        self.skills += rhs.skills;
        self.course_authors += rhs.course_authors;
        self.course_skills += rhs.course_skills;
    }
}

/// Total rows per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct TableCounts {
    pub courses: i64,
    pub authors: i64,
    pub skills: i64,
    pub course_authors: i64,
    pub course_skills: i64,
    pub syncs: i64,
}
