use log::{debug, info};
use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::io;

use crate::cache::{CacheError, GradeCache};
use crate::config::RefreshPolicy;
use crate::table::{GradeTable, StudentRecord, TableError};

/// Fields posted by the query form
#[derive(Debug, Clone, Deserialize)]
pub struct QueryForm {
    pub student_id: String,
    pub password: String,
    pub class_id: String,
}

/// Every way a grade lookup can end without a report
#[derive(Debug)]
pub enum QueryError {
    /// Unknown class, non-200 answer or unreachable remote
    DownloadFailed(CacheError),

    StudentNotFound,

    WrongPassword,

    /// The cache file could not be written or read
    Io(io::Error),

    /// The cached export is not a usable grade table
    Table(TableError),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::DownloadFailed(e) => write!(f, "{}", e),
            QueryError::StudentNotFound => write!(f, "student not found"),
            QueryError::WrongPassword => write!(f, "wrong password"),
            QueryError::Io(e) => write!(f, "cache file error: {}", e),
            QueryError::Table(e) => write!(f, "{}", e),
        }
    }
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            QueryError::DownloadFailed(e) => Some(e),
            QueryError::Io(e) => Some(e),
            QueryError::Table(e) => Some(e),
            QueryError::StudentNotFound | QueryError::WrongPassword => None,
        }
    }
}

impl From<CacheError> for QueryError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::Io(e) => QueryError::Io(e),
            other => QueryError::DownloadFailed(other),
        }
    }
}

impl From<io::Error> for QueryError {
    fn from(e: io::Error) -> Self {
        QueryError::Io(e)
    }
}

impl From<TableError> for QueryError {
    fn from(e: TableError) -> Self {
        QueryError::Table(e)
    }
}

/// Refresh the class sheet, find the student and check the password
///
/// The class lock is held from the refresh until the cache file has been read.
pub async fn lookup(
    cache: &GradeCache,
    policy: RefreshPolicy,
    form: &QueryForm,
) -> Result<StudentRecord, QueryError> {
    let text = {
        let guard = cache.refresh(&form.class_id, policy).await?;
        if !guard.was_fetched() {
            debug!(
                "Class {}: reusing {} fetched at {:?}",
                form.class_id,
                guard.path().display(),
                guard.fetched_at()
            );
        }
        guard.read_text().await?
    };

    let table = GradeTable::parse(&text)?;

    let Some(record) = table.find_student(&form.student_id)? else {
        info!("Class {}: no student {:?}", form.class_id, form.student_id);
        return Err(QueryError::StudentNotFound);
    };

    if !record.password_matches(&form.password) {
        info!("Class {}: wrong password for {}", form.class_id, record.student_id);
        return Err(QueryError::WrongPassword);
    }

    Ok(record)
}
