use std::{io, result};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read instance file {path}: {io_error}")]
    FailedToReadInstance { path: String, io_error: io::Error },
    #[error("{path}:{line_no}: expected a {expected_key:?} header line, found {line:?}")]
    BadHeaderLine {
        path: String,
        line_no: usize,
        line: String,
        expected_key: String,
    },
    #[error("{path}:{line_no}: could not parse the value of header {key:?} ({value:?}) as a number")]
    BadHeaderValue {
        path: String,
        line_no: usize,
        key: String,
        value: String,
    },
    #[error("{path}:{line_no}: expected section keyword {expected:?}, found {found:?}")]
    BadSectionKeyword {
        path: String,
        line_no: usize,
        expected: String,
        found: String,
    },
    #[error(
        "{path}: the {section} section declared {declared} rows but {actual} rows were present"
    )]
    RowCountMismatch {
        path: String,
        section: String,
        declared: usize,
        actual: usize,
    },
    #[error("{path}:{line_no}: bad {section} row {line:?}: {reason}")]
    BadRow {
        path: String,
        line_no: usize,
        section: String,
        line: String,
        reason: String,
    },
    #[error("{path}: curriculum {curriculum:?} references unknown course {course_token:?}")]
    UnknownCourseReference {
        path: String,
        curriculum: String,
        course_token: String,
    },
    #[error(
        "{path}:{line_no}: unavailability constraint for {course:?} has out-of-range day/period {day}/{period} (instance has {days} days of {periods_per_day} periods)"
    )]
    UnavailabilityOutOfRange {
        path: String,
        line_no: usize,
        course: String,
        day: u16,
        period: u16,
        days: u16,
        periods_per_day: u16,
    },
    #[error("{path}: the instance has no rooms, courses, or periods to schedule into")]
    EmptyInstance { path: String },
    #[error("failed to read config file {path}: {io_error}")]
    FailedToReadConfig { path: String, io_error: io::Error },
    #[error("failed to parse config file {path}: {source}")]
    BadConfig {
        path: String,
        source: toml::de::Error,
    },
}

pub type Result<T> = result::Result<T, Box<Error>>;
