use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed subject list for the final-year grade card, in table order.
pub const SUBJECTS: [&str; 5] = ["AI", "IoT", "CF", "STQA", "Project"];

/// Each subject is scored out of 150 (unit test + practical + final exam).
pub const SUBJECT_MAX_MARKS: f64 = 150.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    #[error("missing required column `{0}`")]
    Missing(String),
    #[error("column `{column}` holds `{value}` where a number was expected")]
    Malformed { column: String, value: String },
}

/// One roster row. Name and email are hoisted because the dispatch loop needs
/// them for logging even when rendering the record fails; every column of the
/// row stays reachable through the `field`/`score` lookups.
#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub name: String,
    pub email: String,
    fields: BTreeMap<String, String>,
}

impl StudentRecord {
    pub fn new(fields: BTreeMap<String, String>) -> Self {
        let name = fields.get("Name").cloned().unwrap_or_default();
        let email = fields.get("Email").cloned().unwrap_or_default();
        Self {
            name,
            email,
            fields,
        }
    }

    pub fn field(&self, column: &str) -> Result<&str, FieldError> {
        self.fields
            .get(column)
            .map(String::as_str)
            .ok_or_else(|| FieldError::Missing(column.to_string()))
    }

    pub fn score(&self, column: &str) -> Result<f64, FieldError> {
        let value = self.field(column)?;
        if value.is_empty() {
            return Err(FieldError::Missing(column.to_string()));
        }
        value.parse().map_err(|_| FieldError::Malformed {
            column: column.to_string(),
            value: value.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SubjectMarks {
    pub subject: String,
    pub unit_test: f64,
    pub practical: f64,
    pub final_exam: f64,
}

impl SubjectMarks {
    pub fn total(&self) -> f64 {
        self.unit_test + self.practical + self.final_exam
    }
}

#[derive(Debug, Clone)]
pub struct GradeSummary {
    pub subjects: Vec<SubjectMarks>,
    pub grand_total: f64,
    pub max_marks: f64,
    pub percentage: f64,
    pub cgpa: f64,
    pub grade: &'static str,
}

/// One row of the cumulative email status log. The serde renames double as
/// the on-disk CSV header, fixed as `Name,Email,Status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusLogEntry {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Status")]
    pub status: String,
}

impl StatusLogEntry {
    pub fn sent(name: &str, email: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            status: "Sent".to_string(),
        }
    }

    pub fn failed(name: &str, email: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            status: format!("Failed: {reason}"),
        }
    }

    pub fn is_sent(&self) -> bool {
        self.status == "Sent"
    }
}
