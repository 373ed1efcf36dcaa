use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::domain::email::EmailRecord;

const DATE_FMT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    #[default]
    All,
    Pdf,
    Xml,
    Json,
}

impl FileType {
    pub const ALL: [FileType; 4] = [FileType::All, FileType::Pdf, FileType::Xml, FileType::Json];

    pub fn as_str(self) -> &'static str {
        match self {
            FileType::All => "all",
            FileType::Pdf => "pdf",
            FileType::Xml => "xml",
            FileType::Json => "json",
        }
    }

    /// Cycle used by the TUI selector.
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let i = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(FileType::All),
            "pdf" => Ok(FileType::Pdf),
            "xml" => Ok(FileType::Xml),
            "json" => Ok(FileType::Json),
            other => Err(format!("unknown file type '{other}' (all, pdf, xml, json)")),
        }
    }
}

/// Filters the user typed in. Dates are inclusive on both ends; the backend
/// takes care of turning the end date into an exclusive bound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchFilters {
    #[serde(rename = "search")]
    pub term: String,
    #[serde(rename = "fileType")]
    pub file_type: FileType,
    #[serde(rename = "startDate", serialize_with = "date_or_empty")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "endDate", serialize_with = "date_or_empty")]
    pub end_date: Option<NaiveDate>,
}

// The backend treats a blank date field as "no bound".
fn date_or_empty<S: Serializer>(d: &Option<NaiveDate>, s: S) -> std::result::Result<S::Ok, S::Error> {
    match d {
        Some(d) => s.serialize_str(&d.format(DATE_FMT).to_string()),
        None => s.serialize_str(""),
    }
}

pub fn parse_date(input: &str) -> Result<Option<NaiveDate>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input, DATE_FMT)
        .map(Some)
        .map_err(|_| anyhow!("invalid date '{input}', expected YYYY-MM-DD"))
}

impl SearchFilters {
    /// Build filters from raw form inputs.
    pub fn from_inputs(term: &str, file_type: FileType, start: &str, end: &str) -> Result<Self> {
        let filters = Self {
            term: term.trim().to_string(),
            file_type,
            start_date: parse_date(start)?,
            end_date: parse_date(end)?,
        };
        filters.validate()?;
        Ok(filters)
    }

    pub fn validate(&self) -> Result<()> {
        if let (Some(s), Some(e)) = (self.start_date, self.end_date)
            && s > e
        {
            return Err(anyhow!("start date {s} is after end date {e}"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub emails: Vec<EmailRecord>,
    #[serde(default)]
    pub total: Option<usize>,
}

impl SearchResponse {
    pub fn total(&self) -> usize {
        self.total.unwrap_or(self.emails.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_uses_backend_field_names() {
        let f = SearchFilters::from_inputs(" acme ", FileType::Pdf, "2024-01-01", "").unwrap();
        let v = serde_json::to_value(&f).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "search": "acme",
                "fileType": "pdf",
                "startDate": "2024-01-01",
                "endDate": ""
            })
        );
    }

    #[test]
    fn rejects_bad_and_inverted_dates() {
        assert!(SearchFilters::from_inputs("", FileType::All, "01/02/2024", "").is_err());
        assert!(SearchFilters::from_inputs("", FileType::All, "2024-03-01", "2024-02-01").is_err());
        assert!(SearchFilters::from_inputs("", FileType::All, "2024-02-01", "2024-02-01").is_ok());
    }

    #[test]
    fn file_type_parses_and_cycles() {
        assert_eq!("PDF".parse::<FileType>().unwrap(), FileType::Pdf);
        assert_eq!("".parse::<FileType>().unwrap(), FileType::All);
        assert!("docx".parse::<FileType>().is_err());
        assert_eq!(FileType::Json.next(), FileType::All);
        assert_eq!(FileType::All.prev(), FileType::Json);
    }

    #[test]
    fn total_falls_back_to_len() {
        let r: SearchResponse =
            serde_json::from_str(r#"{"emails":[{"id":"a"},{"id":"b"}]}"#).unwrap();
        assert_eq!(r.total(), 2);
        let r: SearchResponse = serde_json::from_str(r#"{"emails":[],"total":7}"#).unwrap();
        assert_eq!(r.total(), 7);
    }
}
