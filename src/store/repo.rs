use anyhow::Result;
use std::collections::HashSet;

use crate::domain::dte::{self, DteMetadata};
use crate::domain::email::{EmailId, EmailRecord};

/// Extensions the history keeps track of.
const TRACKED_EXTENSIONS: [&str; 3] = [".pdf", ".xml", ".json"];

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadItem {
    pub message_id: EmailId,
    pub subject: String,
    pub sender: String,
    /// Empty when the message had no tracked attachment.
    pub filename: String,
    pub generation_code: Option<String>,
    pub issuer_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRecord {
    pub id: Option<i64>,
    pub saved_at: i64,
    pub archive_path: String,
    pub user_email: Option<String>,
    pub items: Vec<DownloadItem>,
}

impl DownloadRecord {
    /// One item per tracked attachment of each downloaded message, joined
    /// with the DTE metadata by filename.
    pub fn build(
        emails: &[EmailRecord],
        metadata: &[DteMetadata],
        archive_path: &str,
        user_email: Option<&str>,
        saved_at: i64,
    ) -> Self {
        let mut items = Vec::new();
        for email in emails {
            let tracked: Vec<_> = email
                .attachments
                .iter()
                .filter(|a| {
                    let name = a.filename.to_ascii_lowercase();
                    TRACKED_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
                })
                .collect();

            let item = |filename: &str| {
                let meta = dte::for_file(metadata, filename);
                DownloadItem {
                    message_id: email.id.clone(),
                    subject: email.subject.clone(),
                    sender: email.from.clone(),
                    filename: filename.to_string(),
                    generation_code: meta
                        .and_then(|m| m.codigo_generacion.clone())
                        .or_else(|| email.generation_code.clone()),
                    issuer_name: meta.and_then(|m| m.emisor_nombre.clone()),
                }
            };

            if tracked.is_empty() {
                items.push(item(""));
            } else {
                items.extend(tracked.iter().map(|a| item(&a.filename)));
            }
        }

        Self {
            id: None,
            saved_at,
            archive_path: archive_path.to_string(),
            user_email: user_email.map(str::to_string),
            items,
        }
    }

    pub fn message_count(&self) -> usize {
        self.items
            .iter()
            .map(|i| i.message_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn dte_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.generation_code.is_some())
            .count()
    }
}

/// Local log of archives saved by this client.
pub trait DownloadHistory {
    /// Returns the id of the stored record.
    fn record(&self, record: &DownloadRecord) -> Result<i64>;
    /// Newest first.
    fn recent(&self, limit: usize) -> Result<Vec<DownloadRecord>>;
    fn downloaded_ids(&self) -> Result<HashSet<EmailId>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_joins_metadata_and_skips_untracked_files() {
        let emails: Vec<EmailRecord> = serde_json::from_value(serde_json::json!([
            {"id":"m1","subject":"Factura 1","from":"a@x.com",
             "attachments":[{"filename":"f1.pdf"},{"filename":"dte1.json"},{"filename":"logo.png"}]},
            {"id":"m2","subject":"Sin adjunto","from":"b@x.com","codigo_generacion":"GEN-2"}
        ]))
        .unwrap();
        let meta = vec![DteMetadata {
            filename: "dte1.json".into(),
            codigo_generacion: Some("GEN-1".into()),
            emisor_nombre: Some("ACME".into()),
            ..Default::default()
        }];

        let r = DownloadRecord::build(&emails, &meta, "/tmp/x.zip", Some("me@x.com"), 42);
        let names: Vec<_> = r.items.iter().map(|i| i.filename.as_str()).collect();
        assert_eq!(names, ["f1.pdf", "dte1.json", ""]);
        assert_eq!(r.items[1].issuer_name.as_deref(), Some("ACME"));
        assert_eq!(r.items[2].generation_code.as_deref(), Some("GEN-2"));
        assert_eq!(r.message_count(), 2);
        assert_eq!(r.dte_count(), 2);
    }
}
