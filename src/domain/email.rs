use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message ids are opaque provider strings.
pub type EmailId = String;

/// One attachment as reported by the backend.
///
/// `attachmentId` is what the backend needs to fetch the bytes again when the
/// record is posted back for a batch download, so it must survive the round
/// trip untouched. Same for any field we don't know about (`extra`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub filename: String,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(
        rename = "attachmentId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub attachment_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A search hit. Immutable once received, apart from `downloaded`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailRecord {
    pub id: EmailId,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// DTE generation code, when the backend could extract one.
    #[serde(
        rename = "codigo_generacion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub generation_code: Option<String>,
    /// Issuer name as registered in the DTE, preferred over `from` for display.
    #[serde(
        rename = "emisor_registrado",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub registered_issuer: Option<String>,
    #[serde(default)]
    pub downloaded: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    /// xml / json documents
    Structured,
    Other,
    None,
}

pub const NO_ATTACHMENT: &str = "No attachment";

impl EmailRecord {
    pub fn sender_label(&self) -> &str {
        match self.registered_issuer.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => &self.from,
        }
    }

    pub fn first_attachment_name(&self) -> &str {
        self.attachments
            .first()
            .map(|a| a.filename.as_str())
            .unwrap_or(NO_ATTACHMENT)
    }

    /// Icon kind, decided by the first attachment only.
    pub fn kind(&self) -> FileKind {
        let Some(first) = self.attachments.first() else {
            return FileKind::None;
        };
        let name = first.filename.to_ascii_lowercase();
        if name.ends_with(".pdf") {
            FileKind::Pdf
        } else if name.ends_with(".xml") || name.ends_with(".json") {
            FileKind::Structured
        } else {
            FileKind::Other
        }
    }

    /// Provider snippets come HTML-escaped (`&#39;`, `&amp;`...).
    pub fn display_snippet(&self) -> String {
        decode_html_text(&self.snippet)
    }
}

pub fn decode_html_text(s: &str) -> String {
    if !s.contains('&') && !s.contains('<') {
        return s.to_string();
    }
    match html2text::from_read(s.as_bytes(), 10_000) {
        Ok(text) => text.split_whitespace().collect::<Vec<_>>().join(" "),
        Err(e) => {
            log::debug!("snippet decode failed: {e}");
            s.to_string()
        }
    }
}
