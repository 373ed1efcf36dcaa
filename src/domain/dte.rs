//! DTE metadata the backend extracts from JSON attachments while building
//! the archive. It travels in the `X-DTE-Metadata` response header.

use serde::{Deserialize, Serialize};

pub const METADATA_HEADER: &str = "X-DTE-Metadata";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DteMetadata {
    /// Name of the file inside the archive.
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub codigo_generacion: Option<String>,
    #[serde(default)]
    pub emisor_nombre: Option<String>,
    #[serde(default)]
    pub numero_control: Option<String>,
    /// Number or string depending on the issuer.
    #[serde(default)]
    pub monto_total: Option<serde_json::Value>,
    #[serde(default)]
    pub receptor_nombre: Option<String>,
}

/// Decode the header value. A missing or malformed header means "no
/// metadata"; the archive itself is still good.
pub fn parse_header(value: Option<&str>) -> Vec<DteMetadata> {
    let Some(raw) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<DteMetadata>>(raw) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("ignoring malformed {METADATA_HEADER} header: {e}");
            Vec::new()
        }
    }
}

pub fn for_file<'a>(metadata: &'a [DteMetadata], filename: &str) -> Option<&'a DteMetadata> {
    metadata.iter().find(|m| m.filename == filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_header() {
        let v = parse_header(Some(
            r#"[{"codigo_generacion":"ABC-123","emisor_nombre":"ACME","filename":"dte.json"},
                {"codigo_generacion":null,"emisor_nombre":null,"filename":"x.json"}]"#,
        ));
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].codigo_generacion.as_deref(), Some("ABC-123"));
        assert_eq!(for_file(&v, "x.json").unwrap().emisor_nombre, None);
        assert!(for_file(&v, "missing.pdf").is_none());
    }

    #[test]
    fn missing_or_broken_header_is_empty() {
        assert!(parse_header(None).is_empty());
        assert!(parse_header(Some("  ")).is_empty());
        assert!(parse_header(Some("{not json")).is_empty());
        assert!(parse_header(Some(r#"{"filename":"a"}"#)).is_empty());
    }
}
