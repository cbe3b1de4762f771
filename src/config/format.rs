use serde::{Deserialize, Serialize};

/// A certificate encoding persisted per unique digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Raw DER bytes, written to `cert.der`.
    Der,
    /// PEM-encoded `CERTIFICATE` block, written to `cert.pem`.
    Pem,
    /// Parsed fields (with `Raw*` fields cleared) as indented JSON, written
    /// to `cert.json`.
    Json,
}

impl OutputFormat {
    pub fn file_name(self) -> &'static str {
        match self {
            OutputFormat::Der => "cert.der",
            OutputFormat::Pem => "cert.pem",
            OutputFormat::Json => "cert.json",
        }
    }
}
