//! Progress stream formatting
//!
//! Status lines written to the caller's output sink are either plain text or one JSON
//! object per line, so a daemon can relay them to a remote client unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for StatusFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(StatusFormat::Text),
            "json" => Ok(StatusFormat::Json),
            other => Err(format!("Output format must be one of: text, json (got {})", other)),
        }
    }
}

impl fmt::Display for StatusFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFormat::Text => write!(f, "text"),
            StatusFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Serialize)]
struct JsonStatus<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    status: &'a str,
}

/// Renders status messages for the progress sink
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamFormatter {
    format: StatusFormat,
}

impl StreamFormatter {
    pub fn new(format: StatusFormat) -> Self {
        Self { format }
    }

    /// Render one status line, including its terminator
    pub fn format_status(&self, id: &str, status: &str) -> Vec<u8> {
        match self.format {
            StatusFormat::Text => {
                if id.is_empty() {
                    format!("{}\n", status).into_bytes()
                } else {
                    format!("{}: {}\n", id, status).into_bytes()
                }
            }
            StatusFormat::Json => {
                let mut line = serde_json::to_vec(&JsonStatus {
                    id: Some(id).filter(|id| !id.is_empty()),
                    status,
                })
                .unwrap_or_else(|_| status.as_bytes().to_vec());
                line.extend_from_slice(b"\r\n");
                line
            }
        }
    }

    pub fn write_status(&self, out: &mut dyn Write, id: &str, status: &str) -> io::Result<()> {
        out.write_all(&self.format_status(id, status))?;
        out.flush()
    }
}
