use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Read a JSON request from stdin when data is being piped.
/// Returns None for an interactive terminal or empty input.
pub fn read_stdin<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let request: T = serde_json::from_str(trimmed)
        .map_err(|e| format!("Failed to parse stdin: {}", e))?;
    tracing::debug!(bytes = trimmed.len(), "read request from stdin");
    Ok(Some(request))
}
