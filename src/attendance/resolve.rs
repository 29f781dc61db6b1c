use serde_json::Value;

use super::ScanError;

/// Turns a scanned payload into a normalized student identifier.
///
/// A payload starting with `{` must be a JSON object carrying a string
/// `StudentID`; anything else is taken as the identifier itself.
pub fn resolve_identifier(payload: &str) -> Result<String, ScanError> {
    let trimmed = payload.trim();
    let raw = if trimmed.starts_with('{') {
        let value: Value =
            serde_json::from_str(trimmed).map_err(|_| ScanError::MalformedPayload)?;
        match value.get("StudentID") {
            Some(Value::String(id)) => id.clone(),
            _ => return Err(ScanError::MalformedPayload),
        }
    } else {
        trimmed.to_string()
    };

    let id = raw.trim().to_uppercase();
    if id.is_empty() {
        return Err(ScanError::EmptyPayload);
    }
    Ok(id)
}
