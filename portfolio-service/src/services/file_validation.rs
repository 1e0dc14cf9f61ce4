//! Attachment whitelist: allowed extensions, the MIME types accepted for each,
//! and the per-file size ceiling.

use std::path::Path;

const ALLOWED_TYPES: &[(&str, &[&str])] = &[
    (
        ".pbix",
        &["application/octet-stream", "application/x-zip-compressed"],
    ),
    (".csv", &["text/csv", "application/vnd.ms-excel"]),
    (
        ".xlsx",
        &["application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"],
    ),
    (".xls", &["application/vnd.ms-excel"]),
    (".png", &["image/png"]),
    (".jpg", &["image/jpeg"]),
    (".jpeg", &["image/jpeg"]),
    (".pdf", &["application/pdf"]),
    (".txt", &["text/plain"]),
];

/// Lowercased extension including the dot, or an empty string.
pub fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

/// MIME types accepted for an extension (with dot, any case).
pub fn allowed_mime_types(extension: &str) -> Option<&'static [&'static str]> {
    let extension = extension.to_lowercase();
    ALLOWED_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mimes)| *mimes)
}

pub fn allowed_extensions() -> impl Iterator<Item = &'static str> {
    ALLOWED_TYPES.iter().map(|(ext, _)| *ext)
}

/// Checks one file against the whitelist. The error is a human-readable reason.
pub fn validate_file(
    filename: &str,
    mimetype: &str,
    size: u64,
    max_size: u64,
) -> Result<(), String> {
    let extension = extension_of(filename);
    let Some(allowed) = allowed_mime_types(&extension) else {
        return Err(format!(
            "File extension '{}' is not allowed. Allowed: {}",
            extension,
            allowed_extensions().collect::<Vec<_>>().join(", ")
        ));
    };

    // Ignore parameters such as "; charset=utf-8"
    let essence = mimetype
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    if !allowed.contains(&essence.as_str()) {
        return Err(format!(
            "MIME type '{}' does not match extension '{}'",
            mimetype, extension
        ));
    }

    if size > max_size {
        return Err(format!(
            "File size {} exceeds the maximum of {} bytes",
            size, max_size
        ));
    }

    Ok(())
}

/// Replaces everything outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_filename(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    // Strip leading dots so names like "../x" cannot escape a directory.
    let trimmed = sanitized.trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}
