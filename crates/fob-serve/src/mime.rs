//! Content-type inference for served paths.

use std::path::Path;

/// Infer a `Content-Type` from the path's extension.
pub fn content_type_for(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "js" | "mjs" | "cjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "wasm" => "application/wasm",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Lowercased extension without the dot, if any.
pub fn extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Whether the path names a script or HTML document.
pub fn is_script_or_html(path: &str) -> bool {
    matches!(
        extension(path).as_deref(),
        Some("js" | "mjs" | "cjs" | "html" | "htm")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("/main.js"), "text/javascript; charset=utf-8");
        assert_eq!(content_type_for("/styles.CSS"), "text/css; charset=utf-8");
        assert_eq!(content_type_for("/main.js.map"), "application/json");
        assert_eq!(content_type_for("/media/logo.png"), "image/png");
        assert_eq!(content_type_for("/LICENSE"), "application/octet-stream");
    }

    #[test]
    fn test_is_script_or_html() {
        assert!(is_script_or_html("/main.mjs"));
        assert!(is_script_or_html("/index.html"));
        assert!(!is_script_or_html("/styles.css"));
        assert!(!is_script_or_html("/"));
    }
}
