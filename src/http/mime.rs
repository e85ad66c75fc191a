//! MIME type detection module
//!
//! Content types for the embedded demo assets, keyed by file name.

/// Get MIME Content-Type based on a file name's extension
pub fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name.rsplit_once('.').map(|(_, ext)| ext);
    match extension {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        _ => "application/octet-stream",
    }
}
