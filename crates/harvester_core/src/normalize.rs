const DEFAULT_SCHEME_PREFIX: &str = "https://";

/// Trims `raw` and prepends `https://` unless it already names an
/// `http://` or `https://` scheme. Total: never fails, never validates.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if has_http_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("{DEFAULT_SCHEME_PREFIX}{trimmed}")
    }
}

fn has_http_scheme(url: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        url.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}
