//! Username to synthetic email mapping.

pub const DEFAULT_EMAIL_DOMAIN: &str = "demo.local";

const fn allowed(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-')
}

/// Trim, lowercase and drop everything outside `[a-z0-9._-]`.
#[must_use]
pub fn normalize_username(username: &str) -> String {
    username
        .trim()
        .to_lowercase()
        .chars()
        .filter(|&c| allowed(c))
        .collect()
}

/// Derive the provider email for `username`, or `None` when nothing survives
/// normalization.
#[must_use]
pub fn synthetic_email(username: &str, domain: &str) -> Option<String> {
    let local = normalize_username(username);
    if local.is_empty() {
        None
    } else {
        Some(format!("{local}@{domain}"))
    }
}
