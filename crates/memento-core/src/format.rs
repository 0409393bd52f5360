//! Display helpers for profile fields. All of them are total: missing or
//! malformed input comes back as `None` or a placeholder.

use sha2::{Digest, Sha256};

pub const PLACEHOLDER: &str = "N/A";

const AVATAR_COLORS: [&str; 8] = [
    "#e57373", "#f06292", "#ba68c8", "#7986cb", "#4fc3f7", "#4db6ac", "#aed581", "#ffb74d",
];

const NEUTRAL_COLOR: &str = "#9e9e9e";

/// Turn user-typed links into something a browser can open.
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains("://") {
        Some(trimmed.to_string())
    } else {
        Some(format!("https://{}", trimmed))
    }
}

/// `@handle` from a bare handle, `@handle`, or a profile URL.
pub fn format_handle(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let handle = last.trim_start_matches('@').trim();
    if handle.is_empty() {
        None
    } else {
        Some(format!("@{}", handle))
    }
}

pub fn initials(name: &str) -> String {
    let mut words = name.split_whitespace();
    let Some(first) = words.next() else {
        return "?".to_string();
    };

    let mut out: String = first.chars().take(1).flat_map(char::to_uppercase).collect();
    if let Some(last) = words.last() {
        out.extend(last.chars().take(1).flat_map(char::to_uppercase));
    }
    out
}

pub fn avatar_color(name: &str) -> &'static str {
    let key = name.trim().to_lowercase();
    if key.is_empty() {
        return NEUTRAL_COLOR;
    }
    let digest = Sha256::digest(key.as_bytes());
    AVATAR_COLORS[digest[0] as usize % AVATAR_COLORS.len()]
}

pub fn or_placeholder(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => PLACEHOLDER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls() {
        assert_eq!(normalize_url("  "), None);
        assert_eq!(normalize_url("github.com/ada").as_deref(), Some("https://github.com/ada"));
        assert_eq!(normalize_url(" http://x.org ").as_deref(), Some("http://x.org"));
    }

    #[test]
    fn handles() {
        assert_eq!(format_handle("ada").as_deref(), Some("@ada"));
        assert_eq!(format_handle("@ada").as_deref(), Some("@ada"));
        assert_eq!(format_handle("https://instagram.com/ada/").as_deref(), Some("@ada"));
        assert_eq!(format_handle("@"), None);
        assert_eq!(format_handle(""), None);
    }

    #[test]
    fn initials_from_names() {
        assert_eq!(initials("ada lovelace"), "AL");
        assert_eq!(initials("  Grace   Brewster Hopper "), "GH");
        assert_eq!(initials("plato"), "P");
        assert_eq!(initials("   "), "?");
    }

    #[test]
    fn colors_are_stable() {
        assert_eq!(avatar_color("Ada Lovelace"), avatar_color(" ada lovelace"));
        assert!(AVATAR_COLORS.contains(&avatar_color("Alan")));
        assert_eq!(avatar_color(""), NEUTRAL_COLOR);
    }

    #[test]
    fn placeholders() {
        assert_eq!(or_placeholder(None), PLACEHOLDER);
        assert_eq!(or_placeholder(Some(" ")), PLACEHOLDER);
        assert_eq!(or_placeholder(Some("Dhaka")), "Dhaka");
    }
}
