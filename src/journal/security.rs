//! Secondary injection and traversal defenses.
//!
//! Every query in this crate binds user values as parameters; the checks here
//! are an explicit second layer on top of that, not a replacement. They apply
//! to *structured* inputs only: filter values, tag names used in filters,
//! backup filenames. Entry content is exempt: hostile-looking payloads must
//! store and retrieve verbatim.

use anyhow::Result;

use super::error::JournalError;

/// Substrings that mark a structured filter value as an injection attempt.
/// Matched case-insensitively.
const INJECTION_PATTERNS: &[&str] = &[
    "';",
    "\";",
    ";--",
    "--",
    "/*",
    "*/",
    " union ",
    "union select",
    "attach database",
    "drop table",
    "drop index",
    "insert into",
    "delete from",
    "pragma ",
];

/// Reject a structured filter value that matches a known injection pattern.
///
/// `field` names the offending input in the error message.
pub fn check_filter_value(field: &str, value: &str) -> Result<()> {
    let lowered = value.to_lowercase();
    for pattern in INJECTION_PATTERNS {
        if lowered.contains(pattern) {
            return Err(JournalError::security(format!(
                "{field} contains a rejected pattern"
            ))
            .into());
        }
    }
    Ok(())
}

/// Reject a backup filename that could escape the backup directory.
///
/// Runs before any filesystem access, regardless of whether the resolved
/// path exists.
pub fn check_backup_filename(filename: &str) -> Result<()> {
    if filename.is_empty() {
        return Err(JournalError::validation("backup filename must not be empty").into());
    }
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err(JournalError::security(format!(
            "backup filename must not contain path separators or '..': {filename}"
        ))
        .into());
    }
    Ok(())
}

/// Strip illegal path characters from a caller-supplied snapshot name and
/// cap its length. Returns `None` when nothing usable remains.
pub fn sanitize_snapshot_name(name: &str) -> Option<String> {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .take(64)
        .collect();
    let trimmed = cleaned.trim_matches('.').to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_values_reject_injection_patterns() {
        for payload in [
            "'; DROP TABLE entries; --",
            "x UNION SELECT * FROM tags",
            "a/* comment */b",
            "ATTACH DATABASE '/tmp/evil.db' AS evil",
        ] {
            let err = check_filter_value("entry_type", payload).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<JournalError>(),
                Some(JournalError::Security(_))
            ));
        }
    }

    #[test]
    fn ordinary_filter_values_pass() {
        check_filter_value("entry_type", "bug_fix").unwrap();
        check_filter_value("tag", "perf").unwrap();
        check_filter_value("significance", "technical_breakthrough").unwrap();
    }

    #[test]
    fn traversal_filenames_rejected() {
        for name in ["../../etc/passwd", "a/b.db", "a\\b.db", "..", "x..y"] {
            let err = check_backup_filename(name).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<JournalError>(),
                Some(JournalError::Security(_))
            ));
        }
        check_backup_filename("quill-backup-20260830.db").unwrap();
    }

    #[test]
    fn snapshot_names_are_sanitized() {
        assert_eq!(
            sanitize_snapshot_name("before release/v2!").as_deref(),
            Some("beforereleasev2")
        );
        assert_eq!(sanitize_snapshot_name("///").as_deref(), None);
        let long = "x".repeat(200);
        assert_eq!(sanitize_snapshot_name(&long).unwrap().len(), 64);
    }
}
