//! Path algebra shared by the local and sandboxed file paths.
//!
//! Paths are plain `/`-separated strings because they cross the host/sandbox
//! boundary; `std::path` would apply host semantics to sandbox paths.

use thiserror::Error;

/// Upper bound on the length (in characters) of a project-relative path.
pub const MAX_RELATIVE_PATH_LEN: usize = 300;

/// Reasons a project-relative path is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("path must be relative to the project root: {0}")]
    Absolute(String),
    #[error("path must not contain '..' segments: {0}")]
    Traversal(String),
    #[error("path contains an empty segment: {0}")]
    EmptySegment(String),
    #[error("path is too long ({len} > {max} characters)")]
    TooLong { len: usize, max: usize },
}

/// Convert backslash separators to forward slashes.
///
/// A run of backslashes becomes a single `/`; nothing else changes.
pub fn normalize(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len());
    let mut in_backslash_run = false;
    for ch in path.chars() {
        if ch == '\\' {
            if !in_backslash_run {
                normalized.push('/');
            }
            in_backslash_run = true;
        } else {
            normalized.push(ch);
            in_backslash_run = false;
        }
    }
    normalized
}

/// Join `child` onto `base` with exactly one separator between them.
pub fn join(base: &str, child: &str) -> String {
    if base.is_empty() {
        return child.to_string();
    }
    if child.is_empty() {
        return base.to_string();
    }
    let base = base.strip_suffix('/').unwrap_or(base);
    let child = child.strip_prefix('/').unwrap_or(child);
    format!("{base}/{child}")
}

/// Express `absolute` relative to `base`.
///
/// Returns an empty string when both are equal and `absolute` unchanged when
/// it does not live under `base`.
pub fn relative_to(base: &str, absolute: &str) -> String {
    let base = normalize(base);
    let absolute = normalize(absolute);
    let trimmed = if base.len() > 1 {
        base.strip_suffix('/').unwrap_or(&base)
    } else {
        base.as_str()
    };
    if absolute == trimmed {
        return String::new();
    }
    let prefix = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    match absolute.strip_prefix(&prefix) {
        Some(rest) => rest.to_string(),
        None => absolute,
    }
}

/// Validate a project-relative path before it reaches any filesystem.
pub fn validate_relative(path: &str) -> Result<&str, PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    let len = path.chars().count();
    if len > MAX_RELATIVE_PATH_LEN {
        return Err(PathError::TooLong {
            len,
            max: MAX_RELATIVE_PATH_LEN,
        });
    }
    if path.starts_with('/') {
        return Err(PathError::Absolute(path.to_string()));
    }
    for segment in path.split('/') {
        if segment == ".." {
            return Err(PathError::Traversal(path.to_string()));
        }
        if segment.is_empty() {
            return Err(PathError::EmptySegment(path.to_string()));
        }
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::{MAX_RELATIVE_PATH_LEN, PathError, join, normalize, relative_to, validate_relative};
    use pretty_assertions::assert_eq;

    #[test]
    fn normalize_converts_backslash_runs() {
        assert_eq!(normalize(r"src\app\page.tsx"), "src/app/page.tsx");
        assert_eq!(normalize(r"src\\app"), "src/app");
        assert_eq!(normalize("already/fine"), "already/fine");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn join_handles_empty_sides() {
        assert_eq!(join("", "a.txt"), "a.txt");
        assert_eq!(join("/app", ""), "/app");
    }

    #[test]
    fn join_uses_exactly_one_separator() {
        assert_eq!(join("/app", "src"), "/app/src");
        assert_eq!(join("/app/", "src"), "/app/src");
        assert_eq!(join("/app/", "/src"), "/app/src");
        assert_eq!(join("/", "src"), "/src");
    }

    #[test]
    fn relative_to_strips_base() {
        assert_eq!(relative_to("/app", "/app"), "");
        assert_eq!(relative_to("/app", "/app/src/page.tsx"), "src/page.tsx");
        assert_eq!(relative_to("/app/", "/app/src"), "src");
        assert_eq!(relative_to("/", "/etc/hosts"), "etc/hosts");
    }

    #[test]
    fn relative_to_returns_foreign_paths_unchanged() {
        assert_eq!(relative_to("/app", "/application/x"), "/application/x");
        assert_eq!(relative_to("/app", "/srv/x"), "/srv/x");
    }

    #[test]
    fn relative_to_inverts_join() {
        let bases = ["/app", "/app/", "/", "", "/srv/project"];
        let children = ["a.txt", "src/app/page.tsx", "deep/er/still/file.rs", "x y/z"];
        for base in bases {
            for child in children {
                assert_eq!(relative_to(base, &join(base, child)), child, "base={base}");
            }
        }
    }

    #[test]
    fn validate_relative_accepts_plain_paths() {
        assert_eq!(validate_relative("src/app/page.tsx"), Ok("src/app/page.tsx"));
        assert_eq!(validate_relative("README.md"), Ok("README.md"));
        assert_eq!(validate_relative(".env"), Ok(".env"));
    }

    #[test]
    fn validate_relative_rejects_bad_paths() {
        assert_eq!(validate_relative(""), Err(PathError::Empty));
        assert!(matches!(
            validate_relative("/abs"),
            Err(PathError::Absolute(_))
        ));
        assert!(matches!(
            validate_relative("a/../b"),
            Err(PathError::Traversal(_))
        ));
        assert!(matches!(validate_relative(".."), Err(PathError::Traversal(_))));
        assert!(matches!(
            validate_relative("a//b"),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!(
            validate_relative("a/"),
            Err(PathError::EmptySegment(_))
        ));
    }

    #[test]
    fn validate_relative_enforces_length_ceiling() {
        let at_limit = "a".repeat(MAX_RELATIVE_PATH_LEN);
        assert!(validate_relative(&at_limit).is_ok());
        let too_long = "a".repeat(MAX_RELATIVE_PATH_LEN + 1);
        assert_eq!(
            validate_relative(&too_long),
            Err(PathError::TooLong {
                len: MAX_RELATIVE_PATH_LEN + 1,
                max: MAX_RELATIVE_PATH_LEN,
            })
        );
    }
}
