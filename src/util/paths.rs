//! Lexical path helpers for makefile text.
//!
//! Paths in the project model are `/`-separated strings relative to the
//! project root or to a package directory. Nothing here touches the
//! filesystem.

use std::path::{Component, Path, PathBuf};

/// Collapse `.` and `name/..` segments and normalize separators to `/`.
///
/// Leading `..` segments are kept. The empty path normalizes to `.`.
pub fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Join two project paths and normalize the result.
pub fn join(base: &str, path: &str) -> String {
    if is_absolute(path) {
        return normalize(path);
    }
    normalize(&format!("{}/{}", base, path))
}

/// Express `path` relative to the directory `base`.
///
/// Both arguments are interpreted relative to the same root. Absolute
/// paths are returned unchanged.
pub fn relative_to(base: &str, path: &str) -> String {
    if is_absolute(path) {
        return normalize(path);
    }

    let base = normalize(base);
    let path = normalize(path);
    if base == "." {
        return path;
    }

    let diff = pathdiff::diff_paths(Path::new(&path), Path::new(&base))
        .unwrap_or_else(|| PathBuf::from(&path));
    let rendered = to_slash(&diff);
    if rendered.is_empty() {
        ".".to_string()
    } else {
        rendered
    }
}

/// Render a native path with `/` separators.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::CurDir => None,
            other => Some(other.as_os_str().to_string_lossy().into_owned()),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// File name without directory and without the last extension.
pub fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(i) => &name[..i],
    }
}

/// Final path segment.
pub fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Directory part of a path, or `.` when there is none.
pub fn parent(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(0) => "/",
        Some(i) => &path[..i],
        None => ".",
    }
}

/// Extension including the leading dot, lowercased.
pub fn extension(path: &str) -> Option<String> {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(i) => Some(name[i..].to_ascii_lowercase()),
    }
}

/// Replace the extension of `path` with `ext` (which includes the dot).
pub fn with_extension(path: &str, ext: &str) -> String {
    let name = file_name(path);
    match name.rfind('.') {
        Some(i) if i > 0 => {
            let cut = path.len() - name.len() + i;
            format!("{}{}", &path[..cut], ext)
        }
        _ => format!("{}{}", path, ext),
    }
}

fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || path.starts_with('\\') || path.as_bytes().get(1) == Some(&b':')
}
