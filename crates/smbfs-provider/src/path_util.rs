//! String-level path primitives shared by the path algebra.
//!
//! The separator is `/`. A path is absolute when it starts with the
//! separator and a folder when it ends with it; the primitives here keep
//! those two flags apart from the component sequence so that
//! [`split`]/[`merge`] round-trip.

/// Separator between path components.
pub const SEPARATOR: char = '/';

/// Separator between scheme and authority.
pub const SCHEME_SEPARATOR: &str = "://";

/// URI scheme served by this provider.
pub const SMB_SCHEME: &str = "smb";

/// True when `path` ends with the separator.
pub fn is_folder(path: &str) -> bool {
    path.ends_with(SEPARATOR)
}

/// True when `path` starts with the separator.
pub fn is_absolute(path: &str) -> bool {
    path.starts_with(SEPARATOR)
}

/// Splits `path` into its components. The leading separator of an absolute
/// path and the trailing separator of a folder path contribute no
/// component; empty segments from consecutive separators are preserved.
pub fn split(path: &str) -> Vec<String> {
    if path.is_empty() {
        return Vec::new();
    }
    let mut parts: Vec<String> = path.split(SEPARATOR).map(str::to_string).collect();
    if is_absolute(path) {
        parts.remove(0);
    }
    if is_folder(path) {
        parts.pop();
    }
    parts
}

/// Joins `components[start..end]` with the separator, prefixing one when
/// `absolute` and suffixing one when `folder`. Inverse of [`split`] for
/// paths without consecutive separators.
pub fn merge<S: AsRef<str>>(
    components: &[S],
    start: usize,
    end: usize,
    absolute: bool,
    folder: bool,
) -> String {
    let mut out = String::new();
    if absolute {
        out.push(SEPARATOR);
    }
    for component in &components[start..end] {
        out.push_str(component.as_ref());
        out.push(SEPARATOR);
    }
    if !folder {
        out.pop();
    }
    out
}

/// [`merge`] over the whole slice.
pub fn render<S: AsRef<str>>(components: &[S], absolute: bool, folder: bool) -> String {
    merge(components, 0, components.len(), absolute, folder)
}
