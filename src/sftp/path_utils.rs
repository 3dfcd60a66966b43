//! Remote path utilities
//!
//! Remote SFTP paths always use `/` as separator, regardless of the local or
//! remote OS. Every remote path the crate builds goes through
//! [`normalize_remote_path`], so paths handed to the session are always
//! absolute, free of empty segments and without a trailing slash (except `/`).

/// Build a canonical absolute remote path from a base and extra segments.
///
/// Non-empty pieces are joined with `/`, runs of separators collapse into one
/// and a leading `/` is added when missing. `.` and `..` are kept literally.
///
/// # Examples
/// ```
/// use sftp_browser_lib::sftp::normalize_remote_path;
///
/// assert_eq!(normalize_remote_path("/a//b///c", [""; 0]), "/a/b/c");
/// assert_eq!(normalize_remote_path("home", ["user/", "file.txt"]), "/home/user/file.txt");
/// assert_eq!(normalize_remote_path("", [""; 0]), "/");
/// ```
pub fn normalize_remote_path<I, S>(base: &str, segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::with_capacity(base.len() + 16);
    out.push('/');

    let mut push_piece = |piece: &str| {
        for seg in piece.split('/').filter(|s| !s.is_empty()) {
            if out.len() > 1 {
                out.push('/');
            }
            out.push_str(seg);
        }
    };

    push_piece(base);
    for segment in segments {
        push_piece(segment.as_ref());
    }

    out
}

/// Join one child name onto a remote directory.
pub fn join_remote_path(base: &str, component: &str) -> String {
    normalize_remote_path(base, [component])
}

/// Check if a remote SFTP path is absolute.
pub fn is_absolute_remote_path(path: &str) -> bool {
    path.starts_with('/')
}

/// Parent directory of a remote path; the root is its own parent.
pub fn remote_parent(path: &str) -> String {
    let normalized = normalize_remote_path(path, [""; 0]);
    match normalized.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => normalized[..idx].to_string(),
    }
}

/// Last segment of a remote path, `None` for the root.
pub fn remote_file_name(path: &str) -> Option<String> {
    let normalized = normalize_remote_path(path, [""; 0]);
    normalized
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Whether a listed entry name is usable as one local path component.
///
/// Rejects names such as `..`, `a/b` or `/etc/passwd` that would place a
/// mirrored file outside its target directory.
pub fn is_plain_entry_name(name: &str) -> bool {
    let mut components = std::path::Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    )
}
