//! Object key helpers
//!
//! Splits object keys into folder, filename and extension without allocating.
//! Uses memchr to find the last separator.

use memchr::memrchr;

/// Object key path separator.
pub const SEPARATOR: u8 = b'/';

/// Returns the final path segment of a key.
///
/// A key ending in `/` has an empty filename.
#[inline]
pub fn filename(key: &str) -> &str {
    match memrchr(SEPARATOR, key.as_bytes()) {
        Some(pos) => &key[pos + 1..],
        None => key,
    }
}

/// Returns the folder path of a key, trailing separator retained.
///
/// A root object (no separator) yields `""`.
#[inline]
pub fn source_folder(key: &str) -> &str {
    match memrchr(SEPARATOR, key.as_bytes()) {
        Some(pos) => &key[..=pos],
        None => "",
    }
}

/// Returns the extension of a filename including its leading dot.
///
/// Everything after the last `.` is the extension; a filename without a dot
/// yields `""`.
#[inline]
pub fn extension(filename: &str) -> &str {
    match memrchr(b'.', filename.as_bytes()) {
        Some(pos) => &filename[pos..],
        None => "",
    }
}

/// Splits a filename at its last dot into stem and extension (without the dot).
///
/// Returns `None` for the extension when the filename has no dot or ends in one.
#[inline]
pub fn split_extension(filename: &str) -> (&str, Option<&str>) {
    match memrchr(b'.', filename.as_bytes()) {
        Some(pos) if pos + 1 < filename.len() => (&filename[..pos], Some(&filename[pos + 1..])),
        Some(pos) => (&filename[..pos], None),
        None => (filename, None),
    }
}

/// Returns true for hidden files (filename starts with `.`).
#[inline]
pub fn is_hidden(key: &str) -> bool {
    filename(key).starts_with('.')
}

/// Returns true for directory placeholder keys (key ends with `/`).
#[inline]
pub fn is_directory_placeholder(key: &str) -> bool {
    key.as_bytes().last() == Some(&SEPARATOR)
}

/// Returns true when a key can be routed at all.
///
/// Hidden files and directory placeholders never reach rule matching.
#[inline]
pub fn is_routable(key: &str) -> bool {
    !is_hidden(key) && !is_directory_placeholder(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename() {
        assert_eq!(filename("Inbox/Sub/file.csv"), "file.csv");
        assert_eq!(filename("file.csv"), "file.csv");
        assert_eq!(filename("Inbox/"), "");
    }

    #[test]
    fn test_source_folder() {
        assert_eq!(source_folder("Inbox/data.csv"), "Inbox/");
        assert_eq!(source_folder("Inbox/Sub/data.csv"), "Inbox/Sub/");
        assert_eq!(source_folder("data.csv"), "");
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("a.CSV"), ".CSV");
        assert_eq!(extension("archive.tar.gz"), ".gz");
        assert_eq!(extension("README"), "");
        assert_eq!(extension("trailing."), ".");
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("report.csv"), ("report", Some("csv")));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", Some("gz")));
        assert_eq!(split_extension("report"), ("report", None));
        assert_eq!(split_extension("report."), ("report", None));
    }

    #[test]
    fn test_routable() {
        assert!(is_routable("Inbox/data.csv"));
        assert!(!is_routable(".keep"));
        assert!(!is_routable("Inbox/.keep"));
        assert!(!is_routable("Inbox/"));
    }
}
