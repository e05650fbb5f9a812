use std::path::{Path, PathBuf};

pub const MAX_TITLE_LEN: usize = 128;
/// Leaves room for ` - <id> (n).<ext>` under the usual 255-byte name limit.
pub const MAX_TITLE_BYTES: usize = 180;

fn is_invalid_filename_char(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') || c.is_control()
}

/// Make a title safe to use as a file name on any common filesystem.
///
/// Runs of legal characters are joined with `_` wherever illegal ones were
/// removed, and the result is capped at [`MAX_TITLE_LEN`] characters and
/// [`MAX_TITLE_BYTES`] bytes, cut on a character boundary.
pub fn sanitize_filename(title: &str) -> String {
    let joined = title
        .split(is_invalid_filename_char)
        .filter(|run| !run.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    let mut bytes = 0;
    let clean: String = joined
        .chars()
        .take(MAX_TITLE_LEN)
        .take_while(|c| {
            bytes += c.len_utf8();
            bytes <= MAX_TITLE_BYTES
        })
        .collect();
    if clean.trim().is_empty() {
        crate::core::metadata::UNKNOWN.to_string()
    } else {
        clean
    }
}

/// `<sanitized title> - <id><extension>`. IDs are used as-is unless they
/// carry characters that could escape the output directory.
pub fn final_file_name(title: &str, id: &str, extension: &str) -> String {
    let id = if id.contains(is_invalid_filename_char) {
        sanitize_filename(id)
    } else {
        id.to_string()
    };
    format!("{} - {}{}", sanitize_filename(title), id, extension)
}

/// First path that does not exist yet: `path` itself, then `stem (1).ext`,
/// `stem (2).ext` and so on.
pub fn resolve_collision(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1u32..)
        .map(|i| parent.join(format!("{} ({}){}", stem, i, extension)))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Final destination for a title and id inside `output_dir`.
pub fn resolve_destination(output_dir: &Path, title: &str, id: &str, extension: &str) -> PathBuf {
    resolve_collision(&output_dir.join(final_file_name(title, id, extension)))
}
