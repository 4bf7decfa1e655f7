//! Extension-based file classification for the ingestion walk.

use std::path::Path;

use walkdir::DirEntry;

use crate::catalog::types::MemoryKind;

/// Directories never descended into during a scan. These hold build
/// output, dependency trees, and tool caches rather than user files.
pub const SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    ".venv",
    "__pycache__",
    ".cache",
    ".npm",
    "target",
    "build",
    "dist",
];

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff", "heic", "heif", "raw", "cr2", "nef",
];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm", "m4v"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "m4a", "ogg", "aac"];
const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "txt", "md", "rtf", "odt", "html", "htm", "xls", "xlsx", "csv", "ods",
    "ppt", "pptx", "odp",
];
const CODE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "ts", "jsx", "tsx", "go", "java", "c", "cpp", "h", "hpp", "rb", "php",
    "swift", "kt", "scala", "sh", "bash", "zsh", "sql", "css", "json", "yaml", "yml", "toml", "xml",
];
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "tar", "gz", "7z", "rar"];

/// Classify a file by extension. `None` means the file is not cataloged
/// at all, as opposed to [`MemoryKind::Other`] which is a real record for
/// recognized-but-uncategorized formats like archives.
pub fn classify(path: &Path) -> Option<MemoryKind> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    let ext = ext.as_str();

    if IMAGE_EXTENSIONS.contains(&ext) {
        Some(MemoryKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext) {
        Some(MemoryKind::Video)
    } else if AUDIO_EXTENSIONS.contains(&ext) {
        Some(MemoryKind::Audio)
    } else if DOCUMENT_EXTENSIONS.contains(&ext) {
        Some(MemoryKind::Document)
    } else if CODE_EXTENSIONS.contains(&ext) {
        Some(MemoryKind::Code)
    } else if ARCHIVE_EXTENSIONS.contains(&ext) {
        Some(MemoryKind::Other)
    } else {
        None
    }
}

/// Programming language for a code file, by extension.
pub fn detect_language(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    let language = match ext.as_str() {
        "rs" => "rust",
        "py" => "python",
        "js" => "javascript",
        "ts" => "typescript",
        "jsx" => "javascript-react",
        "tsx" => "typescript-react",
        "go" => "go",
        "java" => "java",
        "c" => "c",
        "cpp" => "cpp",
        "h" | "hpp" => "c-header",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" => "scala",
        "sh" | "bash" | "zsh" => "shell",
        "sql" => "sql",
        "css" => "css",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "xml" => "xml",
        _ => return None,
    };
    Some(language)
}

/// Walk predicate: descend into a directory (or visit a file) unless it is
/// hidden or a known non-user directory. The walk root itself always
/// passes; a registered source is scanned even if its own name would be
/// skipped anywhere deeper.
pub fn should_visit(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    let name = match entry.file_name().to_str() {
        Some(name) => name,
        None => return false,
    };
    if name.starts_with('.') {
        return false;
    }
    if entry.file_type().is_dir() && SKIP_DIRS.contains(&name) {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_extension_case_insensitively() {
        assert_eq!(classify(Path::new("/p/a.jpg")), Some(MemoryKind::Image));
        assert_eq!(classify(Path::new("/p/a.PNG")), Some(MemoryKind::Image));
        assert_eq!(classify(Path::new("/p/clip.mp4")), Some(MemoryKind::Video));
        assert_eq!(classify(Path::new("/p/song.flac")), Some(MemoryKind::Audio));
        assert_eq!(classify(Path::new("/p/notes.md")), Some(MemoryKind::Document));
        assert_eq!(classify(Path::new("/p/sheet.xlsx")), Some(MemoryKind::Document));
        assert_eq!(classify(Path::new("/p/main.rs")), Some(MemoryKind::Code));
        assert_eq!(classify(Path::new("/p/backup.tar")), Some(MemoryKind::Other));
    }

    #[test]
    fn unrecognized_files_are_not_cataloged() {
        assert_eq!(classify(Path::new("/p/app.exe")), None);
        assert_eq!(classify(Path::new("/p/data.bin")), None);
        assert_eq!(classify(Path::new("/p/no_extension")), None);
    }

    #[test]
    fn html_is_a_document_not_code() {
        assert_eq!(classify(Path::new("/p/index.html")), Some(MemoryKind::Document));
        assert_eq!(classify(Path::new("/p/style.css")), Some(MemoryKind::Code));
    }

    #[test]
    fn detects_language_for_code_files() {
        assert_eq!(detect_language(Path::new("/p/main.rs")), Some("rust"));
        assert_eq!(detect_language(Path::new("/p/app.tsx")), Some("typescript-react"));
        assert_eq!(detect_language(Path::new("/p/run.zsh")), Some("shell"));
        assert_eq!(detect_language(Path::new("/p/photo.jpg")), None);
    }
}
