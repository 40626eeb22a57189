use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use super::{BuildError, ExcludeRules, is_default_excluded};

/// Content size above which the user is told to add a `.ixignore`.
pub const PROJECT_SIZE_WARNING_BYTES: u64 = 100_000_000;

#[derive(Debug, Clone, Default)]
pub struct ArchiveOptions {
    /// Extra gitignore-style patterns on top of `.ixignore`.
    pub extra_excludes: Vec<String>,
}

/// A packaged project ready for upload.
///
/// The archive lives in a temporary file that is removed when the payload is
/// dropped.
#[derive(Debug)]
pub struct ArchivePayload {
    file: NamedTempFile,
    /// Hex SHA-256 of the uncompressed tar stream.
    pub sha256: String,
    pub file_count: usize,
    /// Sum of the archived file sizes.
    pub content_bytes: u64,
    /// Size of the compressed archive on disk.
    pub archive_bytes: u64,
}

impl ArchivePayload {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn exceeds_size_warning(&self) -> bool {
        self.content_bytes > PROJECT_SIZE_WARNING_BYTES
    }

    pub fn read_bytes(&self) -> Result<Vec<u8>, BuildError> {
        fs::read(self.path()).map_err(|e| BuildError::Read {
            path: self.path().to_path_buf(),
            source: e,
        })
    }
}

/// Hashes everything written through it before passing it on.
struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    fn finish(self) -> (W, String) {
        (self.inner, hex::encode(self.hasher.finalize()))
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

enum EntryKind {
    File { executable: bool },
    Symlink(PathBuf),
}

struct ArchiveEntry {
    full_path: PathBuf,
    archive_name: String,
    kind: EntryKind,
}

/// Build a deterministic tar.gz of `root`.
///
/// Entries are sorted by relative path and written with normalized headers,
/// so unchanged content always produces the same `sha256`.
pub fn build_archive(root: &Path, options: &ArchiveOptions) -> Result<ArchivePayload, BuildError> {
    if !root.exists() {
        return Err(BuildError::MissingProject(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(BuildError::NotADirectory(root.to_path_buf()));
    }

    let rules = ExcludeRules::load(root, &options.extra_excludes)?;

    let mut entries = collect_entries(root, &rules)?;
    if entries.is_empty() {
        return Err(BuildError::EmptyProject(root.to_path_buf()));
    }
    entries.sort_by(|a, b| a.archive_name.cmp(&b.archive_name));

    let temp = tempfile::Builder::new()
        .prefix("inferex-")
        .suffix(".tar.gz")
        .tempfile()?;
    let encoder = GzEncoder::new(temp, Compression::default());
    let mut archive = tar::Builder::new(HashingWriter::new(encoder));
    archive.mode(tar::HeaderMode::Deterministic);

    let mut content_bytes = 0u64;
    for entry in &entries {
        match &entry.kind {
            EntryKind::File { executable } => {
                let data = fs::read(&entry.full_path).map_err(|e| BuildError::Read {
                    path: entry.full_path.clone(),
                    source: e,
                })?;
                let mut header = normalized_header(tar::EntryType::Regular, *executable);
                header.set_size(data.len() as u64);
                archive
                    .append_data(&mut header, &entry.archive_name, data.as_slice())
                    .map_err(|e| {
                        BuildError::ArchiveError(format!(
                            "Failed to add {}: {}",
                            entry.full_path.display(),
                            e
                        ))
                    })?;
                content_bytes += data.len() as u64;
            }
            EntryKind::Symlink(target) => {
                let mut header = normalized_header(tar::EntryType::Symlink, false);
                header.set_size(0);
                archive
                    .append_link(&mut header, &entry.archive_name, target)
                    .map_err(|e| {
                        BuildError::ArchiveError(format!(
                            "Failed to add link {}: {}",
                            entry.full_path.display(),
                            e
                        ))
                    })?;
            }
        }
    }

    let hashing = archive
        .into_inner()
        .map_err(|e| BuildError::ArchiveError(format!("Failed to finish archive: {}", e)))?;
    let (encoder, sha256) = hashing.finish();
    let file = encoder
        .finish()
        .map_err(|e| BuildError::ArchiveError(format!("Failed to compress: {}", e)))?;

    let archive_bytes = file.as_file().metadata()?.len();
    tracing::info!(
        "Packaged {} files ({} bytes, {} compressed), sha256 {}",
        entries.len(),
        content_bytes,
        archive_bytes,
        sha256
    );

    Ok(ArchivePayload {
        file,
        sha256,
        file_count: entries.len(),
        content_bytes,
        archive_bytes,
    })
}

fn normalized_header(entry_type: tar::EntryType, executable: bool) -> tar::Header {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_mode(if executable { 0o755 } else { 0o644 });
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header
}

fn collect_entries(root: &Path, rules: &ExcludeRules) -> Result<Vec<ArchiveEntry>, BuildError> {
    let mut entries = Vec::new();
    let mut walker = ignore::WalkBuilder::new(root);
    walker
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .follow_links(false)
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry
                    .file_name()
                    .to_str()
                    .is_some_and(is_default_excluded)
        });

    for entry in walker.build() {
        let entry = entry.map_err(|e| BuildError::ArchiveError(e.to_string()))?;
        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            continue;
        }

        let path = entry.path();
        let relative_path = path.strip_prefix(root).map_err(|e| {
            BuildError::ArchiveError(format!(
                "Failed to compute relative path for {}: {}",
                path.display(),
                e
            ))
        })?;

        if rules.is_excluded(relative_path, false) {
            tracing::debug!("Ignoring {}", relative_path.display());
            continue;
        }

        let archive_name = relative_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let kind = if file_type.is_symlink() {
            let target = fs::read_link(path).map_err(|e| BuildError::Read {
                path: path.to_path_buf(),
                source: e,
            })?;
            EntryKind::Symlink(target)
        } else {
            EntryKind::File {
                executable: is_executable(path),
            }
        };

        entries.push(ArchiveEntry {
            full_path: path.to_path_buf(),
            archive_name,
            kind,
        });
    }

    Ok(entries)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use tempfile::TempDir;

    fn archived_names(payload: &ArchivePayload) -> Vec<String> {
        let file = fs::File::open(payload.path()).unwrap();
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    fn sample_project(dir: &Path) {
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::write(dir.join("app.py"), "def predict(x):\n    return x\n").unwrap();
        fs::write(dir.join("requirements.txt"), "numpy\n").unwrap();
        fs::write(dir.join("src/util.py"), "X = 1\n").unwrap();
    }

    #[test]
    fn archive_is_sorted_and_complete() {
        let temp = TempDir::new().unwrap();
        sample_project(temp.path());

        let payload = build_archive(temp.path(), &ArchiveOptions::default()).unwrap();
        assert_eq!(
            archived_names(&payload),
            vec!["app.py", "requirements.txt", "src/util.py"]
        );
        assert_eq!(payload.file_count, 3);
        assert_eq!(payload.sha256.len(), 64);
        assert!(payload.archive_bytes > 0);
        assert!(!payload.exceeds_size_warning());
    }

    #[test]
    fn unreadable_archive_is_a_local_io_error() {
        let temp = TempDir::new().unwrap();
        sample_project(temp.path());

        let payload = build_archive(temp.path(), &ArchiveOptions::default()).unwrap();
        assert!(payload.read_bytes().unwrap().starts_with(&[0x1f, 0x8b]));

        fs::remove_file(payload.path()).unwrap();
        let err = payload.read_bytes().unwrap_err();
        assert!(matches!(err, BuildError::Read { .. }));
        let err: crate::error::InferexError = err.into();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
    }

    #[test]
    fn unchanged_content_yields_identical_hash() {
        let temp = TempDir::new().unwrap();
        sample_project(temp.path());

        let first = build_archive(temp.path(), &ArchiveOptions::default()).unwrap();
        // Touch a file without changing it; mtimes must not leak into the hash.
        fs::write(temp.path().join("app.py"), "def predict(x):\n    return x\n").unwrap();
        let second = build_archive(temp.path(), &ArchiveOptions::default()).unwrap();
        assert_eq!(first.sha256, second.sha256);

        fs::write(temp.path().join("app.py"), "def predict(x):\n    return 2 * x\n").unwrap();
        let third = build_archive(temp.path(), &ArchiveOptions::default()).unwrap();
        assert_ne!(first.sha256, third.sha256);
    }

    #[test]
    fn excluded_paths_never_reach_the_archive() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        sample_project(root);
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("venv/lib")).unwrap();
        fs::create_dir_all(root.join("src/__pycache__")).unwrap();
        fs::create_dir_all(root.join("weights")).unwrap();
        fs::write(root.join(".git/HEAD"), "ref").unwrap();
        fs::write(root.join("venv/lib/site.py"), "x").unwrap();
        fs::write(root.join("src/__pycache__/util.pyc"), "x").unwrap();
        fs::write(root.join("weights/model.bin"), "x").unwrap();
        fs::write(root.join("previous.tar.gz"), "x").unwrap();
        fs::write(root.join(".ixignore"), "weights/\n").unwrap();

        let payload = build_archive(root, &ArchiveOptions::default()).unwrap();
        assert_eq!(
            archived_names(&payload),
            vec!["app.py", "requirements.txt", "src/util.py"]
        );
    }

    #[test]
    fn extra_excludes_stack_on_ixignore() {
        let temp = TempDir::new().unwrap();
        sample_project(temp.path());
        fs::write(temp.path().join(".ixignore"), "src/\n").unwrap();

        let options = ArchiveOptions {
            extra_excludes: vec!["requirements.txt".to_string()],
        };
        let payload = build_archive(temp.path(), &options).unwrap();
        assert_eq!(archived_names(&payload), vec!["app.py"]);
    }

    #[test]
    fn empty_project_is_an_error() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("__pycache__")).unwrap();
        fs::write(temp.path().join("__pycache__/x.pyc"), "x").unwrap();

        let err = build_archive(temp.path(), &ArchiveOptions::default()).unwrap_err();
        assert!(matches!(err, BuildError::EmptyProject(_)), "got {err:?}");
    }

    #[test]
    fn missing_root_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err =
            build_archive(&temp.path().join("nope"), &ArchiveOptions::default()).unwrap_err();
        assert!(matches!(err, BuildError::MissingProject(_)));
    }

    #[test]
    fn temp_archive_is_removed_on_drop() {
        let temp = TempDir::new().unwrap();
        sample_project(temp.path());

        let payload = build_archive(temp.path(), &ArchiveOptions::default()).unwrap();
        let path = payload.path().to_path_buf();
        assert!(path.exists());
        drop(payload);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn headers_are_normalized() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        sample_project(temp.path());
        let script = temp.path().join("run.sh");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o775)).unwrap();

        let payload = build_archive(temp.path(), &ArchiveOptions::default()).unwrap();
        let file = fs::File::open(payload.path()).unwrap();
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        for entry in archive.entries().unwrap() {
            let entry = entry.unwrap();
            let header = entry.header();
            assert_eq!(header.mtime().unwrap(), 0);
            assert_eq!(header.uid().unwrap(), 0);
            let expected = if entry.path().unwrap().ends_with("run.sh") {
                0o755
            } else {
                0o644
            };
            assert_eq!(header.mode().unwrap(), expected);
        }
    }
}
