//! Zip implementation of [`IDirectoryArchiver`]
//!
//! One archive entry per regular file, named by its path relative to the
//! compressed root with `/` separators. Directories are implied by entry
//! names and recreated on decompress. Level 0 stores entries uncompressed;
//! levels 1 to 9 use deflate at that level.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use drivecopy_core::domain::request::MAX_COMPRESSION_LEVEL;
use drivecopy_core::ports::{DirectoryTransferResult, IDirectoryArchiver};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Directory archiver producing zip files
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiver;

impl ZipArchiver {
    pub fn new() -> Self {
        Self
    }
}

fn entry_options(level: u32, size: u64) -> SimpleFileOptions {
    let options = SimpleFileOptions::default().large_file(size >= u64::from(u32::MAX));
    if level == 0 {
        options.compression_method(CompressionMethod::Stored)
    } else {
        options
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(i64::from(level)))
    }
}

/// Entry name of `path` below `root`; `None` for the root itself or non-UTF-8 names
fn entry_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

fn exclude(excluded: &mut BTreeSet<PathBuf>, path: &Path, reason: &dyn std::fmt::Display) {
    warn!(path = %path.display(), %reason, "Unable to compress, skipping");
    excluded.insert(path.to_path_buf());
}

impl IDirectoryArchiver for ZipArchiver {
    fn compress(
        &self,
        source: &Path,
        archive: &Path,
        level: u32,
    ) -> Result<DirectoryTransferResult> {
        if level > MAX_COMPRESSION_LEVEL {
            bail!("compression level {level} is out of range 0-{MAX_COMPRESSION_LEVEL}");
        }
        if !source.is_dir() {
            bail!("'{}' is not a directory", source.display());
        }
        info!(
            source = %source.display(),
            archive = %archive.display(),
            level,
            "Compressing directory"
        );

        let file = File::create(archive)
            .with_context(|| format!("Failed to create archive '{}'", archive.display()))?;
        let mut zip = ZipWriter::new(BufWriter::new(file));
        let mut excluded = BTreeSet::new();
        let mut entries = 0usize;

        for item in WalkDir::new(source).follow_links(true).sort_by_file_name() {
            let entry = match item {
                Ok(entry) => entry,
                Err(e) => {
                    exclude(&mut excluded, e.path().unwrap_or(source), &e);
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            let Some(name) = entry_name(source, path) else {
                exclude(&mut excluded, path, &"name is not valid UTF-8");
                continue;
            };
            let mut reader = match File::open(path) {
                Ok(file) => BufReader::new(file),
                Err(e) => {
                    exclude(&mut excluded, path, &e);
                    continue;
                }
            };
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);

            zip.start_file(name.as_str(), entry_options(level, size))
                .with_context(|| format!("Failed to add '{name}' to archive"))?;
            io::copy(&mut reader, &mut zip)
                .with_context(|| format!("Failed to compress '{}'", path.display()))?;
            debug!(entry = %name, bytes = size, "Compressed file");
            entries += 1;
        }

        let mut writer = zip.finish().context("Failed to finalize archive")?;
        writer.flush().context("Failed to flush archive")?;

        info!(entries, excluded = excluded.len(), "Directory compressed");
        Ok(DirectoryTransferResult {
            archive_file_path: archive.to_path_buf(),
            compression_level: level,
            excluded_files: excluded,
        })
    }

    fn decompress(&self, archive: &Path, destination: &Path) -> Result<()> {
        info!(
            archive = %archive.display(),
            destination = %destination.display(),
            "Decompressing archive"
        );

        let file = File::open(archive)
            .with_context(|| format!("Failed to open archive '{}'", archive.display()))?;
        let mut zip = ZipArchive::new(BufReader::new(file))
            .with_context(|| format!("'{}' is not a valid zip archive", archive.display()))?;
        fs::create_dir_all(destination)
            .with_context(|| format!("Failed to create '{}'", destination.display()))?;

        for index in 0..zip.len() {
            let mut entry = zip
                .by_index(index)
                .with_context(|| format!("Failed to read archive entry {index}"))?;
            let Some(relative) = entry.enclosed_name() else {
                warn!(entry = entry.name(), "Entry escapes the destination, skipping");
                continue;
            };
            let target = destination.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&target)
                    .with_context(|| format!("Failed to create '{}'", target.display()))?;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create '{}'", parent.display()))?;
            }

            let mut out = match OpenOptions::new().write(true).create_new(true).open(&target) {
                Ok(file) => BufWriter::new(file),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    warn!(path = %target.display(), "File already exists, not overwriting");
                    continue;
                }
                Err(e) => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("Failed to create '{}'", target.display())))
                }
            };
            io::copy(&mut entry, &mut out)
                .with_context(|| format!("Failed to extract '{}'", target.display()))?;
            out.flush()
                .with_context(|| format!("Failed to write '{}'", target.display()))?;
            debug!(path = %target.display(), "Extracted file");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn sample_tree(root: &Path) {
        write(&root.join("a.txt"), b"alpha");
        write(&root.join("sub/b.txt"), b"bravo bravo bravo bravo");
        write(&root.join("sub/deeper/c.bin"), &[0u8, 1, 2, 3, 255]);
    }

    fn entry_names(archive: &Path) -> Vec<String> {
        let zip = ZipArchive::new(File::open(archive).unwrap()).unwrap();
        let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
        names.sort();
        names
    }

    #[test]
    fn test_entry_name() {
        let root = Path::new("/data/photos");
        assert_eq!(
            entry_name(root, Path::new("/data/photos/2024/a.jpg")).as_deref(),
            Some("2024/a.jpg")
        );
        assert_eq!(entry_name(root, root), None);
        assert_eq!(entry_name(root, Path::new("/elsewhere/a.jpg")), None);
    }

    #[test]
    fn test_entries_are_relative_with_forward_slashes() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("tree");
        sample_tree(&source);
        let archive = dir.path().join("tree.zip");

        let result = ZipArchiver::new().compress(&source, &archive, 6).unwrap();

        assert_eq!(result.archive_file_path, archive);
        assert_eq!(result.compression_level, 6);
        assert!(result.excluded_files.is_empty());
        assert_eq!(
            entry_names(&archive),
            vec!["a.txt", "sub/b.txt", "sub/deeper/c.bin"]
        );
    }

    #[test]
    fn test_level_selects_method() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("tree");
        sample_tree(&source);

        for (level, method) in [
            (0, CompressionMethod::Stored),
            (1, CompressionMethod::Deflated),
            (9, CompressionMethod::Deflated),
        ] {
            let archive = dir.path().join(format!("level{level}.zip"));
            ZipArchiver::new().compress(&source, &archive, level).unwrap();
            let mut zip = ZipArchive::new(File::open(&archive).unwrap()).unwrap();
            assert_eq!(zip.by_name("sub/b.txt").unwrap().compression(), method);
        }
    }

    #[test]
    fn test_round_trip_restores_tree() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("tree");
        sample_tree(&source);
        let archive = dir.path().join("tree.zip");
        let restored = dir.path().join("restored");

        let archiver = ZipArchiver::new();
        archiver.compress(&source, &archive, 9).unwrap();
        archiver.decompress(&archive, &restored).unwrap();

        for relative in ["a.txt", "sub/b.txt", "sub/deeper/c.bin"] {
            assert_eq!(
                fs::read(restored.join(relative)).unwrap(),
                fs::read(source.join(relative)).unwrap(),
                "{relative}"
            );
        }
    }

    #[test]
    fn test_empty_directory_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("empty");
        fs::create_dir(&source).unwrap();
        let archive = dir.path().join("empty.zip");
        let restored = dir.path().join("restored");

        let archiver = ZipArchiver::new();
        archiver.compress(&source, &archive, 0).unwrap();
        assert!(entry_names(&archive).is_empty());

        archiver.decompress(&archive, &restored).unwrap();
        assert!(restored.is_dir());
        assert_eq!(fs::read_dir(&restored).unwrap().count(), 0);
    }

    #[test]
    fn test_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        write(&file, b"x");
        let archive = dir.path().join("out.zip");

        let archiver = ZipArchiver::new();
        assert!(archiver.compress(&file, &archive, 0).is_err());
        assert!(archiver.compress(dir.path(), &archive, 10).is_err());
        assert!(archiver.decompress(&file, &dir.path().join("dest")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_is_excluded() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("tree");
        sample_tree(&source);
        let locked = source.join("sub/locked.txt");
        write(&locked, b"secret");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if File::open(&locked).is_ok() {
            // Running with CAP_DAC_OVERRIDE, permissions are not enforced.
            return;
        }

        let archive = dir.path().join("tree.zip");
        let result = ZipArchiver::new().compress(&source, &archive, 1).unwrap();

        assert_eq!(result.excluded_files, BTreeSet::from([locked.clone()]));
        assert!(!entry_names(&archive).contains(&"sub/locked.txt".to_string()));
        assert_eq!(entry_names(&archive).len(), 3);

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[test]
    fn test_existing_files_are_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("tree");
        sample_tree(&source);
        let archive = dir.path().join("tree.zip");
        let restored = dir.path().join("restored");
        write(&restored.join("a.txt"), b"local edit");

        let archiver = ZipArchiver::new();
        archiver.compress(&source, &archive, 5).unwrap();
        archiver.decompress(&archive, &restored).unwrap();

        assert_eq!(fs::read(restored.join("a.txt")).unwrap(), b"local edit");
        assert_eq!(
            fs::read(restored.join("sub/b.txt")).unwrap(),
            b"bravo bravo bravo bravo"
        );
    }

    #[test]
    fn test_entries_escaping_destination_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("evil.zip");
        {
            let mut zip = ZipWriter::new(File::create(&archive).unwrap());
            let options = SimpleFileOptions::default();
            zip.start_file("../escaped.txt", options).unwrap();
            zip.write_all(b"nope").unwrap();
            zip.start_file("inside.txt", options).unwrap();
            zip.write_all(b"fine").unwrap();
            zip.finish().unwrap();
        }
        let destination = dir.path().join("dest");

        ZipArchiver::new().decompress(&archive, &destination).unwrap();

        assert!(!dir.path().join("escaped.txt").exists());
        assert_eq!(fs::read(destination.join("inside.txt")).unwrap(), b"fine");
    }
}
