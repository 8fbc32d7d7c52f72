// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Bundle import.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

use super::{Archive, ArchiveError, DESCRIPTOR_NAME};
use crate::model::{PartAudioTrack, PartId, PartScoreDocument, Score, ScoreRecord};
use crate::storage::FileStorage;

const STAGE_DIR: &str = "import";

/// How imported records are identified
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Keep the part ids from the descriptor instead of generating new ones
    pub preserve_part_ids: bool,
}

impl Archive {
    /// Unpack `bundle` and copy its files into `storage`.
    ///
    /// Files are renamed `name_1`, `name_2`, ... when the name is taken.
    /// Parts whose file is missing from the bundle are dropped. The score
    /// always gets a fresh id and has never been opened. On failure every
    /// file already copied into storage is deleted again.
    pub fn import_bundle(
        &self,
        bundle: &Path,
        storage: &dyn FileStorage,
        options: ImportOptions,
    ) -> Result<Score, ArchiveError> {
        let stage = self.fresh_dir(STAGE_DIR)?;
        let mut copied = Vec::new();
        let result = import_from(&stage, bundle, storage, options, &mut copied);
        if result.is_err() {
            roll_back(storage, &copied);
        }
        Self::discard(&stage);
        result
    }
}

fn import_from(
    stage: &Path,
    bundle: &Path,
    storage: &dyn FileStorage,
    options: ImportOptions,
    copied: &mut Vec<PathBuf>,
) -> Result<Score, ArchiveError> {
    unpack(bundle, stage)?;

    let descriptor_path =
        find_file(stage, DESCRIPTOR_NAME).ok_or_else(|| ArchiveError::MissingDescriptor(bundle.to_path_buf()))?;
    let bytes = fs::read(&descriptor_path).map_err(|e| ArchiveError::io(&descriptor_path, e))?;
    let record: ScoreRecord = serde_json::from_slice(&bytes)?;

    let part_id = |id: PartId| {
        if options.preserve_part_ids {
            id
        } else {
            PartId::new()
        }
    };

    let mut score = Score::new(record.name.clone());

    for part in &record.pdf_parts {
        if let Some(file) = bring_in(stage, &part.file_name, storage, copied)? {
            score.pdf_parts.push(PartScoreDocument {
                id: part_id(part.id),
                part_name: part.part_name.clone(),
                file,
            });
        }
    }
    for part in &record.mp3_parts {
        if let Some(file) = bring_in(stage, &part.file_name, storage, copied)? {
            score.mp3_parts.push(PartAudioTrack {
                id: part_id(part.id),
                part_name: part.part_name.clone(),
                file,
            });
        }
    }
    if let Some(name) = &record.full_mix_file_name {
        score.full_mix = bring_in(stage, name, storage, copied)?;
    }

    info!(
        "Imported '{}': {} PDF parts, {} audio parts, full mix {}",
        score.name,
        score.pdf_parts.len(),
        score.mp3_parts.len(),
        if score.full_mix.is_some() { "present" } else { "absent" }
    );
    Ok(score)
}

/// Extract every entry of `bundle` under `dest`; entries escaping `dest`
/// are skipped
fn unpack(bundle: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let file = File::open(bundle).map_err(|e| ArchiveError::io(bundle, e))?;
    let mut zip = ZipArchive::new(file)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping unsafe bundle entry {:?}", entry.name());
            continue;
        };
        let out = dest.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&out).map_err(|e| ArchiveError::io(&out, e))?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
        }
        let mut target = File::create(&out).map_err(|e| ArchiveError::io(&out, e))?;
        io::copy(&mut entry, &mut target).map_err(|e| ArchiveError::io(&out, e))?;
    }
    Ok(())
}

/// First regular file called `name` anywhere under `dir`
fn find_file(dir: &Path, name: &str) -> Option<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .find(|e| e.file_type().is_file() && e.file_name() == name)
        .map(|e| e.into_path())
}

/// Copy a bundled file into storage under a free name
fn bring_in(
    stage: &Path,
    file_name: &str,
    storage: &dyn FileStorage,
    copied: &mut Vec<PathBuf>,
) -> Result<Option<PathBuf>, ArchiveError> {
    let Some(source) = find_file(stage, file_name) else {
        warn!("{} is not in the bundle; part dropped", file_name);
        return Ok(None);
    };
    let dest = storage.copy_in_as(&source, file_name)?;
    copied.push(dest.clone());
    Ok(Some(dest))
}

/// Delete the files a failed import already copied
fn roll_back(storage: &dyn FileStorage, copied: &[PathBuf]) {
    for file in copied {
        if let Err(e) = storage.delete(file) {
            warn!("Could not remove {:?} after failed import: {}", file, e);
        }
    }
    if !copied.is_empty() {
        info!("Removed {} file(s) copied by the failed import", copied.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalFileStorage;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_bundle(path: &Path, entries: &[(&str, &[u8])]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, data) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    const DESCRIPTOR: &str = r#"{
        "id": "6f1c2a8e-4b7d-4c61-9a53-2d0c8b1e7f40",
        "name": "Chorale",
        "pdfParts": [
            {"id": "0b0c7e57-1111-4a2b-8c3d-000000000001", "partName": "Bass", "fileName": "bass.pdf"}
        ],
        "mp3Parts": [
            {"id": "0b0c7e57-1111-4a2b-8c3d-000000000002", "partName": "Bass", "fileName": "bass.mp3"},
            {"id": "0b0c7e57-1111-4a2b-8c3d-000000000003", "partName": "Tenor", "fileName": "tenor.mp3"}
        ],
        "fullMixFileName": "mix.mp3",
        "lastOpened": "2026-01-02T03:04:05Z"
    }"#;

    #[test]
    fn test_import_nested_bundle_with_collisions() {
        let src = tempdir().unwrap();
        let bundle = src.path().join("Chorale.zip");
        write_bundle(
            &bundle,
            &[
                ("Chorale/score.json", DESCRIPTOR.as_bytes()),
                ("Chorale/bass.pdf", b"%PDF"),
                ("Chorale/bass.mp3", b"bass"),
                ("Chorale/mix.mp3", b"mix"),
            ],
        );

        let root = tempdir().unwrap();
        fs::write(root.path().join("bass.mp3"), b"already here").unwrap();
        let storage = LocalFileStorage::open(root.path()).unwrap();
        let work = tempdir().unwrap();
        let archive = Archive::new(work.path());

        let score = archive
            .import_bundle(&bundle, &storage, ImportOptions::default())
            .unwrap();

        assert_eq!(score.name, "Chorale");
        assert_eq!(score.last_opened, None);
        assert_eq!(score.pdf_parts.len(), 1);
        // tenor.mp3 is not in the bundle
        assert_eq!(score.mp3_parts.len(), 1);
        assert_eq!(score.mp3_parts[0].file, root.path().join("bass_1.mp3"));
        assert_eq!(fs::read(&score.mp3_parts[0].file).unwrap(), b"bass");
        assert_eq!(score.full_mix, Some(root.path().join("mix.mp3")));
        assert_ne!(
            score.mp3_parts[0].id.to_string(),
            "0b0c7e57-1111-4a2b-8c3d-000000000002"
        );
        assert!(!work.path().join(STAGE_DIR).exists());
    }

    #[test]
    fn test_import_can_preserve_part_ids() {
        let src = tempdir().unwrap();
        let bundle = src.path().join("b.zip");
        write_bundle(
            &bundle,
            &[("score.json", DESCRIPTOR.as_bytes()), ("bass.pdf", b"%PDF")],
        );

        let root = tempdir().unwrap();
        let storage = LocalFileStorage::open(root.path()).unwrap();
        let score = Archive::new(src.path().join("work"))
            .import_bundle(
                &bundle,
                &storage,
                ImportOptions {
                    preserve_part_ids: true,
                },
            )
            .unwrap();
        assert_eq!(
            score.pdf_parts[0].id.to_string(),
            "0b0c7e57-1111-4a2b-8c3d-000000000001"
        );
        assert_ne!(score.id.to_string(), "6f1c2a8e-4b7d-4c61-9a53-2d0c8b1e7f40");
    }

    #[test]
    fn test_import_without_descriptor_fails() {
        let src = tempdir().unwrap();
        let bundle = src.path().join("b.zip");
        write_bundle(&bundle, &[("bass.mp3", b"bass")]);

        let root = tempdir().unwrap();
        let storage = LocalFileStorage::open(root.path()).unwrap();
        let work = tempdir().unwrap();
        let result =
            Archive::new(work.path()).import_bundle(&bundle, &storage, ImportOptions::default());
        assert!(matches!(result, Err(ArchiveError::MissingDescriptor(_))));
        assert!(!work.path().join(STAGE_DIR).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_import_removes_copied_files() {
        let src = tempdir().unwrap();
        let bundle = src.path().join("b.zip");
        let descriptor = r#"{
            "id": "6f1c2a8e-4b7d-4c61-9a53-2d0c8b1e7f40",
            "name": "Broken",
            "pdfParts": [
                {"id": "0b0c7e57-1111-4a2b-8c3d-000000000001", "partName": "A", "fileName": "a.pdf"}
            ],
            "mp3Parts": [
                {"id": "0b0c7e57-1111-4a2b-8c3d-000000000002", "partName": "B", "fileName": "b.mp3"}
            ]
        }"#;
        write_bundle(
            &bundle,
            &[
                ("score.json", descriptor.as_bytes()),
                ("a.pdf", b"%PDF"),
                ("b.mp3", b"audio"),
            ],
        );

        let root = tempdir().unwrap();
        // A dangling link into a missing directory makes the b.mp3 copy fail
        std::os::unix::fs::symlink(root.path().join("gone/b.mp3"), root.path().join("b.mp3"))
            .unwrap();
        let storage = LocalFileStorage::open(root.path()).unwrap();
        let work = tempdir().unwrap();

        let result =
            Archive::new(work.path()).import_bundle(&bundle, &storage, ImportOptions::default());
        assert!(matches!(result, Err(ArchiveError::Storage(_))));
        assert!(!root.path().join("a.pdf").exists());
        assert!(!work.path().join(STAGE_DIR).exists());
    }

    #[test]
    fn test_import_of_non_zip_fails() {
        let src = tempdir().unwrap();
        let bundle = src.path().join("b.zip");
        fs::write(&bundle, b"not a zip").unwrap();
        let root = tempdir().unwrap();
        let storage = LocalFileStorage::open(root.path()).unwrap();
        let result =
            Archive::new(src.path().join("work")).import_bundle(&bundle, &storage, ImportOptions::default());
        assert!(matches!(result, Err(ArchiveError::Zip(_))));
    }
}
