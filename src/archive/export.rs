// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Bundle export.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{Archive, ArchiveError, DESCRIPTOR_NAME};
use crate::model::Score;

const STAGE_DIR: &str = "export";

/// File name of the bundle for a score called `name`
pub fn bundle_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        "score.zip".to_string()
    } else {
        format!("{}.zip", cleaned)
    }
}

impl Archive {
    /// Write `score` as `<name>.zip` into `out_dir`, replacing any bundle of
    /// the same name. Referenced files that no longer exist are left out.
    pub fn export_score(&self, score: &Score, out_dir: &Path) -> Result<PathBuf, ArchiveError> {
        let stage = self.fresh_dir(STAGE_DIR)?;
        let result = export_from(&stage, score, out_dir);
        Self::discard(&stage);
        result
    }
}

fn export_from(stage: &Path, score: &Score, out_dir: &Path) -> Result<PathBuf, ArchiveError> {
    let descriptor = serde_json::to_vec_pretty(&score.to_record())?;
    let descriptor_path = stage.join(DESCRIPTOR_NAME);
    fs::write(&descriptor_path, descriptor).map_err(|e| ArchiveError::io(&descriptor_path, e))?;

    for file in score.referenced_files() {
        let Some(name) = file.file_name() else {
            continue;
        };
        if !file.is_file() {
            warn!("Leaving missing file {:?} out of the bundle", file);
            continue;
        }
        let dest = stage.join(name);
        fs::copy(file, &dest).map_err(|e| ArchiveError::io(file, e))?;
    }

    fs::create_dir_all(out_dir).map_err(|e| ArchiveError::io(out_dir, e))?;
    let bundle = out_dir.join(bundle_file_name(&score.name));
    let partial = bundle.with_extension("zip.partial");
    write_zip(stage, &partial)?;
    fs::rename(&partial, &bundle).map_err(|e| ArchiveError::io(&bundle, e))?;

    info!("Exported '{}' to {:?}", score.name, bundle);
    Ok(bundle)
}

/// Zip every file under `dir`, stored by path relative to `dir`
fn write_zip(dir: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let file = File::create(dest).map_err(|e| ArchiveError::io(dest, e))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            ArchiveError::io(&path, io::Error::other(e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let name = relative.to_string_lossy().replace('\\', "/");
        zip.start_file(name, options)?;
        let mut source = File::open(entry.path()).map_err(|e| ArchiveError::io(entry.path(), e))?;
        io::copy(&mut source, &mut zip).map_err(|e| ArchiveError::io(entry.path(), e))?;
    }

    zip.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PartAudioTrack, PartScoreDocument};
    use std::io::Read;
    use tempfile::tempdir;
    use zip::ZipArchive;

    #[test]
    fn test_bundle_file_name() {
        assert_eq!(bundle_file_name("Ave Maria"), "Ave Maria.zip");
        assert_eq!(bundle_file_name("AC/DC: Live"), "AC_DC_ Live.zip");
        assert_eq!(bundle_file_name("   "), "score.zip");
    }

    #[test]
    fn test_export_writes_descriptor_and_files() {
        let files = tempdir().unwrap();
        let pdf = files.path().join("Tenor@ABC.pdf");
        let mp3 = files.path().join("Tenor@DEF.mp3");
        fs::write(&pdf, b"%PDF").unwrap();
        fs::write(&mp3, b"ID3").unwrap();

        let mut score = Score::new("Hymn");
        score.pdf_parts.push(PartScoreDocument::new("Tenor", &pdf));
        score.mp3_parts.push(PartAudioTrack::new("Tenor", &mp3));
        score.full_mix = Some(files.path().join("gone.mp3"));

        let work = tempdir().unwrap();
        let out = tempdir().unwrap();
        let archive = Archive::new(work.path());
        let bundle = archive.export_score(&score, out.path()).unwrap();
        assert_eq!(bundle, out.path().join("Hymn.zip"));
        assert!(!work.path().join(STAGE_DIR).exists());

        let mut zip = ZipArchive::new(File::open(&bundle).unwrap()).unwrap();
        let mut names: Vec<String> = zip.file_names().map(String::from).collect();
        names.sort();
        assert_eq!(names, vec!["Tenor@ABC.pdf", "Tenor@DEF.mp3", "score.json"]);

        let mut json = String::new();
        zip.by_name(DESCRIPTOR_NAME)
            .unwrap()
            .read_to_string(&mut json)
            .unwrap();
        assert!(json.contains("\"fullMixFileName\": \"gone.mp3\""));
    }

    #[test]
    fn test_export_wipes_stale_staging() {
        let work = tempdir().unwrap();
        let stale = work.path().join(STAGE_DIR);
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("leftover.mp3"), b"old").unwrap();

        let out = tempdir().unwrap();
        let bundle = Archive::new(work.path())
            .export_score(&Score::new("Empty"), out.path())
            .unwrap();

        let zip = ZipArchive::new(File::open(&bundle).unwrap()).unwrap();
        assert_eq!(zip.len(), 1);
    }
}
