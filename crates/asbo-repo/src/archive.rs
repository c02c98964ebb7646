//! The archive store: encoding a staging directory into a zip archive and
//! extracting archives into the cache.
//!
//! The container format is deliberately opaque to the rest of the system;
//! nothing outside this module touches the `zip` crate.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use asbo_util::errors::AsboError;

/// Encode the contents of `staging` into a zip archive at `archive`.
///
/// Entries are written in sorted path order so the same staging tree always
/// produces the same entry sequence.
pub fn create(staging: &Path, archive: &Path) -> Result<(), AsboError> {
    let mut files = Vec::new();
    collect_files(staging, &mut files)?;
    files.sort();

    let out = fs::File::create(archive)?;
    let mut zip = zip::ZipWriter::new(out);

    for path in files {
        let rel = path
            .strip_prefix(staging)
            .expect("collected under staging root");
        let name = rel.to_string_lossy().replace('\\', "/");

        let mut options = zip::write::SimpleFileOptions::default();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(meta) = fs::metadata(&path) {
                options = options.unix_permissions(meta.permissions().mode());
            }
        }

        zip.start_file(name, options)
            .map_err(|e| AsboError::Archive {
                message: format!("Failed to add {}: {e}", rel.display()),
            })?;
        let mut input = fs::File::open(&path)?;
        std::io::copy(&mut input, &mut zip)?;
    }

    zip.finish().map_err(|e| AsboError::Archive {
        message: format!("Failed to finalize {}: {e}", archive.display()),
    })?;
    Ok(())
}

/// Extract a zip archive into `dest`, creating parent directories as needed
/// and overwriting existing files.
pub fn extract(archive: &Path, dest: &Path) -> Result<(), AsboError> {
    let file = fs::File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| AsboError::Archive {
        message: format!("Failed to open {}: {e}", archive.display()),
    })?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| AsboError::Archive {
            message: format!("Bad entry in {}: {e}", archive.display()),
        })?;
        let out_path = dest.join(entry.mangled_name());
        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = fs::File::create(&out_path)?;
            std::io::copy(&mut entry, &mut out)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    if let Err(e) = fs::set_permissions(&out_path, fs::Permissions::from_mode(mode))
                    {
                        tracing::warn!(
                            "Failed to set permissions on {}: {e}",
                            out_path.display()
                        );
                    }
                }
            }
        }
    }
    Ok(())
}

/// Read a single named entry out of an archive without extracting it.
pub fn read_entry(archive: &Path, name: &str) -> Result<Vec<u8>, AsboError> {
    let file = fs::File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| AsboError::Archive {
        message: format!("Failed to open {}: {e}", archive.display()),
    })?;
    let mut entry = zip.by_name(name).map_err(|e| AsboError::Archive {
        message: format!("No entry '{name}' in {}: {e}", archive.display()),
    })?;
    let mut data = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut data)?;
    Ok(data)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), AsboError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_extract_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = tmp.path().join("staging");
        fs::create_dir_all(staging.join("inc")).unwrap();
        fs::write(staging.join("asbo.toml"), "[package]\nname = \"x\"\n").unwrap();
        fs::write(staging.join("inc/header.h"), "#pragma once\n").unwrap();

        let archive = tmp.path().join("x.zip");
        create(&staging, &archive).unwrap();

        let dest = tmp.path().join("out");
        extract(&archive, &dest).unwrap();

        assert_eq!(
            fs::read(dest.join("asbo.toml")).unwrap(),
            fs::read(staging.join("asbo.toml")).unwrap()
        );
        assert_eq!(
            fs::read(dest.join("inc/header.h")).unwrap(),
            fs::read(staging.join("inc/header.h")).unwrap()
        );
    }

    #[test]
    fn read_entry_without_extracting() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = tmp.path().join("staging");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("asbo.toml"), "contents").unwrap();

        let archive = tmp.path().join("x.zip");
        create(&staging, &archive).unwrap();

        let data = read_entry(&archive, "asbo.toml").unwrap();
        assert_eq!(data, b"contents");
        assert!(read_entry(&archive, "missing").is_err());
    }

    #[test]
    fn extract_overwrites_existing_files() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = tmp.path().join("staging");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("f.txt"), "new").unwrap();

        let archive = tmp.path().join("x.zip");
        create(&staging, &archive).unwrap();

        let dest = tmp.path().join("out");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("f.txt"), "old").unwrap();
        extract(&archive, &dest).unwrap();
        assert_eq!(fs::read_to_string(dest.join("f.txt")).unwrap(), "new");
    }
}
