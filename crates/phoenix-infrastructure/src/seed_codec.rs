//! Seed package reading and writing.
//!
//! A package is a directory:
//!
//! ```text
//! <root>/<name>/
//! ├── seed.json      # SeedManifest
//! ├── README.md      # generated summary, never read back
//! └── blob/          # optional attachment files
//!     └── <blob_id>/<filename>
//! ```

use crate::paths::is_safe_segment;
use crate::storage::StagedFile;
use phoenix_core::blob::BlobReference;
use phoenix_core::seed::{BLOB_DIR, MANIFEST_FILE, README_FILE, SeedManifest};
use phoenix_core::world::CollectionKind;
use phoenix_core::{PhoenixError, Result};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// An attachment written into a package alongside its reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageAttachment {
    pub reference: BlobReference,
    pub bytes: Vec<u8>,
}

/// Stateless codec for seed packages.
pub struct SeedCodec;

impl SeedCodec {
    /// Writes a new package directory `<root>/<name>`.
    ///
    /// The package is assembled in a hidden sibling directory and renamed
    /// into place, so a failed write never leaves a half-built package.
    /// With `attachments` set, a `blob/` directory is created even when empty.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Root path of the new package
    /// - `Err(PhoenixError::Validation)`: Bad name or package already exists
    pub fn write_package(
        root: &Path,
        name: &str,
        manifest: &SeedManifest,
        attachments: Option<&[PackageAttachment]>,
    ) -> Result<PathBuf> {
        if !is_safe_segment(name) || name.starts_with('.') {
            return Err(PhoenixError::validation(format!(
                "'{}' is not a valid package name",
                name
            )));
        }
        let package = root.join(name);
        if package.exists() {
            return Err(PhoenixError::validation(format!(
                "package '{}' already exists",
                package.display()
            )));
        }

        let staging = root.join(format!(".{}.{}.partial", name, uuid::Uuid::new_v4().simple()));
        let result = Self::write_contents(&staging, manifest, attachments)
            .and_then(|()| fs::rename(&staging, &package).map_err(PhoenixError::from));
        if let Err(e) = result {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        tracing::info!(
            package = %package.display(),
            world_id = %manifest.world_id(),
            blobs = manifest.world.blobs.len(),
            "Wrote seed package"
        );
        Ok(package)
    }

    fn write_contents(
        dir: &Path,
        manifest: &SeedManifest,
        attachments: Option<&[PackageAttachment]>,
    ) -> Result<()> {
        fs::create_dir_all(dir)?;

        if let Some(attachments) = attachments {
            let blob_dir = dir.join(BLOB_DIR);
            fs::create_dir_all(&blob_dir)?;
            for attachment in attachments {
                let target = blob_dir.join(&attachment.reference.path);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&target, &attachment.bytes)?;
            }
        }

        let json = serde_json::to_vec_pretty(manifest)?;
        StagedFile::write(&dir.join(MANIFEST_FILE), &json)?.commit()?;
        fs::write(dir.join(README_FILE), render_readme(manifest))?;
        Ok(())
    }

    /// Reads and checks a package's manifest.
    ///
    /// Fails with `Structural` on a missing or malformed manifest, an empty
    /// world id or an incompatible format version.
    pub fn read_manifest(package: &Path) -> Result<SeedManifest> {
        let path = package.join(MANIFEST_FILE);
        if !path.is_file() {
            return Err(PhoenixError::structural(package, "seed.json is missing"));
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| PhoenixError::structural(&path, e.to_string()))?;
        let manifest: SeedManifest = serde_json::from_str(&content)
            .map_err(|e| PhoenixError::structural(&path, format!("malformed manifest: {}", e)))?;
        manifest.check(&path)?;
        Ok(manifest)
    }

    /// Checks a package without failing.
    ///
    /// The manifest must read cleanly and, when `blob/` exists, every
    /// listed attachment must be present. The first defect found is logged.
    pub fn validate(package: &Path) -> bool {
        let manifest = match Self::read_manifest(package) {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::warn!(package = %package.display(), error = %e, "Invalid seed package");
                return false;
            }
        };

        if Self::blob_dir(package).is_dir() {
            if let Some(blob) = manifest
                .world
                .blobs
                .iter()
                .find(|blob| !Self::blob_present(package, blob))
            {
                tracing::warn!(
                    package = %package.display(),
                    blob_id = %blob.id,
                    path = %blob.path,
                    "Seed package is missing an attachment file"
                );
                return false;
            }
        }
        true
    }

    /// Names of the packages under `root`, sorted.
    ///
    /// Directories without a readable manifest are skipped.
    pub fn list(root: &Path) -> Result<Vec<String>> {
        Ok(Self::scan_root(root)?
            .into_iter()
            .filter_map(|(name, valid)| valid.then_some(name))
            .collect())
    }

    /// Names of the directories under `root` whose manifest does not read.
    pub fn list_invalid(root: &Path) -> Result<Vec<String>> {
        Ok(Self::scan_root(root)?
            .into_iter()
            .filter_map(|(name, valid)| (!valid).then_some(name))
            .collect())
    }

    fn scan_root(root: &Path) -> Result<Vec<(String, bool)>> {
        if !root.is_dir() {
            return Ok(Vec::new());
        }
        let mut found = Vec::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || !entry.file_type()?.is_dir() {
                continue;
            }
            let valid = Self::read_manifest(&entry.path()).is_ok();
            found.push((name, valid));
        }
        found.sort();
        Ok(found)
    }

    pub fn blob_dir(package: &Path) -> PathBuf {
        package.join(BLOB_DIR)
    }

    pub fn blob_file(package: &Path, blob: &BlobReference) -> PathBuf {
        Self::blob_dir(package).join(&blob.path)
    }

    pub fn blob_present(package: &Path, blob: &BlobReference) -> bool {
        Self::blob_file(package, blob).is_file()
    }

    pub fn read_blob(package: &Path, blob: &BlobReference) -> Result<Vec<u8>> {
        let path = Self::blob_file(package, blob);
        if !path.is_file() {
            return Err(PhoenixError::not_found("attachment file", path.display().to_string()));
        }
        Ok(fs::read(path)?)
    }

    /// Attachment ids of files in `blob/` that the manifest does not list.
    ///
    /// A file at `blob/<id>/<name>` is reported as `<id>`; a file directly
    /// under `blob/` by its file name.
    pub fn unlisted_blob_ids(package: &Path, manifest: &SeedManifest) -> Result<BTreeSet<String>> {
        let blob_dir = Self::blob_dir(package);
        if !blob_dir.is_dir() {
            return Ok(BTreeSet::new());
        }
        let listed: BTreeSet<PathBuf> = manifest
            .world
            .blobs
            .iter()
            .map(|blob| normalize(Path::new(&blob.path)))
            .collect();

        let mut files = Vec::new();
        collect_files(&blob_dir, &blob_dir, &mut files)?;
        Ok(files
            .into_iter()
            .map(|relative| normalize(&relative))
            .filter(|relative| !listed.contains(relative))
            .filter_map(|relative| {
                relative
                    .components()
                    .next()
                    .map(|c| c.as_os_str().to_string_lossy().to_string())
            })
            .collect())
    }
}

/// Drops `.` components so `./a/b` and `a/b` compare equal.
fn normalize(relative: &Path) -> PathBuf {
    relative
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

fn collect_files(base: &Path, dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_files(base, &path, files)?;
        } else if let Ok(relative) = path.strip_prefix(base) {
            files.push(relative.to_path_buf());
        }
    }
    Ok(())
}

/// Human-readable summary written next to the manifest.
pub fn render_readme(manifest: &SeedManifest) -> String {
    let metadata = &manifest.world.metadata;
    let mut out = String::new();
    let _ = writeln!(out, "# Seed: {}", metadata.name);
    let _ = writeln!(out);
    if !metadata.description.is_empty() {
        let _ = writeln!(out, "{}", metadata.description);
        let _ = writeln!(out);
    }
    let _ = writeln!(out, "- World ID: `{}`", metadata.id);
    let _ = writeln!(out, "- Source environment: {}", manifest.source.environment);
    if let Some(url) = &manifest.source.database_url {
        let _ = writeln!(out, "- Source database: {}", url);
    }
    let _ = writeln!(out, "- Created: {}", manifest.created_at.to_rfc3339());
    let _ = writeln!(out, "- Format version: {}", manifest.version);
    if !metadata.tags.is_empty() {
        let tags: Vec<&str> = metadata.tags.iter().map(String::as_str).collect();
        let _ = writeln!(out, "- Tags: {}", tags.join(", "));
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Contents");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Collection | Records |");
    let _ = writeln!(out, "|---|---|");
    for kind in CollectionKind::ALL {
        let _ = writeln!(out, "| {} | {} |", kind, manifest.collection(kind).len());
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Attachments");
    let _ = writeln!(out);
    if manifest.world.blobs.is_empty() {
        let _ = writeln!(out, "None.");
    } else {
        let _ = writeln!(out, "| ID | File | Type | Size |");
        let _ = writeln!(out, "|---|---|---|---|");
        for blob in &manifest.world.blobs {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                blob.id, blob.filename, blob.content_type, blob.size
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use phoenix_core::Environment;
    use phoenix_core::world::{World, WorldMetadata};
    use serde_json::json;
    use tempfile::TempDir;

    fn attachment(id: &str) -> PackageAttachment {
        PackageAttachment {
            reference: BlobReference {
                id: id.into(),
                filename: "notes.txt".into(),
                content_type: "text/plain".into(),
                size: 5,
                path: BlobReference::package_path(id, "notes.txt"),
                owner_id: Some("a1".into()),
            },
            bytes: b"hello".to_vec(),
        }
    }

    fn manifest(blobs: Vec<BlobReference>) -> SeedManifest {
        let mut world = World::new(WorldMetadata::new("w1", "Demo world", Environment::Beta));
        world.artifacts.push(json!({"id": "a1"}).as_object().cloned().unwrap());
        SeedManifest::new(world, blobs, None, Utc::now())
    }

    #[test]
    fn test_write_then_read_package() {
        let temp_dir = TempDir::new().unwrap();
        let attachments = vec![attachment("blob-0001")];
        let manifest = manifest(vec![attachments[0].reference.clone()]);

        let package = SeedCodec::write_package(
            temp_dir.path(),
            "w1_pkg",
            &manifest,
            Some(attachments.as_slice()),
        )
        .unwrap();

        assert_eq!(SeedCodec::read_manifest(&package).unwrap(), manifest);
        assert!(SeedCodec::validate(&package));
        assert!(package.join("README.md").exists());
        assert_eq!(
            SeedCodec::read_blob(&package, &attachments[0].reference).unwrap(),
            b"hello".to_vec()
        );
    }

    #[test]
    fn test_existing_package_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let manifest = manifest(Vec::new());
        SeedCodec::write_package(temp_dir.path(), "p", &manifest, None).unwrap();
        let err = SeedCodec::write_package(temp_dir.path(), "p", &manifest, None).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_missing_attachment_invalidates_package() {
        let temp_dir = TempDir::new().unwrap();
        let listed = attachment("blob-0001").reference;
        let package =
            SeedCodec::write_package(temp_dir.path(), "p", &manifest(vec![listed]), Some(&[][..]))
                .unwrap();
        assert!(!SeedCodec::validate(&package));
    }

    #[test]
    fn test_absent_blob_dir_is_still_valid() {
        let temp_dir = TempDir::new().unwrap();
        let listed = attachment("blob-0001").reference;
        let package =
            SeedCodec::write_package(temp_dir.path(), "p", &manifest(vec![listed]), None).unwrap();
        assert!(SeedCodec::validate(&package));
    }

    #[test]
    fn test_read_manifest_errors_are_structural() {
        let temp_dir = TempDir::new().unwrap();
        let package = temp_dir.path().join("broken");
        fs::create_dir_all(&package).unwrap();
        assert!(SeedCodec::read_manifest(&package).unwrap_err().is_structural());

        fs::write(package.join(MANIFEST_FILE), "{\"version\": \"1.0.0\"}").unwrap();
        assert!(SeedCodec::read_manifest(&package).unwrap_err().is_structural());
        assert!(!SeedCodec::validate(&package));
    }

    #[test]
    fn test_list_skips_directories_without_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let manifest = manifest(Vec::new());
        SeedCodec::write_package(temp_dir.path(), "b_pkg", &manifest, None).unwrap();
        SeedCodec::write_package(temp_dir.path(), "a_pkg", &manifest, None).unwrap();
        fs::create_dir_all(temp_dir.path().join("empty")).unwrap();
        fs::write(temp_dir.path().join("stray.txt"), "x").unwrap();

        assert_eq!(SeedCodec::list(temp_dir.path()).unwrap(), vec!["a_pkg", "b_pkg"]);
        assert_eq!(SeedCodec::list_invalid(temp_dir.path()).unwrap(), vec!["empty"]);
        assert!(SeedCodec::list(&temp_dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_unlisted_blob_ids() {
        let temp_dir = TempDir::new().unwrap();
        let attachments = vec![attachment("blob-0001"), attachment("blob-0002")];
        let manifest = manifest(vec![attachments[0].reference.clone()]);
        let package =
            SeedCodec::write_package(temp_dir.path(), "p", &manifest, Some(attachments.as_slice()))
                .unwrap();

        assert_eq!(
            SeedCodec::unlisted_blob_ids(&package, &manifest).unwrap(),
            BTreeSet::from(["blob-0002".to_string()])
        );
    }

    #[test]
    fn test_listed_path_with_current_dir_prefix_is_not_unlisted() {
        let temp_dir = TempDir::new().unwrap();
        let mut owned = attachment("blob-owned-01");
        owned.reference.path = "./blob-owned-01/notes.txt".into();
        let manifest = manifest(vec![owned.reference.clone()]);
        let package =
            SeedCodec::write_package(temp_dir.path(), "p", &manifest, Some(&[owned][..])).unwrap();

        assert!(SeedCodec::validate(&package));
        assert!(SeedCodec::unlisted_blob_ids(&package, &manifest).unwrap().is_empty());
    }

    #[test]
    fn test_readme_summarizes_package() {
        let readme = render_readme(&manifest(vec![attachment("blob-0001").reference]));
        assert!(readme.contains("# Seed: Demo world"));
        assert!(readme.contains("| artifacts | 1 |"));
        assert!(readme.contains("| blob-0001 | notes.txt | text/plain | 5 |"));
    }
}
