//! Assets - Validating and staging a pak folder.
//!
//! A pak folder holds the media a session plays:
//!
//! ```text
//! pak/
//! ├── tracks/        music
//! ├── sfx/           short effects
//! ├── interrupts/    voice-overs
//! ├── metadata.json
//! ├── cover.png      (or cover.gif)
//! ├── intro.mp3
//! └── README.md
//! ```
//!
//! Anything else at the top level makes the folder invalid. Hidden files
//! (`.something`, `.DS_Store`) are ignored everywhere.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Track,
    Sfx,
    Interrupt,
    Metadata,
    Cover,
    Intro,
    Readme,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub kind: AssetKind,
    pub path: PathBuf,
}

/// A folder layout the engine knows how to check and stage.
pub trait AssetBundle {
    /// Fail with [`EngineError::Asset`] describing the first offending entry.
    fn validate(&self, dir: &Path) -> Result<()>;

    /// Every asset in a valid folder, in play order.
    fn list_assets(&self, dir: &Path) -> Result<Vec<Asset>>;

    /// Copy a valid folder's assets under `dest`, keeping their relative
    /// paths. Returns the staged assets.
    fn package_into(&self, dir: &Path, dest: &Path) -> Result<Vec<Asset>> {
        let mut staged = Vec::new();
        for asset in self.list_assets(dir)? {
            let relative = asset
                .path
                .strip_prefix(dir)
                .map_err(|_| EngineError::asset(&asset.path, "asset is outside its folder"))?;
            let target = dest.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&asset.path, &target)?;
            staged.push(Asset {
                kind: asset.kind,
                path: target,
            });
        }
        debug!(count = staged.len(), dest = %dest.display(), "assets staged");
        Ok(staged)
    }
}

/// The standard pak folder layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct PakLayout;

const SUBFOLDERS: [(&str, AssetKind); 3] = [
    ("tracks", AssetKind::Track),
    ("sfx", AssetKind::Sfx),
    ("interrupts", AssetKind::Interrupt),
];

const FILES: [(&str, &[&str], AssetKind); 4] = [
    ("metadata", &["json"], AssetKind::Metadata),
    ("cover", &["png", "gif"], AssetKind::Cover),
    ("intro", &["mp3"], AssetKind::Intro),
    ("README", &["md"], AssetKind::Readme),
];

pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.') || name.contains(".DS_Store"))
}

fn stem_and_extension(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    (stem, extension)
}

fn file_kind(path: &Path) -> Option<AssetKind> {
    let (stem, extension) = stem_and_extension(path);
    FILES
        .iter()
        .find(|(name, extensions, _)| *name == stem && extensions.contains(&extension.as_str()))
        .map(|(_, _, kind)| *kind)
}

/// Visible entries of `dir`, sorted by path.
fn visible_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !is_hidden(&path) {
            entries.push(path);
        }
    }
    entries.sort();
    Ok(entries)
}

impl AssetBundle for PakLayout {
    fn validate(&self, dir: &Path) -> Result<()> {
        if !dir.is_dir() {
            return Err(EngineError::asset(dir, "not a directory"));
        }
        for path in visible_entries(dir)? {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if path.is_dir() {
                if !SUBFOLDERS.iter().any(|(folder, _)| *folder == name) {
                    return Err(EngineError::asset(
                        dir,
                        format!("subfolder \"{name}\" is not allowed"),
                    ));
                }
            } else if file_kind(&path).is_none() {
                let (stem, extension) = stem_and_extension(&path);
                return Err(EngineError::asset(
                    dir,
                    format!("file extension \".{extension}\" is not allowed in file \"{stem}\""),
                ));
            }
        }
        Ok(())
    }

    fn list_assets(&self, dir: &Path) -> Result<Vec<Asset>> {
        self.validate(dir)?;

        let mut assets = Vec::new();
        for (folder, kind) in SUBFOLDERS {
            let sub = dir.join(folder);
            if !sub.is_dir() {
                continue;
            }
            for path in visible_entries(&sub)? {
                if path.is_file() {
                    assets.push(Asset { kind, path });
                }
            }
        }

        let mut files: Vec<Asset> = visible_entries(dir)?
            .into_iter()
            .filter(|path| path.is_file())
            .filter_map(|path| file_kind(&path).map(|kind| Asset { kind, path }))
            .collect();
        files.sort_by_key(|asset| FILES.iter().position(|(_, _, kind)| *kind == asset.kind));
        assets.extend(files);
        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn pak(files: &[&str]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, b"x").unwrap();
        }
        dir
    }

    fn kinds(assets: &[Asset]) -> Vec<AssetKind> {
        assets.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn test_valid_pak() {
        let dir = pak(&[
            "tracks/b.mp3",
            "tracks/a.mp3",
            "sfx/ding.wav",
            "metadata.json",
            "cover.GIF",
            "README.md",
            ".DS_Store",
            "tracks/.hidden",
        ]);
        let assets = PakLayout.list_assets(dir.path()).unwrap();
        assert_eq!(
            kinds(&assets),
            vec![
                AssetKind::Track,
                AssetKind::Track,
                AssetKind::Sfx,
                AssetKind::Metadata,
                AssetKind::Cover,
                AssetKind::Readme,
            ]
        );
        assert!(assets[0].path.ends_with("tracks/a.mp3"));
    }

    #[test]
    fn test_unknown_subfolder_rejected() {
        let dir = pak(&["videos/clip.mp4"]);
        let err = PakLayout.validate(dir.path()).unwrap_err();
        assert!(err.to_string().contains("subfolder \"videos\" is not allowed"));
    }

    #[test]
    fn test_wrong_extension_rejected() {
        let dir = pak(&["cover.jpg"]);
        let err = PakLayout.validate(dir.path()).unwrap_err();
        assert!(err.to_string().contains("\".jpg\" is not allowed in file \"cover\""));
    }

    #[test]
    fn test_missing_folder_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(PakLayout.validate(&missing), Err(EngineError::Asset { .. })));
    }

    #[test]
    fn test_package_into_copies_layout() {
        let src = pak(&["tracks/a.mp3", "intro.mp3"]);
        let dest = tempfile::tempdir().unwrap();
        let staged = PakLayout.package_into(src.path(), dest.path()).unwrap();

        assert_eq!(staged.len(), 2);
        assert!(dest.path().join("tracks/a.mp3").is_file());
        assert!(dest.path().join("intro.mp3").is_file());
        assert!(staged.iter().all(|a| a.path.starts_with(dest.path())));
    }
}
