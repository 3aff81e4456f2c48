//! Scratch directories laid out like a deployment.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use poster_common::PosterSettings;

/// Temporary root with `cache/`, `themes/` and `posters/` inside. Removed
/// on drop.
pub struct TestWorkspace {
    root: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        for dir in ["cache", "themes", "posters"] {
            fs::create_dir_all(root.path().join(dir)).expect("create workspace dir");
        }
        Self { root }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root().join("cache")
    }

    pub fn themes_dir(&self) -> PathBuf {
        self.root().join("themes")
    }

    pub fn posters_dir(&self) -> PathBuf {
        self.root().join("posters")
    }

    /// Write `themes/{id}.json`.
    pub fn write_theme(&self, id: &str, json: &str) -> PathBuf {
        let path = self.themes_dir().join(format!("{}.json", id));
        fs::write(&path, json).expect("write theme");
        path
    }

    /// Default settings pointed at this workspace, with no land dataset
    /// and no font directory.
    pub fn settings(&self) -> PosterSettings {
        PosterSettings {
            cache_dir: self.cache_dir(),
            themes_dir: self.themes_dir(),
            posters_dir: self.posters_dir(),
            land_polygons_path: self.root().join("missing/land_polygons.shp"),
            font_dir: None,
            ..PosterSettings::default()
        }
    }

    /// Files currently in `posters/`, sorted.
    pub fn posters(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(self.posters_dir())
            .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default();
        files.sort();
        files
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let ws = TestWorkspace::new();
        assert!(ws.cache_dir().is_dir());
        assert!(ws.posters().is_empty());

        let path = ws.write_theme("noir", crate::fixtures::themes::NOIR);
        assert!(path.ends_with("themes/noir.json"));
        assert_eq!(ws.settings().themes_dir, ws.themes_dir());
    }
}
