use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{info, warn};

/// The `.obj` files found in a flat asset folder
///
/// The folder is created if missing and rescanned on a fixed interval of
/// update time.
#[derive(Debug)]
pub struct AssetLibrary {
    root: PathBuf,
    files: Vec<PathBuf>,
    rescan_interval: f64,
    since_scan: f64,
}

impl AssetLibrary {
    pub fn new(root: impl Into<PathBuf>, rescan_interval: f64) -> Self {
        let root = root.into();
        if !root.exists() {
            match fs::create_dir_all(&root) {
                Ok(()) => info!("Created asset folder {}", root.display()),
                Err(err) => warn!("Could not create asset folder {}: {}", root.display(), err),
            }
        }

        let mut library = Self {
            root,
            files: Vec::new(),
            rescan_interval,
            since_scan: 0.0,
        };
        library.rescan();
        library
    }

    /// Advances the rescan timer, rescanning when it elapses
    pub fn update(&mut self, dt: f64) {
        self.since_scan += dt;
        if self.since_scan >= self.rescan_interval {
            self.since_scan = 0.0;
            self.rescan();
        }
    }

    pub fn rescan(&mut self) {
        self.files = scan_obj_files(&self.root);
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

/// Regular files directly in `root` with a case-insensitive `.obj` extension, sorted
pub fn scan_obj_files(root: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("Could not scan asset folder {}: {}", root.display(), err);
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .map(|entry| entry.path())
        .filter(|path| is_obj(path))
        .collect();
    files.sort();
    files
}

fn is_obj(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("obj"))
}
