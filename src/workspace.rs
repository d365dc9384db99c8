use crate::error::{ProcessingError, Result};
use crate::models::ZoneSet;
use crate::readers::ZoneSource;
use crate::utils::constants::ZONES_FILE_NAME;
use crate::utils::filename::{export_dir_name, manifest_file_name};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;

/// Directory scaffolding for one run: a fresh export directory that holds
/// the persisted zones and per-class outputs, and a scratch directory for
/// manifests that is removed on drop.
pub struct Workspace {
    export_dir: PathBuf,
    scratch: TempDir,
    zone_path: Option<PathBuf>,
}

impl Workspace {
    /// Create `zonal_stats_{YYYYMMDD_HHMMSS}` under `export_root`, adding a
    /// numeric suffix when a directory of that name already exists.
    pub fn create(export_root: &Path) -> Result<Self> {
        fs::create_dir_all(export_root)?;
        let base = export_dir_name(Local::now());

        let mut export_dir = export_root.join(&base);
        let mut suffix = 1;
        loop {
            match fs::create_dir(&export_dir) {
                Ok(()) => break,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    export_dir = export_root.join(format!("{}_{}", base, suffix));
                    suffix += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let scratch = TempDir::new().map_err(|e| {
            ProcessingError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create scratch directory: {}", e),
            ))
        })?;

        info!("Export directory {}", export_dir.display());
        Ok(Self {
            export_dir,
            scratch,
            zone_path: None,
        })
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Write the run's zone set once; every image re-opens this file.
    pub fn persist_zones(&mut self, zones: &ZoneSet) -> Result<&Path> {
        let path = self.export_dir.join(ZONES_FILE_NAME);
        ZoneSource::persist(zones, &path)?;
        info!("Persisted {} zones to {}", zones.len(), path.display());
        Ok(self.zone_path.insert(path).as_path())
    }

    pub fn zone_path(&self) -> Result<&Path> {
        self.zone_path.as_deref().ok_or_else(|| {
            ProcessingError::Config("Zones have not been persisted for this run".to_string())
        })
    }

    pub fn manifest_path(&self, label: &str) -> PathBuf {
        self.scratch.path().join(manifest_file_name(label))
    }

    /// `export/{label}`, created if missing.
    pub fn class_output_dir(&self, label: &str) -> Result<PathBuf> {
        let dir = self.export_dir.join(label);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Zone, ZoneGeometry};
    use geo_types::Point;

    #[test]
    fn test_create_gives_distinct_export_dirs() {
        let root = TempDir::new().unwrap();
        let first = Workspace::create(root.path()).unwrap();
        let second = Workspace::create(root.path()).unwrap();

        assert_ne!(first.export_dir(), second.export_dir());
        assert!(first.export_dir().is_dir());
        assert!(second.export_dir().is_dir());
        let name = first.export_dir().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("zonal_stats_"));
    }

    #[test]
    fn test_scratch_removed_on_drop() {
        let root = TempDir::new().unwrap();
        let workspace = Workspace::create(root.path()).unwrap();
        let scratch = workspace.scratch_dir().to_path_buf();
        assert!(scratch.is_dir());
        drop(workspace);
        assert!(!scratch.exists());
    }

    #[test]
    fn test_persist_zones_and_class_dirs() {
        let root = TempDir::new().unwrap();
        let mut workspace = Workspace::create(root.path()).unwrap();
        assert!(workspace.zone_path().is_err());

        let zones = ZoneSet::new(vec![Zone::new(1, "A", ZoneGeometry::Point(Point::new(0.5, 0.5)))]).unwrap();
        let path = workspace.persist_zones(&zones).unwrap().to_path_buf();
        assert!(path.ends_with("all_sites_zones.geojson"));
        assert_eq!(ZoneSource::open(&path).unwrap(), zones);

        let out = workspace.class_output_dir("rain_rain_cor").unwrap();
        assert!(out.is_dir());
        assert!(workspace
            .manifest_path("rain_rain_cor")
            .ends_with("rain_rain_cor_image_list.csv"));
    }
}
