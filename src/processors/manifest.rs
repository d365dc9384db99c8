use crate::error::{ProcessingError, Result};
use crate::utils::filename::{has_extension, walk_tree};
use csv::{ReaderBuilder, WriterBuilder};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Ordered image paths for one class run, in directory-walk order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    paths: Vec<PathBuf>,
}

impl Manifest {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// One path per line, no header.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
        for image in &self.paths {
            writer.write_record([image.to_string_lossy().as_ref()])?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(false)
            .from_path(path)?;

        let mut paths = Vec::new();
        for record in reader.records() {
            let record = record?;
            let image = record.get(0).ok_or_else(|| {
                ProcessingError::InvalidFormat(format!("Empty manifest line in {}", path.display()))
            })?;
            paths.push(PathBuf::from(image));
        }
        Ok(Self { paths })
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

pub struct ManifestBuilder {
    extension: String,
}

impl ManifestBuilder {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }

    /// Every file under `directory` whose name ends with the extension, as
    /// absolute paths. Not sorted by date.
    pub fn build(&self, directory: &Path) -> Result<Manifest> {
        let directory = directory.canonicalize()?;
        let paths: Vec<PathBuf> = walk_tree(&directory)?
            .into_iter()
            .flat_map(|entry| entry.files)
            .filter(|file| has_extension(file, &self.extension))
            .collect();

        debug!(
            "Manifest for {} holds {} images",
            directory.display(),
            paths.len()
        );
        Ok(Manifest::new(paths))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_build_is_recursive_and_filters_extension() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        for name in ["a_202001cor.tif", "b_202002cor.tif", "notes.txt", "nested/c_202003cor.tif"] {
            fs::write(root.join(name), b"").unwrap();
        }

        let manifest = ManifestBuilder::new(".tif").build(root).unwrap();
        assert_eq!(manifest.len(), 3);
        assert!(manifest.paths().iter().all(|p| p.is_absolute()));
        assert!(manifest.paths()[2].ends_with("nested/c_202003cor.tif"));
    }

    #[test]
    fn test_write_then_read_keeps_order() {
        let dir = TempDir::new().unwrap();
        let manifest = Manifest::new(vec![
            PathBuf::from("/data/rain, monthly/b.tif"),
            PathBuf::from("/data/rain/a.tif"),
        ]);
        let path = dir.path().join("rain_cor_image_list.csv");
        manifest.write(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().nth(1), Some("/data/rain/a.tif"));
        assert_eq!(Manifest::read(&path).unwrap(), manifest);
    }

    #[test]
    fn test_empty_directory_gives_empty_manifest() {
        let dir = TempDir::new().unwrap();
        assert!(ManifestBuilder::new(".tif").build(dir.path()).unwrap().is_empty());
    }
}
