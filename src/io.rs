//! File input and output
//!
//! Loads descriptor modules and descriptors from JSON, writes built
//! documents to disk and reads SBML files back. [`build_in_tempdir`] runs
//! a complete build, write and reload cycle inside a temporary directory.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;

use crate::builder::{build_document, build_from_modules, BuildOptions, BuildResult};
use crate::comp::CompositionError;
use crate::descriptor::ModelDescriptor;
use crate::error::{BuildError, BuildFailure};
use crate::preprocess::DescriptorModule;
use crate::sbml::{read_sbml_file, write_sbml_file, SBMLError, SbmlDocument};

/// Loads descriptor modules from JSON files, keeping their order.
///
/// # Arguments
///
/// * `paths` - Paths of JSON files, each holding one module object
///
/// # Returns
///
/// Returns the modules in the order of `paths`.
pub fn load_modules<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<DescriptorModule>, IOError> {
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            if !path.is_file() {
                return Err(IOError::FileNotFound(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    path.display().to_string(),
                )));
            }
            log::debug!("Loading descriptor module {}", path.display());
            Ok(DescriptorModule::from_file(path)?)
        })
        .collect()
}

/// Loads a complete model descriptor from a JSON file.
pub fn load_descriptor(path: impl Into<PathBuf>) -> Result<ModelDescriptor, IOError> {
    let path = path.into();
    let file = std::fs::File::open(path).map_err(IOError::FileNotFound)?;
    serde_json::from_reader(file).map_err(IOError::JsonParseError)
}

/// Saves a model descriptor as pretty-printed JSON.
pub fn save_descriptor(
    path: impl Into<PathBuf>,
    descriptor: &ModelDescriptor,
) -> Result<(), IOError> {
    let path = path.into();
    let file = std::fs::File::create(path).map_err(IOError::FileNotFound)?;
    serde_json::to_writer_pretty(file, descriptor).map_err(IOError::JsonParseError)
}

/// Builds the merged modules and writes the document to `out`.
///
/// # Arguments
///
/// * `paths` - Descriptor module files, merged in order
/// * `options` - Build options
/// * `out` - Path of the SBML file to write
pub fn build_files<P: AsRef<Path>>(
    paths: &[P],
    options: &BuildOptions,
    out: impl AsRef<Path>,
) -> Result<BuildResult, IOError> {
    let modules = load_modules(paths)?;
    let result = build_from_modules(&modules, options)?;
    write_sbml_file(&result.document, out.as_ref())?;
    log::info!("SBML written to {}", out.as_ref().display());
    Ok(result)
}

/// A document built inside a temporary directory. The directory and the
/// written file are removed when this value is dropped.
#[derive(Debug)]
pub struct TempBuild {
    dir: TempDir,
    /// Path of the written SBML file
    pub path: PathBuf,
    /// Result of the build
    pub result: BuildResult,
    /// The document read back from `path`
    pub reloaded: SbmlDocument,
}

impl TempBuild {
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Builds a descriptor, writes it into a fresh temporary directory and
/// reads it back.
///
/// # Arguments
///
/// * `descriptor` - The model to build
/// * `options` - Build options
///
/// # Returns
///
/// Returns a [`TempBuild`] owning the temporary directory.
pub fn build_in_tempdir(
    descriptor: &ModelDescriptor,
    options: &BuildOptions,
) -> Result<TempBuild, IOError> {
    let dir = tempfile::Builder::new().prefix("sbmlutils").tempdir()?;
    let result = build_document(descriptor, options)?;

    let model_id = result
        .document
        .model
        .as_ref()
        .map(|m| m.sbase.id().to_string())
        .unwrap_or_else(|| descriptor.mid.clone());
    let path = dir.path().join(format!("{model_id}.xml"));
    write_sbml_file(&result.document, &path)?;
    let reloaded = read_sbml_file(&path)?;
    log::debug!("Test build of '{model_id}' in {}", dir.path().display());

    Ok(TempBuild {
        dir,
        path,
        result,
        reloaded,
    })
}

/// Errors of file based operations.
#[derive(Error, Debug)]
pub enum IOError {
    #[error("File not found: {0}")]
    FileNotFound(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error(transparent)]
    Descriptor(#[from] BuildError),

    #[error(transparent)]
    Build(#[from] BuildFailure),

    #[error(transparent)]
    Sbml(#[from] SBMLError),

    #[error(transparent)]
    Composition(#[from] CompositionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BuildOptionsBuilder;
    use crate::models::mass_action;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_in_tempdir_reloads_document() {
        let options = BuildOptionsBuilder::default().validate(false).build().unwrap();
        let build = build_in_tempdir(&mass_action(), &options).unwrap();
        assert!(build.path.ends_with("mass_action.xml"));
        let original = build.result.document.model.as_ref().unwrap();
        let reloaded = build.reloaded.model.as_ref().unwrap();
        assert_eq!(reloaded.sbase.id(), "mass_action");
        assert_eq!(reloaded.species, original.species);
        assert_eq!(reloaded.rules.len(), original.rules.len());
    }

    #[test]
    fn test_tempdir_removed_on_drop() {
        let build = build_in_tempdir(&mass_action(), &BuildOptions::default()).unwrap();
        let dir = build.dir().to_path_buf();
        assert!(dir.exists());
        drop(build);
        assert!(!dir.exists());
    }

    #[test]
    fn test_build_files_merges_modules() {
        let dir = tempfile::tempdir().unwrap();
        let core = dir.path().join("core.json");
        let extra = dir.path().join("extra.json");
        std::fs::write(
            &core,
            r#"{"mid": "merged", "compartments": [{"sid": "c", "value": 1.0}]}"#,
        )
        .unwrap();
        std::fs::write(&extra, r#"{"parameters": [{"sid": "k", "value": 2.0}]}"#).unwrap();

        let out = dir.path().join("merged.xml");
        let result = build_files(&[core, extra], &BuildOptions::default(), &out).unwrap();
        let model = result.document.model.unwrap();
        assert_eq!(model.sbase.id(), "merged");
        assert!(model.parameter("k").is_some());
        assert!(out.exists());
    }

    #[test]
    fn test_missing_module_file() {
        let result = load_modules(&["does/not/exist.json"]);
        assert!(matches!(result, Err(IOError::FileNotFound(_))));
    }

    #[test]
    fn test_descriptor_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mass_action.json");
        save_descriptor(&path, &mass_action()).unwrap();
        assert_eq!(load_descriptor(&path).unwrap(), mass_action());
    }
}
