//! Recipe store — loads, merges, and caches recipe documents
//!
//! A recipe name resolves to `<base>/<name>.{yaml,yml,json}` plus an
//! optional override document of the same relative path under the
//! override directory. The merged result is cached per name for the
//! lifetime of the process; the cache is the only state shared between
//! concurrent assembly calls.

use super::merge::deep_merge;
use super::types::{Recipe, RecipeMeta};
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Document extensions tried in order when resolving a recipe name
const EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Errors from loading recipe documents
#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("recipe not found: {0}")]
    NotFound(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Loads and caches merged recipe documents.
///
/// Concurrent first-time loads of the same name may redundantly read the
/// same files; the first to publish wins and later loads converge on the
/// cached value, which is identical content anyway.
pub struct RecipeStore {
    base_dir: PathBuf,
    override_dir: Option<PathBuf>,
    cache: DashMap<String, Arc<Recipe>>,
}

impl RecipeStore {
    /// Create a store over a base recipe directory
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            override_dir: None,
            cache: DashMap::new(),
        }
    }

    /// Set the override directory (e.g. the user's custom recipe dir)
    pub fn with_override_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.override_dir = Some(dir.into());
        self
    }

    /// Load a recipe by name, returning the cached merged document when
    /// one exists.
    ///
    /// A missing base document is an error; a missing override document
    /// is not (treated as empty).
    pub fn load(&self, name: &str) -> Result<Arc<Recipe>, RecipeError> {
        if let Some(cached) = self.cache.get(name) {
            return Ok(cached.clone());
        }

        // Names are relative paths; refuse anything that escapes the
        // recipe directories.
        if name.split('/').any(|part| part == "..") || name.starts_with('/') {
            return Err(RecipeError::NotFound(name.to_string()));
        }

        let base_path = resolve(&self.base_dir, name)
            .ok_or_else(|| RecipeError::NotFound(name.to_string()))?;
        let mut document = read_document(&base_path)?;

        let mut overridden = false;
        if let Some(override_path) = self
            .override_dir
            .as_ref()
            .and_then(|dir| resolve(dir, name))
        {
            let overlay = read_document(&override_path)?;
            deep_merge(&mut document, overlay);
            overridden = true;
        }

        let mut recipe: Recipe =
            serde_json::from_value(document).map_err(|e| RecipeError::Parse {
                path: base_path.clone(),
                message: e.to_string(),
            })?;
        recipe.name = name.to_string();
        recipe.meta = RecipeMeta {
            path: base_path,
            overridden,
            loaded_at: Some(Utc::now()),
        };

        debug!(recipe = name, overridden, "loaded recipe");

        // First writer wins; a racing load of the same name converges on
        // whichever copy got published.
        let entry = self
            .cache
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(recipe));
        Ok(entry.clone())
    }

    /// Recipe names available on disk, from both directories, sorted
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        names.extend(scan(&self.base_dir));
        if let Some(dir) = &self.override_dir {
            names.extend(scan(dir));
        }
        names.sort();
        names.dedup();
        names
    }

    /// Number of cached recipes
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}

/// Resolve a recipe name to an existing document path under `dir`
fn resolve(dir: &Path, name: &str) -> Option<PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", name, ext)))
        .find(|path| path.is_file())
}

/// Read and parse one document to a JSON value, by extension
fn read_document(path: &Path) -> Result<Value, RecipeError> {
    let text = std::fs::read_to_string(path).map_err(|source| RecipeError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::from_str(&text).map_err(|e| RecipeError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    } else {
        // YAML documents go through serde_yaml, then over to JSON values
        // so merging and parsing share one representation.
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(&text).map_err(|e| RecipeError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        serde_json::to_value(yaml).map_err(|e| RecipeError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Collect recipe names (relative paths, extension stripped) under `dir`
fn scan(dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let has_recipe_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| EXTENSIONS.contains(&ext))
            .unwrap_or(false);
        if !has_recipe_ext {
            continue;
        }
        if let Ok(rel) = path.strip_prefix(dir) {
            let name = rel.with_extension("");
            names.push(name.to_string_lossy().replace('\\', "/"));
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const BASE_RECIPE: &str = r#"
nodes:
  loader:
    op: ImageLoader
    inputs:
      path: ${image}
  saver:
    op: ImageSave
    inputs:
      image: {from: loader}
"#;

    fn store_with(base: &str) -> (tempfile::TempDir, RecipeStore) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("basic.yaml"), base).unwrap();
        let store = RecipeStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_load_parses_base_document() {
        let (_dir, store) = store_with(BASE_RECIPE);
        let recipe = store.load("basic").unwrap();
        assert_eq!(recipe.name, "basic");
        assert_eq!(recipe.nodes.len(), 2);
        assert!(!recipe.meta.overridden);
        assert!(recipe.meta.loaded_at.is_some());
    }

    #[test]
    fn test_missing_base_is_not_found() {
        let (_dir, store) = store_with(BASE_RECIPE);
        match store.load("nope") {
            Err(RecipeError::NotFound(name)) => assert_eq!(name, "nope"),
            other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_override_merges_over_base() {
        let base_dir = tempfile::tempdir().unwrap();
        let override_dir = tempfile::tempdir().unwrap();
        fs::write(base_dir.path().join("basic.yaml"), BASE_RECIPE).unwrap();
        fs::write(
            override_dir.path().join("basic.yaml"),
            "nodes:\n  saver:\n    op: WebpSave\n",
        )
        .unwrap();

        let store =
            RecipeStore::new(base_dir.path()).with_override_dir(override_dir.path());
        let recipe = store.load("basic").unwrap();

        assert!(recipe.meta.overridden);
        assert_eq!(recipe.nodes["saver"].op, "WebpSave");
        // Untouched sibling keys survive the merge
        assert_eq!(recipe.nodes["loader"].op, "ImageLoader");
    }

    #[test]
    fn test_missing_override_is_not_an_error() {
        let base_dir = tempfile::tempdir().unwrap();
        let override_dir = tempfile::tempdir().unwrap();
        fs::write(base_dir.path().join("basic.yaml"), BASE_RECIPE).unwrap();

        let store =
            RecipeStore::new(base_dir.path()).with_override_dir(override_dir.path());
        let recipe = store.load("basic").unwrap();
        assert!(!recipe.meta.overridden);
    }

    #[test]
    fn test_second_load_hits_cache_without_io() {
        let (dir, store) = store_with(BASE_RECIPE);
        let first = store.load("basic").unwrap();

        // Remove the file; a cache hit must not touch the disk.
        fs::remove_file(dir.path().join("basic.yaml")).unwrap();
        let second = store.load("basic").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
        assert_eq!(store.cached_count(), 1);
    }

    #[test]
    fn test_json_documents_supported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("j.json"),
            r#"{"nodes": {"loader": {"op": "ImageLoader"}}}"#,
        )
        .unwrap();
        let store = RecipeStore::new(dir.path());
        assert_eq!(store.load("j").unwrap().nodes["loader"].op, "ImageLoader");
    }

    #[test]
    fn test_nested_names_and_available() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("video")).unwrap();
        fs::write(dir.path().join("basic.yaml"), BASE_RECIPE).unwrap();
        fs::write(dir.path().join("video/extend.yaml"), BASE_RECIPE).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a recipe").unwrap();

        let store = RecipeStore::new(dir.path());
        assert_eq!(store.available(), vec!["basic", "video/extend"]);
        assert!(store.load("video/extend").is_ok());
    }

    #[test]
    fn test_path_escape_rejected() {
        let (_dir, store) = store_with(BASE_RECIPE);
        assert!(matches!(
            store.load("../basic"),
            Err(RecipeError::NotFound(_))
        ));
    }

    #[test]
    fn test_concurrent_first_loads_converge() {
        let (_dir, store) = store_with(BASE_RECIPE);
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.load("basic").unwrap())
            })
            .collect();

        let loaded: Vec<Arc<Recipe>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        // Everyone observes the single published copy.
        assert_eq!(store.cached_count(), 1);
        let canonical = store.load("basic").unwrap();
        for recipe in loaded {
            assert_eq!(*recipe, *canonical);
        }
    }
}
