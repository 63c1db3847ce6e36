//! Schema resolution: `.proto` files to message descriptors
//!
//! A [`SchemaRef`] names a schema file and a message type inside it. Loading
//! goes through a [`SchemaLoader`]; the default [`FileSchemaLoader`] parses the
//! file from disk on every call, [`CachedSchemaLoader`] keeps parsed pools in
//! memory until the caller invalidates them.

use crate::error::{GbufError, Result};
use parking_lot::RwLock;
use prost_reflect::{DescriptorPool, MessageDescriptor};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A schema file path plus the name of a message type declared in it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaRef {
    /// Path to the `.proto` file
    pub path: PathBuf,
    /// Message type name, either fully qualified (`pkg.Message`) or short (`Message`)
    pub message: String,
}

impl SchemaRef {
    /// Create a schema reference
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.path.display(), self.message)
    }
}

/// Turns a schema file path into a descriptor pool.
///
/// Implementations are called from the blocking thread pool.
pub trait SchemaLoader: Send + Sync + fmt::Debug {
    /// Load and parse the schema at `path`
    ///
    /// # Errors
    ///
    /// Returns [`GbufError::SchemaLoad`] if the file cannot be read or parsed.
    fn load(&self, path: &Path) -> Result<DescriptorPool>;
}

/// Parses `.proto` files straight from disk, every time
#[derive(Debug, Clone, Default)]
pub struct FileSchemaLoader {
    include_paths: Vec<PathBuf>,
}

impl FileSchemaLoader {
    /// Loader that resolves imports relative to the schema file only
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader that also searches `include_paths` for imports
    pub fn with_include_paths(include_paths: Vec<PathBuf>) -> Self {
        Self { include_paths }
    }
}

impl SchemaLoader for FileSchemaLoader {
    fn load(&self, path: &Path) -> Result<DescriptorPool> {
        // The schema's own directory goes first so the file maps to its bare name.
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let includes = std::iter::once(parent).chain(self.include_paths.iter().cloned());

        let mut compiler =
            protox::Compiler::new(includes).map_err(|e| GbufError::schema_load(path, e))?;
        let _ = compiler.include_imports(true);
        let _ = compiler
            .open_file(path)
            .map_err(|e| GbufError::schema_load(path, e))?;

        let pool = compiler.descriptor_pool();
        debug!(
            schema = %path.display(),
            messages = pool.all_messages().count(),
            "parsed schema"
        );
        Ok(pool)
    }
}

/// Keeps parsed schemas keyed by path, in front of another loader
#[derive(Debug)]
pub struct CachedSchemaLoader {
    inner: Arc<dyn SchemaLoader>,
    pools: RwLock<HashMap<PathBuf, DescriptorPool>>,
}

impl CachedSchemaLoader {
    /// Cache in front of `inner`
    pub fn new(inner: Arc<dyn SchemaLoader>) -> Self {
        Self {
            inner,
            pools: RwLock::new(HashMap::new()),
        }
    }

    /// Drop the cached pool for `path`, returning whether one was cached
    pub fn invalidate(&self, path: &Path) -> bool {
        self.pools.write().remove(path).is_some()
    }

    /// Drop every cached pool
    pub fn clear(&self) {
        self.pools.write().clear();
    }

    /// Number of cached schemas
    pub fn len(&self) -> usize {
        self.pools.read().len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.pools.read().is_empty()
    }
}

impl SchemaLoader for CachedSchemaLoader {
    fn load(&self, path: &Path) -> Result<DescriptorPool> {
        if let Some(pool) = self.pools.read().get(path) {
            return Ok(pool.clone());
        }

        // Two racing misses both parse; last writer wins, both pools are equivalent.
        let pool = self.inner.load(path)?;
        let _ = self.pools.write().insert(path.to_path_buf(), pool.clone());
        Ok(pool)
    }
}

/// Find `name` in `pool`.
///
/// Fully qualified names win. Otherwise the name must match exactly one
/// message by its short name or a dotted suffix of its full name.
pub fn lookup_message(pool: &DescriptorPool, name: &str, path: &Path) -> Result<MessageDescriptor> {
    let name = name.trim().trim_start_matches('.');
    if let Some(desc) = pool.get_message_by_name(name) {
        return Ok(desc);
    }

    let suffix = format!(".{name}");
    let mut candidates: Vec<MessageDescriptor> = pool
        .all_messages()
        .filter(|desc| desc.full_name().ends_with(&suffix))
        .collect();

    match candidates.len() {
        0 => Err(GbufError::MessageNotFound {
            message: name.to_string(),
            path: path.to_path_buf(),
        }),
        1 => Ok(candidates.remove(0)),
        _ => Err(GbufError::AmbiguousMessage {
            message: name.to_string(),
            path: path.to_path_buf(),
            candidates: candidates
                .iter()
                .map(|desc| desc.full_name().to_string())
                .collect(),
        }),
    }
}

/// Load `schema.path` on the blocking pool and resolve `schema.message` in it
pub(crate) async fn resolve(
    loader: &Arc<dyn SchemaLoader>,
    schema: &SchemaRef,
) -> Result<MessageDescriptor> {
    let loader = Arc::clone(loader);
    let path = schema.path.clone();
    let pool = tokio::task::spawn_blocking(move || loader.load(&path))
        .await
        .map_err(|e| GbufError::Internal(format!("schema loader task failed: {e}")))??;

    lookup_message(&pool, &schema.message, &schema.path)
}
