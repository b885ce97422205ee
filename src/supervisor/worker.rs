use std::path::{Path, PathBuf};

/// Directory under the home directory holding all worker state
pub const BASE_DIR_NAME: &str = ".mawari_automation";
/// File the node writes its wallet cache to, inside the cache dir
pub const NODE_CACHE_FILE: &str = "flohive-cache.json";

/// Names and paths owned by one guardian worker.
///
/// ```text
/// <base>/workers/<name>/
///   meta.json            burner record
///   cache/               bind-mounted into the container
///     flohive-cache.json
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub name: String,
    pub container_name: String,
    pub worker_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub record_path: PathBuf,
    pub node_cache_file: PathBuf,
}

impl WorkerConfig {
    pub fn new(base_dir: impl AsRef<Path>, name: &str) -> Self {
        let worker_dir = base_dir.as_ref().join("workers").join(name);
        let cache_dir = worker_dir.join("cache");
        Self {
            name: name.to_string(),
            container_name: format!("mawari_{}", name),
            record_path: worker_dir.join("meta.json"),
            node_cache_file: cache_dir.join(NODE_CACHE_FILE),
            cache_dir,
            worker_dir,
        }
    }

    /// `~/.mawari_automation`, if a home directory is known
    pub fn default_base_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(BASE_DIR_NAME))
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.cache_dir)
    }
}
