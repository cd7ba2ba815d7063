use std::num::NonZeroUsize;
use std::path::PathBuf;

const CONFIG_DIR_NAME: &str = "farm_env_viz";
const CONFIG_FILE_NAME: &str = "config.json";

/// Default location of the client configuration file.
pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Concurrency the host offers, falling back to 4 when it cannot be queried.
pub fn available_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
}
