//! Persisted indexer settings.
//!
//! Settings live in `config.toml` inside the application directory. Every
//! field has a default so missing or partial files still load.

mod errors;
mod load;
mod save;
mod types;

#[cfg(test)]
mod tests;

pub use errors::ConfigError;
pub use load::{config_path, load_from, load_or_default};
pub use save::{save, save_to_path};
pub use types::{CONFIG_FILE_NAME, DEFAULT_WATCHED_EXTENSIONS, IndexerConfig};

fn map_app_dir_error(error: crate::app_dirs::AppDirError) -> ConfigError {
    match error {
        crate::app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        crate::app_dirs::AppDirError::CreateDir { path, source } => {
            ConfigError::CreateDir { path, source }
        }
    }
}
