mod load;
mod types;

pub use load::{apply_env_overrides, load_default, load_path, CONFIG_FILE};
pub use types::*;
