pub mod env_paths;
pub mod logging;
pub mod project_root;
pub mod settings;
