pub mod config;
pub mod error;
pub mod types;

pub use config::{find_project_data, load_site_config, parse_projects};
pub use error::{Error, Result};
pub use types::*;
