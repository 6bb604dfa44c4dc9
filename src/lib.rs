pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, CliConfig, Command};

pub use config::toml_config::CatalogConfig;
pub use core::hierarchy::{resolve_sub_level, sub_level_hierarchy_key, SubLevel};
pub use core::quick_filter::{build_quick_filter_query, recover_selected_values, selected_values};
pub use core::repository::ApiEndpointRepository;
pub use core::tree::{update_tree_data, TreeNode};
pub use utils::error::{CatalogError, Result};
