pub mod change;
pub mod hierarchy;
pub mod quick_filter;
pub mod repository;
pub mod search_index;
pub mod tree;

pub use crate::domain::ports::{ConfigProvider, EntityStore, SearchSink, Storage};
pub use crate::utils::error::Result;
