pub mod error;
pub mod fqn;
pub mod logger;
pub mod validation;
