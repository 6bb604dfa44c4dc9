// Domain layer: core models, the query DSL and ports (interfaces).

pub mod filter;
pub mod hierarchy;
pub mod model;
pub mod ports;
pub mod query;
