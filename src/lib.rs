pub mod config;
pub mod ecosystem;
pub mod graph;
pub mod logging;
pub mod pipeline;
pub mod registry;
pub mod version;
