#![allow(dead_code)]

mod graph;
mod registry;

pub use graph::*;
pub use registry::*;
