//! Progress reporting during agent runs

pub mod reporter;
