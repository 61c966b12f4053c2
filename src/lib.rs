//! Dump every database container running on a Docker host to local files
//! and check each dump's header before moving on.

pub mod cli;
pub mod core;
pub mod utils;
