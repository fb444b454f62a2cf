//! AgenticLogo command-line front end.

pub mod commands;
pub mod config;

pub use config::{
    load_pipeline_config, resolve_output_dir, resolve_rank_endpoint, resolve_rank_token,
};
