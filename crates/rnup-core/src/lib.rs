pub mod align;
pub mod apply;
pub mod config;
pub mod diff;
pub mod editor;
pub mod fetch;
pub mod git;
pub mod hash;
pub mod patch;
pub mod plan;
pub mod preview;
pub mod project;
pub mod prompt;
pub mod rewrite;
pub mod types;
pub mod upgrade;
