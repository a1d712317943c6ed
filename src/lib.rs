pub mod candidate;
pub mod codes;
pub mod config;
pub mod error;
pub mod filters;
pub mod food;
pub mod ga;
pub mod generator;
pub mod pools;
pub mod template;
pub mod workspace;
// cmd and reports belong to the binary (main.rs).
