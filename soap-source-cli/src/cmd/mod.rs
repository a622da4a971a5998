pub mod config;
pub mod map;
pub mod plan;
pub mod run;
pub mod validate;
