pub mod config;
pub mod environments;
pub mod errors;
pub mod logging;
