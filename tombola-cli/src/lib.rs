pub mod config;
pub mod display;
pub mod draw;
pub mod import;
