pub mod analyzer;
pub mod config;
pub mod text;

/// Audio file extensions we support
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a"];

/// Application name for XDG paths
pub const APP_NAME: &str = "mightyfi";
