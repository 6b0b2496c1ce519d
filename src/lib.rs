pub mod api;
pub mod config;
pub mod db;
pub mod model;
pub mod paths;
pub mod process;
pub mod studios;
pub mod template;

#[cfg(test)]
pub mod testutil;

/// Application name for XDG paths
pub const APP_NAME: &str = "reelname";
