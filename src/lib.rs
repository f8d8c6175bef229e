pub mod app;
pub mod auth;
pub mod config;
pub mod core;
pub mod http;
pub mod launcher;
pub mod navigation;
pub mod normalize;
pub mod playback;
pub mod provider;
pub mod scan;
pub mod util;

pub use normalize::normalize;
