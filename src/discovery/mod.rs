//! Source classification and track discovery

pub mod classifier;
pub mod scanner;

pub use classifier::{classify, is_ftp, is_remote};
pub use scanner::{scan_tracks, DiscoveredTrack};
