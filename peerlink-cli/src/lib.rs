//! PeerLink CLI Library
//!
//! Commands for creating, inspecting and using the device identity.

pub mod config;
pub mod decrypt;
pub mod init;
pub mod show;

pub use decrypt::DecryptCommand;
pub use init::InitCommand;
pub use show::ShowCommand;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
