//! HTTP surface and command-line tooling for featureswitch.

pub mod list;
pub mod serve;
pub mod server;

pub use server::{build_router, AppState};
