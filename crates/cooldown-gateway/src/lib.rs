//! Cooldown gateway: an HTTP service fronting an npm-compatible registry,
//! applying the cooldown policy (version age + download reputation) to
//! metadata and tarball requests and passing everything else through.

pub mod handlers;
pub mod server;
pub mod tarball;
pub mod upstream;

pub use server::{build_router, start_server, AppState};
