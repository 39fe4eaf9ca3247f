/*!
 * API Module
 * External interfaces (gRPC over bridged stdio)
 */

pub mod conversions;
pub mod handlers;
pub mod server;
pub mod types;

// Re-export for convenience
pub use server::{build_router, ServerHandle};
pub use types::*;
