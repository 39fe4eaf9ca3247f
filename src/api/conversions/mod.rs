/*!
 * Conversion utilities for gRPC protocol buffers
 */

pub mod proto;

pub use proto::output_to_proto;
