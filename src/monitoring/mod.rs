/*!
 * Monitoring Module
 * Logging setup and request tracing
 */

pub mod tracer;

pub use tracer::{generate_trace_id, init_tracing, span_grpc, GrpcSpan};
