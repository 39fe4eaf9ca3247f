/*!
 * Tracing
 * Structured logging on stderr and per-RPC request spans
 *
 * stdout is reserved for protocol traffic, so every layer writes to stderr.
 */

use std::io::IsTerminal;
use std::time::Instant;
use tracing::{info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// RPCs slower than this are logged at warn
const SLOW_REQUEST_MS: u128 = 50;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - RUNRPC_TRACE_JSON: Enable JSON output (default: false)
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("RUNRPC_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    if use_json {
        let _ = registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init();
    } else {
        let _ = registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(std::io::stderr().is_terminal())
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init();
    }
}

/// Generate a unique trace ID for request correlation
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span for gRPC request tracing
pub struct GrpcSpan {
    span: tracing::Span,
    start: Instant,
    trace_id: String,
}

impl GrpcSpan {
    pub fn new(method: &str) -> Self {
        let trace_id = generate_trace_id();

        let span = span!(
            Level::INFO,
            "grpc_request",
            trace_id = %trace_id,
            method = method,
            duration_us = tracing::field::Empty,
            status = tracing::field::Empty,
            error = tracing::field::Empty,
        );

        span.in_scope(|| info!(method = method, "gRPC request started"));

        Self {
            span,
            start: Instant::now(),
            trace_id,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    pub fn record_status(&self, status: &str) {
        self.span.record("status", status);
    }

    pub fn record_error(&self, error: &str) {
        self.span.record("error", error);
        self.span.record("status", "error");
    }
}

impl Drop for GrpcSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.span.record("duration_us", duration.as_micros() as u64);
        let _entered = self.span.enter();

        if duration.as_millis() > SLOW_REQUEST_MS {
            warn!(
                trace_id = %self.trace_id,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow gRPC request"
            );
        } else {
            info!(
                trace_id = %self.trace_id,
                duration_us = duration.as_micros() as u64,
                "gRPC request completed"
            );
        }
    }
}

/// Helper to create gRPC span
#[inline]
pub fn span_grpc(method: &str) -> GrpcSpan {
    GrpcSpan::new(method)
}
