/*!
 * Reflection Module
 * Operator-facing service listing
 */

pub mod probe;

pub use probe::{list_services, query_services, write_services, ProbeError};
