//! logop validation: pure, in-memory passes over a resource bundle.
//! Every finding lands in a status problem list; nothing here fails.

#![forbid(unsafe_code)]

pub mod output;
pub mod refs;
pub mod secrets;
pub mod status;

pub use output::{refresh_output_status, validate_output_spec};
pub use refs::{resolve_flow_refs, OutputIndex};
pub use secrets::{NamespacedSecrets, SecretError, SecretResolver, SnapshotSecrets};
pub use status::{aggregate_logging_status, normalize_problems, AggregateInput};
