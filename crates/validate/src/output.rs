//! Output validation: exactly one target, and every secret it references resolves.

use logop_core::traverse::{collect_secrets, Targets};
use logop_core::{Object, OutputStatus, ResourceSpec};
use smallvec::SmallVec;
use tracing::debug;

use crate::secrets::{NamespacedSecrets, SecretResolver};

pub const NO_TARGET_CONFIGURED: &str = "no output target configured";

/// Validate one output spec.
///
/// Secret failures come first in traversal order, followed by at most one
/// cardinality problem. Problems are findings, not errors.
pub fn validate_output_spec<S: Targets + ?Sized>(spec: &S, secrets: &NamespacedSecrets<'_>) -> Vec<String> {
    let mut problems = Vec::new();
    let mut configured: SmallVec<[&'static str; 2]> = SmallVec::new();
    for field in spec.configured() {
        configured.push(field.name);
        let Some(value) = field.value else { continue };
        for secret in collect_secrets(value) {
            if let Err(e) = secrets.load(secret) {
                problems.push(e.to_string());
            }
        }
    }

    match configured.len() {
        0 => problems.push(NO_TARGET_CONFIGURED.to_string()),
        1 => {}
        _ => problems.push(format!("multiple output targets configured: [{}]", configured.join(", "))),
    }
    problems
}

/// Recompute an output's status from scratch.
///
/// `error_output_ref` names the ClusterOutput used as the error sink of the
/// logging; it is active whether or not any flow references it.
pub fn refresh_output_status<S>(
    output: &mut Object<S, OutputStatus>,
    resolver: &dyn SecretResolver,
    error_output_ref: Option<&str>,
) where
    S: Targets + ResourceSpec,
{
    output.status.reset();
    if error_output_ref.is_some_and(|r| !r.is_empty() && r == output.name()) {
        output.status.active = Some(true);
    }
    let namespace = output.metadata.namespace.as_deref().unwrap_or_default();
    let problems = validate_output_spec(&output.spec, &NamespacedSecrets::new(resolver, namespace));
    if !problems.is_empty() {
        debug!(output = %output.key(), problems = problems.len(), "output has problems");
    }
    output.status.problems = problems;
    output.status.problems_count = output.status.problems.len();
}
