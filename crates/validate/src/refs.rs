//! Flow -> output reference resolution.
//!
//! A resolved reference activates both ends; an unresolved one becomes a
//! `dangling ... output reference` problem on the flow.

use logop_core::traverse::FlowRefs;
use logop_core::{FlowStatus, Object, OutputStatus, ResourceSpec};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Name lookup tables for one backend's outputs, built once per pass.
///
/// Positions index into the slices the index was built from. When names
/// collide the first declaration wins.
#[derive(Debug, Default, Clone)]
pub struct OutputIndex {
    global: FxHashMap<String, usize>,
    local: FxHashMap<(String, String), usize>,
}

impl OutputIndex {
    pub fn build<C, S>(cluster_outputs: &[Object<C, OutputStatus>], outputs: &[Object<S, OutputStatus>]) -> Self
    where
        C: ResourceSpec,
        S: ResourceSpec,
    {
        let mut global = FxHashMap::default();
        for (i, o) in cluster_outputs.iter().enumerate() {
            global.entry(o.name().to_string()).or_insert(i);
        }
        let mut local = FxHashMap::default();
        for (i, o) in outputs.iter().enumerate() {
            let ns = o.namespace().unwrap_or_default().to_string();
            local.entry((ns, o.name().to_string())).or_insert(i);
        }
        Self { global, local }
    }

    pub fn global(&self, name: &str) -> Option<usize> {
        self.global.get(name).copied()
    }

    pub fn local(&self, namespace: &str, name: &str) -> Option<usize> {
        self.local.get(&(namespace.to_string(), name.to_string())).copied()
    }
}

/// Resolve every reference of `flow`, recomputing its status from scratch.
///
/// Problems follow declaration order: deprecation notice, global refs, local refs.
/// Repeated dangling references each produce their own entry.
pub fn resolve_flow_refs<F, C, S>(
    flow: &mut Object<F, FlowStatus>,
    index: &OutputIndex,
    cluster_outputs: &mut [Object<C, OutputStatus>],
    outputs: &mut [Object<S, OutputStatus>],
) where
    F: FlowRefs + ResourceSpec,
{
    let Object { metadata, spec, status, .. } = flow;
    status.reset();

    let local_refs = spec.local_refs();
    let new_style_empty = spec.global_refs().is_empty() && local_refs.map_or(true, <[String]>::is_empty);
    if new_style_empty && !spec.legacy_refs().is_empty() {
        status.problems.push(match local_refs {
            Some(_) => r#""outputRefs" field is deprecated, use "globalOutputRefs" and "localOutputRefs" instead"#.to_string(),
            None => r#""outputRefs" field is deprecated, use "globalOutputRefs" instead"#.to_string(),
        });
    }

    for name in spec.global_refs() {
        match index.global(name).and_then(|i| cluster_outputs.get_mut(i)) {
            Some(output) => {
                status.active = Some(true);
                output.status.active = Some(true);
            }
            None => status.problems.push(format!("dangling global output reference: {}", name)),
        }
    }

    if let Some(refs) = local_refs {
        let namespace = metadata.namespace.as_deref().unwrap_or_default();
        for name in refs {
            match index.local(namespace, name).and_then(|i| outputs.get_mut(i)) {
                Some(output) => {
                    status.active = Some(true);
                    output.status.active = Some(true);
                }
                None => status.problems.push(format!("dangling local output reference: {}", name)),
            }
        }
    }

    status.problems_count = status.problems.len();
    debug!(
        kind = F::KIND,
        flow = metadata.name.as_deref().unwrap_or_default(),
        active = status.is_active(),
        problems = status.problems_count,
        "flow references resolved"
    );
}
