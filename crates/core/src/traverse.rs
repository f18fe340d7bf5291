//! Capability traversal over output specs.
//!
//! Every output plugin describes its own shape through two small traits:
//! [`Inspect`] walks a value recursively and reports each embedded [`Secret`],
//! [`Targets`] enumerates the mutually exclusive target fields of an output spec.
//! Both are implemented with the `inspect_fields!` and `output_targets!` macros so
//! that validators can work over any output type without per-type code.

use std::collections::BTreeMap;

use crate::secret::Secret;

/// Recursive, read-only walk that reports every embedded secret reference.
pub trait Inspect {
    fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Secret));
}

impl Inspect for Secret {
    fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Secret)) {
        visit(self);
    }
}

impl<T: Inspect> Inspect for Option<T> {
    fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Secret)) {
        if let Some(v) = self {
            v.walk(visit);
        }
    }
}

impl<T: Inspect> Inspect for Vec<T> {
    fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Secret)) {
        for v in self {
            v.walk(visit);
        }
    }
}

impl<T: Inspect + ?Sized> Inspect for Box<T> {
    fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Secret)) {
        (**self).walk(visit);
    }
}

macro_rules! inspect_leaf {
    ($($t:ty),* $(,)?) => {
        $(
            impl Inspect for $t {
                fn walk<'a>(&'a self, _visit: &mut dyn FnMut(&'a Secret)) {}
            }
        )*
    };
}

inspect_leaf!(String, bool, i32, i64, u16, u32, u64, f64, serde_json::Value, BTreeMap<String, String>);

/// Implement [`Inspect`] for a record by walking the listed fields in order.
#[macro_export]
macro_rules! inspect_fields {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::traverse::Inspect for $ty {
            fn walk<'a>(&'a self, _visit: &mut dyn FnMut(&'a $crate::secret::Secret)) {
                $( $crate::traverse::Inspect::walk(&self.$field, _visit); )*
            }
        }
    };
}

/// Implement [`Targets`] for an output spec; names are the serialized field names.
///
/// The fields are collected into an array up front and then boxed as an iterator.
#[macro_export]
macro_rules! output_targets {
    ($ty:ty { $($field:ident => $name:literal),* $(,)? }) => {
        impl $crate::traverse::Targets for $ty {
            fn fields(&self) -> $crate::traverse::Fields<'_> {
                Box::new(
                    [$(
                        $crate::traverse::Field::new(
                            $name,
                            self.$field.as_ref().map(|v| v as &dyn $crate::traverse::Inspect),
                        )
                    ),*]
                    .into_iter(),
                )
            }
        }
    };
}

/// A direct optional field of an output spec.
#[derive(Clone, Copy)]
pub struct Field<'a> {
    pub name: &'static str,
    pub value: Option<&'a dyn Inspect>,
}

impl<'a> Field<'a> {
    pub fn new(name: &'static str, value: Option<&'a dyn Inspect>) -> Self {
        Self { name, value }
    }

    /// True when the optional field is set.
    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }
}

impl std::fmt::Debug for Field<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field").field("name", &self.name).field("present", &self.is_present()).finish()
    }
}

pub type Fields<'a> = Box<dyn Iterator<Item = Field<'a>> + 'a>;

/// Output specs: a closed set of target sub-configurations.
pub trait Targets {
    /// Direct target fields in declaration order, present or not.
    fn fields(&self) -> Fields<'_>;

    /// Only the configured targets.
    fn configured(&self) -> Fields<'_> {
        Box::new(self.fields().filter(Field::is_present))
    }
}

/// Reference lists declared by a flow.
pub trait FlowRefs {
    /// Deprecated unscoped `outputRefs`.
    fn legacy_refs(&self) -> &[String] {
        &[]
    }

    fn global_refs(&self) -> &[String];

    /// `None` for cluster-scoped flows, which cannot reference namespaced outputs.
    fn local_refs(&self) -> Option<&[String]> {
        None
    }
}

/// Collect every secret reachable from `value`, in traversal order.
pub fn collect_secrets(value: &dyn Inspect) -> Vec<&Secret> {
    let mut out = Vec::new();
    value.walk(&mut |s| out.push(s));
    out
}
