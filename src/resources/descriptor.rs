//! Declarative expectations for one variant of a deployed service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::resources::ResourceKind;

/// A single object identified by kind and name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedObject {
    pub kind: ResourceKind,
    pub name: String,
}

/// Which resource kinds, under which selector and namespace, in what count,
/// make up one variant (legacy or managed) of the service.
///
/// Fields are private so a descriptor cannot change once a run starts.
/// Use [`ResourceSetDescriptor::builder`] to construct one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSetDescriptor {
    name: String,
    #[serde(default)]
    label_selector: String,
    namespace: String,
    #[serde(default)]
    expected_counts: BTreeMap<ResourceKind, usize>,
    #[serde(default)]
    named_objects: Vec<NamedObject>,
}

impl ResourceSetDescriptor {
    /// Start building a descriptor for the variant called `name`.
    pub fn builder(name: impl Into<String>) -> ResourceSetDescriptorBuilder {
        ResourceSetDescriptorBuilder {
            name: name.into(),
            label_selector: String::new(),
            namespace: String::new(),
            expected_counts: BTreeMap::new(),
            named_objects: Vec::new(),
        }
    }

    /// Variant name used in logs and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label_selector(&self) -> &str {
        &self.label_selector
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Namespace to query for `kind`; `None` for cluster-scoped kinds.
    pub fn namespace_for(&self, kind: ResourceKind) -> Option<&str> {
        if kind.is_cluster_scoped() {
            None
        } else {
            Some(&self.namespace)
        }
    }

    /// Expected counts, iterated in kind declaration order.
    pub fn expected_counts(&self) -> &BTreeMap<ResourceKind, usize> {
        &self.expected_counts
    }

    pub fn named_objects(&self) -> &[NamedObject] {
        &self.named_objects
    }

    /// Copy of this descriptor with one expected count replaced.
    pub fn with_expected_count(&self, kind: ResourceKind, count: usize) -> Self {
        let mut copy = self.clone();
        copy.expected_counts.insert(kind, count);
        copy
    }

    pub fn with_namespace(&self, namespace: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.namespace = namespace.into();
        copy
    }

    /// Check the descriptor can be evaluated against a cluster.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidDescriptor(
                "descriptor name must not be empty".to_string(),
            ));
        }
        if self.expected_counts.is_empty() && self.named_objects.is_empty() {
            return Err(Error::InvalidDescriptor(format!(
                "descriptor {} declares no expected counts or named objects",
                self.name
            )));
        }
        // An empty selector would match every object of a kind in the cluster.
        if !self.expected_counts.is_empty() && self.label_selector.trim().is_empty() {
            return Err(Error::InvalidDescriptor(format!(
                "descriptor {} has expected counts but no label selector",
                self.name
            )));
        }
        let needs_namespace = self
            .expected_counts
            .keys()
            .chain(self.named_objects.iter().map(|o| &o.kind))
            .any(|k| !k.is_cluster_scoped());
        if needs_namespace && self.namespace.trim().is_empty() {
            return Err(Error::InvalidDescriptor(format!(
                "descriptor {} tracks namespaced kinds but has no namespace",
                self.name
            )));
        }
        if let Some(obj) = self.named_objects.iter().find(|o| o.name.trim().is_empty()) {
            return Err(Error::InvalidDescriptor(format!(
                "descriptor {} has a {} entry without a name",
                self.name, obj.kind
            )));
        }
        Ok(())
    }
}

/// Builder for [`ResourceSetDescriptor`].
#[derive(Debug, Clone)]
pub struct ResourceSetDescriptorBuilder {
    name: String,
    label_selector: String,
    namespace: String,
    expected_counts: BTreeMap<ResourceKind, usize>,
    named_objects: Vec<NamedObject>,
}

impl ResourceSetDescriptorBuilder {
    pub fn label_selector(mut self, selector: impl Into<String>) -> Self {
        self.label_selector = selector.into();
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Expect exactly `count` objects of `kind` to match the selector.
    pub fn expect(mut self, kind: ResourceKind, count: usize) -> Self {
        self.expected_counts.insert(kind, count);
        self
    }

    /// Expect a specific object to exist (or not, for absence checks).
    pub fn named(mut self, kind: ResourceKind, name: impl Into<String>) -> Self {
        self.named_objects.push(NamedObject {
            kind,
            name: name.into(),
        });
        self
    }

    /// Finish the descriptor, validating it.
    pub fn build(self) -> Result<ResourceSetDescriptor> {
        let descriptor = ResourceSetDescriptor {
            name: self.name,
            label_selector: self.label_selector,
            namespace: self.namespace,
            expected_counts: self.expected_counts,
            named_objects: self.named_objects,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}
