//! Resource-set descriptors and their verification against the cluster.

mod descriptor;
mod kind;
mod verifier;

pub use descriptor::{NamedObject, ResourceSetDescriptor, ResourceSetDescriptorBuilder};
pub use kind::ResourceKind;
pub use verifier::{ResourceSetVerifier, VerificationVerdict};
