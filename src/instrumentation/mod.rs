pub mod error;
pub mod java;
pub mod language;
pub mod resolver;

use k8s_openapi::api::core::v1::Pod;
use tracing::info;

pub use error::MutationError;
pub use language::{Language, dispatch};
pub use resolver::{InjectionDecision, resolve};

pub const VOLUME_NAME: &str = "datadog-auto-instrumentation";
pub const MOUNT_PATH: &str = "/datadog";

/// Injects the APM tracer into `pod` in place when its metadata asks for it.
///
/// Returns `Ok(None)` and leaves the pod untouched when no language was
/// requested. On error the pod may be partially mutated; callers that need
/// all-or-nothing semantics should mutate a clone.
pub fn inject_auto_instru(
    pod: Option<&mut Pod>,
    _namespace: &str,
    container_registry: &str,
) -> Result<Option<InjectionDecision>, MutationError> {
    let pod = pod.ok_or(MutationError::NilPod)?;

    let Some(decision) = resolve(pod, container_registry) else {
        return Ok(None);
    };
    apply(pod, &decision)?;

    Ok(Some(decision))
}

/// Runs the mutator for an already resolved decision.
pub fn apply(pod: &mut Pod, decision: &InjectionDecision) -> Result<(), MutationError> {
    info!(image = %decision.image, language = %decision.language, "injecting image");
    dispatch(pod, decision.language.as_str(), &decision.image)
}

/// `namespace/name` when both are known, otherwise whatever identifies the pod.
pub fn pod_display(pod: &Pod) -> String {
    let meta = &pod.metadata;
    let name = meta.name.as_deref().filter(|n| !n.is_empty());
    let namespace = meta.namespace.as_deref().unwrap_or("");
    match name {
        Some(name) if !namespace.is_empty() => format!("{namespace}/{name}"),
        _ => {
            let name = name.or(meta.generate_name.as_deref()).unwrap_or("");
            format!("name: {name}, namespace: {namespace}")
        }
    }
}
