use k8s_openapi::api::core::v1::Pod;

use super::language::{Language, SUPPORTED_LANGUAGES};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionDecision {
    pub language: Language,
    pub image: String,
}

/// Finds the first supported language the pod opted into.
///
/// A custom-image annotation is used verbatim and takes precedence over the
/// version label of the same language. Returns `None` when the pod carries
/// neither for any language.
pub fn resolve(pod: &Pod, container_registry: &str) -> Option<InjectionDecision> {
    let annotations = pod.metadata.annotations.as_ref();
    let labels = pod.metadata.labels.as_ref();

    SUPPORTED_LANGUAGES.iter().find_map(|lang| {
        if let Some(image) = annotations.and_then(|a| a.get(&lang.custom_image_annotation_key())) {
            return Some(InjectionDecision {
                language: lang.clone(),
                image: image.clone(),
            });
        }

        labels
            .and_then(|l| l.get(&lang.version_label_key()))
            .map(|version| InjectionDecision {
                language: lang.clone(),
                image: lang.default_image(container_registry, version),
            })
    })
}
