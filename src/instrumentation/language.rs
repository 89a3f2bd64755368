use std::fmt;

use k8s_openapi::api::core::v1::Pod;

use super::MutationError;
use super::java::JavaMutator;

/// Languages recognized in pod metadata, in resolution order.
pub const SUPPORTED_LANGUAGES: [Language; 3] = [Language::Java, Language::Python, Language::Node];

const KEY_PREFIX: &str = "admission.datadoghq.com/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Language {
    Java,
    Python,
    Node,
    Unsupported(String),
}

/// Applies the structural edits that attach one language's tracer to a pod.
pub trait LanguageMutator: Sync {
    fn mutate(&self, pod: &mut Pod, image: &str) -> Result<(), MutationError>;
}

impl Language {
    /// Case-insensitive; anything outside the supported set keeps its tag.
    pub fn parse(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "java" => Language::Java,
            "python" => Language::Python,
            "node" => Language::Node,
            _ => Language::Unsupported(tag.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Language::Java => "java",
            Language::Python => "python",
            Language::Node => "node",
            Language::Unsupported(tag) => tag,
        }
    }

    /// `admission.datadoghq.com/<lang>-tracer.custom-image`
    pub fn custom_image_annotation_key(&self) -> String {
        format!("{KEY_PREFIX}{}-tracer.custom-image", self.as_str())
    }

    /// `admission.datadoghq.com/<lang>-tracer.version`
    pub fn version_label_key(&self) -> String {
        format!("{KEY_PREFIX}{}-tracer.version", self.as_str())
    }

    pub fn default_image(&self, container_registry: &str, version: &str) -> String {
        format!("{container_registry}/apm-{}:{version}", self.as_str())
    }

    pub fn mutator(&self) -> Result<&'static dyn LanguageMutator, MutationError> {
        match self {
            Language::Java => Ok(&JavaMutator),
            Language::Python | Language::Node => {
                Err(MutationError::NotImplemented(self.as_str().to_string()))
            }
            Language::Unsupported(tag) => Err(MutationError::UnsupportedLanguage(tag.clone())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn dispatch(pod: &mut Pod, language: &str, image: &str) -> Result<(), MutationError> {
    Language::parse(language).mutator()?.mutate(pod, image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{Container, PodSpec};

    fn pod() -> Pod {
        Pod {
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "app".into(),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Language::parse("JAVA"), Language::Java);
        assert_eq!(Language::parse("Python"), Language::Python);
        assert_eq!(Language::parse("node"), Language::Node);
        assert_eq!(Language::parse("Ruby"), Language::Unsupported("Ruby".into()));
    }

    #[test]
    fn test_key_formats() {
        assert_eq!(
            Language::Java.custom_image_annotation_key(),
            "admission.datadoghq.com/java-tracer.custom-image"
        );
        assert_eq!(
            Language::Node.version_label_key(),
            "admission.datadoghq.com/node-tracer.version"
        );
        assert_eq!(
            Language::Python.default_image("reg.example.com", "0.50.0"),
            "reg.example.com/apm-python:0.50.0"
        );
    }

    #[test]
    fn test_dispatch_java_mutates() {
        let mut pod = pod();
        dispatch(&mut pod, "Java", "img:1").unwrap();
        let spec = pod.spec.unwrap();
        assert_eq!(spec.init_containers.unwrap().len(), 1);
    }

    #[test]
    fn test_dispatch_pending_languages() {
        for lang in ["python", "node"] {
            let mut pod = pod();
            let before = pod.clone();
            let err = dispatch(&mut pod, lang, "img:1").unwrap_err();
            assert_eq!(err, MutationError::NotImplemented(lang.into()));
            assert_eq!(pod, before);
        }
    }

    #[test]
    fn test_dispatch_unknown_language() {
        let mut pod = pod();
        let err = dispatch(&mut pod, "ruby", "img:1").unwrap_err();
        assert_eq!(err, MutationError::UnsupportedLanguage("ruby".into()));
        assert!(!err.is_pending_support());
    }
}
