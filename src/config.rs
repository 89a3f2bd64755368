use figment::{Figment, providers::{Env, Format, Yaml}};
use serde::{Deserialize, Serialize};

/// What the webhook answers when the mutation engine returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Admit the pod unmodified and attach a warning.
    #[default]
    Allow,
    /// Reject the admission request with the error message.
    Deny,
}

impl FailurePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            FailurePolicy::Allow => "allow",
            FailurePolicy::Deny => "deny",
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8443".to_string()
}

fn default_tls_cert_path() -> String {
    "/certs/tls.crt".to_string()
}

fn default_tls_key_path() -> String {
    "/certs/tls.key".to_string()
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_container_registry() -> String {
    "gcr.io/datadoghq".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectorConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_tls_cert_path")]
    pub tls_cert_path: String,
    #[serde(default = "default_tls_key_path")]
    pub tls_key_path: String,
    #[serde(default = "default_metrics_addr")]
    pub metrics_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub auto_instru: AutoInstruConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoInstruConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Registry host/prefix used to build `<registry>/apm-<lang>:<version>`.
    #[serde(default = "default_container_registry")]
    pub container_registry: String,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Default for AutoInstruConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            container_registry: default_container_registry(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl InjectorConfig {
    pub fn load(path: &str) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("APM_INJECTOR_").split("__"))
            .extract()
            .map_err(Box::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config: InjectorConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8443");
        assert_eq!(config.metrics_addr, "0.0.0.0:9090");
        assert!(config.auto_instru.enabled);
        assert_eq!(config.auto_instru.container_registry, "gcr.io/datadoghq");
        assert_eq!(config.auto_instru.failure_policy, FailurePolicy::Allow);
    }

    #[test]
    fn test_auto_instru_section() {
        let config: InjectorConfig = serde_yaml::from_str(
            r#"
log_level: debug
auto_instru:
  container_registry: reg.example.com
  failure_policy: deny
"#,
        )
        .unwrap();
        assert_eq!(config.log_level, "debug");
        assert!(config.auto_instru.enabled);
        assert_eq!(config.auto_instru.container_registry, "reg.example.com");
        assert_eq!(config.auto_instru.failure_policy, FailurePolicy::Deny);
    }

    #[test]
    fn test_unknown_failure_policy_rejected() {
        let result: Result<InjectorConfig, _> =
            serde_yaml::from_str("auto_instru:\n  failure_policy: retry\n");
        assert!(result.is_err());
    }
}
