use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;

use crate::config::AutoInstruConfig;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    pub operation: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct InjectionLabels {
    pub language: String,
    pub result: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ErrorLabels {
    pub reason: &'static str,
}

pub struct InjectorMetrics {
    pub admission_requests_total: Family<RequestLabels, Counter>,
    pub injections_total: Family<InjectionLabels, Counter>,
    pub mutation_errors_total: Family<ErrorLabels, Counter>,
    pub admission_request_duration_seconds: Histogram,
}

const DURATION_BUCKETS: [f64; 12] = [
    0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0,
];

impl InjectorMetrics {
    pub fn new(registry: &mut Registry, auto_instru: &AutoInstruConfig) -> Self {
        let admission_requests_total = Family::<RequestLabels, Counter>::default();
        registry.register(
            "apm_injector_admission_requests",
            "Total number of admission requests received",
            admission_requests_total.clone(),
        );

        let injections_total = Family::<InjectionLabels, Counter>::default();
        registry.register(
            "apm_injector_injections",
            "Pods evaluated for auto-instrumentation, by language and result",
            injections_total.clone(),
        );

        let mutation_errors_total = Family::<ErrorLabels, Counter>::default();
        registry.register(
            "apm_injector_mutation_errors",
            "Mutation failures by reason",
            mutation_errors_total.clone(),
        );

        let admission_request_duration_seconds = Histogram::new(DURATION_BUCKETS.iter().copied());
        registry.register(
            "apm_injector_admission_request_duration_seconds",
            "Duration of admission request processing in seconds",
            admission_request_duration_seconds.clone(),
        );

        let enabled = Gauge::<i64>::default();
        registry.register(
            "apm_injector_enabled",
            "Whether auto-instrumentation is enabled (1) or disabled (0)",
            enabled.clone(),
        );
        enabled.set(if auto_instru.enabled { 1 } else { 0 });

        Self {
            admission_requests_total,
            injections_total,
            mutation_errors_total,
            admission_request_duration_seconds,
        }
    }
}
