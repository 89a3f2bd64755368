use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use k8s_openapi::api::core::v1::Pod;
use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use tracing::{debug, error, info, warn};

use crate::config::{AutoInstruConfig, FailurePolicy};
use crate::instrumentation::{self, InjectionDecision, MutationError};
use crate::metrics::{ErrorLabels, InjectionLabels, InjectorMetrics, RequestLabels};

pub struct AppState {
    pub auto_instru: AutoInstruConfig,
    pub metrics: InjectorMetrics,
}

pub type SharedState = Arc<AppState>;

/// `language` label for pods that requested no tracer.
const NO_LANGUAGE: &str = "none";

pub async fn handle_inject(
    State(state): State<SharedState>,
    body: Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let start = Instant::now();
    let review = handle_review(&state, body.0);
    state
        .metrics
        .admission_request_duration_seconds
        .observe(start.elapsed().as_secs_f64());
    review_to_json(review)
}

fn handle_review(state: &AppState, body: serde_json::Value) -> AdmissionReview<DynamicObject> {
    let review: AdmissionReview<DynamicObject> = match serde_json::from_value(body) {
        Ok(r) => r,
        Err(e) => {
            warn!("failed to deserialize AdmissionReview: {e}");
            let resp = AdmissionResponse::invalid(format!("failed to deserialize request: {e}"));
            return resp.into_review();
        }
    };

    let req: AdmissionRequest<DynamicObject> = match review.try_into() {
        Ok(r) => r,
        Err(e) => {
            warn!("AdmissionReview missing request field: {e}");
            let resp = AdmissionResponse::invalid("missing request field in AdmissionReview");
            return resp.into_review();
        }
    };

    state
        .metrics
        .admission_requests_total
        .get_or_create(&RequestLabels {
            operation: format!("{:?}", req.operation).to_uppercase(),
        })
        .inc();

    mutate(state, &req).into_review()
}

fn review_to_json(review: AdmissionReview<DynamicObject>) -> Json<serde_json::Value> {
    Json(serde_json::to_value(review).expect("AdmissionReview serialization is infallible"))
}

fn mutate(state: &AppState, req: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
    let resp = AdmissionResponse::from(req);

    // init containers are immutable after creation
    if !state.auto_instru.enabled
        || req.kind.kind != "Pod"
        || !matches!(req.operation, Operation::Create)
    {
        return resp;
    }
    let Some(object) = &req.object else {
        debug!(uid = %req.uid, "no object in request, admitting unchanged");
        return resp;
    };

    let pod: Pod = match serde_json::to_value(object).and_then(serde_json::from_value) {
        Ok(pod) => pod,
        Err(e) => {
            warn!(uid = %req.uid, "failed to decode pod: {e}");
            return with_warning(resp, format!("apm-injector: failed to decode pod: {e}"));
        }
    };

    let Some(decision) = instrumentation::resolve(&pod, &state.auto_instru.container_registry)
    else {
        record_injection(state, NO_LANGUAGE, "skipped");
        return resp;
    };

    let mut mutated = pod.clone();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        instrumentation::apply(&mut mutated, &decision)
    }));

    match result {
        Ok(Ok(())) => patch_response(state, req, resp, &pod, &mutated, &decision),
        Ok(Err(e)) => {
            record_injection(state, decision.language.as_str(), "error");
            mutation_failed(state, req, resp, e)
        }
        Err(_) => {
            error!(uid = %req.uid, "mutation panicked, failing open");
            with_warning(
                resp,
                "apm-injector: internal error during mutation, failing open".to_string(),
            )
        }
    }
}

fn patch_response(
    state: &AppState,
    req: &AdmissionRequest<DynamicObject>,
    resp: AdmissionResponse,
    original: &Pod,
    mutated: &Pod,
    decision: &InjectionDecision,
) -> AdmissionResponse {
    let patch = match (serde_json::to_value(original), serde_json::to_value(mutated)) {
        (Ok(before), Ok(after)) => json_patch::diff(&before, &after),
        (Err(e), _) | (_, Err(e)) => {
            error!(uid = %req.uid, "failed to serialize pod: {e}");
            record_injection(state, decision.language.as_str(), "error");
            return with_warning(resp, "apm-injector: failed to serialize pod".to_string());
        }
    };

    match resp.with_patch(patch) {
        Ok(patched) => {
            record_injection(state, decision.language.as_str(), "injected");
            info!(
                uid = %req.uid,
                language = %decision.language,
                image = %decision.image,
                "pod instrumented"
            );
            patched
        }
        Err(e) => {
            error!(uid = %req.uid, "failed to serialize patches: {e}");
            record_injection(state, decision.language.as_str(), "error");
            with_warning(
                AdmissionResponse::from(req),
                "apm-injector: failed to serialize patches".to_string(),
            )
        }
    }
}

fn mutation_failed(
    state: &AppState,
    req: &AdmissionRequest<DynamicObject>,
    resp: AdmissionResponse,
    err: MutationError,
) -> AdmissionResponse {
    state
        .metrics
        .mutation_errors_total
        .get_or_create(&ErrorLabels {
            reason: err.reason(),
        })
        .inc();

    let policy = state.auto_instru.failure_policy;
    if err.is_pending_support() {
        info!(uid = %req.uid, failure_policy = policy.as_str(), "skipping injection: {err}");
    } else {
        warn!(uid = %req.uid, failure_policy = policy.as_str(), "injection failed: {err}");
    }

    match policy {
        FailurePolicy::Allow => with_warning(resp, format!("apm-injector: {err}")),
        FailurePolicy::Deny => resp.deny(format!("apm-injector: {err}")),
    }
}

fn record_injection(state: &AppState, language: &str, result: &'static str) {
    state
        .metrics
        .injections_total
        .get_or_create(&InjectionLabels {
            language: language.to_string(),
            result,
        })
        .inc();
}

fn with_warning(mut resp: AdmissionResponse, warning: String) -> AdmissionResponse {
    resp.warnings.get_or_insert_with(Vec::new).push(warning);
    resp
}
