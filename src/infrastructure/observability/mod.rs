//! Observability infrastructure - Prometheus metrics

mod metrics;

pub use metrics::{
    create_metrics_router, init_metrics, record_chain_run, record_http_request,
    record_llm_request, record_step_execution, LlmRequestMetricParams, PrometheusMetrics,
};
