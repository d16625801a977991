//! Metrics collection module for the matching engine
//!
//! Counters and histograms are registered in a process-wide Prometheus
//! registry and optionally exposed over HTTP in the text format.

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response};
use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::net::SocketAddr;
use std::time::Instant;

lazy_static! {
    /// Global Prometheus registry instance
    pub static ref REGISTRY_INSTANCE: Registry = Registry::new();

    /// Orders accepted into a book
    pub static ref ORDERS_PLACED: IntCounter =
        IntCounter::new("orders_placed", "orders accepted into a book").unwrap();

    /// Orders refused at submission, by reason
    pub static ref ORDERS_REJECTED: IntCounterVec = IntCounterVec::new(
        Opts::new("orders_rejected", "orders refused at submission"),
        &["reason"]
    )
    .unwrap();

    /// Trades durably recorded
    pub static ref TRADES_SETTLED: IntCounter =
        IntCounter::new("trades_settled", "trades durably recorded").unwrap();

    /// Settlements the store refused
    pub static ref SETTLEMENT_FAILURES: IntCounter =
        IntCounter::new("settlement_failures", "settlements the store refused").unwrap();

    /// Wall time of one pass over every book
    pub static ref MATCH_CYCLE_HISTOGRAM: Histogram = Histogram::with_opts(HistogramOpts::new(
        "match_cycle_seconds",
        "time spent in one matching cycle"
    ))
    .unwrap();
}

/// Initializes the metrics registry
///
/// Registers all metric collectors with the global registry. Calling it more
/// than once is harmless.
pub fn init_registry() {
    let _ = REGISTRY_INSTANCE.register(Box::new(ORDERS_PLACED.clone()));
    let _ = REGISTRY_INSTANCE.register(Box::new(ORDERS_REJECTED.clone()));
    let _ = REGISTRY_INSTANCE.register(Box::new(TRADES_SETTLED.clone()));
    let _ = REGISTRY_INSTANCE.register(Box::new(SETTLEMENT_FAILURES.clone()));
    let _ = REGISTRY_INSTANCE.register(Box::new(MATCH_CYCLE_HISTOGRAM.clone()));
}

pub fn observe_cycle(start: Instant) {
    MATCH_CYCLE_HISTOGRAM.observe(start.elapsed().as_secs_f64());
}

/// Renders the registry in the Prometheus text exposition format
pub fn render() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY_INSTANCE.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        log::error!("failed to encode metrics: {}", e);
    }
    buffer
}

/// Serves `/metrics` (any path, in fact) on `addr` until the process exits.
pub async fn serve(addr: SocketAddr) -> Result<(), hyper::Error> {
    init_registry();
    let make_svc = make_service_fn(|_| async {
        Ok::<_, hyper::Error>(service_fn(|_: Request<Body>| async {
            Ok::<_, hyper::Error>(Response::new(Body::from(render())))
        }))
    });
    log::info!("metrics server started on {}", addr);
    hyper::Server::try_bind(&addr)?.serve(make_svc).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_text_names_registered_metrics() {
        init_registry();
        ORDERS_REJECTED.with_label_values(&["invalid"]).inc();
        let text = String::from_utf8(render()).unwrap();
        assert!(text.contains("orders_rejected"));
    }
}
