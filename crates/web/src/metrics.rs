use anyhow::Result;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

pub fn describe() {
    describe_gauge!(
        "walletscope_web_build_info",
        "Build info for the walletscope dashboard (value is always 1)."
    );
    describe_counter!(
        "walletscope_partial_requests_total",
        "Partial renders served, labeled by panel."
    );
    describe_counter!(
        "walletscope_logins_total",
        "Login attempts, labeled by outcome."
    );
    describe_counter!(
        "api_requests_total",
        "Requests issued to the upstream analytics API."
    );
    describe_histogram!(
        "api_request_latency_ms",
        "Upstream analytics API latency in milliseconds."
    );
}

/// Serve Prometheus scrapes on the configured port.
pub fn install_prometheus(port: u16) -> Result<PrometheusHandle> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let handle = PrometheusBuilder::new()
        .with_http_listener(addr)
        .install_recorder()?;

    ::metrics::gauge!(
        "walletscope_web_build_info",
        "version" => env!("CARGO_PKG_VERSION"),
    )
    .set(1.0);

    Ok(handle)
}
