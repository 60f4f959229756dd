use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
};

pub struct Metrics {
    pub duration: Histogram<f64>,
    pub requests: Counter<u64>,
    pub failures: Counter<u64>,
}

impl Metrics {
    pub fn init(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0];

        let duration: Histogram<f64> = meter
            .f64_histogram("predict_duration_seconds")
            .with_description("Time to serve one prediction (decode + infer + saliency)")
            .with_unit("s")
            .with_boundaries(latency_buckets.to_vec())
            .build();
        let requests: Counter<u64> = meter
            .u64_counter("predict_requests_total")
            .with_description("Total prediction requests received")
            .build();
        let failures: Counter<u64> = meter
            .u64_counter("predict_failures_total")
            .with_description("Total prediction requests answered with an error")
            .build();

        Self {
            duration,
            requests,
            failures,
        }
    }
}
