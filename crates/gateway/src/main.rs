use common::TelemetryGuard;
use gateway::{
    config::get_configuration, logging::setup_logging, metrics::Metrics, routes::router,
    state::AppState,
};
use pipeline::{ClassList, PipelineService, classifier::ort::OrtClassifier};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration()?;

    let _telemetry = config
        .otel_endpoint
        .as_ref()
        .map(|endpoint| TelemetryGuard::init("gateway", endpoint))
        .transpose()?;

    setup_logging(&config);

    let classes = ClassList::new(config.class_names.clone());
    tracing::info!(
        model_path = %config.model_path,
        classes = ?classes.names(),
        "Loading classifier"
    );
    let classifier = OrtClassifier::load(&config.model_path, classes.len())?;
    tracing::info!("Model loaded successfully");

    let service = Arc::new(PipelineService::new(classifier, classes, config.input_size));
    let state = AppState {
        service,
        model_loaded: true,
        metrics: Arc::new(Metrics::init("gateway")),
    };

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Gateway listening");

    axum::serve(listener, router(state)).await?;

    Ok(())
}
