use common::{Environment, LogLevel};
use pipeline::normalize::DEFAULT_INPUT_SIZE;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct Config {
    pub log_level: LogLevel,
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub model_path: String,
    pub input_size: u32,
    /// Fixed, versioned class-name list; the severity policy is written
    /// against these names.
    pub class_names: Vec<String>,
    pub otel_endpoint: Option<String>,
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let config = config::Config::builder()
        .set_default("log_level", "info")?
        .set_default("environment", "development")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 5000)?
        .set_default("model_path", "models/classifier.onnx")?
        .set_default("input_size", DEFAULT_INPUT_SIZE as i64)?
        .set_default(
            "class_names",
            vec!["No finding", "Pneumonia", "Other disease"],
        )?
        .add_source(
            config::Environment::with_prefix("GATEWAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("class_names"),
        )
        .build()?;

    config.try_deserialize::<Config>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_deployment() {
        let config = get_configuration().unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.input_size, 224);
        assert_eq!(
            config.class_names,
            vec!["No finding", "Pneumonia", "Other disease"]
        );
        assert!(config.otel_endpoint.is_none());
    }
}
