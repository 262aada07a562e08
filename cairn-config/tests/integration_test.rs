//! Integration tests for cairn-config

use cairn_config::*;
use std::io::Write;
use std::time::Duration;

fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_toml_file() {
    let file = write_temp(
        ".toml",
        r#"
service_name = "orders"
service_instance_name = "orders-a"
hostname = "10.0.0.5"
port = 9000
api_version = 2
agent_url = "http://consul.internal:8500/v1"
request_timeout_secs = 3
"#,
    );

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();

    assert_eq!(config.service_name, "orders");
    assert_eq!(config.service_instance_name, "orders-a");
    assert_eq!(config.hostname.as_deref(), Some("10.0.0.5"));
    assert_eq!(config.port, Some(9000));
    assert_eq!(config.api_version, 2);
    assert_eq!(config.agent_url, "http://consul.internal:8500/v1");
    assert_eq!(config.request_timeout, Duration::from_secs(3));
}

#[test]
fn test_load_json_file_with_unresolved_port() {
    let file = write_temp(".json", r#"{"service_name": "billing", "port": 0}"#);

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();

    assert_eq!(config.service_name, "billing");
    assert_eq!(config.port, None);
    assert!(config.service_instance_name.starts_with("billing-"));
}

#[test]
fn test_env_overrides_file() {
    let file = write_temp(".toml", "service_name = \"orders\"\nport = 9000\n");

    let config = ConfigLoader::new()
        .with_file(file.path())
        .unwrap()
        .with_env_vars(
            ENV_PREFIX,
            [
                ("CAIRN_PORT", "9100"),
                ("CAIRN_DISABLE_REGISTRATION", "true"),
            ],
        )
        .unwrap()
        .load()
        .unwrap();

    assert_eq!(config.port, Some(9100));
    assert!(config.disable_registration);
    assert!(!config.registration_enabled());
}

#[test]
fn test_dotenv_file() {
    let file = write_temp(
        ".env",
        "# local overrides\nCAIRN_SERVICE_NAME=inventory\nCAIRN_DISABLE_SERVICE_DISCOVERY=1\nUNRELATED=x\n",
    );

    let config = ConfigLoader::new()
        .with_dotenv(Some(file.path()))
        .unwrap()
        .load()
        .unwrap();

    assert_eq!(config.service_name, "inventory");
    assert!(config.disable_service_discovery);
    assert!(!config.discovery_enabled());
}

#[test]
fn test_missing_file() {
    let result = ConfigLoader::new().with_file("/nonexistent/cairn.toml");
    assert!(matches!(result, Err(ConfigError::LoadError(_))));
}

#[test]
fn test_unsupported_extension() {
    let file = write_temp(".yaml", "service_name: orders\n");
    let result = ConfigLoader::new().with_file(file.path());
    assert!(matches!(result, Err(ConfigError::LoadError(msg)) if msg.contains("yaml")));
}

#[test]
fn test_missing_service_name() {
    let file = write_temp(".toml", "port = 9000\n");
    let result = ConfigLoader::new().with_file(file.path()).unwrap().load();
    assert!(matches!(result, Err(ConfigError::MissingField(_))));
}

#[test]
fn test_config_error_display() {
    let err = ConfigError::ParseError("port".to_string());
    assert!(err.to_string().contains("port"));
}
