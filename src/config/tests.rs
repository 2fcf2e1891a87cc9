#[cfg(test)]
mod config_tests {
    use crate::config::{
        default_host, default_log_level, default_max_file_size, default_max_request_size,
        default_port, default_public_path, default_region, default_service_name,
        default_table_prefix, default_timeout, AuthConfig, Config, ConfigError, DatabaseConfig,
        ObservabilityConfig, ServerConfig, StorageBackend, StorageConfig,
    };
    use std::env;
    use std::path::PathBuf;
    use std::time::Duration;

    fn valid_config() -> Config {
        Config {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_seconds: default_timeout(),
                max_request_size: default_max_request_size(),
            },
            database: DatabaseConfig {
                backend: StorageBackend::Memory,
                region: default_region(),
                table_prefix: default_table_prefix(),
                create_tables: false,
                endpoint_url: None,
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("uploads"),
                public_path: default_public_path(),
                public_base_url: String::new(),
                max_file_size: default_max_file_size(),
            },
            observability: ObservabilityConfig {
                service_name: default_service_name(),
                service_version: "0.1.0".to_string(),
                otlp_endpoint: None,
                log_level: default_log_level(),
                enable_json_logging: false,
            },
            auth: AuthConfig::default(),
        }
    }

    #[test]
    fn test_server_config_defaults() {
        env::remove_var("GARAGEHUB_HOST");
        env::remove_var("GARAGEHUB_PORT");
        env::remove_var("GARAGEHUB_REQUEST_TIMEOUT_SECONDS");
        env::remove_var("GARAGEHUB_MAX_REQUEST_SIZE");

        let config = ServerConfig::from_env().unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert_eq!(config.request_timeout_seconds, 30);
        assert_eq!(config.max_request_size, 25 * 1024 * 1024);
    }

    #[test]
    fn test_database_config_from_env() {
        env::set_var("GARAGEHUB_BACKEND", "dynamodb");
        env::set_var("GARAGEHUB_TABLE_PREFIX", "test-garagehub");
        env::set_var("GARAGEHUB_CREATE_TABLES", "true");
        env::set_var("GARAGEHUB_ENDPOINT_URL", "http://localhost:8001");

        let config = DatabaseConfig::from_env().unwrap();

        assert_eq!(config.backend, StorageBackend::Dynamodb);
        assert_eq!(config.table_prefix, "test-garagehub");
        assert!(config.create_tables);
        assert_eq!(config.endpoint_url.as_deref(), Some("http://localhost:8001"));

        env::remove_var("GARAGEHUB_BACKEND");
        env::remove_var("GARAGEHUB_TABLE_PREFIX");
        env::remove_var("GARAGEHUB_CREATE_TABLES");
        env::remove_var("GARAGEHUB_ENDPOINT_URL");
    }

    #[test]
    fn test_storage_config_from_env() {
        env::set_var("GARAGEHUB_UPLOAD_DIR", "/var/lib/garagehub/uploads");
        env::set_var("GARAGEHUB_MAX_FILE_SIZE", "1024");

        let config = StorageConfig::from_env().unwrap();

        assert_eq!(config.upload_dir, PathBuf::from("/var/lib/garagehub/uploads"));
        assert_eq!(config.max_file_size, 1024);
        assert_eq!(config.public_path, "/uploads");

        env::remove_var("GARAGEHUB_UPLOAD_DIR");
        env::remove_var("GARAGEHUB_MAX_FILE_SIZE");
    }

    #[test]
    fn test_observability_config_from_env() {
        env::set_var("GARAGEHUB_SERVICE_NAME", "test-service");
        env::set_var("GARAGEHUB_SERVICE_VERSION", "1.0.0");
        env::set_var("GARAGEHUB_LOG_LEVEL", "debug");

        let config = ObservabilityConfig::from_env().unwrap();

        assert_eq!(config.service_name, "test-service");
        assert_eq!(config.service_version, "1.0.0");
        assert_eq!(config.log_level, "debug");

        env::remove_var("GARAGEHUB_SERVICE_NAME");
        env::remove_var("GARAGEHUB_SERVICE_VERSION");
        env::remove_var("GARAGEHUB_LOG_LEVEL");
    }

    #[test]
    fn test_server_config_request_timeout() {
        let config = ServerConfig {
            host: "localhost".to_string(),
            port: 8000,
            request_timeout_seconds: 45,
            max_request_size: 1024,
        };

        assert_eq!(config.request_timeout(), Duration::from_secs(45));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(valid_config().validate().is_ok());

        let mut config = valid_config();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.database.table_prefix = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.storage.upload_dir = PathBuf::new();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.storage.max_file_size = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Max file size cannot be 0");
    }

    #[test]
    fn test_validate_rejects_root_public_path() {
        for public_path in ["/", "", "  ", "//"] {
            let mut config = valid_config();
            config.storage.public_path = public_path.to_string();
            assert!(
                config.validate().is_err(),
                "public path {:?} should be rejected",
                public_path
            );
        }

        let mut config = valid_config();
        config.storage.public_path = "/files/".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_error_display() {
        let error = ConfigError::LoadError {
            message: "bad port".to_string(),
        };
        assert_eq!(error.to_string(), "Configuration loading error: bad port");
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_host(), "0.0.0.0");
        assert_eq!(default_port(), 8000);
        assert_eq!(default_timeout(), 30);
        assert_eq!(default_max_file_size(), 5 * 1024 * 1024);
        assert_eq!(default_table_prefix(), "garagehub");
        assert_eq!(default_service_name(), "garagehub-rs");
        assert_eq!(default_log_level(), "info");

        let auth = AuthConfig::default();
        assert_eq!(auth.otp_length, 6);
        assert_eq!(auth.otp_ttl_seconds, 600);
    }
}
