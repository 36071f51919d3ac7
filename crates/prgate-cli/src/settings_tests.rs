//! Tests for CLI settings.

use super::*;
use serial_test::serial;
use std::io::Write;

fn write_config(extension: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(&format!(".{}", extension))
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

mod default_tests {
    use super::*;

    /// Verify built-in defaults.
    #[test]
    fn test_defaults() {
        let settings = Settings::default();

        assert_eq!(settings.github.api_url, "https://api.github.com");
        assert!(settings.github.user_agent.starts_with("prgate/"));
        assert_eq!(settings.github.timeout_seconds, 30);
        assert_eq!(settings.logging.level, "info");
        assert!(!settings.logging.json);
        assert_eq!(settings.classification.production_patterns, vec!["^src/"]);
    }

    /// Verify a missing app id is reported by key.
    #[test]
    fn test_missing_app_id() {
        match GitHubSettings::default().app_id() {
            Err(ConfigError::MissingRequired { key }) => assert_eq!(key, "github.app_id"),
            other => panic!("Expected MissingRequired, got {:?}", other),
        }
    }

    /// Verify a missing key location is reported.
    #[test]
    fn test_missing_private_key() {
        let result = GitHubSettings::default().private_key_source();

        assert!(matches!(result, Err(ConfigError::MissingRequired { .. })));
    }

    /// Verify a zero timeout fails client validation.
    #[test]
    fn test_zero_timeout_invalid() {
        let settings = GitHubSettings {
            timeout_seconds: 0,
            ..GitHubSettings::default()
        };

        assert!(matches!(
            settings.client_config(),
            Err(ConfigError::Validation(_))
        ));
    }

    /// Verify client configuration carries the API URL and user agent.
    #[test]
    fn test_client_config() {
        let settings = GitHubSettings {
            api_url: "https://github.example.com/api/v3".to_string(),
            user_agent: "gate/2".to_string(),
            timeout_seconds: 5,
            ..GitHubSettings::default()
        };

        let config = settings.client_config().unwrap();

        assert_eq!(config.github_api_url, "https://github.example.com/api/v3");
        assert_eq!(config.user_agent, "gate/2");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}

mod load_tests {
    use super::*;

    /// Verify a YAML file is loaded and unspecified fields keep defaults.
    #[test]
    #[serial]
    fn test_load_yaml_file() {
        let file = write_config(
            "yaml",
            "github:\n  app_id: \"123456\"\n  private_key_path: /keys/app.pem\nlogging:\n  level: debug\n",
        );

        let settings = load_settings(Some(file.path())).unwrap();

        assert_eq!(settings.github.app_id.as_deref(), Some("123456"));
        assert_eq!(
            settings.github.private_key_path,
            Some(PathBuf::from("/keys/app.pem"))
        );
        assert_eq!(settings.github.api_url, "https://api.github.com");
        assert_eq!(settings.logging.level, "debug");
    }

    /// Verify a TOML file is loaded.
    #[test]
    #[serial]
    fn test_load_toml_file() {
        let file = write_config(
            "toml",
            "[classification]\nproduction_patterns = [\"^lib/\", \"^bin/\"]\n",
        );

        let settings = load_settings(Some(file.path())).unwrap();

        assert_eq!(
            settings.classification.production_patterns,
            vec!["^lib/", "^bin/"]
        );
    }

    /// Verify environment variables override the file.
    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        let file = write_config("yaml", "github:\n  app_id: \"1\"\n  timeout_seconds: 10\n");
        std::env::set_var("PRGATE__GITHUB__APP_ID", "2");
        std::env::set_var("PRGATE__GITHUB__TIMEOUT_SECONDS", "60");

        let result = load_settings(Some(file.path()));
        std::env::remove_var("PRGATE__GITHUB__APP_ID");
        std::env::remove_var("PRGATE__GITHUB__TIMEOUT_SECONDS");

        let settings = result.unwrap();
        assert_eq!(settings.github.app_id.as_deref(), Some("2"));
        assert_eq!(settings.github.timeout_seconds, 60);
    }

    /// Verify an explicit file that does not exist is an error.
    #[test]
    #[serial]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();

        let result = load_settings(Some(&dir.path().join("absent.yaml")));

        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    /// Verify a value of the wrong type is an error.
    #[test]
    #[serial]
    fn test_malformed_value() {
        let file = write_config("yaml", "github:\n  timeout_seconds: soon\n");

        let result = load_settings(Some(file.path()));

        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
