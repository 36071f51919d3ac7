//! Tests for the prgate-cli library module.

use super::*;
use serial_test::serial;

mod parsing_tests {
    use super::*;

    /// Verify classify parses with a pull request number.
    #[test]
    fn test_classify_parsing() {
        let cli = Cli::try_parse_from([
            "prgate",
            "classify",
            "--repository",
            "octo/widgets",
            "--pull-request",
            "7",
            "--format",
            "json",
        ])
        .unwrap();

        match cli.command {
            Commands::Classify {
                repository,
                pull_request,
                files_url,
                format,
            } => {
                assert_eq!(repository, "octo/widgets");
                assert_eq!(pull_request, Some(7));
                assert_eq!(files_url, None);
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("Expected Classify command"),
        }
    }

    /// Verify classify needs a pull request or a files URL, not both.
    #[test]
    fn test_classify_requires_one_target() {
        let neither = Cli::try_parse_from(["prgate", "classify", "-r", "octo/widgets"]);
        assert!(neither.is_err());

        let both = Cli::try_parse_from([
            "prgate",
            "classify",
            "-r",
            "octo/widgets",
            "-p",
            "7",
            "--files-url",
            "https://api.github.com/repos/octo/widgets/pulls/7/files",
        ]);
        assert!(both.is_err());
    }

    /// Verify global options and config defaults.
    #[test]
    fn test_config_parsing() {
        let cli = Cli::try_parse_from(["prgate", "--json-logs", "-l", "debug", "config", "--show"])
            .unwrap();

        assert!(cli.json_logs);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Config { show, format } => {
                assert!(show);
                assert_eq!(format, ConfigFormat::Yaml);
            }
            _ => panic!("Expected Config command"),
        }
    }

    /// Verify the clap definition is internally consistent.
    #[test]
    fn test_command_definition() {
        Cli::command().debug_assert();
    }
}

mod error_tests {
    use super::*;

    /// Verify rate limiting gets its own exit code.
    #[test]
    fn test_exit_codes() {
        let rate_limited = CliError::Api(ApiError::RateLimitExceeded {
            status: 403,
            reset_at: None,
            message: "API rate limit exceeded".to_string(),
        });
        let request = CliError::Api(ApiError::Request {
            status: 500,
            url: "https://api.github.com".to_string(),
            message: "oops".to_string(),
        });
        let credential = CliError::Api(ApiError::Credential(KeyLoadingError::InvalidKey {
            message: "bad".to_string(),
        }));
        let config = CliError::Configuration(ConfigError::MissingRequired {
            key: "github.app_id".to_string(),
        });

        assert_eq!(rate_limited.exit_code(), 75);
        assert_eq!(request.exit_code(), 3);
        assert_eq!(credential.exit_code(), 2);
        assert_eq!(config.exit_code(), 1);
    }
}

mod helper_tests {
    use super::*;

    /// Verify owner/repo shorthand expands against the API URL.
    #[test]
    fn test_resolve_repository_shorthand() {
        let url = resolve_repository_url("https://api.github.com/", "octo/widgets").unwrap();

        assert_eq!(url, "https://api.github.com/repos/octo/widgets");
    }

    /// Verify full URLs pass through without a trailing slash.
    #[test]
    fn test_resolve_repository_url_passthrough() {
        let url = resolve_repository_url(
            "https://api.github.com",
            "https://github.example.com/api/v3/repos/octo/widgets/",
        )
        .unwrap();

        assert_eq!(url, "https://github.example.com/api/v3/repos/octo/widgets");
    }

    /// Verify malformed repository names are rejected.
    #[test]
    fn test_resolve_repository_invalid() {
        for value in ["widgets", "/widgets", "octo/", "a/b/c"] {
            let result = resolve_repository_url("https://api.github.com", value);
            assert!(
                matches!(result, Err(CliError::InvalidArgument { .. })),
                "{} should be rejected",
                value
            );
        }
    }

    /// Verify both output formats of a classification.
    #[test]
    fn test_render_classification() {
        let classification = FileClassification {
            touches_production: true,
            touches_release_notes: false,
        };

        let text = render_classification(&classification, OutputFormat::Text).unwrap();
        assert_eq!(text, "touches_production: true\ntouches_release_notes: false");

        let json = render_classification(&classification, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["touches_production"], true);
        assert_eq!(value["touches_release_notes"], false);
    }

    /// Verify settings render in both formats.
    #[test]
    fn test_render_settings() {
        let settings = Settings::default();

        let yaml = render_settings(&settings, ConfigFormat::Yaml).unwrap();
        assert!(yaml.contains("api_url:"));
        assert!(yaml.contains("https://api.github.com"));

        let json = render_settings(&settings, ConfigFormat::Json).unwrap();
        let parsed: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, settings);
    }
}

mod run_tests {
    use super::*;

    /// Verify completions are written to the output.
    #[tokio::test]
    async fn test_completions() {
        let cli = Cli::try_parse_from(["prgate", "completions", "bash"]).unwrap();
        let mut out = Vec::new();

        run(cli, &mut out).await.unwrap();

        assert!(String::from_utf8(out).unwrap().contains("prgate"));
    }

    /// Verify completions skip configuration loading entirely.
    #[tokio::test]
    async fn test_completions_ignore_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        let cli = Cli::try_parse_from([
            "prgate",
            "--config",
            missing.to_str().unwrap(),
            "completions",
            "zsh",
        ])
        .unwrap();
        let mut out = Vec::new();

        run(cli, &mut out).await.unwrap();

        assert!(String::from_utf8(out).unwrap().contains("prgate"));
    }

    /// Verify config validation reports success for a valid file.
    #[tokio::test]
    #[serial]
    async fn test_config_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prgate.yaml");
        std::fs::write(&path, "github:\n  app_id: \"42\"\n").unwrap();
        let cli = Cli::try_parse_from(["prgate", "--config", path.to_str().unwrap(), "config"])
            .unwrap();
        let mut out = Vec::new();

        run(cli, &mut out).await.unwrap();

        assert_eq!(String::from_utf8(out).unwrap().trim(), "Configuration is valid");
    }

    /// Verify an invalid pattern fails config validation.
    #[tokio::test]
    #[serial]
    async fn test_config_invalid_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prgate.yaml");
        std::fs::write(
            &path,
            "classification:\n  production_patterns:\n    - \"([unclosed\"\n",
        )
        .unwrap();
        let cli = Cli::try_parse_from(["prgate", "--config", path.to_str().unwrap(), "config"])
            .unwrap();
        let mut out = Vec::new();

        let err = run(cli, &mut out).await.unwrap_err();

        assert!(matches!(
            err,
            CliError::Configuration(ConfigError::InvalidPattern { .. })
        ));
        assert_eq!(err.exit_code(), 1);
    }

    /// Verify classify without an app id fails before any request.
    #[tokio::test]
    #[serial]
    async fn test_classify_without_app_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prgate.yaml");
        std::fs::write(&path, "github:\n  private_key_path: /nonexistent/app.pem\n").unwrap();
        let cli = Cli::try_parse_from([
            "prgate",
            "--config",
            path.to_str().unwrap(),
            "classify",
            "-r",
            "octo/widgets",
            "-p",
            "1",
        ])
        .unwrap();
        let mut out = Vec::new();

        let err = run(cli, &mut out).await.unwrap_err();

        assert!(matches!(
            err,
            CliError::Configuration(ConfigError::MissingRequired { .. })
        ));
    }
}
