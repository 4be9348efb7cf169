//! Tests for loading configuration from the environment.

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::config::{AppConfig, Environment};

    const REQUIRED: [(&str, Option<&str>); 2] = [
        ("PITSA__DATABASE__URL", Some("postgres://localhost/pitsa")),
        ("PITSA__AUTH__SECRET", Some("test-secret")),
    ];

    #[test]
    fn test_defaults_from_minimal_environment() {
        temp_env::with_vars(REQUIRED, || {
            let config = AppConfig::load().expect("config loads");

            assert_eq!(config.server.host, "0.0.0.0");
            assert_eq!(config.server.port, 5233);
            assert_eq!(config.server.environment, Environment::Development);
            assert_eq!(config.database.url, "postgres://localhost/pitsa");
            assert!(config.database.run_migrations);
            assert_eq!(config.cors.allowed_origins, vec!["http://localhost:4200"]);
            assert_eq!(config.auth.cookie_name, "PitsaUzAuthCookie");
            assert_eq!(config.auth.cookie_path, "/");
            assert_eq!(config.auth.session_ttl_secs, 86400);
            assert!(config.auth.sliding_expiration);
            assert!(!config.auth.secure_cookie);
            assert!(config.google.is_none());
            assert_eq!(config.storage.web_root, None);
            assert_eq!(config.storage.content_root, PathBuf::from("."));
        });
    }

    #[test]
    fn test_environment_overrides() {
        temp_env::with_vars(
            [
                REQUIRED[0],
                REQUIRED[1],
                ("PITSA__SERVER__PORT", Some("8081")),
                ("PITSA__SERVER__ENVIRONMENT", Some("production")),
                (
                    "PITSA__CORS__ALLOWED_ORIGINS",
                    Some("https://pitsa.uz,https://admin.pitsa.uz"),
                ),
                ("PITSA__STORAGE__WEB_ROOT", Some("wwwroot")),
                ("PITSA__GOOGLE__CLIENT_ID", Some("client")),
                ("PITSA__GOOGLE__CLIENT_SECRET", Some("shh")),
            ],
            || {
                let config = AppConfig::load().expect("config loads");

                assert_eq!(config.server.port, 8081);
                assert_eq!(config.server.environment, Environment::Production);
                assert_eq!(
                    config.cors.allowed_origins,
                    vec!["https://pitsa.uz", "https://admin.pitsa.uz"]
                );
                assert_eq!(config.storage.web_root, Some(PathBuf::from("wwwroot")));

                let google = config.google.expect("google configured");
                assert_eq!(google.client_id, "client");
                assert_eq!(google.callback_path, "/signin-google");
                assert_eq!(google.scopes, vec!["openid", "profile", "email"]);
                assert_eq!(
                    google.redirect_uri(),
                    "http://localhost:5233/signin-google"
                );
            },
        );
    }

    #[test]
    fn test_missing_secret_fails() {
        temp_env::with_vars(
            [REQUIRED[0], ("PITSA__AUTH__SECRET", None::<&str>)],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }

    #[test]
    fn test_incomplete_google_section_fails() {
        temp_env::with_vars(
            [
                REQUIRED[0],
                REQUIRED[1],
                ("PITSA__GOOGLE__CLIENT_ID", Some("client")),
                ("PITSA__GOOGLE__CLIENT_SECRET", None),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }
}
