//! Kernel configuration loader.
//!
//! Reads a TOML file into [`KernelConfig`], falling back to defaults when the
//! file is missing or malformed, then layers secret overrides from the
//! environment on top.

use std::path::Path;

use larkit_types::config::KernelConfig;

/// Environment variable overriding the webhook verification secret.
pub const TOKEN_ENV: &str = "LARKIT_TOKEN";
/// Environment variable overriding the envelope encryption key.
pub const ENCRYPTION_KEY_ENV: &str = "LARKIT_ENCRYPTION_KEY";

/// Load configuration from `path`, then apply environment overrides.
///
/// - A missing file yields [`KernelConfig::default()`].
/// - An unreadable or unparseable file logs a warning and yields the default.
pub async fn load_kernel_config(path: &Path) -> KernelConfig {
    let config = read_config_file(path).await;
    apply_overrides(config, |name| std::env::var(name).ok())
}

async fn read_config_file(path: &Path) -> KernelConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config found at {}, using defaults", path.display());
            return KernelConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return KernelConfig::default();
        }
    };

    match toml::from_str::<KernelConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            KernelConfig::default()
        }
    }
}

/// Replace secrets with values from `lookup` when it yields a non-empty one.
pub fn apply_overrides(
    mut config: KernelConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> KernelConfig {
    let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(token) = non_empty(TOKEN_ENV) {
        config.token = Some(token);
    }
    if let Some(key) = non_empty(ENCRYPTION_KEY_ENV) {
        config.encryption_key = Some(key);
    }
    config
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use larkit_types::config::{CacheBackendKind, IssueMethod};
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = read_config_file(&tmp.path().join("larkit.toml")).await;
        assert!(config.token.is_none());
        assert_eq!(config.server.port, 8080);
    }

    #[tokio::test]
    async fn valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("larkit.toml");
        tokio::fs::write(
            &path,
            r#"
token = "from-file"
raw_response = true

[credentials]
endpoint = "https://api.example.com/token"
method = "POST"

[credentials.values]
appid = "wx1"

[cache]
backend = "sqlite"
"#,
        )
        .await
        .unwrap();

        let config = read_config_file(&path).await;
        assert_eq!(config.token.as_deref(), Some("from-file"));
        assert!(config.raw_response);
        assert_eq!(config.credentials.method, IssueMethod::Post);
        assert_eq!(config.credentials.values.get("appid"), Some("wx1"));
        assert_eq!(config.cache.backend, CacheBackendKind::Sqlite);
    }

    #[tokio::test]
    async fn invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("larkit.toml");
        tokio::fs::write(&path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = read_config_file(&path).await;
        assert!(config.token.is_none());
        assert!(config.credentials.endpoint.is_none());
    }

    #[test]
    fn overrides_replace_secrets() {
        let env: HashMap<&str, &str> = [
            (TOKEN_ENV, "from-env"),
            (ENCRYPTION_KEY_ENV, "0123456789abcdef0123456789abcdef"),
        ]
        .into();
        let config = KernelConfig {
            token: Some("from-file".into()),
            ..Default::default()
        };

        let config = apply_overrides(config, |name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config.token.as_deref(), Some("from-env"));
        assert_eq!(
            config.encryption_key.as_deref(),
            Some("0123456789abcdef0123456789abcdef")
        );
    }

    #[test]
    fn empty_override_is_ignored() {
        let config = KernelConfig {
            token: Some("from-file".into()),
            ..Default::default()
        };
        let config = apply_overrides(config, |_| Some(String::new()));
        assert_eq!(config.token.as_deref(), Some("from-file"));
        assert!(config.encryption_key.is_none());
    }
}
