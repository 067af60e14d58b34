//! Credential resolution through an ordered chain of providers.
//!
//! The chain is evaluated in a fixed order and the first non-empty value wins:
//!
//! 1. a dotenv-format secrets file (default `.secrets.env`)
//! 2. scoped secrets: `<SCOPE>__<KEY>` when `DATABRICKS_SECRET_SCOPE` is set
//! 3. the process environment

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

/// Environment variable naming the secret scope.
pub const SECRET_SCOPE_VAR: &str = "DATABRICKS_SECRET_SCOPE";
/// Environment variable overriding the secrets file location.
pub const SECRETS_FILE_VAR: &str = "LOPS_SECRETS_FILE";
pub const DEFAULT_SECRETS_FILE: &str = ".secrets.env";

/// A single source of secret values.
pub trait SecretProvider {
    /// Short label used in logs (never the value).
    fn name(&self) -> &str;

    fn try_resolve(&self, key: &str) -> Option<String>;
}

/// Reads `std::env`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvProvider;

impl SecretProvider for EnvProvider {
    fn name(&self) -> &str {
        "env"
    }

    fn try_resolve(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fixed in-memory values (CLI overrides, tests).
#[derive(Debug, Default, Clone)]
pub struct MapProvider {
    label: String,
    values: HashMap<String, String>,
}

impl MapProvider {
    pub fn new<I, K, V>(label: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            label: label.into(),
            values: values.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl SecretProvider for MapProvider {
    fn name(&self) -> &str {
        &self.label
    }

    fn try_resolve(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Values from a dotenv-format secrets file, read once at construction.
///
/// A missing file simply resolves nothing.
#[derive(Debug, Clone)]
pub struct SecretsFileProvider {
    values: HashMap<String, String>,
}

impl SecretsFileProvider {
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut values = HashMap::new();

        match dotenvy::from_path_iter(path) {
            Ok(iter) => {
                for item in iter {
                    match item {
                        Ok((key, value)) => {
                            values.insert(key, value);
                        }
                        Err(e) => warn!(path = %path.display(), "skipping malformed secrets entry: {e}"),
                    }
                }
                debug!(path = %path.display(), entries = values.len(), "loaded secrets file");
            }
            Err(e) if e.not_found() => {}
            Err(e) => warn!(path = %path.display(), "failed to read secrets file: {e}"),
        }

        Self { values }
    }
}

impl SecretProvider for SecretsFileProvider {
    fn name(&self) -> &str {
        "secrets-file"
    }

    fn try_resolve(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Resolves `<SCOPE>__<KEY>` against an inner provider.
pub struct ScopedSecretProvider {
    prefix: String,
    inner: Box<dyn SecretProvider>,
}

impl ScopedSecretProvider {
    pub fn new(scope: &str, inner: Box<dyn SecretProvider>) -> Self {
        Self {
            prefix: scope_prefix(scope),
            inner,
        }
    }

    /// Scope taken from `DATABRICKS_SECRET_SCOPE`, resolved against the environment.
    pub fn from_env() -> Option<Self> {
        let scope = std::env::var(SECRET_SCOPE_VAR).ok().filter(|s| !s.trim().is_empty())?;
        Some(Self::new(&scope, Box::new(EnvProvider)))
    }

    fn scoped_key(&self, key: &str) -> String {
        format!("{}__{key}", self.prefix)
    }
}

impl SecretProvider for ScopedSecretProvider {
    fn name(&self) -> &str {
        "scoped"
    }

    fn try_resolve(&self, key: &str) -> Option<String> {
        self.inner.try_resolve(&self.scoped_key(key))
    }
}

/// Uppercase, with anything outside `[A-Z0-9]` replaced by `_`.
fn scope_prefix(scope: &str) -> String {
    scope
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

/// Ordered provider chain.
#[derive(Default)]
pub struct SecretChain {
    providers: Vec<Box<dyn SecretProvider>>,
}

impl SecretChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard order: secrets file, scoped secrets (if configured), environment.
    pub fn standard() -> Self {
        let file = std::env::var(SECRETS_FILE_VAR).unwrap_or_else(|_| DEFAULT_SECRETS_FILE.to_string());
        let mut chain = Self::new().with(SecretsFileProvider::load(file));
        if let Some(scoped) = ScopedSecretProvider::from_env() {
            chain = chain.with(scoped);
        }
        chain.with(EnvProvider)
    }

    pub fn with(mut self, provider: impl SecretProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// First non-empty value, in provider order.
    pub fn resolve(&self, key: &str) -> Option<String> {
        for provider in &self.providers {
            if let Some(value) = provider.try_resolve(key).filter(|v| !v.trim().is_empty()) {
                debug!(key, provider = provider.name(), "resolved secret");
                return Some(value);
            }
        }
        None
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn first_non_empty_provider_wins() {
        let chain = SecretChain::new()
            .with(MapProvider::new("first", [("TOKEN", ""), ("HOST", "a.example")]))
            .with(MapProvider::new("second", [("TOKEN", "t0k"), ("HOST", "b.example")]));
        assert_eq!(chain.resolve("HOST").as_deref(), Some("a.example"));
        assert_eq!(chain.resolve("TOKEN").as_deref(), Some("t0k"));
        assert_eq!(chain.resolve("MISSING"), None);
        assert_eq!(chain.provider_names(), vec!["first", "second"]);
    }

    #[test]
    fn scoped_provider_prefixes_keys() {
        let inner = MapProvider::new("inner", [("LENDING_PROD__DATABRICKS_TOKEN", "scoped-token")]);
        let scoped = ScopedSecretProvider::new("lending-prod", Box::new(inner));
        assert_eq!(scoped.try_resolve("DATABRICKS_TOKEN").as_deref(), Some("scoped-token"));
        assert_eq!(scoped.try_resolve("DATABRICKS_HOST"), None);
    }

    #[test]
    fn secrets_file_is_parsed_as_dotenv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DATABRICKS_HOST=adb-1.azuredatabricks.net").unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "TABLE_JOBS=\"ops.jobs\"").unwrap();
        let provider = SecretsFileProvider::load(file.path());
        assert_eq!(provider.try_resolve("DATABRICKS_HOST").as_deref(), Some("adb-1.azuredatabricks.net"));
        assert_eq!(provider.try_resolve("TABLE_JOBS").as_deref(), Some("ops.jobs"));
    }

    #[test]
    fn missing_secrets_file_resolves_nothing() {
        let provider = SecretsFileProvider::load("/definitely/not/here/.secrets.env");
        assert_eq!(provider.try_resolve("DATABRICKS_HOST"), None);
    }
}
