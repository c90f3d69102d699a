//! Dimensions credentials file (`~/.dimensions/dsl.ini`).
//!
//! ```ini
//! [instance.live]
//! url=https://app.dimensions.ai
//! key=xxxx
//! ```

use std::path::{Path, PathBuf};

use ::config::{Config as Settings, File, FileFormat, Source};

use crate::error::{ClientError, ClientResult};

/// Instance used when none is named.
pub const DEFAULT_INSTANCE: &str = "live";

/// Resolved credentials for one instance.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// API base (`{url}/api`).
    pub api_url: String,
    /// API key.
    pub key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("api_url", &self.api_url).finish()
    }
}

/// `~/.dimensions/dsl.ini`, if a home directory exists.
#[must_use]
pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".dimensions").join("dsl.ini"))
}

/// Turn an app host into the API base, tolerating a trailing slash or `/api`.
#[must_use]
pub fn api_base(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.ends_with("/api") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/api")
    }
}

/// Load the credentials for `[instance.{instance}]` from `path`.
pub fn load(path: &Path, instance: &str) -> ClientResult<Credentials> {
    let origin = path.display().to_string();
    select(File::from(path).format(FileFormat::Ini), instance, &origin)
}

/// Parse INI text and pick one instance.
pub fn parse(text: &str, instance: &str) -> ClientResult<Credentials> {
    select(File::from_str(text, FileFormat::Ini), instance, "credentials")
}

fn select<S>(source: S, instance: &str, origin: &str) -> ClientResult<Credentials>
where
    S: Source + Send + Sync + 'static,
{
    let mut sections = Settings::builder()
        .add_source(source)
        .build()
        .and_then(|settings| settings.collect())
        .map_err(|e| ClientError::MissingCredentials(format!("cannot read {origin}: {e}")))?;

    let name = format!("instance.{instance}");
    let section = sections
        .remove(&name)
        .and_then(|value| value.into_table().ok())
        .ok_or_else(|| ClientError::MissingCredentials(format!("no [{name}] section")))?;
    let field = |key: &str| {
        section
            .get(key)
            .and_then(|v| v.clone().into_string().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ClientError::MissingCredentials(format!("[{name}] has no {key}")))
    };

    let key = field("key")?;
    let url = field("url")?;
    url::Url::parse(&url).map_err(|e| {
        ClientError::MissingCredentials(format!("[{name}] url '{url}' is invalid: {e}"))
    })?;

    Ok(Credentials { api_url: api_base(&url), key })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# Dimensions credentials
[instance.live]
url = https://app.dimensions.ai/
key = abc123

[instance.test]
; staging
url=https://test.dimensions.ai/api
key=
";

    #[test]
    fn test_parse_live() {
        let creds = parse(SAMPLE, "live").unwrap();
        assert_eq!(creds.api_url, "https://app.dimensions.ai/api");
        assert_eq!(creds.key, "abc123");
    }

    #[test]
    fn test_missing_key() {
        let err = parse(SAMPLE, "test").unwrap_err();
        assert!(err.to_string().contains("has no key"));
    }

    #[test]
    fn test_missing_section() {
        let err = parse(SAMPLE, "prod").unwrap_err();
        assert!(matches!(err, ClientError::MissingCredentials(_)));
        assert!(err.to_string().contains("[instance.prod]"));
    }

    #[test]
    fn test_invalid_url() {
        let err = parse("[instance.live]\nurl=not a url\nkey=k\n", "live").unwrap_err();
        assert!(err.to_string().contains("is invalid"));
    }

    #[test]
    fn test_api_base() {
        assert_eq!(api_base("https://app.dimensions.ai"), "https://app.dimensions.ai/api");
        assert_eq!(api_base("https://app.dimensions.ai/api/"), "https://app.dimensions.ai/api");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dsl.ini");
        std::fs::write(&path, SAMPLE).unwrap();

        let creds = load(&path, DEFAULT_INSTANCE).unwrap();
        assert_eq!(creds.api_url, "https://app.dimensions.ai/api");
        assert_eq!(creds.key, "abc123");
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/dsl.ini"), DEFAULT_INSTANCE).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
