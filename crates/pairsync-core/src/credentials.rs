//! Storage credential sources.
//!
//! The engine never reads credentials itself. A [`CredentialProvider`] is built
//! once by the caller and resolved when the blob store is constructed; the
//! resolved value is an opaque connection string handed to the backend.

use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::error::{PairsyncError, Result};

/// Environment variable (and secrets-file key) holding the connection string
pub const CONNECTION_STRING_VAR: &str = "AZURE_STORAGE_CONNECTION_STRING";

const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Where a connection string comes from.
#[derive(Clone)]
pub enum CredentialProvider {
    /// Value passed directly (e.g. `--connection-string`)
    Explicit(String),
    /// Read from an environment variable
    EnvVar(String),
    /// Read `key` from a dotenv-style secrets file
    File { path: PathBuf, key: String },
    /// First provider yielding a value wins
    Chain(Vec<CredentialProvider>),
}

impl CredentialProvider {
    /// Explicit value, then `AZURE_STORAGE_CONNECTION_STRING`, then the secrets file.
    pub fn default_chain(explicit: Option<String>, secrets_file: Option<PathBuf>) -> Self {
        let mut providers = Vec::new();
        if let Some(value) = explicit {
            providers.push(CredentialProvider::Explicit(value));
        }
        providers.push(CredentialProvider::EnvVar(CONNECTION_STRING_VAR.to_string()));
        if let Some(path) = secrets_file {
            providers.push(CredentialProvider::File {
                path,
                key: CONNECTION_STRING_VAR.to_string(),
            });
        }
        CredentialProvider::Chain(providers)
    }

    /// Put an explicit value in front of this provider.
    pub fn with_explicit(self, value: String) -> Self {
        CredentialProvider::Chain(vec![CredentialProvider::Explicit(value), self])
    }

    /// Resolve to a connection string, failing when no source yields one.
    pub fn resolve(&self) -> Result<String> {
        self.lookup()?.ok_or_else(|| {
            PairsyncError::Credentials(format!(
                "connection string not found ({}); set {} or provide a secrets file",
                self.describe(),
                CONNECTION_STRING_VAR
            ))
        })
    }

    fn lookup(&self) -> Result<Option<String>> {
        match self {
            CredentialProvider::Explicit(value) => Ok(non_empty(value)),
            CredentialProvider::EnvVar(name) => Ok(env::var(name).ok().and_then(|v| non_empty(&v))),
            CredentialProvider::File { path, key } => {
                if !path.exists() {
                    tracing::debug!(path = %path.display(), "Secrets file not present");
                    return Ok(None);
                }
                let entries = dotenvy::from_path_iter(path).map_err(|e| {
                    PairsyncError::Credentials(format!(
                        "failed to read secrets file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                for entry in entries {
                    let (name, value) = entry.map_err(|e| {
                        PairsyncError::Credentials(format!(
                            "malformed secrets file {}: {}",
                            path.display(),
                            e
                        ))
                    })?;
                    if &name == key {
                        return Ok(non_empty(&value));
                    }
                }
                Ok(None)
            }
            CredentialProvider::Chain(providers) => {
                for provider in providers {
                    if let Some(value) = provider.lookup()? {
                        return Ok(Some(value));
                    }
                }
                Ok(None)
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            CredentialProvider::Explicit(_) => "explicit value".to_string(),
            CredentialProvider::EnvVar(name) => format!("env {}", name),
            CredentialProvider::File { path, .. } => format!("file {}", path.display()),
            CredentialProvider::Chain(providers) => providers
                .iter()
                .map(|p| p.describe())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialProvider::Explicit(_) => f.write_str("Explicit(<redacted>)"),
            other => f.write_str(&other.describe()),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parsed Azure Storage connection string.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AzureConnectionString {
    pub account_name: Option<String>,
    pub account_key: Option<String>,
    pub sas_token: Option<String>,
    pub blob_endpoint: Option<String>,
    pub protocol: Option<String>,
    pub endpoint_suffix: Option<String>,
    pub use_development_storage: bool,
}

impl AzureConnectionString {
    /// Parse `Key=Value;Key=Value` segments. Values may themselves contain `=`.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut parsed = AzureConnectionString::default();

        for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                PairsyncError::Credentials(
                    "malformed connection string segment (missing '=')".to_string(),
                )
            })?;
            let value = value.trim().to_string();
            match key.trim().to_ascii_lowercase().as_str() {
                "accountname" => parsed.account_name = Some(value),
                "accountkey" => parsed.account_key = Some(value),
                "sharedaccesssignature" => parsed.sas_token = Some(value),
                "blobendpoint" => parsed.blob_endpoint = Some(value),
                "defaultendpointsprotocol" => parsed.protocol = Some(value),
                "endpointsuffix" => parsed.endpoint_suffix = Some(value),
                "usedevelopmentstorage" => {
                    parsed.use_development_storage = value.eq_ignore_ascii_case("true")
                }
                other => tracing::debug!(key = %other, "Ignoring connection string key"),
            }
        }

        if !parsed.use_development_storage {
            if parsed.account_name.is_none() {
                return Err(PairsyncError::Credentials(
                    "connection string is missing AccountName".to_string(),
                ));
            }
            if parsed.account_key.is_none() && parsed.sas_token.is_none() {
                return Err(PairsyncError::Credentials(
                    "connection string needs AccountKey or SharedAccessSignature".to_string(),
                ));
            }
        }

        Ok(parsed)
    }

    /// Blob endpoint to use instead of the public Azure one, if any.
    pub fn custom_endpoint(&self) -> Option<String> {
        if let Some(endpoint) = &self.blob_endpoint {
            return Some(endpoint.trim_end_matches('/').to_string());
        }
        match (&self.account_name, &self.endpoint_suffix) {
            (Some(account), Some(suffix)) if suffix != DEFAULT_ENDPOINT_SUFFIX => Some(format!(
                "{}://{}.blob.{}",
                self.protocol.as_deref().unwrap_or("https"),
                account,
                suffix
            )),
            _ => None,
        }
    }

    pub fn allows_http(&self) -> bool {
        self.use_development_storage
            || self
                .protocol
                .as_deref()
                .is_some_and(|p| p.eq_ignore_ascii_case("http"))
            || self
                .custom_endpoint()
                .is_some_and(|e| e.starts_with("http://"))
    }
}

impl fmt::Debug for AzureConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureConnectionString")
            .field("account_name", &self.account_name)
            .field("account_key", &self.account_key.as_ref().map(|_| "<redacted>"))
            .field("sas_token", &self.sas_token.as_ref().map(|_| "<redacted>"))
            .field("blob_endpoint", &self.blob_endpoint)
            .field("use_development_storage", &self.use_development_storage)
            .finish()
    }
}
