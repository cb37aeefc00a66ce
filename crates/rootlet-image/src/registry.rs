//! Registry HTTP API client.
//!
//! Resolves an image reference to a pull token, a manifest, and raw layer
//! blobs. Every call is a single blocking attempt: no retries, no backoff.
//! The client is immutable once built and the token travels explicitly
//! with each fetch.

use std::fmt;
use std::io::Read;

use reqwest::blocking::{Client, Response};
use reqwest::header::ACCEPT;
use rootlet_common::config::RegistryConfig;
use rootlet_common::error::{Result, RootletError};
use rootlet_common::types::{Digest, ImageReference};
use serde::Deserialize;

/// Manifest formats accepted from the registry, most preferred first.
const MANIFEST_ACCEPT: &str = "application/vnd.docker.distribution.manifest.v2+json, \
     application/vnd.oci.image.manifest.v1+json, \
     application/vnd.docker.distribution.manifest.v1+prettyjws, \
     application/vnd.docker.distribution.manifest.v1+json";

/// A streaming layer blob body.
pub type BlobReader = Box<dyn Read + Send>;

/// Bearer token scoped to pulling one repository.
///
/// Lives for a single run and is never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wraps a raw token value.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// One filesystem layer listed by a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDescriptor {
    /// Content digest of the layer blob.
    pub digest: Digest,
}

/// Image manifest reduced to what the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Repository name reported by the registry.
    pub name: String,
    /// Tag reported by the registry.
    pub tag: String,
    /// Layers in extraction order.
    pub layers: Vec<LayerDescriptor>,
}

/// Token endpoint response. Registries send `token`, `access_token`, or both.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

/// Wire form covering schema 1 (`fsLayers`), schema 2 and OCI (`layers`)
/// manifests, plus enough of a manifest list to recognize one.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    fs_layers: Option<Vec<WireFsLayer>>,
    #[serde(default)]
    layers: Option<Vec<WireLayer>>,
    #[serde(default)]
    manifests: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFsLayer {
    blob_sum: Digest,
}

#[derive(Debug, Deserialize)]
struct WireLayer {
    digest: Digest,
}

/// Blocking client for one registry.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: Client,
    config: RegistryConfig,
}

impl RegistryClient {
    /// Builds a client for the registry described by `config`.
    ///
    /// The whole-request timeout is disabled so large blobs are not cut
    /// off mid-transfer.
    ///
    /// # Errors
    ///
    /// Returns `RootletError::Config` if the HTTP client cannot be built.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("rootlet/", env!("CARGO_PKG_VERSION")))
            .timeout(Option::<std::time::Duration>::None)
            .build()
            .map_err(|e| RootletError::Config {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http, config })
    }

    /// Exchanges the repository name for a pull-scoped bearer token.
    ///
    /// # Errors
    ///
    /// Returns `RootletError::Auth` on network failure, a non-200 status,
    /// or a payload without a token.
    pub fn resolve(&self, reference: &ImageReference) -> Result<AuthToken> {
        let repository = reference.repository();
        let auth_err = |message: String| RootletError::Auth {
            repository: repository.to_string(),
            message,
        };
        let scope = format!("repository:{repository}:pull");
        tracing::debug!(url = %self.config.auth_url, %scope, "requesting registry token");

        let response = self
            .http
            .get(&self.config.auth_url)
            .query(&[("service", self.config.service.as_str()), ("scope", scope.as_str())])
            .send()
            .map_err(|e| auth_err(e.to_string()))?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(auth_err(format!("HTTP {}", response.status())));
        }

        let body: TokenResponse = response
            .json()
            .map_err(|e| auth_err(format!("malformed token response: {e}")))?;
        let token = body
            .token
            .or(body.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| auth_err("token response carries no token".into()))?;

        tracing::info!(repository, "registry token acquired");
        Ok(AuthToken(token))
    }

    /// Fetches and decodes the manifest for the reference's tag.
    ///
    /// Layer order is kept exactly as the document lists it. An empty
    /// layer list is accepted.
    ///
    /// # Errors
    ///
    /// Returns `RootletError::Manifest` on transport failure, a
    /// non-success status, an undecodable payload, or a manifest list.
    pub fn fetch_manifest(&self, reference: &ImageReference, token: &AuthToken) -> Result<Manifest> {
        let manifest_err = |message: String| RootletError::Manifest {
            reference: reference.to_string(),
            message,
        };
        let url = format!(
            "{}/v2/{}/manifests/{}",
            self.base_url(),
            reference.repository(),
            reference.tag()
        );
        tracing::debug!(%url, "fetching manifest");

        let response = self
            .http
            .get(&url)
            .bearer_auth(token.as_str())
            .header(ACCEPT, MANIFEST_ACCEPT)
            .send()
            .map_err(|e| manifest_err(e.to_string()))?;
        if !response.status().is_success() {
            return Err(manifest_err(format!("HTTP {}", response.status())));
        }

        let body = response
            .bytes()
            .map_err(|e| manifest_err(format!("failed to read body: {e}")))?;
        let manifest = decode_manifest(&body, reference).map_err(manifest_err)?;

        tracing::info!(
            reference = %reference,
            layers = manifest.layers.len(),
            "manifest resolved"
        );
        Ok(manifest)
    }

    /// Opens a streaming download of one layer blob.
    ///
    /// # Errors
    ///
    /// Returns `RootletError::Blob` on transport failure or a non-success
    /// status. Errors while reading the stream surface from the reader.
    pub fn fetch_blob(
        &self,
        reference: &ImageReference,
        digest: &Digest,
        token: &AuthToken,
    ) -> Result<BlobReader> {
        let blob_err = |message: String| RootletError::Blob {
            digest: digest.to_string(),
            message,
        };
        let url = format!(
            "{}/v2/{}/blobs/{}",
            self.base_url(),
            reference.repository(),
            digest
        );
        tracing::debug!(%url, "fetching blob");

        let response: Response = self
            .http
            .get(&url)
            .bearer_auth(token.as_str())
            .send()
            .map_err(|e| blob_err(e.to_string()))?;
        if !response.status().is_success() {
            return Err(blob_err(format!("HTTP {}", response.status())));
        }
        Ok(Box::new(response))
    }

    fn base_url(&self) -> &str {
        self.config.registry_url.trim_end_matches('/')
    }
}

/// Decodes a manifest document into the pipeline's view of it.
///
/// Missing `name`/`tag` fields (schema 2 omits them) are filled from the
/// reference that was requested.
fn decode_manifest(body: &[u8], reference: &ImageReference) -> std::result::Result<Manifest, String> {
    let wire: WireManifest =
        serde_json::from_slice(body).map_err(|e| format!("undecodable manifest: {e}"))?;

    if wire.manifests.is_some() {
        return Err("manifest lists are not supported".into());
    }

    let layers = match (wire.fs_layers, wire.layers) {
        (Some(fs_layers), _) => fs_layers
            .into_iter()
            .map(|l| LayerDescriptor { digest: l.blob_sum })
            .collect(),
        (None, Some(layers)) => layers
            .into_iter()
            .map(|l| LayerDescriptor { digest: l.digest })
            .collect(),
        (None, None) => Vec::new(),
    };

    Ok(Manifest {
        name: wire
            .name
            .unwrap_or_else(|| reference.repository().to_string()),
        tag: wire.tag.unwrap_or_else(|| reference.tag().to_string()),
        layers,
    })
}
