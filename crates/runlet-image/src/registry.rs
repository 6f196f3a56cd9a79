//! OCI / Docker registry image source.
//!
//! Pulls an image over the distribution v2 HTTP API:
//! 1. Fetches the manifest, obtaining an anonymous bearer token when the
//!    registry answers `401`.
//! 2. Resolves multi-platform indexes to `linux/<host arch>`.
//! 3. Streams every layer blob into an anonymous temporary file while
//!    hashing it, verifies its SHA-256 digest, and wraps the file in a
//!    decompressing reader chosen by media type.
//!
//! Nothing is cached; every pull downloads every layer. Layers live on disk
//! until the returned streams are dropped, never all in memory at once.

use std::fs::File;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, AUTHORIZATION, WWW_AUTHENTICATE};
use runlet_common::constants::{MAX_IMAGE_LAYERS, REGISTRY_TIMEOUT};
use runlet_common::error::{Result, RunletError};
use runlet_common::types::Sha256Hash;
use serde::Deserialize;

use crate::layer::LayerStream;
use crate::reference::ImageReference;
use crate::source::ImageSource;

const MANIFEST_ACCEPT: &str = "application/vnd.oci.image.index.v1+json, \
     application/vnd.docker.distribution.manifest.list.v2+json, \
     application/vnd.oci.image.manifest.v1+json, \
     application/vnd.docker.distribution.manifest.v2+json";

/// Compression applied to a layer blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerCompression {
    /// Plain tar.
    None,
    /// gzip-compressed tar.
    Gzip,
    /// zstd-compressed tar.
    Zstd,
}

impl LayerCompression {
    /// Maps a layer media type to its compression, if supported.
    #[must_use]
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        if media_type.ends_with("+zstd") {
            Some(Self::Zstd)
        } else if media_type.ends_with("+gzip") || media_type.ends_with(".tar.gzip") {
            Some(Self::Gzip)
        } else if media_type.ends_with(".tar") {
            Some(Self::None)
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    #[serde(default)]
    media_type: Option<String>,
    #[serde(default)]
    manifests: Vec<PlatformManifest>,
    #[serde(default)]
    layers: Vec<Descriptor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlatformManifest {
    digest: String,
    #[serde(default)]
    platform: Option<Platform>,
}

#[derive(Debug, Deserialize)]
struct Platform {
    os: String,
    architecture: String,
    #[serde(default)]
    variant: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Descriptor {
    media_type: String,
    digest: String,
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

/// Per-pull state: the parsed reference and any bearer token obtained.
struct Session {
    reference: ImageReference,
    token: Option<String>,
}

/// Image source pulling from an OCI/Docker registry.
#[derive(Debug)]
pub struct RegistrySource {
    client: Client,
    architecture: &'static str,
}

impl RegistrySource {
    /// Creates a registry source for the host architecture.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(REGISTRY_TIMEOUT)
            .user_agent(concat!("runlet/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RunletError::Config {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            architecture: oci_architecture(),
        })
    }

    fn pull(&self, reference: &str) -> Result<Vec<LayerStream>> {
        let mut session = Session {
            reference: ImageReference::parse(reference)?,
            token: None,
        };
        tracing::info!(reference = %session.reference, "pulling image");

        let manifest_ref = session.reference.manifest_ref().to_string();
        let mut manifest = self.fetch_manifest(&mut session, &manifest_ref)?;
        if !manifest.manifests.is_empty() {
            let digest = self.resolve_platform(&session, &manifest)?;
            tracing::debug!(digest = %digest, arch = self.architecture, "resolved platform manifest");
            manifest = self.fetch_manifest(&mut session, &digest)?;
        }
        if manifest.layers.is_empty() {
            return Err(registry_error(
                &session,
                format!(
                    "manifest {} lists no layers",
                    manifest.media_type.as_deref().unwrap_or("of unknown type")
                ),
            ));
        }
        if manifest.layers.len() > MAX_IMAGE_LAYERS {
            return Err(registry_error(
                &session,
                format!(
                    "too many layers: {} > {MAX_IMAGE_LAYERS}",
                    manifest.layers.len()
                ),
            ));
        }

        manifest
            .layers
            .iter()
            .map(|layer| self.fetch_layer(&mut session, layer))
            .collect()
    }

    fn fetch_manifest(&self, session: &mut Session, manifest_ref: &str) -> Result<Manifest> {
        let url = format!(
            "{}/{}/manifests/{manifest_ref}",
            session.reference.api_base(),
            session.reference.repository
        );
        let body = self.get(session, &url, Some(MANIFEST_ACCEPT))?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn resolve_platform(&self, session: &Session, index: &Manifest) -> Result<String> {
        select_platform(&index.manifests, self.architecture).ok_or_else(|| {
            let available: Vec<String> = index
                .manifests
                .iter()
                .filter_map(|m| m.platform.as_ref())
                .map(|p| format!("{}/{}", p.os, p.architecture))
                .collect();
            registry_error(
                session,
                format!(
                    "no linux/{} manifest (available: {})",
                    self.architecture,
                    available.join(", ")
                ),
            )
        })
    }

    fn fetch_layer(&self, session: &mut Session, layer: &Descriptor) -> Result<LayerStream> {
        let compression = LayerCompression::from_media_type(&layer.media_type).ok_or_else(|| {
            registry_error(
                session,
                format!("unsupported layer media type {}", layer.media_type),
            )
        })?;
        let expected = Sha256Hash::from_digest(&layer.digest)?;

        tracing::debug!(digest = %layer.digest, size = layer.size, "downloading layer");
        let url = format!(
            "{}/{}/blobs/{}",
            session.reference.api_base(),
            session.reference.repository,
            layer.digest
        );
        let response = self.fetch(session, &url, None)?;
        let reader = crate::hash::spool_verified(&layer.digest, response, &expected)?;

        layer_stream(&layer.digest, compression, reader).map_err(|e| {
            registry_error(session, format!("decoder init for {}: {e}", layer.digest))
        })
    }

    /// Performs a GET and reads the whole (small) body.
    fn get(&self, session: &mut Session, url: &str, accept: Option<&str>) -> Result<Vec<u8>> {
        let response = self.fetch(session, url, accept)?;
        let bytes = response
            .bytes()
            .map_err(|e| registry_error(session, format!("reading {url}: {e}")))?;
        Ok(bytes.to_vec())
    }

    /// Performs a GET, authenticating once if the registry demands it, and
    /// returns the successful response with its body still unread.
    fn fetch(
        &self,
        session: &mut Session,
        url: &str,
        accept: Option<&str>,
    ) -> Result<reqwest::blocking::Response> {
        let mut response = self.send(self.request(session, url, accept), session, url)?;

        if response.status() == StatusCode::UNAUTHORIZED && session.token.is_none() {
            let challenge = response
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| registry_error(session, "401 without an auth challenge".into()))?;
            session.token = Some(self.authenticate(session, &challenge)?);
            response = self.send(self.request(session, url, accept), session, url)?;
        }

        if !response.status().is_success() {
            return Err(registry_error(
                session,
                format!("HTTP {} for {url}", response.status()),
            ));
        }
        Ok(response)
    }

    fn request(&self, session: &Session, url: &str, accept: Option<&str>) -> RequestBuilder {
        let mut request = self.client.get(url);
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }
        if let Some(token) = &session.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        request
    }

    fn send(
        &self,
        request: RequestBuilder,
        session: &Session,
        url: &str,
    ) -> Result<reqwest::blocking::Response> {
        request
            .send()
            .map_err(|e| registry_error(session, format!("GET {url}: {e}")))
    }

    /// Obtains an anonymous pull token from the challenge's realm.
    fn authenticate(&self, session: &Session, challenge: &str) -> Result<String> {
        let params = parse_bearer_challenge(challenge).ok_or_else(|| {
            registry_error(session, format!("unsupported auth challenge: {challenge}"))
        })?;
        let realm = params
            .iter()
            .find(|(k, _)| k == "realm")
            .map(|(_, v)| v.clone())
            .ok_or_else(|| registry_error(session, "auth challenge without realm".into()))?;

        let mut query: Vec<(String, String)> = params
            .into_iter()
            .filter(|(k, _)| k == "service" || k == "scope")
            .collect();
        if !query.iter().any(|(k, _)| k == "scope") {
            query.push((
                "scope".into(),
                format!("repository:{}:pull", session.reference.repository),
            ));
        }

        tracing::debug!(realm = %realm, "requesting registry token");
        let response = self
            .client
            .get(&realm)
            .query(&query)
            .send()
            .map_err(|e| registry_error(session, format!("token request: {e}")))?;
        if !response.status().is_success() {
            return Err(registry_error(
                session,
                format!("token request returned HTTP {}", response.status()),
            ));
        }
        let body = response
            .bytes()
            .map_err(|e| registry_error(session, format!("token response: {e}")))?;
        let token: TokenResponse = serde_json::from_slice(&body)?;
        token
            .token
            .or(token.access_token)
            .ok_or_else(|| registry_error(session, "token response without a token".into()))
    }
}

impl ImageSource for RegistrySource {
    fn layers(&self, reference: &str) -> Result<Vec<LayerStream>> {
        self.pull(reference)
    }
}

fn registry_error(session: &Session, message: String) -> RunletError {
    RunletError::Registry {
        reference: session.reference.to_string(),
        message,
    }
}

/// Picks the `linux/<architecture>` entry of an image index.
fn select_platform(manifests: &[PlatformManifest], architecture: &str) -> Option<String> {
    let candidates = manifests.iter().filter(|m| {
        m.platform
            .as_ref()
            .is_some_and(|p| p.os == "linux" && p.architecture == architecture)
    });
    let mut fallback = None;
    for manifest in candidates {
        let variant = manifest.platform.as_ref().and_then(|p| p.variant.as_deref());
        // arm images list several variants; prefer v7 when present.
        if architecture != "arm" || variant == Some("v7") {
            return Some(manifest.digest.clone());
        }
        let _ = fallback.get_or_insert_with(|| manifest.digest.clone());
    }
    fallback
}

/// Wraps a verified blob in the decompressor its media type calls for.
fn layer_stream(
    digest: &str,
    compression: LayerCompression,
    blob: File,
) -> std::io::Result<LayerStream> {
    Ok(match compression {
        LayerCompression::None => LayerStream::new(digest, blob),
        LayerCompression::Gzip => LayerStream::new(digest, flate2::read::GzDecoder::new(blob)),
        LayerCompression::Zstd => {
            LayerStream::new(digest, zstd::stream::read::Decoder::new(blob)?)
        }
    })
}

/// Splits `Bearer k="v",k2="v2"` into its parameters.
fn parse_bearer_challenge(challenge: &str) -> Option<Vec<(String, String)>> {
    let (scheme, rest) = challenge.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let mut params = Vec::new();
    let mut chars = rest.chars().peekable();
    loop {
        while chars.peek().is_some_and(|c| *c == ',' || c.is_whitespace()) {
            let _ = chars.next();
        }
        let key: String = chars.by_ref().take_while(|c| *c != '=').collect();
        if key.is_empty() {
            break;
        }
        let value: String = if chars.peek() == Some(&'"') {
            let _ = chars.next();
            chars.by_ref().take_while(|c| *c != '"').collect()
        } else {
            chars.by_ref().take_while(|c| *c != ',').collect()
        };
        params.push((key.trim().to_ascii_lowercase(), value));
    }
    Some(params)
}

/// The OCI architecture name of the host.
const fn oci_architecture() -> &'static str {
    if cfg!(target_arch = "x86_64") {
        "amd64"
    } else if cfg!(target_arch = "aarch64") {
        "arm64"
    } else if cfg!(target_arch = "arm") {
        "arm"
    } else if cfg!(target_arch = "x86") {
        "386"
    } else if cfg!(target_arch = "powerpc64") {
        "ppc64le"
    } else if cfg!(target_arch = "s390x") {
        "s390x"
    } else if cfg!(target_arch = "riscv64") {
        "riscv64"
    } else {
        std::env::consts::ARCH
    }
}
