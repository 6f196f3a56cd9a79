//! Docker-style image reference parsing.
//!
//! `alpine` becomes `registry-1.docker.io/library/alpine:latest`;
//! `ghcr.io/org/app@sha256:...` keeps its registry and digest.

use std::fmt;
use std::str::FromStr;

use runlet_common::constants::{
    DEFAULT_TAG, DOCKER_HUB_ALIAS, DOCKER_HUB_LIBRARY, DOCKER_HUB_REGISTRY, MAX_IMAGE_REF_LEN,
};
use runlet_common::error::{Result, RunletError};

/// A fully-qualified image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Registry host, with port if any.
    pub registry: String,
    /// Repository path within the registry.
    pub repository: String,
    /// Tag, if given.
    pub tag: Option<String>,
    /// Content digest, if given. Takes precedence over the tag.
    pub digest: Option<String>,
}

impl ImageReference {
    /// Parses `reference`, filling in Docker Hub defaults.
    ///
    /// # Errors
    ///
    /// Returns `RunletError::InvalidReference` for empty, overlong, or
    /// malformed references.
    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = |reason: &str| RunletError::InvalidReference {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };

        if reference.is_empty() {
            return Err(invalid("empty reference"));
        }
        if reference.len() > MAX_IMAGE_REF_LEN {
            return Err(invalid(&format!("exceeds {MAX_IMAGE_REF_LEN} bytes")));
        }
        if !reference
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '-' | '_' | '@'))
        {
            return Err(invalid("contains invalid characters"));
        }

        let (name, digest) = match reference.split_once('@') {
            Some((name, digest)) => {
                if !digest.contains(':') {
                    return Err(invalid("digest must be <algorithm>:<hex>"));
                }
                (name, Some(digest.to_string()))
            }
            None => (reference, None),
        };

        let last_slash = name.rfind('/').map_or(0, |i| i + 1);
        let (name, tag) = match name[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                (&name[..split], Some(name[split + 1..].to_string()))
            }
            None => (name, None),
        };
        if tag.as_deref() == Some("") {
            return Err(invalid("empty tag"));
        }

        let (registry, repository) = match name.split_once('/') {
            Some((first, rest)) if is_registry_host(first) => (first.to_string(), rest.to_string()),
            _ => (DOCKER_HUB_REGISTRY.to_string(), name.to_string()),
        };
        let registry = if registry == DOCKER_HUB_ALIAS {
            DOCKER_HUB_REGISTRY.to_string()
        } else {
            registry
        };

        if repository.is_empty() || repository.split('/').any(str::is_empty) {
            return Err(invalid("empty repository component"));
        }
        if repository.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(invalid("repository must be lowercase"));
        }

        let repository = if registry == DOCKER_HUB_REGISTRY && !repository.contains('/') {
            format!("{DOCKER_HUB_LIBRARY}/{repository}")
        } else {
            repository
        };

        let tag = if tag.is_none() && digest.is_none() {
            Some(DEFAULT_TAG.to_string())
        } else {
            tag
        };

        Ok(Self {
            registry,
            repository,
            tag,
            digest,
        })
    }

    /// The tag or digest to request the manifest by.
    #[must_use]
    pub fn manifest_ref(&self) -> &str {
        self.digest
            .as_deref()
            .or(self.tag.as_deref())
            .unwrap_or(DEFAULT_TAG)
    }

    /// Base URL of the registry's v2 API.
    #[must_use]
    pub fn api_base(&self) -> String {
        let scheme = if is_loopback(&self.registry) {
            "http"
        } else {
            "https"
        };
        format!("{scheme}://{}/v2", self.registry)
    }
}

impl FromStr for ImageReference {
    type Err = RunletError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

fn is_registry_host(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

fn is_loopback(registry: &str) -> bool {
    let host = registry.split(':').next().unwrap_or(registry);
    host == "localhost" || host == "127.0.0.1"
}
