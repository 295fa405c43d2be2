// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Helm chart and container image catalog.
//!
//! The catalog pins every chart and image the edge layer deploys. It is built
//! once at process start (defaults, optionally overridden by the `catalog`
//! section of the configuration file) and passed by reference to every builder
//! that needs it. Nothing in the crate reads chart or image coordinates from
//! anywhere else.

use crate::errors::PlanError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Coordinates of a Helm chart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChartRef {
    /// Chart name, or a full `oci://` reference
    pub chart: String,

    /// Chart version
    pub version: String,

    /// Helm repository URL; absent for OCI charts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

impl ChartRef {
    fn new(chart: &str, version: &str, repository: &str) -> Self {
        Self {
            chart: chart.to_string(),
            version: version.to_string(),
            repository: Some(repository.to_string()),
        }
    }

    /// Whether the chart is pulled from an OCI registry rather than a Helm repository.
    #[must_use]
    pub fn is_oci(&self) -> bool {
        self.chart.starts_with("oci://")
    }
}

/// Charts deployed by the edge layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartCatalog {
    /// `MetalLB` load balancer
    pub metallb: ChartRef,
    /// Traefik ingress controller
    pub traefik: ChartRef,
    /// external-dns
    pub external_dns: ChartRef,
    /// cert-manager
    pub cert_manager: ChartRef,
}

impl Default for ChartCatalog {
    fn default() -> Self {
        Self {
            metallb: ChartRef::new("metallb", "0.14.9", "https://metallb.github.io/metallb"),
            traefik: ChartRef::new("traefik", "36.3.0", "https://traefik.github.io/charts"),
            external_dns: ChartRef::new(
                "external-dns",
                "1.17.0",
                "https://kubernetes-sigs.github.io/external-dns",
            ),
            cert_manager: ChartRef::new("cert-manager", "v1.18.2", "https://charts.jetstack.io"),
        }
    }
}

/// Container images deployed by the edge layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageCatalog {
    /// external-dns webhook provider for Mikrotik `RouterOS`
    pub routeros_webhook: String,
    /// external-dns webhook provider for `AdGuard` Home
    pub adguard_webhook: String,
    /// `AdGuard` Home settings synchronizer
    pub adguard_home_sync: String,
}

impl Default for ImageCatalog {
    fn default() -> Self {
        Self {
            routeros_webhook: "docker.io/benfiola/external-dns-routeros-provider:v2.0.1".into(),
            adguard_webhook: "ghcr.io/muhlba91/external-dns-provider-adguard:v9.0.0".into(),
            adguard_home_sync: "ghcr.io/bakito/adguardhome-sync:v0.7.6".into(),
        }
    }
}

/// Immutable catalog of everything the edge layer pulls.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Catalog {
    /// Helm charts
    pub charts: ChartCatalog,
    /// Container images
    pub images: ImageCatalog,
}

/// A container image reference split into repository and tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRef {
    /// Registry and repository (e.g., "ghcr.io/muhlba91/external-dns-provider-adguard")
    pub repository: String,
    /// Tag; `latest` when the reference carries none
    pub tag: String,
}

impl ImageRef {
    /// Splits an image reference into repository and tag.
    ///
    /// A `:` is only treated as the tag separator when it appears after the last
    /// `/`, so registry ports (`registry:5000/app`) are preserved.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::InvalidImageReference` for an empty reference, an
    /// empty repository or an empty tag.
    pub fn parse(image: &str) -> Result<Self, PlanError> {
        let image = image.trim();
        if image.is_empty() {
            return Err(PlanError::InvalidImageReference {
                image: image.to_string(),
                reason: "reference is empty".into(),
            });
        }

        let last_slash = image.rfind('/').map_or(0, |i| i + 1);
        let (repository, tag) = match image[last_slash..].rfind(':') {
            Some(offset) => {
                let split = last_slash + offset;
                (&image[..split], &image[split + 1..])
            }
            None => (image, "latest"),
        };

        if repository.is_empty() || tag.is_empty() {
            return Err(PlanError::InvalidImageReference {
                image: image.to_string(),
                reason: "expected <repository>[:<tag>]".into(),
            });
        }

        Ok(Self {
            repository: repository.to_string(),
            tag: tag.to_string(),
        })
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}
