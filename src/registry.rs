// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Provider registry.
//!
//! Every pluggable role of the edge layer (load balancer, ingress controller,
//! DNS provider, certificate issuer) is selected by a closed enumeration. The
//! registry maps a selector string onto the backend implementing it and fails
//! with [`PlanError::UnsupportedImplementation`] for anything outside the closed
//! set, naming the valid alternatives. Resolution is pure and happens before any
//! object is built.

use crate::constants::{
    LETSENCRYPT_PROD_DIRECTORY, LETSENCRYPT_STAGING_DIRECTORY, WEBHOOK_BACKEND,
};
use crate::errors::PlanError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pluggable roles of the edge layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderRole {
    /// Allocates and announces load-balancer addresses
    LoadBalancer,
    /// Routes HTTP(S) traffic into the cluster
    IngressController,
    /// Synchronizes DNS records for exposed services
    DnsProvider,
    /// Issues certificates through an ACME directory
    ClusterIssuer,
}

impl ProviderRole {
    /// Configuration field name used in error messages.
    #[must_use]
    pub fn field(self) -> &'static str {
        match self {
            ProviderRole::LoadBalancer => "loadBalancer",
            ProviderRole::IngressController => "ingressController",
            ProviderRole::DnsProvider => "dns.providers[].provider",
            ProviderRole::ClusterIssuer => "clusterIssuers[].implementation",
        }
    }
}

impl fmt::Display for ProviderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

/// How a DNS backend is wired into external-dns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DnsIntegration {
    /// external-dns ships the provider; credentials are handed to it directly
    Native,
    /// external-dns talks to a co-located webhook sidecar
    Webhook,
}

/// Result of resolving a selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendIdentifier {
    /// Role the selector belongs to
    pub role: ProviderRole,
    /// Canonical selector value
    pub selector: &'static str,
    /// Backend implementing the selector (chart, external-dns provider name or ACME directory)
    pub backend: &'static str,
}

/// A closed enumeration selecting the implementation of one role.
pub trait ProviderSelector: Sized + Copy + 'static {
    /// Role this selector belongs to
    const ROLE: ProviderRole;

    /// Every value of the enumeration
    const ALL: &'static [Self];

    /// Canonical configuration value
    fn as_str(self) -> &'static str;

    /// Backend implementing this value
    fn backend(self) -> &'static str;

    /// Parses a configuration value.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::UnsupportedImplementation` naming `field` and every
    /// valid value when `value` is not part of the enumeration.
    fn parse(field: &str, value: &str) -> Result<Self, PlanError> {
        Self::ALL
            .iter()
            .copied()
            .find(|candidate| candidate.as_str() == value)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
                PlanError::unsupported(field, value, &valid)
            })
    }

    /// Backend identifier of this value.
    fn identify(self) -> BackendIdentifier {
        BackendIdentifier {
            role: Self::ROLE,
            selector: self.as_str(),
            backend: self.backend(),
        }
    }
}

/// Load balancer implementations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum LoadBalancerKind {
    /// `MetalLB` with L2 advertisements
    #[serde(rename = "metal-lb")]
    MetalLb,
}

impl ProviderSelector for LoadBalancerKind {
    const ROLE: ProviderRole = ProviderRole::LoadBalancer;
    const ALL: &'static [Self] = &[LoadBalancerKind::MetalLb];

    fn as_str(self) -> &'static str {
        match self {
            LoadBalancerKind::MetalLb => "metal-lb",
        }
    }

    fn backend(self) -> &'static str {
        match self {
            LoadBalancerKind::MetalLb => "metallb",
        }
    }
}

/// Ingress controller implementations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum IngressControllerKind {
    /// Traefik proxy
    #[serde(rename = "traefik")]
    Traefik,
}

impl ProviderSelector for IngressControllerKind {
    const ROLE: ProviderRole = ProviderRole::IngressController;
    const ALL: &'static [Self] = &[IngressControllerKind::Traefik];

    fn as_str(self) -> &'static str {
        match self {
            IngressControllerKind::Traefik => "traefik",
        }
    }

    fn backend(self) -> &'static str {
        match self {
            IngressControllerKind::Traefik => "traefik",
        }
    }
}

/// DNS provider implementations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum DnsProviderKind {
    /// Cloudflare, supported natively by external-dns
    #[serde(rename = "cloudflare")]
    Cloudflare,
    /// Mikrotik `RouterOS`, through a webhook sidecar
    #[serde(rename = "routeros")]
    RouterOs,
    /// `AdGuard` Home, through a webhook sidecar
    #[serde(rename = "adguard")]
    AdGuard,
}

impl DnsProviderKind {
    /// How this provider is wired into external-dns.
    #[must_use]
    pub fn integration(self) -> DnsIntegration {
        match self {
            DnsProviderKind::Cloudflare => DnsIntegration::Native,
            DnsProviderKind::RouterOs | DnsProviderKind::AdGuard => DnsIntegration::Webhook,
        }
    }
}

impl ProviderSelector for DnsProviderKind {
    const ROLE: ProviderRole = ProviderRole::DnsProvider;
    const ALL: &'static [Self] = &[
        DnsProviderKind::Cloudflare,
        DnsProviderKind::RouterOs,
        DnsProviderKind::AdGuard,
    ];

    fn as_str(self) -> &'static str {
        match self {
            DnsProviderKind::Cloudflare => "cloudflare",
            DnsProviderKind::RouterOs => "routeros",
            DnsProviderKind::AdGuard => "adguard",
        }
    }

    fn backend(self) -> &'static str {
        match self.integration() {
            DnsIntegration::Native => self.as_str(),
            DnsIntegration::Webhook => WEBHOOK_BACKEND,
        }
    }
}

/// Certificate issuer implementations, each bound to one ACME directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ClusterIssuerKind {
    /// Let's Encrypt production
    #[serde(rename = "letsencrypt-prod")]
    LetsEncryptProd,
    /// Let's Encrypt staging
    #[serde(rename = "letsencrypt-staging")]
    LetsEncryptStaging,
}

impl ClusterIssuerKind {
    /// ACME directory URL of this issuer.
    #[must_use]
    pub fn acme_directory(self) -> &'static str {
        self.backend()
    }
}

impl ProviderSelector for ClusterIssuerKind {
    const ROLE: ProviderRole = ProviderRole::ClusterIssuer;
    const ALL: &'static [Self] = &[
        ClusterIssuerKind::LetsEncryptProd,
        ClusterIssuerKind::LetsEncryptStaging,
    ];

    fn as_str(self) -> &'static str {
        match self {
            ClusterIssuerKind::LetsEncryptProd => "letsencrypt-prod",
            ClusterIssuerKind::LetsEncryptStaging => "letsencrypt-staging",
        }
    }

    fn backend(self) -> &'static str {
        match self {
            ClusterIssuerKind::LetsEncryptProd => LETSENCRYPT_PROD_DIRECTORY,
            ClusterIssuerKind::LetsEncryptStaging => LETSENCRYPT_STAGING_DIRECTORY,
        }
    }
}

/// Resolves a selector value for a role into its backend.
///
/// # Errors
///
/// Returns `PlanError::UnsupportedImplementation` when `selector` is not a
/// value of the role's enumeration.
///
/// # Example
///
/// ```rust
/// use edge_orchestrator::registry::{resolve, ProviderRole};
///
/// let backend = resolve(ProviderRole::DnsProvider, "adguard").unwrap();
/// assert_eq!(backend.backend, "webhook");
/// assert!(resolve(ProviderRole::DnsProvider, "route53").is_err());
/// ```
pub fn resolve(role: ProviderRole, selector: &str) -> Result<BackendIdentifier, PlanError> {
    let field = role.field();
    match role {
        ProviderRole::LoadBalancer => {
            LoadBalancerKind::parse(field, selector).map(ProviderSelector::identify)
        }
        ProviderRole::IngressController => {
            IngressControllerKind::parse(field, selector).map(ProviderSelector::identify)
        }
        ProviderRole::DnsProvider => {
            DnsProviderKind::parse(field, selector).map(ProviderSelector::identify)
        }
        ProviderRole::ClusterIssuer => {
            ClusterIssuerKind::parse(field, selector).map(ProviderSelector::identify)
        }
    }
}
