// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Configuration of the edge layer.
//!
//! The configuration arrives as a loosely typed YAML (or JSON) document:
//! selectors are plain strings and every DNS provider is a record with a
//! `provider` discriminant next to optional per-provider blocks. [`EdgeConfig`]
//! mirrors that document one to one. [`EdgeConfig::into_spec`] performs every
//! construction-time check and produces the typed [`EdgeSpec`] the planners
//! consume:
//!
//! - selectors become closed enumerations (unknown values are rejected)
//! - DNS providers become a discriminated union whose payload matches its tag
//! - the settings sync block becomes an explicit state (`Disabled`, `Origin`, `Target`)
//!
//! # Example
//!
//! ```yaml
//! stack: home
//! namespace: edge-system
//! loadBalancer: metal-lb
//! ingressController: traefik
//! ipAddressPools:
//!   - name: lan
//!     addresses: ["192.168.1.240-192.168.1.250"]
//! dns:
//!   txtOwnerId: home
//!   providers:
//!     - provider: cloudflare
//!       domainFilters: ["example.com"]
//!       cloudflare:
//!         apiToken: secret-token
//! ```

use crate::catalog::Catalog;
use crate::constants::{
    DEFAULT_LOCAL_ADGUARD_URL, DEFAULT_LOCAL_ADGUARD_USERNAME, DEFAULT_TXT_OWNER_ID,
};
use crate::errors::PlanError;
use crate::registry::{
    ClusterIssuerKind, DnsProviderKind, IngressControllerKind, LoadBalancerKind, ProviderSelector,
};
use k8s_openapi::api::core::v1::ResourceRequirements;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

// ============================================================================
// Document
// ============================================================================

/// Root of the configuration document.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeConfig {
    /// Stack name, used as the prefix of every generated object name
    pub stack: String,

    /// Namespace the edge controllers are installed into
    pub namespace: String,

    /// Load balancer implementation (`metal-lb`)
    pub load_balancer: String,

    /// Ingress controller implementation (`traefik`)
    pub ingress_controller: String,

    /// Address pools of the load balancer
    #[serde(default)]
    pub ip_address_pools: Vec<IpAddressPoolConfig>,

    /// L2 advertisements. When empty, one advertisement covering every pool is synthesized.
    #[serde(default)]
    pub l2_advertisements: Vec<L2AdvertisementConfig>,

    /// Traefik options
    #[serde(default)]
    pub traefik: TraefikConfig,

    /// DNS synchronization
    #[serde(default)]
    pub dns: Option<DnsConfig>,

    /// cert-manager options
    #[serde(default)]
    pub cert_manager: CertManagerConfig,

    /// ACME cluster issuers
    #[serde(default)]
    pub cluster_issuers: Vec<ClusterIssuerConfig>,

    /// Default certificate served by the ingress controller
    #[serde(default)]
    pub default_certificate: Option<DefaultCertificateConfig>,

    /// AdGuard Home settings synchronization
    #[serde(default)]
    pub sync: Option<SyncConfig>,

    /// Chart and image pins overriding the built-in defaults
    #[serde(default)]
    pub catalog: Catalog,
}

/// An address pool.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IpAddressPoolConfig {
    /// Pool name, unique within the stack
    pub name: String,

    /// Ranges in CIDR or `first-last` notation
    pub addresses: Vec<String>,

    /// Hand out addresses without an explicit request (default: true)
    #[serde(default)]
    pub auto_assign: Option<bool>,

    /// Skip `.0` and `.255` addresses (default: true)
    #[serde(default, rename = "avoidBuggyIPs")]
    pub avoid_buggy_ips: Option<bool>,
}

/// An L2 advertisement.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct L2AdvertisementConfig {
    /// Advertisement name
    pub name: String,

    /// Names of the pools to announce
    pub ip_address_pools: Vec<String>,

    /// Interfaces to announce from (e.g., `eth0.100`)
    #[serde(default)]
    pub interfaces: Option<Vec<String>>,

    /// Nodes allowed to announce
    #[serde(default)]
    pub node_selectors: Option<Vec<LabelSelector>>,
}

/// Traefik options.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TraefikConfig {
    /// Service type (default: `LoadBalancer`)
    #[serde(default)]
    pub service_type: Option<String>,

    /// Address requested from the load balancer
    #[serde(default, rename = "loadBalancerIP")]
    pub load_balancer_ip: Option<String>,

    /// Extra service annotations
    #[serde(default)]
    pub service_annotations: BTreeMap<String, String>,

    /// Expose the dashboard (default: true)
    #[serde(default)]
    pub enable_dashboard: Option<bool>,

    /// Ingress class options
    #[serde(default)]
    pub ingress_class: IngressClassConfig,
}

/// Ingress class options.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IngressClassConfig {
    /// Class name (default: `<stack>-ingress-chart-traefik`)
    #[serde(default)]
    pub name: Option<String>,

    /// Create the class (default: true)
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Mark the class as the cluster default (default: false)
    #[serde(default)]
    pub is_default_class: Option<bool>,
}

/// DNS synchronization.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DnsConfig {
    /// Owner id written into TXT ownership records (default: `default-txt-owner-id`)
    #[serde(default)]
    pub txt_owner_id: Option<String>,

    /// One entry per external-dns instance
    #[serde(default)]
    pub providers: Vec<DnsProviderEntry>,
}

/// A DNS provider as written in the document.
///
/// `provider` selects which of the optional blocks must be present.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DnsProviderEntry {
    /// `cloudflare`, `routeros` or `adguard`
    pub provider: String,

    /// Domains this provider manages
    #[serde(default)]
    pub domain_filters: Vec<String>,

    /// Cloudflare block
    #[serde(default)]
    pub cloudflare: Option<CloudflareCredentials>,

    /// `RouterOS` block
    #[serde(default)]
    pub routeros: Option<RouterOsCredentials>,

    /// `AdGuard` Home block
    #[serde(default)]
    pub adguard: Option<AdGuardCredentials>,
}

/// Cloudflare credentials for external-dns.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudflareCredentials {
    /// API token with DNS edit permission
    pub api_token: String,

    /// Restrict external-dns to one zone
    #[serde(default)]
    pub zone_id: Option<String>,
}

/// Mikrotik `RouterOS` credentials and options.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouterOsCredentials {
    /// Device address (`host:port`)
    pub address: String,

    /// API username
    pub username: String,

    /// API password
    pub password: String,

    /// Only manage names matching these filters
    #[serde(default)]
    pub filter_include: Vec<String>,

    /// Never manage names matching these filters
    #[serde(default)]
    pub filter_exclude: Vec<String>,

    /// Sidecar log level (default: `info`)
    #[serde(default)]
    pub log_level: Option<String>,
}

/// `AdGuard` Home credentials and options.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdGuardCredentials {
    /// Instance URL (e.g., `http://adguard.local:3000`)
    pub url: String,

    /// Username
    pub username: String,

    /// Password
    pub password: String,

    /// Mark generated rules as important (default: true)
    #[serde(default)]
    pub set_important_flag: Option<bool>,

    /// Log changes without applying them (default: false)
    #[serde(default)]
    pub dry_run: Option<bool>,

    /// Sidecar log level (default: `info`)
    #[serde(default)]
    pub log_level: Option<String>,
}

/// cert-manager options.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CertManagerConfig {
    /// Install the cert-manager CRDs with the chart (default: true)
    #[serde(default, rename = "installCRDs")]
    pub install_crds: Option<bool>,
}

/// An ACME cluster issuer as written in the document.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterIssuerConfig {
    /// Issuer name
    pub name: String,

    /// `letsencrypt-prod` or `letsencrypt-staging`
    pub implementation: String,

    /// ACME registration email
    pub email: String,

    /// DNS-01 solver
    #[serde(default)]
    pub dns01: Dns01SolverConfig,
}

/// DNS-01 solver credentials.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dns01SolverConfig {
    /// Cloudflare solver
    #[serde(default)]
    pub cloudflare: Option<CloudflareSolverConfig>,
}

/// Cloudflare DNS-01 solver.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudflareSolverConfig {
    /// API token with DNS edit permission
    pub api_token: String,

    /// Restrict the solver to these zones
    #[serde(default)]
    pub dns_zones: Vec<String>,
}

/// Default certificate served by the ingress controller.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DefaultCertificateConfig {
    /// Certificate name
    pub name: String,

    /// Secret the key pair is stored in
    pub secret_name: String,

    /// Subject alternative names
    pub dns_names: Vec<String>,

    /// Name of the cluster issuer signing the certificate
    pub issuer_ref: String,

    /// Lifetime (default: `2160h`)
    #[serde(default)]
    pub duration: Option<String>,

    /// Renewal window (default: `360h`)
    #[serde(default)]
    pub renew_before: Option<String>,
}

/// AdGuard Home settings synchronization as written in the document.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// Run the sync job at all
    #[serde(default)]
    pub enabled: bool,

    /// `origin` (local instance is the source) or `target` (remote instance is the source).
    /// Required when `enabled` is true.
    #[serde(default)]
    pub mode: Option<String>,

    /// The remote instance
    #[serde(default)]
    pub origin: Option<SyncInstanceConfig>,

    /// The local instance
    #[serde(default)]
    pub local: LocalInstanceConfig,

    /// Cron schedule of the periodic run
    #[serde(default)]
    pub cron: Option<String>,

    /// Settings categories to synchronize
    #[serde(default)]
    pub features: SyncFeatures,

    /// Resource requests and limits of the job
    #[serde(default)]
    pub resources: Option<ResourceRequirements>,
}

/// A remote AdGuard Home instance.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncInstanceConfig {
    /// Instance URL
    pub url: String,
    /// Username
    pub username: String,
    /// Password
    pub password: String,
}

/// The local AdGuard Home instance. Every field has a default.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalInstanceConfig {
    /// Instance URL (default: `http://localhost:3000`)
    #[serde(default)]
    pub url: Option<String>,
    /// Username (default: `admin`)
    #[serde(default)]
    pub username: Option<String>,
    /// Password (default: empty)
    #[serde(default)]
    pub password: Option<String>,
}

/// Settings categories the sync job copies. A category left out is not synchronized.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncFeatures {
    /// General and DNS server settings
    pub general_settings: bool,
    /// Filter lists
    pub filters: bool,
    /// DHCP server configuration and static leases
    pub dhcp: bool,
    /// Client settings
    pub clients: bool,
    /// Query log configuration
    pub query_log_config: bool,
    /// Statistics configuration
    pub stats_config: bool,
    /// DNS access lists
    pub access_lists: bool,
    /// DNS rewrites
    pub rewrites: bool,
}

// ============================================================================
// Typed model
// ============================================================================

/// Validated, strongly typed configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeSpec {
    /// Stack name
    pub stack: String,
    /// Namespace of the edge controllers
    pub namespace: String,
    /// Load balancer implementation
    pub load_balancer: LoadBalancerKind,
    /// Ingress controller implementation
    pub ingress_controller: IngressControllerKind,
    /// Address pools
    pub ip_address_pools: Vec<IpAddressPoolConfig>,
    /// Explicit advertisements; empty when none were supplied
    pub l2_advertisements: Vec<L2AdvertisementConfig>,
    /// Traefik options
    pub traefik: TraefikConfig,
    /// DNS providers in document order
    pub dns_providers: Vec<DnsProviderConfig>,
    /// cert-manager options
    pub cert_manager: CertManagerConfig,
    /// Cluster issuers
    pub cluster_issuers: Vec<ClusterIssuerSpec>,
    /// Default certificate
    pub default_certificate: Option<DefaultCertificateConfig>,
    /// Settings sync state
    pub sync: SyncSpec,
    /// Chart and image pins
    pub catalog: Catalog,
}

/// A DNS provider whose payload is guaranteed to match its tag.
#[derive(Clone, Debug, PartialEq)]
pub struct DnsProviderConfig {
    /// Position in `dns.providers`
    pub index: usize,
    /// Domains this provider manages
    pub domain_filters: Vec<String>,
    /// TXT ownership marker
    pub txt_owner_id: String,
    /// Backend and its credentials
    pub backend: DnsBackend,
}

impl DnsProviderConfig {
    /// The selector of the backend.
    #[must_use]
    pub fn kind(&self) -> DnsProviderKind {
        match self.backend {
            DnsBackend::Cloudflare(_) => DnsProviderKind::Cloudflare,
            DnsBackend::RouterOs(_) => DnsProviderKind::RouterOs,
            DnsBackend::AdGuard(_) => DnsProviderKind::AdGuard,
        }
    }
}

/// Backend of a DNS provider with its payload.
#[derive(Clone, Debug, PartialEq)]
pub enum DnsBackend {
    /// Native external-dns provider
    Cloudflare(CloudflareCredentials),
    /// Webhook sidecar
    RouterOs(RouterOsCredentials),
    /// Webhook sidecar
    AdGuard(AdGuardCredentials),
}

/// A cluster issuer with a resolved ACME directory.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterIssuerSpec {
    /// Issuer name
    pub name: String,
    /// Implementation, which fixes the ACME directory
    pub kind: ClusterIssuerKind,
    /// ACME registration email
    pub email: String,
    /// DNS-01 solver
    pub dns01: Dns01SolverConfig,
}

/// Direction of the settings sync.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncMode {
    /// The local instance is the source and the remote instance the replica
    Origin,
    /// The remote instance is the source and the local instance the replica
    Target,
}

impl SyncMode {
    const ALL: [SyncMode; 2] = [SyncMode::Origin, SyncMode::Target];

    /// Configuration value of the mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SyncMode::Origin => "origin",
            SyncMode::Target => "target",
        }
    }

    fn parse(value: &str) -> Result<Self, PlanError> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == value)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|m| m.as_str()).collect();
                PlanError::unsupported("sync.mode", value, &valid)
            })
    }
}

/// One AdGuard Home instance taking part in the sync.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncInstance {
    /// Instance URL
    pub url: String,
    /// Username
    pub username: String,
    /// Password
    pub password: String,
}

/// Settings sync state.
#[derive(Clone, Debug, PartialEq)]
pub enum SyncSpec {
    /// No sync job
    Disabled,
    /// A sync job in one direction
    Enabled(Box<SyncSettings>),
}

/// Settings of an enabled sync job.
#[derive(Clone, Debug, PartialEq)]
pub struct SyncSettings {
    /// Direction
    pub mode: SyncMode,
    /// The remote instance
    pub remote: SyncInstance,
    /// The local instance
    pub local: SyncInstance,
    /// Cron schedule
    pub cron: Option<String>,
    /// Categories to synchronize
    pub features: SyncFeatures,
    /// Resource requests and limits
    pub resources: Option<ResourceRequirements>,
}

// ============================================================================
// Loading and conversion
// ============================================================================

impl EdgeConfig {
    /// Parses a YAML (or JSON) document.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::ConfigParse` if the document is malformed.
    pub fn from_yaml_str(document: &str) -> Result<Self, PlanError> {
        serde_yaml::from_str(document).map_err(|e| PlanError::ConfigParse {
            reason: e.to_string(),
        })
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::ConfigParse` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        debug!(path = %path.display(), "Loading configuration");
        let document = std::fs::read_to_string(path).map_err(|e| PlanError::ConfigParse {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::from_yaml_str(&document)
    }

    /// Validates the document and converts it into the typed model.
    ///
    /// Every construction-time failure is reported here, before any resource
    /// is built.
    ///
    /// # Errors
    ///
    /// * `PlanError::UnsupportedImplementation` - unknown selector or sync mode
    /// * `PlanError::MissingProviderConfig` - a DNS provider lacks the block its tag requires
    /// * `PlanError::MissingSyncRemote` - an enabled sync has no remote instance
    /// * `PlanError::ConfigParse` - empty stack or namespace
    pub fn into_spec(self) -> Result<EdgeSpec, PlanError> {
        if self.stack.trim().is_empty() {
            return Err(PlanError::ConfigParse {
                reason: "stack must not be empty".into(),
            });
        }
        if self.namespace.trim().is_empty() {
            return Err(PlanError::ConfigParse {
                reason: "namespace must not be empty".into(),
            });
        }

        let load_balancer = LoadBalancerKind::parse("loadBalancer", &self.load_balancer)?;
        let ingress_controller =
            IngressControllerKind::parse("ingressController", &self.ingress_controller)?;

        let dns_providers = match self.dns {
            Some(dns) => convert_dns(dns)?,
            None => Vec::new(),
        };

        let cluster_issuers = self
            .cluster_issuers
            .into_iter()
            .enumerate()
            .map(|(index, issuer)| {
                let field = format!("clusterIssuers[{index}].implementation");
                Ok(ClusterIssuerSpec {
                    kind: ClusterIssuerKind::parse(&field, &issuer.implementation)?,
                    name: issuer.name,
                    email: issuer.email,
                    dns01: issuer.dns01,
                })
            })
            .collect::<Result<Vec<_>, PlanError>>()?;

        let sync = match self.sync {
            Some(sync) => convert_sync(sync)?,
            None => SyncSpec::Disabled,
        };

        debug!(
            stack = %self.stack,
            pools = self.ip_address_pools.len(),
            advertisements = self.l2_advertisements.len(),
            dns_providers = dns_providers.len(),
            issuers = cluster_issuers.len(),
            "Configuration validated"
        );

        Ok(EdgeSpec {
            stack: self.stack,
            namespace: self.namespace,
            load_balancer,
            ingress_controller,
            ip_address_pools: self.ip_address_pools,
            l2_advertisements: self.l2_advertisements,
            traefik: self.traefik,
            dns_providers,
            cert_manager: self.cert_manager,
            cluster_issuers,
            default_certificate: self.default_certificate,
            sync,
            catalog: self.catalog,
        })
    }
}

fn convert_dns(dns: DnsConfig) -> Result<Vec<DnsProviderConfig>, PlanError> {
    let txt_owner_id = dns
        .txt_owner_id
        .unwrap_or_else(|| DEFAULT_TXT_OWNER_ID.to_string());

    dns.providers
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let field = format!("dns.providers[{index}].provider");
            let kind = DnsProviderKind::parse(&field, &entry.provider)?;
            let missing = || PlanError::MissingProviderConfig {
                index,
                provider: kind.as_str().to_string(),
                block: kind.as_str().to_string(),
            };

            let present = [
                (DnsProviderKind::Cloudflare, entry.cloudflare.is_some()),
                (DnsProviderKind::RouterOs, entry.routeros.is_some()),
                (DnsProviderKind::AdGuard, entry.adguard.is_some()),
            ];
            for (other, is_present) in present {
                if other != kind && is_present {
                    warn!(
                        index,
                        provider = %kind.as_str(),
                        block = %other.as_str(),
                        "Ignoring configuration block that does not match the provider"
                    );
                }
            }

            let backend = match kind {
                DnsProviderKind::Cloudflare => {
                    DnsBackend::Cloudflare(entry.cloudflare.ok_or_else(missing)?)
                }
                DnsProviderKind::RouterOs => {
                    DnsBackend::RouterOs(entry.routeros.ok_or_else(missing)?)
                }
                DnsProviderKind::AdGuard => DnsBackend::AdGuard(entry.adguard.ok_or_else(missing)?),
            };

            Ok(DnsProviderConfig {
                index,
                domain_filters: entry.domain_filters,
                txt_owner_id: txt_owner_id.clone(),
                backend,
            })
        })
        .collect()
}

fn convert_sync(sync: SyncConfig) -> Result<SyncSpec, PlanError> {
    if !sync.enabled {
        debug!("Settings sync disabled");
        return Ok(SyncSpec::Disabled);
    }
    let mode = SyncMode::parse(sync.mode.as_deref().unwrap_or_default())?;

    let remote = sync.origin.ok_or_else(|| PlanError::MissingSyncRemote {
        mode: mode.as_str().to_string(),
    })?;

    Ok(SyncSpec::Enabled(Box::new(SyncSettings {
        mode,
        remote: SyncInstance {
            url: remote.url,
            username: remote.username,
            password: remote.password,
        },
        local: SyncInstance {
            url: sync
                .local
                .url
                .unwrap_or_else(|| DEFAULT_LOCAL_ADGUARD_URL.to_string()),
            username: sync
                .local
                .username
                .unwrap_or_else(|| DEFAULT_LOCAL_ADGUARD_USERNAME.to_string()),
            password: sync.local.password.unwrap_or_default(),
        },
        cron: sync.cron,
        features: sync.features,
        resources: sync.resources,
    })))
}
