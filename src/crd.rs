// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed custom resources emitted by the edge layer.
//!
//! These are client-side definitions of third-party CRDs: the orchestrator
//! never installs them, it only produces instances for the controllers that own
//! them.
//!
//! # Resource Types
//!
//! ## Load Balancing (`MetalLB`)
//!
//! - [`IPAddressPool`] - A named range of addresses `MetalLB` may allocate from
//! - [`L2Advertisement`] - Announces pools on a network segment
//!
//! ## Certificates (cert-manager)
//!
//! - [`ClusterIssuer`] - ACME account bound to a directory and DNS-01 solvers
//! - [`Certificate`] - A certificate stored in a secret
//!
//! ## Controllers (k3s helm-controller)
//!
//! - [`HelmChart`] - A Helm release installed by the cluster itself

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `IPAddressPool` describes addresses `MetalLB` may hand out to `LoadBalancer` services.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "metallb.io",
    version = "v1beta1",
    kind = "IPAddressPool",
    namespaced,
    doc = "IPAddressPool is a named set of address ranges MetalLB allocates load-balancer IPs from."
)]
#[serde(rename_all = "camelCase")]
pub struct IPAddressPoolSpec {
    /// Ranges in CIDR (`192.168.10.0/24`) or range (`192.168.1.240-192.168.1.250`) notation.
    pub addresses: Vec<String>,

    /// Whether services get addresses from this pool without asking for it.
    pub auto_assign: bool,

    /// Whether to skip network and broadcast addresses (`.0` and `.255`).
    #[serde(rename = "avoidBuggyIPs")]
    pub avoid_buggy_ips: bool,
}

/// `L2Advertisement` announces pools on the local segment.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "metallb.io",
    version = "v1beta1",
    kind = "L2Advertisement",
    namespaced,
    doc = "L2Advertisement announces the listed pools via ARP/NDP from the selected nodes and interfaces."
)]
#[serde(rename_all = "camelCase")]
pub struct L2AdvertisementSpec {
    /// Names of the announced pools.
    pub ip_address_pools: Vec<String>,

    /// Interfaces to announce from (VLAN interfaces such as `eth0.100` included).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interfaces: Option<Vec<String>>,

    /// Nodes allowed to announce.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selectors: Option<Vec<LabelSelector>>,
}

/// Reference to a secret by name.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SecretRef {
    /// Secret name
    pub name: String,
}

/// Reference to one key of a secret.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SecretKeyRef {
    /// Secret name
    pub name: String,
    /// Key within the secret
    pub key: String,
}

/// `ClusterIssuer` registers an ACME account usable from every namespace.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "cert-manager.io",
    version = "v1",
    kind = "ClusterIssuer",
    doc = "ClusterIssuer is a cluster-scoped ACME issuer solving challenges through DNS-01."
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterIssuerSpec {
    /// ACME account configuration
    pub acme: AcmeIssuer,
}

/// ACME account of an issuer.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AcmeIssuer {
    /// ACME directory URL
    pub server: String,

    /// Registration email
    pub email: String,

    /// Secret the account private key is stored in
    pub private_key_secret_ref: SecretRef,

    /// Challenge solvers
    pub solvers: Vec<AcmeSolver>,
}

/// One challenge solver.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AcmeSolver {
    /// DNS-01 solver
    pub dns01: Dns01Provider,

    /// Zones this solver is used for; all zones when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<SolverSelector>,
}

/// DNS-01 provider of a solver.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dns01Provider {
    /// Cloudflare DNS-01 provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudflare: Option<CloudflareDns01>,
}

/// Cloudflare DNS-01 provider.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudflareDns01 {
    /// Secret key holding an API token with DNS edit permission
    pub api_token_secret_ref: SecretKeyRef,
}

/// Restricts a solver to some zones.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SolverSelector {
    /// DNS zones (and their subdomains) this solver answers for
    pub dns_zones: Vec<String>,
}

/// `Certificate` asks cert-manager to keep a TLS secret issued and renewed.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "cert-manager.io",
    version = "v1",
    kind = "Certificate",
    namespaced,
    doc = "Certificate requests an X.509 certificate for a set of DNS names from an issuer."
)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSpec {
    /// Secret the key pair is stored in
    pub secret_name: String,

    /// Subject alternative names
    pub dns_names: Vec<String>,

    /// Issuer signing the certificate
    pub issuer_ref: IssuerRef,

    /// Requested lifetime (e.g., "2160h")
    pub duration: String,

    /// Renewal window before expiry (e.g., "360h")
    pub renew_before: String,
}

/// Reference to an issuer.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct IssuerRef {
    /// Issuer name
    pub name: String,
    /// Issuer kind (`ClusterIssuer` or `Issuer`)
    pub kind: String,
}

/// `HelmChart` is installed by the k3s helm-controller running inside the cluster.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "helm.cattle.io",
    version = "v1",
    kind = "HelmChart",
    namespaced,
    doc = "HelmChart is a Helm release reconciled by the k3s helm-controller."
)]
#[serde(rename_all = "camelCase")]
pub struct HelmChartSpec {
    /// Chart name or `oci://` reference
    pub chart: String,

    /// Chart version
    pub version: String,

    /// Helm repository URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    /// Namespace the release is installed into
    pub target_namespace: String,

    /// Create the target namespace when missing
    pub create_namespace: bool,

    /// Values document (YAML)
    pub values_content: String,
}
