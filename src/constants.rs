// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the edge orchestrator.
//!
//! This module contains all numeric and string constants that form the contract
//! between the generated objects and the controllers that consume them.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// Kind referenced by `Certificate.spec.issuerRef`
pub const KIND_CLUSTER_ISSUER: &str = "ClusterIssuer";

// ============================================================================
// Webhook Sidecar Contract
// ============================================================================

/// Port the webhook sidecar serves the external-dns webhook protocol on
pub const WEBHOOK_PORT: u16 = 8888;

/// Port the webhook sidecar serves its health endpoint on
pub const WEBHOOK_HEALTH_PORT: u16 = 8080;

/// Health endpoint path exposed by every webhook sidecar
pub const WEBHOOK_HEALTH_PATH: &str = "/healthz";

/// URL external-dns uses to reach a co-located webhook sidecar
pub const WEBHOOK_LOOPBACK_URL: &str = "http://localhost:8888";

/// Name of the webhook port on the sidecar container
pub const WEBHOOK_PORT_NAME: &str = "webhook";

/// Name of the health port on the sidecar container
pub const WEBHOOK_HEALTH_PORT_NAME: &str = "healthz";

/// Backend name external-dns uses for webhook-routed providers
pub const WEBHOOK_BACKEND: &str = "webhook";

// ============================================================================
// Kubernetes Health Check Constants
// ============================================================================

/// Initial delay before the sidecar liveness/readiness probes start
pub const SIDECAR_PROBE_INITIAL_DELAY_SECS: i32 = 10;

/// Sidecar probe timeout
pub const SIDECAR_PROBE_TIMEOUT_SECS: i32 = 5;

// ============================================================================
// Certificate Constants
// ============================================================================

/// Default certificate lifetime (90 days)
pub const DEFAULT_CERTIFICATE_DURATION: &str = "2160h";

/// Default renewal window before expiry (15 days)
pub const DEFAULT_CERTIFICATE_RENEW_BEFORE: &str = "360h";

/// Let's Encrypt production ACME directory
pub const LETSENCRYPT_PROD_DIRECTORY: &str = "https://acme-v02.api.letsencrypt.org/directory";

/// Let's Encrypt staging ACME directory
pub const LETSENCRYPT_STAGING_DIRECTORY: &str =
    "https://acme-staging-v02.api.letsencrypt.org/directory";

/// Secret key holding a Cloudflare API token for DNS-01 solvers
pub const CLOUDFLARE_SOLVER_SECRET_KEY: &str = "api-token";

// ============================================================================
// DNS Synchronization Constants
// ============================================================================

/// TXT owner id used when none is configured
pub const DEFAULT_TXT_OWNER_ID: &str = "default-txt-owner-id";

/// Sources watched by every external-dns instance
pub const EXTERNAL_DNS_SOURCES: &[&str] = &[
    "gateway-httproute",
    "gateway-grpcroute",
    "gateway-tcproute",
    "gateway-tlsroute",
    "gateway-udproute",
    "ingress",
    "service",
];

/// Secret key holding the Cloudflare API token for external-dns
pub const CLOUDFLARE_TOKEN_SECRET_KEY: &str = "cf-api-token";

/// Environment variable external-dns reads the Cloudflare token from
pub const CLOUDFLARE_TOKEN_ENV: &str = "CF_API_TOKEN";

/// Default log level handed to sidecars and the sync job
pub const DEFAULT_LOG_LEVEL: &str = "info";

// ============================================================================
// AdGuard Home Sync Constants
// ============================================================================

/// URL of the local AdGuard Home instance when none is supplied
pub const DEFAULT_LOCAL_ADGUARD_URL: &str = "http://localhost:3000";

/// Username of the local AdGuard Home instance when none is supplied
pub const DEFAULT_LOCAL_ADGUARD_USERNAME: &str = "admin";

/// Secret key holding the remote instance password
pub const SYNC_REMOTE_PASSWORD_KEY: &str = "originPassword";

/// Secret key holding the local instance password
pub const SYNC_LOCAL_PASSWORD_KEY: &str = "localPassword";

/// Container name of the sync job
pub const CONTAINER_NAME_SYNC: &str = "adguard-home-sync";

// ============================================================================
// Apply Constants
// ============================================================================

/// Default field manager for server-side apply
pub const DEFAULT_FIELD_MANAGER: &str = "edge-orchestrator";
