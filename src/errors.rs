// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for planning and applying the edge layer.
//!
//! This module provides specialized error types for:
//! - Construction-time validation of the configuration (unsupported selectors,
//!   mismatched provider payloads, malformed credentials)
//! - Stage failures of the certificate chain
//! - Dependency graph validation (cycles, unknown edges, duplicate ids)
//! - Materialization of a plan against a cluster
//!
//! Every construction-time error names the offending field so that the user can
//! fix the configuration without reading the source.

use thiserror::Error;

/// Errors that can occur while turning a configuration into a deployment plan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A selector value is outside the closed set of implementations for its role.
    ///
    /// Never coerced to a default implementation.
    #[error("Unsupported implementation '{value}' for {field}. Supported implementations: {}", .valid.join(", "))]
    UnsupportedImplementation {
        /// Configuration field holding the selector (e.g., "dns.providers[1].provider")
        field: String,
        /// The unrecognized value
        value: String,
        /// The closed set of valid values
        valid: Vec<String>,
    },

    /// A DNS provider is tagged with a backend but the matching payload block is absent.
    #[error("DNS provider #{index} is '{provider}' but its '{block}' configuration block is missing")]
    MissingProviderConfig {
        /// Position of the provider in `dns.providers`
        index: usize,
        /// The provider tag
        provider: String,
        /// Name of the block that must be present
        block: String,
    },

    /// A credential field is present but unusable (empty, malformed URL, ...).
    #[error("Invalid credential '{field}': {reason}")]
    InvalidCredential {
        /// Configuration field holding the credential
        field: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// A container image reference from the catalog cannot be split into repository and tag.
    #[error("Invalid image reference '{image}': {reason}")]
    InvalidImageReference {
        /// The offending reference
        image: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// A cluster issuer cannot be built (e.g., no registration email).
    #[error("Invalid cluster issuer '{issuer}': {reason}")]
    InvalidIssuer {
        /// Name of the issuer
        issuer: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// The default certificate cannot be built (e.g., no DNS names).
    #[error("Invalid certificate '{certificate}': {reason}")]
    InvalidCertificate {
        /// Name of the certificate
        certificate: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// The settings sync job needs a remote instance but none is configured.
    #[error("Settings sync in '{mode}' mode requires a remote instance (sync.origin)")]
    MissingSyncRemote {
        /// The configured sync mode
        mode: String,
    },

    /// A stage of the certificate chain failed; later stages were not built.
    #[error("Certificate chain stage {stage} ({name}) failed: {source}")]
    StageFailed {
        /// 1-based stage number
        stage: u8,
        /// Human-readable stage name
        name: String,
        /// The underlying failure
        #[source]
        source: Box<PlanError>,
    },

    /// Two planned objects share the same resource id.
    #[error("Duplicate resource id '{id}' in plan")]
    DuplicateResource {
        /// The duplicated id
        id: String,
    },

    /// A planned object depends on an id that is not part of the plan.
    #[error("Resource '{id}' depends on unknown resource '{dependency}'")]
    UnknownDependency {
        /// The dependent resource
        id: String,
        /// The missing dependency
        dependency: String,
    },

    /// The dependency graph contains a cycle.
    #[error("Dependency cycle detected among resources: {}", .members.join(", "))]
    DependencyCycle {
        /// Resources that could not be ordered
        members: Vec<String>,
    },

    /// The configuration document could not be parsed.
    #[error("Failed to parse configuration: {reason}")]
    ConfigParse {
        /// Parser error message
        reason: String,
    },

    /// A manifest could not be serialized.
    #[error("Failed to serialize manifest '{id}': {reason}")]
    Serialization {
        /// Resource id of the manifest
        id: String,
        /// Serializer error message
        reason: String,
    },
}

impl PlanError {
    /// Builds an `UnsupportedImplementation` error from any list of displayable values.
    pub fn unsupported<V: ToString>(
        field: impl Into<String>,
        value: impl Into<String>,
        valid: &[V],
    ) -> Self {
        PlanError::UnsupportedImplementation {
            field: field.into(),
            value: value.into(),
            valid: valid.iter().map(ToString::to_string).collect(),
        }
    }

    /// Wraps this error as a failure of a certificate chain stage.
    #[must_use]
    pub fn in_stage(self, stage: u8, name: &str) -> Self {
        PlanError::StageFailed {
            stage,
            name: name.to_string(),
            source: Box::new(self),
        }
    }
}

/// Errors that can occur while applying a plan to a cluster.
#[derive(Error, Debug)]
pub enum ApplyError {
    /// The object's `apiVersion`/`kind` is not served by the cluster.
    #[error("Kind {kind} ({api_version}) of resource '{id}' is not served by the cluster: {reason}")]
    KindNotServed {
        /// Resource id
        id: String,
        /// `apiVersion` of the manifest
        api_version: String,
        /// `kind` of the manifest
        kind: String,
        /// Discovery error message
        reason: String,
    },

    /// Server-side apply of a resource failed.
    #[error("Failed to apply resource '{id}': {reason}")]
    ApplyFailed {
        /// Resource id
        id: String,
        /// API error message
        reason: String,
    },

    /// The manifest could not be converted for the API.
    #[error("Invalid manifest for resource '{id}': {reason}")]
    InvalidManifest {
        /// Resource id
        id: String,
        /// Explanation of what is invalid
        reason: String,
    },
}
