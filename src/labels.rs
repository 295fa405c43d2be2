// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants used across all generated objects.
//!
//! Every object in a plan carries the standard Kubernetes labels so that the
//! edge layer of a stack can be selected as a whole.

use std::collections::BTreeMap;

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the component name within the architecture (e.g., "dns-sync")
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of the application
pub const K8S_NAME: &str = "app.kubernetes.io/name";

/// Standard label for a unique name identifying the instance of an application
pub const K8S_INSTANCE: &str = "app.kubernetes.io/instance";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

// ============================================================================
// Label Values
// ============================================================================

/// Value for `app.kubernetes.io/managed-by`
pub const MANAGED_BY_EDGE: &str = "edge-orchestrator";

/// Value for `app.kubernetes.io/part-of`
pub const PART_OF_EDGE: &str = "edge";

/// Component value for the load balancer and its address pools
pub const COMPONENT_LOAD_BALANCER: &str = "load-balancer";

/// Component value for the ingress controller
pub const COMPONENT_INGRESS: &str = "ingress";

/// Component value for external-dns instances and their sidecars
pub const COMPONENT_DNS_SYNC: &str = "dns-sync";

/// Component value for cert-manager, issuers and certificates
pub const COMPONENT_CERTIFICATES: &str = "certificates";

/// Component value for the AdGuard Home settings sync job
pub const COMPONENT_SETTINGS_SYNC: &str = "settings-sync";

// ============================================================================
// Annotations
// ============================================================================

/// Pod annotation prefix carrying the SHA-256 of a consumed secret
pub const CHECKSUM_ANNOTATION_PREFIX: &str = "checksum/";

/// Service annotation `MetalLB` reads a requested address from
pub const METALLB_LOAD_BALANCER_IPS_ANNOTATION: &str = "metallb.io/loadBalancerIPs";

/// Builds the standard label set for an object of the edge layer.
///
/// # Arguments
///
/// * `name` - Application name (e.g., "external-dns")
/// * `instance` - Unique instance name, usually the object's resource id
/// * `component` - One of the `COMPONENT_*` values
#[must_use]
pub fn build_labels(name: &str, instance: &str, component: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(K8S_NAME.into(), name.into());
    labels.insert(K8S_INSTANCE.into(), instance.into());
    labels.insert(K8S_COMPONENT.into(), component.into());
    labels.insert(K8S_MANAGED_BY.into(), MANAGED_BY_EDGE.into());
    labels.insert(K8S_PART_OF.into(), PART_OF_EDGE.into());
    labels
}
