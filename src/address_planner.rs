// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Address and advertisement planning for the load balancer.
//!
//! The load-balancer controller comes first; every address pool depends on it.
//! Explicit advertisements are emitted as given, each depending on every pool.
//! When no advertisement is supplied and at least one pool exists, a single
//! advertisement named `<stack>-l2adv-default` announcing every pool is
//! synthesized. Zero pools and zero advertisements is a valid plan: the
//! controller is installed with nothing to allocate yet.

use crate::catalog::Catalog;
use crate::config::{IpAddressPoolConfig, L2AdvertisementConfig};
use crate::crd::{IPAddressPool, IPAddressPoolSpec, L2Advertisement, L2AdvertisementSpec};
use crate::errors::PlanError;
use crate::labels::{build_labels, COMPONENT_LOAD_BALANCER};
use crate::registry::{LoadBalancerKind, ProviderSelector};
use crate::resources::{build_helm_chart, Manifest, PlannedResource, ResourceId};
use serde_json::json;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Resources of the load-balancing layer.
#[derive(Clone, Debug)]
pub struct AddressPlan {
    /// The load-balancer controller release
    pub controller: PlannedResource,
    /// One resource per declared pool, in declaration order
    pub pools: Vec<PlannedResource>,
    /// Explicit or synthesized advertisements
    pub advertisements: Vec<PlannedResource>,
    /// Whether the advertisement was synthesized
    pub synthesized_default: bool,
    /// Advertisements referencing undeclared pools
    pub warnings: Vec<String>,
}

impl AddressPlan {
    /// Every resource, controller first.
    #[must_use]
    pub fn into_resources(self) -> Vec<PlannedResource> {
        let mut resources = vec![self.controller];
        resources.extend(self.pools);
        resources.extend(self.advertisements);
        resources
    }
}

/// Plans the load balancer, its pools and advertisements.
///
/// # Errors
///
/// Returns `PlanError::Serialization` if the controller values cannot be rendered.
pub fn plan_addresses(
    stack: &str,
    namespace: &str,
    load_balancer: LoadBalancerKind,
    pools: &[IpAddressPoolConfig],
    advertisements: &[L2AdvertisementConfig],
    catalog: &Catalog,
) -> Result<AddressPlan, PlanError> {
    let controller = match load_balancer {
        LoadBalancerKind::MetalLb => metallb_controller(stack, namespace, catalog)?,
    };
    let controller_deps = [controller.id.clone()];

    let pool_resources: Vec<PlannedResource> = pools
        .iter()
        .map(|pool| build_pool(stack, namespace, pool).depending_on(&controller_deps))
        .collect();
    let pool_ids: Vec<ResourceId> = pool_resources.iter().map(|p| p.id.clone()).collect();

    let (advertisement_configs, synthesized_default) = if !advertisements.is_empty() {
        (advertisements.to_vec(), false)
    } else if !pools.is_empty() {
        (vec![default_advertisement(stack, pools)], true)
    } else {
        (Vec::new(), false)
    };

    let advertisement_resources: Vec<PlannedResource> = advertisement_configs
        .iter()
        .map(|adv| build_advertisement(stack, namespace, adv).depending_on(&pool_ids))
        .collect();

    let warnings = dangling_references(pools, advertisements);
    for warning in &warnings {
        warn!("{warning}");
    }

    info!(
        load_balancer = %load_balancer.as_str(),
        pools = pool_resources.len(),
        advertisements = advertisement_resources.len(),
        synthesized_default,
        "Planned load balancer addresses"
    );

    Ok(AddressPlan {
        controller,
        pools: pool_resources,
        advertisements: advertisement_resources,
        synthesized_default,
        warnings,
    })
}

fn metallb_controller(
    stack: &str,
    namespace: &str,
    catalog: &Catalog,
) -> Result<PlannedResource, PlanError> {
    let name = format!("{stack}-metallb");
    let chart = build_helm_chart(
        &name,
        namespace,
        &catalog.charts.metallb,
        &json!({}),
        build_labels("metallb", &name, COMPONENT_LOAD_BALANCER),
    )?;
    Ok(PlannedResource::new(
        format!("helmchart/{namespace}/{name}"),
        Manifest::HelmChart(Box::new(chart)),
    ))
}

fn build_pool(stack: &str, namespace: &str, config: &IpAddressPoolConfig) -> PlannedResource {
    debug!(pool = %config.name, addresses = ?config.addresses, "Building IPAddressPool");

    let mut pool = IPAddressPool::new(
        &config.name,
        IPAddressPoolSpec {
            addresses: config.addresses.clone(),
            auto_assign: config.auto_assign.unwrap_or(true),
            avoid_buggy_ips: config.avoid_buggy_ips.unwrap_or(true),
        },
    );
    pool.metadata.namespace = Some(namespace.to_string());
    pool.metadata.labels = Some(build_labels(stack, &config.name, COMPONENT_LOAD_BALANCER));

    PlannedResource::new(
        format!("ipaddresspool/{namespace}/{}", config.name),
        Manifest::IpAddressPool(Box::new(pool)),
    )
}

fn default_advertisement(stack: &str, pools: &[IpAddressPoolConfig]) -> L2AdvertisementConfig {
    L2AdvertisementConfig {
        name: format!("{stack}-l2adv-default"),
        ip_address_pools: pools.iter().map(|p| p.name.clone()).collect(),
        interfaces: None,
        node_selectors: None,
    }
}

fn build_advertisement(
    stack: &str,
    namespace: &str,
    config: &L2AdvertisementConfig,
) -> PlannedResource {
    debug!(
        advertisement = %config.name,
        pools = ?config.ip_address_pools,
        "Building L2Advertisement"
    );

    let mut advertisement = L2Advertisement::new(
        &config.name,
        L2AdvertisementSpec {
            ip_address_pools: config.ip_address_pools.clone(),
            interfaces: config.interfaces.clone(),
            node_selectors: config.node_selectors.clone(),
        },
    );
    advertisement.metadata.namespace = Some(namespace.to_string());
    advertisement.metadata.labels =
        Some(build_labels(stack, &config.name, COMPONENT_LOAD_BALANCER));

    PlannedResource::new(
        format!("l2advertisement/{namespace}/{}", config.name),
        Manifest::L2Advertisement(Box::new(advertisement)),
    )
}

/// Explicit advertisements naming pools that are not declared.
///
/// The advertisements are still emitted unchanged.
#[must_use]
pub fn dangling_references(
    pools: &[IpAddressPoolConfig],
    advertisements: &[L2AdvertisementConfig],
) -> Vec<String> {
    let declared: BTreeSet<&str> = pools.iter().map(|p| p.name.as_str()).collect();
    let declared = &declared;
    advertisements
        .iter()
        .flat_map(|adv| {
            adv.ip_address_pools
                .iter()
                .filter(move |pool| !declared.contains(pool.as_str()))
                .map(move |pool| {
                    format!(
                        "L2Advertisement '{}' references undeclared IPAddressPool '{pool}'",
                        adv.name
                    )
                })
        })
        .collect()
}
