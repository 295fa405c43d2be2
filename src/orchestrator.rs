// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Edge orchestrator.
//!
//! Composes every component planner into one validated deployment plan:
//!
//! 1. the namespace holding the edge layer (root of the graph)
//! 2. the load balancer, its address pools and advertisements
//! 3. the certificate chain (authority, issuers, default certificate)
//! 4. the ingress controller, only when the certificate chain is complete
//! 5. one external-dns instance per DNS provider
//! 6. the settings sync job, when enabled
//!
//! Namespaced resources without an explicit dependency are anchored to the
//! namespace. The combined graph is validated before the plan is returned;
//! tolerated failures (a DNS provider that could not be built, a certificate
//! chain that stopped early) are reported in [`DeploymentPlan::failures`].

use crate::address_planner::plan_addresses;
use crate::adguard_sync::plan_sync;
use crate::certificates::{build_chain, STAGE_INGRESS};
use crate::config::{EdgeConfig, EdgeSpec};
use crate::dns_sync::dispatch;
use crate::errors::PlanError;
use crate::graph::DependencyGraph;
use crate::ingress_controller::plan_ingress_controller;
use crate::labels::{build_labels, PART_OF_EDGE};
use crate::registry::ProviderSelector;
use crate::resources::{build_namespace, Manifest, PlannedResource, ResourceId};
use std::collections::BTreeMap;
use tracing::{error, info, warn};

/// A component that could not be planned while the rest of the plan was kept.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentFailure {
    /// Component name (e.g., "dns.providers[1] (routeros)")
    pub component: String,
    /// Cause
    pub error: PlanError,
}

/// A validated set of resources and the order to create them in.
#[derive(Clone, Debug)]
pub struct DeploymentPlan {
    /// Stack name
    pub stack: String,
    /// Namespace of the edge layer
    pub namespace: String,
    /// Ingress class workloads should reference; `None` when the ingress
    /// controller was not planned
    pub ingress_class_name: Option<String>,
    /// Tolerated anomalies
    pub warnings: Vec<String>,
    /// Components left out of the plan
    pub failures: Vec<ComponentFailure>,
    resources: BTreeMap<ResourceId, PlannedResource>,
    graph: DependencyGraph,
}

impl DeploymentPlan {
    /// The dependency graph.
    #[must_use]
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the plan holds no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Looks up a resource by id.
    #[must_use]
    pub fn resource(&self, id: &ResourceId) -> Option<&PlannedResource> {
        self.resources.get(id)
    }

    /// Every resource in creation order.
    pub fn resources(&self) -> impl Iterator<Item = &PlannedResource> {
        self.graph
            .topological_order()
            .filter_map(|id| self.resources.get(id))
    }

    /// Resources grouped by topological stage.
    pub fn stages(&self) -> impl Iterator<Item = Vec<&PlannedResource>> {
        self.graph.stages().iter().map(|stage| {
            stage
                .iter()
                .filter_map(|id| self.resources.get(id))
                .collect()
        })
    }

    /// Whether every component was planned without warnings.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.warnings.is_empty()
    }

    /// Every manifest in creation order, with `apiVersion` and `kind`.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::Serialization` if a manifest cannot be serialized.
    pub fn manifests(&self) -> Result<Vec<serde_json::Value>, PlanError> {
        self.resources()
            .map(|resource| resource.manifest.to_value(&resource.id))
            .collect()
    }

    /// Renders the plan as a multi-document YAML stream.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::Serialization` if a manifest cannot be rendered.
    pub fn to_yaml(&self) -> Result<String, PlanError> {
        let mut out = String::new();
        for (resource, manifest) in self.resources().zip(self.manifests()?) {
            let document =
                serde_yaml::to_string(&manifest).map_err(|e| PlanError::Serialization {
                    id: resource.id.to_string(),
                    reason: e.to_string(),
                })?;
            out.push_str("---\n");
            out.push_str(&document);
        }
        Ok(out)
    }

    /// Renders the plan as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::Serialization` if a manifest cannot be rendered.
    pub fn to_json(&self) -> Result<String, PlanError> {
        let manifests = self.manifests()?;
        serde_json::to_string_pretty(&manifests).map_err(|e| PlanError::Serialization {
            id: "plan".into(),
            reason: e.to_string(),
        })
    }
}

/// Builds the deployment plan of a validated configuration.
///
/// # Errors
///
/// * `PlanError::Serialization` - a chart values document cannot be rendered
/// * `PlanError::DuplicateResource` - two components produced the same object
/// * `PlanError::UnknownDependency` / `PlanError::DependencyCycle` - the combined graph is invalid
pub fn plan(spec: &EdgeSpec) -> Result<DeploymentPlan, PlanError> {
    let stack = spec.stack.as_str();
    let namespace = spec.namespace.as_str();
    let catalog = &spec.catalog;

    let mut resources = Vec::new();
    let mut warnings = Vec::new();
    let mut failures = Vec::new();

    let root = PlannedResource::new(
        format!("namespace/{namespace}"),
        Manifest::Namespace(Box::new(build_namespace(
            namespace,
            build_labels(stack, namespace, PART_OF_EDGE),
        ))),
    );
    let root_id = root.id.clone();
    resources.push(root);

    let addresses = plan_addresses(
        stack,
        namespace,
        spec.load_balancer,
        &spec.ip_address_pools,
        &spec.l2_advertisements,
        catalog,
    )?;
    warnings.extend(addresses.warnings.iter().cloned());
    resources.extend(addresses.into_resources());

    let chain = build_chain(
        stack,
        namespace,
        &spec.cert_manager,
        &spec.cluster_issuers,
        spec.default_certificate.as_ref(),
        catalog,
    );
    let mut ingress_class_name = None;
    let mut ingress_resource = None;
    if chain.is_complete() {
        let default_certificate_secret = spec
            .default_certificate
            .as_ref()
            .map(|c| c.secret_name.as_str());
        match plan_ingress_controller(
            stack,
            namespace,
            spec.ingress_controller,
            &spec.traefik,
            default_certificate_secret,
            &chain.ingress_dependencies(),
            catalog,
        ) {
            Ok(ingress) => {
                ingress_class_name = Some(ingress.ingress_class_name);
                ingress_resource = Some(ingress.resource);
            }
            Err(e) => failures.push(ComponentFailure {
                component: "certificates".into(),
                error: e.in_stage(STAGE_INGRESS, "ingress controller"),
            }),
        }
    } else if let Some(error) = chain.failure.clone() {
        warn!(
            ingress_controller = %spec.ingress_controller.as_str(),
            "Ingress controller not planned: certificate chain is incomplete"
        );
        failures.push(ComponentFailure {
            component: "certificates".into(),
            error,
        });
    }
    resources.extend(chain.into_resources());
    resources.extend(ingress_resource);

    let report = dispatch(stack, namespace, &spec.dns_providers, catalog);
    for failure in &report.failures {
        failures.push(ComponentFailure {
            component: format!(
                "dns.providers[{}] ({})",
                failure.index,
                failure.provider.as_str()
            ),
            error: failure.error.clone(),
        });
    }
    resources.extend(report.resources().cloned());

    if let Some(sync) = plan_sync(stack, namespace, &spec.sync, catalog) {
        resources.extend(sync.into_resources());
    }

    let resources: Vec<PlannedResource> = resources
        .into_iter()
        .map(|resource| anchor(resource, &root_id))
        .collect();

    let graph = DependencyGraph::build(&resources)?;

    for failure in &failures {
        error!(component = %failure.component, error = %failure.error, "Component left out of plan");
    }
    info!(
        stack = %stack,
        namespace = %namespace,
        resources = graph.len(),
        stages = graph.stages().len(),
        warnings = warnings.len(),
        failures = failures.len(),
        "Built deployment plan"
    );

    Ok(DeploymentPlan {
        stack: spec.stack.clone(),
        namespace: spec.namespace.clone(),
        ingress_class_name,
        warnings,
        failures,
        resources: resources.into_iter().map(|r| (r.id.clone(), r)).collect(),
        graph,
    })
}

/// Parses, validates and plans a configuration document.
///
/// # Errors
///
/// Returns any construction-time or graph error; see [`EdgeConfig::into_spec`] and [`plan`].
pub fn plan_document(document: &str) -> Result<DeploymentPlan, PlanError> {
    let spec = EdgeConfig::from_yaml_str(document)?.into_spec()?;
    plan(&spec)
}

/// Makes a namespaced resource without dependencies depend on the namespace.
fn anchor(resource: PlannedResource, root: &ResourceId) -> PlannedResource {
    if resource.id == *root
        || !resource.depends_on.is_empty()
        || resource.manifest.namespace().is_none()
    {
        return resource;
    }
    resource.depending_on([root])
}
