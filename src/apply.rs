// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Materialization of a deployment plan against a cluster.
//!
//! Resources are applied one topological stage at a time. Within a stage
//! every resource is applied concurrently; a stage only starts once every
//! resource of the previous stage was applied. When a stage fails, no later
//! stage is started and nothing already applied is rolled back.

use crate::errors::{ApplyError, PlanError};
use crate::orchestrator::DeploymentPlan;
use crate::resources::{PlannedResource, ResourceId};
use crate::retry::retry_api_call;
use async_trait::async_trait;
use futures::future::join_all;
use kube::api::{Api, DynamicObject, Patch, PatchParams};
use kube::core::GroupVersionKind;
use kube::discovery::pinned_kind;
use kube::Client;
use tracing::{debug, error, info, warn};

/// Applies one planned resource.
#[async_trait]
pub trait ResourceApplier: Send + Sync {
    /// Creates or updates the resource.
    ///
    /// # Errors
    ///
    /// Returns an `ApplyError` if the resource cannot be applied.
    async fn apply(&self, resource: &PlannedResource) -> Result<(), ApplyError>;
}

/// Server-side apply through the Kubernetes API.
#[derive(Clone)]
pub struct KubeApplier {
    client: Client,
    field_manager: String,
    dry_run: bool,
}

impl KubeApplier {
    /// Creates an applier.
    ///
    /// # Arguments
    ///
    /// * `field_manager` - Field manager recorded for server-side apply
    /// * `dry_run` - Ask the API server to validate without persisting
    #[must_use]
    pub fn new(client: Client, field_manager: impl Into<String>, dry_run: bool) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
            dry_run,
        }
    }
}

/// Splits an `apiVersion` into group and version.
fn group_version(api_version: &str) -> (&str, &str) {
    api_version.split_once('/').unwrap_or(("", api_version))
}

#[async_trait]
impl ResourceApplier for KubeApplier {
    async fn apply(&self, resource: &PlannedResource) -> Result<(), ApplyError> {
        let id = resource.id.to_string();
        let (api_version, kind) = resource.manifest.type_meta();
        let (group, version) = group_version(&api_version);
        let gvk = GroupVersionKind::gvk(group, version, &kind);

        let (api_resource, _capabilities) = retry_api_call(
            || pinned_kind(&self.client, &gvk),
            &format!("discover {api_version}/{kind}"),
        )
        .await
        .map_err(|e| ApplyError::KindNotServed {
            id: id.clone(),
            api_version: api_version.clone(),
            kind: kind.clone(),
            reason: e.to_string(),
        })?;

        let object: DynamicObject = resource
            .manifest
            .to_value(&resource.id)
            .and_then(|value| {
                serde_json::from_value(value).map_err(|e| PlanError::Serialization {
                    id: id.clone(),
                    reason: e.to_string(),
                })
            })
            .map_err(|e| ApplyError::InvalidManifest {
                id: id.clone(),
                reason: e.to_string(),
            })?;

        let api: Api<DynamicObject> = match resource.manifest.namespace() {
            Some(namespace) => Api::namespaced_with(self.client.clone(), namespace, &api_resource),
            None => Api::all_with(self.client.clone(), &api_resource),
        };

        let mut params = PatchParams::apply(&self.field_manager).force();
        params.dry_run = self.dry_run;
        let name = resource.manifest.name();
        let patch = Patch::Apply(&object);

        debug!(id = %id, dry_run = self.dry_run, "Applying resource");
        retry_api_call(
            || api.patch(name, &params, &patch),
            &format!("apply {id}"),
        )
        .await
        .map_err(|e| ApplyError::ApplyFailed {
            id: id.clone(),
            reason: e.to_string(),
        })?;

        info!(id = %id, dry_run = self.dry_run, "Applied {kind} {name}");
        Ok(())
    }
}

/// Outcome of applying a plan.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Resources applied, in application order
    pub applied: Vec<ResourceId>,
    /// Resources whose application failed
    pub failed: Vec<(ResourceId, ApplyError)>,
    /// Resources of stages that were not started
    pub skipped: Vec<ResourceId>,
    /// Number of stages fully applied
    pub completed_stages: usize,
}

impl ApplyReport {
    /// Whether every resource was applied.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Applies a plan stage by stage.
pub async fn apply_plan<A>(plan: &DeploymentPlan, applier: &A) -> ApplyReport
where
    A: ResourceApplier + ?Sized,
{
    let stages: Vec<Vec<&PlannedResource>> = plan.stages().collect();
    let total = stages.len();
    let mut report = ApplyReport::default();

    for (index, stage) in stages.iter().enumerate() {
        if !report.failed.is_empty() {
            report.skipped.extend(stage.iter().map(|r| r.id.clone()));
            continue;
        }

        debug!(stage = index, resources = stage.len(), "Applying stage");
        let results = join_all(stage.iter().map(|resource| async move {
            (resource.id.clone(), applier.apply(resource).await)
        }))
        .await;

        for (id, result) in results {
            match result {
                Ok(()) => report.applied.push(id),
                Err(e) => {
                    error!(id = %id, error = %e, "Failed to apply resource");
                    report.failed.push((id, e));
                }
            }
        }

        if report.failed.is_empty() {
            report.completed_stages += 1;
        } else {
            warn!(
                stage = index,
                remaining_stages = total - index - 1,
                "Stage failed, later stages will not be started"
            );
        }
    }

    info!(
        applied = report.applied.len(),
        failed = report.failed.len(),
        skipped = report.skipped.len(),
        stages = total,
        "Plan applied"
    );
    report
}
