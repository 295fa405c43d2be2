// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Explicit dependency graph of a deployment plan.
//!
//! Every planned resource lists the ids it must be created after. The graph is
//! validated once, before anything is materialized: duplicate ids, edges to
//! unknown ids and cycles are rejected. A valid graph is split into topological
//! stages; every resource of a stage depends only on resources of earlier
//! stages, so a stage can be applied as a unit once all earlier stages exist.

use crate::errors::PlanError;
use crate::resources::{PlannedResource, ResourceId};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

/// Validated dependency graph.
#[derive(Clone, Debug)]
pub struct DependencyGraph {
    /// Resource ids in insertion order
    order: Vec<ResourceId>,
    /// Direct dependencies of every resource
    edges: BTreeMap<ResourceId, Vec<ResourceId>>,
    /// Topological stages, each in insertion order
    stages: Vec<Vec<ResourceId>>,
}

impl DependencyGraph {
    /// Builds and validates the graph of a set of resources.
    ///
    /// # Errors
    ///
    /// * `PlanError::DuplicateResource` - two resources share an id
    /// * `PlanError::UnknownDependency` - a resource depends on an id not in the set
    /// * `PlanError::DependencyCycle` - the resources cannot be ordered
    pub fn build(resources: &[PlannedResource]) -> Result<Self, PlanError> {
        let mut order = Vec::with_capacity(resources.len());
        let mut edges: BTreeMap<ResourceId, Vec<ResourceId>> = BTreeMap::new();

        for resource in resources {
            if edges.contains_key(&resource.id) {
                return Err(PlanError::DuplicateResource {
                    id: resource.id.to_string(),
                });
            }
            order.push(resource.id.clone());
            edges.insert(resource.id.clone(), resource.depends_on.clone());
        }

        for (id, deps) in &edges {
            if let Some(missing) = deps.iter().find(|dep| !edges.contains_key(*dep)) {
                return Err(PlanError::UnknownDependency {
                    id: id.to_string(),
                    dependency: missing.to_string(),
                });
            }
        }

        let stages = topological_stages(&order, &edges)?;
        debug!(
            resources = order.len(),
            stages = stages.len(),
            "Validated dependency graph"
        );

        Ok(Self {
            order,
            edges,
            stages,
        })
    }

    /// Topological stages. Resources within a stage keep their insertion order.
    #[must_use]
    pub fn stages(&self) -> &[Vec<ResourceId>] {
        &self.stages
    }

    /// Every resource id in a valid creation order.
    pub fn topological_order(&self) -> impl Iterator<Item = &ResourceId> {
        self.stages.iter().flatten()
    }

    /// Number of resources in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the graph holds no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Direct dependencies of a resource.
    #[must_use]
    pub fn dependencies(&self, id: &ResourceId) -> &[ResourceId] {
        self.edges.get(id).map_or(&[], Vec::as_slice)
    }

    /// Every resource `id` depends on, directly or not.
    #[must_use]
    pub fn transitive_dependencies(&self, id: &ResourceId) -> BTreeSet<ResourceId> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<&ResourceId> = self.dependencies(id).iter().collect();
        while let Some(next) = queue.pop_front() {
            if seen.insert(next.clone()) {
                queue.extend(self.dependencies(next));
            }
        }
        seen
    }

    /// 0-based stage a resource belongs to.
    #[must_use]
    pub fn stage_of(&self, id: &ResourceId) -> Option<usize> {
        self.stages.iter().position(|stage| stage.contains(id))
    }
}

/// Kahn's algorithm, one layer at a time.
fn topological_stages(
    order: &[ResourceId],
    edges: &BTreeMap<ResourceId, Vec<ResourceId>>,
) -> Result<Vec<Vec<ResourceId>>, PlanError> {
    let mut remaining: BTreeMap<&ResourceId, BTreeSet<&ResourceId>> = edges
        .iter()
        .map(|(id, deps)| (id, deps.iter().collect()))
        .collect();
    let mut stages = Vec::new();

    while !remaining.is_empty() {
        let ready: Vec<ResourceId> = order
            .iter()
            .filter(|id| remaining.get(id).is_some_and(BTreeSet::is_empty))
            .cloned()
            .collect();

        if ready.is_empty() {
            return Err(PlanError::DependencyCycle {
                members: order
                    .iter()
                    .filter(|id| remaining.contains_key(id))
                    .map(ToString::to_string)
                    .collect(),
            });
        }

        for id in &ready {
            remaining.remove(id);
        }
        for deps in remaining.values_mut() {
            for id in &ready {
                deps.remove(id);
            }
        }
        stages.push(ready);
    }

    Ok(stages)
}
