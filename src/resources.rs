// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Planned resources and the builders shared by every component.
//!
//! A [`PlannedResource`] is one Kubernetes object plus the explicit list of
//! resources that must exist before it. Builders in this module are pure and
//! easily testable; component modules compose them.

use crate::catalog::ChartRef;
use crate::crd::{
    Certificate, ClusterIssuer, HelmChart, HelmChartSpec, IPAddressPool, L2Advertisement,
};
use crate::errors::PlanError;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{EnvVar, EnvVarSource, Namespace, Secret, SecretKeySelector};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Stable identifier of a planned resource, unique within a plan.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResourceId(String);

impl ResourceId {
    /// Creates an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A Kubernetes object produced by the orchestrator.
#[derive(Clone, Debug)]
pub enum Manifest {
    /// Namespace holding the edge layer
    Namespace(Box<Namespace>),
    /// Helm release installed by the k3s helm-controller
    HelmChart(Box<HelmChart>),
    /// Credentials
    Secret(Box<Secret>),
    /// Workload
    Deployment(Box<Deployment>),
    /// `MetalLB` address pool
    IpAddressPool(Box<IPAddressPool>),
    /// `MetalLB` L2 advertisement
    L2Advertisement(Box<L2Advertisement>),
    /// cert-manager cluster issuer
    ClusterIssuer(Box<ClusterIssuer>),
    /// cert-manager certificate
    Certificate(Box<Certificate>),
}

fn type_meta<K: Resource<DynamicType = ()>>() -> (String, String) {
    (K::api_version(&()).to_string(), K::kind(&()).to_string())
}

impl Manifest {
    /// `(apiVersion, kind)` of the object.
    #[must_use]
    pub fn type_meta(&self) -> (String, String) {
        match self {
            Manifest::Namespace(_) => type_meta::<Namespace>(),
            Manifest::HelmChart(_) => type_meta::<HelmChart>(),
            Manifest::Secret(_) => type_meta::<Secret>(),
            Manifest::Deployment(_) => type_meta::<Deployment>(),
            Manifest::IpAddressPool(_) => type_meta::<IPAddressPool>(),
            Manifest::L2Advertisement(_) => type_meta::<L2Advertisement>(),
            Manifest::ClusterIssuer(_) => type_meta::<ClusterIssuer>(),
            Manifest::Certificate(_) => type_meta::<Certificate>(),
        }
    }

    /// Object metadata.
    #[must_use]
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Manifest::Namespace(o) => &o.metadata,
            Manifest::HelmChart(o) => &o.metadata,
            Manifest::Secret(o) => &o.metadata,
            Manifest::Deployment(o) => &o.metadata,
            Manifest::IpAddressPool(o) => &o.metadata,
            Manifest::L2Advertisement(o) => &o.metadata,
            Manifest::ClusterIssuer(o) => &o.metadata,
            Manifest::Certificate(o) => &o.metadata,
        }
    }

    /// `metadata.name`, empty when unset.
    #[must_use]
    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    /// `metadata.namespace`; `None` for cluster-scoped objects.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.metadata().namespace.as_deref()
    }

    /// Serializes the object, always carrying `apiVersion` and `kind`.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::Serialization` if the object cannot be serialized.
    pub fn to_value(&self, id: &ResourceId) -> Result<serde_json::Value, PlanError> {
        let value = match self {
            Manifest::Namespace(o) => serde_json::to_value(o),
            Manifest::HelmChart(o) => serde_json::to_value(o),
            Manifest::Secret(o) => serde_json::to_value(o),
            Manifest::Deployment(o) => serde_json::to_value(o),
            Manifest::IpAddressPool(o) => serde_json::to_value(o),
            Manifest::L2Advertisement(o) => serde_json::to_value(o),
            Manifest::ClusterIssuer(o) => serde_json::to_value(o),
            Manifest::Certificate(o) => serde_json::to_value(o),
        };
        let mut value = value.map_err(|e| PlanError::Serialization {
            id: id.to_string(),
            reason: e.to_string(),
        })?;

        let (api_version, kind) = self.type_meta();
        if let Some(object) = value.as_object_mut() {
            object.insert("apiVersion".into(), api_version.into());
            object.insert("kind".into(), kind.into());
        }
        Ok(value)
    }
}

/// One object of a plan and the resources it must be created after.
#[derive(Clone, Debug)]
pub struct PlannedResource {
    /// Unique id within the plan
    pub id: ResourceId,
    /// The object
    pub manifest: Manifest,
    /// Resources that must exist first
    pub depends_on: Vec<ResourceId>,
}

impl PlannedResource {
    /// Creates a resource without dependencies.
    pub fn new(id: impl Into<String>, manifest: Manifest) -> Self {
        Self {
            id: ResourceId::new(id),
            manifest,
            depends_on: Vec::new(),
        }
    }

    /// Adds dependencies, keeping the first occurrence of each id.
    #[must_use]
    pub fn depending_on<'a, I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = &'a ResourceId>,
    {
        for id in ids {
            if !self.depends_on.contains(id) {
                self.depends_on.push(id.clone());
            }
        }
        self
    }
}

/// Builds an environment variable with a literal value.
#[must_use]
pub fn literal_env(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.into(),
        value: Some(value.into()),
        ..Default::default()
    }
}

/// Builds an environment variable bound to one key of a secret.
#[must_use]
pub fn secret_env(name: &str, secret_name: &str, key: &str) -> EnvVar {
    EnvVar {
        name: name.into(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: secret_name.to_string(),
                key: key.to_string(),
                optional: Some(false),
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Builds a namespace.
#[must_use]
pub fn build_namespace(name: &str, labels: BTreeMap<String, String>) -> Namespace {
    debug!(name = %name, "Building Namespace");

    Namespace {
        metadata: ObjectMeta {
            name: Some(name.into()),
            labels: Some(labels),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Builds an `Opaque` secret from string data.
#[must_use]
pub fn build_secret(
    name: &str,
    namespace: &str,
    labels: BTreeMap<String, String>,
    string_data: BTreeMap<String, String>,
) -> Secret {
    debug!(name = %name, namespace = %namespace, keys = string_data.len(), "Building Secret");

    Secret {
        metadata: ObjectMeta {
            name: Some(name.into()),
            namespace: Some(namespace.into()),
            labels: Some(labels),
            ..Default::default()
        },
        type_: Some("Opaque".into()),
        string_data: Some(string_data),
        ..Default::default()
    }
}

/// SHA-256 of a secret's string data, hex encoded.
///
/// Consumers carry it as a pod annotation so that a credential change rolls them.
#[must_use]
pub fn secret_checksum(secret: &Secret) -> String {
    let json = serde_json::to_string(&secret.string_data).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Builds a `HelmChart` release for the k3s helm-controller.
///
/// # Errors
///
/// Returns `PlanError::Serialization` if the values cannot be rendered as YAML.
pub fn build_helm_chart(
    name: &str,
    namespace: &str,
    chart: &ChartRef,
    values: &serde_json::Value,
    labels: BTreeMap<String, String>,
) -> Result<HelmChart, PlanError> {
    debug!(
        name = %name,
        namespace = %namespace,
        chart = %chart.chart,
        version = %chart.version,
        "Building HelmChart"
    );

    let values_content = serde_yaml::to_string(values).map_err(|e| PlanError::Serialization {
        id: name.to_string(),
        reason: e.to_string(),
    })?;

    let mut release = HelmChart::new(
        name,
        HelmChartSpec {
            chart: chart.chart.clone(),
            version: chart.version.clone(),
            repo: if chart.is_oci() {
                None
            } else {
                chart.repository.clone()
            },
            target_namespace: namespace.to_string(),
            create_namespace: true,
            values_content,
        },
    );
    release.metadata.namespace = Some(namespace.to_string());
    release.metadata.labels = Some(labels);
    Ok(release)
}
