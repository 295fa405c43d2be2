// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `AdGuard` Home settings synchronization job.
//!
//! The job copies settings from one instance (`ORIGIN_*`) to another
//! (`REPLICA1_*`). Which physical instance plays which role is fixed once by
//! the sync mode:
//!
//! | Mode     | `ORIGIN_*`        | `REPLICA1_*`      |
//! |----------|-------------------|-------------------|
//! | `target` | remote instance   | local instance    |
//! | `origin` | local instance    | remote instance   |
//!
//! A disabled sync produces no objects. Passwords never appear as literals:
//! they are bound from the job's secret.

use crate::catalog::Catalog;
use crate::config::{SyncFeatures, SyncInstance, SyncMode, SyncSettings, SyncSpec};
use crate::constants::{
    CONTAINER_NAME_SYNC, DEFAULT_LOG_LEVEL, SYNC_LOCAL_PASSWORD_KEY, SYNC_REMOTE_PASSWORD_KEY,
};
use crate::labels::{
    build_labels, CHECKSUM_ANNOTATION_PREFIX, COMPONENT_SETTINGS_SYNC, K8S_INSTANCE, K8S_NAME,
};
use crate::resources::{
    build_secret, literal_env, secret_checksum, secret_env, Manifest, PlannedResource,
};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, EnvVar, PodSpec, PodTemplateSpec, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// One side of the sync as seen by the job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint<'a> {
    /// The instance
    pub instance: &'a SyncInstance,
    /// Secret key holding the instance password
    pub password_key: &'static str,
}

/// Which instance the job reads from and which it writes to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding<'a> {
    /// Bound to `ORIGIN_*`
    pub origin: Endpoint<'a>,
    /// Bound to `REPLICA1_*`
    pub replica: Endpoint<'a>,
}

/// Binds the local and remote instances to the job's roles.
#[must_use]
pub fn bind(settings: &SyncSettings) -> Binding<'_> {
    let remote = Endpoint {
        instance: &settings.remote,
        password_key: SYNC_REMOTE_PASSWORD_KEY,
    };
    let local = Endpoint {
        instance: &settings.local,
        password_key: SYNC_LOCAL_PASSWORD_KEY,
    };
    match settings.mode {
        SyncMode::Target => Binding {
            origin: remote,
            replica: local,
        },
        SyncMode::Origin => Binding {
            origin: local,
            replica: remote,
        },
    }
}

/// `FEATURES_*` flags in the order the job expects them.
///
/// DHCP and general settings each gate two flags. Services and theme are
/// always synchronized.
#[must_use]
pub fn feature_flags(features: &SyncFeatures) -> Vec<(&'static str, bool)> {
    vec![
        ("FEATURES_GENERAL_SETTINGS", features.general_settings),
        ("FEATURES_FILTERS", features.filters),
        ("FEATURES_DHCP_SERVER_CONFIG", features.dhcp),
        ("FEATURES_DHCP_STATIC_LEASES", features.dhcp),
        ("FEATURES_CLIENT_SETTINGS", features.clients),
        ("FEATURES_QUERY_LOG_CONFIG", features.query_log_config),
        ("FEATURES_STATS_CONFIG", features.stats_config),
        ("FEATURES_DNS_ACCESS_LISTS", features.access_lists),
        ("FEATURES_DNS_REWRITES", features.rewrites),
        ("FEATURES_DNS_SERVER_CONFIG", features.general_settings),
        ("FEATURES_SERVICES", true),
        ("FEATURES_THEME", true),
    ]
}

/// Environment of the sync container.
///
/// `CONTINUE_ON_ERROR` is always `false`: a run stops at the first failing
/// category and the next scheduled run starts over.
#[must_use]
pub fn sync_environment(settings: &SyncSettings, secret_name: &str) -> Vec<EnvVar> {
    let mut env = vec![
        literal_env("LOG_LEVEL", DEFAULT_LOG_LEVEL),
        literal_env("RUN_ON_START", "true"),
        literal_env("CONTINUE_ON_ERROR", "false"),
    ];
    env.extend(
        feature_flags(&settings.features)
            .into_iter()
            .map(|(name, enabled)| literal_env(name, enabled.to_string())),
    );
    if let Some(cron) = &settings.cron {
        env.push(literal_env("CRON", cron.clone()));
    }

    let binding = bind(settings);
    for (prefix, endpoint) in [("ORIGIN", &binding.origin), ("REPLICA1", &binding.replica)] {
        env.push(literal_env(&format!("{prefix}_URL"), endpoint.instance.url.clone()));
        env.push(literal_env(
            &format!("{prefix}_USERNAME"),
            endpoint.instance.username.clone(),
        ));
        env.push(secret_env(
            &format!("{prefix}_PASSWORD"),
            secret_name,
            endpoint.password_key,
        ));
    }
    env
}

/// Objects of an enabled sync job.
#[derive(Clone, Debug)]
pub struct SyncPlan {
    /// Mode the job runs in
    pub mode: SyncMode,
    /// The password secret
    pub secret: PlannedResource,
    /// The job, depending on the secret
    pub deployment: PlannedResource,
}

impl SyncPlan {
    /// Both resources, secret first.
    #[must_use]
    pub fn into_resources(self) -> Vec<PlannedResource> {
        vec![self.secret, self.deployment]
    }
}

/// Plans the settings sync job.
///
/// Returns `None` when the sync is disabled.
#[must_use]
pub fn plan_sync(
    stack: &str,
    namespace: &str,
    sync: &SyncSpec,
    catalog: &Catalog,
) -> Option<SyncPlan> {
    let settings = match sync {
        SyncSpec::Disabled => {
            debug!("Settings sync disabled, nothing to plan");
            return None;
        }
        SyncSpec::Enabled(settings) => settings,
    };

    let name = format!("{stack}-adguard-home-sync");
    let secret_name = format!("{name}-secret");
    let labels = build_labels(CONTAINER_NAME_SYNC, &name, COMPONENT_SETTINGS_SYNC);

    let secret = build_secret(
        &secret_name,
        namespace,
        labels.clone(),
        BTreeMap::from([
            (
                SYNC_REMOTE_PASSWORD_KEY.to_string(),
                settings.remote.password.clone(),
            ),
            (
                SYNC_LOCAL_PASSWORD_KEY.to_string(),
                settings.local.password.clone(),
            ),
        ]),
    );

    let deployment = build_sync_deployment(&name, namespace, settings, &secret, labels, catalog);
    let secret = PlannedResource::new(
        format!("secret/{namespace}/{secret_name}"),
        Manifest::Secret(Box::new(secret)),
    );
    let deployment = PlannedResource::new(
        format!("deployment/{namespace}/{name}"),
        Manifest::Deployment(Box::new(deployment)),
    )
    .depending_on([&secret.id]);

    info!(
        mode = %settings.mode.as_str(),
        cron = ?settings.cron,
        "Planned settings sync job"
    );

    Some(SyncPlan {
        mode: settings.mode,
        secret,
        deployment,
    })
}

fn build_sync_deployment(
    name: &str,
    namespace: &str,
    settings: &SyncSettings,
    secret: &Secret,
    labels: BTreeMap<String, String>,
    catalog: &Catalog,
) -> Deployment {
    let secret_name = secret.metadata.name.clone().unwrap_or_default();
    debug!(name = %name, namespace = %namespace, mode = %settings.mode.as_str(), "Building sync Deployment");

    let selector: BTreeMap<String, String> = labels
        .iter()
        .filter(|(key, _)| key.as_str() == K8S_NAME || key.as_str() == K8S_INSTANCE)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let annotations = BTreeMap::from([(
        format!("{CHECKSUM_ANNOTATION_PREFIX}secret"),
        secret_checksum(secret),
    )]);

    Deployment {
        metadata: ObjectMeta {
            name: Some(name.into()),
            namespace: Some(namespace.into()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(selector),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    annotations: Some(annotations),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: CONTAINER_NAME_SYNC.into(),
                        image: Some(catalog.images.adguard_home_sync.clone()),
                        args: Some(vec!["run".into()]),
                        env: Some(sync_environment(settings, &secret_name)),
                        resources: settings.resources.clone(),
                        ..Default::default()
                    }],
                    restart_policy: Some("Always".into()),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}
