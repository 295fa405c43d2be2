// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS sync dispatcher.
//!
//! Emits one external-dns instance per configured DNS provider, in document
//! order. Native providers receive their credentials directly (through a
//! generated secret); webhook providers are routed through a synthesized
//! sidecar reachable on the loopback address.
//!
//! Instances are independent: a provider that cannot be built is recorded in
//! the [`DispatchReport`] and the remaining providers are still emitted.

use crate::catalog::Catalog;
use crate::config::{CloudflareCredentials, DnsBackend, DnsProviderConfig};
use crate::constants::{
    CLOUDFLARE_TOKEN_ENV, CLOUDFLARE_TOKEN_SECRET_KEY, EXTERNAL_DNS_SOURCES, WEBHOOK_BACKEND,
    WEBHOOK_HEALTH_PORT,
};
use crate::errors::PlanError;
use crate::labels::{build_labels, CHECKSUM_ANNOTATION_PREFIX, COMPONENT_DNS_SYNC};
use crate::registry::{DnsProviderKind, ProviderSelector};
use crate::resources::{
    build_helm_chart, build_secret, secret_checksum, secret_env, Manifest, PlannedResource,
};
use crate::webhook::{synthesize, WebhookBackend, WebhookProviderConfig};
use k8s_openapi::api::core::v1::Secret;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, error, info};

/// One external-dns instance.
#[derive(Clone, Debug)]
pub struct DnsSyncController {
    /// Position of the provider in `dns.providers`
    pub index: usize,
    /// Release name
    pub name: String,
    /// Provider selector
    pub provider: DnsProviderKind,
    /// external-dns provider name (`cloudflare` or `webhook`)
    pub backend: String,
    /// Domains managed by this instance
    pub domain_filters: Vec<String>,
    /// TXT ownership marker
    pub txt_owner_id: String,
    /// Sidecar for webhook providers
    pub webhook: Option<WebhookProviderConfig>,
    /// Computed chart values
    pub values: Value,
    /// Credentials secret followed by the Helm release
    pub resources: Vec<PlannedResource>,
}

/// A provider that could not be built.
#[derive(Clone, Debug, PartialEq)]
pub struct DispatchFailure {
    /// Position of the provider in `dns.providers`
    pub index: usize,
    /// Provider selector
    pub provider: DnsProviderKind,
    /// Cause
    pub error: PlanError,
}

/// Outcome of a dispatch pass.
#[derive(Clone, Debug, Default)]
pub struct DispatchReport {
    /// Instances built, in document order
    pub controllers: Vec<DnsSyncController>,
    /// Providers skipped, in document order
    pub failures: Vec<DispatchFailure>,
}

impl DispatchReport {
    /// Every resource of every built instance.
    pub fn resources(&self) -> impl Iterator<Item = &PlannedResource> {
        self.controllers.iter().flat_map(|c| c.resources.iter())
    }
}

/// Builds one external-dns instance per provider.
#[must_use]
pub fn dispatch(
    stack: &str,
    namespace: &str,
    providers: &[DnsProviderConfig],
    catalog: &Catalog,
) -> DispatchReport {
    let mut report = DispatchReport::default();

    for provider in providers {
        match build_controller(stack, namespace, provider, catalog) {
            Ok(controller) => {
                debug!(
                    name = %controller.name,
                    backend = %controller.backend,
                    "Built DNS sync controller"
                );
                report.controllers.push(controller);
            }
            Err(e) => {
                error!(
                    index = provider.index,
                    provider = %provider.kind().as_str(),
                    error = %e,
                    "Skipping DNS provider"
                );
                report.failures.push(DispatchFailure {
                    index: provider.index,
                    provider: provider.kind(),
                    error: e,
                });
            }
        }
    }

    info!(
        controllers = report.controllers.len(),
        failures = report.failures.len(),
        "DNS sync dispatch complete"
    );
    report
}

fn build_controller(
    stack: &str,
    namespace: &str,
    provider: &DnsProviderConfig,
    catalog: &Catalog,
) -> Result<DnsSyncController, PlanError> {
    let kind = provider.kind();
    let name = format!("{stack}-dns-{}", provider.index);
    let field_prefix = format!("dns.providers[{}].{}", provider.index, kind.as_str());
    let labels = build_labels("external-dns", &name, COMPONENT_DNS_SYNC);

    let mut values = base_values(provider);
    let (secret, webhook) = match &provider.backend {
        DnsBackend::Cloudflare(creds) => {
            let secret = cloudflare_native(&name, namespace, creds, &field_prefix, &mut values)?;
            (secret, None)
        }
        DnsBackend::RouterOs(creds) => {
            webhook_provider(&name, namespace, creds, &field_prefix, catalog, &mut values)?
        }
        DnsBackend::AdGuard(creds) => {
            webhook_provider(&name, namespace, creds, &field_prefix, catalog, &mut values)?
        }
    };
    values["podAnnotations"] = json!({
        format!("{CHECKSUM_ANNOTATION_PREFIX}secret"): secret_checksum(&secret),
    });

    let secret_resource = PlannedResource::new(
        format!("secret/{namespace}/{}", secret.metadata.name.as_deref().unwrap_or(&name)),
        Manifest::Secret(Box::new(secret)),
    );
    let chart = build_helm_chart(&name, namespace, &catalog.charts.external_dns, &values, labels)?;
    let chart_resource = PlannedResource::new(
        format!("helmchart/{namespace}/{name}"),
        Manifest::HelmChart(Box::new(chart)),
    )
    .depending_on([&secret_resource.id]);

    Ok(DnsSyncController {
        index: provider.index,
        name,
        provider: kind,
        backend: kind.backend().to_string(),
        domain_filters: provider.domain_filters.clone(),
        txt_owner_id: provider.txt_owner_id.clone(),
        webhook,
        values,
        resources: vec![secret_resource, chart_resource],
    })
}

fn base_values(provider: &DnsProviderConfig) -> Value {
    json!({
        "domainFilters": provider.domain_filters,
        "txtOwnerId": provider.txt_owner_id,
        "sources": EXTERNAL_DNS_SOURCES,
    })
}

fn cloudflare_native(
    name: &str,
    namespace: &str,
    creds: &CloudflareCredentials,
    field_prefix: &str,
    values: &mut Value,
) -> Result<Secret, PlanError> {
    if creds.api_token.trim().is_empty() {
        return Err(PlanError::InvalidCredential {
            field: format!("{field_prefix}.apiToken"),
            reason: "must not be empty".into(),
        });
    }

    let secret_name = format!("{name}-cloudflare-secret");
    let secret = build_secret(
        &secret_name,
        namespace,
        build_labels("external-dns", name, COMPONENT_DNS_SYNC),
        BTreeMap::from([(
            CLOUDFLARE_TOKEN_SECRET_KEY.to_string(),
            creds.api_token.clone(),
        )]),
    );

    values["provider"] = json!({ "name": DnsProviderKind::Cloudflare.backend() });
    values["env"] = json!([secret_env(
        CLOUDFLARE_TOKEN_ENV,
        &secret_name,
        CLOUDFLARE_TOKEN_SECRET_KEY
    )]);
    if let Some(zone_id) = &creds.zone_id {
        values["extraArgs"] = json!([format!("--zone-id-filter={zone_id}")]);
    }
    Ok(secret)
}

fn webhook_provider<B: WebhookBackend>(
    name: &str,
    namespace: &str,
    creds: &B,
    field_prefix: &str,
    catalog: &Catalog,
    values: &mut Value,
) -> Result<(Secret, Option<WebhookProviderConfig>), PlanError> {
    let webhook = synthesize(
        name,
        namespace,
        creds,
        field_prefix,
        catalog,
        build_labels("external-dns", name, COMPONENT_DNS_SYNC),
    )?;
    let probe = webhook.sidecar.health_probe();

    values["provider"] = json!({
        "name": WEBHOOK_BACKEND,
        "webhook": {
            "image": {
                "repository": webhook.sidecar.image.repository,
                "tag": webhook.sidecar.image.tag,
                "pullPolicy": "IfNotPresent",
            },
            "env": webhook.sidecar.env_vars(),
            "livenessProbe": probe,
            "readinessProbe": probe,
            "service": { "port": WEBHOOK_HEALTH_PORT },
        },
    });

    Ok((webhook.secret.clone(), Some(webhook)))
}
