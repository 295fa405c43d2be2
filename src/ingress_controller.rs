// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ingress controller release (stage 4 of the certificate chain).
//!
//! Traefik values are composed by [`TraefikValuesBuilder`]: a base document
//! plus optional mutators. [`traefik_values`] applies the mutators in one fixed
//! order, so later mutators win where two touch the same key (extra service
//! annotations override the load-balancer address annotation).

use crate::catalog::Catalog;
use crate::config::TraefikConfig;
use crate::errors::PlanError;
use crate::labels::{build_labels, COMPONENT_INGRESS, METALLB_LOAD_BALANCER_IPS_ANNOTATION};
use crate::registry::{IngressControllerKind, ProviderSelector};
use crate::resources::{build_helm_chart, Manifest, PlannedResource, ResourceId};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Service type used when none is configured
pub const DEFAULT_SERVICE_TYPE: &str = "LoadBalancer";

/// Traefik chart values.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TraefikValues {
    /// Service exposing the entry points
    pub service: ServiceValues,
    /// Dashboard route
    pub ingress_route: IngressRouteValues,
    /// Metrics
    pub metrics: MetricsValues,
    /// Ingress class
    pub ingress_class: IngressClassValues,
    /// Default TLS store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_store: Option<TlsStoreValues>,
}

/// `service` values.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ServiceValues {
    /// Service type
    #[serde(rename = "type")]
    pub type_: String,
    /// Service annotations
    pub annotations: BTreeMap<String, String>,
}

/// `ingressRoute` values.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct IngressRouteValues {
    /// Dashboard route
    pub dashboard: Toggle,
}

/// `metrics` values.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct MetricsValues {
    /// Prometheus metrics
    pub prometheus: PrometheusValues,
}

/// `metrics.prometheus` values.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusValues {
    /// `ServiceMonitor` for the Prometheus operator
    pub service_monitor: Toggle,
}

/// A value block with a single `enabled` flag.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Toggle {
    /// Whether the feature is enabled
    pub enabled: bool,
}

/// `ingressClass` values.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IngressClassValues {
    /// Create the class
    pub enabled: bool,
    /// Mark the class as the cluster default
    pub is_default_class: bool,
    /// Class name
    pub name: String,
}

/// `tlsStore` values.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TlsStoreValues {
    /// The default store
    pub default: TlsStoreDefault,
}

/// `tlsStore.default` values.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TlsStoreDefault {
    /// Certificate served when no other matches
    pub default_certificate: SecretName,
}

/// Reference to a TLS secret.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecretName {
    /// Secret name
    pub secret_name: String,
}

/// Builder for [`TraefikValues`].
#[derive(Clone, Debug)]
pub struct TraefikValuesBuilder {
    values: TraefikValues,
}

impl TraefikValuesBuilder {
    /// Base values: `LoadBalancer` service, dashboard on, `ServiceMonitor` on,
    /// ingress class enabled and not default.
    #[must_use]
    pub fn new(default_class_name: &str) -> Self {
        Self {
            values: TraefikValues {
                service: ServiceValues {
                    type_: DEFAULT_SERVICE_TYPE.to_string(),
                    annotations: BTreeMap::new(),
                },
                ingress_route: IngressRouteValues {
                    dashboard: Toggle { enabled: true },
                },
                metrics: MetricsValues {
                    prometheus: PrometheusValues {
                        service_monitor: Toggle { enabled: true },
                    },
                },
                ingress_class: IngressClassValues {
                    enabled: true,
                    is_default_class: false,
                    name: default_class_name.to_string(),
                },
                tls_store: None,
            },
        }
    }

    /// Overrides the service type.
    #[must_use]
    pub fn service_type(mut self, service_type: Option<&str>) -> Self {
        if let Some(service_type) = service_type {
            self.values.service.type_ = service_type.to_string();
        }
        self
    }

    /// Requests an address from the load balancer.
    #[must_use]
    pub fn load_balancer_ip(mut self, address: Option<&str>) -> Self {
        if let Some(address) = address {
            self.values.service.annotations.insert(
                METALLB_LOAD_BALANCER_IPS_ANNOTATION.to_string(),
                address.to_string(),
            );
        }
        self
    }

    /// Adds service annotations, replacing existing keys.
    #[must_use]
    pub fn service_annotations(mut self, annotations: &BTreeMap<String, String>) -> Self {
        self.values
            .service
            .annotations
            .extend(annotations.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Toggles the dashboard route.
    #[must_use]
    pub fn dashboard(mut self, enabled: Option<bool>) -> Self {
        self.values.ingress_route.dashboard.enabled = enabled != Some(false);
        self
    }

    /// Configures the ingress class.
    #[must_use]
    pub fn ingress_class(
        mut self,
        name: Option<&str>,
        enabled: Option<bool>,
        is_default: Option<bool>,
    ) -> Self {
        let class = &mut self.values.ingress_class;
        if let Some(name) = name {
            class.name = name.to_string();
        }
        class.enabled = enabled != Some(false);
        class.is_default_class = is_default.unwrap_or(false);
        self
    }

    /// Serves a certificate from a secret by default.
    #[must_use]
    pub fn default_certificate(mut self, secret_name: Option<&str>) -> Self {
        self.values.tls_store = secret_name.map(|secret_name| TlsStoreValues {
            default: TlsStoreDefault {
                default_certificate: SecretName {
                    secret_name: secret_name.to_string(),
                },
            },
        });
        self
    }

    /// Finishes the values.
    #[must_use]
    pub fn build(self) -> TraefikValues {
        self.values
    }
}

/// Name of the ingress class when none is configured.
#[must_use]
pub fn default_ingress_class_name(stack: &str) -> String {
    format!("{stack}-ingress-chart-traefik")
}

/// Applies every Traefik option in a fixed order.
#[must_use]
pub fn traefik_values(
    stack: &str,
    config: &TraefikConfig,
    default_certificate_secret: Option<&str>,
) -> TraefikValues {
    let class = &config.ingress_class;
    TraefikValuesBuilder::new(&default_ingress_class_name(stack))
        .service_type(config.service_type.as_deref())
        .load_balancer_ip(config.load_balancer_ip.as_deref())
        .service_annotations(&config.service_annotations)
        .dashboard(config.enable_dashboard)
        .ingress_class(class.name.as_deref(), class.enabled, class.is_default_class)
        .default_certificate(default_certificate_secret)
        .build()
}

/// The ingress controller release.
#[derive(Clone, Debug)]
pub struct IngressPlan {
    /// The release
    pub resource: PlannedResource,
    /// Ingress class workloads should reference
    pub ingress_class_name: String,
}

/// Builds the ingress controller release.
///
/// # Arguments
///
/// * `depends_on` - Stage 3 when a default certificate exists, stage 1 otherwise
///
/// # Errors
///
/// Returns `PlanError::Serialization` if the values cannot be rendered.
pub fn plan_ingress_controller(
    stack: &str,
    namespace: &str,
    kind: IngressControllerKind,
    config: &TraefikConfig,
    default_certificate_secret: Option<&str>,
    depends_on: &[ResourceId],
    catalog: &Catalog,
) -> Result<IngressPlan, PlanError> {
    let (name, values, ingress_class_name) = match kind {
        IngressControllerKind::Traefik => {
            let values = traefik_values(stack, config, default_certificate_secret);
            let class = values.ingress_class.name.clone();
            let values = serde_json::to_value(&values).map_err(|e| PlanError::Serialization {
                id: format!("{stack}-traefik"),
                reason: e.to_string(),
            })?;
            (format!("{stack}-traefik"), values, class)
        }
    };
    debug!(name = %name, ingress_class = %ingress_class_name, "Computed ingress controller values");

    let chart = build_helm_chart(
        &name,
        namespace,
        &catalog.charts.traefik,
        &values,
        build_labels(kind.backend(), &name, COMPONENT_INGRESS),
    )?;
    let resource = PlannedResource::new(
        format!("helmchart/{namespace}/{name}"),
        Manifest::HelmChart(Box::new(chart)),
    )
    .depending_on(depends_on);

    info!(
        controller = %kind.as_str(),
        ingress_class = %ingress_class_name,
        default_certificate = default_certificate_secret.is_some(),
        "Planned ingress controller"
    );

    Ok(IngressPlan {
        resource,
        ingress_class_name,
    })
}
