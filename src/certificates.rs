// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Certificate chain builder.
//!
//! Certificates are bootstrapped in four stages:
//!
//! 1. the certificate authority controller (cert-manager)
//! 2. zero or more ACME cluster issuers, each depending on stage 1 only
//! 3. zero or one default certificate, depending on stage 1 and all of stage 2
//! 4. the ingress controller, depending on stage 3 when a default certificate
//!    exists and on stage 1 otherwise
//!
//! No stage may begin before every resource of every earlier stage exists. A
//! failing stage aborts every later stage; the resources of earlier stages are
//! kept in the chain and the failure is reported alongside them.

use crate::catalog::Catalog;
use crate::config::{CertManagerConfig, ClusterIssuerSpec, DefaultCertificateConfig};
use crate::constants::{
    CLOUDFLARE_SOLVER_SECRET_KEY, DEFAULT_CERTIFICATE_DURATION, DEFAULT_CERTIFICATE_RENEW_BEFORE,
    KIND_CLUSTER_ISSUER,
};
use crate::crd::{
    AcmeIssuer, AcmeSolver, Certificate, CertificateSpec, CloudflareDns01, ClusterIssuer,
    ClusterIssuerSpec as AcmeClusterIssuerSpec, Dns01Provider, IssuerRef, SecretKeyRef,
    SecretRef, SolverSelector,
};
use crate::errors::PlanError;
use crate::labels::{build_labels, COMPONENT_CERTIFICATES};
use crate::registry::ProviderSelector;
use crate::resources::{build_helm_chart, build_secret, Manifest, PlannedResource, ResourceId};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Stage of the certificate authority controller
pub const STAGE_AUTHORITY: u8 = 1;
/// Stage of the cluster issuers
pub const STAGE_ISSUERS: u8 = 2;
/// Stage of the default certificate
pub const STAGE_DEFAULT_CERTIFICATE: u8 = 3;
/// Stage of the ingress controller
pub const STAGE_INGRESS: u8 = 4;

/// Resources built by the chain, up to the first failing stage.
#[derive(Clone, Debug, Default)]
pub struct CertificateChain {
    /// Stage 1
    pub authority: Option<PlannedResource>,
    /// Stage 2: issuers and their solver secrets
    pub issuers: Vec<PlannedResource>,
    /// Stage 3
    pub default_certificate: Option<PlannedResource>,
    /// Failure that stopped the chain
    pub failure: Option<PlanError>,
}

impl CertificateChain {
    /// Whether every stage up to the ingress controller was built.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// Ids the ingress controller (stage 4) must depend on.
    ///
    /// Empty when the chain failed, since stage 4 must not be built then.
    #[must_use]
    pub fn ingress_dependencies(&self) -> Vec<ResourceId> {
        if !self.is_complete() {
            return Vec::new();
        }
        match (&self.default_certificate, &self.authority) {
            (Some(certificate), _) => vec![certificate.id.clone()],
            (None, Some(authority)) => vec![authority.id.clone()],
            (None, None) => Vec::new(),
        }
    }

    fn failed(mut self, error: PlanError) -> Self {
        warn!(error = %error, "Certificate chain stopped");
        self.failure = Some(error);
        self
    }

    /// Every built resource in stage order.
    #[must_use]
    pub fn into_resources(self) -> Vec<PlannedResource> {
        self.authority
            .into_iter()
            .chain(self.issuers)
            .chain(self.default_certificate)
            .collect()
    }
}

/// Builds stages 1 to 3 of the certificate chain.
#[must_use]
pub fn build_chain(
    stack: &str,
    namespace: &str,
    cert_manager: &CertManagerConfig,
    issuers: &[ClusterIssuerSpec],
    default_certificate: Option<&DefaultCertificateConfig>,
    catalog: &Catalog,
) -> CertificateChain {
    let mut chain = CertificateChain::default();

    let authority = match build_authority(stack, namespace, cert_manager, catalog) {
        Ok(authority) => authority,
        Err(e) => return chain.failed(e.in_stage(STAGE_AUTHORITY, "certificate authority")),
    };
    let authority_id = authority.id.clone();
    chain.authority = Some(authority);

    for issuer in issuers {
        match build_issuer(namespace, issuer, &authority_id) {
            Ok(resources) => chain.issuers.extend(resources),
            Err(e) => return chain.failed(e.in_stage(STAGE_ISSUERS, "cluster issuers")),
        }
    }

    if let Some(config) = default_certificate {
        if !issuers.iter().any(|issuer| issuer.name == config.issuer_ref) {
            warn!(
                certificate = %config.name,
                issuer = %config.issuer_ref,
                "Default certificate references an issuer that is not declared in this stack"
            );
        }
        let mut deps = vec![authority_id.clone()];
        deps.extend(chain.issuers.iter().map(|r| r.id.clone()));

        match build_default_certificate(stack, namespace, config, &deps) {
            Ok(certificate) => chain.default_certificate = Some(certificate),
            Err(e) => {
                return chain.failed(e.in_stage(STAGE_DEFAULT_CERTIFICATE, "default certificate"))
            }
        }
    }

    info!(
        issuers = issuers.len(),
        default_certificate = chain.default_certificate.is_some(),
        "Built certificate chain"
    );
    chain
}

fn build_authority(
    stack: &str,
    namespace: &str,
    config: &CertManagerConfig,
    catalog: &Catalog,
) -> Result<PlannedResource, PlanError> {
    let name = format!("{stack}-cert-manager");
    let values = json!({
        "installCRDs": config.install_crds.unwrap_or(true),
        "config": {
            "apiVersion": "controller.config.cert-manager.io/v1alpha1",
            "kind": "ControllerConfiguration",
            "enableGatewayAPI": true,
        },
    });
    let chart = build_helm_chart(
        &name,
        namespace,
        &catalog.charts.cert_manager,
        &values,
        build_labels("cert-manager", &name, COMPONENT_CERTIFICATES),
    )?;
    Ok(PlannedResource::new(
        format!("helmchart/{namespace}/{name}"),
        Manifest::HelmChart(Box::new(chart)),
    ))
}

/// Builds an issuer and, when it has a DNS-01 solver, the solver secret.
fn build_issuer(
    namespace: &str,
    issuer: &ClusterIssuerSpec,
    authority: &ResourceId,
) -> Result<Vec<PlannedResource>, PlanError> {
    let invalid = |reason: &str| PlanError::InvalidIssuer {
        issuer: issuer.name.clone(),
        reason: reason.to_string(),
    };
    if issuer.email.trim().is_empty() {
        return Err(invalid("an ACME registration email is required"));
    }
    if let Some(cloudflare) = &issuer.dns01.cloudflare {
        if cloudflare.api_token.trim().is_empty() {
            return Err(invalid("the Cloudflare API token is empty"));
        }
    }

    debug!(
        issuer = %issuer.name,
        implementation = %issuer.kind.as_str(),
        server = %issuer.kind.acme_directory(),
        "Building ClusterIssuer"
    );

    let labels = build_labels("cert-manager", &issuer.name, COMPONENT_CERTIFICATES);
    let mut resources = Vec::new();
    let mut solvers = Vec::new();
    match &issuer.dns01.cloudflare {
        Some(cloudflare) => {
            let secret_name = format!("{}-cloudflare-api-token", issuer.name);
            let secret = build_secret(
                &secret_name,
                namespace,
                labels.clone(),
                BTreeMap::from([(
                    CLOUDFLARE_SOLVER_SECRET_KEY.to_string(),
                    cloudflare.api_token.clone(),
                )]),
            );
            solvers.push(AcmeSolver {
                dns01: Dns01Provider {
                    cloudflare: Some(CloudflareDns01 {
                        api_token_secret_ref: SecretKeyRef {
                            name: secret_name.clone(),
                            key: CLOUDFLARE_SOLVER_SECRET_KEY.to_string(),
                        },
                    }),
                },
                selector: (!cloudflare.dns_zones.is_empty()).then(|| SolverSelector {
                    dns_zones: cloudflare.dns_zones.clone(),
                }),
            });
            resources.push(PlannedResource::new(
                format!("secret/{namespace}/{secret_name}"),
                Manifest::Secret(Box::new(secret)),
            ));
        }
        None => warn!(
            issuer = %issuer.name,
            "ClusterIssuer has no DNS-01 solver and cannot complete challenges"
        ),
    }

    let mut resource = ClusterIssuer::new(
        &issuer.name,
        AcmeClusterIssuerSpec {
            acme: AcmeIssuer {
                server: issuer.kind.acme_directory().to_string(),
                email: issuer.email.clone(),
                private_key_secret_ref: SecretRef {
                    name: format!("{}-private-key", issuer.name),
                },
                solvers,
            },
        },
    );
    resource.metadata.labels = Some(labels);

    resources.push(
        PlannedResource::new(
            format!("clusterissuer/{}", issuer.name),
            Manifest::ClusterIssuer(Box::new(resource)),
        )
        .depending_on([authority]),
    );
    Ok(resources)
}

fn build_default_certificate(
    stack: &str,
    namespace: &str,
    config: &DefaultCertificateConfig,
    deps: &[ResourceId],
) -> Result<PlannedResource, PlanError> {
    if config.dns_names.is_empty() {
        return Err(PlanError::InvalidCertificate {
            certificate: config.name.clone(),
            reason: "at least one DNS name is required".into(),
        });
    }
    if config.secret_name.trim().is_empty() {
        return Err(PlanError::InvalidCertificate {
            certificate: config.name.clone(),
            reason: "secretName must not be empty".into(),
        });
    }

    debug!(
        certificate = %config.name,
        dns_names = ?config.dns_names,
        issuer = %config.issuer_ref,
        "Building Certificate"
    );

    let mut certificate = Certificate::new(
        &config.name,
        CertificateSpec {
            secret_name: config.secret_name.clone(),
            dns_names: config.dns_names.clone(),
            issuer_ref: IssuerRef {
                name: config.issuer_ref.clone(),
                kind: KIND_CLUSTER_ISSUER.to_string(),
            },
            duration: config
                .duration
                .clone()
                .unwrap_or_else(|| DEFAULT_CERTIFICATE_DURATION.to_string()),
            renew_before: config
                .renew_before
                .clone()
                .unwrap_or_else(|| DEFAULT_CERTIFICATE_RENEW_BEFORE.to_string()),
        },
    );
    certificate.metadata.namespace = Some(namespace.to_string());
    certificate.metadata.labels = Some(build_labels(stack, &config.name, COMPONENT_CERTIFICATES));

    Ok(PlannedResource::new(
        format!("certificate/{namespace}/{}", config.name),
        Manifest::Certificate(Box::new(certificate)),
    )
    .depending_on(deps))
}
