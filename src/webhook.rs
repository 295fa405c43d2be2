// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Webhook sidecar synthesis for DNS backends without native external-dns support.
//!
//! Each webhook provider is normalized into a [`SidecarDescriptor`]: image,
//! the fixed port pair (webhook 8888, health 8080), health probes and an
//! environment in which every credential is a reference to a generated secret
//! and every option is a literal. The sidecar always runs next to external-dns,
//! so the webhook URL is the loopback address.

use crate::catalog::{Catalog, ImageRef};
use crate::config::{AdGuardCredentials, RouterOsCredentials};
use crate::constants::{
    DEFAULT_LOG_LEVEL, SIDECAR_PROBE_INITIAL_DELAY_SECS, SIDECAR_PROBE_TIMEOUT_SECS,
    WEBHOOK_HEALTH_PATH, WEBHOOK_HEALTH_PORT, WEBHOOK_HEALTH_PORT_NAME, WEBHOOK_LOOPBACK_URL,
    WEBHOOK_PORT, WEBHOOK_PORT_NAME,
};
use crate::errors::PlanError;
use crate::registry::{DnsProviderKind, ProviderSelector};
use crate::resources::{build_secret, literal_env, secret_env};
use k8s_openapi::api::core::v1::{EnvVar, HTTPGetAction, Probe, Secret};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

/// One environment variable of a sidecar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnvBinding {
    /// Plain value, only ever used for non-secret options
    Literal {
        /// Variable name
        name: String,
        /// Value
        value: String,
    },
    /// Reference to a key of the provider's generated secret
    SecretKey {
        /// Variable name
        name: String,
        /// Key within the secret
        key: String,
    },
}

impl EnvBinding {
    fn literal(name: &str, value: impl Into<String>) -> Self {
        EnvBinding::Literal {
            name: name.to_string(),
            value: value.into(),
        }
    }

    fn secret(name: &str, key: &str) -> Self {
        EnvBinding::SecretKey {
            name: name.to_string(),
            key: key.to_string(),
        }
    }

    /// Variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            EnvBinding::Literal { name, .. } | EnvBinding::SecretKey { name, .. } => name,
        }
    }
}

/// A named container port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SidecarPort {
    /// Port name
    pub name: &'static str,
    /// Container port
    pub port: u16,
}

/// Uniform description of a webhook sidecar.
#[derive(Clone, Debug, PartialEq)]
pub struct SidecarDescriptor {
    /// Container name
    pub container_name: String,
    /// Image
    pub image: ImageRef,
    /// Webhook and health ports
    pub ports: Vec<SidecarPort>,
    /// Environment, in declaration order
    pub env: Vec<EnvBinding>,
    /// Path of the liveness and readiness probes
    pub health_path: &'static str,
    /// Generated secret the credential bindings point at
    pub secret_name: String,
}

impl SidecarDescriptor {
    /// Renders the environment as Kubernetes variables.
    #[must_use]
    pub fn env_vars(&self) -> Vec<EnvVar> {
        self.env
            .iter()
            .map(|binding| match binding {
                EnvBinding::Literal { name, value } => literal_env(name, value.clone()),
                EnvBinding::SecretKey { name, key } => secret_env(name, &self.secret_name, key),
            })
            .collect()
    }

    /// HTTP probe on the health endpoint, used for both liveness and readiness.
    #[must_use]
    pub fn health_probe(&self) -> Probe {
        Probe {
            http_get: Some(HTTPGetAction {
                path: Some(self.health_path.to_string()),
                port: IntOrString::Int(i32::from(WEBHOOK_HEALTH_PORT)),
                ..Default::default()
            }),
            initial_delay_seconds: Some(SIDECAR_PROBE_INITIAL_DELAY_SECS),
            timeout_seconds: Some(SIDECAR_PROBE_TIMEOUT_SECS),
            ..Default::default()
        }
    }
}

/// A webhook provider ready to be handed to external-dns.
#[derive(Clone, Debug)]
pub struct WebhookProviderConfig {
    /// Provider name (`routeros`, `adguard`)
    pub name: String,
    /// URL external-dns reaches the sidecar on
    pub url: String,
    /// The sidecar
    pub sidecar: SidecarDescriptor,
    /// Generated secret holding the provider credentials
    pub secret: Secret,
}

/// A DNS backend that is served through a webhook sidecar.
pub trait WebhookBackend {
    /// Provider selector
    const KIND: DnsProviderKind;

    /// Sidecar container name
    const CONTAINER_NAME: &'static str;

    /// Image of the sidecar
    fn image(catalog: &Catalog) -> &str;

    /// Checks the credentials before anything is built.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::InvalidCredential` naming the unusable field.
    fn validate(&self, field_prefix: &str) -> Result<(), PlanError>;

    /// Credentials as `(env var, secret key, value)` triples.
    fn credentials(&self) -> Vec<(&'static str, &'static str, String)>;

    /// Non-secret options as `(env var, value)` pairs.
    fn options(&self) -> Vec<(&'static str, String)>;
}

fn require(field: String, value: &str) -> Result<(), PlanError> {
    if value.trim().is_empty() {
        return Err(PlanError::InvalidCredential {
            field,
            reason: "must not be empty".into(),
        });
    }
    Ok(())
}

impl WebhookBackend for RouterOsCredentials {
    const KIND: DnsProviderKind = DnsProviderKind::RouterOs;
    const CONTAINER_NAME: &'static str = "routeros-webhook";

    fn image(catalog: &Catalog) -> &str {
        &catalog.images.routeros_webhook
    }

    fn validate(&self, field_prefix: &str) -> Result<(), PlanError> {
        require(format!("{field_prefix}.address"), &self.address)?;
        require(format!("{field_prefix}.username"), &self.username)?;
        require(format!("{field_prefix}.password"), &self.password)
    }

    fn credentials(&self) -> Vec<(&'static str, &'static str, String)> {
        vec![
            ("ROUTEROS_ADDRESS", "routeros-address", self.address.clone()),
            ("ROUTEROS_USERNAME", "routeros-username", self.username.clone()),
            ("ROUTEROS_PASSWORD", "routeros-password", self.password.clone()),
        ]
    }

    fn options(&self) -> Vec<(&'static str, String)> {
        vec![
            ("FILTER_INCLUDE", self.filter_include.join(",")),
            ("FILTER_EXCLUDE", self.filter_exclude.join(",")),
            (
                "LOG_LEVEL",
                self.log_level
                    .clone()
                    .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            ),
        ]
    }
}

impl WebhookBackend for AdGuardCredentials {
    const KIND: DnsProviderKind = DnsProviderKind::AdGuard;
    const CONTAINER_NAME: &'static str = "adguard-webhook";

    fn image(catalog: &Catalog) -> &str {
        &catalog.images.adguard_webhook
    }

    fn validate(&self, field_prefix: &str) -> Result<(), PlanError> {
        let field = format!("{field_prefix}.url");
        let url = Url::parse(&self.url).map_err(|e| PlanError::InvalidCredential {
            field: field.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(PlanError::InvalidCredential {
                field,
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        require(format!("{field_prefix}.username"), &self.username)?;
        require(format!("{field_prefix}.password"), &self.password)
    }

    fn credentials(&self) -> Vec<(&'static str, &'static str, String)> {
        vec![
            ("ADGUARD_URL", "adguard-url", self.url.clone()),
            ("ADGUARD_USER", "adguard-username", self.username.clone()),
            ("ADGUARD_PASSWORD", "adguard-password", self.password.clone()),
        ]
    }

    fn options(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "ADGUARD_SET_IMPORTANT_FLAG",
                self.set_important_flag.unwrap_or(true).to_string(),
            ),
            ("DRY_RUN", self.dry_run.unwrap_or(false).to_string()),
            (
                "LOG_LEVEL",
                self.log_level
                    .clone()
                    .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            ),
            ("HEALTHZ_ADDRESS", "0.0.0.0".to_string()),
            ("HEALTHZ_PORT", WEBHOOK_HEALTH_PORT.to_string()),
        ]
    }
}

/// Synthesizes the sidecar and its credentials secret for one provider.
///
/// Identical input always yields an identical descriptor.
///
/// # Arguments
///
/// * `instance` - Name of the external-dns instance the sidecar belongs to
/// * `namespace` - Namespace of the generated secret
/// * `backend` - Provider credentials and options
/// * `field_prefix` - Configuration path of the provider block, for error messages
/// * `catalog` - Image pins
/// * `labels` - Labels of the generated secret
///
/// # Errors
///
/// Returns `PlanError::InvalidCredential` for unusable credentials and
/// `PlanError::InvalidImageReference` for a malformed image pin.
pub fn synthesize<B: WebhookBackend>(
    instance: &str,
    namespace: &str,
    backend: &B,
    field_prefix: &str,
    catalog: &Catalog,
    labels: BTreeMap<String, String>,
) -> Result<WebhookProviderConfig, PlanError> {
    backend.validate(field_prefix)?;
    let image = ImageRef::parse(B::image(catalog))?;

    let provider = B::KIND.as_str();
    let secret_name = format!("{instance}-{provider}-webhook-secret");

    let credentials = backend.credentials();
    let mut env: Vec<EnvBinding> = credentials
        .iter()
        .map(|(name, key, _)| EnvBinding::secret(name, key))
        .collect();
    env.extend(
        backend
            .options()
            .into_iter()
            .map(|(name, value)| EnvBinding::literal(name, value)),
    );

    let string_data: BTreeMap<String, String> = credentials
        .into_iter()
        .map(|(_, key, value)| (key.to_string(), value))
        .collect();
    let secret = build_secret(&secret_name, namespace, labels, string_data);

    debug!(
        provider = %provider,
        instance = %instance,
        image = %image,
        secret = %secret_name,
        "Synthesized webhook sidecar"
    );

    Ok(WebhookProviderConfig {
        name: provider.to_string(),
        url: WEBHOOK_LOOPBACK_URL.to_string(),
        sidecar: SidecarDescriptor {
            container_name: B::CONTAINER_NAME.to_string(),
            image,
            ports: vec![
                SidecarPort {
                    name: WEBHOOK_PORT_NAME,
                    port: WEBHOOK_PORT,
                },
                SidecarPort {
                    name: WEBHOOK_HEALTH_PORT_NAME,
                    port: WEBHOOK_HEALTH_PORT,
                },
            ],
            env,
            health_path: WEBHOOK_HEALTH_PATH,
            secret_name,
        },
        secret,
    })
}
