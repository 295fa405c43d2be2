// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! End-to-end planning tests
//!
//! These tests load configuration files from disk and check the rendered plan
//! the way `edge-orchestrator plan` would print it.
//!
//! Run with: cargo test --test plan_integration

use edge_orchestrator::config::EdgeConfig;
use edge_orchestrator::errors::PlanError;
use edge_orchestrator::orchestrator::plan;
use edge_orchestrator::resources::ResourceId;
use std::io::Write;
use tempfile::NamedTempFile;

const HOMELAB: &str = r"
stack: homelab
namespace: edge-system
loadBalancer: metal-lb
ingressController: traefik
ipAddressPools:
  - name: lan
    addresses: [192.168.1.240-192.168.1.250]
l2Advertisements:
  - name: lan
    ipAddressPools: [lan]
traefik:
  loadBalancerIP: 192.168.1.240
  enableDashboard: true
dns:
  txtOwnerId: homelab
  providers:
    - provider: cloudflare
      domainFilters: [example.com]
      cloudflare: { apiToken: cf-token }
    - provider: routeros
      domainFilters: [home.lan]
      routeros: { address: '192.168.1.1:8728', username: admin, password: router-pw }
clusterIssuers:
  - name: letsencrypt
    implementation: letsencrypt-prod
    email: admin@example.com
    dns01:
      cloudflare: { apiToken: cf-token }
defaultCertificate:
  name: wildcard
  secretName: wildcard-tls
  dnsNames: ['*.example.com', example.com]
  issuerRef: letsencrypt
sync:
  enabled: true
  mode: target
  cron: '*/10 * * * *'
  origin: { url: 'http://adguard.remote:3000', username: admin, password: remote-pw }
  local: { url: 'http://adguard.local:3000', username: admin, password: local-pw }
";

fn write_config(document: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(document.as_bytes()).expect("write config");
    file
}

fn id(s: &str) -> ResourceId {
    ResourceId::from(s)
}

#[test]
fn test_plan_from_file() {
    let file = write_config(HOMELAB);
    let spec = EdgeConfig::load(file.path())
        .and_then(EdgeConfig::into_spec)
        .expect("valid configuration");

    let plan = plan(&spec).expect("plan builds");

    assert!(plan.is_clean(), "{:?} {:?}", plan.failures, plan.warnings);
    assert_eq!(
        plan.ingress_class_name.as_deref(),
        Some("homelab-ingress-chart-traefik")
    );

    for expected in [
        "namespace/edge-system",
        "helmchart/edge-system/homelab-metallb",
        "ipaddresspool/edge-system/lan",
        "l2advertisement/edge-system/lan",
        "helmchart/edge-system/homelab-cert-manager",
        "clusterissuer/letsencrypt",
        "certificate/edge-system/wildcard",
        "helmchart/edge-system/homelab-traefik",
        "helmchart/edge-system/homelab-dns-0",
        "helmchart/edge-system/homelab-dns-1",
        "deployment/edge-system/homelab-adguard-home-sync",
    ] {
        assert!(plan.resource(&id(expected)).is_some(), "missing {expected}");
    }
}

#[test]
fn test_plan_respects_dependencies_in_creation_order() {
    let file = write_config(HOMELAB);
    let spec = EdgeConfig::load(file.path())
        .and_then(EdgeConfig::into_spec)
        .unwrap();
    let plan = plan(&spec).unwrap();

    let order: Vec<&ResourceId> = plan.resources().map(|r| &r.id).collect();
    assert_eq!(order.len(), plan.len());
    for (position, resource_id) in order.iter().enumerate() {
        for dependency in plan.graph().dependencies(resource_id) {
            let before = order.iter().position(|x| *x == dependency).unwrap();
            assert!(before < position, "{dependency} comes after {resource_id}");
        }
    }
}

#[test]
fn test_rendered_yaml_contains_no_plaintext_sync_passwords() {
    let file = write_config(HOMELAB);
    let spec = EdgeConfig::load(file.path())
        .and_then(EdgeConfig::into_spec)
        .unwrap();
    let plan = plan(&spec).unwrap();

    let yaml = plan.to_yaml().unwrap();
    let documents: Vec<&str> = yaml
        .split("---\n")
        .filter(|d| !d.trim().is_empty())
        .collect();
    assert_eq!(documents.len(), plan.len());

    let deployment = documents
        .iter()
        .find(|d| d.contains("kind: Deployment"))
        .expect("sync deployment rendered");
    assert!(!deployment.contains("remote-pw"));
    assert!(!deployment.contains("local-pw"));
    assert!(deployment.contains("secretKeyRef"));
}

#[test]
fn test_json_output_is_an_array_of_manifests() {
    let file = write_config(HOMELAB);
    let spec = EdgeConfig::load(file.path())
        .and_then(EdgeConfig::into_spec)
        .unwrap();
    let plan = plan(&spec).unwrap();

    let json: serde_json::Value = serde_json::from_str(&plan.to_json().unwrap()).unwrap();
    let manifests = json.as_array().unwrap();
    assert_eq!(manifests.len(), plan.len());
    assert_eq!(manifests[0]["kind"], "Namespace");
    assert!(manifests
        .iter()
        .all(|m| m["apiVersion"].is_string() && m["metadata"]["name"].is_string()));
}

#[test]
fn test_unknown_load_balancer_is_rejected_before_planning() {
    let file = write_config(
        r"
stack: homelab
namespace: edge-system
loadBalancer: kube-vip
ingressController: traefik
",
    );

    let error = EdgeConfig::load(file.path())
        .and_then(EdgeConfig::into_spec)
        .unwrap_err();

    assert!(matches!(error, PlanError::UnsupportedImplementation { .. }));
}

#[test]
fn test_missing_file_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let error = EdgeConfig::load(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(error, PlanError::ConfigParse { .. }));
}
