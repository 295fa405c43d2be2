// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `orchestrator`

#[cfg(test)]
mod tests {
    use crate::errors::PlanError;
    use crate::orchestrator::plan_document;
    use crate::resources::{Manifest, ResourceId};

    const BASE: &str = r"
stack: home
namespace: edge
loadBalancer: metal-lb
ingressController: traefik
";

    const FULL: &str = r"
stack: home
namespace: edge
loadBalancer: metal-lb
ingressController: traefik
ipAddressPools:
  - name: lan
    addresses: [192.168.1.240-192.168.1.250]
traefik:
  loadBalancerIP: 192.168.1.240
dns:
  txtOwnerId: home
  providers:
    - provider: cloudflare
      domainFilters: [example.com]
      cloudflare: { apiToken: cf-token }
    - provider: adguard
      domainFilters: [home.lan]
      adguard: { url: 'http://adguard:3000', username: admin, password: pw }
clusterIssuers:
  - name: letsencrypt
    implementation: letsencrypt-prod
    email: admin@example.com
    dns01:
      cloudflare: { apiToken: cf-token }
defaultCertificate:
  name: wildcard
  secretName: wildcard-tls
  dnsNames: ['*.example.com']
  issuerRef: letsencrypt
sync:
  enabled: true
  mode: origin
  origin: { url: 'http://remote:3000', username: admin, password: pw }
";

    fn id(s: &str) -> ResourceId {
        ResourceId::from(s)
    }

    #[test]
    fn test_minimal_plan() {
        let plan = plan_document(BASE).unwrap();

        assert!(plan.is_clean());
        assert_eq!(
            plan.ingress_class_name.as_deref(),
            Some("home-ingress-chart-traefik")
        );
        let first = plan.resources().next().unwrap();
        assert_eq!(first.id, id("namespace/edge"));
        assert!(plan.resource(&id("helmchart/edge/home-metallb")).is_some());
        assert!(plan.resource(&id("helmchart/edge/home-cert-manager")).is_some());
        assert_eq!(
            plan.graph()
                .dependencies(&id("helmchart/edge/home-traefik")),
            [id("helmchart/edge/home-cert-manager")]
        );
    }

    #[test]
    fn test_namespaced_roots_depend_on_namespace() {
        let plan = plan_document(FULL).unwrap();
        let namespace = id("namespace/edge");

        for resource in plan.resources() {
            if resource.id == namespace {
                assert!(resource.depends_on.is_empty());
                continue;
            }
            assert!(
                plan.graph()
                    .transitive_dependencies(&resource.id)
                    .contains(&namespace),
                "{} is not anchored to the namespace",
                resource.id
            );
        }
    }

    #[test]
    fn test_full_plan_ordering() {
        let plan = plan_document(FULL).unwrap();
        assert!(plan.is_clean(), "{:?}", plan.failures);

        let graph = plan.graph();
        let traefik = id("helmchart/edge/home-traefik");
        let deps = graph.transitive_dependencies(&traefik);
        for required in [
            "certificate/edge/wildcard",
            "clusterissuer/letsencrypt",
            "helmchart/edge/home-cert-manager",
            "namespace/edge",
        ] {
            assert!(deps.contains(&id(required)), "traefik misses {required}");
        }
        assert!(
            graph.stage_of(&id("certificate/edge/wildcard")) < graph.stage_of(&traefik)
        );
        assert!(
            graph.stage_of(&id("helmchart/edge/home-metallb"))
                < graph.stage_of(&id("ipaddresspool/edge/lan"))
        );
        assert!(plan
            .resource(&id("l2advertisement/edge/home-l2adv-default"))
            .is_some());
        assert!(plan.resource(&id("helmchart/edge/home-dns-0")).is_some());
        assert!(plan.resource(&id("helmchart/edge/home-dns-1")).is_some());
        assert!(plan
            .resource(&id("deployment/edge/home-adguard-home-sync"))
            .is_some());
    }

    #[test]
    fn test_dns_failure_is_isolated() {
        let doc = FULL.replace("http://adguard:3000", "not a url");
        let plan = plan_document(&doc).unwrap();

        assert_eq!(plan.failures.len(), 1);
        assert_eq!(plan.failures[0].component, "dns.providers[1] (adguard)");
        assert!(plan.resource(&id("helmchart/edge/home-dns-0")).is_some());
        assert!(plan.resource(&id("helmchart/edge/home-dns-1")).is_none());
        assert!(plan.resource(&id("helmchart/edge/home-traefik")).is_some());
    }

    #[test]
    fn test_chain_failure_skips_ingress() {
        let doc = FULL.replace("email: admin@example.com", "email: ''");
        let plan = plan_document(&doc).unwrap();

        assert!(plan.ingress_class_name.is_none());
        assert!(plan.resource(&id("helmchart/edge/home-traefik")).is_none());
        assert!(plan.resource(&id("certificate/edge/wildcard")).is_none());
        assert!(plan.resource(&id("helmchart/edge/home-cert-manager")).is_some());
        assert!(matches!(
            plan.failures[0].error,
            PlanError::StageFailed { stage: 2, .. }
        ));
        assert!(plan.resource(&id("helmchart/edge/home-dns-0")).is_some());
    }

    #[test]
    fn test_issuer_without_solver_keeps_ingress() {
        let doc = FULL.replace(
            "    dns01:\n      cloudflare: { apiToken: cf-token }\n",
            "    dns01: {}\n",
        );
        assert_ne!(doc, FULL);
        let plan = plan_document(&doc).unwrap();

        assert!(plan.failures.is_empty(), "{:?}", plan.failures);
        assert!(plan.resource(&id("clusterissuer/letsencrypt")).is_some());
        assert!(plan
            .resource(&id("secret/edge/letsencrypt-cloudflare-api-token"))
            .is_none());
        assert!(plan.resource(&id("helmchart/edge/home-traefik")).is_some());
        assert_eq!(
            plan.ingress_class_name.as_deref(),
            Some("home-ingress-chart-traefik")
        );
    }

    #[test]
    fn test_dangling_pool_reference_is_a_warning() {
        let doc = format!(
            "{BASE}l2Advertisements:\n  - name: adv\n    ipAddressPools: [missing]\n"
        );
        let plan = plan_document(&doc).unwrap();

        assert_eq!(plan.warnings.len(), 1);
        assert!(plan.warnings[0].contains("missing"));
        assert!(!plan.is_clean());
        assert!(plan.resource(&id("l2advertisement/edge/adv")).is_some());
    }

    #[test]
    fn test_construction_error_is_fatal() {
        let doc = BASE.replace("traefik", "nginx");
        assert!(matches!(
            plan_document(&doc),
            Err(PlanError::UnsupportedImplementation { .. })
        ));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let doc = format!(
            "{BASE}ipAddressPools:\n  - name: lan\n    addresses: [10.0.0.0/24]\n  - name: lan\n    addresses: [10.0.1.0/24]\n"
        );
        assert!(matches!(
            plan_document(&doc),
            Err(PlanError::DuplicateResource { .. })
        ));
    }

    #[test]
    fn test_rendering() {
        let plan = plan_document(BASE).unwrap();

        let yaml = plan.to_yaml().unwrap();
        assert_eq!(yaml.matches("---\n").count(), plan.len());
        assert!(yaml.starts_with("---\napiVersion: v1\nkind: Namespace\n"));

        let json: serde_json::Value = serde_json::from_str(&plan.to_json().unwrap()).unwrap();
        let manifests = json.as_array().unwrap();
        assert_eq!(manifests.len(), plan.len());
        assert_eq!(manifests[0]["kind"], "Namespace");
        assert!(manifests
            .iter()
            .any(|m| m["kind"] == "HelmChart" && m["apiVersion"] == "helm.cattle.io/v1"));
    }

    #[test]
    fn test_stages_cover_every_resource() {
        let plan = plan_document(FULL).unwrap();
        let staged: usize = plan.stages().map(|s| s.len()).sum();
        assert_eq!(staged, plan.len());
        let first: Vec<_> = plan.stages().next().unwrap();
        assert!(matches!(first[0].manifest, Manifest::Namespace(_)));
    }
}
