// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config`

#[cfg(test)]
mod tests {
    use crate::config::{DnsBackend, EdgeConfig, SyncFeatures, SyncMode, SyncSpec};
    use crate::errors::PlanError;
    use crate::registry::{ClusterIssuerKind, DnsProviderKind};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r"
stack: home
namespace: edge-system
loadBalancer: metal-lb
ingressController: traefik
";

    fn with(extra: &str) -> String {
        format!("{MINIMAL}{extra}")
    }

    #[test]
    fn test_minimal_document() {
        let spec = EdgeConfig::from_yaml_str(MINIMAL)
            .unwrap()
            .into_spec()
            .unwrap();
        assert_eq!(spec.stack, "home");
        assert!(spec.ip_address_pools.is_empty());
        assert!(spec.dns_providers.is_empty());
        assert!(spec.cluster_issuers.is_empty());
        assert_eq!(spec.sync, SyncSpec::Disabled);
        assert_eq!(spec.catalog.charts.metallb.version, "0.14.9");
    }

    #[test]
    fn test_unknown_load_balancer_is_fatal() {
        let doc = MINIMAL.replace("metal-lb", "kube-vip");
        let err = EdgeConfig::from_yaml_str(&doc)
            .unwrap()
            .into_spec()
            .unwrap_err();
        assert_eq!(
            err,
            PlanError::UnsupportedImplementation {
                field: "loadBalancer".into(),
                value: "kube-vip".into(),
                valid: vec!["metal-lb".into()],
            }
        );
    }

    #[test]
    fn test_unknown_dns_provider_names_its_position() {
        let doc = with(
            r"
dns:
  providers:
    - provider: cloudflare
      cloudflare: { apiToken: t }
    - provider: route53
",
        );
        let err = EdgeConfig::from_yaml_str(&doc)
            .unwrap()
            .into_spec()
            .unwrap_err();
        match err {
            PlanError::UnsupportedImplementation { field, value, .. } => {
                assert_eq!(field, "dns.providers[1].provider");
                assert_eq!(value, "route53");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_provider_without_matching_block_is_fatal() {
        let doc = with(
            r"
dns:
  providers:
    - provider: adguard
      domainFilters: [home.lan]
      routeros: { address: 'r:8728', username: u, password: p }
",
        );
        let err = EdgeConfig::from_yaml_str(&doc)
            .unwrap()
            .into_spec()
            .unwrap_err();
        assert_eq!(
            err,
            PlanError::MissingProviderConfig {
                index: 0,
                provider: "adguard".into(),
                block: "adguard".into(),
            }
        );
    }

    #[test]
    fn test_dns_providers_share_txt_owner_id() {
        let doc = with(
            r"
dns:
  txtOwnerId: cluster1
  providers:
    - provider: cloudflare
      domainFilters: [example.com]
      cloudflare: { apiToken: t, zoneId: z }
    - provider: routeros
      domainFilters: [home.lan]
      routeros:
        address: 192.168.88.1:8728
        username: admin
        password: p
        filterInclude: [a, b]
",
        );
        let spec = EdgeConfig::from_yaml_str(&doc)
            .unwrap()
            .into_spec()
            .unwrap();

        assert_eq!(spec.dns_providers.len(), 2);
        assert_eq!(spec.dns_providers[0].kind(), DnsProviderKind::Cloudflare);
        assert_eq!(spec.dns_providers[1].kind(), DnsProviderKind::RouterOs);
        assert!(spec
            .dns_providers
            .iter()
            .all(|p| p.txt_owner_id == "cluster1"));
        match &spec.dns_providers[1].backend {
            DnsBackend::RouterOs(creds) => assert_eq!(creds.filter_include, vec!["a", "b"]),
            other => panic!("unexpected backend: {other:?}"),
        }
    }

    #[test]
    fn test_txt_owner_id_default() {
        let doc = with(
            r"
dns:
  providers:
    - provider: cloudflare
      cloudflare: { apiToken: t }
",
        );
        let spec = EdgeConfig::from_yaml_str(&doc)
            .unwrap()
            .into_spec()
            .unwrap();
        assert_eq!(spec.dns_providers[0].txt_owner_id, "default-txt-owner-id");
    }

    #[test]
    fn test_cluster_issuer_selector() {
        let doc = with(
            r"
clusterIssuers:
  - name: le
    implementation: letsencrypt-staging
    email: admin@example.com
    dns01:
      cloudflare: { apiToken: t }
  - name: bad
    implementation: zerossl
    email: admin@example.com
",
        );
        let err = EdgeConfig::from_yaml_str(&doc)
            .unwrap()
            .into_spec()
            .unwrap_err();
        assert!(matches!(
            err,
            PlanError::UnsupportedImplementation { ref field, .. }
                if field == "clusterIssuers[1].implementation"
        ));

        let ok = doc.replace("zerossl", "letsencrypt-prod");
        let spec = EdgeConfig::from_yaml_str(&ok).unwrap().into_spec().unwrap();
        assert_eq!(spec.cluster_issuers[0].kind, ClusterIssuerKind::LetsEncryptStaging);
        assert_eq!(spec.cluster_issuers[1].kind, ClusterIssuerKind::LetsEncryptProd);
    }

    #[test]
    fn test_sync_enabled_defaults_local_instance() {
        let doc = with(
            r"
sync:
  enabled: true
  mode: target
  origin: { url: 'http://remote', username: r, password: rp }
",
        );
        let spec = EdgeConfig::from_yaml_str(&doc)
            .unwrap()
            .into_spec()
            .unwrap();
        let SyncSpec::Enabled(settings) = spec.sync else {
            panic!("sync should be enabled");
        };
        assert_eq!(settings.mode, SyncMode::Target);
        assert_eq!(settings.local.url, "http://localhost:3000");
        assert_eq!(settings.local.username, "admin");
        assert_eq!(settings.local.password, "");
        assert_eq!(settings.features, SyncFeatures::default());
        assert!(!settings.features.dhcp);
    }

    #[test]
    fn test_sync_omitted_features_are_disabled() {
        let doc = with(
            r"
sync:
  enabled: true
  mode: origin
  origin: { url: 'http://remote', username: r, password: rp }
  features:
    filters: true
",
        );
        let spec = EdgeConfig::from_yaml_str(&doc)
            .unwrap()
            .into_spec()
            .unwrap();
        let SyncSpec::Enabled(settings) = spec.sync else {
            panic!("sync should be enabled");
        };
        assert_eq!(
            settings.features,
            SyncFeatures {
                filters: true,
                ..SyncFeatures::default()
            }
        );

        let flags = crate::adguard_sync::feature_flags(&settings.features);
        let enabled: Vec<&str> = flags
            .iter()
            .filter(|(_, on)| *on)
            .map(|(name, _)| *name)
            .collect();
        assert_eq!(
            enabled,
            ["FEATURES_FILTERS", "FEATURES_SERVICES", "FEATURES_THEME"]
        );
    }

    #[test]
    fn test_sync_disabled_needs_no_mode() {
        for block in [
            "sync: { enabled: false }\n",
            "sync: { enabled: false, mode: both }\n",
        ] {
            let spec = EdgeConfig::from_yaml_str(&with(block))
                .unwrap()
                .into_spec()
                .unwrap();
            assert_eq!(spec.sync, SyncSpec::Disabled, "{block}");
        }
    }

    #[test]
    fn test_sync_enabled_requires_mode() {
        let doc = with(
            r"
sync:
  enabled: true
  origin: { url: 'http://r', username: r, password: rp }
",
        );
        let err = EdgeConfig::from_yaml_str(&doc)
            .unwrap()
            .into_spec()
            .unwrap_err();
        assert!(matches!(
            err,
            PlanError::UnsupportedImplementation { ref field, .. } if field == "sync.mode"
        ));
    }

    #[test]
    fn test_sync_disabled_ignores_missing_remote() {
        let doc = with("sync: { enabled: false, mode: origin }\n");
        let spec = EdgeConfig::from_yaml_str(&doc)
            .unwrap()
            .into_spec()
            .unwrap();
        assert_eq!(spec.sync, SyncSpec::Disabled);
    }

    #[test]
    fn test_sync_enabled_requires_remote() {
        let doc = with("sync: { enabled: true, mode: origin }\n");
        let err = EdgeConfig::from_yaml_str(&doc)
            .unwrap()
            .into_spec()
            .unwrap_err();
        assert_eq!(
            err,
            PlanError::MissingSyncRemote {
                mode: "origin".into()
            }
        );
    }

    #[test]
    fn test_sync_mode_is_closed() {
        let doc = with("sync: { enabled: true, mode: both }\n");
        let err = EdgeConfig::from_yaml_str(&doc)
            .unwrap()
            .into_spec()
            .unwrap_err();
        assert!(err.to_string().contains("origin, target"));
    }

    #[test]
    fn test_empty_stack_rejected() {
        let doc = MINIMAL.replace("stack: home", "stack: ''");
        let err = EdgeConfig::from_yaml_str(&doc)
            .unwrap()
            .into_spec()
            .unwrap_err();
        assert!(matches!(err, PlanError::ConfigParse { .. }));
    }

    #[test]
    fn test_malformed_document() {
        let err = EdgeConfig::from_yaml_str("stack: [").unwrap_err();
        assert!(matches!(err, PlanError::ConfigParse { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = EdgeConfig::load(file.path()).unwrap();
        assert_eq!(config.namespace, "edge-system");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EdgeConfig::load(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(err.to_string().contains("absent.yaml"));
    }
}
