// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `dns_sync`

#[cfg(test)]
mod tests {
    use crate::catalog::Catalog;
    use crate::config::{
        AdGuardCredentials, CloudflareCredentials, DnsBackend, DnsProviderConfig,
        RouterOsCredentials,
    };
    use crate::dns_sync::dispatch;
    use crate::errors::PlanError;
    use crate::registry::{DnsProviderKind, ProviderSelector};
    use crate::resources::Manifest;

    fn cloudflare(index: usize, domain: &str, owner: &str) -> DnsProviderConfig {
        DnsProviderConfig {
            index,
            domain_filters: vec![domain.into()],
            txt_owner_id: owner.into(),
            backend: DnsBackend::Cloudflare(CloudflareCredentials {
                api_token: "cf-token".into(),
                zone_id: None,
            }),
        }
    }

    fn adguard(index: usize, url: &str) -> DnsProviderConfig {
        DnsProviderConfig {
            index,
            domain_filters: vec!["home.lan".into()],
            txt_owner_id: "cluster1".into(),
            backend: DnsBackend::AdGuard(AdGuardCredentials {
                url: url.into(),
                username: "admin".into(),
                password: "pw".into(),
                set_important_flag: None,
                dry_run: None,
                log_level: None,
            }),
        }
    }

    fn routeros(index: usize) -> DnsProviderConfig {
        DnsProviderConfig {
            index,
            domain_filters: vec!["iot.lan".into()],
            txt_owner_id: "cluster1".into(),
            backend: DnsBackend::RouterOs(RouterOsCredentials {
                address: "192.168.88.1:8728".into(),
                username: "admin".into(),
                password: "pw".into(),
                filter_include: vec![],
                filter_exclude: vec![],
                log_level: None,
            }),
        }
    }

    #[test]
    fn test_native_cloudflare_provider() {
        let report = dispatch(
            "home",
            "edge",
            &[cloudflare(0, "example.com", "cluster1")],
            &Catalog::default(),
        );

        assert!(report.failures.is_empty());
        assert_eq!(report.controllers.len(), 1);
        let controller = &report.controllers[0];
        assert_eq!(controller.backend, "cloudflare");
        assert_eq!(controller.domain_filters, vec!["example.com"]);
        assert_eq!(controller.txt_owner_id, "cluster1");
        assert!(controller.webhook.is_none());
        assert_eq!(controller.values["txtOwnerId"], "cluster1");
        assert_eq!(controller.values["env"][0]["name"], "CF_API_TOKEN");
        assert!(controller.values["env"][0]["value"].is_null());
        assert_eq!(
            controller.values["env"][0]["valueFrom"]["secretKeyRef"]["key"],
            "cf-api-token"
        );
    }

    #[test]
    fn test_cloudflare_zone_filter() {
        let mut provider = cloudflare(0, "example.com", "cluster1");
        if let DnsBackend::Cloudflare(creds) = &mut provider.backend {
            creds.zone_id = Some("abc123".into());
        }
        let report = dispatch("home", "edge", &[provider], &Catalog::default());
        assert_eq!(
            report.controllers[0].values["extraArgs"][0],
            "--zone-id-filter=abc123"
        );
    }

    #[test]
    fn test_backend_comes_from_registry() {
        let report = dispatch(
            "home",
            "edge",
            &[
                cloudflare(0, "example.com", "cluster1"),
                adguard(1, "http://adguard.local:3000"),
                routeros(2),
            ],
            &Catalog::default(),
        );

        assert!(report.failures.is_empty());
        assert_eq!(report.controllers.len(), 3);
        for controller in &report.controllers {
            assert_eq!(controller.backend, controller.provider.backend());
            assert!(!controller.backend.is_empty());
            assert_eq!(controller.values["provider"]["name"], controller.backend);
        }
    }

    #[test]
    fn test_webhook_provider() {
        let report = dispatch(
            "home",
            "edge",
            &[adguard(0, "http://adguard.local:3000")],
            &Catalog::default(),
        );

        let controller = &report.controllers[0];
        assert_eq!(controller.backend, "webhook");
        let webhook = controller.webhook.as_ref().unwrap();
        assert_eq!(webhook.url, "http://localhost:8888");
        assert_eq!(
            controller.values["provider"]["webhook"]["image"]["repository"],
            "ghcr.io/muhlba91/external-dns-provider-adguard"
        );
        assert_eq!(
            controller.values["provider"]["webhook"]["image"]["pullPolicy"],
            "IfNotPresent"
        );
        assert_eq!(
            controller.values["provider"]["webhook"]["service"]["port"],
            8080
        );
        assert_eq!(
            controller.values["provider"]["webhook"]["livenessProbe"]["httpGet"]["path"],
            "/healthz"
        );
    }

    #[test]
    fn test_each_provider_gets_its_own_controller() {
        let providers = [
            cloudflare(0, "example.com", "a"),
            adguard(1, "http://adguard.local:3000"),
            routeros(2),
        ];
        let report = dispatch("home", "edge", &providers, &Catalog::default());

        assert_eq!(report.controllers.len(), 3);
        let names: Vec<&str> = report.controllers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["home-dns-0", "home-dns-1", "home-dns-2"]);
        for (controller, provider) in report.controllers.iter().zip(&providers) {
            assert_eq!(controller.domain_filters, provider.domain_filters);
            assert_eq!(controller.txt_owner_id, provider.txt_owner_id);
        }
        assert_eq!(report.resources().count(), 6);
    }

    #[test]
    fn test_release_depends_on_its_secret() {
        let report = dispatch("home", "edge", &[routeros(0)], &Catalog::default());
        let resources = &report.controllers[0].resources;

        assert!(matches!(resources[0].manifest, Manifest::Secret(_)));
        assert!(matches!(resources[1].manifest, Manifest::HelmChart(_)));
        assert_eq!(resources[1].depends_on, vec![resources[0].id.clone()]);
        assert!(report.controllers[0].values["podAnnotations"]["checksum/secret"].is_string());
    }

    #[test]
    fn test_failing_provider_does_not_block_others() {
        let providers = [
            cloudflare(0, "example.com", "a"),
            adguard(1, "not a url"),
            routeros(2),
        ];
        let report = dispatch("home", "edge", &providers, &Catalog::default());

        assert_eq!(report.controllers.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(report.failures[0].provider, DnsProviderKind::AdGuard);
        assert!(matches!(
            report.failures[0].error,
            PlanError::InvalidCredential { .. }
        ));
    }

    #[test]
    fn test_invalid_image_pin_is_a_provider_failure() {
        let mut catalog = Catalog::default();
        catalog.images.routeros_webhook = String::new();
        let report = dispatch("home", "edge", &[routeros(0)], &catalog);

        assert!(report.controllers.is_empty());
        assert!(matches!(
            report.failures[0].error,
            PlanError::InvalidImageReference { .. }
        ));
    }

    #[test]
    fn test_no_providers() {
        let report = dispatch("home", "edge", &[], &Catalog::default());
        assert!(report.controllers.is_empty());
        assert!(report.failures.is_empty());
    }
}
