// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `catalog`

#[cfg(test)]
mod tests {
    use crate::catalog::{Catalog, ImageRef};
    use crate::errors::PlanError;

    #[test]
    fn test_image_ref_with_tag() {
        let image = ImageRef::parse("ghcr.io/muhlba91/external-dns-provider-adguard:v9.0.0").unwrap();
        assert_eq!(image.repository, "ghcr.io/muhlba91/external-dns-provider-adguard");
        assert_eq!(image.tag, "v9.0.0");
    }

    #[test]
    fn test_image_ref_without_tag_defaults_to_latest() {
        let image = ImageRef::parse("docker.io/library/nginx").unwrap();
        assert_eq!(image.repository, "docker.io/library/nginx");
        assert_eq!(image.tag, "latest");
    }

    #[test]
    fn test_image_ref_keeps_registry_port() {
        let image = ImageRef::parse("registry.local:5000/team/app").unwrap();
        assert_eq!(image.repository, "registry.local:5000/team/app");
        assert_eq!(image.tag, "latest");

        let tagged = ImageRef::parse("registry.local:5000/team/app:1.2").unwrap();
        assert_eq!(tagged.repository, "registry.local:5000/team/app");
        assert_eq!(tagged.tag, "1.2");
        assert_eq!(tagged.to_string(), "registry.local:5000/team/app:1.2");
    }

    #[test]
    fn test_image_ref_rejects_empty() {
        assert!(matches!(
            ImageRef::parse("  "),
            Err(PlanError::InvalidImageReference { .. })
        ));
        assert!(matches!(
            ImageRef::parse("app:"),
            Err(PlanError::InvalidImageReference { .. })
        ));
    }

    #[test]
    fn test_default_catalog_pins_versions() {
        let catalog = Catalog::default();
        assert_eq!(catalog.charts.metallb.chart, "metallb");
        assert_eq!(catalog.charts.cert_manager.version, "v1.18.2");
        assert!(!catalog.charts.traefik.is_oci());
        assert!(ImageRef::parse(&catalog.images.routeros_webhook).is_ok());
        assert!(ImageRef::parse(&catalog.images.adguard_webhook).is_ok());
    }

    #[test]
    fn test_partial_catalog_override_keeps_defaults() {
        let yaml = r"
images:
  adguardWebhook: ghcr.io/example/adguard-webhook:v1.0.0
";
        let catalog: Catalog = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            catalog.images.adguard_webhook,
            "ghcr.io/example/adguard-webhook:v1.0.0"
        );
        assert_eq!(
            catalog.images.routeros_webhook,
            Catalog::default().images.routeros_webhook
        );
        assert_eq!(catalog.charts, Catalog::default().charts);
    }
}
