// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `address_planner`

#[cfg(test)]
mod tests {
    use crate::address_planner::{dangling_references, plan_addresses};
    use crate::catalog::Catalog;
    use crate::config::{IpAddressPoolConfig, L2AdvertisementConfig};
    use crate::registry::LoadBalancerKind;
    use crate::resources::Manifest;

    fn pool(name: &str) -> IpAddressPoolConfig {
        IpAddressPoolConfig {
            name: name.into(),
            addresses: vec!["192.168.1.240-192.168.1.250".into()],
            auto_assign: None,
            avoid_buggy_ips: Some(false),
        }
    }

    fn advertisement(name: &str, pools: &[&str]) -> L2AdvertisementConfig {
        L2AdvertisementConfig {
            name: name.into(),
            ip_address_pools: pools.iter().map(|p| (*p).to_string()).collect(),
            interfaces: Some(vec!["eth0.100".into()]),
            node_selectors: None,
        }
    }

    #[test]
    fn test_default_advertisement_covers_every_pool() {
        let plan = plan_addresses(
            "home",
            "edge",
            LoadBalancerKind::MetalLb,
            &[pool("a"), pool("b")],
            &[],
            &Catalog::default(),
        )
        .unwrap();

        assert!(plan.synthesized_default);
        assert_eq!(plan.advertisements.len(), 1);
        let Manifest::L2Advertisement(adv) = &plan.advertisements[0].manifest else {
            panic!("expected an L2Advertisement");
        };
        assert_eq!(adv.metadata.name.as_deref(), Some("home-l2adv-default"));
        assert_eq!(adv.spec.ip_address_pools, vec!["a", "b"]);
        assert!(adv.spec.interfaces.is_none());
    }

    #[test]
    fn test_pools_depend_on_controller_and_advertisements_on_pools() {
        let plan = plan_addresses(
            "home",
            "edge",
            LoadBalancerKind::MetalLb,
            &[pool("a"), pool("b")],
            &[advertisement("vlan100", &["a"])],
            &Catalog::default(),
        )
        .unwrap();

        assert_eq!(plan.controller.id.as_str(), "helmchart/edge/home-metallb");
        for p in &plan.pools {
            assert_eq!(p.depends_on, vec![plan.controller.id.clone()]);
        }
        let pool_ids: Vec<_> = plan.pools.iter().map(|p| p.id.clone()).collect();
        assert_eq!(plan.advertisements[0].depends_on, pool_ids);
        assert!(!plan.synthesized_default);
    }

    #[test]
    fn test_pool_defaults() {
        let plan = plan_addresses(
            "home",
            "edge",
            LoadBalancerKind::MetalLb,
            &[pool("a")],
            &[],
            &Catalog::default(),
        )
        .unwrap();
        let Manifest::IpAddressPool(p) = &plan.pools[0].manifest else {
            panic!("expected an IPAddressPool");
        };
        assert!(p.spec.auto_assign);
        assert!(!p.spec.avoid_buggy_ips);
        assert_eq!(p.metadata.namespace.as_deref(), Some("edge"));
    }

    #[test]
    fn test_explicit_advertisements_are_kept_as_given() {
        let plan = plan_addresses(
            "home",
            "edge",
            LoadBalancerKind::MetalLb,
            &[pool("a"), pool("b")],
            &[advertisement("vlan100", &["a"]), advertisement("vlan200", &["b"])],
            &Catalog::default(),
        )
        .unwrap();

        let names: Vec<&str> = plan.advertisements.iter().map(|a| a.manifest.name()).collect();
        assert_eq!(names, vec!["vlan100", "vlan200"]);
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_zero_pools_is_valid() {
        let plan = plan_addresses(
            "home",
            "edge",
            LoadBalancerKind::MetalLb,
            &[],
            &[],
            &Catalog::default(),
        )
        .unwrap();
        assert!(plan.pools.is_empty());
        assert!(plan.advertisements.is_empty());
        assert_eq!(plan.into_resources().len(), 1);
    }

    #[test]
    fn test_dangling_reference_is_only_a_warning() {
        let plan = plan_addresses(
            "home",
            "edge",
            LoadBalancerKind::MetalLb,
            &[pool("lan")],
            &[advertisement("typo", &["lna"])],
            &Catalog::default(),
        )
        .unwrap();

        assert_eq!(plan.advertisements.len(), 1);
        assert_eq!(plan.warnings.len(), 1);
        assert!(plan.warnings[0].contains("'lna'"));
    }

    #[test]
    fn test_dangling_references_lists_each_missing_pool() {
        let warnings = dangling_references(
            &[pool("a")],
            &[advertisement("x", &["a", "b", "c"])],
        );
        assert_eq!(warnings.len(), 2);
    }
}
