// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `graph`

#[cfg(test)]
mod tests {
    use crate::errors::PlanError;
    use crate::graph::DependencyGraph;
    use crate::resources::{build_secret, Manifest, PlannedResource, ResourceId};
    use std::collections::BTreeMap;

    fn node(id: &str, deps: &[&str]) -> PlannedResource {
        let secret = build_secret(id, "edge", BTreeMap::new(), BTreeMap::new());
        let deps: Vec<ResourceId> = deps.iter().map(|d| ResourceId::from(*d)).collect();
        PlannedResource::new(id, Manifest::Secret(Box::new(secret))).depending_on(&deps)
    }

    fn ids(stage: &[ResourceId]) -> Vec<&str> {
        stage.iter().map(ResourceId::as_str).collect()
    }

    #[test]
    fn test_stages_follow_dependencies() {
        let graph = DependencyGraph::build(&[
            node("cert", &["cm", "issuer"]),
            node("cm", &[]),
            node("issuer", &["cm"]),
            node("traefik", &["cert"]),
            node("metallb", &[]),
        ])
        .unwrap();

        let stages: Vec<Vec<&str>> = graph.stages().iter().map(|s| ids(s)).collect();
        assert_eq!(
            stages,
            vec![
                vec!["cm", "metallb"],
                vec!["issuer"],
                vec!["cert"],
                vec!["traefik"]
            ]
        );
        assert_eq!(graph.len(), 5);
        assert_eq!(graph.stage_of(&"traefik".into()), Some(3));
    }

    #[test]
    fn test_topological_order_respects_every_edge() {
        let resources = [
            node("d", &["b", "c"]),
            node("c", &["a"]),
            node("b", &["a"]),
            node("a", &[]),
        ];
        let graph = DependencyGraph::build(&resources).unwrap();
        let order: Vec<&ResourceId> = graph.topological_order().collect();

        for resource in &resources {
            let position = order.iter().position(|id| **id == resource.id).unwrap();
            for dep in &resource.depends_on {
                let dep_position = order.iter().position(|id| *id == dep).unwrap();
                assert!(dep_position < position, "{dep} must precede {}", resource.id);
            }
        }
    }

    #[test]
    fn test_transitive_dependencies() {
        let graph = DependencyGraph::build(&[
            node("a", &[]),
            node("b", &["a"]),
            node("c", &["b"]),
            node("x", &[]),
        ])
        .unwrap();

        let deps = graph.transitive_dependencies(&"c".into());
        let deps: Vec<&str> = deps.iter().map(ResourceId::as_str).collect();
        assert_eq!(deps, vec!["a", "b"]);
        assert!(graph.transitive_dependencies(&"x".into()).is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let err = DependencyGraph::build(&[node("a", &[]), node("a", &[])]).unwrap_err();
        assert_eq!(err, PlanError::DuplicateResource { id: "a".into() });
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let err = DependencyGraph::build(&[node("a", &["ghost"])]).unwrap_err();
        assert_eq!(
            err,
            PlanError::UnknownDependency {
                id: "a".into(),
                dependency: "ghost".into(),
            }
        );
    }

    #[test]
    fn test_cycle_rejected_with_members() {
        let err = DependencyGraph::build(&[
            node("root", &[]),
            node("a", &["b"]),
            node("b", &["a"]),
            node("leaf", &["a"]),
        ])
        .unwrap_err();

        assert_eq!(
            err,
            PlanError::DependencyCycle {
                members: vec!["a".into(), "b".into(), "leaf".into()],
            }
        );
    }

    #[test]
    fn test_empty_graph() {
        let graph = DependencyGraph::build(&[]).unwrap();
        assert!(graph.is_empty());
        assert!(graph.stages().is_empty());
    }
}
