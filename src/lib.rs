// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Edge Orchestrator - network edge planner for Kubernetes
//!
//! Edge Orchestrator turns one configuration document into the complete,
//! dependency-ordered set of Kubernetes objects that make up the network edge
//! of a cluster: load-balanced address allocation, an ingress controller, DNS
//! synchronization and automated TLS certificates.
//!
//! ## Overview
//!
//! - Every pluggable role (load balancer, ingress controller, DNS provider,
//!   certificate issuer) is selected from a closed set of implementations
//! - DNS backends without native external-dns support are wired through a
//!   synthesized webhook sidecar
//! - Certificates are bootstrapped through an explicit four-stage chain
//! - An `AdGuard` Home settings sync job is generated for either direction
//! - The result is a validated dependency graph, applied stage by stage
//!
//! ## Modules
//!
//! - [`config`] - Configuration document and its typed model
//! - [`registry`] - Provider selection
//! - [`webhook`] - Webhook sidecar synthesis
//! - [`dns_sync`] - One external-dns instance per DNS provider
//! - [`address_planner`] - Load balancer pools and advertisements
//! - [`certificates`] - Certificate chain
//! - [`ingress_controller`] - Ingress controller values
//! - [`adguard_sync`] - Settings sync job
//! - [`orchestrator`] - Composition into a deployment plan
//! - [`graph`] - Dependency graph validation and staging
//! - [`apply`] - Stage-by-stage server-side apply
//!
//! ## Example
//!
//! ```rust
//! use edge_orchestrator::orchestrator::plan_document;
//!
//! let plan = plan_document(
//!     r"
//! stack: home
//! namespace: edge-system
//! loadBalancer: metal-lb
//! ingressController: traefik
//! ipAddressPools:
//!   - name: lan
//!     addresses: [192.168.1.240-192.168.1.250]
//! ",
//! )
//! .unwrap();
//!
//! assert_eq!(plan.resources().next().unwrap().id.as_str(), "namespace/edge-system");
//! println!("{}", plan.to_yaml().unwrap());
//! ```

pub mod address_planner;
pub mod adguard_sync;
pub mod apply;
pub mod catalog;
pub mod certificates;
pub mod config;
pub mod constants;
pub mod crd;
pub mod dns_sync;
pub mod errors;
pub mod graph;
pub mod ingress_controller;
pub mod labels;
pub mod orchestrator;
pub mod registry;
pub mod resources;
pub mod retry;
pub mod webhook;

#[cfg(test)]
mod address_planner_tests;
#[cfg(test)]
mod catalog_tests;
#[cfg(test)]
mod config_tests;
#[cfg(test)]
mod dns_sync_tests;
#[cfg(test)]
mod graph_tests;
#[cfg(test)]
mod orchestrator_tests;
