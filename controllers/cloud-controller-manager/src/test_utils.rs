//! Test utilities for unit testing reconcilers
//!
//! Builders for the Node and Service objects the reconcilers look at.

#[cfg(test)]
use k8s_openapi::api::core::v1::{Node, NodeSpec, Service, ServiceSpec, Taint};
#[cfg(test)]
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
#[cfg(test)]
use std::collections::BTreeMap;

/// Helper to create a node with an optional pod CIDR
#[cfg(test)]
pub fn create_test_node(name: &str, pod_cidr: Option<&str>) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: Some(NodeSpec {
            pod_cidr: pod_cidr.map(|c| c.to_string()),
            ..Default::default()
        }),
        status: None,
    }
}

#[cfg(test)]
pub fn with_labels(mut node: Node, labels: &[(&str, &str)]) -> Node {
    node.metadata.labels = Some(
        labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    );
    node
}

#[cfg(test)]
pub fn with_taint(mut node: Node, key: &str) -> Node {
    let spec = node.spec.get_or_insert_with(Default::default);
    spec.taints.get_or_insert_with(Vec::new).push(Taint {
        key: key.to_string(),
        effect: "NoSchedule".to_string(),
        ..Default::default()
    });
    node
}

/// Give the object a deletion timestamp
#[cfg(test)]
pub fn mark_deleting(meta: &mut ObjectMeta) {
    let stamped: ObjectMeta =
        serde_json::from_value(serde_json::json!({ "deletionTimestamp": "2026-01-01T00:00:00Z" }))
            .unwrap();
    meta.deletion_timestamp = stamped.deletion_timestamp;
}

/// Helper to create a service of the given type with annotations and finalizers
#[cfg(test)]
pub fn create_test_service(
    name: &str,
    type_: &str,
    annotations: &[(&str, &str)],
    finalizers: &[&str],
) -> Service {
    let annotations: BTreeMap<String, String> = annotations
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            annotations: (!annotations.is_empty()).then_some(annotations),
            finalizers: (!finalizers.is_empty())
                .then(|| finalizers.iter().map(|f| f.to_string()).collect()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some(type_.to_string()),
            ..Default::default()
        }),
        status: None,
    }
}
