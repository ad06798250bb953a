//! Unit tests for node metadata and backend selection

#[cfg(test)]
mod tests {
    use crate::reconciler::node::*;
    use crate::test_utils::*;
    use cloud_provider::{HOST_LABEL, InstanceMetadata};
    use k8s_openapi::api::core::v1::{NodeAddress, NodeStatus};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn address(type_: &str, address: &str) -> NodeAddress {
        NodeAddress {
            type_: type_.to_string(),
            address: address.to_string(),
        }
    }

    fn test_metadata() -> InstanceMetadata {
        InstanceMetadata {
            provider_id: "binarylane://42".to_string(),
            node_addresses: vec![
                address("Hostname", "prod-node-1"),
                address("InternalIP", "10.240.0.5"),
                address("ExternalIP", "203.0.113.5"),
            ],
            instance_type: "std-2vcpu".to_string(),
            zone: "syd".to_string(),
            region: "syd".to_string(),
            additional_labels: BTreeMap::from([(HOST_LABEL.to_string(), "hv-12".to_string())]),
        }
    }

    #[test]
    fn test_backend_selection() {
        assert!(is_load_balancer_backend(&create_test_node("a", None)));

        let mut cordoned = create_test_node("b", None);
        cordoned.spec.as_mut().unwrap().unschedulable = Some(true);
        assert!(!is_load_balancer_backend(&cordoned));

        let excluded = with_labels(
            create_test_node("c", None),
            &[(LABEL_EXCLUDE_FROM_LOAD_BALANCERS, "")],
        );
        assert!(!is_load_balancer_backend(&excluded));

        let mut deleting = create_test_node("d", None);
        mark_deleting(&mut deleting.metadata);
        assert!(!is_load_balancer_backend(&deleting));
    }

    #[test]
    fn test_fresh_node_gets_everything() {
        let node = with_taint(create_test_node("prod-node-1", None), TAINT_UNINITIALIZED);
        let patch = node_metadata_patch(&node, &test_metadata()).unwrap();

        assert_eq!(
            patch,
            json!({
                "metadata": { "labels": {
                    LABEL_REGION: "syd",
                    LABEL_ZONE: "syd",
                    LABEL_INSTANCE_TYPE: "std-2vcpu",
                    HOST_LABEL: "hv-12",
                } },
                "spec": { "providerID": "binarylane://42", "taints": [] },
            })
        );
    }

    #[test]
    fn test_existing_provider_id_is_kept() {
        let mut node = create_test_node("prod-node-1", None);
        node.spec.as_mut().unwrap().provider_id = Some("binarylane://7".to_string());

        let patch = node_metadata_patch(&node, &test_metadata()).unwrap();
        assert!(patch.get("spec").is_none());
    }

    #[test]
    fn test_other_taints_survive() {
        let node = with_taint(
            with_taint(create_test_node("prod-node-1", None), "dedicated"),
            TAINT_UNINITIALIZED,
        );
        let patch = node_metadata_patch(&node, &test_metadata()).unwrap();

        let taints = patch["spec"]["taints"].as_array().unwrap();
        assert_eq!(taints.len(), 1);
        assert_eq!(taints[0]["key"], "dedicated");
    }

    #[test]
    fn test_initialized_node_needs_no_patch() {
        let mut node = with_labels(
            create_test_node("prod-node-1", None),
            &[
                (LABEL_REGION, "syd"),
                (LABEL_ZONE, "syd"),
                (LABEL_INSTANCE_TYPE, "std-2vcpu"),
                (HOST_LABEL, "hv-12"),
                ("team", "infra"),
            ],
        );
        node.spec.as_mut().unwrap().provider_id = Some("binarylane://42".to_string());

        assert_eq!(node_metadata_patch(&node, &test_metadata()), None);
    }

    #[test]
    fn test_changed_label_only() {
        let mut node = with_labels(
            create_test_node("prod-node-1", None),
            &[
                (LABEL_REGION, "syd"),
                (LABEL_ZONE, "syd"),
                (LABEL_INSTANCE_TYPE, "std-1vcpu"),
                (HOST_LABEL, "hv-12"),
            ],
        );
        node.spec.as_mut().unwrap().provider_id = Some("binarylane://42".to_string());

        assert_eq!(
            node_metadata_patch(&node, &test_metadata()),
            Some(json!({ "metadata": { "labels": { LABEL_INSTANCE_TYPE: "std-2vcpu" } } }))
        );
    }

    #[test]
    fn test_addresses_patch() {
        let metadata = test_metadata();
        let mut node = create_test_node("prod-node-1", None);

        let patch = node_addresses_patch(&node, &metadata.node_addresses).unwrap();
        assert_eq!(patch["status"]["addresses"][0], json!({ "type": "Hostname", "address": "prod-node-1" }));
        assert_eq!(patch["status"]["addresses"].as_array().unwrap().len(), 3);

        node.status = Some(NodeStatus {
            addresses: Some(metadata.node_addresses.clone()),
            ..Default::default()
        });
        assert_eq!(node_addresses_patch(&node, &metadata.node_addresses), None);
    }
}
