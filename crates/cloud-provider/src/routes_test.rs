//! Unit tests for the route reconciler

#[cfg(test)]
mod tests {
    use crate::error::CloudError;
    use crate::routes::{Route, Routes, is_cluster_server, route_description};
    use crate::test_utils::*;
    use binarylane_client::{MockBinaryLaneClient, MockCall, MockOperation, RouteEntry};

    fn routes_for(mock: &MockBinaryLaneClient) -> Routes {
        Routes::new(directory_for(mock), "10.244.0.0/16".parse().unwrap())
    }

    #[test]
    fn test_cluster_membership_is_name_prefix() {
        assert!(is_cluster_server("prod-node-1", "prod"));
        assert!(!is_cluster_server("staging-node-1", "prod"));
        assert!(is_cluster_server("anything", ""));
    }

    #[test]
    fn test_route_name() {
        let route = Route::new("node-1", "10.244.1.0/24");
        assert_eq!(route.name, "node-1-10.244.1.0/24");
    }

    #[tokio::test]
    async fn test_list_routes_projects_router_to_node() {
        let mock = MockBinaryLaneClient::new("http://test");
        mock.add_server(vpc_member(1, "node-1", 77, "10.240.0.10"));
        mock.add_vpc(test_vpc(77, &[("10.240.0.10", "10.244.1.0/24")]));

        let routes = routes_for(&mock).list_routes("").await.unwrap();

        assert_eq!(routes, vec![Route::new("node-1", "10.244.1.0/24")]);
        assert_eq!(routes[0].target_node, "node-1");
    }

    #[tokio::test]
    async fn test_list_routes_keeps_foreign_routers() {
        let mock = MockBinaryLaneClient::new("http://test");
        mock.add_server(vpc_member(1, "node-1", 77, "10.240.0.10"));
        mock.add_vpc(test_vpc(77, &[("10.240.0.99", "192.168.0.0/24")]));

        let routes = routes_for(&mock).list_routes("").await.unwrap();

        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].target_node, "10.240.0.99");
        assert_eq!(routes[0].name, "10.240.0.99-192.168.0.0/24");
    }

    #[tokio::test]
    async fn test_list_routes_filters_by_cluster_prefix() {
        let mock = MockBinaryLaneClient::new("http://test");
        mock.add_server(vpc_member(1, "prod-1", 77, "10.240.0.10"));
        mock.add_server(vpc_member(2, "staging-1", 88, "10.250.0.10"));
        mock.add_vpc(test_vpc(77, &[("10.240.0.10", "10.244.1.0/24")]));
        mock.add_vpc(test_vpc(88, &[("10.250.0.10", "10.245.1.0/24")]));
        let routes = routes_for(&mock);

        let prod = routes.list_routes("prod").await.unwrap();
        assert_eq!(prod, vec![Route::new("prod-1", "10.244.1.0/24")]);
        assert_eq!(
            mock.calls_of(MockOperation::GetVpc),
            vec![MockCall::GetVpc(77)]
        );

        let all = routes.list_routes("").await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_list_routes_without_vpc_members_is_empty() {
        let mock = MockBinaryLaneClient::new("http://test");
        mock.add_server(test_server(1, "node-1"));

        let routes = routes_for(&mock).list_routes("").await.unwrap();

        assert!(routes.is_empty());
        assert!(mock.calls_of(MockOperation::GetVpc).is_empty());
    }

    #[tokio::test]
    async fn test_list_routes_skips_missing_vpc() {
        let mock = MockBinaryLaneClient::new("http://test");
        mock.add_server(vpc_member(1, "node-1", 77, "10.240.0.10"));
        mock.add_server(vpc_member(2, "node-2", 88, "10.250.0.10"));
        mock.add_vpc(test_vpc(88, &[("10.250.0.10", "10.244.2.0/24")]));

        let routes = routes_for(&mock).list_routes("").await.unwrap();

        assert_eq!(routes, vec![Route::new("node-2", "10.244.2.0/24")]);
    }

    #[tokio::test]
    async fn test_list_routes_propagates_vpc_errors() {
        let mock = MockBinaryLaneClient::new("http://test");
        mock.add_server(vpc_member(1, "node-1", 77, "10.240.0.10"));
        mock.fail_on(MockOperation::GetVpc, "500 Internal Server Error");

        let err = routes_for(&mock).list_routes("").await.unwrap_err();
        assert!(matches!(err, CloudError::Api { .. }));
    }

    #[tokio::test]
    async fn test_create_route_appends_and_is_idempotent() {
        let mock = MockBinaryLaneClient::new("http://test");
        mock.add_server(vpc_member(1, "node-1", 77, "10.240.0.10"));
        mock.add_vpc(test_vpc(77, &[("10.240.0.11", "10.244.9.0/24")]));
        let routes = routes_for(&mock);
        let route = Route::new("node-1", "10.244.1.0/24");

        routes.create_route("", &route).await.unwrap();
        let after_first = mock.vpc(77).unwrap().route_entries;

        routes.create_route("", &route).await.unwrap();
        let after_second = mock.vpc(77).unwrap().route_entries;

        assert_eq!(after_first, after_second);
        assert_eq!(
            after_first,
            vec![
                RouteEntry {
                    router: "10.240.0.11".to_string(),
                    destination: "10.244.9.0/24".to_string(),
                    description: None,
                },
                RouteEntry {
                    router: "10.240.0.10".to_string(),
                    destination: "10.244.1.0/24".to_string(),
                    description: Some(route_description("node-1")),
                },
            ]
        );
        assert_eq!(mock.calls_of(MockOperation::UpdateVpc).len(), 1);
    }

    #[tokio::test]
    async fn test_create_route_sends_whole_list_with_vpc_name() {
        let mock = MockBinaryLaneClient::new("http://test");
        mock.add_server(vpc_member(1, "node-1", 77, "10.240.0.10"));
        mock.add_vpc(test_vpc(77, &[("10.240.0.11", "10.244.9.0/24")]));

        routes_for(&mock)
            .create_route("", &Route::new("node-1", "10.244.1.0/24"))
            .await
            .unwrap();

        match &mock.calls_of(MockOperation::UpdateVpc)[..] {
            [MockCall::UpdateVpc { id, request }] => {
                assert_eq!(*id, 77);
                assert_eq!(request.name, "vpc-77");
                assert_eq!(request.route_entries.len(), 2);
            }
            other => panic!("unexpected calls: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_route_preconditions() {
        let mock = MockBinaryLaneClient::new("http://test");
        let mut outside = vpc_member(1, "outside", 77, "10.240.0.10");
        outside.vpc_id = None;
        mock.add_server(outside);
        let mut public_only = test_server(2, "public-only");
        public_only.vpc_id = Some(77);
        mock.add_server(public_only);
        let routes = routes_for(&mock);

        let err = routes
            .create_route("", &Route::new("missing", "10.244.1.0/24"))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::ServerNotFound(_)));

        let err = routes
            .create_route("", &Route::new("outside", "10.244.1.0/24"))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::NotInVpc(_)));

        let err = routes
            .create_route("", &Route::new("public-only", "10.244.1.0/24"))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::NoPrivateAddress(_)));

        assert!(mock.calls_of(MockOperation::UpdateVpc).is_empty());
    }

    #[tokio::test]
    async fn test_delete_route_removes_exact_match_only() {
        let mock = MockBinaryLaneClient::new("http://test");
        mock.add_server(vpc_member(1, "node-1", 77, "10.240.0.10"));
        mock.add_vpc(test_vpc(
            77,
            &[
                ("10.240.0.10", "10.244.1.0/24"),
                ("10.240.0.10", "10.244.5.0/24"),
                ("10.240.0.11", "10.244.1.0/24"),
            ],
        ));

        routes_for(&mock)
            .delete_route("", &Route::new("node-1", "10.244.1.0/24"))
            .await
            .unwrap();

        let remaining: Vec<(String, String)> = mock
            .vpc(77)
            .unwrap()
            .route_entries
            .into_iter()
            .map(|e| (e.router, e.destination))
            .collect();
        assert_eq!(
            remaining,
            vec![
                ("10.240.0.10".to_string(), "10.244.5.0/24".to_string()),
                ("10.240.0.11".to_string(), "10.244.1.0/24".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_absent_route_or_node_is_noop() {
        let mock = MockBinaryLaneClient::new("http://test");
        mock.add_server(vpc_member(1, "node-1", 77, "10.240.0.10"));
        mock.add_server(vpc_member(2, "node-2", 88, "10.250.0.10"));
        mock.add_vpc(test_vpc(77, &[("10.240.0.10", "10.244.1.0/24")]));
        let routes = routes_for(&mock);

        routes
            .delete_route("", &Route::new("node-1", "10.244.7.0/24"))
            .await
            .unwrap();
        routes
            .delete_route("", &Route::new("ghost", "10.244.1.0/24"))
            .await
            .unwrap();
        // VPC 88 does not exist
        routes
            .delete_route("", &Route::new("node-2", "10.244.2.0/24"))
            .await
            .unwrap();

        assert!(mock.calls_of(MockOperation::UpdateVpc).is_empty());
        assert_eq!(mock.vpc(77).unwrap().route_entries.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_route_for_node_outside_vpc_is_noop() {
        let mock = MockBinaryLaneClient::new("http://test");
        mock.add_server(test_server(1, "node-1"));

        routes_for(&mock)
            .delete_route("", &Route::new("node-1", "10.244.1.0/24"))
            .await
            .unwrap();

        assert!(mock.calls_of(MockOperation::GetVpc).is_empty());
    }
}
