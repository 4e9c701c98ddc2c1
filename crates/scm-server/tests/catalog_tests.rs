//! Catalog tests: content operations through the dispatcher against the
//! in-memory backend.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use scm_content::MemoryContentService;
    use scm_protocol::{AuthContext, ErrorCategory, ExchangeError, ExchangeResponse, RequestContext};
    use scm_server::{CatalogConfig, Dispatcher, build_registry};
    use serde_json::{Value, json};
    use uuid::Uuid;

    struct Harness {
        dispatcher: Dispatcher,
        service: MemoryContentService,
    }

    fn harness(config: CatalogConfig) -> Harness {
        let service = MemoryContentService::new();
        let registry = build_registry(Arc::new(service.clone()), &config).unwrap();
        Harness {
            dispatcher: Dispatcher::new(Arc::new(registry)),
            service,
        }
    }

    impl Harness {
        async fn call_as(&self, ctx: RequestContext, operation: &str, arguments: Value) -> ExchangeResponse {
            let raw = json!({"id": 1, "operation": operation, "arguments": arguments});
            self.dispatcher
                .dispatch(ctx, raw.to_string().as_bytes())
                .await
        }

        async fn ok(&self, operation: &str, arguments: Value) -> Value {
            match self.call_as(RequestContext::default(), operation, arguments).await {
                ExchangeResponse::Success(s) => s.result,
                ExchangeResponse::Failure(f) => panic!("{operation} failed: {:?}", f.error),
            }
        }

        async fn err(&self, operation: &str, arguments: Value) -> ExchangeError {
            failure(self.call_as(RequestContext::default(), operation, arguments).await)
        }

        async fn upload(&self, owner: Uuid, name: &str) -> Value {
            self.ok(
                "upload_content",
                json!({
                    "owner_id": owner,
                    "name": name,
                    "document_type": "text/plain",
                    "data": STANDARD.encode(format!("body of {name}")),
                }),
            )
            .await
        }
    }

    fn failure(resp: ExchangeResponse) -> ExchangeError {
        match resp {
            ExchangeResponse::Failure(f) => f.error,
            ExchangeResponse::Success(s) => panic!("expected failure, got {}", s.result),
        }
    }

    fn authed(owner: Uuid) -> RequestContext {
        RequestContext {
            auth: Some(AuthContext {
                owner_id: owner,
                tenant_id: None,
            }),
            ..Default::default()
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Catalog listing
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn operations_list_names_every_content_operation() {
        let h = harness(CatalogConfig::default());
        let listing = h.ok("operations/list", json!({})).await;
        let names: Vec<&str> = listing["operations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|op| op["name"].as_str().unwrap())
            .collect();
        for name in [
            "echo",
            "upload_content",
            "get_content",
            "get_content_details",
            "get_content_status",
            "list_content",
            "search_content",
            "list_by_status",
            "download_content",
            "update_content",
            "delete_content",
            "batch_upload",
            "batch_get_content",
            "list_resources",
            "read_resource",
        ] {
            assert!(names.contains(&name), "missing {name}");
        }
    }

    #[tokio::test]
    async fn echo_reports_protocol_version() {
        let h = harness(CatalogConfig::default());
        let ctx = RequestContext {
            protocol_version: "2025-06-18",
            ..Default::default()
        };
        let ExchangeResponse::Success(ok) = h.call_as(ctx, "echo", json!({"message": "hi"})).await else {
            panic!("echo failed");
        };
        assert_eq!(ok.result, json!({"message": "hi", "protocolVersion": "2025-06-18"}));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Single-item CRUD
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn upload_then_get() {
        let h = harness(CatalogConfig::default());
        let owner = Uuid::new_v4();
        let created = h.upload(owner, "report").await;
        assert_eq!(created["status"], "uploaded");
        assert_eq!(created["size"], "body of report".len());

        let fetched = h.ok("get_content", json!({"content_id": created["id"]})).await;
        assert_eq!(fetched, created);
        assert_eq!(h.service.len(), 1);
    }

    #[tokio::test]
    async fn upload_requires_owner_without_auth() {
        let h = harness(CatalogConfig::default());
        let err = h
            .err("upload_content", json!({"name": "x", "data": ""}))
            .await;
        assert_eq!(err.category, ErrorCategory::Validation);
        assert_eq!(err.field.as_deref(), Some("owner_id"));
    }

    #[tokio::test]
    async fn upload_rejects_bad_base64() {
        let h = harness(CatalogConfig::default());
        let err = h
            .err(
                "upload_content",
                json!({"owner_id": Uuid::new_v4(), "name": "x", "data": "***"}),
            )
            .await;
        assert_eq!(err.field.as_deref(), Some("data"));
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let h = harness(CatalogConfig::default());
        let err = h.err("get_content", json!({"content_id": Uuid::new_v4()})).await;
        assert_eq!(err.category, ErrorCategory::NotFound);
    }

    #[tokio::test]
    async fn update_and_delete() {
        let h = harness(CatalogConfig::default());
        let created = h.upload(Uuid::new_v4(), "draft").await;
        let id = created["id"].clone();

        let unchanged = h.ok("update_content", json!({"content_id": id})).await;
        assert_eq!(unchanged["name"], "draft");

        let updated = h
            .ok("update_content", json!({"content_id": id, "name": "final", "tags": ["a"]}))
            .await;
        assert_eq!(updated["name"], "final");
        assert_eq!(updated["tags"], json!(["a"]));

        let deleted = h.ok("delete_content", json!({"content_id": id})).await;
        assert_eq!(deleted, json!({"content_id": id, "deleted": true}));
        let err = h.err("get_content", json!({"content_id": id})).await;
        assert_eq!(err.category, ErrorCategory::NotFound);
    }

    #[tokio::test]
    async fn download_falls_back_to_base64() {
        let h = harness(CatalogConfig::default());
        let created = h.upload(Uuid::new_v4(), "blob").await;
        let download = h
            .ok("download_content", json!({"content_id": created["id"]}))
            .await;
        assert_eq!(download["format"], "base64");
        let bytes = STANDARD.decode(download["data"].as_str().unwrap()).unwrap();
        assert_eq!(bytes, b"body of blob");
    }

    #[tokio::test]
    async fn details_and_status_describe_stored_content() {
        let h = harness(CatalogConfig::default());
        let created = h.upload(Uuid::new_v4(), "sheet").await;
        let id = created["id"].clone();

        let details = h.ok("get_content_details", json!({"content_id": id})).await;
        assert_eq!(details["id"], id);
        assert_eq!(details["file_size"], "body of sheet".len());
        assert_eq!(details["mime_type"], "text/plain");
        assert_eq!(details["ready"], true);
        assert_eq!(details["download_url"], Value::Null);

        let status = h.ok("get_content_status", json!({"content_id": id})).await;
        assert_eq!(status["status"], "uploaded");
        assert_eq!(status["ready"], true);

        h.ok("delete_content", json!({"content_id": id})).await;
        let err = h.err("get_content_status", json!({"content_id": id})).await;
        assert_eq!(err.category, ErrorCategory::NotFound);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Resources
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn resources_are_listed_and_readable() {
        let h = harness(CatalogConfig::default());
        let listing = h.ok("list_resources", json!({})).await;
        let uris: Vec<&str> = listing["resources"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["uri"].as_str().unwrap())
            .collect();
        assert_eq!(uris, ["schema://content", "stats://system"]);
        assert_eq!(listing["templates"][0]["uri_template"], "content://{id}");

        let schema = h.ok("read_resource", json!({"uri": "schema://content"})).await;
        assert_eq!(schema["mime_type"], "application/schema+json");
        assert_eq!(schema["contents"]["properties"]["status"]["enum"][0], "created");

        let created = h.upload(Uuid::new_v4(), "page").await;
        let uri = format!("content://{}", created["id"].as_str().unwrap());
        let read = h.ok("read_resource", json!({"uri": uri})).await;
        assert_eq!(read["uri"], uri);
        assert_eq!(read["contents"], created);

        let details = h
            .ok("read_resource", json!({"uri": format!("{uri}/details")}))
            .await;
        assert_eq!(details["contents"]["file_size"], "body of page".len());

        let err = h.err("read_resource", json!({"uri": "prompts://upload"})).await;
        assert_eq!(err.category, ErrorCategory::NotFound);
    }

    #[tokio::test]
    async fn system_stats_count_by_status_within_caller_scope() {
        let h = harness(CatalogConfig {
            auth_enabled: true,
            ..Default::default()
        });
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        for (owner, name) in [(alice, "a1"), (alice, "a2"), (bob, "b1")] {
            let resp = h
                .call_as(authed(owner), "upload_content", json!({"name": name, "data": ""}))
                .await;
            assert!(matches!(resp, ExchangeResponse::Success(_)));
        }

        let stats = match h
            .call_as(authed(alice), "read_resource", json!({"uri": "stats://system"}))
            .await
        {
            ExchangeResponse::Success(s) => s.result["contents"]["content_count"].clone(),
            ExchangeResponse::Failure(f) => panic!("stats failed: {:?}", f.error),
        };
        assert_eq!(stats["total"], 2);
        assert_eq!(stats["by_status"]["uploaded"], 2);
        assert_eq!(stats["by_status"]["failed"], 0);

        let unscoped = h.ok("read_resource", json!({"uri": "stats://system"})).await;
        assert_eq!(unscoped["contents"]["content_count"]["total"], 3);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Listing and search
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn list_paginates_and_clamps_limit() {
        let h = harness(CatalogConfig {
            default_page_size: 2,
            max_page_size: 3,
            ..Default::default()
        });
        let owner = Uuid::new_v4();
        for i in 0..5 {
            h.upload(owner, &format!("doc-{i}")).await;
        }
        h.upload(Uuid::new_v4(), "someone else").await;

        let first = h.ok("list_content", json!({"owner_id": owner})).await;
        assert_eq!(first["count"], 2);
        assert_eq!(first["total"], 5);
        assert_eq!(first["items"][0]["name"], "doc-0");

        let big = h
            .ok("list_content", json!({"owner_id": owner, "limit": 500, "offset": 3}))
            .await;
        assert_eq!(big["limit"], 3);
        assert_eq!(big["count"], 2);
        assert_eq!(big["items"][0]["name"], "doc-3");
    }

    #[tokio::test]
    async fn search_matches_text_and_tags() {
        let h = harness(CatalogConfig::default());
        let owner = Uuid::new_v4();
        h.upload(owner, "Quarterly Report").await;
        h.upload(owner, "holiday photo").await;
        h.ok(
            "upload_content",
            json!({"owner_id": owner, "name": "tagged", "data": "", "tags": ["finance", "q3"]}),
        )
        .await;

        let hits = h.ok("search_content", json!({"query": "report"})).await;
        assert_eq!(hits["total"], 1);
        assert_eq!(hits["items"][0]["name"], "Quarterly Report");

        let tagged = h.ok("search_content", json!({"tags": ["finance"]})).await;
        assert_eq!(tagged["total"], 1);
        assert_eq!(tagged["items"][0]["name"], "tagged");
    }

    #[tokio::test]
    async fn list_by_status_filters() {
        let h = harness(CatalogConfig::default());
        let owner = Uuid::new_v4();
        h.upload(owner, "a").await;
        let uploaded = h.ok("list_by_status", json!({"status": "uploaded"})).await;
        assert_eq!(uploaded["total"], 1);
        let failed = h.ok("list_by_status", json!({"status": "failed"})).await;
        assert_eq!(failed["total"], 0);

        let err = h.err("list_by_status", json!({"status": "bogus"})).await;
        assert_eq!(err.field.as_deref(), Some("status"));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Ownership
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn authenticated_caller_cannot_read_foreign_content() {
        let h = harness(CatalogConfig {
            auth_enabled: true,
            ..Default::default()
        });
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let created = match h
            .call_as(
                authed(alice),
                "upload_content",
                json!({"name": "private", "data": STANDARD.encode("x")}),
            )
            .await
        {
            ExchangeResponse::Success(s) => s.result,
            ExchangeResponse::Failure(f) => panic!("upload failed: {:?}", f.error),
        };
        assert_eq!(created["owner_id"], json!(alice));

        let err = failure(
            h.call_as(authed(bob), "get_content", json!({"content_id": created["id"]}))
                .await,
        );
        assert_eq!(err.category, ErrorCategory::Forbidden);

        let err = failure(
            h.call_as(
                authed(bob),
                "upload_content",
                json!({"owner_id": alice, "name": "spoof", "data": ""}),
            )
            .await,
        );
        assert_eq!(err.category, ErrorCategory::Forbidden);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Batches
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn batch_upload_reports_per_item_outcomes() {
        let h = harness(CatalogConfig::default());
        let owner = Uuid::new_v4();
        let item = |name: &str| json!({"name": name, "data": STANDARD.encode(name)});
        let items = vec![item("a"), item("b"), json!({"data": ""}), item("d"), item("e")];

        let report = h
            .ok("batch_upload", json!({"owner_id": owner, "items": items}))
            .await;
        assert_eq!(report["total"], 5);
        assert_eq!(report["successful"], 4);
        assert_eq!(report["failed"], 1);
        for (i, outcome) in report["results"].as_array().unwrap().iter().enumerate() {
            assert_eq!(outcome["index"], i);
        }
        assert_eq!(report["results"][2]["success"], false);
        assert_eq!(report["results"][2]["error"]["field"], "items[2].name");
        assert_eq!(report["results"][3]["value"]["name"], "d");
        assert_eq!(h.service.len(), 4);
    }

    #[tokio::test]
    async fn batch_at_the_size_limit_runs_every_item() {
        let h = harness(CatalogConfig {
            max_batch_size: 3,
            ..Default::default()
        });
        let items = vec![json!({"name": "a", "data": ""}); 3];
        let report = h
            .ok("batch_upload", json!({"owner_id": Uuid::new_v4(), "items": items}))
            .await;
        assert_eq!(report["total"], 3);
        assert_eq!(report["successful"], 3);
        assert_eq!(h.service.len(), 3);
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected_whole() {
        let h = harness(CatalogConfig {
            max_batch_size: 2,
            ..Default::default()
        });
        let items = vec![json!({"name": "a", "data": ""}); 3];
        let err = h
            .err("batch_upload", json!({"owner_id": Uuid::new_v4(), "items": items}))
            .await;
        assert_eq!(err.category, ErrorCategory::BatchSizeExceeded);
        assert!(h.service.is_empty());
    }

    #[tokio::test]
    async fn batch_get_mixes_hits_and_misses() {
        let h = harness(CatalogConfig::default());
        let created = h.upload(Uuid::new_v4(), "one").await;
        let report = h
            .ok(
                "batch_get_content",
                json!({"items": [created["id"], Uuid::new_v4(), "not-a-uuid"]}),
            )
            .await;
        assert_eq!(report["successful"], 1);
        assert_eq!(report["results"][0]["value"]["name"], "one");
        assert_eq!(report["results"][1]["error"]["category"], "not_found");
        assert_eq!(report["results"][2]["error"]["field"], "items[2]");
    }
}
