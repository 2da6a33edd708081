use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{json, Value};

use indoormap_api::app::services::AppServices;
use indoormap_infra::{HttpConfig, InMemoryMapStore, RoutingConfig};

struct TestServer {
    base_url: String,
    store: Arc<InMemoryMapStore>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(InMemoryMapStore::sample()).await
    }

    async fn spawn_with(store: InMemoryMapStore) -> Self {
        Self::spawn_full(store, HttpConfig::default()).await
    }

    async fn spawn_full(store: InMemoryMapStore, http: HttpConfig) -> Self {
        // Same router as prod, backed by the fixture store on an ephemeral port.
        let store = Arc::new(store);
        let services = Arc::new(AppServices::new(store.clone(), RoutingConfig::default()));
        let app = indoormap_api::app::build_app(services, &http);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = reqwest::get(self.url(path)).await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn edge_ids(fc: &Value) -> Vec<i64> {
    fc["features"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["properties"]["edge_id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn every_layer_is_a_feature_collection() {
    let srv = TestServer::spawn().await;

    for (path, count) in [
        ("/api/base_floor/", 3),
        ("/api/corridors/", 1),
        ("/api/room_points/", 3),
        ("/api/nav_nodes/", 4),
        ("/api/nav_edges_final/", 2),
    ] {
        let (status, body) = srv.get(path).await;
        assert_eq!(status, StatusCode::OK, "{path}");
        assert_eq!(body["type"], "FeatureCollection");
        assert_eq!(body["features"].as_array().unwrap().len(), count, "{path}");
        assert_eq!(body["features"][0]["type"], "Feature");
        assert!(body["features"][0]["geometry"].is_object());
    }
}

#[tokio::test]
async fn trailing_slash_is_optional() {
    let srv = TestServer::spawn().await;
    let (with, _) = srv.get("/api/corridors/").await;
    let (without, _) = srv.get("/api/corridors").await;
    assert_eq!(with, StatusCode::OK);
    assert_eq!(without, StatusCode::OK);

    let (status, _) = srv.get("/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_table_is_a_server_error() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv.get("/api/nav_edges_proj/").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "schema_error");
}

#[tokio::test]
async fn shortest_path_follows_path_order() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv.get("/api/route/shortest_path/?start=1&end=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "FeatureCollection");
    assert_eq!(edge_ids(&body), vec![100, 101]);
    let keys: Vec<&str> = body["features"][0]["properties"]
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .take(6)
        .collect();
    assert_eq!(keys, ["edge_id", "seq", "path_seq", "node", "cost", "agg_cost"]);
    assert_eq!(body["features"][1]["properties"]["agg_cost"], json!(10.0));
    assert_eq!(body["features"][0]["properties"]["seq"], json!(1));
}

#[tokio::test]
async fn routing_parameter_errors_are_bad_requests() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/api/route/shortest_path/?start=1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "provide start and end nav_nodes ogc_fid");

    for path in [
        "/api/route/shortest_path/?start=abc&end=3",
        "/api/route/astar/?start=1&end=3&heuristic=9",
        "/api/route/via_points/?points=1",
        "/api/route/via_points/?points=1,1,3",
        "/api/route/isochrone/?start=1&max_cost=0",
        "/api/route/isochrone/?start=1",
        "/api/route/shortest_path/?start=1&end=3&directed=maybe",
    ] {
        let (status, body) = srv.get(path).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(body["error"], "validation_error", "{path}");
    }
}

#[tokio::test]
async fn routing_not_found_cases() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/api/route/shortest_path/?start=99&end=3").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "start node not found");

    let (status, body) = srv.get("/api/route/shortest_path/?start=1&end=99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "end node not found");

    let (status, body) = srv.get("/api/route/shortest_path/?start=1&end=4").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "no route found");
}

#[tokio::test]
async fn missing_pgrouting_is_a_server_error() {
    let store = InMemoryMapStore::sample().with_functions(&["get_route_between_rooms"]);
    let srv = TestServer::spawn_with(store).await;
    let (status, body) = srv.get("/api/route/shortest_path/?start=1&end=3").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("pgRouting not available on database"));
}

#[tokio::test]
async fn astar_via_points_and_isochrone() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/api/route/astar/?start=1&end=3&heuristic=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edge_ids(&body), vec![100, 101]);

    let (status, body) = srv.get("/api/route/via_points/?points=1,3,2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edge_ids(&body), vec![100, 101, 101]);
    assert_eq!(body["features"][2]["properties"]["leg"], json!(1));

    let (status, body) = srv.get("/api/route/via_points/?points=1,3,4").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "no route found between via points 1 and 2");

    let (status, body) = srv.get("/api/route/isochrone/?start=1&max_cost=100").await;
    assert_eq!(status, StatusCode::OK);
    let costs: Vec<f64> = body["features"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["properties"]["agg_cost"].as_f64().unwrap())
        .collect();
    assert_eq!(costs, vec![0.0, 10.0, 22.5]);
}

#[tokio::test]
async fn rooms_and_base_floor_lists() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/api/v1/rooms/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], json!(1));
    assert_eq!(body[0]["name"], "Lab 101");
    assert_eq!(body[0]["location"]["type"], "Point");

    let (status, body) = srv.get("/api/v1/base-floor/").await;
    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 3);
    for key in ["ogc_fid", "layer", "text", "geometry"] {
        assert!(items[0].get(key).is_some(), "{key} missing");
    }
    assert_eq!(items[0]["geometry"]["type"], "LineString");
}

#[tokio::test]
async fn room_route_is_planned_and_cached() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/v1/route/"))
        .json(&json!({"start_room_id": 1, "end_room_id": 2}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let planned: Value = res.json().await.unwrap();
    assert_eq!(planned["distance_meters"], json!(22.5));
    assert_eq!(planned["route"]["type"], "LineString");
    let cache_id = planned["cache_id"].as_i64().unwrap();

    let (status, cached) = srv.get(&format!("/api/v1/route/cache/{cache_id}/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cached["start_room_id"], json!(1));
    assert_eq!(cached["route"], planned["route"]);

    let (status, _) = srv.get("/api/v1/route/cache/999/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = srv.get("/api/v1/route/cache/abc/").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn room_route_errors() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/v1/route"))
        .json(&json!({"start_room_id": 2, "end_room_id": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(srv.url("/api/v1/route/"))
        .json(&json!({"start_room_id": 1, "end_room_id": 2, "simplify_tolerance": -1.0}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/api/v1/route/"))
        .json(&json!({"start_room_id": "one"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn health_reflects_database_state() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/api/v1/health/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["pgrouting"], "3.6.1");

    srv.store.set_unavailable(true);
    let (status, body) = srv.get("/api/v1/health/").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["database"], "unreachable");
    assert_eq!(body["error"], "database_unavailable");

    let (status, body) = srv.get("/api/corridors/").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "database_unavailable");
}

#[tokio::test]
async fn request_id_is_echoed_or_generated() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/api/v1/health/"))
        .header("x-request-id", "trace-me-42")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "trace-me-42");

    let res = client.get(srv.url("/api/v1/rooms/")).send().await.unwrap();
    let generated = res.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(generated.len(), 36);
}

#[tokio::test]
async fn openapi_document_is_served_twice() {
    let srv = TestServer::spawn().await;
    let (status, v1) = srv.get("/api/v1/schema/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(v1["openapi"].as_str().unwrap().starts_with("3."));
    let (status, docs) = srv.get("/api/docs/schema").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v1, docs);
}

#[tokio::test]
async fn documented_statuses_match_served_statuses() {
    let srv = TestServer::spawn().await;
    let (_, doc) = srv.get("/api/v1/schema/").await;

    let (status, _) = srv.get("/api/v1/route/cache/abc/").await;
    let documented = &doc["paths"]["/api/v1/route/cache/{id}/"]["get"]["responses"];
    assert!(documented[status.as_str()].is_object(), "{status} undocumented");

    let (status, _) = srv.get("/api/route/isochrone/?start=1").await;
    let documented = &doc["paths"]["/api/route/isochrone/"]["get"]["responses"];
    assert!(documented[status.as_str()].is_object(), "{status} undocumented");

    let (status, _) = srv.get("/api/nav_edges_proj/").await;
    let documented = &doc["paths"]["/api/nav_edges_proj/"]["get"]["responses"];
    assert!(documented[status.as_str()].is_object(), "{status} undocumented");
}

#[tokio::test]
async fn swagger_ui_and_redoc_are_served() {
    let srv = TestServer::spawn().await;
    for path in ["/api/docs/swagger/", "/api/docs/redoc/", "/api/docs/redoc"] {
        let res = reqwest::get(srv.url(path)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{path}");
        let content_type = res.headers()["content-type"].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/html"), "{path}: {content_type}");
    }

    let (status, doc) = srv.get("/api/docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/v1/rooms/"].is_object());
}

#[tokio::test]
async fn cors_allows_configured_origins_only() {
    let http = HttpConfig {
        cors_allowed_origins: vec!["http://maps.test".to_string()],
        ..HttpConfig::default()
    };
    let srv = TestServer::spawn_full(InMemoryMapStore::sample(), http).await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/api/corridors/"))
        .header("origin", "http://maps.test")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["access-control-allow-origin"], "http://maps.test");

    let res = client
        .get(srv.url("/api/corridors/"))
        .header("origin", "http://elsewhere.test")
        .send()
        .await
        .unwrap();
    assert!(res.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn cors_allows_any_origin_by_default() {
    let srv = TestServer::spawn().await;
    let res = reqwest::Client::new()
        .get(srv.url("/api/v1/rooms/"))
        .header("origin", "http://anywhere.test")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn unknown_paths_are_json_404s() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv.get("/api/nowhere/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}
