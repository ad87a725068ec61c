//! End-to-end tests: client → proxy → mock backend.

mod common;

use std::fs::{self, File};
use std::time::{Duration, SystemTime};

use prefix_proxy::config::{load_from_source, parse_config, ConfigReloader, ConfigStore, FileSource, ReloadOutcome};
use serde_json::Value;
use tempfile::TempDir;

use common::{
    client, closed_addr, start_echo_backend, start_fixed_backend, start_proxy,
    start_proxy_with_store, start_silent_backend, start_trickle_backend, Captured,
};

async fn echoed(response: reqwest::Response) -> Captured {
    assert_eq!(response.status(), 200);
    Captured::from_echo(&response.text().await.unwrap())
}

#[tokio::test]
async fn test_standard_route_strips_base_path_and_keeps_query() {
    let backend = start_echo_backend().await;
    let config = parse_config(&format!(
        r#"{{
            "server": {{"base_path": "/gw/"}},
            "routes": {{"api": {{"target_url": "http://{backend}/v1/"}}}}
        }}"#
    ))
    .unwrap();
    let proxy = start_proxy(config).await;

    let response = client()
        .get(proxy.url("/gw/api/items/7?b=2&a=1&a=3"))
        .send()
        .await
        .unwrap();
    let captured = echoed(response).await;

    assert_eq!(captured.request_line, "GET /v1/items/7?b=2&a=1&a=3 HTTP/1.1");
    assert_eq!(captured.header("host"), Some(backend.to_string().as_str()));
}

#[tokio::test]
async fn test_path_outside_base_path_still_routed() {
    let backend = start_echo_backend().await;
    let config = parse_config(&format!(
        r#"{{
            "server": {{"base_path": "gw"}},
            "routes": {{"api": {{"target_url": "http://{backend}"}}}}
        }}"#
    ))
    .unwrap();
    let proxy = start_proxy(config).await;

    let response = client().get(proxy.url("/api/ping")).send().await.unwrap();
    let captured = echoed(response).await;
    assert_eq!(captured.request_line, "GET /ping HTTP/1.1");
}

#[tokio::test]
async fn test_header_policy() {
    let backend = start_echo_backend().await;
    let config = parse_config(&format!(
        r#"{{
            "headers_to_drop": ["X-Secret", "x-forwarded-for"],
            "routes": {{
                "keep": {{
                    "target_url": "http://{backend}",
                    "custom_headers": {{"User-Agent": "proxy-ua", "X-Api-Key": "k1"}}
                }},
                "force": {{
                    "target_url": "http://{backend}",
                    "force_header_overwrite": true,
                    "custom_headers": {{"User-Agent": "proxy-ua", "X-Secret": "from-config"}}
                }}
            }}
        }}"#
    ))
    .unwrap();
    let proxy = start_proxy(config).await;

    let response = client()
        .get(proxy.url("/keep/"))
        .header("User-Agent", "client-ua")
        .header("X-Secret", "leak")
        .header("X-Forwarded-For", "10.0.0.1")
        .header("X-Custom", "yes")
        .send()
        .await
        .unwrap();
    let captured = echoed(response).await;
    assert_eq!(captured.header("user-agent"), Some("client-ua"));
    assert_eq!(captured.header("x-api-key"), Some("k1"));
    assert_eq!(captured.header("x-custom"), Some("yes"));
    assert_eq!(captured.header("x-secret"), None);
    assert_eq!(captured.header("x-forwarded-for"), None);
    assert!(captured.header("x-request-id").is_some());

    let response = client()
        .get(proxy.url("/force/"))
        .header("User-Agent", "client-ua")
        .header("X-Secret", "leak")
        .send()
        .await
        .unwrap();
    let captured = echoed(response).await;
    assert_eq!(captured.header("user-agent"), Some("proxy-ua"));
    // Dropped from the client, re-added from the route config.
    assert_eq!(captured.header("x-secret"), Some("from-config"));
}

#[tokio::test]
async fn test_universal_route() {
    let backend = start_echo_backend().await;
    let config = parse_config(r#"{"routes": {"any": {"universal_proxy": true}}}"#).unwrap();
    let proxy = start_proxy(config).await;

    let response = client()
        .get(proxy.url(&format!("/any/http://{backend}/path/x?q=1&q=2")))
        .send()
        .await
        .unwrap();
    let captured = echoed(response).await;
    assert_eq!(captured.request_line, "GET /path/x?q=1&q=2 HTTP/1.1");

    let response = client()
        .get(proxy.url("/any/ftp://example.com/file"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Invalid target URL"));
}

#[tokio::test]
async fn test_error_statuses() {
    let closed = closed_addr().await;
    let config = parse_config(&format!(
        r#"{{
            "server": {{"base_path": "/gw"}},
            "routes": {{
                "down": {{"target_url": "http://{closed}"}},
                "off": {{"target_url": "http://{closed}", "enabled": false}},
                "empty": {{}}
            }}
        }}"#
    ))
    .unwrap();
    let proxy = start_proxy(config).await;
    let client = client();

    let cases = [
        ("/gw", 400),
        ("/gw/", 400),
        ("/gw/missing/x", 404),
        ("/gw/off/x", 404),
        ("/gw/empty/x", 500),
        ("/gw/down/x", 502),
    ];
    for (path, expected) in cases {
        let response = client.get(proxy.url(path)).send().await.unwrap();
        assert_eq!(response.status(), expected, "{}", path);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].is_string(), "{}", path);
    }
}

#[tokio::test]
async fn test_upstream_timeout_is_bad_gateway() {
    let silent = start_silent_backend().await;
    let config = parse_config(&format!(
        r#"{{
            "server": {{"upstream_timeout_secs": 1}},
            "routes": {{"slow": {{"target_url": "http://{silent}"}}}}
        }}"#
    ))
    .unwrap();
    let proxy = start_proxy(config).await;

    let response = client().get(proxy.url("/slow/x")).send().await.unwrap();
    assert_eq!(response.status(), 502);
}

#[tokio::test]
async fn test_slow_streamed_body_outlives_upstream_timeout() {
    // Each gap is under the timeout; the whole body takes more than twice it.
    let backend = start_trickle_backend(6, Duration::from_millis(400)).await;
    let config = parse_config(&format!(
        r#"{{
            "server": {{"upstream_timeout_secs": 1}},
            "routes": {{"events": {{"target_url": "http://{backend}"}}}}
        }}"#
    ))
    .unwrap();
    let proxy = start_proxy(config).await;

    let response = client().get(proxy.url("/events/stream")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    for i in 0..6 {
        assert!(body.contains(&format!("data: {}\n\n", i)), "{}", body);
    }
}

#[tokio::test]
async fn test_client_accept_encoding_not_forwarded() {
    let backend = start_echo_backend().await;
    let config = parse_config(&format!(
        r#"{{"routes": {{"svc": {{"target_url": "http://{backend}"}}}}}}"#
    ))
    .unwrap();
    let proxy = start_proxy(config).await;

    let response = client()
        .get(proxy.url("/svc/x"))
        .header("Accept-Encoding", "gzip, deflate, br, zstd")
        .send()
        .await
        .unwrap();
    assert!(response.headers().get("content-encoding").is_none());
    let captured = echoed(response).await;

    // The upstream only hears the encodings the proxy decodes itself.
    let advertised = captured.header("accept-encoding").unwrap_or_default();
    assert!(advertised.contains("gzip"), "{}", advertised);
    assert!(!advertised.contains("zstd"), "{}", advertised);
}

#[tokio::test]
async fn test_route_proxy_used_over_global_proxy() {
    let route_proxy = start_echo_backend().await;
    let unused = closed_addr().await;
    let config = parse_config(&format!(
        r#"{{
            "global_proxy": "http://{unused}",
            "routes": {{
                "via": {{"target_url": "http://backend.test/v1", "proxy": "http://{route_proxy}"}}
            }}
        }}"#
    ))
    .unwrap();
    let proxy = start_proxy(config).await;

    let response = client().get(proxy.url("/via/a?x=1")).send().await.unwrap();
    let captured = echoed(response).await;
    // Absolute-form request line: the request went to the proxy.
    assert_eq!(captured.request_line, "GET http://backend.test/v1/a?x=1 HTTP/1.1");
    assert_eq!(captured.header("host"), Some("backend.test"));
}

#[tokio::test]
async fn test_global_proxy_inherited() {
    let global_proxy = start_echo_backend().await;
    let config = parse_config(&format!(
        r#"{{
            "global_proxy": "http://{global_proxy}",
            "routes": {{"svc": {{"target_url": "http://backend.test/v1"}}}}
        }}"#
    ))
    .unwrap();
    let proxy = start_proxy(config).await;

    let response = client().get(proxy.url("/svc/a")).send().await.unwrap();
    let captured = echoed(response).await;
    assert_eq!(captured.request_line, "GET http://backend.test/v1/a HTTP/1.1");
}

#[tokio::test]
async fn test_empty_route_proxy_connects_directly() {
    let global_proxy = start_echo_backend().await;
    let backend = start_echo_backend().await;
    let config = parse_config(&format!(
        r#"{{
            "global_proxy": "http://{global_proxy}",
            "routes": {{"svc": {{"target_url": "http://{backend}/v1", "proxy": ""}}}}
        }}"#
    ))
    .unwrap();
    let proxy = start_proxy(config).await;

    let response = client().get(proxy.url("/svc/a")).send().await.unwrap();
    let captured = echoed(response).await;
    // Origin-form request line: the backend was reached without the proxy.
    assert_eq!(captured.request_line, "GET /v1/a HTTP/1.1");
    assert_eq!(captured.header("host"), Some(backend.to_string().as_str()));
}

#[tokio::test]
async fn test_response_status_and_headers_relayed() {
    let backend = start_fixed_backend(
        "201 Created",
        "X-Upstream: yes\r\nContent-Encoding: identity\r\nSet-Cookie: a=1\r\nSet-Cookie: b=2\r\n",
        "hello",
    )
    .await;
    let config = parse_config(&format!(
        r#"{{"routes": {{"svc": {{"target_url": "http://{backend}"}}}}}}"#
    ))
    .unwrap();
    let proxy = start_proxy(config).await;

    let response = client().post(proxy.url("/svc/things")).send().await.unwrap();
    assert_eq!(response.status(), 201);
    assert_eq!(response.headers().get("x-upstream").unwrap(), "yes");
    assert!(response.headers().get("content-encoding").is_none());
    assert_eq!(response.headers().get_all("set-cookie").iter().count(), 2);
    assert!(response.headers().get("x-request-id").is_some());
    assert_eq!(response.text().await.unwrap(), "hello");
}

#[tokio::test]
async fn test_redirects_are_not_followed() {
    let backend = start_fixed_backend("302 Found", "Location: /elsewhere\r\n", "").await;
    let config = parse_config(&format!(
        r#"{{"routes": {{"svc": {{"target_url": "http://{backend}"}}}}}}"#
    ))
    .unwrap();
    let proxy = start_proxy(config).await;

    let response = client().get(proxy.url("/svc/old")).send().await.unwrap();
    assert_eq!(response.status(), 302);
    assert_eq!(response.headers().get("location").unwrap(), "/elsewhere");
}

#[tokio::test]
async fn test_request_body_and_method_forwarded() {
    let backend = start_echo_backend().await;
    let config = parse_config(&format!(
        r#"{{"routes": {{"svc": {{"target_url": "http://{backend}/base"}}}}}}"#
    ))
    .unwrap();
    let proxy = start_proxy(config).await;

    for method in [reqwest::Method::POST, reqwest::Method::PUT, reqwest::Method::PATCH] {
        let response = client()
            .request(method.clone(), proxy.url("/svc/items"))
            .header("Content-Type", "application/json")
            .body(r#"{"name":"widget"}"#)
            .send()
            .await
            .unwrap();
        let captured = echoed(response).await;
        assert_eq!(captured.request_line, format!("{} /base/items HTTP/1.1", method));
        assert_eq!(captured.body, r#"{"name":"widget"}"#);
        assert_eq!(captured.header("content-type"), Some("application/json"));
        assert_eq!(captured.header("content-length"), Some("17"));
    }
}

#[tokio::test]
async fn test_root_info() {
    let config = parse_config(
        r#"{"server": {"base_path": "/gw"}, "routes": {"b": {}, "a": {}, "c": {"enabled": false}}}"#,
    )
    .unwrap();
    let proxy = start_proxy(config).await;

    let response = client().get(proxy.url("/")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["base_path"], "/gw");
    assert_eq!(body["routes"], serde_json::json!(["a", "b"]));
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_hot_reload_swaps_routes() {
    let old_backend = start_echo_backend().await;
    let new_backend = start_echo_backend().await;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        format!(r#"{{"routes": {{"svc": {{"target_url": "http://{old_backend}/old"}}}}}}"#),
    )
    .unwrap();

    let source = FileSource::new(&path);
    let (config, marker) = load_from_source(&source).unwrap();
    let store = ConfigStore::new(config);
    let proxy = start_proxy_with_store(store.clone()).await;
    let mut reloader = ConfigReloader::new(source, store, Duration::from_secs(1), marker);

    let response = client().get(proxy.url("/svc/x")).send().await.unwrap();
    assert_eq!(echoed(response).await.request_line, "GET /old/x HTTP/1.1");

    // A malformed write keeps the running configuration.
    fs::write(&path, r#"{"routes": {"#).unwrap();
    bump_mtime(&path, 10);
    assert_eq!(reloader.check(), ReloadOutcome::Failed);
    let response = client().get(proxy.url("/svc/x")).send().await.unwrap();
    assert_eq!(echoed(response).await.request_line, "GET /old/x HTTP/1.1");

    fs::write(
        &path,
        format!(r#"{{"routes": {{"svc": {{"target_url": "http://{new_backend}/new"}}}}}}"#),
    )
    .unwrap();
    bump_mtime(&path, 20);
    assert_eq!(reloader.check(), ReloadOutcome::Reloaded);

    let response = client().get(proxy.url("/svc/x")).send().await.unwrap();
    assert_eq!(echoed(response).await.request_line, "GET /new/x HTTP/1.1");
}

/// Move the file's mtime forward so coarse filesystem timestamps still
/// register as a change.
fn bump_mtime(path: &std::path::Path, secs: u64) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(secs))
        .unwrap();
}
