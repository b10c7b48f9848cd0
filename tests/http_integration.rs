//! Integration tests for the gateway client using wiremock
//!
//! These tests drive the full report against mocked endpoints, checking the
//! batches sent to the server, session handling and error surfacing.

use serde_json::{json, Value};
use std::time::Duration;
use url::Url;
use vminfo::info::{self, InfoRequest};
use vminfo::inventory::{Category, ObjectReference, ReportOptions};
use vminfo::vsphere::auth::SessionCredentials;
use vminfo::vsphere::client::{ConnectionSettings, VsphereClient};
use vminfo::vsphere::collector::PropertyCollector;
use wiremock::matchers::{basic_auth, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const SESSION: &str = "session-1";

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/session"))
        .and(basic_auth("admin", "secret"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!(SESSION)))
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> VsphereClient {
    let settings = ConnectionSettings {
        url: Url::parse(&server.uri()).unwrap(),
        insecure: false,
        poll_interval: Duration::from_millis(10),
        wait_timeout: Some(Duration::from_secs(5)),
    };
    VsphereClient::new(&settings, SessionCredentials::new("admin", "secret")).unwrap()
}

fn vm_ref(id: &str) -> Value {
    json!({"type": "VirtualMachine", "value": id})
}

fn vm_content(id: &str, host: &str, ip: &str) -> Value {
    json!({
        "obj": vm_ref(id),
        "properties": {
            "summary": {
                "config": {"name": id, "numCpu": 2, "memorySizeMB": 4096},
                "runtime": {"host": {"type": "HostSystem", "value": host}, "powerState": "poweredOn"}
            },
            "guest.ipAddress": ip
        }
    })
}

fn host_content(id: &str, name: &str) -> Value {
    json!({"obj": {"type": "HostSystem", "value": id}, "properties": {"name": name}})
}

async fn mount_find(server: &MockServer, ids: &[&str]) {
    let objects: Vec<Value> = ids
        .iter()
        .map(|id| json!({"obj": vm_ref(id), "path": format!("/dc1/vm/{}", id)}))
        .collect();

    Mock::given(method("POST"))
        .and(path("/api/inventory/find"))
        .and(header("vmware-api-session-id", SESSION))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"objects": objects})))
        .mount(server)
        .await;
}

/// Matches retrievals asking for exactly `properties`
fn requesting(properties: Value) -> impl Fn(&Request) -> bool + Send + Sync {
    move |req: &Request| {
        serde_json::from_slice::<Value>(&req.body)
            .map(|body| body["properties"] == properties)
            .unwrap_or(false)
    }
}

/// Matches name retrievals whose batch holds objects of `kind`
fn names_of(kind: &'static str) -> impl Fn(&Request) -> bool + Send + Sync {
    move |req: &Request| {
        serde_json::from_slice::<Value>(&req.body)
            .map(|body| body["properties"] == json!(["name"]) && body["objects"][0]["type"] == kind)
            .unwrap_or(false)
    }
}

fn name_batches(requests: &[Request]) -> Vec<Value> {
    requests
        .iter()
        .filter(|r| r.url.path() == "/api/properties/retrieve")
        .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
        .filter(|body| body["properties"] == json!(["name"]))
        .collect()
}

/// Test module for the end-to-end report
mod report_tests {
    use super::*;

    /// Shared host is fetched once and rows keep the lookup order
    #[tokio::test]
    async fn test_shared_host_batched_once_and_order_kept() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        mount_find(&server, &["vm-a", "vm-b", "vm-c"]).await;

        // Server answers in a different order than requested
        Mock::given(method("POST"))
            .and(path("/api/properties/retrieve"))
            .and(requesting(json!(["summary", "guest.ipAddress"])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"objects": [
                vm_content("vm-c", "host-1", "10.0.0.3"),
                vm_content("vm-a", "host-1", "10.0.0.1"),
                vm_content("vm-b", "host-2", "10.0.0.2"),
            ]})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/properties/retrieve"))
            .and(requesting(json!(["name"])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"objects": [
                host_content("host-2", "esx-02.lab"),
                host_content("host-1", "esx-01.lab"),
            ]})))
            .expect(1)
            .mount(&server)
            .await;

        let mut out = Vec::new();
        let count = info::run(&client(&server), &InfoRequest::default(), &mut out)
            .await
            .expect("report should succeed");
        assert_eq!(count, 3);

        let text = String::from_utf8(out).unwrap();
        let names: Vec<_> = text.lines().filter(|l| l.starts_with("Name:")).collect();
        assert!(names[0].ends_with("vm-a"));
        assert!(names[1].ends_with("vm-b"));
        assert!(names[2].ends_with("vm-c"));

        let hosts: Vec<_> = text
            .lines()
            .filter(|l| l.trim_start().starts_with("Host:"))
            .map(|l| l.split_whitespace().last().unwrap())
            .collect();
        assert_eq!(hosts, vec!["esx-01.lab", "esx-02.lab", "esx-01.lab"]);

        let requests = server.received_requests().await.unwrap();
        let batches = name_batches(&requests);
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0]["objects"],
            json!([
                {"type": "HostSystem", "value": "host-1"},
                {"type": "HostSystem", "value": "host-2"}
            ])
        );
    }

    /// Host name retrieval failure aborts the run and writes nothing
    #[tokio::test]
    async fn test_host_failure_surfaces_category() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        mount_find(&server, &["vm-a"]).await;

        Mock::given(method("POST"))
            .and(path("/api/properties/retrieve"))
            .and(requesting(json!(["summary", "guest.ipAddress"])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"objects": [
                vm_content("vm-a", "host-1", "10.0.0.1"),
            ]})))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/properties/retrieve"))
            .and(requesting(json!(["name"])))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let mut out = Vec::new();
        let err = info::run(&client(&server), &InfoRequest::default(), &mut out)
            .await
            .unwrap_err();

        assert!(out.is_empty());
        let err = err.downcast_ref::<vminfo::Error>().expect("typed error");
        assert_eq!(err.category(), Some(Category::Host));
        assert!(err.to_string().contains("host names for 1 reference(s)"));
    }

    /// A VM matched by two paths is retrieved once and reported per match
    #[tokio::test]
    async fn test_duplicate_lookup_match_reported_twice() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        mount_find(&server, &["vm-a", "vm-a"]).await;

        Mock::given(method("POST"))
            .and(path("/api/properties/retrieve"))
            .and(requesting(json!(["summary", "guest.ipAddress"])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"objects": [
                vm_content("vm-a", "host-1", "10.0.0.1"),
            ]})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/properties/retrieve"))
            .and(requesting(json!(["name"])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"objects": [
                host_content("host-1", "esx-01.lab"),
            ]})))
            .expect(1)
            .mount(&server)
            .await;

        let request = InfoRequest {
            paths: vec!["/dc1/vm/vm-a".to_string(), "/dc1/vm/*".to_string()],
            ..Default::default()
        };
        let mut out = Vec::new();
        let count = info::run(&client(&server), &request, &mut out)
            .await
            .expect("duplicate matches should not abort the report");
        assert_eq!(count, 2);

        let requests = server.received_requests().await.unwrap();
        let primary = requests
            .iter()
            .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
            .find(|body| body["properties"] == json!(["summary", "guest.ipAddress"]))
            .expect("primary retrieval sent");
        assert_eq!(primary["objects"], json!([vm_ref("vm-a")]));
    }

    /// No matching VMs is an empty report, not an error
    #[tokio::test]
    async fn test_not_found_lookup_is_empty_report() {
        let server = MockServer::start().await;
        mount_login(&server).await;

        Mock::given(method("POST"))
            .and(path("/api/inventory/find"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let request = InfoRequest {
            paths: vec!["/dc1/vm/missing".to_string()],
            ..Default::default()
        };
        let mut out = Vec::new();
        let count = info::run(&client(&server), &request, &mut out)
            .await
            .expect("empty inventory is not an error");

        assert_eq!(count, 0);
        assert!(out.is_empty());
    }

    /// Resource names are fetched per category and joined in declared order
    #[tokio::test]
    async fn test_resources_json_report() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        mount_find(&server, &["vm-a"]).await;

        Mock::given(method("POST"))
            .and(path("/api/properties/retrieve"))
            .and(requesting(json!(null)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"objects": [{
                "obj": vm_ref("vm-a"),
                "properties": {
                    "summary": {"config": {"name": "vm-a"}},
                    "datastore": [
                        {"type": "Datastore", "value": "ds-2"},
                        {"type": "Datastore", "value": "ds-1"}
                    ],
                    "network": [{"type": "Network", "value": "network-7"}]
                }
            }]})))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/properties/retrieve"))
            .and(names_of("Datastore"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"objects": [
                {"obj": {"type": "Datastore", "value": "ds-1"}, "properties": {"name": "gold"}},
                {"obj": {"type": "Datastore", "value": "ds-2"}, "properties": {"name": "silver"}}
            ]})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/properties/retrieve"))
            .and(names_of("Network"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"objects": [
                {"obj": {"type": "Network", "value": "network-7"}, "properties": {"name": "VM Network"}}
            ]})))
            .expect(1)
            .mount(&server)
            .await;

        let request = InfoRequest {
            options: ReportOptions {
                general: false,
                resources: true,
                json: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut out = Vec::new();
        info::run(&client(&server), &request, &mut out)
            .await
            .expect("report should succeed");

        let doc: Value = serde_json::from_slice(&out).unwrap();
        let row = &doc["virtualMachines"][0];
        assert_eq!(row["fields"]["Storage"], "silver, gold");
        assert_eq!(row["fields"]["Network"], "VM Network");
        assert!(row["properties"]["datastore"].is_array());
    }
}

/// Test module for session and polling behaviour
mod collector_tests {
    use super::*;

    /// Expired session triggers exactly one new login
    #[tokio::test]
    async fn test_relogin_after_401() {
        let server = MockServer::start().await;
        mount_login(&server).await;

        Mock::given(method("POST"))
            .and(path("/api/properties/retrieve"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/properties/retrieve"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"objects": [
                host_content("host-1", "esx-01.lab")
            ]})))
            .mount(&server)
            .await;

        let host = ObjectReference::new("HostSystem", "host-1");
        let bags = client(&server)
            .retrieve(std::slice::from_ref(&host), Some(&["name".to_string()]))
            .await
            .expect("retrieve should succeed after re-login");

        assert_eq!(bags[&host]["name"], "esx-01.lab");

        let requests = server.received_requests().await.unwrap();
        let logins = requests
            .iter()
            .filter(|r| r.url.path() == "/api/session")
            .count();
        assert_eq!(logins, 2);
    }

    /// Waiting for an address refreshes the VM once before names are resolved
    #[tokio::test]
    async fn test_wait_for_ip_refreshes_vm() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        mount_find(&server, &["vm-a"]).await;

        // Initial load: no address yet
        Mock::given(method("POST"))
            .and(path("/api/properties/retrieve"))
            .and(requesting(json!(["summary", "guest.ipAddress"])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"objects": [
                vm_content("vm-a", "host-1", ""),
            ]})))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        // Refresh after the wait
        Mock::given(method("POST"))
            .and(path("/api/properties/retrieve"))
            .and(requesting(json!(["summary", "guest.ipAddress"])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"objects": [
                vm_content("vm-a", "host-1", "10.20.30.40"),
            ]})))
            .expect(1)
            .mount(&server)
            .await;

        // First poll still empty, second reports the address
        Mock::given(method("POST"))
            .and(path("/api/properties/retrieve"))
            .and(requesting(json!(["guest.ipAddress"])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"objects": [
                {"obj": vm_ref("vm-a"), "properties": {"guest.ipAddress": ""}}
            ]})))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/properties/retrieve"))
            .and(requesting(json!(["guest.ipAddress"])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"objects": [
                {"obj": vm_ref("vm-a"), "properties": {"guest.ipAddress": "10.20.30.40"}}
            ]})))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/properties/retrieve"))
            .and(requesting(json!(["name"])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"objects": [
                host_content("host-1", "esx-01.lab")
            ]})))
            .mount(&server)
            .await;

        let request = InfoRequest {
            options: ReportOptions {
                wait_for_ip: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut out = Vec::new();
        info::run(&client(&server), &request, &mut out)
            .await
            .expect("report should succeed");

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("10.20.30.40"));
        assert!(text.contains("esx-01.lab"));
    }
}
