#![cfg(feature = "adapters")]

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appgraph::adapters::{HttpSchemaClientConfig, HttpSchemaClientFactory};
use appgraph::test_utils::fixtures::{ProcessorHarness, API_KEY};
use appgraph::test_utils::FakeSchemaClient;
use appgraph::{AppId, GraphEvent, GraphProcessor, GraphStatus, Multiplicity, WorkItemProcessor};

fn page(page_number: u32, total_pages: u32, items: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "pageNumber": page_number,
        "totalPages": total_pages,
        "items": items,
    }))
}

async fn mount_apps(server: &MockServer, page_number: u32, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/Apps"))
        .and(query_param("PageNumber", page_number.to_string()))
        .and(header("x-apikey", API_KEY))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_fields(server: &MockServer, app_id: i64, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/Fields/appId/{}", app_id)))
        .and(query_param("PageNumber", "1"))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn processor_against(server: &MockServer) -> (ProcessorHarness, GraphProcessor) {
    let harness = ProcessorHarness::new(FakeSchemaClient::new()).await;
    let factory = HttpSchemaClientFactory::new(HttpSchemaClientConfig {
        base_url: server.uri(),
        ..HttpSchemaClientConfig::default()
    })
    .unwrap();

    let mut collaborators = harness.collaborators();
    collaborators.clients = Arc::new(factory);
    (harness, GraphProcessor::new(collaborators, None))
}

#[test_log::test(tokio::test)]
async fn test_graph_built_from_remote_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Ping"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    mount_apps(&server, 1, page(1, 3, json!([{"id": 1, "name": "Accounts"}]))).await;
    mount_apps(&server, 2, ResponseTemplate::new(503)).await;
    mount_apps(&server, 3, page(3, 3, json!([{"id": 3, "name": "Invoices"}]))).await;
    mount_fields(
        &server,
        1,
        page(1, 1, json!([
            {"id": 100, "appId": 1, "name": "Name", "type": "Text"},
            {"id": 101, "appId": 1, "name": "Invoices", "type": "Reference",
             "referencedAppId": 3, "multiplicity": "MultiSelect"}
        ])),
    )
    .await;
    mount_fields(&server, 3, ResponseTemplate::new(500)).await;

    let (harness, processor) = processor_against(&server).await;
    processor.process(&harness.work_item()).await.unwrap();

    let graph = harness.stored_graph().await;
    assert_eq!(graph.status, GraphStatus::Built);
    let ids: Vec<AppId> = graph.nodes.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![AppId(1), AppId(3)]);

    let edges = &graph.edges_map[&AppId(1)];
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].referenced_app_id, AppId(3));
    assert_eq!(edges[0].multiplicity, Multiplicity::MultiSelect);
    assert_eq!(harness.events().last(), Some(&GraphEvent::GraphBuilt));
}

#[test_log::test(tokio::test)]
async fn test_rejected_credential_fails_build() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Ping"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let (harness, processor) = processor_against(&server).await;
    processor.process(&harness.work_item()).await.unwrap();

    assert_eq!(harness.stored_graph().await.status, GraphStatus::NotBuilt);
    assert_eq!(harness.events().last(), Some(&GraphEvent::GraphError));
}
