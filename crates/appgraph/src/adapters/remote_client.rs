use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::data::{
    App, AppId, CoreError, Field, FieldId, FieldKind, Multiplicity, Page, PagingRequest, RemoteError,
};
use crate::traits::{RemoteClientFactory, RemoteSchemaClient};

/// Header carrying the account credential on every request.
pub const API_KEY_HEADER: &str = "x-apikey";

/// Configuration for the remote schema HTTP client
#[derive(Debug, Clone)]
pub struct HttpSchemaClientConfig {
    /// Base URL of the remote schema service
    pub base_url: String,
    /// Items requested per page
    pub page_size: u32,
    /// Per-request timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl Default for HttpSchemaClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8090".to_string(),
            page_size: 50,
            timeout: None,
        }
    }
}

/// Remote schema client over HTTP, bound to one API key
#[derive(Debug, Clone)]
pub struct HttpSchemaClient {
    http: Client,
    base_url: String,
    page_size: u32,
    api_key: String,
}

/// Field definition as the remote service sends it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawField {
    id: FieldId,
    app_id: AppId,
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    #[serde(default)]
    is_required: bool,
    #[serde(default)]
    is_unique: bool,
    #[serde(default)]
    referenced_app_id: Option<AppId>,
    #[serde(default)]
    multiplicity: Option<Multiplicity>,
}

impl From<RawField> for Field {
    fn from(raw: RawField) -> Self {
        let kind = match (raw.field_type.as_str(), raw.referenced_app_id) {
            (Field::REFERENCE_TYPE, Some(referenced_app_id)) => FieldKind::Reference {
                referenced_app_id,
                multiplicity: raw.multiplicity.unwrap_or(Multiplicity::SingleSelect),
            },
            _ => FieldKind::Other {
                field_type: raw.field_type,
            },
        };
        Field {
            id: raw.id,
            app_id: raw.app_id,
            name: raw.name,
            is_required: raw.is_required,
            is_unique: raw.is_unique,
            kind,
        }
    }
}

impl HttpSchemaClient {
    pub fn new(http: Client, base_url: impl Into<String>, page_size: u32, api_key: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            page_size,
            api_key: api_key.into(),
        }
    }

    async fn get_page<T: DeserializeOwned>(&self, url: &str, page: PagingRequest) -> Result<Page<T>, RemoteError> {
        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("PageNumber", page.page_number), ("PageSize", self.page_size)])
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(map_http_error)?;
        serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

fn map_http_error(error: reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Transport(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        RemoteError::Transport(format!("Connection error: {}", error))
    } else {
        RemoteError::Transport(format!("HTTP error: {}", error))
    }
}

#[async_trait]
impl RemoteSchemaClient for HttpSchemaClient {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn can_connect(&self) -> bool {
        let url = format!("{}/Ping", self.base_url);
        match self.http.get(&url).header(API_KEY_HEADER, &self.api_key).send().await {
            Ok(response) => {
                debug!(status = %response.status(), "Ping answered");
                response.status().is_success()
            }
            Err(e) => {
                debug!(error = %e, "Ping failed");
                false
            }
        }
    }

    async fn get_applications(&self, page: PagingRequest) -> Result<Page<App>, RemoteError> {
        debug!(page = page.page_number, "Fetching applications page");
        let url = format!("{}/Apps", self.base_url);
        self.get_page(&url, page).await
    }

    async fn get_fields(&self, app_id: AppId, page: PagingRequest) -> Result<Page<Field>, RemoteError> {
        debug!(app_id = %app_id, page = page.page_number, "Fetching fields page");
        let url = format!("{}/Fields/appId/{}", self.base_url, app_id);
        let raw: Page<RawField> = self.get_page(&url, page).await?;
        Ok(Page {
            page_number: raw.page_number,
            total_pages: raw.total_pages,
            items: raw.items.into_iter().map(Field::from).collect(),
        })
    }
}

/// Creates [`HttpSchemaClient`]s that share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpSchemaClientFactory {
    config: HttpSchemaClientConfig,
    http: Client,
}

impl HttpSchemaClientFactory {
    pub fn new(config: HttpSchemaClientConfig) -> Result<Self, CoreError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| CoreError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, http })
    }
}

impl RemoteClientFactory for HttpSchemaClientFactory {
    fn create(&self, api_key: &str) -> Result<Arc<dyn RemoteSchemaClient>, CoreError> {
        Ok(Arc::new(HttpSchemaClient::new(
            self.http.clone(),
            self.config.base_url.clone(),
            self.config.page_size,
            api_key,
        )))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn setup_test_client() -> (MockServer, Arc<dyn RemoteSchemaClient>) {
        let mock_server = MockServer::start().await;
        let factory = HttpSchemaClientFactory::new(HttpSchemaClientConfig {
            base_url: mock_server.uri(),
            page_size: 25,
            timeout: Some(Duration::from_secs(5)),
        })
        .unwrap();
        let client = factory.create("secret-key").unwrap();
        (mock_server, client)
    }

    #[tokio::test]
    async fn test_can_connect_sends_api_key() {
        let (mock_server, client) = setup_test_client().await;
        Mock::given(method("GET"))
            .and(path("/Ping"))
            .and(header(API_KEY_HEADER, "secret-key"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        assert!(client.can_connect().await);
    }

    #[tokio::test]
    async fn test_can_connect_false_on_rejection() {
        let (mock_server, client) = setup_test_client().await;
        Mock::given(method("GET"))
            .and(path("/Ping"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        assert!(!client.can_connect().await);
    }

    #[tokio::test]
    async fn test_can_connect_false_when_unreachable() {
        let factory = HttpSchemaClientFactory::new(HttpSchemaClientConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            ..HttpSchemaClientConfig::default()
        })
        .unwrap();
        let client = factory.create("secret-key").unwrap();

        assert!(!client.can_connect().await);
        let result = client.get_applications(PagingRequest::first()).await;
        assert!(matches!(result, Err(RemoteError::Transport(_))));
    }

    #[tokio::test]
    async fn test_get_applications_pages_with_query() {
        let (mock_server, client) = setup_test_client().await;
        Mock::given(method("GET"))
            .and(path("/Apps"))
            .and(query_param("PageNumber", "2"))
            .and(query_param("PageSize", "25"))
            .and(header(API_KEY_HEADER, "secret-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "pageNumber": 2,
                "totalPages": 3,
                "items": [{"id": 7, "name": "Accounts"}, {"id": 8, "name": "Contacts"}]
            })))
            .mount(&mock_server)
            .await;

        let page = client.get_applications(PagingRequest::page(2)).await.unwrap();

        assert_eq!(page.page_number, 2);
        assert_eq!(page.total_pages, 3);
        assert_eq!(
            page.items,
            vec![
                App { id: AppId(7), name: "Accounts".into() },
                App { id: AppId(8), name: "Contacts".into() },
            ]
        );
    }

    #[tokio::test]
    async fn test_get_fields_maps_field_kinds() {
        let (mock_server, client) = setup_test_client().await;
        Mock::given(method("GET"))
            .and(path("/Fields/appId/7"))
            .and(query_param("PageNumber", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "pageNumber": 1,
                "totalPages": 1,
                "items": [
                    {
                        "id": 70, "appId": 7, "name": "Company", "type": "Reference",
                        "isRequired": true, "isUnique": false,
                        "referencedAppId": 8, "multiplicity": "MultiSelect"
                    },
                    {"id": 71, "appId": 7, "name": "Notes", "type": "Text"}
                ]
            })))
            .mount(&mock_server)
            .await;

        let page = client.get_fields(AppId(7), PagingRequest::first()).await.unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(
            page.items[0].kind,
            FieldKind::Reference {
                referenced_app_id: AppId(8),
                multiplicity: Multiplicity::MultiSelect,
            }
        );
        assert!(page.items[0].is_required);
        assert_eq!(page.items[1].kind, FieldKind::Other { field_type: "Text".into() });
    }

    #[test]
    fn test_reference_without_target_is_not_an_edge() {
        let raw = RawField {
            id: FieldId(1),
            app_id: AppId(1),
            name: "Broken".into(),
            field_type: "Reference".into(),
            is_required: false,
            is_unique: false,
            referenced_app_id: None,
            multiplicity: None,
        };
        assert!(Field::from(raw).into_edge().is_none());
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let (mock_server, client) = setup_test_client().await;
        Mock::given(method("GET"))
            .and(path("/Apps"))
            .respond_with(ResponseTemplate::new(500).set_body_string("exploded"))
            .mount(&mock_server)
            .await;

        let result = client.get_applications(PagingRequest::first()).await;

        assert_eq!(
            result.unwrap_err(),
            RemoteError::Status { status: 500, body: "exploded".into() }
        );
    }

    #[tokio::test]
    async fn test_undecodable_body_is_reported() {
        let (mock_server, client) = setup_test_client().await;
        Mock::given(method("GET"))
            .and(path("/Apps"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&mock_server)
            .await;

        let result = client.get_applications(PagingRequest::first()).await;

        assert!(matches!(result, Err(RemoteError::Decode(_))));
    }
}
