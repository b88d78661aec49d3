// SPDX-License-Identifier: MIT

//! Confluence document repository and the two page tools built on it

use crate::adk::error::{RagflowError, Result};
use crate::adk::tool::Tool;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::env;
use std::sync::Arc;
use url::Url;

// --- Records ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PageSummary {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Search outcome; a failed search is still a value, with `error` set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchResults {
    pub pages: Vec<PageSummary>,
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResults {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            pages: Vec::new(),
            total: 0,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PageDetails {
    pub id: String,
    pub title: String,
    pub url: String,
    /// Storage-format body; absent when the page has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Fetch outcome; on failure `page` is blank and `error` is set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PageFetch {
    pub page: PageDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageFetch {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            page: PageDetails {
                id: String::new(),
                title: String::new(),
                url: String::new(),
                content: None,
            },
            error: Some(error.into()),
        }
    }
}

// --- Repository ---

/// Search and fetch over a document store
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn search(&self, cql: &str) -> Result<SearchResults>;

    async fn get_page(&self, id: &str, expand: Option<&str>) -> Result<PageDetails>;
}

/// Confluence Cloud REST client (`{base}/wiki/rest/api`)
#[derive(Clone)]
pub struct ConfluenceClient {
    client: Client,
    base_url: String,
    email: String,
    api_token: String,
}

impl ConfluenceClient {
    /// Reads `CONFLUENCE_BASE_URL`, `CONFLUENCE_USER_EMAIL` and `CONFLUENCE_API_TOKEN`
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| {
            env::var(name).map_err(|_| RagflowError::config(format!("{} must be set", name)))
        };
        let base_url = var("CONFLUENCE_BASE_URL")?;
        let email = var("CONFLUENCE_USER_EMAIL")?;
        let api_token = var("CONFLUENCE_API_TOKEN")?;

        Url::parse(&base_url)?;
        log::info!("Confluence client: base_url={}", base_url);

        Ok(Self::new(base_url, email, api_token))
    }

    pub fn new(base_url: String, email: String, api_token: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            email,
            api_token,
        }
    }

    /// `{base}/wiki/rest/api/<segments...>`, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| RagflowError::config("CONFLUENCE_BASE_URL cannot be a base URL"))?
            .pop_if_empty()
            .extend(["wiki", "rest", "api"])
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<Value> {
        log::debug!("Confluence GET {}", url);

        let resp = self
            .client
            .get(url)
            .basic_auth(&self.email, Some(&self.api_token))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RagflowError::api("Confluence", status.as_u16().to_string()));
        }

        Ok(resp.json().await?)
    }

    /// Site-relative links in responses start with `/`; they live under `/wiki`
    fn site_link(&self, path: &str) -> String {
        format!("{}/wiki{}", self.base_url, path)
    }
}

#[async_trait]
impl DocumentRepository for ConfluenceClient {
    async fn search(&self, cql: &str) -> Result<SearchResults> {
        let mut url = self.endpoint(&["search"])?;
        url.query_pairs_mut().append_pair("cql", cql);

        let json = self.get(url).await?;
        let results = json["results"].as_array().ok_or_else(|| {
            RagflowError::api("Confluence", "Missing results in search response")
        })?;

        // Hits without content (users, spaces) are not pages
        let pages: Vec<PageSummary> = results
            .iter()
            .filter_map(|result| {
                let content = result.get("content")?;
                Some(PageSummary {
                    id: content["id"].as_str()?.to_string(),
                    title: content["title"].as_str().unwrap_or_default().to_string(),
                    url: result["url"].as_str().map(|path| self.site_link(path)),
                })
            })
            .collect();

        let total = json["totalSize"]
            .as_u64()
            .or_else(|| json["size"].as_u64())
            .unwrap_or(pages.len() as u64);

        log::info!("Confluence search returned {} of {} pages", pages.len(), total);

        Ok(SearchResults {
            pages,
            total,
            error: None,
        })
    }

    async fn get_page(&self, id: &str, expand: Option<&str>) -> Result<PageDetails> {
        let mut url = self.endpoint(&["content", id])?;
        if let Some(expand) = expand.filter(|e| !e.is_empty()) {
            url.query_pairs_mut().append_pair("expand", expand);
        }

        let json = self.get(url).await?;

        Ok(PageDetails {
            id: json["id"].as_str().unwrap_or(id).to_string(),
            title: json["title"].as_str().unwrap_or_default().to_string(),
            url: self.site_link(json["_links"]["webui"].as_str().unwrap_or_default()),
            content: json["body"]["storage"]["value"]
                .as_str()
                .filter(|body| !body.is_empty())
                .map(str::to_string),
        })
    }
}

// --- Static schemas ---

static SEARCH_PAGES_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "cql": {
                "type": "string",
                "description": "CQL (Confluence Query Language) search query"
            }
        },
        "required": ["cql"]
    })
});

static SEARCH_PAGES_OUTPUT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "pages": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "description": "Page ID" },
                        "title": { "type": "string", "description": "Page title" },
                        "url": { "type": "string", "description": "Page URL" }
                    },
                    "required": ["id", "title"]
                }
            },
            "total": { "type": "integer", "description": "Total number of search hits" },
            "error": { "type": "string", "description": "Error message" }
        },
        "required": ["pages", "total"]
    })
});

static GET_PAGE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "page_id": {
                "type": "string",
                "description": "ID of the page to fetch"
            },
            "expand": {
                "type": "string",
                "description": "Extra data to include (body.storage, version, space)"
            }
        },
        "required": ["page_id"]
    })
});

static GET_PAGE_OUTPUT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "page": {
                "type": "object",
                "properties": {
                    "id": { "type": "string", "description": "Page ID" },
                    "title": { "type": "string", "description": "Page title" },
                    "url": { "type": "string", "description": "Page URL" },
                    "content": { "type": "string", "description": "Page body (storage format HTML)" }
                },
                "required": ["id", "title", "url"]
            },
            "error": { "type": "string", "description": "Error message" }
        },
        "required": ["page"]
    })
});

// --- Search Pages Tool ---

#[derive(Debug, Deserialize)]
pub struct SearchPagesArgs {
    pub cql: String,
}

pub struct SearchPagesTool {
    repository: Arc<dyn DocumentRepository>,
}

impl SearchPagesTool {
    pub fn new(repository: Arc<dyn DocumentRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Tool for SearchPagesTool {
    fn name(&self) -> &str {
        "confluence-search-pages"
    }

    fn description(&self) -> &str {
        "Searches Confluence pages with a CQL query"
    }

    fn schema(&self) -> &Value {
        &SEARCH_PAGES_SCHEMA
    }

    fn output_schema(&self) -> Option<&Value> {
        Some(&SEARCH_PAGES_OUTPUT_SCHEMA)
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: SearchPagesArgs = serde_json::from_value(input)?;

        let results = match self.repository.search(&args.cql).await {
            Ok(results) => results,
            Err(e) => {
                log::warn!("Confluence search failed for '{}': {}", args.cql, e);
                SearchResults::failed(e.to_string())
            }
        };

        Ok(serde_json::to_value(results)?)
    }
}

// --- Get Page Tool ---

#[derive(Debug, Deserialize)]
pub struct GetPageArgs {
    pub page_id: String,
    #[serde(default)]
    pub expand: Option<String>,
}

pub struct GetPageTool {
    repository: Arc<dyn DocumentRepository>,
}

impl GetPageTool {
    pub fn new(repository: Arc<dyn DocumentRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Tool for GetPageTool {
    fn name(&self) -> &str {
        "confluence-get-page"
    }

    fn description(&self) -> &str {
        "Fetches the details of the Confluence page with the given ID"
    }

    fn schema(&self) -> &Value {
        &GET_PAGE_SCHEMA
    }

    fn output_schema(&self) -> Option<&Value> {
        Some(&GET_PAGE_OUTPUT_SCHEMA)
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: GetPageArgs = serde_json::from_value(input)?;

        let fetch = match self
            .repository
            .get_page(&args.page_id, args.expand.as_deref())
            .await
        {
            Ok(page) => PageFetch { page, error: None },
            Err(e) => {
                log::warn!("Confluence page {} could not be fetched: {}", args.page_id, e);
                PageFetch::failed(e.to_string())
            }
        };

        Ok(serde_json::to_value(fetch)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ragflow::workflow::SchemaContract;
    use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const AUTH: &str = "Basic ZGV2QGV4YW1wbGUuY29tOnNlY3JldC10b2tlbg==";

    fn client(server: &MockServer) -> ConfluenceClient {
        ConfluenceClient::new(
            server.uri(),
            "dev@example.com".to_string(),
            "secret-token".to_string(),
        )
    }

    #[tokio::test]
    async fn test_search_maps_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/rest/api/search"))
            .and(query_param("cql", "text ~ \"AI\""))
            .and(header("authorization", AUTH))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {
                        "content": { "id": "123", "title": "AI Guide" },
                        "url": "/spaces/DOC/pages/123/AI+Guide"
                    },
                    { "user": { "displayName": "someone" }, "url": "/people/1" }
                ],
                "totalSize": 1
            })))
            .mount(&server)
            .await;

        let results = client(&server).search("text ~ \"AI\"").await.unwrap();
        assert_eq!(results.total, 1);
        assert_eq!(
            results.pages,
            vec![PageSummary {
                id: "123".to_string(),
                title: "AI Guide".to_string(),
                url: Some(format!("{}/wiki/spaces/DOC/pages/123/AI+Guide", server.uri())),
            }]
        );
        assert!(results.error.is_none());
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/rest/api/search"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).search("type = page").await.unwrap_err();
        assert_eq!(err.to_string(), "Confluence API error: 401");
    }

    #[tokio::test]
    async fn test_get_page_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/rest/api/content/123"))
            .and(query_param("expand", "body.storage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "123",
                "title": "AI Guide",
                "_links": { "webui": "/spaces/DOC/pages/123" },
                "body": { "storage": { "value": "<p>AI is...</p>" } }
            })))
            .mount(&server)
            .await;

        let page = client(&server)
            .get_page("123", Some("body.storage"))
            .await
            .unwrap();
        assert_eq!(page.title, "AI Guide");
        assert_eq!(page.url, format!("{}/wiki/spaces/DOC/pages/123", server.uri()));
        assert_eq!(page.content.as_deref(), Some("<p>AI is...</p>"));
    }

    #[tokio::test]
    async fn test_get_page_empty_body_is_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/rest/api/content/9"))
            .and(query_param_is_missing("expand"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "9",
                "title": "Empty",
                "_links": { "webui": "/x" },
                "body": { "storage": { "value": "" } }
            })))
            .mount(&server)
            .await;

        let page = client(&server).get_page("9", None).await.unwrap();
        assert!(page.content.is_none());
    }

    #[tokio::test]
    async fn test_search_tool_captures_error_as_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let tool = SearchPagesTool::new(Arc::new(client(&server)));
        let output = tool.execute(json!({ "cql": "text ~ \"AI\"" })).await.unwrap();

        assert_eq!(output["pages"], json!([]));
        assert_eq!(output["total"], 0);
        assert!(output["error"]
            .as_str()
            .unwrap()
            .contains("Confluence API error: 500"));
    }

    #[tokio::test]
    async fn test_get_page_tool_blank_page_on_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let tool = GetPageTool::new(Arc::new(client(&server)));
        let output = tool
            .execute(json!({ "page_id": "404", "expand": "body.storage" }))
            .await
            .unwrap();

        assert_eq!(output["page"], json!({ "id": "", "title": "", "url": "" }));
        assert!(output["error"].as_str().unwrap().contains("404"));
    }

    #[test]
    fn test_tool_schemas_match_records() {
        let declared = SchemaContract::from_json_schema(&SEARCH_PAGES_OUTPUT_SCHEMA).unwrap();
        let derived = SchemaContract::for_type::<SearchResults>().unwrap();
        assert!(derived.check_compatible(&declared).is_ok());

        let declared = SchemaContract::from_json_schema(&GET_PAGE_OUTPUT_SCHEMA).unwrap();
        let derived = SchemaContract::for_type::<PageFetch>().unwrap();
        assert!(derived.check_compatible(&declared).is_ok());
    }

    #[test]
    fn test_failed_records_satisfy_declared_schemas() {
        let search = SchemaContract::from_json_schema(&SEARCH_PAGES_OUTPUT_SCHEMA).unwrap();
        let value = serde_json::to_value(SearchResults::failed("boom")).unwrap();
        assert!(search.validate(&value).is_ok());

        let fetch = SchemaContract::from_json_schema(&GET_PAGE_OUTPUT_SCHEMA).unwrap();
        let value = serde_json::to_value(PageFetch::failed("boom")).unwrap();
        assert!(fetch.validate(&value).is_ok());
    }
}
