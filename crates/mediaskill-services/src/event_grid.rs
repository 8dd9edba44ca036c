//! Event Grid subscription client (ARM REST API).

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::json;
use std::sync::Arc;

use crate::auth::TokenProvider;
use crate::error::{ServiceError, ServiceResult};
use crate::http::{ensure_success, read_json};
use crate::traits::{EventSubscriptionClient, RemoteResource};

pub const EVENT_GRID_API_VERSION: &str = "2020-06-01";

const WEBHOOK_ENDPOINT_TYPE: &str = "WebHook";

pub struct EventGridClient {
    http_client: Client,
    tokens: Arc<dyn TokenProvider>,
    arm_endpoint: String,
}

impl EventGridClient {
    pub fn new(
        http_client: Client,
        tokens: Arc<dyn TokenProvider>,
        arm_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            tokens,
            arm_endpoint: arm_endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, scope: &str, name: &str) -> String {
        format!(
            "{}{}/providers/Microsoft.EventGrid/eventSubscriptions/{}?api-version={}",
            self.arm_endpoint, scope, name, EVENT_GRID_API_VERSION
        )
    }

    async fn authorized(&self, request: RequestBuilder) -> ServiceResult<RequestBuilder> {
        let token = self.tokens.bearer_token().await?;
        Ok(request.bearer_auth(token))
    }
}

#[async_trait]
impl EventSubscriptionClient for EventGridClient {
    async fn get(&self, scope: &str, name: &str) -> ServiceResult<Option<RemoteResource>> {
        let request = self
            .authorized(self.http_client.get(self.url(scope, name)))
            .await?;
        let response = request.send().await?;

        match ensure_success(name, response).await {
            Ok(response) => Ok(Some(read_json(response).await?)),
            Err(ServiceError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create(
        &self,
        scope: &str,
        name: &str,
        endpoint: &str,
        event_types: &[&str],
    ) -> ServiceResult<()> {
        let body = json!({
            "properties": {
                "destination": {
                    "endpointType": WEBHOOK_ENDPOINT_TYPE,
                    "properties": { "endpointUrl": endpoint }
                },
                "filter": { "includedEventTypes": event_types }
            }
        });

        let request = self
            .authorized(self.http_client.put(self.url(scope, name)))
            .await?;
        let response = request.json(&body).send().await?;
        ensure_success(name, response).await?;

        tracing::info!(subscription = %name, "Created event subscription");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;
    use mockito::Matcher;

    const SCOPE: &str =
        "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Media/mediaServices/acct";

    fn client(server: &mockito::Server) -> EventGridClient {
        EventGridClient::new(
            Client::new(),
            Arc::new(StaticTokenProvider::new("tok")),
            server.url(),
        )
    }

    fn path(name: &str) -> String {
        format!(
            "{}/providers/Microsoft.EventGrid/eventSubscriptions/{}",
            SCOPE, name
        )
    }

    #[tokio::test]
    async fn test_get_missing_subscription() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", path("sub-1").as_str())
            .match_query(Matcher::UrlEncoded(
                "api-version".to_string(),
                EVENT_GRID_API_VERSION.to_string(),
            ))
            .with_status(404)
            .create_async()
            .await;

        assert!(client(&server).get(SCOPE, "sub-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_webhook_subscription() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", path("sub-1").as_str())
            .match_query(Matcher::Any)
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::PartialJson(json!({
                "properties": {
                    "destination": {
                        "endpointType": "WebHook",
                        "properties": {"endpointUrl": "https://skill.example.com/"}
                    },
                    "filter": {"includedEventTypes": ["Microsoft.Media.JobStateChange"]}
                }
            })))
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;

        client(&server)
            .create(
                SCOPE,
                "sub-1",
                "https://skill.example.com/",
                &["Microsoft.Media.JobStateChange"],
            )
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_conflict_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", path("sub-1").as_str())
            .match_query(Matcher::Any)
            .with_status(409)
            .create_async()
            .await;

        let err = client(&server)
            .create(SCOPE, "sub-1", "https://e", &[])
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }
}
