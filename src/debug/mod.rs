//! Client for the debug backend: service registry, logs and stats.
//!
//! Records are passed through untouched; the gateway never interprets them.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info_span, instrument, Instrument};
use url::Url;

#[derive(Debug, Error)]
pub enum DebugError {
    #[error("debug service request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("debug service returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid debug service url: {0}")]
    Url(#[from] url::ParseError),
}

/// Read-only operations consumed from the debug backend.
#[async_trait]
pub trait DebugService: Send + Sync {
    /// Every registered service with its nodes, in registry order.
    async fn list_services(&self) -> Result<Vec<Value>, DebugError>;

    async fn read_logs(&self, service: &str) -> Result<Vec<Value>, DebugError>;

    async fn read_stats(&self, service: &str) -> Result<Vec<Value>, DebugError>;
}

#[derive(Serialize)]
struct ReadRequest<'a> {
    service: &'a str,
}

/// `past` asks for the stored history, not only the latest snapshot.
#[derive(Serialize)]
struct StatsRequest<'a> {
    service: &'a str,
    past: bool,
}

#[derive(Deserialize)]
struct ServicesResponse {
    #[serde(default)]
    services: Vec<Value>,
}

#[derive(Deserialize)]
struct LogResponse {
    #[serde(default)]
    records: Vec<Value>,
}

#[derive(Deserialize)]
struct StatsResponse {
    #[serde(default)]
    stats: Vec<Value>,
}

/// JSON-over-HTTP client for the debug backend.
#[derive(Debug, Clone)]
pub struct HttpDebugService {
    base: Url,
    http: Client,
}

impl HttpDebugService {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base: Url) -> Result<Self, DebugError> {
        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()?;
        Ok(Self { base, http })
    }

    fn endpoint(&self, path: &str) -> Result<Url, DebugError> {
        Ok(self.base.join(path)?)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: Url) -> Result<T, DebugError> {
        let span = info_span!("debug.request", http.method = "GET", url = %url);
        let response = self.http.get(url).send().instrument(span).await?;
        Ok(ok_or_status(response).await?.json().await?)
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: Url,
        body: &impl Serialize,
    ) -> Result<T, DebugError> {
        let span = info_span!("debug.request", http.method = "POST", url = %url);
        let response = self.http.post(url).json(body).send().instrument(span).await?;
        Ok(ok_or_status(response).await?.json().await?)
    }
}

#[async_trait]
impl DebugService for HttpDebugService {
    #[instrument(skip(self))]
    async fn list_services(&self) -> Result<Vec<Value>, DebugError> {
        let listing: ServicesResponse = self.get_json(self.endpoint("registry")?).await?;

        let mut services = Vec::new();
        for name in listing.services.iter().filter_map(service_name) {
            let mut url = self.endpoint("registry/")?;
            url.path_segments_mut()
                .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
                .pop_if_empty()
                .push(name);
            let detail: ServicesResponse = self.get_json(url).await?;
            services.extend(detail.services);
        }

        Ok(services)
    }

    #[instrument(skip(self))]
    async fn read_logs(&self, service: &str) -> Result<Vec<Value>, DebugError> {
        let response: LogResponse = self
            .post_json(self.endpoint("debug/log/read")?, &ReadRequest { service })
            .await?;
        Ok(response.records)
    }

    #[instrument(skip(self))]
    async fn read_stats(&self, service: &str) -> Result<Vec<Value>, DebugError> {
        let response: StatsResponse = self
            .post_json(
                self.endpoint("debug/stats/read")?,
                &StatsRequest {
                    service,
                    past: true,
                },
            )
            .await?;
        Ok(response.stats)
    }
}

fn service_name(service: &Value) -> Option<&str> {
    service.get("name").and_then(Value::as_str)
}

async fn ok_or_status(response: reqwest::Response) -> Result<reqwest::Response, DebugError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DebugError::Status { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoints_join_under_base() -> Result<(), DebugError> {
        let client = HttpDebugService::new(Url::parse("http://debug.local:8080/api/")?)?;
        assert_eq!(
            client.endpoint("debug/log/read")?.as_str(),
            "http://debug.local:8080/api/debug/log/read"
        );
        assert_eq!(
            client.endpoint("registry")?.as_str(),
            "http://debug.local:8080/api/registry"
        );
        Ok(())
    }

    #[test]
    fn service_name_reads_name_field() {
        assert_eq!(
            service_name(&json!({"name": "go.micro.srv.greeter", "nodes": []})),
            Some("go.micro.srv.greeter")
        );
        assert_eq!(service_name(&json!({"nodes": []})), None);
    }

    #[test]
    fn responses_default_to_empty() -> Result<(), serde_json::Error> {
        let logs: LogResponse = serde_json::from_str("{}")?;
        assert!(logs.records.is_empty());
        let stats: StatsResponse = serde_json::from_str(r#"{"stats":[{"cpu":1}]}"#)?;
        assert_eq!(stats.stats, vec![json!({"cpu": 1})]);
        Ok(())
    }

    #[test]
    fn read_request_serializes_service() -> Result<(), serde_json::Error> {
        let body = serde_json::to_value(ReadRequest { service: "greeter" })?;
        assert_eq!(body, json!({"service": "greeter"}));
        Ok(())
    }

    mod http {
        use super::super::*;
        use anyhow::{bail, Result};
        use serde_json::json;
        use std::net::TcpListener;
        use wiremock::matchers::{body_json, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn can_bind_localhost() -> bool {
            TcpListener::bind("127.0.0.1:0").is_ok()
        }

        fn client_for(server: &MockServer) -> Result<HttpDebugService> {
            Ok(HttpDebugService::new(Url::parse(&format!(
                "{}/",
                server.uri()
            ))?)?)
        }

        #[tokio::test]
        async fn list_services_fetches_each_detail_in_order() -> Result<()> {
            if !can_bind_localhost() {
                eprintln!("Skipping test: cannot bind localhost");
                return Ok(());
            }
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/registry"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "services": [{"name": "greeter"}, {"name": "team/store"}, {"nodes": []}]
                })))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/registry/greeter"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "services": [{"name": "greeter", "version": "1"}, {"name": "greeter", "version": "2"}]
                })))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/registry/team%2Fstore"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "services": [{"name": "team/store", "version": "1"}]
                })))
                .expect(1)
                .mount(&server)
                .await;

            let services = client_for(&server)?.list_services().await?;
            assert_eq!(
                services,
                vec![
                    json!({"name": "greeter", "version": "1"}),
                    json!({"name": "greeter", "version": "2"}),
                    json!({"name": "team/store", "version": "1"}),
                ]
            );
            Ok(())
        }

        #[tokio::test]
        async fn read_logs_posts_service() -> Result<()> {
            if !can_bind_localhost() {
                eprintln!("Skipping test: cannot bind localhost");
                return Ok(());
            }
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/debug/log/read"))
                .and(body_json(json!({"service": "greeter"})))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "records": [{"message": "started"}, {"message": "ready"}]
                })))
                .expect(1)
                .mount(&server)
                .await;

            let records = client_for(&server)?.read_logs("greeter").await?;
            assert_eq!(
                records,
                vec![json!({"message": "started"}), json!({"message": "ready"})]
            );
            Ok(())
        }

        #[tokio::test]
        async fn read_stats_asks_for_history() -> Result<()> {
            if !can_bind_localhost() {
                eprintln!("Skipping test: cannot bind localhost");
                return Ok(());
            }
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/debug/stats/read"))
                .and(body_json(json!({"service": "greeter", "past": true})))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "stats": [{"requests": 1}, {"requests": 3}]
                })))
                .expect(1)
                .mount(&server)
                .await;

            let stats = client_for(&server)?.read_stats("greeter").await?;
            assert_eq!(stats, vec![json!({"requests": 1}), json!({"requests": 3})]);
            Ok(())
        }

        #[tokio::test]
        async fn failed_registry_lookup_is_status_error() -> Result<()> {
            if !can_bind_localhost() {
                eprintln!("Skipping test: cannot bind localhost");
                return Ok(());
            }
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/registry"))
                .respond_with(ResponseTemplate::new(503).set_body_string("registry down"))
                .mount(&server)
                .await;

            match client_for(&server)?.list_services().await {
                Err(DebugError::Status { status, body }) => {
                    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                    assert_eq!(body, "registry down");
                }
                other => bail!("unexpected result: {other:?}"),
            }
            Ok(())
        }
    }
}
