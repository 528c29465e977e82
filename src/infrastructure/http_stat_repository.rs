// Management REST service repository implementation
use crate::application::stat_repository::StatRepository;
use crate::domain::series::StatSample;
use crate::domain::server::AttributeMap;
use crate::error::StatError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpStatRepository {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    attributes: AttributeMap,
}

impl HttpStatRepository {
    pub fn new(base_url: String, token: Option<String>, timeout: Duration) -> Result<Self, StatError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StatError::Unreachable(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn build_url(&self, path: &str, params: &[(&str, &str)]) -> String {
        let mut url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        for (i, (key, value)) in params.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    fn server_path(server_id: &str, rest: &str) -> String {
        format!("servers/{}/{}", urlencoding::encode(server_id), rest)
    }

    /// GETs JSON; a 404 comes back as `None`.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, StatError> {
        tracing::debug!("GET {}", url);

        let mut request = self.client.get(url).header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Token {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| StatError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data = response
            .json::<T>()
            .await
            .map_err(|e| StatError::Decode(e.to_string()))?;
        Ok(Some(data))
    }
}

#[async_trait]
impl StatRepository for HttpStatRepository {
    async fn list_servers(&self) -> Result<Vec<String>, StatError> {
        let url = self.build_url("servers", &[]);
        Ok(self.get_json(&url).await?.unwrap_or_default())
    }

    async fn lookup(
        &self,
        server_id: &str,
        object_name: &str,
    ) -> Result<Option<AttributeMap>, StatError> {
        let url = self.build_url(
            &Self::server_path(server_id, "mbeans/lookup"),
            &[("name", object_name)],
        );
        let response: Option<LookupResponse> = self.get_json(&url).await?;
        Ok(response.map(|r| r.attributes))
    }

    async fn query(&self, server_id: &str, pattern: &str) -> Result<Vec<String>, StatError> {
        let url = self.build_url(
            &Self::server_path(server_id, "mbeans/query"),
            &[("pattern", pattern)],
        );
        Ok(self.get_json(&url).await?.unwrap_or_default())
    }

    async fn statistics_names(&self, server_id: &str) -> Result<Vec<String>, StatError> {
        let url = self.build_url(&Self::server_path(server_id, "stats/names"), &[]);
        Ok(self.get_json(&url).await?.unwrap_or_default())
    }

    async fn statistics_data(
        &self,
        server_id: &str,
        name: &str,
        start_ms: i64,
        end_ms: i64,
        step_ms: i64,
    ) -> Result<Vec<StatSample>, StatError> {
        let (start, end, step) = (start_ms.to_string(), end_ms.to_string(), step_ms.to_string());
        let url = self.build_url(
            &Self::server_path(server_id, "stats/data"),
            &[("name", name), ("start", &start), ("end", &end), ("step", &step)],
        );
        Ok(self.get_json(&url).await?.unwrap_or_default())
    }
}
