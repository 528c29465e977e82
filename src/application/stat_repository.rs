// Repository trait for management-bean and statistics access
use crate::domain::series::StatSample;
use crate::domain::server::AttributeMap;
use crate::error::StatError;
use async_trait::async_trait;

#[async_trait]
pub trait StatRepository: Send + Sync {
    /// Ids of every server the management service knows about
    async fn list_servers(&self) -> Result<Vec<String>, StatError>;

    /// Attributes of one bean, `None` when no bean has that name
    async fn lookup(
        &self,
        server_id: &str,
        object_name: &str,
    ) -> Result<Option<AttributeMap>, StatError>;

    /// Bean names matching a pattern such as `resin:type=ThreadPool,*`
    async fn query(&self, server_id: &str, pattern: &str) -> Result<Vec<String>, StatError>;

    /// Names of every statistic the server records
    async fn statistics_names(&self, server_id: &str) -> Result<Vec<String>, StatError>;

    /// Bucketed samples of one statistic
    async fn statistics_data(
        &self,
        server_id: &str,
        name: &str,
        start_ms: i64,
        end_ms: i64,
        step_ms: i64,
    ) -> Result<Vec<StatSample>, StatError>;
}
