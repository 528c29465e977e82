// Server service - Use cases reading server state from management beans
use crate::application::stat_repository::StatRepository;
use crate::domain::server::{
    attr_bool, attr_i64, attr_string, MBeanInfo, MemoryState, MemoryUsage, ServerInfo,
    ServerSummary, ThreadDump, ThreadingInfo,
};
use crate::error::StatError;
use std::sync::Arc;

const RESIN_BEAN: &str = "resin:type=Resin";
const SERVER_BEAN: &str = "resin:type=Server";
const MEMORY_BEAN: &str = "java.lang:type=Memory";
const THREADING_BEAN: &str = "java.lang:type=Threading";
const THREAD_POOL_BEAN: &str = "resin:type=ThreadPool";
const THREAD_DUMP_PATTERN: &str = "resin:type=ThreadDump,*";

/// Upper bound on beans expanded by one query.
const MAX_QUERY_BEANS: usize = 200;

#[derive(Clone)]
pub struct ServerService {
    repository: Arc<dyn StatRepository>,
}

impl ServerService {
    pub fn new(repository: Arc<dyn StatRepository>) -> Self {
        Self { repository }
    }

    pub async fn list_servers(&self) -> Result<Vec<ServerSummary>, StatError> {
        let ids = self.repository.list_servers().await?;
        Ok(ids.into_iter().map(ServerSummary::new).collect())
    }

    pub async fn server_info(&self, server_id: &str) -> Result<ServerInfo, StatError> {
        let resin = self.repository.lookup(server_id, RESIN_BEAN).await?.unwrap_or_default();
        let server = self.repository.lookup(server_id, SERVER_BEAN).await?.unwrap_or_default();
        let cluster_bean = format!("resin:type=ClusterServer,name={}", server_id);
        let cluster = self
            .repository
            .lookup(server_id, &cluster_bean)
            .await?
            .unwrap_or_default();

        Ok(ServerInfo {
            id: server_id.to_string(),
            version: attr_string(&resin, "Version"),
            state: attr_string(&server, "State"),
            start_time_ms: attr_i64(&server, "StartTime"),
            uptime_ms: attr_i64(&server, "Uptime"),
            cluster: attr_string(&cluster, "Cluster"),
            address: attr_string(&cluster, "Address"),
            port: attr_i64(&cluster, "Port"),
            is_triad: attr_bool(&cluster, "TriadServer"),
        })
    }

    pub async fn memory_state(&self, server_id: &str) -> Result<MemoryState, StatError> {
        let memory = self.repository.lookup(server_id, MEMORY_BEAN).await?.unwrap_or_default();

        Ok(MemoryState {
            heap: MemoryUsage::from_attribute(memory.get("HeapMemoryUsage")),
            non_heap: MemoryUsage::from_attribute(memory.get("NonHeapMemoryUsage")),
        })
    }

    pub async fn threading_info(&self, server_id: &str) -> Result<ThreadingInfo, StatError> {
        let threads = self
            .repository
            .lookup(server_id, THREADING_BEAN)
            .await?
            .unwrap_or_default();
        let pool = self
            .repository
            .lookup(server_id, THREAD_POOL_BEAN)
            .await?
            .unwrap_or_default();

        Ok(ThreadingInfo {
            thread_count: attr_i64(&threads, "ThreadCount").unwrap_or(0),
            peak_thread_count: attr_i64(&threads, "PeakThreadCount").unwrap_or(0),
            daemon_thread_count: attr_i64(&threads, "DaemonThreadCount").unwrap_or(0),
            pool_active: attr_i64(&pool, "ThreadActiveCount").unwrap_or(0),
            pool_idle: attr_i64(&pool, "ThreadIdleCount").unwrap_or(0),
            pool_max: attr_i64(&pool, "ThreadMax").unwrap_or(0),
        })
    }

    /// Recorded thread dumps, newest first.
    pub async fn thread_dumps(&self, server_id: &str) -> Result<Vec<ThreadDump>, StatError> {
        let names = self.repository.query(server_id, THREAD_DUMP_PATTERN).await?;

        let mut dumps = Vec::with_capacity(names.len());
        for name in names {
            let Some(attributes) = self.repository.lookup(server_id, &name).await? else {
                continue;
            };
            dumps.push(ThreadDump {
                timestamp_ms: attr_i64(&attributes, "Timestamp"),
                dump: attr_string(&attributes, "Dump").unwrap_or_default(),
                name,
            });
        }

        dumps.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
        Ok(dumps)
    }

    pub async fn query_mbeans(
        &self,
        server_id: &str,
        pattern: &str,
    ) -> Result<Vec<MBeanInfo>, StatError> {
        let names = self.repository.query(server_id, pattern).await?;
        if names.len() > MAX_QUERY_BEANS {
            tracing::info!(
                "Query {} matched {} beans, returning the first {}",
                pattern,
                names.len(),
                MAX_QUERY_BEANS
            );
        }

        let mut beans = Vec::new();
        for name in names.into_iter().take(MAX_QUERY_BEANS) {
            if let Some(attributes) = self.repository.lookup(server_id, &name).await? {
                beans.push(MBeanInfo { name, attributes });
            }
        }
        Ok(beans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::stat_repository::fake::FakeStatRepository;
    use serde_json::json;

    fn repository() -> FakeStatRepository {
        FakeStatRepository::with_server("app-0")
            .bean(RESIN_BEAN, json!({"Version": "4.0.66"}))
            .bean(SERVER_BEAN, json!({"State": "ACTIVE", "StartTime": 1000, "Uptime": 5000}))
            .bean(
                "resin:type=ClusterServer,name=app-0",
                json!({"Cluster": "app-tier", "Address": "10.0.0.1", "Port": 6800, "TriadServer": true}),
            )
            .bean(
                MEMORY_BEAN,
                json!({"HeapMemoryUsage": {"init": 0, "used": 10, "committed": 30, "max": 90}}),
            )
            .bean(THREADING_BEAN, json!({"ThreadCount": 42, "PeakThreadCount": 50}))
            .bean(THREAD_POOL_BEAN, json!({"ThreadActiveCount": 3, "ThreadMax": 256}))
            .bean("resin:type=ThreadDump,name=a", json!({"Timestamp": 100, "Dump": "old"}))
            .bean("resin:type=ThreadDump,name=b", json!({"Timestamp": 200, "Dump": "new"}))
    }

    #[tokio::test]
    async fn test_server_info() {
        let service = ServerService::new(Arc::new(repository()));
        let info = service.server_info("app-0").await.unwrap();

        assert_eq!(info.version.as_deref(), Some("4.0.66"));
        assert_eq!(info.state.as_deref(), Some("ACTIVE"));
        assert_eq!(info.port, Some(6800));
        assert!(info.is_triad);
    }

    #[tokio::test]
    async fn test_memory_and_threading() {
        let service = ServerService::new(Arc::new(repository()));

        let memory = service.memory_state("app-0").await.unwrap();
        assert_eq!(memory.heap.free(), 20);
        assert_eq!(memory.non_heap.max, 0);

        let threads = service.threading_info("app-0").await.unwrap();
        assert_eq!(threads.thread_count, 42);
        assert_eq!(threads.pool_max, 256);
        assert_eq!(threads.daemon_thread_count, 0);
    }

    #[tokio::test]
    async fn test_thread_dumps_newest_first() {
        let service = ServerService::new(Arc::new(repository()));
        let dumps = service.thread_dumps("app-0").await.unwrap();

        assert_eq!(dumps.len(), 2);
        assert_eq!(dumps[0].dump, "new");
    }

    #[tokio::test]
    async fn test_query_mbeans() {
        let service = ServerService::new(Arc::new(repository()));
        let beans = service.query_mbeans("app-0", "java.lang:*").await.unwrap();

        let names: Vec<&str> = beans.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec![MEMORY_BEAN, THREADING_BEAN]);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        let service = ServerService::new(Arc::new(FakeStatRepository::unreachable()));
        let err = service.server_info("app-0").await.unwrap_err();
        assert!(err.is_unreachable());
    }
}
