// Server and management-bean domain models
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Attribute name -> value, as exposed by a management bean.
pub type AttributeMap = BTreeMap<String, Value>;

#[derive(Debug, Clone, Serialize)]
pub struct ServerSummary {
    pub id: String,
    pub name: String,
}

impl ServerSummary {
    pub fn new(id: String) -> Self {
        let name = Self::format_name(&id);
        Self { id, name }
    }

    fn format_name(id: &str) -> String {
        // "" is the default server of a single-server deployment
        if id.is_empty() {
            return "default".to_string();
        }
        id.to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub id: String,
    pub version: Option<String>,
    pub state: Option<String>,
    pub start_time_ms: Option<i64>,
    pub uptime_ms: Option<i64>,
    pub cluster: Option<String>,
    pub address: Option<String>,
    pub port: Option<i64>,
    pub is_triad: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MemoryUsage {
    pub init: i64,
    pub used: i64,
    pub committed: i64,
    pub max: i64,
}

impl MemoryUsage {
    pub fn from_attribute(value: Option<&Value>) -> Self {
        let field = |name: &str| {
            value
                .and_then(|v| v.get(name))
                .and_then(Value::as_i64)
                .unwrap_or(0)
        };
        Self {
            init: field("init"),
            used: field("used"),
            committed: field("committed"),
            max: field("max"),
        }
    }

    pub fn free(&self) -> i64 {
        (self.committed - self.used).max(0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryState {
    pub heap: MemoryUsage,
    pub non_heap: MemoryUsage,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ThreadingInfo {
    pub thread_count: i64,
    pub peak_thread_count: i64,
    pub daemon_thread_count: i64,
    pub pool_active: i64,
    pub pool_idle: i64,
    pub pool_max: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadDump {
    pub name: String,
    pub timestamp_ms: Option<i64>,
    pub dump: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MBeanInfo {
    pub name: String,
    pub attributes: AttributeMap,
}

/// Reads an integer attribute, tolerating numbers sent as strings.
pub fn attr_i64(attributes: &AttributeMap, name: &str) -> Option<i64> {
    match attributes.get(name)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn attr_string(attributes: &AttributeMap, name: &str) -> Option<String> {
    match attributes.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

pub fn attr_bool(attributes: &AttributeMap, name: &str) -> bool {
    match attributes.get(name) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}
