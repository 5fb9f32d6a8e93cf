use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STREAM_END_SCOPE: &str = "__loomgraph_stream_end__";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Event {
    Vertex(VertexEvent),
    Diagnostic(DiagnosticEvent),
}

impl Event {
    pub fn vertex_message(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Vertex(VertexEvent::new(None, None, scope.into(), message.into()))
    }

    pub fn vertex_message_with_meta(
        vertex_id: impl Into<String>,
        superstep: u64,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Event::Vertex(VertexEvent::new(
            Some(vertex_id.into()),
            Some(superstep),
            scope.into(),
            message.into(),
        ))
    }

    pub fn diagnostic(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Diagnostic(DiagnosticEvent {
            scope: scope.into(),
            message: message.into(),
        })
    }

    pub fn scope_label(&self) -> Option<&str> {
        match self {
            Event::Vertex(vertex) => Some(vertex.scope()),
            Event::Diagnostic(diag) => Some(diag.scope()),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Event::Vertex(vertex) => vertex.message(),
            Event::Diagnostic(diag) => diag.message(),
        }
    }

    /// Convert event to structured JSON value with normalized schema.
    ///
    /// Returns a JSON object with the following structure:
    /// ```json
    /// {
    ///   "type": "vertex" | "diagnostic",
    ///   "scope": "scope_label",
    ///   "message": "event_message",
    ///   "timestamp": "2025-11-03T12:34:56.789Z",
    ///   "metadata": { /* variant-specific fields */ }
    /// }
    /// ```
    ///
    /// # Example
    ///
    /// ```
    /// use loomgraph::event_bus::Event;
    ///
    /// let event = Event::vertex_message_with_meta("router", 5, "routing", "Processing request");
    /// let json = event.to_json_value();
    ///
    /// assert_eq!(json["type"], "vertex");
    /// assert_eq!(json["scope"], "routing");
    /// assert_eq!(json["message"], "Processing request");
    /// assert_eq!(json["metadata"]["vertex_id"], "router");
    /// assert_eq!(json["metadata"]["superstep"], 5);
    /// ```
    pub fn to_json_value(&self) -> serde_json::Value {
        use serde_json::json;

        let (event_type, metadata) = match self {
            Event::Vertex(vertex) => {
                let mut meta = serde_json::Map::new();
                if let Some(vertex_id) = vertex.vertex_id() {
                    meta.insert("vertex_id".to_string(), json!(vertex_id));
                }
                if let Some(superstep) = vertex.superstep() {
                    meta.insert("superstep".to_string(), json!(superstep));
                }
                ("vertex", Value::Object(meta))
            }
            Event::Diagnostic(_) => {
                let meta = serde_json::Map::new();
                ("diagnostic", Value::Object(meta))
            }
        };

        json!({
            "type": event_type,
            "scope": self.scope_label(),
            "message": self.message(),
            "timestamp": Utc::now().to_rfc3339(),
            "metadata": metadata,
        })
    }

    /// Convert event to compact JSON string representation.
    ///
    /// # Example
    ///
    /// ```
    /// use loomgraph::event_bus::Event;
    ///
    /// let event = Event::diagnostic("test", "message");
    /// let json_str = event.to_json_string().unwrap();
    /// assert!(json_str.contains("\"type\":\"diagnostic\""));
    /// ```
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_json_value())
    }

    /// Convert event to pretty-printed JSON string with indentation.
    ///
    /// Useful for debugging and log files where human readability is important.
    ///
    /// # Example
    ///
    /// ```
    /// use loomgraph::event_bus::Event;
    ///
    /// let event = Event::vertex_message("test", "hello");
    /// let json_str = event.to_json_pretty().unwrap();
    /// assert!(json_str.contains("  \"type\": \"vertex\""));
    /// ```
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_json_value())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Vertex(vertex) => match (vertex.vertex_id(), vertex.superstep()) {
                (Some(id), Some(step)) => write!(f, "[{id}@{step}] {}", vertex.message()),
                (Some(id), None) => write!(f, "[{id}] {}", vertex.message()),
                (None, Some(step)) => write!(f, "[step {step}] {}", vertex.message()),
                (None, None) => write!(f, "{}", vertex.message()),
            },
            Event::Diagnostic(diag) => write!(f, "{}", diag.message()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VertexEvent {
    vertex_id: Option<String>,
    superstep: Option<u64>,
    scope: String,
    message: String,
}

impl VertexEvent {
    pub fn new(
        vertex_id: Option<String>,
        superstep: Option<u64>,
        scope: String,
        message: String,
    ) -> Self {
        Self {
            vertex_id,
            superstep,
            scope,
            message,
        }
    }

    pub fn vertex_id(&self) -> Option<&str> {
        self.vertex_id.as_deref()
    }

    pub fn superstep(&self) -> Option<u64> {
        self.superstep
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosticEvent {
    scope: String,
    message: String,
}

impl DiagnosticEvent {
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_event_display_includes_id_and_step() {
        let event = Event::vertex_message_with_meta("router", 3, "routing", "dispatched");
        assert_eq!(event.to_string(), "[router@3] dispatched");
    }

    #[test]
    fn diagnostic_event_json_round_trips_scope() {
        let event = Event::diagnostic("system", "ready");
        let json = event.to_json_value();
        assert_eq!(json["type"], "diagnostic");
        assert_eq!(json["scope"], "system");
    }
}
