//! Firestore REST API types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number};

/// Firestore document value types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String), // Firestore sends integers as strings
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(GeoPoint),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    pub values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    pub fields: Option<HashMap<String, Value>>,
}

impl Value {
    /// Convert an arbitrary JSON value into its Firestore representation.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::NullValue(()),
            serde_json::Value::Bool(b) => Value::BooleanValue(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::IntegerValue(i.to_string()),
                None => Value::DoubleValue(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::StringValue(s.clone()),
            serde_json::Value::Array(items) => Value::ArrayValue(ArrayValue {
                values: Some(items.iter().map(Value::from_json).collect()),
            }),
            serde_json::Value::Object(map) => Value::MapValue(MapValue {
                fields: Some(fields_from_json(map)),
            }),
        }
    }

    /// Read a non-negative integer, as returned by count aggregations.
    pub fn as_count(&self) -> Option<u64> {
        match self {
            Value::IntegerValue(s) => s.parse().ok(),
            Value::DoubleValue(f) if *f >= 0.0 => Some(*f as u64),
            _ => None,
        }
    }

        /// Convert back to plain JSON.
    ///
    /// Timestamps, bytes and references become strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::NullValue(()) => serde_json::Value::Null,
            Value::BooleanValue(b) => serde_json::Value::Bool(*b),
            Value::IntegerValue(s) => s
                .parse::<i64>()
                .map(serde_json::Value::from)
                .unwrap_or_else(|_| serde_json::Value::String(s.clone())),
            Value::DoubleValue(f) => Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::TimestampValue(s)
            | Value::StringValue(s)
            | Value::BytesValue(s)
            | Value::ReferenceValue(s) => serde_json::Value::String(s.clone()),
            Value::GeoPointValue(p) => serde_json::json!({
                "latitude": p.latitude,
                "longitude": p.longitude,
            }),
            Value::ArrayValue(a) => serde_json::Value::Array(
                a.values
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .map(Value::to_json)
                    .collect(),
            ),
            Value::MapValue(m) => serde_json::Value::Object(
                m.fields.as_ref().map(fields_to_json).unwrap_or_default(),
            ),
        }
    }
}

/// Convert a JSON object into Firestore document fields.
pub fn fields_from_json(map: &Map<String, serde_json::Value>) -> HashMap<String, Value> {
    map.iter()
        .map(|(k, v)| (k.clone(), Value::from_json(v)))
        .collect()
}

/// Convert Firestore document fields into a JSON object.
pub fn fields_to_json(fields: &HashMap<String, Value>) -> Map<String, serde_json::Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect()
}

/// Firestore document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Document fields
    pub fields: Option<HashMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Document {
    /// Create a new document with the given fields.
    pub fn new(fields: HashMap<String, Value>) -> Self {
        Self {
            name: None,
            fields: Some(fields),
            create_time: None,
            update_time: None,
        }
    }

    /// Document ID: the last segment of the resource name.
    pub fn id(&self) -> Option<&str> {
        self.name.as_deref().and_then(|n| n.rsplit('/').next())
    }

    /// Fields as a JSON object.
    pub fn json_fields(&self) -> Map<String, serde_json::Value> {
        self.fields.as_ref().map(fields_to_json).unwrap_or_default()
    }
}

// ============================================================================
// Structured queries
// ============================================================================

/// Structured query over a single collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<QueryFilter>,
}

impl StructuredQuery {
    /// Query every document of a top-level collection.
    pub fn collection(collection_id: impl Into<String>) -> Self {
        Self {
            from: vec![CollectionSelector {
                collection_id: collection_id.into(),
            }],
            filter: None,
        }
    }

    /// Restrict to documents whose field equals the given value.
    pub fn where_equal(mut self, field_path: impl Into<String>, value: Value) -> Self {
        self.filter = Some(QueryFilter {
            field_filter: FieldCondition {
                field: FieldReference {
                    field_path: field_path.into(),
                },
                op: FieldOperator::Equal,
                value,
            },
        });
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilter {
    pub field_filter: FieldCondition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldCondition {
    pub field: FieldReference,
    pub op: FieldOperator,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    pub field_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldOperator {
    Equal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub structured_query: StructuredQuery,
}

/// One element of the JSON array returned by `:runQuery`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryResponse {
    #[serde(default)]
    pub document: Option<Document>,
    #[serde(default)]
    pub read_time: Option<String>,
}

// ============================================================================
// Aggregation queries
// ============================================================================

/// Alias under which the count aggregation is returned.
pub const COUNT_ALIAS: &str = "count";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAggregationQueryRequest {
    pub structured_aggregation_query: StructuredAggregationQuery,
}

impl RunAggregationQueryRequest {
    /// Count the documents matched by a query.
    pub fn count(query: StructuredQuery) -> Self {
        Self {
            structured_aggregation_query: StructuredAggregationQuery {
                structured_query: query,
                aggregations: vec![Aggregation {
                    alias: COUNT_ALIAS.to_string(),
                    count: CountAggregation {},
                }],
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredAggregationQuery {
    pub structured_query: StructuredQuery,
    pub aggregations: Vec<Aggregation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Aggregation {
    pub alias: String,
    pub count: CountAggregation,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountAggregation {}

/// One element of the JSON array returned by `:runAggregationQuery`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAggregationQueryResponse {
    #[serde(default)]
    pub result: Option<AggregationResult>,
    #[serde(default)]
    pub read_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    #[serde(default)]
    pub aggregate_fields: HashMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_round_trip_preserves_payload() {
        let original = json!({
            "title": "Backend engineer",
            "remote": true,
            "salary": 120000,
            "rating": 4.5,
            "tags": ["rust", "axum"],
            "company": { "name": "Acme", "size": null },
        });
        let map = original.as_object().unwrap();

        let back = serde_json::Value::Object(fields_to_json(&fields_from_json(map)));
        assert_eq!(back, original);
    }

    #[test]
    fn test_value_wire_format() {
        let value = serde_json::to_value(Value::from_json(&json!(42))).unwrap();
        assert_eq!(value, json!({ "integerValue": "42" }));

        let value = serde_json::to_value(Value::from_json(&json!(null))).unwrap();
        assert_eq!(value, json!({ "nullValue": null }));
    }

    #[test]
    fn test_document_id_from_name() {
        let doc: Document = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/jobs/abc",
            "fields": { "email": { "stringValue": "hr@x.com" } },
        }))
        .unwrap();

        assert_eq!(doc.id(), Some("abc"));
        assert_eq!(doc.json_fields().get("email"), Some(&json!("hr@x.com")));
    }

    #[test]
    fn test_structured_query_wire_format() {
        let query = StructuredQuery::collection("applications")
            .where_equal("jobId", Value::StringValue("j-1".into()));

        let value = serde_json::to_value(RunQueryRequest {
            structured_query: query,
        })
        .unwrap();

        assert_eq!(
            value,
            json!({
                "structuredQuery": {
                    "from": [{ "collectionId": "applications" }],
                    "where": {
                        "fieldFilter": {
                            "field": { "fieldPath": "jobId" },
                            "op": "EQUAL",
                            "value": { "stringValue": "j-1" },
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn test_count_request_wire_format() {
        let value = serde_json::to_value(RunAggregationQueryRequest::count(
            StructuredQuery::collection("applications"),
        ))
        .unwrap();

        assert_eq!(
            value["structuredAggregationQuery"]["aggregations"],
            json!([{ "alias": "count", "count": {} }])
        );
        assert!(value["structuredAggregationQuery"]["structuredQuery"]
            .get("where")
            .is_none());
    }

    #[test]
    fn test_count_value_parsing() {
        assert_eq!(Value::IntegerValue("12".into()).as_count(), Some(12));
        assert_eq!(Value::DoubleValue(3.0).as_count(), Some(3));
        assert_eq!(Value::IntegerValue("-1".into()).as_count(), None);
        assert_eq!(Value::BooleanValue(true).as_count(), None);
    }
}
