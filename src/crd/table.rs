use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ── Spec sub-types ────────────────────────────────────────────────────────────

/// AttributeDefinition declares the type of a key attribute.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDefinition {
    pub attribute_name: String,
    pub attribute_type: String,
}

/// KeySchemaElement is one component of the table's primary key.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeySchemaElement {
    pub attribute_name: String,
    pub key_type: String,
}

/// StreamSpecification controls the change stream of the table.
/// Replicated tables require `NEW_AND_OLD_IMAGES`.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamSpecification {
    pub stream_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_view_type: Option<String>,
}

/// ReplicaSpec requests a replica of the table in another region.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaSpec {
    pub region_name: String,

    /// Fields this harness does not model, carried through read-modify-write.
    #[serde(flatten, default)]
    #[schemars(skip)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ReplicaSpec {
    pub fn new(region_name: impl Into<String>) -> Self {
        Self {
            region_name: region_name.into(),
            extra: BTreeMap::new(),
        }
    }
}

// ── CRD ───────────────────────────────────────────────────────────────────────

/// Table is the desired state handed to the controller under test.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "dynamodb.services.k8s.aws",
    version = "v1alpha1",
    kind = "Table",
    plural = "tables",
    namespaced,
    status = "TableStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct TableSpec {
    pub table_name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_definitions: Vec<AttributeDefinition>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_schema: Vec<KeySchemaElement>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_specification: Option<StreamSpecification>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replicas: Vec<ReplicaSpec>,

    /// Fields this harness does not model, carried through read-modify-write.
    #[serde(flatten, default)]
    #[schemars(skip)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

// ── Status ────────────────────────────────────────────────────────────────────

/// AckCondition is a condition as written by the controller.  Unlike the
/// upstream meta/v1 Condition, only `type` and `status` are guaranteed.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AckCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// AckResourceMetadata is set once the controller has created the backing table.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AckResourceMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(default, rename = "ownerAccountID", skip_serializing_if = "Option::is_none")]
    pub owner_account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// TableStatus is the observed state reported by the controller.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_resource_metadata: Option<AckResourceMetadata>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<AckCondition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_status: Option<String>,
}

// ── Builders ──────────────────────────────────────────────────────────────────

/// A pay-per-request table keyed by a single string hash key.
fn base_spec(table_name: &str) -> TableSpec {
    TableSpec {
        table_name: table_name.to_string(),
        attribute_definitions: vec![AttributeDefinition {
            attribute_name: "PK".into(),
            attribute_type: "S".into(),
        }],
        key_schema: vec![KeySchemaElement {
            attribute_name: "PK".into(),
            key_type: "HASH".into(),
        }],
        billing_mode: Some("PAY_PER_REQUEST".into()),
        stream_specification: None,
        replicas: vec![],
        extra: BTreeMap::new(),
    }
}

/// A table with streams enabled and one replica per region.
pub fn table_with_replicas(name: &str, namespace: &str, regions: &[&str]) -> Table {
    let mut spec = base_spec(name);
    spec.stream_specification = Some(StreamSpecification {
        stream_enabled: true,
        stream_view_type: Some("NEW_AND_OLD_IMAGES".into()),
    });
    spec.replicas = regions.iter().map(|r| ReplicaSpec::new(*r)).collect();
    with_namespace(Table::new(name, spec), namespace)
}

/// A table requesting a replica without the stream the service requires.
/// The controller is expected to reject it with a terminal condition.
pub fn table_with_invalid_replicas(name: &str, namespace: &str, region: &str) -> Table {
    let mut spec = base_spec(name);
    spec.stream_specification = Some(StreamSpecification {
        stream_enabled: false,
        stream_view_type: None,
    });
    spec.replicas = vec![ReplicaSpec::new(region)];
    with_namespace(Table::new(name, spec), namespace)
}

fn with_namespace(mut table: Table, namespace: &str) -> Table {
    table.metadata.namespace = Some(namespace.to_string());
    table
}
