//! Managed-table side of the harness: what the service itself reports.

use async_trait::async_trait;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::types::TableDescription;
use tracing::debug;

use crate::error::{Error, Result};
use crate::observed::{ReplicaDescriptor, ReplicaState, TableSnapshot, TableState};

/// Trait abstracting the table status API so tests can script responses.
/// `describe` returns `None` when the table does not exist.
#[async_trait]
pub trait TableStatusApi: Send + Sync {
    async fn describe(&self, table_name: &str) -> Result<Option<TableSnapshot>>;
}

/// Production implementation calling `DescribeTable`.
#[derive(Clone)]
pub struct DynamoDbTableStatus {
    client: aws_sdk_dynamodb::Client,
}

impl DynamoDbTableStatus {
    pub fn new(client: aws_sdk_dynamodb::Client) -> Self {
        Self { client }
    }

    /// Build a client from the default credential chain, pinned to `region`.
    pub async fn for_region(region: &str) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::new(aws_sdk_dynamodb::Client::new(&config))
    }
}

#[async_trait]
impl TableStatusApi for DynamoDbTableStatus {
    async fn describe(&self, table_name: &str) -> Result<Option<TableSnapshot>> {
        let output = match self.client.describe_table().table_name(table_name).send().await {
            Ok(output) => output,
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(DescribeTableError::is_resource_not_found_exception) =>
            {
                debug!(table = %table_name, "table not found");
                return Ok(None);
            }
            Err(err) => return Err(Error::DynamoDb(DisplayErrorContext(&err).to_string())),
        };

        let description = output.table().ok_or_else(|| {
            Error::DynamoDb(format!("DescribeTable for {table_name} returned no table"))
        })?;
        snapshot_from(table_name, description).map(Some)
    }
}

fn snapshot_from(table_name: &str, desc: &TableDescription) -> Result<TableSnapshot> {
    let status = desc.table_status().map(|s| TableState::from(s.as_str()));
    let replicas = desc
        .replicas()
        .iter()
        .filter_map(|r| {
            let region = r.region_name()?;
            Some(ReplicaDescriptor {
                region_name: region.to_string(),
                status: r.replica_status().map(|s| ReplicaState::from(s.as_str())),
            })
        })
        .collect();
    TableSnapshot::new(desc.table_name().unwrap_or(table_name), status, replicas)
}
