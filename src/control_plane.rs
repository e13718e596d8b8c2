//! Kubernetes side of the harness: where desired state is written and the
//! controller's conditions are read back.

use async_trait::async_trait;
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, ResourceExt};
use tracing::{debug, info};

use crate::crd::table::Table;
use crate::error::{Error, Result};

/// Field manager recorded on every write the harness makes.
pub const FIELD_MANAGER: &str = "table-replica-e2e";

/// Identifies one `Table` resource.  Immutable for the life of a scenario.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    pub name: String,
    pub namespace: String,
}

impl ResourceHandle {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl std::fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Trait abstracting the control-plane API so tests can substitute an
/// in-memory store.  `get` returns `None` for "not found"; every other
/// failure is an error.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn create(&self, table: &Table) -> Result<ResourceHandle>;

    async fn get(&self, handle: &ResourceHandle) -> Result<Option<Table>>;

    /// Write back a previously fetched object.  The object's
    /// `resourceVersion` guards against overwriting a concurrent update.
    async fn replace(&self, handle: &ResourceHandle, table: &Table) -> Result<()>;

    async fn delete(&self, handle: &ResourceHandle) -> Result<()>;
}

/// Production implementation backed by kube-rs.
#[derive(Clone)]
pub struct KubeControlPlane {
    client: Client,
}

impl KubeControlPlane {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Table> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl ControlPlane for KubeControlPlane {
    async fn create(&self, table: &Table) -> Result<ResourceHandle> {
        let namespace = table
            .namespace()
            .ok_or_else(|| Error::config(format!("table {} has no namespace", table.name_any())))?;
        let created = self.api(&namespace).create(&post_params(), table).await?;
        let handle = ResourceHandle::new(created.name_any(), namespace);
        info!(resource = %handle, "created Table");
        Ok(handle)
    }

    async fn get(&self, handle: &ResourceHandle) -> Result<Option<Table>> {
        Ok(self.api(&handle.namespace).get_opt(&handle.name).await?)
    }

    async fn replace(&self, handle: &ResourceHandle, table: &Table) -> Result<()> {
        self.api(&handle.namespace)
            .replace(&handle.name, &post_params(), table)
            .await?;
        debug!(resource = %handle, "replaced Table");
        Ok(())
    }

    async fn delete(&self, handle: &ResourceHandle) -> Result<()> {
        self.api(&handle.namespace)
            .delete(&handle.name, &DeleteParams::default())
            .await?;
        info!(resource = %handle, "deleted Table");
        Ok(())
    }
}
