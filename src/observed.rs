//! Observed-state model: what the harness reads back from the managed-table
//! service and from the controller's conditions.
//!
//! Snapshots are always freshly fetched and never cached.  A fetch that
//! returns "not found" is represented as `None` by the callers; nothing in
//! here models absence.

use std::collections::BTreeSet;
use std::fmt;

use crate::crd::table::AckCondition;
use crate::error::{Error, Result};

/// Table lifecycle status as reported by the service.
///
/// Parsing is exact and case-sensitive: anything that is not one of the
/// documented upper-case values lands in `Other`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableState {
    Creating,
    Updating,
    Deleting,
    Active,
    InaccessibleEncryptionCredentials,
    Archiving,
    Archived,
    Other(String),
}

impl TableState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Creating => "CREATING",
            Self::Updating => "UPDATING",
            Self::Deleting => "DELETING",
            Self::Active => "ACTIVE",
            Self::InaccessibleEncryptionCredentials => "INACCESSIBLE_ENCRYPTION_CREDENTIALS",
            Self::Archiving => "ARCHIVING",
            Self::Archived => "ARCHIVED",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for TableState {
    fn from(s: &str) -> Self {
        match s {
            "CREATING" => Self::Creating,
            "UPDATING" => Self::Updating,
            "DELETING" => Self::Deleting,
            "ACTIVE" => Self::Active,
            "INACCESSIBLE_ENCRYPTION_CREDENTIALS" => Self::InaccessibleEncryptionCredentials,
            "ARCHIVING" => Self::Archiving,
            "ARCHIVED" => Self::Archived,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for TableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replica lifecycle status as reported by the service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplicaState {
    Creating,
    CreationFailed,
    Updating,
    Deleting,
    Active,
    RegionDisabled,
    InaccessibleEncryptionCredentials,
    Other(String),
}

impl ReplicaState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Creating => "CREATING",
            Self::CreationFailed => "CREATION_FAILED",
            Self::Updating => "UPDATING",
            Self::Deleting => "DELETING",
            Self::Active => "ACTIVE",
            Self::RegionDisabled => "REGION_DISABLED",
            Self::InaccessibleEncryptionCredentials => "INACCESSIBLE_ENCRYPTION_CREDENTIALS",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for ReplicaState {
    fn from(s: &str) -> Self {
        match s {
            "CREATING" => Self::Creating,
            "CREATION_FAILED" => Self::CreationFailed,
            "UPDATING" => Self::Updating,
            "DELETING" => Self::Deleting,
            "ACTIVE" => Self::Active,
            "REGION_DISABLED" => Self::RegionDisabled,
            "INACCESSIBLE_ENCRYPTION_CREDENTIALS" => Self::InaccessibleEncryptionCredentials,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ReplicaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicaDescriptor {
    pub region_name: String,
    /// `None` when the service omitted the status.
    pub status: Option<ReplicaState>,
}

impl ReplicaDescriptor {
    pub fn new(region_name: impl Into<String>, status: ReplicaState) -> Self {
        Self {
            region_name: region_name.into(),
            status: Some(status),
        }
    }
}

/// One `DescribeTable` result.  Region names are unique within a snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSnapshot {
    table_name: String,
    status: Option<TableState>,
    replicas: Vec<ReplicaDescriptor>,
}

impl TableSnapshot {
    pub fn new(
        table_name: impl Into<String>,
        status: Option<TableState>,
        replicas: Vec<ReplicaDescriptor>,
    ) -> Result<Self> {
        let table_name = table_name.into();
        let mut seen = BTreeSet::new();
        for r in &replicas {
            if !seen.insert(r.region_name.as_str()) {
                return Err(Error::InvalidSnapshot(format!(
                    "table {table_name} lists replica region {} more than once",
                    r.region_name
                )));
            }
        }
        Ok(Self {
            table_name,
            status,
            replicas,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn status(&self) -> Option<&TableState> {
        self.status.as_ref()
    }

    pub fn replicas(&self) -> &[ReplicaDescriptor] {
        &self.replicas
    }

    pub fn replica(&self, region: &str) -> Option<&ReplicaDescriptor> {
        self.replicas.iter().find(|r| r.region_name == region)
    }

    pub fn region_names(&self) -> BTreeSet<&str> {
        self.replicas.iter().map(|r| r.region_name.as_str()).collect()
    }
}

/// Kubernetes-style tri-state condition status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl From<&str> for ConditionStatus {
    fn from(s: &str) -> Self {
        match s {
            "True" => Self::True,
            "False" => Self::False,
            _ => Self::Unknown,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConditionRecord {
    pub condition_type: String,
    pub status: ConditionStatus,
    pub message: Option<String>,
}

impl From<&AckCondition> for ConditionRecord {
    fn from(c: &AckCondition) -> Self {
        Self {
            condition_type: c.type_.clone(),
            status: ConditionStatus::from(c.status.as_str()),
            message: c.message.clone(),
        }
    }
}
