//! Harness configuration.  Every flag can also be supplied through the
//! environment, which is how CI and the live test binary set it.

use clap::Parser;

use crate::error::Result;
use crate::poller::PollPolicy;
use crate::terminal::ACK_TERMINAL;

/// Message the controller writes when a replicated table lacks the stream
/// replication needs.
pub const INVALID_STREAM_MESSAGE: &str =
    "table must have DynamoDB Streams enabled with StreamViewType set to NEW_AND_OLD_IMAGES";

#[derive(Parser, Clone, Debug)]
#[command(
    name = "table-replica-e2e",
    about = "End-to-end convergence checks for replicated Table resources"
)]
pub struct HarnessConfig {
    /// Namespace the Table resources are created in.
    #[arg(long, default_value = "default", env = "E2E_NAMESPACE")]
    pub namespace: String,

    /// Region of the primary table (where DescribeTable is called).
    #[arg(long, default_value = "us-west-2", env = "AWS_REGION")]
    pub aws_region: String,

    /// Region of the replica every scenario starts with.
    #[arg(long, default_value = "us-east-1", env = "REPLICA_REGION_1")]
    pub replica_region_1: String,

    /// Region added and then removed by the replica-set scenarios.
    #[arg(long, default_value = "eu-west-1", env = "REPLICA_REGION_2")]
    pub replica_region_2: String,

    /// Prefix for generated table names.
    #[arg(long, default_value = "table-replicas", env = "TABLE_NAME_PREFIX")]
    pub table_name_prefix: String,

    /// Seconds to wait for replica creation, updates and table deletion.
    #[arg(long, default_value_t = 300, env = "REPLICA_WAIT_SECONDS")]
    pub replica_timeout_secs: u64,

    #[arg(long, default_value_t = 15, env = "REPLICA_POLL_SECONDS")]
    pub replica_interval_secs: u64,

    /// Seconds to wait for the controller to pick up a new resource.
    #[arg(long, default_value_t = 30, env = "CONSUMED_WAIT_SECONDS")]
    pub consumed_timeout_secs: u64,

    #[arg(long, default_value_t = 5, env = "CONSUMED_POLL_SECONDS")]
    pub consumed_interval_secs: u64,

    /// Seconds to let a teardown delete settle before the next scenario.
    #[arg(long, default_value_t = 15, env = "DELETE_WAIT_SECONDS")]
    pub delete_settle_secs: u64,

    /// Seconds to wait for a terminal condition on an invalid resource.
    #[arg(long, default_value_t = 60, env = "TERMINAL_WAIT_SECONDS")]
    pub terminal_timeout_secs: u64,

    #[arg(long, default_value_t = 5, env = "TERMINAL_POLL_SECONDS")]
    pub terminal_interval_secs: u64,

    /// Condition type the controller uses for unrecoverable errors.
    #[arg(long, default_value = ACK_TERMINAL, env = "TERMINAL_CONDITION_TYPE")]
    pub terminal_condition_type: String,

    /// Text the terminal condition message must contain.
    #[arg(long, default_value = INVALID_STREAM_MESSAGE, env = "TERMINAL_MESSAGE")]
    pub terminal_message: String,

    /// Log format: "text" for human-readable, "json" for structured.
    #[arg(long, default_value = "text", env = "LOG_FORMAT")]
    pub log_format: String,
}

impl HarnessConfig {
    /// Defaults overlaid with whatever the environment provides.
    pub fn from_env() -> Self {
        Self::parse_from(["table-replica-e2e"])
    }

    pub fn replica_policy(&self) -> Result<PollPolicy> {
        PollPolicy::from_secs(self.replica_timeout_secs, self.replica_interval_secs)
    }

    pub fn consumed_policy(&self) -> Result<PollPolicy> {
        PollPolicy::from_secs(self.consumed_timeout_secs, self.consumed_interval_secs)
    }

    pub fn terminal_policy(&self) -> Result<PollPolicy> {
        PollPolicy::from_secs(self.terminal_timeout_secs, self.terminal_interval_secs)
    }

    /// Fail fast on settings no poll could run with.
    pub fn validate(&self) -> Result<()> {
        self.replica_policy()?;
        self.consumed_policy()?;
        self.terminal_policy()?;
        Ok(())
    }
}
