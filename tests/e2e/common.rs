//! Shared harness for the live tests.  Configuration comes from the same
//! environment variables the runner binary reads.

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{Api, Client, CustomResourceExt};
use tracing_subscriber::EnvFilter;

use table_replica_e2e::config::HarnessConfig;
use table_replica_e2e::control_plane::KubeControlPlane;
use table_replica_e2e::crd::table::Table;
use table_replica_e2e::driver::ScenarioDriver;
use table_replica_e2e::table_status::DynamoDbTableStatus;

pub type LiveDriver = ScenarioDriver<KubeControlPlane, DynamoDbTableStatus>;

pub struct TestContext {
    pub driver: LiveDriver,
}

impl TestContext {
    /// Connect to the cluster from the ambient kubeconfig and make sure the
    /// Table CRD is served before any scenario runs.
    pub async fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("warn,table_replica_e2e=debug"))
            .with_test_writer()
            .try_init();

        let config = HarnessConfig::from_env();
        let client = Client::try_default()
            .await
            .expect("no usable kubeconfig or in-cluster config");

        let crd_name = Table::crd_name();
        let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
        assert!(
            crds.get_opt(crd_name).await.expect("listing CRDs").is_some(),
            "CRD {crd_name} is not installed; deploy the controller first"
        );

        let tables = DynamoDbTableStatus::for_region(&config.aws_region).await;
        let driver = ScenarioDriver::new(KubeControlPlane::new(client), tables, config)
            .expect("invalid harness configuration");
        Self { driver }
    }
}
