pub mod config;
pub mod scenario;

use anyhow::Context;
use claimable_claim::ClaimManager;
use std::path::Path;
use tokio::task::JoinHandle;
use tracing::info;

//
// Re-export
//
pub use claimable_claim::{
    Address, AuthorityState, Call, ClaimError, ClaimEvent, ClaimPolicy, Claimability, Claimable,
};
pub use claimable_devchain::DevChain;
pub use config::Config;
pub use scenario::{Scenario, ScenarioReport, ScenarioRunner, Step};

/// Log every event the manager emits until it is dropped
fn spawn_event_logger(manager: &ClaimManager) -> JoinHandle<usize> {
    let rx = manager.subscribe();
    tokio::spawn(async move {
        let mut count = 0;
        while let Ok(event) = rx.recv().await {
            count += 1;
            info!(event = event.name(), ?event, "Event");
        }
        count
    })
}

/// Run the configured scenario and write its report.
///
/// Returns whether every step matched its expectation.
pub async fn run(config: Config) -> anyhow::Result<bool> {
    let scenario_path = config
        .scenario
        .as_deref()
        .context("No scenario configured")?;
    let scenario = Scenario::from_file(Path::new(scenario_path))?;
    info!(
        scenario = scenario_path,
        steps = scenario.steps.len(),
        "Loaded scenario"
    );

    let mut chain = scenario.deploy(config.genesis_time, config.policy())?;
    let logger = spawn_event_logger(chain.manager());

    let report = ScenarioRunner::new(&mut chain).run(&scenario);

    // Dropping the chain closes the subscription
    drop(chain);
    let logged = logger.await.context("Event logger task failed")?;
    info!(logged, passed = report.passed, "Scenario complete");

    let content = serde_json::to_string_pretty(&report)?;
    match &config.output {
        Some(output) => {
            tokio::fs::write(output, content)
                .await
                .with_context(|| format!("Failed to write report to {output}"))?;
            info!(output, "Report written");
        }
        None => println!("{content}"),
    }

    Ok(report.passed)
}
