use anyhow::{Context, anyhow};
use claimable_claim::{
    Address, AuthorityState, Call, ClaimEvent, ClaimPolicy, Claimability, Timestamp,
};
use claimable_devchain::{DevChain, SnapshotId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// A deployment followed by a scripted list of steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub deploy: Deployment,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub owner: Address,
    #[serde(default)]
    pub claimers: Vec<Address>,
    /// Absolute expiration time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<Timestamp>,
    /// Expiration relative to the genesis time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_on_claim: Option<bool>,
}

impl Deployment {
    fn expiration_time(&self, genesis: Timestamp) -> anyhow::Result<Timestamp> {
        match (self.expiration_time, self.expires_in) {
            (Some(_), Some(_)) => Err(anyhow!(
                "Set either `expiration_time` or `expires_in`, not both"
            )),
            (Some(expiration_time), None) => Ok(expiration_time),
            (None, Some(expires_in)) => Ok(genesis.saturating_add(expires_in)),
            (None, None) => Ok(0),
        }
    }

    /// Scenario values override the configured policy
    fn policy(&self, defaults: ClaimPolicy) -> ClaimPolicy {
        ClaimPolicy {
            ping_interval: self.ping_interval.unwrap_or(defaults.ping_interval),
            reset_on_claim: self.reset_on_claim.unwrap_or(defaults.reset_on_claim),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Submit a call; `expect_error` names the error code the call must fail with
    Call {
        caller: Address,
        call: Call,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect_error: Option<String>,
    },
    Advance {
        seconds: u64,
    },
    Snapshot {
        name: String,
    },
    Revert {
        name: String,
    },
    Read,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Committed {
        events: Vec<ClaimEvent>,
    },
    Rejected {
        code: String,
        message: String,
    },
    Advanced {
        now: Timestamp,
    },
    SnapshotTaken {
        id: String,
    },
    Reverted {
        now: Timestamp,
    },
    State {
        state: AuthorityState,
        claimability: Claimability,
    },
    Failed {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub timestamp: Timestamp,
    pub input: Step,
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Whether the outcome matched the step's expectation
    pub matched: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub passed: bool,
    pub steps: Vec<StepReport>,
    pub events: Vec<ClaimEvent>,
    pub final_state: AuthorityState,
}

impl Scenario {
    /// Load a scenario from a TOML file, or JSON when the extension is `.json`
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;

        let is_json = path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
        let scenario = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON scenario {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML scenario {}", path.display()))?
        };

        Ok(scenario)
    }

    /// Deploy the scenario's machine on a fresh devchain
    pub fn deploy(&self, genesis: Timestamp, defaults: ClaimPolicy) -> anyhow::Result<DevChain> {
        let expiration_time = self.deploy.expiration_time(genesis)?;
        let policy = self.deploy.policy(defaults);

        DevChain::deploy_at(
            genesis,
            self.deploy.owner,
            self.deploy.claimers.iter().copied(),
            expiration_time,
            policy,
        )
        .with_context(|| format!("Failed to deploy with owner {}", self.deploy.owner))
    }
}

/// Runs scenario steps against a devchain, tracking named snapshots
pub struct ScenarioRunner<'a> {
    chain: &'a mut DevChain,
    snapshots: HashMap<String, SnapshotId>,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(chain: &'a mut DevChain) -> Self {
        Self {
            chain,
            snapshots: HashMap::new(),
        }
    }

    pub fn run(mut self, scenario: &Scenario) -> ScenarioReport {
        let steps = scenario
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| self.run_step(index, step))
            .collect::<Vec<_>>();

        let passed = steps.iter().all(|report| report.matched);
        info!(
            name = scenario.name.as_deref().unwrap_or("unnamed"),
            steps = steps.len(),
            passed,
            "Scenario finished"
        );

        let manager = self.chain.manager();
        ScenarioReport {
            name: scenario.name.clone(),
            passed,
            steps,
            events: manager.events(),
            final_state: manager.read(),
        }
    }

    fn run_step(&mut self, index: usize, step: &Step) -> StepReport {
        debug!(index, ?step, "Running step");

        let (outcome, matched) = match step {
            Step::Call {
                caller,
                call,
                expect_error,
            } => {
                let outcome = match self.chain.send(*caller, call) {
                    Ok(events) => Outcome::Committed { events },
                    Err(error) => Outcome::Rejected {
                        code: error.code().to_string(),
                        message: error.to_string(),
                    },
                };
                let matched = match (&outcome, expect_error) {
                    (Outcome::Committed { .. }, None) => true,
                    (Outcome::Rejected { code, .. }, Some(expected)) => code == expected,
                    _ => false,
                };
                (outcome, matched)
            }
            Step::Advance { seconds } => {
                let now = self.chain.increase(*seconds);
                (Outcome::Advanced { now }, true)
            }
            Step::Snapshot { name } => {
                let id = self.chain.snapshot();
                self.snapshots.insert(name.clone(), id);
                (Outcome::SnapshotTaken { id: id.to_string() }, true)
            }
            Step::Revert { name } => match self.revert(name) {
                Ok(()) => (
                    Outcome::Reverted {
                        now: self.chain.timestamp(),
                    },
                    true,
                ),
                Err(error) => (
                    Outcome::Failed {
                        message: format!("{error:#}"),
                    },
                    false,
                ),
            },
            Step::Read => {
                let manager = self.chain.manager();
                (
                    Outcome::State {
                        state: manager.read(),
                        claimability: manager.is_claimable(),
                    },
                    true,
                )
            }
        };

        if !matched {
            warn!(index, ?step, ?outcome, "Step did not match expectation");
        }

        StepReport {
            index,
            timestamp: self.chain.timestamp(),
            input: step.clone(),
            outcome,
            matched,
        }
    }

    fn revert(&mut self, name: &str) -> anyhow::Result<()> {
        let id = self
            .snapshots
            .remove(name)
            .ok_or_else(|| anyhow!("No snapshot named '{name}'"))?;
        self.chain.revert(id)?;

        // Snapshots taken after this one are gone from the chain as well
        self.snapshots.retain(|_, later| *later < id);
        Ok(())
    }
}
