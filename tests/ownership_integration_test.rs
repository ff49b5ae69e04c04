use claimable::{Address, Call, ClaimError, ClaimEvent, ClaimPolicy, Config, Scenario};
use claimable_devchain::{
    DevChain, GENESIS_TIME, accounts, duration, expect_rejected, expect_rejected_with,
};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

fn deploy() -> DevChain {
    let [owner, ..] = accounts();
    DevChain::deploy(owner, [], 0, ClaimPolicy::new(duration::hours(1))).unwrap()
}

#[test]
fn test_checks_owner() {
    let [owner, ..] = accounts();
    let chain = deploy();
    assert_eq!(chain.manager().owner(), owner);
}

#[test]
fn test_only_owner_can_change_claimers() {
    let [owner, guest, stranger, ..] = accounts();
    let chain = deploy();
    let before = chain.manager().read();

    for call in [
        Call::AddClaimer { claimer: guest },
        Call::RemoveClaimer { claimer: guest },
        Call::SetClaimers {
            claimers: vec![guest, stranger],
        },
    ] {
        let error = expect_rejected(chain.send(stranger, &call));
        assert_eq!(error, ClaimError::Unauthorized);
    }
    assert_eq!(chain.manager().read(), before);

    chain
        .send(owner, &Call::SetClaimers {
            claimers: vec![guest, stranger, guest],
        })
        .unwrap();
    let claimers = chain.manager().read().claimers;
    assert_eq!(claimers.len(), 2);
    assert!(claimers.contains(&guest));
    assert!(claimers.contains(&stranger));
}

#[test]
fn test_only_owner_can_change_expiration_time() {
    let [owner, _, stranger, ..] = accounts();
    let chain = deploy();
    chain
        .manager()
        .set_expiration_time(owner, GENESIS_TIME + duration::days(1))
        .unwrap();

    expect_rejected_with(
        chain.manager().set_expiration_time(stranger, 0),
        "Unauthorized",
    );
    assert_eq!(
        chain.manager().expiration_time(),
        GENESIS_TIME + duration::days(1)
    );
}

#[test]
fn test_expiration_time_is_correct_after_a_ping() {
    let [owner, ..] = accounts();
    let chain = deploy();

    chain.increase(duration::minutes(5));
    chain.manager().ping(owner).unwrap();
    assert_eq!(
        chain.manager().expiration_time(),
        chain.timestamp() + duration::hours(1)
    );
    assert!(!chain.manager().is_claimable().time_expired);
}

#[test]
fn test_claimable_after_time_passes() {
    let [owner, ..] = accounts();
    let chain = deploy();

    let expiration_time = chain.timestamp() + duration::hours(1);
    chain
        .manager()
        .set_expiration_time(owner, expiration_time)
        .unwrap();
    assert!(!chain.manager().is_claimable().time_expired);

    chain.increase(duration::hours(2));
    assert!(chain.manager().is_claimable().time_expired);
}

#[test]
fn test_claiming_with_empty_claim_list() {
    let [owner, _, _, fourth, _] = accounts();
    let mut chain = deploy();
    chain
        .manager()
        .set_expiration_time(owner, GENESIS_TIME + duration::hours(1))
        .unwrap();

    expect_rejected_with(chain.send(fourth, &Call::Claim), "NotYetClaimable");

    chain.increase(duration::hours(1));
    // Anyone may claim when no claimers are listed
    for caller in accounts().into_iter().skip(1) {
        let id = chain.snapshot();
        chain.send(caller, &Call::Claim).unwrap();
        assert_eq!(chain.manager().owner(), caller);
        chain.revert(id).unwrap();
    }
    assert_eq!(chain.manager().owner(), owner);
}

#[test]
fn test_only_specified_claimers_can_claim_after_expiration() {
    let [owner, guest, stranger, ..] = accounts();
    let chain = deploy();
    chain.manager().add_claimer(owner, guest).unwrap();
    chain
        .manager()
        .set_expiration_time(owner, GENESIS_TIME + duration::hours(1))
        .unwrap();

    chain.increase(duration::hours(2));

    expect_rejected_with(chain.send(stranger, &Call::Claim), "NotAuthorizedClaimer");
    assert_eq!(chain.manager().owner(), owner);

    chain.send(guest, &Call::Claim).unwrap();
    assert_eq!(chain.manager().owner(), guest);

    // Previous owner is neither owner nor claimer now
    expect_rejected_with(chain.send(owner, &Call::Claim), "NotAuthorizedClaimer");
    expect_rejected_with(chain.manager().ping(owner), "Unauthorized");

    // The new owner may reconfigure
    chain.manager().add_claimer(guest, owner).unwrap();
    chain.send(owner, &Call::Claim).unwrap();
    assert_eq!(chain.manager().owner(), owner);
}

#[test]
fn test_ownership_transferred_event_after_a_claim() {
    let [owner, guest, ..] = accounts();
    let chain = deploy();
    let rx = chain.manager().subscribe();

    chain.manager().add_claimer(owner, guest).unwrap();
    chain.increase(1);
    let events = chain.send(guest, &Call::Claim).unwrap();

    let transfer = ClaimEvent::OwnershipTransferred {
        previous_owner: owner,
        new_owner: guest,
    };
    assert_eq!(events, vec![transfer]);
    assert_eq!(
        chain
            .manager()
            .events()
            .iter()
            .filter(|event| matches!(event, ClaimEvent::OwnershipTransferred { .. }))
            .count(),
        1
    );

    assert_eq!(
        rx.try_recv().unwrap(),
        ClaimEvent::ClaimerAdded { claimer: guest }
    );
    assert_eq!(rx.try_recv().unwrap(), transfer);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_rejections_emit_no_events() {
    let [owner, guest, stranger, ..] = accounts();
    let chain = deploy();
    chain.manager().add_claimer(owner, guest).unwrap();
    chain
        .manager()
        .set_expiration_time(owner, GENESIS_TIME + 10)
        .unwrap();
    let before = chain.manager().events().len();

    expect_rejected(chain.send(stranger, &Call::Ping));
    expect_rejected(chain.send(guest, &Call::Claim));
    chain.increase(10);
    expect_rejected(chain.send(stranger, &Call::Claim));
    expect_rejected(chain.send(owner, &Call::AddClaimer {
        claimer: Address::ZERO,
    }));

    assert_eq!(chain.manager().events().len(), before);
}

#[test]
fn test_reset_on_claim_hands_over_fresh_window() {
    let [owner, guest, stranger, ..] = accounts();
    let policy = ClaimPolicy::new(duration::days(1)).with_reset_on_claim(true);
    let chain = DevChain::deploy(owner, [guest, stranger], GENESIS_TIME, policy).unwrap();

    chain.send(guest, &Call::Claim).unwrap();

    let state = chain.manager().read();
    assert_eq!(state.owner, guest);
    assert!(state.claimers.is_empty());
    assert_eq!(state.expiration_time, GENESIS_TIME + duration::days(1));
    expect_rejected_with(chain.send(stranger, &Call::Claim), "NotYetClaimable");
}

#[test]
fn test_handover_scenario_file() {
    let scenario = Scenario::from_file(Path::new("scenarios/handover.toml")).unwrap();
    let mut chain = scenario
        .deploy(GENESIS_TIME, ClaimPolicy::default())
        .unwrap();

    let report = claimable::ScenarioRunner::new(&mut chain).run(&scenario);

    assert!(report.passed, "{report:#?}");
    let [_, successor, ..] = accounts();
    assert_eq!(report.final_state.owner, successor);
    assert_eq!(report.events.len(), 3);
}

#[tokio::test]
async fn test_run_writes_report() {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis();
    let output = std::env::temp_dir().join(format!("claimable-report-{now}.json"));

    let config = Config {
        scenario: Some("scenarios/handover.toml".to_string()),
        output: Some(output.display().to_string()),
        ..Default::default()
    };

    let passed = claimable::run(config).await.unwrap();
    assert!(passed);

    let content = tokio::fs::read_to_string(&output).await.unwrap();
    let report: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(report["name"], "handover");
    assert_eq!(report["passed"], true);
    assert_eq!(
        report["final_state"]["owner"],
        "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1"
    );

    let _ = tokio::fs::remove_file(&output).await;
}

#[tokio::test]
async fn test_run_missing_scenario_fails() {
    let config = Config {
        scenario: Some("scenarios/does-not-exist.toml".to_string()),
        ..Default::default()
    };

    let error = claimable::run(config).await.unwrap_err();
    assert!(error.to_string().contains("Failed to read scenario"));
}
