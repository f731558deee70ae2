mod common;

use common::{Harness, STALE_TOKEN, wait_until};
use expensa_auth::ReauthenticatingClient;
use expensa_auth_core::{AuthError, DispatchError, Response, json_code};
use expensa_test_support::fixtures;
use expensa_test_support::mocks::{ScriptedReply, ScriptedTransport};
use tokio::task::JoinSet;

#[tokio::test]
async fn expired_session_is_refreshed_and_replayed() -> anyhow::Result<()> {
    let h = Harness::new(ScriptedTransport::new())?;
    h.transport.script_token("tok2");
    let client = ReauthenticatingClient::new(h.gate.clone());

    let response = client
        .call("OpenReport", fixtures::params(&[("reportID", "42")]))
        .await?;

    assert!(response.is_success());
    let tokens: Vec<_> = h
        .transport
        .sent_named("OpenReport")
        .iter()
        .map(|sent| sent.auth_token().map(str::to_string))
        .collect();
    assert_eq!(
        tokens,
        vec![Some(STALE_TOKEN.to_string()), Some("tok2".to_string())]
    );
    assert_eq!(h.transport.authenticate_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn replay_happens_at_most_once() -> anyhow::Result<()> {
    let h = Harness::new(ScriptedTransport::new())?;
    h.transport.script_token("tok2");
    for _ in 0..2 {
        h.transport
            .script_command("OpenReport", Response::with_code(json_code::NOT_AUTHENTICATED));
    }
    let client = ReauthenticatingClient::new(h.gate.clone());

    let response = client.call("OpenReport", fixtures::params(&[])).await?;

    assert_eq!(response.json_code, json_code::NOT_AUTHENTICATED);
    assert_eq!(h.transport.sent_named("OpenReport").len(), 2);
    assert_eq!(h.transport.authenticate_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn terminal_failure_surfaces_without_replay() -> anyhow::Result<()> {
    let h = Harness::new(ScriptedTransport::new())?;
    h.transport
        .script_authenticate(ScriptedReply::Respond(Response::with_code(401)));
    let client = ReauthenticatingClient::new(h.gate.clone());

    let outcome = client.call("OpenReport", fixtures::params(&[])).await;

    assert!(matches!(
        outcome,
        Err(DispatchError::Auth(AuthError::Terminal { .. }))
    ));
    assert_eq!(h.transport.sent_named("OpenReport").len(), 1);
    assert_eq!(h.redirector.count(), 1);
    Ok(())
}

#[tokio::test]
async fn successful_responses_pass_through() -> anyhow::Result<()> {
    let h = Harness::new(ScriptedTransport::new().accepting(STALE_TOKEN))?;
    let client = ReauthenticatingClient::new(h.gate.clone());

    let response = client.call("OpenReport", fixtures::params(&[])).await?;

    assert!(response.is_success());
    assert_eq!(h.transport.authenticate_calls(), 0);
    assert_eq!(client.gate().session().auth_token.as_deref(), Some(STALE_TOKEN));
    Ok(())
}

#[tokio::test]
async fn concurrent_expirations_share_one_cycle() -> anyhow::Result<()> {
    const CALLERS: usize = 5;
    let h = Harness::new(ScriptedTransport::latched())?;
    h.transport.script_token("tok2");
    let client = ReauthenticatingClient::new(h.gate.clone());

    let mut calls = JoinSet::new();
    for index in 0..CALLERS {
        let client = client.clone();
        calls.spawn(async move {
            let report = index.to_string();
            client
                .call("OpenReport", fixtures::params(&[("reportID", report.as_str())]))
                .await
        });
    }

    // Late callers either join the cycle or wait at the gate.
    let metrics = h.metrics.clone();
    wait_until(move || {
        let snapshot = metrics.snapshot();
        snapshot.cycle_joins_total + u64::try_from(snapshot.held_requests).unwrap_or(0)
            >= CALLERS as u64 - 1
    })
    .await;
    h.transport.release_authenticate(1);

    while let Some(result) = calls.join_next().await {
        assert!(result??.is_success());
    }
    assert_eq!(h.transport.authenticate_calls(), 1);
    assert_eq!(h.store.writes(), 1);
    let replayed: Vec<_> = h
        .transport
        .sent_named("OpenReport")
        .into_iter()
        .filter(|sent| sent.auth_token() == Some("tok2"))
        .collect();
    assert_eq!(replayed.len(), CALLERS);
    Ok(())
}
