mod support;

use roadlore_application::{
    ExplorerError, Explorer, Phase, Session, SessionCommand, SessionHandle,
};
use roadlore_audio::{AudioChannel, RecordingDevice};
use roadlore_context::{ContextResult, LookupError, Position};
use roadlore_events::{event_names, InMemoryEventBus};
use roadlore_geo::FeedLocationSource;
use std::sync::Arc;
use support::*;
use tokio::task::JoinHandle;

struct Running {
    explorer: Explorer,
    feed: FeedLocationSource,
    handle: SessionHandle,
    bus: Arc<InMemoryEventBus>,
    device: RecordingDevice,
    task: JoinHandle<Explorer>,
}

fn start(context: Arc<ScriptedContext>, narrator: Arc<CountingNarrator>) -> Running {
    let feed = FeedLocationSource::new();
    let bus = Arc::new(InMemoryEventBus::new());
    let device = RecordingDevice::new();
    let explorer = Explorer::builder()
        .context_provider(context)
        .narration_provider(narrator)
        .audio(AudioChannel::new(Arc::new(device.clone())))
        .event_bus(bus.clone())
        .build();

    let (session, handle) = Session::new(explorer.clone(), Arc::new(feed.clone()));
    let task = tokio::spawn(session.with_event_bus(bus.clone()).run());

    Running {
        explorer,
        feed,
        handle,
        bus,
        device,
        task,
    }
}

/// Wait until the session has applied a mode change; the watch is live then.
async fn driving(run: &Running, on: bool) {
    run.handle.set_driving(on).await.unwrap();
    eventually(|| run.explorer.mode().is_driving() == on).await;
}

async fn tracking(run: &Running) {
    run.handle.set_tracking(true).await.unwrap();
    eventually(|| run.explorer.is_tracking()).await;
}

fn nearby(step: f64) -> Position {
    Position::new(-23.5505 + step * 0.001, -46.6333)
}

#[tokio::test]
async fn test_one_shot_read_at_start() {
    let run = start(
        ScriptedContext::always(ContextResult::default()),
        CountingNarrator::new(),
    );

    eventually(|| run.feed.subscriber_count() == 1).await;
    run.feed.push(sao_paulo());

    eventually(|| run.explorer.position() == Some(sao_paulo())).await;
    assert_eq!(run.explorer.phase(), Phase::Ready);
    eventually(|| run.feed.subscriber_count() == 0).await;

    run.handle.shutdown().await.unwrap();
    run.task.await.unwrap();
}

#[tokio::test]
async fn test_manual_explore_command() {
    let context = ScriptedContext::always(old_square());
    let run = start(context.clone(), CountingNarrator::new());

    tracking(&run).await;
    run.feed.push(sao_paulo());
    eventually(|| run.explorer.position().is_some()).await;

    run.handle.explore().await.unwrap();
    eventually(|| run.explorer.snapshot().highlight_pending).await;
    assert_eq!(context.call_count(), 1);

    run.handle
        .send(SessionCommand::SelectPlace("p1".into()))
        .await
        .unwrap();
    run.handle.send(SessionCommand::DismissHighlight).await.unwrap();
    eventually(|| !run.explorer.snapshot().highlight_pending).await;
    assert_eq!(
        run.explorer.snapshot().selected_place.map(|p| p.id),
        Some("p1".to_string())
    );

    run.handle.shutdown().await.unwrap();
    let explorer = run.task.await.unwrap();
    assert_eq!(explorer.snapshot().place_ids(), vec!["p1"]);
}

#[tokio::test]
async fn test_driving_auto_trigger_fires_once_per_epoch() {
    let context = ScriptedContext::always(ContextResult::new("Highway."));
    let run = start(context.clone(), CountingNarrator::new());

    driving(&run, true).await;

    for step in 0..5 {
        run.feed.push(nearby(step as f64));
    }
    eventually(|| run.explorer.position() == Some(nearby(4.0))).await;
    eventually(|| run.explorer.phase() == Phase::Ready).await;
    assert_eq!(context.call_count(), 1);

    // Leaving and re-entering driving starts a new epoch at the current position.
    driving(&run, false).await;
    driving(&run, true).await;
    eventually(|| context.call_count() == 2).await;
    assert_eq!(context.calls()[1].0, nearby(4.0));

    run.handle.shutdown().await.unwrap();
    run.task.await.unwrap();
}

#[tokio::test]
async fn test_deferred_trigger_retries_after_failed_lookup() {
    let context = ScriptedContext::new(vec![
        Err(LookupError::Provider("503".into())),
        Ok(ContextResult::new("Second try.")),
    ]);
    let gate = Gate::new();
    context.gate_next(gate.clone());
    let run = start(context.clone(), CountingNarrator::new());

    driving(&run, true).await;
    run.feed.push(nearby(0.0));
    gate.wait_entered().await;

    run.feed.push(nearby(1.0));
    eventually(|| run.explorer.position() == Some(nearby(1.0))).await;
    assert_eq!(context.call_count(), 1);

    gate.open();
    eventually(|| context.call_count() == 2).await;
    eventually(|| run.explorer.phase() == Phase::Ready).await;
    assert_eq!(context.calls()[1].0, nearby(1.0));
    assert_eq!(run.explorer.snapshot().narrative, "Second try.");

    run.handle.shutdown().await.unwrap();
    run.task.await.unwrap();
}

#[tokio::test]
async fn test_configuration_missing_stops_location_updates() {
    let context = ScriptedContext::new(vec![Err(LookupError::CredentialsMissing)]);
    let run = start(context.clone(), CountingNarrator::new());

    driving(&run, true).await;
    run.feed.push(sao_paulo());

    eventually(|| run.explorer.phase() == Phase::ConfigurationMissing).await;
    eventually(|| run.feed.subscriber_count() == 0).await;

    // Toggling modes does not resubscribe.
    run.handle.set_tracking(true).await.unwrap();
    run.handle.explore().await.unwrap();
    run.handle.shutdown().await.unwrap();
    run.task.await.unwrap();

    eventually(|| run.feed.subscriber_count() == 0).await;
    assert_eq!(context.call_count(), 1);
    assert_eq!(run.bus.count(event_names::CONFIGURATION_MISSING), 1);
}

#[tokio::test]
async fn test_permission_denied_tears_down_watch() {
    let run = start(
        ScriptedContext::always(ContextResult::default()),
        CountingNarrator::new(),
    );

    tracking(&run).await;
    run.feed.deny_permission();

    eventually(|| run.explorer.phase() == Phase::Error).await;
    eventually(|| run.feed.subscriber_count() == 0).await;
    assert!(matches!(
        run.explorer.snapshot().last_error,
        Some(ExplorerError::LocationUnavailable(_))
    ));
    assert_eq!(run.bus.location_failures().len(), 1);

    run.handle.send(SessionCommand::RetryLocation).await.unwrap();
    eventually(|| run.feed.subscriber_count() >= 1).await;
    run.feed.push(sao_paulo());
    eventually(|| run.explorer.position() == Some(sao_paulo())).await;

    run.handle.shutdown().await.unwrap();
    run.task.await.unwrap();
}

#[tokio::test]
async fn test_playback_changes_are_published() {
    let narrator = CountingNarrator::new();
    let run = start(ScriptedContext::always(old_square()), narrator.clone());

    driving(&run, true).await;
    run.feed.push(sao_paulo());

    eventually(|| run.device.start_count() == 1).await;
    eventually(|| run.bus.playback().contains(&true)).await;
    assert_eq!(narrator.texts(), vec!["Founded in 1560."]);

    driving(&run, false).await;
    eventually(|| run.bus.playback().last() == Some(&false)).await;
    assert!(run.device.active_sources().is_empty());

    run.handle.shutdown().await.unwrap();
    run.task.await.unwrap();
}

#[tokio::test]
async fn test_dropping_handles_ends_session() {
    let run = start(
        ScriptedContext::always(ContextResult::default()),
        CountingNarrator::new(),
    );
    let Running { handle, task, .. } = run;

    drop(handle);

    let explorer = task.await.unwrap();
    assert_eq!(explorer.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_missing_configuration_never_subscribes_to_location() {
    let context = ScriptedContext::always(old_square());
    let feed = FeedLocationSource::new();
    let explorer = Explorer::builder().context_provider(context.clone()).build();
    explorer.configuration_missing();

    let (session, handle) = Session::new(explorer.clone(), Arc::new(feed.clone()));
    let task = tokio::spawn(session.run());

    handle.set_driving(true).await.unwrap();
    handle.set_tracking(true).await.unwrap();
    eventually(|| explorer.mode().is_driving() && explorer.is_tracking()).await;
    handle.explore().await.unwrap();
    feed.push(sao_paulo());

    assert_eq!(feed.subscriber_count(), 0);
    handle.shutdown().await.unwrap();
    let explorer = task.await.unwrap();

    assert_eq!(explorer.phase(), Phase::ConfigurationMissing);
    assert!(explorer.position().is_none());
    assert_eq!(context.call_count(), 0);
}
