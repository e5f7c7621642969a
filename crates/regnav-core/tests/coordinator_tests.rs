use pretty_assertions::assert_eq;
use regnav_client::{CancellationToken, RegistryClient, RegistryError};
use regnav_context::{ArtifactContextStore, Registry, Repository, Tag};
use regnav_core::{
    CoordinationOutcome, LoadIntent, LoadRequestBroker, LoadSource, NavigationCoordinator,
    NavigationError, NavigationEvent, RegistryTagLoader,
};
use regnav_test_utils::{manifest, InMemoryRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

struct Fixture {
    registry: Arc<InMemoryRegistry>,
    store: Arc<ArtifactContextStore>,
    coordinator: Arc<NavigationCoordinator>,
    events: broadcast::Receiver<NavigationEvent>,
}

fn fixture(registry: InMemoryRegistry) -> Fixture {
    let registry = Arc::new(registry);
    let client: Arc<dyn RegistryClient> = registry.clone();
    let store = Arc::new(ArtifactContextStore::new());
    store.set_registry(Some(Registry::new("https://ghcr.io/")));

    let coordinator = Arc::new(NavigationCoordinator::new(
        Arc::clone(&store),
        Arc::clone(&client),
        Arc::new(RegistryTagLoader::new(client)),
        16,
    ));
    let events = coordinator.subscribe();
    Fixture {
        registry,
        store,
        coordinator,
        events,
    }
}

fn app_registry() -> InMemoryRegistry {
    InMemoryRegistry::new()
        .with_repository("org/app", &[("v1", "sha256:aaa"), ("latest", "sha256:bbb")])
        .with_repository("org/tool", &[("edge", "sha256:ccc")])
}

fn typed(reference: &str) -> LoadIntent {
    LoadIntent::new(reference, LoadSource::ReferenceBox)
}

fn drain(rx: &mut broadcast::Receiver<NavigationEvent>) -> Vec<NavigationEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

async fn wait_until_coordinating(coordinator: &NavigationCoordinator) {
    while !coordinator.is_coordinating() {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_tag_reference_full_sequence() {
    let mut fx = fixture(app_registry());

    let outcome = fx
        .coordinator
        .handle_load_completed(&typed("ghcr.io/org/app:v1"), &CancellationToken::new())
        .await;
    assert_eq!(outcome, CoordinationOutcome::Completed);

    let snapshot = fx.store.snapshot();
    assert_eq!(snapshot.repository().map(|r| r.full_path.as_str()), Some("org/app"));
    assert_eq!(snapshot.reference(), "v1");
    assert!(!snapshot.is_digest());

    let events = drain(&mut fx.events);
    assert_eq!(events.len(), 3);
    assert!(matches!(
        &events[0],
        NavigationEvent::RepositorySelectionRequested(r) if r.full_path == "org/app"
    ));
    match &events[1] {
        NavigationEvent::TagsLoaded { repository, tags } => {
            assert_eq!(repository, "org/app");
            let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
            assert_eq!(names, vec!["v1", "latest"]);
        }
        other => panic!("expected TagsLoaded, got {other:?}"),
    }
    assert_eq!(
        events[2],
        NavigationEvent::TagSelectionRequested(Tag::new("v1", "org/app").with_digest("sha256:aaa"))
    );
}

#[tokio::test]
async fn test_listing_not_supported_falls_back_to_minimal_repository() {
    let mut fx = fixture(app_registry().without_catalog());

    let outcome = fx
        .coordinator
        .handle_load_completed(&typed("ghcr.io/org/app:latest"), &CancellationToken::new())
        .await;
    assert_eq!(outcome, CoordinationOutcome::Completed);
    assert_eq!(fx.registry.calls("list_repositories"), 1);

    let events = drain(&mut fx.events);
    assert_eq!(
        events[0],
        NavigationEvent::RepositorySelectionRequested(Repository::minimal("org/app"))
    );
}

#[tokio::test]
async fn test_other_listing_errors_also_fall_back() {
    let fx = fixture(
        app_registry().with_catalog_error(RegistryError::Unauthorized("catalog".into())),
    );

    let outcome = fx
        .coordinator
        .handle_load_completed(&typed("ghcr.io/org/app:v1"), &CancellationToken::new())
        .await;
    assert!(outcome.is_completed());
    assert_eq!(fx.store.repository(), Some(Repository::minimal("org/app")));
}

#[tokio::test]
async fn test_unlisted_path_gets_minimal_repository() {
    let registry = app_registry().with_repository("org/app/nested", &[("v1", "sha256:ddd")]);
    let fx = fixture(registry);

    // "org" exists only as a namespace node of the tree, it was never listed.
    let outcome = fx
        .coordinator
        .handle_load_completed(&typed("ghcr.io/org:v1"), &CancellationToken::new())
        .await;
    assert!(matches!(
        outcome,
        CoordinationOutcome::Aborted(NavigationError::Registry(RegistryError::NotFound(_)))
    ));
    assert_eq!(fx.store.repository(), Some(Repository::minimal("org")));
}

#[tokio::test]
async fn test_cross_registry_aborts_without_touching_store() {
    let mut fx = fixture(app_registry());
    let before = fx.store.snapshot();

    let outcome = fx
        .coordinator
        .handle_load_completed(&typed("docker.io/org/app:v1"), &CancellationToken::new())
        .await;

    assert_eq!(
        outcome,
        CoordinationOutcome::Aborted(NavigationError::CrossRegistry {
            expected: "ghcr.io".into(),
            actual: "docker.io".into(),
        })
    );
    assert_eq!(fx.store.snapshot(), before);
    assert!(drain(&mut fx.events).is_empty());
    assert_eq!(fx.registry.calls("list_repositories"), 0);
}

#[tokio::test]
async fn test_port_is_part_of_registry_identity() {
    let fx = fixture(app_registry());
    let outcome = fx
        .coordinator
        .handle_load_completed(&typed("ghcr.io:5000/org/app:v1"), &CancellationToken::new())
        .await;
    assert!(matches!(outcome, CoordinationOutcome::Aborted(NavigationError::CrossRegistry { .. })));
}

#[tokio::test]
async fn test_without_registry_aborts() {
    let fx = fixture(app_registry());
    fx.store.set_registry(None);

    let outcome = fx
        .coordinator
        .handle_load_completed(&typed("ghcr.io/org/app:v1"), &CancellationToken::new())
        .await;
    assert_eq!(outcome, CoordinationOutcome::Aborted(NavigationError::NoRegistry));
}

#[tokio::test]
async fn test_unparsable_reference_aborts() {
    let fx = fixture(app_registry());
    let outcome = fx
        .coordinator
        .handle_load_completed(&typed("ghcr.io/org/app"), &CancellationToken::new())
        .await;
    assert!(matches!(outcome, CoordinationOutcome::Aborted(NavigationError::Parse(_))));
    assert!(!fx.coordinator.is_coordinating());
}

#[tokio::test]
async fn test_digest_reference_reconciles_with_loaded_tags() {
    let mut fx = fixture(app_registry());
    fx.store.set_manifest(Some(manifest("sha256:BBB")), "org/app").await;

    let outcome = fx
        .coordinator
        .handle_load_completed(&typed("ghcr.io/org/app@sha256:bbb"), &CancellationToken::new())
        .await;
    assert!(outcome.is_completed());

    let snapshot = fx.store.snapshot();
    assert!(snapshot.is_digest());
    assert!(snapshot.tag().is_none());

    let last = drain(&mut fx.events).pop();
    assert_eq!(
        last,
        Some(NavigationEvent::DigestSelectionRequested {
            digest: "sha256:BBB".into(),
            matching_tag: Some(Tag::new("latest", "org/app").with_digest("sha256:bbb")),
        })
    );
}

#[tokio::test]
async fn test_digest_without_manifest_uses_parsed_digest() {
    let mut fx = fixture(app_registry());

    fx.coordinator
        .handle_load_completed(&typed("ghcr.io/org/tool@sha256:fff"), &CancellationToken::new())
        .await;

    let last = drain(&mut fx.events).pop();
    assert_eq!(
        last,
        Some(NavigationEvent::DigestSelectionRequested {
            digest: "sha256:fff".into(),
            matching_tag: None,
        })
    );
}

#[tokio::test]
async fn test_overlapping_signal_is_dropped() {
    let gate = Arc::new(Notify::new());
    let fx = fixture(app_registry().with_tag_gate(Arc::clone(&gate)));

    let first = {
        let coordinator = Arc::clone(&fx.coordinator);
        tokio::spawn(async move {
            coordinator
                .handle_load_completed(&typed("ghcr.io/org/app:v1"), &CancellationToken::new())
                .await
        })
    };
    wait_until_coordinating(&fx.coordinator).await;

    let second = fx
        .coordinator
        .handle_load_completed(&typed("ghcr.io/org/tool:edge"), &CancellationToken::new())
        .await;
    assert_eq!(second, CoordinationOutcome::Dropped);

    gate.notify_one();
    assert_eq!(first.await.unwrap(), CoordinationOutcome::Completed);
    assert_eq!(fx.store.repository().map(|r| r.full_path), Some("org/app".to_string()));
    assert_eq!(fx.registry.calls("list_tags"), 1);
    assert!(!fx.coordinator.is_coordinating());
}

#[tokio::test]
async fn test_cancelled_coordination_commits_nothing() {
    let gate = Arc::new(Notify::new());
    let mut fx = fixture(app_registry().with_tag_gate(gate));
    let before = fx.store.snapshot();
    let cancel = CancellationToken::new();

    let running = {
        let coordinator = Arc::clone(&fx.coordinator);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            coordinator
                .handle_load_completed(&typed("ghcr.io/org/app:v1"), &cancel)
                .await
        })
    };
    wait_until_coordinating(&fx.coordinator).await;
    cancel.cancel();

    assert_eq!(
        running.await.unwrap(),
        CoordinationOutcome::Aborted(NavigationError::Cancelled)
    );
    assert_eq!(fx.store.snapshot(), before);
    assert!(drain(&mut fx.events).is_empty());
    assert!(!fx.coordinator.is_coordinating());
}

#[tokio::test]
async fn test_listener_coordinates_broker_completions() {
    let mut fx = fixture(app_registry());
    let broker = LoadRequestBroker::default();
    let stop = CancellationToken::new();
    let listener = Arc::clone(&fx.coordinator).spawn_listener(broker.subscribe(), stop.clone());

    broker.notify_load_completed("ghcr.io/org/tool:edge", LoadSource::TagSelection);
    broker.notify_load_completed("ghcr.io/org/tool:edge", LoadSource::ReferenceBox);

    let first = tokio::time::timeout(Duration::from_secs(5), fx.events.recv())
        .await
        .expect("coordination event")
        .unwrap();
    assert_eq!(
        first,
        NavigationEvent::RepositorySelectionRequested(Repository::minimal("org/tool"))
    );

    stop.cancel();
    listener.await.unwrap();
}
