//! Two installations sharing one remote.
//!
//! Client A publishes from its bundled root, client B picks the change up
//! with a merge pull, then the roles swap. Calls alternate between the
//! caller's thread and the background worker.

use datasync_core::{
    ErrorKind, PullPolicy, SyncOrchestrator, SyncSettings, spawn_pull, spawn_push,
};
use datasync_git::{RepositoryHandle, SchemePolicy};
use datasync_test_utils::{RemoteFixture, SyncFixture};
use pretty_assertions::assert_eq;

const FILES: &str = "bangumi.json,current_bangumi.json";

fn settings_for(fx: &SyncFixture, remote: &RemoteFixture, user: &str) -> SyncSettings {
    let mut settings = SyncSettings::default();
    settings.git.remote.url = remote.url();
    settings.git.username = user.to_string();
    settings.git.password = "token".to_string();
    settings.git.data.files = FILES.to_string();
    settings.paths.user_data = Some(fx.user_root());
    settings.paths.bundled_defaults = Some(fx.bundled_root());
    settings
}

fn orchestrator() -> SyncOrchestrator {
    SyncOrchestrator::new().with_scheme_policy(SchemePolicy::AllowLocalFile)
}

fn start(settings: &SyncSettings) -> RepositoryHandle {
    let startup = orchestrator().startup(settings);
    assert!(startup.result.success, "{}", startup.result.message);
    startup.handle.unwrap()
}

fn seeded_remote() -> RemoteFixture {
    let remote = RemoteFixture::new();
    remote.commit_files(
        "main",
        &[("bangumi.json", "[]"), ("current_bangumi.json", "{}")],
        "initial data",
    );
    remote
}

#[test]
fn edits_travel_between_clients() {
    let remote = seeded_remote();
    let (fx_a, fx_b) = (SyncFixture::new(), SyncFixture::new());
    let (settings_a, settings_b) = (
        settings_for(&fx_a, &remote, "alice"),
        settings_for(&fx_b, &remote, "bob"),
    );
    let handle_a = start(&settings_a);
    let handle_b = start(&settings_b);

    fx_a.write_bundled("bangumi.json", "[\"show-1\"]");
    let (handle_a, pushed) = spawn_push(orchestrator(), handle_a, settings_a.clone(), "add show")
        .unwrap()
        .join()
        .unwrap();
    assert!(pushed.success, "{}", pushed.message);
    assert_eq!(remote.commit_count("main"), 2);

    let pulled = orchestrator().pull(&handle_b, &settings_b, PullPolicy::Merge);
    assert!(pulled.success, "{}", pulled.message);
    assert!(pulled.files_changed.contains("bangumi.json"));
    fx_b.assert_user_file("bangumi.json", "[\"show-1\"]");
    fx_b.assert_bundled_file("bangumi.json", "[\"show-1\"]");

    fx_b.write_bundled("current_bangumi.json", "{\"watching\":\"show-1\"}");
    let pushed = orchestrator().push(&handle_b, &settings_b, "");
    assert!(pushed.success, "{}", pushed.message);
    assert_eq!(remote.commit_count("main"), 3);

    let (_, pulled) = spawn_pull(orchestrator(), handle_a, settings_a, PullPolicy::Merge)
        .unwrap()
        .join()
        .unwrap();
    assert!(pulled.success, "{}", pulled.message);
    fx_a.assert_user_file("current_bangumi.json", "{\"watching\":\"show-1\"}");
    fx_a.assert_user_file("bangumi.json", "[\"show-1\"]");
}

#[test]
fn stale_client_push_fails_until_it_pulls() {
    let remote = seeded_remote();
    let (fx_a, fx_b) = (SyncFixture::new(), SyncFixture::new());
    let (settings_a, settings_b) = (
        settings_for(&fx_a, &remote, "alice"),
        settings_for(&fx_b, &remote, "bob"),
    );
    let handle_a = start(&settings_a);
    let handle_b = start(&settings_b);

    fx_a.write_bundled("bangumi.json", "[\"from-a\"]");
    assert!(orchestrator().push(&handle_a, &settings_a, "a").success);

    fx_b.write_bundled("current_bangumi.json", "{\"from\":\"b\"}");
    let rejected = orchestrator().push(&handle_b, &settings_b, "b");
    assert!(!rejected.success);
    assert_eq!(rejected.error_kind, Some(ErrorKind::PushFailed), "{}", rejected.message);
    assert_eq!(remote.commit_count("main"), 2);

    // Different files on each side merge cleanly.
    let pulled = orchestrator().pull(&handle_b, &settings_b, PullPolicy::Merge);
    assert!(pulled.success, "{}", pulled.message);
    fx_b.assert_user_file("bangumi.json", "[\"from-a\"]");
    fx_b.assert_user_file("current_bangumi.json", "{\"from\":\"b\"}");

    // The next edit publishes the merge along with the earlier commit.
    fx_b.write_bundled("current_bangumi.json", "{\"from\":\"b\",\"v\":2}");
    let retried = orchestrator().push(&handle_b, &settings_b, "b again");
    assert!(retried.success, "{}", retried.message);
    assert_eq!(
        remote.file_at_tip("main", "current_bangumi.json").unwrap(),
        b"{\"from\":\"b\",\"v\":2}"
    );
    assert_eq!(remote.file_at_tip("main", "bangumi.json").unwrap(), b"[\"from-a\"]");
}

#[test]
fn force_pull_recovers_a_conflicted_client() {
    let remote = seeded_remote();
    let (fx_a, fx_b) = (SyncFixture::new(), SyncFixture::new());
    let (settings_a, settings_b) = (
        settings_for(&fx_a, &remote, "alice"),
        settings_for(&fx_b, &remote, "bob"),
    );
    let handle_a = start(&settings_a);
    let handle_b = start(&settings_b);

    fx_a.write_bundled("bangumi.json", "[\"a-version\"]");
    assert!(orchestrator().push(&handle_a, &settings_a, "a").success);

    fx_b.write_bundled("bangumi.json", "[\"b-version\"]");
    let rejected = orchestrator().push(&handle_b, &settings_b, "b");
    assert_eq!(rejected.error_kind, Some(ErrorKind::PushFailed), "{}", rejected.message);

    let conflicted = orchestrator().pull(&handle_b, &settings_b, PullPolicy::Merge);
    assert_eq!(
        conflicted.error_kind,
        Some(ErrorKind::MergeConflict),
        "{}",
        conflicted.message
    );

    let forced = orchestrator().pull(&handle_b, &settings_b, PullPolicy::Force);
    assert!(forced.success, "{}", forced.message);
    fx_b.assert_user_file("bangumi.json", "[\"a-version\"]");
    fx_b.assert_bundled_file("bangumi.json", "[\"a-version\"]");
    assert!(
        !handle_b
            .has_local_changes(["bangumi.json", "current_bangumi.json"])
            .unwrap()
    );
}
