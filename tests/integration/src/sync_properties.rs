//! End-to-end checks of the sync engine's guarantees
//!
//! Every scenario runs the full engine (settings -> repository -> remote)
//! against a local bare remote reached through `file://`.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use datasync_core::{ErrorKind, PullPolicy, SyncOrchestrator, SyncSettings};
use datasync_fs::NormalizedPath;
use datasync_git::{RemoteConfig, RepositoryHandle, SchemePolicy};
use datasync_test_utils::{RemoteFixture, SyncFixture};
use pretty_assertions::assert_eq;

/// One client: its user/bundled roots, its settings and an orchestrator.
struct Client {
    fx: SyncFixture,
    settings: SyncSettings,
    orchestrator: SyncOrchestrator,
}

impl Client {
    fn new(remote: &RemoteFixture, files: &str) -> Self {
        let fx = SyncFixture::new();
        let mut settings = SyncSettings::default();
        settings.git.remote.url = remote.url();
        settings.git.username = "tester".to_string();
        settings.git.password = "secret".to_string();
        settings.git.data.files = files.to_string();
        settings.paths.user_data = Some(fx.user_root());
        settings.paths.bundled_defaults = Some(fx.bundled_root());
        Self {
            fx,
            settings,
            orchestrator: SyncOrchestrator::new().with_scheme_policy(SchemePolicy::AllowLocalFile),
        }
    }

    fn start(&self) -> RepositoryHandle {
        let startup = self.orchestrator.startup(&self.settings);
        assert!(startup.result.success, "{}", startup.result.message);
        startup.handle.unwrap()
    }
}

fn remote_with(files: &[(&str, &str)]) -> RemoteFixture {
    let remote = RemoteFixture::new();
    remote.commit_files("main", files, "initial data");
    remote
}

fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Every entry below `dir`, relative, sorted.
fn listing(dir: &Path) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            out.push(path.strip_prefix(dir).unwrap().display().to_string());
            if path.is_dir() {
                stack.push(path);
            }
        }
    }
    out.sort();
    out
}

#[test]
fn push_never_touches_paths_outside_the_sync_set() {
    let remote = remote_with(&[("a.json", "r-a"), ("b.json", "r-b")]);
    let client = Client::new(&remote, "a.json,b.json");
    let handle = client.start();

    client.fx.write_bundled("a.json", "edited");
    client.fx.write_user("notes.txt", "private");
    {
        let mut index = handle.repo().index().unwrap();
        index.add_path(Path::new("notes.txt")).unwrap();
        index.write().unwrap();
    }

    let result = client.orchestrator.push(&handle, &client.settings, "edit a");

    assert!(result.success, "{}", result.message);
    assert_eq!(result.files_changed, names(&["a.json"]));
    assert_eq!(remote.files_at_tip("main"), vec!["a.json", "b.json"]);
    assert_eq!(remote.file_at_tip("main", "a.json").unwrap(), b"edited");

    let head_tree = handle.head_commit().unwrap().unwrap().tree().unwrap();
    assert!(head_tree.get_name("notes.txt").is_none());
    // The user's own staging of notes.txt survives the push.
    let index = handle.repo().index().unwrap();
    assert!(index.get_path(Path::new("notes.txt"), 0).is_some());
    assert_eq!(
        handle.staged_changes(["notes.txt"]).unwrap(),
        names(&["notes.txt"])
    );
    assert_eq!(client.fx.read_user("notes.txt").as_deref(), Some("private"));
}

#[test]
fn push_commits_only_whitelisted_file_when_others_changed() {
    let remote = remote_with(&[("a.json", "r-a"), ("b.json", "r-b")]);
    let client = Client::new(&remote, "a.json");
    let handle = client.start();

    client.fx.write_bundled("a.json", "new-a");
    client.fx.write_bundled("b.json", "new-b");
    client.fx.write_user("b.json", "new-b");

    let result = client.orchestrator.push(&handle, &client.settings, "");

    assert!(result.success, "{}", result.message);
    assert_eq!(result.files_changed, names(&["a.json"]));
    assert_eq!(remote.file_at_tip("main", "a.json").unwrap(), b"new-a");
    assert_eq!(remote.file_at_tip("main", "b.json").unwrap(), b"r-b");
    assert_eq!(remote.commit_count("main"), 2);
}

#[test]
fn force_pull_matches_remote_tip_whatever_the_local_state() {
    let remote = remote_with(&[("a.json", "tip-a"), ("b.json", "tip-b")]);
    let client = Client::new(&remote, "a.json,b.json");
    let handle = client.start();

    let local_states: [&dyn Fn(&SyncFixture); 3] = [
        &|fx| fx.write_user("a.json", "scribbled"),
        &|fx| fs::remove_file(fx.user_root().join("b.json")).unwrap(),
        &|fx| {
            fx.write_user("a.json", "");
            fx.write_user("b.json", "{\"broken\":");
        },
    ];

    for mutate in local_states {
        mutate(&client.fx);
        let result = client
            .orchestrator
            .pull(&handle, &client.settings, PullPolicy::Force);
        assert!(result.success, "{}", result.message);
        for name in ["a.json", "b.json"] {
            let local = fs::read(client.fx.user_root().join(name)).unwrap();
            assert_eq!(local, remote.file_at_tip("main", name).unwrap());
        }
    }
}

#[test]
fn push_without_changes_creates_no_commit() {
    let remote = remote_with(&[("a.json", "r-a"), ("b.json", "r-b")]);
    let client = Client::new(&remote, "a.json,b.json");
    let handle = client.start();
    let local_before = handle.commit_count().unwrap();

    let result = client.orchestrator.push(&handle, &client.settings, "noop");

    assert!(result.success, "{}", result.message);
    assert!(result.files_changed.is_empty());
    assert!(result.is_noop());
    assert_eq!(handle.commit_count().unwrap(), local_before);
    assert_eq!(remote.commit_count("main"), 1);
}

#[test]
fn disabled_sync_has_no_side_effects() {
    let remote = remote_with(&[("a.json", "r-a"), ("b.json", "r-b")]);
    let mut client = Client::new(&remote, "a.json,b.json");
    let handle = client.start();
    client.fx.write_user("a.json", "local-edit");
    client.fx.write_bundled("b.json", "bundled-edit");
    remote.commit_files("main", &[("a.json", "r-a2")], "remote edit");

    client.settings.git.enabled = false;
    let git_dir = client.fx.user_root().join(".git");
    let config_before = fs::read(git_dir.join("config")).unwrap();
    let git_listing_before = listing(&git_dir);
    let user_listing_before = listing(&client.fx.user_root());

    let results = [
        client.orchestrator.pull(&handle, &client.settings, PullPolicy::Merge),
        client.orchestrator.pull(&handle, &client.settings, PullPolicy::Force),
        client.orchestrator.push(&handle, &client.settings, "should not happen"),
    ];

    for result in results {
        assert!(result.success);
        assert!(result.files_changed.is_empty());
        assert_eq!(result.message, "Sync is disabled");
    }
    assert_eq!(fs::read(git_dir.join("config")).unwrap(), config_before);
    assert_eq!(listing(&git_dir), git_listing_before);
    assert_eq!(listing(&client.fx.user_root()), user_listing_before);
    client.fx.assert_user_file("a.json", "local-edit");
    client.fx.assert_bundled_file("b.json", "bundled-edit");
    assert_eq!(remote.commit_count("main"), 2);
}

#[test]
fn candidate_order_picks_main_over_develop() {
    let remote = RemoteFixture::with_head("release");
    remote.commit_files("develop", &[("a.json", "dev")], "develop data");
    remote.commit_files("main", &[("a.json", "main")], "main data");
    let client = Client::new(&remote, "a.json");

    let startup = client.orchestrator.startup(&client.settings);

    assert!(startup.result.success, "{}", startup.result.message);
    assert_eq!(startup.result.branch_used.as_deref(), Some("main"));
    client.fx.assert_user_file("a.json", "main");
}

#[test]
fn symbolic_head_beats_candidates() {
    let remote = RemoteFixture::with_head("gh-pages");
    remote.commit_files("main", &[("a.json", "main")], "main data");
    remote.commit_files("gh-pages", &[("a.json", "pages")], "pages data");
    let client = Client::new(&remote, "a.json");

    let startup = client.orchestrator.startup(&client.settings);

    assert!(startup.result.success, "{}", startup.result.message);
    assert_eq!(startup.result.branch_used.as_deref(), Some("gh-pages"));
    client.fx.assert_user_file("a.json", "pages");
}

#[test]
fn ssh_url_is_rejected_before_any_network_call() {
    let fx = SyncFixture::new();
    let (handle, _) = RepositoryHandle::open_or_init(NormalizedPath::new(fx.user_root())).unwrap();
    let cfg = RemoteConfig::new("ssh://example.com/repo.git", "tester", "secret");

    let err = datasync_git::configure_remote(&handle, &cfg, SchemePolicy::AllowLocalFile).unwrap_err();

    assert!(matches!(err, datasync_git::Error::InvalidScheme { .. }), "{err:?}");
    assert!(handle.repo().find_remote("origin").is_err());
}

#[test]
fn ssh_url_in_settings_fails_pull_with_invalid_scheme() {
    let remote = remote_with(&[("a.json", "r-a")]);
    let mut client = Client::new(&remote, "a.json");
    client.settings.git.remote.url = "ssh://example.com/repo.git".to_string();

    let startup = client.orchestrator.startup(&client.settings);

    assert!(!startup.result.success);
    assert_eq!(startup.result.error_kind, Some(ErrorKind::InvalidScheme));
    let handle = startup.handle.unwrap();
    assert!(handle.repo().find_remote("origin").is_err());
}
