//! Remote wiring, fetch and push against local bare remotes.

use datasync_fs::NormalizedPath;
use datasync_git::{
    AdvertisedRefs, BranchResolver, Error, ORIGIN, RemoteConfig, RepositoryHandle, SchemePolicy,
    advertised_refs, configure_remote, fetch, push_branch, tracking_refs,
};
use datasync_test_utils::RemoteFixture;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn local_handle(dir: &TempDir) -> RepositoryHandle {
    let (handle, created) = RepositoryHandle::open_or_init(NormalizedPath::new(dir.path())).unwrap();
    assert!(created);
    handle
}

fn config_for(remote: &RemoteFixture) -> RemoteConfig {
    RemoteConfig::new(remote.url(), "tester", "secret")
}

#[test]
fn configure_remote_rejects_ssh_before_touching_config() {
    let dir = TempDir::new().unwrap();
    let handle = local_handle(&dir);
    let cfg = RemoteConfig::new("ssh://example.com/repo.git", "u", "p");

    let result = configure_remote(&handle, &cfg, SchemePolicy::HttpsOnly);

    assert!(matches!(result, Err(Error::InvalidScheme { .. })));
    assert!(handle.repo().find_remote(ORIGIN).is_err());
}

#[test]
fn configure_remote_is_idempotent_and_repoints() {
    let dir = TempDir::new().unwrap();
    let handle = local_handle(&dir);
    let first = RemoteConfig::new("https://example.com/a.git", "u", "p");
    let second = RemoteConfig::new("https://example.com/b.git", "u", "p");

    configure_remote(&handle, &first, SchemePolicy::HttpsOnly).unwrap();
    configure_remote(&handle, &first, SchemePolicy::HttpsOnly).unwrap();
    configure_remote(&handle, &second, SchemePolicy::HttpsOnly).unwrap();

    let remote = handle.repo().find_remote(ORIGIN).unwrap();
    assert_eq!(remote.url(), Some("https://example.com/b.git"));
    let refspecs: Vec<String> = remote
        .fetch_refspecs()
        .unwrap()
        .iter()
        .flatten()
        .map(str::to_string)
        .collect();
    assert_eq!(refspecs, vec![datasync_git::FETCH_REFSPEC.to_string()]);
}

#[test]
fn fetch_populates_tracking_refs() {
    let remote = RemoteFixture::new();
    remote.commit_files("main", &[("a.json", "[]")], "init");
    remote.commit_files("develop", &[("a.json", "[1]")], "dev");

    let dir = TempDir::new().unwrap();
    let handle = local_handle(&dir);
    let cfg = config_for(&remote);
    configure_remote(&handle, &cfg, SchemePolicy::AllowLocalFile).unwrap();
    fetch(&handle, &cfg, SchemePolicy::AllowLocalFile).unwrap();

    let tracked = tracking_refs(&handle).unwrap();
    assert_eq!(
        tracked.refs,
        vec![
            "refs/remotes/origin/develop".to_string(),
            "refs/remotes/origin/main".to_string()
        ]
    );
}

#[test]
fn fetch_refuses_file_url_under_https_policy() {
    let remote = RemoteFixture::new();
    remote.commit_files("main", &[("a.json", "[]")], "init");

    let dir = TempDir::new().unwrap();
    let handle = local_handle(&dir);
    let cfg = config_for(&remote);
    configure_remote(&handle, &cfg, SchemePolicy::AllowLocalFile).unwrap();

    let result = fetch(&handle, &cfg, SchemePolicy::HttpsOnly);
    assert!(matches!(result, Err(Error::InvalidScheme { .. })));
    assert!(tracking_refs(&handle).unwrap().refs.is_empty());
}

#[test]
fn fetch_from_missing_remote_is_transport_failure() {
    let dir = TempDir::new().unwrap();
    let handle = local_handle(&dir);
    let missing = dir.path().join("nowhere.git");
    let cfg = RemoteConfig::new(format!("file://{}", missing.display()), "u", "p");
    configure_remote(&handle, &cfg, SchemePolicy::AllowLocalFile).unwrap();

    let result = fetch(&handle, &cfg, SchemePolicy::AllowLocalFile);
    assert!(matches!(result, Err(Error::Transport { .. })));
}

#[test]
fn advertised_refs_resolve_to_symbolic_head() {
    let remote = RemoteFixture::with_head("live");
    remote.commit_files("main", &[("a.json", "main")], "main");
    remote.commit_files("live", &[("a.json", "live")], "live");

    let dir = TempDir::new().unwrap();
    let handle = local_handle(&dir);
    let cfg = config_for(&remote);
    configure_remote(&handle, &cfg, SchemePolicy::AllowLocalFile).unwrap();

    let advertised = advertised_refs(&handle, &cfg, SchemePolicy::AllowLocalFile).unwrap();
    assert!(advertised.contains("main"));
    assert!(advertised.contains("live"));
    assert_eq!(
        BranchResolver::new().resolve_default_branch(&advertised).unwrap(),
        "live"
    );
}

#[test]
fn advertised_refs_of_empty_remote_has_no_branches() {
    let remote = RemoteFixture::new();
    let dir = TempDir::new().unwrap();
    let handle = local_handle(&dir);
    let cfg = config_for(&remote);
    configure_remote(&handle, &cfg, SchemePolicy::AllowLocalFile).unwrap();

    let advertised = advertised_refs(&handle, &cfg, SchemePolicy::AllowLocalFile).unwrap();
    assert_eq!(advertised.refs, Vec::<String>::new());
    assert!(matches!(
        BranchResolver::new().resolve_default_branch(&advertised),
        Err(Error::NoBranches)
    ));
}

#[test]
fn push_branch_updates_remote() {
    let remote = RemoteFixture::new();
    let dir = TempDir::new().unwrap();
    let handle = local_handle(&dir);
    std::fs::write(dir.path().join("a.json"), "[1]").unwrap();
    handle.stage_existing(["a.json"]).unwrap();
    let oid = handle.commit_index("first", "tester").unwrap();
    let branch = handle.current_branch().unwrap().unwrap();

    let cfg = config_for(&remote);
    configure_remote(&handle, &cfg, SchemePolicy::AllowLocalFile).unwrap();
    push_branch(&handle, &cfg, SchemePolicy::AllowLocalFile, &branch).unwrap();

    assert_eq!(remote.tip(&branch), Some(oid));
    assert_eq!(remote.file_at_tip(&branch, "a.json").unwrap(), b"[1]");
}

#[test]
fn push_without_credentials_fails_before_network() {
    let remote = RemoteFixture::new();
    let dir = TempDir::new().unwrap();
    let handle = local_handle(&dir);
    let cfg = RemoteConfig::new(remote.url(), "", "");
    configure_remote(&handle, &cfg, SchemePolicy::AllowLocalFile).unwrap();

    let result = push_branch(&handle, &cfg, SchemePolicy::AllowLocalFile, "main");
    assert!(matches!(result, Err(Error::MissingCredentials)));
}

#[test]
fn diverged_push_is_push_failed() {
    let remote = RemoteFixture::new();
    remote.commit_files("main", &[("a.json", "remote")], "remote work");

    let dir = TempDir::new().unwrap();
    let handle = local_handle(&dir);
    handle.repo().set_head("refs/heads/main").unwrap();
    std::fs::write(dir.path().join("a.json"), "local").unwrap();
    handle.stage_existing(["a.json"]).unwrap();
    handle.commit_index("local work", "tester").unwrap();

    let cfg = config_for(&remote);
    configure_remote(&handle, &cfg, SchemePolicy::AllowLocalFile).unwrap();
    fetch(&handle, &cfg, SchemePolicy::AllowLocalFile).unwrap();

    let result = push_branch(&handle, &cfg, SchemePolicy::AllowLocalFile, "main");
    assert!(matches!(result, Err(Error::PushFailed { .. })), "{result:?}");
}

#[test]
fn refused_ref_update_is_push_rejected() {
    let remote = RemoteFixture::new();
    // A held ref lock makes the remote refuse this one ref while the
    // transport itself succeeds.
    let lock = remote.path().join("refs").join("heads").join("main.lock");
    std::fs::write(&lock, "").unwrap();

    let dir = TempDir::new().unwrap();
    let handle = local_handle(&dir);
    handle.repo().set_head("refs/heads/main").unwrap();
    std::fs::write(dir.path().join("a.json"), "local").unwrap();
    handle.stage_existing(["a.json"]).unwrap();
    handle.commit_index("local work", "tester").unwrap();

    let cfg = config_for(&remote);
    configure_remote(&handle, &cfg, SchemePolicy::AllowLocalFile).unwrap();
    let result = push_branch(&handle, &cfg, SchemePolicy::AllowLocalFile, "main");

    match result {
        Err(Error::PushRejected { refname, .. }) => assert_eq!(refname, "refs/heads/main"),
        other => panic!("expected PushRejected, got {other:?}"),
    }
    assert_eq!(remote.tip("main"), None);
}

#[test]
fn tracking_refs_are_empty_before_any_fetch() {
    let dir = TempDir::new().unwrap();
    let handle = local_handle(&dir);
    assert_eq!(tracking_refs(&handle).unwrap(), AdvertisedRefs::default());
}
