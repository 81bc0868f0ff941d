//! Remote wiring, credentials and network transport.
//!
//! Every function that talks to the network validates the remote URL
//! against a [`SchemePolicy`] first. libgit2 treats `host:path` and other
//! ambiguous strings as ssh or local paths, so the check runs before each
//! operation rather than once at setup.

use std::cell::RefCell;
use std::sync::Once;

use git2::{
    AutotagOption, Cred, Direction, ErrorClass, ErrorCode, FetchOptions, FetchPrune, PushOptions,
    RemoteCallbacks,
};

use crate::branch::AdvertisedRefs;
use crate::handle::RepositoryHandle;
use crate::{Error, Result};

/// Name of the single remote the engine manages.
pub const ORIGIN: &str = "origin";

/// Fetch refspec installed on [`ORIGIN`].
pub const FETCH_REFSPEC: &str = "+refs/heads/*:refs/remotes/origin/*";

const HTTPS_PREFIX: &str = "https://";
const FILE_PREFIX: &str = "file://";

const CONNECT_TIMEOUT_MS: i32 = 60_000;
const IO_TIMEOUT_MS: i32 = 120_000;

/// Which URL schemes remote operations accept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchemePolicy {
    /// Only `https://` URLs.
    #[default]
    HttpsOnly,
    /// `https://` plus `file://` URLs, for local mirrors.
    AllowLocalFile,
}

impl SchemePolicy {
    /// Check `url` against this policy.
    pub fn validate(self, url: &str) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidScheme {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(invalid("remote URL is empty"));
        }
        if trimmed.len() != url.len() {
            return Err(invalid("remote URL has surrounding whitespace"));
        }

        let lower = url.to_ascii_lowercase();
        let host_part = if lower.starts_with(HTTPS_PREFIX) {
            &url[HTTPS_PREFIX.len()..]
        } else if self == Self::AllowLocalFile && lower.starts_with(FILE_PREFIX) {
            return Ok(());
        } else {
            return Err(invalid("only https:// remotes are supported"));
        };

        if host_part.is_empty() || host_part.starts_with('/') {
            return Err(invalid("missing host"));
        }
        Ok(())
    }
}

/// Immutable snapshot of the remote settings for one sync call.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub fetch_refspec: String,
}

impl RemoteConfig {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
            fetch_refspec: FETCH_REFSPEC.to_string(),
        }
    }

    /// Fail with [`Error::MissingCredentials`] unless both halves are set.
    pub fn require_credentials(&self) -> Result<()> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(Error::MissingCredentials);
        }
        Ok(())
    }
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("fetch_refspec", &self.fetch_refspec)
            .finish()
    }
}

/// Create or re-point [`ORIGIN`] at `cfg.url` and ensure its fetch refspec.
///
/// The scheme is validated before any repository config is touched.
/// Calling this repeatedly with the same config is a no-op.
pub fn configure_remote(
    handle: &RepositoryHandle,
    cfg: &RemoteConfig,
    policy: SchemePolicy,
) -> Result<()> {
    policy.validate(&cfg.url)?;
    let repo = handle.repo();
    let save_err = |e: git2::Error| Error::ConfigSave {
        message: e.message().to_string(),
    };

    match repo.find_remote(ORIGIN) {
        Ok(remote) => {
            if remote.url() != Some(cfg.url.as_str()) {
                repo.remote_set_url(ORIGIN, &cfg.url).map_err(save_err)?;
                tracing::debug!(url = %cfg.url, "Re-pointed origin");
            }
            let refspecs = remote.fetch_refspecs().map_err(save_err)?;
            let present = refspecs
                .iter()
                .flatten()
                .any(|spec| spec == cfg.fetch_refspec);
            if !present {
                repo.remote_add_fetch(ORIGIN, &cfg.fetch_refspec)
                    .map_err(save_err)?;
            }
        }
        Err(e) if e.code() == ErrorCode::NotFound => {
            repo.remote_with_fetch(ORIGIN, &cfg.url, &cfg.fetch_refspec)
                .map_err(save_err)?;
            tracing::debug!(url = %cfg.url, "Added origin");
        }
        Err(e) => return Err(save_err(e)),
    }
    Ok(())
}

/// Bound libgit2 network calls. Applied once per process.
pub fn configure_transport_timeouts() {
    static TIMEOUTS: Once = Once::new();
    TIMEOUTS.call_once(|| {
        // SAFETY: global libgit2 options are set once, before any transport
        // is created by this process through the engine.
        let result = unsafe {
            git2::opts::set_server_connect_timeout_in_milliseconds(CONNECT_TIMEOUT_MS).and_then(
                |()| git2::opts::set_server_timeout_in_milliseconds(IO_TIMEOUT_MS),
            )
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to set transport timeouts");
        }
    });
}

/// Callbacks that answer one credential request with the configured pair.
///
/// libgit2 calls the credential callback again after a rejection; the
/// second call fails with an auth error instead of looping.
fn credential_callbacks(cfg: &RemoteConfig) -> RemoteCallbacks<'_> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempts = 0u8;
    callbacks.credentials(move |_url, _username_from_url, _allowed| {
        attempts += 1;
        if attempts > 1 {
            return Err(git2::Error::new(
                ErrorCode::Auth,
                ErrorClass::Http,
                "credentials rejected by remote",
            ));
        }
        Cred::userpass_plaintext(&cfg.username, &cfg.password)
    });
    callbacks
}

/// Map a libgit2 failure during a network operation to a transport error.
pub fn classify_transport_error(error: git2::Error) -> Error {
    let message = error.message().to_string();
    let lower = message.to_ascii_lowercase();
    let auth = error.code() == ErrorCode::Auth
        || ["authentication", "401", "403", "credentials"]
            .iter()
            .any(|needle| lower.contains(needle));
    if auth {
        Error::Auth { message }
    } else {
        Error::Transport { message }
    }
}

/// Fetch all branches from [`ORIGIN`] into `refs/remotes/origin/*`.
pub fn fetch(handle: &RepositoryHandle, cfg: &RemoteConfig, policy: SchemePolicy) -> Result<()> {
    policy.validate(&cfg.url)?;
    configure_transport_timeouts();

    let mut remote = find_origin(handle)?;
    let mut opts = FetchOptions::new();
    opts.remote_callbacks(credential_callbacks(cfg))
        .prune(FetchPrune::On)
        .download_tags(AutotagOption::None);

    remote
        .fetch(&[cfg.fetch_refspec.as_str()], Some(&mut opts), None)
        .map_err(classify_transport_error)?;
    tracing::debug!("Fetched origin");
    Ok(())
}

/// List the branch refs [`ORIGIN`] advertises over the wire.
///
/// The symbolic HEAD target is included when the server reports one.
pub fn advertised_refs(
    handle: &RepositoryHandle,
    cfg: &RemoteConfig,
    policy: SchemePolicy,
) -> Result<AdvertisedRefs> {
    policy.validate(&cfg.url)?;
    configure_transport_timeouts();

    let mut remote = find_origin(handle)?;
    let connection = remote
        .connect_auth(Direction::Fetch, Some(credential_callbacks(cfg)), None)
        .map_err(classify_transport_error)?;

    let heads = connection.list().map_err(classify_transport_error)?;
    let mut head_target = None;
    let mut refs = Vec::new();
    for head in heads {
        if head.name() == "HEAD" {
            head_target = head.symref_target().map(str::to_string);
        } else if head.name().starts_with("refs/heads/") {
            refs.push(head.name().to_string());
        }
    }

    if head_target.is_none()
        && let Ok(buf) = connection.default_branch()
    {
        head_target = buf.as_str().map(str::to_string);
    }

    Ok(AdvertisedRefs { head_target, refs })
}

/// Branch refs recorded locally by earlier fetches, as `refs/remotes/origin/*`.
///
/// `refs/remotes/origin/HEAD`, when present, becomes the symbolic target.
pub fn tracking_refs(handle: &RepositoryHandle) -> Result<AdvertisedRefs> {
    let repo = handle.repo();
    let prefix = format!("refs/remotes/{ORIGIN}/");
    let head_name = format!("{prefix}HEAD");

    let mut head_target = None;
    let mut refs = Vec::new();
    for reference in repo.references_glob(&format!("{prefix}*"))? {
        let reference = reference?;
        let Some(name) = reference.name() else {
            continue;
        };
        if name == head_name {
            head_target = reference.symbolic_target().map(str::to_string);
        } else {
            refs.push(name.to_string());
        }
    }
    refs.sort();
    Ok(AdvertisedRefs { head_target, refs })
}

/// Push `refs/heads/<branch>` to the same name on [`ORIGIN`].
///
/// Every per-ref status the remote reports is inspected; any refusal is an
/// error even when the transport itself succeeded.
pub fn push_branch(
    handle: &RepositoryHandle,
    cfg: &RemoteConfig,
    policy: SchemePolicy,
    branch: &str,
) -> Result<()> {
    policy.validate(&cfg.url)?;
    cfg.require_credentials()?;
    configure_transport_timeouts();

    let mut remote = find_origin(handle)?;
    let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
    let rejections: RefCell<Vec<(String, String)>> = RefCell::new(Vec::new());

    {
        let mut callbacks = credential_callbacks(cfg);
        callbacks.push_update_reference(|refname, status| {
            if let Some(message) = status {
                rejections
                    .borrow_mut()
                    .push((refname.to_string(), message.to_string()));
            }
            Ok(())
        });

        let mut opts = PushOptions::new();
        opts.remote_callbacks(callbacks);
        remote
            .push(&[refspec.as_str()], Some(&mut opts))
            .map_err(|e| {
                if e.code() == ErrorCode::NotFastForward || is_non_fast_forward(e.message()) {
                    Error::PushFailed {
                        refname: format!("refs/heads/{branch}"),
                        message: e.message().to_string(),
                    }
                } else {
                    classify_transport_error(e)
                }
            })?;
    }

    if let Some((refname, message)) = rejections.into_inner().into_iter().next() {
        return Err(push_status_error(refname, message));
    }
    tracing::debug!(branch, "Pushed branch");
    Ok(())
}

fn is_non_fast_forward(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    ["non-fast-forward", "fetch first", "fastforwardable", "not present locally"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Classify a per-ref push refusal.
///
/// Out-of-date refs are generic failures the caller can fix by pulling;
/// everything else is remote policy.
pub fn push_status_error(refname: String, message: String) -> Error {
    if is_non_fast_forward(&message) {
        Error::PushFailed { refname, message }
    } else {
        Error::PushRejected { refname, message }
    }
}

fn find_origin(handle: &RepositoryHandle) -> Result<git2::Remote<'_>> {
    handle
        .repo()
        .find_remote(ORIGIN)
        .map_err(|_| Error::RemoteNotFound {
            name: ORIGIN.to_string(),
        })
}
