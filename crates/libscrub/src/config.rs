use std::{fmt, path::PathBuf, time::Duration};

use crate::runner::DEFAULT_TIMEOUT;

/// Placeholder substituted for the credential in any emitted text.
pub const REDACTED: &str = "***TOKEN***";

/// Default hosting platform for remote repositories.
pub const DEFAULT_HOST: &str = "github.com";

/// A write-capable secret used to authenticate clone and push.
///
/// The secret is never printed: `Debug` is redacted, and [`sanitize`](Self::sanitize)
/// must be applied to any text that may have passed through a subprocess.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a secret token.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// A credential that authenticates nothing (anonymous or local remotes).
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether no secret is held.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw secret, for building authenticated URLs only.
    pub(crate) fn expose(&self) -> &str {
        &self.0
    }

    /// Replace every occurrence of the secret in `text` with [`REDACTED`].
    pub fn sanitize(&self, text: &str) -> String {
        if self.0.is_empty() {
            return text.to_string();
        }
        text.replace(&self.0, REDACTED)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Credential(<none>)")
        } else {
            write!(f, "Credential({REDACTED})")
        }
    }
}

/// Where remote repositories named `owner/name` live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remote {
    /// An HTTPS hosting platform, e.g. `github.com`.
    Https {
        /// Host name without scheme.
        host: String,
    },
    /// A local directory holding `<owner>/<name>.git` repositories.
    Directory {
        /// Root directory of the remotes.
        root: PathBuf,
    },
}

impl Remote {
    /// The default GitHub remote.
    pub fn github() -> Self {
        Self::Https {
            host: DEFAULT_HOST.to_string(),
        }
    }

    /// URL used to clone `repository`, with the credential embedded for HTTPS.
    pub(crate) fn clone_url(&self, repository: &str, credential: &Credential) -> String {
        match self {
            Self::Https { host } if credential.is_empty() => {
                format!("https://{host}/{repository}.git")
            }
            Self::Https { host } => {
                format!("https://{}@{host}/{repository}.git", credential.expose())
            }
            Self::Directory { root } => root
                .join(format!("{repository}.git"))
                .to_string_lossy()
                .into_owned(),
        }
    }

    /// Human-readable location of `repository`, never containing a secret.
    pub fn display_url(&self, repository: &str) -> String {
        self.clone_url(repository, &Credential::none())
    }
}

impl Default for Remote {
    fn default() -> Self {
        Self::github()
    }
}

/// Engine-wide settings shared by every repository in a run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Location of the remote repositories.
    pub remote: Remote,
    /// Credential used for clone and push.
    pub credential: Credential,
    /// Upper bound on any single git invocation.
    pub command_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            remote: Remote::default(),
            credential: Credential::none(),
            command_timeout: DEFAULT_TIMEOUT,
        }
    }
}
