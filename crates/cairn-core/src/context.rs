//! Request context passed into the audit capture path.
//!
//! The host resolves the acting identity and the remote address of the
//! request it is serving and hands them over as a [`RequestContext`] value.
//! Code running outside any request (background jobs, startup) uses
//! [`RequestContext::background`], which resolves both fields to `None`.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

/// An authenticated actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable identifier recorded as `userId`.
    pub id: String,

    /// Login or display name, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            login: None,
        }
    }

    /// Attach a login name.
    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self
    }
}

/// Identity and network origin of the execution emitting an audit event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Authenticated user, `None` for anonymous requests.
    #[serde(default)]
    pub user: Option<Identity>,

    /// Remote address of the active request, in string form.
    #[serde(default)]
    pub remote_addr: Option<String>,
}

impl RequestContext {
    /// Context for code running outside any request.
    pub fn background() -> Self {
        Self::default()
    }

    /// Context for an unauthenticated request from `remote_addr`.
    pub fn anonymous(remote_addr: impl Into<String>) -> Self {
        Self {
            user: None,
            remote_addr: Some(remote_addr.into()),
        }
    }

    /// Context for a request from a socket peer. Only the IP is kept.
    pub fn from_peer(peer: SocketAddr) -> Self {
        Self::from_ip(peer.ip())
    }

    pub fn from_ip(ip: IpAddr) -> Self {
        Self::anonymous(ip.to_string())
    }

    /// Set the authenticated user.
    pub fn with_user(mut self, user: Identity) -> Self {
        self.user = Some(user);
        self
    }

    /// The authenticated user, if any.
    pub fn current_user(&self) -> Option<&Identity> {
        self.user.as_ref()
    }

    /// The remote address of the active request, if any.
    pub fn remote_address(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }

    /// Whether a request is active (a remote address is known).
    pub fn has_request(&self) -> bool {
        self.remote_addr.is_some()
    }
}
