//! Turns resolved token URIs into fetch requests
//!
//! Two steps per token:
//!
//! 1. Scheme normalization. `ipfs://<cid>` is rewritten against the configured
//!    gateway as `<gateway>/ipfs/<cid>`; `http`/`https` pass through; anything
//!    else is dropped.
//! 2. Idempotency gate. A token whose artifact already exists is not fetched.

use std::sync::Arc;

use alloy::primitives::Address;
use url::Url;

use crate::error::Result;
use crate::store::ArtifactStore;
use crate::types::{FetchRequest, ResolvedUri};

const IPFS_PREFIX: &str = "ipfs://";

/// Scheme handling options
#[derive(Debug, Clone)]
pub struct UriPolicy {
    /// Gateway base, e.g. `https://gateway.ipfs.io`
    pub gateway: Url,
    /// When false, `ipfs://` URIs are dropped instead of rewritten
    pub follow_ipfs: bool,
}

/// What the router decided for one token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Fetch(FetchRequest),
    /// An artifact for this token is already on disk
    AlreadyPersisted,
    /// No usable HTTP(S) form; carries the original URI for reporting
    Unsupported(String),
}

/// Rewrite a token URI into a fetchable HTTP(S) URL, if it has one.
pub fn normalize_uri(uri: &str, policy: &UriPolicy) -> Option<Url> {
    let uri = uri.trim();

    if let Some(rest) = strip_prefix_ignore_case(uri, IPFS_PREFIX) {
        if !policy.follow_ipfs {
            return None;
        }
        // ipfs://ipfs/<cid> shows up in the wild as well
        let path = rest.strip_prefix("ipfs/").unwrap_or(rest);
        if path.is_empty() {
            return None;
        }
        let base = policy.gateway.as_str().trim_end_matches('/');
        return Url::parse(&format!("{base}/ipfs/{path}")).ok();
    }

    let url = Url::parse(uri).ok()?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Some(url),
        _ => None,
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

pub struct RequestRouter {
    policy: UriPolicy,
    store: Arc<dyn ArtifactStore>,
    collection: Address,
}

impl RequestRouter {
    pub fn new(policy: UriPolicy, store: Arc<dyn ArtifactStore>, collection: Address) -> Self {
        Self {
            policy,
            store,
            collection,
        }
    }

    /// Decide whether a resolved token needs fetching.
    pub async fn route(&self, resolved: ResolvedUri) -> Result<Route> {
        let Some(url) = normalize_uri(&resolved.uri, &self.policy) else {
            return Ok(Route::Unsupported(resolved.uri));
        };

        if self.store.exists(self.collection, resolved.token_id).await? {
            return Ok(Route::AlreadyPersisted);
        }

        Ok(Route::Fetch(FetchRequest {
            token_id: resolved.token_id,
            url,
        }))
    }
}
