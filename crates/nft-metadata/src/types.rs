//! Values passed between pipeline stages

use alloy::primitives::U256;
use bytes::Bytes;
use url::Url;

/// ERC-721 token identifier. Its decimal form is the artifact file stem.
pub type TokenId = U256;

/// Output of the resolver for one token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUri {
    pub token_id: TokenId,
    pub uri: String,
}

/// A token that still needs its document retrieved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub token_id: TokenId,
    pub url: Url,
}

/// A retrieved document, ready to be written
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub token_id: TokenId,
    pub body: Bytes,
}
