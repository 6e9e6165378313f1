//! Seams to the external account services
//!
//! Token verification, block lookups and display names all live in the
//! CRUD services outside this process. The session layer only consumes
//! them through these traits; the in-memory implementations below back the
//! binary's standalone mode and the test suite.

use async_trait::async_trait;
use shared::UserId;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Identity carried by a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
}

/// Verifies a signed bearer token presented in an `auth` message.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Block relationship lookup. A block in either direction suppresses
/// direct-message delivery.
#[async_trait]
pub trait BlockChecker: Send + Sync {
    async fn is_blocked(&self, a: UserId, b: UserId) -> bool;
}

/// Token verifier over a fixed token table. Stands in for the external
/// auth service in tests and the standalone binary.
#[derive(Debug, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, Identity>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: impl Into<String>, user_id: UserId, username: impl Into<String>) {
        self.tokens.insert(
            token.into(),
            Identity {
                user_id,
                username: username.into(),
            },
        );
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        self.tokens.get(token).cloned().ok_or(AuthError::InvalidToken)
    }
}

/// Development verifier accepting `"<userId>:<username>"` tokens, for
/// running the server without the external auth service.
#[derive(Debug, Default)]
pub struct DevTokenVerifier;

#[async_trait]
impl TokenVerifier for DevTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        let (id, name) = token.split_once(':').ok_or(AuthError::InvalidToken)?;
        let user_id = id.parse().map_err(|_| AuthError::InvalidToken)?;
        if name.is_empty() {
            return Err(AuthError::InvalidToken);
        }
        Ok(Identity {
            user_id,
            username: name.to_string(),
        })
    }
}

/// Block list over an explicit pair set, direction-insensitive on lookup.
#[derive(Debug, Default)]
pub struct StaticBlockList {
    pairs: HashSet<(UserId, UserId)>,
}

impl StaticBlockList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `blocker` has blocked `blocked`.
    pub fn block(&mut self, blocker: UserId, blocked: UserId) {
        self.pairs.insert((blocker, blocked));
    }
}

#[async_trait]
impl BlockChecker for StaticBlockList {
    async fn is_blocked(&self, a: UserId, b: UserId) -> bool {
        self.pairs.contains(&(a, b)) || self.pairs.contains(&(b, a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn verify_known_token() {
        let mut verifier = StaticTokenVerifier::new();
        verifier.insert("tok-1", 1, "alice");

        let identity = verifier.verify("tok-1").await.unwrap();
        assert_eq!(identity.user_id, 1);
        assert_eq!(identity.username, "alice");
    }

    #[tokio::test]
    async fn verify_rejects_unknown_and_empty_tokens() {
        let verifier = StaticTokenVerifier::new();
        assert_eq!(verifier.verify("nope").await, Err(AuthError::InvalidToken));
        assert_eq!(verifier.verify("").await, Err(AuthError::MissingToken));
    }

    #[tokio::test]
    async fn dev_verifier_parses_id_and_name() {
        let verifier = DevTokenVerifier;
        let identity = verifier.verify("7:dana").await.unwrap();
        assert_eq!(identity.user_id, 7);
        assert_eq!(identity.username, "dana");

        assert_eq!(verifier.verify("dana").await, Err(AuthError::InvalidToken));
        assert_eq!(verifier.verify("x:dana").await, Err(AuthError::InvalidToken));
        assert_eq!(verifier.verify("7:").await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn block_applies_in_both_directions() {
        let mut blocks = StaticBlockList::new();
        blocks.block(1, 2);

        assert!(blocks.is_blocked(1, 2).await);
        assert!(blocks.is_blocked(2, 1).await);
        assert!(!blocks.is_blocked(1, 3).await);
    }
}
