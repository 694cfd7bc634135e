//! Signer collaborator
//!
//! Key custody sits behind a trait: the protector signs EIP-712 order
//! digests, the executor signs raw transactions. The local implementation
//! wraps an in-memory key; a remote KMS would implement the same trait.
//!
//! Author: AI-Generated
//! Created: 2026-07-29

use crate::error::SigningError;
use alloy::consensus::TxEip1559;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Signature, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer as AlloySigner;
use async_trait::async_trait;

/// Signing collaborator consumed by OrderProtector and TransactionExecutor
#[async_trait]
pub trait Signer: Send + Sync {
    /// Address the signatures recover to (also the tx sender)
    fn address(&self) -> Address;

    /// Sign a pre-computed EIP-712 digest (domain-separated order message)
    async fn sign_order_digest(&self, digest: B256) -> Result<Signature, SigningError>;

    /// Sign an EIP-1559 transaction in place
    async fn sign_transaction(&self, tx: &mut TxEip1559) -> Result<Signature, SigningError>;
}

/// Local private-key signer
pub struct LocalSigner {
    inner: PrivateKeySigner,
}

impl LocalSigner {
    pub fn from_hex(key: &str) -> Result<Self, SigningError> {
        let inner: PrivateKeySigner = key
            .parse()
            .map_err(|e| SigningError::InvalidKey(format!("{e}")))?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl Signer for LocalSigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn sign_order_digest(&self, digest: B256) -> Result<Signature, SigningError> {
        self.inner
            .sign_hash(&digest)
            .await
            .map_err(|e| SigningError::Rejected(e.to_string()))
    }

    async fn sign_transaction(&self, tx: &mut TxEip1559) -> Result<Signature, SigningError> {
        self.inner
            .sign_transaction_sync(tx)
            .map_err(|e| SigningError::Rejected(e.to_string()))
    }
}
