//! In-memory store implementation for testing

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::entities::StoredVerificationCode;
use crate::errors::StoreResult;

use super::r#trait::{validate_number, VerificationCodeStore};

/// Mock verification-code store backed by a map.
///
/// Upserts replace the whole record under the write lock, so the mock
/// honors the same convergence contract as the engine-backed stores.
#[derive(Clone)]
pub struct MockVerificationCodeStore {
    codes: Arc<RwLock<HashMap<String, StoredVerificationCode>>>,
}

impl MockVerificationCodeStore {
    /// Create a new empty mock store
    pub fn new() -> Self {
        Self {
            codes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of records currently held
    pub async fn len(&self) -> usize {
        self.codes.read().await.len()
    }

    /// Whether the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.codes.read().await.is_empty()
    }
}

impl Default for MockVerificationCodeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VerificationCodeStore for MockVerificationCodeStore {
    async fn insert(&self, number: &str, code: &StoredVerificationCode) -> StoreResult<()> {
        validate_number(number)?;
        let mut codes = self.codes.write().await;
        codes.insert(number.to_string(), code.clone());
        Ok(())
    }

    async fn find_for_number(&self, number: &str) -> StoreResult<Option<StoredVerificationCode>> {
        validate_number(number)?;
        let codes = self.codes.read().await;
        Ok(codes.get(number).cloned())
    }

    async fn remove(&self, number: &str) -> StoreResult<()> {
        validate_number(number)?;
        let mut codes = self.codes.write().await;
        codes.remove(number);
        Ok(())
    }
}
