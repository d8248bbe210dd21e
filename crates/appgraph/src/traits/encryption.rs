use async_trait::async_trait;

use crate::data::{CoreError, User};

/// Field-level encryption of stored credentials, keyed by the owner.
#[async_trait]
pub trait EncryptionService: Send + Sync {
    async fn encrypt(&self, plaintext: &str, owner: &User) -> Result<String, CoreError>;

    async fn decrypt(&self, ciphertext: &str, owner: &User) -> Result<String, CoreError>;
}
