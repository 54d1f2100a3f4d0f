//! Key material provider.
//!
//! Holds the passphrase-derived frame key for a session and seals or opens
//! media frames with it. The key itself is write-only.
//!
//! # Invariants
//!
//! - Concurrent `set_key` calls are serialized; the most recently started
//!   call wins, regardless of completion order
//! - A key is installed whole or not at all
//! - Key bytes never leave the provider

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sofia_crypto::{EncryptedFrame, FrameCryptor, KeyMaterial, NONCE_SIZE, Passphrase};
use tokio::sync::Mutex;

use crate::error::KeyProviderError;

/// Installs the session key used for end-to-end encryption.
#[async_trait]
pub trait KeyProvider: Send + Sync + 'static {
    /// Derive and install the key for a passphrase.
    async fn set_key(&self, passphrase: &Passphrase) -> Result<(), KeyProviderError>;
}

#[derive(Debug, Default)]
struct Installed {
    /// Ticket of the installed key; 0 when none.
    ticket: u64,
    cryptor: Option<FrameCryptor>,
}

/// Key provider that keeps the derived key in memory and performs frame
/// encryption for the transport.
#[derive(Debug, Default)]
pub struct ExternalKeyProvider {
    tickets: AtomicU64,
    installed: Mutex<Installed>,
}

impl ExternalKeyProvider {
    /// Create a provider with no key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a key has been installed.
    pub async fn has_key(&self) -> bool {
        self.installed.lock().await.cryptor.is_some()
    }

    /// Encrypt a frame with the installed key.
    pub async fn seal(
        &self,
        plaintext: &[u8],
        nonce: [u8; NONCE_SIZE],
    ) -> Result<EncryptedFrame, KeyProviderError> {
        let installed = self.installed.lock().await;
        let cryptor = installed.cryptor.as_ref().ok_or(KeyProviderError::NoKey)?;
        Ok(cryptor.seal(plaintext, nonce)?)
    }

    /// Decrypt a frame with the installed key.
    pub async fn open(&self, frame: &EncryptedFrame) -> Result<Vec<u8>, KeyProviderError> {
        let installed = self.installed.lock().await;
        let cryptor = installed.cryptor.as_ref().ok_or(KeyProviderError::NoKey)?;
        Ok(cryptor.open(frame)?)
    }

    fn next_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
    }

    /// Install `cryptor` unless a later-started call already installed one.
    async fn install(&self, ticket: u64, cryptor: FrameCryptor) {
        let mut installed = self.installed.lock().await;
        if installed.ticket > ticket {
            tracing::debug!(ticket, current = installed.ticket, "superseded key not installed");
            return;
        }
        installed.ticket = ticket;
        installed.cryptor = Some(cryptor);
        drop(installed);

        tracing::debug!(ticket, "frame key installed");
    }
}

#[async_trait]
impl KeyProvider for ExternalKeyProvider {
    async fn set_key(&self, passphrase: &Passphrase) -> Result<(), KeyProviderError> {
        let ticket = self.next_ticket();
        let key = KeyMaterial::derive(passphrase.as_bytes())?;
        self.install(ticket, FrameCryptor::new(&key)).await;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn passphrase(value: &str) -> Passphrase {
        Passphrase::new(value).expect("passphrase")
    }

    #[tokio::test]
    async fn seal_requires_key() {
        let provider = ExternalKeyProvider::new();
        let result = provider.seal(b"frame", [0u8; NONCE_SIZE]).await;
        assert_eq!(result, Err(KeyProviderError::NoKey));
    }

    #[tokio::test]
    async fn installed_key_round_trips_frames() {
        let provider = ExternalKeyProvider::new();
        provider.set_key(&passphrase("shared secret")).await.expect("set key");

        let sealed = provider.seal(b"frame", [7u8; NONCE_SIZE]).await.expect("seal");
        assert_ne!(sealed.ciphertext, b"frame");
        assert_eq!(provider.open(&sealed).await.expect("open"), b"frame");
    }

    #[tokio::test]
    async fn peers_with_same_passphrase_interoperate() {
        let alice = ExternalKeyProvider::new();
        let bob = ExternalKeyProvider::new();
        alice.set_key(&passphrase("room key")).await.expect("set key");
        bob.set_key(&passphrase("room key")).await.expect("set key");

        let sealed = alice.seal(b"hello", [1u8; NONCE_SIZE]).await.expect("seal");
        assert_eq!(bob.open(&sealed).await.expect("open"), b"hello");
    }

    #[tokio::test]
    async fn last_set_key_wins() {
        let provider = Arc::new(ExternalKeyProvider::new());
        provider.set_key(&passphrase("first")).await.expect("set key");
        provider.set_key(&passphrase("second")).await.expect("set key");

        let reference = ExternalKeyProvider::new();
        reference.set_key(&passphrase("second")).await.expect("set key");
        let sealed = reference.seal(b"x", [2u8; NONCE_SIZE]).await.expect("seal");

        assert_eq!(provider.open(&sealed).await.expect("open"), b"x");
    }

    async fn sealed_under(value: &str) -> EncryptedFrame {
        let reference = ExternalKeyProvider::new();
        reference.set_key(&passphrase(value)).await.expect("set key");
        reference.seal(b"x", [3u8; NONCE_SIZE]).await.expect("seal")
    }

    #[tokio::test]
    async fn earlier_call_finishing_late_does_not_replace_key() {
        let provider = ExternalKeyProvider::new();
        let first = provider.next_ticket();
        let second = provider.next_ticket();

        let key = |value: &str| {
            FrameCryptor::new(&KeyMaterial::derive(value.as_bytes()).expect("derive"))
        };
        provider.install(second, key("second")).await;
        provider.install(first, key("first")).await;

        let sealed = sealed_under("second").await;
        assert_eq!(provider.open(&sealed).await.expect("open"), b"x");
        assert!(provider.open(&sealed_under("first").await).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_set_key_installs_last_started_key() {
        let provider = Arc::new(ExternalKeyProvider::new());

        // Park every call on the lock so they all overlap.
        let held = provider.installed.lock().await;
        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..8u64 {
            let task_provider = Arc::clone(&provider);
            tasks.spawn(async move { task_provider.set_key(&passphrase(&format!("key-{i}"))).await });
            while provider.tickets.load(Ordering::SeqCst) <= i {
                tokio::task::yield_now().await;
            }
        }
        drop(held);

        while let Some(result) = tasks.join_next().await {
            result.expect("join").expect("set key");
        }

        let sealed = sealed_under("key-7").await;
        assert_eq!(provider.open(&sealed).await.expect("open"), b"x");
        for i in 0..7 {
            let stale = sealed_under(&format!("key-{i}")).await;
            assert!(provider.open(&stale).await.is_err(), "key-{i} still installed");
        }
    }
}
