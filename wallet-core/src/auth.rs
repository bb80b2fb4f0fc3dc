// wallet-core/src/auth.rs
//
// Local user authentication in front of private material. The platform
// (biometric prompt, OS passcode) plugs in through `Authenticator`.

use crate::error::{WalletError, WalletResult};
use crate::storage::preferences::{PreferenceStore, BIOMETRIC_ENABLED};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Device has a biometric sensor.
    async fn has_hardware(&self) -> bool;

    /// At least one biometric is enrolled.
    async fn is_enrolled(&self) -> bool;

    /// Shows the prompt. `Ok(false)` is a user cancel or mismatch.
    async fn authenticate(&self, prompt: &str) -> WalletResult<bool>;
}

/// Platforms with no local authentication.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthenticator;

#[async_trait]
impl Authenticator for NoAuthenticator {
    async fn has_hardware(&self) -> bool {
        false
    }

    async fn is_enrolled(&self) -> bool {
        false
    }

    async fn authenticate(&self, _prompt: &str) -> WalletResult<bool> {
        Ok(false)
    }
}

/// Fixed answers, for headless embeddings and tests.
#[derive(Debug, Clone, Copy)]
pub struct StaticAuthenticator {
    pub hardware: bool,
    pub enrolled: bool,
    pub outcome: bool,
}

impl StaticAuthenticator {
    pub fn available(outcome: bool) -> Self {
        Self {
            hardware: true,
            enrolled: true,
            outcome,
        }
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn has_hardware(&self) -> bool {
        self.hardware
    }

    async fn is_enrolled(&self) -> bool {
        self.enrolled
    }

    async fn authenticate(&self, _prompt: &str) -> WalletResult<bool> {
        Ok(self.outcome)
    }
}

/// Two steps: `is_required` decides from the stored preference and device
/// capability, `authorize` runs the prompt when it is.
pub struct AuthGate {
    authenticator: Arc<dyn Authenticator>,
    prefs: Arc<dyn PreferenceStore>,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate").finish_non_exhaustive()
    }
}

impl AuthGate {
    pub fn new(authenticator: Arc<dyn Authenticator>, prefs: Arc<dyn PreferenceStore>) -> Self {
        Self {
            authenticator,
            prefs,
        }
    }

    pub async fn is_enabled(&self) -> WalletResult<bool> {
        Ok(self.prefs.get(BIOMETRIC_ENABLED).await?.as_deref() == Some("true"))
    }

    pub async fn set_enabled(&self, enabled: bool) -> WalletResult<()> {
        self.prefs
            .set(BIOMETRIC_ENABLED, if enabled { "true" } else { "false" })
            .await
    }

    pub async fn is_available(&self) -> bool {
        self.authenticator.has_hardware().await && self.authenticator.is_enrolled().await
    }

    /// Enabled in preferences and usable on this device.
    pub async fn is_required(&self) -> WalletResult<bool> {
        if !self.is_enabled().await? {
            return Ok(false);
        }
        if !self.is_available().await {
            warn!("biometric authentication enabled but unavailable on this device, gate skipped");
            return Ok(false);
        }
        Ok(true)
    }

    /// Fails closed: a rejected prompt and a prompt that errors both yield
    /// `AuthenticationFailed`.
    pub async fn authorize(&self, prompt: &str) -> WalletResult<()> {
        if !self.is_required().await? {
            return Ok(());
        }
        match self.authenticator.authenticate(prompt).await {
            Ok(true) => {
                debug!("authentication succeeded");
                Ok(())
            }
            Ok(false) => Err(WalletError::AuthenticationFailed(
                "User authentication was not confirmed".to_string(),
            )),
            Err(e) => {
                warn!("authenticator error: {}", e);
                Err(WalletError::AuthenticationFailed(e.to_string()))
            }
        }
    }
}
