//! Secure File Vault - Biometric Authentication Gate
//!
//! State machine guarding entry to the vault, backed by one persisted
//! enablement flag. Biometrics is optional by policy: skipping the gate
//! is always available and sensor failures never lock the user out.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::{VaultError, VaultResult};

/// Persisted key for the enablement flag.
pub const BIOMETRIC_ENABLED_KEY: &str = "biometric_enabled";

/// Kind of biometric factor reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FactorKind {
    Fingerprint,
    Face,
    Iris,
}

/// Platform sensor availability report.
#[derive(Debug, Clone, Copy)]
pub struct SensorStatus {
    /// Factor present and enrolled
    pub available: bool,
    pub factor: Option<FactorKind>,
}

impl SensorStatus {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            factor: None,
        }
    }

    pub fn with_factor(factor: FactorKind) -> Self {
        Self {
            available: true,
            factor: Some(factor),
        }
    }
}

/// Biometric sensor (platform collaborator). The platform owns all
/// timeout and retry UI inside `challenge`.
#[async_trait]
pub trait BiometricSensor: Send + Sync {
    async fn availability(&self) -> SensorStatus;
    /// One interactive challenge; `false` covers both decline and failure.
    async fn challenge(&self, prompt_reason: &str) -> bool;
}

/// Persisted key-value store (platform collaborator). Used only for the
/// single enablement flag in this core.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> VaultResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> VaultResult<()>;
    async fn remove(&self, key: &str) -> VaultResult<()>;
}

/// Gate lifecycle phase.
///
/// `NotLoaded` is the explicit "persisted flag not yet read" state -
/// distinct from "loaded as disabled". `Authenticated` is terminal for
/// the session; from `Failed` and `EnrollmentMissing` control returns
/// to the locked flow, where the user may retry or skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    NotLoaded,
    Locked,
    SensorCheck,
    EnrollmentMissing,
    Prompting,
    Authenticated,
    Failed,
}

/// Terminal outcome of one gate operation, reported as distinct
/// variants so the caller can branch: offer retry, offer to open
/// platform settings, or proceed unauthenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Authenticated,
    Failed,
    /// Sensor absent or no factor enrolled; the caller should offer to
    /// open platform settings.
    EnrollmentMissing,
}

impl AuthDecision {
    /// Human-readable caption for the unlock flow. Failure outcomes
    /// route through the error taxonomy's captions.
    pub fn caption(&self) -> String {
        match self {
            AuthDecision::Authenticated => "Unlocked".into(),
            AuthDecision::Failed => VaultError::AuthFailed.caption(),
            AuthDecision::EnrollmentMissing => VaultError::SensorUnavailable.caption(),
        }
    }
}

/// Biometric Authentication Gate.
pub struct BiometricGate {
    sensor: Arc<dyn BiometricSensor>,
    store: Arc<dyn SettingsStore>,
    phase: RwLock<GatePhase>,
    /// Challenges are strictly sequential
    challenge_lock: Mutex<()>,
}

impl BiometricGate {
    pub fn new(sensor: Arc<dyn BiometricSensor>, store: Arc<dyn SettingsStore>) -> Self {
        Self {
            sensor,
            store,
            phase: RwLock::new(GatePhase::NotLoaded),
            challenge_lock: Mutex::new(()),
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> GatePhase {
        *self.phase.read()
    }

    /// Initialization step: read the persisted flag and arm the gate.
    /// Absence of a stored value means disabled.
    pub async fn init(&self) -> VaultResult<bool> {
        let enabled = self.is_enabled_persisted().await?;
        *self.phase.write() = GatePhase::Locked;
        debug!("gate: initialized, biometrics enabled={enabled}");
        Ok(enabled)
    }

    /// Read the persisted enablement flag. Absent means `false`.
    pub async fn is_enabled_persisted(&self) -> VaultResult<bool> {
        Ok(self
            .store
            .get(BIOMETRIC_ENABLED_KEY)
            .await?
            .map(|value| value == "true")
            .unwrap_or(false))
    }

    /// Enable or disable biometric login.
    ///
    /// Enabling requires an available sensor and one successful
    /// challenge before `true` is persisted. Disabling clears the flag
    /// unconditionally and always succeeds - even with the sensor
    /// hardware absent.
    pub async fn set_enabled(&self, value: bool, prompt_reason: &str) -> VaultResult<AuthDecision> {
        if !value {
            self.store.remove(BIOMETRIC_ENABLED_KEY).await?;
            info!("gate: biometric login disabled");
            return Ok(AuthDecision::Authenticated);
        }

        match self.run_challenge(prompt_reason).await? {
            AuthDecision::Authenticated => {
                self.store.set(BIOMETRIC_ENABLED_KEY, "true").await?;
                info!("gate: biometric login enabled");
                Ok(AuthDecision::Authenticated)
            }
            other => {
                // Nothing persisted on decline or missing enrollment.
                Ok(other)
            }
        }
    }

    /// Unlock attempt, used on app resume when the persisted flag is
    /// set. The caller decides whether a `Failed` outcome blocks entry.
    pub async fn authenticate(&self, prompt_reason: &str) -> VaultResult<AuthDecision> {
        self.run_challenge(prompt_reason).await
    }

    /// Skip the gate entirely. Biometrics is optional, never mandatory.
    pub fn skip(&self) -> AuthDecision {
        *self.phase.write() = GatePhase::Authenticated;
        debug!("gate: skipped by user");
        AuthDecision::Authenticated
    }

    async fn run_challenge(&self, prompt_reason: &str) -> VaultResult<AuthDecision> {
        let _guard = self.challenge_lock.lock().await;

        *self.phase.write() = GatePhase::SensorCheck;
        let status = self.sensor.availability().await;
        if !status.available {
            warn!("gate: {}", VaultError::SensorUnavailable);
            // Caller offers platform settings; next attempt or skip
            // returns control to the locked flow.
            *self.phase.write() = GatePhase::EnrollmentMissing;
            return Ok(AuthDecision::EnrollmentMissing);
        }

        debug!("gate: prompting with factor {:?}", status.factor);
        *self.phase.write() = GatePhase::Prompting;
        if self.sensor.challenge(prompt_reason).await {
            *self.phase.write() = GatePhase::Authenticated;
            info!("gate: authenticated");
            Ok(AuthDecision::Authenticated)
        } else {
            // Expected outcome; the user may retry or skip from here.
            *self.phase.write() = GatePhase::Failed;
            info!("gate: {}", VaultError::AuthFailed);
            Ok(AuthDecision::Failed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StubSensor {
        status: SensorStatus,
        accept: bool,
    }

    #[async_trait]
    impl BiometricSensor for StubSensor {
        async fn availability(&self) -> SensorStatus {
            self.status
        }

        async fn challenge(&self, _prompt_reason: &str) -> bool {
            self.accept
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        values: parking_lot::Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl SettingsStore for MemoryStore {
        async fn get(&self, key: &str) -> VaultResult<Option<String>> {
            Ok(self.values.lock().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> VaultResult<()> {
            self.values.lock().insert(key.into(), value.into());
            Ok(())
        }

        async fn remove(&self, key: &str) -> VaultResult<()> {
            self.values.lock().remove(key);
            Ok(())
        }
    }

    fn gate(status: SensorStatus, accept: bool) -> (BiometricGate, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let gate = BiometricGate::new(
            Arc::new(StubSensor { status, accept }),
            Arc::clone(&store) as Arc<dyn SettingsStore>,
        );
        (gate, store)
    }

    #[tokio::test]
    async fn test_not_loaded_until_init() {
        let (gate, _) = gate(SensorStatus::with_factor(FactorKind::Fingerprint), true);
        assert_eq!(gate.phase(), GatePhase::NotLoaded);
        assert!(!gate.init().await.unwrap());
        assert_eq!(gate.phase(), GatePhase::Locked);
    }

    #[tokio::test]
    async fn test_absent_flag_means_disabled() {
        let (gate, _) = gate(SensorStatus::unavailable(), false);
        assert!(!gate.is_enabled_persisted().await.unwrap());
    }

    #[tokio::test]
    async fn test_enable_success_persists_flag() {
        let (gate, store) = gate(SensorStatus::with_factor(FactorKind::Face), true);
        let decision = gate.set_enabled(true, "Enable biometric login").await.unwrap();
        assert_eq!(decision, AuthDecision::Authenticated);
        assert_eq!(
            store.get(BIOMETRIC_ENABLED_KEY).await.unwrap().as_deref(),
            Some("true")
        );
        assert!(gate.is_enabled_persisted().await.unwrap());
        assert_eq!(gate.phase(), GatePhase::Authenticated);
    }

    #[tokio::test]
    async fn test_enable_without_sensor_persists_nothing() {
        let (gate, store) = gate(SensorStatus::unavailable(), true);
        let decision = gate.set_enabled(true, "Enable biometric login").await.unwrap();
        assert_eq!(decision, AuthDecision::EnrollmentMissing);
        assert_eq!(store.get(BIOMETRIC_ENABLED_KEY).await.unwrap(), None);
        assert!(!gate.is_enabled_persisted().await.unwrap());
    }

    #[tokio::test]
    async fn test_enable_declined_persists_nothing() {
        let (gate, store) = gate(SensorStatus::with_factor(FactorKind::Fingerprint), false);
        let decision = gate.set_enabled(true, "Enable biometric login").await.unwrap();
        assert_eq!(decision, AuthDecision::Failed);
        assert_eq!(store.get(BIOMETRIC_ENABLED_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_disable_always_succeeds_and_clears() {
        // Sensor hardware entirely absent - disable still works.
        let (gate, store) = gate(SensorStatus::unavailable(), false);
        store.set(BIOMETRIC_ENABLED_KEY, "true").await.unwrap();

        let decision = gate.set_enabled(false, "").await.unwrap();
        assert_eq!(decision, AuthDecision::Authenticated);
        assert_eq!(store.get(BIOMETRIC_ENABLED_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let (gate, _) = gate(SensorStatus::with_factor(FactorKind::Fingerprint), true);
        gate.init().await.unwrap();
        let decision = gate.authenticate("Unlock your vault").await.unwrap();
        assert_eq!(decision, AuthDecision::Authenticated);
        assert_eq!(gate.phase(), GatePhase::Authenticated);
    }

    #[tokio::test]
    async fn test_authenticate_failure_allows_retry() {
        let (gate, _) = gate(SensorStatus::with_factor(FactorKind::Fingerprint), false);
        gate.init().await.unwrap();
        let decision = gate.authenticate("Unlock your vault").await.unwrap();
        assert_eq!(decision, AuthDecision::Failed);
        assert_eq!(gate.phase(), GatePhase::Failed);

        // Retrying is permitted; a second attempt re-runs the sensor check.
        let retry = gate.authenticate("Unlock your vault").await.unwrap();
        assert_eq!(retry, AuthDecision::Failed);
    }

    #[tokio::test]
    async fn test_missing_enrollment_phase_is_reported() {
        let (gate, _) = gate(SensorStatus::unavailable(), true);
        gate.init().await.unwrap();
        let decision = gate.authenticate("Unlock your vault").await.unwrap();
        assert_eq!(decision, AuthDecision::EnrollmentMissing);
        assert_eq!(gate.phase(), GatePhase::EnrollmentMissing);
    }

    #[tokio::test]
    async fn test_skip_is_always_available() {
        let (gate, _) = gate(SensorStatus::unavailable(), false);
        gate.init().await.unwrap();
        assert_eq!(gate.skip(), AuthDecision::Authenticated);
        assert_eq!(gate.phase(), GatePhase::Authenticated);
    }

    #[test]
    fn test_decision_captions_follow_error_taxonomy() {
        assert_eq!(AuthDecision::Authenticated.caption(), "Unlocked");
        assert_eq!(
            AuthDecision::Failed.caption(),
            VaultError::AuthFailed.caption()
        );
        assert_eq!(
            AuthDecision::EnrollmentMissing.caption(),
            VaultError::SensorUnavailable.caption()
        );
    }
}
