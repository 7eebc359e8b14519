//! Screen/system wake lock held while driving.

#[derive(Debug, Clone, thiserror::Error)]
#[error("wake lock unavailable: {0}")]
pub struct WakeLockError(pub String);

/// Keeps the device awake during a driving session.
///
/// Injected into the explorer; `acquire` and `release` are paired per
/// driving epoch. Release must tolerate being called when not held.
pub trait WakeLock: Send + Sync {
    fn acquire(&self) -> Result<(), WakeLockError>;
    fn release(&self);
}

/// Wake lock that does nothing. Default for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullWakeLock;

impl WakeLock for NullWakeLock {
    fn acquire(&self) -> Result<(), WakeLockError> {
        Ok(())
    }

    fn release(&self) {}
}
