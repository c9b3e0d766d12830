use crate::error::AuthError;
use tracing::{info, warn};

pub const MAX_FAILED_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Locked,
    Unlocked,
    /// Terminal for the session: no further password prompt.
    LockedOut,
}

/// Password check guarding the protected operations of one session.
///
/// Three failed submissions lock the session out for good; a later correct
/// password does not unlock it.
#[derive(Debug, Clone)]
pub struct PasswordGate {
    secret: Option<String>,
    attempt_count: u32,
    unlocked: bool,
}

impl PasswordGate {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
            attempt_count: 0,
            unlocked: false,
        }
    }

    /// Gate for deployments without a configured secret.
    pub fn open() -> Self {
        Self {
            secret: None,
            attempt_count: 0,
            unlocked: true,
        }
    }

    pub fn from_secret(secret: Option<String>) -> Self {
        match secret.filter(|s| !s.is_empty()) {
            Some(secret) => Self::new(secret),
            None => Self::open(),
        }
    }

    pub fn state(&self) -> GateState {
        if self.unlocked {
            GateState::Unlocked
        } else if self.attempt_count >= MAX_FAILED_ATTEMPTS {
            GateState::LockedOut
        } else {
            GateState::Locked
        }
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn is_unlocked(&self) -> bool {
        self.state() == GateState::Unlocked
    }

    pub fn submit(&mut self, candidate: &str) -> Result<(), AuthError> {
        match self.state() {
            GateState::Unlocked => return Ok(()),
            GateState::LockedOut => return Err(AuthError::LockedOut),
            GateState::Locked => {}
        }

        let matches = self
            .secret
            .as_deref()
            .is_some_and(|secret| constant_time_eq(secret.as_bytes(), candidate.as_bytes()));
        if matches {
            self.unlocked = true;
            info!("Zugang freigeschaltet");
            return Ok(());
        }

        self.attempt_count += 1;
        let remaining = MAX_FAILED_ATTEMPTS.saturating_sub(self.attempt_count);
        warn!(attempts = self.attempt_count, remaining, "falsches Passwort");
        if remaining == 0 {
            Err(AuthError::LockedOut)
        } else {
            Err(AuthError::WrongPassword { remaining })
        }
    }

    pub fn ensure_unlocked(&self) -> Result<(), AuthError> {
        match self.state() {
            GateState::Unlocked => Ok(()),
            GateState::Locked => Err(AuthError::NotUnlocked),
            GateState::LockedOut => Err(AuthError::LockedOut),
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
