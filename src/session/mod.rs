mod context;
mod gate;

pub use context::SessionContext;
pub use gate::{GateState, PasswordGate, MAX_FAILED_ATTEMPTS};
