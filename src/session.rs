// src/session.rs
use tracing::info;

/// Entry gate in front of the dashboard. There are no credentials: `enter`
/// always succeeds and there is no way back out.
#[derive(Debug, Default, Clone)]
pub struct SessionGate {
    authenticated: bool,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self) {
        if !self.authenticated {
            info!("[SESSION] Entered dashboard");
        }
        self.authenticated = true;
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}
