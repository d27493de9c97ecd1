use serde::{Deserialize, Serialize};

/// What a successful `locate()` did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocateOutcome {
    /// The link was already open; nothing changed.
    AlreadyConnected,
    /// A port was opened. `persisted` is set when it was auto-selected and saved.
    Connected { port_name: String, persisted: bool },
}

impl LocateOutcome {
    pub fn port_name(&self) -> Option<&str> {
        match self {
            LocateOutcome::AlreadyConnected => None,
            LocateOutcome::Connected { port_name, .. } => Some(port_name),
        }
    }
}
