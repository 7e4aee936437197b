use std::fmt;

/// Lifecycle of the sync service within one app session.
///
/// `Uninitialized -> Restoring -> Online | Offline`; `Online` passes
/// through `BackingUp` on every backup pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Uninitialized,
    Restoring,
    Online,
    BackingUp,
    Offline,
}

/// Backend reachability as last observed by an explicit probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    #[default]
    Unknown,
    Online,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub connectivity: Connectivity,
}

impl SyncStatus {
    pub fn is_offline(&self) -> bool {
        self.connectivity == Connectivity::Offline
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncPhase::Uninitialized => write!(f, "Uninitialized"),
            SyncPhase::Restoring => write!(f, "Restoring"),
            SyncPhase::Online => write!(f, "Online"),
            SyncPhase::BackingUp => write!(f, "Backing up"),
            SyncPhase::Offline => write!(f, "Offline"),
        }
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connectivity::Unknown => write!(f, "Unknown"),
            Connectivity::Online => write!(f, "Online"),
            Connectivity::Offline => write!(f, "Offline"),
        }
    }
}
