//! Debug session status

/// Where a React Native debug session is in its connect/reload cycle
///
/// ```text
/// FirstConnection -> FirstConnectionPending -> ConnectionDone -> ConnectionAllowed
/// ConnectionAllowed <-> ConnectionPending           (app reload)
/// FirstConnectionPending -> ConnectionFailed      (attach failed, resources released)
/// ConnectionFailed -> ConnectionAllowed             (after a reload; retry stays possible)
/// any -> Stopping -> Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebugSessionStatus {
    /// Waiting for the application to connect for the first time
    #[default]
    FirstConnection,
    /// First child debug session is being started
    FirstConnectionPending,
    /// A child debug session is running and reloads are handled
    ConnectionAllowed,
    /// Old child session asked to terminate; the replacement starts on its exit
    ConnectionPending,
    /// Child debug session started
    ConnectionDone,
    /// Child debug session failed to start
    ConnectionFailed,
    /// Tearing down
    Stopping,
    /// Torn down
    Stopped,
}

impl DebugSessionStatus {
    pub fn is_stopping(self) -> bool {
        matches!(self, Self::Stopping | Self::Stopped)
    }
}

impl std::fmt::Display for DebugSessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstConnection => write!(f, "first-connection"),
            Self::FirstConnectionPending => write!(f, "first-connection-pending"),
            Self::ConnectionAllowed => write!(f, "connection-allowed"),
            Self::ConnectionPending => write!(f, "connection-pending"),
            Self::ConnectionDone => write!(f, "connection-done"),
            Self::ConnectionFailed => write!(f, "connection-failed"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}
