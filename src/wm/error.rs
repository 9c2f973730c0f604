//! Error types for window-manager requests.
//!
//! Usage errors and policy rejections are reported synchronously to the
//! caller and never leave a record partially updated. Anomalies inside a
//! reconciliation pass are absorbed and logged instead of surfacing here.

use thiserror::Error;

use crate::wm::WindowId;

/// Result type alias for window-manager requests
pub type WmResult<T> = Result<T, WmError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WmError {
    #[error("bad geometry specifier \"{0}\"")]
    BadGeometry(String),

    #[error("wrong # args: should be \"wm {0}\"")]
    WrongArgs(String),

    #[error("bad option \"{option}\": must be {choices}")]
    UnknownSubcommand { option: String, choices: String },

    #[error("ambiguous option \"{option}\": must be {choices}")]
    AmbiguousSubcommand { option: String, choices: String },

    #[error("{0}")]
    InvalidValue(String),

    #[error("bad window path name \"{0}\"")]
    UnknownWindow(String),

    #[error("no toplevel registered for window {0}")]
    UnknownWindowId(WindowId),

    #[error("window \"{0}\" is already registered")]
    AlreadyRegistered(String),

    #[error("can't {action} \"{window}\": it is an icon for \"{owner}\"")]
    IsIconFor {
        action: &'static str,
        window: String,
        owner: String,
    },

    #[error("can't {action} \"{window}\": override-redirect flag is set")]
    OverrideRedirect { action: &'static str, window: String },

    #[error("can't iconify \"{0}\": it is a transient")]
    Transient(String),

    #[error("can't iconify \"{0}\": it is an embedded window")]
    Embedded(String),

    #[error("can't make \"{0}\" its own master")]
    OwnMaster(String),

    #[error("can't make \"{master}\" a master: it is an icon for \"{owner}\"")]
    MasterIsIcon { master: String, owner: String },

    #[error("setting \"{master}\" as master creates a transient/master cycle")]
    MasterCycle { master: String },

    #[error("\"{icon}\" is already an icon for \"{owner}\"")]
    AlreadyIcon { icon: String, owner: String },

    #[error("can't use \"{0}\" as its own icon window")]
    OwnIcon(String),

    #[error("can't make \"{0}\" its own group leader")]
    OwnGroupLeader(String),

    #[error("can't create native frame for \"{window}\": {reason}")]
    FrameCreation { window: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_window() {
        let err = WmError::IsIconFor {
            action: "iconify",
            window: ".icon".into(),
            owner: ".main".into(),
        };
        assert_eq!(
            err.to_string(),
            "can't iconify \".icon\": it is an icon for \".main\""
        );
        assert_eq!(
            WmError::BadGeometry("10x".into()).to_string(),
            "bad geometry specifier \"10x\""
        );
    }
}
