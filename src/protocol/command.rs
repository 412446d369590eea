//! Command definitions
//!
//! The fixed bidirectional command table and the decoded control-plane
//! requests.

use crate::model::{Gid, GroupName, Password, Uid};

/// Which transport carries a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    /// UDP request/reply
    Control,
    /// TCP streaming
    Data,
}

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Register,
    Unregister,
    Login,
    Logout,
    ListGroups,
    Subscribe,
    Unsubscribe,
    MyGroups,
    ListMembers,
    Post,
    Retrieve,
}

/// (kind, human verb, request code, reply code)
const COMMAND_TABLE: [(CommandKind, &str, &str, &str); 11] = [
    (CommandKind::Register, "register", "REG", "RRG"),
    (CommandKind::Unregister, "unregister", "UNR", "RUN"),
    (CommandKind::Login, "login", "LOG", "RLO"),
    (CommandKind::Logout, "logout", "OUT", "ROU"),
    (CommandKind::ListGroups, "list-groups", "GLS", "RGL"),
    (CommandKind::Subscribe, "subscribe", "GSR", "RGS"),
    (CommandKind::Unsubscribe, "unsubscribe", "GUR", "RGU"),
    (CommandKind::MyGroups, "my-groups", "GLM", "RGM"),
    (CommandKind::ListMembers, "list-members", "ULS", "RUL"),
    (CommandKind::Post, "post", "PST", "RPT"),
    (CommandKind::Retrieve, "retrieve", "RTV", "RRT"),
];

impl CommandKind {
    fn row(self) -> &'static (CommandKind, &'static str, &'static str, &'static str) {
        // The table holds every variant exactly once
        &COMMAND_TABLE[self as usize]
    }

    /// Human-readable verb
    pub fn verb(self) -> &'static str {
        self.row().1
    }

    /// Three-letter request code
    pub fn request_code(self) -> &'static str {
        self.row().2
    }

    /// Three-letter reply code
    pub fn reply_code(self) -> &'static str {
        self.row().3
    }

    pub fn from_verb(verb: &str) -> Option<CommandKind> {
        COMMAND_TABLE.iter().find(|row| row.1 == verb).map(|row| row.0)
    }

    pub fn from_request_code(code: &str) -> Option<CommandKind> {
        COMMAND_TABLE.iter().find(|row| row.2 == code).map(|row| row.0)
    }

    pub fn from_reply_code(code: &str) -> Option<CommandKind> {
        COMMAND_TABLE.iter().find(|row| row.3 == code).map(|row| row.0)
    }

    /// Transport that carries this command
    pub fn plane(self) -> Plane {
        match self {
            CommandKind::ListMembers | CommandKind::Post | CommandKind::Retrieve => Plane::Data,
            _ => Plane::Control,
        }
    }

    /// Whether a malformed request of this kind is answered with a NOK status
    /// (the others only have `ERR`)
    pub fn has_nok_status(self) -> bool {
        matches!(
            self,
            CommandKind::Register
                | CommandKind::Unregister
                | CommandKind::Login
                | CommandKind::Logout
                | CommandKind::Subscribe
                | CommandKind::Unsubscribe
        )
    }
}

/// Group selector of a subscribe request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupTarget {
    /// `00`: create a new group
    Create,
    /// Join an existing group
    Existing(Gid),
}

/// A parsed control-plane request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Register { uid: Uid, password: Password },
    Unregister { uid: Uid, password: Password },
    Login { uid: Uid, password: Password },
    Logout { uid: Uid, password: Password },
    ListGroups,
    Subscribe { uid: Uid, target: GroupTarget, name: GroupName },
    Unsubscribe { uid: Uid, gid: Gid },
    MyGroups { uid: Uid },
}

impl Request {
    /// Get the command type
    pub fn kind(&self) -> CommandKind {
        match self {
            Request::Register { .. } => CommandKind::Register,
            Request::Unregister { .. } => CommandKind::Unregister,
            Request::Login { .. } => CommandKind::Login,
            Request::Logout { .. } => CommandKind::Logout,
            Request::ListGroups => CommandKind::ListGroups,
            Request::Subscribe { .. } => CommandKind::Subscribe,
            Request::Unsubscribe { .. } => CommandKind::Unsubscribe,
            Request::MyGroups { .. } => CommandKind::MyGroups,
        }
    }
}
