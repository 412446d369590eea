//! Client Module
//!
//! The user application: parses commands, checks local preconditions
//! against the session, then talks to the server over the right plane.
//!
//! ## Architecture
//! ```text
//! input line ─▶ ClientCommand ─▶ Client::execute(&mut Session)
//!                                   ├─▶ ControlChannel (UDP, retried)
//!                                   └─▶ DataChannel    (TCP, per command)
//! ```

mod session;
mod udp;
mod tcp;
mod command;

pub use session::Session;
pub use udp::ControlChannel;
pub use tcp::DataChannel;
pub use command::{ClientCommand, SubscribeTarget};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::model::{Gid, Mid, Uid};
use crate::protocol::{
    CommandKind, ControlReply, GroupSummary, GroupTarget, MemberList, Request, Status,
};
use crate::retrieval::{DirectorySink, RetrieveReply, RetrievedMessage};

/// Result of one user command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A control-plane status reply
    Status { kind: CommandKind, status: Status },
    /// The server could not parse the request
    ServerError(CommandKind),
    Groups { kind: CommandKind, groups: Vec<GroupSummary> },
    Members { gid: Gid, members: Vec<Uid> },
    UnknownGroup(Gid),
    Posted(Mid),
    PostRejected,
    Retrieved(Vec<RetrievedMessage>),
    NoMessages,
    NotSubscribed,
    ShowUid(Option<Uid>),
    ShowGid(Option<Gid>),
    Selected(Gid),
    /// A local precondition failed; nothing was sent
    Refused(&'static str),
    Exit,
}

/// The user application
pub struct Client {
    config: ClientConfig,
    control: ControlChannel,
    data: DataChannel,
}

impl Client {
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let control = ControlChannel::connect(&config)?;
        let data = DataChannel::new(&config)?;
        Ok(Self {
            config,
            control,
            data,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run one command against the session
    ///
    /// Errors are transport failures or malformed replies; rejections come
    /// back as an `Outcome`.
    pub fn execute(&self, session: &mut Session, command: ClientCommand) -> Result<Outcome> {
        match command {
            ClientCommand::Register { uid, password } => {
                self.send_control(Request::Register { uid, password })
            }
            ClientCommand::Unregister { uid, password } => {
                let outcome = self.send_control(Request::Unregister { uid, password })?;
                if is_ok(&outcome) && session.uid() == Some(uid) {
                    session.log_out();
                }
                Ok(outcome)
            }
            ClientCommand::Login { uid, password } => {
                if session.is_logged_in() {
                    return Ok(Outcome::Refused("already logged in; log out first"));
                }
                let outcome = self.send_control(Request::Login {
                    uid,
                    password: password.clone(),
                })?;
                if is_ok(&outcome) {
                    session.log_in(uid, password);
                }
                Ok(outcome)
            }
            ClientCommand::Logout => {
                let Some((uid, password)) = session.credentials() else {
                    return Ok(Outcome::Refused("not logged in"));
                };
                let outcome = self.send_control(Request::Logout {
                    uid,
                    password: password.clone(),
                })?;
                if is_ok(&outcome) {
                    session.log_out();
                }
                Ok(outcome)
            }
            ClientCommand::ShowUid => Ok(Outcome::ShowUid(session.uid())),
            ClientCommand::Exit => {
                if let Some((uid, password)) = session.credentials() {
                    let request = Request::Logout {
                        uid,
                        password: password.clone(),
                    };
                    if let Err(e) = self.control.request(&request) {
                        tracing::debug!("Logout on exit failed: {}", e);
                    }
                    session.log_out();
                }
                Ok(Outcome::Exit)
            }
            ClientCommand::Groups => self.send_control(Request::ListGroups),
            ClientCommand::Subscribe(target) => {
                let Some(uid) = session.uid() else {
                    return Ok(Outcome::Refused("log in before subscribing"));
                };
                let (target, name) = match target {
                    SubscribeTarget::Create(name) => (GroupTarget::Create, name),
                    SubscribeTarget::Join(gid, name) => (GroupTarget::Existing(gid), name),
                };
                self.send_control(Request::Subscribe { uid, target, name })
            }
            ClientCommand::Unsubscribe(gid) => {
                let Some(uid) = session.uid() else {
                    return Ok(Outcome::Refused("log in before unsubscribing"));
                };
                self.send_control(Request::Unsubscribe { uid, gid })
            }
            ClientCommand::MyGroups => {
                let Some(uid) = session.uid() else {
                    return Ok(Outcome::Refused("log in before listing your groups"));
                };
                self.send_control(Request::MyGroups { uid })
            }
            ClientCommand::Select(gid) => {
                if !session.is_logged_in() {
                    return Ok(Outcome::Refused("log in before selecting a group"));
                }
                session.select_group(gid);
                Ok(Outcome::Selected(gid))
            }
            ClientCommand::ShowGid => Ok(Outcome::ShowGid(session.selected_group())),
            ClientCommand::UserList => {
                let (_, gid) = match active(session) {
                    Ok(active) => active,
                    Err(reason) => return Ok(Outcome::Refused(reason)),
                };
                match self.data.list_members(gid)? {
                    MemberList::Members { gid, members } => Ok(Outcome::Members { gid, members }),
                    MemberList::UnknownGroup => Ok(Outcome::UnknownGroup(gid)),
                }
            }
            ClientCommand::Post { text, file } => {
                let (uid, gid) = match active(session) {
                    Ok(active) => active,
                    Err(reason) => return Ok(Outcome::Refused(reason)),
                };
                match self.data.post(uid, gid, &text, file.as_deref())? {
                    Some(mid) => Ok(Outcome::Posted(mid)),
                    None => Ok(Outcome::PostRejected),
                }
            }
            ClientCommand::Retrieve(start) => {
                let (uid, gid) = match active(session) {
                    Ok(active) => active,
                    Err(reason) => return Ok(Outcome::Refused(reason)),
                };
                let mut sink = DirectorySink::new(&self.config.download_dir);
                match self.data.retrieve(uid, gid, start, &mut sink)? {
                    RetrieveReply::Page(messages) => Ok(Outcome::Retrieved(messages)),
                    RetrieveReply::Eof => Ok(Outcome::NoMessages),
                    RetrieveReply::NotSubscribed => Ok(Outcome::NotSubscribed),
                }
            }
        }
    }

    fn send_control(&self, request: Request) -> Result<Outcome> {
        let kind = request.kind();
        match self.control.request(&request)? {
            ControlReply::Status { kind, status } => Ok(Outcome::Status { kind, status }),
            ControlReply::Groups { kind, groups } => Ok(Outcome::Groups { kind, groups }),
            ControlReply::Error => Ok(Outcome::ServerError(kind)),
        }
    }
}

/// Logged-in user and selected group, or why the command cannot run
fn active(session: &Session) -> std::result::Result<(Uid, Gid), &'static str> {
    let uid = session.uid().ok_or("log in first")?;
    let gid = session.selected_group().ok_or("select a group first")?;
    Ok((uid, gid))
}

fn is_ok(outcome: &Outcome) -> bool {
    matches!(
        outcome,
        Outcome::Status {
            status: Status::Ok,
            ..
        }
    )
}

/// Human-readable text for a control-plane status
pub fn describe_status(kind: CommandKind, status: Status) -> String {
    let text = match (kind, status) {
        (CommandKind::Register, Status::Ok) => "registered successfully",
        (CommandKind::Register, Status::Dup) => "this user is already registered",
        (CommandKind::Register, _) => "registration failed",
        (CommandKind::Unregister, Status::Ok) => "unregistered successfully",
        (CommandKind::Unregister, _) => "unregister failed; check the credentials",
        (CommandKind::Login, Status::Ok) => "logged in",
        (CommandKind::Login, _) => "login failed; check the credentials",
        (CommandKind::Logout, Status::Ok) => "logged out",
        (CommandKind::Logout, _) => "logout failed",
        (CommandKind::Subscribe, Status::Ok) => "subscribed to the group",
        (CommandKind::Subscribe, Status::New(gid)) => {
            return format!("created and subscribed to group {}", gid)
        }
        (CommandKind::Subscribe, Status::EFull) => "the maximum number of groups has been reached",
        (CommandKind::Subscribe | CommandKind::Unsubscribe | CommandKind::MyGroups, Status::EUsr) => {
            "user is not registered or not logged in"
        }
        (CommandKind::Subscribe | CommandKind::Unsubscribe, Status::EGrp) => {
            "no such group; see 'gl'"
        }
        (CommandKind::Subscribe, Status::EGname) => "invalid or mismatched group name",
        (CommandKind::Subscribe, _) => "subscription failed",
        (CommandKind::Unsubscribe, Status::Ok) => "unsubscribed from the group",
        (CommandKind::Unsubscribe, _) => "unsubscribe failed",
        (_, status) => return format!("{} replied {}", kind.verb(), status),
    };
    text.to_string()
}
