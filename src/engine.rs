//! Engine Module
//!
//! Business rules on top of the entity store.
//!
//! ## Responsibilities
//! - Dispatch control-plane requests and map outcomes to status tokens
//! - Validate membership for the data-plane operations
//! - Persist posts and select retrieval pages
//!
//! Domain failures never escape as errors on the control plane: every
//! request produces exactly one reply.

use std::path::Path;

use crate::config::Config;
use crate::error::{BoardError, Result};
use crate::model::{FileName, Gid, GroupName, MessageText, Mid, Password, Uid};
use crate::protocol::{ControlReply, GroupSummary, GroupTarget, Request, Status};
use crate::storage::{EntityStore, MessageMeta, StagedFile};

/// The message board engine
///
/// ## Concurrency Model
///
/// - The control plane calls `execute` from a single loop
/// - Data-plane connections call the streaming operations concurrently
/// - The store serializes group creation and per-group message ids
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Persistent entities
    store: EntityStore,
}

impl Engine {
    /// Open or create an engine with the given config
    pub fn open(config: Config) -> Result<Self> {
        let store = EntityStore::open(&config.data_dir)?;
        tracing::debug!("Entity store opened at {:?}", config.data_dir);
        Ok(Self { config, store })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    // =========================================================================
    // Control Plane
    // =========================================================================

    /// Execute a control-plane request
    pub fn execute(&self, request: Request) -> ControlReply {
        let kind = request.kind();
        match request {
            Request::Register { uid, password } => {
                ControlReply::status(kind, self.register(uid, &password))
            }
            Request::Unregister { uid, password } => {
                ControlReply::status(kind, self.unregister(uid, &password))
            }
            Request::Login { uid, password } => {
                ControlReply::status(kind, self.login(uid, &password))
            }
            Request::Logout { uid, password } => {
                ControlReply::status(kind, self.logout(uid, &password))
            }
            Request::ListGroups => match self.store.list_groups() {
                Ok(groups) => ControlReply::groups(kind, groups),
                Err(e) => {
                    tracing::warn!("Failed to list groups: {}", e);
                    ControlReply::Error
                }
            },
            Request::Subscribe { uid, target, name } => {
                ControlReply::status(kind, self.subscribe(uid, target, &name))
            }
            Request::Unsubscribe { uid, gid } => {
                ControlReply::status(kind, self.unsubscribe(uid, gid))
            }
            Request::MyGroups { uid } => {
                if !self.is_active_user(uid) {
                    return ControlReply::status(kind, Status::EUsr);
                }
                match self.my_groups(uid) {
                    Ok(groups) => ControlReply::groups(kind, groups),
                    Err(e) => {
                        tracing::warn!("Failed to list subscriptions of {}: {}", uid, e);
                        ControlReply::Error
                    }
                }
            }
        }
    }

    fn register(&self, uid: Uid, password: &Password) -> Status {
        match self.store.create_user(uid, password) {
            Ok(()) => Status::Ok,
            Err(BoardError::Duplicate) => Status::Dup,
            Err(e) => nok("register", e),
        }
    }

    fn unregister(&self, uid: Uid, password: &Password) -> Status {
        match self.store.delete_user(uid, password) {
            Ok(()) => Status::Ok,
            Err(e) => nok("unregister", e),
        }
    }

    fn login(&self, uid: Uid, password: &Password) -> Status {
        match self.check_password(uid, password) {
            Ok(()) => match self.store.set_logged_in(uid) {
                Ok(()) => Status::Ok,
                Err(e) => nok("login", e),
            },
            Err(e) => nok("login", e),
        }
    }

    fn logout(&self, uid: Uid, password: &Password) -> Status {
        match self
            .check_password(uid, password)
            .and_then(|()| self.store.set_logged_out(uid))
        {
            Ok(()) => Status::Ok,
            Err(e) => nok("logout", e),
        }
    }

    fn subscribe(&self, uid: Uid, target: GroupTarget, name: &GroupName) -> Status {
        // Unregistered: NOK. Registered but logged out: E_USR.
        if !self.store.user_exists(uid) {
            return Status::Nok;
        }
        if !self.store.is_logged_in(uid) {
            return Status::EUsr;
        }

        let result = match target {
            GroupTarget::Create => self.store.create_group(uid, name).map(Status::New),
            GroupTarget::Existing(gid) => {
                if !self.store.group_exists(gid) {
                    return Status::EGrp;
                }
                self.store
                    .group_name_matches(gid, name)
                    .and_then(|matches| {
                        if matches {
                            self.store.subscribe(uid, gid)
                        } else {
                            Err(BoardError::GroupNameMismatch)
                        }
                    })
                    .map(|()| Status::Ok)
            }
        };

        result.unwrap_or_else(|e| match e {
            BoardError::StoreFull => Status::EFull,
            BoardError::UnknownGroup => Status::EGrp,
            BoardError::GroupNameTaken | BoardError::GroupNameMismatch => Status::EGname,
            e => nok("subscribe", e),
        })
    }

    fn unsubscribe(&self, uid: Uid, gid: Gid) -> Status {
        if !self.is_active_user(uid) {
            return Status::EUsr;
        }
        match self.store.unsubscribe(uid, gid) {
            Ok(()) => Status::Ok,
            Err(BoardError::UnknownGroup) => Status::EGrp,
            Err(e) => nok("unsubscribe", e),
        }
    }

    fn my_groups(&self, uid: Uid) -> Result<Vec<GroupSummary>> {
        let subscribed = self.store.list_subscriptions(uid)?;
        Ok(self
            .store
            .list_groups()?
            .into_iter()
            .filter(|group| subscribed.contains(&group.gid))
            .collect())
    }

    // =========================================================================
    // Data Plane
    // =========================================================================

    /// Subscribers of a group
    pub fn list_members(&self, gid: Gid) -> Result<Vec<Uid>> {
        self.store.list_members(gid)
    }

    /// Check that `uid` may read from and post to `gid`
    pub fn check_membership(&self, uid: Uid, gid: Gid) -> Result<()> {
        if !self.store.group_exists(gid) {
            return Err(BoardError::UnknownGroup);
        }
        if !self.store.is_member(uid, gid) {
            return Err(BoardError::NotSubscribed);
        }
        Ok(())
    }

    /// Open a staging record for an incoming upload
    pub fn stage_upload(&self) -> Result<StagedFile> {
        self.store.stage_upload()
    }

    /// Persist a fully received post
    pub fn post(
        &self,
        uid: Uid,
        gid: Gid,
        text: &MessageText,
        file: Option<(FileName, StagedFile)>,
    ) -> Result<Mid> {
        self.check_membership(uid, gid)?;
        self.store.create_message(gid, uid, text, file)
    }

    /// The page of messages starting at `start`
    pub fn retrieve(&self, uid: Uid, gid: Gid, start: Mid) -> Result<Vec<MessageMeta>> {
        self.check_membership(uid, gid)?;
        self.store.messages_from(gid, start)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the underlying store
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn check_password(&self, uid: Uid, password: &Password) -> Result<()> {
        if !self.store.user_exists(uid) {
            return Err(BoardError::UnknownUser);
        }
        if !self.store.verify_password(uid, password)? {
            return Err(BoardError::WrongPassword);
        }
        Ok(())
    }

    /// Registered and logged in
    fn is_active_user(&self, uid: Uid) -> bool {
        self.store.user_exists(uid) && self.store.is_logged_in(uid)
    }
}

/// Log a failed request and report NOK
fn nok(command: &str, error: BoardError) -> Status {
    if error.is_rejection() {
        tracing::debug!("{} rejected: {}", command, error);
    } else {
        tracing::warn!("{} failed: {}", command, error);
    }
    Status::Nok
}
