//! Entity Store
//!
//! Users, groups, subscriptions and messages persisted as a record tree.
//! Every listing re-scans the tree; nothing is cached between calls.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{BoardError, Result};
use crate::model::{
    FileName, Gid, GroupName, MessageText, Mid, Password, Uid, MAX_GROUPS, MAX_TEXT_LEN,
};
use crate::protocol::GroupSummary;

use super::{RecordTree, StagedFile};

/// Fixed page size of a retrieval
pub const PAGE_SIZE: usize = 20;

const USERS: &str = "USERS";
const GROUPS: &str = "GROUPS";
const STAGING: &str = "STAGING";
const MESSAGES: &str = "MSG";
const AUTHOR_RECORD: &str = "A U T H O R.txt";
const TEXT_RECORD: &str = "T E X T.txt";

/// A file attached to a stored message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: FileName,
    pub size: u64,
    /// Absolute location of the file content
    pub path: PathBuf,
}

/// A stored message as listed for retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageMeta {
    pub mid: Mid,
    pub author: Uid,
    pub text: MessageText,
    pub file: Option<StoredFile>,
}

/// Filesystem-backed entity store
///
/// ## Concurrency:
/// - Exclusive directory creation detects duplicate users
/// - `group_create_lock`: serializes group id allocation
/// - `group_locks`: one mutex per group, serializes message id allocation
/// - All methods use `&self`
pub struct EntityStore {
    tree: RecordTree,

    group_create_lock: Mutex<()>,

    group_locks: Mutex<HashMap<Gid, Arc<Mutex<()>>>>,

    /// Sequence for naming staging records
    next_upload: AtomicU64,
}

impl EntityStore {
    /// Open or create a store rooted at `root`
    ///
    /// On startup:
    /// 1. Create the root and its top-level containers
    /// 2. Discard uploads left in staging by an interrupted run
    pub fn open(root: &Path) -> Result<Self> {
        // Step 1: Top-level containers
        let tree = RecordTree::open(root)?;
        tree.ensure_container(USERS)?;
        tree.ensure_container(GROUPS)?;
        tree.ensure_container(STAGING)?;

        // Step 2: Stale uploads
        let stale = tree.list(STAGING)?;
        if !stale.is_empty() {
            tracing::info!("Discarding {} stale staged uploads", stale.len());
            for name in stale {
                tree.remove(Path::new(STAGING).join(name))?;
            }
        }

        Ok(Self {
            tree,
            group_create_lock: Mutex::new(()),
            group_locks: Mutex::new(HashMap::new()),
            next_upload: AtomicU64::new(1),
        })
    }

    /// Storage root
    pub fn root(&self) -> &Path {
        self.tree.root()
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Register a user
    ///
    /// A user container left without a password record (crash between the
    /// two writes) is repaired rather than reported as a duplicate.
    pub fn create_user(&self, uid: Uid, password: &Password) -> Result<()> {
        let created = self.tree.create_container(user_dir(uid))?;
        if !created {
            if self.tree.exists(password_record(uid)) {
                return Err(BoardError::Duplicate);
            }
            tracing::info!("Repairing user {} with no password record", uid);
        }

        if let Err(e) = self
            .tree
            .write_atomic(password_record(uid), password.as_str().as_bytes())
        {
            if created {
                let _ = self.tree.remove_container(user_dir(uid));
            }
            return Err(e);
        }
        Ok(())
    }

    /// A user exists once its password record does
    pub fn user_exists(&self, uid: Uid) -> bool {
        self.tree.exists(password_record(uid))
    }

    /// Compare against the stored password
    pub fn verify_password(&self, uid: Uid, password: &Password) -> Result<bool> {
        let stored = self
            .tree
            .read(password_record(uid))?
            .ok_or(BoardError::UnknownUser)?;
        Ok(stored == password.as_str().as_bytes())
    }

    pub fn set_logged_in(&self, uid: Uid) -> Result<()> {
        if !self.user_exists(uid) {
            return Err(BoardError::UnknownUser);
        }
        self.tree.touch(login_record(uid))
    }

    /// Clear the login marker; fails with NotLoggedIn if it was not set
    pub fn set_logged_out(&self, uid: Uid) -> Result<()> {
        if self.tree.remove(login_record(uid))? {
            Ok(())
        } else {
            Err(BoardError::NotLoggedIn)
        }
    }

    pub fn is_logged_in(&self, uid: Uid) -> bool {
        self.tree.exists(login_record(uid))
    }

    /// Unregister a user, removing its subscriptions first
    pub fn delete_user(&self, uid: Uid, password: &Password) -> Result<()> {
        if !self.user_exists(uid) {
            return Err(BoardError::UnknownUser);
        }
        if !self.verify_password(uid, password)? {
            return Err(BoardError::WrongPassword);
        }

        for gid in self.group_ids()? {
            self.tree.remove(member_record(gid, uid))?;
        }
        self.tree.remove_container(user_dir(uid))?;

        tracing::debug!("Deleted user {}", uid);
        Ok(())
    }

    // =========================================================================
    // Groups
    // =========================================================================

    /// All active groups, ascending by id
    pub fn list_groups(&self) -> Result<Vec<GroupSummary>> {
        let mut groups = Vec::new();
        for gid in self.group_ids()? {
            let Some(name) = self.group_name(gid)? else {
                continue;
            };
            let last_mid = self.message_ids(gid)?.last().copied().unwrap_or(Mid::ZERO);
            groups.push(GroupSummary {
                gid,
                name,
                last_mid,
            });
        }
        Ok(groups)
    }

    /// Create a group and subscribe its creator
    pub fn create_group(&self, creator: Uid, name: &GroupName) -> Result<Gid> {
        let _guard = self.group_create_lock.lock();

        let groups = self.list_groups()?;
        if groups.len() >= MAX_GROUPS as usize {
            return Err(BoardError::StoreFull);
        }
        if groups.iter().any(|g| g.name == *name) {
            return Err(BoardError::GroupNameTaken);
        }

        // Ids are never reused, so allocate past any container on disk
        let gid = match self.group_ids()?.last() {
            None => Gid::new(1),
            Some(last) => last.next(),
        }
        .ok_or(BoardError::StoreFull)?;

        if !self.tree.create_container(group_dir(gid))? {
            return Err(BoardError::Storage(format!("group container {} already exists", gid)));
        }

        let result = (|| -> Result<()> {
            self.tree.create_container(message_root(gid))?;
            let mut record = name.as_str().as_bytes().to_vec();
            record.push(b'\n');
            self.tree.write_atomic(name_record(gid), &record)?;
            self.tree.touch(member_record(gid, creator))
        })();

        if let Err(e) = result {
            let _ = self.tree.remove_container(group_dir(gid));
            return Err(e);
        }

        tracing::debug!("Created group {} ({}) for {}", gid, name, creator);
        Ok(gid)
    }

    /// A group exists once its name record does
    pub fn group_exists(&self, gid: Gid) -> bool {
        self.tree.exists(name_record(gid))
    }

    pub fn group_name_matches(&self, gid: Gid, name: &GroupName) -> Result<bool> {
        Ok(self.group_name(gid)?.ok_or(BoardError::UnknownGroup)? == *name)
    }

    /// Add a subscription marker (idempotent)
    pub fn subscribe(&self, uid: Uid, gid: Gid) -> Result<()> {
        if !self.group_exists(gid) {
            return Err(BoardError::UnknownGroup);
        }
        self.tree.touch(member_record(gid, uid))
    }

    /// Remove a subscription marker; not being a member is not an error
    pub fn unsubscribe(&self, uid: Uid, gid: Gid) -> Result<()> {
        if !self.group_exists(gid) {
            return Err(BoardError::UnknownGroup);
        }
        self.tree.remove(member_record(gid, uid))?;
        Ok(())
    }

    /// Groups the user is subscribed to, ascending
    pub fn list_subscriptions(&self, uid: Uid) -> Result<Vec<Gid>> {
        Ok(self
            .group_ids()?
            .into_iter()
            .filter(|gid| self.group_exists(*gid) && self.is_member(uid, *gid))
            .collect())
    }

    /// Subscribed users of a group; unrecognised entries are skipped
    pub fn list_members(&self, gid: Gid) -> Result<Vec<Uid>> {
        if !self.group_exists(gid) {
            return Err(BoardError::UnknownGroup);
        }
        Ok(self
            .tree
            .list(group_dir(gid))?
            .iter()
            .filter_map(|name| name.strip_suffix(".txt"))
            .filter_map(|stem| stem.parse::<Uid>().ok())
            .collect())
    }

    pub fn is_member(&self, uid: Uid, gid: Gid) -> bool {
        self.tree.exists(member_record(gid, uid))
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Id the next message of the group would get
    ///
    /// Fails with MessageLimit once `9999` is taken.
    pub fn next_message_id(&self, gid: Gid) -> Result<Mid> {
        if !self.group_exists(gid) {
            return Err(BoardError::UnknownGroup);
        }
        match self.message_ids(gid)?.last() {
            None => Mid::new(1).ok_or(BoardError::MessageLimit),
            Some(last) => last.next().ok_or(BoardError::MessageLimit),
        }
    }

    /// Open a staging record for an incoming file payload
    pub fn stage_upload(&self) -> Result<StagedFile> {
        let seq = self.next_upload.fetch_add(1, Ordering::Relaxed);
        let key = Path::new(STAGING).join(format!("{}-{:08}.part", std::process::id(), seq));
        StagedFile::create(self.tree.path(key))
    }

    /// Persist a message and return its id
    ///
    /// Holds the group lock across id allocation and the record writes. Any
    /// failure removes the partially created message container.
    pub fn create_message(
        &self,
        gid: Gid,
        author: Uid,
        text: &MessageText,
        file: Option<(FileName, StagedFile)>,
    ) -> Result<Mid> {
        let lock = self.group_lock(gid);
        let _guard = lock.lock();

        let mid = self.next_message_id(gid)?;
        let dir = message_dir(gid, mid);
        if !self.tree.create_container(&dir)? {
            return Err(BoardError::Storage(format!("message {}/{} already exists", gid, mid)));
        }

        let result = (|| -> Result<()> {
            self.tree
                .write(dir.join(AUTHOR_RECORD), format!("{}\n", author).as_bytes())?;
            self.tree.write(dir.join(TEXT_RECORD), text.as_bytes())?;
            if let Some((name, staged)) = file {
                staged.finish(|source| self.tree.adopt(source, dir.join(name.as_str())))?;
            }
            Ok(())
        })();

        if let Err(e) = result {
            tracing::warn!("Rolling back message {}/{}: {}", gid, mid, e);
            let _ = self.tree.remove_container(&dir);
            return Err(e);
        }

        tracing::debug!("Stored message {}/{} by {}", gid, mid, author);
        Ok(mid)
    }

    /// Messages with id >= `start`, ascending, at most one page
    ///
    /// Messages with a missing or invalid author or text record are skipped.
    pub fn messages_from(&self, gid: Gid, start: Mid) -> Result<Vec<MessageMeta>> {
        if !self.group_exists(gid) {
            return Err(BoardError::UnknownGroup);
        }

        let mut page = Vec::with_capacity(PAGE_SIZE);
        for mid in self.message_ids(gid)?.into_iter().filter(|mid| *mid >= start) {
            if page.len() == PAGE_SIZE {
                break;
            }
            if let Some(meta) = self.load_message(gid, mid)? {
                page.push(meta);
            }
        }
        Ok(page)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn group_lock(&self, gid: Gid) -> Arc<Mutex<()>> {
        self.group_locks.lock().entry(gid).or_default().clone()
    }

    /// Group containers on disk, ascending
    fn group_ids(&self) -> Result<Vec<Gid>> {
        let mut ids: Vec<Gid> = self
            .tree
            .list(GROUPS)?
            .iter()
            .filter_map(|name| name.parse().ok())
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn group_name(&self, gid: Gid) -> Result<Option<GroupName>> {
        let Some(record) = self.tree.read(name_record(gid))? else {
            return Ok(None);
        };
        let name = String::from_utf8_lossy(&record);
        Ok(name.trim_end_matches('\n').parse().ok())
    }

    /// Message containers of a group, ascending
    fn message_ids(&self, gid: Gid) -> Result<Vec<Mid>> {
        let mut ids: Vec<Mid> = self
            .tree
            .list(message_root(gid))?
            .iter()
            .filter_map(|name| name.parse().ok())
            .filter(|mid| *mid != Mid::ZERO)
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn load_message(&self, gid: Gid, mid: Mid) -> Result<Option<MessageMeta>> {
        let dir = message_dir(gid, mid);

        let Some(author) = self.tree.read(dir.join(AUTHOR_RECORD))? else {
            return Ok(None);
        };
        let Ok(author) = String::from_utf8_lossy(&author).trim_end().parse::<Uid>() else {
            return Ok(None);
        };

        let Some(mut text) = self.tree.read(dir.join(TEXT_RECORD))? else {
            return Ok(None);
        };
        text.truncate(MAX_TEXT_LEN);
        let text = MessageText::new(text)?;

        let mut file = None;
        for entry in self.tree.list(&dir)? {
            if entry == AUTHOR_RECORD || entry == TEXT_RECORD {
                continue;
            }
            if let Ok(name) = entry.parse::<FileName>() {
                let key = dir.join(&entry);
                file = Some(StoredFile {
                    name,
                    size: self.tree.size(&key)?,
                    path: self.tree.path(&key),
                });
                break;
            }
        }

        Ok(Some(MessageMeta {
            mid,
            author,
            text,
            file,
        }))
    }
}

// =============================================================================
// Layout
// =============================================================================

fn user_dir(uid: Uid) -> PathBuf {
    Path::new(USERS).join(uid.to_string())
}

fn password_record(uid: Uid) -> PathBuf {
    user_dir(uid).join(format!("{}_pass.txt", uid))
}

fn login_record(uid: Uid) -> PathBuf {
    user_dir(uid).join(format!("{}_login.txt", uid))
}

fn group_dir(gid: Gid) -> PathBuf {
    Path::new(GROUPS).join(gid.to_string())
}

fn name_record(gid: Gid) -> PathBuf {
    group_dir(gid).join(format!("{}_name.txt", gid))
}

fn member_record(gid: Gid, uid: Uid) -> PathBuf {
    group_dir(gid).join(format!("{}.txt", uid))
}

fn message_root(gid: Gid) -> PathBuf {
    group_dir(gid).join(MESSAGES)
}

fn message_dir(gid: Gid, mid: Mid) -> PathBuf {
    message_root(gid).join(mid.to_string())
}
