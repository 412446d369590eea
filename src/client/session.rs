//! Client session context

use crate::model::{Gid, Password, Uid};

/// Login state and selected group of one user application
#[derive(Debug, Clone, Default)]
pub struct Session {
    credentials: Option<(Uid, Password)>,
    selected: Option<Gid>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_logged_in(&self) -> bool {
        self.credentials.is_some()
    }

    /// Logged-in user id
    pub fn uid(&self) -> Option<Uid> {
        self.credentials.as_ref().map(|(uid, _)| *uid)
    }

    pub fn credentials(&self) -> Option<(Uid, &Password)> {
        self.credentials.as_ref().map(|(uid, password)| (*uid, password))
    }

    pub fn log_in(&mut self, uid: Uid, password: Password) {
        self.credentials = Some((uid, password));
    }

    /// Forget the user and the selected group
    pub fn log_out(&mut self) {
        self.credentials = None;
        self.selected = None;
    }

    pub fn selected_group(&self) -> Option<Gid> {
        self.selected
    }

    pub fn select_group(&mut self, gid: Gid) {
        self.selected = Some(gid);
    }
}
