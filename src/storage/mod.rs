//! Storage Module
//!
//! Persistent entity store using directories as records.
//!
//! ## Responsibilities
//! - Persist users, groups, subscriptions and messages
//! - Detect duplicates with exclusive creation
//! - Serialize group and message id allocation
//! - Stage uploads until their message can be assembled
//!
//! ## Layout
//! ```text
//! {data_dir}/
//! ├── USERS/
//! │   └── 12345/
//! │       ├── 12345_pass.txt        password
//! │       └── 12345_login.txt       present while logged in
//! ├── GROUPS/
//! │   └── 01/
//! │       ├── 01_name.txt           group name + "\n"
//! │       ├── 12345.txt             subscription marker
//! │       └── MSG/
//! │           └── 0001/
//! │               ├── A U T H O R.txt   author uid + "\n"
//! │               ├── T E X T.txt       message text
//! │               └── report.pdf        optional upload
//! └── STAGING/                      uploads in flight
//! ```

mod tree;
mod staging;
mod store;

pub use tree::RecordTree;
pub use staging::StagedFile;
pub use store::{EntityStore, MessageMeta, StoredFile, PAGE_SIZE};
