//! User application command line parser
//!
//! Turns one input line into a `ClientCommand`, checking argument shape and
//! content locally so nothing malformed is ever sent.

use std::path::PathBuf;

use crate::error::{BoardError, Result};
use crate::model::{Gid, GroupName, MessageText, Mid, Password, Uid};

/// Target of a `subscribe` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeTarget {
    /// `subscribe 0 <name>` creates a group
    Create(GroupName),
    Join(Gid, GroupName),
}

/// A parsed user command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Register { uid: Uid, password: Password },
    Unregister { uid: Uid, password: Password },
    Login { uid: Uid, password: Password },
    Logout,
    ShowUid,
    Exit,
    Groups,
    Subscribe(SubscribeTarget),
    Unsubscribe(Gid),
    MyGroups,
    Select(Gid),
    ShowGid,
    UserList,
    Post { text: MessageText, file: Option<PathBuf> },
    Retrieve(Mid),
}

impl ClientCommand {
    /// Parse one line of user input
    pub fn parse(line: &str) -> Result<ClientCommand> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        if verb == "post" {
            return parse_post(rest);
        }

        let args: Vec<&str> = rest.split_whitespace().collect();
        let command = match (verb, args.as_slice()) {
            ("reg", [uid, password]) => ClientCommand::Register {
                uid: uid.parse()?,
                password: password.parse()?,
            },
            ("unregister" | "unr", [uid, password]) => ClientCommand::Unregister {
                uid: uid.parse()?,
                password: password.parse()?,
            },
            ("login", [uid, password]) => ClientCommand::Login {
                uid: uid.parse()?,
                password: password.parse()?,
            },
            ("logout", []) => ClientCommand::Logout,
            ("showuid" | "su", []) => ClientCommand::ShowUid,
            ("exit", []) => ClientCommand::Exit,
            ("groups" | "gl", []) => ClientCommand::Groups,
            ("subscribe" | "s", [gid, name]) => {
                let name: GroupName = name.parse()?;
                if *gid == "0" || *gid == "00" {
                    ClientCommand::Subscribe(SubscribeTarget::Create(name))
                } else {
                    ClientCommand::Subscribe(SubscribeTarget::Join(parse_gid(gid)?, name))
                }
            }
            ("unsubscribe" | "u", [gid]) => ClientCommand::Unsubscribe(parse_gid(gid)?),
            ("my_groups" | "mgl", []) => ClientCommand::MyGroups,
            ("select" | "sag", [gid]) => ClientCommand::Select(parse_gid(gid)?),
            ("showgid" | "sg", []) => ClientCommand::ShowGid,
            ("ulist" | "ul", []) => ClientCommand::UserList,
            ("retrieve" | "r", [mid]) => ClientCommand::Retrieve(Mid::from_user_input(mid)?),
            ("", _) => return Err(BoardError::malformed("empty command")),
            (verb, _) => {
                return Err(BoardError::malformed(format!(
                    "incorrect usage of {:?}",
                    verb
                )))
            }
        };
        Ok(command)
    }
}

/// Group ids may be typed without zero padding (`7` is `07`)
fn parse_gid(token: &str) -> Result<Gid> {
    if token.len() == 1 {
        format!("0{}", token).parse()
    } else {
        token.parse()
    }
}

/// `post "text" [file]`
fn parse_post(rest: &str) -> Result<ClientCommand> {
    let quoted = rest
        .strip_prefix('"')
        .ok_or_else(|| BoardError::malformed("post text must be quoted"))?;
    let (text, tail) = quoted
        .rsplit_once('"')
        .ok_or_else(|| BoardError::malformed("unterminated post text"))?;

    let text = MessageText::new(text.as_bytes())?;
    let file = match tail.split_whitespace().collect::<Vec<_>>().as_slice() {
        [] => None,
        [path] => {
            let path = PathBuf::from(path);
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| BoardError::malformed("invalid file path"))?;
            if !crate::validation::is_valid_file_name(name) {
                return Err(BoardError::malformed(format!("invalid file name {:?}", name)));
            }
            Some(path)
        }
        _ => return Err(BoardError::malformed("incorrect usage of \"post\"")),
    };

    Ok(ClientCommand::Post { text, file })
}
