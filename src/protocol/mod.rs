//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Control Plane (UDP)
//!
//! One request per datagram, one reply per datagram. Space-separated ASCII
//! tokens terminated by exactly one newline.
//! ```text
//! ┌──────────┬───┬───────────────────────────────┬────┐
//! │ Code (3) │ ␠ │  fields separated by ␠        │ \n │
//! └──────────┴───┴───────────────────────────────┴────┘
//! ```
//!
//! ## Data Plane (TCP)
//!
//! One exchange per connection. A 3-letter code and a space, then fields.
//! Length-prefixed fields (text size, file size) are consumed by reading
//! exactly the announced number of bytes; the exchange ends with a single
//! newline.
//! ```text
//! PST uid gid tsize text [fname fsize <fsize raw bytes>] \n
//! ```
//!
//! ### Commands
//! | verb          | request | reply |
//! |---------------|---------|-------|
//! | register      | REG     | RRG   |
//! | unregister    | UNR     | RUN   |
//! | login         | LOG     | RLO   |
//! | logout        | OUT     | ROU   |
//! | list-groups   | GLS     | RGL   |
//! | subscribe     | GSR     | RGS   |
//! | unsubscribe   | GUR     | RGU   |
//! | my-groups     | GLM     | RGM   |
//! | list-members  | ULS     | RUL   |
//! | post          | PST     | RPT   |
//! | retrieve      | RTV     | RRT   |

mod command;
mod response;
mod codec;
mod frame;
mod data;

pub use command::{CommandKind, GroupTarget, Plane, Request};
pub use response::{ControlReply, GroupSummary, Status};
pub use codec::{
    decode_control_reply, decode_control_request, encode_control_reply, encode_control_request,
    malformed_reply, ERR_REPLY, MAX_CONTROL_DATAGRAM,
};
pub use frame::{FrameReader, MAX_CONFIRMATION_LEN};
pub use data::{
    decode_member_list, decode_post_reply, encode_list_members, encode_member_list,
    encode_post_header, encode_post_reply, encode_retrieve, read_command_code, read_file_size,
    read_gid_field, read_start_mid, read_text, read_text_size, read_uid_field, MemberList,
};
