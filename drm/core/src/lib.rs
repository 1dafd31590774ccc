#![allow(clippy::doc_overindented_list_items)]

mod constants;
mod error;
mod pssh;
mod reader;
mod types;

pub mod utils;

pub use self::constants::{CLEARKEY_SYSTEM_ID, PLAYREADY_SYSTEM_ID, WIDEVINE_SYSTEM_ID};
pub use self::error::{ContentKeyError, ParseError, PsshError};
pub use self::pssh::PsshBox;
pub use self::reader::{ReadError, Reader};
pub use self::types::{ContentKey, SystemId};
pub use self::utils::{format_uuid, parse_kid, swap_guid_bytes};
