#![allow(clippy::doc_overindented_list_items)]

/*!
    PlayReady wire formats: device files, XMR licenses, header objects and
    the SOAP vocabulary. No cryptography lives here.
*/

mod error;

pub mod key;
pub mod prd;
pub mod pro;
pub mod soap;
pub mod utf16;
pub mod wrm_header;
pub mod xmr;

pub use self::error::{FormatError, FormatResult};
