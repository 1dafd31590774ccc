/*!
    Host-side session layer for encrypted media.

    A page's media key session hands its init data (or the message its own
    CDM produced) to a [`Coordinator`], which answers with a challenge built
    by the local PlayReady CDM and later turns the license response into
    content keys. Devices are picked per scope through a [`DeviceRegistry`].
    ClearKey sessions are handled without a CDM.
*/

mod coordinator;
mod error;
mod key;
mod playready;
mod registry;
mod store;
mod system;

pub mod clearkey;

pub use self::clearkey::ClearKeySystem;
pub use self::coordinator::{Completion, Coordinator, IssuedChallenge};
pub use self::error::{EmeError, EmeResult};
pub use self::key::SessionKey;
pub use self::playready::PlayReadySystem;
pub use self::registry::{DeviceRegistry, DeviceSelector, Profile};
pub use self::store::{SessionState, SessionStore};
pub use self::system::{KeySystem, PendingChallenge};
