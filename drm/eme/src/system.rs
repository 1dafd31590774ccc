use drm_core::SystemId;

use crate::error::EmeResult;
use crate::key::SessionKey;

/**
    A challenge ready to hand to the page, plus the header it was built
    from so the session can be completed later.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChallenge {
    pub header: String,
    /// Message bytes for the page, in the shape its key system expects.
    pub message: Vec<u8>,
}

/**
    One content protection system the coordinator can drive.

    Implementations hold no per-session state; everything a completion
    needs comes back through `scope` and `header`.
*/
pub trait KeySystem: Send + Sync {
    fn system_id(&self) -> SystemId;

    /**
        Build a license request from whatever the page handed over: raw
        init data, or a message produced by the page's own CDM.
    */
    fn create_challenge(&self, scope: &str, init_data: &[u8]) -> EmeResult<PendingChallenge>;

    /**
        Recover content keys from a license server response.
    */
    fn complete(&self, scope: &str, header: &str, response: &[u8]) -> EmeResult<Vec<SessionKey>>;
}
