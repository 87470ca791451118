pub mod cgm;
pub mod push;

pub use cgm::{CgmClient, CgmEntry, CgmFetch, FetchError};
pub use push::{FcmClient, PushError, PushSend};
