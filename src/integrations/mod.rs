//! External service integrations.

pub mod lhdn_client {
    pub use crate::lhdn_client::*;
}
