//! Wire schemas for the HTTP boundary the adjudicator sits behind (spec.md
//! §6). The request/response surface itself is out of scope — this crate
//! only fixes the JSON shapes of the three headers (`Challenge`,
//! `Authorization`, `Receipt`) so a client and server can agree on them, and
//! provides the signature checks each header implies.

mod authorization;
mod challenge;
mod receipt;

pub use authorization::{
    AuthorizationError, AuthorizationHeader, ChannelAuthorizationFields, ExactAuthorizationFields,
    PaymentAuthorization,
};
pub use challenge::{Challenge, ChannelExtra, X402_VERSION};
pub use receipt::{ReceiptError, ReceiptHeader};
