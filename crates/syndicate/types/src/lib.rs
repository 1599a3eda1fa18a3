//! Syndicate Domain Types
//!
//! This crate defines the domain types for pooled-fund groups: parties
//! that pool capital, vote on how it is deployed into option-selling
//! strategies, and later vote on redeploying or withdrawing profit.
//!
//! # Key Concepts
//!
//! - **Group**: a pooled fund jointly owned by at most [`MAX_MEMBERS`] members.
//! - **Share**: a member's proportional ownership of the pool, in basis
//!   points (10000 = 100%), floored per member.
//! - **Proposal**: a timed, votable request to act on behalf of a group.
//!   One member, one vote, regardless of contribution size.
//! - **Quorum**: strict majority of the group's members.
//! - **Audit Journal**: receipt-based accountability for every mutation.
//!
//! # Architecture
//!
//! This is a pure types crate with no runtime dependencies. All records
//! implement `Clone`, `Debug`, `Serialize`, `Deserialize`. IDs use the
//! newtype pattern and implement `Display`.

#![deny(unsafe_code)]

mod amount;
mod audit;
mod envelope;
mod errors;
mod group;
mod ids;
mod membership;
mod proposal;
mod tracking;

pub use amount::*;
pub use audit::*;
pub use envelope::*;
pub use errors::*;
pub use group::*;
pub use ids::*;
pub use membership::*;
pub use proposal::*;
pub use tracking::*;
