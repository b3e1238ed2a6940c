//! XSMB results: the upstream draw table and its reduction to two-digit tails.

pub mod client;
pub mod response;

pub use client::{XsmbClient, XsmbError};
pub use response::{DrawData, DrawEntry, PRIZE_TIERS, XsmbResponse};
