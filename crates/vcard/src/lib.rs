//! vcard-temp profiles as nested string trees.

pub mod client;
pub mod codec;

pub use client::{VCardClient, VCardError};
pub use codec::{VCardTree, VCardValue};
