//! sea-orm entities

pub mod address;
pub mod user;
