//! Background tasks for the cache. Currently only the janitor, which sweeps
//! expired entries out of every tier.

pub(crate) mod janitor;
