//! CLI command implementations

pub(crate) mod common;
pub(crate) mod encrypt;
pub(crate) mod keygen;
pub(crate) mod migrate;
pub(crate) mod rotate_key;
pub(crate) mod status;
