pub mod commands;
pub mod error;
pub mod links;
pub mod paths;
pub mod plan;
pub mod preflight;
pub mod reconcile;
pub mod ui;
pub mod versions;
pub mod xcodes;

#[cfg(test)]
pub mod test_utils;
