//! Depletable shared resource states for the Farmstead allocation engine.
//!
//! These containers know nothing about farms or policies. They hold the
//! physical state of the shared aquifer and community storage, enforce their
//! bounds, and report every clamp so callers can record unmet demand.
//!
//! # Modules
//!
//! - [`aquifer`] -- [`AquiferState`] with drawdown-dependent pumping energy
//!   and annual recharge.
//! - [`storage`] -- [`WaterStorageState`] with capacity clamping and
//!   evaporation.
//! - [`transfer`] -- [`Withdrawal`] and [`Deposit`] outcomes of clamped
//!   transfers.
//! - [`error`] -- [`ResourceError`].

pub mod aquifer;
pub mod error;
pub mod storage;
pub mod transfer;

pub use aquifer::{AquiferParams, AquiferState, sustainability_ratio};
pub use error::ResourceError;
pub use storage::{StorageParams, WaterStorageState};
pub use transfer::{Deposit, Withdrawal};
