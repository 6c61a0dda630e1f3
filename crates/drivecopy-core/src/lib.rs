//! drivecopy Core - Domain logic and the transfer workflow
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `TransferRequest`, `RemoteEntry`, `EntryPath`, `ContentHash`
//! - **Error taxonomy** - `TransferError` shared by every adapter
//! - **Port definitions** - Traits for adapters: `IRemoteRepository`,
//!   `ICredentialProvider`, `IDirectoryArchiver`
//! - **Use cases** - `TransferUseCase` (upload / replace / download)
//!
//! # Architecture
//!
//! The domain module holds plain data and validation with no I/O beyond
//! local content hashing. Ports define trait interfaces that adapter crates
//! (`drivecopy-drive`, `drivecopy-archive`) implement. The use case
//! orchestrates domain types through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
