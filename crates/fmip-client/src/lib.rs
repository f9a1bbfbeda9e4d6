//! # fmip-client — Find My iPhone Service Client
//!
//! Client library for iCloud's Find My iPhone partition service, providing:
//!
//! - **Partition Discovery** – two-phase handshake resolving the account's
//!   regional service host and opaque scope token
//! - **Device Registry** – client-side cache of last-known device records,
//!   merged by id on every refresh
//! - **Remote Commands** – send message, play sound, lost mode, notify when
//!   found, lock and message, remote lock, remote wipe
//! - **Location Polling** – bounded wait for asynchronous geolocation fixes

pub mod fmip;
