//! # cfgdump - lab device configuration dump
//!
//! `cfgdump` logs into a fixed set of lab routers (Cisco IOS-XE, Arista EOS,
//! Juniper Junos) over SSH, runs the platform's configuration dump command and
//! prints each result between labeled banners. Devices are handled one after
//! another; a device that fails is logged and skipped.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cfgdump::config::RunConfig;
//! use cfgdump::inventory::lab_registry;
//! use cfgdump::report;
//! use cfgdump::session::SshConnector;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let config = RunConfig::from_env();
//!     let devices = lab_registry(&config);
//!     let connector = SshConnector::new(config.security_options(), config.timeout);
//!
//!     let summary = report::run(&connector, &devices, &mut std::io::stdout()).await;
//!     println!("{} of {} devices dumped", summary.reported, summary.attempted);
//! }
//! ```
//!
//! ## Main Components
//!
//! - [`inventory`] - Device registry and platform identifiers
//! - [`dispatch`] - Configuration dump command per platform
//! - [`session::SshConnector`] - Opens SSH sessions with prompt tracking
//! - [`report::run`] - Sequential connect, dump, print, disconnect loop
//! - [`error::ConnectError`] - Error types for every per-device failure
//! - [`config`] - SSH algorithm profiles and environment settings

pub mod config;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod inventory;
pub mod report;
pub mod session;
pub mod templates;
