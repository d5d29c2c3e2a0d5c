//! ## Example
//! Following example demonstrates sweeping every host in an IPv4 subnet and printing live hosts
//! as they are found. The system `ping` binary is used for the reachability checks; a custom
//! check can be plugged in with [`sweep::Sweeper::with_check`].
//! ```no_run
//! use ping_sweep::{AddressRange, SweepConfigBuilder, Sweeper};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let range: AddressRange = "192.168.1.0/24".parse().expect("invalid network");
//!     let config = SweepConfigBuilder::new()
//!         .with_concurrency(64)
//!         .with_probe_timeout(Duration::from_secs(1))
//!         .build()
//!         .unwrap();
//!     let sweeper = Sweeper::new(config);
//!
//!     let mut events = sweeper.subscribe().await;
//!     let printer = tokio::spawn(async move {
//!         while let Some(event) = events.recv().await {
//!             println!("[+] {} is up", event.target_ip);
//!         }
//!     });
//!
//!     let outcome = sweeper.sweep(&range).await;
//!     drop(sweeper);
//!     printer.await.unwrap();
//!     println!("{} hosts found up", outcome.count());
//! }
//! ```

pub mod error;
pub mod probe;
pub mod range;
pub mod sweep;

pub(crate) mod constants;
pub(crate) mod notification;

pub use error::{Error, Result};
pub use notification::HostUp;
pub use probe::{PingCommand, ProbeOutcome, ProbeStatus, Prober, ReachabilityCheck};
pub use range::AddressRange;
pub use sweep::{SweepConfig, SweepConfigBuilder, SweepOutcome, Sweeper};
pub use tokio_util::sync::CancellationToken;
