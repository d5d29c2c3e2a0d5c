use std::{net::Ipv4Addr, time::Duration};

use futures::stream::{self, StreamExt};
use log::{debug, info};
use tokio::{sync::mpsc, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    constants::{DEFAULT_CONCURRENCY, DEFAULT_PING_PROGRAM, DEFAULT_PROBE_TIMEOUT},
    error::{Error, Result},
    notification::{HostUp, NotificationHandler},
    probe::{PingCommand, Prober, ReachabilityCheck},
    range::AddressRange,
};

#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub probe_timeout: Duration,
    pub concurrency: usize,
    pub ping_program: String,
}

#[derive(Debug, Clone)]
pub struct SweepConfigBuilder {
    probe_timeout: Duration,
    concurrency: usize,
    ping_program: String,
}

impl Default for SweepConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SweepConfigBuilder {
    pub fn new() -> Self {
        Self {
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
            ping_program: DEFAULT_PING_PROGRAM.into(),
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_ping_program(mut self, program: &str) -> Self {
        self.ping_program = program.into();
        self
    }

    /// # Errors
    /// Returns [`Error::InvalidConfig`] for a zero concurrency bound or a zero timeout.
    pub fn build(self) -> Result<SweepConfig> {
        if self.concurrency == 0 {
            return Err(Error::InvalidConfig("concurrency must be at least 1".into()));
        }
        if self.probe_timeout.is_zero() {
            return Err(Error::InvalidConfig("probe timeout must be non-zero".into()));
        }
        Ok(SweepConfig {
            probe_timeout: self.probe_timeout,
            concurrency: self.concurrency,
            ping_program: self.ping_program,
        })
    }
}

/// Result of a sweep.
///
/// `live_hosts` is in the order the probes completed, which varies between
/// runs. Sort it (or use [`SweepOutcome::into_sorted`]) if address order matters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SweepOutcome {
    pub live_hosts: Vec<Ipv4Addr>,
    /// Probes that ran to completion.
    pub completed: u64,
    /// Usable hosts in the swept range.
    pub total: u64,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl SweepOutcome {
    pub fn count(&self) -> usize {
        self.live_hosts.len()
    }

    pub fn into_sorted(mut self) -> Vec<Ipv4Addr> {
        self.live_hosts.sort();
        self.live_hosts
    }
}

/// Probes every host of an [`AddressRange`] with a bounded number of probes in flight.
///
/// Each live host is reported to subscribers the moment its probe resolves and
/// appended to the outcome in completion order. Failed probes only ever count as
/// down hosts, so a sweep cannot fail once it has started.
///
/// # Example
/// ```no_run
/// use ping_sweep::{range::AddressRange, sweep::{SweepConfigBuilder, Sweeper}};
///
/// tokio_test::block_on(async {
///     let sweeper = Sweeper::new(SweepConfigBuilder::new().build().unwrap());
///     let range: AddressRange = "192.168.1.0/24".parse().unwrap();
///     let mut events = sweeper.subscribe().await;
///     let outcome = sweeper.sweep(&range).await;
///     while let Ok(event) = events.try_recv() {
///         println!("{} is up", event.target_ip);
///     }
///     println!("{} hosts up", outcome.count());
/// })
/// ```
#[derive(Debug)]
pub struct Sweeper<C = PingCommand> {
    prober: Prober<C>,
    concurrency: usize,
    notification_handler: NotificationHandler,
}

impl Sweeper<PingCommand> {
    pub fn new(config: SweepConfig) -> Self {
        let check = PingCommand::new(&config.ping_program);
        Self::with_check(check, &config)
    }
}

impl<C: ReachabilityCheck> Sweeper<C> {
    /// Creates a sweeper that uses a custom reachability check.
    pub fn with_check(check: C, config: &SweepConfig) -> Self {
        Self {
            prober: Prober::new(check, config.probe_timeout),
            concurrency: config.concurrency.max(1),
            notification_handler: NotificationHandler::new(),
        }
    }

    /// Registers for a [`HostUp`] event per live host found by subsequent sweeps.
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<HostUp> {
        self.notification_handler.register_subscriber().await
    }

    pub async fn sweep(&self, range: &AddressRange) -> SweepOutcome {
        self.sweep_until(range, CancellationToken::new()).await
    }

    /// Sweeps `range` until every host is probed or `token` is cancelled.
    ///
    /// On cancellation no further probes are started, the ones in flight are
    /// abandoned, and whatever was found so far is returned.
    pub async fn sweep_until(&self, range: &AddressRange, token: CancellationToken) -> SweepOutcome {
        let start = Instant::now();
        let total = range.host_count();
        info!(
            "sweeping {} ({} hosts, {} probes in flight, {:?} timeout)",
            range,
            total,
            self.concurrency,
            self.prober.timeout()
        );

        let mut outcomes = stream::iter(range.hosts())
            .map(|target_ip| self.prober.probe(target_ip))
            .buffer_unordered(self.concurrency);

        let mut live_hosts = Vec::new();
        let mut completed = 0;
        let mut cancelled = false;
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    cancelled = true;
                    break;
                }
                next = outcomes.next() => {
                    let Some(outcome) = next else {
                        break;
                    };
                    completed += 1;
                    if outcome.is_up() {
                        debug!("{} is up", outcome.target_ip);
                        live_hosts.push(outcome.target_ip);
                        self.notification_handler
                            .notify(HostUp {
                                target_ip: outcome.target_ip,
                                elapsed: start.elapsed(),
                            })
                            .await;
                    }
                }
            }
        }

        let elapsed = start.elapsed();
        if cancelled {
            info!(
                "sweep of {} cancelled after {}/{} probes, {} hosts up",
                range,
                completed,
                total,
                live_hosts.len()
            );
        } else {
            info!(
                "sweep of {} finished in {:?}, {} hosts up",
                range,
                elapsed,
                live_hosts.len()
            );
        }
        SweepOutcome {
            live_hosts,
            completed,
            total,
            cancelled,
            elapsed,
        }
    }
}
