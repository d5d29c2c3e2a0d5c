use std::{
    future::Future,
    net::Ipv4Addr,
    process::Stdio,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use log::{debug, trace, warn};
use tokio::process::Command;

use crate::{
    constants::{DEFAULT_PING_PROGRAM, PING_COUNT},
    error::{Error, Result},
};

/// A single reachability check against one address.
///
/// Implementations report `Ok(true)` when the host answered, `Ok(false)` when it
/// did not, and an error only when the check itself could not be carried out.
/// The `timeout` is the per-attempt budget the check should honour; [`Prober`]
/// enforces it regardless.
pub trait ReachabilityCheck: Send + Sync {
    fn check(
        &self,
        target_ip: Ipv4Addr,
        timeout: Duration,
    ) -> impl Future<Output = Result<bool>> + Send;
}

/// Runs the system `ping` binary with a single echo request.
#[derive(Debug, Clone)]
pub struct PingCommand {
    program: String,
}

impl Default for PingCommand {
    fn default() -> Self {
        Self::new(DEFAULT_PING_PROGRAM)
    }
}

impl PingCommand {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn args(target_ip: Ipv4Addr, timeout: Duration) -> Vec<String> {
        PingFlavor::current().args(target_ip, timeout)
    }
}

/// Command line dialects of the system `ping`, which disagree on the wait flag
/// and on its unit.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum PingFlavor {
    /// `-n 1 -w <ms>`
    Windows,
    /// macOS and FreeBSD: `-c 1 -W <ms>`
    Darwin,
    /// OpenBSD and NetBSD: `-c 1 -w <secs>`
    OpenBsd,
    /// iputils and busybox: `-c 1 -W <secs>`
    Linux,
}

impl PingFlavor {
    fn current() -> Self {
        if cfg!(target_os = "windows") {
            PingFlavor::Windows
        } else if cfg!(any(target_os = "macos", target_os = "freebsd")) {
            PingFlavor::Darwin
        } else if cfg!(any(target_os = "openbsd", target_os = "netbsd")) {
            PingFlavor::OpenBsd
        } else {
            PingFlavor::Linux
        }
    }

    fn args(self, target_ip: Ipv4Addr, timeout: Duration) -> Vec<String> {
        let millis = timeout.as_millis().max(1).to_string();
        let secs = (timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0))
            .max(1)
            .to_string();
        let (count_flag, wait_flag, wait) = match self {
            PingFlavor::Windows => ("-n", "-w", millis),
            PingFlavor::Darwin => ("-c", "-W", millis),
            PingFlavor::OpenBsd => ("-c", "-w", secs),
            PingFlavor::Linux => ("-c", "-W", secs),
        };
        vec![
            count_flag.into(),
            PING_COUNT.into(),
            wait_flag.into(),
            wait,
            target_ip.to_string(),
        ]
    }
}

impl ReachabilityCheck for PingCommand {
    async fn check(&self, target_ip: Ipv4Addr, timeout: Duration) -> Result<bool> {
        let status = Command::new(&self.program)
            .args(Self::args(target_ip, timeout))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|err| Error::ProbeUnavailable {
                target_ip,
                reason: format!("failed to run {}, reason: {}", self.program, err),
            })?;
        trace!("{} {} exited with {}", self.program, target_ip, status);
        Ok(status.success())
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum ProbeStatus {
    Down,
    Up,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ProbeOutcome {
    pub status: ProbeStatus,
    pub target_ip: Ipv4Addr,
}

impl ProbeOutcome {
    pub fn new(status: ProbeStatus, target_ip: Ipv4Addr) -> Self {
        Self { status, target_ip }
    }

    pub fn is_up(&self) -> bool {
        self.status == ProbeStatus::Up
    }
}

/// Wraps a [`ReachabilityCheck`] with the per-attempt timeout and turns every
/// failure into [`ProbeStatus::Down`].
///
/// A host that cannot be evaluated is presumed down, so callers only ever see an
/// outcome and never an error.
#[derive(Debug)]
pub struct Prober<C> {
    check: C,
    timeout: Duration,
    reported_unavailable: AtomicBool,
}

impl<C: ReachabilityCheck> Prober<C> {
    pub fn new(check: C, timeout: Duration) -> Self {
        Self {
            check,
            timeout,
            reported_unavailable: AtomicBool::new(false),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probes a single address.
    ///
    /// # Example
    /// ```
    /// use ping_sweep::probe::{PingCommand, Prober};
    /// use std::{net::Ipv4Addr, time::Duration};
    ///
    /// tokio_test::block_on(async {
    ///     let prober = Prober::new(PingCommand::new("/nonexistent/ping"), Duration::from_secs(1));
    ///     let outcome = prober.probe(Ipv4Addr::new(192, 0, 2, 1)).await;
    ///     assert!(!outcome.is_up());
    /// })
    /// ```
    pub async fn probe(&self, target_ip: Ipv4Addr) -> ProbeOutcome {
        let result = tokio::time::timeout(self.timeout, self.check.check(target_ip, self.timeout))
            .await
            .unwrap_or_else(|_| {
                Err(Error::ProbeTimeout {
                    target_ip,
                    timeout: self.timeout,
                })
            });
        let status = match result {
            Ok(true) => ProbeStatus::Up,
            Ok(false) => ProbeStatus::Down,
            Err(err) => {
                self.report(&err);
                ProbeStatus::Down
            }
        };
        ProbeOutcome::new(status, target_ip)
    }

    fn report(&self, err: &Error) {
        match err {
            Error::ProbeUnavailable { .. } | Error::Opaque(_)
                if !self.reported_unavailable.swap(true, Ordering::Relaxed) =>
            {
                warn!("{}, treating host as down", err);
            }
            _ => debug!("{}, treating host as down", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        net::Ipv4Addr,
        time::{Duration, Instant},
    };

    use super::{PingCommand, PingFlavor, ProbeStatus, Prober, ReachabilityCheck};
    use crate::error::{Error, Result};

    struct Fixed(Result<bool>);

    impl ReachabilityCheck for Fixed {
        async fn check(&self, target_ip: Ipv4Addr, _timeout: Duration) -> Result<bool> {
            match &self.0 {
                Ok(up) => Ok(*up),
                Err(_) => Err(Error::ProbeUnavailable {
                    target_ip,
                    reason: "permission denied".into(),
                }),
            }
        }
    }

    struct Broken;

    impl ReachabilityCheck for Broken {
        async fn check(&self, _target_ip: Ipv4Addr, _timeout: Duration) -> Result<bool> {
            Err(Error::Opaque("raw socket closed".into()))
        }
    }

    struct Hanging;

    impl ReachabilityCheck for Hanging {
        async fn check(&self, _target_ip: Ipv4Addr, _timeout: Duration) -> Result<bool> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(true)
        }
    }

    const TARGET: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

    #[tokio::test]
    async fn test_success_is_up() {
        let prober = Prober::new(Fixed(Ok(true)), Duration::from_secs(1));
        let outcome = prober.probe(TARGET).await;
        assert_eq!(outcome.status, ProbeStatus::Up);
        assert_eq!(outcome.target_ip, TARGET);
    }

    #[tokio::test]
    async fn test_failure_is_down() {
        let prober = Prober::new(Fixed(Ok(false)), Duration::from_secs(1));
        assert_eq!(prober.probe(TARGET).await.status, ProbeStatus::Down);
    }

    #[tokio::test]
    async fn test_unavailable_is_swallowed() {
        let prober = Prober::new(Fixed(Err(Error::Opaque("unused".into()))), Duration::from_secs(1));
        assert_eq!(prober.probe(TARGET).await.status, ProbeStatus::Down);
        assert_eq!(prober.probe(TARGET).await.status, ProbeStatus::Down);
    }

    #[tokio::test]
    async fn test_custom_check_failure_is_down() {
        let prober = Prober::new(Broken, Duration::from_secs(1));
        let outcome = prober.probe(TARGET).await;
        assert_eq!(outcome.status, ProbeStatus::Down);
        assert_eq!(outcome.target_ip, TARGET);
    }

    #[tokio::test]
    async fn test_hanging_check_is_cut_off() {
        let prober = Prober::new(Hanging, Duration::from_millis(50));
        let start = Instant::now();
        assert!(!prober.probe(TARGET).await.is_up());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_missing_ping_binary_is_unavailable() {
        let ping = PingCommand::new("/nonexistent/ping-sweep-test-binary");
        let err = ping
            .check(TARGET, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProbeUnavailable { target_ip, .. } if target_ip == TARGET));
    }

    #[test]
    fn test_ping_args() {
        let args = PingCommand::args(TARGET, Duration::from_secs(1));
        assert_eq!(args[1], "1");
        assert_eq!(args.last().unwrap(), "10.0.0.1");
        if cfg!(target_os = "linux") {
            assert_eq!(args, vec!["-c", "1", "-W", "1", "10.0.0.1"]);
            let args = PingCommand::args(TARGET, Duration::from_millis(1500));
            assert_eq!(args[3], "2");
        }
        if cfg!(any(target_os = "openbsd", target_os = "netbsd")) {
            assert_eq!(args, vec!["-c", "1", "-w", "1", "10.0.0.1"]);
        }
        if cfg!(any(target_os = "macos", target_os = "freebsd")) {
            assert_eq!(args, vec!["-c", "1", "-W", "1000", "10.0.0.1"]);
        }
    }

    #[test]
    fn test_wait_flag_and_unit_per_flavor() {
        let timeout = Duration::from_millis(1500);
        assert_eq!(
            PingFlavor::Windows.args(TARGET, timeout),
            vec!["-n", "1", "-w", "1500", "10.0.0.1"]
        );
        assert_eq!(
            PingFlavor::Darwin.args(TARGET, timeout),
            vec!["-c", "1", "-W", "1500", "10.0.0.1"]
        );
        assert_eq!(
            PingFlavor::OpenBsd.args(TARGET, timeout),
            vec!["-c", "1", "-w", "2", "10.0.0.1"]
        );
        assert_eq!(
            PingFlavor::Linux.args(TARGET, timeout),
            vec!["-c", "1", "-W", "2", "10.0.0.1"]
        );
        assert_eq!(
            PingFlavor::OpenBsd.args(TARGET, Duration::from_millis(200))[3],
            "1"
        );
    }
}
