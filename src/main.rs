use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgGroup, Parser};
use log::{debug, LevelFilter};
use ping_sweep::{AddressRange, CancellationToken, Error, SweepConfigBuilder, Sweeper};

/// Discover live hosts in an IPv4 subnet with a ping sweep
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("target").required(true).args(["network", "iface"])))]
struct Args {
    /// Network in CIDR notation, e.g. 192.168.1.0/24
    network: Option<String>,

    /// Sweep the first IPv4 network configured on this interface instead
    #[arg(short, long)]
    iface: Option<String>,

    /// Maximum number of probes in flight
    #[arg(short, long, default_value_t = 256)]
    concurrency: usize,

    /// Per-host probe timeout in milliseconds
    #[arg(short, long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Stop the whole sweep after this many seconds
    #[arg(long)]
    deadline: Option<u64>,

    /// Print the final list in address order instead of discovery order
    #[arg(long)]
    sort: bool,

    /// Ping binary used for the reachability checks
    #[arg(long, default_value = "ping")]
    ping: String,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn range_from(args: &Args) -> ping_sweep::Result<AddressRange> {
    match (&args.network, &args.iface) {
        (Some(network), _) => network.parse(),
        (None, Some(iface)) => AddressRange::from_interface(iface),
        (None, None) => Err(Error::InvalidRange {
            input: String::new(),
            reason: "no network given".into(),
        }),
    }
}

fn cancel_on_signal_or_deadline(token: CancellationToken, deadline: Option<Duration>) {
    tokio::spawn(async move {
        let deadline = async {
            match deadline {
                Some(deadline) => tokio::time::sleep(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => debug!("interrupted, stopping sweep"),
            _ = deadline => debug!("deadline reached, stopping sweep"),
            _ = token.cancelled() => return,
        }
        token.cancel();
    });
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let range = match range_from(&args) {
        Ok(range) => range,
        Err(err) => {
            eprintln!("Invalid network: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let config = match SweepConfigBuilder::new()
        .with_concurrency(args.concurrency)
        .with_probe_timeout(Duration::from_millis(args.timeout_ms))
        .with_ping_program(&args.ping)
        .build()
    {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let sweeper = Sweeper::new(config);
    let mut events = sweeper.subscribe().await;
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let mut stdout = std::io::stdout().lock();
            let _ = writeln!(stdout, "[+] {} is up", event.target_ip);
        }
    });

    let token = CancellationToken::new();
    cancel_on_signal_or_deadline(token.clone(), args.deadline.map(Duration::from_secs));

    println!("Scanning network {} for live hosts...", range);
    let outcome = sweeper.sweep_until(&range, token.clone()).await;
    token.cancel();
    drop(sweeper);
    let _ = printer.await;

    let cancelled = outcome.cancelled;
    let (completed, total, count) = (outcome.completed, outcome.total, outcome.count());
    let live_hosts = if args.sort {
        outcome.into_sorted()
    } else {
        outcome.live_hosts
    };

    {
        let mut stdout = std::io::stdout().lock();
        if cancelled {
            let _ = writeln!(
                stdout,
                "\nScan interrupted after {}/{} probes. {} hosts found up.",
                completed, total, count
            );
        } else {
            let _ = writeln!(stdout, "\nScan complete. {} hosts found up.", count);
        }
        for ip in live_hosts {
            let _ = writeln!(stdout, "{}", ip);
        }
    }
    ExitCode::SUCCESS
}
