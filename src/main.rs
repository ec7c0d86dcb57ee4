use clap::Parser;
use tracing::{error, info};

use server_monitor::config::MonitorConfig;
use server_monitor::logging::{DEFAULT_LOG_DIR, init_logging};
use server_monitor::notifications::AlertDispatcher;
use server_monitor::notifications::senders::dingtalk::DingTalkSender;
use server_monitor::runner::Runner;
use server_monitor::service_monitor::{ProtocolKind, ServiceChecker};
use server_monitor::version::VERSION;

#[derive(Parser, Debug)]
#[command(
    author,
    version = VERSION,
    about = "One-shot health check of configured services",
    long_about = None
)]
struct Args {
    /// Path to the configuration file (default: config.yml in the working directory)
    #[arg(short, long)]
    config: Option<String>,

    /// Only check targets of this protocol
    #[arg(long, value_enum)]
    only: Option<ProtocolKind>,
}

// Exit status is always 0; failures surface through the log and the alert.
#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(DEFAULT_LOG_DIR);
    info!(version = VERSION, "Starting monitoring run.");

    let config = match MonitorConfig::load(args.config.as_deref(), args.only) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration; continuing with defaults.");
            MonitorConfig::default()
        }
    };

    let checker = match ServiceChecker::new(config.timeout()) {
        Ok(checker) => checker,
        Err(e) => {
            error!(error = %e, "Failed to build HTTP client for checks.");
            return;
        }
    };
    let sender = match DingTalkSender::new(config.webhook_url.clone(), config.timeout()) {
        Ok(sender) => sender,
        Err(e) => {
            error!(error = %e, "Failed to build HTTP client for alerts.");
            return;
        }
    };

    let runner = Runner::new(checker, AlertDispatcher::new(sender))
        .with_concurrency(config.concurrency());
    let report = runner.run(&config, args.only).await;

    info!(
        checked = report.checked,
        failed = report.failed,
        delivery = ?report.delivery,
        "Monitoring run finished."
    );
}
