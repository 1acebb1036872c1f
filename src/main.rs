use std::io::Write;

use anyhow::Context;
use env_logger::{Env, Target};
use log::{Level, debug, info};

use cfgdump::config::RunConfig;
use cfgdump::inventory::lab_registry;
use cfgdump::report;
use cfgdump::session::SshConnector;

/// Log to stdout so failures interleave with the report.
fn init_logger() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stdout)
        .format(|buf, record| {
            if record.level() == Level::Info {
                writeln!(buf, "{}", record.args())
            } else {
                writeln!(buf, "{} {}", record.level(), record.args())
            }
        })
        .try_init()
        .context("installing logger")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logger()?;

    let config = RunConfig::from_env();
    debug!("{config:?}");

    let devices = lab_registry(&config);
    let connector = SshConnector::new(config.security_options(), config.timeout);

    let summary = report::run(&connector, &devices, &mut std::io::stdout()).await;
    info!(
        "Dumped {} of {} devices ({} failed)",
        summary.reported,
        summary.attempted,
        summary.failed()
    );

    Ok(())
}
