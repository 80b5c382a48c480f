mod cli;
mod logging;

use std::ops::ControlFlow;
use std::path::Path;
use std::process::ExitCode;

use tracing::warn;

use cli::CommandLine;
use rdate::{report, time, TimeClient};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let commands = CommandLine::parse_args();

    logging::init(&logging::Output {
        program: program_name(),
        print: commands.print_mode(),
        syslog: commands.syslog,
        verbose: commands.verbose,
    })?;

    let client = TimeClient::new(commands.config());
    let mut clock_action = commands.clock_action();
    let mut clock_failed = false;

    let summary = client
        .run_with(&commands.hosts, |result| {
            report::host_result(result);

            // Only the first host that answers drives the clock
            if let (Some(action), Some(sample)) = (clock_action, result.sample()) {
                clock_action = None;
                if let Err(e) = time::apply(sample, action) {
                    warn!("{}", e);
                    clock_failed = true;
                    return ControlFlow::Break(());
                }
            }
            ControlFlow::Continue(())
        })
        .await;

    if clock_failed || !summary.any_succeeded() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn program_name() -> String {
    std::env::args_os()
        .next()
        .as_deref()
        .and_then(|arg0| Path::new(arg0).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}
