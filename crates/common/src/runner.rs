use std::future::Future;
use std::process::ExitCode;

use tracing::error;
use tracing::instrument::WithSubscriber;

use crate::config::Config;
use crate::crawler::RunOutcome;
use crate::logging;
use crate::writer::RunStamp;

/// Process entry shared by the crawler binaries.
///
/// Resolves the local offset and run stamp before any thread is spawned,
/// opens the daily log, then drives `run` on a current-thread runtime.
/// Failures end up in the log; the exit code is 0 unless `strict_exit`
/// is set and the run wrote nothing.
pub fn execute<F, Fut>(run: F) -> ExitCode
where
    F: FnOnce(Config, RunStamp) -> Fut,
    Fut: Future<Output = RunOutcome>,
{
    let _ = dotenv::dotenv();
    let config = Config::from_env();
    let offset = logging::local_offset();
    let stamp = RunStamp::now(offset);

    let dispatch = match logging::file_dispatch(&config.log_dir, &stamp, offset) {
        Ok(dispatch) => dispatch,
        Err(e) => {
            eprintln!(
                "Could not open log file in {}: {}",
                config.log_dir.display(),
                e
            );
            logging::console_dispatch()
        }
    };

    let strict_exit = config.strict_exit;
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::dispatcher::with_default(&dispatch, || {
                error!("Failed to start async runtime: {}", e);
            });
            return exit_status(strict_exit, &RunOutcome::NoData);
        }
    };

    let outcome = runtime.block_on(run(config, stamp).with_subscriber(dispatch));
    exit_status(strict_exit, &outcome)
}

pub fn exit_status(strict_exit: bool, outcome: &RunOutcome) -> ExitCode {
    ExitCode::from(exit_code(strict_exit, outcome))
}

fn exit_code(strict_exit: bool, outcome: &RunOutcome) -> u8 {
    if strict_exit && !outcome.is_written() {
        1
    } else {
        0
    }
}
