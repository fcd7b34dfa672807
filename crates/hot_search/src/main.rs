use std::process::ExitCode;

fn main() -> ExitCode {
    common::runner::execute(hot_search::run_hot_search_crawler)
}
