use std::process::ExitCode;

fn main() -> ExitCode {
    common::runner::execute(hot_question::run_hot_question_crawler)
}
