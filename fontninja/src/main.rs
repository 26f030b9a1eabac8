use std::{io::Write, process::ExitCode};

use clap::Parser;
use fontninja::{run, Args, Ninja, Outcome};
use log::error;

fn main() -> ExitCode {
    env_logger::builder()
        .format(|buf, record| {
            let ts = buf.timestamp_micros();
            writeln!(
                buf,
                "{}: {:?}: {}: {}",
                ts,
                std::thread::current().id(),
                buf.default_level_style(record.level())
                    .value(record.level()),
                record.args()
            )
        })
        .init();

    let args = Args::parse();
    let ninja = Ninja::new(&args.ninja);
    match run(&args, &ninja) {
        Ok(Outcome::Built { .. }) => ExitCode::SUCCESS,
        // Distinct so a wrapper can switch to the classic builder
        Ok(Outcome::Fallback(_)) => ExitCode::from(2),
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
