use clap::Parser;
use env_logger::Env;
use log::debug;

mod args;
mod quiz;

fn main() {
    let args = args::Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();
    debug!("args: {:?}", args);

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let res = quiz::run_quiz(&args, &mut stdin.lock(), &mut stdout);

    if let Err(e) = res {
        quiz::report_error(&e);
        std::process::exit(1);
    }
}
