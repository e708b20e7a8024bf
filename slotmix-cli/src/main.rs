//! # Slotmix
//!
//! Plays up to eight sound files at once through the slot mixer.

use log::error;

mod cli;
mod logging;
mod runner;

fn main() {
    dotenv::dotenv().ok();
    let log_buffer = logging::init();
    let args = cli::args::build_cli().get_matches();

    let code = match runner::run(&args, log_buffer) {
        Ok(code) => code,
        Err(err) => {
            let message = err.to_string().to_lowercase();
            error!("{}", message);
            eprintln!("error: {}", message);
            1
        }
    };

    std::process::exit(code)
}
