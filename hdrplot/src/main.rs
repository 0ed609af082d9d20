use clap::Parser;

mod cache;
mod cli;
mod crop;
mod error;
mod external;
mod measure;
mod metadata;
mod pipeline;
mod plot;
mod pq;
mod progress;
mod stats;
mod subtitles;

use cli::Args;

fn main() {
    let args = Args::parse();
    progress::set_verbose(args.verbose);
    progress::set_quiet(args.quiet);

    match pipeline::run(&args) {
        Ok(png) => {
            progress::print_success(&format!("Plot written to {}", png.display()));
        }
        Err(e) => {
            progress::print_error(&format!("{:#}", e));
            std::process::exit(1);
        }
    }
}
