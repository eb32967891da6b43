#![forbid(unsafe_code)]

fn main() {
    if let Err(error) = barline::run_from_env() {
        eprintln!("{error}");
        std::process::exit(error.exit_code());
    }
}
