fn main() {
    if let Err(err) = snapborg::cli::run() {
        eprintln!("snapborg: {:#}", err);
        std::process::exit(snapborg::error::EXIT_USAGE);
    }
}
