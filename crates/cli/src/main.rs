fn main() {
    if let Err(err) = satsigner_cli::run_entry() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
