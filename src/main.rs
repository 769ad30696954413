fn main() {
    if let Err(err) = openpayments_ingest::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
