fn main() {
    if let Err(err) = price_parity::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
