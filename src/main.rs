fn main() {
    if let Err(e) = linewave::app::run() {
        tracing::error!("Fatal error: {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
