use anyhow::Result;
use mahaguru::{cli, logger, ui};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    if let Err(e) = logger::init() {
        eprintln!("Failed to initialize logger: {e}");
    }

    if let Err(e) = cli::main().await {
        ui::print_error(&format!("Error: {e:#}"));
        std::process::exit(1);
    }
    Ok(())
}
