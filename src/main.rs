use std::env;

use docx_filler::app;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    // Default backend address
    let mut base_url = String::from("http://127.0.0.1:5000");

    // Parse command-line arguments
    if args.len() >= 2 {
        base_url = args[1].clone();
    }

    // Start the interactive client
    app::run(&base_url).await?;

    Ok(())
}
