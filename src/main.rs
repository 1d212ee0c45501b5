use std::io::Result;

#[tokio::main]
async fn main() -> Result<()> {
    hazard_server::run_with_config().await
}
