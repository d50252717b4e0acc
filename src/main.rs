use listing_capture::app::run;
use listing_capture::config::Config;
use listing_capture::error::Result;
use listing_capture::logging::{init, install_panic_hook};

#[tokio::main]
async fn main() -> Result<()> {
    init();
    install_panic_hook();

    let config = Config::from_env()?;

    run(config).await
}
