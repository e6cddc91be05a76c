mod api;
mod error;
mod main_lib;

use tracing::error;

#[tokio::main]
async fn main() {
    main_lib::init_tracing();

    if let Err(err) = main_lib::run().await {
        error!("[Server] Fatal: {:?}", err);
        std::process::exit(1);
    }
}
