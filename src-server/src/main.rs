use eurl_books_lib::ServerConfig;

#[tokio::main]
async fn main() {
    let config = ServerConfig::from_env();

    if let Err(e) = rolling_logger::init_logger(&config.log_dir, "EurlBooks") {
        eprintln!("Failed to init rolling logger: {}", e);
    }

    if let Err(e) = eurl_books_lib::run(config).await {
        let _ = rolling_logger::error(&e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
