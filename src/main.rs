use heydo::cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = cli::run().await {
        eprintln!("\n{err}");
        std::process::exit(1);
    }
}
