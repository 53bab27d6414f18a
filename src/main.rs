use std::process;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = buidl::cli::run().await {
        let args: Vec<String> = std::env::args().collect();
        buidl::cli::report_error(&e, buidl::cli::wants_stack_traces(&args));
        process::exit(1);
    }
}
