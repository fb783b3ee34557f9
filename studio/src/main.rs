use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match goblin_studio::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}
