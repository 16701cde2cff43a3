//! Routes new-event, modify-event and unrelated requests.

use promptline_calendar::calendar_router;
use promptline_core::Result;
use promptline_demos::{Demo, DemoError, exit, init_tracing, lift};
use promptline_pipeline::Pipeline;
use std::process::ExitCode;

const INPUTS: [&str; 3] = [
    "Let's schedule a team meeting next Tuesday at 2pm with Alice and Bob",
    "Can you move the team meeting with Alice and Bob to Wednesday at 3pm instead?",
    "What's the weather like today?",
];

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    exit(run().await)
}

async fn run() -> Result<(), DemoError> {
    let demo = Demo::from_env()?;
    let router = calendar_router(demo.backend.clone());

    for input in INPUTS {
        match router.process(input).await.map_err(lift)? {
            Some(response) => println!("Response: {}", response.message),
            None => println!("Request not recognized as a calendar operation"),
        }
    }
    Ok(())
}
