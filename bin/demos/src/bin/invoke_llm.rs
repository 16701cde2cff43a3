//! Sends a single prompt and prints the model's answer.

use promptline_ai::LlmCall;
use promptline_core::Result;
use promptline_demos::{Demo, DemoError, exit, init_tracing, lift};
use std::process::ExitCode;

const PROMPT: &str = "Explain quantum physics to a 10-year old in 200 words or less";

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    exit(run().await)
}

async fn run() -> Result<(), DemoError> {
    let demo = Demo::from_env()?;
    println!("Google API Key loaded successfully.");

    println!("Sending prompt: {PROMPT}\n");
    let answer = LlmCall::new(PROMPT)
        .text(demo.backend.as_ref())
        .await
        .map_err(lift)?;

    println!("--- Gemini's Response ---");
    println!("{answer}");
    println!("-------------------------");
    Ok(())
}
