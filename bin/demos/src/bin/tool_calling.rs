//! Answers a weather question and a policy question with tools.

use promptline_core::Result;
use promptline_demos::{Demo, DemoError, exit, init_tracing, lift};
use promptline_tools::ToolCaller;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    exit(run().await)
}

async fn run() -> Result<(), DemoError> {
    let demo = Demo::from_env()?;
    let caller = ToolCaller::new(demo.backend.clone(), demo.tool_registry());

    let (city, latitude, longitude) = ("London", 51.5072, -0.1276);
    let prompts = [
        format!(
            "What is the weather like in {city} whose latitude is {latitude} and longitude is {longitude}?"
        ),
        "What is the return policy?".to_string(),
    ];

    for prompt in &prompts {
        let answer = caller.respond(prompt).await.map_err(lift)?;
        println!("{answer}");
    }
    Ok(())
}
