//! Runs the calendar prompt chain on an event and on a non-event.

use promptline_calendar::CalendarChain;
use promptline_core::Result;
use promptline_demos::{Demo, DemoError, exit, init_tracing, lift};
use promptline_pipeline::Pipeline;
use std::process::ExitCode;

const INPUTS: [&str; 2] = [
    "Dentist's appointment next Friday from 8:30 AM to 10:00 AM PT. Leave at least 30 minutes before the appointment.",
    "Can you send an email to Alice and Bob to discuss the project roadmap?",
];

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    exit(run().await)
}

async fn run() -> Result<(), DemoError> {
    let demo = Demo::from_env()?;
    let chain = CalendarChain::new(demo.backend.clone());

    for input in INPUTS {
        match chain.process(input).await.map_err(lift)? {
            Some(confirmation) => {
                println!("Confirmation: {}", confirmation.confirmation_message);
                if let Some(link) = confirmation.calendar_link {
                    println!("Calendar Link: {link}");
                }
            }
            None => {
                println!("Request: '{input}' doesn't appear to be a calendar event request.");
            }
        }
    }
    Ok(())
}
