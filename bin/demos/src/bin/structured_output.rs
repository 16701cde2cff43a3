//! Asks for JSON, a fixed plain-text layout, Markdown and CSV.
//!
//! Each example reports its own failure and the next one still runs.

use promptline_ai::{LlmCall, ModelBackend};
use promptline_core::Result;
use promptline_demos::{Demo, DemoError, exit, init_tracing};
use std::process::ExitCode;

const JSON_PROMPT: &str = r#"
Create a Python function documentation in JSON format with the following structure:
{
    "function_name": "name",
    "description": "what it does",
    "parameters": [
        {"name": "param1", "type": "str", "description": "param description"}
    ],
    "return_value": {"type": "str", "description": "return description"},
    "example": "code example"
}

Document a function that calculates the factorial of a number.
Return ONLY valid JSON, no additional text.
"#;

const FORMATTED_PROMPT: &str = "
Write a Python code review in this exact format:

TITLE: [Title here]

SUMMARY: [Summary here]

ISSUES:
- [Issue 1]
- [Issue 2]

SUGGESTIONS:
- [Suggestion 1]
- [Suggestion 2]

RATING: [1-10]

Review this code: def add(a, b): return a + b
";

const MARKDOWN_PROMPT: &str = "
Create a Python tutorial in this exact markdown format:

# [Title]

## Overview
[Overview text]

## Code Example
```python
[code here]
```

## Explanation
[Explanation text]

## Best Practices
- [Practice 1]
- [Practice 2]

Write about Python list comprehensions.
";

const CSV_PROMPT: &str = "
Create a list of 3 Python data structures in CSV format:
Name,Description,Use Case,Complexity

Example:
List,Ordered collection of items,Storing sequences of data,Low
";

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    exit(run().await)
}

async fn run() -> Result<(), DemoError> {
    let demo = Demo::from_env()?;
    let backend = demo.backend.as_ref();
    println!("Getting Structured Output from Gemini API\n");

    json_output(backend).await;

    println!("\n=== Formatted Structured Output ===");
    text_output(backend, FORMATTED_PROMPT).await;

    println!("\n=== Markdown Structured Output ===");
    text_output(backend, MARKDOWN_PROMPT).await;

    println!("\n=== CSV Structured Output ===");
    text_output(backend, CSV_PROMPT).await;
    Ok(())
}

async fn json_output(backend: &dyn ModelBackend) {
    println!("=== JSON Structured Output ===");
    let call = LlmCall::new(JSON_PROMPT).json_mode();

    let raw = match call.invoke(backend).await {
        Ok(result) => result.content,
        Err(report) => {
            println!("Error: {report}");
            return;
        }
    };
    println!("Raw response:");
    println!("{raw}");

    match promptline_ai::parse_json(&raw) {
        Ok(parsed) => {
            println!("\nParsed JSON:");
            match serde_json::to_string_pretty(&parsed) {
                Ok(pretty) => println!("{pretty}"),
                Err(e) => println!("Error: {e}"),
            }
        }
        Err(violation) => println!("JSON parsing failed: {violation}"),
    }
}

async fn text_output(backend: &dyn ModelBackend, prompt: &str) {
    match LlmCall::new(prompt).text(backend).await {
        Ok(text) => println!("{text}"),
        Err(report) => println!("Error: {report}"),
    }
}
