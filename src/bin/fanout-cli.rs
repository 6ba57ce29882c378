use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "fanout-cli")]
#[command(about = "Client for a running model-fanout server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fan a prompt out to every backend and print the ranked responses
    Query {
        /// The prompt to send
        prompt: String,
        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },
    /// Show rate-limit state per backend
    Backends,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Query { prompt, json } => {
            let res = client
                .post(format!("{}/query", cli.url))
                .json(&json!({ "prompt": prompt }))
                .send()
                .await?;
            let Some(body) = read_json(res).await? else {
                return Ok(());
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                print_query(&body);
            }
        }
        Commands::Backends => {
            let res = client.get(format!("{}/backends", cli.url)).send().await?;
            if let Some(body) = read_json(res).await? {
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
        }
    }

    Ok(())
}

async fn read_json(res: reqwest::Response) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(None);
    }

    Ok(Some(res.json().await?))
}

fn print_query(body: &Value) {
    for status in body["statuses"].as_array().into_iter().flatten() {
        let backend = status["backend"].as_str().unwrap_or("?");
        match status["state"].as_str() {
            Some("success") => println!(
                "  {:<12} success  {} ms",
                backend,
                status["latencyMs"].as_u64().unwrap_or_default()
            ),
            Some("error") => println!(
                "  {:<12} error    {}",
                backend,
                status["error"].as_str().unwrap_or_default()
            ),
            _ => {}
        }
    }

    let responses = body["responses"].as_array().cloned().unwrap_or_default();
    if responses.is_empty() {
        println!("\nNo backend returned a response.");
        return;
    }

    println!();
    for (rank, item) in responses.iter().enumerate() {
        println!(
            "{:>2}. [{:.2}] ({}) {}",
            rank + 1,
            item["confidence"].as_f64().unwrap_or_default(),
            item["originBackend"].as_str().unwrap_or("?"),
            item["content"].as_str().unwrap_or_default()
        );
    }
}
