use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "voice-cli")]
#[command(about = "Operator CLI for the sulfur voice service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "SULFUR_VOICE_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show service status
    Status,
    /// Show circuit breaker health
    Health,
    /// Reset the circuit breaker
    Reset,
    /// Run connectivity diagnostics against the synthesis host
    Diagnose,
    /// Show the diagnosis recorded after the last total failure
    LastDiagnosis,
    /// Synthesize text and print the written file
    Speak {
        /// Text to synthesize
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", cli.key))?);

    let base = cli.url.trim_end_matches('/');
    let request = match cli.command {
        Commands::Status => client.get(format!("{base}/admin/status")),
        Commands::Health => client.get(format!("{base}/admin/tts/health")),
        Commands::Reset => client.post(format!("{base}/admin/tts/reset")),
        Commands::Diagnose => client.post(format!("{base}/admin/tts/diagnose")),
        Commands::LastDiagnosis => client.get(format!("{base}/admin/tts/diagnosis")),
        Commands::Speak { text } => client
            .post(format!("{base}/admin/tts/speak"))
            .json(&json!({ "text": text })),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_speak_parses_text_and_key() {
        let cli = Cli::try_parse_from(["voice-cli", "--key", "secret", "speak", "Guten Morgen"]).unwrap();
        assert_eq!(cli.key, "secret");
        assert_eq!(cli.url, "http://localhost:8081");
        assert!(matches!(cli.command, Commands::Speak { text } if text == "Guten Morgen"));
    }

    #[test]
    fn test_unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["voice-cli", "--key", "secret", "restart"]).is_err());
    }
}
