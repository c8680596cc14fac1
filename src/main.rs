use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use restgen::config::RestSettings;
use restgen::generator::RestGenerator;

/// restgen - generic REST text-completion client
///
/// Turns an arbitrary HTTP(S) endpoint into a prompt-in, text-out interface,
/// driven by a JSON endpoint definition file.
///
/// The API key is read from the environment variable named by the
/// definition's key_env_var (default REST_API_KEY) and substituted wherever
/// a template references $KEY.
///
/// Examples:
///   restgen -G service.json "tell me a joke"
#[derive(Parser, Debug)]
#[command(author, version = env!("RESTGEN_VERSION"), about)]
struct Cli {
    /// Endpoint definition JSON file
    #[arg(
        long = "generator-options-file",
        short = 'G',
        value_name = "FILE",
        env = "RESTGEN_OPTIONS_FILE"
    )]
    pub options_file: PathBuf,

    /// Number of generations to request for the prompt
    #[arg(long, short = 'n', value_name = "N", default_value_t = 1)]
    pub generations: usize,

    /// The prompt text; read from stdin when omitted
    #[arg(value_name = "PROMPT")]
    pub prompt: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let raw = std::fs::read_to_string(&cli.options_file)
        .with_context(|| format!("Failed to read {}", cli.options_file.display()))?;
    let settings: RestSettings = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", cli.options_file.display()))?;

    // secret resolution happens here, outside the core
    let api_key = std::env::var(&settings.key_env_var).ok();

    let prompt = match cli.prompt {
        Some(prompt) => prompt,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read prompt from stdin")?;
            buffer.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    let generator = RestGenerator::new(settings, api_key)?;

    for _ in 0..cli.generations {
        let outputs = generator.generate(&prompt).await?;
        for output in outputs {
            match output {
                Some(text) => println!("{}", text),
                None => println!("(null)"),
            }
        }
    }

    Ok(())
}
