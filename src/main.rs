//! jarvis - two-pass chat client
//!
//! A reasoning model (DeepSeek or a local deepseek-r1) thinks about each
//! message first; a response model (OpenRouter or Ollama) answers with that
//! reasoning as context.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use jarvis::config::{self, Config, Settings};
use jarvis::repl::{self, Repl, colors};
use jarvis::router::BackendRouter;

#[derive(Parser)]
#[command(name = "jarvis")]
#[command(about = "Two-pass chat client: a reasoning model thinks, a response model answers")]
struct Args {
    /// DeepSeek API key (hosted reasoning)
    #[arg(long, env = "DEEPSEEK_API_KEY")]
    deepseek_api_key: Option<String>,

    /// OpenRouter API key (hosted responses)
    #[arg(long, env = "OPENROUTER_API_KEY")]
    openrouter_api_key: Option<String>,

    /// Ollama server URL
    #[arg(long, env = "OLLAMA_URL")]
    ollama_url: Option<String>,

    /// Response model (`ollama:<model>` for a local one)
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Local response model used when no OpenRouter key is set
    #[arg(long)]
    local_model: Option<String>,

    /// Local reasoning model
    #[arg(long)]
    local_reasoning_model: Option<String>,

    /// Start with the reasoning process hidden
    #[arg(long)]
    hide_reasoning: bool,
}

impl Args {
    fn into_overrides(self) -> Config {
        Config {
            deepseek_api_key: self.deepseek_api_key,
            openrouter_api_key: self.openrouter_api_key,
            ollama_url: self.ollama_url,
            model: self.model,
            local_model: self.local_model,
            local_reasoning_model: self.local_reasoning_model,
            show_reasoning: self.hide_reasoning.then_some(false),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (from ~/.jarvis/.env or current dir)
    let env_path = config::config_dir().join(".env");
    if env_path.exists() {
        let _ = dotenvy::from_path(&env_path);
    } else {
        let _ = dotenvy::dotenv();
    }

    // Logs go to stderr so they never interleave with streamed output
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = Settings::resolve(args.into_overrides(), Config::load());
    let router = BackendRouter::from_settings(&settings);

    print_banner(&settings, &router);
    info!(
        "Starting with hosted reasoning: {}, hosted responses: {}",
        router.has_hosted_reasoning(),
        router.has_hosted_response()
    );

    let mut repl = Repl::new(router, settings.show_reasoning)?;
    repl.run().await
}

fn print_banner(settings: &Settings, router: &BackendRouter) {
    println!();
    println!(
        "{}",
        colors::banner_accent(&format!("  jarvis {}", env!("CARGO_PKG_VERSION")))
    );
    println!("{}", colors::separator(50));

    let reasoner = if router.has_hosted_reasoning() {
        format!("DeepSeek ({})", settings.reasoning_model)
    } else {
        format!("Ollama ({})", settings.local_reasoning_model)
    };
    println!("{}", colors::banner_line("Reasoning", &reasoner));

    let response_model = router.initial_state().selector().to_string();
    println!("{}", colors::banner_line("Model", &response_model));
    println!("{}", colors::banner_line("Ollama", &settings.ollama_url));

    if !router.has_hosted_reasoning() {
        println!(
            "{}",
            colors::warning("No DEEPSEEK_API_KEY set, using Ollama for reasoning")
        );
    }
    if !router.has_hosted_response() {
        println!(
            "{}",
            colors::warning("No OPENROUTER_API_KEY set, using Ollama for responses")
        );
    }

    println!();
    println!("{}", repl::help_text());
    println!();
}
