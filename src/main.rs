use askgpt::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL, FALLBACK_MODELS, ModelRegistry, OpenAiClient};
use clap::Parser;
use eyre::{Result, bail};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None, after_help = available_models_help())]
struct Cli {
	/// Generate a random question and get its answer
	#[clap(long)]
	random: bool,
	/// Generate a question about a specific topic and get its answer
	#[clap(long)]
	topic: Option<String>,
	/// Skip generation and answer this question directly
	#[clap(long)]
	question: Option<String>,
	/// OpenAI model to use
	#[clap(short, long, default_value = DEFAULT_MODEL)]
	model: String,
	/// Maximum tokens for question generation
	#[clap(long, default_value_t = DEFAULT_MAX_TOKENS as i64)]
	question_tokens: i64,
	/// Maximum tokens for answer generation
	#[clap(long, default_value_t = DEFAULT_MAX_TOKENS as i64)]
	answer_tokens: i64,
	/// Show warnings and fallback attempts on stderr
	#[clap(long)]
	debug: bool,
}

#[derive(Debug)]
enum Mode {
	Random,
	Topic(String),
	Direct(String),
}

impl Cli {
	fn mode(&self) -> Result<Mode> {
		match (self.random, &self.topic, &self.question) {
			(true, None, None) => Ok(Mode::Random),
			(false, Some(topic), None) => Ok(Mode::Topic(topic.clone())),
			(false, None, Some(question)) => Ok(Mode::Direct(question.clone())),
			(false, None, None) => bail!("you must specify one of --random, --topic or --question (use --help for usage information)"),
			_ => bail!("--random, --topic and --question are mutually exclusive"),
		}
	}
}

#[tokio::main]
async fn main() {
	v_utils::clientside!();
	let cli = Cli::parse();

	let outcome = tokio::select! {
		outcome = run(cli) => outcome,
		_ = tokio::signal::ctrl_c() => {
			eprintln!("\nOperation cancelled by user");
			std::process::exit(1);
		}
	};
	if let Err(e) = outcome {
		eprintln!("Error: {e}");
		std::process::exit(1);
	}
}

async fn run(cli: Cli) -> Result<()> {
	let mode = cli.mode()?;

	if cli.question_tokens <= 0 || cli.answer_tokens <= 0 {
		bail!("token counts must be positive integers");
	}
	let question_tokens = u32::try_from(cli.question_tokens)?;
	let answer_tokens = u32::try_from(cli.answer_tokens)?;

	let api = OpenAiClient::from_env()?;

	let registry = ModelRegistry::resolve(&api).await;
	if !registry.contains(&cli.model) {
		let listing = registry.iter().map(|id| format!("  - {id}")).collect::<Vec<_>>().join("\n");
		bail!("invalid model '{}'. Available models:\n{listing}", cli.model);
	}

	let question = match &mode {
		Mode::Direct(question) => {
			println!("Question: {question}");
			question.clone()
		}
		Mode::Random | Mode::Topic(_) => {
			tracing::info!("generating question");
			let topic = match &mode {
				Mode::Topic(topic) => Some(topic.as_str()),
				_ => None,
			};
			let completion = askgpt::generate_question(&api, topic, &cli.model, question_tokens, cli.debug).await?;
			println!("Question (via {}): {}", completion.model, completion.text);
			completion.text
		}
	};

	tracing::info!("generating answer");
	let answer = askgpt::generate_answer(&api, &question, &cli.model, answer_tokens, cli.debug).await?;
	println!("Answer (via {}): {}", answer.model, answer.text);

	Ok(())
}

fn available_models_help() -> String {
	let mut text = "Available models (fallback list):\n".to_owned();
	for model in FALLBACK_MODELS {
		let marker = match *model == DEFAULT_MODEL {
			true => " (default)",
			false => "",
		};
		text.push_str(&format!("  - {model}{marker}\n"));
	}
	text.push_str("\nEnvironment variables:\n  OPENAI_API_KEY    Your OpenAI API key (required)");
	text
}
