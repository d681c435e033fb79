use anyhow::Context;
use clap::Parser;
use robo_core::domain::inputs::{RecommendationForm, UserInputs};
use robo_core::llm::openai::OpenAiClient;
use robo_core::llm::{LlmClient, ScriptedClient};
use robo_core::results::ResultsView;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod render;

#[derive(Debug, Parser)]
#[command(name = "robo-advisor", about = "Request an ETF portfolio recommendation")]
struct Args {
    /// Investment currency: USD, EUR, GBP, CHF, JPY, CAD or AUD.
    #[arg(long, default_value = "USD")]
    currency: String,

    /// Investable savings amount.
    #[arg(long, default_value_t = 50_000.0)]
    amount: f64,

    /// Risk profile: Low, Medium or High.
    #[arg(long, default_value = "Medium")]
    risk: String,

    /// Maximum yearly loss tolerated, in percent.
    #[arg(long, default_value_t = 15.0)]
    max_loss: f64,

    /// Years until the savings are needed.
    #[arg(long, default_value_t = 5)]
    horizon: u32,

    /// Print the prompt that would be sent and exit.
    #[arg(long)]
    dry_run: bool,

    /// Parse a saved model reply instead of calling the API.
    #[arg(long)]
    reply_file: Option<PathBuf>,

    /// Print the results view as JSON instead of tables.
    #[arg(long)]
    json: bool,
}

impl Args {
    fn form(&self) -> RecommendationForm {
        RecommendationForm {
            currency: self.currency.clone(),
            investable_amount: self.amount,
            risk_profile: self.risk.clone(),
            max_yearly_loss: self.max_loss,
            time_horizon: self.horizon,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = robo_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let inputs = UserInputs::try_from(&args.form())?;

    if args.dry_run {
        let request = robo_core::advisor::completion_request(&inputs);
        tracing::info!(dry_run = true, "printing prompt only");
        println!("[system]\n{}\n\n[user]\n{}", request.system, request.user);
        return Ok(());
    }

    let llm: Box<dyn LlmClient> = match &args.reply_file {
        Some(path) => {
            let reply = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read reply file {}", path.display()))?;
            Box::new(ScriptedClient::replying(reply))
        }
        None => Box::new(OpenAiClient::from_settings(&settings)?),
    };

    let rec = match robo_core::advisor::generate_recommendation(llm.as_ref(), &inputs).await {
        Ok(rec) => rec,
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %format!("{err:#}"), "portfolio recommendation failed");
            return Err(err.context(robo_core::advisor::GENERIC_FAILURE_MESSAGE));
        }
    };

    let view = ResultsView::build(&rec);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", render::results(&view));
    }

    Ok(())
}

fn init_sentry(settings: &robo_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
