// src/main.rs

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use notion2post::api::schema::{check_page, create_database, create_workspace_page};
use notion2post::api::PageAccess;
use notion2post::config::{CheckArgs, InitDbArgs, Target};
use notion2post::constants::MINIMUM_PENDING_THRESHOLD;
use notion2post::orchestrator::standard_sequence;
use notion2post::pipeline::open_source;
use notion2post::{
    replenish_pool, run_sequence, BrowserPublisher, ChildArgs, Cli, Command, NotionHttpClient,
    NotionId, Notifier, PostingRun, PromotionReport, RunContext, RunOutcome,
};
use std::fs;
use std::path::Path;
use std::process::ExitCode;

/// Sets up logging: console at Info (Debug with `--verbose`), and a file
/// under `log_dir` that always records Debug.
fn setup_logging(log_dir: &Path, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let console_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    fs::create_dir_all(log_dir)?;
    let log_file_path = log_dir.join("notion2post.log");

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stdout_appender = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(console_level)))
                .build("stdout", Box::new(stdout_appender)),
        )
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .logger(log4rs::config::Logger::builder().build("chromiumoxide", LevelFilter::Warn))
        .logger(log4rs::config::Logger::builder().build("tungstenite", LevelFilter::Warn))
        .logger(log4rs::config::Logger::builder().build("hyper_util", LevelFilter::Info))
        .build(
            Root::builder()
                .appender("stdout")
                .appender("file")
                .build(LevelFilter::Debug),
        )?;

    log4rs::init_config(config)?;
    log::debug!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

fn http_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("notion2post/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")
}

/// `run`: promote, then post, each as a child process.
async fn run(cli: &Cli, target: &Target) -> anyhow::Result<u8> {
    let exe = std::env::current_exe().context("locating the notion2post executable")?;
    let args = ChildArgs {
        config: cli.config.clone(),
        log_dir: cli.log_dir.clone(),
        verbose: cli.verbose,
        account: target.account.clone(),
        mode: target.mode,
    };
    log::info!("Run for account '{}' ({})", target.account, target.mode);
    match run_sequence(&standard_sequence(&exe, &args)).await {
        Ok(()) => {
            log::info!("Run finished");
            Ok(0)
        }
        Err(e) => {
            log::error!("Run aborted: {}", e);
            Ok(1)
        }
    }
}

/// `promote`: refill the pending pool from used rows when it runs dry.
async fn promote(cli: &Cli, target: &Target) -> anyhow::Result<u8> {
    let ctx = RunContext::resolve(&cli.config, &target.account, Some(target.mode))?;
    let http = http_client()?;
    let source = open_source(&ctx, &http)?;

    match replenish_pool(source.as_ref(), MINIMUM_PENDING_THRESHOLD).await? {
        PromotionReport::Skipped { pending } => {
            log::info!("{} pending record(s); nothing to promote", pending)
        }
        PromotionReport::Promoted {
            promoted, failed, ..
        } => log::info!("Promoted {} record(s), {} failed", promoted, failed),
        PromotionReport::ListFailed { .. } => {
            log::warn!("Used records could not be listed; leaving the pool as it is")
        }
    }
    Ok(0)
}

/// `post`: publish the least recently posted pending record.
async fn post(cli: &Cli, target: &Target) -> anyhow::Result<u8> {
    let ctx = RunContext::resolve(&cli.config, &target.account, Some(target.mode))?;
    let http = http_client()?;
    let source = open_source(&ctx, &http)?;
    let username = ctx.site()?.username.clone();
    let publisher = BrowserPublisher::from_context(&ctx, http.clone())?;
    let notifier = Notifier::new(http, ctx.slack_webhook_url.clone());

    let run = PostingRun {
        source: source.as_ref(),
        publisher: &publisher,
        notifier: &notifier,
        username: &username,
    };
    let outcome = run.execute().await;
    match &outcome {
        RunOutcome::Posted(report) => match report.root_url() {
            Some(url) => println!("✓ Posted {} chunk(s): {}", report.chunks, url),
            None => println!("✓ Posted {} chunk(s)", report.chunks),
        },
        RunOutcome::NothingToPost => println!("Nothing to post."),
        RunOutcome::Failed(e) => eprintln!("✗ Posting failed: {}", e),
    }
    Ok(outcome.exit_code() as u8)
}

/// `init-db`: create the content database (and optionally its parent page).
async fn init_db(cli: &Cli, args: &InitDbArgs) -> anyhow::Result<u8> {
    let ctx = RunContext::resolve(&cli.config, &args.account, None)?;
    let client = NotionHttpClient::new(&ctx.notion_token()?)?;

    let parent = if args.workspace {
        let page = create_workspace_page(&client, &args.title).await?;
        println!("✓ Created parent page {}", page.url.as_deref().unwrap_or(&page.id));
        NotionId::parse(&page.id)?
    } else {
        let raw = args
            .parent_page
            .as_deref()
            .or(ctx.account.notion_parent_page_id.as_deref())
            .context("pass --parent-page, --workspace, or set notion_parent_page_id")?;
        NotionId::parse(raw)?
    };

    let created = create_database(&client, &parent, &args.title, &ctx.account.properties).await?;
    println!("✓ Database created: {}", created.id);
    if let Some(url) = &created.url {
        println!("  {}", url);
    }
    println!("Add this ID under database_ids for account '{}'.", args.account);
    Ok(0)
}

/// `check`: confirm the integration can read a page.
async fn check(cli: &Cli, args: &CheckArgs) -> anyhow::Result<u8> {
    let ctx = RunContext::resolve(&cli.config, &args.account, None)?;
    let client = NotionHttpClient::new(&ctx.notion_token()?)?;
    let id = NotionId::parse(&args.page)?;

    match check_page(&client, &id).await? {
        PageAccess::Accessible { title, url } => {
            println!("✓ Accessible: {} ({})", title, url);
            Ok(0)
        }
        PageAccess::NotShared => {
            eprintln!(
                "✗ Page {} is not shared with the integration (or does not exist)",
                id.to_hyphenated()
            );
            Ok(1)
        }
    }
}

async fn dispatch(cli: &Cli) -> anyhow::Result<u8> {
    match &cli.command {
        Command::Run(target) => run(cli, target).await,
        Command::Promote(target) => promote(cli, target).await,
        Command::Post(target) => post(cli, target).await,
        Command::InitDb(args) => init_db(cli, args).await,
        Command::Check(args) => check(cli, args).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(&cli.log_dir, cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match dispatch(&cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}
