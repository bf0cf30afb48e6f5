use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use veriweb_common::ConfigOption;
use veriweb_common::observability::init_logging;
use veriweb_config::{VeriwebConfigLoader, VeriwebSettings};
use veriweb_keywords::{KeywordOptions, Session};
use veriweb_runtime::VeriwebRuntime;

mod cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) settings: optional veriweb.yaml, explicit file, env last
    let mut loader = VeriwebConfigLoader::new().with_optional_file("veriweb.yaml");
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let mut settings = loader.load()?;
    if cli.headless {
        settings.webdriver.headless = true;
    }

    init_logging(settings.logging.to_log_config("veriweb"))?;

    if let Commands::Config = cli.command {
        print_config(&settings);
        return Ok(());
    }

    let runtime = VeriwebRuntime::build("veriweb", Some(2))?;
    let outcome = runtime.block_on_abortable(|token| run(cli, settings, token));
    runtime.shutdown(Duration::from_secs(2));
    outcome
}

fn print_config(settings: &VeriwebSettings) {
    for option in ConfigOption::ALL {
        println!("{:<16} {}", option.name(), settings.search.get(option));
    }
    println!("{:<16} {}", "WebDriver", settings.webdriver.url);
    println!("{:<16} {}", "Browser", settings.webdriver.browser);
}

async fn run(cli: Cli, settings: VeriwebSettings, token: CancellationToken) -> Result<()> {
    let mut session = Session::from_settings(settings);
    session.set_cancel(token.clone());

    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!(target: "veriweb", "veriweb.interrupted");
            token.cancel();
        }
        std::future::pending::<()>().await
    };
    let work = async {
        let url = match &cli.command {
            Commands::Verify { url, .. } | Commands::Links { url, .. } => url.as_str(),
            Commands::Config => "",
        };
        session
            .open_browser(url, cli.browser.as_deref(), &cli.browser_options)
            .await?;
        let checked = check(&mut session, &cli.command).await;
        session.close_all_browsers().await?;
        checked
    };
    tokio::select! {
        result = work => result,
        () = interrupt => Ok(()),
    }
}

async fn check(session: &mut Session, command: &Commands) -> Result<()> {
    match command {
        Commands::Verify {
            texts,
            shadow_dom,
            timeout,
            ..
        } => {
            if *shadow_dom {
                session.set_config("ShadowDOM", "on")?;
            }
            let opts = KeywordOptions {
                timeout: *timeout,
                ..KeywordOptions::default()
            };
            let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
            session.verify_all(&texts, &opts).await?;
            info!(target: "veriweb", count = texts.len(), "veriweb.verify.passed");
        }
        Commands::Links {
            log_all,
            header_only,
            ..
        } => {
            let reports = session.verify_links("current", *log_all, *header_only).await?;
            info!(target: "veriweb", links = reports.len(), "veriweb.links.passed");
        }
        Commands::Config => {}
    }
    Ok(())
}
