//! City map poster generator.
//!
//! Renders one poster per selected theme. With several themes the posters
//! are rendered by a worker pool sharing one cached data source; Ctrl-C
//! stops the themes not yet started.

mod cli;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use poster_common::request::output_filename;
use poster_common::{OutputNaming, PosterError, PosterRequest, PosterSettings, ThemeCatalog};
use renderer::{BatchJob, BatchRunner, BatchSummary, JobOutcome, PosterCompositor};
use storage::ContentCache;

use cli::{Args, EXAMPLES};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    if std::env::args_os().len() <= 1 {
        print!("{}", EXAMPLES);
        return ExitCode::SUCCESS;
    }
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .json()
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install logger: {}", e);
    }

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Poster generation failed");
            eprintln!("Error: {:#}", e);
            if let Some(hint) = e.downcast_ref::<PosterError>().and_then(|p| p.hint()) {
                eprintln!("{}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let settings =
        PosterSettings::load(args.config.as_deref()).context("Failed to load settings")?;
    let catalog = ThemeCatalog::new(&settings.themes_dir);

    if args.clear_cache {
        let removed = ContentCache::new(&settings.cache_dir)
            .clear()
            .await
            .context("Failed to clear cache")?;
        info!(removed, cache_dir = %settings.cache_dir.display(), "Cache cleared");
        println!("Removed {} cached entries", removed);
        if args.city.is_none() && !args.list_themes {
            return Ok(ExitCode::SUCCESS);
        }
    }

    if args.list_themes {
        list_themes(&catalog)?;
        return Ok(ExitCode::SUCCESS);
    }

    let (city, country) = args.place()?;
    let theme_ids = catalog.select(std::slice::from_ref(&args.theme), args.all_themes)?;

    let (_, clamped) = args.dimensions();
    for c in &clamped {
        warn!(side = c.side, requested = c.requested, applied = c.applied, "Poster dimension capped");
    }

    let compositor = Arc::new(
        PosterCompositor::from_settings(&settings).context("Failed to initialize renderer")?,
    );
    let center = compositor
        .resolve_center(city, country, args.coordinates()?)
        .await?;
    let request = args.request(center)?;

    info!(
        city,
        country,
        themes = theme_ids.len(),
        distance_m = request.distance_m,
        format = %request.format,
        "Generating posters"
    );

    if let [theme_id] = theme_ids.as_slice() {
        generate_one(&compositor, &catalog, &settings, request, theme_id).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let jobs = theme_ids
        .iter()
        .map(|id| Ok(BatchJob::new(request.clone(), id.clone(), catalog.load(id)?)))
        .collect::<Result<Vec<_>, PosterError>>()?;

    let runner = BatchRunner::new(
        Arc::clone(&compositor),
        &settings.posters_dir,
        args.workers.unwrap_or(settings.workers),
    );
    let cancel = runner.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing posters already started");
            cancel.cancel();
        }
    });

    let outcomes = runner.run(jobs).await;
    for outcome in &outcomes {
        match outcome {
            JobOutcome::Completed { theme, path, duration } => {
                println!("  {:<16} {} ({:.1}s)", theme, path.display(), duration.as_secs_f64())
            }
            JobOutcome::Failed { theme, error } => eprintln!("  {:<16} failed: {}", theme, error),
            JobOutcome::Skipped { theme } => println!("  {:<16} skipped", theme),
        }
    }

    let summary = BatchSummary::of(&outcomes);
    println!(
        "{} generated, {} failed, {} skipped",
        summary.completed, summary.failed, summary.skipped
    );
    Ok(if summary.failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn generate_one(
    compositor: &PosterCompositor,
    catalog: &ThemeCatalog,
    settings: &PosterSettings,
    mut request: PosterRequest,
    theme_id: &str,
) -> Result<()> {
    let theme = catalog.load(theme_id)?;
    request.output_path = settings.posters_dir.join(output_filename(
        &request.city,
        theme_id,
        request.distance_m,
        request.format,
        OutputNaming::Seconds,
        Utc::now(),
    ));
    let path = compositor
        .generate(&request, &theme)
        .await
        .with_context(|| format!("Failed to generate poster with theme '{}'", theme_id))?;
    println!("Poster saved to {}", path.display());
    Ok(())
}

fn list_themes(catalog: &ThemeCatalog) -> Result<()> {
    let themes = catalog.summaries()?;
    if themes.is_empty() {
        println!("No themes found in {}", catalog.dir().display());
        return Ok(());
    }
    println!("Available themes:");
    for theme in themes {
        println!("  {}", theme.id);
        println!("    {}", theme.name);
        if !theme.description.is_empty() {
            println!("    {}", theme.description);
        }
    }
    Ok(())
}
