use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use podcastr::{
    ApiConfig, BuildEvent, BuildOptions, BuildReporter, DEFAULT_API_URL, Episode, EpisodeApi,
    NoopReporter, Player, ReqwestClient, RetryPolicy, SharedBuildReporter, Site, build_site,
    load_episode_page, render_episode_page,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static PAGE: Emoji<'_, '_> = Emoji("📄 ", "[v] ");
static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "[=] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "[*] ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
static PLAY: Emoji<'_, '_> = Emoji("▶️  ", "[>] ");
static PRUNE: Emoji<'_, '_> = Emoji("🗑️  ", "[-] ");

/// Render Podcastr episode pages from the episode backend
#[derive(Parser, Debug)]
#[command(name = "podcastr")]
#[command(about = "Render Podcastr episode pages from the episode backend")]
#[command(version)]
struct Args {
    /// Base URL of the episode backend
    #[arg(long, env = "PODCASTR_API_URL", default_value = DEFAULT_API_URL, global = true)]
    api_url: String,

    /// Attempts per backend request, including the first (network errors and 5xx are retried)
    #[arg(long, default_value = "3", global = true)]
    attempts: u32,

    /// Delay before the first retry, doubled on each further one
    #[arg(long, default_value = "250", global = true)]
    retry_backoff_ms: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30", global = true)]
    timeout: u64,

    /// Quiet mode - suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pre-render the most recent episodes into a directory
    Build {
        /// Output directory for rendered pages
        output_dir: PathBuf,

        /// Render every page even if the manifest says it is fresh
        #[arg(short, long)]
        force: bool,
    },

    /// Load one episode and print its display fields
    Show {
        /// Episode identity
        id: String,

        /// Print the rendered HTML page instead
        #[arg(long)]
        html: bool,
    },

    /// Load one episode and start it in the console player
    Play {
        /// Episode identity
        id: String,
    },
}

/// Build reporter drawing a spinner with indicatif
struct SpinnerReporter {
    bar: ProgressBar,
}

impl SpinnerReporter {
    fn new() -> Self {
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let bar = ProgressBar::new_spinner();
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }
}

impl BuildReporter for SpinnerReporter {
    fn report(&self, event: BuildEvent) {
        match event {
            BuildEvent::FetchingPaths { url } => {
                self.bar
                    .set_message(format!("{SEARCH}Fetching recent episodes: {}", url.cyan()));
            }

            BuildEvent::PathsReady {
                total,
                to_render,
                fresh,
            } => {
                self.bar.println(format!(
                    "{} pages in warm set, {} to render, {} fresh",
                    total.to_string().cyan(),
                    to_render.to_string().yellow(),
                    fresh.to_string().green()
                ));
            }

            BuildEvent::RenderingPage {
                identity,
                index,
                total,
            } => {
                self.bar.set_message(format!(
                    "[{}/{}] Rendering {}",
                    (index + 1).to_string().cyan(),
                    total.to_string().cyan(),
                    identity
                ));
            }

            BuildEvent::PageWritten {
                identity,
                path,
                bytes,
            } => {
                self.bar.println(format!(
                    "  {PAGE}{} → {} ({} bytes)",
                    identity.green(),
                    path.display(),
                    bytes
                ));
            }

            BuildEvent::PageSkipped { identity } => {
                self.bar
                    .println(format!("  {SKIP}{} is still fresh", identity.dimmed()));
            }

            BuildEvent::PageFailed { identity, error } => {
                self.bar
                    .println(format!("  {FAILURE}{} - {}", identity.red(), error.red()));
            }

            BuildEvent::PagePruned { identity, path } => {
                self.bar.println(format!(
                    "  {PRUNE}{} left the warm set, removed {}",
                    identity.dimmed(),
                    path.display()
                ));
            }

            BuildEvent::BuildCompleted {
                rendered_count,
                fresh_count,
                failed_count,
                pruned_count,
            } => {
                self.bar.finish_and_clear();
                println!(
                    "\n{PARTY}{} {} rendered, {} fresh, {} failed, {} pruned",
                    "Build complete:".bold().green(),
                    rendered_count.to_string().green().bold(),
                    fresh_count.to_string().yellow(),
                    if failed_count > 0 {
                        failed_count.to_string().red().bold()
                    } else {
                        failed_count.to_string().green()
                    },
                    pruned_count.to_string().dimmed()
                );
            }
        }
    }
}

/// Player that announces playback on the terminal
struct ConsolePlayer;

impl Player for ConsolePlayer {
    fn play(&self, episode: &Episode) {
        println!(
            "{PLAY}{} {} [{}]\n   {}",
            "Now playing:".bold().green(),
            episode.title.bold(),
            episode.duration_at_string.cyan(),
            episode.url.dimmed()
        );
    }
}

fn print_episode(episode: &Episode) {
    println!("{}", episode.title.bold());
    println!("  {} {}", "Members:".dimmed(), episode.members);
    println!("  {} {}", "Published:".dimmed(), episode.published_at);
    println!(
        "  {} {} ({}s)",
        "Duration:".dimmed(),
        episode.duration_at_string,
        episode.duration
    );
    println!("  {} {}", "Audio:".dimmed(), episode.url.cyan());
    println!("  {} {}", "Thumbnail:".dimmed(), episode.thumbnail.cyan());
}

fn retry_policy(args: &Args) -> RetryPolicy {
    RetryPolicy {
        max_attempts: args.attempts.max(1),
        initial_backoff: Duration::from_millis(args.retry_backoff_ms),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let client = ReqwestClient::with_timeout(Duration::from_secs(args.timeout))
        .context("Failed to create HTTP client")?;
    let config = ApiConfig::new(&args.api_url)
        .context("Invalid backend URL")?
        .with_retry(retry_policy(&args));
    let api = EpisodeApi::new(client, config);

    match args.command {
        Command::Build { output_dir, force } => {
            if !args.quiet {
                println!(
                    "\n{}{} {}\n",
                    MICROPHONE,
                    "podcastr".bold().magenta(),
                    "- Episode pages".dimmed()
                );
            }

            let reporter: SharedBuildReporter = if args.quiet {
                NoopReporter::shared()
            } else {
                Arc::new(SpinnerReporter::new())
            };

            let result = build_site(&api, &output_dir, &BuildOptions { force }, reporter)
                .await
                .context("Failed to build episode pages")?;

            if !args.quiet {
                println!(
                    "\n{FOLDER}Output: {}\n",
                    output_dir.display().to_string().cyan()
                );
            }

            if !result.failed.is_empty() && result.rendered == 0 && result.fresh == 0 {
                std::process::exit(1);
            }
        }

        Command::Show { id, html } => {
            let page = load_episode_page(&api, &id)
                .await
                .with_context(|| format!("Failed to load episode '{}'", id))?;

            if html {
                print!("{}", render_episode_page(&page.episode));
            } else {
                print_episode(&page.episode);
                if !args.quiet {
                    println!(
                        "  {} {}s",
                        "Revalidate after:".dimmed(),
                        page.revalidate_after_seconds()
                    );
                }
            }
        }

        Command::Play { id } => {
            let site = Site::new(api);
            site.play(&id, &ConsolePlayer)
                .await
                .with_context(|| format!("Failed to play episode '{}'", id))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempts_flag_sets_total_attempts() {
        let args = Args::try_parse_from(["podcastr", "--attempts", "5", "show", "ep-1"]).unwrap();
        assert_eq!(retry_policy(&args).max_attempts, 5);

        let args = Args::try_parse_from(["podcastr", "--attempts", "0", "show", "ep-1"]).unwrap();
        assert_eq!(retry_policy(&args).max_attempts, 1);
    }

    #[test]
    fn attempts_default_matches_library_policy() {
        let args = Args::try_parse_from(["podcastr", "play", "ep-1"]).unwrap();
        let policy = retry_policy(&args);

        assert_eq!(policy.max_attempts, RetryPolicy::default().max_attempts);
        assert_eq!(policy.initial_backoff, RetryPolicy::default().initial_backoff);
    }

    #[test]
    fn retries_flag_is_not_accepted() {
        assert!(Args::try_parse_from(["podcastr", "--retries", "3", "show", "ep-1"]).is_err());
    }
}
