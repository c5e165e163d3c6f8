//! Command line: the statusline (default) and the task-graph filters.

use crate::config::{Config, config_paths, load_config};
use crate::error::Result;
use crate::statusline::git::{GitRunner, SystemGit};
use crate::statusline::input::StatusInput;
use crate::statusline::style::{Tone, paint};
use crate::statusline::{RenderContext, render_statusline};
use crate::tasks::TaskGraph;
use crate::tasks::card::{card_task_from_json, render_card};
use crate::tasks::leaf::{find_leaf_in_progress, format_leaf_line};
use crate::tasks::tree::{TreeOptions, render_tree};
use clap::{Parser, Subcommand};
use std::io::{self, IsTerminal, Read};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Modular statusline and task views for an AI coding assistant
#[derive(Parser, Debug)]
#[command(name = "statuskit", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Show module errors and cache decisions in the statusline
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a task tree from `bd graph --all --json` on stdin
    Tree(TreeArgs),
    /// Print a task card from `bd show --json` on stdin
    Card,
    /// List in-progress leaf tasks from `bd graph --all --json` on stdin
    Continue(ContinueArgs),
}

#[derive(Parser, Debug, Default)]
pub struct TreeArgs {
    /// Filter tasks by title, id, or label
    #[arg(short, long)]
    pub search: Option<String>,

    /// Limit the number of root tasks
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Collapse children, show a count instead
    #[arg(long)]
    pub collapse: bool,

    /// Show the subtree rooted at this task (exact or suffix match)
    #[arg(long)]
    pub root: Option<String>,

    /// Include blocked tasks
    #[arg(long)]
    pub show_blocked: bool,
}

impl From<TreeArgs> for TreeOptions {
    fn from(args: TreeArgs) -> Self {
        Self {
            search: args.search,
            limit: args.limit,
            collapse: args.collapse,
            root: args.root,
            show_blocked: args.show_blocked,
        }
    }
}

#[derive(Parser, Debug, Default)]
pub struct ContinueArgs {
    /// Show every user's tasks, not just the git user's
    #[arg(long)]
    pub all: bool,
}

/// Log to stderr when asked to; stdout belongs to the statusline.
pub fn init_tracing(debug: bool) {
    let filter = std::env::var("STATUSKIT_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok();
    if filter.is_none() && !debug {
        return;
    }
    let filter = filter
        .and_then(|f| EnvFilter::try_new(f).ok())
        .unwrap_or_else(|| EnvFilter::new("statuskit=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub async fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.debug);
    match cli.command {
        None => run_statusline(cli.debug).await,
        Some(command) => match run_filter(command).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            }
        },
    }
}

fn read_stdin() -> io::Result<String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

async fn run_statusline(debug_flag: bool) -> ExitCode {
    if io::stdin().is_terminal() {
        println!("statuskit: reads JSON from stdin");
        println!("Usage: echo '{{...}}' | statuskit");
        return ExitCode::SUCCESS;
    }

    let mut config = match std::env::current_dir() {
        Ok(cwd) => {
            let paths = config_paths(&cwd, dirs::home_dir().as_deref());
            match load_config(&paths) {
                Ok(config) => config,
                Err(e) => {
                    println!(
                        "{}",
                        paint(
                            &format!("[!] Config error in {}: {e}", e.path().display()),
                            Tone::Red,
                            true
                        )
                    );
                    Config::default()
                }
            }
        }
        Err(_) => Config::default(),
    };
    config.debug |= debug_flag;

    let data = match read_stdin()
        .map_err(anyhow::Error::from)
        .and_then(|input| Ok(StatusInput::from_json(&input)?))
    {
        Ok(data) => data,
        Err(e) => {
            if config.debug {
                println!(
                    "{}",
                    paint(&format!("[!] Failed to parse input: {e}"), Tone::Red, config.colors)
                );
            }
            return ExitCode::SUCCESS;
        }
    };

    let ctx = RenderContext {
        debug: config.debug,
        colors: config.colors,
        data,
        cache_dir: config.cache_dir(),
    };
    for output in render_statusline(&config, &ctx).await {
        println!("{output}");
    }
    ExitCode::SUCCESS
}

async fn run_filter(command: Commands) -> Result<()> {
    let input = read_stdin()?;
    let output = match command {
        Commands::Tree(args) => tree_output(&input, &args.into())?,
        Commands::Card => card_output(&input)?,
        Commands::Continue(args) => {
            let owner = if args.all {
                None
            } else {
                git_user(&SystemGit::new(None)).await
            };
            continue_output(&input, owner.as_deref())?
        }
    };
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

pub fn tree_output(input: &str, opts: &TreeOptions) -> Result<String> {
    let graph = TaskGraph::from_json(input)?;
    Ok(render_tree(&graph, opts))
}

pub fn card_output(input: &str) -> Result<String> {
    Ok(match card_task_from_json(input)? {
        Some(task) => render_card(&task),
        None => "No task data.".to_string(),
    })
}

/// One line per leaf task; empty when there are none.
pub fn continue_output(input: &str, owner: Option<&str>) -> Result<String> {
    let graph = TaskGraph::from_json(input)?;
    let lines: Vec<String> = find_leaf_in_progress(&graph, owner)
        .into_iter()
        .map(format_leaf_line)
        .collect();
    Ok(lines.join("\n"))
}

/// `git config user.name`, if set.
pub async fn git_user(git: &dyn GitRunner) -> Option<String> {
    git.run(&["config", "user.name"])
        .await
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}
