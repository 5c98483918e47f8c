//! Command-line front end for the post store.
//!
//! # Responsibility
//! - Parse arguments, resolve the data directory and start logging.
//! - Map service results to stdout/stderr text and exit codes.
//!
//! # Invariants
//! - All record and artifact work goes through `PostService`.
//! - Exit codes: 0 ok, 1 failure, 2 invalid input, 3 unknown id.

use clap::{Parser, Subcommand};
use log::warn;
use postcache_core::{
    default_log_level, init_logging, resolve_data_dir, Post, PostService, PostServiceError,
    StorageLayout,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "postcache", version, about = "Post records with pre-rendered pages")]
struct Cli {
    /// Data directory (defaults to $POSTCACHE_DATA_DIR, then <tmp>/postcache).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute log directory (defaults to <data-dir>/logs).
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a post and render its page.
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: String,
    },
    /// Print a post's rendered page.
    Show { id: Uuid },
    /// Replace a post's title and body.
    Update {
        id: Uuid,
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: String,
    },
    /// Delete a post and its page.
    Delete { id: Uuid },
    /// List post ids and titles in insertion order.
    List,
    /// Re-render one post's page.
    Rerender { id: Uuid },
    /// Re-render pending or missing pages and drop orphaned ones.
    Repair,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let data_dir = absolutize(&resolve_data_dir(cli.data_dir.as_deref()));
    start_logging(&cli, &data_dir);

    let service = PostService::open(&StorageLayout::new(&data_dir));
    match run(&service, cli.command) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn start_logging(cli: &Cli, data_dir: &Path) {
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    let log_dir = cli
        .log_dir
        .as_deref()
        .map(absolutize)
        .unwrap_or_else(|| data_dir.join("logs"));
    if let Err(err) = init_logging(level, &log_dir.to_string_lossy()) {
        eprintln!("warning: logging disabled: {err}");
    }
}

fn run<R, C>(service: &PostService<R, C>, command: Command) -> Result<String, PostServiceError>
where
    R: postcache_core::PostRepository,
    C: postcache_core::ArtifactCache,
{
    match command {
        Command::Create { title, body } => {
            let commit = service.create_post(title, body)?;
            report_warning(commit.regeneration.as_ref());
            Ok(commit.post.id.to_string())
        }
        Command::Show { id } => {
            let view = service
                .get_post_view(id)?
                .ok_or(PostServiceError::NotFound(id))?;
            if view.artifact.is_empty() {
                eprintln!("warning: post {id} has not been rendered yet");
            }
            Ok(view.artifact.into_string())
        }
        Command::Update { id, title, body } => {
            let post = Post::with_id(id, title, body)?;
            let commit = service.update_post(&post)?;
            report_warning(commit.regeneration.as_ref());
            Ok(commit.post.id.to_string())
        }
        Command::Delete { id } => {
            let deletion = service.delete_post(id)?;
            report_warning(deletion.cleanup.as_ref());
            Ok(String::new())
        }
        Command::List => Ok(service
            .list_posts()?
            .iter()
            .map(|post| format!("{}\t{}", post.id, post.title))
            .collect::<Vec<_>>()
            .join("\n")),
        Command::Rerender { id } => {
            service.rerender_post(id)?;
            Ok(String::new())
        }
        Command::Repair => {
            let report = service.repair()?;
            for failure in &report.failures {
                report_warning(Some(failure));
            }
            Ok(format!(
                "rerendered={} rendered_missing={} orphans_removed={} failures={}",
                report.rerendered,
                report.rendered_missing,
                report.orphans_removed,
                report.failures.len()
            ))
        }
    }
}

fn report_warning(failure: Option<&postcache_core::RegenerationFailure>) {
    if let Some(failure) = failure {
        warn!("event=cli_warning module=cli status=degraded post_id={}", failure.post_id());
        eprintln!("warning: {failure}");
    }
}

fn exit_code_for(err: &PostServiceError) -> u8 {
    match err {
        PostServiceError::Validation(_) => 2,
        PostServiceError::NotFound(_) => 3,
        _ => 1,
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::{exit_code_for, run, Cli, Command};
    use clap::Parser;
    use postcache_core::{PostService, PostServiceError, PostValidationError, StorageLayout};
    use tempfile::TempDir;
    use uuid::Uuid;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "postcache",
            "create",
            "--title",
            "Hello",
            "--body",
            "World",
            "--data-dir",
            "/tmp/posts",
        ])
        .unwrap();
        assert_eq!(cli.data_dir.as_deref(), Some(std::path::Path::new("/tmp/posts")));
        assert!(matches!(cli.command, Command::Create { .. }));
    }

    #[test]
    fn rejects_malformed_id() {
        assert!(Cli::try_parse_from(["postcache", "show", "not-a-uuid"]).is_err());
    }

    #[test]
    fn exit_codes_follow_error_kind() {
        let id = Uuid::new_v4();
        assert_eq!(
            exit_code_for(&PostServiceError::Validation(
                PostValidationError::EmptyBody
            )),
            2
        );
        assert_eq!(exit_code_for(&PostServiceError::NotFound(id)), 3);
    }

    #[test]
    fn create_show_update_delete_flow() {
        let dir = TempDir::new().unwrap();
        let service = PostService::open(&StorageLayout::new(dir.path()));

        let id: Uuid = run(
            &service,
            Command::Create {
                title: "Hello".to_string(),
                body: "World".to_string(),
            },
        )
        .unwrap()
        .parse()
        .unwrap();

        let page = run(&service, Command::Show { id }).unwrap();
        assert!(page.contains("Hello"));

        run(
            &service,
            Command::Update {
                id,
                title: "Hi".to_string(),
                body: "World".to_string(),
            },
        )
        .unwrap();
        let page = run(&service, Command::Show { id }).unwrap();
        assert!(page.contains("Hi"));
        assert!(!page.contains("Hello"));

        let listed = run(&service, Command::List).unwrap();
        assert_eq!(listed, format!("{id}\tHi"));

        run(&service, Command::Delete { id }).unwrap();
        let err = run(&service, Command::Show { id }).unwrap_err();
        assert!(matches!(err, PostServiceError::NotFound(_)));
    }
}
