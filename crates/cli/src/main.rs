mod builder;
mod commands;
mod logging;

use clap::{CommandFactory, Parser};
use clap_complete::{Shell, generate};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "portfolio-kit")]
#[command(version, about = "Portfolio site generator with GitHub Pages deployment", long_about = None)]
struct Cli {
    /// Project directory (containing projects.yaml and portfolio.toml)
    #[arg(short = 'C', long = "project", global = true, default_value = ".")]
    project: PathBuf,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Build the site without deploying
    Build {
        /// Output directory (default: [site].output or "dist")
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Base URL for generated links (default: [site].base_url or "./")
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Build the site and publish it to a GitHub Pages branch
    Deploy {
        /// Branch to publish to (default: [deploy].branch or "gh-pages")
        #[arg(short, long)]
        branch: Option<String>,

        /// Commit message for the deployment commit
        #[arg(short, long)]
        message: Option<String>,

        /// Git remote to push to
        #[arg(short, long, default_value = "origin")]
        remote: String,

        /// Build output directory to publish
        #[arg(short = 'd', long = "dir")]
        dir: Option<PathBuf>,

        /// Publish the existing build output without rebuilding
        #[arg(long)]
        no_build: bool,

        /// Validate and resolve the deployment without building or publishing
        #[arg(long)]
        dry_run: bool,

        /// Force-push, overwriting the remote branch
        #[arg(long)]
        force: bool,
    },

    /// Show whether the project is ready to deploy
    Status {
        /// Git remote to check
        #[arg(short, long, default_value = "origin")]
        remote: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Serve the deployment API and a preview of the build output
    Serve {
        /// Port to serve on
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(logging::LoggingConfig::from_verbosity(cli.verbose));

    match cli.command {
        Command::Build { output, base_url } => {
            commands::build::run(cli.project, output, base_url).await
        }
        Command::Deploy {
            branch,
            message,
            remote,
            dir,
            no_build,
            dry_run,
            force,
        } => {
            let options = portfolio_kit_deployer::DeployOptions {
                branch,
                message,
                remote: Some(remote),
                build_dir: dir,
                no_build,
                dry_run,
                force,
            };
            commands::deploy::run(cli.project, options).await
        }
        Command::Status { remote, json } => commands::status::run(cli.project, remote, json).await,
        Command::Serve { port, host } => commands::serve::run(cli.project, host, port).await,
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "portfolio-kit", &mut io::stdout());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_deploy_flags() {
        let cli = Cli::parse_from([
            "portfolio-kit",
            "-C",
            "site",
            "deploy",
            "-b",
            "pages",
            "-m",
            "Ship",
            "-d",
            "public",
            "--no-build",
            "--force",
        ]);
        assert_eq!(cli.project, PathBuf::from("site"));
        match cli.command {
            Command::Deploy {
                branch,
                message,
                remote,
                dir,
                no_build,
                dry_run,
                force,
            } => {
                assert_eq!(branch.as_deref(), Some("pages"));
                assert_eq!(message.as_deref(), Some("Ship"));
                assert_eq!(remote, "origin");
                assert_eq!(dir, Some(PathBuf::from("public")));
                assert!(no_build);
                assert!(!dry_run);
                assert!(force);
            }
            _ => panic!("expected deploy"),
        }
    }
}
