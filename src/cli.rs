use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Eisenhower Matrix task board.
/// Tasks default to ~/.local/share/eisenhower/tasks.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "ehm", version, about = "Eisenhower Matrix task board")]
pub struct Cli {
    /// Path to the JSON tasks file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Path to the config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::QuadrantType;

    #[test]
    fn parses_quadrant_names_and_aliases() {
        let cli = Cli::parse_from(["ehm", "move", "abcd1234", "delegate"]);
        match cli.command {
            Commands::Move { id, quadrant } => {
                assert_eq!(id, "abcd1234");
                assert_eq!(quadrant, QuadrantType::Delegate);
            }
            _ => panic!("expected move"),
        }

        let cli = Cli::parse_from(["ehm", "add", "Write report", "-q", "now", "--db", "/tmp/t.json"]);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/t.json")));
        match cli.command {
            Commands::Add { name, quadrant, .. } => {
                assert_eq!(name, "Write report");
                assert_eq!(quadrant, QuadrantType::DoNow);
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn add_defaults_to_do_now() {
        let cli = Cli::parse_from(["ehm", "add", "Plan week"]);
        match cli.command {
            Commands::Add { quadrant, .. } => assert_eq!(quadrant, QuadrantType::DoNow),
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
