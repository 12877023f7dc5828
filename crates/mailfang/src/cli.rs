//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use url::Url;

/// Browse and watch mail captured by a mailfang server.
#[derive(Debug, Parser)]
#[command(name = "mailfang", version, about, long_about = None)]
pub struct Cli {
    /// Server base URL.
    #[arg(
        long,
        global = true,
        env = "MAILFANG_URL",
        default_value = "http://localhost:3000"
    )]
    pub server: Url,

    /// Delay before reconnecting the push channel, in milliseconds. Zero
    /// disables reconnects.
    #[arg(
        long,
        global = true,
        env = "MAILFANG_RECONNECT_MS",
        default_value_t = 3000
    )]
    pub reconnect_interval_ms: u64,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List captured messages
    List(ListArgs),

    /// Show one message with decoded headers
    Show {
        /// Message ID.
        id: String,
    },

    /// Delete one message, or all of them
    Delete {
        /// Message ID.
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<String>,

        /// Delete every message.
        #[arg(long)]
        all: bool,
    },

    /// Print the raw source of a message
    Raw {
        /// Message ID.
        id: String,
    },

    /// Print the sanitized HTML rendering of a message
    Rendered {
        /// Message ID.
        id: String,

        /// Load remote images and stylesheets. Defaults to the saved
        /// preference.
        #[arg(long)]
        allow_remote_content: Option<bool>,
    },

    /// Show message counters
    Sidebar,

    /// Copy a message's decoded sender to the clipboard
    Copy {
        /// Message ID.
        id: String,
    },

    /// Follow new, read and deleted mail until interrupted
    Watch {
        /// Show a desktop notification for new mail.
        #[arg(long)]
        notify: bool,
    },

    /// Open a viewer path in the browser
    Open {
        /// Viewer path, e.g. `/redirect_first_email` or `/emails/inbox`.
        #[arg(default_value = "/")]
        path: String,

        /// Print the resolved URL instead of opening it.
        #[arg(long)]
        print: bool,
    },
}

/// Arguments of `list`.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only unread messages.
    #[arg(long, group = "filter")]
    pub unread: bool,

    /// Only messages with attachments.
    #[arg(long, group = "filter")]
    pub attachments: bool,

    /// Only messages for one envelope recipient.
    #[arg(long, group = "filter")]
    pub recipient: Option<String>,

    /// Page number, starting at 1.
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Search text. Saved for later runs; pass an empty string to clear it.
    #[arg(long)]
    pub search: Option<String>,
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_list_filters_conflict() {
        let result = Cli::try_parse_from(["mailfang", "list", "--unread", "--attachments"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_delete_requires_target() {
        assert!(Cli::try_parse_from(["mailfang", "delete"]).is_err());
        assert!(Cli::try_parse_from(["mailfang", "delete", "m1", "--all"]).is_err());

        let cli = Cli::try_parse_from(["mailfang", "delete", "--all"]).unwrap();
        assert!(matches!(cli.command, Command::Delete { id: None, all: true }));
    }

    #[test]
    fn test_global_server_flag() {
        let cli = Cli::try_parse_from([
            "mailfang",
            "list",
            "--server",
            "http://mail.test:8025",
            "--page",
            "2",
        ])
        .unwrap();
        assert_eq!(cli.server.as_str(), "http://mail.test:8025/");
        let Command::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.page, 2);
    }

    #[test]
    fn test_rendered_remote_content_override() {
        let cli = Cli::try_parse_from([
            "mailfang",
            "rendered",
            "m1",
            "--allow-remote-content",
            "false",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Rendered {
                allow_remote_content: Some(false),
                ..
            }
        ));
    }
}
