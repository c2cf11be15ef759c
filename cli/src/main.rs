use clap::{Parser, Subcommand};

mod commands;
mod util;

#[derive(Parser)]
#[command(
    name = "mm",
    version,
    about = "MasseurMatch CLI — operator interface for review workflows and profile status"
)]
struct Cli {
    /// API base URL
    #[arg(long, env = "MM_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Log in and store an access token
    Login {
        /// Account email
        #[arg(long)]
        email: String,
    },
    /// Own profile operations
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Staff review queue operations
    Review {
        #[command(subcommand)]
        command: ReviewCommands,
    },
    /// Moderation-held text edits
    Edits {
        #[command(subcommand)]
        command: EditCommands,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Show onboarding status: stage, blockers, progress
    Status,
    /// Show the full profile record
    Show,
}

#[derive(Subcommand)]
enum ReviewCommands {
    /// List profiles awaiting review
    List,
    /// Approve a pending profile
    Approve {
        profile_id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Reject a pending profile
    Reject {
        profile_id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Send a pending profile back with requested changes
    RequestChanges {
        profile_id: String,
        #[arg(long)]
        reason: Option<String>,
    },
}

#[derive(Subcommand)]
enum EditCommands {
    /// List edits held for manual review
    List,
    /// Accept a held edit and write it to the live profile
    Apply { edit_id: String },
    /// Drop a held edit, keeping the live value
    Discard { edit_id: String },
}

fn required_token() -> String {
    match util::resolve_token() {
        Ok(token) => token,
        Err(e) => util::exit_error(&e.to_string(), Some("Run `mm login --email <email>`.")),
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Health => commands::health::run(&cli.api_url).await,
        Commands::Login { email } => commands::login::run(&cli.api_url, &email).await,
        Commands::Profile { command } => {
            let token = required_token();
            match command {
                ProfileCommands::Status => commands::profile::status(&cli.api_url, &token).await,
                ProfileCommands::Show => commands::profile::show(&cli.api_url, &token).await,
            }
        }
        Commands::Review { command } => {
            let token = required_token();
            match command {
                ReviewCommands::List => commands::review::list(&cli.api_url, &token).await,
                ReviewCommands::Approve { profile_id, reason } => {
                    commands::review::resolve(
                        &cli.api_url,
                        &token,
                        &profile_id,
                        "approve",
                        reason.as_deref(),
                    )
                    .await
                }
                ReviewCommands::Reject { profile_id, reason } => {
                    commands::review::resolve(
                        &cli.api_url,
                        &token,
                        &profile_id,
                        "reject",
                        reason.as_deref(),
                    )
                    .await
                }
                ReviewCommands::RequestChanges { profile_id, reason } => {
                    commands::review::resolve(
                        &cli.api_url,
                        &token,
                        &profile_id,
                        "request_changes",
                        reason.as_deref(),
                    )
                    .await
                }
            }
        }
        Commands::Edits { command } => {
            let token = required_token();
            match command {
                EditCommands::List => commands::edits::list(&cli.api_url, &token).await,
                EditCommands::Apply { edit_id } => {
                    commands::edits::resolve(&cli.api_url, &token, &edit_id, "apply").await
                }
                EditCommands::Discard { edit_id } => {
                    commands::edits::resolve(&cli.api_url, &token, &edit_id, "discard").await
                }
            }
        }
    };

    std::process::exit(exit_code);
}
