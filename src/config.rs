use clap::Parser;

/// GitHub webhook activity feed service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Port to listen on.
    #[arg(short, long, default_value = "8080", env = "PORT")]
    pub port: u16,

    /// Shared secret for verifying X-Hub-Signature-256 headers.
    /// Verification is skipped when unset.
    #[arg(short, long, env = "GITHUB_WEBHOOK_SECRET")]
    pub secret: Option<String>,

    /// Event store connection string.
    #[arg(
        short,
        long,
        default_value = "sqlite://gitpulse.db",
        env = "DATABASE_URL"
    )]
    pub database_url: String,
}
