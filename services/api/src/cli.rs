use crate::demo::{run_amortize, run_demo, AmortizeArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use loan_platform::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Loan Platform API",
    about = "Run and demonstrate the loan application workflow service from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk a loan application through the full review lifecycle in memory
    Demo(DemoArgs),
    /// Compute the fixed monthly payment for a principal, rate, and term
    Amortize(AmortizeArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Amortize(args) => run_amortize(args),
    }
}
