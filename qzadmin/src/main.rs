use qz_grader::Session;
use qz_remote::RemoteStorage;
use qzadmin::{AppConfig, Cli, commands};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Engine events (skipped entries, replaced scores, failed saves) go to
    // stderr, filtered by RUST_LOG.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = match Cli::import() {
        Ok(cli) => cli,
        // help and version requests land here too
        Err(err) => err.exit(),
    };

    let AppConfig { remote, grader } = AppConfig::load(&cli)?;

    // Opening the store is the login; dropping the session at exit is the logout.
    let store = RemoteStorage::open(&remote, cli.token.as_str())?;
    let mut session = Session::new(store, grader);

    commands::run(&mut session, cli.command, &mut std::io::stdout().lock()).await
}
