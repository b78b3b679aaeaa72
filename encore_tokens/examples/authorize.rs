use std::path::PathBuf;

use clap::Parser;
use encore_tokens::{
    cache::FileTokenCache,
    config::{ClientConfig, API_BASE_URL},
    endpoint::{dto::ClientCredentials, HttpTokenEndpoint},
    operator::ConsoleOperator,
    scope::{well_known, Scopes},
    AuthState, Client, ClientId, ClientSecret, Identity, TokenBroker,
};

#[derive(Debug, Parser)]
struct Opts {
    /// The client ID of the registered application
    #[arg(short, long, env)]
    client_id: ClientId,

    /// The client secret used to identify the application to the accounts service
    #[arg(short = 's', long, env, hide_env_values = true)]
    client_secret: ClientSecret,

    /// Where the accounts service redirects the browser after authorization
    #[arg(short, long, env)]
    redirect_uri: url::Url,

    /// The user to authorize; leave empty for an app-only token
    #[arg(short, long, env, default_value = "")]
    user_email: Identity,

    /// Space-separated scopes to request
    #[arg(long, env, default_value = well_known::PLAYLIST_READ_PRIVATE)]
    scope: Scopes,

    /// A fixed anti-forgery state; random if omitted
    #[arg(long, env)]
    state: Option<AuthState>,

    /// Always show the consent dialog
    #[arg(long, env)]
    show_dialog: bool,

    /// The directory holding the token cache
    #[arg(short = 'd', long, env, default_value = ".")]
    cache_dir: PathBuf,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::parse();

    let mut config = ClientConfig::new(
        ClientCredentials {
            client_id: opts.client_id,
            client_secret: opts.client_secret,
        },
        opts.redirect_uri,
    )
    .with_show_dialog(opts.show_dialog);

    if let Some(state) = opts.state {
        config = config.with_state(state);
    }

    let http = reqwest::blocking::Client::builder().https_only(true).build()?;

    let broker = TokenBroker::new(
        config,
        FileTokenCache::load(&opts.cache_dir)?,
        HttpTokenEndpoint::new(http),
        ConsoleOperator::stdio(),
    );

    let mut client = Client::connect(broker, opts.user_email, opts.scope)?;
    let token = client.current_token()?;

    tracing::info!(
        token = format_args!("{:#?}", token.access_token()),
        expiry = token.expiry().0,
        "acquired access token"
    );

    println!("{}", token);
    println!("Authorization: {}", token.bearer_header());
    println!("API base: {}", API_BASE_URL);

    Ok(())
}
