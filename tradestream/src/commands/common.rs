use clap::Parser;
use secrecy::{ExposeSecret, Secret};
use url::Url;

use tradestream_client::Client;

#[derive(Debug, Parser)]
pub(crate) struct IngestConfig {
    /// The host URL of the running ingestion server
    #[clap(
        short = 'H',
        long = "host",
        env = "TRADESTREAM_HOST_URL",
        default_value = "http://127.0.0.1:8282"
    )]
    pub(crate) host_url: Url,

    /// The name of the stream to emit records into
    #[clap(short = 's', long = "stream", env = "TRADESTREAM_STREAM_NAME")]
    pub(crate) stream_name: String,

    /// The token for authentication with the ingestion server
    #[clap(long = "token", env = "TRADESTREAM_AUTH_TOKEN")]
    pub(crate) auth_token: Option<Secret<String>>,
}

pub(crate) fn create_client(
    host_url: Url,
    auth_token: Option<Secret<String>>,
) -> Result<Client, tradestream_client::Error> {
    let mut client = Client::new(host_url)?;
    if let Some(t) = auth_token {
        client = client.with_auth_token(t.expose_secret());
    }
    Ok(client)
}
