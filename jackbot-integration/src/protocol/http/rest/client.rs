use super::RestRequest;
use crate::error::SocketError;
use crate::protocol::http::{BuildStrategy, HttpParser};
use std::marker::PhantomData;
use tracing::{debug, warn};
use url::Url;

/// Minimal, generic REST client: build a [`RestRequest`] with a
/// [`BuildStrategy`], execute it with `reqwest`, and parse the response (or
/// API error) with an [`HttpParser`].
///
/// Used by the historical-funding fetcher (`jackbot_data::historical`)
/// against Binance's public REST surface - no signing required, so it is
/// parameterised with [`crate::protocol::http::public::PublicNoHeaders`].
pub struct RestClient<Strategy, Parser> {
    http_client: reqwest::Client,
    base_url: Url,
    strategy: Strategy,
    parser: Parser,
}

impl<Strategy, Parser> RestClient<Strategy, Parser>
where
    Strategy: BuildStrategy,
    Parser: HttpParser,
{
    pub fn new(base_url: Url, strategy: Strategy, parser: Parser) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url,
            strategy,
            parser,
        }
    }

    pub async fn execute<Request>(&self, request: Request) -> Result<Request::Response, Parser::OutputError>
    where
        Request: RestRequest,
    {
        let url = self
            .base_url
            .join(&request.path())
            .map_err(|error| Parser::OutputError::from(SocketError::UrlParse(error)))?;

        let mut builder = self
            .http_client
            .request(Request::method(), url)
            .timeout(Request::timeout());

        if let Some(query) = request.query_params() {
            builder = builder.query(query);
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let built = self
            .strategy
            .build(request, builder)
            .map_err(Parser::OutputError::from)?;

        debug!(method = %built.method(), url = %built.url(), "sending REST request");

        let response = self
            .http_client
            .execute(built)
            .await
            .map_err(|error| Parser::OutputError::from(SocketError::Http(error)))?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
                .map(std::time::Duration::from_secs);
            warn!(?retry_after, "http 429 rate limited");
            return Err(Parser::OutputError::from(SocketError::RateLimited { retry_after }));
        }

        if status == reqwest::StatusCode::IM_A_TEAPOT || status == reqwest::StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(Parser::OutputError::from(SocketError::Fatal { status, body }));
        }

        let payload = response
            .bytes()
            .await
            .map_err(|error| Parser::OutputError::from(SocketError::Http(error)))?;

        self.parser.parse(status, &payload)
    }
}

/// Phantom marker used when a [`RestRequest::QueryParams`] or
/// [`RestRequest::Body`] is unused.
#[derive(Debug, Copy, Clone, Default, serde::Serialize)]
pub struct NoParams(#[serde(skip)] PhantomData<()>);
