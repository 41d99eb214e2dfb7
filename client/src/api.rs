use futures::future::{Either, select};
use gloo_timers::future::TimeoutFuture;

use landview_shared::{ParcelCollection, QueryError, QueryIntent};

use crate::config::api_url;
use crate::session::SessionContext;

/// HTTP client for the parcel backend.
#[derive(Clone, Debug)]
pub struct ParcelApi {
    session: SessionContext,
    timeout_secs: u32,
}

impl ParcelApi {
    pub fn new(session: SessionContext, timeout_secs: u32) -> Self {
        Self {
            session,
            timeout_secs,
        }
    }

    /// Execute one intent. A request that outlives the timeout is reported as
    /// a failure; the underlying fetch is left to finish on its own.
    pub async fn fetch(&self, intent: &QueryIntent) -> Result<ParcelCollection, QueryError> {
        let request = Box::pin(self.fetch_unbounded(intent));
        let timeout = Box::pin(TimeoutFuture::new(self.timeout_secs.saturating_mul(1000)));
        match select(request, timeout).await {
            Either::Left((result, _)) => result,
            Either::Right(_) => Err(QueryError::Timeout {
                secs: self.timeout_secs,
            }),
        }
    }

    async fn fetch_unbounded(&self, intent: &QueryIntent) -> Result<ParcelCollection, QueryError> {
        let url = api_url(intent.endpoint());
        let params = intent.query_params();

        let mut request = gloo_net::http::Request::get(&url)
            .query(params.iter().map(|(k, v)| (*k, v.as_str())));
        if let Some(auth) = self.session.authorization_header() {
            request = request.header("Authorization", &auth);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        if !resp.ok() {
            return Err(QueryError::Status {
                status: resp.status(),
                text: resp.status_text(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;
        Ok(serde_json::from_str::<ParcelCollection>(&body)?)
    }
}
