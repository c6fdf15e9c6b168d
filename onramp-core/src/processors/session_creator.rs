use crate::config::ProviderConfig;
use crate::processors::{ResponseInterpreter, build_session_request};
use crate::session::{CreateSession, SessionFailure, SessionResult};
use crate::transport::{UpstreamInvoker, UpstreamRequest};
use kanau::processor::Processor;
use std::convert::Infallible;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{error, info, warn};

/// Runs one purchase through build → invoke → interpret.
///
/// Holds only immutable state, so one instance serves all requests.
pub struct SessionCreator {
    config: Arc<ProviderConfig>,
    invoker: UpstreamInvoker,
}

impl SessionCreator {
    pub fn new(config: Arc<ProviderConfig>, invoker: UpstreamInvoker) -> Self {
        Self { config, invoker }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn transport_name(&self) -> &'static str {
        self.invoker.transport_name()
    }
}

impl Processor<CreateSession> for SessionCreator {
    type Output = SessionResult;
    type Error = Infallible;

    #[tracing::instrument(skip_all, name = "CreateSession", fields(amount = %input.amount.value()))]
    async fn process(&self, input: CreateSession) -> Result<SessionResult, Infallible> {
        let payload = build_session_request(&input.amount, input.phone.as_deref(), &self.config);
        let body = match serde_json::to_vec(&payload) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "Failed to serialize session request");
                return Ok(SessionResult::Failure(SessionFailure::internal(
                    "Internal server error while creating session",
                )));
            }
        };

        let request = UpstreamRequest::to_provider(&self.config, body);
        let outcome = self.invoker.invoke(&request).await;
        if let Err(e) = &outcome {
            warn!(error = %e, "Provider request failed");
        }

        let result = ResponseInterpreter::new(&self.config, input.amount.value())
            .interpret(outcome, OffsetDateTime::now_utc());

        match &result {
            SessionResult::Success(success) => {
                info!(session_id = %success.session_id, "Provider session created");
            }
            SessionResult::Failure(failure) => {
                warn!(
                    status = failure.status,
                    kind = %failure.kind,
                    message = %failure.message,
                    "Session creation failed"
                );
            }
        }

        Ok(result)
    }
}
