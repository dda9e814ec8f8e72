//! SMTP relay using lettre.

use futures::future::BoxFuture;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{error, info, warn};

use super::{OutboundMessage, Relay};
use crate::error::RelayError;

/// Plain SMTP submission to a fixed relay host.
///
/// The sink environment this serves is a test setup, so no TLS or
/// authentication is negotiated.
#[derive(Clone)]
pub struct SmtpRelay {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
    port: u16,
}

impl SmtpRelay {
    pub fn new(host: &str, port: u16) -> Self {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .build();

        Self {
            transport,
            host: host.to_string(),
            port,
        }
    }
}

impl Relay for SmtpRelay {
    fn submit(&self, message: OutboundMessage) -> BoxFuture<'_, Result<(), RelayError>> {
        Box::pin(async move {
            info!(
                relay_host = %self.host,
                relay_port = self.port,
                recipients = message.envelope.to().len(),
                raw_length = message.raw.len(),
                "smtp_relay_submit_start"
            );

            match self.transport.send_raw(&message.envelope, &message.raw).await {
                Ok(response) => {
                    info!(
                        code = %response.code(),
                        "smtp_relay_submit_complete"
                    );
                    Ok(())
                }
                Err(e) if e.is_permanent() => {
                    warn!(
                        relay_host = %self.host,
                        relay_port = self.port,
                        error = %e,
                        "smtp_relay_submit_rejected"
                    );
                    Err(RelayError::InvalidAddress(e.to_string()))
                }
                Err(e) => {
                    error!(
                        relay_host = %self.host,
                        relay_port = self.port,
                        error = %e,
                        "smtp_relay_submit_failed"
                    );
                    Err(RelayError::Unavailable(e.to_string()))
                }
            }
        })
    }
}
