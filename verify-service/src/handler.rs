use anyhow::{Context, Result};
use jwks_auth::{Claims, TokenVerifier};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

/// One invocation, as delivered by the caller.
#[derive(Debug, Deserialize)]
pub struct InvocationEvent {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<Claims>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl InvocationResponse {
    fn verified(claims: Claims) -> Self {
        Self {
            valid: true,
            claims: Some(claims),
            reason: None,
        }
    }

    fn rejected(reason: &'static str) -> Self {
        Self {
            valid: false,
            claims: None,
            reason: Some(reason),
        }
    }
}

pub fn handle_event(verifier: &TokenVerifier, event: &InvocationEvent) -> InvocationResponse {
    match verifier.verify(&event.token) {
        Ok(claims) => {
            info!(sub = claims.subject().unwrap_or_default(), "token verified");
            InvocationResponse::verified(claims)
        }
        Err(failure) => InvocationResponse::rejected(failure.reason()),
    }
}

pub fn handle_line(verifier: &TokenVerifier, line: &[u8]) -> InvocationResponse {
    match serde_json::from_slice::<InvocationEvent>(line) {
        Ok(event) => handle_event(verifier, &event),
        Err(err) => {
            warn!(error = %err, "invocation event is not valid JSON with a token field");
            InvocationResponse::rejected("invalid_event")
        }
    }
}

/// Answers one JSON event per input line until the input closes. Lines are
/// read as raw bytes, so a line that is not UTF-8 is answered as
/// `invalid_event` like any other unreadable event. Returns the number of
/// events handled.
pub async fn run<R, W>(verifier: &TokenVerifier, mut input: R, mut output: W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = Vec::new();
    let mut handled = 0;
    loop {
        line.clear();
        let read = input
            .read_until(b'\n', &mut line)
            .await
            .context("failed to read invocation event")?;
        if read == 0 {
            break;
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let response = handle_line(verifier, &line);
        let mut encoded = serde_json::to_vec(&response).context("failed to encode response")?;
        encoded.push(b'\n');
        output
            .write_all(&encoded)
            .await
            .context("failed to write response")?;
        output.flush().await.context("failed to flush response")?;
        handled += 1;
    }
    Ok(handled)
}
