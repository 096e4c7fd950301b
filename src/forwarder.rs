//! Git operation forwarder.
//!
//! Relays a git `upload-pack` exchange between the local process's three
//! standard streams and a remote git-operation service.  The remote wire
//! format is the connection handle's concern; this module only sees an
//! input byte sink and a stream of output/exit frames, and coordinates the
//! three copies under a single cancellation token.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ForwardError;

const INPUT_CHUNK_SIZE: usize = 32 * 1024;

// ---------------------------------------------------------------------------
// Call boundary
// ---------------------------------------------------------------------------

/// Parameters of one `upload-pack` call against the remote git service.
#[derive(Debug, Clone, Default)]
pub struct UploadPackRequest {
    /// Repository identifier understood by the git service.
    pub gl_repository: String,
    /// `GIT_PROTOCOL` value negotiated with the client, if any.
    pub git_protocol: Option<String>,
    /// Extra `-c` git configuration for the remote invocation.
    pub git_config_options: Vec<String>,
}

impl UploadPackRequest {
    pub fn new(gl_repository: impl Into<String>) -> Self {
        Self {
            gl_repository: gl_repository.into(),
            ..Self::default()
        }
    }
}

/// One frame received from the remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Stdout(Bytes),
    Stderr(Bytes),
    Exit(i32),
}

/// Channel pair of an opened remote call: a sink for input bytes and a
/// stream of output frames.  Dropping `input` signals input EOF to the
/// remote side.
pub struct CallChannels {
    pub input: mpsc::Sender<Bytes>,
    pub events: mpsc::Receiver<Frame>,
}

/// A live connection to the remote git-operation service, established and
/// owned by the caller.
#[async_trait]
pub trait GitOperationConnection: Send + Sync {
    /// Open one streaming `upload-pack` call.
    async fn open_upload_pack(&self, request: &UploadPackRequest) -> anyhow::Result<CallChannels>;
}

// ---------------------------------------------------------------------------
// Forwarding
// ---------------------------------------------------------------------------

/// Forward an `upload-pack` exchange and return the remote-reported exit
/// code.
///
/// A child token is derived from `token` so cancelling the parent cancels
/// this call; the child itself is cancelled on every return path.  Local
/// input is fed to the remote until it is exhausted or the call terminates;
/// remote output and error bytes are written through as they arrive.  A
/// remote non-zero exit is not an error.  Cancellation before completion
/// returns [`ForwardError::Canceled`] rather than a transport failure.
pub async fn upload_pack<I, O, E>(
    token: &CancellationToken,
    connection: &dyn GitOperationConnection,
    request: &UploadPackRequest,
    mut stdin: I,
    mut stdout: O,
    mut stderr: E,
) -> Result<i32, ForwardError>
where
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let call_token = token.child_token();
    let _guard = call_token.clone().drop_guard();

    let CallChannels { input, mut events } = connection
        .open_upload_pack(request)
        .await
        .map_err(ForwardError::Transport)?;

    let feed = async move {
        let mut buf = vec![0u8; INPUT_CHUNK_SIZE];
        loop {
            match stdin.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    // A closed receiver means the call terminated; stop
                    // feeding without treating it as a failure.
                    if input.send(Bytes::copy_from_slice(&buf[..n])).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "local input read failed, closing remote input");
                    break;
                }
            }
        }
        // `input` drops here, signalling EOF to the remote call.
    };
    tokio::pin!(feed);
    let mut feeding = true;

    loop {
        tokio::select! {
            () = call_token.cancelled() => return Err(ForwardError::Canceled),
            () = &mut feed, if feeding => feeding = false,
            event = events.recv() => match event {
                Some(Frame::Stdout(chunk)) => {
                    stdout
                        .write_all(&chunk)
                        .await
                        .map_err(|e| ForwardError::Transport(e.into()))?;
                }
                Some(Frame::Stderr(chunk)) => {
                    stderr
                        .write_all(&chunk)
                        .await
                        .map_err(|e| ForwardError::Transport(e.into()))?;
                }
                Some(Frame::Exit(code)) => {
                    stdout
                        .flush()
                        .await
                        .map_err(|e| ForwardError::Transport(e.into()))?;
                    stderr
                        .flush()
                        .await
                        .map_err(|e| ForwardError::Transport(e.into()))?;
                    return Ok(code);
                }
                None => {
                    return Err(ForwardError::Transport(anyhow::anyhow!(
                        "remote call ended without reporting an exit status"
                    )));
                }
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
