//! Remote Format Driver
//!
//! Opens a secure-shell session to a target host and drives a filesystem
//! format command to completion by scanning the accumulating output for a
//! terminal sentinel. The remote command translates its own success or
//! failure into exactly one of two literal marker lines (`OK`/`FAIL`), so
//! callers never parse tool-specific output.

use crate::error::{Error, Result};
use ssh2::Session;
use std::io::Read;
use std::net::TcpStream;
use std::time::{Duration, Instant};

/// Bytes requested per read from the session channel
const RECV_CHUNK: usize = 80;

/// Default secure-shell port appended when the host carries none
const SSH_PORT: u16 = 22;

/// Format the device at `mount_point` on `host` over SSH and return the
/// command's full output, sentinel line included.
///
/// Authenticates as `username` with the supplied private key material.
/// Unknown host keys are auto-accepted: a trust-on-first-use tradeoff for
/// ephemeral cloud instances, not a general-purpose security posture.
///
/// With `deadline: None` the read loop blocks until a sentinel arrives; an
/// unresponsive remote session then blocks the caller indefinitely. Pass a
/// deadline (or wrap the call) when bounded latency matters. This is a
/// blocking routine; async callers run it under `spawn_blocking`.
pub fn format_volume(
    host: &str,
    username: &str,
    private_key: &str,
    mount_point: &str,
    deadline: Option<Duration>,
) -> Result<String> {
    let addr = host_with_port(host);
    let tcp = TcpStream::connect(&addr).map_err(|e| Error::Format {
        reason: format!("connect to {addr}: {e}"),
    })?;

    let mut session = Session::new().map_err(|e| Error::Format {
        reason: format!("session setup: {e}"),
    })?;
    session.set_tcp_stream(tcp);
    session.handshake().map_err(|e| Error::Format {
        reason: format!("handshake with {addr}: {e}"),
    })?;

    session
        .userauth_pubkey_memory(username, None, private_key, None)
        .map_err(|e| Error::Format {
            reason: format!("authentication as {username}: {e}"),
        })?;

    if let Some(limit) = deadline {
        session.set_timeout(limit.as_millis() as u32);
    }

    // Session and channel close on drop, so every early return below still
    // releases the transport.
    let mut channel = session.channel_session().map_err(|e| Error::Format {
        reason: format!("open session channel: {e}"),
    })?;
    channel.request_pty("xterm", None, None).map_err(|e| Error::Format {
        reason: format!("pty allocation: {e}"),
    })?;
    channel
        .exec(&format_command(mount_point))
        .map_err(|e| Error::Format {
            reason: format!("exec format command: {e}"),
        })?;

    let output = read_until_sentinel(&mut channel, deadline.map(|d| Instant::now() + d))?;

    let _ = channel.close();
    let _ = channel.wait_close();
    Ok(output)
}

/// The single composed remote command: format, then echo exactly one
/// sentinel line regardless of the tool's own exit code
fn format_command(mount_point: &str) -> String {
    format!("sudo /sbin/mkfs.ext4 {mount_point} && echo OK || echo FAIL")
}

fn host_with_port(host: &str) -> String {
    if host.contains(':') {
        host.to_string()
    } else {
        format!("{host}:{SSH_PORT}")
    }
}

/// Read fixed-size chunks into a growing buffer until it contains a newline
/// immediately followed by a sentinel, then return the whole buffer text.
///
/// A channel that closes before producing a sentinel fails instead of
/// spinning; a deadline in the past fails before the next read.
fn read_until_sentinel<R: Read>(reader: &mut R, deadline: Option<Instant>) -> Result<String> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; RECV_CHUNK];

    while !has_sentinel(&buffer) {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Err(Error::Format {
                    reason: "deadline exceeded waiting for completion marker".into(),
                });
            }
        }

        let n = reader.read(&mut chunk).map_err(|e| Error::Format {
            reason: format!("session read: {e}"),
        })?;
        if n == 0 {
            return Err(Error::Format {
                reason: "session closed before completion marker".into(),
            });
        }
        buffer.extend_from_slice(&chunk[..n]);
    }

    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn has_sentinel(buffer: &[u8]) -> bool {
    contains(buffer, b"\nOK") || contains(buffer, b"\nFAIL")
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
