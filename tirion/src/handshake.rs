use protocol::HandshakeReply;
use std::io::{Read, Write};
use tracing::{debug, warn};

use crate::framing::{write_record, FramedReceiver};
use crate::{ClientConfig, Result};

/// Announce the protocol version and preferred transport, then read the
/// agent's single reply line. No retry: any failure ends the handshake.
pub fn negotiate<W: Write, R: Read>(
    writer: &mut W,
    receiver: &mut FramedReceiver<R>,
    config: &ClientConfig,
) -> Result<HandshakeReply> {
    debug!(
        version = %config.version,
        transport = %config.preferred_transport,
        "requesting tirion protocol version"
    );
    write_record(
        writer,
        &protocol::hello(&config.version, &config.preferred_transport),
    )?;

    let line = receiver.receive()?;

    let reply = HandshakeReply::parse(&line).map_err(|e| {
        warn!(error = %e, reply = %line, "agent sent an unusable handshake reply");
        e
    })?;

    debug!(
        slot_count = reply.slot_count,
        location = %reply.location.display(),
        "received metric count and buffer location"
    );

    Ok(reply)
}
