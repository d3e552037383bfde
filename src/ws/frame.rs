//! RFC 6455 frame codec over an arbitrary async byte stream.
//!
//! Implements the base (unfragmented) WebSocket wire format:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |                               |Masking-key, if MASK set to 1  |
//! +-------------------------------+-------------------------------+
//! | Masking-key (continued)       |          Payload Data         |
//! +-------------------------------- - - - - - - - - - - - - - - - +
//! ```
//!
//! One blocking read per frame: [`read_frame`] consumes exactly one
//! header, the optional length extension and mask key, then the payload.
//! Fragmentation is rejected outright (FIN must be set), so no decode
//! state survives between calls.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::FrameError;

/// Default cap on a single inbound frame payload (16 MiB).
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// WebSocket frame opcode (4 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Continuation frame of a fragmented message.
    Continuation = 0x0,
    /// Text data frame.
    Text = 0x1,
    /// Binary data frame.
    Binary = 0x2,
    /// Connection close control frame.
    Close = 0x8,
    /// Ping control frame.
    Ping = 0x9,
    /// Pong control frame.
    Pong = 0xA,
}

impl Opcode {
    /// Parses an opcode from the low nibble of the first header byte.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::InvalidOpcode`] for reserved values.
    pub fn from_u8(value: u8) -> Result<Self, FrameError> {
        match value {
            0x0 => Ok(Self::Continuation),
            0x1 => Ok(Self::Text),
            0x2 => Ok(Self::Binary),
            0x8 => Ok(Self::Close),
            0x9 => Ok(Self::Ping),
            0xA => Ok(Self::Pong),
            other => Err(FrameError::InvalidOpcode(other)),
        }
    }

    /// Returns `true` for Close, Ping and Pong.
    #[must_use]
    pub const fn is_control(self) -> bool {
        matches!(self, Self::Close | Self::Ping | Self::Pong)
    }
}

/// One decoded WebSocket frame.
///
/// The FIN and mask header bits are validated and consumed by
/// [`read_frame`]: a frame that reaches the caller is always final and
/// its payload is always unmasked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame opcode.
    pub opcode: Opcode,
    /// Unmasked payload bytes.
    pub payload: Vec<u8>,
}

/// Reads exactly one frame from the stream.
///
/// Reads the 2-byte header, extends the length field when the 7-bit
/// length equals 126 (2 more bytes, big-endian) or 127 (8 more bytes,
/// big-endian), reads the 4-byte mask key when the mask bit is set, then
/// reads `payload_len` bytes and unmasks them. Client-to-server frames
/// arrive masked per the protocol; unmasked frames are tolerated, the
/// way the payload is recovered is the same either way.
///
/// # Errors
///
/// - [`FrameError::FragmentedFrame`] when FIN is unset.
/// - [`FrameError::InvalidOpcode`] for reserved opcode values.
/// - [`FrameError::PayloadTooLarge`] when the declared length exceeds
///   `max_payload`.
/// - [`FrameError::Io`] on any short read; a header that promises more
///   bytes than the stream delivers fails, it never truncates.
pub async fn read_frame<R>(stream: &mut R, max_payload: usize) -> Result<Frame, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 2];
    stream.read_exact(&mut header).await?;
    let [first, second] = header;

    let fin = first & 0x80 != 0;
    if !fin {
        return Err(FrameError::FragmentedFrame);
    }
    let opcode = Opcode::from_u8(first & 0x0F)?;

    let masked = second & 0x80 != 0;
    let declared = u64::from(second & 0x7F);
    let len = match declared {
        126 => {
            let mut ext = [0u8; 2];
            stream.read_exact(&mut ext).await?;
            u64::from(u16::from_be_bytes(ext))
        }
        127 => {
            let mut ext = [0u8; 8];
            stream.read_exact(&mut ext).await?;
            u64::from_be_bytes(ext)
        }
        base => base,
    };

    let len = usize::try_from(len)
        .ok()
        .filter(|&l| l <= max_payload)
        .ok_or(FrameError::PayloadTooLarge {
            len,
            max: max_payload,
        })?;

    let mask_key = if masked {
        let mut key = [0u8; 4];
        stream.read_exact(&mut key).await?;
        Some(key)
    } else {
        None
    };

    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await?;
    if let Some(key) = mask_key {
        apply_mask(&mut payload, key);
    }

    Ok(Frame { opcode, payload })
}

/// Encodes one frame: FIN always set, mask bit never set, minimal length
/// encoding (thresholds 125 and 65535).
///
/// Both the server and the terminal client emit unmasked frames; the
/// decoder on either end tolerates both forms.
#[must_use]
pub fn encode_frame(opcode: Opcode, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 10);
    buf.push(0x80 | opcode as u8);
    match payload.len() {
        len @ 0..=125 => buf.push(len as u8),
        len @ 126..=65535 => {
            buf.push(126);
            buf.extend_from_slice(&(len as u16).to_be_bytes());
        }
        len => {
            buf.push(127);
            buf.extend_from_slice(&(len as u64).to_be_bytes());
        }
    }
    buf.extend_from_slice(payload);
    buf
}

/// Encodes a frame and writes it to the stream in full.
///
/// # Errors
///
/// Returns [`FrameError::Io`] when the stream rejects the write.
pub async fn write_frame<W>(
    stream: &mut W,
    opcode: Opcode,
    payload: &[u8],
) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let encoded = encode_frame(opcode, payload);
    stream.write_all(&encoded).await?;
    stream.flush().await?;
    Ok(())
}

/// XOR-masks `payload` in place with `key[i mod 4]`.
///
/// Masking is involutive: applying the same key twice restores the
/// original bytes, which is why decode and encode share this helper.
pub fn apply_mask(payload: &mut [u8], key: [u8; 4]) {
    for (byte, k) in payload.iter_mut().zip(key.iter().cycle()) {
        *byte ^= k;
    }
}
