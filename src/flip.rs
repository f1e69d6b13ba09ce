//! The "flip" three-channel transmission protocol: splits a
//! message into cipher data (encrypted under an ephemeral instant key),
//! a session descriptor (encrypted under a passphrase-derived key), and
//! the instant key itself, so that no single transported artifact alone
//! is useful to an observer.

use {
    crate::{
        error::{Error, Result},
        keys::{PBKDF2_ITERATIONS, SALT_LEN},
        oneshot,
        primitive::{self, KEY_LEN, NONCE_LEN, TAG_LEN},
        stream::{DecryptionSession, EncryptionSession},
    },
    byteorder::{BigEndian, ByteOrder},
    tracing::warn,
};

const SESSION_VERSION: u8 = 1;

/// Controls the optional length-obfuscating padding around the real
/// ciphertext in [`flip_encrypt`]'s `cipher_data` output. The default
/// range (16-255 bytes, uniformly drawn) can be overridden per call.
#[derive(Debug, Clone, Copy)]
pub struct FlipOptions {
    pub add_garbage: bool,
    /// Inclusive range each garbage segment's length is drawn from.
    pub garbage_len_range: (usize, usize),
}

impl Default for FlipOptions {
    fn default() -> Self {
        Self {
            add_garbage: false,
            garbage_len_range: (16, 255),
        }
    }
}

/// The two artifacts returned alongside the instant key by
/// [`flip_encrypt`].
#[derive(Debug, Clone)]
pub struct FlipArtifacts {
    pub cipher_data: Vec<u8>,
    pub session_data: Vec<u8>,
}

fn derive_session_key(passphrase: &[u8], salt: &[u8; SALT_LEN]) -> [u8; KEY_LEN] {
    primitive::pbkdf2(passphrase, salt, PBKDF2_ITERATIONS, KEY_LEN)
        .try_into()
        .expect("pbkdf2 out_len matches KEY_LEN")
}

/// Draws a uniform length from `range`, inclusive on both ends. Computed
/// in `u128` (wide enough for any `usize` span, including the full
/// `(0, usize::MAX)` range) so a wide `garbage_len_range` never truncates
/// into a zero modulus.
fn garbage_len(range: (usize, usize)) -> Result<usize> {
    let (low, high) = range;
    if low > high {
        return Err(Error::InvalidArgument("garbage_len_range low must not exceed high"));
    }
    let span = (high - low) as u128 + 1;
    let raw = primitive::random_bytes(8)?;
    let roll = u64::from_be_bytes(raw.try_into().unwrap()) as u128 % span;
    Ok(low + roll as usize)
}

/// Encrypts `plaintext` for transmission over three independent channels.
/// Returns the channel-one and channel-two artifacts together with the
/// channel-three instant key (32 raw bytes).
pub fn flip_encrypt(
    plaintext: &[u8],
    passphrase: &str,
    marker: Option<&[u8]>,
    opts: FlipOptions,
) -> Result<(FlipArtifacts, [u8; KEY_LEN])> {
    if passphrase.is_empty() {
        return Err(Error::InvalidArgument("passphrase must not be empty"));
    }

    let instant_key: [u8; KEY_LEN] = primitive::random_bytes(KEY_LEN)?.try_into().unwrap();
    let marker = marker.unwrap_or(&[]);

    let mut cipher_session = EncryptionSession::new(Some(instant_key), None);
    let nonce_vec = cipher_session.start(None, Some(marker))?;
    let nonce: [u8; NONCE_LEN] = nonce_vec.try_into().unwrap();
    let ciphertext = cipher_session.encrypt(plaintext)?;
    let tag: [u8; TAG_LEN] = cipher_session.finalize()?;

    let (garbage_pre, garbage_post, cipher_data) = if opts.add_garbage {
        let pre_len = garbage_len(opts.garbage_len_range)?;
        let post_len = garbage_len(opts.garbage_len_range)?;
        let mut cipher_data = primitive::random_bytes(pre_len)?;
        cipher_data.extend_from_slice(&ciphertext);
        cipher_data.extend_from_slice(&primitive::random_bytes(post_len)?);
        (pre_len, post_len, cipher_data)
    } else {
        (0, 0, ciphertext.clone())
    };

    let mut payload = Vec::with_capacity(1 + NONCE_LEN + TAG_LEN + 2 + marker.len() + 12);
    payload.push(SESSION_VERSION);
    payload.extend_from_slice(&nonce);
    payload.extend_from_slice(&tag);
    let mut marker_len_buf = [0u8; 2];
    BigEndian::write_u16(&mut marker_len_buf, marker.len() as u16);
    payload.extend_from_slice(&marker_len_buf);
    payload.extend_from_slice(marker);
    let mut u32_buf = [0u8; 4];
    BigEndian::write_u32(&mut u32_buf, garbage_pre as u32);
    payload.extend_from_slice(&u32_buf);
    BigEndian::write_u32(&mut u32_buf, ciphertext.len() as u32);
    payload.extend_from_slice(&u32_buf);
    BigEndian::write_u32(&mut u32_buf, garbage_post as u32);
    payload.extend_from_slice(&u32_buf);

    // The salt is not secret, so it is carried in cleartext ahead of the
    // encrypted payload rather than inside it — see DESIGN.md for why
    // encrypting it would make session_data undecryptable.
    let salt_vec = primitive::random_bytes(SALT_LEN)?;
    let salt: [u8; SALT_LEN] = salt_vec.clone().try_into().unwrap();
    let session_key = derive_session_key(passphrase.as_bytes(), &salt);
    let session_blob = oneshot::encrypt(&session_key, &payload)?;

    let mut session_data = salt_vec;
    session_data.extend_from_slice(&session_blob);

    Ok((
        FlipArtifacts {
            cipher_data,
            session_data,
        },
        instant_key,
    ))
}

/// Reverses [`flip_encrypt`]. `instant_key` is channel three and must be
/// supplied by the caller out-of-band.
pub fn flip_decrypt(
    cipher_data: &[u8],
    passphrase: &str,
    session_data: &[u8],
    instant_key: &[u8; KEY_LEN],
    marker: Option<&[u8]>,
) -> Result<Vec<u8>> {
    if session_data.len() < SALT_LEN {
        return Err(Error::Malformed("session data shorter than salt field"));
    }
    let salt: [u8; SALT_LEN] = session_data[..SALT_LEN].try_into().unwrap();
    let session_blob = &session_data[SALT_LEN..];

    let session_key = derive_session_key(passphrase.as_bytes(), &salt);
    let payload = oneshot::decrypt(&session_key, session_blob)?;

    if payload.len() < 1 + NONCE_LEN + TAG_LEN + 2 {
        return Err(Error::Malformed("session payload too short"));
    }
    if payload[0] != SESSION_VERSION {
        return Err(Error::Malformed("unknown session data version"));
    }
    let mut off = 1;
    let nonce: [u8; NONCE_LEN] = payload[off..off + NONCE_LEN].try_into().unwrap();
    off += NONCE_LEN;
    let tag: [u8; TAG_LEN] = payload[off..off + TAG_LEN].try_into().unwrap();
    off += TAG_LEN;
    let marker_len = BigEndian::read_u16(&payload[off..off + 2]) as usize;
    off += 2;
    if payload.len() < off + marker_len + 12 {
        return Err(Error::Malformed("session payload length fields inconsistent"));
    }
    let embedded_marker = &payload[off..off + marker_len];
    off += marker_len;
    let garbage_pre = BigEndian::read_u32(&payload[off..off + 4]) as usize;
    off += 4;
    let cipher_len = BigEndian::read_u32(&payload[off..off + 4]) as usize;
    off += 4;
    let _garbage_post = BigEndian::read_u32(&payload[off..off + 4]) as usize;

    if let Some(caller_marker) = marker {
        if caller_marker != embedded_marker {
            warn!("flip decrypt marker does not match embedded marker");
            return Err(Error::MarkerMismatch);
        }
    }

    if cipher_data.len() < garbage_pre + cipher_len {
        return Err(Error::Malformed("cipher data shorter than recorded offsets"));
    }
    let real_ciphertext = &cipher_data[garbage_pre..garbage_pre + cipher_len];

    let mut session = DecryptionSession::new(Some(*instant_key), None);
    session.start(None, &nonce, Some(embedded_marker))?;
    let plaintext = session.decrypt(real_ciphertext)?;
    if let Err(err) = session.finalize(&tag) {
        warn!("flip decrypt failed ciphertext authentication");
        return Err(err);
    }

    Ok(plaintext)
}
