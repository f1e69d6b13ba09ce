//! One-shot and file AEAD: convenience layers over the streaming engine
//! for whole-buffer encryption and in-place file transformation.

use {
    crate::{
        buf::Buf,
        error::{Error, Result},
        primitive::{self, KEY_LEN, NONCE_LEN, TAG_LEN},
        stream::{DecryptionSession, EncryptionSession},
    },
    std::{
        fs::{self, File, OpenOptions},
        io::{Read as _, Write as _},
        path::{Path, PathBuf},
    },
    subtle::ConstantTimeEq,
    tracing::{info, warn},
};

/// Width of the nonce field in the self-contained blob framing: 16 bytes
/// even though a GCM nonce is 12, the trailing 4 bytes zero on write and
/// ignored on read. See DESIGN.md for why this width was kept over a
/// tighter 12-byte framing.
const BLOB_NONCE_FIELD_LEN: usize = 16;

/// Fixed chunk size for `encrypt_file`/`decrypt_file`'s buffered I/O.
/// A plain constant: it affects I/O granularity only, not the wire
/// format, so it carries no compatibility weight.
const FILE_CHUNK_LEN: usize = 64 * 1024;

/// Picks a sibling path to write the replacement contents to before an
/// atomic rename onto `path`, so a failure never leaves `path` partially
/// written.
fn sibling_temp_path(path: &Path) -> Result<PathBuf> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path.file_name().unwrap_or_default().to_string_lossy().into_owned();
    let suffix = hex::encode(primitive::random_bytes(8)?);
    Ok(dir.join(format!(".{name}.tmp-{suffix}")))
}

pub(crate) fn frame_blob(nonce: &[u8; NONCE_LEN], ciphertext: &[u8], tag: &[u8; TAG_LEN]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(BLOB_NONCE_FIELD_LEN + ciphertext.len() + TAG_LEN);
    blob.extend_from_slice(nonce);
    blob.extend_from_slice(&[0u8; BLOB_NONCE_FIELD_LEN - NONCE_LEN]);
    blob.extend_from_slice(ciphertext);
    blob.extend_from_slice(tag);
    blob
}

pub(crate) fn unframe_blob(blob: &[u8]) -> Result<([u8; NONCE_LEN], &[u8], &[u8])> {
    if blob.len() < BLOB_NONCE_FIELD_LEN + TAG_LEN {
        return Err(Error::Malformed("blob shorter than nonce field plus tag"));
    }
    let nonce: [u8; NONCE_LEN] = blob[..NONCE_LEN].try_into().unwrap();
    let ciphertext = &blob[BLOB_NONCE_FIELD_LEN..blob.len() - TAG_LEN];
    let tag = &blob[blob.len() - TAG_LEN..];
    Ok((nonce, ciphertext, tag))
}

/// Encrypts `plaintext` under `key` in a single internal session,
/// returning the self-contained blob `nonce(16) || ciphertext || tag(16)`.
pub fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut session = EncryptionSession::new(Some(*key), None);
    let nonce_vec = session.start(None, None)?;
    let nonce: [u8; NONCE_LEN] = nonce_vec.try_into().unwrap();
    let ciphertext = session.encrypt(plaintext)?;
    let tag = session.finalize()?;
    Ok(frame_blob(&nonce, &ciphertext, &tag))
}

/// Decrypts a blob produced by [`encrypt`].
pub fn decrypt(key: &[u8; KEY_LEN], blob: &[u8]) -> Result<Vec<u8>> {
    let (nonce, ciphertext, tag) = unframe_blob(blob)?;
    let mut session = DecryptionSession::new(Some(*key), None);
    session.start(None, &nonce, None)?;
    let plaintext = session.decrypt(ciphertext)?;
    session.finalize(tag)?;
    Ok(plaintext)
}

/// Encrypts `plaintext`, additionally invoking `tag_fn(key, ciphertext)`
/// to produce an application-level "check tag" bound to the same
/// ciphertext the GCM tag inside `blob` protects. This lets a higher-level
/// protocol bind ciphertext to its own MAC without re-scanning the data.
pub fn encrypt_with_tag_fn(
    key: &[u8; KEY_LEN],
    plaintext: &[u8],
    tag_fn: impl FnOnce(&[u8; KEY_LEN], &[u8]) -> Vec<u8>,
) -> Result<(Vec<u8>, Vec<u8>)> {
    let mut session = EncryptionSession::new(Some(*key), None);
    let nonce_vec = session.start(None, None)?;
    let nonce: [u8; NONCE_LEN] = nonce_vec.try_into().unwrap();
    let ciphertext = session.encrypt(plaintext)?;
    let tag = session.finalize()?;
    let check_tag = tag_fn(key, &ciphertext);
    Ok((frame_blob(&nonce, &ciphertext, &tag), check_tag))
}

/// Inverse of [`encrypt_with_tag_fn`]. Verifies both the GCM tag embedded
/// in `blob` and, in constant time, `check_tag` against
/// `tag_fn(key, ciphertext)`.
pub fn decrypt_with_tag_fn(
    key: &[u8; KEY_LEN],
    blob: &[u8],
    check_tag: &[u8],
    tag_fn: impl FnOnce(&[u8; KEY_LEN], &[u8]) -> Vec<u8>,
) -> Result<Vec<u8>> {
    let (nonce, ciphertext, tag) = unframe_blob(blob)?;
    let expected_check_tag = tag_fn(key, ciphertext);
    if !bool::from(expected_check_tag[..].ct_eq(check_tag)) {
        return Err(Error::AuthenticationFailed);
    }
    let mut session = DecryptionSession::new(Some(*key), None);
    session.start(None, &nonce, None)?;
    let plaintext = session.decrypt(ciphertext)?;
    session.finalize(tag)?;
    Ok(plaintext)
}

/// Encrypts `path` in place. The file is left containing
/// `nonce(12) || ciphertext`, same length as `12 + original file size`;
/// the GCM tag is returned to the caller rather than embedded, so callers
/// that store tags in a manifest alongside the file don't need to parse
/// it back out. Written via a sibling temp file renamed atomically onto
/// `path`, so a crash mid-write never leaves `path` partially rewritten.
///
/// Fails with [`Error::InvalidArgument`] if the file is empty.
pub fn encrypt_file(path: &Path, key: &[u8; KEY_LEN], marker: Option<&[u8]>) -> Result<[u8; TAG_LEN]> {
    let metadata = fs::metadata(path)?;
    if metadata.len() == 0 {
        return Err(Error::InvalidArgument("file must not be empty"));
    }
    info!(path = %path.display(), bytes = metadata.len(), "encrypting file");

    let mut session = EncryptionSession::new(Some(*key), None);
    let nonce = session.start(None, marker)?;

    let tmp_path = sibling_temp_path(path)?;
    let mut tmp = OpenOptions::new().write(true).create_new(true).open(&tmp_path)?;
    let result = (|| -> Result<[u8; TAG_LEN]> {
        tmp.write_all(&nonce)?;

        let mut input = File::open(path)?;
        let mut buf: Buf<FILE_CHUNK_LEN> = Buf::new();
        loop {
            let n = buf.read_from(&mut input)?;
            if n == 0 {
                break;
            }
            let ciphertext = session.encrypt(buf.remaining_slice())?;
            tmp.write_all(&ciphertext)?;
            buf.reset();
        }
        let tag = session.finalize()?;
        tmp.flush()?;
        Ok(tag)
    })();

    let tag = match result {
        Ok(tag) => tag,
        Err(err) => {
            let _ = fs::remove_file(&tmp_path);
            return Err(err);
        }
    };
    fs::rename(&tmp_path, path)?;
    info!(path = %path.display(), "file encryption complete");
    Ok(tag)
}

/// Reverses [`encrypt_file`]. On authentication failure the original file
/// is left byte-for-byte intact: ciphertext is written to a sibling temp
/// file and only renamed onto `path` after `tag` verifies.
pub fn decrypt_file(path: &Path, key: &[u8; KEY_LEN], tag: &[u8; TAG_LEN], marker: Option<&[u8]>) -> Result<()> {
    let metadata = fs::metadata(path)?;
    info!(path = %path.display(), bytes = metadata.len(), "decrypting file");

    let mut input = File::open(path)?;
    let mut nonce = [0u8; NONCE_LEN];
    input.read_exact(&mut nonce).map_err(|_| Error::Malformed("file shorter than nonce field"))?;

    let mut session = DecryptionSession::new(Some(*key), None);
    session.start(None, &nonce, marker)?;

    let tmp_path = sibling_temp_path(path)?;
    let mut tmp = OpenOptions::new().write(true).create_new(true).open(&tmp_path)?;
    let result = (|| -> Result<()> {
        let mut buf: Buf<FILE_CHUNK_LEN> = Buf::new();
        loop {
            let n = buf.read_from(&mut input)?;
            if n == 0 {
                break;
            }
            let plaintext = session.decrypt(buf.remaining_slice())?;
            tmp.write_all(&plaintext)?;
            buf.reset();
        }
        session.finalize(tag)?;
        tmp.flush()?;
        Ok(())
    })();

    if let Err(err) = result {
        warn!(path = %path.display(), "file decryption failed authentication, leaving file untouched");
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    fs::rename(&tmp_path, path)?;
    info!(path = %path.display(), "file decryption complete");
    Ok(())
}
