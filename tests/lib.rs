use std::fs::File;
use streamcrypt::{
    create_salted_key, decrypt, decrypt_file, encrypt, encrypt_file, flip_decrypt, flip_encrypt,
    get_salted_key, DecryptionSession, EncryptionSession, FlipOptions, KEY_LEN,
};

fn key(byte: u8) -> [u8; KEY_LEN] {
    [byte; KEY_LEN]
}

#[test]
fn one_shot_round_trip_empty_message() {
    let k = key(0);
    let blob = encrypt(&k, b"").unwrap();
    assert_eq!(blob.len(), 32);
    assert_eq!(decrypt(&k, &blob).unwrap(), b"");
}

#[test]
fn one_shot_round_trip_and_marker_mismatch_via_streaming() {
    let k = key(0x6b);
    let mut enc = EncryptionSession::new(Some(k), None);
    let nonce = enc.start(None, Some(b"v1")).unwrap();
    let ciphertext = enc.encrypt(b"hello world").unwrap();
    let tag = enc.finalize().unwrap();

    let mut good = DecryptionSession::new(Some(k), None);
    good.start(None, &nonce, Some(b"v1")).unwrap();
    let plaintext = good.decrypt(&ciphertext).unwrap();
    good.finalize(&tag).unwrap();
    assert_eq!(plaintext, b"hello world");

    let mut bad = DecryptionSession::new(Some(k), None);
    bad.start(None, &nonce, Some(b"v2")).unwrap();
    let _ = bad.decrypt(&ciphertext).unwrap();
    assert!(bad.finalize(&tag).is_err());
}

#[test]
fn streaming_round_trip_is_independent_of_chunking() {
    let k = key(9);
    let plaintext: Vec<u8> = (0..1usize << 20).map(|i| (i % 251) as u8).collect();

    for chunk_size in [1usize, 7, 4096, 1 << 20] {
        let mut enc = EncryptionSession::new(Some(k), None);
        let nonce = enc.start(None, None).unwrap();
        let mut ciphertext = Vec::new();
        for chunk in plaintext.chunks(chunk_size) {
            ciphertext.extend(enc.encrypt(chunk).unwrap());
        }
        let tag = enc.finalize().unwrap();

        let mut dec = DecryptionSession::new(Some(k), None);
        dec.start(None, &nonce, None).unwrap();
        let mut recovered = Vec::new();
        for chunk in ciphertext.chunks(chunk_size) {
            recovered.extend(dec.decrypt(chunk).unwrap());
        }
        dec.finalize(&tag).unwrap();
        assert_eq!(recovered, plaintext);
    }
}

#[test]
fn kdf_is_deterministic_and_passphrase_sensitive() {
    let salt = vec![0u8; 16];
    let a = get_salted_key("correct horse battery staple", &salt).unwrap();
    let b = get_salted_key("correct horse battery staple", &salt).unwrap();
    assert_eq!(a, b);

    let c = get_salted_key("wrong passphrase", &salt).unwrap();
    assert_ne!(a, c);

    let mut other_salt = salt.clone();
    other_salt[0] = 1;
    let d = get_salted_key("correct horse battery staple", &other_salt).unwrap();
    assert_ne!(a, d);
}

#[test]
fn create_salted_key_produces_usable_key() {
    let (hex_key, salt) = create_salted_key("a sufficiently long passphrase").unwrap();
    let again = get_salted_key("a sufficiently long passphrase", &salt).unwrap();
    assert_eq!(hex_key, again);
    assert_eq!(hex_key.len(), 64);
}

#[test]
fn file_encrypt_decrypt_round_trip() {
    let k = key(0x42);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let original: Vec<u8> = (0..10 * 1024 * 1024).map(|i| (i % 256) as u8).collect();
    std::io::Write::write_all(&mut file, &original).unwrap();

    let tag = encrypt_file(file.path(), &k, Some(b"file-marker")).unwrap();
    decrypt_file(file.path(), &k, &tag, Some(b"file-marker")).unwrap();

    let mut roundtripped = Vec::new();
    std::io::Read::read_to_end(&mut File::open(file.path()).unwrap(), &mut roundtripped).unwrap();
    assert_eq!(roundtripped, original);
}

#[test]
fn file_decrypt_with_wrong_tag_leaves_file_unchanged() {
    let k = key(0x99);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, b"unmodified on failure").unwrap();

    let tag = encrypt_file(file.path(), &k, None).unwrap();
    let mut before = Vec::new();
    std::io::Read::read_to_end(&mut File::open(file.path()).unwrap(), &mut before).unwrap();

    let mut wrong_tag = tag;
    wrong_tag[0] ^= 0xff;
    assert!(decrypt_file(file.path(), &k, &wrong_tag, None).is_err());

    let mut after = Vec::new();
    std::io::Read::read_to_end(&mut File::open(file.path()).unwrap(), &mut after).unwrap();
    assert_eq!(before, after);
}

#[test]
fn flip_round_trip_with_and_without_garbage() {
    let plaintext = b"the session record links the other two channels";

    let (plain_artifacts, plain_key) = flip_encrypt(plaintext, "flip passphrase", Some(b"m"), FlipOptions::default()).unwrap();
    let recovered = flip_decrypt(&plain_artifacts.cipher_data, "flip passphrase", &plain_artifacts.session_data, &plain_key, Some(b"m")).unwrap();
    assert_eq!(recovered, plaintext);

    let opts = FlipOptions {
        add_garbage: true,
        ..Default::default()
    };
    let (garbled_artifacts, garbled_key) = flip_encrypt(plaintext, "flip passphrase", Some(b"m"), opts).unwrap();
    assert!(garbled_artifacts.cipher_data.len() > plaintext.len() + 32);
    let recovered = flip_decrypt(
        &garbled_artifacts.cipher_data,
        "flip passphrase",
        &garbled_artifacts.session_data,
        &garbled_key,
        Some(b"m"),
    )
    .unwrap();
    assert_eq!(recovered, plaintext);
}

#[test]
fn flip_channel_isolation_holds() {
    let (artifacts, instant_key) = flip_encrypt(b"isolated", "pw", None, FlipOptions::default()).unwrap();

    // cipher_data alone, without session_data's nonce/offsets or the
    // instant key, is not a valid one-shot blob for any key.
    assert!(decrypt(&key(0), &artifacts.cipher_data).is_err());

    // session_data alone, with the wrong passphrase, cannot be opened.
    assert!(flip_decrypt(&artifacts.cipher_data, "wrong", &artifacts.session_data, &instant_key, None).is_err());
}
