//! Peers encrypt against the exported public key; the device decrypts.

use openssl::pkey::Public;
use openssl::rsa::{Padding, Rsa};
use peerlink_keys::{create_or_load_identity, error::Result, DeviceIdentity, KeyError};
use tempfile::TempDir;

fn create_identity(dir: &TempDir) -> Result<DeviceIdentity> {
    create_or_load_identity(
        &dir.path().join("private.pem"),
        &dir.path().join("certificate.pem"),
        "11111111-1111-1111-1111-111111111111",
        "Org",
        "Unit",
        10,
    )
}

/// What a pairing peer does with the PEM it received
fn peer_public_key(identity: &DeviceIdentity) -> Rsa<Public> {
    let pem = identity.public_key_pem().unwrap();
    Rsa::public_key_from_pem(pem.as_bytes()).unwrap()
}

fn peer_encrypt(public: &Rsa<Public>, plaintext: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; public.size() as usize];
    let len = public
        .public_encrypt(plaintext, &mut out, Padding::PKCS1)
        .unwrap();
    out.truncate(len);
    out
}

#[test]
fn test_third_party_ciphertext_decrypts() -> Result<()> {
    let dir = TempDir::new()?;
    let identity = create_identity(&dir)?;
    let public = peer_public_key(&identity);

    let ciphertext = peer_encrypt(&public, b"pairing secret");
    assert_eq!(ciphertext.len(), 256);
    assert_eq!(identity.decrypt(&ciphertext)?, b"pairing secret");

    Ok(())
}

#[test]
fn test_reloaded_identity_decrypts_earlier_ciphertext() -> Result<()> {
    let dir = TempDir::new()?;
    let ciphertext = {
        let identity = create_identity(&dir)?;
        peer_encrypt(&peer_public_key(&identity), b"sent before restart")
    };

    let reloaded = create_identity(&dir)?;
    assert_eq!(reloaded.decrypt(&ciphertext)?, b"sent before restart");

    Ok(())
}

#[test]
fn test_wrong_length_does_not_poison_identity() -> Result<()> {
    let dir = TempDir::new()?;
    let identity = create_identity(&dir)?;
    let ciphertext = peer_encrypt(&peer_public_key(&identity), b"still works");

    let err = identity.decrypt(&ciphertext[..128]).unwrap_err();
    assert!(matches!(
        err,
        KeyError::InvalidCiphertextLength {
            expected: 256,
            actual: 128
        }
    ));
    assert!(err.is_recoverable());

    assert_eq!(identity.decrypt(&ciphertext)?, b"still works");

    Ok(())
}

#[test]
fn test_ciphertext_for_another_device_is_rejected() -> Result<()> {
    let dir_a = TempDir::new()?;
    let dir_b = TempDir::new()?;
    let device_a = create_identity(&dir_a)?;
    let device_b = create_identity(&dir_b)?;

    let for_a = peer_encrypt(&peer_public_key(&device_a), b"only for device a");

    let err = device_b.decrypt(&for_a).unwrap_err();
    assert!(matches!(err, KeyError::DecryptionError(_)), "got {err:?}");
    assert!(err.is_recoverable());

    assert_eq!(device_a.decrypt(&for_a)?, b"only for device a");

    Ok(())
}

#[test]
fn test_corrupted_ciphertext_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let identity = create_identity(&dir)?;
    let mut ciphertext = peer_encrypt(&peer_public_key(&identity), b"tampered in transit");

    ciphertext[10] ^= 0x01;

    let err = identity.decrypt(&ciphertext).unwrap_err();
    assert!(matches!(err, KeyError::DecryptionError(_)), "got {err:?}");
    assert!(err.is_recoverable());

    Ok(())
}

#[test]
fn test_concurrent_decrypts_share_one_identity() -> Result<()> {
    let dir = TempDir::new()?;
    let identity = create_identity(&dir)?;
    let public = peer_public_key(&identity);

    let messages: Vec<Vec<u8>> = (0..8u8).map(|i| vec![i; 16 + i as usize]).collect();
    let ciphertexts: Vec<Vec<u8>> = messages
        .iter()
        .map(|message| peer_encrypt(&public, message))
        .collect();

    std::thread::scope(|scope| {
        for (message, ciphertext) in messages.iter().zip(&ciphertexts) {
            let identity = &identity;
            scope.spawn(move || {
                for _ in 0..10 {
                    assert_eq!(&identity.decrypt(ciphertext).unwrap(), message);
                }
            });
        }
    });

    Ok(())
}
