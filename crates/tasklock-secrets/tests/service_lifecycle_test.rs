//! Integration tests for the EncryptionService key lifecycle.
//!
//! Drives the service the way the CLI does: setup, confirm, save, then a
//! fresh process (a new service over the same directory) reads the key back.

use std::sync::Arc;
use std::thread;

use tasklock_core::config::E2eeConfig;
use tasklock_secrets::{EncryptionService, KeyStorage, SecretsError};
use tempfile::TempDir;

fn config_for(dir: &TempDir) -> E2eeConfig {
    E2eeConfig {
        enabled: true,
        key_dir: Some(dir.path().to_path_buf()),
        key_file: "master.key".into(),
    }
}

#[test]
fn key_survives_service_restart() {
    let tmp = TempDir::new().unwrap();

    let first = EncryptionService::new(KeyStorage::new(tmp.path()));
    let (manager, phrase) = first.setup().unwrap();
    first.save_manager(manager).unwrap();
    let envelope = first.encrypt("Pick up dry cleaning").unwrap();
    drop(first);

    let second = EncryptionService::new(KeyStorage::new(tmp.path()));
    assert!(second.is_enabled());
    assert_eq!(second.decrypt(&envelope).unwrap(), "Pick up dry cleaning");
    assert!(second.verify_recovery_phrase(&phrase));
}

#[test]
fn config_key_dir_and_file_name_are_honoured() {
    // TASKLOCK_KEY_DIR would take precedence; only meaningful when unset
    if std::env::var_os(tasklock_secrets::KEY_DIR_ENV).is_some() {
        return;
    }
    let tmp = TempDir::new().unwrap();
    let mut config = config_for(&tmp);
    config.key_file = "work.key".into();

    let service = EncryptionService::from_config(&config);
    let (manager, _) = service.setup().unwrap();
    service.save_manager(manager).unwrap();

    assert!(tmp.path().join("work.key").is_file());
    assert_eq!(
        service.status().key_file_path.as_deref(),
        Some(tmp.path().join("work.key").as_path())
    );
}

#[test]
fn lost_key_recovered_from_phrase() {
    let tmp = TempDir::new().unwrap();
    let service = EncryptionService::new(KeyStorage::new(tmp.path()));
    let (manager, phrase) = service.setup().unwrap();
    service.save_manager(manager).unwrap();
    let envelope = service.encrypt("Renew passport").unwrap();

    std::fs::remove_file(service.storage().key_path()).unwrap();
    service.invalidate();
    assert!(matches!(
        service.decrypt(&envelope),
        Err(SecretsError::KeyNotFound(_))
    ));

    // user types the phrase back in, sloppily
    let typed = phrase.to_uppercase().replace(' ', "   ");
    let recovered = service.recover(&typed).unwrap();
    service.save_manager(recovered).unwrap();

    assert_eq!(service.decrypt(&envelope).unwrap(), "Renew passport");
}

#[test]
fn wrong_phrase_is_distinct_from_tampered_data() {
    let tmp = TempDir::new().unwrap();
    let service = EncryptionService::new(KeyStorage::new(tmp.path()));
    let (manager, _) = service.setup().unwrap();
    service.save_manager(manager).unwrap();

    let (_, other_phrase) = service.rotate_key().unwrap();
    let mut words: Vec<String> = other_phrase.split_whitespace().map(String::from).collect();
    words.truncate(23);
    assert!(matches!(
        service.recover(&words.join(" ")),
        Err(SecretsError::InvalidRecoveryPhrase(_))
    ));

    let mut envelope = service.encrypt("Quarterly taxes").unwrap();
    envelope.auth_tag = envelope.auth_tag.chars().rev().collect();
    match service.decrypt(&envelope) {
        Err(SecretsError::Crypto(e)) => assert_eq!(e.to_string(), "decryption failed"),
        other => panic!("expected a decryption failure, got {other:?}"),
    }
}

#[test]
fn shared_service_across_threads() {
    let tmp = TempDir::new().unwrap();
    let service = Arc::new(EncryptionService::new(KeyStorage::new(tmp.path())));
    let (manager, _) = service.setup().unwrap();
    service.save_manager(manager).unwrap();
    service.invalidate();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                let text = format!("task #{i}");
                let envelope = service.encrypt(&text).unwrap();
                assert_eq!(service.decrypt(&envelope).unwrap(), text);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
