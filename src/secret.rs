//! Encrypted password storage in the `[secret]` config table
//!
//! The table holds a random per-installation AES-256-GCM key under [`SECRET_KEY_ENTRY`]
//! and one encrypted password per system name, all base64 encoded. Ciphertexts carry
//! their 12 byte nonce as a prefix.

use crate::error::SecretError;
use crate::models::{Catalog, SystemDefinition, fold_lower};
use crate::rfc::Credential;
use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use ring::aead::{self, AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Entry name of the installation key
pub const SECRET_KEY_ENTRY: &str = "secretkey";

/// AES-256 key length in bytes
pub const KEY_LEN: usize = 32;

/// The installation key
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey([u8; KEY_LEN]);

impl SecretKey {
    /// Create a fresh random key
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SecretError> {
        let bytes: [u8; KEY_LEN] =
            bytes
                .try_into()
                .map_err(|_| SecretError::InvalidKeyLength {
                    expected: KEY_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(bytes))
    }

    /// Decode the key from its base64 table entry
    pub fn from_base64(encoded: &str) -> Result<Self, SecretError> {
        let bytes = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| SecretError::Encoding {
                entry: SECRET_KEY_ENTRY.to_string(),
            })?;
        Self::from_bytes(&bytes)
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.0)
    }

    fn aead_key(&self) -> Result<LessSafeKey, SecretError> {
        let unbound = UnboundKey::new(&AES_256_GCM, &self.0).map_err(|_| {
            SecretError::InvalidKeyLength {
                expected: KEY_LEN,
                actual: self.0.len(),
            }
        })?;
        Ok(LessSafeKey::new(unbound))
    }

    /// Encrypt `plaintext`, returning nonce + ciphertext + tag
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, SecretError> {
        let key = self.aead_key()?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        SystemRandom::new()
            .fill(&mut nonce_bytes)
            .map_err(|_| SecretError::Encryption)?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.to_vec();
        key.seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| SecretError::Encryption)?;

        let mut sealed = nonce_bytes.to_vec();
        sealed.extend_from_slice(&in_out);
        Ok(sealed)
    }

    /// Decrypt nonce + ciphertext + tag produced by [`SecretKey::encrypt`]
    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, SecretError> {
        if sealed.len() < NONCE_LEN + aead::AES_256_GCM.tag_len() {
            return Err(SecretError::Decryption);
        }
        let key = self.aead_key()?;

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce =
            Nonce::try_assume_unique_for_key(nonce_bytes).map_err(|_| SecretError::Decryption)?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| SecretError::Decryption)?;

        Ok(plaintext.to_vec())
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(***)")
    }
}

/// The `[secret]` table: installation key plus encrypted passwords
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretStore {
    entries: BTreeMap<String, String>,
}

impl SecretStore {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    /// Base64 entries as written to the config file
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn has_key(&self) -> bool {
        self.entries.contains_key(SECRET_KEY_ENTRY)
    }

    fn key(&self) -> Result<SecretKey, SecretError> {
        let encoded = self
            .entries
            .get(SECRET_KEY_ENTRY)
            .ok_or(SecretError::MissingKey)?;
        SecretKey::from_base64(encoded)
    }

    /// Store `password` for each of `systems`
    ///
    /// The installation key is created on first use. Every system must be configured in
    /// `catalog`; nothing is changed if one is not. Returns the normalized system names.
    pub fn add_password<S: AsRef<str>>(
        &mut self,
        catalog: &Catalog,
        systems: &[S],
        password: &str,
    ) -> Result<Vec<String>, SecretError> {
        let names: Vec<String> = systems
            .iter()
            .map(|s| fold_lower(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect();
        if let Some(unknown) = names.iter().find(|name| catalog.system(name).is_none()) {
            return Err(SecretError::UnknownSystem {
                system: unknown.clone(),
            });
        }

        let key = if self.has_key() {
            self.key()?
        } else {
            let key = SecretKey::generate();
            self.entries
                .insert(SECRET_KEY_ENTRY.to_string(), key.to_base64());
            tracing::info!("Generated new installation secret key");
            key
        };

        for name in &names {
            let sealed = key.encrypt(password.as_bytes())?;
            self.entries
                .insert(name.clone(), general_purpose::STANDARD.encode(sealed));
        }
        Ok(names)
    }

    /// Decrypt the password stored for `system`
    pub fn decrypt_password(&self, system: &str) -> Result<Credential, SecretError> {
        self.decrypt_with(&self.key()?, system)
    }

    fn decrypt_with(&self, key: &SecretKey, system: &str) -> Result<Credential, SecretError> {
        let name = fold_lower(system);
        let encoded = self
            .entries
            .get(&name)
            .ok_or_else(|| SecretError::MissingCredential {
                system: name.clone(),
            })?;
        let sealed = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| SecretError::Encoding { entry: name })?;
        let plaintext = key.decrypt(&sealed)?;
        String::from_utf8(plaintext)
            .map(Credential::new)
            .map_err(|_| SecretError::NotUtf8)
    }
}

/// Decrypted credentials, read-only during collection
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    credentials: HashMap<String, Credential>,
}

impl CredentialStore {
    /// Decrypt the password of every system
    ///
    /// Systems whose password is missing or cannot be decrypted are logged and left
    /// out of the returned system list. A missing or malformed installation key fails
    /// as a whole, unless there are no systems at all.
    pub fn resolve(
        store: &SecretStore,
        systems: &[Arc<SystemDefinition>],
    ) -> Result<(Self, Vec<Arc<SystemDefinition>>), SecretError> {
        if systems.is_empty() {
            return Ok((Self::default(), Vec::new()));
        }
        let key = store.key()?;

        let mut credentials = HashMap::with_capacity(systems.len());
        let mut usable = Vec::with_capacity(systems.len());
        for system in systems {
            match store.decrypt_with(&key, system.name()) {
                Ok(credential) => {
                    credentials.insert(system.name().to_string(), credential);
                    usable.push(Arc::clone(system));
                }
                Err(e) => {
                    tracing::warn!(
                        system = %system.name(),
                        error = %e,
                        "Excluding system without usable credential"
                    );
                }
            }
        }

        Ok((Self { credentials }, usable))
    }

    /// Build a store directly, for callers that already hold plaintext passwords
    pub fn from_credentials(credentials: impl IntoIterator<Item = (String, Credential)>) -> Self {
        Self {
            credentials: credentials
                .into_iter()
                .map(|(system, credential)| (fold_lower(&system), credential))
                .collect(),
        }
    }

    pub fn get(&self, system: &str) -> Result<&Credential, SecretError> {
        self.credentials
            .get(system)
            .ok_or_else(|| SecretError::MissingCredential {
                system: system.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}
