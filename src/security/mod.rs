//! Password hashing and session tokens
//!
//! Argon2id over peppered passwords. The pepper is a random 32-byte
//! secret kept base64-encoded in the data directory; password hashes are
//! useless without it, and it survives restarts so old hashes keep
//! verifying. Session tokens are plain random hex, looked up in the
//! in-memory session map.

use crate::error::{AppError, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use rand::RngCore;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

const PEPPER_FILE: &str = "pepper.dat";
const PEPPER_LEN: usize = 32;
const TOKEN_LEN: usize = 32;

// OWASP-recommended Argon2id cost: 19 MiB, 2 iterations, 1 lane
const ARGON2_M_COST: u32 = 19_456;
const ARGON2_T_COST: u32 = 2;
const ARGON2_P_COST: u32 = 1;

/// Password hashing and token generation, one instance per process
pub struct SecurityManager {
    pepper: Vec<u8>,
}

impl SecurityManager {
    /// Load the pepper from the data directory, creating it on first run
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        let pepper = Self::load_or_create_pepper(&data_dir)?;
        Ok(Self { pepper })
    }

    /// Manager with a throwaway pepper, for tests
    pub fn new_ephemeral() -> Self {
        Self {
            pepper: random_bytes(PEPPER_LEN),
        }
    }

    fn load_or_create_pepper(data_dir: &Path) -> Result<Vec<u8>> {
        let path = data_dir.join(PEPPER_FILE);
        let b64 = base64::engine::general_purpose::STANDARD;

        if path.exists() {
            let encoded = fs::read_to_string(&path)
                .map_err(|e| AppError::Config(format!("Failed to read pepper file: {}", e)))?;
            let pepper = b64
                .decode(encoded.trim())
                .map_err(|e| AppError::Config(format!("Invalid pepper file: {}", e)))?;
            if pepper.len() != PEPPER_LEN {
                return Err(AppError::Config("Invalid pepper length".to_string()));
            }
            return Ok(pepper);
        }

        let pepper = random_bytes(PEPPER_LEN);
        fs::create_dir_all(data_dir)
            .map_err(|e| AppError::Config(format!("Failed to create data dir: {}", e)))?;
        fs::write(&path, b64.encode(&pepper))
            .map_err(|e| AppError::Config(format!("Failed to write pepper file: {}", e)))?;

        tracing::info!("Generated new pepper at {:?}", path);

        Ok(pepper)
    }

    /// Hash a password for storage
    pub fn hash_password(&self, password: &str) -> Result<String> {
        let params = Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, None)
            .map_err(|e| AppError::Internal(format!("Invalid Argon2 params: {}", e)))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let salt = SaltString::generate(&mut rand::thread_rng());
        let hash = argon2
            .hash_password(self.peppered(password).as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        Ok(hash.to_string())
    }

    /// Verify a password against a stored hash
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash format: {}", e)))?;

        // Cost parameters ride along inside the hash string
        match Argon2::default().verify_password(self.peppered(password).as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::Internal(format!(
                "Password verification failed: {}",
                e
            ))),
        }
    }

    fn peppered(&self, password: &str) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.pepper);
        format!("{}{}", password, encoded)
    }

    /// Random 64-character hex bearer token
    pub fn generate_session_token(&self) -> String {
        hex::encode(random_bytes(TOKEN_LEN))
    }
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}
