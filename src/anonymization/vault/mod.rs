//! Identifier vault
//!
//! The vault maps a normalized raw identifier plus its entity label to exactly
//! one replacement for the lifetime of a run. It is the only mutable state
//! shared between pipeline workers.
//!
//! Two replacement kinds exist:
//! - **Hash labels** (default `EMAIL`): lowercase hex SHA-256 of
//!   `salt || normalized identifier`. Deterministic across rows and runs that
//!   share the salt, which keeps the column joinable. Anyone holding the salt
//!   can confirm a guessed identifier against the hash set, so the salt must
//!   never be published next to the output.
//! - **Token labels** (everything else): `PREFIX` + random fixed-width digits,
//!   minted on first sight and cached. Tokens are unique across identifiers.
//!
//! # Example
//!
//! ```
//! use shroud::anonymization::vault::{IdentifierVault, VaultSettings};
//! use shroud::config::secret_string;
//! use shroud::domain::EntityLabel;
//!
//! let vault = IdentifierVault::new(secret_string("s1".into()), VaultSettings::default())?;
//! let person = EntityLabel::new("PERSON").unwrap();
//!
//! let first = vault.resolve("John Smith", &person)?;
//! let again = vault.resolve("  john smith ", &person)?;
//! assert_eq!(first, again);
//! # Ok::<(), shroud::domain::ShroudError>(())
//! ```

pub mod hashing;
pub mod tokenization;

use crate::config::SecretString;
use crate::domain::{EntityLabel, Result, ShroudError};
use hashing::salted_hash;
use secrecy::ExposeSecret;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::RwLock;
use tokenization::{TokenGenerator, MAX_SUFFIX_WIDTH};

/// Vault construction settings
#[derive(Debug, Clone)]
pub struct VaultSettings {
    /// Labels replaced by salted hash instead of a token
    pub hash_labels: BTreeSet<EntityLabel>,
    /// Token prefix per label; unlisted labels use the label itself
    pub token_prefixes: BTreeMap<EntityLabel, String>,
    /// Number of random digits after the prefix
    pub token_suffix_width: usize,
    /// Seed for reproducible token assignment
    pub token_seed: Option<u64>,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            hash_labels: [EntityLabel::known(EntityLabel::EMAIL)].into_iter().collect(),
            token_prefixes: [
                (EntityLabel::known(EntityLabel::PERSON), "CUST".to_string()),
                (EntityLabel::known(EntityLabel::PHONE), "PHONE".to_string()),
                (EntityLabel::known(EntityLabel::ADDRESS), "ADDR".to_string()),
            ]
            .into_iter()
            .collect(),
            token_suffix_width: 6,
            token_seed: None,
        }
    }
}

/// One vault mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PseudonymEntry {
    /// Normalized raw identifier
    pub raw_identifier: String,
    /// Entity label
    pub label: EntityLabel,
    /// Token or hash
    pub replacement: String,
}

struct VaultState {
    entries: HashMap<(EntityLabel, String), PseudonymEntry>,
    issued_tokens: HashSet<String>,
    tokens_per_prefix: HashMap<String, u64>,
    generator: TokenGenerator,
}

impl VaultState {
    fn issue_token(&mut self, label: &EntityLabel) -> Result<String> {
        let prefix = self.generator.prefix_for(label).to_string();
        let issued = self.tokens_per_prefix.get(&prefix).copied().unwrap_or(0);
        if issued >= self.generator.capacity() {
            return Err(ShroudError::Vault(format!(
                "Token space for prefix '{prefix}' is exhausted after {issued} tokens; increase token_suffix_width"
            )));
        }

        let token = loop {
            let candidate = self.generator.generate(label);
            if self.issued_tokens.insert(candidate.clone()) {
                break candidate;
            }
            tracing::trace!(label = %label, "Token collision, regenerating");
        };
        *self.tokens_per_prefix.entry(prefix).or_insert(0) += 1;
        Ok(token)
    }
}

/// Run-scoped identifier to pseudonym mapping
pub struct IdentifierVault {
    salt: SecretString,
    hash_labels: BTreeSet<EntityLabel>,
    state: RwLock<VaultState>,
}

impl IdentifierVault {
    /// Create an empty vault
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the salt is blank or the suffix width
    /// is outside `1..=18`.
    pub fn new(salt: SecretString, settings: VaultSettings) -> Result<Self> {
        if salt.expose_secret().is_blank() {
            return Err(ShroudError::Configuration(
                "A non-empty salt is required for identifier hashing".to_string(),
            ));
        }
        if !(1..=MAX_SUFFIX_WIDTH).contains(&settings.token_suffix_width) {
            return Err(ShroudError::Configuration(format!(
                "token_suffix_width must be between 1 and {MAX_SUFFIX_WIDTH}, got {}",
                settings.token_suffix_width
            )));
        }

        let generator = TokenGenerator::new(
            settings.token_prefixes,
            settings.token_suffix_width,
            settings.token_seed,
        );

        Ok(Self {
            salt,
            hash_labels: settings.hash_labels,
            state: RwLock::new(VaultState {
                entries: HashMap::new(),
                issued_tokens: HashSet::new(),
                tokens_per_prefix: HashMap::new(),
                generator,
            }),
        })
    }

    /// Normalize a raw identifier for lookup: trim, collapse inner whitespace, case-fold
    pub fn normalize(raw_identifier: &str) -> String {
        raw_identifier
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// Salted digest of a normalized identifier, for audit entries
    ///
    /// Without the salt the digest cannot be matched against a dictionary of
    /// candidate identifiers.
    pub fn fingerprint(&self, raw_identifier: &str) -> String {
        salted_hash(
            self.salt.expose_secret().as_ref(),
            &Self::normalize(raw_identifier),
        )
    }

    /// Check whether a label is replaced by salted hash
    pub fn is_hash_label(&self, label: &EntityLabel) -> bool {
        self.hash_labels.contains(label)
    }

    /// Resolve an identifier to its replacement, creating it on first sight
    ///
    /// Lookups of known identifiers only take the shared lock. Creation
    /// re-checks under the exclusive lock, so concurrent first sightings of
    /// the same identifier still agree on one replacement.
    pub fn resolve(&self, raw_identifier: &str, label: &EntityLabel) -> Result<String> {
        let key = (label.clone(), Self::normalize(raw_identifier));

        {
            let state = self.state.read().map_err(|_| poisoned())?;
            if let Some(entry) = state.entries.get(&key) {
                return Ok(entry.replacement.clone());
            }
        }

        let mut state = self.state.write().map_err(|_| poisoned())?;
        if let Some(entry) = state.entries.get(&key) {
            return Ok(entry.replacement.clone());
        }

        let replacement = if self.is_hash_label(label) {
            salted_hash(self.salt.expose_secret().as_ref(), &key.1)
        } else {
            state.issue_token(label)?
        };

        tracing::debug!(label = %label, "New vault entry");
        let entry = PseudonymEntry {
            raw_identifier: key.1.clone(),
            label: label.clone(),
            replacement: replacement.clone(),
        };
        state.entries.insert(key, entry);
        Ok(replacement)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.entries.len()).unwrap_or(0)
    }

    /// Check if the vault has no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry count per label
    pub fn stats(&self) -> BTreeMap<EntityLabel, usize> {
        let mut stats = BTreeMap::new();
        if let Ok(state) = self.state.read() {
            for (label, _) in state.entries.keys() {
                *stats.entry(label.clone()).or_insert(0) += 1;
            }
        }
        stats
    }
}

fn poisoned() -> ShroudError {
    ShroudError::Vault("Vault lock poisoned by a panicked worker".to_string())
}
