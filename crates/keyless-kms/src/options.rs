//! Per-call options for signing and verification
//!
//! Options are applied in order. The call context accumulates: every
//! context applied tightens the deadline and adds its cancellation source.
//! The digest and the hash function are last-wins.

use keyless_types::{CallContext, HashFunction};

/// A single signing option
#[derive(Debug, Clone)]
pub enum SignOption {
    /// Bound the call with a deadline or cancellation source
    Context(CallContext),
    /// Sign this digest instead of hashing a message
    Digest(Vec<u8>),
    /// Hash with this function instead of the key's default
    HashFunction(HashFunction),
}

/// A single verification option
#[derive(Debug, Clone)]
pub enum VerifyOption {
    /// Bound the call with a deadline or cancellation source
    Context(CallContext),
    /// Verify against this digest instead of hashing a message
    Digest(Vec<u8>),
    /// Hash with this function instead of the key's default
    HashFunction(HashFunction),
    /// Let the backend check the signature instead of the cached public key
    RemoteVerification(bool),
}

/// Resolved signing options
#[derive(Debug, Clone, Default)]
pub struct SignOptions {
    context: CallContext,
    digest: Option<Vec<u8>>,
    hash_function: Option<HashFunction>,
}

impl SignOptions {
    /// No options: background context, key default hash
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `options` in order
    pub fn from_options(options: impl IntoIterator<Item = SignOption>) -> Self {
        options.into_iter().fold(Self::new(), Self::apply)
    }

    /// Apply one option
    pub fn apply(self, option: SignOption) -> Self {
        match option {
            SignOption::Context(ctx) => self.with_context(ctx),
            SignOption::Digest(digest) => self.with_digest(digest),
            SignOption::HashFunction(function) => self.with_hash_function(function),
        }
    }

    /// Merge `ctx` into the call context
    pub fn with_context(mut self, ctx: CallContext) -> Self {
        self.context = self.context.merge(&ctx);
        self
    }

    /// Use a precomputed digest
    pub fn with_digest(mut self, digest: Vec<u8>) -> Self {
        self.digest = Some(digest);
        self
    }

    /// Override the hash function
    pub fn with_hash_function(mut self, function: HashFunction) -> Self {
        self.hash_function = Some(function);
        self
    }

    /// The accumulated call context
    pub fn context(&self) -> &CallContext {
        &self.context
    }

    /// The precomputed digest; an empty digest counts as none
    pub fn digest(&self) -> Option<&[u8]> {
        self.digest.as_deref().filter(|d| !d.is_empty())
    }

    /// The hash override, if any
    pub fn hash_function(&self) -> Option<HashFunction> {
        self.hash_function
    }
}

/// Resolved verification options
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    base: SignOptions,
    remote_verification: bool,
}

impl VerifyOptions {
    /// No options: local verification, background context
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `options` in order
    pub fn from_options(options: impl IntoIterator<Item = VerifyOption>) -> Self {
        options.into_iter().fold(Self::new(), Self::apply)
    }

    /// Apply one option
    pub fn apply(self, option: VerifyOption) -> Self {
        match option {
            VerifyOption::Context(ctx) => self.with_context(ctx),
            VerifyOption::Digest(digest) => self.with_digest(digest),
            VerifyOption::HashFunction(function) => self.with_hash_function(function),
            VerifyOption::RemoteVerification(remote) => self.with_remote_verification(remote),
        }
    }

    /// Merge `ctx` into the call context
    pub fn with_context(mut self, ctx: CallContext) -> Self {
        self.base = self.base.with_context(ctx);
        self
    }

    /// Use a precomputed digest
    pub fn with_digest(mut self, digest: Vec<u8>) -> Self {
        self.base = self.base.with_digest(digest);
        self
    }

    /// Override the hash function
    pub fn with_hash_function(mut self, function: HashFunction) -> Self {
        self.base = self.base.with_hash_function(function);
        self
    }

    /// Choose remote or local verification
    pub fn with_remote_verification(mut self, remote: bool) -> Self {
        self.remote_verification = remote;
        self
    }

    /// The accumulated call context
    pub fn context(&self) -> &CallContext {
        self.base.context()
    }

    /// The precomputed digest; an empty digest counts as none
    pub fn digest(&self) -> Option<&[u8]> {
        self.base.digest()
    }

    /// The hash override, if any
    pub fn hash_function(&self) -> Option<HashFunction> {
        self.base.hash_function()
    }

    /// Whether the backend should do the check
    pub fn remote_verification(&self) -> bool {
        self.remote_verification
    }
}

impl From<SignOptions> for VerifyOptions {
    fn from(base: SignOptions) -> Self {
        Self {
            base,
            remote_verification: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_later_digest_wins() {
        let opts = SignOptions::from_options([
            SignOption::Digest(vec![1; 32]),
            SignOption::Digest(vec![2; 32]),
        ]);
        assert_eq!(opts.digest(), Some(&[2u8; 32][..]));
    }

    #[test]
    fn test_later_hash_function_wins() {
        let opts = VerifyOptions::from_options([
            VerifyOption::HashFunction(HashFunction::Sha384),
            VerifyOption::RemoteVerification(true),
            VerifyOption::HashFunction(HashFunction::Sha512),
        ]);
        assert_eq!(opts.hash_function(), Some(HashFunction::Sha512));
        assert!(opts.remote_verification());
    }

    #[test]
    fn test_empty_digest_is_absent() {
        let opts = SignOptions::new().with_digest(Vec::new());
        assert_eq!(opts.digest(), None);
    }

    #[tokio::test]
    async fn test_contexts_accumulate() {
        let token = CancellationToken::new();
        let opts = SignOptions::from_options([
            SignOption::Context(CallContext::with_cancellation(token.clone())),
            SignOption::Context(CallContext::with_timeout(Duration::from_secs(3600))),
        ]);

        // the deadline from the second context survives
        assert!(opts.context().current_deadline().is_some());
        assert!(opts.context().check().is_ok());

        // and so does the cancellation source from the first
        token.cancel();
        assert!(opts.context().check().is_err());
    }
}
