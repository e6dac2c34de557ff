use thiserror::Error;

/// Boxed error returned by registered message handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the kernel: inbound protocol handling, cryptography,
/// and the credential lifecycle.
///
/// Messages never include key material, plaintext, or token values.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Malformed, unsigned, or unparseable inbound request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A body or reply could not be converted between wire form and fields.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A handler returned a shape that cannot become a reply.
    #[error("invalid reply type \"{found}\"")]
    InvalidReplyType { found: String },

    #[error("could not encrypt the data: {0}")]
    EncryptFailure(String),

    #[error("could not decrypt the data: {0}")]
    DecryptFailure(String),

    /// Upstream rejected the credentials or returned no token.
    #[error("request access token failed (status {status:?}): {body}")]
    TokenIssuanceFailure { status: Option<u16>, body: String },

    /// The cache did not report a live entry right after a write.
    #[error("failed to cache access token under '{key}'")]
    CacheWriteFailure { key: String },

    #[error("missing configuration: {0}")]
    MissingConfiguration(String),

    /// Cache store I/O failure.
    #[error("cache error: {0}")]
    Cache(String),

    /// Outbound HTTP transport failure (connect, timeout, body read).
    #[error("transport error: {0}")]
    Transport(String),

    /// Failure raised inside a registered handler, passed through untouched.
    #[error(transparent)]
    Handler(HandlerError),
}

impl KernelError {
    /// Whether the failure is attributable to the inbound request (4xx class).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            KernelError::BadRequest(_)
                | KernelError::MalformedMessage(_)
                | KernelError::DecryptFailure(_)
        )
    }
}

/// Errors from TTL cache store operations (used by the trait in larkit-core).
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("invalid cached value: {0}")]
    InvalidValue(String),
}

impl From<CacheError> for KernelError {
    fn from(e: CacheError) -> Self {
        KernelError::Cache(e.to_string())
    }
}
