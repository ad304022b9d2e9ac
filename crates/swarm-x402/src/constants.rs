use alloy::primitives::Address;

/// Header (`X-PAYMENT`) carrying the serialized [`AuthorizationToken`](crate::AuthorizationToken) on retry.
pub const PAYMENT_HEADER: &str = "x-payment";

/// Header (`X-Payment-Requirements`) a 402 response may use to carry its payment terms as a JSON document.
pub const REQUIREMENTS_HEADER: &str = "x-payment-requirements";

/// Optional receipt header (`X-Payment-Receipt`) returned by a resource server after a paid request.
pub const RECEIPT_HEADER: &str = "x-payment-receipt";

/// Body field holding payment terms in the alternate (body-carried) convention.
pub const REQUIREMENTS_BODY_FIELD: &str = "paymentRequirements";

/// EIP-712 domain name for payment authorizations.
pub const EIP712_DOMAIN_NAME: &str = "x402";

/// EIP-712 domain version for payment authorizations.
pub const EIP712_DOMAIN_VERSION: &str = "1";

/// Canonical stable-asset symbol resolved through the network registry.
pub const STABLE_ASSET_SYMBOL: &str = "USDC";

/// Network used when a demand or the configuration names none.
pub const DEFAULT_NETWORK: &str = "polygon";

/// Default number of requests the handshake may issue before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Validity window applied when a demand carries no expiry.
pub const DEFAULT_EXPIRY_SECS: u64 = 3600;

/// Verifying-contract sentinel used when no address can be derived.
pub const NULL_ADDRESS: Address = Address::ZERO;
