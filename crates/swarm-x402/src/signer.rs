use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use crate::demand::unix_now;
use crate::eip712::{
    decode_signature_hex, encode_signature_hex, payment_domain, recover_signer, signing_hash,
    VerifyingContract,
};
use crate::{network, AuthorizationToken, Payment, PaymentDemand, PaymentSigner, X402Error};

/// Signs payment demands as EIP-712 `Payment` structs with a local key.
///
/// Use this with [`X402Client`](crate::X402Client) to make paid requests.
pub struct TypedDataSigner {
    signer: PrivateKeySigner,
    verifying_contract: VerifyingContract,
}

impl TypedDataSigner {
    /// Create a signer using the facilitator-suffix verifying-contract heuristic.
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self {
            signer,
            verifying_contract: VerifyingContract::default(),
        }
    }

    /// Create a signer with an explicit verifying-contract strategy.
    pub fn with_verifying_contract(
        signer: PrivateKeySigner,
        verifying_contract: VerifyingContract,
    ) -> Self {
        Self {
            signer,
            verifying_contract,
        }
    }

    /// Get the address of the signer.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn verifying_contract(&self) -> VerifyingContract {
        self.verifying_contract
    }
}

impl std::fmt::Debug for TypedDataSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedDataSigner")
            .field("address", &self.signer.address())
            .field("verifying_contract", &self.verifying_contract)
            .finish()
    }
}

/// Build the typed `Payment` struct for a demand.
///
/// The asset is resolved through the network registry, so `USDC` becomes the
/// network's contract address.
pub fn typed_payment(demand: &PaymentDemand) -> Result<Payment, X402Error> {
    let amount = parse_uint("amount", &demand.amount)?;
    let nonce = parse_uint("nonce", &demand.nonce)?;

    let pay_to: Address = demand
        .pay_to
        .parse()
        .map_err(|_| X402Error::invalid_field("payTo", &demand.pay_to))?;

    let asset_address = network::asset_address(&demand.asset, &demand.network);
    let asset: Address = asset_address
        .parse()
        .map_err(|_| X402Error::invalid_field("asset", asset_address))?;

    Ok(Payment {
        payTo: pay_to,
        amount,
        asset,
        nonce,
        expiry: U256::from(demand.expiry),
        resourceUrl: demand.resource_url.clone(),
    })
}

fn parse_uint(field: &'static str, raw: &str) -> Result<U256, X402Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') {
        return Err(X402Error::invalid_field(field, raw));
    }
    trimmed
        .parse::<U256>()
        .map_err(|_| X402Error::invalid_field(field, raw))
}

/// Recover the address that produced `token` for `demand`.
pub fn recover_payer(
    token: &AuthorizationToken,
    demand: &PaymentDemand,
    verifying_contract: VerifyingContract,
) -> Result<Address, X402Error> {
    let payment = typed_payment(demand)?;
    let domain = payment_domain(
        &demand.network,
        verifying_contract.resolve(&demand.facilitator),
    );
    let bytes = decode_signature_hex(&token.signature)?;
    recover_signer(&payment, &domain, &bytes)
}

impl PaymentSigner for TypedDataSigner {
    fn authorize(&self, demand: &PaymentDemand) -> Result<AuthorizationToken, X402Error> {
        let payment = typed_payment(demand)?;

        let now = unix_now().as_secs();
        if demand.expiry <= now {
            tracing::warn!(
                expiry = demand.expiry,
                now,
                "signing a demand whose expiry is not in the future"
            );
        }

        let domain = payment_domain(
            &demand.network,
            self.verifying_contract.resolve(&demand.facilitator),
        );
        let sig = self
            .signer
            .sign_hash_sync(&signing_hash(&payment, &domain))
            .map_err(|e| X402Error::SignatureError(format!("signing failed: {e}")))?;

        Ok(AuthorizationToken {
            signature: encode_signature_hex(&sig),
            payer: self.signer.address(),
            pay_to: demand.pay_to.clone(),
            amount: demand.amount.clone(),
            asset: demand.asset.clone(),
            network: demand.network.clone(),
            nonce: demand.nonce.clone(),
            expiry: demand.expiry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Hardhat account #0, publicly documented test key.
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn test_signer() -> TypedDataSigner {
        TypedDataSigner::new(TEST_KEY.parse().unwrap())
    }

    fn sample_demand() -> PaymentDemand {
        PaymentDemand {
            pay_to: "0x1111111111111111111111111111111111111111".to_string(),
            amount: "1000".to_string(),
            asset: "USDC".to_string(),
            network: "base".to_string(),
            facilitator: String::new(),
            nonce: "12345".to_string(),
            expiry: 4_000_000_000,
            resource_url: "https://api.example.com/data".to_string(),
            method: "GET".to_string(),
        }
    }

    #[test]
    fn test_token_echoes_demand() {
        let signer = test_signer();
        let demand = sample_demand();
        let token = signer.authorize(&demand).unwrap();

        assert_eq!(token.payer, signer.address());
        assert!(token.matches(&demand));
        assert_eq!(token.asset, "USDC");
        assert!(token.signature.starts_with("0x"));
        assert_eq!(token.signature.len(), 132); // 0x + 130 hex chars
    }

    #[test]
    fn test_signing_is_deterministic() {
        let demand = sample_demand();
        let first = test_signer().authorize(&demand).unwrap();
        let second = test_signer().authorize(&demand).unwrap();
        assert_eq!(first.signature, second.signature);
    }

    #[test]
    fn test_signature_changes_with_nonce() {
        let signer = test_signer();
        let demand = sample_demand();
        let mut other = demand.clone();
        other.nonce = "12346".to_string();
        assert_ne!(
            signer.authorize(&demand).unwrap().signature,
            signer.authorize(&other).unwrap().signature
        );
    }

    #[test]
    fn test_recover_payer() {
        let signer = test_signer();
        let demand = sample_demand();
        let token = signer.authorize(&demand).unwrap();
        let payer = recover_payer(&token, &demand, VerifyingContract::default()).unwrap();
        assert_eq!(payer, signer.address());
    }

    #[test]
    fn test_verifying_contract_changes_signature() {
        let key: PrivateKeySigner = TEST_KEY.parse().unwrap();
        let pinned = TypedDataSigner::with_verifying_contract(
            key,
            VerifyingContract::Fixed(Address::repeat_byte(0x44)),
        );
        let demand = sample_demand();
        assert_ne!(
            pinned.authorize(&demand).unwrap().signature,
            test_signer().authorize(&demand).unwrap().signature
        );
    }

    #[test]
    fn test_asset_resolved_through_registry() {
        let payment = typed_payment(&sample_demand()).unwrap();
        assert_eq!(
            payment.asset,
            "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"
                .parse::<Address>()
                .unwrap()
        );
    }

    #[test]
    fn test_invalid_amount_rejected() {
        for bad in ["", "-5", "1.5", "ten"] {
            let mut demand = sample_demand();
            demand.amount = bad.to_string();
            assert!(matches!(
                test_signer().authorize(&demand),
                Err(X402Error::InvalidDemandField { field: "amount", .. })
            ));
        }
    }

    #[test]
    fn test_invalid_nonce_rejected() {
        let mut demand = sample_demand();
        demand.nonce = "abc".to_string();
        assert!(matches!(
            test_signer().authorize(&demand),
            Err(X402Error::InvalidDemandField { field: "nonce", .. })
        ));
    }

    #[test]
    fn test_unresolvable_asset_rejected() {
        let mut demand = sample_demand();
        demand.asset = "EURC".to_string();
        assert!(matches!(
            test_signer().authorize(&demand),
            Err(X402Error::InvalidDemandField { field: "asset", .. })
        ));
    }

    #[test]
    fn test_expired_demand_still_signs() {
        let mut demand = sample_demand();
        demand.expiry = 1;
        assert!(test_signer().authorize(&demand).is_ok());
    }
}
