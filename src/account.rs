//! Accounts on the client side.

use prost::Message;

use chain_tube_types::proto::tx::{AuthInfo, Fee, SignDoc, SignerInfo, TxBody, TxRaw};
use chain_tube_types::{Any, Coin, Secp256k1Key};

use crate::runner::error::EncodeError;

pub const DEFAULT_GAS_ADJUSTMENT: f64 = 1.3;

pub trait Account {
    fn address(&self) -> String;
}

/// How a [`SigningAccount`] pays for its transactions.
#[derive(Debug, Clone, PartialEq)]
pub enum FeeSetting {
    /// Simulate first; the gas limit is the simulated gas times
    /// `gas_adjustment` and each unit costs `gas_price`.
    Auto { gas_price: Coin, gas_adjustment: f64 },
    Custom { amount: Coin, gas_limit: u64 },
}

impl FeeSetting {
    pub fn auto(denom: &str) -> Self {
        FeeSetting::Auto {
            gas_price: Coin::new(0, denom),
            gas_adjustment: DEFAULT_GAS_ADJUSTMENT,
        }
    }

    /// Fee for a transaction that simulated to `gas_used`.
    pub fn fee_for(&self, gas_used: u64) -> Result<Fee, EncodeError> {
        match self {
            FeeSetting::Auto {
                gas_price,
                gas_adjustment,
            } => {
                let gas_limit = (gas_used as f64 * gas_adjustment).ceil() as u64;
                let amount = parse_amount(gas_price)?.saturating_mul(u128::from(gas_limit));
                Ok(fee(amount, &gas_price.denom, gas_limit))
            }
            FeeSetting::Custom { amount, gas_limit } => {
                Ok(fee(parse_amount(amount)?, &amount.denom, *gas_limit))
            }
        }
    }
}

fn parse_amount(coin: &Coin) -> Result<u128, EncodeError> {
    coin.amount
        .parse()
        .map_err(|_| EncodeError::InvalidFee(format!("{}{}", coin.amount, coin.denom)))
}

fn fee(amount: u128, denom: &str, gas_limit: u64) -> Fee {
    // Zero coins are not valid fee amounts.
    let amount = if amount == 0 {
        vec![]
    } else {
        vec![Coin::new(amount, denom)]
    };
    Fee {
        amount,
        gas_limit,
        payer: String::new(),
        granter: String::new(),
    }
}

/// An account whose address is known but whose key is not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonSigningAccount {
    address: String,
}

impl From<String> for NonSigningAccount {
    fn from(address: String) -> Self {
        Self { address }
    }
}

impl Account for NonSigningAccount {
    fn address(&self) -> String {
        self.address.clone()
    }
}

/// A funded account that signs its own transactions.
#[derive(Debug, Clone)]
pub struct SigningAccount {
    key: Secp256k1Key,
    address: String,
    fee_setting: FeeSetting,
}

impl SigningAccount {
    pub fn new(key: Secp256k1Key, address_prefix: &str, fee_setting: FeeSetting) -> Self {
        let address = key.address().to_bech32(address_prefix);
        Self {
            key,
            address,
            fee_setting,
        }
    }

    pub fn key(&self) -> &Secp256k1Key {
        &self.key
    }

    pub fn fee_setting(&self) -> &FeeSetting {
        &self.fee_setting
    }

    pub fn with_fee_setting(self, fee_setting: FeeSetting) -> Self {
        Self {
            fee_setting,
            ..self
        }
    }

    /// Build and sign a transaction in direct sign mode.
    pub fn sign_tx(
        &self,
        messages: Vec<Any>,
        fee: Fee,
        chain_id: &str,
        account_number: u64,
        sequence: u64,
    ) -> Vec<u8> {
        let body = TxBody {
            messages,
            memo: String::new(),
            timeout_height: 0,
        };
        let auth_info = AuthInfo {
            signer_infos: vec![SignerInfo {
                public_key: Some(self.key.public_key_any()),
                sequence,
            }],
            fee: Some(fee),
        };
        let sign_doc = SignDoc {
            body_bytes: body.encode_to_vec(),
            auth_info_bytes: auth_info.encode_to_vec(),
            chain_id: chain_id.to_string(),
            account_number,
        };
        let signature = self.key.sign(&sign_doc.encode_to_vec());
        TxRaw {
            body_bytes: sign_doc.body_bytes,
            auth_info_bytes: sign_doc.auth_info_bytes,
            signatures: vec![signature],
        }
        .encode_to_vec()
    }
}

impl Account for SigningAccount {
    fn address(&self) -> String {
        self.address.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_fee_scales_gas() {
        let setting = FeeSetting::Auto {
            gas_price: Coin::new(2, "ucore"),
            gas_adjustment: 1.5,
        };
        let fee = setting.fee_for(1_000).unwrap();
        assert_eq!(fee.gas_limit, 1_500);
        assert_eq!(fee.amount, vec![Coin::new(3_000, "ucore")]);
    }

    #[test]
    fn test_zero_price_pays_nothing() {
        let fee = FeeSetting::auto("ucore").fee_for(10_000).unwrap();
        assert_eq!(fee.gas_limit, 13_000);
        assert!(fee.amount.is_empty());
    }

    #[test]
    fn test_malformed_fee_amount_is_an_error() {
        let custom = FeeSetting::Custom {
            amount: Coin {
                denom: "ucore".to_string(),
                amount: "1.5".to_string(),
            },
            gas_limit: 200_000,
        };
        assert_eq!(
            custom.fee_for(0),
            Err(EncodeError::InvalidFee("1.5ucore".to_string()))
        );

        let auto = FeeSetting::Auto {
            gas_price: Coin {
                denom: "ucore".to_string(),
                amount: "cheap".to_string(),
            },
            gas_adjustment: DEFAULT_GAS_ADJUSTMENT,
        };
        assert!(matches!(auto.fee_for(1_000), Err(EncodeError::InvalidFee(_))));
    }

    #[test]
    fn test_signed_tx_carries_one_signature() {
        let account = SigningAccount::new(Secp256k1Key::generate(), "core", FeeSetting::auto("ucore"));
        assert!(account.address().starts_with("core1"));
        let bytes = account.sign_tx(vec![], fee(0, "ucore", 100), "chain-1", 7, 3);
        let raw = TxRaw::decode(bytes.as_slice()).unwrap();
        assert_eq!(raw.signatures.len(), 1);
        let auth_info = AuthInfo::decode(raw.auth_info_bytes.as_slice()).unwrap();
        assert_eq!(auth_info.signer_infos[0].sequence, 3);
    }
}
