#![allow(dead_code)]

use bitcoin::{Amount, OutPoint, Txid};
use bitvault_spend::logging::{self, LogConfig};
use bitvault_spend::utxo_selection::UnspentOutput;
use lazy_static::lazy_static;
use std::str::FromStr;
use std::sync::Once;

pub const ADDRESS: &str = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx";

// Initialize logging once
static INIT: Once = Once::new();

lazy_static! {
    pub static ref FUNDING_TXID: Txid =
        Txid::from_str("9dcbf5a86b4e70be97fc5c953ad4111dfe0a94ea6768286e5efd6c35fd9ec9d1")
            .unwrap();
    pub static ref SECOND_TXID: Txid =
        Txid::from_str("3d7c1421a4732a250ee59ce08b2ae34b5de8d3242e266a81a3d09887b8ca2e7c")
            .unwrap();
}

/// Quiet logging for integration tests
pub fn setup() {
    INIT.call_once(|| {
        let _ = logging::init(&LogConfig::quiet());
    });
}

/// Txid whose hex form is `n` zero-padded to 64 digits
pub fn txid(n: u64) -> Txid {
    Txid::from_str(&format!("{:064x}", n)).unwrap()
}

pub fn utxo(vout: u32, sats: u64, height: u32) -> UnspentOutput {
    UnspentOutput::new(OutPoint::new(*FUNDING_TXID, vout), Amount::from_sat(sats), height).unwrap()
}
