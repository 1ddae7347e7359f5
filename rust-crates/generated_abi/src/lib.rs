use fuels::{
    accounts::wallet::Wallet,
    types::ContractId,
};
use sha2::{
    Digest,
    Sha256,
};

pub mod rps_types {
    use fuels::macros::abigen;

    abigen!(Contract(
        name = "RockPaperScissors",
        abi = "rust-crates/generated_abi/abi/rock-paper-scissors-abi.json"
    ));
}

/// ABI the bindings in [`rps_types`] were generated from.
pub const RPS_ABI_JSON: &str = include_str!("../abi/rock-paper-scissors-abi.json");

/// Hex sha256 of [`RPS_ABI_JSON`]. Deployment records carry the digest of the
/// ABI the deployed program was built with; the two must agree before a
/// session is handed out.
pub fn abi_digest() -> String {
    let mut hasher = Sha256::new();
    hasher.update(RPS_ABI_JSON.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn contract_instance(
    id: ContractId,
    wallet: Wallet,
) -> rps_types::RockPaperScissors<Wallet> {
    rps_types::RockPaperScissors::new(id, wallet)
}
