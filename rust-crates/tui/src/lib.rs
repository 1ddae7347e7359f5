pub use generated_abi::{
    abi_digest,
    contract_instance,
    rps_types,
};

pub mod fuel;
pub mod reconciler;
pub mod wallets;
