//! Wallet provider and game program backed by a Fuel node.

use crate::{
    reconciler::{
        Cause,
        GameProgram,
        Identity,
        Move,
        Outcome,
        ProgramInterface,
        Receipt,
        RoundRecord,
        WalletProvider,
        lock,
    },
    wallets::{
        self,
        Password,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use fuels::{
    accounts::ViewOnlyAccount,
    prelude::{
        ContractId,
        Execution,
        Provider,
        Wallet,
    },
    types::Address,
};
use generated_abi::{
    abi_digest,
    contract_instance,
    rps_types::{
        self as rps,
        RockPaperScissors,
    },
};
use std::{
    path::PathBuf,
    str::FromStr,
    sync::Mutex,
};
use tracing::{
    debug,
    info,
};

pub fn rps_interface() -> ProgramInterface {
    ProgramInterface::new(
        "rock-paper-scissors",
        ["Rock", "Paper", "Scissors"],
        ["Win", "Lose", "Draw"],
        abi_digest(),
    )
}

/// Accepts the raw hex id with or without a `fuel` prefix.
pub fn parse_contract_id(raw: &str) -> Result<ContractId> {
    let trimmed = raw.trim().trim_start_matches("fuel");
    ContractId::from_str(trimmed)
        .map_err(|e| eyre!("Invalid contract id {trimmed:?}: {e:?}"))
}

pub fn identity_of(address: Address) -> Identity {
    Identity::new(format!("0x{}", hex::encode(*address)))
}

/// Where the deployed program lives and what it was built against.
#[derive(Clone, Debug)]
pub struct ProgramTarget {
    pub contract_id: ContractId,
    pub abi_digest: String,
}

/// A forc-wallet keystore unlocked against a node. Identity requests
/// reconnect to the node and unlock again, so a reconnect after the node
/// went away starts from scratch.
pub struct FuelWalletProvider {
    rpc_url: String,
    wallet_dir: PathBuf,
    wallet_name: String,
    password: Password,
    target: ProgramTarget,
    unlocked: Mutex<Option<Wallet>>,
}

impl FuelWalletProvider {
    pub fn new(
        rpc_url: impl Into<String>,
        wallet_dir: PathBuf,
        wallet_name: impl Into<String>,
        password: Password,
        target: ProgramTarget,
    ) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            wallet_dir,
            wallet_name: wallet_name.into(),
            password,
            target,
            unlocked: Mutex::new(None),
        }
    }

    async fn unlock(&self) -> Result<Wallet> {
        let provider = Provider::connect(&self.rpc_url)
            .await
            .wrap_err_with(|| format!("Failed to connect to provider at {}", self.rpc_url))?;
        let descriptor = wallets::find_wallet(&self.wallet_dir, &self.wallet_name)
            .wrap_err("Unable to locate wallet")?;
        wallets::unlock_wallet(&descriptor, &self.password, &provider)
    }
}

impl WalletProvider for FuelWalletProvider {
    type Handle = FuelGameProgram;

    async fn request_identity(&self) -> Result<Identity, Cause> {
        info!(rpc_url = %self.rpc_url, wallet = %self.wallet_name, "unlocking wallet");
        let wallet = self
            .unlock()
            .await
            .map_err(|report| Cause::from_report(&report))?;
        let identity = identity_of(wallet.address());
        *lock(&self.unlocked) = Some(wallet);
        Ok(identity)
    }

    async fn session_handle(&self, identity: &Identity) -> Result<FuelGameProgram, Cause> {
        let wallet = lock(&self.unlocked)
            .take()
            .ok_or_else(|| Cause::new("wallet was not unlocked"))?;
        if identity_of(wallet.address()) != *identity {
            return Err(Cause::new(format!(
                "unlocked wallet does not belong to {identity}"
            )));
        }
        Ok(FuelGameProgram::new(&self.target, wallet))
    }
}

pub struct FuelGameProgram {
    contract: RockPaperScissors<Wallet>,
    abi_digest: String,
}

impl FuelGameProgram {
    pub fn new(target: &ProgramTarget, wallet: Wallet) -> Self {
        Self {
            contract: contract_instance(target.contract_id, wallet),
            abi_digest: target.abi_digest.clone(),
        }
    }
}

impl GameProgram for FuelGameProgram {
    /// The node keeps bytecode, not ABIs, so this is the digest the
    /// deployment record was written with. Connect compares it with the
    /// compiled ABI, which turns a stale record into `InterfaceMismatch`
    /// instead of a startup warning only.
    async fn interface_digest(&self) -> Result<String, Cause> {
        Ok(self.abi_digest.clone())
    }

    async fn submit_move(&self, player_move: Move) -> Result<Receipt, Cause> {
        let response = self
            .contract
            .methods()
            .play(to_abi_move(player_move))
            .call()
            .await
            .map_err(|e| Cause::new(e.to_string()))?;
        Ok(Receipt {
            tx_id: response.tx_id.map(|id| format!("0x{id}")),
            outcome: Some(from_abi_outcome(response.value)),
        })
    }

    async fn read_history(&self) -> Result<Vec<RoundRecord>, Cause> {
        let rounds = self
            .contract
            .methods()
            .history()
            .simulate(Execution::realistic())
            .await
            .map_err(|e| Cause::new(e.to_string()))?
            .value;
        debug!(rounds = rounds.len(), "history read");
        Ok(rounds.into_iter().map(from_abi_round).collect())
    }
}

fn to_abi_move(player_move: Move) -> rps::Move {
    match player_move {
        Move::First => rps::Move::Rock,
        Move::Second => rps::Move::Paper,
        Move::Third => rps::Move::Scissors,
    }
}

fn from_abi_move(abi_move: rps::Move) -> Move {
    match abi_move {
        rps::Move::Rock => Move::First,
        rps::Move::Paper => Move::Second,
        rps::Move::Scissors => Move::Third,
    }
}

fn from_abi_outcome(outcome: rps::Outcome) -> Outcome {
    match outcome {
        rps::Outcome::Win => Outcome::Win,
        rps::Outcome::Lose => Outcome::Lose,
        rps::Outcome::Draw => Outcome::Draw,
    }
}

fn from_abi_round(round: rps::Round) -> RoundRecord {
    RoundRecord {
        player: identity_of(round.player),
        player_move: from_abi_move(round.player_move),
        program_move: from_abi_move(round.contract_move),
        outcome: from_abi_outcome(round.outcome),
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn to_abi_move__follows_label_order() {
        let interface = rps_interface();
        for player_move in Move::ALL {
            assert_eq!(
                format!("{:?}", to_abi_move(player_move)),
                interface.move_label(player_move)
            );
        }
    }

    #[test]
    fn from_abi_move__inverts_to_abi_move() {
        for player_move in Move::ALL {
            assert_eq!(from_abi_move(to_abi_move(player_move)), player_move);
        }
    }

    #[test]
    fn from_abi_round__maps_every_field() {
        // given
        let round = rps::Round {
            player: Address::from([0xab; 32]),
            player_move: rps::Move::Scissors,
            contract_move: rps::Move::Rock,
            outcome: rps::Outcome::Lose,
        };

        // when
        let record = from_abi_round(round);

        // then
        assert_eq!(
            record,
            RoundRecord {
                player: Identity::new(format!("0x{}", "ab".repeat(32))),
                player_move: Move::Third,
                program_move: Move::First,
                outcome: Outcome::Lose,
            }
        );
    }

    #[test]
    fn parse_contract_id__accepts_fuel_prefix_and_whitespace() {
        // given
        let hex_id = format!("0x{}", "01".repeat(32));

        // when
        let plain = parse_contract_id(&hex_id).unwrap();
        let prefixed = parse_contract_id(&format!("  fuel{hex_id}\n")).unwrap();

        // then
        assert_eq!(plain, prefixed);
        assert_eq!(plain, ContractId::from([1u8; 32]));
    }

    #[test]
    fn parse_contract_id__garbage__errors() {
        assert!(parse_contract_id("not-a-contract").is_err());
    }

    #[test]
    fn rps_interface__digest_matches_compiled_abi() {
        assert!(rps_interface().matches_digest(&abi_digest()));
    }
}
