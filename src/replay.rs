/*
* Copyright 2018-2020 TON DEV SOLUTIONS LTD.
*
* Licensed under the SOFTWARE EVALUATION License (the "License"); you may not use
* this file except in compliance with the License.  You may obtain a copy of the
* License at: https://ton.dev/licenses
*
* Unless required by applicable law or agreed to in writing, software
* distributed under the License is distributed on an "AS IS" BASIS,
* WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
* See the License for the specific TON DEV software governing permissions and
* limitations under the License.
*/

use std::sync::{atomic::AtomicU64, Arc};

use log::debug;
use rand::RngCore;
use ton_block::{
    accounts::{Account, AccountState, AccountStatus, AccountStorage, StorageInfo},
    messages::{CommonMsgInfo, Message, MsgAddressInt},
    ConfigParams, CurrencyCollection, Deserializable,
};
use ton_types::{Cell, Result, SliceData, UInt256};

use crate::{
    blockchain_config::BlockchainConfig,
    error::ExecutorError,
    ordinary_transaction::OrdinaryTransactionExecutor,
    tick_tock_transaction::{TickTock, TickTockTransactionExecutor},
};

/// Everything a replay call needs that is neither part of the account, the
/// message nor the configuration: today, just the block's random seed.
/// Explicit rather than sourced from a process-global generator, so a
/// replay is reproducible given the same three cells plus this context
/// (SPEC_FULL.md §2.5).
pub struct RuntimeContext {
    pub rand_seed: UInt256,
}

impl RuntimeContext {
    /// Mirrors the original's `prng::rand_gen().strong_rand_bytes(...)` for
    /// callers that do not need reproducibility.
    pub fn with_os_rand() -> Self {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        RuntimeContext { rand_seed: UInt256::from(bytes) }
    }

    pub fn with_seed(rand_seed: UInt256) -> Self {
        RuntimeContext { rand_seed }
    }
}

/// Replays one ordinary transaction: an inbound message against an account,
/// both given as their serialized cell roots, under a configuration cell.
/// `prev_lt`/`prev_hash` describe the account's state as of the last
/// transaction that touched it (mirrors the original's `ShardAccount`
/// wrapper, `cell_pack_account_descr(acc_root, prev_hash, prev_lt)`).
///
/// Returns `Ok(None)` when an inbound external message is rejected before or
/// during execution (never accepted by the contract) -- not a failure of
/// the replayer itself, just an outcome the caller should treat as "no
/// transaction". Returns `Err` for every other kind of failure: a malformed
/// config, an unparseable message, or an internal message that somehow
/// produces an unaccepted, non-aborted transaction (an invariant violation;
/// see SPEC_FULL.md §5.3).
pub fn replay_ordinary(
    acc_root: Cell,
    msg_root: Cell,
    cfg_root: Cell,
    lt: u64,
    now: u32,
    prev_lt: u64,
    prev_hash: UInt256,
    is_special: bool,
    ctx: &RuntimeContext,
) -> Result<Option<(Cell, Cell)>> {
    let msg = Message::construct_from(&mut SliceData::from(msg_root.clone()))?;
    let is_external = matches!(msg.header(), CommonMsgInfo::ExtInMsgInfo(_));
    let dest = match msg.header() {
        CommonMsgInfo::ExtInMsgInfo(h) => &h.dst,
        CommonMsgInfo::IntMsgInfo(h) => &h.dst,
        _ => {
            return Err(ExecutorError::TrExecutorError(
                "replay_ordinary requires an external-inbound or internal message".to_string(),
            )
            .into());
        }
    };

    let config = BlockchainConfig::with_config(ConfigParams::construct_from(&mut SliceData::from(cfg_root))?)?;

    // `prev_hash` identifies the account state this call starts from; the
    // account cell passed in is assumed to already be that state, so it is
    // only carried here for callers that need it for their own bookkeeping.
    let _ = prev_hash;
    let mut account = decode_account(acc_root, prev_lt)?;
    if account.status() == AccountStatus::AccStateNonexist {
        account = new_uninit_account(dest, now);
    }

    let mut account_root: Cell = account.write_to_new_cell()?.into();
    let last_tr_lt = Arc::new(AtomicU64::new(lt));
    let executor = OrdinaryTransactionExecutor::new(config);
    let trans = match executor.execute_with_libs(
        Some(&msg),
        &mut account_root,
        &Default::default(),
        ctx.rand_seed.clone(),
        now,
        lt,
        last_tr_lt,
        is_special,
    ) {
        Ok(trans) => trans,
        Err(e) => {
            return if is_external && e.downcast_ref::<ExecutorError>().map(|e| matches!(e, ExecutorError::ExtMsgImportRejected { .. } | ExecutorError::NoAcceptError { .. })).unwrap_or(false) {
                debug!("inbound external message rejected before or during execution");
                Ok(None)
            } else {
                Err(e)
            };
        }
    };

    let trans_root: Cell = trans.write_to_new_cell()?.into();
    Ok(Some((trans_root, account_root)))
}

/// Replays one tick or tock transaction against a special account's own
/// stored cell root; there is no inbound message to derive an address from,
/// so the account's own address field is used (SPEC_FULL.md §2.1).
pub fn replay_ticktock(
    acc_root: Cell,
    cfg_root: Cell,
    lt: u64,
    now: u32,
    prev_lt: u64,
    prev_hash: UInt256,
    is_tock: bool,
    ctx: &RuntimeContext,
) -> Result<Option<(Cell, Cell)>> {
    let config = BlockchainConfig::with_config(ConfigParams::construct_from(&mut SliceData::from(cfg_root))?)?;
    let _ = prev_hash;
    let account = decode_account(acc_root, prev_lt)?;
    if account.status() == AccountStatus::AccStateNonexist {
        return Err(ExecutorError::TrExecutorError(
            "replay_ticktock requires an already-existing account".to_string(),
        )
        .into());
    }

    let mut account_root: Cell = account.write_to_new_cell()?.into();
    let last_tr_lt = Arc::new(AtomicU64::new(lt));
    let executor = TickTockTransactionExecutor::new(config);
    let tt = if is_tock { TickTock::Tock } else { TickTock::Tick };
    let trans = executor.execute_with_libs(tt, &mut account_root, &Default::default(), ctx.rand_seed.clone(), now, lt, last_tr_lt)?;

    let trans_root: Cell = trans.write_to_new_cell()?.into();
    Ok(Some((trans_root, account_root)))
}

/// An account that does not exist yet, as seen by a first inbound message
/// carrying its own `StateInit` (spec.md's `account_none` case). Zero
/// balance, no code or data until the compute phase activates it from the
/// message's `StateInit` (`transaction_executor.rs::check_state_init`).
fn new_uninit_account(addr: &MsgAddressInt, now: u32) -> Account {
    Account::with_storage(
        addr,
        &StorageInfo::with_values(now, None),
        &AccountStorage {
            last_trans_lt: 0,
            balance: CurrencyCollection::default(),
            state: AccountState::default(),
        },
    )
}

/// Decodes the account cell, stamping in `prev_lt` as its prior transaction
/// time the way the original's `ShardAccount` wrapper does, before any phase
/// runs (SPEC_FULL.md §2.2). A nonexistent account decodes to
/// `AccStateNonexist`; callers construct a fresh one from the address they
/// already know (the message destination, for ordinary; an error, for
/// tick/tock, since there is no address to fall back on).
fn decode_account(acc_root: Cell, prev_lt: u64) -> Result<Account> {
    let mut account = Account::construct_from(&mut SliceData::from(acc_root))?;
    if account.status() != AccountStatus::AccStateNonexist {
        account.set_last_tr_time(prev_lt);
    }
    Ok(account)
}
