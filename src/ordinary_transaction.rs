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
use ton_block::{
    accounts::Account,
    messages::{CommonMsgInfo, Message},
    transactions::{HashUpdate, Transaction, TransactionDescr, TransactionDescrOrdinary},
    Deserializable, GetRepresentationHash, Serializable,
};
use ton_types::{fail, Cell, HashmapE, Result, UInt256};

use crate::{
    blockchain_config::BlockchainConfig,
    error::ExecutorError,
    transaction_executor::{advance_lt, new_lt, TransactionExecutor},
};

/// Executes one ordinary transaction: an inbound message (external or
/// internal) against one account. Mirrors the teacher's own
/// `OrdinaryTransactionExecutor`, whose `execute` signature is pinned by
/// `src/tests/test_ordinary_transaction.rs` (kept verbatim in this crate).
pub struct OrdinaryTransactionExecutor {
    config: BlockchainConfig,
    debug: bool,
}

impl OrdinaryTransactionExecutor {
    pub fn new(config: BlockchainConfig) -> Self {
        OrdinaryTransactionExecutor { config, debug: false }
    }

    #[allow(dead_code)]
    pub fn set_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Runs the full phase pipeline and returns the finished transaction.
    /// `account_root` is replaced in place with the post-commit account
    /// cell; `last_tr_lt` is advanced past every logical time this call
    /// consumes (its own `lt` plus one slot per outbound message).
    pub fn execute(
        &self,
        in_msg: Option<&Message>,
        account_root: &mut Cell,
        block_unixtime: u32,
        block_lt: u64,
        last_tr_lt: Arc<AtomicU64>,
        is_special: bool,
    ) -> Result<Transaction> {
        self.execute_with_libs(
            in_msg,
            account_root,
            &HashmapE::default(),
            UInt256::default(),
            block_unixtime,
            block_lt,
            last_tr_lt,
            is_special,
        )
    }

    /// Full-argument entry point (state libraries + explicit block random
    /// seed); `execute` above supplies defaults so the teacher's own
    /// 5-positional-argument tests keep calling the same method shape
    /// (SPEC_FULL.md §3.F).
    pub fn execute_with_libs(
        &self,
        in_msg: Option<&Message>,
        account_root: &mut Cell,
        state_libs: &HashmapE,
        block_rand_seed: UInt256,
        block_unixtime: u32,
        block_lt: u64,
        last_tr_lt: Arc<AtomicU64>,
        is_special: bool,
    ) -> Result<Transaction> {
        let msg = in_msg.ok_or_else(|| ExecutorError::TrExecutorError(
            "ordinary transaction requires an inbound message".to_string()
        ))?;
        let is_external = matches!(msg.header(), CommonMsgInfo::ExtInMsgInfo(_));
        let bounce_enabled = match msg.header() {
            CommonMsgInfo::IntMsgInfo(h) => h.bounce,
            _ => false,
        };

        let old_hash = account_root.repr_hash();
        let mut account = Account::construct_from(&mut account_root.clone().into())?;

        let lt = new_lt(&last_tr_lt);
        let mut description = TransactionDescrOrdinary::default();
        description.credit_first = !bounce_enabled;

        // Storage vs credit ordering depends on the bounce flag (spec.md
        // §4.E.2): bounceable messages pay storage out of the account's own
        // pre-message balance first; non-bounceable messages may use the
        // incoming value to cover storage.
        if bounce_enabled {
            description.storage_ph = self.prepare_storage_phase(&mut account, block_unixtime, is_special)?;
            if !is_external {
                description.credit_ph = Some(self.prepare_credit_phase(&mut account, msg)?);
            }
        } else {
            if !is_external {
                description.credit_ph = Some(self.prepare_credit_phase(&mut account, msg)?);
            }
            description.storage_ph = self.prepare_storage_phase(&mut account, block_unixtime, is_special)?;
        }

        let (compute_phase, accepted, action_list, new_data) = self.prepare_compute_phase(
            &mut account, Some(msg), state_libs, block_rand_seed, block_unixtime, lt, None, self.debug,
        )?;
        if let Some(data) = new_data {
            account.set_data(data);
        }

        // `accepted` (did the VM call the accept primitive) and `success`
        // (did it then run to completion without exception) are distinct
        // per spec.md §4.E.3: a contract may accept and still fail. Only
        // `accepted` gates external-message rejection; only `success` gates
        // whether the action phase runs at all.
        let success = matches!(&compute_phase, ton_block::transactions::TrComputePhase::Vm(vm) if vm.success);
        description.compute_ph = compute_phase;

        if !accepted && is_external {
            fail!(ExecutorError::ExtMsgImportRejected { account_id: account.get_id().map(|id| id.to_hex_string()).unwrap_or_default() });
        }

        let mut out_msgs = Vec::new();
        let mut outmsg_cnt = 0u64;
        let mut action_phase_failed = false;
        if success {
            let fwd_prices = self.config.get_fwd_prices(account.workchain_id() == -1);
            let result = self.prepare_action_phase(&mut account, action_list, fwd_prices, Some(msg))?;
            action_phase_failed = !result.phase.success;
            description.action = Some(result.phase);
            if let Some(code) = result.new_code {
                account.set_code(code);
            }
            outmsg_cnt = result.out_msgs.len() as u64;
            out_msgs = result.out_msgs;
        }

        let aborted = !success || action_phase_failed;
        if bounce_enabled && !success {
            let fwd_prices = self.config.get_fwd_prices(account.workchain_id() == -1);
            let bounce_bits = if self.config.has_capability(ton_block::GlobalCapabilities::CapBounceMsgBody) { 256 } else { 0 };
            let (bounce_phase, bounce_msg) = self.prepare_bounce_phase(&mut account, msg, fwd_prices, bounce_bits, block_unixtime)?;
            description.bounce = Some(bounce_phase);
            if let Some(bmsg) = bounce_msg {
                outmsg_cnt += 1;
                out_msgs.push(bmsg);
            }
        }

        description.aborted = aborted;
        description.destroyed = account.status() == ton_block::accounts::AccountStatus::AccStateDeleted;

        let final_lt = advance_lt(&last_tr_lt, 1 + outmsg_cnt);
        account.set_last_tr_time(lt);

        let mut trans = Transaction::with_account_and_message(&account, msg, lt)?;
        trans.set_now(block_unixtime);
        for out_msg in &out_msgs {
            trans.add_out_message(out_msg)?;
        }
        trans.set_total_fees(total_fees(&description).into());
        trans.write_description(&TransactionDescr::Ordinary(description))?;

        *account_root = account.write_to_new_cell()?.into();
        let new_hash = account_root.repr_hash();
        trans.write_state_update(&HashUpdate::with_hashes(old_hash, new_hash))?;

        debug!("ordinary transaction: lt {} aborted {} outmsg_cnt {}", final_lt, trans.read_description()?.is_aborted(), outmsg_cnt);
        Ok(trans)
    }
}

impl TransactionExecutor for OrdinaryTransactionExecutor {
    fn config(&self) -> &BlockchainConfig {
        &self.config
    }
}

/// Sum of storage, gas and action fees collected by this transaction, the
/// value `Transaction::set_total_fees` expects (a plain integer `.into()`
/// a `Grams`, per the teacher's own test fixtures).
fn total_fees(description: &TransactionDescrOrdinary) -> u64 {
    let mut total = description.storage_ph.as_ref().map(|p| p.storage_fees_collected.0).unwrap_or(0) as u128;
    if let ton_block::transactions::TrComputePhase::Vm(vm) = &description.compute_ph {
        total += vm.gas_fees.0 as u128;
    }
    if let Some(action) = &description.action {
        total += action.total_action_fees.as_ref().map(|g| g.0).unwrap_or(0) as u128;
    }
    total as u64
}
