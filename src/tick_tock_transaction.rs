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
    accounts::{Account, AccountStatus},
    transactions::{HashUpdate, Transaction, TransactionDescr, TransactionDescrTickTock},
    Deserializable, GetRepresentationHash, Serializable,
};
use ton_types::{fail, Cell, HashmapE, Result, UInt256};

use crate::{
    blockchain_config::BlockchainConfig,
    error::ExecutorError,
    transaction_executor::{advance_lt, new_lt, TransactionExecutor},
};

/// Selects which of the two special transactions a tick/tock account gets
/// in a given block (spec.md §4.F): masterchain special accounts run
/// `Tick` at the start of every block and `Tock` at the end, never both in
/// the same call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickTock {
    Tick,
    Tock,
}

impl TickTock {
    fn is_tock(self) -> bool {
        matches!(self, TickTock::Tock)
    }
}

/// Executes one tick or tock transaction: no inbound message, no credit or
/// bounce phase, only storage then compute then action (spec.md §4.F).
pub struct TickTockTransactionExecutor {
    config: BlockchainConfig,
    debug: bool,
}

impl TickTockTransactionExecutor {
    pub fn new(config: BlockchainConfig) -> Self {
        TickTockTransactionExecutor { config, debug: false }
    }

    #[allow(dead_code)]
    pub fn set_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn execute(
        &self,
        tt: TickTock,
        account_root: &mut Cell,
        block_unixtime: u32,
        block_lt: u64,
        last_tr_lt: Arc<AtomicU64>,
    ) -> Result<Transaction> {
        self.execute_with_libs(tt, account_root, &HashmapE::default(), UInt256::default(), block_unixtime, block_lt, last_tr_lt)
    }

    pub fn execute_with_libs(
        &self,
        tt: TickTock,
        account_root: &mut Cell,
        state_libs: &HashmapE,
        block_rand_seed: UInt256,
        block_unixtime: u32,
        block_lt: u64,
        last_tr_lt: Arc<AtomicU64>,
    ) -> Result<Transaction> {
        let old_hash = account_root.repr_hash();
        let mut account = Account::construct_from(&mut account_root.clone().into())?;

        if account.status() != AccountStatus::AccStateActive {
            fail!(ExecutorError::TrExecutorError(
                "tick/tock transaction requires an active account".to_string()
            ));
        }
        if !self.is_special_account(&account) {
            fail!(ExecutorError::TrExecutorError(
                "tick/tock transaction is only valid for a special account".to_string()
            ));
        }

        let lt = new_lt(&last_tr_lt);
        let mut description = TransactionDescrTickTock::default();
        description.tt = if tt.is_tock() {
            ton_block::transactions::TransactionTickTock::Tock
        } else {
            ton_block::transactions::TransactionTickTock::Tick
        };

        description.storage_ph = self.prepare_storage_phase(&mut account, block_unixtime, true)?;

        let (compute_phase, _accepted, action_list, new_data) = self.prepare_compute_phase(
            &mut account, None, state_libs, block_rand_seed, block_unixtime, lt, Some(tt.is_tock()), self.debug,
        )?;
        if let Some(data) = new_data {
            account.set_data(data);
        }

        // No inbound message means no external-rejection path, so only
        // `success` (not `accepted`) matters here -- it gates the action
        // phase exactly as it does for ordinary transactions (spec.md
        // §4.E.3/§4.F).
        let success = matches!(&compute_phase, ton_block::transactions::TrComputePhase::Vm(vm) if vm.success);
        description.compute_ph = compute_phase;

        let mut out_msgs = Vec::new();
        let mut action_phase_failed = false;
        if success {
            let fwd_prices = self.config.get_fwd_prices(account.workchain_id() == -1);
            let result = self.prepare_action_phase(&mut account, action_list, fwd_prices, None)?;
            action_phase_failed = !result.phase.success;
            description.action = Some(result.phase);
            if let Some(code) = result.new_code {
                account.set_code(code);
            }
            out_msgs = result.out_msgs;
        }

        description.aborted = !success || action_phase_failed;

        let outmsg_cnt = out_msgs.len() as u64;
        let final_lt = advance_lt(&last_tr_lt, 1 + outmsg_cnt);
        account.set_last_tr_time(lt);

        let mut trans = Transaction::with_account_and_tt(&account, tt.is_tock(), lt)?;
        trans.set_now(block_unixtime);
        for out_msg in &out_msgs {
            trans.add_out_message(out_msg)?;
        }
        trans.set_total_fees(total_fees(&description).into());
        trans.write_description(&TransactionDescr::TickTock(description))?;

        *account_root = account.write_to_new_cell()?.into();
        let new_hash = account_root.repr_hash();
        trans.write_state_update(&HashUpdate::with_hashes(old_hash, new_hash))?;

        debug!("tick/tock transaction: lt {} aborted {} outmsg_cnt {}", final_lt, trans.read_description()?.is_aborted(), outmsg_cnt);
        Ok(trans)
    }
}

impl TransactionExecutor for TickTockTransactionExecutor {
    fn config(&self) -> &BlockchainConfig {
        &self.config
    }
}

fn total_fees(description: &TransactionDescrTickTock) -> u64 {
    let mut total = description.storage_ph.as_ref().map(|p| p.storage_fees_collected.0).unwrap_or(0) as u128;
    if let ton_block::transactions::TrComputePhase::Vm(vm) = &description.compute_ph {
        total += vm.gas_fees.0 as u128;
    }
    if let Some(action) = &description.action {
        total += action.total_action_fees.as_ref().map(|g| g.0).unwrap_or(0) as u128;
    }
    total as u64
}
