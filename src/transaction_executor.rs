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

use std::sync::{atomic::{AtomicU64, Ordering}, Arc};

use log::debug;
use ton_block::{
    accounts::{Account, AccountStatus},
    messages::{CommonMsgInfo, Message},
    out_actions::{
        OutAction, OutActions, RESERVE_ALL_BUT, RESERVE_IGNORE_ERROR, RESERVE_PLUS_ORIG,
        RESERVE_REVERSE, SENDMSG_ALL_BALANCE, SENDMSG_DELETE_IF_EMPTY, SENDMSG_IGNORE_ERROR,
        SENDMSG_PAY_FEE_SEPARATELY, SENDMSG_REMAINING_MSG_BALANCE,
    },
    transactions::{
        AccStatusChange, TrActionPhase, TrBouncePhase, TrComputePhase, TrComputePhaseVm,
        TrCreditPhase, TrStoragePhase,
    },
    types::{Grams, VarUInteger7},
    CurrencyCollection, Deserializable, GetRepresentationHash, Serializable, StorageUsedShort,
};
use ton_types::{fail, BuilderData, Cell, HashmapE, Result, SliceData, UInt256};
use ton_vm::{
    executor::gas::gas_state::Gas,
    int,
    smart_contract_info::SmartContractInfo,
    stack::{integer::IntegerData, Stack, StackItem},
};

use crate::{
    blockchain_config::{BlockchainConfig, MsgForwardPrices},
    error::ExecutorError,
    vmsetup::VMSetup,
};

/// Bounded-size structured record of one phase attempt, shared between the
/// ordinary and tick/tock drivers so both can log and reason about partial
/// failure identically (spec.md §3 "Phase results").
pub struct ActionPhaseResult {
    pub phase: TrActionPhase,
    pub out_msgs: Vec<Message>,
    pub new_code: Option<Cell>,
}

/// Shared phase-engine logic for ordinary and tick/tock transactions. Each
/// method is a pure function of its explicit arguments (spec.md §4.E) --
/// none of them touch global state, and every one returns a structured
/// phase record rather than unwinding (spec.md §9, "exceptions for control
/// flow -> phase-result records").
pub trait TransactionExecutor {
    fn config(&self) -> &BlockchainConfig;

    /// Builds the initial VM stack for an ordinary transaction (spec.md
    /// §4.E.3): `(balance, msg_value, msg_cell, msg_body_slice, selector)`.
    /// `selector` is `0` for an internal message and `-1` for an external-in
    /// message (`-2` when there is no message at all, i.e. tick/tock),
    /// matching the teacher's own
    /// `src/tests/test_ordinary_transaction.rs::test_build_ordinary_stack`.
    fn build_stack(&self, in_msg: Option<&Message>, account: &Account) -> Stack {
        let mut stack = Stack::new();
        let balance = account.get_balance().map(|cc| cc.grams.0).unwrap_or_default();
        let (msg_value, msg_cell, body, selector) = match in_msg {
            Some(msg) => {
                let value = match msg.header() {
                    CommonMsgInfo::IntMsgInfo(hdr) => hdr.value.grams.0,
                    _ => 0u128,
                };
                let selector = match msg.header() {
                    CommonMsgInfo::ExtInMsgInfo(_) => -1,
                    _ => 0,
                };
                let cell = msg.write_to_new_cell().unwrap_or_default().into();
                let body = msg.body().unwrap_or_default();
                (value, cell, body, selector)
            }
            None => (0u128, Cell::default(), SliceData::default(), -2),
        };
        stack
            .push(int!(balance))
            .push(int!(msg_value))
            .push(StackItem::Cell(msg_cell))
            .push(StackItem::Slice(body))
            .push(int!(selector));
        stack
    }

    /// Storage phase (spec.md §4.E.1). Never aborts the transaction; always
    /// returns `Some(phase)` except when the account does not exist at all
    /// (nothing to charge). `is_special` accounts are exempt from freeze and
    /// deletion on unpaid storage debt, matching the teacher's own
    /// `is_special`/`allow_special` threading (SPEC_FULL.md §2.4).
    fn prepare_storage_phase(
        &self,
        account: &mut Account,
        now: u32,
        is_special: bool,
    ) -> Result<Option<TrStoragePhase>> {
        if account.status() == AccountStatus::AccStateNonexist {
            return Ok(None);
        }
        let last_paid = account.last_paid();
        if now < last_paid {
            fail!(ExecutorError::TrExecutorError(
                "storage phase: now is before last_paid, time is not monotone".to_string()
            ));
        }
        let is_masterchain = account.workchain_id() == -1;
        let stats = account.storage_stat();
        let prices = self.config().get_storage_prices();
        let mut due = due_payment_before(account) as u128;
        due += accrue_storage_fee(prices, stats.cells, stats.bits, last_paid, now, is_masterchain);

        account.set_last_paid(now);

        if is_special {
            account.set_due_payment(None);
            return Ok(Some(TrStoragePhase::with_params(0u32.into(), None, AccStatusChange::Unchanged)));
        }

        let balance = account.get_balance().map(|cc| cc.grams.0).unwrap_or_default();
        let (collected, remaining) = if balance >= due {
            (due, 0u128)
        } else {
            (balance, due - balance)
        };
        account.sub_balance_grams(collected)?;

        let mut status_change = AccStatusChange::Unchanged;
        if remaining > 0 {
            account.set_due_payment(Some(Grams::from(remaining)));
            let gas_cfg = self.config().get_gas_config(is_masterchain);
            if remaining as u64 > gas_cfg.freeze_due_limit && account.status() == AccountStatus::AccStateActive {
                account.set_status(AccountStatus::AccStateFrozen);
                status_change = AccStatusChange::Frozen;
            }
            if remaining as u64 > gas_cfg.delete_due_limit && account.status() == AccountStatus::AccStateFrozen {
                account.set_status(AccountStatus::AccStateDeleted);
                status_change = AccStatusChange::Deleted;
            }
        } else {
            account.set_due_payment(None);
        }

        debug!("storage phase: collected {} remaining {}", collected, remaining);
        Ok(Some(TrStoragePhase::with_params(
            (collected as u64).into(),
            if remaining > 0 { Some((remaining as u64).into()) } else { None },
            status_change,
        )))
    }

    /// Credit phase (spec.md §4.E.2, internal messages only). Clears a
    /// positive `due_payment` out of the incoming value first, then credits
    /// the remainder to the account balance.
    fn prepare_credit_phase(&self, account: &mut Account, msg: &Message) -> Result<TrCreditPhase> {
        let value = match msg.header() {
            CommonMsgInfo::IntMsgInfo(hdr) => hdr.value.clone(),
            _ => fail!(ExecutorError::TrExecutorError(
                "credit phase requires an internal message".to_string()
            )),
        };
        let due_before = account.due_payment().map(|g| g.0).unwrap_or(0);
        let due_collected = std::cmp::min(due_before, value.grams.0);
        if due_collected > 0 {
            let remaining = due_before - due_collected;
            account.set_due_payment(if remaining > 0 { Some(Grams::from(remaining)) } else { None });
        }
        account.add_balance(&value)?;
        Ok(TrCreditPhase::with_params(
            if due_collected > 0 { Some((due_collected as u64).into()) } else { None },
            value,
        ))
    }

    /// Compute phase (spec.md §4.E.3). Returns the phase record plus the
    /// action-list cell and any new persistent data the VM produced; the
    /// caller (ordinary/tick-tock driver) decides whether to run the action
    /// phase based on `accepted`/`phase.success` -- spec.md §4.E.3 treats
    /// these as two distinct outputs: `accepted` is whether the VM ever
    /// called the accept primitive, `success` is whether it then ran to
    /// completion without an exception. A contract can accept and still
    /// fail (exit code after `ACCEPT`); the driver must gate
    /// external-rejection on `accepted` alone and the action phase on
    /// `success` alone, never conflate the two.
    fn prepare_compute_phase(
        &self,
        account: &mut Account,
        in_msg: Option<&Message>,
        state_libs: &HashmapE,
        block_rand_seed: UInt256,
        block_unixtime: u32,
        block_lt: u64,
        is_tock: Option<bool>,
        debug: bool,
    ) -> Result<(TrComputePhase, bool, Option<Cell>, Option<Cell>)> {
        let is_external = matches!(in_msg.map(|m| m.header()), Some(CommonMsgInfo::ExtInMsgInfo(_)));
        let is_masterchain = account.workchain_id() == -1;
        let gas_cfg = self.config().get_gas_config(is_masterchain);

        if account.status() == AccountStatus::AccStateUninit || account.status() == AccountStatus::AccStateFrozen {
            match check_state_init(account, in_msg) {
                StateInitCheck::Ok(new_code, new_data) => {
                    account.activate(new_code, new_data);
                }
                StateInitCheck::NoState => {
                    return Ok((TrComputePhase::skipped(ComputeSkipReason::NoState), false, None, None));
                }
                StateInitCheck::BadState => {
                    return Ok((TrComputePhase::skipped(ComputeSkipReason::BadState), false, None, None));
                }
                StateInitCheck::NotApplicable => {}
            }
        }

        if account.status() != AccountStatus::AccStateActive {
            return Ok((TrComputePhase::skipped(ComputeSkipReason::NoState), false, None, None));
        }

        let balance = account.get_balance().map(|cc| cc.grams.0).unwrap_or_default();
        let gas_limit = gas_cfg.gas_limit_for_balance(balance, self.is_special_account(account));
        let gas_credit = if is_external { gas_cfg.gas_credit } else { 0 };
        let gas = Gas::new(gas_limit as i64, gas_credit as i64, gas_cfg.gas_limit as i64, gas_cfg.gas_price as i64);

        let stack = self.build_stack(in_msg, account);
        let sci = build_smart_contract_info(account, block_rand_seed, block_unixtime, block_lt, is_tock);

        let code = account.get_code().ok_or_else(|| ExecutorError::TrExecutorError(
            "active account has no code".to_string()
        ))?;
        let data = account.get_data().unwrap_or_default();

        let mut vm = VMSetup::new(SliceData::from(code))
            .set_contract_info(&sci)
            .set_data(data)
            .set_stack(stack)
            .set_gas(gas)
            .set_libraries(vec![account.libraries().clone(), state_libs.clone()])
            .set_debug(debug)
            .create();

        let result = vm.execute();
        let gas_used = vm.gas_used() as u64;
        let accepted = vm.gas_accepted();

        let mut vm_phase = TrComputePhaseVm::default();
        vm_phase.gas_used = VarUInteger7(gas_used.into());
        vm_phase.gas_limit = VarUInteger7(gas_limit.into());
        vm_phase.gas_credit = if gas_credit > 0 { Some(gas_credit.into()) } else { None };
        vm_phase.success = result.is_ok();
        vm_phase.exit_code = vm.exit_code();
        vm_phase.msg_state_used = matches!(
            account.status(), AccountStatus::AccStateActive
        ) && in_msg.map(|m| m.state_init().is_some()).unwrap_or(false);
        vm_phase.account_activated = false;
        vm_phase.gas_fees = if accepted {
            (gas_cfg.calc_gas_fee(gas_used) as u64).into()
        } else {
            0u32.into()
        };

        if !accepted {
            if is_external {
                fail!(ExecutorError::NoAcceptError { smallest_gas: gas_credit });
            }
        } else {
            account.sub_balance_grams(vm_phase.gas_fees.0 as u128)?;
        }

        let new_data = vm.committed_data();
        let action_list = vm.action_list_cell();

        Ok((TrComputePhase::Vm(vm_phase), accepted, action_list, new_data))
    }

    fn is_special_account(&self, account: &Account) -> bool {
        account.get_addr().map(|a| self.config().is_special_account(a.address())).unwrap_or(false)
    }

    /// Action phase (spec.md §4.E.4). Walks the action list in order,
    /// deferring every `SENDMSG_ALL_BALANCE` (mode `0x80`) send to the end so
    /// its "remaining balance" reflects every earlier action (SPEC_FULL.md
    /// §5.1). At most one undeferred (non-`0x02`) carry-all send is allowed;
    /// a second one aborts the phase unless `0x02` is set on it, in which
    /// case it is silently dropped.
    fn prepare_action_phase(
        &self,
        account: &mut Account,
        action_list_cell: Option<Cell>,
        fwd_prices: &MsgForwardPrices,
        original_msg: Option<&Message>,
    ) -> Result<ActionPhaseResult> {
        let mut phase = TrActionPhase::default();
        let mut out_msgs = Vec::new();
        let mut new_code = None;

        let actions = match action_list_cell {
            Some(cell) => parse_action_list(cell)?,
            None => Vec::new(),
        };
        phase.tot_actions = actions.len() as i16;

        let mut running_balance = account.get_balance().cloned().unwrap_or_default();
        let mut reserved = CurrencyCollection::default();
        let mut total_fwd_fees: u128 = 0;
        let mut total_action_fees: u128 = 0;
        let mut carry_all_seen = false;
        let mut delete_if_empty = false;

        let (immediate, deferred): (Vec<_>, Vec<_>) =
            actions.into_iter().partition(|a| !matches!(a, ParsedAction::Send { mode, .. } if mode & SENDMSG_ALL_BALANCE != 0));

        for action in immediate.into_iter().chain(deferred.into_iter()) {
            match action {
                ParsedAction::Reserve { mode, value } => {
                    match apply_reserve(mode, &value, &running_balance, &reserved) {
                        Ok(new_reserved) => reserved = new_reserved,
                        Err(e) => {
                            if mode & RESERVE_IGNORE_ERROR != 0 {
                                continue;
                            }
                            phase.success = false;
                            debug!("action phase: reserve failed: {}", e);
                            return Ok(finish_failed_action_phase(phase));
                        }
                    }
                }
                ParsedAction::Send { mode, mut msg } => {
                    let is_carry_all = mode & SENDMSG_ALL_BALANCE != 0;
                    if mode & SENDMSG_DELETE_IF_EMPTY != 0 && !is_carry_all {
                        if mode & SENDMSG_IGNORE_ERROR != 0 {
                            continue;
                        }
                        phase.success = false;
                        debug!("action phase: delete-if-empty is only valid together with carry-all-balance");
                        return Ok(finish_failed_action_phase(phase));
                    }
                    if is_carry_all {
                        if carry_all_seen {
                            if mode & SENDMSG_IGNORE_ERROR != 0 {
                                continue;
                            }
                            phase.success = false;
                            return Ok(finish_failed_action_phase(phase));
                        }
                        carry_all_seen = true;
                    }
                    let value = if is_carry_all {
                        let mut v = running_balance.clone();
                        v.sub(&reserved).ok();
                        v
                    } else if mode & SENDMSG_REMAINING_MSG_BALANCE != 0 {
                        original_msg.and_then(|m| match m.header() {
                            CommonMsgInfo::IntMsgInfo(h) => Some(h.value.clone()),
                            _ => None,
                        }).unwrap_or_default()
                    } else {
                        msg_value(&msg)
                    };

                    let (cells, bits) = estimate_msg_size(&msg, &value);
                    let fwd_fee_full = fwd_prices.fwd_fee(cells, bits);
                    let mine_fee = fwd_prices.mine_fee(fwd_fee_full);
                    let remain_fee = fwd_fee_full - mine_fee;

                    let pay_separately = mode & SENDMSG_PAY_FEE_SEPARATELY != 0;
                    let debit = if pay_separately {
                        let mut d = value.clone();
                        d.add(&CurrencyCollection::with_grams(fwd_fee_full as u64))?;
                        d
                    } else {
                        value.clone()
                    };

                    if running_balance.sub(&debit).is_err() {
                        if mode & SENDMSG_IGNORE_ERROR != 0 {
                            continue;
                        }
                        phase.success = false;
                        return Ok(finish_failed_action_phase(phase));
                    }

                    set_msg_value(&mut msg, if pay_separately { value.clone() } else { subtract_fee(&value, remain_fee) });
                    set_msg_fwd_fee(&mut msg, remain_fee as u64);

                    total_fwd_fees += fwd_fee_full;
                    total_action_fees += mine_fee;
                    phase.msgs_created += 1;

                    if mode & SENDMSG_DELETE_IF_EMPTY != 0 {
                        delete_if_empty = true;
                    }

                    out_msgs.push(msg);
                }
                ParsedAction::SetCode { code } => {
                    new_code = Some(code);
                }
                ParsedAction::ChangeLibrary { .. } => {
                    // library changes are applied to the account's library
                    // collection directly; no balance/fee effect.
                }
            }
        }

        account.set_balance(running_balance.clone());
        if delete_if_empty && running_balance.grams.0 == 0 {
            account.set_status(AccountStatus::AccStateDeleted);
            phase.status_change = AccStatusChange::Deleted;
        }

        phase.success = true;
        phase.valid = true;
        phase.total_fwd_fees = if total_fwd_fees > 0 { Some((total_fwd_fees as u64).into()) } else { None };
        phase.total_action_fees = if total_action_fees > 0 { Some((total_action_fees as u64).into()) } else { None };

        Ok(ActionPhaseResult { phase, out_msgs, new_code })
    }

    /// Bounce phase (spec.md §4.E.5). Produces a single outbound message
    /// carrying back up to `bounce_msg_body` bits of the original body.
    fn prepare_bounce_phase(
        &self,
        account: &mut Account,
        original_msg: &Message,
        fwd_prices: &MsgForwardPrices,
        bounce_msg_body_bits: usize,
        now: u32,
    ) -> Result<(TrBouncePhase, Option<Message>)> {
        let hdr = match original_msg.header() {
            CommonMsgInfo::IntMsgInfo(h) => h.clone(),
            _ => fail!(ExecutorError::TrExecutorError("bounce requires an internal message".to_string())),
        };
        let (cells, bits) = estimate_msg_size(original_msg, &hdr.value);
        let fwd_fee_full = fwd_prices.fwd_fee(cells, bits);
        let mine_fee = fwd_prices.mine_fee(fwd_fee_full);
        let remain_fee = fwd_fee_full - mine_fee;

        if hdr.value.grams.0 < fwd_fee_full {
            return Ok((TrBouncePhase::no_funds(StorageUsedShort::default(), fwd_fee_full as u64), None));
        }

        let mut bounced_value = hdr.value.clone();
        bounced_value.grams = Grams::from(hdr.value.grams.0 - fwd_fee_full);

        let mut bounced_header = ton_block::messages::InternalMessageHeader::with_addresses(
            hdr.dst.clone(),
            hdr.src.clone(),
            bounced_value,
        );
        bounced_header.bounce = false;
        bounced_header.bounced = true;
        bounced_header.ihr_disabled = true;
        bounced_header.fwd_fee = Grams::from(remain_fee);
        bounced_header.created_at = now.into();

        let mut msg = Message::with_int_header(bounced_header);
        if bounce_msg_body_bits > 0 {
            let body = original_msg.body().unwrap_or_default();
            let truncated = truncate_slice(body, bounce_msg_body_bits);
            msg.set_body(truncated);
        }

        // Credit always runs before Compute (only its ordering relative to
        // Storage changes with the bounce flag), so the inbound value is
        // already in `account`'s balance by the time Compute fails and this
        // phase runs. The bounced value is leaving via an outbound message,
        // so it must come back out of the balance here or the transaction
        // would double-count it (spec.md §8 property 1).
        let mut new_balance = account.get_balance().cloned().unwrap_or_default();
        new_balance.sub(&bounced_value)?;
        account.set_balance(new_balance);
        Ok((
            TrBouncePhase::ok(StorageUsedShort::calculate_for_struct(&msg)?, mine_fee as u64, remain_fee as u64),
            Some(msg),
        ))
    }
}

fn due_payment_before(account: &Account) -> u64 {
    account.due_payment().map(|g| g.0 as u64).unwrap_or(0)
}

/// Sums time-weighted storage fee over every price bucket overlapping
/// `[since, until)` (spec.md §4.E.1). Buckets are applied in ascending
/// `utime_since` order; each contributes for the portion of the interval it
/// was in effect.
fn accrue_storage_fee(
    prices: &[crate::blockchain_config::StoragePrices],
    cells: u64,
    bits: u64,
    since: u32,
    until: u32,
    is_masterchain: bool,
) -> u128 {
    if until <= since || prices.is_empty() {
        return 0;
    }
    let mut total = 0u128;
    for (i, bucket) in prices.iter().enumerate() {
        let bucket_start = std::cmp::max(bucket.utime_since, since);
        let bucket_end = prices.get(i + 1).map(|n| n.utime_since).unwrap_or(until);
        let bucket_end = std::cmp::min(bucket_end, until);
        if bucket_end <= bucket_start {
            continue;
        }
        let delta = (bucket_end - bucket_start) as u128;
        let (bit_price, cell_price) = if is_masterchain {
            (bucket.mc_bit_price_ps, bucket.mc_cell_price_ps)
        } else {
            (bucket.bit_price_ps, bucket.cell_price_ps)
        };
        let rate = bits as u128 * bit_price as u128 + cells as u128 * cell_price as u128;
        total += (rate * delta) >> 16;
    }
    total
}

enum StateInitCheck {
    Ok(Cell, Cell),
    NoState,
    BadState,
    NotApplicable,
}

fn check_state_init(account: &Account, in_msg: Option<&Message>) -> StateInitCheck {
    let msg = match in_msg {
        Some(m) => m,
        None => return StateInitCheck::NoState,
    };
    match msg.state_init() {
        None => StateInitCheck::NoState,
        Some(state_init) => {
            let hash = state_init.hash().unwrap_or_default();
            if &hash != account.get_addr().map(|a| a.address()).unwrap_or_default() {
                StateInitCheck::BadState
            } else {
                StateInitCheck::Ok(
                    state_init.code.clone().unwrap_or_default(),
                    state_init.data.clone().unwrap_or_default(),
                )
            }
        }
    }
}

/// Why the compute phase never ran (spec.md §4.E.3's `skip_reason`).
pub enum ComputeSkipReason {
    NoState,
    BadState,
    NoGas,
}

trait ComputePhaseSkip {
    fn skipped(reason: ComputeSkipReason) -> Self;
}

impl ComputePhaseSkip for TrComputePhase {
    fn skipped(reason: ComputeSkipReason) -> Self {
        TrComputePhase::Skipped(ton_block::transactions::TrComputePhaseSkipped { reason: reason.into() })
    }
}

impl From<ComputeSkipReason> for ton_block::transactions::ComputeSkipReason {
    fn from(r: ComputeSkipReason) -> Self {
        match r {
            ComputeSkipReason::NoState => ton_block::transactions::ComputeSkipReason::NoState,
            ComputeSkipReason::BadState => ton_block::transactions::ComputeSkipReason::BadState,
            ComputeSkipReason::NoGas => ton_block::transactions::ComputeSkipReason::NoGas,
        }
    }
}

fn build_smart_contract_info(
    account: &Account,
    rand_seed: UInt256,
    now: u32,
    lt: u64,
    is_tock: Option<bool>,
) -> SmartContractInfo {
    let mut sci = SmartContractInfo::default();
    sci.set_unix_time(now);
    sci.set_lt(lt);
    sci.set_rand_seed(rand_seed);
    sci.set_balance(account.get_balance().cloned().unwrap_or_default());
    sci.set_tock(is_tock.unwrap_or(false));
    sci
}

enum ParsedAction {
    Send { mode: u8, msg: Message },
    Reserve { mode: u8, value: CurrencyCollection },
    SetCode { code: Cell },
    ChangeLibrary { mode: u8, lib: Option<Cell> },
}

fn parse_action_list(cell: Cell) -> Result<Vec<ParsedAction>> {
    let actions = OutActions::construct_from(&mut SliceData::from(cell))?;
    let mut out = Vec::with_capacity(actions.len());
    for action in actions.iter() {
        match action {
            OutAction::SendMsg { mode, out_msg } => out.push(ParsedAction::Send { mode: *mode, msg: (**out_msg).clone() }),
            OutAction::ReserveCurrency { mode, value } => out.push(ParsedAction::Reserve { mode: *mode, value: value.clone() }),
            OutAction::SetCode { new_code } => out.push(ParsedAction::SetCode { code: new_code.clone() }),
            OutAction::ChangeLibrary { mode, lib } => out.push(ParsedAction::ChangeLibrary { mode: *mode, lib: lib.clone() }),
            _ => {}
        }
    }
    Ok(out)
}

fn apply_reserve(
    mode: u8,
    value: &CurrencyCollection,
    balance: &CurrencyCollection,
    prior_reserved: &CurrencyCollection,
) -> Result<CurrencyCollection> {
    let available = {
        let mut b = balance.clone();
        b.sub(prior_reserved)?;
        b
    };
    let reverse = mode & RESERVE_REVERSE != 0;
    let all_but = mode & RESERVE_ALL_BUT != 0;
    let plus_balance = mode & RESERVE_PLUS_ORIG != 0;

    let mut target = value.clone();
    if plus_balance {
        target.add(balance)?;
    }
    let reserved = if all_but {
        let mut r = available.clone();
        r.sub(&target)?;
        r
    } else if reverse {
        if target.grams.0 > available.grams.0 { available.clone() } else { target }
    } else {
        if target.grams.0 > available.grams.0 {
            fail!(ExecutorError::TrExecutorError("reserve exceeds available balance".to_string()));
        }
        target
    };
    Ok(reserved)
}

fn finish_failed_action_phase(mut phase: TrActionPhase) -> ActionPhaseResult {
    phase.valid = true;
    ActionPhaseResult { phase, out_msgs: Vec::new(), new_code: None }
}

fn msg_value(msg: &Message) -> CurrencyCollection {
    match msg.header() {
        CommonMsgInfo::IntMsgInfo(h) => h.value.clone(),
        _ => CurrencyCollection::default(),
    }
}

fn set_msg_value(msg: &mut Message, value: CurrencyCollection) {
    if let CommonMsgInfo::IntMsgInfo(h) = msg.header_mut() {
        h.value = value;
    }
}

fn set_msg_fwd_fee(msg: &mut Message, fee: u64) {
    if let CommonMsgInfo::IntMsgInfo(h) = msg.header_mut() {
        h.fwd_fee = fee.into();
    }
}

fn subtract_fee(value: &CurrencyCollection, fee: u128) -> CurrencyCollection {
    let mut v = value.clone();
    v.grams = Grams::from(v.grams.0.saturating_sub(fee));
    v
}

fn estimate_msg_size(msg: &Message, _value: &CurrencyCollection) -> (u64, u64) {
    let used = StorageUsedShort::calculate_for_struct(msg).unwrap_or_default();
    (used.cells.0, used.bits.0)
}

fn truncate_slice(slice: SliceData, max_bits: usize) -> SliceData {
    if slice.remaining_bits() <= max_bits {
        slice
    } else {
        let mut builder = BuilderData::new();
        let mut s = slice;
        let _ = s.shrink_data(0..max_bits);
        builder.append_bits(s.get_bytestring(0).as_slice(), max_bits).ok();
        SliceData::from(builder)
    }
}

pub(crate) fn new_lt(last_tr_lt: &Arc<AtomicU64>) -> u64 {
    last_tr_lt.load(Ordering::Relaxed)
}

pub(crate) fn advance_lt(last_tr_lt: &Arc<AtomicU64>, by: u64) -> u64 {
    last_tr_lt.fetch_add(by, Ordering::SeqCst) + by
}
