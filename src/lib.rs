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

//! Deterministic replayer for TON-family ordinary and tick/tock
//! transactions: given an account state, an inbound message (or none, for
//! tick/tock) and a blockchain configuration, runs the same phase pipeline
//! the network itself runs (storage, credit, compute, action, bounce) and
//! returns the resulting transaction together with the updated account.

pub mod blockchain_config;
pub mod error;
pub mod ordinary_transaction;
pub mod replay;
pub mod tick_tock_transaction;
pub mod transaction_executor;
pub mod vmsetup;

pub use blockchain_config::BlockchainConfig;
pub use error::ExecutorError;
pub use ordinary_transaction::OrdinaryTransactionExecutor;
pub use replay::{replay_ordinary, replay_ticktock, RuntimeContext};
pub use tick_tock_transaction::{TickTock, TickTockTransactionExecutor};
pub use transaction_executor::TransactionExecutor;

#[cfg(test)]
mod tests;
