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

use failure::Fail;

/// Errors raised by the transaction replayer. `ExtMsgImportRejected` is the
/// only variant that a caller should *not* treat as a real failure: it backs
/// the "external-rejected" outcome class, which callers observe as `Ok(None)`
/// from `execute`/`replay_*` rather than as this error (the variant exists so
/// internal call sites can use `?` uniformly and the outer entry points can
/// match on it to flatten into `None`).
#[derive(Debug, Fail)]
pub enum ExecutorError {
    #[fail(display = "External message for account {} was not accepted", account_id)]
    ExtMsgImportRejected { account_id: String },

    #[fail(display = "Transaction executor error: {}", _0)]
    TrExecutorError(String),

    #[fail(display = "No accept was called by contract, smallest gas limit is {}", smallest_gas)]
    NoAcceptError { smallest_gas: u64 },

    #[fail(display = "Required configuration parameter is missing or malformed: {}", param)]
    ConfigFatal { param: String },
}

pub type Result<T> = std::result::Result<T, failure::Error>;
