//! Scenario files: an ordered list of invocations to run against a fresh
//! deployment, each optionally expected to fail with a given error kind.
//!
//! ```toml
//! name = "round trip"
//!
//! [[steps]]
//! from = "owner"
//! op = "mint"
//! to = "alice"
//! amount = "100 geo"
//!
//! [[steps]]
//! from = "bob"
//! op = "delete_geon"
//! id = "0x01"
//! expect = "Unauthorized"
//! ```
//!
//! Accounts are labels (derived with [`Address::derive`]) or `0x` hex.
//! Geon and request ids are decimal or `0x` hex integers.

use std::path::Path;

use anyhow::{anyhow, Context};
use geon_registry::CallOutput;
use geon_runtime::{CustodyAudit, InvocationError, Runtime};
use geon_types::{Address, Amount, ErrorKind, GeonId, RequestId};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
pub struct Step {
    /// Caller of the invocation.
    pub from: String,
    /// Error kind the step must fail with; absent means it must succeed.
    #[serde(default)]
    pub expect: Option<String>,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    Mint { to: String, amount: Amount },
    Transfer { to: String, amount: Amount },
    BalanceOf { account: String },
    TransferToGeon { id: String, amount: Amount },
    TransferToGeons { ids: Vec<String>, amounts: Vec<Amount> },
    UpdateGeonTopupAddress { address: String },
    CreateGeon { id: String },
    CreateGeons { ids: Vec<String> },
    GetGeon { id: String },
    GeonCount,
    DeleteGeon { id: String },
    IncreaseGeonBalance { id: String, amount: Amount },
    SetGeominingReward {
        id: String,
        geominer: String,
        request: String,
        amount: Amount,
    },
    GetGeominingReward {
        id: String,
        geominer: String,
        request: String,
    },
    Geomine { id: String, request: String },
    UpdateRewardToken { address: String },
    UpdateStorage { address: String },
    AddWhitelisted { account: String },
    RemoveWhitelisted { account: String },
    SendValue { value: Amount },
    /// Raw selector-prefixed input, hex encoded.
    Call {
        input: String,
        #[serde(default)]
        value: Amount,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mint { .. } => "mint",
            Self::Transfer { .. } => "transfer",
            Self::BalanceOf { .. } => "balance_of",
            Self::TransferToGeon { .. } => "transfer_to_geon",
            Self::TransferToGeons { .. } => "transfer_to_geons",
            Self::UpdateGeonTopupAddress { .. } => "update_geon_topup_address",
            Self::CreateGeon { .. } => "create_geon",
            Self::CreateGeons { .. } => "create_geons",
            Self::GetGeon { .. } => "get_geon",
            Self::GeonCount => "geon_count",
            Self::DeleteGeon { .. } => "delete_geon",
            Self::IncreaseGeonBalance { .. } => "increase_geon_balance",
            Self::SetGeominingReward { .. } => "set_geomining_reward",
            Self::GetGeominingReward { .. } => "get_geomining_reward",
            Self::Geomine { .. } => "geomine",
            Self::UpdateRewardToken { .. } => "update_reward_token",
            Self::UpdateStorage { .. } => "update_storage",
            Self::AddWhitelisted { .. } => "add_whitelisted",
            Self::RemoveWhitelisted { .. } => "remove_whitelisted",
            Self::SendValue { .. } => "send_value",
            Self::Call { .. } => "call",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StepError {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub from: String,
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<CallOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    pub passed: bool,
}

#[derive(Debug, Serialize)]
pub struct ScenarioReport {
    pub name: Option<String>,
    pub steps: Vec<StepOutcome>,
    pub audit: CustodyAudit,
    pub passed: bool,
}

impl ScenarioReport {
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|step| !step.passed).count()
    }
}

impl Scenario {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        toml::from_str(input).context("invalid scenario")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let input = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_toml_str(&input).with_context(|| format!("in {}", path.display()))
    }

    /// Run every step in order. Failed invocations are recorded, not fatal;
    /// a step that cannot be resolved (bad account, id, or kind) aborts.
    pub fn run(&self, runtime: &Runtime) -> anyhow::Result<ScenarioReport> {
        let mut steps = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            let outcome = step
                .run(runtime, index)
                .with_context(|| format!("step {} ({})", index + 1, step.action.name()))?;
            steps.push(outcome);
        }
        let audit = runtime.audit()?;
        let passed = steps.iter().all(|step| step.passed) && audit.is_balanced();
        Ok(ScenarioReport {
            name: self.name.clone(),
            steps,
            audit,
            passed,
        })
    }
}

impl Step {
    fn run(&self, runtime: &Runtime, index: usize) -> anyhow::Result<StepOutcome> {
        let caller = account(&self.from)?;
        let expected = self
            .expect
            .as_deref()
            .map(|name| ErrorKind::from_name(name).ok_or_else(|| anyhow!("unknown error kind {name:?}")))
            .transpose()?;

        let result = execute(runtime, caller, &self.action)?;
        debug!(step = index + 1, op = self.action.name(), ok = result.is_ok(), "scenario step");

        let (output, error, passed) = match result {
            Ok(output) => (Some(output), None, expected.is_none()),
            Err(err) => {
                let passed = expected == Some(err.kind());
                let error = StepError {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                };
                (None, Some(error), passed)
            }
        };
        Ok(StepOutcome {
            index: index + 1,
            from: self.from.clone(),
            op: self.action.name(),
            output,
            error,
            expected: expected.map(|kind| kind.to_string()),
            passed,
        })
    }
}

fn execute(
    runtime: &Runtime,
    caller: Address,
    action: &Action,
) -> anyhow::Result<Result<CallOutput, InvocationError>> {
    let unit = |result: Result<(), InvocationError>| result.map(|()| CallOutput::Unit);
    let result = match action {
        Action::Mint { to, amount } => unit(runtime.mint(caller, account(to)?, *amount)),
        Action::Transfer { to, amount } => unit(runtime.transfer(caller, account(to)?, *amount)),
        Action::BalanceOf { account: who } => Ok(CallOutput::Amount(runtime.balance_of(&account(who)?))),
        Action::TransferToGeon { id, amount } => {
            unit(runtime.transfer_to_geon(caller, parse_id(id)?, *amount))
        }
        Action::TransferToGeons { ids, amounts } => {
            let ids = ids
                .iter()
                .map(|id| parse_id(id))
                .collect::<anyhow::Result<Vec<GeonId>>>()?;
            unit(runtime.transfer_to_geons(caller, &ids, amounts))
        }
        Action::UpdateGeonTopupAddress { address } => {
            unit(runtime.update_geon_topup_address(caller, account(address)?))
        }
        Action::CreateGeon { id } => unit(runtime.create_geon(caller, parse_id(id)?)),
        Action::CreateGeons { ids } => {
            let ids = ids
                .iter()
                .map(|id| parse_id(id))
                .collect::<anyhow::Result<Vec<GeonId>>>()?;
            unit(runtime.create_geons(caller, &ids))
        }
        Action::GetGeon { id } => runtime.get_geon(&parse_id(id)?).map(CallOutput::Geon),
        Action::GeonCount => runtime.geon_count().map(CallOutput::Count),
        Action::DeleteGeon { id } => runtime
            .delete_geon(caller, parse_id(id)?)
            .map(CallOutput::Amount),
        Action::IncreaseGeonBalance { id, amount } => {
            unit(runtime.increase_geon_balance(caller, parse_id(id)?, *amount))
        }
        Action::SetGeominingReward {
            id,
            geominer,
            request,
            amount,
        } => unit(runtime.set_geomining_reward(
            caller,
            parse_id(id)?,
            account(geominer)?,
            parse_id::<RequestId>(request)?,
            *amount,
        )),
        Action::GetGeominingReward {
            id,
            geominer,
            request,
        } => runtime
            .get_geomining_reward(
                &parse_id(id)?,
                &account(geominer)?,
                &parse_id::<RequestId>(request)?,
            )
            .map(CallOutput::Amount),
        Action::Geomine { id, request } => runtime
            .geomine(caller, parse_id(id)?, parse_id::<RequestId>(request)?)
            .map(CallOutput::Amount),
        Action::UpdateRewardToken { address } => {
            unit(runtime.update_reward_token(caller, account(address)?))
        }
        Action::UpdateStorage { address } => unit(runtime.update_storage(caller, account(address)?)),
        Action::AddWhitelisted { account: who } => unit(runtime.add_whitelisted(caller, account(who)?)),
        Action::RemoveWhitelisted { account: who } => {
            unit(runtime.remove_whitelisted(caller, account(who)?))
        }
        Action::SendValue { value } => unit(runtime.send_value(caller, *value)),
        Action::Call { input, value } => {
            let digits = input.strip_prefix("0x").unwrap_or(input);
            let bytes = hex::decode(digits).with_context(|| format!("call input {input:?} is not hex"))?;
            runtime.call_registry(caller, *value, &bytes)
        }
    };
    Ok(result)
}

fn account(reference: &str) -> anyhow::Result<Address> {
    Address::resolve(reference).with_context(|| format!("invalid account {reference:?}"))
}

/// Decimal or `0x` hex integer, widened to the 128-bit id.
fn parse_id<T: From<u128>>(input: &str) -> anyhow::Result<T> {
    let trimmed = input.trim();
    let value = match trimmed.strip_prefix("0x") {
        Some(digits) => u128::from_str_radix(digits, 16),
        None => trimmed.parse::<u128>(),
    }
    .with_context(|| format!("invalid id {input:?}"))?;
    Ok(T::from(value))
}
