use super::{ConfigError, Lookup};
use crate::models::Address;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractsConfig {
    pub app_contract_address: Address,
}

impl ContractsConfig {
    pub(super) fn from_lookup(lookup: &Lookup<'_>) -> Result<Self, ConfigError> {
        let raw = lookup("APP_CONTRACT_ADDRESS")
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::Missing("APP_CONTRACT_ADDRESS"))?;

        let app_contract_address = raw.parse().map_err(|source| ConfigError::InvalidAddress {
            var: "APP_CONTRACT_ADDRESS",
            source,
        })?;

        Ok(Self {
            app_contract_address,
        })
    }
}
