mod exchange_rate_sample;
mod sui_system_state;
mod sync_cursor;
mod validator_snapshot;

pub use exchange_rate_sample::ExchangeRateSample;
pub use sui_system_state::{
    DynamicFieldPage, PoolTokenExchangeRate, SuiSystemStateSummary, SuiValidatorSummary,
    ValidatorsApy,
};
pub use sync_cursor::SyncCursor;
pub use validator_snapshot::ValidatorSnapshot;
