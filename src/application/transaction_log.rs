use crate::config::LogConfig;
use crate::domain::gateway::TransactionMode;
use crate::domain::ports::TransactionLogEntry;
use crate::domain::response::GatewayResponse;
use chrono::Utc;

/// What is known about the transaction when a response arrives. The callback
/// path only has the stored session, so most fields are optional.
#[derive(Debug, Clone, Default)]
pub struct LogContext<'a> {
    pub vendor_tx_code: &'a str,
    pub tx_type: Option<&'a str>,
    pub amount: Option<String>,
    pub currency: Option<&'a str>,
    pub card_type: Option<&'a str>,
    pub card_digits: Option<&'a str>,
    pub mode: Option<TransactionMode>,
}

/// Maps a parsed response onto the configured log columns.
pub fn log_entry(
    config: &LogConfig,
    context: &LogContext<'_>,
    response: &GatewayResponse,
) -> TransactionLogEntry {
    let columns = &config.columns;
    let mut entry = TransactionLogEntry::new();
    let mut put = |column: &Option<String>, value: Option<String>| {
        if let (Some(column), Some(value)) = (column.as_ref().filter(|c| !c.is_empty()), value) {
            entry.insert(column.clone(), value);
        }
    };
    let field = |name: &str| response.get(name).map(str::to_string);

    put(&columns.three_d_secure, field("3DSecureStatus"));
    put(&columns.amount, context.amount.clone());
    put(&columns.avs_cv2, field("AVSCV2"));
    put(&columns.card_digits, context.card_digits.map(str::to_string));
    put(
        &columns.card_type,
        context
            .card_type
            .map(|code| config.card_type_map.get(code).cloned().unwrap_or_else(|| code.to_string())),
    );
    put(
        &columns.currency,
        context
            .currency
            .map(|code| config.currency_map.get(code).cloned().unwrap_or_else(|| code.to_string())),
    );
    put(&columns.date, Some(Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()));
    put(
        &columns.mode,
        context.mode.map(|mode| match mode {
            TransactionMode::Live => config.mode_if_live.clone(),
            TransactionMode::Test => config.mode_if_test.clone(),
        }),
    );
    put(&columns.response, field("Status"));
    put(&columns.security_key, field("SecurityKey"));
    put(&columns.status_detail, field("StatusDetail"));
    put(&columns.tx_auth_no, field("TxAuthNo"));
    put(&columns.tx_type, context.tx_type.map(str::to_string));
    put(&columns.vendor_tx_code, Some(context.vendor_tx_code.to_string()));
    put(&columns.vps_tx_id, field("VPSTxId"));

    entry
}
