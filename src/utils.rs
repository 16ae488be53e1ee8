//! Display-token minting for orders and receipts

use time::OffsetDateTime;
use uuid::Uuid;

/// `<prefix>-<unix millis>-<6 uppercase hex>`, e.g. `ORD-1735689600000-3FA2C1`
pub fn generate_order_number(prefix: &str, now: OffsetDateTime) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    format!("{}-{}-{}", prefix, millis, random_hex(6))
}

/// `<prefix>-<YYYYMMDD>-<8 uppercase hex>`, minted when a cashier validates an order
pub fn generate_receipt_number(prefix: &str, now: OffsetDateTime) -> String {
    format!(
        "{}-{:04}{:02}{:02}-{}",
        prefix,
        now.year(),
        u8::from(now.month()),
        now.day(),
        random_hex(8)
    )
}

fn random_hex(len: usize) -> String {
    let mut hex = Uuid::new_v4().simple().to_string();
    hex.truncate(len);
    hex.to_uppercase()
}
