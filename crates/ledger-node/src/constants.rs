pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";
pub const COINS_UNIT: &str = "Reed coins";
