use crate::constants;

/// Validate Ethereum address format
pub fn is_valid_address(address: &str) -> bool {
    if !address.starts_with("0x") {
        return false;
    }

    if address.len() != 42 {
        return false;
    }

    let hex_part = &address[2..];
    hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

/// Validate transaction hash format
pub fn is_valid_tx_hash(hash: &str) -> bool {
    hash.len() == 66 && hash.starts_with("0x")
}

/// Check whether the chain is one this engine can quote on
pub fn is_supported_chain(chain_id: u64) -> bool {
    constants::SUPPORTED_CHAINS.contains(&chain_id)
}

/// Check slippage stays inside the sane range
pub fn is_valid_slippage_bps(slippage_bps: u32) -> bool {
    slippage_bps > 0 && slippage_bps <= constants::MAX_SLIPPAGE_BPS
}
