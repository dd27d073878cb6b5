use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::Log;
use alloy::sol;
use alloy::sol_types::SolEvent;

// ERC-20 and ERC-721 share the Transfer signature; they differ in whether the
// third argument is indexed (4 topics) or carried in data (3 topics).
sol! {
    event Transfer(address indexed from, address indexed to, uint256 value);
}

/// A decoded Transfer log, before block metadata is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTransfer {
    pub from: Address,
    pub to: Address,
    /// Token amount (ERC-20) or token id (ERC-721).
    pub value: U256,
    pub block_number: u64,
    pub block_timestamp: Option<u64>,
    pub tx_hash: B256,
    pub log_index: u64,
}

/// Topic filter value for an address argument.
pub fn address_topic(address: Address) -> B256 {
    address.into_word()
}

/// Topic filter value for an indexed uint256 argument.
pub fn uint_topic(value: U256) -> B256 {
    B256::from(value.to_be_bytes::<32>())
}

/// Decode an ERC-20 `Transfer(from, to, value)` log.
///
/// Returns `None` for anything that is not a 3-topic Transfer with a 32-byte payload.
pub fn decode_erc20_transfer(log: &Log) -> Option<DecodedTransfer> {
    let topics = log.inner.data.topics();
    if topics.len() != 3 || topics[0] != Transfer::SIGNATURE_HASH {
        return None;
    }

    let data = log.inner.data.data.as_ref();
    if data.len() < 32 {
        return None;
    }

    Some(DecodedTransfer {
        from: Address::from_word(topics[1]),
        to: Address::from_word(topics[2]),
        value: U256::from_be_slice(&data[..32]),
        block_number: log.block_number?,
        block_timestamp: log.block_timestamp,
        tx_hash: log.transaction_hash.unwrap_or_default(),
        log_index: log.log_index.unwrap_or(0),
    })
}

/// Decode an ERC-721 `Transfer(from, to, tokenId)` log with all three arguments indexed.
pub fn decode_erc721_transfer(log: &Log) -> Option<DecodedTransfer> {
    let topics = log.inner.data.topics();
    if topics.len() != 4 || topics[0] != Transfer::SIGNATURE_HASH {
        return None;
    }

    Some(DecodedTransfer {
        from: Address::from_word(topics[1]),
        to: Address::from_word(topics[2]),
        value: U256::from_be_bytes(topics[3].0),
        block_number: log.block_number?,
        block_timestamp: log.block_timestamp,
        tx_hash: log.transaction_hash.unwrap_or_default(),
        log_index: log.log_index.unwrap_or(0),
    })
}
