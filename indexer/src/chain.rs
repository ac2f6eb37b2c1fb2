use async_trait::async_trait;
use ethers::{
    contract::{abigen, EthLogDecode},
    core::types::{Address, Filter, Log},
    providers::{Http, Middleware, Provider},
};
use eyre::Result;
use serde_json::{json, Value};
use tracing::{debug, warn};

abigen!(
    VenueRegistry,
    r#"[
        event VenueRegistered(uint256 indexed venueId, address indexed submitter, string name, string city, string ipfsHash)
        event VenueVerified(uint256 indexed venueId, address indexed verifier)
    ]"#,
);

/// A decoded registry log, ready to be stored in `venue_chain_event`
#[derive(Debug, Clone, PartialEq)]
pub struct ChainEvent {
    pub contract_address: String,
    pub event_name: &'static str,
    pub block_number: u64,
    pub block_hash: String,
    pub tx_hash: String,
    pub log_index: u64,
    pub payload: Value,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Latest block number known to the node
    async fn head(&self) -> Result<u64>;

    /// Canonical hash of `block`, `None` when the node does not have it
    async fn block_hash(&self, block: u64) -> Result<Option<String>>;

    /// Registry events in `from..=to`, in log order
    async fn events(&self, from: u64, to: u64) -> Result<Vec<ChainEvent>>;
}

pub struct RpcChainSource {
    provider: Provider<Http>,
    contract: Address,
}

impl RpcChainSource {
    pub fn new(rpc_url: &str, contract: Address) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)?;
        Ok(Self { provider, contract })
    }

    pub async fn chain_id(&self) -> Result<u64> {
        Ok(self.provider.get_chainid().await?.as_u64())
    }
}

#[async_trait]
impl ChainSource for RpcChainSource {
    async fn head(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?.as_u64())
    }

    async fn block_hash(&self, block: u64) -> Result<Option<String>> {
        let block = self.provider.get_block(block).await?;
        Ok(block.and_then(|b| b.hash).map(|hash| format!("{:#x}", hash)))
    }

    async fn events(&self, from: u64, to: u64) -> Result<Vec<ChainEvent>> {
        let filter = Filter::new()
            .address(self.contract)
            .from_block(from)
            .to_block(to);

        let logs = self.provider.get_logs(&filter).await.map_err(|err| {
            eyre::eyre!("Failed to query registry logs from block {} to {}: {:?}", from, to, err)
        })?;

        Ok(logs.into_iter().filter_map(decode_venue_log).collect())
    }
}

/// Decode a registry log. Unknown events and logs without block metadata
/// (still pending) are skipped.
pub fn decode_venue_log(log: Log) -> Option<ChainEvent> {
    let (Some(block_number), Some(block_hash), Some(tx_hash), Some(log_index)) =
        (log.block_number, log.block_hash, log.transaction_hash, log.log_index)
    else {
        warn!(address = ?log.address, "Skipping log without block metadata");
        return None;
    };
    let contract_address = format!("{:#x}", log.address);

    let (event_name, payload) = match VenueRegistryEvents::decode_log(&log.into()) {
        Ok(VenueRegistryEvents::VenueRegisteredFilter(event)) => (
            "VenueRegistered",
            json!({
                "type": "VenueRegistered",
                "venueId": event.venue_id.to_string(),
                "submitter": format!("{:#x}", event.submitter),
                "name": event.name,
                "city": event.city,
                "ipfsHash": event.ipfs_hash,
            }),
        ),
        Ok(VenueRegistryEvents::VenueVerifiedFilter(event)) => (
            "VenueVerified",
            json!({
                "type": "VenueVerified",
                "venueId": event.venue_id.to_string(),
                "verifier": format!("{:#x}", event.verifier),
            }),
        ),
        Err(_) => {
            debug!(tx_hash = ?tx_hash, "Skipping unrecognized registry log");
            return None;
        }
    };

    Some(ChainEvent {
        contract_address,
        event_name,
        block_number: block_number.as_u64(),
        block_hash: format!("{:#x}", block_hash),
        tx_hash: format!("{:#x}", tx_hash),
        log_index: log_index.as_u64(),
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::{encode, Token};
    use ethers::contract::EthEvent;
    use ethers::core::types::{Bytes, H256, U256, U64};
    use pretty_assertions::assert_eq;

    const REGISTRY: &str = "0x00000000000000000000000000000000000000aa";
    const SUBMITTER: &str = "0x00000000000000000000000000000000000000bb";

    fn log_with(topics: Vec<H256>, data: Vec<u8>) -> Log {
        Log {
            address: REGISTRY.parse().unwrap(),
            topics,
            data: Bytes::from(data),
            block_hash: Some(H256::repeat_byte(0x11)),
            block_number: Some(U64::from(120)),
            transaction_hash: Some(H256::repeat_byte(0x22)),
            log_index: Some(U256::from(3)),
            ..Default::default()
        }
    }

    fn address_topic(address: &str) -> H256 {
        H256::from(address.parse::<Address>().unwrap())
    }

    #[test]
    fn test_decode_venue_registered() {
        let data = encode(&[
            Token::String("Blue Keys".to_string()),
            Token::String("Lisbon".to_string()),
            Token::String("QmHash".to_string()),
        ]);
        let log = log_with(
            vec![
                VenueRegisteredFilter::signature(),
                H256::from_low_u64_be(7),
                address_topic(SUBMITTER),
            ],
            data,
        );

        let event = decode_venue_log(log).unwrap();

        assert_eq!(event.event_name, "VenueRegistered");
        assert_eq!(event.block_number, 120);
        assert_eq!(event.log_index, 3);
        assert_eq!(event.contract_address, REGISTRY);
        assert_eq!(event.tx_hash, format!("{:#x}", H256::repeat_byte(0x22)));
        assert_eq!(
            event.payload,
            json!({
                "type": "VenueRegistered",
                "venueId": "7",
                "submitter": SUBMITTER,
                "name": "Blue Keys",
                "city": "Lisbon",
                "ipfsHash": "QmHash"
            })
        );
    }

    #[test]
    fn test_decode_venue_verified() {
        let verifier = "0x00000000000000000000000000000000000000CC";
        let log = log_with(
            vec![
                VenueVerifiedFilter::signature(),
                H256::from_low_u64_be(7),
                address_topic(verifier),
            ],
            vec![],
        );

        let event = decode_venue_log(log).unwrap();

        assert_eq!(
            event.payload,
            json!({"type": "VenueVerified", "venueId": "7", "verifier": verifier.to_lowercase()})
        );
    }

    #[test]
    fn test_unknown_and_pending_logs_are_skipped() {
        let unknown = log_with(vec![H256::repeat_byte(0x99)], vec![]);
        assert_eq!(decode_venue_log(unknown), None);

        let mut pending = log_with(
            vec![
                VenueVerifiedFilter::signature(),
                H256::from_low_u64_be(1),
                address_topic(SUBMITTER),
            ],
            vec![],
        );
        pending.block_hash = None;
        assert_eq!(decode_venue_log(pending), None);
    }
}
