//! Tests for the orchestration flows
//!
//! Each flow is driven against a fake chain so the full path (policy
//! checks, nonce allocation, signing, broadcast, ledger writes) runs
//! without a node.

use crate::chain::{ChainError, ChainRpc};
use crate::codec;
use crate::custodian::KeyCustodian;
use crate::flows::{FundFlow, NonceRepair, PendingReconciler, RelayFlow};
use crate::store::{NonceAllocator, TransactionLedger, test_pool};
use crate::{FlowError, ReconcileOutcome, TxParams};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    Address, Bytes, H256, Signature, TransactionReceipt, TransactionRequest, U256,
};
use ethers::utils::hex;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory chain double. Balances, receipts and the broadcast result
/// are fixed up front; broadcasts are recorded for inspection.
struct FakeChain {
    network: String,
    chain_id: u64,
    gas_price: U256,
    balances: HashMap<Address, U256>,
    tx_count: U256,
    receipts: HashMap<H256, TransactionReceipt>,
    broadcast_hash: H256,
    broadcasts: Mutex<Vec<Bytes>>,
}

impl FakeChain {
    fn new() -> Self {
        Self {
            network: "testnet".to_string(),
            chain_id: 4,
            gas_price: U256::from(1_000_000_000u64),
            balances: HashMap::new(),
            tx_count: U256::zero(),
            receipts: HashMap::new(),
            broadcast_hash: H256::repeat_byte(7),
            broadcasts: Mutex::new(Vec::new()),
        }
    }

    fn sent(&self) -> Vec<Bytes> {
        self.broadcasts.lock().unwrap().clone()
    }
}

impl ChainRpc for FakeChain {
    fn network(&self) -> &str {
        &self.network
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn get_balance(&self, address: Address) -> Result<U256, ChainError> {
        Ok(self.balances.get(&address).copied().unwrap_or_default())
    }

    async fn get_gas_price(&self) -> U256 {
        self.gas_price
    }

    async fn get_transaction_count(&self, _address: Address) -> Result<U256, ChainError> {
        Ok(self.tx_count)
    }

    async fn estimate_gas(&self, _tx: &TypedTransaction) -> U256 {
        U256::from(21_000)
    }

    async fn broadcast(&self, raw: Bytes) -> Result<H256, ChainError> {
        self.broadcasts.lock().unwrap().push(raw);
        Ok(self.broadcast_hash)
    }

    async fn get_receipt(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>, ChainError> {
        Ok(self.receipts.get(&tx_hash).cloned())
    }
}

const CUSTODIAN_PHRASE: &str =
    "test test test test test test test test test test test junk";

fn custodian() -> Arc<KeyCustodian> {
    Arc::new(KeyCustodian::from_seed_phrase(CUSTODIAN_PHRASE).unwrap())
}

fn user_wallet() -> LocalWallet {
    "380eb0f3d505f087e438eca80bc4df9a7faa24f868e69fc0440261a0fc0567dc"
        .parse::<LocalWallet>()
        .unwrap()
        .with_chain_id(4u64)
}

/// A signed candidate transaction with the given gas price, as hex.
fn candidate_tx_hex(wallet: &LocalWallet, gas_price: u64) -> String {
    let tx: TypedTransaction = TransactionRequest::new()
        .to("0x4444444444444444444444444444444444444444"
            .parse::<Address>()
            .unwrap())
        .value(0u64)
        .gas(21_000u64)
        .gas_price(gas_price)
        .nonce(0u64)
        .chain_id(4u64)
        .into();
    let sig = wallet.sign_transaction_sync(&tx).unwrap();
    hex::encode(tx.rlp_signed(&sig))
}

fn params() -> TxParams {
    TxParams {
        to: None,
        value: U256::zero(),
        gas_price: U256::zero(),
        gas_limit: U256::zero(),
        nonce: U256::zero(),
        data: Default::default(),
    }
}

#[tokio::test]
async fn fund_flow_funds_an_empty_sender() {
    let pool = test_pool().await;
    let chain = Arc::new(FakeChain::new());
    let ledger = TransactionLedger::new(pool.clone());
    let nonces = NonceAllocator::new(pool);
    let custodian = custodian();

    let wallet = user_wallet();
    // gasPrice 20 Gwei against a 1 Gwei market: within the 50x ceiling
    let candidate = candidate_tx_hex(&wallet, 20_000_000_000);

    let flow = FundFlow::new(chain.clone(), custodian.clone(), nonces.clone(), ledger.clone());
    let tx_hash = flow.execute(&candidate).await.unwrap();
    assert_eq!(tx_hash, H256::repeat_byte(7));

    // One funding transaction went out, topped up to 1.5x the required
    // cost: 20e9 * 21000 * 3 / 2
    let sent = chain.sent();
    assert_eq!(sent.len(), 1);
    let (funding, sig) = codec::decode_signed_bytes(&sent[0]).unwrap();
    let expected = U256::from(20_000_000_000u64) * U256::from(21_000) * U256::from(3)
        / U256::from(2);
    assert_eq!(funding.value().copied(), Some(expected));
    assert_eq!(
        funding.to().and_then(|t| t.as_address()).copied(),
        Some(wallet.address())
    );
    assert_eq!(
        codec::recover_sender(&funding, &sig).unwrap(),
        custodian.address()
    );

    // The ledger gained one pending record and a nonce was consumed
    let pending = ledger.list_pending("testnet", 3600).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].tx_hash, tx_hash);
    assert_eq!(
        nonces.read(custodian.address(), "testnet").await.unwrap(),
        Some(0)
    );
}

#[tokio::test]
async fn fund_flow_rejects_an_abusive_gas_price() {
    let pool = test_pool().await;
    let chain = Arc::new(FakeChain::new());
    let ledger = TransactionLedger::new(pool.clone());
    let nonces = NonceAllocator::new(pool);
    let custodian = custodian();

    // 51 Gwei against a 1 Gwei market: above the 50x ceiling
    let candidate = candidate_tx_hex(&user_wallet(), 51_000_000_000);

    let flow = FundFlow::new(chain.clone(), custodian.clone(), nonces.clone(), ledger.clone());
    let err = flow.execute(&candidate).await.unwrap_err();
    assert!(matches!(err, FlowError::PolicyRejection(_)));

    // Nothing was broadcast, recorded or allocated
    assert!(chain.sent().is_empty());
    assert!(ledger.list_pending("testnet", 3600).await.unwrap().is_empty());
    assert_eq!(
        nonces.read(custodian.address(), "testnet").await.unwrap(),
        None
    );
}

#[tokio::test]
async fn fund_flow_refuses_a_funded_sender() {
    let pool = test_pool().await;
    let wallet = user_wallet();

    let mut chain = FakeChain::new();
    // Well above required * 1.05
    chain
        .balances
        .insert(wallet.address(), U256::from(10).pow(U256::from(18)));
    let chain = Arc::new(chain);

    let ledger = TransactionLedger::new(pool.clone());
    let nonces = NonceAllocator::new(pool);

    let candidate = candidate_tx_hex(&wallet, 20_000_000_000);
    let flow = FundFlow::new(chain.clone(), custodian(), nonces, ledger);
    let err = flow.execute(&candidate).await.unwrap_err();

    assert!(matches!(err, FlowError::PolicyRejection(_)));
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn fund_flow_rejects_undecodable_input() {
    let pool = test_pool().await;
    let chain = Arc::new(FakeChain::new());
    let flow = FundFlow::new(
        chain,
        custodian(),
        NonceAllocator::new(pool.clone()),
        TransactionLedger::new(pool),
    );

    let err = flow.execute("0xdeadbeef").await.unwrap_err();
    assert!(matches!(err, FlowError::Validation(_)));
}

#[tokio::test]
async fn relay_flow_relays_a_valid_meta_tx() {
    let pool = test_pool().await;
    let chain = Arc::new(FakeChain::new());
    let ledger = TransactionLedger::new(pool.clone());
    let nonces = NonceAllocator::new(pool);
    let custodian = custodian();

    let destination: Address = "0x5555555555555555555555555555555555555555".parse().unwrap();
    let meta_tx: TypedTransaction = TransactionRequest::new()
        .to(destination)
        .value(0u64)
        .gas(90_000u64)
        .gas_price(2_000_000_000u64)
        .nonce(3u64)
        .chain_id(4u64)
        .data(vec![0xab, 0xcd])
        .into();
    let sig = user_wallet().sign_transaction_sync(&meta_tx).unwrap();
    let meta_hex = hex::encode(meta_tx.rlp_signed(&sig));

    let flow = RelayFlow::new(chain.clone(), custodian.clone(), nonces.clone(), ledger.clone());
    let tx_hash = flow.execute(&meta_hex).await.unwrap();
    assert_eq!(tx_hash, H256::repeat_byte(7));

    // The relayed transaction keeps the destination and calldata but is
    // signed by the custodial key with a freshly allocated nonce
    let sent = chain.sent();
    assert_eq!(sent.len(), 1);
    let (relayed, relayed_sig) = codec::decode_signed_bytes(&sent[0]).unwrap();
    assert_eq!(
        relayed.to().and_then(|t| t.as_address()).copied(),
        Some(destination)
    );
    assert_eq!(
        relayed.data().cloned(),
        Some(Bytes::from(vec![0xab, 0xcd]))
    );
    assert_eq!(relayed.nonce().copied(), Some(U256::zero()));
    assert_eq!(
        codec::recover_sender(&relayed, &relayed_sig).unwrap(),
        custodian.address()
    );

    assert_eq!(ledger.list_pending("testnet", 3600).await.unwrap().len(), 1);
}

#[tokio::test]
async fn relay_flow_rejects_a_bad_signature_before_allocating() {
    let pool = test_pool().await;
    let chain = Arc::new(FakeChain::new());
    let ledger = TransactionLedger::new(pool.clone());
    let nonces = NonceAllocator::new(pool);
    let custodian = custodian();

    let meta_tx: TypedTransaction = TransactionRequest::new()
        .to("0x5555555555555555555555555555555555555555"
            .parse::<Address>()
            .unwrap())
        .gas(90_000u64)
        .gas_price(2_000_000_000u64)
        .nonce(3u64)
        .chain_id(4u64)
        .into();
    let sig = user_wallet().sign_transaction_sync(&meta_tx).unwrap();
    let forged = Signature {
        r: sig.r,
        s: U256::zero(),
        v: sig.v,
    };
    let meta_hex = hex::encode(meta_tx.rlp_signed(&forged));

    let flow = RelayFlow::new(chain.clone(), custodian.clone(), nonces.clone(), ledger.clone());
    let err = flow.execute(&meta_hex).await.unwrap_err();
    assert!(matches!(err, FlowError::AuthFailure));

    // The rejection happened before any nonce was consumed or anything
    // was broadcast
    assert_eq!(
        nonces.read(custodian.address(), "testnet").await.unwrap(),
        None
    );
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn pending_reconciler_settles_mined_transactions() {
    let pool = test_pool().await;
    let ledger = TransactionLedger::new(pool);

    let mined = H256::repeat_byte(1);
    let unmined = H256::repeat_byte(2);
    ledger.store(mined, "testnet", &params()).await.unwrap();
    ledger.store(unmined, "testnet", &params()).await.unwrap();

    let mut chain = FakeChain::new();
    chain.receipts.insert(
        mined,
        TransactionReceipt {
            transaction_hash: mined,
            ..Default::default()
        },
    );
    let chain = Arc::new(chain);

    let reconciler = PendingReconciler::new(chain, ledger.clone());
    let report = reconciler.execute(3600).await.unwrap();
    assert_eq!(report.checked, 2);
    assert_eq!(report.updated, 1);

    // Only the unmined record is still pending
    let pending = ledger.list_pending("testnet", 3600).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].tx_hash, unmined);

    // A second sweep finds nothing new
    let report = reconciler.execute(3600).await.unwrap();
    assert_eq!(report.checked, 1);
    assert_eq!(report.updated, 0);
}

#[tokio::test]
async fn nonce_repair_rolls_back_an_overcounted_store() {
    let pool = test_pool().await;
    let nonces = NonceAllocator::new(pool);
    let custodian = custodian();

    // Local counter reaches 4 but the chain only ever saw 3 transactions
    for _ in 0..5 {
        nonces.allocate(custodian.address(), "testnet").await.unwrap();
    }
    let mut chain = FakeChain::new();
    chain.tx_count = U256::from(3);
    let chain = Arc::new(chain);

    let repair = NonceRepair::new(chain, custodian.clone(), nonces.clone());
    let outcome = repair.execute().await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::RolledBack { to: 2 });

    // The next allocation reissues the first nonce the chain never saw
    assert_eq!(
        nonces.allocate(custodian.address(), "testnet").await.unwrap(),
        3
    );
}

#[tokio::test]
async fn nonce_repair_resets_for_a_fresh_chain_account() {
    let pool = test_pool().await;
    let nonces = NonceAllocator::new(pool);
    let custodian = custodian();

    for _ in 0..3 {
        nonces.allocate(custodian.address(), "testnet").await.unwrap();
    }
    let chain = Arc::new(FakeChain::new()); // tx_count = 0

    let repair = NonceRepair::new(chain, custodian.clone(), nonces.clone());
    let outcome = repair.execute().await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::ResetToZero);
    assert_eq!(
        nonces.read(custodian.address(), "testnet").await.unwrap(),
        Some(0)
    );
}
