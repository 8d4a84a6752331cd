use alloy::{
    eips::BlockNumberOrTag,
    primitives::{Address, B256, Bytes, U256, address},
};
use quai_portfolio::{
    error::ClientError,
    testing::MockUpstream,
    types::{PriorityFee, TransactionRequest},
};
use serde_json::json;

const ALICE: Address = address!("0x0042000000000000000000000000000000000a11");
const BOB: Address = address!("0x0042000000000000000000000000000000000b0b");

/// Tests typed node queries, including `0x` quantities.
#[tokio::test]
async fn test_typed_queries() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.rpc_result("quai_getBalance", json!("0xde0b6b3a7640000"));
    upstream.rpc_result("quai_blockNumber", json!("0x1b4"));
    upstream.rpc_result(
        "quai_getBlockByNumber",
        json!({"number": "0x1b4", "hash": "0xaa", "timestamp": "0x64", "transactions": []}),
    );
    upstream.rpc_result("quai_getTransactionReceipt", json!(null));
    let rpc = upstream.rpc();

    let balance = rpc.get_balance(ALICE, BlockNumberOrTag::Latest).await.unwrap();
    assert_eq!(balance, U256::from(10u64.pow(18)));
    assert_eq!(rpc.block_number().await.unwrap(), 436);

    let block = rpc
        .get_block_by_number(BlockNumberOrTag::Latest, false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(block.number(), Some(436));
    assert_eq!(block.timestamp(), Some(100));

    let receipt = rpc.get_transaction_receipt(B256::ZERO).await.unwrap();
    assert!(receipt.is_none());

    assert_eq!(upstream.hits("quai_getBalance"), 1);
}

/// Tests the fee estimate when the node reports every component.
#[tokio::test]
async fn test_gas_estimate() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.rpc_result("quai_estimateGas", json!("0x5208"));
    upstream.rpc_result("quai_gasPrice", json!("0x77359400"));
    upstream.rpc_result("quai_maxPriorityFeePerGas", json!("0x3b9aca00"));
    let rpc = upstream.rpc();

    let tx = TransactionRequest::transfer(ALICE, BOB, U256::from(1));
    let estimate = rpc.gas_estimate(&tx).await.unwrap();
    assert_eq!(estimate.gas_limit, U256::from(21_000));
    assert_eq!(estimate.gas_price, U256::from(2_000_000_000u64));
    assert_eq!(estimate.total_cost_wei, U256::from(42_000_000_000_000u64));
    assert_eq!(estimate.priority_fee, PriorityFee::Reported(U256::from(1_000_000_000u64)));
    assert!(estimate.fee_reported());
}

/// Tests that a node without `maxPriorityFeePerGas` degrades to zero visibly.
#[tokio::test]
async fn test_missing_priority_fee_method() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.rpc_result("quai_blockNumber", json!("0x10"));
    upstream.rpc_result("quai_gasPrice", json!("0x3b9aca00"));
    let rpc = upstream.rpc();

    assert_eq!(
        rpc.max_priority_fee_per_gas().await.unwrap(),
        PriorityFee::Unsupported
    );

    let status = rpc.network_status().await.unwrap();
    assert_eq!(status.block_number, 16);
    assert_eq!(status.gas_price_gwei(), 1.0);
    assert_eq!(status.priority_fee_gwei(), 0.0);
    assert!(!status.priority_fee.is_reported());
}

/// Tests error classification of node failures.
#[tokio::test]
async fn test_node_errors() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.rpc_error("quai_sendRawTransaction", -32000, "nonce too low");
    upstream.rpc_status("quai_gasPrice", 429);
    let rpc = upstream.rpc();

    let err = rpc
        .send_raw_transaction(&Bytes::from_static(&[0x02, 0xf8]))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Rpc { code: -32000, ref message } if message == "nonce too low"));

    let err = rpc.gas_price().await.unwrap_err();
    assert_eq!(err.status(), Some(429));

    let err = rpc.invoke::<serde_json::Value>("quai_unknownMethod", vec![]).await.unwrap_err();
    assert!(matches!(err, ClientError::MethodNotSupported(_)));
}
