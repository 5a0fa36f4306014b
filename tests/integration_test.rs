//! Integration Tests - Registry Query Façade End-to-end
//!
//! Drives `RegistryQuery` against a mocked `ChainDataProvider`, feeding
//! it registry-shaped JSON and checking the assembled reports.
//! Uses mockall for trait mocking and tokio::test for async tests.

use std::sync::Arc;

use alloy::primitives::{Address, address};
use mockall::mock;
use serde_json::json;

use defi_registry_reader::config::DecompositionConfig;
use defi_registry_reader::domain::raw::{
    RawFullTokenBalance, RawProtocolBalance, RawProtocolMetadata, RawTokenBalance,
};
use defi_registry_reader::domain::{AdapterType, ReportStatus};
use defi_registry_reader::error::{BalanceError, QueryError};
use defi_registry_reader::usecases::RegistryQuery;

// ---- Mock Definitions ----

mock! {
    pub Registry {}

    #[async_trait::async_trait]
    impl defi_registry_reader::ports::chain_data::ChainDataProvider for Registry {
        async fn protocol_names(&self) -> anyhow::Result<Vec<String>>;
        async fn protocol_metadata(&self, name: &str) -> anyhow::Result<RawProtocolMetadata>;
        async fn protocol_balances(&self, owner: Address, names: &[String])
            -> anyhow::Result<Vec<RawProtocolBalance>>;
        async fn all_balances(&self, owner: Address) -> anyhow::Result<Vec<RawProtocolBalance>>;
        async fn final_full_token_balance(&self, token_type: &str, token: Address)
            -> anyhow::Result<RawFullTokenBalance>;
    }
}

const OWNER: Address = address!("42b9dF65B219B3dD36FF330A4dD8f327A6Ada990");

fn facade(mock: MockRegistry) -> RegistryQuery<MockRegistry> {
    RegistryQuery::new(Arc::new(mock), &DecompositionConfig::default())
}

fn token_json(n: u8, symbol: &str, decimals: Option<i64>, amount: &str) -> serde_json::Value {
    let mut metadata = json!({
        "token": format!("0x{n:040x}"),
        "name": format!("{symbol} token"),
        "symbol": symbol,
    });
    if let Some(decimals) = decimals {
        metadata["decimals"] = json!(decimals);
    }
    json!({ "metadata": metadata, "amount": amount })
}

fn protocol_json(name: &str, adapter_type: &str, balances: serde_json::Value) -> serde_json::Value {
    json!({
        "metadata": {
            "name": name,
            "description": format!("{name} protocol"),
            "websiteURL": format!("{}.example", name.to_lowercase()),
            "iconURL": "",
            "version": 1
        },
        "adapterBalances": [{
            "metadata": { "adapterAddress": format!("0x{:040x}", 0xad), "adapterType": adapter_type },
            "balances": balances
        }]
    })
}

fn aave_and_compound() -> Vec<RawProtocolBalance> {
    serde_json::from_value(json!([
        protocol_json("Aave", "Asset", json!([{
            "base": token_json(1, "aDAI", Some(18), "123456789012345678"),
            "underlying": [token_json(2, "DAI", Some(18), "123456789012345678")]
        }])),
        protocol_json("Compound", "Asset", json!([{
            "base": token_json(3, "cDAI", None, "5000000000"),
            "underlying": []
        }])),
    ]))
    .unwrap()
}

/// A token decomposing `levels` deep, every level worth 1.0 at 6 decimals.
fn nested_token(levels: u8) -> RawFullTokenBalance {
    let mut chain: Vec<RawTokenBalance> = Vec::new();
    for n in (1..=levels).rev() {
        let mut level: RawTokenBalance =
            serde_json::from_value(token_json(n, &format!("L{n}"), Some(6), "1000000")).unwrap();
        level.underlying = chain;
        chain = vec![level];
    }
    RawFullTokenBalance {
        base: Some(serde_json::from_value(token_json(0, "ROOT", Some(18), "1000000000000000000")).unwrap()),
        underlying: chain,
    }
}

// ---- Integration Tests ----

#[tokio::test]
async fn test_malformed_protocol_does_not_block_others() {
    let mut mock = MockRegistry::new();
    mock.expect_protocol_balances()
        .withf(|owner, names| *owner == OWNER && names == ["Aave", "Compound"])
        .times(1)
        .returning(|_, _| Ok(aave_and_compound()));

    let names = vec!["Aave".to_string(), "Compound".to_string()];
    let result = facade(mock).protocol_balances(OWNER, &names).await.unwrap();

    assert_eq!(result.len(), 2);

    let aave = &result[0];
    assert_eq!(aave.metadata.name, "Aave");
    assert!(aave.is_complete());
    let position = &aave.adapter_balances[0].balances[0];
    assert_eq!(position.normalized_amount.to_string(), "0.123456789012345678");
    assert_eq!(position.underlying[0].metadata.symbol, "DAI");

    let compound = &result[1];
    assert_eq!(compound.metadata.name, "Compound");
    let ReportStatus::Failed { error } = &compound.status else {
        panic!("Compound report should be flagged, got {:?}", compound.status);
    };
    assert!(matches!(error, BalanceError::MalformedBalanceRecord { .. }));
    assert_eq!(error.context().protocol.as_deref(), Some("Compound"));
    assert!(error.context().token.is_some());
}

#[tokio::test]
async fn test_mistyped_amount_fails_only_its_protocol() {
    let mut cdai = token_json(3, "cDAI", Some(8), "0");
    cdai["amount"] = json!(-5);
    let mut sdai = token_json(4, "sDAI", None, "1");
    sdai["metadata"]["decimals"] = json!("eighteen");

    let response = json!([
        protocol_json("Aave", "Asset", json!([{
            "base": token_json(1, "aDAI", Some(18), "123456789012345678"),
            "underlying": []
        }])),
        protocol_json("Compound", "Asset", json!([{ "base": cdai, "underlying": [] }])),
        protocol_json("Spark", "Asset", json!([{ "base": sdai, "underlying": [] }])),
    ]);

    let mut mock = MockRegistry::new();
    mock.expect_all_balances()
        .returning(move |_| Ok(serde_json::from_value(response.clone()).unwrap()));

    let result = facade(mock).protocol_balances(OWNER, &[]).await.unwrap();
    assert_eq!(result.len(), 3);
    assert!(result[0].is_complete());
    assert_eq!(
        result[0].adapter_balances[0].balances[0].normalized_amount.to_string(),
        "0.123456789012345678"
    );

    let ReportStatus::Failed { error } = &result[1].status else {
        panic!("Compound report should be flagged, got {:?}", result[1].status);
    };
    assert!(matches!(error, BalanceError::InvalidAmount { value, .. } if value == "-5"));
    assert_eq!(error.context().protocol.as_deref(), Some("Compound"));

    let ReportStatus::Failed { error } = &result[2].status else {
        panic!("Spark report should be flagged, got {:?}", result[2].status);
    };
    assert!(matches!(error, BalanceError::InvalidDecimals { value, .. } if value == "eighteen"));
}

#[tokio::test]
async fn test_protocol_names_are_order_stable() {
    let mut mock = MockRegistry::new();
    mock.expect_protocol_names().times(2).returning(|| {
        Ok(vec![
            "Aave".to_string(),
            "Compound".to_string(),
            "Synthetix".to_string(),
            "PoolTogether".to_string(),
        ])
    });

    let query = facade(mock);
    let first = query.list_protocol_names().await.unwrap();
    let second = query.list_protocol_names().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0], "Aave");
}

#[tokio::test]
async fn test_unknown_protocol_alongside_balance_query() {
    let mut mock = MockRegistry::new();
    mock.expect_protocol_metadata()
        .withf(|name| name == "NoSuchProtocol")
        .returning(|_| Ok(RawProtocolMetadata::default()));
    mock.expect_protocol_balances()
        .returning(|_, _| Ok(aave_and_compound()));

    let query = facade(mock);
    let names = vec!["Aave".to_string(), "Compound".to_string()];
    let (metadata, balances) = tokio::join!(
        query.protocol_metadata("NoSuchProtocol"),
        query.protocol_balances(OWNER, &names),
    );

    assert!(matches!(
        metadata,
        Err(QueryError::UnknownProtocol { ref name }) if name == "NoSuchProtocol"
    ));
    let balances = balances.unwrap();
    assert_eq!(balances.len(), 2);
    assert!(balances[0].is_complete());
}

#[tokio::test]
async fn test_known_protocol_metadata() {
    let mut mock = MockRegistry::new();
    mock.expect_protocol_metadata().returning(|_| {
        Ok(serde_json::from_value(json!({
            "name": "Aave",
            "description": "Decentralized lending protocol",
            "websiteURL": "aave.com",
            "iconURL": "https://protocol-icons.s3.amazonaws.com/aave.png",
            "version": 2
        }))
        .unwrap())
    });

    let meta = facade(mock).protocol_metadata("Aave").await.unwrap();
    assert_eq!(meta.name, "Aave");
    assert_eq!(meta.website_url, "aave.com");
    assert_eq!(meta.version, 2);
}

#[tokio::test]
async fn test_empty_protocol_list_reads_all_balances() {
    let mut mock = MockRegistry::new();
    mock.expect_protocol_balances().times(0);
    mock.expect_all_balances()
        .withf(|owner| *owner == OWNER)
        .times(1)
        .returning(|_| {
            Ok(serde_json::from_value(json!([
                protocol_json("Synthetix", "Debt", json!([{
                    "base": token_json(7, "sUSD", Some(18), "250000000000000000000"),
                    "underlying": []
                }])),
                protocol_json("PoolTogether", "Asset", json!([])),
            ]))
            .unwrap())
        });

    let result = facade(mock).protocol_balances(OWNER, &[]).await.unwrap();

    // PoolTogether holds nothing for this owner and is left out
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].metadata.name, "Synthetix");
    assert_eq!(result[0].adapter_balances[0].adapter_type, AdapterType::Debt);
    assert_eq!(
        result[0].adapter_balances[0].balances[0].normalized_amount.to_string(),
        "250"
    );
}

#[tokio::test]
async fn test_transport_failure_is_propagated() {
    let mut mock = MockRegistry::new();
    mock.expect_final_full_token_balance()
        .returning(|_, _| Err(anyhow::anyhow!("request timed out")));

    let err = facade(mock)
        .decompose_token("Uniswap V1 pool token", Address::ZERO)
        .await
        .unwrap_err();

    match err {
        QueryError::TransportFailure { call, source } => {
            assert_eq!(call, "getFinalFullTokenBalance");
            assert_eq!(source.to_string(), "request timed out");
        }
        other => panic!("expected transport failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_three_level_token_decomposition() {
    let mut mock = MockRegistry::new();
    mock.expect_final_full_token_balance()
        .withf(|label, _| label == "Synthetic pool token")
        .returning(|_, _| Ok(nested_token(3)));

    let decomposition = facade(mock)
        .decompose_token("Synthetic pool token", Address::ZERO)
        .await
        .unwrap();

    assert!(decomposition.is_complete());
    assert_eq!(decomposition.node.depth(), 3);
    let mut node = &decomposition.node;
    while let Some(child) = node.underlying.first() {
        assert_eq!(child.normalized_amount.to_string(), "1");
        node = child;
    }
    assert_eq!(node.metadata.symbol, "L3");
}

#[tokio::test]
async fn test_twenty_level_token_hits_depth_bound() {
    let mut mock = MockRegistry::new();
    mock.expect_final_full_token_balance()
        .returning(|_, _| Ok(nested_token(20)));

    let decomposition = facade(mock)
        .decompose_token("Synthetic pool token", Address::ZERO)
        .await
        .unwrap();

    assert!(!decomposition.is_complete());
    assert_eq!(decomposition.node.depth(), 16);
    assert!(matches!(
        decomposition.omitted.as_slice(),
        [BalanceError::ExcessiveRecursionDepth { limit: 16, .. }]
    ));
}

#[tokio::test]
async fn test_depth_bound_is_configurable() {
    let mut mock = MockRegistry::new();
    mock.expect_final_full_token_balance()
        .returning(|_, _| Ok(nested_token(5)));

    let config = DecompositionConfig {
        max_depth: 4,
        include_empty: false,
    };
    let query = RegistryQuery::new(Arc::new(mock), &config);
    let decomposition = query.decompose_token("Nested", Address::ZERO).await.unwrap();
    assert_eq!(decomposition.node.depth(), 4);
    assert_eq!(decomposition.omitted.len(), 1);
}
