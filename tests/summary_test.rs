mod common;

use anyhow::Result;
use bankledger::application::{AggregationConfig, AggregationService, CreateAccountRequest};
use bankledger::domain::BalanceSummary;
use common::{aggregation_for, open_account, test_service, units};

#[tokio::test]
async fn test_summary_of_three_accounts() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let aggregation = aggregation_for(&service)?;

    open_account(&service, "A", "10001", 1000).await?;
    open_account(&service, "B", "10002", 2000).await?;
    open_account(&service, "C", "10003", 3000).await?;

    let summary = aggregation.compute_summary().await?;
    assert_eq!(
        summary,
        BalanceSummary {
            total_accounts: 3,
            total_balance: i128::from(units(6000)),
            average_balance: units(2000),
        }
    );

    Ok(())
}

#[tokio::test]
async fn test_summary_with_no_accounts() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let aggregation = aggregation_for(&service)?;

    let summary = aggregation.compute_summary().await?;
    assert_eq!(summary, BalanceSummary::empty());
    assert_eq!(summary.average_balance, 0);

    Ok(())
}

#[tokio::test]
async fn test_summary_spans_several_partitions() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let aggregation = aggregation_for(&service)?;

    // 37 accounts: four partitions of at most 10
    let mut expected = 0;
    for n in 1..=37 {
        open_account(&service, "Holder", &format!("3000{n:02}"), n).await?;
        expected += units(n);
    }

    let summary = aggregation.compute_summary().await?;
    assert_eq!(summary.total_accounts, 37);
    assert_eq!(summary.total_balance, i128::from(expected));
    assert_eq!(summary.average_balance, units(19));

    Ok(())
}

#[tokio::test]
async fn test_summary_is_independent_of_pool_sizing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    for n in 1..=23 {
        open_account(&service, "Holder", &format!("4000{n:02}"), n * 3).await?;
    }

    let reference = aggregation_for(&service)?.compute_summary().await?;
    for (workers, partition_size) in [(1, 1), (2, 7), (8, 100)] {
        let aggregation = AggregationService::new(
            service.repository().clone(),
            AggregationConfig {
                workers,
                partition_size,
            },
        )?;
        assert_eq!(aggregation.workers(), workers);
        assert_eq!(aggregation.compute_summary().await?, reference);
    }

    Ok(())
}

#[tokio::test]
async fn test_summary_average_rounds_to_nearest_cent() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let aggregation = aggregation_for(&service)?;

    open_account(&service, "A", "10001", 0).await?;
    open_account(&service, "B", "10002", 0).await?;
    open_account(&service, "C", "10003", 0).await?;
    service.deposit("10001", 1).await?;
    service.deposit("10002", 1).await?;

    // 2 cents over 3 accounts
    let summary = aggregation.compute_summary().await?;
    assert_eq!(summary.total_balance, 2);
    assert_eq!(summary.average_balance, 1);

    Ok(())
}

#[tokio::test]
async fn test_summary_total_beyond_single_balance_range() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let aggregation = aggregation_for(&service)?;

    for number in ["10001", "10002"] {
        service
            .create_account(CreateAccountRequest {
                name: "Whale".into(),
                number: number.into(),
                email: "whale@example.com".into(),
                balance: Some(5_000_000_000_000_000_000),
            })
            .await?;
    }

    let summary = aggregation.compute_summary().await?;
    assert_eq!(summary.total_accounts, 2);
    assert_eq!(summary.total_balance, 10_000_000_000_000_000_000);
    assert_eq!(summary.average_balance, 5_000_000_000_000_000_000);

    Ok(())
}
