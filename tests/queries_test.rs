mod common;

use anyhow::Result;
use common::{days_ahead, snapshot, test_service, SeededLedger, StaticFetcher};
use saldo::application::{AppError, CustomerFilter};

#[tokio::test]
async fn test_statistics_with_zero_customers_are_all_zero() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.create_owner("vantage".into()).await?;

    let stats = service.owner_statistics("vantage").await?;
    assert_eq!(stats.total_customers, 0);
    assert_eq!(stats.customers_in_debt, 0);
    assert_eq!(stats.total_debt, 0);
    assert_eq!(stats.total_payments, 0);

    Ok(())
}

#[tokio::test]
async fn test_statistics_counts_and_sums() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.create_owner("vantage".into()).await?;

    let fetcher = StaticFetcher::new();
    for username in ["aram.k", "dara.m", "lana.s"] {
        fetcher.set(username, snapshot(25000, days_ahead(30)));
        service
            .register_customer("vantage", username.into(), "secret".into(), 0, &fetcher)
            .await?;
    }

    service.register_debt("vantage", "aram.k", "30000").await?;
    service.register_debt("vantage", "dara.m", "10000").await?;
    service
        .register_payment("vantage", "dara.m", "10000")
        .await?;
    // lana.s overpays: negative balance, not counted as in debt
    service
        .register_payment("vantage", "lana.s", "5000")
        .await?;

    let stats = service.owner_statistics("vantage").await?;
    assert_eq!(stats.total_customers, 3);
    assert_eq!(stats.customers_in_debt, 1);
    assert_eq!(stats.total_debt, 30000 - 5000);
    assert_eq!(stats.total_payments, 15000);

    Ok(())
}

#[tokio::test]
async fn test_statistics_scoped_to_owner() -> Result<()> {
    let (service, _temp) = test_service().await?;
    SeededLedger::create_basic(&service).await?;
    service.create_owner("summit".into()).await?;

    service.register_debt("vantage", "aram.k", "25000").await?;

    let stats = service.owner_statistics("summit").await?;
    assert_eq!(stats.total_customers, 0);
    assert_eq!(stats.total_debt, 0);

    Ok(())
}

#[tokio::test]
async fn test_list_customers_missing_owner_is_not_found() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service
        .list_customers("nobody", CustomerFilter::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OwnerNotFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_list_customers_empty_result_is_not_found() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.create_owner("vantage".into()).await?;

    // Existing owner with no customers maps to the distinct empty-result error
    let err = service
        .list_customers("vantage", CustomerFilter::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoCustomersFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_list_customers_filters() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.create_owner("vantage".into()).await?;

    let fetcher = StaticFetcher::new();
    let mut north = snapshot(25000, days_ahead(30));
    north.agent_name = "north-branch".into();
    let mut south = snapshot(25000, days_ahead(30));
    south.agent_name = "south-branch".into();

    fetcher.set("aram.k", north.clone());
    fetcher.set("dara.m", north);
    fetcher.set("lana.s", south);
    for username in ["aram.k", "dara.m", "lana.s"] {
        service
            .register_customer("vantage", username.into(), "secret".into(), 0, &fetcher)
            .await?;
    }

    let filter = CustomerFilter {
        agent_name: Some("north-branch".into()),
        ..Default::default()
    };
    let customers = service.list_customers("vantage", filter).await?;
    assert_eq!(customers.len(), 2);

    let filter = CustomerFilter {
        username: Some("lana.s".into()),
        ..Default::default()
    };
    let customers = service.list_customers("vantage", filter).await?;
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].username, "lana.s");

    // Filters that match nothing report the empty result
    let filter = CustomerFilter {
        agent_name: Some("east-branch".into()),
        ..Default::default()
    };
    let err = service.list_customers("vantage", filter).await.unwrap_err();
    assert!(matches!(err, AppError::NoCustomersFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_unique_agents_deduplicates() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.create_owner("vantage".into()).await?;

    let fetcher = StaticFetcher::new();
    for (username, agent) in [
        ("aram.k", "north-branch"),
        ("dara.m", "north-branch"),
        ("lana.s", "south-branch"),
    ] {
        let mut snap = snapshot(25000, days_ahead(30));
        snap.agent_name = agent.into();
        fetcher.set(username, snap);
        service
            .register_customer("vantage", username.into(), "secret".into(), 0, &fetcher)
            .await?;
    }

    let mut agents = service.unique_agents("vantage").await?;
    agents.sort();
    assert_eq!(agents, vec!["north-branch", "south-branch"]);

    Ok(())
}

#[tokio::test]
async fn test_unique_agents_missing_owner_is_not_found() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service.unique_agents("nobody").await.unwrap_err();
    assert!(matches!(err, AppError::OwnerNotFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_duplicate_owner_is_conflict() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.create_owner("vantage".into()).await?;

    let err = service.create_owner("vantage".into()).await.unwrap_err();
    assert!(matches!(err, AppError::OwnerAlreadyExists(_)));

    Ok(())
}
