use std::net::SocketAddr;

use anyhow::Result;
use axum::Router;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use bankledger::rates::{BankPage, FETCH_ERROR, RateScraper};
use tokio::net::TcpListener;

const RATES_PAGE: &str = "<html><body><h1>Fixed Deposit Interest Rates</h1>\n\
                          <p>1 year: 6.80%</p>\n\
                          <p>Branch locator</p></body></html>";

const BANK_LIST_PAGE: &str = "<html><body>\
                              <a href='/a'>Canara Bank</a>\
                              <a href='/b'> Canara Bank </a>\
                              <a href='/c'>Axis Bank Ltd.</a>\
                              <a href='/d'>Press Releases</a>\
                              </body></html>";

/// Serve fixed bank pages on an ephemeral local port.
async fn bank_site() -> Result<SocketAddr> {
    let app = Router::new()
        .route("/rates", get(|| async { Html(RATES_PAGE) }))
        .route("/down", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
        .route("/banks", get(|| async { Html(BANK_LIST_PAGE) }));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move { axum::serve(listener, app).await });
    Ok(addr)
}

#[tokio::test]
async fn test_scrape_interest_rates_keeps_page_order() -> Result<()> {
    let addr = bank_site().await?;
    let pages = vec![
        BankPage::new("Alpha", format!("http://{addr}/rates")),
        BankPage::new("Beta", format!("http://{addr}/down")),
        BankPage::new("Gamma", format!("http://{addr}/rates")),
    ];
    let scraper = RateScraper::new(pages, format!("http://{addr}/banks"))?;

    let rates = scraper.scrape_interest_rates().await;
    let banks: Vec<&str> = rates.iter().map(|r| r.bank.as_str()).collect();
    assert_eq!(banks, vec!["Alpha", "Beta", "Gamma"]);

    assert_eq!(
        rates[0].info,
        "fixed deposit interest rates\n1 year: 6.80%"
    );
    assert_eq!(rates[0].url, format!("http://{addr}/rates"));
    assert_eq!(rates[1].info, FETCH_ERROR);
    assert_eq!(rates[2].info, rates[0].info);

    Ok(())
}

#[tokio::test]
async fn test_scrape_many_banks_at_once() -> Result<()> {
    let addr = bank_site().await?;
    let pages: Vec<BankPage> = (0..12)
        .map(|n| BankPage::new(format!("Bank {n}"), format!("http://{addr}/rates")))
        .collect();
    let scraper = RateScraper::new(pages, format!("http://{addr}/banks"))?;

    let rates = scraper.scrape_interest_rates().await;
    assert_eq!(rates.len(), 12);
    assert!(rates.iter().all(|r| r.info != FETCH_ERROR));

    Ok(())
}

#[tokio::test]
async fn test_scrape_bank_names() -> Result<()> {
    let addr = bank_site().await?;
    let scraper = RateScraper::new(Vec::new(), format!("http://{addr}/banks"))?;

    let names = scraper.scrape_bank_names().await;
    assert_eq!(names, vec!["Axis Bank Ltd.", "Canara Bank"]);

    Ok(())
}

#[tokio::test]
async fn test_scrape_bank_names_when_site_is_down() -> Result<()> {
    let addr = bank_site().await?;
    let scraper = RateScraper::new(Vec::new(), format!("http://{addr}/down"))?;

    assert!(scraper.scrape_bank_names().await.is_empty());
    assert!(scraper.scrape_interest_rates().await.is_empty());

    Ok(())
}
