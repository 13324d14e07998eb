mod common;

use anyhow::Result;
use axum::http::{header, StatusCode};
use serde_json::json;

use common::{Fixture, TestRequest, PASSWORD};
use moop_access::app::router;

#[tokio::test]
async fn anonymous_request_is_public() -> Result<()> {
    let fx = Fixture::new()?;
    let app = fx.router();

    let res = TestRequest::get("/api/auth/whoami").send(&app).await?;
    assert_eq!(res.status, StatusCode::OK);
    let body = res.json();
    assert_eq!(body["data"]["access_level"], "PUBLIC");
    assert_eq!(body["data"]["logged_in"], false);
    assert!(res.session_cookie().is_none());
    Ok(())
}

#[tokio::test]
async fn address_in_range_is_elevated_without_password() -> Result<()> {
    let fx = Fixture::new()?;
    let app = fx.router();

    let res = TestRequest::get("/api/auth/whoami").from_ip([10, 20, 1, 2]).send(&app).await?;
    let body = res.json();
    assert_eq!(body["data"]["access_level"], "IP_IN_RANGE");
    assert_eq!(body["data"]["username"], "IP_USER_10.20.1.2");
    assert!(res.session_cookie().is_none());

    let res = TestRequest::get("/api/auth/whoami").from_ip([192, 168, 7, 7]).send(&app).await?;
    assert_eq!(res.json()["data"]["access_level"], "ADMIN");
    Ok(())
}

#[tokio::test]
async fn cookieless_address_logins_store_nothing() -> Result<()> {
    let fx = Fixture::new()?;
    let state = fx.state();
    let sessions = state.sessions.clone();
    let app = router(state);

    for _ in 0..5 {
        let res = TestRequest::get("/api/auth/whoami").from_ip([10, 20, 1, 2]).send(&app).await?;
        assert_eq!(res.json()["data"]["access_level"], "IP_IN_RANGE");
        assert!(res.session_cookie().is_none());
    }
    assert_eq!(sessions.count().await, 0);
    Ok(())
}

#[tokio::test]
async fn ip_login_is_dropped_when_the_address_leaves_the_range() -> Result<()> {
    let fx = Fixture::new()?;
    let app = fx.router();
    let cookie = common::login(&app, "bob").await?;

    // The range outranks bob's collaborator login and is recorded in his session
    let res = TestRequest::get("/api/auth/whoami")
        .from_ip([10, 20, 1, 2])
        .cookie(&cookie)
        .send(&app)
        .await?;
    assert_eq!(res.json()["data"]["access_level"], "IP_IN_RANGE");

    let res = TestRequest::get("/api/auth/whoami").cookie(&cookie).send(&app).await?;
    let body = res.json();
    assert_eq!(body["data"]["access_level"], "COLLABORATOR");
    assert_eq!(body["data"]["username"], "bob");
    Ok(())
}

#[tokio::test]
async fn spoofed_forwarded_for_is_ignored_by_default() -> Result<()> {
    let fx = Fixture::new()?;
    let app = fx.router();

    let res = TestRequest::get("/api/auth/whoami")
        .header("x-forwarded-for", "10.20.1.2, 203.0.113.9")
        .send(&app)
        .await?;
    let body = res.json();
    assert_eq!(body["data"]["access_level"], "PUBLIC");
    assert_eq!(body["data"]["ip"], "203.0.113.9");

    let res = TestRequest::get("/api/jbrowse2/config?organism=Tardigrade&assembly=AsmPriv")
        .header("x-forwarded-for", "10.20.1.2")
        .send(&app)
        .await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn forwarded_for_is_honoured_only_from_trusted_proxies() -> Result<()> {
    let mut fx = Fixture::new()?;
    fx.config.server.trusted_proxies = vec!["172.16.0.0/12".to_string()];
    let app = fx.router();

    // Client-supplied leftmost hop is skipped; the proxy-appended one counts
    let res = TestRequest::get("/api/auth/whoami")
        .from_ip([172, 16, 0, 5])
        .header("x-forwarded-for", "192.168.7.7, 10.20.1.2, 172.16.0.9")
        .send(&app)
        .await?;
    let body = res.json();
    assert_eq!(body["data"]["access_level"], "IP_IN_RANGE");
    assert_eq!(body["data"]["ip"], "10.20.1.2");

    // Same header straight from the internet
    let res = TestRequest::get("/api/auth/whoami")
        .header("x-forwarded-for", "192.168.7.7, 10.20.1.2, 172.16.0.9")
        .send(&app)
        .await?;
    assert_eq!(res.json()["data"]["access_level"], "PUBLIC");

    // Proxy reports an outside client
    let res = TestRequest::get("/api/auth/whoami")
        .from_ip([172, 16, 0, 5])
        .header("x-forwarded-for", "10.20.1.2, 198.51.100.1")
        .send(&app)
        .await?;
    assert_eq!(res.json()["data"]["access_level"], "PUBLIC");
    Ok(())
}

#[tokio::test]
async fn login_logout_round_trip() -> Result<()> {
    let fx = Fixture::new()?;
    let app = fx.router();

    let cookie = common::login(&app, "bob").await?;
    let res = TestRequest::get("/api/auth/whoami").cookie(&cookie).send(&app).await?;
    let body = res.json();
    assert_eq!(body["data"]["username"], "bob");
    assert_eq!(body["data"]["access_level"], "COLLABORATOR");
    assert_eq!(body["data"]["access"], json!({"Tardigrade": ["AsmPriv"]}));

    let res = TestRequest::post("/logout").cookie(&cookie).send(&app).await?;
    assert_eq!(res.status, StatusCode::OK);

    let res = TestRequest::get("/api/auth/whoami").cookie(&cookie).send(&app).await?;
    assert_eq!(res.json()["data"]["access_level"], "PUBLIC");
    Ok(())
}

#[tokio::test]
async fn login_issues_a_fresh_session_id() -> Result<()> {
    let fx = Fixture::new()?;
    let app = fx.router();

    let before = common::login(&app, "bob").await?;

    let res = TestRequest::post("/login")
        .from_ip([10, 20, 1, 2])
        .cookie(&before)
        .json(json!({"username": "root", "password": PASSWORD}))
        .send(&app)
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    let after = res.session_cookie().expect("login cookie");
    assert_ne!(before, after);

    // Explicit admin login outranks the range
    let res = TestRequest::get("/api/auth/whoami")
        .from_ip([10, 20, 1, 2])
        .cookie(&after)
        .send(&app)
        .await?;
    assert_eq!(res.json()["data"]["access_level"], "ADMIN");
    assert_eq!(res.json()["data"]["username"], "root");
    Ok(())
}

#[tokio::test]
async fn bad_credentials_are_rejected() -> Result<()> {
    let fx = Fixture::new()?;
    let app = fx.router();

    let res = TestRequest::post("/login")
        .json(json!({"username": "bob", "password": "wrong"}))
        .send(&app)
        .await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(res.session_cookie().is_none());

    let res = TestRequest::post("/login")
        .header(header::CONTENT_TYPE.as_str(), "application/x-www-form-urlencoded")
        .send(&app)
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}
