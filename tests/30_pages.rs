mod common;

use anyhow::Result;
use axum::http::{header, StatusCode};
use serde_json::json;

use common::{Fixture, TestRequest};

#[tokio::test]
async fn public_visitor_is_redirected_from_private_assembly() -> Result<()> {
    let fx = Fixture::new()?;
    let app = fx.router();

    let res = TestRequest::get("/organisms/Tardigrade/AsmPub").send(&app).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["data"]["is_public"], true);

    let res = TestRequest::get("/organisms/Tardigrade/AsmPriv").send(&app).await?;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.header(header::LOCATION), Some("/access_denied"));
    assert!(!res.text().contains("AsmPriv"));
    Ok(())
}

#[tokio::test]
async fn organism_page_lists_only_openable_assemblies() -> Result<()> {
    let fx = Fixture::new()?;
    let app = fx.router();

    let res = TestRequest::get("/organisms/Tardigrade").send(&app).await?;
    assert_eq!(res.status, StatusCode::OK);
    let assemblies = res.json()["data"]["assemblies"].clone();
    assert_eq!(assemblies, json!([{"assembly": "AsmPub", "groups": ["Public"]}]));

    // No public assembly and no grant
    let res = TestRequest::get("/organisms/Hydra").send(&app).await?;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    Ok(())
}

#[tokio::test]
async fn collaborator_sees_granted_assembly_only() -> Result<()> {
    let fx = Fixture::new()?;
    let app = fx.router();
    let cookie = common::login(&app, "bob").await?;

    let res = TestRequest::get("/organisms/Tardigrade/AsmPriv").cookie(&cookie).send(&app).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["data"]["groups"], json!(["LabX"]));

    let res = TestRequest::get("/organisms/Hydra/H1").cookie(&cookie).send(&app).await?;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    Ok(())
}

#[tokio::test]
async fn ip_range_user_opens_everything() -> Result<()> {
    let fx = Fixture::new()?;
    let app = fx.router();

    for path in ["/organisms/Hydra/H1", "/organisms/Tardigrade/AsmPriv", "/groups/LabY"] {
        let res = TestRequest::get(path).from_ip([10, 20, 3, 4]).send(&app).await?;
        assert_eq!(res.status, StatusCode::OK, "{}", path);
    }

    let res = TestRequest::get("/organisms/Nope/N1").from_ip([10, 20, 3, 4]).send(&app).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn public_group_is_open_in_any_casing() -> Result<()> {
    let fx = Fixture::new()?;
    let app = fx.router();

    let res = TestRequest::get("/groups/public").send(&app).await?;
    assert_eq!(res.status, StatusCode::OK);
    let body = res.json();
    assert_eq!(body["data"]["group"], "Public");
    assert_eq!(body["data"]["organisms"], json!({"Tardigrade": ["AsmPub"]}));

    let res = TestRequest::get("/groups/LabX").send(&app).await?;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    Ok(())
}

#[tokio::test]
async fn site_index_groups_accessible_assemblies() -> Result<()> {
    let fx = Fixture::new()?;
    let app = fx.router();
    let cookie = common::login(&app, "bob").await?;

    let res = TestRequest::get("/").cookie(&cookie).send(&app).await?;
    let groups: Vec<String> = res.json()["data"]["groups"]
        .as_array()
        .expect("groups")
        .iter()
        .filter_map(|g| g["group"].as_str().map(str::to_string))
        .collect();
    assert_eq!(groups, vec!["Public", "LabX"]);
    Ok(())
}

#[tokio::test]
async fn admin_access_report_requires_explicit_admin() -> Result<()> {
    let fx = Fixture::new()?;
    let app = fx.router();
    let uri = "/admin/api/access?username=bob&organism=Tardigrade&assembly=AsmPriv";

    let res = TestRequest::get(uri).from_ip([10, 20, 3, 4]).send(&app).await?;
    assert_eq!(res.status, StatusCode::SEE_OTHER);

    let cookie = common::login(&app, "bob").await?;
    let res = TestRequest::get(uri).cookie(&cookie).send(&app).await?;
    assert_eq!(res.status, StatusCode::SEE_OTHER);

    let cookie = common::login(&app, "root").await?;
    let res = TestRequest::get(uri).cookie(&cookie).send(&app).await?;
    assert_eq!(res.status, StatusCode::OK);
    let body = res.json();
    assert_eq!(body["data"]["access_level"], "COLLABORATOR");
    assert_eq!(body["data"]["assembly"]["has_access"], true);

    let res = TestRequest::get("/admin/api/access?username=ghost&organism=Tardigrade")
        .cookie(&cookie)
        .send(&app)
        .await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = TestRequest::get("/admin/api/access").cookie(&cookie).send(&app).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn pages_work_with_request_logging_off() -> Result<()> {
    let mut fx = Fixture::new()?;
    fx.config.server.enable_request_logging = false;
    let app = fx.router();

    let res = TestRequest::get("/health").send(&app).await?;
    assert_eq!(res.status, StatusCode::OK);

    let cookie = common::login(&app, "bob").await?;
    let res = TestRequest::get("/organisms/Tardigrade/AsmPriv").cookie(&cookie).send(&app).await?;
    assert_eq!(res.status, StatusCode::OK);
    Ok(())
}

/// (private, missing) pairs a visitor must not be able to tell apart.
const PRIVATE_VS_MISSING: &[(&str, &str)] = &[
    ("/organisms/Hydra", "/organisms/Nope"),
    ("/organisms/Tardigrade/AsmPriv", "/organisms/Tardigrade/AsmNope"),
    ("/organisms/Hydra/H1", "/organisms/Nope/N1"),
    ("/groups/LabX", "/groups/NoSuchLab"),
    (
        "/api/jbrowse2/config?organism=Tardigrade&assembly=AsmPriv",
        "/api/jbrowse2/config?organism=Tardigrade&assembly=AsmNope",
    ),
    (
        "/api/jbrowse2/config?assembly1=Tardigrade_AsmPriv&assembly2=Tardigrade_AsmPub",
        "/api/jbrowse2/config?assembly1=Tardigrade_AsmNope&assembly2=Tardigrade_AsmPub",
    ),
    (
        "/api/jbrowse2/config?assembly1=Tardigrade_AsmPub&assembly2=Tardigrade_AsmPriv",
        "/api/jbrowse2/config?assembly1=Tardigrade_AsmPub&assembly2=Tardigrade_AsmNope",
    ),
];

#[tokio::test]
async fn private_and_missing_resources_deny_alike() -> Result<()> {
    let fx = Fixture::new()?;
    let app = fx.router();

    for (private, missing) in PRIVATE_VS_MISSING {
        let denied = TestRequest::get(private).send(&app).await?;
        let absent = TestRequest::get(missing).send(&app).await?;

        assert!(
            denied.status == StatusCode::SEE_OTHER || denied.status == StatusCode::FORBIDDEN,
            "{} answered {}",
            private,
            denied.status
        );
        assert_eq!(denied.status, absent.status, "{} vs {}", private, missing);
        assert_eq!(denied.header(header::LOCATION), absent.header(header::LOCATION), "{}", missing);
        assert_eq!(denied.body, absent.body, "{} vs {}", private, missing);
        assert!(!absent.text().contains("Nope"), "{} names the resource", missing);
    }
    Ok(())
}

#[tokio::test]
async fn ungranted_and_missing_configs_deny_alike() -> Result<()> {
    let fx = Fixture::new()?;
    let app = fx.router();
    let cookie = common::login(&app, "bob").await?;

    // Hydra_H1 is grouped but has no JBrowse2 definition; Tardigrade_AsmNope is nowhere
    for (private, missing) in [
        ("/api/jbrowse2/config?organism=Hydra&assembly=H1", "/api/jbrowse2/config?organism=Nope&assembly=N1"),
        (
            "/api/jbrowse2/config?assembly1=Hydra_H1&assembly2=Tardigrade_AsmPub",
            "/api/jbrowse2/config?assembly1=Tardigrade_AsmNope&assembly2=Tardigrade_AsmPub",
        ),
    ] {
        let denied = TestRequest::get(private).cookie(&cookie).send(&app).await?;
        let absent = TestRequest::get(missing).cookie(&cookie).send(&app).await?;
        assert_eq!(denied.status, StatusCode::FORBIDDEN, "{}", private);
        assert_eq!(absent.status, StatusCode::FORBIDDEN, "{}", missing);
        assert_eq!(denied.body, absent.body);
    }
    Ok(())
}
