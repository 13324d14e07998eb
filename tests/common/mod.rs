#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use moop_access::app::{router, AppState};
use moop_access::auth::users::hash_password;
use moop_access::config::AppConfig;

pub const PASSWORD: &str = "correct horse";

/// Bytes served for `Tardigrade/AsmPub/gff/genes.gff3`.
pub const GENES_GFF: &str = "##gff-version 3\nctg1\t.\tgene\t1\t100\t.\t+\t.\tID=g1\n";

pub fn key_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/keys").join(name)
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    fs::create_dir_all(path.parent().context("path has no parent")?)?;
    fs::write(path, serde_json::to_vec_pretty(value)?)?;
    Ok(())
}

/// A complete site on disk: groups, users, JBrowse2 metadata and track data.
///
/// Tardigrade/AsmPub is public, Tardigrade/AsmPriv belongs to LabX. `bob`
/// is a collaborator granted AsmPriv, `root` is an admin.
pub struct Fixture {
    pub dir: TempDir,
    pub config: AppConfig,
}

impl Fixture {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();

        write_json(
            &root.join("organism_assembly_groups.json"),
            &json!([
                {"organism": "Tardigrade", "assembly": "AsmPub", "groups": ["PUBLIC"]},
                {"organism": "Tardigrade", "assembly": "AsmPriv", "groups": ["LabX"]},
                {"organism": "Hydra", "assembly": "H1", "groups": ["LabY"]},
            ]),
        )?;

        let hash = hash_password(PASSWORD)?;
        write_json(
            &root.join("users.json"),
            &json!({
                "bob": {"password": hash, "access": {"Tardigrade": ["AsmPriv"]}},
                "root": {"password": hash, "role": "admin", "access": {}},
            }),
        )?;

        let metadata = root.join("jbrowse2");
        for (assembly, level) in [("AsmPub", "PUBLIC"), ("AsmPriv", "COLLABORATOR")] {
            write_json(
                &metadata.join(format!("assemblies/Tardigrade_{}.json", assembly)),
                &json!({
                    "name": format!("Tardigrade_{}", assembly),
                    "displayName": format!("Tardigrade ({})", assembly),
                    "organism": "Tardigrade",
                    "assemblyId": assembly,
                    "defaultAccessLevel": level,
                    "sequence": {"type": "ReferenceSequenceTrack", "trackId": format!("{}-seq", assembly)},
                }),
            )?;
            write_json(
                &metadata.join(format!("tracks/Tardigrade/{}/gff/genes.json", assembly)),
                &json!({
                    "trackId": format!("{}-genes", assembly),
                    "metadata": {"access_level": "PUBLIC"},
                    "adapter": {"gffLocation": {"uri": format!("/moop/data/tracks/Tardigrade/{}/gff/genes.gff3", assembly)}},
                }),
            )?;
        }

        let data = root.join("tracks");
        fs::create_dir_all(data.join("Tardigrade/AsmPub/gff"))?;
        fs::write(data.join("Tardigrade/AsmPub/gff/genes.gff3"), GENES_GFF)?;
        fs::create_dir_all(data.join("Tardigrade/AsmPriv/gff"))?;
        fs::write(data.join("Tardigrade/AsmPriv/gff/genes.gff3"), "private\n")?;

        let mut config = AppConfig::profile(Some("development"));
        config.access.groups_file = root.join("organism_assembly_groups.json");
        config.access.users_file = root.join("users.json");
        config.access.auto_login_ip_ranges = vec!["10.20.0.0/16".parse()?, "192.168.7.7=ADMIN".parse()?];
        config.tokens.private_key_path = Some(key_path("track_private.pem"));
        config.tokens.public_key_path = Some(key_path("track_public.pem"));
        config.tracks.data_dir = data;
        config.tracks.metadata_dir = metadata;
        config.tracks.trusted_networks = Vec::new();

        Ok(Self { dir, config })
    }

    pub fn state(&self) -> AppState {
        AppState::new(self.config.clone())
    }

    pub fn router(&self) -> Router {
        router(self.state())
    }

    /// Environment for a spawned server equivalent to [`Fixture::config`].
    pub fn server_env(&self, port: u16) -> Vec<(&'static str, String)> {
        let path = |p: &Path| p.display().to_string();
        let keys = &self.config.tokens;
        vec![
            ("APP_ENV", "development".to_string()),
            ("MOOP_PORT", port.to_string()),
            ("ACCESS_GROUPS_FILE", path(&self.config.access.groups_file)),
            ("ACCESS_USERS_FILE", path(&self.config.access.users_file)),
            ("ACCESS_AUTO_LOGIN_IP_RANGES", String::new()),
            ("TOKEN_PRIVATE_KEY_PATH", keys.private_key_path.as_deref().map(path).unwrap_or_default()),
            ("TOKEN_PUBLIC_KEY_PATH", keys.public_key_path.as_deref().map(path).unwrap_or_default()),
            ("TRACKS_DATA_DIR", path(&self.config.tracks.data_dir)),
            ("TRACKS_METADATA_DIR", path(&self.config.tracks.metadata_dir)),
            ("TRACKS_TRUSTED_NETWORKS", String::new()),
        ]
    }
}

/// Response pieces from an in-process request.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `name=value` of the session cookie set by this response, if any.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("MOOPSESSID="))
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }
}

/// Builder for a request arriving from `peer`.
pub struct TestRequest {
    builder: axum::http::request::Builder,
    peer: SocketAddr,
    body: Body,
}

impl TestRequest {
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            builder: Request::builder().method(method).uri(uri),
            peer: SocketAddr::from(([203, 0, 113, 9], 40000)),
            body: Body::empty(),
        }
    }

    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    pub fn from_ip(mut self, ip: [u8; 4]) -> Self {
        self.peer = SocketAddr::from((ip, 40000));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    pub fn cookie(self, cookie: &str) -> Self {
        self.header("cookie", cookie)
    }

    pub fn json(mut self, value: Value) -> Self {
        self.builder = self.builder.header(header::CONTENT_TYPE, "application/json");
        self.body = Body::from(value.to_string());
        self
    }

    pub async fn send(self, app: &Router) -> Result<TestResponse> {
        let mut request = self.builder.body(self.body)?;
        request.extensions_mut().insert(ConnectInfo(self.peer));

        let response = app.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await?.to_vec();
        Ok(TestResponse { status, headers, body })
    }
}

/// Log in through `/login` and return the session cookie.
pub async fn login(app: &Router, username: &str) -> Result<String> {
    let response = TestRequest::post("/login")
        .json(json!({"username": username, "password": PASSWORD}))
        .send(app)
        .await?;
    anyhow::ensure!(response.status == StatusCode::OK, "login failed: {}", response.text());
    response.session_cookie().context("login set no session cookie")
}

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    fixture: Fixture,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let fixture = Fixture::new()?;

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_moop-access"));
        cmd.env_remove("MOOP_CONFIG")
            .envs(fixture.server_env(port))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, fixture, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn fixture(&self) -> &Fixture {
        &self.fixture
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    // Use stable get_or_init and convert init errors into a panic with context.
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}
