use portal_lib::auth::Role;
use portal_lib::config::Config;
use portal_lib::database::Database;
use portal_lib::models::NewUser;
use portal_lib::server;
use portal_lib::state::AppState;
use portal_lib::store;
use reqwest::{header, StatusCode};
use serde_json::{json, Value};
use std::io::Cursor;
use std::time::Duration;
use tempfile::TempDir;

const PASSWORD: &str = "kata-sandi-kuat";

struct TestApp {
    base: String,
    client: reqwest::Client,
    state: AppState,
    _dir: TempDir,
}

impl TestApp {
    async fn spawn() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.database.path = dir.path().join("portal.db");
        config.media.root = dir.path().join("media");
        config.editor.removal_debounce_ms = 50;

        let database = Database::open(&config.database.path).unwrap();
        let state = AppState::new(config, database);
        let (addr, _server) = server::start_server(state.clone(), "127.0.0.1:0")
            .await
            .unwrap();

        TestApp {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            state,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn add_user(&self, email: &str, role: Role) {
        let db = self.state.db().unwrap();
        store::users::create(
            &db.conn,
            &NewUser {
                name: email.split('@').next().unwrap().to_string(),
                email: email.to_string(),
                password: PASSWORD.to_string(),
                role,
            },
        )
        .unwrap();
    }

    async fn login(&self, email: &str) -> String {
        let res = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": PASSWORD, "captcha_token": "ok" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get(header::SET_COOKIE).is_some());
        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn signed_in(&self, email: &str, role: Role) -> String {
        self.add_user(email, role);
        self.login(email).await
    }
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::new(width, height);
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

#[tokio::test]
async fn public_api_is_open_and_dashboard_is_gated() {
    let app = TestApp::spawn().await;

    let res = app.client.get(app.url("/api/articles")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["items"].as_array().unwrap().len(), 0);
    assert_eq!(page["per_page"], 10);

    let res = app.client.get(app.url("/admin/articles")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let visitor = app.signed_in("warga@contoh.id", Role::User).await;
    let res = app
        .client
        .get(app.url("/admin/articles"))
        .bearer_auth(&visitor)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app
        .client
        .get(app.url("/account/me"))
        .bearer_auth(&visitor)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let me: Value = res.json().await.unwrap();
    assert_eq!(me["role"], "USER");
}

#[tokio::test]
async fn user_management_is_admin_only() {
    let app = TestApp::spawn().await;
    let editor = app.signed_in("editor@contoh.id", Role::Editor).await;
    let admin = app.signed_in("admin@contoh.id", Role::Admin).await;

    let res = app
        .client
        .get(app.url("/admin/users"))
        .bearer_auth(&editor)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app
        .client
        .get(app.url("/admin/users"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let users: Value = res.json().await.unwrap();
    assert_eq!(users.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn login_checks_captcha_then_credentials() {
    let app = TestApp::spawn().await;
    app.add_user("admin@contoh.id", Role::Admin);

    let res = app
        .client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": "admin@contoh.id", "password": PASSWORD, "captcha_token": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": "admin@contoh.id", "password": "salah-sandi", "captcha_token": "ok" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let token = app.login("admin@contoh.id").await;
    let res = app
        .client
        .post(app.url("/auth/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = app
        .client
        .get(app.url("/account/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_cookie_is_accepted() {
    let app = TestApp::spawn().await;
    let token = app.signed_in("editor@contoh.id", Role::Editor).await;

    let res = app
        .client
        .get(app.url("/admin/articles"))
        .header(header::COOKIE, format!("portal_session={token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_titles_get_adjusted_slugs() {
    let app = TestApp::spawn().await;
    let editor = app.signed_in("editor@contoh.id", Role::Editor).await;

    let mut slugs = Vec::new();
    for _ in 0..2 {
        let res = app
            .client
            .post(app.url("/admin/articles"))
            .bearer_auth(&editor)
            .json(&json!({ "title": "Berita Hari Ini", "published": true }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let saved: Value = res.json().await.unwrap();
        slugs.push((
            saved["slug"].as_str().unwrap().to_string(),
            saved["slug_adjusted"].as_bool().unwrap(),
        ));
    }
    assert_eq!(
        slugs,
        vec![
            ("berita-hari-ini".to_string(), false),
            ("berita-hari-ini-2".to_string(), true)
        ]
    );

    let res = app
        .client
        .get(app.url("/api/articles/berita-hari-ini-2"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let article: Value = res.json().await.unwrap();
    assert_eq!(article["title"], "Berita Hari Ini");
    assert!(article["content_html"].is_string());

    let res = app.client.get(app.url("/api/articles")).send().await.unwrap();
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total"], 2);
}

#[tokio::test]
async fn drafts_are_not_public() {
    let app = TestApp::spawn().await;
    let editor = app.signed_in("editor@contoh.id", Role::Editor).await;

    app.client
        .post(app.url("/admin/articles"))
        .bearer_auth(&editor)
        .json(&json!({ "title": "Rahasia" }))
        .send()
        .await
        .unwrap();

    let res = app.client.get(app.url("/api/articles/rahasia")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_are_404_when_not_configured() {
    let app = TestApp::spawn().await;
    let res = app
        .client
        .get(app.url("/api/articles/apa-saja/comments"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

struct DraftFixture {
    app: TestApp,
    token: String,
    article_id: String,
    draft_id: String,
}

impl DraftFixture {
    async fn open() -> Self {
        let app = TestApp::spawn().await;
        let token = app.signed_in("editor@contoh.id", Role::Editor).await;

        let res = app
            .client
            .post(app.url("/admin/articles"))
            .bearer_auth(&token)
            .json(&json!({ "title": "Kunjungan Kerja", "published": true }))
            .send()
            .await
            .unwrap();
        let article: Value = res.json().await.unwrap();
        let article_id = article["id"].as_str().unwrap().to_string();

        let res = app
            .client
            .post(app.url("/admin/drafts"))
            .bearer_auth(&token)
            .json(&json!({ "article_id": article_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let draft: Value = res.json().await.unwrap();
        let draft_id = draft["id"].as_str().unwrap().to_string();

        DraftFixture {
            app,
            token,
            article_id,
            draft_id,
        }
    }

    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> reqwest::Response {
        self.app
            .client
            .post(self.app.url(&format!(
                "/admin/drafts/{}/uploads?filename={filename}",
                self.draft_id
            )))
            .bearer_auth(&self.token)
            .body(bytes)
            .send()
            .await
            .unwrap()
    }

    async fn put_document(&self, document: &Value) -> Value {
        let res = self
            .app
            .client
            .put(self.app.url(&format!("/admin/drafts/{}/document", self.draft_id)))
            .bearer_auth(&self.token)
            .json(document)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        res.json().await.unwrap()
    }

    async fn draft(&self) -> Value {
        self.app
            .client
            .get(self.app.url(&format!("/admin/drafts/{}", self.draft_id)))
            .bearer_auth(&self.token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn asset_status(&self, url: &str) -> StatusCode {
        self.app.client.get(self.app.url(url)).send().await.unwrap().status()
    }
}

#[tokio::test]
async fn upload_lands_in_document_and_is_served() {
    let fx = DraftFixture::open().await;

    let res = fx.upload("foto.png", png(8, 6)).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let outcome: Value = res.json().await.unwrap();
    let url = outcome["asset"]["url"].as_str().unwrap().to_string();
    assert_eq!(outcome["asset"]["width"], 8);
    assert_eq!(outcome["draft"]["uploads_in_flight"], 0);

    let nodes = outcome["draft"]["document"]["nodes"].as_array().unwrap().clone();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0]["type"], "media");
    assert_eq!(nodes[0]["url"], url.as_str());

    let res = fx.app.client.get(fx.app.url(&url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "image/png");

    let res = fx
        .app
        .client
        .get(fx.app.url(&url))
        .header(header::RANGE, "bytes=0-3")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(res.bytes().await.unwrap().as_ref(), b"\x89PNG");

    let res = fx
        .app
        .client
        .post(fx.app.url(&format!("/admin/drafts/{}/save", fx.draft_id)))
        .bearer_auth(&fx.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let article: Value = res.json().await.unwrap();
    assert_eq!(article["id"], fx.article_id.as_str());
    assert_eq!(article["document"]["nodes"][0]["url"], url.as_str());
}

#[tokio::test]
async fn rejected_upload_leaves_document_untouched() {
    let fx = DraftFixture::open().await;
    let before = fx.draft().await;

    let res = fx.upload("catatan.txt", b"bukan gambar".to_vec()).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let after = fx.draft().await;
    assert_eq!(after["document"], before["document"]);
    assert_eq!(after["uploads_in_flight"], 0);
}

#[tokio::test]
async fn removed_image_is_deleted_after_debounce() {
    let fx = DraftFixture::open().await;
    let outcome: Value = fx.upload("foto.png", png(4, 4)).await.json().await.unwrap();
    let url = outcome["asset"]["url"].as_str().unwrap().to_string();

    let view = fx.put_document(&json!({ "nodes": [], "cursor": 0 })).await;
    assert_eq!(view["pending_removals"], 1);
    assert_eq!(fx.asset_status(&url).await, StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(fx.asset_status(&url).await, StatusCode::NOT_FOUND);
    assert_eq!(fx.draft().await["pending_removals"], 0);
}

#[tokio::test]
async fn image_restored_within_window_is_kept() {
    let fx = DraftFixture::open().await;
    let outcome: Value = fx.upload("foto.png", png(4, 4)).await.json().await.unwrap();
    let url = outcome["asset"]["url"].as_str().unwrap().to_string();
    let with_image = outcome["draft"]["document"].clone();

    fx.put_document(&json!({ "nodes": [], "cursor": 0 })).await;
    fx.put_document(&with_image).await;

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(fx.asset_status(&url).await, StatusCode::OK);
}

#[tokio::test]
async fn document_with_unknown_placeholder_is_refused() {
    let fx = DraftFixture::open().await;
    let outcome: Value = fx.upload("foto.png", png(4, 4)).await.json().await.unwrap();
    let url = outcome["asset"]["url"].as_str().unwrap().to_string();
    let before = fx.draft().await;

    let stale = json!({
        "nodes": [{ "type": "placeholder", "correlation_id": uuid::Uuid::new_v4() }],
        "cursor": 1
    });
    let res = fx
        .app
        .client
        .put(fx.app.url(&format!("/admin/drafts/{}/document", fx.draft_id)))
        .bearer_auth(&fx.token)
        .json(&stale)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let after = fx.draft().await;
    assert_eq!(after["document"], before["document"]);
    assert_eq!(after["pending_removals"], 0);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(fx.asset_status(&url).await, StatusCode::OK);

    let res = fx
        .app
        .client
        .post(fx.app.url(&format!("/admin/drafts/{}/save", fx.draft_id)))
        .bearer_auth(&fx.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let article: Value = res.json().await.unwrap();
    assert_eq!(article["document"]["nodes"][0]["type"], "media");
    assert_eq!(article["document"]["nodes"][0]["url"], url.as_str());
}

#[tokio::test]
async fn deleting_article_removes_its_images() {
    let fx = DraftFixture::open().await;
    let outcome: Value = fx.upload("foto.png", png(4, 4)).await.json().await.unwrap();
    let url = outcome["asset"]["url"].as_str().unwrap().to_string();

    fx.app
        .client
        .post(fx.app.url(&format!("/admin/drafts/{}/save", fx.draft_id)))
        .bearer_auth(&fx.token)
        .send()
        .await
        .unwrap();

    let res = fx
        .app
        .client
        .delete(fx.app.url(&format!("/admin/articles/{}", fx.article_id)))
        .bearer_auth(&fx.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(fx.asset_status(&url).await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn drafts_belong_to_their_owner() {
    let fx = DraftFixture::open().await;
    let other = fx.app.signed_in("lain@contoh.id", Role::Editor).await;

    let res = fx
        .app
        .client
        .get(fx.app.url(&format!("/admin/drafts/{}", fx.draft_id)))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = fx
        .app
        .client
        .delete(fx.app.url(&format!("/admin/drafts/{}", fx.draft_id)))
        .bearer_auth(&fx.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        fx.app
            .client
            .get(fx.app.url(&format!("/admin/drafts/{}", fx.draft_id)))
            .bearer_auth(&fx.token)
            .send()
            .await
            .unwrap()
            .status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn site_content_round_trips_through_dashboard() {
    let app = TestApp::spawn().await;
    let editor = app.signed_in("editor@contoh.id", Role::Editor).await;

    let res = app
        .client
        .post(app.url("/admin/faqs"))
        .bearer_auth(&editor)
        .json(&json!({ "question": "Jam layanan?", "answer": "08.00 - 16.00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = app
        .client
        .put(app.url("/admin/profile"))
        .bearer_auth(&editor)
        .json(&json!({ "vision": "Melayani", "address": "Jl. Merdeka 1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let faqs: Value = app
        .client
        .get(app.url("/api/faqs"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(faqs[0]["question"], "Jam layanan?");

    let profile: Value = app
        .client
        .get(app.url("/api/profile"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["address"], "Jl. Merdeka 1");

    let res = app
        .client
        .post(app.url("/admin/faqs"))
        .bearer_auth(&editor)
        .json(&json!({ "question": "", "answer": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
