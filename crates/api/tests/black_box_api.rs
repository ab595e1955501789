use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use salonbook_api::app::{AppServices, build_app};
use salonbook_auth::{JwtClaims, PrincipalId, Role};
use salonbook_core::OwnerId;
use salonbook_infra::{AppConfig, Stores};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod on in-memory stores, bound to an ephemeral port.
        let mut config = AppConfig::in_memory();
        config.jwt_secret = JWT_SECRET.to_string();
        let services = Arc::new(AppServices::new(&config, Stores::in_memory()));
        let app = build_app(services);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, token: &str, path: &str) -> (StatusCode, Value) {
        let res = self.client.get(self.url(path)).bearer_auth(token).send().await.unwrap();
        read(res).await
    }

    async fn send(&self, method: reqwest::Method, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .request(method, self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        read(res).await
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::POST, token, path, body).await
    }

    async fn patch(&self, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::PATCH, token, path, body).await
    }

    async fn delete(&self, token: &str, path: &str) -> StatusCode {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
            .status()
    }

    /// POST with a raw body, for requests that are not well-formed JSON.
    async fn post_raw(&self, token: &str, path: &str, body: &'static str) -> (StatusCode, Value) {
        let res = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .unwrap();
        read(res).await
    }

    /// POST that must succeed with 201; returns the created record.
    async fn create(&self, token: &str, path: &str, body: Value) -> Value {
        let (status, body) = self.post(token, path, body).await;
        assert_eq!(status, StatusCode::CREATED, "POST {path} failed: {body}");
        body
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn read(res: reqwest::Response) -> (StatusCode, Value) {
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    (status, body)
}

fn mint_jwt(owner_id: OwnerId, roles: Vec<Role>) -> String {
    let claims = JwtClaims::new(PrincipalId::new(), owner_id, roles, Utc::now(), ChronoDuration::minutes(10));

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn owner_token() -> String {
    mint_jwt(OwnerId::new(), vec![Role::OWNER])
}

fn id_of(v: &Value) -> String {
    v["id"].as_str().expect("record has an id").to_string()
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/whoami")).send().await.unwrap();
    let (status, body) = read(res).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = srv.get("not-a-jwt", "/customers").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn expired_tokens_are_rejected() {
    let srv = TestServer::spawn().await;
    let past = Utc::now() - ChronoDuration::hours(2);
    let claims = JwtClaims::new(PrincipalId::new(), OwnerId::new(), vec![Role::OWNER], past, ChronoDuration::minutes(10));
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let (status, _) = srv.get(&token, "/whoami").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn owner_context_is_derived_from_token() {
    let srv = TestServer::spawn().await;
    let owner_id = OwnerId::new();
    let token = mint_jwt(owner_id, vec![Role::MANAGER]);

    let (status, body) = srv.get(&token, "/whoami").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["owner_id"].as_str().unwrap(), owner_id.to_string());
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "manager"));
}

#[tokio::test]
async fn register_login_and_cookie_session() {
    let srv = TestServer::spawn().await;
    let creds = json!({ "email": "Owner@Salon.test", "password": "correct horse", "display_name": "Mai" });

    let res = srv.client.post(srv.url("/auth/register")).json(&creds).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let cookie = res.headers()["set-cookie"].to_str().unwrap().to_string();
    assert!(cookie.starts_with("salonbook_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    let registered: Value = res.json().await.unwrap();
    assert_eq!(registered["account"]["email"], "owner@salon.test");
    assert_eq!(registered["account"]["roles"], json!(["owner"]));

    // Same email again.
    let res = srv.client.post(srv.url("/auth/register")).json(&creds).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "owner@salon.test", "password": "wrong password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "owner@salon.test", "password": "correct horse" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let session = res.headers()["set-cookie"]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    // Cookie alone is enough.
    let res = srv
        .client
        .get(srv.url("/whoami"))
        .header("cookie", &session)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let me: Value = res.json().await.unwrap();
    assert_eq!(me["owner_id"], registered["account"]["owner_id"]);

    let res = srv.client.post(srv.url("/auth/logout")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(res.headers()["set-cookie"].to_str().unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn customer_crud_and_owner_isolation() {
    let srv = TestServer::spawn().await;
    let token = owner_token();
    let other = owner_token();

    let created = srv
        .create(&token, "/customers", json!({ "name": "Linh Tran", "phone": "0901 234 567", "tags": ["VIP"] }))
        .await;
    let id = id_of(&created);
    assert_eq!(created["tags"], json!(["vip"]));

    let (status, body) = srv.get(&token, &format!("/customers/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Linh Tran");

    let (status, body) = srv.patch(&token, &format!("/customers/{id}"), json!({ "notes": "prefers mornings" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notes"], "prefers mornings");
    assert_eq!(body["phone"], "0901 234 567");

    let (status, body) = srv.post(&token, "/customers", json!({ "name": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    // Another owner sees nothing.
    let (status, _) = srv.get(&other, &format!("/customers/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = srv.patch(&other, &format!("/customers/{id}"), json!({ "name": "Hijack" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(srv.delete(&other, &format!("/customers/{id}")).await, StatusCode::NOT_FOUND);
    let (_, list) = srv.get(&other, "/customers").await;
    assert_eq!(list["total"], 0);

    assert_eq!(srv.delete(&token, &format!("/customers/{id}")).await, StatusCode::NO_CONTENT);
    let (status, _) = srv.get(&token, &format!("/customers/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = srv.get(&token, "/customers/not-an-id").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_search_paging_and_query_validation() {
    let srv = TestServer::spawn().await;
    let token = owner_token();
    for name in ["Anh", "Binh", "Chau", "Dung", "Giang"] {
        srv.create(&token, "/customers", json!({ "name": name })).await;
    }

    let (status, page) = srv.get(&token, "/customers?limit=2&offset=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 5);
    assert_eq!(page["limit"], 2);
    assert_eq!(page["offset"], 1);
    assert_eq!(page["has_more"], true);
    let names: Vec<&str> = page["items"].as_array().unwrap().iter().map(|c| c["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Binh", "Chau"]);

    let (_, page) = srv.get(&token, "/customers?sort=-name&limit=1").await;
    assert_eq!(page["items"][0]["name"], "Giang");

    let (_, page) = srv.get(&token, "/customers?q=UNG").await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["name"], "Dung");

    let (status, body) = srv.get(&token, "/customers?password=x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_query");

    let (status, _) = srv.get(&token, "/customers?sort=secret").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = srv.get(&token, "/customers?limit=lots").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cached_lists_see_writes() {
    let srv = TestServer::spawn().await;
    let token = owner_token();

    let (_, before) = srv.get(&token, "/services").await;
    assert_eq!(before["total"], 0);

    let svc = srv
        .create(&token, "/services", json!({ "name": "Cut", "duration_minutes": 30, "price": 2000 }))
        .await;
    let (_, after) = srv.get(&token, "/services").await;
    assert_eq!(after["total"], 1);

    // Record reads are invalidated by updates too.
    let id = id_of(&svc);
    let (_, first) = srv.get(&token, &format!("/services/{id}")).await;
    assert_eq!(first["price"], 2000);
    srv.patch(&token, &format!("/services/{id}"), json!({ "price": 2500 })).await;
    let (_, second) = srv.get(&token, &format!("/services/{id}")).await;
    assert_eq!(second["price"], 2500);
}

#[tokio::test]
async fn roles_gate_reads_and_writes() {
    let srv = TestServer::spawn().await;
    let owner_id = OwnerId::new();
    let staff = mint_jwt(owner_id, vec![Role::STAFF]);
    let manager = mint_jwt(owner_id, vec![Role::MANAGER]);
    let viewer = mint_jwt(owner_id, vec![Role::new("viewer")]);

    let (status, _) = srv.get(&staff, "/customers").await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = srv.post(&staff, "/customers", json!({ "name": "X" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
    let (status, _) = srv.get(&staff, "/finance/transactions").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let res = srv
        .client
        .put(srv.url("/settings"))
        .bearer_auth(&manager)
        .json(&json!({ "business_name": "Nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let (status, _) = srv.post(&manager, "/payroll/run", json!({ "period_start": "2026-03-01", "period_end": "2026-03-31" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = srv.get(&viewer, "/customers").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn booking_checkout_updates_finance_points_and_voucher() {
    let srv = TestServer::spawn().await;
    let token = owner_token();

    let service = srv
        .create(&token, "/services", json!({ "name": "Colour", "category": "hair", "duration_minutes": 60, "price": 5000 }))
        .await;
    let customer = srv.create(&token, "/customers", json!({ "name": "Hoa" })).await;
    let stylist = srv.create(&token, "/staff", json!({ "name": "Tuan", "base_salary": 0 })).await;
    let voucher = srv
        .create(&token, "/vouchers", json!({ "code": "spring10", "kind": "percentage", "value": 10 }))
        .await;
    assert_eq!(voucher["code"], "SPRING10");

    let (status, _) = srv
        .post(&token, "/vouchers", json!({ "code": "Spring10", "kind": "fixed", "value": 500 }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, preview) = srv.post(&token, "/vouchers/validate", json!({ "code": "spring10", "amount": 5000 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["discount"], 500);

    let appt = srv
        .create(
            &token,
            "/appointments",
            json!({
                "customer_id": id_of(&customer),
                "staff_id": id_of(&stylist),
                "service_ids": [id_of(&service)],
                "start_at": "2030-05-04T10:00:00Z",
                "voucher_code": "spring10",
            }),
        )
        .await;
    assert_eq!(appt["status"], "booked");
    assert_eq!(appt["end_at"], "2030-05-04T11:00:00Z");
    assert_eq!(appt["total"], 5000);

    // Same stylist, overlapping slot.
    let (status, body) = srv
        .post(
            &token,
            "/appointments",
            json!({
                "customer_id": id_of(&customer),
                "staff_id": id_of(&stylist),
                "service_ids": [id_of(&service)],
                "start_at": "2030-05-04T10:30:00Z",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let appt_id = id_of(&appt);
    let (status, receipt) = srv.post(&token, &format!("/appointments/{appt_id}/complete"), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{receipt}");
    assert_eq!(receipt["appointment"]["status"], "completed");
    assert_eq!(receipt["appointment"]["discount"], 500);
    assert_eq!(receipt["transaction"]["amount"], 4500);
    assert_eq!(receipt["transaction"]["category"], "services");
    assert_eq!(receipt["voucher"]["used_count"], 1);
    assert_eq!(receipt["points"]["delta"], 45);

    let (status, _) = srv.post(&token, &format!("/appointments/{appt_id}/cancel"), json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, hoa) = srv.get(&token, &format!("/customers/{}", id_of(&customer))).await;
    assert_eq!(hoa["visit_count"], 1);
    assert_eq!(hoa["total_spent"], 4500);
    assert_eq!(hoa["points_balance"], 45);

    let (_, ledger) = srv.get(&token, &format!("/customers/{}/points", id_of(&customer))).await;
    assert_eq!(ledger["total"], 1);
    let (_, history) = srv.get(&token, &format!("/customers/{}/appointments", id_of(&customer))).await;
    assert_eq!(history["total"], 1);

    let (status, summary) = srv.get(&token, "/finance/summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["income"], 4500);
    assert_eq!(summary["net"], 4500);

    // Points cannot be overdrawn.
    let (status, _) = srv
        .post(&token, "/points", json!({ "customer_id": id_of(&customer), "delta": -100, "reason": "redeem" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, entry) = srv
        .post(&token, "/points", json!({ "customer_id": id_of(&customer), "delta": -40, "reason": "redeem" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["balance_after"], 5);
}

#[tokio::test]
async fn cancel_and_no_show_only_from_booked() {
    let srv = TestServer::spawn().await;
    let token = owner_token();
    let service = srv
        .create(&token, "/services", json!({ "name": "Nails", "duration_minutes": 45, "price": 1500 }))
        .await;
    let customer = srv.create(&token, "/customers", json!({ "name": "Thu" })).await;
    let book = |start: &str| {
        json!({
            "customer_id": id_of(&customer),
            "service_ids": [id_of(&service)],
            "start_at": start,
        })
    };

    let a = srv.create(&token, "/appointments", book("2030-01-10T09:00:00Z")).await;
    let (status, body) = srv
        .post(&token, &format!("/appointments/{}/cancel", id_of(&a)), json!({ "reason": "sick" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["cancel_reason"], "sick");

    let b = srv.create(&token, "/appointments", book("2030-01-11T09:00:00Z")).await;
    let (status, body) = srv.post(&token, &format!("/appointments/{}/no-show", id_of(&b)), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "no_show");
    let (status, _) = srv.post(&token, &format!("/appointments/{}/complete", id_of(&b)), json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, booked) = srv.get(&token, "/appointments?status=booked").await;
    assert_eq!(booked["total"], 0);
    let (_, jan) = srv.get(&token, "/appointments?from=2030-01-11&to=2030-01-11").await;
    assert_eq!(jan["total"], 1);
}

#[tokio::test]
async fn inventory_adjustments_and_low_stock() {
    let srv = TestServer::spawn().await;
    let token = owner_token();

    let item = srv
        .create(&token, "/inventory", json!({ "name": "Shampoo", "sku": "sh-01", "quantity": 5, "reorder_level": 2 }))
        .await;
    let id = id_of(&item);
    assert_eq!(item["sku"], "SH-01");

    let (status, body) = srv
        .post(&token, &format!("/inventory/{id}/adjust"), json!({ "delta": -4, "kind": "usage", "reason": "backbar" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["item"]["quantity"], 1);
    assert_eq!(body["movement"]["quantity_after"], 1);
    assert_eq!(body["low_stock"], true);

    let (status, body) = srv
        .post(&token, &format!("/inventory/{id}/adjust"), json!({ "delta": -5, "kind": "sale" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invariant_violation");

    let (_, low) = srv.get(&token, "/inventory/low-stock").await;
    assert_eq!(low["items"].as_array().unwrap().len(), 1);
    let (_, got) = srv.get(&token, &format!("/inventory/{id}")).await;
    assert_eq!(got["quantity"], 1);
    let (_, moves) = srv.get(&token, &format!("/inventory/{id}/movements")).await;
    assert_eq!(moves["total"], 1);

    let (status, _) = srv.post(&token, "/inventory", json!({ "name": "Dup", "sku": "SH-01" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn attendance_and_payroll_run() {
    let srv = TestServer::spawn().await;
    let token = owner_token();
    let member = srv.create(&token, "/staff", json!({ "name": "Lan", "base_salary": 260000 })).await;
    let staff_id = id_of(&member);

    for date in ["2026-03-02", "2026-03-03"] {
        srv.create(
            &token,
            "/attendance",
            json!({
                "staff_id": staff_id,
                "date": date,
                "status": "present",
                "check_in": format!("{date}T09:00:00Z"),
                "check_out": format!("{date}T17:00:00Z"),
            }),
        )
        .await;
    }
    let (status, _) = srv
        .post(&token, "/attendance", json!({ "staff_id": staff_id, "date": "2026-03-02", "status": "absent" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = srv
        .post(
            &token,
            "/attendance",
            json!({
                "staff_id": staff_id,
                "date": "2026-03-04",
                "status": "present",
                "check_in": "2026-03-04T17:00:00Z",
                "check_out": "2026-03-04T09:00:00Z",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, days) = srv.get(&token, &format!("/staff/{staff_id}/attendance")).await;
    assert_eq!(days["total"], 2);

    // Today's clock-in/out.
    let (status, _) = srv.post(&token, &format!("/staff/{staff_id}/attendance/check-in"), json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = srv.post(&token, &format!("/staff/{staff_id}/attendance/check-in"), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, body) = srv.post(&token, &format!("/staff/{staff_id}/attendance/check-out"), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["check_out"].is_string());

    let run = json!({ "period_start": "2026-03-01", "period_end": "2026-03-31" });
    let (status, body) = srv.post(&token, "/payroll/run", run.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let record = &body["items"][0];
    assert_eq!(record["working_days"], 26);
    assert_eq!(record["days_present"], 2);
    assert_eq!(record["base_pay"], 20000);
    assert_eq!(record["net_pay"], 20000);

    let (status, _) = srv.post(&token, "/payroll/run", run).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, payroll) = srv.get(&token, "/payroll").await;
    assert_eq!(payroll["total"], 1);

    let (_, summary) = srv.get(&token, "/finance/summary?from=2026-01-01&to=2030-12-31").await;
    assert_eq!(summary["expense"], 20000);
}

#[tokio::test]
async fn check_out_closes_a_shift_started_yesterday() {
    let srv = TestServer::spawn().await;
    let token = owner_token();
    let member = srv.create(&token, "/staff", json!({ "name": "Minh" })).await;
    let staff_id = id_of(&member);
    let yesterday = Utc::now().date_naive() - ChronoDuration::days(1);

    let open = srv
        .create(
            &token,
            "/attendance",
            json!({
                "staff_id": staff_id,
                "date": yesterday.to_string(),
                "status": "present",
                "check_in": format!("{yesterday}T22:00:00Z"),
            }),
        )
        .await;

    let (status, body) = srv.post_raw(&token, &format!("/staff/{staff_id}/attendance/check-out"), "").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["id"], open["id"]);
    assert!(body["check_out"].is_string());

    let (status, body) = srv.post(&token, &format!("/staff/{staff_id}/attendance/check-out"), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn attendance_patch_nulls_clear_times() {
    let srv = TestServer::spawn().await;
    let token = owner_token();
    let member = srv.create(&token, "/staff", json!({ "name": "Hoa" })).await;
    let day = srv
        .create(
            &token,
            "/attendance",
            json!({
                "staff_id": id_of(&member),
                "date": "2026-04-06",
                "status": "present",
                "check_in": "2026-04-06T09:00:00Z",
                "check_out": "2026-04-06T17:00:00Z",
            }),
        )
        .await;
    let path = format!("/attendance/{}", id_of(&day));

    let (status, body) = srv
        .patch(&token, &path, json!({ "status": "leave", "check_in": null, "check_out": null }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "leave");
    assert!(body["check_in"].is_null());
    assert!(body["check_out"].is_null());
}

#[tokio::test]
async fn optional_bodies_and_typed_queries_use_json_errors() {
    let srv = TestServer::spawn().await;
    let token = owner_token();

    let (status, body) = srv.get(&token, "/finance/summary?from=yesterday&to=2030-01-01").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_query");

    let service = srv
        .create(&token, "/services", json!({ "name": "Trim", "duration_minutes": 30, "price": 1000 }))
        .await;
    let customer = srv.create(&token, "/customers", json!({ "name": "Quan" })).await;
    let mut ids = Vec::new();
    for start in ["2030-02-01T09:00:00Z", "2030-02-02T09:00:00Z", "2030-02-03T09:00:00Z"] {
        let a = srv
            .create(
                &token,
                "/appointments",
                json!({ "customer_id": id_of(&customer), "service_ids": [id_of(&service)], "start_at": start }),
            )
            .await;
        ids.push(id_of(&a));
    }

    let (status, body) = srv.post_raw(&token, &format!("/appointments/{}/cancel", ids[0]), "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_body");

    let (status, body) = srv.post_raw(&token, &format!("/appointments/{}/cancel", ids[1]), "").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "cancelled");

    let (status, body) = srv.post(&token, &format!("/appointments/{}/cancel", ids[2]), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["cancel_reason"].is_null());
}

#[tokio::test]
async fn settings_default_then_update() {
    let srv = TestServer::spawn().await;
    let token = owner_token();

    let (status, defaults) = srv.get(&token, "/settings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(defaults["currency"], "USD");
    assert_eq!(defaults["points_per_currency_unit"], 100);

    let res = srv
        .client
        .put(srv.url("/settings"))
        .bearer_auth(&token)
        .json(&json!({ "business_name": "Lotus Spa", "currency": "vnd", "default_commission_bps": 1500 }))
        .send()
        .await
        .unwrap();
    let (status, saved) = read(res).await;
    assert_eq!(status, StatusCode::OK, "{saved}");
    assert_eq!(saved["currency"], "VND");

    let (_, reread) = srv.get(&token, "/settings").await;
    assert_eq!(reread["business_name"], "Lotus Spa");

    // New staff inherit the default commission rate.
    let member = srv.create(&token, "/staff", json!({ "name": "Kim" })).await;
    assert_eq!(member["commission_rate_bps"], 1500);

    let res = srv
        .client
        .put(srv.url("/settings"))
        .bearer_auth(&token)
        .json(&json!({ "currency": "dollars" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
