//! Deployable HTTP server for the Veriloc verification engine.
//!
//! Wires a [`SqliteStore`], a [`PushLocationSource`] (devices POST fixes,
//! the engine pulls them), and a config-defined site registry into the
//! [`veriloc_api`] router, wrapped in HTTP Basic auth and request tracing.

pub mod auth;
pub mod error;
pub mod push;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware, routing::post};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use uuid::Uuid;
use veriloc_core::geofence::TargetLocation;
use veriloc_engine::{StaticTargetRegistry, VerificationEngine};
use veriloc_store_sqlite::SqliteStore;

use auth::AuthConfig;
use push::PushLocationSource;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  pub auth_username:      String,
  pub auth_password_hash: String,
  /// The site registry; static reference data for this deployment.
  #[serde(default)]
  pub sites:              Vec<SiteConfig>,
}

/// One geofenced site from the configuration file.
#[derive(Deserialize, Clone)]
pub struct SiteConfig {
  pub target_id: Uuid,
  pub latitude:  f64,
  pub longitude: f64,
  pub radius_m:  f64,
  pub org_id:    Uuid,
}

impl SiteConfig {
  pub fn into_target(self) -> TargetLocation {
    TargetLocation {
      target_id: self.target_id,
      latitude:  self.latitude,
      longitude: self.longitude,
      radius_m:  self.radius_m,
      org_id:    self.org_id,
    }
  }
}

// ─── Application ─────────────────────────────────────────────────────────────

/// The engine type this server deploys.
pub type ServerEngine =
  VerificationEngine<SqliteStore, PushLocationSource, StaticTargetRegistry>;

/// Assemble the full router: the verification API, the device fix intake,
/// Basic auth in front of everything, and request tracing outermost.
pub fn app(
  engine: ServerEngine,
  source: Arc<PushLocationSource>,
  auth: Arc<AuthConfig>,
) -> Router {
  let fix_intake = Router::new()
    .route("/subjects/{id}/fix", post(push::push_fix))
    .with_state(source);

  veriloc_api::api_router(engine)
    .merge(fix_intake)
    .layer(middleware::from_fn_with_state(auth, auth::require_auth))
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::Engine as _;
  use base64::engine::general_purpose::STANDARD as B64;
  use rand_core::OsRng;
  use tower::ServiceExt as _;
  use veriloc_engine::EngineConfig;

  struct Harness {
    engine: ServerEngine,
    source: Arc<PushLocationSource>,
    auth:   Arc<AuthConfig>,
    site:   TargetLocation,
  }

  async fn make_harness(password: &str) -> Harness {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let source = Arc::new(PushLocationSource::new());

    // One site ~111 m north of the origin with a 200 m fence.
    let site = TargetLocation {
      target_id: Uuid::new_v4(),
      latitude:  0.001,
      longitude: 0.0,
      radius_m:  200.0,
      org_id:    Uuid::new_v4(),
    };

    let engine = VerificationEngine::new(
      Arc::new(store),
      source.clone(),
      Arc::new(StaticTargetRegistry::new([site.clone()])),
      EngineConfig::default(),
    );

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();

    Harness {
      engine,
      source,
      auth: Arc::new(AuthConfig {
        username:      "controller".to_string(),
        password_hash: hash,
      }),
      site,
    }
  }

  fn auth_header(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  impl Harness {
    fn app(&self) -> Router {
      app(self.engine.clone(), self.source.clone(), self.auth.clone())
    }

    async fn request(
      &self,
      method: &str,
      uri: &str,
      auth: Option<&str>,
      body: Option<serde_json::Value>,
    ) -> axum::response::Response {
      let mut builder = Request::builder().method(method).uri(uri);
      if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
      }
      let req = match body {
        Some(json) => builder
          .header(header::CONTENT_TYPE, "application/json")
          .body(Body::from(json.to_string()))
          .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
      };
      self.app().oneshot(req).await.unwrap()
    }
  }

  async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn verify_body(h: &Harness, subject: Uuid) -> serde_json::Value {
    serde_json::json!({
      "subject_id": subject,
      "purpose": "work_verification",
      "targets": [{
        "target_id": h.site.target_id,
        "latitude": h.site.latitude,
        "longitude": h.site.longitude,
        "radius_m": h.site.radius_m,
        "org_id": h.site.org_id,
      }],
    })
  }

  async fn grant(h: &Harness, auth: &str, subject: Uuid, purpose: &str) {
    let resp = h
      .request(
        "POST",
        "/consents",
        Some(auth),
        Some(serde_json::json!({ "subject_id": subject, "purpose": purpose })),
      )
      .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
  }

  async fn push_fix(h: &Harness, auth: &str, subject: Uuid, body: serde_json::Value) {
    let resp = h
      .request(
        "POST",
        &format!("/subjects/{subject}/fix"),
        Some(auth),
        Some(body),
      )
      .await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
  }

  // ── Auth ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn unauthenticated_requests_return_401() {
    let h = make_harness("secret").await;
    let resp = h
      .request(
        "GET",
        &format!("/subjects/{}/export", Uuid::new_v4()),
        None,
        None,
      )
      .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  #[tokio::test]
  async fn wrong_password_is_rejected() {
    let h = make_harness("secret").await;
    let auth = auth_header("controller", "wrong");
    let resp = h
      .request(
        "GET",
        &format!("/subjects/{}/export", Uuid::new_v4()),
        Some(&auth),
        None,
      )
      .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  // ── Verification flow ────────────────────────────────────────────────────

  #[tokio::test]
  async fn full_verification_flow() {
    let h = make_harness("secret").await;
    let auth = auth_header("controller", "secret");
    let subject = Uuid::new_v4();

    grant(&h, &auth, subject, "work_verification").await;
    push_fix(
      &h,
      &auth,
      subject,
      serde_json::json!({
        "latitude": 0.0012, "longitude": 0.0, "accuracy_m": 12.0
      }),
    )
    .await;

    let resp = h
      .request("POST", "/verify", Some(&auth), Some(verify_body(&h, subject)))
      .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["outcome"], "verified");
    assert_eq!(body["contained"], true);
    assert_eq!(body["target_id"], h.site.target_id.to_string());
    assert_eq!(body["accuracy"], "good");
  }

  #[tokio::test]
  async fn verify_without_consent_returns_consent_required() {
    let h = make_harness("secret").await;
    let auth = auth_header("controller", "secret");
    let subject = Uuid::new_v4();

    let resp = h
      .request("POST", "/verify", Some(&auth), Some(verify_body(&h, subject)))
      .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["outcome"], "consent_required");
  }

  #[tokio::test]
  async fn mocked_fix_reports_opaque_untrusted_outcome() {
    let h = make_harness("secret").await;
    let auth = auth_header("controller", "secret");
    let subject = Uuid::new_v4();

    grant(&h, &auth, subject, "work_verification").await;
    push_fix(
      &h,
      &auth,
      subject,
      serde_json::json!({
        "latitude": 0.0012, "longitude": 0.0, "accuracy_m": 12.0,
        "reported_mocked": true
      }),
    )
    .await;

    let resp = h
      .request("POST", "/verify", Some(&auth), Some(verify_body(&h, subject)))
      .await;
    let body = json_body(resp).await;

    assert_eq!(body["outcome"], "untrusted_location");
    // The triggered layers are never revealed to the caller.
    assert!(body.get("reasons").is_none());
  }

  #[tokio::test]
  async fn second_verify_within_cooldown() {
    let h = make_harness("secret").await;
    let auth = auth_header("controller", "secret");
    let subject = Uuid::new_v4();

    grant(&h, &auth, subject, "work_verification").await;
    for _ in 0..2 {
      push_fix(
        &h,
        &auth,
        subject,
        serde_json::json!({
          "latitude": 0.0012, "longitude": 0.0, "accuracy_m": 12.0
        }),
      )
      .await;
    }

    let first = h
      .request("POST", "/verify", Some(&auth), Some(verify_body(&h, subject)))
      .await;
    assert_eq!(json_body(first).await["outcome"], "verified");

    let second = h
      .request("POST", "/verify", Some(&auth), Some(verify_body(&h, subject)))
      .await;
    let body = json_body(second).await;
    assert_eq!(body["outcome"], "cooldown");
    assert!(body["remaining_seconds"].as_i64().unwrap() > 0);
  }

  #[tokio::test]
  async fn degenerate_fix_is_rejected() {
    let h = make_harness("secret").await;
    let auth = auth_header("controller", "secret");
    let subject = Uuid::new_v4();

    let resp = h
      .request(
        "POST",
        &format!("/subjects/{subject}/fix"),
        Some(&auth),
        Some(serde_json::json!({
          "latitude": 120.0, "longitude": 0.0, "accuracy_m": 10.0
        })),
      )
      .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "invalid_coordinate");
  }

  // ── Rights flow ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn erase_then_export_returns_tokenised_audit_only() {
    let h = make_harness("secret").await;
    let auth = auth_header("controller", "secret");
    let subject = Uuid::new_v4();

    grant(&h, &auth, subject, "work_verification").await;
    push_fix(
      &h,
      &auth,
      subject,
      serde_json::json!({
        "latitude": 0.0012, "longitude": 0.0, "accuracy_m": 12.0
      }),
    )
    .await;
    let resp = h
      .request("POST", "/verify", Some(&auth), Some(verify_body(&h, subject)))
      .await;
    assert_eq!(json_body(resp).await["outcome"], "verified");

    let erase = h
      .request(
        "DELETE",
        &format!("/subjects/{subject}"),
        Some(&auth),
        None,
      )
      .await;
    assert_eq!(erase.status(), StatusCode::OK);
    let report = json_body(erase).await;
    assert_eq!(report["results_deleted"], 1);
    let token = report["token"].as_str().unwrap().to_string();
    assert!(token.starts_with("anon-"));

    let export = h
      .request(
        "GET",
        &format!("/subjects/{subject}/export"),
        Some(&auth),
        None,
      )
      .await;
    assert_eq!(export.status(), StatusCode::OK);
    let bundle = json_body(export).await;

    assert!(bundle["results"].as_array().unwrap().is_empty());
    assert!(bundle["cached_samples"].as_array().unwrap().is_empty());
    assert!(bundle["consents"].as_array().unwrap().is_empty());

    let audit = bundle["audit"].as_array().unwrap();
    assert!(!audit.is_empty());
    for entry in audit {
      assert_eq!(entry["subject"]["kind"], "anonymized");
      assert_eq!(entry["subject"]["value"], token);
    }
  }
}
