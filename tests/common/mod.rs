#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::Value;
use tower::ServiceExt;

use mandato_pro::auth::{NovoUsuario, UserRegistry, Usuario};
use mandato_pro::cadastros::{EleitorPayload, EleitorRegistry, Eleitor};
use mandato_pro::config::AppConfig;
use mandato_pro::database::models::Perfil;
use mandato_pro::database::Database;
use mandato_pro::routes::build_router;
use mandato_pro::state::AppState;

pub const SENHA: &str = "senha-segura-123";

/// Setup an in-memory SQLite database for testing
pub async fn setup_test_db() -> Database {
    Database::new_in_memory().await.expect("Failed to create test database")
}

pub async fn create_user(db: &Database, nome: &str, email: &str, perfil: Perfil) -> Usuario {
    UserRegistry::new(db)
        .create(
            None,
            NovoUsuario {
                nome: nome.to_string(),
                email: email.to_string(),
                senha: SENHA.to_string(),
                perfil,
                ativo: true,
            },
        )
        .await
        .expect("Failed to create user")
}

pub async fn create_admin(db: &Database) -> Usuario {
    create_user(db, "Administrador", "admin@gabinete.gov.br", Perfil::Administrador).await
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub async fn create_eleitor(db: &Database, actor: i64, nome: &str) -> Eleitor {
    EleitorRegistry::new(db)
        .create(
            actor,
            EleitorPayload {
                nome: nome.to_string(),
                telefone: Some("(11) 98888-7777".to_string()),
                bairro: Some("Centro".to_string()),
                cidade: Some("São Paulo".to_string()),
                uf: Some("SP".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to create voter")
}

/// Router over an in-memory database, with documents stored under `documents_dir`
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub async fn new(documents_dir: &str) -> Self {
        let database = setup_test_db().await;
        let config = AppConfig::for_tests(documents_dir);
        let state = AppState::new(config, database).expect("Failed to build state");
        let router = build_router(state.clone());
        Self { state, router }
    }

    pub fn database(&self) -> &Database {
        &self.state.database
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = self.raw_request(method, uri, token, body).await;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn raw_request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    /// Log in through the API and return the bearer token
    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(serde_json::json!({ "email": email, "senha": SENHA })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }
}
