use std::sync::Arc;

use auth::TokenIssuer;
use chrono::Utc;
use identity_service::domain::subject::models::Subject;
use identity_service::domain::subject::models::SubjectId;
use identity_service::domain::subject::policy::RolePolicies;
use identity_service::domain::subject::ports::SubjectRepository;
use identity_service::domain::subject::service::AuthService;
use identity_service::inbound::http::router::create_router;
use identity_service::outbound::password::Argon2PasswordHashing;
use identity_service::outbound::repositories::InMemoryStore;
use serde_json::Value;

pub const TEST_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";
pub const TEST_ISSUER: &str = "identity-service-test";
pub const PASSWORD: &str = "pass_word!";

/// Test application that spawns a real server over the in-memory store
pub struct TestApp {
    pub address: String,
    pub store: InMemoryStore,
    pub issuer: Arc<TokenIssuer>,
    pub api_client: reqwest::Client,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        Self::spawn_with_policies(RolePolicies::default()).await
    }

    pub async fn spawn_with_policies(policies: RolePolicies) -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let store = InMemoryStore::new();
        let issuer = Arc::new(TokenIssuer::new(TEST_SECRET, TEST_ISSUER));

        let auth_service = Arc::new(AuthService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(Argon2PasswordHashing::new()),
            Arc::clone(&issuer),
            policies,
        ));

        let router = create_router(auth_service, Arc::clone(&issuer));

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            store,
            issuer,
            api_client: reqwest::Client::builder()
                .build()
                .expect("Failed to create reqwest client"),
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(&format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(&format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Register a subject and return the response body, asserting 201
    pub async fn join(&self, role: &str, body: Value) -> Value {
        let response = self
            .post(&format!("/api/auth/{}/join", role))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        response.json().await.expect("Failed to parse response")
    }

    pub async fn login(&self, role: &str, identifier: &str, password: &str) -> reqwest::Response {
        self.post(&format!("/api/auth/{}/login", role))
            .json(&serde_json::json!({
                "identifier": identifier,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn refresh(&self, role: &str, refresh_token: &str) -> reqwest::Response {
        self.post(&format!("/api/auth/{}/refresh", role))
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn logout(&self, role: &str, refresh_token: &str) -> reqwest::Response {
        self.post(&format!("/api/auth/{}/logout", role))
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Mark a stored subject suspended
    pub async fn suspend(&self, subject_id: &SubjectId) {
        let mut subject = self.stored_subject(subject_id).await;
        subject.suspended_at = Some(Utc::now());
        self.store.update(subject).await.expect("Failed to suspend");
    }

    /// Soft-delete a stored subject
    pub async fn soft_delete(&self, subject_id: &SubjectId) {
        let mut subject = self.stored_subject(subject_id).await;
        subject.deleted_at = Some(Utc::now());
        self.store.update(subject).await.expect("Failed to delete");
    }

    pub async fn stored_subject(&self, subject_id: &SubjectId) -> Subject {
        self.store
            .find_by_id(subject_id)
            .await
            .expect("Store failure")
            .expect("Subject not stored")
    }
}

/// Subject id of an authorization envelope body
pub fn subject_id(body: &Value) -> SubjectId {
    SubjectId::from_string(body["data"]["subject"]["id"].as_str().unwrap()).unwrap()
}

pub fn access_token(body: &Value) -> String {
    body["data"]["token"]["access"].as_str().unwrap().to_string()
}

pub fn refresh_token(body: &Value) -> String {
    body["data"]["token"]["refresh"].as_str().unwrap().to_string()
}
