#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use account_service::domain::notification::DispatchError;
use account_service::domain::notification::Notification;
use account_service::domain::notification::NotificationDispatcher;
use account_service::identity::errors::IdentityError;
use account_service::identity::errors::RoleError;
use account_service::identity::models::EmailAddress;
use account_service::identity::models::FullName;
use account_service::identity::models::Identity;
use account_service::identity::models::Role;
use account_service::identity::models::RoleFlags;
use account_service::identity::models::Session;
use account_service::identity::models::SessionId;
use account_service::identity::models::UserId;
use account_service::identity::ports::IdentityRepository;
use account_service::identity::ports::SessionStore;
use account_service::identity::service::AccountService;
use account_service::identity::service::AccountSettings;
use account_service::inbound::http::router::create_router;
use account_service::inbound::http::router::AppState;
use account_service::password::errors::PasswordLifecycleError;
use account_service::password::models::ResetTicket;
use account_service::password::models::TicketId;
use account_service::password::ports::ResetTicketRepository;
use account_service::password::service::PasswordService;
use account_service::password::service::PasswordSettings;
use account_service::profile::errors::ProfileError;
use account_service::profile::models::Profile;
use account_service::profile::models::ProfileChanges;
use account_service::profile::models::ProfileOwner;
use account_service::profile::ports::ProfileRepository;
use account_service::profile::service::ProfileService;
use account_service::repositories::PostgresIdentityRepository;
use async_trait::async_trait;
use auth::Authenticator;
use chrono::Utc;
use serde_json::json;
use serde_json::Value;
use sqlx::postgres::PgConnectOptions;
use sqlx::postgres::PgPoolOptions;
use sqlx::Connection;
use sqlx::Executor;
use sqlx::PgConnection;
use sqlx::PgPool;

pub const JWT_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";
pub const FRONTEND_URL: &str = "https://app.example.com";
pub const PASSWORD: &str = "correct-horse-battery";

/// Test application that spawns a real server over in-memory storage
pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub authenticator: Arc<Authenticator>,
    pub identities: Arc<InMemoryIdentityRepository>,
    pub sessions: Arc<InMemorySessionStore>,
    pub profiles: Arc<InMemoryProfileRepository>,
    pub mailer: Arc<RecordingDispatcher>,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        Self::spawn_with(false).await
    }

    pub async fn spawn_with(strict_flattened_keys: bool) -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let authenticator = Arc::new(Authenticator::new(JWT_SECRET));
        let identities = Arc::new(InMemoryIdentityRepository::default());
        let sessions = Arc::new(InMemorySessionStore::default());
        let profiles = Arc::new(InMemoryProfileRepository::new(Arc::clone(&identities)));
        let tickets = Arc::new(InMemoryResetTicketRepository::new(
            Arc::clone(&identities),
            Arc::clone(&sessions),
        ));
        let mailer = Arc::new(RecordingDispatcher::default());

        let account_service = Arc::new(AccountService::new(
            Arc::clone(&identities),
            Arc::clone(&sessions),
            Arc::clone(&mailer),
            Arc::clone(&authenticator),
            AccountSettings {
                token_ttl: chrono::Duration::hours(24),
                session_ttl: chrono::Duration::hours(336),
                verification_ttl: chrono::Duration::hours(72),
                frontend_url: FRONTEND_URL.to_string(),
            },
        ));
        let password_service = Arc::new(PasswordService::new(
            Arc::clone(&identities),
            tickets,
            Arc::clone(&sessions),
            Arc::clone(&mailer),
            Arc::clone(&authenticator),
            PasswordSettings {
                ticket_ttl: chrono::Duration::minutes(60),
                frontend_url: FRONTEND_URL.to_string(),
                support_email: "support@example.com".to_string(),
            },
        ));
        let profile_service = Arc::new(ProfileService::new(
            Arc::clone(&profiles),
            strict_flattened_keys,
        ));

        let router = create_router(AppState {
            account_service,
            profile_service,
            password_service,
            authenticator: Arc::clone(&authenticator),
            cookie_name: "sessionid".to_string(),
        });

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            api_client: reqwest::Client::builder()
                .cookie_store(true)
                .build()
                .expect("Failed to create reqwest client"),
            authenticator,
            identities,
            sessions,
            profiles,
            mailer,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Helper to make GET request (session cookie included)
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(self.url(path))
    }

    pub fn put(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.put(self.url(path))
    }

    pub fn patch(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.patch(self.url(path))
    }

    /// A client without cookie storage, for bearer-only requests
    pub fn bare_client(&self) -> reqwest::Client {
        reqwest::Client::new()
    }

    pub async fn register(&self, email: &str, role: &str) -> reqwest::Response {
        self.post("/register")
            .json(&json!({
                "email": email,
                "password": PASSWORD,
                "full_name": "Alex Smith",
                "role": role,
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Log in through the cookie-keeping client and return the bearer token
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post("/login")
            .json(&json!({"email": email, "password": password}))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body: Value = response.json().await.expect("Failed to parse response");
        body["access"].as_str().expect("No access token").to_string()
    }

    /// Log in without touching the cookie jar of `api_client`
    pub async fn token_for(&self, email: &str) -> String {
        let response = self
            .bare_client()
            .post(self.url("/login"))
            .json(&json!({"email": email, "password": PASSWORD}))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body: Value = response.json().await.expect("Failed to parse response");
        body["access"].as_str().expect("No access token").to_string()
    }

    /// Register, log in (cookie) and complete the profile
    pub async fn onboard(&self, email: &str, role: &str, profile: Value) -> String {
        assert_eq!(self.register(email, role).await.status(), reqwest::StatusCode::CREATED);
        let token = self.login(email, PASSWORD).await;

        let response = self
            .post("/me")
            .json(&profile)
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        token
    }

    /// Store an identity directly, bypassing registration
    pub fn seed_identity(&self, email: &str, roles: RoleFlags) -> Identity {
        let identity = Identity {
            id: UserId::new(),
            email: EmailAddress::new(email.to_string()).unwrap(),
            full_name: FullName::new("Seeded User").unwrap(),
            phone: None,
            password_hash: self.authenticator.hash_password(PASSWORD).unwrap(),
            roles,
            email_verified: true,
            created_at: Utc::now(),
        };
        self.identities.insert(identity.clone());
        identity
    }
}

/// Throwaway Postgres database with migrations applied.
///
/// Only available when `DATABASE_URL` points at a server the tests may create
/// databases on; `new` returns `None` otherwise.
pub struct TestDb {
    pub pool: PgPool,
    pub db_name: String,
    server_url: String,
}

impl TestDb {
    /// Create a new test database with a unique name
    pub async fn new() -> Option<Self> {
        let Ok(server_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping Postgres-backed test");
            return None;
        };

        let db_name = format!(
            "test_account_service_{}",
            uuid::Uuid::new_v4().to_string().replace('-', "_")
        );

        let mut conn = PgConnection::connect(&server_url)
            .await
            .expect("Failed to connect to Postgres");

        conn.execute(format!(r#"CREATE DATABASE "{}";"#, db_name).as_str())
            .await
            .expect("Failed to create test database");

        let options = server_url
            .parse::<PgConnectOptions>()
            .expect("Failed to parse DATABASE_URL")
            .database(&db_name);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        Some(Self {
            pool,
            db_name,
            server_url,
        })
    }

    /// Insert a user holding exactly `role`
    pub async fn seed_identity(&self, email: &str, role: Role) -> Identity {
        let identity = Identity {
            id: UserId::new(),
            email: EmailAddress::new(email.to_string()).expect("Invalid email"),
            full_name: FullName::new("Alex Smith").expect("Invalid name"),
            phone: None,
            password_hash: "original-hash".to_string(),
            roles: RoleFlags::from(role),
            email_verified: true,
            created_at: Utc::now(),
        };

        PostgresIdentityRepository::new(self.pool.clone())
            .create(identity)
            .await
            .expect("Failed to insert identity")
    }

    pub async fn password_hash(&self, user_id: &UserId) -> String {
        sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
            .bind(user_id.0)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to read password hash")
    }

    pub async fn session_count(&self, user_id: &UserId) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE user_id = $1")
            .bind(user_id.0)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count sessions")
    }

    pub async fn ticket_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM password_reset_tickets")
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count tickets")
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        // Database cleanup happens asynchronously
        let db_name = self.db_name.clone();
        let server_url = self.server_url.clone();
        tokio::spawn(async move {
            if let Ok(mut conn) = PgConnection::connect(&server_url).await {
                let _ = conn
                    .execute(
                        format!(
                            r#"SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{}';"#,
                            db_name
                        )
                        .as_str(),
                    )
                    .await;

                let _ = conn
                    .execute(format!(r#"DROP DATABASE IF EXISTS "{}";"#, db_name).as_str())
                    .await;
            }
        });
    }
}

/// Collects dispatched notifications
#[derive(Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingDispatcher {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    /// Dispatch runs detached from the request, so poll for it
    pub async fn wait_for(&self, template: &str, recipient: &str) -> Notification {
        for _ in 0..200 {
            let found = self
                .sent()
                .into_iter()
                .rev()
                .find(|n| n.template == template && n.recipient == recipient);
            if let Some(notification) = found {
                return notification;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("No {} notification for {}", template, recipient);
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, notification: &Notification) -> Result<(), DispatchError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryIdentityRepository {
    users: Mutex<HashMap<UserId, Identity>>,
}

impl InMemoryIdentityRepository {
    pub fn insert(&self, identity: Identity) {
        self.users.lock().unwrap().insert(identity.id, identity);
    }

    pub fn get(&self, id: &UserId) -> Option<Identity> {
        self.users.lock().unwrap().get(id).cloned()
    }

    pub fn by_email(&self, email: &str) -> Option<Identity> {
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|identity| identity.email.as_str() == email)
            .cloned()
    }

    fn write_owner(&self, owner: &ProfileOwner) {
        if let Some(identity) = self.users.lock().unwrap().get_mut(&owner.id) {
            identity.full_name = owner.full_name.clone();
            identity.phone = owner.phone.clone();
        }
    }

    fn set_password(&self, id: &UserId, password_hash: &str) -> bool {
        match self.users.lock().unwrap().get_mut(id) {
            Some(identity) => {
                identity.password_hash = password_hash.to_string();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl IdentityRepository for InMemoryIdentityRepository {
    async fn create(&self, identity: Identity) -> Result<Identity, IdentityError> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == identity.email) {
            return Err(IdentityError::EmailAlreadyExists(
                identity.email.as_str().to_string(),
            ));
        }
        users.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<Identity>, IdentityError> {
        Ok(self.get(id))
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<Identity>, IdentityError> {
        Ok(self.by_email(email.as_str()))
    }

    async fn mark_email_verified(&self, id: &UserId) -> Result<(), IdentityError> {
        match self.users.lock().unwrap().get_mut(id) {
            Some(identity) => {
                identity.email_verified = true;
                Ok(())
            }
            None => Err(IdentityError::NotFound(id.to_string())),
        }
    }

    async fn update_password(
        &self,
        id: &UserId,
        password_hash: &str,
    ) -> Result<(), IdentityError> {
        if self.set_password(id, password_hash) {
            Ok(())
        } else {
            Err(IdentityError::NotFound(id.to_string()))
        }
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
}

impl InMemorySessionStore {
    pub fn count_for(&self, user_id: &UserId) -> usize {
        self.sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| &s.user_id == user_id)
            .count()
    }

    fn revoke_all(&self, user_id: &UserId) {
        self.sessions
            .lock()
            .unwrap()
            .retain(|_, s| &s.user_id != user_id);
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: Session) -> Result<Session, IdentityError> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id, session.clone());
        Ok(session)
    }

    async fn load(&self, id: &SessionId) -> Result<Option<Session>, IdentityError> {
        let now = Utc::now();
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(id)
            .filter(|s| !s.is_expired(now))
            .cloned())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), IdentityError> {
        self.sessions.lock().unwrap().remove(id);
        Ok(())
    }

    async fn delete_for_user(
        &self,
        user_id: &UserId,
        keep: Option<SessionId>,
    ) -> Result<u64, IdentityError> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|id, s| &s.user_id != user_id || Some(*id) == keep);
        Ok((before - sessions.len()) as u64)
    }
}

/// Profiles keyed by owner; the owner part is always re-read from the
/// identity store, as the SQL join does.
pub struct InMemoryProfileRepository {
    identities: Arc<InMemoryIdentityRepository>,
    profiles: Mutex<HashMap<UserId, Profile>>,
}

impl InMemoryProfileRepository {
    pub fn new(identities: Arc<InMemoryIdentityRepository>) -> Self {
        Self {
            identities,
            profiles: Mutex::new(HashMap::new()),
        }
    }

    pub fn stored(&self, user_id: &UserId) -> Option<Profile> {
        self.profiles.lock().unwrap().get(user_id).cloned()
    }

    fn owned_by(&self, user_id: &UserId, role: Role) -> Result<Option<Identity>, ProfileError> {
        let Some(identity) = self.identities.get(user_id) else {
            return Ok(None);
        };
        let found = identity.roles.classify()?;
        if found != role {
            return Err(ProfileError::InvalidRole(RoleError::Mismatch {
                expected: role,
                found,
            }));
        }
        Ok(Some(identity))
    }

    fn check_specialty(changes: &ProfileChanges) -> Result<(), ProfileError> {
        match changes.assigned_specialty() {
            Some(specialty) if !(1..=6).contains(&specialty.0) => {
                Err(ProfileError::Validation(
                    account_service::domain::fields::FieldErrors::single(
                        "specialty",
                        format!("Invalid pk \"{}\" - object does not exist.", specialty),
                    ),
                ))
            }
            _ => Ok(()),
        }
    }
}

fn with_owner(mut profile: Profile, identity: &Identity) -> Profile {
    let owner = ProfileOwner::from(identity);
    match &mut profile {
        Profile::Doctor(doctor) => doctor.owner = owner,
        Profile::Patient(patient) => patient.owner = owner,
    }
    profile
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn find(&self, user_id: &UserId, role: Role) -> Result<Option<Profile>, ProfileError> {
        let Some(identity) = self.owned_by(user_id, role)? else {
            return Ok(None);
        };

        Ok(self
            .stored(user_id)
            .filter(|profile| profile.role() == role)
            .map(|profile| with_owner(profile, &identity)))
    }

    async fn update(
        &self,
        user_id: &UserId,
        changes: ProfileChanges,
    ) -> Result<Option<Profile>, ProfileError> {
        let Some(identity) = self.owned_by(user_id, changes.role())? else {
            return Ok(None);
        };
        let Some(profile) = self.stored(user_id) else {
            return Ok(None);
        };

        Self::check_specialty(&changes)?;
        let mut profile = with_owner(profile, &identity);
        profile.apply(changes)?;

        self.identities.write_owner(profile.owner());
        self.profiles
            .lock()
            .unwrap()
            .insert(*user_id, profile.clone());

        Ok(Some(profile))
    }

    async fn create(
        &self,
        user_id: &UserId,
        changes: ProfileChanges,
    ) -> Result<Profile, ProfileError> {
        let identity = self
            .owned_by(user_id, changes.role())?
            .ok_or_else(|| ProfileError::NotFound(user_id.to_string()))?;
        if self.stored(user_id).is_some() {
            return Err(ProfileError::AlreadyExists);
        }

        Self::check_specialty(&changes)?;
        let mut profile = Profile::blank(ProfileOwner::from(&identity), changes.role());
        profile.apply(changes)?;

        self.identities.write_owner(profile.owner());
        self.profiles
            .lock()
            .unwrap()
            .insert(*user_id, profile.clone());

        Ok(profile)
    }
}

pub struct InMemoryResetTicketRepository {
    identities: Arc<InMemoryIdentityRepository>,
    sessions: Arc<InMemorySessionStore>,
    tickets: Mutex<HashMap<TicketId, ResetTicket>>,
}

impl InMemoryResetTicketRepository {
    pub fn new(
        identities: Arc<InMemoryIdentityRepository>,
        sessions: Arc<InMemorySessionStore>,
    ) -> Self {
        Self {
            identities,
            sessions,
            tickets: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ResetTicketRepository for InMemoryResetTicketRepository {
    async fn create(&self, ticket: ResetTicket) -> Result<ResetTicket, PasswordLifecycleError> {
        self.tickets
            .lock()
            .unwrap()
            .insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn find(&self, id: &TicketId) -> Result<Option<ResetTicket>, PasswordLifecycleError> {
        Ok(self.tickets.lock().unwrap().get(id).cloned())
    }

    async fn redeem(
        &self,
        id: &TicketId,
        user_id: &UserId,
        password_hash: &str,
    ) -> Result<bool, PasswordLifecycleError> {
        let now = Utc::now();
        let mut tickets = self.tickets.lock().unwrap();

        let usable = tickets.get(id).map_or(false, |ticket| {
            &ticket.user_id == user_id && ticket.consumed_at.is_none() && ticket.expires_at > now
        });
        if !usable {
            return Ok(false);
        }

        for ticket in tickets.values_mut() {
            if &ticket.user_id == user_id && ticket.consumed_at.is_none() {
                ticket.consumed_at = Some(now);
            }
        }
        drop(tickets);

        self.identities.set_password(user_id, password_hash);
        self.sessions.revoke_all(user_id);

        Ok(true)
    }
}
