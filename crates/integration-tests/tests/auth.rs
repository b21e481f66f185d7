//! Auth service and session mirror tests against the fake Supabase.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use quickmart_core::{CurrentUser, Role, UserId};
use quickmart_integration_tests::FakeSupabase;
use quickmart_storefront::services::{AuthError, AuthService, SessionMirror};
use quickmart_storefront::supabase::{AuthSession, SupabaseClient};
use secrecy::ExposeSecret;

const OWNER: &str = "owner@quickmart.in";
const PASSWORD: &str = "password-123";

/// Backend clients plus a mirror wired to their auth events.
struct Harness {
    client: SupabaseClient,
    mirror: SessionMirror,
    _listener: tokio::task::JoinHandle<()>,
}

impl Harness {
    fn new(fake: &FakeSupabase, owner: Option<&str>) -> Self {
        let client = fake.client();
        let mirror = SessionMirror::new(
            client.rest().clone(),
            owner.map(|e| quickmart_core::Email::parse(e).unwrap()),
        );
        let listener = mirror.spawn_listener(client.auth().subscribe());
        Self {
            client,
            mirror,
            _listener: listener,
        }
    }

    fn service(&self) -> AuthService<'_> {
        AuthService::new(&self.client, &self.mirror)
    }

    async fn sign_in(&self, email: &str) -> (AuthSession, CurrentUser) {
        self.service().sign_in(email, PASSWORD).await.unwrap()
    }
}

/// Poll the mirror until `check` holds or five seconds pass.
async fn eventually<F>(mirror: &SessionMirror, session: &AuthSession, check: F) -> CurrentUser
where
    F: Fn(&CurrentUser) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let user = mirror.current(session).await.unwrap();
            if check(&user) {
                return user;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap()
}

// ============================================================================
// Sign-in / sign-up
// ============================================================================

#[tokio::test]
async fn test_sign_in_with_wrong_password() {
    let fake = FakeSupabase::start().await;
    fake.seed_user("asha@quickmart.in", PASSWORD, "Asha");
    let harness = Harness::new(&fake, None);

    let err = harness
        .service()
        .sign_in("asha@quickmart.in", "wrong")
        .await
        .unwrap_err();
    match err {
        AuthError::InvalidCredentials(message) => {
            assert_eq!(message, "Invalid login credentials");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_sign_in_validates_before_calling_server() {
    let fake = FakeSupabase::start().await;
    let harness = Harness::new(&fake, None);

    assert!(matches!(
        harness.service().sign_in("not-an-email", PASSWORD).await,
        Err(AuthError::InvalidEmail(_))
    ));
    assert!(matches!(
        harness.service().sign_in("asha@quickmart.in", " ").await,
        Err(AuthError::MissingField("Password"))
    ));
}

#[tokio::test]
async fn test_first_sign_in_provisions_customer_profile() {
    let fake = FakeSupabase::start().await;
    let id = fake.seed_user("asha@quickmart.in", PASSWORD, "Asha");
    let harness = Harness::new(&fake, Some(OWNER));

    let (_, user) = harness.sign_in("asha@quickmart.in").await;
    assert_eq!(user.role, Role::Customer);
    assert_eq!(user.name, "Asha");

    let profiles = fake.rows("profiles");
    assert!(!profiles.is_empty());
    assert_eq!(profiles[0]["id"], id.to_string());
    assert_eq!(profiles[0]["role"], "customer");
}

#[tokio::test]
async fn test_owner_email_wins_over_profile_role() {
    let fake = FakeSupabase::start().await;
    let id = fake.seed_user(OWNER, PASSWORD, "Owner");
    fake.seed_profile(id, "Owner", "customer");
    let harness = Harness::new(&fake, Some(OWNER));

    let (_, user) = harness.sign_in(OWNER).await;
    assert_eq!(user.role, Role::Owner);
}

#[tokio::test]
async fn test_profile_role_is_used_for_non_owner() {
    let fake = FakeSupabase::start().await;
    let id = fake.seed_user("ravi@quickmart.in", PASSWORD, "Ravi");
    fake.seed_profile(id, "Ravi Kumar", "admin");
    let harness = Harness::new(&fake, Some(OWNER));

    let (_, user) = harness.sign_in("ravi@quickmart.in").await;
    assert_eq!(user.role, Role::Admin);
    assert_eq!(user.name, "Ravi Kumar");
}

#[tokio::test]
async fn test_profile_outage_falls_back_to_default_policy() {
    let fake = FakeSupabase::start().await;
    fake.seed_user(OWNER, PASSWORD, "Owner");
    let id = fake.seed_user("ravi@quickmart.in", PASSWORD, "Ravi");
    fake.seed_profile(id, "Ravi", "admin");
    fake.fail_reads("profiles");
    let harness = Harness::new(&fake, Some(OWNER));

    let (_, owner) = harness.sign_in(OWNER).await;
    assert_eq!(owner.role, Role::Owner);

    // Without the profile the admin role can't be seen
    let (session, ravi) = harness.sign_in("ravi@quickmart.in").await;
    assert_eq!(ravi.role, Role::Customer);

    // Not cached: once reads recover the real role shows up
    fake.heal_reads();
    let ravi = eventually(&harness.mirror, &session, |u| u.role == Role::Admin).await;
    assert_eq!(ravi.name, "Ravi");
}

#[tokio::test]
async fn test_sign_up_with_session() {
    let fake = FakeSupabase::start().await;
    let harness = Harness::new(&fake, None);

    let (session, user) = harness
        .service()
        .sign_up("Meena", "meena@quickmart.in", PASSWORD)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.name, "Meena");
    assert_eq!(user.role, Role::Customer);
    assert_eq!(session.user.user_metadata.name.as_deref(), Some("Meena"));
}

#[tokio::test]
async fn test_sign_up_requiring_confirmation() {
    let fake = FakeSupabase::start().await;
    fake.require_confirmation(true);
    let harness = Harness::new(&fake, None);

    let outcome = harness
        .service()
        .sign_up("Meena", "meena@quickmart.in", PASSWORD)
        .await
        .unwrap();
    assert!(outcome.is_none());
    assert!(fake.rows("profiles").is_empty());
}

#[tokio::test]
async fn test_duplicate_sign_up_is_rejected() {
    let fake = FakeSupabase::start().await;
    fake.seed_user("meena@quickmart.in", PASSWORD, "Meena");
    let harness = Harness::new(&fake, None);

    let err = harness
        .service()
        .sign_up("Meena", "meena@quickmart.in", PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::SignUpRejected(ref m) if m == "User already registered"));

    assert!(matches!(
        harness.service().sign_up(" ", "meena@quickmart.in", PASSWORD).await,
        Err(AuthError::MissingField("Name"))
    ));
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
async fn test_refresh_rotates_tokens_and_mirror_follows() {
    let fake = FakeSupabase::start().await;
    fake.seed_user("asha@quickmart.in", PASSWORD, "Asha");
    let harness = Harness::new(&fake, None);
    let (session, user) = harness.sign_in("asha@quickmart.in").await;

    let refreshed = harness.client.auth().refresh_session(&session).await.unwrap();
    assert_ne!(
        refreshed.access_token.expose_secret(),
        session.access_token.expose_secret()
    );
    assert_eq!(refreshed.user.id, user.id);

    let mirrored = harness.mirror.current(&refreshed).await.unwrap();
    assert_eq!(mirrored.id, user.id);

    // Refresh tokens are single use
    assert!(harness.client.auth().refresh_session(&session).await.is_err());
}

#[tokio::test]
async fn test_get_user_and_sign_out() {
    let fake = FakeSupabase::start().await;
    fake.seed_user("asha@quickmart.in", PASSWORD, "Asha");
    let harness = Harness::new(&fake, None);
    let (session, _) = harness.sign_in("asha@quickmart.in").await;

    let user = harness.client.auth().get_user(&session.access_token).await.unwrap();
    assert_eq!(user.email.as_deref(), Some("asha@quickmart.in"));

    harness.service().sign_out(&session).await;
    assert_eq!(
        fake.signed_out_tokens(),
        [session.access_token.expose_secret().to_string()]
    );
    assert!(harness.client.auth().get_user(&session.access_token).await.is_err());

    // Signing out twice is harmless
    harness.service().sign_out(&session).await;
}

// ============================================================================
// Role management
// ============================================================================

#[tokio::test]
async fn test_owner_promotes_customer_and_mirror_updates() {
    let fake = FakeSupabase::start().await;
    fake.seed_user(OWNER, PASSWORD, "Owner");
    fake.seed_user("ravi@quickmart.in", PASSWORD, "Ravi");
    let harness = Harness::new(&fake, Some(OWNER));

    let (owner_session, owner) = harness.sign_in(OWNER).await;
    let (ravi_session, ravi) = harness.sign_in("ravi@quickmart.in").await;
    assert_eq!(ravi.role, Role::Customer);

    let updated = harness
        .service()
        .update_user_role(&owner, &owner_session, ravi.id, Role::Admin)
        .await
        .unwrap();
    assert_eq!(updated.role, Role::Admin);

    let ravi = eventually(&harness.mirror, &ravi_session, |u| u.role == Role::Admin).await;
    assert!(ravi.is_staff());

    let everyone = harness.service().get_all_users(&ravi, &ravi_session).await;
    assert_eq!(everyone.len(), 2);
}

#[tokio::test]
async fn test_role_changes_are_owner_only() {
    let fake = FakeSupabase::start().await;
    fake.seed_user(OWNER, PASSWORD, "Owner");
    let admin_id = fake.seed_user("ravi@quickmart.in", PASSWORD, "Ravi");
    fake.seed_profile(admin_id, "Ravi", "admin");
    let customer_id = fake.seed_user("asha@quickmart.in", PASSWORD, "Asha");
    fake.seed_profile(customer_id, "Asha", "customer");
    let harness = Harness::new(&fake, Some(OWNER));

    let (admin_session, admin) = harness.sign_in("ravi@quickmart.in").await;
    assert!(matches!(
        harness
            .service()
            .update_user_role(&admin, &admin_session, UserId::new(customer_id), Role::Admin)
            .await,
        Err(AuthError::Forbidden)
    ));

    let (customer_session, customer) = harness.sign_in("asha@quickmart.in").await;
    assert!(
        harness
            .service()
            .get_all_users(&customer, &customer_session)
            .await
            .is_empty()
    );
}

#[tokio::test]
async fn test_owner_cannot_be_changed() {
    let fake = FakeSupabase::start().await;
    fake.seed_user(OWNER, PASSWORD, "Owner");
    let other_owner = uuid::Uuid::new_v4();
    fake.seed_profile(other_owner, "Founder", "owner");
    let harness = Harness::new(&fake, Some(OWNER));
    let (session, owner) = harness.sign_in(OWNER).await;
    let service = harness.service();

    assert!(matches!(
        service
            .update_user_role(&owner, &session, owner.id, Role::Customer)
            .await,
        Err(AuthError::OwnerImmutable)
    ));
    assert!(matches!(
        service
            .update_user_role(&owner, &session, UserId::new(other_owner), Role::Customer)
            .await,
        Err(AuthError::OwnerImmutable)
    ));
    assert!(matches!(
        service
            .update_user_role(&owner, &session, UserId::new(uuid::Uuid::new_v4()), Role::Admin)
            .await,
        Err(AuthError::UserNotFound)
    ));
    assert!(matches!(
        service
            .update_user_role(&owner, &session, UserId::new(other_owner), Role::Owner)
            .await,
        Err(AuthError::UnassignableRole(Role::Owner))
    ));
}
