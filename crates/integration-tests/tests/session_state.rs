//! Session state and account lifecycle tests against the in-memory backend.

use serde_json::json;

use marigold_core::UserType;
use marigold_integration_tests::{admin_form, company_form};
use marigold_storefront::backend::MemoryBackend;
use marigold_storefront::services::session::{SessionError, SessionState};

fn session(backend: &MemoryBackend) -> SessionState<
    marigold_storefront::backend::MemoryIdentity,
    marigold_storefront::backend::MemoryStore,
> {
    SessionState::new(backend.identity(), backend.store())
}

#[tokio::test]
async fn ready_flips_on_first_resolution() {
    let backend = MemoryBackend::new();
    let state = session(&backend);

    assert!(!state.ready());
    assert!(state.current().is_none());

    state.resolve().await.expect("resolution succeeds");

    assert!(state.ready());
    assert!(state.current().is_none());
    assert!(state.last_error().is_none());
}

#[tokio::test]
async fn register_creates_identity_and_profile() {
    let backend = MemoryBackend::new();
    let state = session(&backend);
    state.resolve().await.expect("resolution succeeds");

    let profile = state
        .register(company_form("ana@firma.ro"))
        .await
        .expect("registration succeeds");
    assert_eq!(profile.user_type(), UserType::Company);
    assert_eq!(profile.display_name.as_deref(), Some("Ana Pop"));

    // The new account is signed in.
    let current = state.current().expect("signed in after registration");
    assert_eq!(current.email.as_str(), "ana@firma.ro");
    assert_eq!(current.display_name.as_deref(), Some("Ana Pop"));

    // The profile document is readable back.
    let fetched = state
        .fetch_profile(&current.uid)
        .await
        .expect("fetch succeeds")
        .expect("profile exists");
    assert_eq!(fetched.uid, current.uid);
    assert_eq!(fetched.user_type(), UserType::Company);
}

#[tokio::test]
async fn duplicate_registration_is_already_exists_and_recorded() {
    let backend = MemoryBackend::new();
    let state = session(&backend);

    state
        .register(company_form("ana@firma.ro"))
        .await
        .expect("first registration succeeds");

    let err = state
        .register(company_form("ana@firma.ro"))
        .await
        .expect_err("duplicate registration fails");
    assert!(matches!(err, SessionError::AlreadyExists));

    // The failure is recorded for display and re-signaled to the caller.
    let recorded = state.last_error().expect("error recorded");
    assert_eq!(recorded, err.to_string());
}

#[tokio::test]
async fn login_failures_map_to_taxonomy() {
    let backend = MemoryBackend::new();
    let state = session(&backend);

    let err = state
        .login("nimeni@firma.ro", "parola123")
        .await
        .expect_err("unknown account fails");
    assert!(matches!(err, SessionError::NotFound));

    state
        .register(company_form("ana@firma.ro"))
        .await
        .expect("registration succeeds");
    state.logout().await.expect("logout succeeds");

    let err = state
        .login("ana@firma.ro", "gresita12")
        .await
        .expect_err("wrong password fails");
    assert!(matches!(err, SessionError::InvalidCredentials));

    // A successful operation clears the recorded error.
    state
        .login("ana@firma.ro", "parola123")
        .await
        .expect("login succeeds");
    assert!(state.last_error().is_none());
}

#[tokio::test]
async fn logout_is_idempotent() {
    let backend = MemoryBackend::new();
    let state = session(&backend);

    state
        .register(company_form("ana@firma.ro"))
        .await
        .expect("registration succeeds");

    state.logout().await.expect("first logout succeeds");
    state.logout().await.expect("second logout succeeds");
    assert!(state.current().is_none());
}

#[tokio::test]
async fn update_profile_requires_authentication() {
    let backend = MemoryBackend::new();
    let state = session(&backend);
    state.resolve().await.expect("resolution succeeds");

    let err = state
        .update_profile(json!({"phoneNumber": "+40711111111"}))
        .await
        .expect_err("unauthenticated patch fails");
    assert!(matches!(err, SessionError::Unauthenticated));
}

#[tokio::test]
async fn update_profile_merges_but_role_is_immutable() {
    let backend = MemoryBackend::new();
    let state = session(&backend);

    state
        .register(company_form("ana@firma.ro"))
        .await
        .expect("registration succeeds");
    let uid = state.current().expect("signed in").uid;

    state
        .update_profile(json!({"phoneNumber": "+40711111111", "deliveryAddress": "Str. Noua 2"}))
        .await
        .expect("patch succeeds");

    let profile = state
        .fetch_profile(&uid)
        .await
        .expect("fetch succeeds")
        .expect("profile exists");
    assert_eq!(profile.phone_number, "+40711111111");

    let err = state
        .update_profile(json!({"userType": "admin"}))
        .await
        .expect_err("role change rejected");
    assert!(matches!(err, SessionError::InvalidInput(_)));
}

#[tokio::test]
async fn fetch_profile_absent_is_none_not_error() {
    let backend = MemoryBackend::new();
    let state = session(&backend);

    let fetched = state
        .fetch_profile(&marigold_core::UserId::new("missing"))
        .await
        .expect("fetch succeeds");
    assert!(fetched.is_none());
}

#[tokio::test]
async fn subscription_observes_login_and_logout() {
    let backend = MemoryBackend::new();
    let state = session(&backend);
    let mut changes = state.subscribe();

    state
        .register(company_form("ana@firma.ro"))
        .await
        .expect("registration succeeds");

    // Registration announces the signed-in identity (the display-name
    // update may announce again; take the latest).
    let mut event = changes.next().await.expect("change delivered");
    while event.identity.as_ref().and_then(|i| i.display_name.as_deref()) != Some("Ana Pop") {
        event = changes.next().await.expect("change delivered");
    }

    state.logout().await.expect("logout succeeds");
    let event = changes.next().await.expect("change delivered");
    assert!(event.identity.is_none());

    // Dropping the state releases the provider and ends the stream.
    drop(state);
    assert!(changes.next().await.is_none());
}

#[tokio::test]
async fn admin_registration_carries_permissions() {
    let backend = MemoryBackend::new();
    let state = session(&backend);

    let profile = state
        .register(admin_form("admin@marigold.trade"))
        .await
        .expect("registration succeeds");
    assert_eq!(profile.user_type(), UserType::Admin);
    assert!(profile.can_view_clients());
}
