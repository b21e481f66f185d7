//! Repository tests against the fake Supabase REST endpoints.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::str::FromStr;

use quickmart_core::{OrderItem, Price, ProductDraft, ProductId, Role, UserId};
use quickmart_integration_tests::FakeSupabase;
use quickmart_storefront::db::{OrderRepository, ProductRepository, ProfileRepository, RepositoryError};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::json;

/// Sign a seeded user in and return their access token.
async fn user_token(fake: &FakeSupabase, email: &str) -> (UserId, SecretString) {
    fake.seed_user(email, "password-123", "Tester");
    let session = fake
        .client()
        .auth()
        .sign_in_with_password(email, "password-123")
        .await
        .unwrap();
    (session.user.id, session.access_token)
}

fn draft(name: &str, price: &str) -> ProductDraft {
    ProductDraft::parse(name, price, "Dairy", "🥛").unwrap()
}

// ============================================================================
// Products
// ============================================================================

#[tokio::test]
async fn test_products_listed_by_id() {
    let fake = FakeSupabase::start().await;
    fake.seed_product("Paneer", 90.5, "Dairy", "🧀");
    fake.seed_product("Basmati Rice", 120.0, "Grains", "🍚");
    let client = fake.client();

    let products = ProductRepository::new(client.rest()).get_products().await;
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].id, ProductId::new(1));
    assert_eq!(products[0].price, Price::new(Decimal::from_str("90.5").unwrap()));
    assert_eq!(products[1].name, "Basmati Rice");

    assert!(
        fake.request_log()
            .iter()
            .any(|r| r.starts_with("GET /products?") && r.contains("order=id.asc"))
    );
}

#[tokio::test]
async fn test_product_reads_degrade_to_empty() {
    let fake = FakeSupabase::start().await;
    fake.seed_product("Paneer", 90.5, "Dairy", "🧀");
    fake.fail_reads("products");
    let client = fake.client();

    let repo = ProductRepository::new(client.rest());
    assert!(repo.get_products().await.is_empty());
    assert!(matches!(repo.list().await, Err(RepositoryError::Backend(_))));
}

#[tokio::test]
async fn test_product_writes_round_trip() {
    let fake = FakeSupabase::start().await;
    let (_, token) = user_token(&fake, "staff@quickmart.in").await;
    let client = fake.client();
    let repo = ProductRepository::new(client.rest()).as_user(&token);

    let created = repo.add_product(&draft("Toned Milk", "30")).await.unwrap();
    assert_eq!(created.name, "Toned Milk");
    assert_eq!(created.emoji, "🥛");

    let updated = repo
        .update_product(created.id, &draft("Toned Milk 1L", "32.50"))
        .await
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.price, Price::new(Decimal::from_str("32.5").unwrap()));

    repo.delete_product(created.id).await.unwrap();
    assert!(repo.get_products().await.is_empty());
}

#[tokio::test]
async fn test_anonymous_product_write_is_denied() {
    let fake = FakeSupabase::start().await;
    let client = fake.client();

    let result = ProductRepository::new(client.rest())
        .add_product(&draft("Toned Milk", "30"))
        .await;
    assert!(matches!(result, Err(RepositoryError::PermissionDenied(_))));
    assert!(fake.rows("products").is_empty());
}

#[tokio::test]
async fn test_update_of_missing_product_is_not_found() {
    let fake = FakeSupabase::start().await;
    let (_, token) = user_token(&fake, "staff@quickmart.in").await;
    let client = fake.client();

    let result = ProductRepository::new(client.rest())
        .as_user(&token)
        .update_product(ProductId::new(404), &draft("Ghost", "1"))
        .await;
    assert!(matches!(result, Err(RepositoryError::NotFound)));
}

// ============================================================================
// Profiles
// ============================================================================

#[tokio::test]
async fn test_profile_lookup_and_role_update() {
    let fake = FakeSupabase::start().await;
    let (user_id, token) = user_token(&fake, "asha@quickmart.in").await;
    fake.seed_profile(user_id.as_uuid(), "Asha", "customer");
    let client = fake.client();
    let profiles = ProfileRepository::new(client.rest()).as_user(&token);

    let profile = profiles.get_profile(user_id).await.unwrap().unwrap();
    assert_eq!(profile.name, "Asha");
    assert_eq!(profile.role, Role::Customer);

    let updated = profiles.update_role(user_id, Role::Admin).await.unwrap();
    assert_eq!(updated.role, Role::Admin);
    assert_eq!(fake.rows("profiles")[0]["role"], "admin");
}

#[tokio::test]
async fn test_missing_profile_is_none() {
    let fake = FakeSupabase::start().await;
    let client = fake.client();

    let missing = ProfileRepository::new(client.rest())
        .get_profile(UserId::new(uuid::Uuid::new_v4()))
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_profiles_by_ids_uses_in_filter() {
    let fake = FakeSupabase::start().await;
    let asha = uuid::Uuid::new_v4();
    let ravi = uuid::Uuid::new_v4();
    fake.seed_profile(asha, "Asha", "customer");
    fake.seed_profile(ravi, "Ravi", "admin");
    fake.seed_profile(uuid::Uuid::new_v4(), "Meena", "customer");
    let client = fake.client();
    let repo = ProfileRepository::new(client.rest());

    let found = repo
        .get_profiles_by_ids(&[UserId::new(asha), UserId::new(ravi)])
        .await;
    let mut names: Vec<_> = found.iter().map(|p| p.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["Asha", "Ravi"]);

    assert!(repo.get_profiles_by_ids(&[]).await.is_empty());
    assert!(fake.request_log().iter().any(|r| r.contains("id=in.(")));
}

#[tokio::test]
async fn test_unknown_role_rows_are_skipped() {
    let fake = FakeSupabase::start().await;
    fake.seed_profile(uuid::Uuid::new_v4(), "Asha", "customer");
    fake.seed_profile(uuid::Uuid::new_v4(), "Mallory", "superuser");
    let client = fake.client();

    let all = ProfileRepository::new(client.rest()).get_all_profiles().await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "Asha");
}

// ============================================================================
// Orders
// ============================================================================

#[tokio::test]
async fn test_create_order_stores_items_and_total() {
    let fake = FakeSupabase::start().await;
    let (user_id, token) = user_token(&fake, "asha@quickmart.in").await;
    let client = fake.client();

    let items = [OrderItem {
        id: ProductId::new(1),
        name: "Basmati Rice".to_string(),
        price: Price::from_rupees(120),
        quantity: 2,
        emoji: "🍚".to_string(),
    }];
    let order = OrderRepository::new(client.rest())
        .as_user(&token)
        .create_order(user_id, &items, Price::from_rupees(252))
        .await
        .unwrap();

    assert_eq!(order.user_id, user_id);
    assert_eq!(order.items, items);
    assert_eq!(order.total, Price::from_rupees(252));

    let stored = &fake.rows("orders")[0];
    assert_eq!(stored["total"], json!(252.0));
    assert_eq!(stored["items"][0]["quantity"], 2);
}

#[tokio::test]
async fn test_user_orders_are_filtered_and_newest_first() {
    let fake = FakeSupabase::start().await;
    let (user_id, token) = user_token(&fake, "asha@quickmart.in").await;
    let other = uuid::Uuid::new_v4();
    let item = json!([{ "id": 1, "name": "Paneer", "price": 90.5, "quantity": 1, "emoji": "🧀" }]);

    let first = fake.seed_order(user_id.as_uuid(), item.clone(), 95.03);
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = fake.seed_order(user_id.as_uuid(), item.clone(), 190.05);
    fake.seed_order(other, item, 10.0);
    let client = fake.client();
    let repo = OrderRepository::new(client.rest()).as_user(&token);

    let mine = repo.get_user_orders(user_id).await;
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].id.as_uuid(), second);
    assert_eq!(mine[1].id.as_uuid(), first);

    assert_eq!(repo.get_all_orders().await.len(), 3);

    fake.fail_reads("orders");
    assert!(repo.get_user_orders(user_id).await.is_empty());
    assert!(repo.get_all_orders().await.is_empty());
}
