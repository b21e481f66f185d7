//! Admin dashboard route handlers.
//!
//! Staff manage customers, orders and products here; the owner also
//! assigns the admin role.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use quickmart_core::{CurrentUser, Product, ProductDraft, ProductId, Profile, Role, UserId};

use crate::db::ProductRepository;
use crate::middleware::{RequireOwner, RequireStaff, SignedIn};
use crate::routes::history::{OrderView, all_orders_with_names};
use crate::routes::layout::Chrome;
use crate::services::notifications::notify;
use crate::services::{AuthService, Toast};
use crate::state::AppState;

// =============================================================================
// Tabs
// =============================================================================

/// Dashboard tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Customers,
    Orders,
    Products,
    Admins,
}

impl Tab {
    /// Parse the `tab` query value. Unknown values and tabs the user may
    /// not see fall back to customers.
    #[must_use]
    pub fn for_user(value: Option<&str>, user: &CurrentUser) -> Self {
        match value {
            Some("orders") => Self::Orders,
            Some("products") => Self::Products,
            Some("admins") if user.role.can_assign_roles() => Self::Admins,
            _ => Self::Customers,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customers => "customers",
            Self::Orders => "orders",
            Self::Products => "products",
            Self::Admins => "admins",
        }
    }

    fn redirect(self) -> Redirect {
        Redirect::to(&format!("/admin?tab={}", self.as_str()))
    }
}

/// Dashboard query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub tab: Option<String>,
    /// Product id whose edit form is open.
    pub edit: Option<i64>,
}

// =============================================================================
// View Types
// =============================================================================

/// Customer row display data.
#[derive(Debug, Clone)]
pub struct CustomerView {
    pub id: String,
    pub name: String,
    pub joined: String,
}

impl From<&Profile> for CustomerView {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.short(),
            name: profile.name.clone(),
            joined: profile
                .created_at
                .map(|t| t.format("%d %b %Y").to_string())
                .unwrap_or_default(),
        }
    }
}

/// Product row display data, with raw values for the edit form.
#[derive(Debug, Clone)]
pub struct ProductRowView {
    pub id: i64,
    pub name: String,
    pub price: String,
    pub price_label: String,
    pub category: String,
    pub emoji: String,
    pub editing: bool,
}

impl ProductRowView {
    fn new(product: &Product, editing: Option<i64>) -> Self {
        Self {
            id: product.id.as_i64(),
            name: product.name.clone(),
            price: product.price.amount().normalize().to_string(),
            price_label: product.price.to_string(),
            category: product.category.clone(),
            emoji: product.emoji.clone(),
            editing: editing == Some(product.id.as_i64()),
        }
    }
}

/// Role management row display data.
#[derive(Debug, Clone)]
pub struct StaffView {
    pub id: String,
    pub name: String,
    pub role: String,
    /// Owners can't be changed; no toggle is shown.
    pub locked: bool,
    pub next_role: String,
    pub action: String,
}

impl StaffView {
    fn new(profile: &Profile, actor: &CurrentUser) -> Self {
        let locked = profile.role == Role::Owner || profile.id == actor.id;
        let (role, next_role, action) = if locked {
            (Role::Owner, Role::Owner, "")
        } else if profile.role == Role::Admin {
            (Role::Admin, Role::Customer, "Remove admin")
        } else {
            (Role::Customer, Role::Admin, "Make admin")
        };

        Self {
            id: profile.id.to_string(),
            name: profile.name.clone(),
            role: role.to_string(),
            locked,
            next_role: next_role.to_string(),
            action: action.to_string(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Admin dashboard template. Only the active tab's list is filled.
#[derive(Template, WebTemplate)]
#[template(path = "admin.html")]
pub struct DashboardTemplate {
    pub chrome: Chrome,
    pub tab: &'static str,
    pub can_manage_roles: bool,
    pub customers: Vec<CustomerView>,
    pub orders: Vec<OrderView>,
    pub products: Vec<ProductRowView>,
    pub staff: Vec<StaffView>,
}

// =============================================================================
// Form Types
// =============================================================================

/// Product create/update form. Validated by [`ProductDraft::parse`].
#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub name: String,
    pub price: String,
    pub category: String,
    pub emoji: String,
}

impl ProductForm {
    fn parse(&self) -> Result<ProductDraft, quickmart_core::ProductDraftError> {
        ProductDraft::parse(&self.name, &self.price, &self.category, &self.emoji)
    }
}

/// Role assignment form.
#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: Role,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the admin dashboard.
#[instrument(skip_all, fields(user_id = %signed_in.user.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireStaff(signed_in): RequireStaff,
    session: Session,
    Query(query): Query<DashboardQuery>,
) -> impl IntoResponse {
    let tab = Tab::for_user(query.tab.as_deref(), &signed_in.user);
    let mut page = DashboardTemplate {
        chrome: Chrome::load(&session, Some(&signed_in.user)).await,
        tab: tab.as_str(),
        can_manage_roles: signed_in.user.role.can_assign_roles(),
        customers: Vec::new(),
        orders: Vec::new(),
        products: Vec::new(),
        staff: Vec::new(),
    };

    match tab {
        Tab::Customers => {
            page.customers = all_profiles(&state, &signed_in)
                .await
                .iter()
                .filter(|p| p.role == Role::Customer && p.id != signed_in.user.id)
                .map(CustomerView::from)
                .collect();
        }
        Tab::Orders => {
            page.orders = all_orders_with_names(&state, &signed_in).await;
        }
        Tab::Products => {
            page.products = state
                .catalog()
                .snapshot()
                .iter()
                .map(|p| ProductRowView::new(p, query.edit))
                .collect();
        }
        Tab::Admins => {
            page.staff = all_profiles(&state, &signed_in)
                .await
                .iter()
                .map(|p| StaffView::new(p, &signed_in.user))
                .collect();
        }
    }

    page
}

async fn all_profiles(state: &AppState, signed_in: &SignedIn) -> Vec<Profile> {
    AuthService::new(state.supabase(), state.mirror())
        .get_all_users(&signed_in.user, &signed_in.auth)
        .await
}

/// Create a product.
#[instrument(skip_all, fields(user_id = %signed_in.user.id))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireStaff(signed_in): RequireStaff,
    session: Session,
    Form(form): Form<ProductForm>,
) -> Response {
    let draft = match form.parse() {
        Ok(draft) => draft,
        Err(e) => {
            notify(&session, Toast::error("Invalid Product", e.to_string())).await;
            return Tab::Products.redirect().into_response();
        }
    };

    let result = ProductRepository::new(state.supabase().rest())
        .as_user(signed_in.token())
        .add_product(&draft)
        .await;

    match result {
        Ok(product) => {
            state.catalog().refresh().await;
            notify(&session, Toast::info("Product added", product.name)).await;
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to add product");
            notify(&session, Toast::error("Add Failed", e.to_string())).await;
        }
    }
    Tab::Products.redirect().into_response()
}

/// Update a product.
#[instrument(skip_all, fields(user_id = %signed_in.user.id, product_id = %id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireStaff(signed_in): RequireStaff,
    session: Session,
    Path(id): Path<ProductId>,
    Form(form): Form<ProductForm>,
) -> Response {
    let draft = match form.parse() {
        Ok(draft) => draft,
        Err(e) => {
            notify(&session, Toast::error("Invalid Product", e.to_string())).await;
            return Redirect::to(&format!("/admin?tab=products&edit={id}")).into_response();
        }
    };

    let result = ProductRepository::new(state.supabase().rest())
        .as_user(signed_in.token())
        .update_product(id, &draft)
        .await;

    match result {
        Ok(product) => {
            state.catalog().refresh().await;
            notify(&session, Toast::info("Product updated", product.name)).await;
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to update product");
            notify(&session, Toast::error("Update Failed", e.to_string())).await;
        }
    }
    Tab::Products.redirect().into_response()
}

/// Delete a product.
#[instrument(skip_all, fields(user_id = %signed_in.user.id, product_id = %id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireStaff(signed_in): RequireStaff,
    session: Session,
    Path(id): Path<ProductId>,
) -> Response {
    let result = ProductRepository::new(state.supabase().rest())
        .as_user(signed_in.token())
        .delete_product(id)
        .await;

    match result {
        Ok(()) => {
            state.catalog().refresh().await;
            notify(&session, Toast::info("Product deleted", format!("Product #{id} removed."))).await;
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to delete product");
            notify(&session, Toast::error("Delete Failed", e.to_string())).await;
        }
    }
    Tab::Products.redirect().into_response()
}

/// Assign `admin` or `customer` to a user.
#[instrument(skip_all, fields(user_id = %signed_in.user.id, target = %target))]
pub async fn update_role(
    State(state): State<AppState>,
    RequireOwner(signed_in): RequireOwner,
    session: Session,
    Path(target): Path<UserId>,
    Form(form): Form<RoleForm>,
) -> Response {
    let result = AuthService::new(state.supabase(), state.mirror())
        .update_user_role(&signed_in.user, &signed_in.auth, target, form.role)
        .await;

    match result {
        Ok(profile) => {
            notify(
                &session,
                Toast::info(
                    "Role updated",
                    format!("{} is now {}.", profile.name, profile.role),
                ),
            )
            .await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Role change rejected");
            notify(&session, Toast::error("Role Update Failed", e.to_string())).await;
        }
    }
    Tab::Admins.redirect().into_response()
}
