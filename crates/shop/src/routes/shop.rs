//! Storefront route handlers: product browsing, the session cart and orders.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bamazon_core::ProductId;

use crate::db::{OrderRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::extract::Form;
use crate::middleware::{Flash, RequireUser, ViewContext, flash};
use crate::models::{Cart, Order, OrderItem, Product, session_keys};
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: String,
    pub title: String,
    pub price: String,
    pub description: String,
    pub image_path: String,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            title: product.title.clone(),
            price: product.display_price(),
            description: product.description.clone(),
            image_path: product.image_path.clone(),
        }
    }
}

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub product: ProductView,
    pub quantity: u32,
}

/// Order display data for templates.
#[derive(Clone)]
pub struct OrderView {
    pub id: String,
    pub placed_at: String,
    pub items: Vec<OrderItemView>,
    pub total: String,
}

/// Order line display data for templates.
#[derive(Clone)]
pub struct OrderItemView {
    pub title: String,
    pub quantity: i32,
    pub line_total: String,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            placed_at: order.created_at.format("%Y-%m-%d %H:%M").to_string(),
            items: order
                .items
                .iter()
                .map(|item| OrderItemView {
                    title: item.title.clone(),
                    quantity: item.quantity,
                    line_total: format!("{:.2}", item.line_total()),
                })
                .collect(),
            total: order.display_total(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "shop/index.html")]
pub struct IndexTemplate {
    pub ctx: ViewContext,
    pub products: Vec<ProductView>,
    pub success: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "shop/product_list.html")]
pub struct ProductListTemplate {
    pub ctx: ViewContext,
    pub products: Vec<ProductView>,
}

#[derive(Template, WebTemplate)]
#[template(path = "shop/product_detail.html")]
pub struct ProductDetailTemplate {
    pub ctx: ViewContext,
    pub product: ProductView,
}

#[derive(Template, WebTemplate)]
#[template(path = "shop/cart.html")]
pub struct CartTemplate {
    pub ctx: ViewContext,
    pub lines: Vec<CartLineView>,
    pub total: String,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "shop/orders.html")]
pub struct OrdersTemplate {
    pub ctx: ViewContext,
    pub orders: Vec<OrderView>,
    pub success: Option<String>,
}

// =============================================================================
// Form Types
// =============================================================================

/// Form naming a single product (add to cart, remove from cart).
#[derive(Debug, Deserialize)]
pub struct ProductIdForm {
    #[serde(rename = "productId", alias = "product_id")]
    pub product_id: String,
}

// =============================================================================
// Session Helpers
// =============================================================================

async fn load_cart(session: &Session) -> Result<Cart> {
    Ok(session
        .get::<Cart>(session_keys::CART)
        .await?
        .unwrap_or_default())
}

async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(session_keys::CART, cart).await?;
    Ok(())
}

fn parse_product_id(raw: &str) -> Result<ProductId> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("product {raw}")))
}

/// Resolve cart lines against the store, dropping lines whose product is gone.
///
/// Returns the surviving `(product, quantity)` pairs in cart order.
async fn resolve_cart(state: &AppState, cart: &mut Cart) -> Result<Vec<(Product, u32)>> {
    let products = ProductRepository::new(state.pool())
        .get_many(&cart.product_ids())
        .await?;
    let mut by_id: HashMap<ProductId, Product> =
        products.into_iter().map(|p| (p.id, p)).collect();

    cart.retain(|line| by_id.contains_key(&line.product_id));
    Ok(cart
        .lines()
        .iter()
        .filter_map(|line| {
            by_id
                .remove(&line.product_id)
                .map(|product| (product, line.quantity))
        })
        .collect())
}

// =============================================================================
// Product Routes
// =============================================================================

/// `GET /`
#[instrument(skip(state, ctx, flash))]
pub async fn index(
    State(state): State<AppState>,
    ctx: ViewContext,
    flash: Flash,
) -> Result<impl IntoResponse> {
    let products = ProductRepository::new(state.pool()).list().await?;
    Ok(IndexTemplate {
        ctx,
        products: products.iter().map(ProductView::from).collect(),
        success: flash.take_first(flash::SUCCESS).await?,
    })
}

/// `GET /products`
#[instrument(skip(state, ctx))]
pub async fn products(
    State(state): State<AppState>,
    ctx: ViewContext,
) -> Result<impl IntoResponse> {
    let products = ProductRepository::new(state.pool()).list().await?;
    Ok(ProductListTemplate {
        ctx,
        products: products.iter().map(ProductView::from).collect(),
    })
}

/// `GET /products/{id}`
#[instrument(skip(state, ctx))]
pub async fn product_detail(
    State(state): State<AppState>,
    ctx: ViewContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = parse_product_id(&id)?;
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    Ok(ProductDetailTemplate {
        ctx,
        product: ProductView::from(&product),
    })
}

// =============================================================================
// Cart Routes
// =============================================================================

/// `GET /cart`
#[instrument(skip(state, session, ctx, flash))]
pub async fn cart(
    State(state): State<AppState>,
    session: Session,
    ctx: ViewContext,
    flash: Flash,
) -> Result<impl IntoResponse> {
    let mut cart = load_cart(&session).await?;
    let before = cart.lines().len();
    let resolved = resolve_cart(&state, &mut cart).await?;
    if cart.lines().len() != before {
        save_cart(&session, &cart).await?;
    }

    let total: rust_decimal::Decimal = resolved
        .iter()
        .map(|(product, quantity)| product.price * rust_decimal::Decimal::from(*quantity))
        .sum();

    Ok(CartTemplate {
        ctx,
        lines: resolved
            .iter()
            .map(|(product, quantity)| CartLineView {
                product: ProductView::from(product),
                quantity: *quantity,
            })
            .collect(),
        total: format!("{total:.2}"),
        error: flash.take_first(flash::ERROR).await?,
    })
}

/// `POST /cart`
#[instrument(skip(state, session))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ProductIdForm>,
) -> Result<impl IntoResponse> {
    let id = parse_product_id(&form.product_id)?;
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let mut cart = load_cart(&session).await?;
    cart.add(product.id);
    save_cart(&session, &cart).await?;

    tracing::debug!(product_id = %product.id, items = cart.item_count(), "Added to cart");
    Ok(Redirect::to("/cart"))
}

/// `POST /cart-delete-item`
#[instrument(skip(session))]
pub async fn remove_from_cart(
    session: Session,
    Form(form): Form<ProductIdForm>,
) -> Result<impl IntoResponse> {
    let id = parse_product_id(&form.product_id)?;
    let mut cart = load_cart(&session).await?;
    if cart.remove(id) {
        save_cart(&session, &cart).await?;
    }
    Ok(Redirect::to("/cart"))
}

// =============================================================================
// Order Routes
// =============================================================================

/// `POST /create-order`
#[instrument(skip_all)]
pub async fn create_order(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    flash: Flash,
) -> Result<impl IntoResponse> {
    let mut cart = load_cart(&session).await?;
    let resolved = resolve_cart(&state, &mut cart).await?;

    if resolved.is_empty() {
        save_cart(&session, &cart).await?;
        flash.push(flash::ERROR, "Your cart is empty.").await?;
        return Ok(Redirect::to("/cart"));
    }

    let items = resolved
        .into_iter()
        .map(|(product, quantity)| OrderItem {
            product_id: product.id,
            title: product.title,
            unit_price: product.price,
            quantity: i32::try_from(quantity).unwrap_or(i32::MAX),
        })
        .collect();

    let order = OrderRepository::new(state.pool())
        .create(user.id, &user.email, items)
        .await?;

    session.remove::<Cart>(session_keys::CART).await?;
    flash
        .push(flash::SUCCESS, format!("Order #{} placed.", order.id))
        .await?;

    tracing::info!(order_id = %order.id, user_id = %user.id, total = %order.total(), "Order placed");
    Ok(Redirect::to("/orders"))
}

/// `GET /orders`
#[instrument(skip_all)]
pub async fn orders(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ctx: ViewContext,
    flash: Flash,
) -> Result<impl IntoResponse> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;

    Ok(OrdersTemplate {
        ctx,
        orders: orders.iter().map(OrderView::from).collect(),
        success: flash.take_first(flash::SUCCESS).await?,
    })
}
