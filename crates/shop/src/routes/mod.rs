//! HTTP route handlers for the shop.
//!
//! # Route Structure
//!
//! ```text
//! # Shop
//! GET  /                        - Product index
//! GET  /products                - Product list
//! GET  /products/{id}           - Product detail
//! GET  /cart                    - Cart page
//! POST /cart                    - Add product to cart
//! POST /cart-delete-item        - Remove product from cart
//! POST /create-order            - Place an order from the cart (login)
//! GET  /orders                  - Order history (login)
//!
//! # Auth
//! GET  /login                   - Login page
//! POST /login                   - Login action
//! GET  /signup                  - Signup page
//! POST /signup                  - Signup action
//! POST /logout                  - Logout action
//!
//! # Admin (login)
//! GET  /admin/add-product       - New product form
//! POST /admin/add-product       - Create product (multipart with `image`)
//! GET  /admin/products          - Products owned by the current user
//! GET  /admin/edit-product/{id} - Edit form (`?edit=true`)
//! POST /admin/edit-product      - Update product, optional new image
//! POST /admin/delete-product    - Delete product and its image
//!
//! # Errors
//! GET  /500                     - Server error page
//! *    anything else            - Not found page (including a known path
//!                                 with the wrong method)
//! ```

pub mod admin;
pub mod auth;
pub mod errors;
pub mod shop;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the admin routes router (mounted under `/admin`).
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/add-product",
            get(admin::add_product_page).post(admin::add_product),
        )
        .route("/products", get(admin::products))
        .route("/edit-product/{id}", get(admin::edit_product_page))
        .route("/edit-product", post(admin::edit_product))
        .route("/delete-product", post(admin::delete_product))
        // Nested routers keep their own method fallback.
        .method_not_allowed_fallback(errors::not_found)
}

/// Create the shop routes router.
pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(shop::index))
        .route("/products", get(shop::products))
        .route("/products/{id}", get(shop::product_detail))
        .route("/cart", get(shop::cart).post(shop::add_to_cart))
        .route("/cart-delete-item", post(shop::remove_from_cart))
        .route("/create-order", post(shop::create_order))
        .route("/orders", get(shop::orders))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/logout", post(auth::logout))
}

/// Create all application routes, including the error pages.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/admin", admin_routes())
        .merge(shop_routes())
        .merge(auth_routes())
        .route("/500", get(errors::server_error))
        .method_not_allowed_fallback(errors::not_found)
        .fallback(errors::not_found)
}
