//! Admin route handlers: product management for the logged-in owner.
//!
//! Every handler requires a login. Edits and deletes only ever touch
//! products owned by the current user; anything else redirects home.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use bamazon_core::ProductId;

use super::shop::ProductView;
use crate::db::{ProductRepository, RepositoryError};
use crate::error::Result;
use crate::extract::Form;
use crate::middleware::{
    Flash, MaybeImage, RequireUser, UploadedImage, ViewContext, delete_image, flash,
};
use crate::models::ProductInput;
use crate::state::AppState;

const NOT_AN_IMAGE: &str = "Attached file is not an image.";

// =============================================================================
// Form Types
// =============================================================================

/// Edit form: the product fields plus the product being edited.
#[derive(Debug, Deserialize)]
pub struct EditProductForm {
    #[serde(rename = "productId", alias = "product_id")]
    pub product_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub description: String,
}

impl EditProductForm {
    fn input(&self) -> ProductInput {
        ProductInput {
            title: self.title.clone(),
            price: self.price.clone(),
            description: self.description.clone(),
        }
    }
}

/// Delete form.
#[derive(Debug, Deserialize)]
pub struct DeleteProductForm {
    #[serde(rename = "productId", alias = "product_id")]
    pub product_id: String,
}

#[derive(Debug, Deserialize)]
pub struct EditQuery {
    pub edit: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Add/edit product form.
#[derive(Template, WebTemplate)]
#[template(path = "admin/edit_product.html")]
pub struct EditProductTemplate {
    pub ctx: ViewContext,
    pub editing: bool,
    pub product_id: String,
    pub input: ProductInput,
    pub error: Option<String>,
}

/// Products owned by the current user.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct AdminProductsTemplate {
    pub ctx: ViewContext,
    pub products: Vec<ProductView>,
    pub success: Option<String>,
}

fn rejected_form(
    ctx: ViewContext,
    editing: bool,
    product_id: String,
    input: ProductInput,
    error: String,
) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        EditProductTemplate {
            ctx,
            editing,
            product_id,
            input,
            error: Some(error),
        },
    )
        .into_response()
}

/// Remove an upload that will not be attached to any product.
async fn discard(image: Option<&UploadedImage>) {
    if let Some(image) = image {
        image.discard().await;
    }
}

// =============================================================================
// Add Product
// =============================================================================

/// `GET /admin/add-product`
pub async fn add_product_page(
    RequireUser(_user): RequireUser,
    ctx: ViewContext,
) -> impl IntoResponse {
    EditProductTemplate {
        ctx,
        editing: false,
        product_id: String::new(),
        input: ProductInput::default(),
        error: None,
    }
}

/// `POST /admin/add-product`
#[instrument(skip_all)]
pub async fn add_product(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ctx: ViewContext,
    flash: Flash,
    MaybeImage(image): MaybeImage,
    Form(input): Form<ProductInput>,
) -> Result<Response> {
    let Some(image) = image else {
        return Ok(rejected_form(
            ctx,
            false,
            String::new(),
            input,
            NOT_AN_IMAGE.to_string(),
        ));
    };

    let fields = match input.validate() {
        Ok(fields) => fields,
        Err(e) => {
            discard(Some(&image)).await;
            return Ok(rejected_form(ctx, false, String::new(), input, e.to_string()));
        }
    };

    let product = match ProductRepository::new(state.pool())
        .create(user.id, &fields, &image.public_path())
        .await
    {
        Ok(product) => product,
        Err(e) => {
            discard(Some(&image)).await;
            return Err(e.into());
        }
    };

    tracing::info!(product_id = %product.id, user_id = %user.id, "Product created");
    flash
        .push(flash::SUCCESS, format!("Added \"{}\".", product.title))
        .await?;
    Ok(Redirect::to("/admin/products").into_response())
}

// =============================================================================
// Product List
// =============================================================================

/// `GET /admin/products`
#[instrument(skip_all)]
pub async fn products(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ctx: ViewContext,
    flash: Flash,
) -> Result<impl IntoResponse> {
    let products = ProductRepository::new(state.pool())
        .list_by_owner(user.id)
        .await?;

    Ok(AdminProductsTemplate {
        ctx,
        products: products.iter().map(ProductView::from).collect(),
        success: flash.take_first(flash::SUCCESS).await?,
    })
}

// =============================================================================
// Edit Product
// =============================================================================

/// `GET /admin/edit-product/{id}?edit=true`
#[instrument(skip_all)]
pub async fn edit_product_page(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ctx: ViewContext,
    Path(id): Path<String>,
    Query(query): Query<EditQuery>,
) -> Result<Response> {
    if query.edit.as_deref() != Some("true") {
        return Ok(Redirect::to("/").into_response());
    }
    let Ok(id) = id.parse::<ProductId>() else {
        return Ok(Redirect::to("/").into_response());
    };

    let product = ProductRepository::new(state.pool()).get(id).await?;
    let Some(product) = product.filter(|p| p.user_id == user.id) else {
        return Ok(Redirect::to("/").into_response());
    };

    Ok(EditProductTemplate {
        ctx,
        editing: true,
        product_id: product.id.to_string(),
        input: ProductInput::from(&product),
        error: None,
    }
    .into_response())
}

/// `POST /admin/edit-product`
#[instrument(skip_all)]
pub async fn edit_product(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ctx: ViewContext,
    flash: Flash,
    MaybeImage(image): MaybeImage,
    Form(form): Form<EditProductForm>,
) -> Result<Response> {
    let input = form.input();
    let Ok(id) = form.product_id.parse::<ProductId>() else {
        discard(image.as_ref()).await;
        return Ok(Redirect::to("/").into_response());
    };

    let repo = ProductRepository::new(state.pool());
    let existing = match repo.get(id).await {
        Ok(product) => product.filter(|p| p.user_id == user.id),
        Err(e) => {
            discard(image.as_ref()).await;
            return Err(e.into());
        }
    };
    let Some(existing) = existing else {
        discard(image.as_ref()).await;
        return Ok(Redirect::to("/").into_response());
    };

    let fields = match input.validate() {
        Ok(fields) => fields,
        Err(e) => {
            discard(image.as_ref()).await;
            return Ok(rejected_form(ctx, true, form.product_id, input, e.to_string()));
        }
    };

    let new_path = image.as_ref().map(UploadedImage::public_path);
    match repo
        .update_owned(user.id, id, &fields, new_path.as_deref())
        .await
    {
        Ok(product) => {
            if new_path.is_some() {
                delete_image(&state.config().image_dir, &existing.image_path).await;
            }
            tracing::info!(product_id = %product.id, user_id = %user.id, "Product updated");
            flash
                .push(flash::SUCCESS, format!("Updated \"{}\".", product.title))
                .await?;
            Ok(Redirect::to("/admin/products").into_response())
        }
        Err(RepositoryError::NotFound) => {
            discard(image.as_ref()).await;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => {
            discard(image.as_ref()).await;
            Err(e.into())
        }
    }
}

// =============================================================================
// Delete Product
// =============================================================================

/// `POST /admin/delete-product`
#[instrument(skip_all)]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    flash: Flash,
    Form(form): Form<DeleteProductForm>,
) -> Result<Response> {
    let Ok(id) = form.product_id.parse::<ProductId>() else {
        return Ok(Redirect::to("/").into_response());
    };

    match ProductRepository::new(state.pool())
        .delete_owned(user.id, id)
        .await
    {
        Ok(product) => {
            delete_image(&state.config().image_dir, &product.image_path).await;
            tracing::info!(product_id = %product.id, user_id = %user.id, "Product deleted");
            flash
                .push(flash::SUCCESS, format!("Deleted \"{}\".", product.title))
                .await?;
            Ok(Redirect::to("/admin/products").into_response())
        }
        Err(RepositoryError::NotFound) => Ok(Redirect::to("/").into_response()),
        Err(e) => Err(e.into()),
    }
}
