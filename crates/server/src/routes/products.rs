//! Product route handlers.
//!
//! Listing and details are public. Create, update and delete need a staff
//! role on the cookie session and a valid anti-forgery token.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    body::Body,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use product_catalog_core::{ProductId, RowVersion};

use crate::error::{AppError, Result};
use crate::middleware::{CSRF_FIELD, Cookie, OptionalUser, Staff, csrf_token, verify_csrf};
use crate::models::{
    CurrentUser, FieldErrors, Product, ProductImage, ProductInput, product::DEFAULT_IMAGE_TYPE,
};
use crate::state::AppState;

/// Largest accepted multipart body for product forms.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price: String,
    pub has_image: bool,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: format!("${}", product.price),
            has_image: product.image.is_some(),
        }
    }
}

/// Values shown in the create/update form.
#[derive(Clone, Default)]
pub struct ProductFormView {
    pub id: Option<i32>,
    pub name: String,
    pub price: String,
    pub description: String,
    pub version: Option<i32>,
    pub has_image: bool,
}

impl From<&Product> for ProductFormView {
    fn from(product: &Product) -> Self {
        Self {
            id: Some(product.id.as_i32()),
            name: product.name.clone(),
            price: product.price.to_string(),
            description: product.description.clone(),
            version: Some(product.version.as_i32()),
            has_image: product.image.is_some(),
        }
    }
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductIndexTemplate {
    pub current_user: Option<CurrentUser>,
    pub csrf_token: String,
    pub can_manage: bool,
    pub products: Vec<ProductView>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/details.html")]
pub struct ProductDetailsTemplate {
    pub current_user: Option<CurrentUser>,
    pub csrf_token: String,
    pub product: ProductView,
}

/// Create/update form template.
#[derive(Template, WebTemplate)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub current_user: Option<CurrentUser>,
    pub csrf_token: String,
    pub title: &'static str,
    pub action: String,
    pub form: ProductFormView,
    pub errors: FieldErrors,
    pub failure: Option<String>,
}

/// Delete confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "products/delete.html")]
pub struct ProductDeleteTemplate {
    pub current_user: Option<CurrentUser>,
    pub csrf_token: String,
    pub product: ProductView,
}

/// Not found page template.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub current_user: Option<CurrentUser>,
    pub csrf_token: String,
    pub what: String,
}

/// Form body carrying only the anti-forgery token.
#[derive(Debug, Deserialize)]
pub struct CsrfForm {
    pub csrf_token: Option<String>,
}

/// Fields collected from a multipart product form.
#[derive(Default)]
struct ProductForm {
    csrf_token: Option<String>,
    input: ProductInput,
    view: ProductFormView,
}

/// Read a multipart product form. `imageData` with no file selected counts as
/// no upload.
async fn read_product_form(mut multipart: Multipart) -> Result<ProductForm> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("malformed form: {e}")))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        if name == "imageData" {
            let content_type = field
                .content_type()
                .map_or_else(|| DEFAULT_IMAGE_TYPE.to_owned(), str::to_owned);
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("upload failed: {e}")))?;
            if !data.is_empty() {
                form.input.image = Some(ProductImage {
                    content_type,
                    data: data.to_vec(),
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(format!("malformed form: {e}")))?;

        match name.as_str() {
            CSRF_FIELD => form.csrf_token = Some(value),
            "id" => {
                let id = value.trim().parse().ok();
                form.input.id = id.map(ProductId::new);
                form.view.id = id;
            }
            "version" => {
                let version = value.trim().parse().ok();
                form.input.version = version.map(RowVersion::new);
                form.view.version = version;
            }
            "name" => {
                form.view.name.clone_from(&value);
                form.input.name = Some(value);
            }
            "price" => {
                form.view.price.clone_from(&value);
                form.input.price = Some(value);
            }
            "description" => {
                form.view.description.clone_from(&value);
                form.input.description = Some(value);
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn not_found(
    current_user: Option<CurrentUser>,
    session: &Session,
    id: ProductId,
) -> Result<Response> {
    Ok((
        StatusCode::NOT_FOUND,
        NotFoundTemplate {
            current_user,
            csrf_token: csrf_token(session).await?,
            what: format!("Product {id}"),
        },
    )
        .into_response())
}

/// Display the product listing.
#[instrument(skip(state, session, current_user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(current_user): OptionalUser,
) -> Result<impl IntoResponse> {
    let products = state.products().read().await?;
    let can_manage = match &current_user {
        Some(user) => state.identity().is_staff(user.id).await?,
        None => false,
    };

    Ok(ProductIndexTemplate {
        current_user,
        csrf_token: csrf_token(&session).await?,
        can_manage,
        products: products.iter().map(ProductView::from).collect(),
    })
}

/// Display one product.
#[instrument(skip(state, session, current_user))]
pub async fn details(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(current_user): OptionalUser,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    let Some(product) = state.products().get_by_id(id).await? else {
        return not_found(current_user, &session, id).await;
    };

    Ok(ProductDetailsTemplate {
        current_user,
        csrf_token: csrf_token(&session).await?,
        product: ProductView::from(&product),
    }
    .into_response())
}

/// Serve the stored image bytes with their content type.
pub async fn image(State(state): State<AppState>, Path(id): Path<ProductId>) -> Result<Response> {
    let image = state
        .products()
        .get_by_id(id)
        .await?
        .and_then(|p| p.image)
        .ok_or_else(|| AppError::NotFound(format!("image for product {id}")))?;

    Ok((
        [(header::CONTENT_TYPE, image.content_type)],
        Body::from(image.data),
    )
        .into_response())
}

/// Display the empty create form.
pub async fn create_page(
    session: Session,
    Staff(user, _): Staff<Cookie>,
) -> Result<impl IntoResponse> {
    Ok(ProductFormTemplate {
        current_user: Some(user),
        csrf_token: csrf_token(&session).await?,
        title: "Create product",
        action: "/product/create".to_owned(),
        form: ProductFormView::default(),
        errors: FieldErrors::default(),
        failure: None,
    })
}

/// Handle create form submission.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    Staff(user, _): Staff<Cookie>,
    multipart: Multipart,
) -> Result<Response> {
    let form = read_product_form(multipart).await?;
    verify_csrf(&session, form.csrf_token.as_deref()).await?;

    let draft = match form.input.validate() {
        Ok(draft) => draft,
        Err(errors) => {
            return Ok((
                StatusCode::BAD_REQUEST,
                ProductFormTemplate {
                    current_user: Some(user),
                    csrf_token: csrf_token(&session).await?,
                    title: "Create product",
                    action: "/product/create".to_owned(),
                    form: form.view,
                    errors,
                    failure: None,
                },
            )
                .into_response());
        }
    };

    state.products().create(Some(draft)).await?;
    Ok(Redirect::to("/product").into_response())
}

/// Display the update form for an existing product.
#[instrument(skip(state, session, user))]
pub async fn update_page(
    State(state): State<AppState>,
    session: Session,
    Staff(user, _): Staff<Cookie>,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    let Some(product) = state.products().get_by_id(id).await? else {
        return not_found(Some(user), &session, id).await;
    };

    Ok(ProductFormTemplate {
        current_user: Some(user),
        csrf_token: csrf_token(&session).await?,
        title: "Update product",
        action: format!("/product/update/{id}"),
        form: ProductFormView::from(&product),
        errors: FieldErrors::default(),
        failure: None,
    }
    .into_response())
}

/// Handle update form submission.
///
/// When no new file is uploaded the stored image is kept.
#[instrument(skip(state, session, user, multipart))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Staff(user, _): Staff<Cookie>,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Response> {
    let mut form = read_product_form(multipart).await?;
    verify_csrf(&session, form.csrf_token.as_deref()).await?;

    let current = state.products().get_by_id(id).await?;
    if form.input.image.is_none() {
        form.input.image = current.as_ref().and_then(|p| p.image.clone());
    }
    form.view.has_image = form.input.image.is_some();

    let token = csrf_token(&session).await?;
    let draft = match form.input.validate() {
        Ok(draft) => draft,
        Err(errors) => return Ok(update_form(user, token, id, form.view, errors, None)),
    };

    if state.products().update(id, Some(draft)).await?.is_none() {
        let failure = "The product was changed or removed since it was loaded. Reload it and try again.";
        return Ok(update_form(
            user,
            token,
            id,
            form.view,
            FieldErrors::default(),
            Some(failure.to_owned()),
        ));
    }

    Ok(Redirect::to("/product").into_response())
}

fn update_form(
    user: CurrentUser,
    csrf_token: String,
    id: ProductId,
    form: ProductFormView,
    errors: FieldErrors,
    failure: Option<String>,
) -> Response {
    (
        StatusCode::BAD_REQUEST,
        ProductFormTemplate {
            current_user: Some(user),
            csrf_token,
            title: "Update product",
            action: format!("/product/update/{id}"),
            form,
            errors,
            failure,
        },
    )
        .into_response()
}

/// Display the delete confirmation page.
#[instrument(skip(state, session, user))]
pub async fn delete_page(
    State(state): State<AppState>,
    session: Session,
    Staff(user, _): Staff<Cookie>,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    let Some(product) = state.products().get_by_id(id).await? else {
        return not_found(Some(user), &session, id).await;
    };

    Ok(ProductDeleteTemplate {
        current_user: Some(user),
        csrf_token: csrf_token(&session).await?,
        product: ProductView::from(&product),
    }
    .into_response())
}

/// Handle delete confirmation.
#[instrument(skip(state, session, user, form))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    Staff(user, _): Staff<Cookie>,
    Path(id): Path<ProductId>,
    Form(form): Form<CsrfForm>,
) -> Result<Response> {
    verify_csrf(&session, form.csrf_token.as_deref()).await?;

    if !state.products().delete(id).await? {
        return not_found(Some(user), &session, id).await;
    }

    Ok(Redirect::to("/product").into_response())
}
