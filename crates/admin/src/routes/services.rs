//! Nursery services shown on the storefront's services page.

use askama::Template;
use axum::{
    Router,
    extract::{Multipart, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tracing::instrument;

use vivero_core::ServiceId;
use vivero_storefront::db::ServiceRepository;
use vivero_storefront::models::{Service, ServiceInput};

use super::form::{EditorForm, back_with_error, upload_body_limit};
use super::views::{AdminUserView, Flash, MessageQuery};
use crate::{error::AppError, filters, middleware::RequireAdminAuth, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/services", get(index).post(create).layer(upload_body_limit()))
        .route("/services/new", get(new_service))
        .route("/services/{id}", post(update).layer(upload_body_limit()))
        .route("/services/{id}/edit", get(edit))
        .route("/services/{id}/delete", post(delete))
}

#[derive(Debug, Clone, Default)]
pub struct ServiceView {
    pub id: i32,
    pub name: String,
    pub description: String,
    /// Display form in lists, raw amount in the editor.
    pub price_from: String,
    pub price_amount: String,
    pub image_url: Option<String>,
    pub position: i32,
    pub active: bool,
}

impl From<&Service> for ServiceView {
    fn from(s: &Service) -> Self {
        Self {
            id: s.id.as_i32(),
            name: s.name.clone(),
            description: s.description.clone(),
            price_from: s.price_from.map(|p| p.display()).unwrap_or_default(),
            price_amount: s
                .price_from
                .map(|p| p.amount.to_string())
                .unwrap_or_default(),
            image_url: s.image_url.clone(),
            position: s.position,
            active: s.active,
        }
    }
}

#[derive(Template)]
#[template(path = "services/index.html")]
pub struct ServicesIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Flash,
    pub services: Vec<ServiceView>,
}

#[derive(Template)]
#[template(path = "services/form.html")]
pub struct ServiceFormTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Flash,
    pub title: String,
    pub action: String,
    pub service: ServiceView,
}

fn service_input(
    form: &EditorForm,
    image_url: Option<String>,
) -> Result<ServiceInput, &'static str> {
    let input = ServiceInput {
        name: form.text("name"),
        description: form.text("description"),
        price_from: form
            .decimal("price_from")
            .map_err(|_| "invalid_number")?
            .map(|p| p.round_dp(2)),
        image_url,
        position: form.integer("position").map_err(|_| "invalid_number")?,
        active: form.checked("active"),
    };

    input.validate().map_err(|e| match e.field {
        "price_from" => "invalid_number",
        _ => "missing_fields",
    })?;
    Ok(input)
}

#[instrument(skip(admin, state, messages))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(messages): Query<MessageQuery>,
) -> Result<Html<String>, AppError> {
    let services = ServiceRepository::new(state.pool()).list_all().await?;

    let template = ServicesIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/services".to_string(),
        flash: messages.flash(),
        services: services.iter().map(ServiceView::from).collect(),
    };
    Ok(Html(template.render()?))
}

#[instrument(skip(admin, messages))]
pub async fn new_service(
    RequireAdminAuth(admin): RequireAdminAuth,
    Query(messages): Query<MessageQuery>,
) -> Result<Html<String>, AppError> {
    let template = ServiceFormTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/services".to_string(),
        flash: messages.flash(),
        title: "Nuevo servicio".to_string(),
        action: "/services".to_string(),
        service: ServiceView {
            active: true,
            ..ServiceView::default()
        },
    };
    Ok(Html(template.render()?))
}

#[instrument(skip(admin, state, multipart), fields(admin_id = %admin.id))]
pub async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let mut form = EditorForm::read(multipart)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;

    if let Err(code) = service_input(&form, None) {
        return Ok(back_with_error("/services/new", code));
    }
    let image_url = match form.upload_image(state.cdn()).await {
        Ok(url) => url,
        Err(e) => return Ok(back_with_error("/services/new", e.code())),
    };
    let input = match service_input(&form, image_url) {
        Ok(input) => input,
        Err(code) => return Ok(back_with_error("/services/new", code)),
    };

    let service = ServiceRepository::new(state.pool()).create(&input).await?;
    tracing::info!(service_id = %service.id, "Service created");
    Ok(Redirect::to("/services?success=created").into_response())
}

#[instrument(skip(admin, state, messages))]
pub async fn edit(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(messages): Query<MessageQuery>,
) -> Result<Html<String>, AppError> {
    let service = ServiceRepository::new(state.pool())
        .get(ServiceId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("service {id}")))?;

    let template = ServiceFormTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/services".to_string(),
        flash: messages.flash(),
        title: format!("Editar {}", service.name),
        action: format!("/services/{id}"),
        service: ServiceView::from(&service),
    };
    Ok(Html(template.render()?))
}

#[instrument(skip(admin, state, multipart), fields(admin_id = %admin.id))]
pub async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let edit_path = format!("/services/{id}/edit");
    let repo = ServiceRepository::new(state.pool());
    let service_id = ServiceId::new(id);

    let current = repo
        .get(service_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("service {id}")))?;

    let mut form = EditorForm::read(multipart)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;

    if let Err(code) = service_input(&form, None) {
        return Ok(back_with_error(&edit_path, code));
    }
    let image_url = match form.upload_image(state.cdn()).await {
        Ok(Some(url)) => Some(url),
        Ok(None) if form.checked("remove_image") => None,
        Ok(None) => current.image_url,
        Err(e) => return Ok(back_with_error(&edit_path, e.code())),
    };
    let input = match service_input(&form, image_url) {
        Ok(input) => input,
        Err(code) => return Ok(back_with_error(&edit_path, code)),
    };

    repo.update(service_id, &input).await?;
    tracing::info!(service_id = id, "Service updated");
    Ok(Redirect::to(&format!("{edit_path}?success=saved")).into_response())
}

#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    ServiceRepository::new(state.pool())
        .delete(ServiceId::new(id))
        .await?;
    tracing::info!(service_id = id, "Service deleted");
    Ok(Redirect::to("/services?success=deleted").into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_service_price_is_optional() {
        let form = EditorForm::from_pairs(&[
            ("name", "Paisajismo"),
            ("description", "Diseño de jardines"),
            ("active", "on"),
        ]);
        let input = service_input(&form, None).unwrap();
        assert_eq!(input.price_from, None);
        assert!(input.active);
    }

    #[test]
    fn test_service_price_parsed() {
        let form = EditorForm::from_pairs(&[
            ("name", "Poda"),
            ("description", "Poda de árboles"),
            ("price_from", "8000"),
        ]);
        let input = service_input(&form, None).unwrap();
        assert_eq!(input.price_from, Some(Decimal::new(8000, 0)));
        assert!(!input.active);
    }

    #[test]
    fn test_service_errors() {
        let form = EditorForm::from_pairs(&[
            ("name", "Poda"),
            ("description", "x"),
            ("price_from", "-5"),
        ]);
        assert_eq!(service_input(&form, None).unwrap_err(), "invalid_number");

        let form = EditorForm::from_pairs(&[("name", "Poda")]);
        assert_eq!(service_input(&form, None).unwrap_err(), "missing_fields");
    }
}
