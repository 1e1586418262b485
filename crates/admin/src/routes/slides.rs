//! Home page carousel slides.

use askama::Template;
use axum::{
    Router,
    extract::{Multipart, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tracing::instrument;

use vivero_core::SlideId;
use vivero_storefront::db::SlideRepository;
use vivero_storefront::models::{Slide, SlideInput};

use super::form::{EditorForm, back_with_error, upload_body_limit};
use super::views::{AdminUserView, Flash, MessageQuery};
use crate::{error::AppError, filters, middleware::RequireAdminAuth, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/slides", get(index).post(create).layer(upload_body_limit()))
        .route("/slides/new", get(new_slide))
        .route("/slides/{id}", post(update).layer(upload_body_limit()))
        .route("/slides/{id}/edit", get(edit))
        .route("/slides/{id}/toggle", post(toggle))
        .route("/slides/{id}/delete", post(delete))
}

#[derive(Debug, Clone, Default)]
pub struct SlideView {
    pub id: i32,
    pub title: String,
    pub subtitle: String,
    pub image_url: String,
    pub link_url: String,
    pub position: i32,
    pub enabled: bool,
}

impl From<&Slide> for SlideView {
    fn from(s: &Slide) -> Self {
        Self {
            id: s.id.as_i32(),
            title: s.title.clone(),
            subtitle: s.subtitle.clone().unwrap_or_default(),
            image_url: s.image_url.clone(),
            link_url: s.link_url.clone().unwrap_or_default(),
            position: s.position,
            enabled: s.enabled,
        }
    }
}

#[derive(Template)]
#[template(path = "slides/index.html")]
pub struct SlidesIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Flash,
    pub slides: Vec<SlideView>,
}

#[derive(Template)]
#[template(path = "slides/form.html")]
pub struct SlideFormTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Flash,
    pub title: String,
    pub action: String,
    pub slide: SlideView,
}

/// `image_url` is the uploaded or kept image; an empty one is rejected.
fn slide_input(
    form: &EditorForm,
    image_url: Option<String>,
) -> Result<SlideInput, &'static str> {
    let input = SlideInput {
        title: form.text("title"),
        subtitle: form.optional("subtitle"),
        image_url: image_url.unwrap_or_default(),
        link_url: form.optional("link_url"),
        position: form.integer("position").map_err(|_| "invalid_number")?,
        enabled: form.checked("enabled"),
    };

    input.validate().map_err(|e| match e.field {
        "image_url" => "image_required",
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
    let slides = SlideRepository::new(state.pool()).list_all().await?;

    let template = SlidesIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/slides".to_string(),
        flash: messages.flash(),
        slides: slides.iter().map(SlideView::from).collect(),
    };
    Ok(Html(template.render()?))
}

#[instrument(skip(admin, messages))]
pub async fn new_slide(
    RequireAdminAuth(admin): RequireAdminAuth,
    Query(messages): Query<MessageQuery>,
) -> Result<Html<String>, AppError> {
    let template = SlideFormTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/slides".to_string(),
        flash: messages.flash(),
        title: "Nueva diapositiva".to_string(),
        action: "/slides".to_string(),
        slide: SlideView {
            enabled: true,
            ..SlideView::default()
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

    if form.text("title").is_empty() {
        return Ok(back_with_error("/slides/new", "missing_fields"));
    }
    let image_url = match form.upload_image(state.cdn()).await {
        Ok(url) => url.or_else(|| form.optional("image_url")),
        Err(e) => return Ok(back_with_error("/slides/new", e.code())),
    };
    let input = match slide_input(&form, image_url) {
        Ok(input) => input,
        Err(code) => return Ok(back_with_error("/slides/new", code)),
    };

    let slide = SlideRepository::new(state.pool()).create(&input).await?;
    tracing::info!(slide_id = %slide.id, "Slide created");
    Ok(Redirect::to("/slides?success=created").into_response())
}

#[instrument(skip(admin, state, messages))]
pub async fn edit(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(messages): Query<MessageQuery>,
) -> Result<Html<String>, AppError> {
    let slide = SlideRepository::new(state.pool())
        .get(SlideId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("slide {id}")))?;

    let template = SlideFormTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/slides".to_string(),
        flash: messages.flash(),
        title: format!("Editar {}", slide.title),
        action: format!("/slides/{id}"),
        slide: SlideView::from(&slide),
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
    let edit_path = format!("/slides/{id}/edit");
    let repo = SlideRepository::new(state.pool());
    let slide_id = SlideId::new(id);

    let current = repo
        .get(slide_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("slide {id}")))?;

    let mut form = EditorForm::read(multipart)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;

    if form.text("title").is_empty() {
        return Ok(back_with_error(&edit_path, "missing_fields"));
    }
    let image_url = match form.upload_image(state.cdn()).await {
        Ok(Some(url)) => url,
        Ok(None) => form.optional("image_url").unwrap_or(current.image_url),
        Err(e) => return Ok(back_with_error(&edit_path, e.code())),
    };
    let input = match slide_input(&form, Some(image_url)) {
        Ok(input) => input,
        Err(code) => return Ok(back_with_error(&edit_path, code)),
    };

    repo.update(slide_id, &input).await?;
    tracing::info!(slide_id = id, "Slide updated");
    Ok(Redirect::to(&format!("{edit_path}?success=saved")).into_response())
}

/// Flip a slide's visibility on the home page.
#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn toggle(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let repo = SlideRepository::new(state.pool());
    let slide_id = SlideId::new(id);
    let slide = repo
        .get(slide_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("slide {id}")))?;

    repo.set_enabled(slide_id, !slide.enabled).await?;
    tracing::info!(slide_id = id, enabled = !slide.enabled, "Slide toggled");
    Ok(Redirect::to("/slides?success=toggled").into_response())
}

#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    SlideRepository::new(state.pool())
        .delete(SlideId::new(id))
        .await?;
    tracing::info!(slide_id = id, "Slide deleted");
    Ok(Redirect::to("/slides?success=deleted").into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slide_needs_image() {
        let form = EditorForm::from_pairs(&[("title", "Primavera")]);
        assert_eq!(slide_input(&form, None).unwrap_err(), "image_required");
    }

    #[test]
    fn test_slide_input() {
        let form = EditorForm::from_pairs(&[
            ("title", "Primavera"),
            ("subtitle", " "),
            ("link_url", "/products?category=exterior"),
            ("position", "2"),
            ("enabled", "on"),
        ]);
        let input = slide_input(&form, Some("https://res.cloudinary.com/a.jpg".into())).unwrap();
        assert_eq!(input.subtitle, None);
        assert_eq!(input.link_url.as_deref(), Some("/products?category=exterior"));
        assert_eq!(input.position, 2);
        assert!(input.enabled);
    }
}
