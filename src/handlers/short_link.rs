use actix_web::{http::header::LOCATION, web, Either, HttpResponse, Responder};
use log::{debug, info};
use serde_json::json;
use validator::Validate;

use crate::{
    errors::AppError,
    models::{CreateShortLinkDto, LinkInfoDto, PasswordDto, ShortLinkQueryParams},
    services::{ShortLinkService, ShortLinkServiceTrait},
    types::Result,
};

/// A password submitted either as JSON or from an HTML form
pub type PasswordBody = Either<web::Json<PasswordDto>, web::Form<PasswordDto>>;

fn password_from(body: PasswordBody) -> String {
    match body {
        Either::Left(json) => json.into_inner().password,
        Either::Right(form) => form.into_inner().password,
    }
}

/// Create short link route handler
pub async fn create_handler(
    dto: web::Json<CreateShortLinkDto>,
    service: web::Data<ShortLinkService>,
) -> Result<impl Responder> {
    let dto = dto.into_inner();
    dto.validate()?;

    let link = service.shorten(dto.into()).await?;
    Ok(HttpResponse::Created().json(json!({
        "data": link,
        "message": "Successfully created link",
    })))
}

/// List live links, optionally only those of one owner
pub async fn list_handler(
    query: web::Query<ShortLinkQueryParams>,
    service: web::Data<ShortLinkService>,
) -> Result<impl Responder> {
    let links = match query.owner_id {
        Some(owner_id) => service.list_by_owner(owner_id).await?,
        None => service.list().await?,
    };
    Ok(HttpResponse::Ok().json(json!({
        "data": links,
        "message": "Successfully retrieved links",
    })))
}

/// Existence check: metadata only, never counts a visit
pub async fn info_handler(
    id: web::Path<String>,
    service: web::Data<ShortLinkService>,
) -> Result<impl Responder> {
    let link = service.get_without_password(&id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "data": LinkInfoDto::from(link),
        "message": "Successfully retrieved link",
    })))
}

pub async fn verify_password_handler(
    id: web::Path<String>,
    body: PasswordBody,
    service: web::Data<ShortLinkService>,
) -> Result<impl Responder> {
    let valid = service
        .verify_password(&id.into_inner(), &password_from(body))
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "data": { "valid": valid },
        "message": "Password accepted",
    })))
}

/// Redirect route handler
pub async fn redirect_handler(
    path: web::Path<String>,
    service: web::Data<ShortLinkService>,
) -> Result<impl Responder> {
    let id = path.into_inner();
    debug!("Redirect requested for id: {}", id);

    let link = service.get_without_password(&id).await?;
    if link.is_password_protected() {
        return Err(AppError::PasswordRequired(id));
    }

    let link = service.redirect(&id, None).await?;
    info!("Redirecting '{}' to '{}'", id, link.target);

    Ok(HttpResponse::TemporaryRedirect()
        .insert_header((LOCATION, link.target))
        .finish())
}

/// Password-protected redirect: verifies, counts the visit, then redirects
pub async fn unlock_handler(
    path: web::Path<String>,
    body: PasswordBody,
    service: web::Data<ShortLinkService>,
) -> Result<impl Responder> {
    let id = path.into_inner();
    let password = password_from(body);

    let link = service.redirect(&id, Some(&password)).await?;
    info!("Unlocked '{}', redirecting to '{}'", id, link.target);

    Ok(HttpResponse::SeeOther()
        .insert_header((LOCATION, link.target))
        .finish())
}
